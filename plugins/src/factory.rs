use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use wavesmith_core::api::{
    AppConfig, Fixer, MergeCoordinator, OutputConfig, OutputFormat, OutputRendererPlugin,
    RepositoryOps, StashExclusions, WorkspaceProvider,
};

use crate::executor::{JsonlRendererPlugin, TextRendererPlugin};
use crate::fixer::CommandFixer;
use crate::git::GitRepositoryOps;
use crate::workspace::WorktreeProvider;

pub fn build_fixer(cfg: &AppConfig) -> Arc<dyn Fixer> {
    Arc::new(CommandFixer::from_config(&cfg.fixer))
}

pub fn build_workspaces(cfg: &AppConfig, repo_root: &Path) -> Arc<dyn WorkspaceProvider> {
    Arc::new(WorktreeProvider::new(
        repo_root,
        &cfg.workspace.root,
        cfg.workspace.branch_prefix.clone(),
    ))
}

pub async fn build_repository(repo_root: &Path) -> Result<Arc<GitRepositoryOps>> {
    Ok(Arc::new(GitRepositoryOps::open(repo_root).await?))
}

pub fn build_merge_coordinator(
    cfg: &AppConfig,
    repo_root: &Path,
    repo: Arc<dyn RepositoryOps>,
) -> Arc<MergeCoordinator> {
    Arc::new(MergeCoordinator::new(
        repo,
        StashExclusions::from_config(repo_root, cfg),
    ))
}

pub fn build_renderer(output: &OutputConfig, ascii_only: bool) -> Arc<dyn OutputRendererPlugin> {
    match output.format {
        OutputFormat::Jsonl => Arc::new(JsonlRendererPlugin::new(output.pretty_print)),
        OutputFormat::Text => Arc::new(TextRendererPlugin::new(ascii_only)),
    }
}
