//! ServicesFactory implementation: builds the git-backed collaborators for a run.
use std::path::Path;

use async_trait::async_trait;
use wavesmith_core::api::{AppConfig, Services, ServicesFactory};

use crate::factory;

#[derive(Default)]
pub struct PluginServicesFactory {
    ascii_only: bool,
}

impl PluginServicesFactory {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }
}

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &AppConfig, repo_root: &Path) -> anyhow::Result<Services> {
        let repo = factory::build_repository(repo_root).await?;
        let root = repo.root().to_path_buf();

        Ok(Services {
            fixer: factory::build_fixer(cfg),
            workspaces: factory::build_workspaces(cfg, &root),
            merger: factory::build_merge_coordinator(cfg, &root, repo),
            renderer: Some(factory::build_renderer(&cfg.output, self.ascii_only)),
        })
    }
}
