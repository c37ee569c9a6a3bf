use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::executor::traits::{Fixer, OutputRendererPlugin, WorkspaceProvider};
use crate::merge::MergeCoordinator;
use crate::state::StateStore;

/// Concrete collaborators for one run.
#[derive(Clone)]
pub struct Services {
    pub fixer: Arc<dyn Fixer>,
    pub workspaces: Arc<dyn WorkspaceProvider>,
    pub merger: Arc<MergeCoordinator>,
    pub renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &AppConfig, repo_root: &Path)
        -> anyhow::Result<Services>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    repo_root: PathBuf,
    services_factory: Option<Arc<dyn ServicesFactory>>,
}

impl AppContext {
    pub fn new(
        cfg: AppConfig,
        repo_root: impl Into<PathBuf>,
        services_factory: Option<Arc<dyn ServicesFactory>>,
    ) -> Self {
        Self {
            cfg,
            repo_root: repo_root.into(),
            services_factory,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Resolve a configured path against the shared repository root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_root.join(path)
        }
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.resolve(&self.cfg.state.path))
    }

    pub fn with_config(&self, cfg: AppConfig) -> Self {
        Self {
            cfg,
            repo_root: self.repo_root.clone(),
            services_factory: self.services_factory.clone(),
        }
    }

    pub async fn build_services(&self) -> anyhow::Result<Services> {
        let Some(factory) = self.services_factory.as_ref() else {
            anyhow::bail!("services_factory missing (cannot build plugins/services)");
        };
        factory.build_services(&self.cfg, &self.repo_root).await
    }
}
