use std::path::{Component, Path, PathBuf};

use crate::config::AppConfig;
use crate::executor::traits::{ChangeKind, DirtyFile};

/// Paths that are never stashed around a merge.
///
/// All entries are repository-relative with `/` separators.
#[derive(Debug, Clone, Default)]
pub struct StashExclusions {
    repo_root: PathBuf,
    state_file: Option<String>,
    archive_dir: Option<String>,
    external_files: Vec<String>,
    extra: Vec<String>,
}

impl StashExclusions {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            ..Self::default()
        }
    }

    pub fn from_config(repo_root: impl Into<PathBuf>, cfg: &AppConfig) -> Self {
        let mut exclusions = Self::new(repo_root)
            .with_state_file(&cfg.state.path)
            .with_archive_dir(&cfg.merge.archive_dir);
        for path in &cfg.merge.external_state_files {
            exclusions = exclusions.with_external_file(path);
        }
        for path in &cfg.merge.extra_exclusions {
            exclusions = exclusions.with_extra(path);
        }
        exclusions
    }

    pub fn with_state_file(mut self, path: impl AsRef<Path>) -> Self {
        self.state_file = self.relative(path.as_ref());
        self
    }

    pub fn with_archive_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.archive_dir = self.relative(path.as_ref());
        self
    }

    pub fn with_external_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(rel) = self.relative(path.as_ref()) {
            self.external_files.push(rel);
        }
        self
    }

    pub fn with_extra(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(rel) = self.relative(path.as_ref()) {
            self.extra.push(rel);
        }
        self
    }

    /// Repository-relative form of `path`; `None` for paths outside the repo.
    fn relative(&self, path: &Path) -> Option<String> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.repo_root).ok()?
        } else {
            path
        };

        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn in_archive(&self, path: &str) -> bool {
        self.archive_dir
            .as_deref()
            .is_some_and(|dir| is_within(path, dir))
    }

    /// A deleted file whose name already exists in the archive directory is
    /// half of an in-flight move to the archive.
    fn archived_copy_exists(&self, path: &str) -> bool {
        let (Some(dir), Some(name)) = (self.archive_dir.as_deref(), Path::new(path).file_name())
        else {
            return false;
        };
        self.repo_root.join(dir).join(name).exists()
    }

    pub fn is_excluded(&self, file: &DirtyFile) -> bool {
        let path = file.path.as_str();

        if self.state_file.as_deref() == Some(path) {
            return true;
        }
        if self.external_files.iter().any(|f| f == path) {
            return true;
        }
        if self.extra.iter().any(|e| is_within(path, e)) {
            return true;
        }
        if self.in_archive(path) {
            return true;
        }

        match &file.change {
            ChangeKind::Renamed { from } => self.in_archive(from) || self.in_archive(path),
            ChangeKind::Deleted => self.archived_copy_exists(path),
            _ => false,
        }
    }

    /// Split dirty files into `(to_stash, excluded)`.
    pub fn partition<'a>(&self, files: &'a [DirtyFile]) -> (Vec<&'a DirtyFile>, Vec<&'a DirtyFile>) {
        files.iter().partition(|f| !self.is_excluded(f))
    }
}

fn is_within(path: &str, dir: &str) -> bool {
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}
