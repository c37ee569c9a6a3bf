use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

/// Get the default wavesmith data directory: ~/.wavesmith
pub fn get_wavesmith_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".wavesmith"))
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

/// Resolve configuration.
///
/// Precedence: `explicit` > ./wavesmith.toml > ~/.wavesmith/config.toml >
/// defaults, then environment overrides on top.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let local_config = Path::new("wavesmith.toml");
    let user_config = get_wavesmith_data_dir()
        .ok()
        .map(|dir| dir.join("config.toml"));

    let mut cfg = if let Some(path) = explicit {
        read_config(path)?
    } else if local_config.exists() {
        read_config(local_config)?
    } else if let Some(path) = user_config.filter(|p| p.exists()) {
        read_config(&path)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("WAVESMITH_MAX_WORKERS") {
        cfg.scheduler.max_workers = v
            .trim()
            .parse()
            .with_context(|| format!("WAVESMITH_MAX_WORKERS must be a number, got '{v}'"))?;
    }
    if let Some(v) = get("WAVESMITH_WORKER_TIMEOUT_SECS") {
        cfg.scheduler.worker_timeout_secs = v.trim().parse().with_context(|| {
            format!("WAVESMITH_WORKER_TIMEOUT_SECS must be a number, got '{v}'")
        })?;
    }
    if let Some(v) = get("WAVESMITH_FIXER") {
        cfg.fixer.command = v;
    }
    if let Some(v) = get("WAVESMITH_STATE_PATH") {
        cfg.state.path = PathBuf::from(v);
    }

    Ok(())
}
