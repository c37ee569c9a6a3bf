use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;

use wavesmith_core::api::{FixOutcome, FixRequest, Fixer, FixerConfig};

const TAIL_LINES: usize = 40;

/// Runs an external command inside the workspace.
///
/// `{item_id}`, `{title}`, `{description}` and `{workspace}` in arguments are
/// replaced per item. The child is killed when the future is dropped.
pub struct CommandFixer {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl CommandFixer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &FixerConfig) -> Self {
        Self {
            command: shellexpand::tilde(&cfg.command).into_owned(),
            args: cfg.args.clone(),
            env: cfg.env.clone(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn render_args(&self, request: &FixRequest) -> Vec<String> {
        let title = request.title.as_deref().unwrap_or(&request.item_id);
        let workspace = request.workspace.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{item_id}", &request.item_id)
                    .replace("{title}", title)
                    .replace("{description}", &request.description)
                    .replace("{workspace}", &workspace)
            })
            .collect()
    }
}

#[async_trait]
impl Fixer for CommandFixer {
    fn name(&self) -> &str {
        &self.command
    }

    async fn fix(&self, request: &FixRequest) -> anyhow::Result<FixOutcome> {
        let args = self.render_args(request);
        tracing::debug!(
            item_id = %request.item_id,
            cmd = %self.command,
            args = ?args,
            "Starting fixer"
        );

        let started = Instant::now();
        let child = Command::new(&self.command)
            .args(&args)
            .envs(&self.env)
            .env("WAVESMITH_ITEM_ID", &request.item_id)
            .env("WAVESMITH_WORKSPACE", &request.workspace)
            .current_dir(&request.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn fixer '{}'", self.command))?;

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for fixer")?;

        Ok(FixOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout_tail: tail(&String::from_utf8_lossy(&output.stdout), TAIL_LINES),
            stderr_tail: tail(&String::from_utf8_lossy(&output.stderr), TAIL_LINES),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
