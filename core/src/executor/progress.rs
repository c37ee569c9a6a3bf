use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::state::ItemStatus;

/// Terminal progress display: one overall bar plus a spinner per running item.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    item_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// `enabled` is false for JSONL output and non-interactive runs.
    pub fn new(total_items: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                item_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_items as u64));

        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} items ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            item_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn start_item(&mut self, item_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ {item_id}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.item_bars.insert(item_id.to_string(), bar);
    }

    /// Record a terminal status; skipped items never had a spinner.
    pub fn finish_item(&mut self, item_id: &str, status: ItemStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        let icon = match status {
            ItemStatus::Completed => "✅",
            ItemStatus::Skipped => "⏭",
            ItemStatus::Timeout => "⏱",
            ItemStatus::Interrupted => "⛔",
            _ => "❌",
        };
        match self.item_bars.remove(item_id) {
            Some(bar) => bar.finish_with_message(format!("{icon} {item_id} ({duration_ms}ms)")),
            None => {
                let _ = self.multi.println(format!("  {icon} {item_id} ({status})"));
            }
        }

        self.overall.inc(1);
    }

    pub fn update_wave(&self, wave_index: usize, total_waves: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("Wave {}/{}", wave_index + 1, total_waves));
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ All items completed"
        } else {
            "❌ Some items did not complete"
        };
        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.item_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
