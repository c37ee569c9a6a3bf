use wavesmith_core::api::{ItemStatus, RenderEvent};
use wavesmith_core::api::OutputRendererPlugin;

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn mark(&self, status: ItemStatus) -> &'static str {
        match (status, self.ascii_only) {
            (ItemStatus::Completed, true) => "OK",
            (ItemStatus::Completed, false) => "✔",
            (ItemStatus::Skipped, true) => "SKIP",
            (ItemStatus::Skipped, false) => "⤼",
            (ItemStatus::Interrupted, true) => "INT",
            (ItemStatus::Interrupted, false) => "⏸",
            (_, true) => "FAIL",
            (_, false) => "✘",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                attempt,
                total_items,
                total_waves,
            } => format!(
                "RUN START {} (attempt {}, items: {}, waves: {})",
                run_id, attempt, total_items, total_waves
            ),
            RenderEvent::Plan { run_id, plan } => {
                let mut out = format!("PLAN {}:", run_id);
                for wave in &plan.waves {
                    out.push_str(&format!(
                        "\n  wave {}: {}",
                        wave.wave.index,
                        wave.wave.ids().join(", ")
                    ));
                    if let Some(note) = &wave.note {
                        out.push_str(&format!(
                            "  [split {}/{} over {}]",
                            note.sub_wave_index,
                            note.total_sub_waves,
                            note.contended_paths.join(", ")
                        ));
                    }
                }
                for orphan in &plan.unresolved {
                    out.push_str(&format!(
                        "\n  warning: {} references unknown item {}",
                        orphan.item_id, orphan.blocker_id
                    ));
                }
                for blocked in &plan.blocked {
                    out.push_str(&format!("\n  blocked {}: {}", blocked.item_id, blocked.reason));
                }
                if !plan.already_completed.is_empty() {
                    out.push_str(&format!(
                        "\n  already completed: {}",
                        plan.already_completed.join(", ")
                    ));
                }
                out
            }
            RenderEvent::WaveStart {
                run_id,
                wave_index,
                total_waves,
                item_ids,
                note,
            } => {
                let mut line = format!(
                    "WAVE START {} (wave {}/{}, items: {})",
                    run_id,
                    wave_index + 1,
                    total_waves,
                    item_ids.join(", ")
                );
                if let Some(note) = note {
                    line.push_str(&format!(
                        " contended: {}",
                        note.contended_paths.join(", ")
                    ));
                }
                line
            }
            RenderEvent::ItemStart {
                run_id,
                item_id,
                wave_index,
            } => format!("ITEM START {} (wave {}, item {})", run_id, wave_index + 1, item_id),
            RenderEvent::ItemEnd { run_id, outcome } => {
                let mut line = format!(
                    "ITEM END {} {} {} ({}, {}ms)",
                    run_id,
                    self.mark(outcome.status),
                    outcome.item_id,
                    outcome.status,
                    outcome.duration_ms
                );
                if let Some(reason) = &outcome.reason {
                    line.push_str(&format!(": {}", reason));
                }
                line
            }
            RenderEvent::WaveEnd {
                run_id,
                wave_index,
                counts,
            } => format!(
                "WAVE END {} (wave {}, completed {}, unsuccessful {})",
                run_id,
                wave_index + 1,
                counts.completed,
                counts.unsuccessful()
            ),
            RenderEvent::RunEnd { run_id, summary } => {
                let c = &summary.counts;
                let mut line = format!(
                    "RUN END {} (completed {}, failed {}, timeout {}, skipped {}, pending {}, duration {}ms)",
                    run_id, c.completed, c.failed, c.timeout, c.skipped, c.pending, summary.duration_ms
                );
                if summary.interrupted {
                    line.push_str(" interrupted");
                }
                line
            }
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
