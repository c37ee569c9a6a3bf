use chrono::Local;
use serde_json::{json, Value};
use wavesmith_core::api::{OutputRendererPlugin, RenderEvent};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let event_type = event.event_type();
        match event {
            RenderEvent::RunStart {
                run_id,
                attempt,
                total_items,
                total_waves,
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "attempt": attempt,
                    "total_items": total_items,
                    "total_waves": total_waves,
                }
            }),
            RenderEvent::Plan { run_id, plan } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": plan,
            }),
            RenderEvent::WaveStart {
                run_id,
                wave_index,
                total_waves,
                item_ids,
                note,
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "wave_index": wave_index,
                    "total_waves": total_waves,
                    "items": item_ids,
                    "contention": note,
                }
            }),
            RenderEvent::ItemStart {
                run_id,
                item_id,
                wave_index,
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "item_id": item_id,
                "metadata": {
                    "wave_index": wave_index,
                }
            }),
            RenderEvent::ItemEnd { run_id, outcome } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "item_id": outcome.item_id,
                "code": outcome.exit_code,
                "metadata": outcome,
            }),
            RenderEvent::WaveEnd {
                run_id,
                wave_index,
                counts,
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "wave_index": wave_index,
                    "counts": counts,
                }
            }),
            RenderEvent::RunEnd { run_id, summary } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "code": summary.exit_code().as_i32(),
                "metadata": {
                    "attempt": summary.attempt,
                    "total_items": summary.total_items,
                    "waves_run": summary.waves_run,
                    "counts": summary.counts,
                    "interrupted": summary.interrupted,
                    "duration_ms": summary.duration_ms,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
