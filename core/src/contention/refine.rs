use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::hints::{extract_hints, get_overlapping_paths, overlaps_with, FileHints};
use crate::graph::{Wave, WorkItem};

/// Why a dependency wave was split, attached to each resulting sub-wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentionNote {
    /// Paths the split was made over, sorted.
    pub contended_paths: Vec<String>,
    /// 1-based position of this sub-wave within its parent.
    pub sub_wave_index: usize,
    pub total_sub_waves: usize,
}

/// A wave after contention refinement.
///
/// `wave.index` is renumbered across the whole plan; `parent_index` keeps
/// the dependency wave it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefinedWave {
    pub wave: Wave,
    pub parent_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<ContentionNote>,
}

impl RefinedWave {
    pub fn items(&self) -> &[WorkItem] {
        &self.wave.items
    }
}

/// Split waves so that no two items in a sub-wave are predicted to touch
/// the same paths. Hints are extracted from each item's description.
pub fn refine(waves: &[Wave]) -> Vec<RefinedWave> {
    let hints: HashMap<String, FileHints> = waves
        .iter()
        .flat_map(|wave| wave.items.iter())
        .map(|item| (item.id.clone(), extract_hints(item)))
        .collect();
    refine_with_hints(waves, &hints)
}

/// Same as [`refine`] with precomputed hints. Items missing from `hints`
/// are treated as touching nothing.
pub fn refine_with_hints(waves: &[Wave], hints: &HashMap<String, FileHints>) -> Vec<RefinedWave> {
    let empty = FileHints::default();
    let mut refined = Vec::new();

    for wave in waves {
        let mut items: Vec<&WorkItem> = wave.items.iter().collect();
        items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let hint_of = |item: &WorkItem| hints.get(&item.id).unwrap_or(&empty);

        let mut contended: BTreeSet<String> = BTreeSet::new();
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                if overlaps_with(hint_of(a), hint_of(b)) {
                    contended.extend(get_overlapping_paths(hint_of(a), hint_of(b)));
                }
            }
        }

        if contended.is_empty() {
            refined.push(RefinedWave {
                wave: Wave {
                    index: refined.len(),
                    items: items.into_iter().cloned().collect(),
                },
                parent_index: wave.index,
                note: None,
            });
            continue;
        }

        // First-fit in priority order: each item joins the earliest
        // sub-wave holding nothing it overlaps with.
        let mut groups: Vec<Vec<&WorkItem>> = Vec::new();
        for item in items {
            let slot = groups.iter().position(|group| {
                group
                    .iter()
                    .all(|member| !overlaps_with(hint_of(member), hint_of(item)))
            });
            match slot {
                Some(idx) => groups[idx].push(item),
                None => groups.push(vec![item]),
            }
        }

        let total = groups.len();
        let contended_paths: Vec<String> = contended.into_iter().collect();
        tracing::info!(
            wave = wave.index,
            sub_waves = total,
            paths = ?contended_paths,
            "Splitting wave over contended paths"
        );

        for (pos, group) in groups.into_iter().enumerate() {
            refined.push(RefinedWave {
                wave: Wave {
                    index: refined.len(),
                    items: group.into_iter().cloned().collect(),
                },
                parent_index: wave.index,
                note: Some(ContentionNote {
                    contended_paths: contended_paths.clone(),
                    sub_wave_index: pos + 1,
                    total_sub_waves: total,
                }),
            });
        }
    }

    refined
}
