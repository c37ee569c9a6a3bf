use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::contention::{refine, RefinedWave};
use crate::error::GraphError;
use crate::graph::{BlockedItem, DependencyGraph, UnresolvedBlocker};

/// Everything a run needs to know up front: refined waves, items that can
/// never run, and the effective blockers of each planned item.
///
/// Derived from the current graph every time (also on resume), never
/// replayed from disk.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub waves: Vec<RefinedWave>,
    pub blocked: Vec<BlockedItem>,
    pub unresolved: Vec<UnresolvedBlocker>,
    pub already_completed: Vec<String>,
    #[serde(skip)]
    blockers: HashMap<String, Vec<String>>,
}

impl ExecutionPlan {
    /// Validate `graph`, decompose it into waves and refine them.
    ///
    /// Refuses cyclic graphs before anything else happens.
    #[tracing::instrument(skip_all, fields(items = graph.len(), completed = completed.len()))]
    pub fn build(graph: &DependencyGraph, completed: &HashSet<String>) -> Result<Self, GraphError> {
        graph.validate()?;

        let waves = graph.get_execution_waves(completed)?;
        let refined = refine(&waves);

        let blockers = graph
            .items()
            .map(|item| {
                (
                    item.id.clone(),
                    graph.blockers_of(&item.id).cloned().collect::<Vec<_>>(),
                )
            })
            .collect();

        let already_completed = graph
            .items()
            .filter(|item| {
                completed.contains(&item.id) || graph.external_completed().contains(&item.id)
            })
            .map(|item| item.id.clone())
            .collect();

        tracing::info!(
            dependency_waves = waves.len(),
            refined_waves = refined.len(),
            "Execution plan built"
        );

        Ok(Self {
            waves: refined,
            blocked: graph.blocked_items(completed),
            unresolved: graph.unresolved_blockers().to_vec(),
            already_completed,
            blockers,
        })
    }

    /// Effective blockers of a planned item.
    pub fn blockers_of(&self, item_id: &str) -> &[String] {
        self.blockers.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Items that will be scheduled into a wave.
    pub fn scheduled_count(&self) -> usize {
        self.waves.iter().map(|w| w.wave.len()).sum()
    }

    /// Scheduled plus permanently blocked items.
    pub fn total_items(&self) -> usize {
        self.scheduled_count() + self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.waves
            .iter()
            .flat_map(|w| w.items().iter().map(|i| i.id.as_str()))
            .chain(self.blocked.iter().map(|b| b.item_id.as_str()))
    }
}
