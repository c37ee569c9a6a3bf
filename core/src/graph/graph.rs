use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

use super::item::WorkItem;

/// How a `blocked_by` reference to an unknown, not-completed id is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// The referencing item (and everything downstream of it) never runs.
    #[default]
    Block,
    /// The unknown blocker is treated as already satisfied.
    Satisfy,
}

/// A `blocked_by` reference that resolves to neither an item nor a completed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedBlocker {
    pub item_id: String,
    pub blocker_id: String,
}

/// An item that can never become ready under the current orphan policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedItem {
    pub item_id: String,
    pub reason: String,
}

/// A set of items with no dependencies among themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wave {
    pub index: usize,
    pub items: Vec<WorkItem>,
}

impl Wave {
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Dependency graph over an arena of work items keyed by id.
///
/// Built once per run from a snapshot of items and never mutated afterwards.
/// Adjacency is stored as `item -> blockers` and the reverse
/// `item -> dependents`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    items: HashMap<String, WorkItem>,

    /// Effective blockers: `blocked_by` plus reciprocal `blocks` declarations.
    blockers: HashMap<String, BTreeSet<String>>,

    dependents: HashMap<String, BTreeSet<String>>,

    /// Ids completed before this run (archived issues and the like).
    external_completed: HashSet<String>,

    unresolved: Vec<UnresolvedBlocker>,

    policy: OrphanPolicy,

    /// Item ids ordered by priority then id.
    order: Vec<String>,
}

impl DependencyGraph {
    /// Index `items` by id and derive adjacency.
    ///
    /// References to ids found neither among `items` nor in `completed` are
    /// recorded as warnings; `policy` decides whether they block.
    pub fn build(
        items: &[WorkItem],
        completed: &HashSet<String>,
        policy: OrphanPolicy,
    ) -> Result<Self, GraphError> {
        let mut arena: HashMap<String, WorkItem> = HashMap::with_capacity(items.len());
        for item in items {
            if arena.insert(item.id.clone(), item.clone()).is_some() {
                return Err(GraphError::DuplicateItemId(item.id.clone()));
            }
        }

        let mut blockers: HashMap<String, BTreeSet<String>> = arena
            .values()
            .map(|item| (item.id.clone(), item.blocked_by.clone()))
            .collect();

        for item in arena.values() {
            for blocked in &item.blocks {
                match blockers.get_mut(blocked) {
                    Some(set) => {
                        set.insert(item.id.clone());
                    }
                    None => tracing::debug!(
                        item_id = %item.id,
                        blocks = %blocked,
                        "ignoring blocks declaration for unknown item"
                    ),
                }
            }
        }

        let mut unresolved = Vec::new();
        for (item_id, set) in blockers.iter_mut() {
            let orphans: Vec<String> = set
                .iter()
                .filter(|b| !arena.contains_key(*b) && !completed.contains(*b))
                .cloned()
                .collect();
            for blocker_id in orphans {
                tracing::warn!(
                    item_id = %item_id,
                    blocker = %blocker_id,
                    policy = ?policy,
                    "unresolved blocker"
                );
                if policy == OrphanPolicy::Satisfy {
                    set.remove(&blocker_id);
                }
                unresolved.push(UnresolvedBlocker {
                    item_id: item_id.clone(),
                    blocker_id,
                });
            }
        }
        unresolved.sort_by(|a, b| (&a.item_id, &a.blocker_id).cmp(&(&b.item_id, &b.blocker_id)));

        let mut dependents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (item_id, set) in &blockers {
            for blocker in set {
                dependents
                    .entry(blocker.clone())
                    .or_default()
                    .insert(item_id.clone());
            }
        }

        let mut order: Vec<String> = arena.keys().cloned().collect();
        order.sort_by(|a, b| arena[a].sort_key().cmp(&arena[b].sort_key()));

        Ok(Self {
            items: arena,
            blockers,
            dependents,
            external_completed: completed.clone(),
            unresolved,
            policy,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: &str) -> Option<&WorkItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Items in priority-then-id order.
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.order.iter().map(move |id| &self.items[id])
    }

    /// Effective blockers of `id` (empty for unknown ids).
    pub fn blockers_of(&self, id: &str) -> impl Iterator<Item = &String> {
        self.blockers.get(id).into_iter().flatten()
    }

    pub fn dependents_of(&self, id: &str) -> impl Iterator<Item = &String> {
        self.dependents.get(id).into_iter().flatten()
    }

    pub fn unresolved_blockers(&self) -> &[UnresolvedBlocker] {
        &self.unresolved
    }

    pub fn external_completed(&self) -> &HashSet<String> {
        &self.external_completed
    }

    pub fn policy(&self) -> OrphanPolicy {
        self.policy
    }

    fn is_satisfied(&self, blocker: &str, completed: &HashSet<String>) -> bool {
        completed.contains(blocker) || self.external_completed.contains(blocker)
    }

    fn is_done(&self, id: &str, completed: &HashSet<String>) -> bool {
        self.is_satisfied(id, completed)
    }

    /// Not-yet-completed items whose blockers are all in `completed`
    /// (or were completed before the run), in priority-then-id order.
    pub fn get_ready_items(&self, completed: &HashSet<String>) -> Vec<&WorkItem> {
        self.order
            .iter()
            .filter(|id| !self.is_done(id, completed))
            .filter(|id| {
                self.blockers_of(id)
                    .all(|blocker| self.is_satisfied(blocker, completed))
            })
            .map(|id| &self.items[id])
            .collect()
    }

    /// Find dependency cycles with a three-colour depth-first traversal.
    ///
    /// Each cycle is reported as a path that starts and ends on the same id,
    /// following `blocked_by` edges (`A -> B -> A` means A waits on B and B
    /// waits on A). Traversal order is deterministic.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Mark::Unvisited))
            .collect();
        let mut stack: Vec<&str> = Vec::new();
        let mut cycles = Vec::new();

        let mut roots: Vec<&str> = self.order.iter().map(String::as_str).collect();
        roots.sort_unstable();
        for root in roots {
            if marks[root] == Mark::Unvisited {
                self.visit(root, &mut marks, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        marks.insert(node, Mark::InProgress);
        stack.push(node);

        if let Some(blockers) = self.blockers.get(node) {
            for blocker in blockers {
                let Some(&mark) = marks.get(blocker.as_str()) else {
                    continue;
                };
                match mark {
                    Mark::InProgress => {
                        if let Some(pos) = stack.iter().position(|id| *id == blocker.as_str()) {
                            let mut cycle: Vec<String> =
                                stack[pos..].iter().map(|id| id.to_string()).collect();
                            cycle.push(blocker.clone());
                            cycles.push(cycle);
                        }
                    }
                    Mark::Unvisited => self.visit(blocker, marks, stack, cycles),
                    Mark::Done => {}
                }
            }
        }

        stack.pop();
        marks.insert(node, Mark::Done);
    }

    /// Fail if the graph contains any cycle.
    pub fn validate(&self) -> Result<(), GraphError> {
        let cycles = self.detect_cycles();
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(GraphError::CircularDependency { cycles })
        }
    }

    /// Items that can never become ready because of unresolved blockers,
    /// directly or through a blocked ancestor. Always empty under
    /// [`OrphanPolicy::Satisfy`].
    pub fn blocked_items(&self, completed: &HashSet<String>) -> Vec<BlockedItem> {
        if self.policy == OrphanPolicy::Satisfy {
            return Vec::new();
        }

        let mut reasons: HashMap<String, String> = HashMap::new();
        let mut queue: Vec<String> = Vec::new();

        for orphan in &self.unresolved {
            if self.is_done(&orphan.item_id, completed) || reasons.contains_key(&orphan.item_id) {
                continue;
            }
            reasons.insert(
                orphan.item_id.clone(),
                format!("unresolved blocker '{}'", orphan.blocker_id),
            );
            queue.push(orphan.item_id.clone());
        }

        while let Some(id) = queue.pop() {
            for dependent in self.dependents_of(&id) {
                if self.is_done(dependent, completed) || reasons.contains_key(dependent) {
                    continue;
                }
                reasons.insert(
                    dependent.clone(),
                    format!("blocked by '{id}', which can never run"),
                );
                queue.push(dependent.clone());
            }
        }

        self.order
            .iter()
            .filter_map(|id| {
                reasons.remove(id).map(|reason| BlockedItem {
                    item_id: id.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Decompose the not-yet-completed items into dependency-respecting waves.
    ///
    /// Repeatedly takes the ready set, folds it into the completed set and
    /// emits it as the next wave. Items left over afterwards (other than those
    /// permanently blocked by unresolved references) indicate a cycle; the
    /// error then carries [`Self::detect_cycles`] output.
    pub fn get_execution_waves(&self, completed: &HashSet<String>) -> Result<Vec<Wave>, GraphError> {
        let mut done: HashSet<String> = completed.clone();
        let mut waves = Vec::new();

        loop {
            let ready: Vec<WorkItem> = self.get_ready_items(&done).into_iter().cloned().collect();
            if ready.is_empty() {
                break;
            }
            done.extend(ready.iter().map(|item| item.id.clone()));
            waves.push(Wave {
                index: waves.len(),
                items: ready,
            });
        }

        let blocked: HashSet<String> = self
            .blocked_items(completed)
            .into_iter()
            .map(|b| b.item_id)
            .collect();
        let remaining: Vec<String> = self
            .order
            .iter()
            .filter(|id| !self.is_done(id, &done) && !blocked.contains(*id))
            .cloned()
            .collect();

        if remaining.is_empty() {
            return Ok(waves);
        }

        let cycles = self.detect_cycles();
        if cycles.is_empty() {
            Err(GraphError::Unschedulable { remaining })
        } else {
            Err(GraphError::CircularDependency { cycles })
        }
    }
}
