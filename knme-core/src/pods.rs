//! Pod phase filtering and per-node tallies
//!
//! The exporter reports how many non-terminal pods are scheduled on each
//! node. Which phases count as terminal is configurable; by default
//! `Succeeded` and `Failed` are excluded.

use std::collections::{HashMap, HashSet};

/// Pod phases excluded from the active count.
#[derive(Debug, Clone)]
pub struct PhaseFilter {
    excluded: HashSet<String>,
}

impl PhaseFilter {
    /// Build a filter from a list of phase names.
    ///
    /// Entries are trimmed and empty entries dropped, so a config value of
    /// `"Succeeded, Failed,"` behaves the same as the default.
    pub fn new(phases: &[String]) -> Self {
        let excluded = phases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { excluded }
    }

    /// Whether pods in `phase` are excluded from the active count.
    pub fn excludes(&self, phase: &str) -> bool {
        self.excluded.contains(phase)
    }
}

impl Default for PhaseFilter {
    fn default() -> Self {
        Self::new(&["Succeeded".to_string(), "Failed".to_string()])
    }
}

/// The two fields of a pod the tally needs.
#[derive(Debug, Clone, Default)]
pub struct PodInfo {
    /// Node the pod is scheduled on, if any
    pub node: Option<String>,
    /// Reported lifecycle phase, if any
    pub phase: Option<String>,
}

/// Count active pods per node.
///
/// Unscheduled pods (no node name) are skipped. Pods with no reported
/// phase count as active.
pub fn count_active_pods<I>(pods: I, filter: &PhaseFilter) -> HashMap<String, u64>
where
    I: IntoIterator<Item = PodInfo>,
{
    let mut counts = HashMap::new();

    for pod in pods {
        let node = match pod.node {
            Some(node) => node,
            None => continue,
        };
        if let Some(phase) = &pod.phase {
            if filter.excludes(phase) {
                continue;
            }
        }
        *counts.entry(node).or_insert(0) += 1;
    }

    counts
}
