//! Cluster labelling and vertex contraction
//!
//! A pass assigns every vertex a cluster id. Vertices that match the pass's
//! predicate share an id with every other vertex of the same key; all other
//! vertices get a singleton id. Contraction then replaces each cluster by
//! one vertex whose attributes are the combination of its members'.

use super::partial::{PartialGraph, PartialVertex};
use crate::error::{GraphError, Result};
use crate::event::{EventKind, RegionKind};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Cluster id source owned by a single pass
#[derive(Debug, Default)]
pub(crate) struct ClusterIds {
    next: usize,
}

impl ClusterIds {
    pub(crate) fn mint(&mut self) -> usize {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Label vertices by key; `None` means "not part of any cluster"
///
/// Ids are minted in order of first appearance, so cluster `c`'s first
/// member precedes cluster `c + 1`'s.
pub(crate) fn label_by_key<K, F>(graph: &PartialGraph, mut key: F) -> Result<Vec<usize>>
where
    K: Hash + Eq,
    F: FnMut(usize, &PartialVertex) -> Result<Option<K>>,
{
    let mut ids = ClusterIds::default();
    let mut clusters: HashMap<K, usize> = HashMap::new();
    let mut labels = Vec::with_capacity(graph.vertex_count());
    for (index, vertex) in graph.vertices.iter().enumerate() {
        let label = match key(index, vertex)? {
            Some(k) => *clusters.entry(k).or_insert_with(|| ids.mint()),
            None => ids.mint(),
        };
        labels.push(label);
    }
    Ok(labels)
}

/// Replace each cluster by one vertex; edges inside a cluster disappear
pub(crate) fn contract(graph: PartialGraph, labels: &[usize]) -> Result<PartialGraph> {
    let cluster_count = labels.iter().max().map_or(0, |m| m + 1);
    let mut members: Vec<Vec<PartialVertex>> = vec![Vec::new(); cluster_count];
    for (vertex, &label) in graph.vertices.into_iter().zip(labels) {
        members[label].push(vertex);
    }

    let vertices = members
        .into_iter()
        .enumerate()
        .map(|(cluster, group)| combine(cluster, group))
        .collect::<Result<Vec<_>>>()?;

    let edges = graph
        .edges
        .into_iter()
        .map(|(s, t)| (labels[s], labels[t]))
        .filter(|(s, t)| s != t)
        .collect();

    Ok(PartialGraph { vertices, edges })
}

/// Combine the members of one cluster into a single vertex
pub(crate) fn combine(cluster: usize, mut group: Vec<PartialVertex>) -> Result<PartialVertex> {
    if group.len() <= 1 {
        return group.pop().ok_or_else(|| GraphError::InconsistentMerge {
            vertex: cluster,
            attribute: "members",
            values: "empty cluster".to_string(),
        });
    }

    let mut merged = PartialVertex::default();
    for vertex in group {
        merged.region_kinds.extend(vertex.region_kinds);
        merged.endpoints.extend(vertex.endpoints);
        merged.unique_ids.extend(vertex.unique_ids);
        merged.events.extend(vertex.events);
        merged.sync_intervals.extend(vertex.sync_intervals);
        merged.parallel_key = merged.parallel_key.or(vertex.parallel_key);
        merged.time = match (merged.time, vertex.time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    merged.unique_ids.sort_unstable();
    merged.unique_ids.dedup();
    merged.sync_intervals.sort_unstable();
    merged.sync_intervals.dedup();

    // The same recorded event reaches a cluster once per chunk that echoed it
    let mut seen = HashSet::new();
    merged.events.retain(|e| seen.insert(e.id()));

    // A task's creation duplicates its enter once both are known
    if merged.events.iter().any(|e| e.kind != EventKind::Create) {
        merged.events.retain(|e| e.kind != EventKind::Create);
    }

    if merged.has_kind(RegionKind::SingleExecutor) && merged.has_kind(RegionKind::SingleOther) {
        merged.region_kinds.retain(|k| *k != RegionKind::SingleOther);
        merged
            .events
            .retain(|e| e.region_kind != RegionKind::SingleOther);
    }

    Ok(merged)
}
