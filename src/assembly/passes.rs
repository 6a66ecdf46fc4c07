//! The five contraction passes, applied in order
//!
//! | Pass | Merges                                                         |
//! |------|----------------------------------------------------------------|
//! | 1    | vertices of one parallel region sharing a [`ParallelKey`]      |
//! | 2    | the executor's single-construct vertices with their echoes     |
//! | 3    | explicit-task vertices by (task, side)                         |
//! | 4    | enter and leave of a task whose body produced no vertices      |
//! | 5    | adjacent enter/leave of barriers and taskwaits                 |
//!
//! [`ParallelKey`]: super::partial::ParallelKey

use super::clusters::{contract, label_by_key, ClusterIds};
use super::partial::{EndpointClass, PartialGraph, PartialVertex};
use crate::error::{GraphError, Result};
use crate::event::{Endpoint, EventId};
use tracing::debug;

pub(crate) fn run_all(graph: PartialGraph) -> Result<PartialGraph> {
    let graph = merge_parallel_positions(graph)?;
    let graph = merge_single_executors(graph)?;
    let graph = merge_task_endpoints(graph)?;
    let graph = merge_empty_tasks(graph)?;
    merge_sync_pairs(graph)
}

fn log_pass(name: &str, before: usize, graph: &PartialGraph) {
    debug!(
        pass = name,
        before,
        after = graph.vertex_count(),
        edges = graph.edge_count(),
        "contraction pass"
    );
}

/// Pass 1
pub(crate) fn merge_parallel_positions(graph: PartialGraph) -> Result<PartialGraph> {
    let before = graph.vertex_count();
    let labels = label_by_key(&graph, |_, v| Ok(v.parallel_key))?;
    let graph = contract(graph, &labels)?;
    log_pass("parallel", before, &graph);
    Ok(graph)
}

/// Pass 2
pub(crate) fn merge_single_executors(graph: PartialGraph) -> Result<PartialGraph> {
    let before = graph.vertex_count();
    let labels = label_by_key(&graph, |_, v| single_executor_key(v))?;
    let graph = contract(graph, &labels)?;
    log_pass("single", before, &graph);
    Ok(graph)
}

fn single_executor_key(vertex: &PartialVertex) -> Result<Option<EventId>> {
    if !vertex.region_kinds.iter().any(|k| k.is_single()) {
        return Ok(None);
    }
    match vertex.executor_events().as_slice() {
        [executor] => Ok(Some(*executor)),
        executors => {
            let (location, timestamp) = vertex
                .events
                .first()
                .map_or((0, 0), |e| (e.location, e.time));
            Err(GraphError::AmbiguousSingleExecutor {
                executors: executors.len(),
                location,
                timestamp,
            })
        }
    }
}

/// Pass 3
pub(crate) fn merge_task_endpoints(graph: PartialGraph) -> Result<PartialGraph> {
    let before = graph.vertex_count();
    let labels = label_by_key(&graph, |_, v| Ok(v.task_key()))?;
    let graph = contract(graph, &labels)?;
    log_pass("task", before, &graph);
    Ok(graph)
}

/// Pass 4: a task enter with no successors meets the task leave with no
/// predecessors
pub(crate) fn merge_empty_tasks(graph: PartialGraph) -> Result<PartialGraph> {
    let before = graph.vertex_count();
    let out_degrees = graph.out_degrees();
    let in_degrees = graph.in_degrees();

    let qualifies = |index: usize, vertex: &PartialVertex| match vertex.task_key() {
        Some((task, EndpointClass::Enter)) if out_degrees[index] == 0 => Some(task),
        Some((task, EndpointClass::Leave)) if in_degrees[index] == 0 => Some(task),
        _ => None,
    };

    let labels = label_by_key(&graph, |index, v| Ok(qualifies(index, v)))?;
    let graph = contract(graph, &labels)?;
    log_pass("empty-task", before, &graph);
    Ok(graph)
}

/// Pass 5: each edge from an enter-only to a leave-only vertex of the same
/// barrier or taskwait kind pairs its endpoints, first claim wins
pub(crate) fn merge_sync_pairs(graph: PartialGraph) -> Result<PartialGraph> {
    let before = graph.vertex_count();
    let mut partner: Vec<Option<usize>> = vec![None; graph.vertex_count()];

    for &(source, target) in &graph.edges {
        if source == target || partner[source].is_some() || partner[target].is_some() {
            continue;
        }
        let (s, t) = (&graph.vertices[source], &graph.vertices[target]);
        let same_sync_kind = match (s.sole_kind(), t.sole_kind()) {
            (Some(a), Some(b)) => a == b && a.is_pairwise_sync(),
            _ => false,
        };
        if same_sync_kind && s.only_endpoint(Endpoint::Enter) && t.only_endpoint(Endpoint::Leave) {
            partner[source] = Some(target);
            partner[target] = Some(source);
        }
    }

    let mut ids = ClusterIds::default();
    let mut labels: Vec<usize> = Vec::with_capacity(graph.vertex_count());
    for (index, other) in partner.iter().enumerate() {
        let label = match other {
            Some(other) if *other < index => labels[*other],
            _ => ids.mint(),
        };
        labels.push(label);
    }

    let graph = contract(graph, &labels)?;
    log_pass("sync-pair", before, &graph);
    Ok(graph)
}
