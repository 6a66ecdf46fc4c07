//! Final form: unwrap merged attributes, simplify, remove structural noise

use super::partial::{PartialGraph, PartialVertex};
use crate::error::{GraphError, Result};
use crate::event::{Endpoint, RegionKind};
use crate::execution_graph::{Edge, EdgeKind, ExecutionGraph, Vertex, VertexEndpoint, VertexId};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Convert the contracted working graph into an [`ExecutionGraph`]
pub(crate) fn unwrap_graph(graph: PartialGraph) -> Result<ExecutionGraph> {
    let vertices = graph
        .vertices
        .into_iter()
        .enumerate()
        .map(|(index, vertex)| unwrap_vertex(index, vertex))
        .collect::<Result<Vec<_>>>()?;
    let edges = graph
        .edges
        .into_iter()
        .map(|(source, target)| Edge {
            source,
            target,
            kind: EdgeKind::Sequence,
        })
        .collect();

    let mut graph = ExecutionGraph::new(vertices, edges)?;
    graph.simplify();
    Ok(graph)
}

fn unwrap_vertex(index: usize, vertex: PartialVertex) -> Result<Vertex> {
    let region_kind = unwrap_region_kind(index, &vertex)?;
    let endpoint = unwrap_endpoint(index, region_kind, &vertex)?;
    Ok(Vertex {
        region_kind,
        endpoint,
        unique_ids: vertex.unique_ids,
        time: vertex.time,
        events: vertex.events,
        sync_intervals: vertex.sync_intervals,
    })
}

fn unwrap_region_kind(index: usize, vertex: &PartialVertex) -> Result<RegionKind> {
    let mut kinds: BTreeSet<RegionKind> = vertex.region_kinds.iter().copied().collect();
    if kinds.contains(&RegionKind::SingleExecutor) {
        kinds.remove(&RegionKind::SingleOther);
    }
    let mut iter = kinds.iter();
    match (iter.next(), iter.next()) {
        (Some(kind), None) => Ok(*kind),
        _ => Err(GraphError::InconsistentMerge {
            vertex: index,
            attribute: "region_kind",
            values: join(kinds.iter().map(|k| k.as_str())),
        }),
    }
}

fn unwrap_endpoint(index: usize, kind: RegionKind, vertex: &PartialVertex) -> Result<VertexEndpoint> {
    let endpoints: BTreeSet<Endpoint> = vertex.endpoints.iter().copied().collect();
    let enter = endpoints.contains(&Endpoint::Enter);
    let leave = endpoints.contains(&Endpoint::Leave);
    let create = endpoints.contains(&Endpoint::Create);

    let endpoint = match (enter || create, leave) {
        (true, true) => VertexEndpoint::EnterLeave,
        (false, true) => VertexEndpoint::Leave,
        (true, false) if enter => VertexEndpoint::Enter,
        (true, false) => VertexEndpoint::Create,
        (false, false) => {
            return Err(GraphError::InconsistentMerge {
                vertex: index,
                attribute: "endpoint",
                values: String::from("none"),
            })
        }
    };

    // Only task and pairwise-sync contractions may fold both sides together
    let may_collapse = kind == RegionKind::ExplicitTask || kind.is_pairwise_sync();
    if endpoint == VertexEndpoint::EnterLeave && !may_collapse {
        return Err(GraphError::InconsistentMerge {
            vertex: index,
            attribute: "endpoint",
            values: join(endpoints.iter().map(|e| e.to_string())),
        });
    }
    Ok(endpoint)
}

fn join<S: AsRef<str>>(values: impl Iterator<Item = S>) -> String {
    values
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Collapse an enter whose only successor is the matching leave
///
/// Parallel regions keep both endpoints. Edges into the removed leave are
/// redirected to the surviving vertex, as are the leave's successors.
pub(crate) fn collapse_degenerate_pairs(graph: &mut ExecutionGraph) -> usize {
    let out_degrees = graph.out_degrees();
    let mut claimed = HashSet::new();
    let mut pairs: Vec<(VertexId, VertexId)> = Vec::new();

    for edge in graph.edges() {
        let (u, v) = (edge.source, edge.target);
        let (Some(enter), Some(leave)) = (graph.vertex(u), graph.vertex(v)) else {
            continue;
        };
        let degenerate = enter.endpoint == VertexEndpoint::Enter
            && leave.endpoint == VertexEndpoint::Leave
            && enter.region_kind == leave.region_kind
            && enter.region_kind != RegionKind::Parallel
            && out_degrees[u] == 1;
        if degenerate && claimed.insert(v) {
            pairs.push((u, v));
        }
    }

    graph.fold_vertices(&pairs, |survivor, absorbed| {
        survivor.absorb(absorbed);
        survivor.endpoint = VertexEndpoint::EnterLeave;
    });

    if !pairs.is_empty() {
        debug!(collapsed = pairs.len(), "degenerate enter/leave pairs");
    }
    pairs.len()
}

/// Drop a direct enter→leave edge of a task whose leave is reached another way
pub(crate) fn remove_redundant_task_edges(graph: &mut ExecutionGraph) -> usize {
    let in_degrees = graph.in_degrees();
    let redundant: HashSet<(VertexId, VertexId)> = graph
        .edges()
        .filter(|e| {
            let (Some(s), Some(t)) = (graph.vertex(e.source), graph.vertex(e.target)) else {
                return false;
            };
            s.task_id().is_some()
                && s.task_id() == t.task_id()
                && s.endpoint == VertexEndpoint::Enter
                && t.endpoint == VertexEndpoint::Leave
                && in_degrees[e.target] > 1
        })
        .map(|e| (e.source, e.target))
        .collect();

    if !redundant.is_empty() {
        graph.retain_edges(|e| !redundant.contains(&(e.source, e.target)));
    }
    redundant.len()
}
