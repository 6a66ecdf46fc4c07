//! Synchronisation resolver: taskwait and taskgroup dependency edges
//!
//! - **Taskwait**: for a taskwait encountered by task `T` at time `t`, every
//!   explicit child of `T` created before `t` and not yet finished at `t` gets
//!   an edge from its leave vertex to the taskwait vertex.
//! - **Taskgroup**: for a taskgroup of task `T` spanning `(enter, leave)`,
//!   every explicit child created inside that interval, and every
//!   non-implicit descendant of such a child, gets an edge from its leave
//!   vertex to the taskgroup's leave vertex.
//!
//! Existing edges between the same pair are retagged rather than duplicated.

use crate::config::Containment;
use crate::error::{GraphError, Result};
use crate::event::{RegionKind, TaskId, TaskType, Timestamp};
use crate::execution_graph::{EdgeKind, ExecutionGraph, VertexEndpoint, VertexId};
use crate::task_tree::{TaskNode, TaskTree};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Number of synchronisation edges added (or retagged) per construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub taskwait_edges: usize,
    pub taskgroup_edges: usize,
    /// Tasks that should have been linked but have no leave vertex
    pub skipped_tasks: usize,
}

/// Attaches synchronisation edges to an assembled graph
pub struct SyncResolver<'a> {
    tree: &'a TaskTree,
    containment: Containment,
    task_leaves: BTreeMap<TaskId, VertexId>,
}

impl<'a> SyncResolver<'a> {
    pub fn new(graph: &ExecutionGraph, tree: &'a TaskTree, containment: Containment) -> Self {
        Self {
            tree,
            containment,
            task_leaves: graph.task_leave_index(),
        }
    }

    pub fn resolve(&self, graph: &mut ExecutionGraph) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for vertex in graph.vertices_of_kind(RegionKind::Taskwait) {
            for (task, t) in taskwait_points(graph, vertex)? {
                let pending = self
                    .tree
                    .children(task)
                    .filter(|c| c.task_type != TaskType::Implicit)
                    .filter(|c| self.containment.contains(c.creation_timestamp, t, c.end_timestamp));
                for child in pending {
                    self.link(graph, child, vertex, EdgeKind::Taskwait, &mut summary);
                }
            }
        }

        for vertex in graph.vertices_of_kind(RegionKind::Taskgroup) {
            let Some(v) = graph.vertex(vertex) else {
                continue;
            };
            if !v.endpoint.has_leave() {
                continue;
            }
            if v.sync_intervals.is_empty() {
                return Err(GraphError::MissingSyncPartner {
                    vertex,
                    region_kind: RegionKind::Taskgroup,
                });
            }
            let intervals = v.sync_intervals.clone();
            for interval in intervals {
                let Some(task) = interval.encountering_task else {
                    continue;
                };
                let members = self
                    .tree
                    .children(task)
                    .filter(|c| c.task_type != TaskType::Implicit)
                    .filter(|c| {
                        self.containment.contains(
                            interval.enter,
                            c.creation_timestamp,
                            Some(interval.leave),
                        )
                    })
                    .flat_map(|c| {
                        self.tree
                            .descendants_if(c.id, |n| n.task_type != TaskType::Implicit)
                    })
                    .filter_map(|id| self.tree.get(id))
                    .collect::<Vec<_>>();
                for member in members {
                    self.link(graph, member, vertex, EdgeKind::Taskgroup, &mut summary);
                }
            }
        }

        debug!(
            taskwait = summary.taskwait_edges,
            taskgroup = summary.taskgroup_edges,
            skipped = summary.skipped_tasks,
            "synchronisation edges"
        );
        Ok(summary)
    }

    fn link(
        &self,
        graph: &mut ExecutionGraph,
        task: &TaskNode,
        target: VertexId,
        kind: EdgeKind,
        summary: &mut SyncSummary,
    ) {
        let Some(&leave) = self.task_leaves.get(&task.id) else {
            warn!(task = task.id, construct = ?kind, "task has no leave vertex, skipped");
            summary.skipped_tasks += 1;
            return;
        };
        if leave == target {
            return;
        }
        graph.add_edge(leave, target, kind);
        match kind {
            EdgeKind::Taskwait => summary.taskwait_edges += 1,
            EdgeKind::Taskgroup => summary.taskgroup_edges += 1,
            EdgeKind::Sequence => {}
        }
    }
}

/// `(encountering task, enter time)` of each taskwait occurrence in a vertex
///
/// A leave-only vertex whose intervals are known defers to its enter vertex.
fn taskwait_points(graph: &ExecutionGraph, vertex: VertexId) -> Result<Vec<(TaskId, Timestamp)>> {
    let Some(v) = graph.vertex(vertex) else {
        return Ok(Vec::new());
    };
    if v.endpoint == VertexEndpoint::Leave && !v.sync_intervals.is_empty() {
        return Ok(Vec::new());
    }

    let mut points: Vec<(TaskId, Timestamp)> = v
        .events
        .iter()
        .filter(|e| e.is_enter())
        .filter_map(|e| e.encountering_task_id.map(|task| (task, e.time)))
        .collect();
    let has_enter_events = v.events.iter().any(|e| e.is_enter());

    if !has_enter_events {
        points = v
            .sync_intervals
            .iter()
            .filter_map(|i| i.encountering_task.map(|task| (task, i.enter)))
            .collect();
        if v.sync_intervals.is_empty() {
            return Err(GraphError::MissingSyncPartner {
                vertex,
                region_kind: RegionKind::Taskwait,
            });
        }
    }

    points.sort_unstable();
    points.dedup();
    Ok(points)
}

/// Attach taskwait and taskgroup edges to `graph`
pub fn resolve_synchronisation(
    graph: &mut ExecutionGraph,
    tree: &TaskTree,
    containment: Containment,
) -> Result<SyncSummary> {
    SyncResolver::new(graph, tree, containment).resolve(graph)
}
