//! Per-chunk graph construction
//!
//! Turns one [`Chunk`] into a small directed graph plus the task-tree facts
//! (parent/child links, creation and leave timestamps) the chunk reveals.
//!
//! # Vertices
//!
//! - one vertex per Enter/Leave event, except implicit-task events
//! - for each task-create event, a Create vertex and a placeholder vertex
//!   standing in for the created task's leave
//!
//! # Edges
//!
//! Program order, with three exceptions:
//! - a Create vertex hangs off the preceding vertex without becoming the
//!   next vertex's predecessor
//! - an echoed single or nested-parallel enter is not linked to its own
//!   leave; the region's own chunk provides that path
//! - a chunk with an empty body is normalised (no edge for an explicit task,
//!   exactly one edge otherwise)
//!
//! # Parallel keys
//!
//! In a parallel chunk the bounding vertices are keyed `Boundary(p, Enter)`
//! and `Boundary(p, Leave)` and every vertex between them `Position(p, n)`.
//! Any nested parallel enter/leave is keyed by its own id. Every location's
//! chunk of the same region therefore keys corresponding vertices alike.

use crate::assembly::{ParallelKey, PartialGraph, PartialVertex};
use crate::chunker::Chunk;
use crate::error::{GraphError, Result};
use crate::event::{Endpoint, Event, EventKind, LocationId, RegionKind, TaskId, TaskType, Timestamp};
use crate::execution_graph::SyncInterval;
use crate::task_tree::TaskLink;

/// Graph and task facts contributed by one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutput {
    pub location: LocationId,
    pub kind: RegionKind,
    pub task_links: Vec<TaskLink>,
    pub task_creation_timestamps: Vec<(TaskId, Timestamp)>,
    /// Enter times of task bodies that began in this chunk
    pub task_start_timestamps: Vec<(TaskId, Timestamp)>,
    pub task_leave_timestamps: Vec<(TaskId, Timestamp)>,
    pub graph: PartialGraph,
}

impl ChunkOutput {
    fn new(location: LocationId, kind: RegionKind) -> Self {
        Self {
            location,
            kind,
            task_links: Vec::new(),
            task_creation_timestamps: Vec::new(),
            task_start_timestamps: Vec::new(),
            task_leave_timestamps: Vec::new(),
            graph: PartialGraph::default(),
        }
    }

    fn record_task(&mut self, link: TaskLink, created: Timestamp) {
        self.task_creation_timestamps.push((link.child, created));
        self.task_links.push(link);
    }
}

/// Walk state between consecutive events of the chunk
struct Walk<'a> {
    location: LocationId,
    parallel_id: Option<u64>,
    prior: usize,
    prior_event: &'a Event,
    /// a Create vertex was added since `prior`
    intervening: bool,
    position: usize,
    open: Vec<&'a Event>,
}

impl<'a> Walk<'a> {
    fn bridges(&self, event: &Event) -> bool {
        let prior = self.prior_event;
        if self.intervening || !prior.is_enter() || !event.is_leave() {
            return false;
        }
        let both_single = prior.region_kind.is_single() && event.region_kind.is_single();
        let same_parallel = prior.region_kind == RegionKind::Parallel
            && event.region_kind == RegionKind::Parallel
            && prior.unique_id == event.unique_id;
        both_single || same_parallel
    }

    fn parallel_key(&mut self, event: &Event, is_last: bool) -> Option<ParallelKey> {
        self.position += 1;
        match self.parallel_id {
            Some(p) if is_last => Some(ParallelKey::boundary(p, Endpoint::Leave)),
            _ if event.region_kind == RegionKind::Parallel => {
                let endpoint = event.endpoint()?;
                event.unique_id.map(|id| ParallelKey::boundary(id, endpoint))
            }
            Some(p) => Some(ParallelKey::position(p, self.position)),
            None => None,
        }
    }

    /// Track nesting; a Leave returns the interval it closes
    fn match_nesting(&mut self, event: &'a Event) -> Result<Option<&'a Event>> {
        if event.is_enter() {
            self.open.push(event);
            return Ok(None);
        }
        match self.open.pop() {
            Some(enter)
                if enter.region_kind == event.region_kind && enter.unique_id == event.unique_id =>
            {
                Ok(Some(enter))
            }
            Some(enter) => Err(GraphError::mismatch(
                self.location,
                event.time,
                format!(
                    "{} leave (id {:?}) closes {} enter (id {:?}) from t={}",
                    event.region_kind, event.unique_id, enter.region_kind, enter.unique_id, enter.time
                ),
            )),
            None => Err(GraphError::mismatch(
                self.location,
                event.time,
                format!("{} leave with no open region in chunk", event.region_kind),
            )),
        }
    }
}

/// Build the graph for one chunk
pub fn build_chunk_graph(chunk: &Chunk) -> Result<ChunkOutput> {
    let location = chunk.location;
    let Some((first, rest)) = chunk.events.split_first() else {
        return Err(GraphError::mismatch(location, 0, "empty chunk"));
    };

    let kind = first.region_kind;
    if !kind.defines_chunk() {
        return Err(GraphError::UnsupportedRegionKind {
            kind: kind.to_string(),
            location: Some(location),
        });
    }
    if !first.is_enter() {
        return Err(GraphError::mismatch(
            location,
            first.time,
            format!("{} chunk does not begin with an enter", kind),
        ));
    }

    let parallel_id = match (kind, first.unique_id) {
        (RegionKind::Parallel, Some(id)) => Some(id),
        (RegionKind::Parallel, None) => {
            return Err(GraphError::mismatch(
                location,
                first.time,
                "parallel region without unique id",
            ))
        }
        _ => None,
    };

    let mut out = ChunkOutput::new(location, kind);

    let mut head = PartialVertex::from_event(first);
    head.parallel_key = parallel_id.map(|p| ParallelKey::boundary(p, Endpoint::Enter));
    let head = out.graph.add_vertex(head);

    if let (Some(task_type), Some(task)) = (kind.task_type(), first.unique_id) {
        if task_type == TaskType::Initial {
            out.record_task(
                TaskLink {
                    parent: first.encountering_task_id,
                    child: task,
                    child_type: TaskType::Initial,
                },
                first.time,
            );
        }
        out.task_start_timestamps.push((task, first.time));
    }

    let mut walk = Walk {
        location,
        parallel_id,
        prior: head,
        prior_event: first,
        intervening: false,
        position: 0,
        open: vec![first],
    };

    let last = rest.len().saturating_sub(1);
    for (index, event) in rest.iter().enumerate() {
        let is_last = index == last;

        if event.region_kind == RegionKind::ImplicitTask {
            if event.is_enter() {
                if let Some(task) = event.unique_id {
                    out.record_task(
                        TaskLink {
                            parent: event.encountering_task_id,
                            child: task,
                            child_type: TaskType::Implicit,
                        },
                        event.time,
                    );
                    out.task_start_timestamps.push((task, event.time));
                }
            }
            continue;
        }

        match event.kind {
            EventKind::Create => {
                let Some(task) = event.unique_id else {
                    return Err(GraphError::mismatch(
                        location,
                        event.time,
                        "task create without task id",
                    ));
                };
                let created = out.graph.add_vertex(PartialVertex::from_event(event));
                out.graph.add_vertex(PartialVertex::task_placeholder(task));
                out.graph.add_edge(walk.prior, created);
                walk.intervening = true;
                out.record_task(
                    TaskLink {
                        parent: event.encountering_task_id,
                        child: task,
                        child_type: TaskType::Explicit,
                    },
                    event.time,
                );
            }
            EventKind::Enter | EventKind::Leave => {
                if event.region_kind == RegionKind::Undefined {
                    return Err(GraphError::UnsupportedRegionKind {
                        kind: event.region_kind.to_string(),
                        location: Some(location),
                    });
                }

                let opened = walk.match_nesting(event)?;
                let mut vertex = PartialVertex::from_event(event);
                vertex.parallel_key = walk.parallel_key(event, is_last);

                if let Some(enter) = opened {
                    if matches!(event.region_kind, RegionKind::Taskwait | RegionKind::Taskgroup) {
                        vertex.sync_intervals.push(SyncInterval {
                            encountering_task: event.encountering_task_id,
                            enter: enter.time,
                            leave: event.time,
                        });
                    }
                }

                if is_last && kind == RegionKind::ExplicitTask {
                    if let Some(task) = event.unique_id {
                        out.task_leave_timestamps.push((task, event.time));
                    }
                }

                let bridges = walk.bridges(event);
                let current = out.graph.add_vertex(vertex);
                if !bridges {
                    out.graph.add_edge(walk.prior, current);
                }
                walk.prior = current;
                walk.prior_event = event;
                walk.intervening = false;
            }
            EventKind::ThreadBegin | EventKind::ThreadEnd => {}
        }
    }

    if out.graph.vertex_count() == 2 {
        out.graph.edges.clear();
        if kind != RegionKind::ExplicitTask {
            out.graph.add_edge(0, 1);
        }
    }

    Ok(out)
}
