//! Working graph representation used before contraction completes
//!
//! Every attribute that the merge rules combine is held as a list so that a
//! contracted vertex keeps one entry per contributing chunk vertex.

use crate::event::{Endpoint, Event, EventId, RegionKind, TaskId, Timestamp};
use crate::execution_graph::SyncInterval;

/// Slot of a parallel-region vertex inside the region's chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParallelSlot {
    /// The region's own Enter or Leave, or a nested region seen from outside
    Boundary(Endpoint),
    /// n-th vertex between the bounding events
    Position(usize),
}

/// Key that identifies corresponding vertices across a parallel region's chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParallelKey {
    pub parallel_id: u64,
    pub slot: ParallelSlot,
}

impl ParallelKey {
    pub fn boundary(parallel_id: u64, endpoint: Endpoint) -> Self {
        Self {
            parallel_id,
            slot: ParallelSlot::Boundary(endpoint),
        }
    }

    pub fn position(parallel_id: u64, n: usize) -> Self {
        Self {
            parallel_id,
            slot: ParallelSlot::Position(n),
        }
    }
}

/// Side of an explicit task a vertex stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointClass {
    /// Enter or Create endpoints only
    Enter,
    Leave,
    Both,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialVertex {
    pub region_kinds: Vec<RegionKind>,
    pub endpoints: Vec<Endpoint>,
    pub unique_ids: Vec<u64>,
    pub events: Vec<Event>,
    pub sync_intervals: Vec<SyncInterval>,
    pub parallel_key: Option<ParallelKey>,
    /// Earliest contributing event time
    pub time: Option<Timestamp>,
}

impl PartialVertex {
    pub fn from_event(event: &Event) -> Self {
        Self {
            region_kinds: vec![event.region_kind],
            endpoints: event.endpoint().into_iter().collect(),
            unique_ids: event.unique_id.into_iter().collect(),
            events: vec![event.clone()],
            sync_intervals: Vec::new(),
            parallel_key: None,
            time: Some(event.time),
        }
    }

    /// Stand-in for the leave side of a created task; carries no events
    pub fn task_placeholder(task: TaskId) -> Self {
        Self {
            region_kinds: vec![RegionKind::ExplicitTask],
            endpoints: vec![Endpoint::Leave],
            unique_ids: vec![task],
            ..Self::default()
        }
    }

    pub fn has_kind(&self, kind: RegionKind) -> bool {
        self.region_kinds.contains(&kind)
    }

    /// The region kind when all contributions agree
    pub fn sole_kind(&self) -> Option<RegionKind> {
        let (first, rest) = self.region_kinds.split_first()?;
        rest.iter().all(|k| k == first).then_some(*first)
    }

    pub fn only_endpoint(&self, endpoint: Endpoint) -> bool {
        !self.endpoints.is_empty() && self.endpoints.iter().all(|e| *e == endpoint)
    }

    pub fn endpoint_class(&self) -> Option<EndpointClass> {
        let enter = self
            .endpoints
            .iter()
            .any(|e| matches!(e, Endpoint::Enter | Endpoint::Create));
        let leave = self.endpoints.contains(&Endpoint::Leave);
        match (enter, leave) {
            (true, true) => Some(EndpointClass::Both),
            (true, false) => Some(EndpointClass::Enter),
            (false, true) => Some(EndpointClass::Leave),
            (false, false) => None,
        }
    }

    /// Task id and side for vertices belonging to exactly one explicit task
    pub fn task_key(&self) -> Option<(TaskId, EndpointClass)> {
        if !self.has_kind(RegionKind::ExplicitTask) {
            return None;
        }
        match self.unique_ids.as_slice() {
            [task] => Some((*task, self.endpoint_class()?)),
            _ => None,
        }
    }

    /// Distinct single-executor events among the contributing events
    pub fn executor_events(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self
            .events
            .iter()
            .filter(|e| e.region_kind == RegionKind::SingleExecutor)
            .map(Event::id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Graph under construction; edges are plain ordered pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialGraph {
    pub vertices: Vec<PartialVertex>,
    pub edges: Vec<(usize, usize)>,
}

impl PartialGraph {
    pub fn add_vertex(&mut self, vertex: PartialVertex) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    pub fn add_edge(&mut self, source: usize, target: usize) {
        self.edges.push((source, target));
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn out_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertices.len()];
        for &(s, _) in &self.edges {
            degrees[s] += 1;
        }
        degrees
    }

    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertices.len()];
        for &(_, t) in &self.edges {
            degrees[t] += 1;
        }
        degrees
    }

    /// Disjoint union, renumbering each graph's vertices after the previous ones
    pub fn disjoint_union<I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = PartialGraph>,
    {
        let mut union = PartialGraph::default();
        for graph in graphs {
            let offset = union.vertices.len();
            union.vertices.extend(graph.vertices);
            union
                .edges
                .extend(graph.edges.into_iter().map(|(s, t)| (s + offset, t + offset)));
        }
        union
    }
}
