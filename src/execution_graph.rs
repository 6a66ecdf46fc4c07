//! Assembled execution graph exposed to analysis and export collaborators
//!
//! # Node Representation
//!
//! - Each vertex stands for one logical occurrence of a region endpoint,
//!   possibly observed by several locations (its contributing events)
//! - `VertexId` is the vertex's node index in the underlying petgraph
//!   graph; identity is index-based, never a pointer cycle
//!
//! # Edge Representation
//!
//! Edges are directed and tagged:
//! - **Sequence**: program order within a chunk, as reconstructed
//! - **Taskwait**: task leave → taskwait it may have delayed
//! - **Taskgroup**: descendant task leave → end of the enclosing taskgroup
//!
//! After synchronisation edges are added the graph is a DAG.

use crate::error::{GraphError, Result};
use crate::event::{Event, RegionKind, TaskId, Timestamp};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub type VertexId = usize;

/// Endpoint of a vertex after contraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexEndpoint {
    Enter,
    Leave,
    /// Creation point of a task whose body was never observed
    Create,
    /// Enter and Leave of the same occurrence collapsed into one vertex
    EnterLeave,
}

impl VertexEndpoint {
    pub fn has_enter(self) -> bool {
        matches!(self, VertexEndpoint::Enter | VertexEndpoint::EnterLeave)
    }

    pub fn has_leave(self) -> bool {
        matches!(self, VertexEndpoint::Leave | VertexEndpoint::EnterLeave)
    }
}

/// Enter/leave interval of a synchronisation region seen by one encountering task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncInterval {
    pub encountering_task: Option<TaskId>,
    pub enter: Timestamp,
    pub leave: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub region_kind: RegionKind,
    pub endpoint: VertexEndpoint,
    /// Distinct occurrence ids of the contributing events
    pub unique_ids: Vec<u64>,
    /// Earliest contributing event time
    pub time: Option<Timestamp>,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync_intervals: Vec<SyncInterval>,
}

impl Vertex {
    /// The occurrence id, when all contributing events agree on one
    pub fn unique_id(&self) -> Option<u64> {
        match self.unique_ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Explicit task this vertex belongs to, if any
    pub fn task_id(&self) -> Option<TaskId> {
        if self.region_kind == RegionKind::ExplicitTask {
            self.unique_id()
        } else {
            None
        }
    }

    pub(crate) fn absorb(&mut self, other: Vertex) {
        for id in other.unique_ids {
            if !self.unique_ids.contains(&id) {
                self.unique_ids.push(id);
            }
        }
        self.unique_ids.sort_unstable();
        self.time = match (self.time, other.time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.events.extend(other.events);
        self.sync_intervals.extend(other.sync_intervals);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Sequence,
    Taskwait,
    Taskgroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub kind: EdgeKind,
}

/// Assembled, synchronised execution graph
///
/// Stored as a petgraph [`DiGraph`] whose node index is the [`VertexId`].
/// Structural edits rebuild the graph, so ids stay dense and surviving
/// edges keep their relative order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionGraph {
    graph: DiGraph<Vertex, EdgeKind>,
}

fn node(id: VertexId) -> NodeIndex {
    NodeIndex::new(id)
}

fn to_edge(edge: &petgraph::graph::Edge<EdgeKind>) -> Edge {
    Edge {
        source: edge.source().index(),
        target: edge.target().index(),
        kind: edge.weight,
    }
}

impl ExecutionGraph {
    /// Build a graph from its parts; every edge must join two of `vertices`
    pub fn new(vertices: Vec<Vertex>, edges: Vec<Edge>) -> Result<Self> {
        let count = vertices.len();
        if let Some(edge) = edges.iter().find(|e| e.source >= count || e.target >= count) {
            return Err(GraphError::DanglingEdge {
                from: edge.source,
                to: edge.target,
                vertices: count,
            });
        }

        let mut graph = DiGraph::with_capacity(count, edges.len());
        for vertex in vertices {
            graph.add_node(vertex);
        }
        for edge in edges {
            graph.add_edge(node(edge.source), node(edge.target), edge.kind);
        }
        Ok(Self { graph })
    }

    /// Vertices in id order
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.graph.raw_nodes().iter().map(|n| &n.weight)
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl ExactSizeIterator<Item = Edge> + '_ {
        self.graph.raw_edges().iter().map(to_edge)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.graph.node_weight(node(id))
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Targets of the outgoing edges of `id`, in edge order
    pub fn successors(&self, id: VertexId) -> Vec<VertexId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Sources of the incoming edges of `id`, in edge order
    pub fn predecessors(&self, id: VertexId) -> Vec<VertexId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: VertexId, direction: Direction) -> Vec<VertexId> {
        let mut found: Vec<VertexId> = self
            .graph
            .neighbors_directed(node(id), direction)
            .map(|n| n.index())
            .collect();
        // petgraph walks a vertex's edge list newest first
        found.reverse();
        found
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.graph
            .neighbors_directed(node(id), Direction::Outgoing)
            .count()
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.graph
            .neighbors_directed(node(id), Direction::Incoming)
            .count()
    }

    /// Out-degree of every vertex, indexed by id
    pub fn out_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertex_count()];
        for edge in self.graph.raw_edges() {
            degrees[edge.source().index()] += 1;
        }
        degrees
    }

    /// In-degree of every vertex, indexed by id
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertex_count()];
        for edge in self.graph.raw_edges() {
            degrees[edge.target().index()] += 1;
        }
        degrees
    }

    pub fn find_edge(&self, source: VertexId, target: VertexId) -> Option<Edge> {
        let index = self.graph.find_edge(node(source), node(target))?;
        self.graph.edge_weight(index).map(|&kind| Edge {
            source,
            target,
            kind,
        })
    }

    /// Ids of all vertices of one region kind
    pub fn vertices_of_kind(&self, kind: RegionKind) -> Vec<VertexId> {
        self.vertices()
            .enumerate()
            .filter(|(_, v)| v.region_kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn vertex_counts_by_kind(&self) -> BTreeMap<RegionKind, usize> {
        let mut counts = BTreeMap::new();
        for v in self.vertices() {
            *counts.entry(v.region_kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn edge_counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.graph.raw_edges() {
            let name = match edge.weight {
                EdgeKind::Sequence => "sequence",
                EdgeKind::Taskwait => "taskwait",
                EdgeKind::Taskgroup => "taskgroup",
            };
            *counts.entry(name).or_insert(0) += 1;
        }
        counts
    }

    /// Leave-side vertex of every explicit task in the graph
    pub fn task_leave_index(&self) -> BTreeMap<TaskId, VertexId> {
        let mut index = BTreeMap::new();
        for (id, v) in self.vertices().enumerate() {
            if let Some(task) = v.task_id() {
                if v.endpoint.has_leave() {
                    index.entry(task).or_insert(id);
                }
            }
        }
        index
    }

    /// Add an edge unless one already joins the same pair; an existing edge
    /// is retagged with `kind`. Returns `true` when a new edge was added.
    pub(crate) fn add_edge(&mut self, source: VertexId, target: VertexId, kind: EdgeKind) -> bool {
        let (a, b) = (node(source), node(target));
        if let Some(index) = self.graph.find_edge(a, b) {
            self.graph[index] = kind;
            return false;
        }
        self.graph.add_edge(a, b, kind);
        true
    }

    /// Drop self-loops and duplicate parallel edges, keeping the first
    pub(crate) fn simplify(&mut self) {
        let (slots, edges) = self.take_parts();
        self.assemble(slots, edges);
    }

    pub(crate) fn retain_edges(&mut self, mut keep: impl FnMut(&Edge) -> bool) {
        let (slots, edges) = self.take_parts();
        self.assemble(slots, edges.into_iter().filter(|e| keep(e)));
    }

    /// Fold each `(survivor, absorbed)` pair into the survivor
    ///
    /// The absorbed vertex's edges move to the survivor; edges that become
    /// self-loops or repeat an earlier edge are dropped. Remaining ids are
    /// renumbered densely in their previous order.
    pub(crate) fn fold_vertices(
        &mut self,
        pairs: &[(VertexId, VertexId)],
        mut fold: impl FnMut(&mut Vertex, Vertex),
    ) {
        if pairs.is_empty() {
            return;
        }
        let (mut slots, edges) = self.take_parts();
        let mut owner: Vec<VertexId> = (0..slots.len()).collect();

        for &(survivor, absorbed) in pairs {
            let untouched = |id: VertexId| owner.get(id) == Some(&id);
            if survivor == absorbed || !untouched(survivor) || !untouched(absorbed) {
                continue;
            }
            let Some(vertex) = slots[absorbed].take() else {
                continue;
            };
            if let Some(kept) = slots[survivor].as_mut() {
                fold(kept, vertex);
            }
            owner[absorbed] = survivor;
        }

        let resolve = |mut id: VertexId| {
            while owner[id] != id {
                id = owner[id];
            }
            id
        };
        let moved: Vec<Edge> = edges
            .into_iter()
            .map(|e| Edge {
                source: resolve(e.source),
                target: resolve(e.target),
                kind: e.kind,
            })
            .collect();
        self.assemble(slots, moved);
    }

    fn take_parts(&mut self) -> (Vec<Option<Vertex>>, Vec<Edge>) {
        let (nodes, edges) = std::mem::take(&mut self.graph).into_nodes_edges();
        let edges = edges.iter().map(to_edge).collect();
        (nodes.into_iter().map(|n| Some(n.weight)).collect(), edges)
    }

    /// Reassemble from index-aligned vertex slots; edges touching an empty
    /// slot, self-loops and repeats of an earlier edge are dropped
    fn assemble(&mut self, slots: Vec<Option<Vertex>>, edges: impl IntoIterator<Item = Edge>) {
        let mut graph = DiGraph::with_capacity(slots.len(), 0);
        let mut renumber: Vec<Option<NodeIndex>> = vec![None; slots.len()];
        for (old, slot) in slots.into_iter().enumerate() {
            if let Some(vertex) = slot {
                renumber[old] = Some(graph.add_node(vertex));
            }
        }

        let mut seen = HashSet::new();
        for edge in edges {
            let source = renumber.get(edge.source).copied().flatten();
            let target = renumber.get(edge.target).copied().flatten();
            let (Some(a), Some(b)) = (source, target) else {
                continue;
            };
            if a != b && seen.insert((a, b)) {
                graph.add_edge(a, b, edge.kind);
            }
        }
        self.graph = graph;
    }

    /// Some vertex on a directed cycle, if the graph is not a DAG
    pub fn find_cycle(&self) -> Option<VertexId> {
        toposort(&self.graph, None)
            .err()
            .map(|cycle| cycle.node_id().index())
    }

    pub fn is_dag(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }
}
