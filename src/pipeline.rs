//! End-to-end reconstruction: events → chunks → chunk graphs → execution graph
//!
//! ```text
//! events ─► Chunker ─► build_chunk_graph ─┬─► Assembler ─► ExecutionGraph ─┐
//!                                         └─► task links ─► TaskTree ──────┴─► SyncResolver
//! ```

use crate::assembly::Assembler;
use crate::chunk_graph::build_chunk_graph;
use crate::chunker::{chunks, Chunk};
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::event::{Event, RegionKind, TaskType};
use crate::execution_graph::ExecutionGraph;
use crate::sync::{resolve_synchronisation, SyncSummary};
use crate::task_tree::TaskTree;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use tracing::{debug, info};

/// Chunk counts per region kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkStats {
    /// One per location and region occurrence
    pub chunks: BTreeMap<RegionKind, usize>,
    /// Distinct region occurrences
    pub occurrences: BTreeMap<RegionKind, usize>,
    #[serde(skip)]
    seen: HashSet<(RegionKind, Option<u64>)>,
}

impl ChunkStats {
    pub fn record(&mut self, chunk: &Chunk) {
        let kind = chunk.kind();
        *self.chunks.entry(kind).or_insert(0) += 1;
        if self.seen.insert((kind, chunk.unique_id())) {
            *self.occurrences.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.chunks.values().sum()
    }
}

/// Everything the pipeline produces for one trace
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub graph: ExecutionGraph,
    pub task_tree: TaskTree,
    pub stats: ChunkStats,
    pub sync: SyncSummary,
}

impl PipelineOutput {
    /// Plain-text summary: chunk statistics, vertex/edge counts, task counts
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "chunks: {}", self.stats.total_chunks());
        for (kind, count) in &self.stats.chunks {
            let occurrences = self.stats.occurrences.get(kind).copied().unwrap_or(0);
            let _ = writeln!(out, "  {:<18} {:>6} chunks {:>6} regions", kind, count, occurrences);
        }

        let _ = writeln!(out, "vertices: {}", self.graph.vertex_count());
        for (kind, count) in self.graph.vertex_counts_by_kind() {
            let _ = writeln!(out, "  {:<18} {:>6}", kind, count);
        }

        let _ = writeln!(out, "edges: {}", self.graph.edge_count());
        for (kind, count) in self.graph.edge_counts_by_kind() {
            let _ = writeln!(out, "  {:<18} {:>6}", kind, count);
        }

        let _ = writeln!(out, "tasks: {}", self.task_tree.len());
        for (task_type, count) in self.task_tree.count_by_type() {
            let name = match task_type {
                TaskType::Initial => "initial",
                TaskType::Implicit => "implicit",
                TaskType::Explicit => "explicit",
            };
            let _ = writeln!(out, "  {:<18} {:>6}", name, count);
        }
        out
    }
}

/// Reconstruct the synchronised execution graph of a trace
///
/// `events` must be grouped by location with each location in timestamp
/// order. Any error aborts the whole reconstruction.
pub fn build_execution_graph<I>(events: I, config: &GraphConfig) -> Result<PipelineOutput>
where
    I: IntoIterator<Item = Event>,
{
    let mut stats = ChunkStats::default();
    let mut links = Vec::new();
    let mut created = Vec::new();
    let mut started = Vec::new();
    let mut left = Vec::new();
    let mut chunk_graphs = Vec::new();

    for chunk in chunks(events) {
        let chunk = chunk?;
        stats.record(&chunk);
        let output = build_chunk_graph(&chunk)?;
        links.extend(output.task_links);
        created.extend(output.task_creation_timestamps);
        started.extend(output.task_start_timestamps);
        left.extend(output.task_leave_timestamps);
        chunk_graphs.push(output.graph);
    }
    debug!(chunks = ?stats.chunks, occurrences = ?stats.occurrences, "chunking finished");

    let mut graph = Assembler::new(config).assemble(chunk_graphs)?;
    let task_tree = TaskTree::build(&links, &created, &started, &left)?;
    let sync = resolve_synchronisation(&mut graph, &task_tree, config.containment)?;

    if config.check_dag {
        if let Some(vertex) = graph.find_cycle() {
            let (location, timestamp) = graph
                .vertex(vertex)
                .and_then(|v| v.events.first())
                .map_or((0, 0), |e| (e.location, e.time));
            return Err(GraphError::mismatch(
                location,
                timestamp,
                format!("execution graph has a cycle through vertex {}", vertex),
            ));
        }
    }

    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        tasks = task_tree.len(),
        "execution graph built"
    );

    Ok(PipelineOutput {
        graph,
        task_tree,
        stats,
        sync,
    })
}
