//! Graph assembly: union of chunk graphs, contraction, cleanup
//!
//! # Pipeline
//!
//! ```text
//! chunk graphs ──► disjoint union ──► pass 1..5 ──► unwrap ──► simplify
//!                                                                 │
//!                          redundant task edges ◄── degenerate pairs
//! ```
//!
//! Each contraction pass labels vertices with cluster ids and replaces every
//! cluster by one vertex (see [`clusters`]). Passes never see the cluster ids
//! of a previous pass; each owns its own id counter.

mod cleanup;
mod clusters;
mod partial;
mod passes;


pub use partial::{EndpointClass, ParallelKey, ParallelSlot, PartialGraph, PartialVertex};

use crate::config::GraphConfig;
use crate::error::Result;
use crate::execution_graph::ExecutionGraph;
use tracing::{debug, info};

/// Runs the contraction passes and final cleanups over a partial graph
#[derive(Debug, Clone)]
pub struct Assembler {
    collapse_degenerate_pairs: bool,
}

impl Assembler {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            collapse_degenerate_pairs: config.collapse_degenerate_pairs,
        }
    }

    /// Assemble chunk graphs into an (unsynchronised) execution graph
    pub fn assemble<I>(&self, chunk_graphs: I) -> Result<ExecutionGraph>
    where
        I: IntoIterator<Item = PartialGraph>,
    {
        let union = PartialGraph::disjoint_union(chunk_graphs);
        info!(
            vertices = union.vertex_count(),
            edges = union.edge_count(),
            "assembling chunk graphs"
        );
        let contracted = contract(union)?;
        self.finish(contracted)
    }

    /// Unwrap a contracted graph and apply the cleanups
    pub fn finish(&self, contracted: PartialGraph) -> Result<ExecutionGraph> {
        let mut graph = cleanup::unwrap_graph(contracted)?;
        if self.collapse_degenerate_pairs {
            cleanup::collapse_degenerate_pairs(&mut graph);
        }
        let removed = cleanup::remove_redundant_task_edges(&mut graph);
        debug!(removed, "redundant task edges");
        Ok(graph)
    }
}

/// Apply the five contraction passes in order
pub fn contract(graph: PartialGraph) -> Result<PartialGraph> {
    passes::run_all(graph)
}
