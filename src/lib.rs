//! execgraph - Execution graph reconstruction from parallel region/task traces
//!
//! This library rebuilds the structural execution graph of a parallel
//! program run from per-location region enter/leave and task-create events:
//! vertices are region endpoints merged across the locations that observed
//! them, edges are program order plus taskwait and taskgroup dependencies.

pub mod assembly;
pub mod chunk_graph;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod dot_output;
pub mod error;
pub mod event;
pub mod execution_graph;
pub mod json_output;
pub mod pipeline;
pub mod sync;
pub mod task_tree;
pub mod trace_source;

pub use config::{Containment, GraphConfig};
pub use error::{GraphError, Result};
pub use event::{Event, EventKind, RegionKind, TaskType};
pub use execution_graph::{Edge, EdgeKind, ExecutionGraph, Vertex, VertexEndpoint};
pub use pipeline::{build_execution_graph, PipelineOutput};
