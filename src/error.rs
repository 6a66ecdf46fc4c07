//! Error kinds of the reconstruction pipeline
//!
//! Every error is fatal for the trace as a whole: the pipeline is a batch
//! transform and never returns a partial graph. Each variant carries enough
//! context (location, timestamp, vertex index, task id) to locate the
//! malformed region of the trace.

use crate::event::{LocationId, RegionKind, TaskId, Timestamp};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Unmatched Enter/Leave nesting on one location
    #[error("structural mismatch on location {location} at t={timestamp}: {detail}")]
    StructuralMismatch {
        location: LocationId,
        timestamp: Timestamp,
        detail: String,
    },

    #[error("unsupported region kind '{kind}'{}", fmt_location(.location))]
    UnsupportedRegionKind {
        kind: String,
        location: Option<LocationId>,
    },

    #[error("single region entered by location {location} at t={timestamp} has {executors} executor events (expected 1)")]
    AmbiguousSingleExecutor {
        executors: usize,
        location: LocationId,
        timestamp: Timestamp,
    },

    #[error("vertex {vertex} merged inconsistent {attribute} values: {values}")]
    InconsistentMerge {
        vertex: usize,
        attribute: &'static str,
        values: String,
    },

    #[error("task {task} references unknown parent task {parent}")]
    OrphanTask { task: TaskId, parent: TaskId },

    #[error("{region_kind} vertex {vertex} has no recorded enter partner")]
    MissingSyncPartner {
        vertex: usize,
        region_kind: RegionKind,
    },

    #[error("task {task} is its own ancestor")]
    CyclicTaskTree { task: TaskId },

    /// Graph built from parts with an edge endpoint out of range
    #[error("edge {from} -> {to} names a vertex outside the graph's {vertices} vertices")]
    DanglingEdge {
        from: usize,
        to: usize,
        vertices: usize,
    },
}

fn fmt_location(location: &Option<LocationId>) -> String {
    match location {
        Some(location) => format!(" on location {}", location),
        None => String::new(),
    }
}

impl GraphError {
    pub(crate) fn mismatch(location: LocationId, timestamp: Timestamp, detail: impl Into<String>) -> Self {
        GraphError::StructuralMismatch {
            location,
            timestamp,
            detail: detail.into(),
        }
    }

    /// Attach a location to an `UnsupportedRegionKind` raised while parsing
    pub(crate) fn at_location(self, at: LocationId) -> Self {
        match self {
            GraphError::UnsupportedRegionKind { kind, location: None } => {
                GraphError::UnsupportedRegionKind {
                    kind,
                    location: Some(at),
                }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
