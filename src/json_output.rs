//! JSON output format for execution graphs
//!
//! `--format json` implementation

use crate::event::{RegionKind, TaskId, TaskType, Timestamp};
use crate::execution_graph::{EdgeKind, SyncInterval, VertexEndpoint, VertexId};
use crate::pipeline::PipelineOutput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single execution graph vertex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonVertex {
    pub id: VertexId,
    pub region_kind: RegionKind,
    pub endpoint: VertexEndpoint,
    /// Occurrence id (absent when the contributing events disagree)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<u64>,
    /// Earliest contributing event time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Timestamp>,
    /// Locations that recorded an event for this vertex
    pub locations: Vec<u64>,
    pub event_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_intervals: Vec<SyncInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEdge {
    pub source: VertexId,
    pub target: VertexId,
    pub kind: EdgeKind,
}

/// A task tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTask {
    pub id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,
    pub task_type: TaskType,
    pub creation_timestamp: Timestamp,
    /// Absent for a task never seen to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Timestamp>,
    /// Absent for a task never seen to finish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskId>,
}

/// Summary statistics for the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Per-location chunks by region kind
    pub chunks: BTreeMap<RegionKind, usize>,
    /// Distinct region occurrences by kind
    pub regions: BTreeMap<RegionKind, usize>,
    pub vertices: usize,
    pub edges: usize,
    pub taskwait_edges: usize,
    pub taskgroup_edges: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub vertices: Vec<JsonVertex>,
    pub edges: Vec<JsonEdge>,
    pub tasks: Vec<JsonTask>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create an empty JSON output structure
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "execgraph-json-v1".to_string(),
            vertices: Vec::new(),
            edges: Vec::new(),
            tasks: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    pub fn from_pipeline(output: &PipelineOutput) -> Self {
        let graph = &output.graph;
        let vertices = graph
            .vertices()
            .enumerate()
            .map(|(id, v)| {
                let mut locations: Vec<u64> = v.events.iter().map(|e| e.location).collect();
                locations.sort_unstable();
                locations.dedup();
                JsonVertex {
                    id,
                    region_kind: v.region_kind,
                    endpoint: v.endpoint,
                    unique_id: v.unique_id(),
                    time: v.time,
                    locations,
                    event_count: v.events.len(),
                    sync_intervals: v.sync_intervals.clone(),
                }
            })
            .collect();

        let edges = graph
            .edges()
            .map(|e| JsonEdge {
                source: e.source,
                target: e.target,
                kind: e.kind,
            })
            .collect();

        let tasks = output
            .task_tree
            .nodes()
            .map(|n| JsonTask {
                id: n.id,
                parent: n.parent,
                task_type: n.task_type,
                creation_timestamp: n.creation_timestamp,
                start_timestamp: n.start_timestamp,
                end_timestamp: n.end_timestamp,
                children: n.children.clone(),
            })
            .collect();

        Self {
            vertices,
            edges,
            tasks,
            summary: JsonSummary {
                chunks: output.stats.chunks.clone(),
                regions: output.stats.occurrences.clone(),
                vertices: graph.vertex_count(),
                edges: graph.edge_count(),
                taskwait_edges: output.sync.taskwait_edges,
                taskgroup_edges: output.sync.taskgroup_edges,
            },
            ..Self::new()
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
