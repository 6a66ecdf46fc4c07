//! Graphviz DOT output format for execution graphs
//!
//! `--format dot` implementation

use crate::event::RegionKind;
use crate::execution_graph::{EdgeKind, ExecutionGraph, Vertex, VertexEndpoint};
use std::fmt::Write as _;

fn dot_shape(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Parallel | RegionKind::Taskgroup => "hexagon",
        RegionKind::Taskwait => "octagon",
        RegionKind::Taskloop => "circle",
        RegionKind::SingleExecutor => "diamond",
        RegionKind::InitialTask | RegionKind::ExplicitTask => "ellipse",
        _ => "box",
    }
}

fn dot_fill(vertex: &Vertex) -> Option<&'static str> {
    if vertex.region_kind != RegionKind::ExplicitTask {
        return None;
    }
    match vertex.endpoint {
        VertexEndpoint::Enter | VertexEndpoint::Create => Some("limegreen"),
        VertexEndpoint::Leave => Some("lightblue"),
        VertexEndpoint::EnterLeave => Some("khaki"),
    }
}

fn edge_color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Sequence => "black",
        EdgeKind::Taskwait => "red",
        EdgeKind::Taskgroup => "green",
    }
}

/// Short label: abbreviation for sync/workshare kinds, otherwise the id
fn dot_label(vertex: &Vertex) -> String {
    let abbreviation = match vertex.region_kind {
        RegionKind::Taskwait => Some("tw"),
        RegionKind::Taskgroup => Some("tg"),
        RegionKind::Taskloop => Some("tl"),
        RegionKind::BarrierImplicit => Some("ib"),
        RegionKind::BarrierExplicit => Some("eb"),
        RegionKind::SingleExecutor => Some("sn"),
        RegionKind::Loop => Some("lp"),
        RegionKind::Sections => Some("sc"),
        RegionKind::Workshare => Some("ws"),
        _ => None,
    };
    match (abbreviation, vertex.unique_id()) {
        (Some(abbreviation), _) => abbreviation.to_string(),
        (None, Some(id)) => id.to_string(),
        (None, None) => escape_dot(vertex.region_kind.as_str()),
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the graph as a Graphviz DOT string
pub fn to_dot(graph: &ExecutionGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph execution {\n");
    out.push_str("  node [fontname=\"Helvetica\", fontsize=10];\n");
    out.push('\n');

    for (id, vertex) in graph.vertices().enumerate() {
        let fill = dot_fill(vertex)
            .map(|color| format!(" style=filled fillcolor=\"{}\"", color))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  n{} [label=\"{}\" shape={} region=\"{}\" endpoint=\"{:?}\"{}];",
            id,
            dot_label(vertex),
            dot_shape(vertex.region_kind),
            vertex.region_kind,
            vertex.endpoint,
            fill,
        );
    }

    out.push('\n');

    for edge in graph.edges() {
        let _ = writeln!(
            out,
            "  n{} -> n{} [color=\"{}\"];",
            edge.source,
            edge.target,
            edge_color(edge.kind),
        );
    }

    out.push_str("}\n");
    out
}
