//! Typed event and attribute model
//!
//! Events are produced by a trace adapter (see [`crate::trace_source`]) and are
//! read-only to the reconstruction pipeline. The pipeline only branches on a
//! small fixed set of fields; anything else travels in [`Event::attributes`]
//! and is passed through opaquely to export collaborators.
//!
//! # Identity spaces
//!
//! `unique_id` identifies a *region occurrence* and is stable across every
//! location that observes the same occurrence. Parallel ids, task ids and the
//! auto-generated workshare/sync ids are independent numbering spaces, so a
//! `unique_id` is only meaningful together with its [`RegionKind`].

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identity of a location (thread) in the trace
pub type LocationId = u64;

/// Timestamp, monotonic per location only
pub type Timestamp = u64;

/// Identity of a task (initial, implicit or explicit)
pub type TaskId = u64;

/// Record type of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ThreadBegin,
    ThreadEnd,
    Enter,
    Leave,
    Create,
}

impl EventKind {
    /// Region endpoint carried by this record, if any
    pub fn endpoint(self) -> Option<Endpoint> {
        match self {
            EventKind::Enter => Some(Endpoint::Enter),
            EventKind::Leave => Some(Endpoint::Leave),
            EventKind::Create => Some(Endpoint::Create),
            EventKind::ThreadBegin | EventKind::ThreadEnd => None,
        }
    }

    /// Thread lifecycle records never appear inside chunk boundaries
    pub fn is_thread_lifecycle(self) -> bool {
        matches!(self, EventKind::ThreadBegin | EventKind::ThreadEnd)
    }
}

/// Endpoint of a region event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Enter,
    Leave,
    Create,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Endpoint::Enter => "enter",
            Endpoint::Leave => "leave",
            Endpoint::Create => "create",
        };
        f.write_str(s)
    }
}

/// Kind of instrumented region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Parallel,
    InitialTask,
    ImplicitTask,
    ExplicitTask,
    SingleExecutor,
    SingleOther,
    Loop,
    Taskloop,
    Sections,
    Workshare,
    BarrierImplicit,
    BarrierExplicit,
    Taskwait,
    Taskgroup,
    Undefined,
}

impl RegionKind {
    pub const ALL: [RegionKind; 15] = [
        RegionKind::Parallel,
        RegionKind::InitialTask,
        RegionKind::ImplicitTask,
        RegionKind::ExplicitTask,
        RegionKind::SingleExecutor,
        RegionKind::SingleOther,
        RegionKind::Loop,
        RegionKind::Taskloop,
        RegionKind::Sections,
        RegionKind::Workshare,
        RegionKind::BarrierImplicit,
        RegionKind::BarrierExplicit,
        RegionKind::Taskwait,
        RegionKind::Taskgroup,
        RegionKind::Undefined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionKind::Parallel => "parallel",
            RegionKind::InitialTask => "initial_task",
            RegionKind::ImplicitTask => "implicit_task",
            RegionKind::ExplicitTask => "explicit_task",
            RegionKind::SingleExecutor => "single_executor",
            RegionKind::SingleOther => "single_other",
            RegionKind::Loop => "loop",
            RegionKind::Taskloop => "taskloop",
            RegionKind::Sections => "sections",
            RegionKind::Workshare => "workshare",
            RegionKind::BarrierImplicit => "barrier_implicit",
            RegionKind::BarrierExplicit => "barrier_explicit",
            RegionKind::Taskwait => "taskwait",
            RegionKind::Taskgroup => "taskgroup",
            RegionKind::Undefined => "undefined",
        }
    }

    /// Kinds whose Enter/Leave open and close a chunk
    pub fn defines_chunk(self) -> bool {
        matches!(
            self,
            RegionKind::Parallel
                | RegionKind::ExplicitTask
                | RegionKind::InitialTask
                | RegionKind::SingleExecutor
        )
    }

    pub fn is_single(self) -> bool {
        matches!(self, RegionKind::SingleExecutor | RegionKind::SingleOther)
    }

    /// Synchronisation kinds whose adjacent enter/leave pairs collapse
    pub fn is_pairwise_sync(self) -> bool {
        matches!(
            self,
            RegionKind::BarrierImplicit | RegionKind::BarrierExplicit | RegionKind::Taskwait
        )
    }

    pub fn task_type(self) -> Option<TaskType> {
        match self {
            RegionKind::InitialTask => Some(TaskType::Initial),
            RegionKind::ImplicitTask => Some(TaskType::Implicit),
            RegionKind::ExplicitTask => Some(TaskType::Explicit),
            _ => None,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GraphError::UnsupportedRegionKind {
                kind: s.to_string(),
                location: None,
            })
    }
}

/// Type of a task node in the task tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Initial,
    Implicit,
    Explicit,
}

/// Opaque scalar attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::UInt(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Str(v) => f.write_str(v),
        }
    }
}

/// Attributes the core does not interpret
pub type Attributes = BTreeMap<String, AttrValue>;

/// Immutable trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub location: LocationId,
    pub time: Timestamp,
    pub kind: EventKind,
    pub region_kind: RegionKind,
    /// Region occurrence id (for `Create`: the id of the created task)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<u64>,
    /// Task executing when the event fired; `None` for the undefined task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encountering_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Event {
    pub fn new(
        location: LocationId,
        time: Timestamp,
        kind: EventKind,
        region_kind: RegionKind,
        unique_id: Option<u64>,
        encountering_task_id: Option<TaskId>,
    ) -> Self {
        Self {
            location,
            time,
            kind,
            region_kind,
            unique_id,
            encountering_task_id,
            attributes: Attributes::new(),
        }
    }

    pub fn enter(location: LocationId, time: Timestamp, region_kind: RegionKind, unique_id: u64) -> Self {
        Self::new(location, time, EventKind::Enter, region_kind, Some(unique_id), None)
    }

    pub fn leave(location: LocationId, time: Timestamp, region_kind: RegionKind, unique_id: u64) -> Self {
        Self::new(location, time, EventKind::Leave, region_kind, Some(unique_id), None)
    }

    /// Explicit task creation event for `task`, fired by `parent`
    pub fn create(location: LocationId, time: Timestamp, task: TaskId, parent: TaskId) -> Self {
        Self::new(
            location,
            time,
            EventKind::Create,
            RegionKind::ExplicitTask,
            Some(task),
            Some(parent),
        )
    }

    /// Builder-style setter for the encountering task
    pub fn encountered_by(mut self, task: TaskId) -> Self {
        self.encountering_task_id = Some(task);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.kind.endpoint()
    }

    pub fn is_enter(&self) -> bool {
        self.kind == EventKind::Enter
    }

    pub fn is_leave(&self) -> bool {
        self.kind == EventKind::Leave
    }

    pub fn is_create(&self) -> bool {
        self.kind == EventKind::Create
    }

    pub fn id(&self) -> EventId {
        EventId {
            location: self.location,
            time: self.time,
            kind: self.kind,
            region_kind: self.region_kind,
        }
    }
}

/// Identity of one recorded event, used as a cluster key when the same
/// event is represented by vertices in two chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub location: LocationId,
    pub time: Timestamp,
    pub kind: EventKind,
    pub region_kind: RegionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_kind_round_trips_through_str() {
        for kind in RegionKind::ALL {
            assert_eq!(kind.as_str().parse::<RegionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_region_kind_is_unsupported() {
        let err = "teams".parse::<RegionKind>().unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedRegionKind { ref kind, .. } if kind == "teams"));
    }

    #[test]
    fn test_chunk_defining_kinds() {
        let defining: Vec<_> = RegionKind::ALL
            .iter()
            .copied()
            .filter(|k| k.defines_chunk())
            .collect();
        assert_eq!(
            defining,
            vec![
                RegionKind::Parallel,
                RegionKind::InitialTask,
                RegionKind::ExplicitTask,
                RegionKind::SingleExecutor
            ]
        );
    }

    #[test]
    fn test_thread_lifecycle_has_no_endpoint() {
        assert_eq!(EventKind::ThreadBegin.endpoint(), None);
        assert_eq!(EventKind::Create.endpoint(), Some(Endpoint::Create));
        assert!(EventKind::ThreadEnd.is_thread_lifecycle());
    }

    #[test]
    fn test_event_deserializes_from_json() {
        let json = r#"{"location":1,"time":42,"kind":"enter","region_kind":"taskwait","unique_id":3,"encountering_task_id":7,"attributes":{"cpu":2}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.region_kind, RegionKind::Taskwait);
        assert_eq!(event.encountering_task_id, Some(7));
        assert_eq!(event.attributes.get("cpu"), Some(&AttrValue::Int(2)));
    }
}
