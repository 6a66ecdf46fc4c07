//! JSON Lines trace adapter
//!
//! Reads region definitions and events, one JSON object per line:
//!
//! ```text
//! {"record":"region","ref":3,"name":"explicit task 7","role":"task"}
//! {"record":"event","location":0,"time":120,"kind":"enter","region_ref":3,"encountering_task_id":1}
//! {"record":"event","location":1,"time":130,"kind":"create","region_kind":"explicit_task","unique_id":8}
//! ```
//!
//! An event names its region either directly (`region_kind`, `unique_id`) or
//! through a region definition (`region_ref`). Region names of the form
//! `"<type> task <id>"` and `"<n>-th parallel region <id>"` carry the
//! occurrence id; any other region is classified by its `role`.
//!
//! Keys the adapter does not interpret become opaque event attributes.

use crate::error::GraphError;
use crate::event::{AttrValue, Attributes, Event, EventKind, RegionKind, TaskId};
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Encountering-task value meaning "no task"
pub const UNDEFINED_TASK: u64 = u64::MAX;

/// Reference of a region definition
pub type RegionRef = u32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionDefinition {
    #[serde(rename = "ref")]
    pub reference: RegionRef,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

fn task_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(initial|implicit|explicit) task (\d+)$").ok())
        .as_ref()
}

fn parallel_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+-th parallel region (\d+)$").ok())
        .as_ref()
}

/// Region kind and occurrence id encoded in a region name
pub fn parse_region_name(name: &str) -> Option<(RegionKind, u64)> {
    if let Some(caps) = task_name_pattern()?.captures(name) {
        let kind = match &caps[1] {
            "initial" => RegionKind::InitialTask,
            "implicit" => RegionKind::ImplicitTask,
            _ => RegionKind::ExplicitTask,
        };
        return caps[2].parse().ok().map(|id| (kind, id));
    }
    let caps = parallel_name_pattern()?.captures(name)?;
    caps[1].parse().ok().map(|id| (RegionKind::Parallel, id))
}

/// Region definitions keyed by reference
#[derive(Debug, Default)]
pub struct RegionTable {
    regions: HashMap<RegionRef, RegionDefinition>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: RegionDefinition) -> Result<()> {
        if self.regions.contains_key(&definition.reference) {
            bail!("region ref {} is already defined", definition.reference);
        }
        self.regions.insert(definition.reference, definition);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region kind and (when the name carries one) occurrence id
    pub fn classify(&self, reference: RegionRef) -> Result<(RegionKind, Option<u64>)> {
        let definition = self
            .regions
            .get(&reference)
            .ok_or_else(|| anyhow!("unknown region ref {}", reference))?;
        if let Some((kind, id)) = parse_region_name(&definition.name) {
            return Ok((kind, Some(id)));
        }
        let kind = definition.role.parse::<RegionKind>()?;
        Ok((kind, None))
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    location: u64,
    time: u64,
    kind: EventKind,
    #[serde(default)]
    region_kind: Option<String>,
    #[serde(default)]
    region_ref: Option<RegionRef>,
    #[serde(default)]
    unique_id: Option<u64>,
    #[serde(default)]
    encountering_task_id: Option<TaskId>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Incremental reader state
#[derive(Debug, Default)]
pub struct TraceReader {
    regions: RegionTable,
    events: Vec<Event>,
}

impl TraceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line; blank lines are ignored
    pub fn read_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let mut object: Map<String, Value> = serde_json::from_str(line).context("invalid JSON")?;
        let record = match object.remove("record") {
            Some(Value::String(record)) => record,
            Some(other) => bail!("record type must be a string, got {}", other),
            None => bail!("missing \"record\" key"),
        };

        match record.as_str() {
            "region" => {
                let definition: RegionDefinition = serde_json::from_value(Value::Object(object))
                    .context("invalid region definition")?;
                self.regions.insert(definition)
            }
            "event" => {
                let raw: RawEvent =
                    serde_json::from_value(Value::Object(object)).context("invalid event")?;
                let event = self.resolve(raw)?;
                self.events.push(event);
                Ok(())
            }
            other => bail!("unknown record type \"{}\"", other),
        }
    }

    fn resolve(&self, raw: RawEvent) -> Result<Event> {
        let (region_kind, named_id) = match (&raw.region_kind, raw.region_ref) {
            (Some(kind), _) => (
                kind.parse::<RegionKind>()
                    .map_err(|e| e.at_location(raw.location))?,
                None,
            ),
            (None, Some(reference)) => self
                .regions
                .classify(reference)
                .map_err(|e| match e.downcast::<GraphError>() {
                    Ok(graph_error) => anyhow::Error::new(graph_error.at_location(raw.location)),
                    Err(other) => other,
                })?,
            (None, None) if raw.kind.is_thread_lifecycle() => (RegionKind::Undefined, None),
            (None, None) => bail!("{:?} event names no region", raw.kind),
        };

        let encountering_task_id = raw.encountering_task_id.filter(|&t| t != UNDEFINED_TASK);

        Ok(Event {
            location: raw.location,
            time: raw.time,
            kind: raw.kind,
            region_kind,
            unique_id: raw.unique_id.or(named_id),
            encountering_task_id,
            attributes: scalar_attributes(&raw.extra),
        })
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Events grouped by location, each location in its recorded order
    pub fn finish(self) -> Vec<Event> {
        let mut events = self.events;
        events.sort_by_key(|e| e.location);
        events
    }
}

/// Parse a whole JSON Lines trace
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<Event>> {
    let mut trace = TraceReader::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        trace
            .read_line(&line)
            .with_context(|| format!("line {}", index + 1))?;
    }
    debug!(regions = trace.regions().len(), "region definitions read");
    Ok(trace.finish())
}

/// Load a JSON Lines trace file
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open trace file: {}", path.display()))?;
    parse_events(BufReader::new(file))
        .with_context(|| format!("Failed to parse trace file: {}", path.display()))
}

/// Build an attribute value from a scalar JSON value
pub fn attribute_from_json(value: &Value) -> Option<AttrValue> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        scalar => serde_json::from_value(scalar.clone()).ok(),
    }
}

/// Scalar extra keys of an event record; nested values are dropped
fn scalar_attributes(extra: &Map<String, Value>) -> Attributes {
    extra
        .iter()
        .filter_map(|(key, value)| attribute_from_json(value).map(|v| (key.clone(), v)))
        .collect()
}
