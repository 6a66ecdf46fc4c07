//! Split per-location event streams into nested, region-bounded chunks
//!
//! A chunk is the sub-sequence of one location's events bounded by the Enter
//! and Leave of one chunk-defining region (parallel, initial task, explicit
//! task, single executor). Chunks nest: entering a new chunk-defining region
//! suspends the current chunk on that location's stack and resumes it when
//! the region is left.
//!
//! ```text
//! location 0:  initE  parE  implE  implL  parL  initL
//!
//!   chunk A (parallel):      parE implE implL parL
//!   chunk B (initial_task):  initE parE parL initL     <- parE/parL echoed
//! ```
//!
//! Explicit-task bodies are chunked separately from their creation point:
//! their Enter/Leave are never echoed into the enclosing chunk.
//!
//! The chunker is a lazy [`Iterator`]; it is finite and cannot be restarted
//! without replaying the source.

use crate::error::{GraphError, Result};
use crate::event::{Event, EventKind, LocationId, RegionKind, Timestamp};
use std::collections::BTreeMap;
use std::mem;

/// Ordered events of exactly one location, bounded by one region occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub location: LocationId,
    pub events: Vec<Event>,
}

impl Chunk {
    /// Region kind of the chunk's first (bounding) event
    pub fn kind(&self) -> RegionKind {
        self.events
            .first()
            .map(|e| e.region_kind)
            .unwrap_or(RegionKind::Undefined)
    }

    /// `unique_id` of the bounding region occurrence
    pub fn unique_id(&self) -> Option<u64> {
        self.events.first().and_then(|e| e.unique_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Per-location stack machine state
#[derive(Debug, Default)]
struct LocationCursor {
    current: Vec<Event>,
    stack: Vec<Vec<Event>>,
    last_time: Option<Timestamp>,
}

/// Lazy chunk iterator over an event stream
pub struct Chunker<I> {
    events: I,
    cursors: BTreeMap<LocationId, LocationCursor>,
    finished: bool,
}

/// Chunk an event stream (grouped by location, each in timestamp order)
pub fn chunks<I>(events: I) -> Chunker<I::IntoIter>
where
    I: IntoIterator<Item = Event>,
{
    Chunker::new(events.into_iter())
}

impl<I> Chunker<I>
where
    I: Iterator<Item = Event>,
{
    pub fn new(events: I) -> Self {
        Self {
            events,
            cursors: BTreeMap::new(),
            finished: false,
        }
    }

    fn step(&mut self, event: Event) -> Result<Option<Chunk>> {
        if event.kind.is_thread_lifecycle() {
            return Ok(None);
        }

        let location = event.location;
        let cursor = self.cursors.entry(location).or_default();

        if let Some(last) = cursor.last_time {
            if event.time < last {
                return Err(GraphError::mismatch(
                    location,
                    event.time,
                    format!("timestamp decreases from {} to {}", last, event.time),
                ));
            }
        }
        cursor.last_time = Some(event.time);

        if !event.region_kind.defines_chunk() {
            cursor.current.push(event);
            return Ok(None);
        }

        match event.kind {
            EventKind::Enter => {
                if event.region_kind != RegionKind::ExplicitTask {
                    cursor.current.push(event.clone());
                }
                let parent = mem::replace(&mut cursor.current, vec![event]);
                cursor.stack.push(parent);
                Ok(None)
            }
            EventKind::Leave => {
                let Some(parent) = cursor.stack.pop() else {
                    return Err(GraphError::mismatch(
                        location,
                        event.time,
                        format!("{} leave with no open chunk", event.region_kind),
                    ));
                };

                let opened_by_same_region = cursor.current.first().is_some_and(|first| {
                    first.is_enter()
                        && first.region_kind == event.region_kind
                        && first.unique_id == event.unique_id
                });
                if !opened_by_same_region {
                    return Err(GraphError::mismatch(
                        location,
                        event.time,
                        format!(
                            "{} leave (id {:?}) does not close the open chunk",
                            event.region_kind, event.unique_id
                        ),
                    ));
                }

                let echo = (event.region_kind != RegionKind::ExplicitTask).then(|| event.clone());
                let mut events = mem::replace(&mut cursor.current, parent);
                events.push(event);
                if let Some(echo) = echo {
                    cursor.current.push(echo);
                }

                Ok(Some(Chunk { location, events }))
            }
            _ => {
                // task-create events stay in the creating chunk
                cursor.current.push(event);
                Ok(None)
            }
        }
    }

    fn check_balanced(&self) -> Result<()> {
        for (&location, cursor) in &self.cursors {
            if !cursor.stack.is_empty() {
                let innermost = cursor
                    .current
                    .first()
                    .map(|e| format!("{} {:?}", e.region_kind, e.unique_id))
                    .unwrap_or_default();
                return Err(GraphError::mismatch(
                    location,
                    cursor.last_time.unwrap_or_default(),
                    format!(
                        "{} chunk(s) left open at end of stream (innermost: {})",
                        cursor.stack.len(),
                        innermost
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl<I> Iterator for Chunker<I>
where
    I: Iterator<Item = Event>,
{
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let Some(event) = self.events.next() else {
                self.finished = true;
                return self.check_balanced().err().map(Err);
            };

            match self.step(event) {
                Ok(Some(chunk)) => return Some(Ok(chunk)),
                Ok(None) => continue,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
