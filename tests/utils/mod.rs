// Integration test utilities
//
// Trace builders shared by the pipeline, property and CLI tests

#![allow(dead_code)]

use execgraph::event::{Event, RegionKind};

pub const INITIAL_TASK: u64 = 1;
pub const PARALLEL: u64 = 10;
pub const BARRIER: u64 = 30;
pub const TASKWAIT: u64 = 40;
pub const SINGLE: u64 = 50;
pub const FIRST_EXPLICIT_TASK: u64 = 1000;

pub fn enter(location: u64, time: u64, kind: RegionKind, id: u64) -> Event {
    Event::enter(location, time, kind, id)
}

pub fn leave(location: u64, time: u64, kind: RegionKind, id: u64) -> Event {
    Event::leave(location, time, kind, id)
}

/// Implicit task id of a location in the generated parallel region
pub fn implicit_task(location: u64) -> u64 {
    100 + location
}

/// Every location runs an empty implicit task inside one parallel region
pub fn trivial_parallel(locations: u64) -> Vec<Event> {
    let mut events = vec![enter(0, 1, RegionKind::InitialTask, INITIAL_TASK)];
    for loc in 0..locations {
        events.push(enter(loc, 2, RegionKind::Parallel, PARALLEL));
        events.push(
            enter(loc, 3, RegionKind::ImplicitTask, implicit_task(loc)).encountered_by(INITIAL_TASK),
        );
        events.push(leave(loc, 4, RegionKind::ImplicitTask, implicit_task(loc)));
        events.push(leave(loc, 5, RegionKind::Parallel, PARALLEL));
        if loc == 0 {
            events.push(leave(0, 6, RegionKind::InitialTask, INITIAL_TASK));
        }
    }
    events
}

/// Initial task creates task 7 at t=2 and waits at `wait_at`; location 1
/// runs the task from t=4 to `task_end`
pub fn taskwait_trace(wait_at: u64, task_end: u64) -> Vec<Event> {
    vec![
        enter(0, 1, RegionKind::InitialTask, INITIAL_TASK),
        Event::create(0, 2, 7, INITIAL_TASK),
        enter(0, wait_at, RegionKind::Taskwait, TASKWAIT).encountered_by(INITIAL_TASK),
        leave(0, wait_at + 1, RegionKind::Taskwait, TASKWAIT).encountered_by(INITIAL_TASK),
        leave(0, wait_at + 2, RegionKind::InitialTask, INITIAL_TASK),
        enter(1, 4, RegionKind::ExplicitTask, 7),
        enter(1, 5, RegionKind::Loop, 60),
        leave(1, 6, RegionKind::Loop, 60),
        leave(1, task_end, RegionKind::ExplicitTask, 7),
    ]
}

/// Initial task creates `tasks` tasks and then waits for all of them;
/// location 1 runs each task with one loop inside
pub fn fan_in_trace(tasks: u64) -> Vec<Event> {
    let wait_at = tasks + 2;
    let mut events = vec![enter(0, 1, RegionKind::InitialTask, INITIAL_TASK)];
    for i in 0..tasks {
        events.push(Event::create(0, 2 + i, FIRST_EXPLICIT_TASK + i, INITIAL_TASK));
    }
    events.push(enter(0, wait_at, RegionKind::Taskwait, TASKWAIT).encountered_by(INITIAL_TASK));
    events.push(leave(0, 5 * tasks + 10, RegionKind::Taskwait, TASKWAIT).encountered_by(INITIAL_TASK));
    events.push(leave(0, 5 * tasks + 11, RegionKind::InitialTask, INITIAL_TASK));

    for i in 0..tasks {
        let task = FIRST_EXPLICIT_TASK + i;
        let start = wait_at + 1 + 4 * i;
        events.push(enter(1, start, RegionKind::ExplicitTask, task));
        events.push(enter(1, start + 1, RegionKind::Loop, 60));
        events.push(leave(1, start + 2, RegionKind::Loop, 60));
        events.push(leave(1, start + 3, RegionKind::ExplicitTask, task));
    }
    events
}

/// Shape of one generated fork/join run
#[derive(Debug, Clone)]
pub struct ForkJoin {
    pub locations: u64,
    /// Per task: `true` if it finishes before the taskwait
    pub early: Vec<bool>,
    pub taskwait: bool,
}

impl ForkJoin {
    pub fn task_id(i: usize) -> u64 {
        FIRST_EXPLICIT_TASK + i as u64
    }

    fn creation_time(i: usize) -> u64 {
        100 + 10 * i as u64
    }

    pub fn taskwait_time(&self) -> u64 {
        100 + 10 * self.early.len() as u64 + 5
    }

    /// Location that runs task `i`; early tasks never run on the creator
    pub fn runner(&self, i: usize) -> u64 {
        if self.early[i] {
            1 + (i as u64 % (self.locations - 1))
        } else {
            i as u64 % self.locations
        }
    }

    /// Tasks still pending when the taskwait is entered
    pub fn late_tasks(&self) -> Vec<u64> {
        (0..self.early.len())
            .filter(|&i| !self.early[i])
            .map(Self::task_id)
            .collect()
    }

    /// Location 0 executes a single construct that creates every task and
    /// optionally waits for them; early tasks run on other locations inside
    /// their single_other region, late tasks inside the closing barrier.
    pub fn events(&self) -> Vec<Event> {
        assert!(self.locations >= 1);
        assert!(self.locations > 1 || self.early.iter().all(|e| !e));

        let t_wait = self.taskwait_time();
        let single_end = t_wait + 3;
        let barrier_enter = t_wait + 10;
        let barrier_leave = 5000;

        let mut per_location: Vec<Vec<Event>> = Vec::new();
        let mut late_clock = 1000;

        for loc in 0..self.locations {
            let implicit = implicit_task(loc);
            let mut events = Vec::new();
            if loc == 0 {
                events.push(enter(0, 1, RegionKind::InitialTask, INITIAL_TASK));
            }
            events.push(enter(loc, 2, RegionKind::Parallel, PARALLEL));
            events.push(enter(loc, 3, RegionKind::ImplicitTask, implicit).encountered_by(INITIAL_TASK));

            if loc == 0 {
                events.push(enter(0, 4, RegionKind::SingleExecutor, SINGLE));
                for i in 0..self.early.len() {
                    events.push(Event::create(0, Self::creation_time(i), Self::task_id(i), implicit));
                }
                if self.taskwait {
                    events.push(enter(0, t_wait, RegionKind::Taskwait, TASKWAIT).encountered_by(implicit));
                    events.push(
                        leave(0, t_wait + 2, RegionKind::Taskwait, TASKWAIT).encountered_by(implicit),
                    );
                }
                events.push(leave(0, single_end, RegionKind::SingleExecutor, SINGLE));
            } else {
                events.push(enter(loc, 4, RegionKind::SingleOther, SINGLE));
                for i in 0..self.early.len() {
                    if self.early[i] && self.runner(i) == loc {
                        let start = Self::creation_time(i) + 1;
                        events.push(enter(loc, start, RegionKind::ExplicitTask, Self::task_id(i)));
                        events.push(leave(loc, start + 1, RegionKind::ExplicitTask, Self::task_id(i)));
                    }
                }
                events.push(leave(loc, single_end, RegionKind::SingleOther, SINGLE));
            }

            events.push(enter(loc, barrier_enter, RegionKind::BarrierImplicit, BARRIER));
            for i in 0..self.early.len() {
                if !self.early[i] && self.runner(i) == loc {
                    events.push(enter(loc, late_clock, RegionKind::ExplicitTask, Self::task_id(i)));
                    events.push(leave(loc, late_clock + 1, RegionKind::ExplicitTask, Self::task_id(i)));
                    late_clock += 2;
                }
            }
            events.push(leave(loc, barrier_leave, RegionKind::BarrierImplicit, BARRIER));
            events.push(leave(loc, barrier_leave + 1, RegionKind::ImplicitTask, implicit));
            events.push(leave(loc, barrier_leave + 2, RegionKind::Parallel, PARALLEL));
            if loc == 0 {
                events.push(leave(0, barrier_leave + 3, RegionKind::InitialTask, INITIAL_TASK));
            }
            per_location.push(events);
        }

        per_location.into_iter().flatten().collect()
    }
}

/// Serialize events as JSON Lines event records
pub fn to_jsonl(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        let mut value = serde_json::to_value(event).unwrap();
        let object = value.as_object_mut().unwrap();
        object.insert("record".to_string(), serde_json::Value::from("event"));
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}
