#![no_main]

use execgraph::event::{Event, EventKind, RegionKind};
use libfuzzer_sys::fuzz_target;

// Each 4-byte group encodes (location, kind, region kind, id)
fuzz_target!(|data: &[u8]| {
    let mut events: Vec<Event> = data
        .chunks_exact(4)
        .enumerate()
        .map(|(i, b)| {
            let kind = match b[1] % 3 {
                0 => EventKind::Enter,
                1 => EventKind::Leave,
                _ => EventKind::Create,
            };
            let region = RegionKind::ALL[b[2] as usize % RegionKind::ALL.len()];
            Event::new(u64::from(b[0] % 4), i as u64, kind, region, Some(u64::from(b[3])), Some(1))
        })
        .collect();
    events.sort_by_key(|e| e.location);
    let _ = execgraph::build_execution_graph(events, &execgraph::GraphConfig::default());
});
