#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a JSON Lines trace; errors are fine, panics are not
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(events) = execgraph::trace_source::parse_events(Cursor::new(input)) {
            let _ = execgraph::build_execution_graph(events, &execgraph::GraphConfig::default());
        }
    }
});
