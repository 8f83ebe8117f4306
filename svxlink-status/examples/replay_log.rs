//! Replay a saved SvxLink log through the status tracker
//!
//! Reads the whole file from the beginning (no following) and prints every
//! snapshot that would have been published.
//!
//! Usage:
//!   replay_log <svxlink.log> [--case-insensitive]

use std::env;
use std::fs;
use std::process;

use svxlink_status::{EventParser, ParserConfig, StatusTracker, TrackerConfig};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: {} <svxlink.log> [--case-insensitive]", args[0]);
        process::exit(2);
    };
    let case_insensitive = args.iter().any(|a| a == "--case-insensitive");

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            process::exit(1);
        }
    };
    let text = String::from_utf8_lossy(&bytes);

    let parser = match EventParser::new(&ParserConfig::new().with_case_insensitive(case_insensitive)) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let mut tracker = StatusTracker::new(&TrackerConfig::new());

    let mut lines = 0usize;
    let mut events = 0usize;
    let mut emitted = 0usize;

    for line in text.lines() {
        lines += 1;
        let Some(event) = parser.parse(line) else {
            continue;
        };
        events += 1;

        if let Some(snapshot) = tracker.apply(&event) {
            emitted += 1;
            match snapshot.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize snapshot: {}", e),
            }
        }
    }

    println!("\n=== REPLAY SUMMARY ===");
    println!("Lines read:         {}", lines);
    println!("Events recognised:  {}", events);
    println!("Snapshots emitted:  {}", emitted);
    println!(
        "Selected group:     {}",
        tracker.selected_group().unwrap_or("(none)")
    );
}
