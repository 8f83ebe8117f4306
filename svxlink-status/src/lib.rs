//! SvxLink Status Library
//!
//! Follows a growing SvxLink log and derives an always-current status record
//! (selected talk group, active talker and callsign, transmitter and receiver
//! state) from a handful of fixed line shapes.
//!
//! # Architecture
//!
//! - [`LogFollower`] yields new lines from the log, surviving rotation and truncation
//! - [`EventParser`] turns a line into at most one [`LogEvent`]
//! - [`StatusTracker`] folds events into a [`StatusSnapshot`] and decides when it must be published
//! - [`Pipeline`] drives the three in strict line order and hands snapshots to a [`Publisher`]
//!
//! The library does NOT:
//! - Talk to a message bus (the application supplies a [`Publisher`])
//! - Load configuration files or initialise logging
//!
//! # Example Usage
//!
//! ```no_run
//! use svxlink_status::{EventParser, ParserConfig, StatusTracker, TrackerConfig};
//!
//! let parser = EventParser::new(&ParserConfig::new()).unwrap();
//! let mut tracker = StatusTracker::new(&TrackerConfig::new());
//!
//! for line in [
//!     "01.01.2025 10:00:00: ReflectorLogic: Selecting TG #5",
//!     "01.01.2025 10:00:01: ReflectorLogic: Talker start on TG #5: DL1ABC",
//! ] {
//!     if let Some(snapshot) = parser.parse(line).and_then(|e| tracker.apply(&e)) {
//!         println!("{}", snapshot.to_json().unwrap());
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod follow;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod shutdown;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use config::{ParserConfig, SourceConfig, TrackerConfig};
pub use follow::{FileId, Follow, LogFollower};
pub use parser::EventParser;
pub use pipeline::{Pipeline, PipelineStats};
pub use publish::{PublishError, PublishOptions, Publisher, StatusPublisher};
pub use shutdown::Shutdown;
pub use tracker::StatusTracker;
pub use types::{Error, LogEvent, QoS, Result, StatusSnapshot, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
