//! Line-to-publish driver
//!
//! Runs lines through parser and tracker strictly in order and publishes each
//! emitted snapshot before the next line is read. A failed publish is logged
//! and counted; only a failing line source ends the run.

use crate::parser::EventParser;
use crate::publish::{Publisher, StatusPublisher};
use crate::tracker::StatusTracker;
use crate::types::{Result, StatusSnapshot};

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines read from the source
    pub lines: u64,
    /// Lines that matched one of the known shapes
    pub events: u64,
    /// Snapshots acknowledged by the bus
    pub published: u64,
    /// Snapshots the bus did not accept
    pub failed: u64,
}

/// Parser, tracker and publisher wired together
pub struct Pipeline<P> {
    parser: EventParser,
    tracker: StatusTracker,
    publisher: StatusPublisher<P>,
    stats: PipelineStats,
}

impl<P: Publisher> Pipeline<P> {
    pub fn new(parser: EventParser, tracker: StatusTracker, publisher: StatusPublisher<P>) -> Self {
        Self {
            parser,
            tracker,
            publisher,
            stats: PipelineStats::default(),
        }
    }

    /// Get the tracker (current snapshot and selected group)
    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Counters so far
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Give back the publisher (e.g. to disconnect it)
    pub fn into_publisher(self) -> StatusPublisher<P> {
        self.publisher
    }

    /// Parse and track one line without publishing
    pub fn process_line(&mut self, line: &str) -> Option<StatusSnapshot> {
        self.stats.lines += 1;
        let event = self.parser.parse(line)?;
        self.stats.events += 1;
        log::debug!("Event: {}", event);
        self.tracker.apply(&event)
    }

    /// Consume lines until the source ends
    ///
    /// Returns the counters for the whole run, or the first source error.
    pub fn run<I>(&mut self, lines: I) -> Result<PipelineStats>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        for line in lines {
            let line = line?;
            let Some(snapshot) = self.process_line(&line) else {
                continue;
            };

            match self.publisher.publish_status(&snapshot) {
                Ok(()) => self.stats.published += 1,
                // Already logged with the full publish line
                Err(_) => self.stats.failed += 1,
            }
        }

        Ok(self.stats)
    }
}
