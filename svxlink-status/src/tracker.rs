//! Status state machine
//!
//! The tracker owns the current [`StatusSnapshot`] and the group it is
//! following. Each event either updates the snapshot and asks for a publish,
//! or is absorbed without effect. While no group is selected, talker,
//! transmitter and receiver events are ignored.

use crate::config::TrackerConfig;
use crate::types::{LogEvent, StatusSnapshot};

/// Derives the status snapshot from the ordered event stream
#[derive(Debug, Clone)]
pub struct StatusTracker {
    snapshot: StatusSnapshot,
    /// Group currently followed (`None` = link idle)
    selected: Option<String>,
    no_group: String,
    stamp_group_on_activity: bool,
}

impl StatusTracker {
    /// Create a tracker in its initial state
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            snapshot: StatusSnapshot::new(config.no_group.as_str(), config.unknown_call.as_str()),
            selected: None,
            no_group: config.no_group.clone(),
            stamp_group_on_activity: config.stamp_group_on_activity,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    /// Group currently followed, if any
    pub fn selected_group(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Apply one event
    ///
    /// Returns a copy of the snapshot when the event must be published.
    pub fn apply(&mut self, event: &LogEvent) -> Option<StatusSnapshot> {
        match event {
            LogEvent::GroupSelect { group, .. } => {
                self.snapshot.time = event.time();
                if self.is_idle_group(group) {
                    // Group and call keep their last values
                    self.selected = None;
                    self.snapshot.talker = false;
                    self.snapshot.tx = false;
                    self.snapshot.rx = false;
                    log::debug!("Link idle at {}", self.snapshot.time);
                    Some(self.snapshot.clone())
                } else {
                    log::debug!("Following TG #{}", group);
                    self.selected = Some(group.clone());
                    self.snapshot.group = group.clone();
                    None
                }
            }

            LogEvent::TalkerState {
                group,
                started,
                call,
                ..
            } => {
                let selected = self.selected.as_ref().filter(|s| *s == group)?.clone();
                self.snapshot.time = event.time();
                self.snapshot.talker = *started;
                self.snapshot.group = selected;
                self.snapshot.call = call.clone();
                Some(self.snapshot.clone())
            }

            LogEvent::TransmitterState { on, .. } => {
                self.stamp_activity(event)?;
                self.snapshot.tx = *on;
                Some(self.snapshot.clone())
            }

            LogEvent::ReceiverState { open, .. } => {
                self.stamp_activity(event)?;
                self.snapshot.rx = *open;
                Some(self.snapshot.clone())
            }
        }
    }

    fn is_idle_group(&self, group: &str) -> bool {
        group == "0" || group == self.no_group
    }

    /// Common part of TX/RX handling; `None` when no group is selected
    fn stamp_activity(&mut self, event: &LogEvent) -> Option<()> {
        let selected = self.selected.as_ref()?;
        if self.stamp_group_on_activity {
            self.snapshot.group = selected.clone();
        }
        self.snapshot.time = event.time();
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use chrono::NaiveDate;

    fn at(s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, s)
            .unwrap()
    }

    fn select(s: u32, group: &str) -> LogEvent {
        LogEvent::GroupSelect {
            timestamp: at(s),
            group: group.to_string(),
        }
    }

    fn talker(s: u32, group: &str, started: bool, call: &str) -> LogEvent {
        LogEvent::TalkerState {
            timestamp: at(s),
            group: group.to_string(),
            started,
            call: call.to_string(),
        }
    }

    fn tx(s: u32, on: bool) -> LogEvent {
        LogEvent::TransmitterState { timestamp: at(s), on }
    }

    fn rx(s: u32, open: bool) -> LogEvent {
        LogEvent::ReceiverState { timestamp: at(s), open }
    }

    fn tracker() -> StatusTracker {
        StatusTracker::new(&TrackerConfig::new())
    }

    #[test]
    fn test_initial_state() {
        let t = tracker();
        assert_eq!(t.snapshot(), &StatusSnapshot::new("TG0", "N0Call"));
        assert_eq!(t.selected_group(), None);
    }

    #[test]
    fn test_events_ignored_without_group() {
        let mut t = tracker();
        assert!(t.apply(&talker(1, "5", true, "DL1ABC")).is_none());
        assert!(t.apply(&tx(2, true)).is_none());
        assert!(t.apply(&rx(3, true)).is_none());
        assert_eq!(t.snapshot(), &StatusSnapshot::new("TG0", "N0Call"));
    }

    #[test]
    fn test_nonzero_select_is_silent() {
        let mut t = tracker();
        assert!(t.apply(&select(0, "5")).is_none());
        assert_eq!(t.selected_group(), Some("5"));

        let snapshot = t.snapshot();
        assert_eq!(snapshot.group, "5");
        assert_eq!(snapshot.time, "10:00:00");
        assert_eq!(snapshot.call, "N0Call");
        assert!(!snapshot.talker && !snapshot.tx && !snapshot.rx);
    }

    #[test]
    fn test_nonzero_select_keeps_live_fields() {
        let mut t = tracker();
        t.apply(&select(0, "5"));
        t.apply(&talker(1, "5", true, "DL1ABC"));
        t.apply(&tx(2, true));
        t.apply(&rx(3, true));

        assert!(t.apply(&select(4, "7")).is_none());
        assert_eq!(t.selected_group(), Some("7"));

        let snapshot = t.snapshot();
        assert!(snapshot.talker && snapshot.tx && snapshot.rx);
        assert_eq!(snapshot.call, "DL1ABC");
        assert_eq!(snapshot.group, "7");
        assert_eq!(snapshot.time, "10:00:04");
    }

    #[test]
    fn test_talker_in_selected_group() {
        let mut t = tracker();
        t.apply(&select(0, "5"));

        let snapshot = t.apply(&talker(1, "5", true, "N0CALL")).unwrap();
        assert_eq!(snapshot.group, "5");
        assert!(snapshot.talker);
        assert_eq!(snapshot.call, "N0CALL");
        assert_eq!(snapshot.time, "10:00:01");
    }

    #[test]
    fn test_talker_in_other_group_is_ignored() {
        let mut t = tracker();
        t.apply(&select(0, "5"));
        let first = t.apply(&talker(1, "5", true, "N0CALL")).unwrap();

        assert!(t.apply(&talker(2, "7", true, "OTHER")).is_none());
        assert_eq!(t.snapshot(), &first);
    }

    #[test]
    fn test_idle_select_resets_live_fields_only() {
        let mut t = tracker();
        t.apply(&select(0, "5"));
        t.apply(&talker(1, "5", true, "DL1ABC"));
        t.apply(&tx(2, true));
        t.apply(&rx(3, true));

        let snapshot = t.apply(&select(6, "0")).unwrap();
        assert!(!snapshot.talker && !snapshot.tx && !snapshot.rx);
        assert_eq!(snapshot.group, "5");
        assert_eq!(snapshot.call, "DL1ABC");
        assert_eq!(snapshot.time, "10:00:06");
        assert_eq!(t.selected_group(), None);

        // Back to ignoring activity
        assert!(t.apply(&tx(7, true)).is_none());
    }

    #[test]
    fn test_idle_select_emits_even_when_already_idle() {
        let mut t = tracker();
        let snapshot = t.apply(&select(0, "0")).unwrap();
        assert_eq!(snapshot.group, "TG0");
        assert_eq!(snapshot.time, "10:00:00");
    }

    #[test]
    fn test_sentinel_select_counts_as_idle() {
        let mut t = StatusTracker::new(&TrackerConfig::new().with_no_group("99"));
        t.apply(&select(0, "5"));
        assert!(t.apply(&select(1, "99")).is_some());
        assert_eq!(t.selected_group(), None);
    }

    #[test]
    fn test_transmitter_is_not_deduplicated() {
        let mut t = tracker();
        t.apply(&select(0, "5"));

        let first = t.apply(&tx(1, true)).unwrap();
        let second = t.apply(&tx(2, true)).unwrap();
        assert!(first.tx && second.tx);
        assert_eq!(first.time, "10:00:01");
        assert_eq!(second.time, "10:00:02");
        assert_eq!(
            StatusSnapshot { time: String::new(), ..first },
            StatusSnapshot { time: String::new(), ..second }
        );
    }

    #[test]
    fn test_flags_are_independent() {
        let mut t = tracker();
        t.apply(&select(0, "5"));

        let snapshot = t.apply(&rx(1, true)).unwrap();
        assert!(snapshot.rx && !snapshot.tx && !snapshot.talker);

        let snapshot = t.apply(&tx(2, true)).unwrap();
        assert!(snapshot.rx && snapshot.tx && !snapshot.talker);

        let snapshot = t.apply(&rx(3, false)).unwrap();
        assert!(!snapshot.rx && snapshot.tx);
    }

    #[test]
    fn test_activity_reports_selected_group() {
        let mut t = tracker();
        t.apply(&select(0, "5"));
        t.apply(&select(1, "0"));
        t.apply(&select(2, "7"));
        assert_eq!(t.apply(&tx(3, true)).unwrap().group, "7");
    }

    #[test]
    fn test_emitted_copy_is_immutable() {
        let mut t = tracker();
        t.apply(&select(0, "5"));
        let emitted = t.apply(&talker(1, "5", true, "DL1ABC")).unwrap();

        t.apply(&talker(2, "5", false, "DL2XYZ"));
        assert!(emitted.talker);
        assert_eq!(emitted.call, "DL1ABC");
        assert_eq!(t.snapshot().call, "DL2XYZ");
    }
}
