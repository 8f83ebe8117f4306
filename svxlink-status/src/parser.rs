//! Log line classification
//!
//! Turns one SvxLink log line into at most one [`LogEvent`]. Every line shape is
//! anchored at both ends, so a line either matches one of the four shapes
//! completely or produces nothing. Unmatched lines are the normal case.

use crate::config::{ParserConfig, SourceConfig};
use crate::types::{LogEvent, Result, Timestamp};
use chrono::NaiveDateTime;
use regex::{Captures, Regex, RegexBuilder};

/// Date and time prefix shared by every SvxLink log line
const LINE_PREFIX: &str = r"^(?P<date>[0-9]{2}\.[0-9]{2}\.[0-9]{4}) (?P<time>[0-9]{2}:[0-9]{2}:[0-9]{2}): ";

const SELECT_BODY: &str = r"Selecting TG #(?P<tg>[0-9]+)";
const TALKER_BODY: &str =
    r"Talker (?P<state>start|stop) on TG #(?P<tg>[0-9]+): (?P<call>[A-Za-z0-9/\-]+)";
const TX_BODY: &str = r"Turning the transmitter (?P<on>ON|OFF)";
const RX_BODY: &str = r"The squelch is (?P<open>OPEN|CLOSED)";

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Stateless classifier for SvxLink log lines
///
/// Only the patterns of enabled sources are compiled; a disabled source can
/// never yield an event.
#[derive(Debug, Clone)]
pub struct EventParser {
    select: Option<Regex>,
    talker: Option<Regex>,
    transmitter: Option<Regex>,
    receiver: Option<Regex>,
}

impl EventParser {
    /// Compile the line patterns for the enabled sources
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let ci = config.case_insensitive;
        Ok(Self {
            select: compile(&config.reflector, SELECT_BODY, ci)?,
            talker: compile(&config.reflector, TALKER_BODY, ci)?,
            transmitter: compile(&config.transmitter, TX_BODY, ci)?,
            receiver: compile(&config.receiver, RX_BODY, ci)?,
        })
    }

    /// Classify a single line
    ///
    /// Returns `None` for any line that is not one of the four known shapes,
    /// including lines whose prefix is not a valid calendar date/time.
    pub fn parse(&self, line: &str) -> Option<LogEvent> {
        if let Some(caps) = captures(&self.select, line) {
            return Some(LogEvent::GroupSelect {
                timestamp: timestamp(&caps)?,
                group: caps["tg"].to_string(),
            });
        }

        if let Some(caps) = captures(&self.talker, line) {
            return Some(LogEvent::TalkerState {
                timestamp: timestamp(&caps)?,
                group: caps["tg"].to_string(),
                started: caps["state"].eq_ignore_ascii_case("start"),
                call: caps["call"].to_string(),
            });
        }

        if let Some(caps) = captures(&self.transmitter, line) {
            return Some(LogEvent::TransmitterState {
                timestamp: timestamp(&caps)?,
                on: caps["on"].eq_ignore_ascii_case("ON"),
            });
        }

        if let Some(caps) = captures(&self.receiver, line) {
            return Some(LogEvent::ReceiverState {
                timestamp: timestamp(&caps)?,
                open: caps["open"].eq_ignore_ascii_case("OPEN"),
            });
        }

        None
    }
}

fn compile(source: &SourceConfig, body: &str, case_insensitive: bool) -> Result<Option<Regex>> {
    if !source.enabled {
        return Ok(None);
    }

    let pattern = format!(r"{}{}: {}\s*$", LINE_PREFIX, regex::escape(&source.tag), body);
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(case_insensitive)
        .build()?;
    Ok(Some(regex))
}

fn captures<'l>(regex: &Option<Regex>, line: &'l str) -> Option<Captures<'l>> {
    regex.as_ref()?.captures(line)
}

fn timestamp(caps: &Captures<'_>) -> Option<Timestamp> {
    let raw = format!("{} {}", &caps["date"], &caps["time"]);
    match NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            log::debug!("Ignoring line with invalid timestamp {:?}: {}", raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> EventParser {
        EventParser::new(&ParserConfig::new()).unwrap()
    }

    #[test]
    fn test_group_select() {
        let event = parser()
            .parse("01.01.2025 10:00:00: ReflectorLogic: Selecting TG #26200")
            .unwrap();

        match event {
            LogEvent::GroupSelect { group, .. } => assert_eq!(group, "26200"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(event_time("01.01.2025 10:00:00: ReflectorLogic: Selecting TG #0"), "10:00:00");
    }

    fn event_time(line: &str) -> String {
        parser().parse(line).unwrap().time()
    }

    #[test]
    fn test_talker_start_and_stop() {
        let p = parser();
        let start = p
            .parse("01.01.2025 10:00:01: ReflectorLogic: Talker start on TG #5: DL1ABC")
            .unwrap();
        assert_eq!(
            start,
            LogEvent::TalkerState {
                timestamp: start.timestamp(),
                group: "5".to_string(),
                started: true,
                call: "DL1ABC".to_string(),
            }
        );

        let stop = p
            .parse("01.01.2025 10:00:05: ReflectorLogic: Talker stop on TG #5: DL1ABC-L")
            .unwrap();
        match stop {
            LogEvent::TalkerState { started, call, .. } => {
                assert!(!started);
                assert_eq!(call, "DL1ABC-L");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_callsign_with_slash() {
        let event = parser()
            .parse("01.01.2025 10:00:01: ReflectorLogic: Talker start on TG #5: OE/DL1ABC")
            .unwrap();
        assert!(matches!(event, LogEvent::TalkerState { ref call, .. } if call == "OE/DL1ABC"));
    }

    #[test]
    fn test_transmitter_and_receiver() {
        let p = parser();
        assert!(matches!(
            p.parse("01.01.2025 10:00:02: Tx1: Turning the transmitter ON"),
            Some(LogEvent::TransmitterState { on: true, .. })
        ));
        assert!(matches!(
            p.parse("01.01.2025 10:00:03: Tx1: Turning the transmitter OFF"),
            Some(LogEvent::TransmitterState { on: false, .. })
        ));
        assert!(matches!(
            p.parse("01.01.2025 10:00:04: Rx1: The squelch is OPEN"),
            Some(LogEvent::ReceiverState { open: true, .. })
        ));
        assert!(matches!(
            p.parse("01.01.2025 10:00:05: Rx1: The squelch is CLOSED"),
            Some(LogEvent::ReceiverState { open: false, .. })
        ));
    }

    #[test]
    fn test_trailing_whitespace_is_accepted() {
        assert!(parser()
            .parse("01.01.2025 10:00:02: Tx1: Turning the transmitter ON  \r")
            .is_some());
    }

    #[test]
    fn test_unmatched_lines() {
        let p = parser();
        assert!(p.parse("").is_none());
        assert!(p.parse("random noise").is_none());
        // Unknown message for a known tag
        assert!(p.parse("01.01.2025 10:00:00: ReflectorLogic: Connected to 1.2.3.4").is_none());
        // Not anchored at the start
        assert!(p
            .parse("x 01.01.2025 10:00:02: Tx1: Turning the transmitter ON")
            .is_none());
        // Extra text after the state word
        assert!(p
            .parse("01.01.2025 10:00:02: Tx1: Turning the transmitter ON now")
            .is_none());
        // Wrong tag
        assert!(p
            .parse("01.01.2025 10:00:02: Tx2: Turning the transmitter ON")
            .is_none());
        // Impossible time of day
        assert!(p
            .parse("01.01.2025 25:61:00: Tx1: Turning the transmitter ON")
            .is_none());
    }

    #[test]
    fn test_case_sensitivity() {
        let line = "01.01.2025 10:00:02: Tx1: Turning the transmitter on";
        assert!(parser().parse(line).is_none());

        let p = EventParser::new(&ParserConfig::new().with_case_insensitive(true)).unwrap();
        assert!(matches!(
            p.parse(line),
            Some(LogEvent::TransmitterState { on: true, .. })
        ));
        assert!(matches!(
            p.parse("01.01.2025 10:00:01: reflectorlogic: TALKER Start on tg #5: dl1abc"),
            Some(LogEvent::TalkerState { started: true, .. })
        ));
        assert!(matches!(
            p.parse("01.01.2025 10:00:04: Rx1: The squelch is closed"),
            Some(LogEvent::ReceiverState { open: false, .. })
        ));
    }

    #[test]
    fn test_disabled_sources_never_match() {
        let config = ParserConfig::new().disable_reflector().disable_receiver();
        let p = EventParser::new(&config).unwrap();

        assert!(p
            .parse("01.01.2025 10:00:00: ReflectorLogic: Selecting TG #5")
            .is_none());
        assert!(p
            .parse("01.01.2025 10:00:01: ReflectorLogic: Talker start on TG #5: DL1ABC")
            .is_none());
        assert!(p.parse("01.01.2025 10:00:04: Rx1: The squelch is OPEN").is_none());
        assert!(p
            .parse("01.01.2025 10:00:02: Tx1: Turning the transmitter ON")
            .is_some());
    }

    #[test]
    fn test_custom_tags_are_escaped() {
        let config = ParserConfig::new().with_transmitter_tag("Tx.1");
        let p = EventParser::new(&config).unwrap();

        assert!(p
            .parse("01.01.2025 10:00:02: Tx.1: Turning the transmitter ON")
            .is_some());
        assert!(p
            .parse("01.01.2025 10:00:02: TxX1: Turning the transmitter ON")
            .is_none());
    }
}
