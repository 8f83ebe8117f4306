//! Core types for the SvxLink status library
//!
//! This module defines the events the parser produces from log lines, the status
//! snapshot the tracker derives from them, and the error type shared by the
//! library. Events are transient: each one is consumed by a single tracker step.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Timestamp type carried by every log event (the log has no zone information)
pub type Timestamp = NaiveDateTime;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Format used for the `time` field of a snapshot
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Errors that can occur while following or parsing a log
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to follow {path:?}: {source}")]
    FollowError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid line pattern: {0}")]
    PatternError(#[from] regex::Error),
}

/// One recognised log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// `ReflectorLogic: Selecting TG #<group>`
    GroupSelect {
        timestamp: Timestamp,
        /// Digits as they appear in the log ("0" means the link went idle)
        group: String,
    },

    /// `ReflectorLogic: Talker start|stop on TG #<group>: <call>`
    TalkerState {
        timestamp: Timestamp,
        group: String,
        /// True for `start`, false for `stop`
        started: bool,
        /// Speaker callsign
        call: String,
    },

    /// `Tx1: Turning the transmitter ON|OFF`
    TransmitterState { timestamp: Timestamp, on: bool },

    /// `Rx1: The squelch is OPEN|CLOSED`
    ReceiverState { timestamp: Timestamp, open: bool },
}

impl LogEvent {
    /// Get the timestamp of the line this event came from
    pub fn timestamp(&self) -> Timestamp {
        match self {
            LogEvent::GroupSelect { timestamp, .. } => *timestamp,
            LogEvent::TalkerState { timestamp, .. } => *timestamp,
            LogEvent::TransmitterState { timestamp, .. } => *timestamp,
            LogEvent::ReceiverState { timestamp, .. } => *timestamp,
        }
    }

    /// Time of day as `HH:MM:SS`
    pub fn time(&self) -> String {
        self.timestamp().format(TIME_FORMAT).to_string()
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::GroupSelect { group, .. } => {
                write!(f, "{} select TG #{}", self.time(), group)
            }
            LogEvent::TalkerState { group, started, call, .. } => write!(
                f,
                "{} talker {} on TG #{}: {}",
                self.time(),
                if *started { "start" } else { "stop" },
                group,
                call
            ),
            LogEvent::TransmitterState { on, .. } => {
                write!(f, "{} tx {}", self.time(), if *on { "ON" } else { "OFF" })
            }
            LogEvent::ReceiverState { open, .. } => write!(
                f,
                "{} squelch {}",
                self.time(),
                if *open { "OPEN" } else { "CLOSED" }
            ),
        }
    }
}

/// The externally visible status record
///
/// Every field is always populated. The boolean fields travel as `"0"`/`"1"`
/// strings and the group/call keys keep the `TG`/`Call` spelling consumers of
/// the topic already read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// `HH:MM:SS` of the last contributing log line (empty before the first one)
    pub time: String,
    /// Whether a speaker is currently active
    #[serde(with = "flag")]
    pub talker: bool,
    /// Last relevant talk group
    #[serde(rename = "TG")]
    pub group: String,
    /// Last known speaker callsign
    #[serde(rename = "Call")]
    pub call: String,
    /// Transmitter keyed
    #[serde(with = "flag")]
    pub tx: bool,
    /// Receiver squelch open
    #[serde(with = "flag")]
    pub rx: bool,
}

impl StatusSnapshot {
    /// Initial snapshot: nothing active, group and call set to their sentinels
    pub fn new(no_group: impl Into<String>, unknown_call: impl Into<String>) -> Self {
        Self {
            time: String::new(),
            talker: false,
            group: no_group.into(),
            call: unknown_call.into(),
            tx: false,
            rx: false,
        }
    }

    /// Compact JSON payload as published on the bus
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Booleans as `"0"`/`"1"` strings on the wire
mod flag {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "1" } else { "0" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(D::Error::invalid_value(
                Unexpected::Str(other),
                &"\"0\" or \"1\"",
            )),
        }
    }
}

/// Delivery guarantee requested from the message bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// Map a configured level to a QoS; anything outside 0..=2 becomes QoS 0
    pub fn coerce(raw: i64) -> Self {
        match raw {
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            0 => QoS::AtMostOnce,
            other => {
                log::warn!("Invalid QoS {}, using 0", other);
                QoS::AtMostOnce
            }
        }
    }

    /// Numeric level (0, 1 or 2)
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl From<i64> for QoS {
    fn from(raw: i64) -> Self {
        QoS::coerce(raw)
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.level()
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_event_time_format() {
        let event = LogEvent::TransmitterState {
            timestamp: at(7, 5, 9),
            on: true,
        };
        assert_eq!(event.time(), "07:05:09");
        assert_eq!(event.to_string(), "07:05:09 tx ON");
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = StatusSnapshot {
            time: "10:00:01".to_string(),
            talker: true,
            group: "5".to_string(),
            call: "DL1ABC".to_string(),
            tx: false,
            rx: true,
        };
        assert_eq!(
            snapshot.to_json().unwrap(),
            r#"{"time":"10:00:01","talker":"1","TG":"5","Call":"DL1ABC","tx":"0","rx":"1"}"#
        );
    }

    #[test]
    fn test_snapshot_rejects_non_flag_values() {
        let json = r#"{"time":"","talker":"yes","TG":"TG0","Call":"N0Call","tx":"0","rx":"0"}"#;
        assert!(serde_json::from_str::<StatusSnapshot>(json).is_err());

        let json = r#"{"time":"","talker":"1","TG":"TG0","Call":"N0Call","tx":"0","rx":"0"}"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.talker);
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = StatusSnapshot::new("TG0", "N0Call");
        assert_eq!(snapshot.time, "");
        assert_eq!(snapshot.group, "TG0");
        assert_eq!(snapshot.call, "N0Call");
        assert!(!snapshot.talker && !snapshot.tx && !snapshot.rx);
    }

    #[test]
    fn test_qos_coercion() {
        assert_eq!(QoS::coerce(0), QoS::AtMostOnce);
        assert_eq!(QoS::coerce(1), QoS::AtLeastOnce);
        assert_eq!(QoS::coerce(2), QoS::ExactlyOnce);
        assert_eq!(QoS::coerce(3), QoS::AtMostOnce);
        assert_eq!(QoS::coerce(-1), QoS::AtMostOnce);
        assert_eq!(format!("{}", QoS::ExactlyOnce), "2");
    }
}
