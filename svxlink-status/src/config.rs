//! Parser and tracker configuration types
//!
//! Both configurations are built once at startup and handed to the constructors
//! by reference. Everything deserializes with defaults so a partial TOML table
//! is enough.

use serde::{Deserialize, Serialize};

/// One log source: whether its lines are parsed and the tag that identifies them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Disabled sources never produce events
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tag printed after the timestamp, e.g. `ReflectorLogic`
    pub tag: String,
}

impl SourceConfig {
    /// Create an enabled source with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            enabled: true,
            tag: tag.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration for the line parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Match lines (tags and state words included) ignoring case
    pub case_insensitive: bool,

    /// Reflector logic lines (TG selection and talker start/stop)
    pub reflector: SourceConfig,

    /// Transmitter lines
    pub transmitter: SourceConfig,

    /// Receiver lines
    pub receiver: SourceConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            reflector: SourceConfig::new("ReflectorLogic"),
            transmitter: SourceConfig::new("Tx1"),
            receiver: SourceConfig::new("Rx1"),
        }
    }
}

impl ParserConfig {
    /// Create a parser configuration with default tags and all sources enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the reflector logic tag
    pub fn with_reflector_tag(mut self, tag: impl Into<String>) -> Self {
        self.reflector.tag = tag.into();
        self
    }

    /// Builder method: set the transmitter tag
    pub fn with_transmitter_tag(mut self, tag: impl Into<String>) -> Self {
        self.transmitter.tag = tag.into();
        self
    }

    /// Builder method: enable or disable case-insensitive matching
    pub fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Builder method: stop parsing reflector logic lines
    pub fn disable_reflector(mut self) -> Self {
        self.reflector.enabled = false;
        self
    }

    /// Builder method: stop parsing receiver lines
    pub fn disable_receiver(mut self) -> Self {
        self.receiver.enabled = false;
        self
    }
}

/// Configuration for the status tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Group value reported before any group was selected; a group select
    /// carrying this value is treated like TG #0
    pub no_group: String,

    /// Callsign reported before any talker was seen
    pub unknown_call: String,

    /// Write the selected group into the snapshot on TX/RX events as well
    ///
    /// Selecting a group already writes it into the snapshot and TX/RX events
    /// are only accepted while a group is selected, so both settings publish
    /// the same `TG` today. The switch keeps the stamping explicit.
    pub stamp_group_on_activity: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            no_group: "TG0".to_string(),
            unknown_call: "N0Call".to_string(),
            stamp_group_on_activity: true,
        }
    }
}

impl TrackerConfig {
    /// Create a tracker configuration with default sentinels
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the "no group" sentinel
    pub fn with_no_group(mut self, sentinel: impl Into<String>) -> Self {
        self.no_group = sentinel.into();
        self
    }

    /// Builder method: control whether TX/RX events rewrite the group field
    pub fn with_stamp_group_on_activity(mut self, enabled: bool) -> Self {
        self.stamp_group_on_activity = enabled;
        self
    }
}
