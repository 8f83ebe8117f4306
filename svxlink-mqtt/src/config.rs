//! Configuration loading and parsing
//!
//! Every table of the TOML file is optional; missing values fall back to the
//! defaults of a stock SvxLink installation with a local broker.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use svxlink_status::{ParserConfig, PublishOptions, QoS, TrackerConfig};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub mqtt: MqttConfig,
    pub sources: ParserConfig,
    pub status: TrackerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// SvxLink log file to follow
    pub path: PathBuf,
    /// Pause between checks when no new line is available
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/svxlink"),
            poll_interval_ms: 300,
        }
    }
}

/// Shortest pause between polls of an idle log
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub topic: String,
    /// 0, 1 or 2; anything else is coerced to 0
    pub qos: QoS,
    pub retain: bool,
    pub keep_alive_secs: u64,
    /// How long a publish may wait for its acknowledgement
    pub publish_timeout_ms: u64,
    /// Pause before the next connection attempt after an error
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "svxlog2mqtt".to_string(),
            username: None,
            password: None,
            topic: "svxlink/talker".to_string(),
            qos: QoS::AtMostOnce,
            retain: false,
            keep_alive_secs: 60,
            publish_timeout_ms: 5000,
            reconnect_delay_ms: 1000,
        }
    }
}

impl MqttConfig {
    /// Username, ignoring an empty string
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        Some((username, self.password.as_deref().unwrap_or("")))
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions::new(self.topic.clone(), self.qos, self.retain)
    }
}

impl AppConfig {
    /// Render as TOML with the password masked
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.mqtt.password.is_some() {
            shown.mqtt.password = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).context("Failed to render configuration")
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
