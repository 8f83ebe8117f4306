//! Publish boundary
//!
//! The library does not know which message bus is used. It only needs a
//! [`Publisher`] that blocks until the bus has accepted a payload.

use crate::types::{QoS, StatusSnapshot};
use std::time::Duration;

/// Errors reported by a publisher
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Publish rejected: {0}")]
    Rejected(String),

    #[error("No acknowledgement within {0:?}")]
    Timeout(Duration),

    #[error("Connection to the message bus is gone")]
    Disconnected,
}

/// A message bus client
pub trait Publisher {
    /// Publish one payload and wait until the bus acknowledged it
    /// as required by `qos`
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError> {
        (**self).publish(topic, payload, qos, retain)
    }
}

/// Where and how snapshots are published; fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
}

impl PublishOptions {
    pub fn new(topic: impl Into<String>, qos: QoS, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            qos,
            retain,
        }
    }

    /// Log form of one publish: `PUB <topic> QoS=<n> Retain=<bool> <payload>`
    pub fn describe(&self, payload: &str) -> String {
        format!(
            "PUB {} QoS={} Retain={} {}",
            self.topic, self.qos, self.retain, payload
        )
    }
}

/// Serializes snapshots and hands them to a [`Publisher`]
pub struct StatusPublisher<P> {
    publisher: P,
    options: PublishOptions,
}

impl<P: Publisher> StatusPublisher<P> {
    pub fn new(publisher: P, options: PublishOptions) -> Self {
        Self { publisher, options }
    }

    /// Give back the wrapped publisher (e.g. to disconnect it)
    pub fn into_inner(self) -> P {
        self.publisher
    }

    /// Publish one snapshot as compact JSON
    ///
    /// Logs the publish line at info level, or at error level together with
    /// the reason when the bus did not accept it.
    pub fn publish_status(&mut self, snapshot: &StatusSnapshot) -> Result<(), PublishError> {
        let payload = snapshot.to_json()?;
        let line = self.options.describe(&payload);

        match self.publisher.publish(
            &self.options.topic,
            payload.as_bytes(),
            self.options.qos,
            self.options.retain,
        ) {
            Ok(()) => {
                log::info!("{}", line);
                Ok(())
            }
            Err(e) => {
                log::error!("{} failed: {}", line, e);
                Err(e)
            }
        }
    }
}
