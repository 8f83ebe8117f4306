//! MQTT publisher
//!
//! Wraps the synchronous rumqttc client. A background thread drives the
//! connection (including reconnects) and reports deliveries back over a
//! channel, so `publish` can block until the broker acknowledged the message.
//!
//! Only one publish is in flight per session. A publish that fails or times
//! out abandons its session and the next one starts on a fresh client, so a
//! late delivery of the old message is never taken for the new one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet};
use svxlink_status::{PublishError, Publisher, QoS};

use crate::config::MqttConfig;

/// Capacity of the request queue between client and event loop
const REQUEST_CAPACITY: usize = 10;

/// Minimum keep-alive accepted by the client
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// What the connection thread observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Connected,
    /// PUBLISH written to the socket (packet id 0 for QoS 0)
    Sent(u16),
    /// PUBACK received (QoS 1)
    Acked(u16),
    /// PUBCOMP received (QoS 2)
    Completed(u16),
    /// DISCONNECT written, connection thread exiting
    Closed,
}

/// One client, its event loop thread and the deliveries it reports
struct Session {
    client: Client,
    deliveries: Receiver<Delivery>,
    abandoned: Arc<AtomicBool>,
}

impl Session {
    fn open(options: MqttOptions, reconnect_delay: Duration) -> Result<Self> {
        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let (tx, deliveries) = mpsc::channel();
        let abandoned = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&abandoned);
        thread::Builder::new()
            .name("mqtt-connection".to_string())
            .spawn(move || drive(connection, tx, flag, reconnect_delay))
            .context("Failed to start MQTT connection thread")?;

        Ok(Self {
            client,
            deliveries,
            abandoned,
        })
    }

    /// Let the connection thread exit on its next event
    fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }
}

/// Blocking MQTT publisher
pub struct MqttPublisher {
    options: MqttOptions,
    reconnect_delay: Duration,
    timeout: Duration,
    session: Session,
    /// Sessions opened so far, the current one included
    sessions: u32,
}

impl MqttPublisher {
    /// Create the client and start the connection thread
    ///
    /// Waits up to the publish timeout for the first CONNACK; an unreachable
    /// broker is logged but not fatal, the connection keeps retrying.
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive().max(MIN_KEEP_ALIVE));
        if let Some((username, password)) = config.credentials() {
            options.set_credentials(username, password);
        }

        let reconnect_delay = config.reconnect_delay();
        let session = Session::open(options.clone(), reconnect_delay)?;

        let publisher = Self {
            options,
            reconnect_delay,
            timeout: config.publish_timeout(),
            session,
            sessions: 1,
        };

        match publisher.session.deliveries.recv_timeout(publisher.timeout) {
            Ok(Delivery::Connected) => {}
            _ => log::warn!(
                "[MQTT] {}:{} not reachable yet, will keep retrying",
                config.host,
                config.port
            ),
        }

        Ok(publisher)
    }

    /// Send DISCONNECT and wait (bounded) for the connection thread to finish
    pub fn disconnect(self) {
        if let Err(e) = self.session.client.try_disconnect() {
            log::warn!("[MQTT] Failed to request disconnect: {}", e);
            self.session.abandon();
            return;
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.session.deliveries.recv_timeout(remaining) {
                Ok(Delivery::Closed) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("[MQTT] Disconnect not confirmed within {:?}", self.timeout);
                    self.session.abandon();
                    return;
                }
            }
        }
    }

    /// Replace the current session with a fresh one
    fn restart(&mut self) {
        match Session::open(self.options.clone(), self.reconnect_delay) {
            Ok(session) => {
                let stale = std::mem::replace(&mut self.session, session);
                stale.abandon();
                self.sessions += 1;
                log::warn!(
                    "[MQTT] Dropped unconfirmed publish, started session #{}",
                    self.sessions
                );
            }
            Err(e) => log::error!("[MQTT] {:#}", e),
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError> {
        // Connection notifications (CONNACK etc.) since the last publish
        while self.session.deliveries.try_recv().is_ok() {}

        let result = self
            .session
            .client
            .try_publish(topic, to_mqtt_qos(qos), retain, payload.to_vec())
            .map_err(|e| PublishError::Rejected(e.to_string()))
            .and_then(|()| await_delivery(&self.session.deliveries, qos, self.timeout));

        if result.is_err() {
            self.restart();
        }
        result
    }
}

/// Block until the delivery required by `qos` arrives
///
/// Expects at most one publish in flight on `deliveries`.
fn await_delivery(
    deliveries: &Receiver<Delivery>,
    qos: QoS,
    timeout: Duration,
) -> Result<(), PublishError> {
    let deadline = Instant::now() + timeout;
    let mut pkid = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let delivery = match deliveries.recv_timeout(remaining) {
            Ok(delivery) => delivery,
            Err(RecvTimeoutError::Timeout) => return Err(PublishError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => return Err(PublishError::Disconnected),
        };

        match (delivery, pkid) {
            (Delivery::Sent(id), None) => {
                if qos == QoS::AtMostOnce {
                    return Ok(());
                }
                pkid = Some(id);
            }
            (Delivery::Acked(id), Some(sent)) if id == sent && qos == QoS::AtLeastOnce => {
                return Ok(())
            }
            (Delivery::Completed(id), Some(sent)) if id == sent && qos == QoS::ExactlyOnce => {
                return Ok(())
            }
            (Delivery::Closed, _) => return Err(PublishError::Disconnected),
            _ => {}
        }
    }
}

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// Connection thread body: poll the event loop until DISCONNECT went out or
/// the session was abandoned
fn drive(
    mut connection: Connection,
    deliveries: Sender<Delivery>,
    abandoned: Arc<AtomicBool>,
    reconnect_delay: Duration,
) {
    for notification in connection.iter() {
        if abandoned.load(Ordering::SeqCst) {
            log::debug!("[MQTT] Closing abandoned session");
            return;
        }

        let delivery = match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                log::info!("[MQTT] Connected rc={:?}", ack.code);
                Delivery::Connected
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => Delivery::Sent(pkid),
            Ok(Event::Incoming(Packet::PubAck(ack))) => Delivery::Acked(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => Delivery::Completed(comp.pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                log::info!("[MQTT] Disconnected");
                let _ = deliveries.send(Delivery::Closed);
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                log::warn!("[MQTT] Connection error: {}", e);
                thread::sleep(reconnect_delay);
                continue;
            }
        };

        // The publisher may already be gone; keep driving until DISCONNECT
        let _ = deliveries.send(delivery);
    }
}
