use crate::attempt_tracker::{AttemptState, AttemptTracker, SharedState};
use crate::config::Config;
use crate::models::{ConnectionAttempt, FailureKind, ProbeSummary, ReceivedMessage};
use log::{debug, error, info};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, Publish, QoS};
use std::string::FromUtf8Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("broker refused the session with result code {0:?}")]
    Handshake(ConnectReturnCode),
    #[error("subscribe request failed: {0}")]
    Subscribe(#[from] rumqttc::ClientError),
    #[error("payload is not valid utf-8: {0}")]
    Decode(#[from] FromUtf8Error),
    #[error("shutdown requested")]
    Cancelled,
}

impl ProbeError {
    /// Failure class for the uniform per-attempt fallback. `None` means the
    /// probe was cancelled rather than the attempt failing.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ProbeError::Connection(_) => Some(FailureKind::Connect),
            ProbeError::Handshake(_) | ProbeError::Subscribe(_) => Some(FailureKind::Protocol),
            ProbeError::Decode(_) => Some(FailureKind::Decode),
            ProbeError::Cancelled => None,
        }
    }
}

/// Everything one attempt's event handling needs, bound at registration time
/// so attempts share no mutable state.
struct AttemptContext {
    client: AsyncClient,
    topic: String,
}

pub struct MqttService {
    state: SharedState,
    pub(crate) config: Config,
    cancelled: AtomicBool,
    shutdown: Notify,
}

impl MqttService {
    pub fn new(state: SharedState, config: Config) -> Arc<Self> {
        Arc::new(Self {
            state,
            config,
            cancelled: AtomicBool::new(false),
            shutdown: Notify::new(),
        })
    }

    /// Request cancellation. Wakes an attempt blocked in the event loop.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Try each configured port in order. An attempt only ends on an error,
    /// so a healthy connection keeps this loop parked on its port until the
    /// transport fails or shutdown is requested.
    pub async fn run(self: Arc<Self>) -> ProbeSummary {
        info!(
            "Starting MQTT probe against {} ({} candidate ports)...",
            self.config.broker_host,
            self.config.ports.len()
        );

        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut summary = ProbeSummary::default();

        for &port in &self.config.ports {
            if self.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            info!("Trying port {}...", port);
            let tracker = Arc::new(AttemptTracker::new(port));
            {
                let mut state = self.state.lock().await;
                state.push(tracker.clone());
            }
            summary.attempted_ports.push(port);

            let err = self.attempt(&tracker).await;
            match err.kind() {
                Some(kind) => {
                    error!("Failed on port {}: {}", port, err);
                    tracker.mark_failed(kind, err.to_string()).await;
                    sleep(retry_delay).await;
                }
                None => {
                    summary.cancelled = true;
                    if matches!(
                        tracker.state().await,
                        AttemptState::Connected | AttemptState::Receiving
                    ) {
                        summary.connected_port = Some(port);
                    }
                    info!("Probe cancelled while port {} was active.", port);
                    break;
                }
            }
        }

        if !summary.cancelled {
            info!("Exhausted all candidate ports without a lasting connection.");
        }

        summary
    }

    /// One blocking trial on one port. Never completes while the connection
    /// is healthy; the returned error is the reason the attempt ended.
    async fn attempt(&self, tracker: &AttemptTracker) -> ProbeError {
        let attempt = self.config.attempt_for(tracker.port);
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(&attempt), 10);
        let context = AttemptContext {
            client,
            topic: self.config.topic.clone(),
        };
        tracker.set_state(AttemptState::Connecting).await;

        loop {
            if self.is_cancelled() {
                return ProbeError::Cancelled;
            }

            let event = tokio::select! {
                _ = self.shutdown.notified() => return ProbeError::Cancelled,
                event = eventloop.poll() => event,
            };

            match event {
                Ok(event) => {
                    if let Err(e) = self.handle_event(&context, tracker, event).await {
                        return e;
                    }
                }
                Err(e) => return ProbeError::Connection(e),
            }
        }
    }

    async fn handle_event(
        &self,
        context: &AttemptContext,
        tracker: &AttemptTracker,
        event: Event,
    ) -> Result<(), ProbeError> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                info!("Connected with result code {:?}", ack.code);
                if ack.code == ConnectReturnCode::Success {
                    tracker.set_state(AttemptState::Connected).await;
                    context
                        .client
                        .subscribe(&context.topic, QoS::AtMostOnce)
                        .await?;
                    tracker.record_subscribe();
                } else {
                    error!("Connection failed");
                    return Err(ProbeError::Handshake(ack.code));
                }
            }
            Event::Incoming(Packet::SubAck(_)) => {
                debug!("Subscription to '{}' acknowledged.", context.topic);
                tracker.set_state(AttemptState::Receiving).await;
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = decode_publish(&publish)?;
                println!("{}", render_message(&message));
                tracker.record_message(message).await;
            }
            Event::Outgoing(_) => {
                debug!("Outgoing event.");
            }
            other => {
                debug!("Unhandled event: {:?}", other);
            }
        }

        Ok(())
    }
}

fn mqtt_options(attempt: &ConnectionAttempt) -> MqttOptions {
    let mut options = MqttOptions::new(
        attempt.client_id.as_str(),
        attempt.broker_host.as_str(),
        attempt.port,
    );
    options.set_keep_alive(Duration::from_secs(attempt.keepalive_secs));
    options.set_clean_session(true);
    options
}

fn decode_publish(publish: &Publish) -> Result<ReceivedMessage, ProbeError> {
    let payload = String::from_utf8(publish.payload.to_vec())?;
    Ok(ReceivedMessage {
        topic: publish.topic.clone(),
        payload,
    })
}

fn render_message(message: &ReceivedMessage) -> String {
    format!("Topic: {} Message: {}", message.topic, message.payload)
}
