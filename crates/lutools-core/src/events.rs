//! Log and progress events pushed by the engine.
//!
//! Events follow the `#[serde(tag = "type", content = "data")]` layout so a
//! front-end can forward them as JSON unchanged. Every subscriber sees every
//! event emitted after it subscribed, in emission order, until it drains them.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Long-running operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateLut,
    ProcessFiles,
}

/// Notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineEvent {
    /// Human-readable log line.
    Log { level: LogLevel, message: String },

    /// Fraction of a long operation completed, non-decreasing, ending at `1.0`.
    Progress { operation: Operation, fraction: f32 },
}

/// Fan-out of engine events to any number of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        EventReceiver { rx }
    }

    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// was dropped are pruned.
    pub fn emit(&self, event: EngineEvent) {
        // Sending under the lock keeps emission order identical for all
        // subscribers when several threads emit at once.
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.emit(EngineEvent::Log {
            level: LogLevel::Info,
            message,
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.emit(EngineEvent::Log {
            level: LogLevel::Warning,
            message,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.emit(EngineEvent::Log {
            level: LogLevel::Error,
            message,
        });
    }

    pub fn progress(&self, operation: Operation, fraction: f32) {
        tracing::debug!(?operation, fraction, "progress");
        self.emit(EngineEvent::Progress {
            operation,
            fraction: fraction.clamp(0.0, 1.0),
        });
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Receiving end of an [`EventBus`] subscription.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventReceiver {
    /// Next queued event, if any. Never blocks.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }

    /// Every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event. Returns `None` once the bus is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }
}
