//! Outbound event protocol
//!
//! Events flow one way, from the orchestrator to whichever front end is
//! subscribed. Channel names and payload conventions are what front ends
//! match on and must not change:
//!
//! | kind       | channel                    | payload              |
//! |------------|----------------------------|----------------------|
//! | `progress` | `model-download-progress`  | full `PROGRESS:` line|
//! | `status`   | `model-download-status`    | full `STATUS:` line  |
//! | `done`     | `model-download-done`      | `true`               |
//! | `log`      | `log-message`              | line as-is           |
//! | `error`    | `log-message`              | `ERR: ` + line       |
//!
//! Emission is fire-and-forget. A sink must never block the caller, and an
//! absent subscriber is not an error.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

pub const CHANNEL_DOWNLOAD_PROGRESS: &str = "model-download-progress";
pub const CHANNEL_DOWNLOAD_STATUS: &str = "model-download-status";
pub const CHANNEL_DOWNLOAD_DONE: &str = "model-download-done";
pub const CHANNEL_LOG: &str = "log-message";

/// Prefix applied to lines read from the worker's standard error
pub const STDERR_PREFIX: &str = "ERR: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    Status,
    Done,
    Log,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Download progress line (`PROGRESS: 42`)
    Progress(String),
    /// Download status line (`STATUS: extracting`)
    Status(String),
    /// Download finished successfully
    Done,
    /// Worker stdout line or orchestrator message
    Log(String),
    /// Worker stderr line, without the `ERR: ` prefix
    Error(String),
}

impl Event {
    pub fn log(message: impl Into<String>) -> Self {
        Event::Log(message.into())
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Progress(_) => EventKind::Progress,
            Event::Status(_) => EventKind::Status,
            Event::Done => EventKind::Done,
            Event::Log(_) => EventKind::Log,
            Event::Error(_) => EventKind::Error,
        }
    }

    pub fn channel(&self) -> &'static str {
        match self {
            Event::Progress(_) => CHANNEL_DOWNLOAD_PROGRESS,
            Event::Status(_) => CHANNEL_DOWNLOAD_STATUS,
            Event::Done => CHANNEL_DOWNLOAD_DONE,
            Event::Log(_) | Event::Error(_) => CHANNEL_LOG,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Event::Progress(line) | Event::Status(line) | Event::Log(line) => {
                Value::String(line.clone())
            }
            Event::Error(line) => Value::String(format!("{STDERR_PREFIX}{line}")),
            Event::Done => Value::Bool(true),
        }
    }

    /// Wire form as delivered to front ends
    pub fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope {
            event: self.channel(),
            kind: self.kind(),
            payload: self.payload(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event: &'static str,
    pub kind: EventKind,
    pub payload: Value,
}

/// Subscriber-facing side of the event stream
pub trait EventSink: Send + Sync {
    /// Deliver an event without blocking; dropped silently if nobody listens
    fn emit(&self, event: Event);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: Event) {
        (**self).emit(event)
    }
}

/// Unbounded channel sink; the receiver half goes to the front end
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event dropped, no subscriber");
        }
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}
