//! Job events and the per-job event bus.
//!
//! Process activity is turned into [`JobEvent`]s and published synchronously
//! on the owning job's [`EventBus`]. The transport layer subscribes through
//! [`EventBus::subscribe`] or, for network streams, [`EventBus::channel`].

mod bus;

pub use bus::{EventBus, Listener};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ConsoleLine, JobStatus};

/// Event type used for listener filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Anything a job type publishes on its own.
    Custom,
    Status,
    ConsoleLine,
}

/// An immutable event published on a job's bus.
///
/// Serializes as `{"event": <kind>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum JobEvent {
    Custom(Value),
    Status { status: JobStatus },
    ConsoleLine(ConsoleLine),
}

impl JobEvent {
    pub const fn status(status: JobStatus) -> Self {
        Self::Status { status }
    }

    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Custom(_) => EventKind::Custom,
            Self::Status { .. } => EventKind::Status,
            Self::ConsoleLine(_) => EventKind::ConsoleLine,
        }
    }
}
