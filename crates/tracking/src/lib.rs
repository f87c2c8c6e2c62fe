use std::error;
use std::fmt;
use std::sync::Arc;

use model::vehicle::VehicleId;
use tokio::sync::{mpsc, oneshot};

pub mod backend;
pub mod config;
pub mod engine;
pub mod fetcher;
pub mod follow;
pub mod handle;
pub mod movement;
pub mod reconciler;
pub mod scheduler;
pub mod store;
#[cfg(test)]
mod testing;
pub mod transport;
pub mod wire;

/// A single HTTP attempt failed before a body could be inspected.
#[derive(Debug, Clone)]
pub enum TransportError {
    RequestError(Arc<reqwest::Error>),
    Timeout {
        url: String,
    },
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
    },
}

impl error::Error for TransportError {}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            TransportError::Timeout { url } => write!(f, "Request timed out: {}", url),
            TransportError::InvalidResponse { status_code, url } => {
                write!(f, "Invalid Response ({}) {}", status_code, url)
            }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            let url = e.url().map(|url| url.to_string()).unwrap_or_default();
            return TransportError::Timeout { url };
        }
        TransportError::RequestError(Arc::new(e))
    }
}

/// A body arrived but is not a `{ "success": true, "data": [...] }` envelope.
#[derive(Debug, Clone)]
pub enum EnvelopeError {
    JsonError(Arc<serde_json::Error>),
    NotAnObject,
    MissingSuccessFlag,
    Unsuccessful,
    MissingData,
    InvalidRecord { index: usize, reason: String },
}

impl error::Error for EnvelopeError {}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnvelopeError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            EnvelopeError::NotAnObject => write!(f, "Response is not a JSON object."),
            EnvelopeError::MissingSuccessFlag => {
                write!(f, "Response has no boolean 'success' flag.")
            }
            EnvelopeError::Unsuccessful => write!(f, "Response reports success = false."),
            EnvelopeError::MissingData => write!(f, "Response has no 'data' array."),
            EnvelopeError::InvalidRecord { index, reason } => {
                write!(f, "Invalid record #{}: {}", index, reason)
            }
        }
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(e: serde_json::Error) -> Self {
        EnvelopeError::JsonError(Arc::new(e))
    }
}

/// Why one entry of the fallback chain did not yield a snapshot.
#[derive(Debug, Clone)]
pub enum AttemptError {
    Transport(TransportError),
    Envelope(EnvelopeError),
}

impl error::Error for AttemptError {}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{e}"),
            AttemptError::Envelope(e) => write!(f, "{e}"),
        }
    }
}

impl From<TransportError> for AttemptError {
    fn from(e: TransportError) -> Self {
        AttemptError::Transport(e)
    }
}

impl From<EnvelopeError> for AttemptError {
    fn from(e: EnvelopeError) -> Self {
        AttemptError::Envelope(e)
    }
}

#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub endpoint: String,
    pub error: AttemptError,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Every endpoint of the fallback chain failed. Never fatal, the next cycle
/// simply tries again.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub attempts: Vec<FailedAttempt>,
}

impl FetchError {
    pub fn reasons(&self) -> Vec<String> {
        self.attempts
            .iter()
            .map(|attempt| attempt.to_string())
            .collect()
    }
}

impl error::Error for FetchError {}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "All {} endpoints failed: {}",
            self.attempts.len(),
            self.reasons().join("; ")
        )
    }
}

/// The interactive map could not be brought up.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    Unavailable(String),
    Construction(String),
}

impl error::Error for InitError {}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InitError::Unavailable(why) => write!(f, "map unavailable: {}", why),
            InitError::Construction(why) => write!(f, "map construction failed: {}", why),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FollowError {
    UnknownVehicle(VehicleId),
    MissingCoordinates(VehicleId),
}

impl error::Error for FollowError {}

impl fmt::Display for FollowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FollowError::UnknownVehicle(id) => write!(f, "Vehicle {} is not tracked.", id),
            FollowError::MissingCoordinates(id) => {
                write!(f, "Vehicle {} has no usable coordinates.", id)
            }
        }
    }
}

/// A command sent through a [`handle::TrackerHandle`] did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Follow(FollowError),
    Backend(InitError),
    EngineStopped,
    ResponseDropped,
}

impl error::Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::Follow(e) => write!(f, "{}", e),
            CommandError::Backend(e) => write!(f, "{}", e),
            CommandError::EngineStopped => write!(f, "The tracking engine is not running."),
            CommandError::ResponseDropped => {
                write!(f, "The tracking engine dropped the request.")
            }
        }
    }
}

impl From<FollowError> for CommandError {
    fn from(e: FollowError) -> Self {
        CommandError::Follow(e)
    }
}

impl From<InitError> for CommandError {
    fn from(e: InitError) -> Self {
        CommandError::Backend(e)
    }
}

impl From<mpsc::error::SendError<handle::Command>> for CommandError {
    fn from(_: mpsc::error::SendError<handle::Command>) -> Self {
        CommandError::EngineStopped
    }
}

impl From<oneshot::error::RecvError> for CommandError {
    fn from(_: oneshot::error::RecvError) -> Self {
        CommandError::ResponseDropped
    }
}
