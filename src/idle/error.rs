//! Error types for the idle game core.
//!
//! Nothing here is fatal to a running session: purchases report
//! `ActionError` back to the player, everything else is logged and absorbed.

use thiserror::Error;

use super::missions::MissionId;

/// A player action that could not be carried out. State is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("not enough score: need {cost}, have {available}")]
    InsufficientFunds { cost: f64, available: f64 },
}

/// Rejected `ScheduledEventQueue::schedule` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("event duration must be finite and above 1e-9 seconds (got {0})")]
    InvalidDuration(f64),
}

/// Failure raised by a scheduled event's callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventCallbackError {
    #[error("mission {0} is not active")]
    UnknownMission(MissionId),
}

/// Save/load failures. The session logs these and carries on.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("malformed save data: {0}")]
    Malformed(String),
    #[error("failed to encode save data: {0}")]
    Encode(#[from] serde_json::Error),
}
