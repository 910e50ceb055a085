//! Delayed one-shot callbacks keyed by remaining duration.
//!
//! The queue is generic over a context `C` that callbacks receive mutably
//! (the session passes its `GameWorld`). Callbacks also get the queue itself,
//! so a firing event may schedule or cancel others.
//!
//! Only the data half of an event (`EventSnapshot`) is ever exposed or
//! persisted. Behaviour is rebuilt from `EventKind` by whoever owns the event
//! (see `missions::completion_callback`).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{EventCallbackError, ScheduleError};
use super::missions::MissionId;

/// Remaining time at or below this counts as due. Absorbs float drift when a
/// duration is consumed by several partial advances. Durations at or below it
/// are not schedulable.
pub const DUE_TOLERANCE: f64 = 1e-9;

/// Unique, monotonically assigned event identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event_{}", self.0)
    }
}

/// What a scheduled event stands for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Completion of an active mission.
    MissionComplete { mission_id: MissionId },
    /// Named timed effect, for exercising the queue on its own.
    #[cfg(test)]
    Timed { name: String },
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::MissionComplete { mission_id } => write!(f, "mission_complete_{mission_id}"),
            #[cfg(test)]
            EventKind::Timed { name } => f.write_str(name),
        }
    }
}

/// Callback run once when an event becomes due.
pub type EventCallback<C> = Box<
    dyn FnOnce(
        &EventSnapshot,
        &mut ScheduledEventQueue<C>,
        &mut C,
    ) -> Result<(), EventCallbackError>,
>;

/// Read-only copy of a pending (or just fired) event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: EventId,
    pub kind: EventKind,
    pub total_duration: f64,
    pub time_remaining: f64,
    pub payload: serde_json::Value,
}

struct ScheduledEvent<C> {
    id: EventId,
    kind: EventKind,
    total_duration: f64,
    time_remaining: f64,
    payload: serde_json::Value,
    on_fire: EventCallback<C>,
}

impl<C> ScheduledEvent<C> {
    fn is_due(&self) -> bool {
        self.time_remaining <= DUE_TOLERANCE
    }

    fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            id: self.id,
            kind: self.kind.clone(),
            total_duration: self.total_duration,
            time_remaining: self.time_remaining,
            payload: self.payload.clone(),
        }
    }
}

/// Pending timed events, advanced by elapsed seconds.
pub struct ScheduledEventQueue<C> {
    pending: Vec<ScheduledEvent<C>>,
    next_id: u64,
}

impl<C> ScheduledEventQueue<C> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `on_fire` to run once `duration` seconds have been advanced.
    pub fn schedule(
        &mut self,
        kind: EventKind,
        duration: f64,
        on_fire: EventCallback<C>,
        payload: serde_json::Value,
    ) -> Result<EventId, ScheduleError> {
        if !duration.is_finite() || duration <= DUE_TOLERANCE {
            return Err(ScheduleError::InvalidDuration(duration));
        }
        let id = EventId(self.next_id);
        self.next_id += 1;
        log::debug!("event scheduled: {id} ({kind}) in {duration}s");
        self.pending.push(ScheduledEvent {
            id,
            kind,
            total_duration: duration,
            time_remaining: duration,
            payload,
            on_fire,
        });
        Ok(id)
    }

    /// Advance every pending event by `delta` seconds and fire the ones that
    /// became due, earliest first (ties by id). Due events leave the queue
    /// before any callback runs. Returns snapshots of the fired events.
    pub fn advance(&mut self, delta: f64, ctx: &mut C) -> Vec<EventSnapshot> {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            log::warn!("ignoring invalid scheduler delta {delta}");
            0.0
        };

        for event in &mut self.pending {
            event.time_remaining -= delta;
        }
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|e| e.is_due());
        self.pending = pending;
        due.sort_by(|a, b| {
            a.time_remaining
                .total_cmp(&b.time_remaining)
                .then(a.id.cmp(&b.id))
        });

        let mut fired = Vec::with_capacity(due.len());
        for event in due {
            let snapshot = event.snapshot();
            log::debug!("event fired: {} ({})", snapshot.id, snapshot.kind);
            if let Err(err) = (event.on_fire)(&snapshot, self, ctx) {
                log::error!("callback for {} ({}) failed: {err}", snapshot.id, snapshot.kind);
            }
            fired.push(snapshot);
        }
        fired
    }

    /// Remove a pending event. Returns whether it was found.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.id != id);
        self.pending.len() < before
    }

    /// Remaining seconds of a pending event.
    pub fn time_remaining(&self, id: EventId) -> Option<f64> {
        self.pending
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.time_remaining)
    }

    /// Copies of all pending events, in scheduling order.
    pub fn snapshot(&self) -> Vec<EventSnapshot> {
        self.pending.iter().map(ScheduledEvent::snapshot).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C> Default for ScheduledEventQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
