//! Timed missions with rewards, driven by the event queue.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{EventCallbackError, ScheduleError};
use super::logic;
use super::scheduler::{
    EventCallback, EventId, EventKind, EventSnapshot, ScheduledEventQueue, DUE_TOLERANCE,
};
use super::session::GameWorld;
use super::state::ProgressionState;

/// Mission identifier, persisted as `"mission_<n>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MissionId(u64);

impl MissionId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    fn number(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mission_{}", self.0)
    }
}

impl From<MissionId> for String {
    fn from(id: MissionId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for MissionId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.strip_prefix("mission_")
            .and_then(|n| n.parse().ok())
            .map(MissionId)
            .ok_or_else(|| format!("invalid mission id {s:?}"))
    }
}

/// What a mission pays out on completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionRewards {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gems: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

impl MissionRewards {
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(score) = self.score {
            parts.push(format!("+{} score", logic::format_number(score)));
        }
        if let Some(gems) = self.gems {
            parts.push(format!("+{gems} gems"));
        }
        for item in &self.items {
            parts.push(item.clone());
        }
        if parts.is_empty() {
            "nothing".into()
        } else {
            parts.join(", ")
        }
    }
}

/// Extra behaviour run after a mission's rewards are applied. Not persisted.
pub type MissionHook = Box<dyn FnOnce(&MissionSnapshot, &mut ProgressionState)>;

/// Persistable view of an active mission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSnapshot {
    pub id: MissionId,
    pub name: String,
    pub duration: f64,
    pub time_remaining: f64,
    #[serde(default)]
    pub rewards: MissionRewards,
}

struct Mission {
    id: MissionId,
    name: String,
    duration: f64,
    rewards: MissionRewards,
    event_id: EventId,
    on_complete: Option<MissionHook>,
}

/// A startable mission offered to the player.
#[derive(Clone, Copy, Debug)]
pub struct MissionTemplate {
    pub name: &'static str,
    pub duration: f64,
    pub score: Option<f64>,
    pub gems: Option<u64>,
    pub item: Option<&'static str>,
}

impl MissionTemplate {
    pub fn rewards(&self) -> MissionRewards {
        MissionRewards {
            score: self.score,
            gems: self.gems,
            items: self.item.map(String::from).into_iter().collect(),
        }
    }
}

/// Missions the player can launch, in display order.
pub const MISSION_CATALOG: &[MissionTemplate] = &[
    MissionTemplate {
        name: "Scout the ridge",
        duration: 5.0,
        score: None,
        gems: Some(3),
        item: None,
    },
    MissionTemplate {
        name: "Raid the old mine",
        duration: 30.0,
        score: Some(250.0),
        gems: Some(5),
        item: None,
    },
    MissionTemplate {
        name: "Escort the caravan",
        duration: 60.0,
        score: Some(600.0),
        gems: None,
        item: Some("Caravan Charm"),
    },
];

/// Builds the queue callback for a mission's completion. Used both when a
/// mission starts and when it is restored from a save.
pub fn completion_callback(mission_id: MissionId) -> EventCallback<GameWorld> {
    Box::new(
        move |_: &EventSnapshot,
              queue: &mut ScheduledEventQueue<GameWorld>,
              world: &mut GameWorld| {
            if world.complete_mission(mission_id, queue) {
                Ok(())
            } else {
                Err(EventCallbackError::UnknownMission(mission_id))
            }
        },
    )
}

/// Active missions and their scheduled completions.
pub struct MissionTracker {
    active: Vec<Mission>,
    next_id: u64,
}

impl MissionTracker {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            next_id: 0,
        }
    }

    /// Start a mission and schedule its completion `duration` seconds out.
    pub fn start(
        &mut self,
        queue: &mut ScheduledEventQueue<GameWorld>,
        name: impl Into<String>,
        duration: f64,
        rewards: MissionRewards,
        on_complete: Option<MissionHook>,
    ) -> Result<MissionId, ScheduleError> {
        let id = MissionId(self.next_id);
        let name = name.into();
        let event_id = schedule_completion(queue, id, duration)?;
        self.next_id += 1;
        log::info!("mission started: {name} ({id}) for {duration}s");
        self.active.push(Mission {
            id,
            name,
            duration,
            rewards,
            event_id,
            on_complete,
        });
        Ok(id)
    }

    /// Finish a mission: remove it, cancel its pending event, apply rewards
    /// and run its hook. Returns false if the mission is not active.
    pub fn complete(
        &mut self,
        id: MissionId,
        queue: &mut ScheduledEventQueue<GameWorld>,
        progression: &mut ProgressionState,
    ) -> bool {
        let Some(idx) = self.active.iter().position(|m| m.id == id) else {
            return false;
        };
        let mission = self.active.remove(idx);
        queue.cancel(mission.event_id);
        finish(mission, progression);
        true
    }

    /// Replace the active set with saved missions. Missions with time left are
    /// rescheduled for their remaining time under their saved id; missions
    /// already out of time complete immediately and are returned.
    pub fn restore(
        &mut self,
        saved: Vec<MissionSnapshot>,
        queue: &mut ScheduledEventQueue<GameWorld>,
        progression: &mut ProgressionState,
    ) -> Vec<MissionSnapshot> {
        for mission in self.active.drain(..) {
            queue.cancel(mission.event_id);
        }

        let mut seen = HashSet::new();
        let mut completed = Vec::new();
        for snap in saved {
            self.next_id = self.next_id.max(snap.id.number() + 1);
            if !seen.insert(snap.id) {
                log::warn!("duplicate mission {} in save, skipping", snap.id);
                continue;
            }
            if snap.time_remaining > DUE_TOLERANCE {
                match schedule_completion(queue, snap.id, snap.time_remaining) {
                    Ok(event_id) => self.active.push(Mission {
                        id: snap.id,
                        name: snap.name,
                        duration: snap.duration,
                        rewards: snap.rewards,
                        event_id,
                        on_complete: None,
                    }),
                    Err(err) => log::warn!("dropping mission {}: {err}", snap.id),
                }
            } else {
                log::info!("mission {} finished while away", snap.id);
                logic::apply_rewards(progression, &snap.rewards);
                completed.push(snap);
            }
        }
        completed
    }

    /// Snapshots of active missions with their live remaining time.
    pub fn serialize(&self, queue: &ScheduledEventQueue<GameWorld>) -> Vec<MissionSnapshot> {
        self.active
            .iter()
            .map(|m| snapshot_of(m, queue.time_remaining(m.event_id).unwrap_or(0.0)))
            .collect()
    }

    pub fn name_of(&self, id: MissionId) -> Option<&str> {
        self.active
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for MissionTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn schedule_completion(
    queue: &mut ScheduledEventQueue<GameWorld>,
    id: MissionId,
    duration: f64,
) -> Result<EventId, ScheduleError> {
    queue.schedule(
        EventKind::MissionComplete { mission_id: id },
        duration,
        completion_callback(id),
        serde_json::Value::Null,
    )
}

fn snapshot_of(mission: &Mission, time_remaining: f64) -> MissionSnapshot {
    MissionSnapshot {
        id: mission.id,
        name: mission.name.clone(),
        duration: mission.duration,
        time_remaining,
        rewards: mission.rewards.clone(),
    }
}

fn finish(mission: Mission, progression: &mut ProgressionState) {
    let snapshot = snapshot_of(&mission, 0.0);
    logic::apply_rewards(progression, &mission.rewards);
    log::info!(
        "mission completed: {} ({}), rewards: {}",
        mission.name,
        mission.id,
        mission.rewards.describe()
    );
    if let Some(hook) = mission.on_complete {
        hook(&snapshot, progression);
    }
}
