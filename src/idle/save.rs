//! Save/load of the whole session under a single storage key.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION` is written into every record. Bump it when fields are
//!   added or change meaning.
//! - Records without a `version` field come from earlier builds that wrote a
//!   flat object with the same keys. They load through the same path.
//!
//! Loading is field-wise: every field is decoded on its own, so one bad field
//! costs that field only. Fields missing from the record keep the value of the
//! fresh state passed in.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::achievements::AchievementFlag;
use super::error::PersistenceError;
use super::missions::MissionSnapshot;
use super::state::ProgressionState;

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

/// Synchronous key-value store holding the save record.
pub trait SaveStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// In-memory store. Used on native targets and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// `None` when storage is unavailable (private mode, disabled cookies).
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl SaveStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.storage
            .get_item(key)
            .map_err(|e| PersistenceError::Read(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| PersistenceError::Write(format!("{e:?}")))
    }
}

/// The persisted record. Transient state (message log, clock) is not saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub version: u32,
    pub score: f64,
    pub multiplier: u32,
    pub multiplier_cost: f64,
    pub passive_level: u32,
    pub passive_upgrade_cost: f64,
    /// Written for readers of the raw record; recomputed on load.
    pub passive_income_rate: f64,
    pub gems: u64,
    pub inventory: Vec<String>,
    pub achievements: Vec<AchievementFlag>,
    pub active_missions: Vec<MissionSnapshot>,
}

impl SaveRecord {
    pub fn capture(
        progression: &ProgressionState,
        achievements: Vec<AchievementFlag>,
        active_missions: Vec<MissionSnapshot>,
    ) -> Self {
        Self {
            version: SAVE_VERSION,
            score: progression.score,
            multiplier: progression.multiplier,
            multiplier_cost: progression.multiplier_cost,
            passive_level: progression.passive_level,
            passive_upgrade_cost: progression.passive_upgrade_cost,
            passive_income_rate: progression.passive_income_rate,
            gems: progression.gems,
            inventory: progression.inventory.clone(),
            achievements,
            active_missions,
        }
    }
}

/// Result of a successful load, ready to be handed to the owning components.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSave {
    /// `None` for records written before versioning.
    pub version: Option<u32>,
    pub progression: ProgressionState,
    pub achievements: Vec<AchievementFlag>,
    pub missions: Vec<MissionSnapshot>,
}

/// Reads and writes [`SaveRecord`]s under one key.
#[derive(Clone, Debug)]
pub struct PersistenceCodec {
    key: String,
}

impl PersistenceCodec {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn encode(record: &SaveRecord) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(record)?)
    }

    pub fn save(
        &self,
        store: &mut dyn SaveStore,
        record: &SaveRecord,
    ) -> Result<(), PersistenceError> {
        let json = Self::encode(record)?;
        store.set(&self.key, &json)?;
        log::debug!("saved {} bytes under {}", json.len(), self.key);
        Ok(())
    }

    /// Read the record, if any. Failures are logged and reported as `None`,
    /// leaving the caller on its fresh state.
    pub fn load(&self, store: &dyn SaveStore, fresh: ProgressionState) -> Option<LoadedSave> {
        let json = match store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => {
                log::info!("no save found under {}, starting fresh", self.key);
                return None;
            }
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };

        match Self::decode(&json, fresh) {
            Ok(loaded) => {
                log::info!(
                    "loaded save: score {}, {} missions",
                    loaded.progression.score,
                    loaded.missions.len()
                );
                Some(loaded)
            }
            Err(e) => {
                log::warn!("{e}; starting fresh");
                None
            }
        }
    }

    /// Decode a record onto `fresh`. Only a record that is not a JSON object
    /// at all is an error.
    pub fn decode(json: &str, fresh: ProgressionState) -> Result<LoadedSave, PersistenceError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(PersistenceError::Malformed(
                "save record is not an object".into(),
            ));
        };

        let version = field::<u32>(&fields, "version");
        match version {
            None => log::info!("loading unversioned save"),
            Some(v) if v > SAVE_VERSION => {
                log::warn!("save version {v} is newer than {SAVE_VERSION}, loading known fields")
            }
            Some(_) => {}
        }

        let mut progression = fresh;
        if let Some(score) = field::<f64>(&fields, "score") {
            progression.score = non_negative(score, progression.score);
        }
        if let Some(multiplier) = field::<u32>(&fields, "multiplier") {
            progression.multiplier = multiplier.max(1);
        }
        if let Some(cost) = field::<f64>(&fields, "multiplierCost") {
            progression.multiplier_cost = non_negative(cost, progression.multiplier_cost);
        }
        if let Some(level) = field::<u32>(&fields, "passiveLevel") {
            progression.passive_level = level;
        }
        if let Some(cost) = field::<f64>(&fields, "passiveUpgradeCost") {
            progression.passive_upgrade_cost = non_negative(cost, progression.passive_upgrade_cost);
        }
        if let Some(gems) = field::<u64>(&fields, "gems") {
            progression.gems = gems;
        }
        progression.inventory = inventory(&fields);

        // The stored rate is a cache; the derived value wins.
        let stored_rate = field::<f64>(&fields, "passiveIncomeRate");
        progression.recompute_passive_income_rate();
        if let Some(rate) = stored_rate {
            if (rate - progression.passive_income_rate).abs() > 1e-9 {
                log::debug!(
                    "stale passiveIncomeRate {rate}, using {}",
                    progression.passive_income_rate
                );
            }
        }

        Ok(LoadedSave {
            version,
            progression,
            achievements: entries(&fields, "achievements"),
            missions: entries(&fields, "activeMissions"),
        })
    }
}

/// Decode one field. Missing or null is silent; a wrong type is logged.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring saved {key}: {e}");
            None
        }
    }
}

fn non_negative(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}

fn inventory(fields: &Map<String, Value>) -> Vec<String> {
    match fields.get("inventory") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    log::warn!("dropping inventory entry {other}");
                    None
                }
            })
            .collect(),
        Some(other) => {
            log::warn!("inventory is not a list ({other}), resetting");
            Vec::new()
        }
    }
}

/// Decode a list field entry by entry, skipping bad entries.
fn entries<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Vec<T> {
    let Some(value) = fields.get(key).filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let Value::Array(items) = value else {
        log::warn!("ignoring saved {key}: not a list");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("skipping entry in {key}: {e}");
                None
            }
        })
        .collect()
}
