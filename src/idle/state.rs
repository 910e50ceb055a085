//! Progression state definitions.

use super::config::GameConfig;

/// Passive income contributed per point of click multiplier, per second.
pub const INCOME_PER_MULTIPLIER: f64 = 0.1;
/// Passive income contributed per passive upgrade level, per second.
pub const INCOME_PER_PASSIVE_LEVEL: f64 = 0.5;
/// Cost growth factor applied (then floored) after each multiplier purchase.
pub const MULTIPLIER_COST_GROWTH: f64 = 1.5;
/// Cost growth factor applied (then floored) after each passive upgrade.
pub const PASSIVE_COST_GROWTH: f64 = 2.0;

/// Maximum number of entries kept in the notification log.
const LOG_CAPACITY: usize = 50;

/// Authoritative score, currencies and upgrade levels of one game.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressionState {
    pub score: f64,
    /// Score gained per manual click. Always >= 1.
    pub multiplier: u32,
    pub multiplier_cost: f64,
    pub passive_level: u32,
    pub passive_upgrade_cost: f64,
    /// Derived from `multiplier` and `passive_level`; see
    /// [`ProgressionState::recompute_passive_income_rate`].
    pub passive_income_rate: f64,
    pub gems: u64,
    /// Item names in acquisition order. Duplicates are allowed.
    pub inventory: Vec<String>,
}

impl ProgressionState {
    pub fn new() -> Self {
        Self::with_costs(10.0, 50.0)
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::with_costs(
            config.starting_multiplier_cost,
            config.starting_passive_upgrade_cost,
        )
    }

    fn with_costs(multiplier_cost: f64, passive_upgrade_cost: f64) -> Self {
        let mut state = Self {
            score: 0.0,
            multiplier: 1,
            multiplier_cost,
            passive_level: 0,
            passive_upgrade_cost,
            passive_income_rate: 0.0,
            gems: 0,
            inventory: Vec::new(),
        };
        state.recompute_passive_income_rate();
        state
    }

    /// `multiplier * 0.1 + passive_level * 0.5`.
    pub fn derived_passive_income_rate(&self) -> f64 {
        self.multiplier as f64 * INCOME_PER_MULTIPLIER
            + self.passive_level as f64 * INCOME_PER_PASSIVE_LEVEL
    }

    /// Must be called after every change to `multiplier` or `passive_level`.
    pub fn recompute_passive_income_rate(&mut self) {
        self.passive_income_rate = self.derived_passive_income_rate();
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.score >= cost
    }
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification log entry shown to the player.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub text: String,
    pub is_important: bool,
}

/// Append-only message log, trimmed from the front.
#[derive(Clone, Debug, Default)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
}

impl MessageLog {
    pub fn push(&mut self, text: impl Into<String>, is_important: bool) {
        self.entries.push(LogEntry {
            text: text.into(),
            is_important,
        });
        if self.entries.len() > LOG_CAPACITY {
            self.entries.remove(0);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}
