//! Tunables for a game session.

use std::ops::RangeInclusive;

use log::LevelFilter;

/// Session configuration. `Default` gives the shipped game's values.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Real milliseconds per passive-income tick.
    pub tick_period_ms: f64,
    /// Real milliseconds between autosaves.
    pub autosave_period_ms: f64,
    /// Upper bound on a single frame's delta. A backgrounded tab resumes
    /// with at most this much elapsed time.
    pub max_frame_delta_ms: f64,
    /// Key the save record is stored under.
    pub storage_key: String,
    pub starting_multiplier_cost: f64,
    pub starting_passive_upgrade_cost: f64,
    /// Gems awarded per "find gems" action, inclusive.
    pub gem_find_range: RangeInclusive<u64>,
    pub log_level: LevelFilter,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000.0,
            autosave_period_ms: 30_000.0,
            max_frame_delta_ms: 1_000.0,
            storage_key: "idleClickerGameState".into(),
            starting_multiplier_cost: 10.0,
            starting_passive_upgrade_cost: 50.0,
            gem_find_range: 1..=5,
            log_level: LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timers_are_one_and_thirty_seconds() {
        let config = GameConfig::default();
        assert!((config.tick_period_ms - 1_000.0).abs() < f64::EPSILON);
        assert!((config.autosave_period_ms - 30_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_gem_range_is_one_to_five() {
        assert_eq!(GameConfig::default().gem_find_range, 1..=5);
    }
}
