//! Achievements: data-driven, one-time unlocks over progression state.
//!
//! Conditions are plain data (`AchievementCondition`) so new achievements are
//! added by extending a list, not by writing code. The evaluator never
//! assumes how many there are.

use serde::{Deserialize, Serialize};

use super::state::ProgressionState;

/// Predicate over a progression snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AchievementCondition {
    ScoreAtLeast(f64),
    MultiplierAbove(u32),
    PassiveLevelAbove(u32),
    GemsAtLeast(u64),
    InventoryAtLeast(usize),
}

impl AchievementCondition {
    pub fn is_met(&self, state: &ProgressionState) -> bool {
        match self {
            AchievementCondition::ScoreAtLeast(threshold) => state.score >= *threshold,
            AchievementCondition::MultiplierAbove(n) => state.multiplier > *n,
            AchievementCondition::PassiveLevelAbove(n) => state.passive_level > *n,
            AchievementCondition::GemsAtLeast(n) => state.gems >= *n,
            AchievementCondition::InventoryAtLeast(n) => state.inventory.len() >= *n,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: AchievementCondition,
    pub unlocked: bool,
}

impl Achievement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        condition: AchievementCondition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            condition,
            unlocked: false,
        }
    }
}

/// Persisted unlock flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementFlag {
    pub id: String,
    pub unlocked: bool,
}

/// The achievements shipped with the game.
pub fn builtin_achievements() -> Vec<Achievement> {
    vec![
        Achievement::new(
            "first_click",
            "First Click",
            "Click the button for the first time.",
            AchievementCondition::ScoreAtLeast(1.0),
        ),
        Achievement::new(
            "score_100",
            "Score Enthusiast",
            "Reach a score of 100.",
            AchievementCondition::ScoreAtLeast(100.0),
        ),
        Achievement::new(
            "first_multiplier",
            "Getting Started",
            "Buy your first multiplier upgrade.",
            AchievementCondition::MultiplierAbove(1),
        ),
        Achievement::new(
            "passive_income_unlocked",
            "Idle Master",
            "Unlock passive income.",
            AchievementCondition::PassiveLevelAbove(0),
        ),
    ]
}

/// Achievements for gems and items brought back by missions. Registered by
/// the session after the built-ins.
pub fn expedition_achievements() -> Vec<Achievement> {
    vec![
        Achievement::new(
            "gem_collector",
            "Gem Collector",
            "Hold 10 gems.",
            AchievementCondition::GemsAtLeast(10),
        ),
        Achievement::new(
            "treasure_hunter",
            "Treasure Hunter",
            "Bring an item home.",
            AchievementCondition::InventoryAtLeast(1),
        ),
    ]
}

/// Registry of achievements in declaration order.
#[derive(Clone, Debug, Default)]
pub struct AchievementEvaluator {
    achievements: Vec<Achievement>,
}

impl AchievementEvaluator {
    pub fn new(achievements: Vec<Achievement>) -> Self {
        Self { achievements }
    }

    pub fn with_builtins() -> Self {
        Self::new(builtin_achievements())
    }

    /// Add an achievement after the existing ones. Returns false (and keeps
    /// the existing one) if the id is already registered.
    pub fn register(&mut self, achievement: Achievement) -> bool {
        if self.achievements.iter().any(|a| a.id == achievement.id) {
            return false;
        }
        self.achievements.push(achievement);
        true
    }

    /// Unlock every still-locked achievement whose condition holds. Returns
    /// the newly unlocked ids in declaration order.
    pub fn evaluate(&mut self, state: &ProgressionState) -> Vec<String> {
        let mut newly_unlocked = Vec::new();
        for achievement in self.achievements.iter_mut().filter(|a| !a.unlocked) {
            if achievement.condition.is_met(state) {
                achievement.unlocked = true;
                log::info!("achievement unlocked: {}", achievement.name);
                newly_unlocked.push(achievement.id.clone());
            }
        }
        newly_unlocked
    }

    /// Apply saved flags. Unknown ids are ignored; achievements missing from
    /// the save stay locked.
    pub fn restore(&mut self, saved: &[AchievementFlag]) {
        for achievement in &mut self.achievements {
            achievement.unlocked = saved
                .iter()
                .find(|flag| flag.id == achievement.id)
                .is_some_and(|flag| flag.unlocked);
        }
    }

    pub fn serialize(&self) -> Vec<AchievementFlag> {
        self.achievements
            .iter()
            .map(|a| AchievementFlag {
                id: a.id.clone(),
                unlocked: a.unlocked,
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn all(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.unlocked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(evaluator: &AchievementEvaluator) -> Vec<&str> {
        evaluator.all().iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn builtins_in_declaration_order() {
        let evaluator = AchievementEvaluator::with_builtins();
        assert_eq!(
            ids(&evaluator),
            vec![
                "first_click",
                "score_100",
                "first_multiplier",
                "passive_income_unlocked"
            ]
        );
        assert_eq!(evaluator.unlocked_count(), 0);
    }

    #[test]
    fn fresh_state_unlocks_nothing() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        assert!(evaluator.evaluate(&ProgressionState::new()).is_empty());
    }

    #[test]
    fn first_click_unlocks_once() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        let mut state = ProgressionState::new();
        state.score = 1.0;
        assert_eq!(evaluator.evaluate(&state), vec!["first_click"]);
        assert!(evaluator.evaluate(&state).is_empty());
        assert!(evaluator.get("first_click").unwrap().unlocked);
    }

    #[test]
    fn multiple_unlocks_follow_declaration_order() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        let mut state = ProgressionState::new();
        state.score = 150.0;
        state.multiplier = 2;
        state.passive_level = 1;
        assert_eq!(
            evaluator.evaluate(&state),
            vec![
                "first_click",
                "score_100",
                "first_multiplier",
                "passive_income_unlocked"
            ]
        );
    }

    #[test]
    fn unlock_survives_condition_becoming_false() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        let mut state = ProgressionState::new();
        state.score = 120.0;
        evaluator.evaluate(&state);
        state.score = 0.0;
        assert!(evaluator.evaluate(&state).is_empty());
        assert!(evaluator.get("score_100").unwrap().unlocked);
    }

    #[test]
    fn custom_achievements_are_data() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        assert!(evaluator.register(Achievement::new(
            "gem_hoarder",
            "Gem Hoarder",
            "Hold 10 gems.",
            AchievementCondition::GemsAtLeast(10),
        )));
        assert!(!evaluator.register(Achievement::new(
            "gem_hoarder",
            "Duplicate",
            "",
            AchievementCondition::GemsAtLeast(1),
        )));
        assert_eq!(evaluator.all().len(), 5);

        let mut state = ProgressionState::new();
        state.gems = 10;
        assert_eq!(evaluator.evaluate(&state), vec!["gem_hoarder"]);
    }

    #[test]
    fn inventory_condition() {
        let mut evaluator = AchievementEvaluator::new(vec![Achievement::new(
            "collector",
            "Collector",
            "Own two items.",
            AchievementCondition::InventoryAtLeast(2),
        )]);
        let mut state = ProgressionState::new();
        state.inventory.push("a".into());
        assert!(evaluator.evaluate(&state).is_empty());
        state.inventory.push("a".into());
        assert_eq!(evaluator.evaluate(&state), vec!["collector"]);
    }

    #[test]
    fn restore_ignores_unknown_and_defaults_missing_to_locked() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        evaluator.restore(&[
            AchievementFlag {
                id: "score_100".into(),
                unlocked: true,
            },
            AchievementFlag {
                id: "retired_achievement".into(),
                unlocked: true,
            },
        ]);
        assert!(evaluator.get("score_100").unwrap().unlocked);
        assert!(!evaluator.get("first_click").unwrap().unlocked);
        assert!(evaluator.get("retired_achievement").is_none());
        assert_eq!(evaluator.unlocked_count(), 1);
    }

    #[test]
    fn restored_unlock_is_not_reported_again() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        evaluator.restore(&[AchievementFlag {
            id: "first_click".into(),
            unlocked: true,
        }]);
        let mut state = ProgressionState::new();
        state.score = 5.0;
        assert!(evaluator.evaluate(&state).is_empty());
    }

    #[test]
    fn serialize_restore_roundtrip() {
        let mut evaluator = AchievementEvaluator::with_builtins();
        let mut state = ProgressionState::new();
        state.multiplier = 2;
        evaluator.evaluate(&state);

        let saved = evaluator.serialize();
        assert_eq!(saved.len(), 4);

        let mut restored = AchievementEvaluator::with_builtins();
        restored.restore(&saved);
        assert_eq!(restored.serialize(), saved);
    }
}
