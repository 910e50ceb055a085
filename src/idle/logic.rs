//! Progression operations: pure functions over `ProgressionState`.
//!
//! Each function is one atomic mutation. Follow-up work (achievement checks,
//! persistence) is the session's job.

use std::ops::RangeInclusive;

use rand::Rng;

use super::error::ActionError;
use super::missions::MissionRewards;
use super::state::{ProgressionState, MULTIPLIER_COST_GROWTH, PASSIVE_COST_GROWTH};

/// Manual click: add `multiplier` to score. Returns the amount gained.
pub fn click(state: &mut ProgressionState) -> f64 {
    let gained = state.multiplier as f64;
    state.score += gained;
    gained
}

/// Buy one level of click multiplier.
pub fn buy_multiplier(state: &mut ProgressionState) -> Result<(), ActionError> {
    let cost = state.multiplier_cost;
    ensure_affordable(state, cost)?;
    state.score -= cost;
    state.multiplier += 1;
    state.multiplier_cost = (cost * MULTIPLIER_COST_GROWTH).floor();
    state.recompute_passive_income_rate();
    Ok(())
}

/// Buy one level of passive income.
pub fn buy_passive_upgrade(state: &mut ProgressionState) -> Result<(), ActionError> {
    let cost = state.passive_upgrade_cost;
    ensure_affordable(state, cost)?;
    state.score -= cost;
    state.passive_level += 1;
    state.passive_upgrade_cost = (cost * PASSIVE_COST_GROWTH).floor();
    state.recompute_passive_income_rate();
    Ok(())
}

fn ensure_affordable(state: &ProgressionState, cost: f64) -> Result<(), ActionError> {
    if state.can_afford(cost) {
        Ok(())
    } else {
        Err(ActionError::InsufficientFunds {
            cost,
            available: state.score,
        })
    }
}

/// Search for gems: draws once from `rng` and adds a uniform amount in `range`.
/// Returns the number of gems found.
pub fn find_gems(
    state: &mut ProgressionState,
    rng: &mut impl Rng,
    range: RangeInclusive<u64>,
) -> u64 {
    let found = if range.is_empty() {
        *range.start()
    } else {
        rng.random_range(range)
    };
    state.gems += found;
    found
}

/// Append an item to the inventory. No dedup, no capacity limit.
pub fn add_inventory_item(state: &mut ProgressionState, item: impl Into<String>) {
    state.inventory.push(item.into());
}

/// One second of passive accrual. Returns the amount gained.
pub fn apply_passive_tick(state: &mut ProgressionState) -> f64 {
    let gained = state.passive_income_rate;
    state.score += gained;
    gained
}

/// Grant mission rewards.
pub fn apply_rewards(state: &mut ProgressionState, rewards: &MissionRewards) {
    if let Some(score) = rewards.score {
        state.score += score;
    }
    if let Some(gems) = rewards.gems {
        state.gems += gems;
    }
    for item in &rewards.items {
        add_inventory_item(state, item.clone());
    }
}

/// Format a number with commas (e.g. 1234567 → "1,234,567").
pub fn format_number(n: f64) -> String {
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }
    let int_part = n.floor() as u64;
    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
