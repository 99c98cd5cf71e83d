//! Economy-level tuning of the per-action base rewards.
//!
//! The optimizer reads analyzer snapshots and suggests new base rewards. It
//! never touches the ledger; callers decide whether to apply the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::behavior::{AnalyzerStats, UserBehaviorPattern};
use crate::proof::ActionKind;

/// Daily action volume the difficulty adjustment steers towards.
const TARGET_ACTIONS: f64 = 100_000.0;
/// Inflation pressure grows by a tenth per million processed actions.
const PRESSURE_STEP: f64 = 1_000_000.0;
/// User count at which distribution is considered healthy.
const HEALTHY_USERS: f64 = 1_000.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RewardOptimization {
    pub optimized_rewards: BTreeMap<String, i64>,
    pub difficulty_adjustment: f64,
    pub economy_health: f64,
    pub recommended_changes: Vec<String>,
}

pub struct RewardOptimizer {
    base_rewards: BTreeMap<String, i64>,
    difficulty_multiplier: f64,
    economy_balance: f64,
}

impl Default for RewardOptimizer {
    fn default() -> Self {
        let base_rewards = [
            ActionKind::Click,
            ActionKind::Scroll,
            ActionKind::Share,
            ActionKind::FormSubmit,
            ActionKind::Referral,
            ActionKind::DailyLogin,
        ]
        .iter()
        .map(|kind| (kind.as_str().to_string(), kind.base_reward()))
        .collect();
        RewardOptimizer {
            base_rewards,
            difficulty_multiplier: 1.0,
            economy_balance: 1.0,
        }
    }
}

impl RewardOptimizer {
    pub fn current_rewards(&self) -> &BTreeMap<String, i64> {
        &self.base_rewards
    }

    pub fn update_base_reward(&mut self, action_type: &str, reward: i64) {
        self.base_rewards.insert(action_type.to_string(), reward);
        info!(action = action_type, reward, "base reward updated");
    }

    /// Rewards are scaled by the health and difficulty from the previous run;
    /// this run's figures are stored for the next one.
    pub fn calculate_optimal_rewards(&mut self, patterns: &[UserBehaviorPattern], stats: &AnalyzerStats) -> RewardOptimization {
        let economy_health = economy_health(patterns.len(), stats);
        let difficulty_adjustment = difficulty_adjustment(stats);
        let optimized_rewards = self.optimize_action_rewards(patterns, stats);
        let recommended_changes = recommendations(economy_health, difficulty_adjustment);

        self.difficulty_multiplier = difficulty_adjustment;
        self.economy_balance = economy_health;
        info!(users = patterns.len(), economy_health, difficulty_adjustment, "rewards optimized");

        RewardOptimization {
            optimized_rewards,
            difficulty_adjustment,
            economy_health,
            recommended_changes,
        }
    }

    fn optimize_action_rewards(&self, patterns: &[UserBehaviorPattern], stats: &AnalyzerStats) -> BTreeMap<String, i64> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for event in patterns.iter().flat_map(|p| &p.action_history) {
            *counts.entry(event.action_type.as_str()).or_insert(0) += 1;
        }

        let total = stats.total_actions_processed as f64;
        self.base_rewards
            .iter()
            .map(|(action, base)| {
                let seen = counts.get(action.as_str()).copied().unwrap_or(0) as f64;
                let ratio = if total > 0.0 { seen / total } else { 0.0 };
                let multiplier = frequency_multiplier(ratio);
                let reward = (*base as f64 * multiplier * self.economy_balance * self.difficulty_multiplier) as i64;
                debug!(action = %action, reward, ratio, multiplier, "optimized reward");
                (action.clone(), reward.max(1))
            })
            .collect()
    }
}

// Rarer actions earn more
fn frequency_multiplier(ratio: f64) -> f64 {
    if ratio > 0.5 {
        0.8
    } else if ratio > 0.2 {
        1.0
    } else if ratio > 0.05 {
        1.2
    } else {
        1.5
    }
}

fn economy_health(users: usize, stats: &AnalyzerStats) -> f64 {
    let total = stats.total_actions_processed as f64;
    let inflation_pressure = if total > PRESSURE_STEP { 1.0 + total / PRESSURE_STEP * 0.1 } else { 1.0 };
    let fraud_impact = 1.0 - stats.current_fraud_rate * 0.5;
    let distribution = (users as f64 / HEALTHY_USERS).min(1.0);
    (fraud_impact * distribution / inflation_pressure).clamp(0.1, 2.0)
}

fn difficulty_adjustment(stats: &AnalyzerStats) -> f64 {
    let rate = stats.total_actions_processed as f64 / TARGET_ACTIONS;
    let adjustment = if rate > 1.0 { 1.0 + (rate - 1.0) * 0.1 } else { 0.9 + rate * 0.1 };
    adjustment.clamp(0.5, 2.0)
}

fn recommendations(economy_health: f64, difficulty_adjustment: f64) -> Vec<String> {
    let mut out = Vec::new();
    if economy_health < 0.8 {
        out.push(String::from("Consider reducing base reward rates to control inflation"));
    } else if economy_health > 1.2 {
        out.push(String::from("Economy is stable - consider increasing rewards to boost participation"));
    }
    if difficulty_adjustment > 1.1 {
        out.push(String::from("High activity detected - increase mining difficulty to balance rewards"));
    } else if difficulty_adjustment < 0.9 {
        out.push(String::from("Low activity detected - consider reducing difficulty or increasing rewards"));
    }
    if out.is_empty() {
        out.push(String::from("Economy is well-balanced - maintain current reward structure"));
    }
    out
}
