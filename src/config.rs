use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Limits applied to a proof-of-work nonce search. `None` means unbounded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SearchBudget {
    pub max_attempts: Option<u64>,
    pub max_duration_ms: Option<u64>,
}

impl SearchBudget {
    pub fn unbounded() -> Self {
        SearchBudget { max_attempts: None, max_duration_ms: None }
    }

    pub fn attempts(max_attempts: u64) -> Self {
        SearchBudget { max_attempts: Some(max_attempts), max_duration_ms: None }
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        SearchBudget {
            max_attempts: Some(10_000_000),
            max_duration_ms: Some(30_000),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex characters required of a sealed block hash.
    pub mining_difficulty: usize,
    pub mining_reward: i64,
    /// Credited to the `genesis` address by the genesis block.
    pub total_supply: i64,
    pub block_carbon_offset: i64,
    /// Mine a block after this many accepted action transactions.
    pub auto_mine_every: u64,
    pub budget: SearchBudget,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            mining_difficulty: 2,
            mining_reward: 1000,
            total_supply: 1_000_000_000,
            block_carbon_offset: 10,
            auto_mine_every: 10,
            budget: SearchBudget::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProofConfig {
    pub difficulty: u8,
    pub min_authenticity: f64,
    pub milestone_every: u64,
    pub milestone_bonus: i64,
    pub budget: SearchBudget,
}

impl Default for ProofConfig {
    fn default() -> Self {
        ProofConfig {
            difficulty: 2,
            min_authenticity: 0.7,
            milestone_every: 50,
            milestone_bonus: 200,
            budget: SearchBudget::default(),
        }
    }
}

/// Thresholds and multipliers of the behavioral fraud heuristics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub min_action_interval_ms: i64,
    pub too_fast_penalty: f64,
    pub frequency_window_ms: i64,
    pub max_actions_per_minute: usize,
    pub frequency_penalty: f64,
    pub device_switching_threshold: usize,
    pub device_penalty: f64,
    pub low_reputation_threshold: f64,
    pub low_reputation_penalty: f64,
    pub repetition_window: usize,
    pub reputation_decay: f64,
    pub global_decay: f64,
    pub suspicious_score: f64,
    pub score_floor: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            min_action_interval_ms: 50,
            too_fast_penalty: 0.2,
            frequency_window_ms: 60_000,
            max_actions_per_minute: 120,
            frequency_penalty: 0.1,
            device_switching_threshold: 5,
            device_penalty: 0.3,
            low_reputation_threshold: 0.5,
            low_reputation_penalty: 0.6,
            repetition_window: 10,
            reputation_decay: 0.95,
            global_decay: 0.999,
            suspicious_score: 0.5,
            score_floor: 0.1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContractsConfig {
    pub token_supply: i64,
    /// Annual yield of the staking pool.
    pub reward_rate: f64,
    pub min_stake: i64,
    pub lock_period_ms: i64,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        ContractsConfig {
            token_supply: 1_000_000_000,
            reward_rate: 0.125,
            min_stake: 10_000,
            lock_period_ms: (7 * DAY_MS) as i64,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub ledger: LedgerConfig,
    pub proof: ProofConfig,
    pub behavior: BehaviorConfig,
    pub contracts: ContractsConfig,
}

impl NodeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
