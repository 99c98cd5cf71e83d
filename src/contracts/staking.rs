use serde::Serialize;
use std::collections::HashMap;

use crate::config::ContractsConfig;
use crate::error::{ChainError, Result};

/// 365.25 days in milliseconds.
pub const YEAR_MS: f64 = 31_557_600_000.0;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StakeInfo {
    pub amount: i64,
    pub staked_at: i64,
    pub last_claim_at: i64,
    pub total_rewards_claimed: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StakeView {
    pub staker: String,
    pub amount: i64,
    pub staked_at: i64,
    pub pending_rewards: i64,
    pub total_rewards_claimed: i64,
    pub can_unstake: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PoolStats {
    pub total_staked: i64,
    pub reward_rate: f64,
    pub min_stake: i64,
    pub total_stakers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StakingState {
    total_staked: i64,
    reward_rate: f64,
    min_stake: i64,
    lock_period_ms: i64,
    stakes: HashMap<String, StakeInfo>,
}

impl StakingState {
    pub fn new(config: &ContractsConfig) -> Self {
        StakingState {
            total_staked: 0,
            reward_rate: config.reward_rate,
            min_stake: config.min_stake,
            lock_period_ms: config.lock_period_ms,
            stakes: HashMap::new(),
        }
    }

    fn stake_of(&self, staker: &str) -> Result<&StakeInfo> {
        self.stakes
            .get(staker)
            .ok_or_else(|| ChainError::not_found(format!("no stake for {}", staker)))
    }

    /// Adds to an existing stake without resetting its timestamps.
    pub fn stake(&mut self, staker: &str, amount: i64, now: i64) -> Result<()> {
        if amount < self.min_stake {
            return Err(ChainError::validation(format!(
                "stake of {} is below the minimum {}",
                amount, self.min_stake
            )));
        }
        let overflow = || ChainError::validation(format!("stake of {} would overflow the pool", amount));
        let total = self.total_staked.checked_add(amount).ok_or_else(overflow)?;
        match self.stakes.get_mut(staker) {
            Some(existing) => existing.amount = existing.amount.checked_add(amount).ok_or_else(overflow)?,
            None => {
                self.stakes.insert(
                    staker.to_string(),
                    StakeInfo {
                        amount,
                        staked_at: now,
                        last_claim_at: now,
                        total_rewards_claimed: 0,
                    },
                );
            }
        }
        self.total_staked = total;
        Ok(())
    }

    /// `floor(amount * rate * years since last claim)`.
    pub fn pending_rewards(&self, stake: &StakeInfo, now: i64) -> i64 {
        let years = (now - stake.last_claim_at).max(0) as f64 / YEAR_MS;
        (stake.amount as f64 * self.reward_rate * years).floor() as i64
    }

    pub fn get_stake(&self, staker: &str, now: i64) -> Result<StakeView> {
        let stake = self.stake_of(staker)?;
        Ok(StakeView {
            staker: staker.to_string(),
            amount: stake.amount,
            staked_at: stake.staked_at,
            pending_rewards: self.pending_rewards(stake, now),
            total_rewards_claimed: stake.total_rewards_claimed,
            can_unstake: now - stake.staked_at >= self.lock_period_ms,
        })
    }

    pub fn unstake(&mut self, staker: &str, amount: i64, now: i64) -> Result<()> {
        let stake = self.stake_of(staker)?;
        if now - stake.staked_at < self.lock_period_ms {
            return Err(ChainError::validation(format!("stake of {} is still locked", staker)));
        }
        if amount <= 0 || amount > stake.amount {
            return Err(ChainError::validation(format!(
                "cannot unstake {} of {} staked",
                amount, stake.amount
            )));
        }
        let remaining = stake.amount - amount;
        if remaining == 0 {
            self.stakes.remove(staker);
        } else if let Some(stake) = self.stakes.get_mut(staker) {
            stake.amount = remaining;
        }
        self.total_staked -= amount;
        Ok(())
    }

    /// Returns the rewards paid out; the accrual clock restarts only when something was paid.
    pub fn claim_rewards(&mut self, staker: &str, now: i64) -> Result<i64> {
        let rewards = self.pending_rewards(self.stake_of(staker)?, now);
        if rewards > 0 {
            if let Some(stake) = self.stakes.get_mut(staker) {
                stake.last_claim_at = now;
                stake.total_rewards_claimed = stake.total_rewards_claimed.saturating_add(rewards);
            }
        }
        Ok(rewards)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_staked: self.total_staked,
            reward_rate: self.reward_rate,
            min_stake: self.min_stake,
            total_stakers: self.stakes.len(),
        }
    }
}
