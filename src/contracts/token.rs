use serde::Serialize;
use std::collections::HashMap;

use crate::error::{ChainError, Result};
use crate::transaction::GENESIS_ADDRESS;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: i64,
}

/// Fungible token ledger kept inside the token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    pub info: TokenInfo,
    balances: HashMap<String, i64>,
    // (owner, spender) -> remaining allowance
    allowances: HashMap<(String, String), i64>,
}

fn positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(ChainError::validation(format!("amount must be positive, got {}", amount)));
    }
    Ok(())
}

impl TokenState {
    /// Whole supply starts with the `genesis` address.
    pub fn new(name: &str, symbol: &str, decimals: u8, supply: i64) -> Self {
        let mut balances = HashMap::new();
        balances.insert(GENESIS_ADDRESS.to_string(), supply);
        TokenState {
            info: TokenInfo {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
                total_supply: supply,
            },
            balances,
            allowances: HashMap::new(),
        }
    }

    pub fn balance_of(&self, owner: &str) -> i64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &str, spender: &str) -> i64 {
        self.allowances
            .get(&(owner.to_string(), spender.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn debit(&mut self, owner: &str, amount: i64) -> Result<()> {
        let balance = self.balance_of(owner);
        if balance < amount {
            return Err(ChainError::validation(format!(
                "insufficient token balance for {}: {} < {}",
                owner, balance, amount
            )));
        }
        self.balances.insert(owner.to_string(), balance - amount);
        Ok(())
    }

    fn credited(&self, owner: &str, amount: i64) -> Result<i64> {
        self.balance_of(owner)
            .checked_add(amount)
            .ok_or_else(|| ChainError::validation(format!("token balance of {} would overflow", owner)))
    }

    fn credit(&mut self, owner: &str, amount: i64) -> Result<()> {
        let balance = self.credited(owner, amount)?;
        self.balances.insert(owner.to_string(), balance);
        Ok(())
    }

    pub fn transfer(&mut self, from: &str, to: &str, amount: i64) -> Result<()> {
        positive(amount)?;
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Supply and recipient balance are both checked before either is written.
    pub fn mint(&mut self, to: &str, amount: i64) -> Result<()> {
        positive(amount)?;
        let supply = self
            .info
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| ChainError::validation(format!("minting {} would overflow the total supply", amount)))?;
        let balance = self.credited(to, amount)?;
        self.balances.insert(to.to_string(), balance);
        self.info.total_supply = supply;
        Ok(())
    }

    pub fn approve(&mut self, owner: &str, spender: &str, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(ChainError::validation("allowance cannot be negative"));
        }
        self.allowances.insert((owner.to_string(), spender.to_string()), amount);
        Ok(())
    }

    pub fn transfer_from(&mut self, spender: &str, from: &str, to: &str, amount: i64) -> Result<()> {
        positive(amount)?;
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(ChainError::validation(format!(
                "allowance of {} from {} is {}, needs {}",
                spender, from, allowed, amount
            )));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.allowances.insert((from.to_string(), spender.to_string()), allowed - amount);
        Ok(())
    }

    pub fn burn(&mut self, from: &str, amount: i64) -> Result<()> {
        positive(amount)?;
        self.debit(from, amount)?;
        self.info.total_supply -= amount;
        Ok(())
    }
}
