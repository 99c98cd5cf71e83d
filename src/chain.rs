use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{ChainError, Result};
use crate::pow::{meets_difficulty, CancelFlag};
use crate::transaction::{Transaction, TxType};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    pub total_blocks: usize,
    pub total_transactions: usize,
    pub total_supply: i64,
    pub carbon_offset: i64,
    pub mining_difficulty: usize,
}

/// Receives transactions produced outside the ledger (contract calls and deployments).
pub trait LedgerSink: Send + Sync {
    /// Same contract as [`Ledger::add_transaction`]: `false` is a rejection.
    fn submit_transaction(&self, tx: Transaction) -> bool;
}

/// Append-only block chain plus the pending-transaction pool.
///
/// Single writer: callers share it behind one mutex.
pub struct Ledger {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
    config: LedgerConfig,
    carbon_offset: i64,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let genesis = Block::genesis(config.total_supply);
        info!(hash = %genesis.hash, supply = config.total_supply, "genesis block created");
        Ledger {
            chain: vec![genesis],
            pending_transactions: Vec::new(),
            config,
            carbon_offset: 0,
            clock,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    // Never zero: the genesis block is always present
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn latest_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Queues `tx` if the sender can cover it. System mints are always accepted.
    /// Negative amounts are refused from every sender.
    ///
    /// The balance check replays sealed blocks only; pending debits are not counted.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        if tx.amount < 0 {
            debug!(id = %tx.id, from = %tx.from_address, amount = tx.amount, "transaction rejected: negative amount");
            return false;
        }
        if !tx.is_system() {
            let balance = self.get_balance(&tx.from_address);
            if balance < tx.amount {
                debug!(id = %tx.id, from = %tx.from_address, balance, amount = tx.amount, "transaction rejected: insufficient balance");
                return false;
            }
        }
        debug!(id = %tx.id, kind = ?tx.tx_type, amount = tx.amount, "transaction queued");
        self.pending_transactions.push(tx);
        true
    }

    /// Full replay of every sealed transaction. O(total transactions) by design of the ledger contract.
    pub fn get_balance(&self, address: &str) -> i64 {
        let mut balance: i64 = 0;
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.from_address == address {
                    balance -= tx.amount;
                }
                if tx.to_address == address {
                    balance += tx.amount;
                }
            }
        }
        balance
    }

    /// Unsealed block holding every pending transaction followed by the mining reward.
    ///
    /// The pool itself is not touched; [`Ledger::submit_block`] drains it.
    pub fn get_mining_candidate(&self, reward_address: &str) -> Block {
        let now = self.clock.now_millis();
        let mut txs = self.pending_transactions.clone();
        txs.push(Transaction::new_mining_reward(reward_address, self.config.mining_reward, now));

        let tip = self.latest_block();
        Block::new(self.chain.len() as u64, tip.hash.clone(), txs, now, self.config.block_carbon_offset)
    }

    /// Appends a sealed candidate and drains the pending transactions it carries.
    ///
    /// Everything is checked before anything is written.
    pub fn submit_block(&mut self, block: Block) -> Result<String> {
        let expected_index = self.chain.len() as u64;
        if block.index != expected_index {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: format!("expected index {}", expected_index),
            });
        }
        if block.previous_hash != self.latest_block().hash {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: String::from("previous hash does not match chain tip"),
            });
        }
        if block.merkle_root != Block::calculate_merkle_root(&block.transactions) {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: String::from("merkle root mismatch"),
            });
        }
        if block.hash != block.calculate_hash() {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: String::from("hash mismatch"),
            });
        }
        if !meets_difficulty(&block.hash, self.config.mining_difficulty) {
            return Err(ChainError::validation(format!(
                "block hash {} does not meet difficulty {}",
                block.hash, self.config.mining_difficulty
            )));
        }

        // Last transaction is the reward; the rest must be the head of the pool, unaltered
        let Some((reward, carried_txs)) = block.transactions.split_last() else {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: String::from("block carries no reward transaction"),
            });
        };
        if !reward.is_system() || reward.tx_type != TxType::MiningReward || reward.amount != self.config.mining_reward {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: format!("reward transaction must mint exactly {}", self.config.mining_reward),
            });
        }
        let carried = carried_txs.len();
        let is_prefix = carried <= self.pending_transactions.len()
            && carried_txs.iter().zip(&self.pending_transactions).all(|(sealed, pending)| sealed == pending);
        if !is_prefix {
            return Err(ChainError::Consistency {
                index: block.index,
                reason: String::from("block transactions are not the head of the pending pool"),
            });
        }

        self.pending_transactions.drain(..carried);
        self.carbon_offset += block.carbon_offset;
        let hash = block.hash.clone();
        info!(index = block.index, nonce = block.nonce, txs = block.transactions.len(), hash = %hash, "block mined");
        self.chain.push(block);
        Ok(hash)
    }

    /// Builds, seals and appends a block in one call, blocking for the search.
    ///
    /// If the search runs out of budget nothing changes, the reward included.
    pub fn mine_pending_transactions(&mut self, reward_address: &str, cancel: &CancelFlag) -> Result<String> {
        let mut candidate = self.get_mining_candidate(reward_address);
        if let Err(e) = candidate.mine(self.config.mining_difficulty, &self.config.budget, cancel) {
            warn!(index = candidate.index, error = %e, "mining gave up");
            return Err(e.into());
        }
        self.submit_block(candidate)
    }

    /// Full rescan of hash integrity and linkage, reporting the first broken block.
    pub fn verify_chain(&self) -> Result<()> {
        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let previous = &self.chain[i - 1];
            if current.hash != current.calculate_hash() {
                return Err(ChainError::Consistency {
                    index: current.index,
                    reason: String::from("stored hash differs from recomputed hash"),
                });
            }
            if current.previous_hash != previous.hash {
                return Err(ChainError::Consistency {
                    index: current.index,
                    reason: String::from("previous hash does not match prior block"),
                });
            }
        }
        Ok(())
    }

    pub fn validate_chain(&self) -> bool {
        match self.verify_chain() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "chain validation failed");
                false
            }
        }
    }

    pub fn get_chain_stats(&self) -> ChainStats {
        ChainStats {
            total_blocks: self.chain.len(),
            total_transactions: self.chain.iter().map(|b| b.transactions.len()).sum(),
            total_supply: self.config.total_supply,
            carbon_offset: self.carbon_offset,
            mining_difficulty: self.config.mining_difficulty,
        }
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

impl LedgerSink for parking_lot::Mutex<Ledger> {
    fn submit_transaction(&self, tx: Transaction) -> bool {
        self.lock().add_transaction(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SearchBudget;
    use crate::error::SearchError;
    use crate::transaction::GENESIS_ADDRESS;

    fn ledger() -> Ledger {
        Ledger::new(LedgerConfig::default(), Arc::new(ManualClock::new(1_800_000_000_000)))
    }

    #[test]
    fn fresh_ledger_has_genesis_only() {
        let l = ledger();
        assert_eq!(l.len(), 1);
        assert_eq!(l.latest_block().index, 0);
        assert!(l.latest_block().hash.starts_with("00"));
        assert_eq!(l.get_balance(GENESIS_ADDRESS), 1_000_000_000);
        assert!(l.validate_chain());
    }

    #[test]
    fn mining_credits_recipient_and_extends_chain() {
        let mut l = ledger();
        assert!(l.add_transaction(Transaction::new_mining_reward("alice", 1000, 0)));
        let hash = l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();

        assert_eq!(l.len(), 2);
        assert_eq!(l.latest_block().hash, hash);
        assert!(hash.starts_with("00"));
        assert_eq!(l.get_balance("alice"), 1000);
        assert_eq!(l.get_balance("miner"), 1000);
        assert!(l.pending_transactions().is_empty());
        assert!(l.validate_chain());
    }

    #[test]
    fn rejects_spend_beyond_sealed_balance() {
        let mut l = ledger();
        assert!(!l.add_transaction(Transaction::new("bob", "carol", 1, 0)));
        assert!(l.pending_transactions().is_empty());

        assert!(l.add_transaction(Transaction::new("genesis", "bob", 500, 0)));
        // Not sealed yet, so bob still has nothing
        assert!(!l.add_transaction(Transaction::new("bob", "carol", 1, 0)));
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();

        assert!(l.add_transaction(Transaction::new("bob", "carol", 500, 0)));
        assert!(!l.add_transaction(Transaction::new("bob", "carol", 501, 0)));
    }

    #[test]
    fn balance_is_credits_minus_debits() {
        let mut l = ledger();
        l.add_transaction(Transaction::new("genesis", "bob", 700, 0));
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        l.add_transaction(Transaction::new("bob", "carol", 200, 0));
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();

        assert_eq!(l.get_balance("bob"), 500);
        assert_eq!(l.get_balance("carol"), 200);
        assert_eq!(l.get_balance("genesis"), 1_000_000_000 - 700);
        assert_eq!(l.get_balance("miner"), 2000);
    }

    #[test]
    fn tampering_breaks_validation() {
        let mut l = ledger();
        l.add_transaction(Transaction::new("genesis", "bob", 700, 0));
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        assert!(l.validate_chain());

        l.blocks_mut()[1].transactions[0].amount = 9_999;
        assert!(!l.validate_chain());
        assert!(matches!(l.verify_chain(), Err(ChainError::Consistency { index: 1, .. })));
    }

    #[test]
    fn relinking_is_detected() {
        let mut l = ledger();
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();

        let block = &mut l.blocks_mut()[2];
        block.previous_hash = "ff".repeat(32);
        block.hash = block.calculate_hash();
        assert!(matches!(l.verify_chain(), Err(ChainError::Consistency { index: 2, .. })));
    }

    #[test]
    fn exhausted_budget_changes_nothing() {
        let config = LedgerConfig {
            mining_difficulty: 64,
            budget: SearchBudget::attempts(50),
            ..LedgerConfig::default()
        };
        let mut l = Ledger::new(config, Arc::new(ManualClock::new(0)));
        l.add_transaction(Transaction::new_mining_reward("alice", 10, 0));

        let err = l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap_err();
        assert_eq!(err, ChainError::Search(SearchError::Exhausted { attempts: 50 }));
        assert_eq!(l.len(), 1);
        assert_eq!(l.pending_transactions().len(), 1);
    }

    #[test]
    fn stale_candidate_is_refused() {
        let mut l = ledger();
        let mut stale = l.get_mining_candidate("a");
        stale.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();
        l.mine_pending_transactions("b", &CancelFlag::new()).unwrap();

        assert!(matches!(l.submit_block(stale), Err(ChainError::Consistency { .. })));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn submit_keeps_transactions_queued_after_candidate() {
        let mut l = ledger();
        l.add_transaction(Transaction::new_mining_reward("early", 1, 0));
        let mut candidate = l.get_mining_candidate("miner");
        l.add_transaction(Transaction::new_mining_reward("late", 1, 0));

        candidate.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();
        l.submit_block(candidate).unwrap();

        assert_eq!(l.pending_transactions().len(), 1);
        assert_eq!(l.pending_transactions()[0].to_address, "late");
        assert_eq!(l.get_balance("early"), 1);
    }

    #[test]
    fn unsealed_candidate_is_refused() {
        let mut l = Ledger::new(
            LedgerConfig { mining_difficulty: 8, ..LedgerConfig::default() },
            Arc::new(ManualClock::new(0)),
        );
        let candidate = l.get_mining_candidate("miner");
        if !candidate.hash.starts_with("00000000") {
            assert!(matches!(l.submit_block(candidate), Err(ChainError::Validation(_))));
        }
    }

    #[test]
    fn negative_amount_is_refused() {
        let mut l = ledger();
        assert!(!l.add_transaction(Transaction::new("mallory", GENESIS_ADDRESS, -500_000, 0)));
        assert!(!l.add_transaction(Transaction::new_mining_reward("mallory", -1, 0)));
        assert!(l.pending_transactions().is_empty());

        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        assert_eq!(l.get_balance("mallory"), 0);
        assert_eq!(l.get_balance(GENESIS_ADDRESS), 1_000_000_000);
    }

    #[test]
    fn inflated_reward_is_refused() {
        let mut l = ledger();
        let mut candidate = l.get_mining_candidate("miner");
        candidate.transactions[0].amount = 999_999_999;
        candidate.merkle_root = Block::calculate_merkle_root(&candidate.transactions);
        candidate.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();

        assert!(matches!(l.submit_block(candidate), Err(ChainError::Consistency { index: 1, .. })));
        assert_eq!(l.len(), 1);
        assert_eq!(l.get_balance("miner"), 0);
    }

    #[test]
    fn altered_pending_body_is_refused() {
        let mut l = ledger();
        assert!(l.add_transaction(Transaction::new(GENESIS_ADDRESS, "bob", 10, 0)));
        let mut candidate = l.get_mining_candidate("miner");
        // Same id, different recipient
        candidate.transactions[0].to_address = String::from("mallory");
        candidate.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();

        assert!(matches!(l.submit_block(candidate), Err(ChainError::Consistency { .. })));
        assert_eq!(l.len(), 1);
        assert_eq!(l.pending_transactions().len(), 1);
        assert_eq!(l.pending_transactions()[0].to_address, "bob");
    }

    #[test]
    fn block_without_reward_is_refused() {
        let mut l = ledger();
        let mut empty = Block::new(1, l.latest_block().hash.clone(), Vec::new(), 0, 0);
        empty.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();
        assert!(matches!(l.submit_block(empty), Err(ChainError::Consistency { .. })));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn stats_track_blocks_and_carbon() {
        let mut l = ledger();
        l.add_transaction(Transaction::new("genesis", "bob", 1, 0));
        l.mine_pending_transactions("miner", &CancelFlag::new()).unwrap();
        let stats = l.get_chain_stats();
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.carbon_offset, 10);
        assert_eq!(stats.total_supply, 1_000_000_000);
        assert_eq!(stats.mining_difficulty, 2);
    }
}
