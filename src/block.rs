use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchBudget;
use crate::error::SearchError;
use crate::merkle::{self, ProofStep};
use crate::pow::{self, sha256_hex, CancelFlag};
use crate::transaction::Transaction;

/// Fixed genesis time (Unix ms) so every ledger starts from the same genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 1_767_077_203_022;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub merkle_root: String,
    pub carbon_offset: i64,
}

fn hash_preimage(head: &str, nonce: u64, transactions_json: &str) -> String {
    sha256_hex(format!("{}{}{}", head, nonce, transactions_json).as_bytes())
}

impl Block {
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>, timestamp: i64, carbon_offset: i64) -> Self {
        let merkle_root = Block::calculate_merkle_root(&transactions);
        let mut block = Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
            merkle_root,
            carbon_offset,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Single mint of the total supply to `genesis`. The nonce stays at 0.
    pub fn genesis(total_supply: i64) -> Self {
        let genesis_tx = Transaction::new_genesis(total_supply, GENESIS_TIMESTAMP);
        Block::new(0, String::from("0"), vec![genesis_tx], GENESIS_TIMESTAMP, 0)
    }

    pub fn calculate_merkle_root(transactions: &[Transaction]) -> String {
        let ids: Vec<&str> = transactions.iter().map(|tx| tx.id.as_str()).collect();
        merkle::root(&ids)
    }

    fn transactions_json(&self) -> String {
        serde_json::to_string(&self.transactions).unwrap_or_default()
    }

    // index, timestamp, previous hash and merkle root never change while mining
    fn header_prefix(&self) -> String {
        format!("{}{}{}{}", self.index, self.timestamp, self.previous_hash, self.merkle_root)
    }

    pub fn calculate_hash(&self) -> String {
        hash_preimage(&self.header_prefix(), self.nonce, &self.transactions_json())
    }

    /// Searches nonces from 0 until the hash has `difficulty` leading zeros.
    ///
    /// On failure the block is left exactly as it was.
    pub fn mine(&mut self, difficulty: usize, budget: &SearchBudget, cancel: &CancelFlag) -> Result<u64, SearchError> {
        let head = self.header_prefix();
        let txs = self.transactions_json();
        let solution = pow::search(difficulty, budget, cancel, |nonce| hash_preimage(&head, nonce, &txs))?;

        self.nonce = solution.nonce;
        self.hash = solution.hash;
        debug!(index = self.index, nonce = self.nonce, attempts = solution.attempts, "block sealed");
        Ok(solution.attempts)
    }

    pub fn merkle_proof(&self, tx_id: &str) -> Option<Vec<ProofStep>> {
        let ids: Vec<&str> = self.transactions.iter().map(|tx| tx.id.as_str()).collect();
        let position = ids.iter().position(|id| *id == tx_id)?;
        merkle::proof(&ids, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::meets_difficulty;

    #[test]
    fn genesis_is_deterministic_and_meets_default_difficulty() {
        let a = Block::genesis(1_000_000_000);
        let b = Block::genesis(1_000_000_000);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.nonce, 0);
        assert_eq!(a.previous_hash, "0");
        assert_eq!(a.merkle_root, sha256_hex(b"genesis"));
        assert_eq!(a.hash, "007693b108dec4c6d45b8ab383b1095e1d3caa7469b9eb21d2f52f22c2e4a05a");
        assert!(meets_difficulty(&a.hash, 2));
    }

    #[test]
    fn hash_covers_every_header_field() {
        let block = Block::new(1, "abc".into(), vec![Transaction::new("a", "b", 5, 1)], 42, 10);
        assert_eq!(block.hash, block.calculate_hash());

        let mut tampered = block.clone();
        tampered.transactions[0].amount = 6;
        assert_ne!(tampered.calculate_hash(), block.hash);

        let mut tampered = block.clone();
        tampered.nonce += 1;
        assert_ne!(tampered.calculate_hash(), block.hash);

        let mut tampered = block.clone();
        tampered.previous_hash = "abd".into();
        assert_ne!(tampered.calculate_hash(), block.hash);
    }

    #[test]
    fn mining_meets_difficulty_and_is_reproducible() {
        let mut block = Block::new(1, "prev".into(), vec![Transaction::new("a", "b", 5, 1)], 42, 10);
        block.mine(2, &SearchBudget::default(), &CancelFlag::new()).unwrap();
        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn failed_mining_leaves_block_untouched() {
        let mut block = Block::new(1, "prev".into(), vec![], 42, 10);
        let before = block.clone();
        let err = block.mine(64, &SearchBudget::attempts(10), &CancelFlag::new()).unwrap_err();
        assert_eq!(err, SearchError::Exhausted { attempts: 10 });
        assert_eq!(block, before);
    }

    #[test]
    fn merkle_proof_for_contained_transaction() {
        let txs: Vec<Transaction> = (0..3).map(|i| Transaction::new("a", "b", i, 0)).collect();
        let block = Block::new(1, "p".into(), txs.clone(), 0, 0);
        let steps = block.merkle_proof(&txs[2].id).unwrap();
        assert!(merkle::verify(&txs[2].id, &steps, &block.merkle_root));
        assert!(block.merkle_proof("missing").is_none());
    }
}
