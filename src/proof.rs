use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::config::ProofConfig;
use crate::error::SearchError;
use crate::pow::{self, meets_difficulty, sha256_hex, CancelFlag};

/// User action categories with a known base reward. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Click,
    Scroll,
    Share,
    FormSubmit,
    Referral,
    DailyLogin,
    Other(String),
}

impl ActionKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "click" => ActionKind::Click,
            "scroll" => ActionKind::Scroll,
            "share" => ActionKind::Share,
            "form_submit" => ActionKind::FormSubmit,
            "referral" => ActionKind::Referral,
            "daily_login" => ActionKind::DailyLogin,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Scroll => "scroll",
            ActionKind::Share => "share",
            ActionKind::FormSubmit => "form_submit",
            ActionKind::Referral => "referral",
            ActionKind::DailyLogin => "daily_login",
            ActionKind::Other(name) => name,
        }
    }

    /// Integer reward units before scoring and difficulty scaling.
    pub fn base_reward(&self) -> i64 {
        match self {
            ActionKind::Click => 5,
            ActionKind::Scroll => 2,
            ActionKind::Share => 25,
            ActionKind::FormSubmit => 50,
            ActionKind::Referral => 100,
            ActionKind::DailyLogin => 20,
            ActionKind::Other(_) => 1,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(raw: &str) -> Self {
        ActionKind::parse(raw)
    }
}

/// Work-bound proof that a user performed an action at a given time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionProof {
    pub user_id: String,
    pub action_type: String,
    pub timestamp: i64,
    pub hash: String,
    pub difficulty: u8,
    pub nonce: u64,
    /// Starts at 1.0; overwritten with the analyzer's score.
    pub authenticity_score: f64,
}

impl ActionProof {
    pub fn calculate_hash(&self) -> String {
        proof_hash(&self.user_id, &self.action_type, self.timestamp, self.nonce)
    }

    pub fn kind(&self) -> ActionKind {
        ActionKind::parse(&self.action_type)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn proof_hash(user_id: &str, action_type: &str, timestamp: i64, nonce: u64) -> String {
    sha256_hex(format!("{}{}{}{}", user_id, action_type, timestamp, nonce).as_bytes())
}

/// Issues and checks action proofs. Independent of block sealing.
pub struct ActionProofIssuer {
    config: ProofConfig,
    clock: Arc<dyn Clock>,
}

impl ActionProofIssuer {
    pub fn new(config: ProofConfig, clock: Arc<dyn Clock>) -> Self {
        ActionProofIssuer { config, clock }
    }

    pub fn config(&self) -> &ProofConfig {
        &self.config
    }

    /// Fixes the timestamp to now, then searches nonces from 0 within the configured budget.
    pub fn generate_proof(
        &self,
        user_id: &str,
        action: &ActionKind,
        difficulty: u8,
        cancel: &CancelFlag,
    ) -> Result<ActionProof, SearchError> {
        let timestamp = self.clock.now_millis();
        let action_type = action.as_str();
        let solution = pow::search(difficulty as usize, &self.config.budget, cancel, |nonce| {
            proof_hash(user_id, action_type, timestamp, nonce)
        })?;

        debug!(user = user_id, action = action_type, nonce = solution.nonce, attempts = solution.attempts, "action proof generated");
        Ok(ActionProof {
            user_id: user_id.to_string(),
            action_type: action_type.to_string(),
            timestamp,
            hash: solution.hash,
            difficulty,
            nonce: solution.nonce,
            authenticity_score: 1.0,
        })
    }

    pub fn validate_proof(&self, proof: &ActionProof) -> bool {
        proof.hash == proof.calculate_hash()
            && meets_difficulty(&proof.hash, proof.difficulty as usize)
            && proof.authenticity_score >= self.config.min_authenticity
    }

    /// `max(floor(base * score * (1 + difficulty / 10)), 1)`.
    ///
    /// The floor of 1 applies even at the minimum score.
    pub fn calculate_reward(&self, proof: &ActionProof) -> i64 {
        let base = proof.kind().base_reward() as f64;
        let scaled = base * proof.authenticity_score * (1.0 + proof.difficulty as f64 / 10.0);
        (scaled.floor() as i64).max(1)
    }
}
