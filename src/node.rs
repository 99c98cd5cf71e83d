use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::behavior::{AnalyzerStats, BehaviorAnalyzer};
use crate::chain::{ChainStats, Ledger, LedgerSink};
use crate::clock::{Clock, SystemClock};
use crate::config::NodeConfig;
use crate::contracts::{CallRequest, ContractFunction, ContractRuntime, ContractStats, FunctionSignature};
use crate::error::{ChainError, Result};
use crate::optimizer::{RewardOptimization, RewardOptimizer};
use crate::pow::CancelFlag;
use crate::proof::{ActionKind, ActionProof, ActionProofIssuer};
use crate::transaction::Transaction;

/// Outcome of [`ActionNode::submit_action`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionReceipt {
    pub proof: ActionProof,
    pub authenticity_score: f64,
    pub reward_amount: i64,
    /// Hash of the block mined because this action filled the auto-mine quota.
    pub mined_block: Option<String>,
}

fn join_error(e: tokio::task::JoinError) -> ChainError {
    ChainError::execution(format!("worker task failed: {}", e))
}

/// The in-process service object: one ledger, one analyzer, one contract runtime.
pub struct ActionNode {
    ledger: Arc<Mutex<Ledger>>,
    issuer: Arc<ActionProofIssuer>,
    analyzer: BehaviorAnalyzer,
    runtime: ContractRuntime,
    optimizer: Mutex<RewardOptimizer>,
    config: NodeConfig,
    actions_submitted: AtomicU64,
    accepted_since_block: AtomicU64,
    cancel: CancelFlag,
    // One block search at a time
    mining: tokio::sync::Mutex<()>,
}

impl ActionNode {
    pub fn new(config: NodeConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(Mutex::new(Ledger::new(config.ledger.clone(), clock.clone())));
        let sink: Arc<dyn LedgerSink> = ledger.clone();
        let runtime = ContractRuntime::new(&config.contracts, clock.clone(), sink);

        ActionNode {
            issuer: Arc::new(ActionProofIssuer::new(config.proof.clone(), clock)),
            analyzer: BehaviorAnalyzer::new(config.behavior.clone()),
            runtime,
            optimizer: Mutex::new(RewardOptimizer::default()),
            ledger,
            config,
            actions_submitted: AtomicU64::new(0),
            accepted_since_block: AtomicU64::new(0),
            cancel: CancelFlag::new(),
            mining: tokio::sync::Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        self.ledger.clone()
    }

    pub fn analyzer(&self) -> &BehaviorAnalyzer {
        &self.analyzer
    }

    pub fn runtime(&self) -> &ContractRuntime {
        &self.runtime
    }

    pub fn issuer(&self) -> &ActionProofIssuer {
        &self.issuer
    }

    /// Proof, score, reward, ledger. May also credit a milestone bonus and mine a block.
    pub async fn submit_action(
        &self,
        user_id: &str,
        action_type: &str,
        timestamp: i64,
        device_fingerprint: &str,
    ) -> Result<ActionReceipt> {
        let kind = ActionKind::parse(action_type);
        let difficulty = self.config.proof.difficulty;

        let mut proof = {
            let issuer = self.issuer.clone();
            let cancel = self.cancel.clone();
            let user = user_id.to_string();
            let kind = kind.clone();
            tokio::task::spawn_blocking(move || issuer.generate_proof(&user, &kind, difficulty, &cancel))
                .await
                .map_err(join_error)??
        };

        let score = self.analyzer.analyze_action(user_id, kind.as_str(), timestamp, device_fingerprint);
        proof.authenticity_score = score;
        let reward = self.issuer.calculate_reward(&proof);

        let tx = Transaction::new_action_reward(user_id, kind.as_str(), reward, proof.to_json(), timestamp);
        let accepted = self.ledger.lock().add_transaction(tx);
        info!(user = user_id, action = %kind, score, reward, "action rewarded");

        let submitted = self.actions_submitted.fetch_add(1, Ordering::SeqCst) + 1;
        let milestone_every = self.config.proof.milestone_every;
        if milestone_every > 0 && submitted % milestone_every == 0 {
            let bonus = Transaction::new_milestone_bonus(user_id, self.config.proof.milestone_bonus, timestamp);
            self.ledger.lock().add_transaction(bonus);
            info!(user = user_id, actions = submitted, bonus = self.config.proof.milestone_bonus, "milestone bonus credited");
        }

        let mut mined_block = None;
        let quota = self.config.ledger.auto_mine_every;
        if accepted && quota > 0 {
            // Count and reset in one step so exactly one caller claims each filled quota
            let previous = match self.accepted_since_block.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |since| {
                Some(if since + 1 >= quota { 0 } else { since + 1 })
            }) {
                Ok(previous) | Err(previous) => previous,
            };
            if previous + 1 >= quota {
                match self.mine_pending_transactions(user_id).await {
                    Ok(hash) => mined_block = Some(hash),
                    Err(e) => warn!(user = user_id, error = %e, "auto-mining failed, transactions stay pending"),
                }
            }
        }

        Ok(ActionReceipt {
            proof,
            authenticity_score: score,
            reward_amount: reward,
            mined_block,
        })
    }

    pub fn add_transaction(&self, tx: Transaction) -> bool {
        self.ledger.lock().add_transaction(tx)
    }

    /// Seals pending transactions off the async runtime; the ledger lock is not held during the search.
    pub async fn mine_pending_transactions(&self, reward_address: &str) -> Result<String> {
        let _guard = self.mining.lock().await;

        let candidate = self.ledger.lock().get_mining_candidate(reward_address);
        let difficulty = self.config.ledger.mining_difficulty;
        let budget = self.config.ledger.budget;
        let cancel = self.cancel.clone();

        let sealed = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            block.mine(difficulty, &budget, &cancel).map(|_| block)
        })
        .await
        .map_err(join_error)?;

        let block = match sealed {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "mining gave up");
                return Err(e.into());
            }
        };
        self.ledger.lock().submit_block(block)
    }

    pub fn get_balance(&self, address: &str) -> i64 {
        self.ledger.lock().get_balance(address)
    }

    pub fn validate_chain(&self) -> bool {
        self.ledger.lock().validate_chain()
    }

    pub fn get_chain_stats(&self) -> ChainStats {
        self.ledger.lock().get_chain_stats()
    }

    pub fn get_user_reputation(&self, user_id: &str) -> f64 {
        self.analyzer.get_user_reputation(user_id)
    }

    pub fn is_user_suspicious(&self, user_id: &str) -> bool {
        self.analyzer.is_user_suspicious(user_id)
    }

    pub fn analyzer_stats(&self) -> AnalyzerStats {
        self.analyzer.stats()
    }

    /// Suggests base rewards from the current analyzer state. Nothing is applied.
    pub fn optimize_rewards(&self) -> RewardOptimization {
        let patterns = self.analyzer.patterns();
        let stats = self.analyzer.stats();
        self.optimizer.lock().calculate_optimal_rewards(&patterns, &stats)
    }

    pub fn deploy_contract(&self, code: &str, abi: Vec<FunctionSignature>, deployer: &str) -> Result<String> {
        self.runtime.deploy(code, abi, deployer)
    }

    pub fn call_contract(&self, request: &CallRequest, caller: &str) -> Result<Value> {
        self.runtime.call(request, caller)
    }

    pub fn execute_contract(&self, address: &str, function: &ContractFunction, caller: &str, value: i64) -> Result<Value> {
        self.runtime.execute(address, function, caller, value)
    }

    pub fn contract_stats(&self) -> ContractStats {
        self.runtime.stats()
    }

    /// Cancels in-flight and future searches.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        info!("node shutting down");
    }
}
