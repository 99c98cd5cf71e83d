//! Single-writer proof-of-action ledger.
//!
//! User actions are turned into work-bound proofs, scored by a streaming
//! behavioral analyzer and rewarded on a hash-chained ledger. A small typed
//! contract runtime (token, NFT, staking, generic storage) feeds its
//! state-changing calls into the same ledger.

pub mod behavior;
pub mod block;
pub mod chain;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod error;
pub mod merkle;
pub mod node;
pub mod optimizer;
pub mod pow;
pub mod proof;
pub mod transaction;

pub use behavior::{AnalyzerStats, BehaviorAnalyzer, UserBehaviorPattern};
pub use block::Block;
pub use chain::{ChainStats, Ledger, LedgerSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{NodeConfig, SearchBudget};
pub use contracts::{CallRequest, ContractFunction, ContractKind, ContractRuntime, FunctionSignature};
pub use error::{ChainError, ConfigError, Result, SearchError};
pub use node::{ActionNode, ActionReceipt};
pub use optimizer::{RewardOptimization, RewardOptimizer};
pub use pow::CancelFlag;
pub use proof::{ActionKind, ActionProof, ActionProofIssuer};
pub use transaction::{Transaction, TxType};
