use thiserror::Error;

/// Failure taxonomy shared by the ledger, the proof issuer and the contract runtime.
///
/// A rejected `add_transaction` is not an error; it returns `false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// Insufficient balance, amount below a minimum, malformed parameters.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown contract address, unknown token id, unknown user.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown function name or call on an inactive contract.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Hash or linkage mismatch found while checking the chain.
    #[error("consistency violation at block #{index}: {reason}")]
    Consistency { index: u64, reason: String },

    /// A proof-of-work search gave up before finding a nonce.
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Outcome of a nonce search that ran out of budget or was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no nonce found within {attempts} attempts")]
    Exhausted { attempts: u64 },

    #[error("no nonce found within {elapsed_ms}ms ({attempts} attempts)")]
    TimedOut { attempts: u64, elapsed_ms: u64 },

    #[error("search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ChainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ChainError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ChainError::NotFound(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        ChainError::Execution(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
