use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SearchBudget;
use crate::error::SearchError;

// Wall-clock and cancellation are polled every this many attempts.
const POLL_INTERVAL: u64 = 1024;

/// Shared cancellation switch for in-flight nonce searches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// True when `hash` starts with `difficulty` zero hex characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: String,
    pub attempts: u64,
}

/// Tries nonces 0, 1, 2, ... until `hash_fn(nonce)` meets `difficulty`.
///
/// Stops early with a [`SearchError`] when the budget runs out or `cancel`
/// is tripped, so callers are never stalled by an unlucky target.
pub fn search<F>(
    difficulty: usize,
    budget: &SearchBudget,
    cancel: &CancelFlag,
    mut hash_fn: F,
) -> Result<Solution, SearchError>
where
    F: FnMut(u64) -> String,
{
    let started = Instant::now();
    let deadline = budget.max_duration();
    let mut nonce: u64 = 0;
    let mut attempts: u64 = 0;

    loop {
        if let Some(max) = budget.max_attempts {
            if attempts >= max {
                return Err(SearchError::Exhausted { attempts });
            }
        }
        if attempts % POLL_INTERVAL == 0 {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled { attempts });
            }
            if let Some(limit) = deadline {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(SearchError::TimedOut {
                        attempts,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
            }
        }

        let hash = hash_fn(nonce);
        attempts += 1;
        if meets_difficulty(&hash, difficulty) {
            return Ok(Solution { nonce, hash, attempts });
        }
        nonce = nonce.wrapping_add(1);
    }
}
