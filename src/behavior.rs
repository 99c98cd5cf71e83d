//! Streaming per-user fraud heuristics.
//!
//! Each user has one [`UserBehaviorPattern`], created on first action and
//! updated under its own lock, so different users are scored in parallel.

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::BehaviorConfig;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub action_type: String,
    pub timestamp: i64,
    pub authenticity_score: f64,
    pub device_fingerprint: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserBehaviorPattern {
    pub user_id: String,
    pub action_history: Vec<ActionEvent>,
    /// Inter-arrival deltas, one per action after the first.
    pub timing_patterns: Vec<i64>,
    pub device_fingerprints: IndexSet<String>,
    pub reputation_score: f64,
    pub total_actions: u64,
    pub suspicious_events: u64,
}

impl UserBehaviorPattern {
    fn new(user_id: &str) -> Self {
        UserBehaviorPattern {
            user_id: user_id.to_string(),
            action_history: Vec::new(),
            timing_patterns: Vec::new(),
            device_fingerprints: IndexSet::new(),
            reputation_score: 1.0,
            total_actions: 0,
            suspicious_events: 0,
        }
    }

    fn is_suspicious(&self) -> bool {
        self.reputation_score < 0.6
            || self.suspicious_events > 10
            || (self.total_actions > 0 && self.suspicious_events as f64 / self.total_actions as f64 > 0.3)
    }
}

#[derive(Debug, Clone)]
struct GlobalStats {
    total_users: u64,
    total_actions: u64,
    fraud_rate: f64,
    average_authenticity: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalyzerStats {
    pub total_users_analyzed: u64,
    pub total_actions_processed: u64,
    pub current_fraud_rate: f64,
    pub average_authenticity: f64,
    pub suspicious_users: usize,
}

pub struct BehaviorAnalyzer {
    config: BehaviorConfig,
    patterns: RwLock<HashMap<String, Arc<Mutex<UserBehaviorPattern>>>>,
    global: Mutex<GlobalStats>,
}

impl BehaviorAnalyzer {
    pub fn new(config: BehaviorConfig) -> Self {
        BehaviorAnalyzer {
            config,
            patterns: RwLock::new(HashMap::new()),
            global: Mutex::new(GlobalStats {
                total_users: 0,
                total_actions: 0,
                fraud_rate: 0.05,
                average_authenticity: 0.85,
            }),
        }
    }

    fn pattern_for(&self, user_id: &str) -> Arc<Mutex<UserBehaviorPattern>> {
        if let Some(pattern) = self.patterns.read().get(user_id) {
            return Arc::clone(pattern);
        }
        let mut patterns = self.patterns.write();
        // Another caller may have created it between the two locks
        if let Some(pattern) = patterns.get(user_id) {
            return Arc::clone(pattern);
        }
        let pattern = Arc::new(Mutex::new(UserBehaviorPattern::new(user_id)));
        patterns.insert(user_id.to_string(), Arc::clone(&pattern));
        self.global.lock().total_users += 1;
        debug!(user = user_id, "behavior profile created");
        pattern
    }

    /// Scores one action and folds it into the user's profile. Never fails.
    ///
    /// Sliding-window counts include the action being scored.
    pub fn analyze_action(&self, user_id: &str, action_type: &str, timestamp: i64, device_fingerprint: &str) -> f64 {
        let pattern = self.pattern_for(user_id);
        let mut pattern = pattern.lock();

        let score = self.score(&pattern, action_type, timestamp, device_fingerprint);

        if let Some(last) = pattern.action_history.last() {
            let delta = timestamp.saturating_sub(last.timestamp);
            pattern.timing_patterns.push(delta);
        }
        pattern.action_history.push(ActionEvent {
            action_type: action_type.to_string(),
            timestamp,
            authenticity_score: score,
            device_fingerprint: device_fingerprint.to_string(),
        });
        pattern.device_fingerprints.insert(device_fingerprint.to_string());

        let decay = self.config.reputation_decay;
        pattern.reputation_score = pattern.reputation_score * decay + score * (1.0 - decay);
        pattern.total_actions += 1;
        if score < self.config.suspicious_score {
            pattern.suspicious_events += 1;
            warn!(user = user_id, action = action_type, score, "suspicious activity detected");
        }
        drop(pattern);

        let mut global = self.global.lock();
        global.total_actions += 1;
        let decay = self.config.global_decay;
        global.average_authenticity = global.average_authenticity * decay + score * (1.0 - decay);

        debug!(user = user_id, action = action_type, score, "action analysed");
        score
    }

    fn score(&self, pattern: &UserBehaviorPattern, action_type: &str, timestamp: i64, device_fingerprint: &str) -> f64 {
        let cfg = &self.config;
        let mut score = 1.0;

        if let Some(last) = pattern.action_history.last() {
            if timestamp.saturating_sub(last.timestamp) < cfg.min_action_interval_ms {
                score *= cfg.too_fast_penalty;
            }
        }

        let window_start = timestamp.saturating_sub(cfg.frequency_window_ms);
        let recent = pattern.action_history.iter().filter(|a| a.timestamp > window_start).count() + 1;
        if recent > cfg.max_actions_per_minute {
            score *= cfg.frequency_penalty;
        }

        let devices = pattern.device_fingerprints.len() + usize::from(!pattern.device_fingerprints.contains(device_fingerprint));
        if devices > cfg.device_switching_threshold {
            score *= cfg.device_penalty;
        }

        if pattern.reputation_score < cfg.low_reputation_threshold {
            score *= cfg.low_reputation_penalty;
        }

        let same = pattern
            .action_history
            .iter()
            .rev()
            .take(cfg.repetition_window.saturating_sub(1))
            .filter(|a| a.action_type == action_type)
            .count()
            + 1;
        score *= repetition_multiplier(action_type, same);

        f64::max(score, cfg.score_floor).min(1.0)
    }

    /// 1.0 for users that have never acted.
    pub fn get_user_reputation(&self, user_id: &str) -> f64 {
        self.patterns
            .read()
            .get(user_id)
            .map(|p| p.lock().reputation_score)
            .unwrap_or(1.0)
    }

    pub fn is_user_suspicious(&self, user_id: &str) -> bool {
        self.patterns
            .read()
            .get(user_id)
            .map(|p| p.lock().is_suspicious())
            .unwrap_or(false)
    }

    /// Snapshot of a user's profile.
    pub fn pattern(&self, user_id: &str) -> Option<UserBehaviorPattern> {
        self.patterns.read().get(user_id).map(|p| p.lock().clone())
    }

    /// Snapshot of every profile, in no particular order.
    pub fn patterns(&self) -> Vec<UserBehaviorPattern> {
        self.patterns.read().values().map(|p| p.lock().clone()).collect()
    }

    /// Restores reputation to 1.0 and clears suspicious events. Returns false for unknown users.
    pub fn reset_user_reputation(&self, user_id: &str) -> bool {
        let Some(pattern) = self.patterns.read().get(user_id).cloned() else {
            return false;
        };
        let mut pattern = pattern.lock();
        pattern.reputation_score = 1.0;
        pattern.suspicious_events = 0;
        info!(user = user_id, "reputation reset");
        true
    }

    pub fn stats(&self) -> AnalyzerStats {
        let suspicious_users = self
            .patterns
            .read()
            .values()
            .filter(|p| p.lock().reputation_score < 0.6)
            .count();
        let global = self.global.lock();
        AnalyzerStats {
            total_users_analyzed: global.total_users,
            total_actions_processed: global.total_actions,
            current_fraud_rate: global.fraud_rate,
            average_authenticity: global.average_authenticity,
            suspicious_users,
        }
    }
}

// Occurrences of the same type in the trailing window, current action included
fn repetition_multiplier(action_type: &str, same: usize) -> f64 {
    match action_type {
        "click" if same > 8 => 0.4,
        "scroll" if same > 6 => 0.5,
        "share" if same > 2 => 0.2,
        "form_submit" if same > 3 => 0.3,
        "click" | "scroll" | "share" | "form_submit" => 1.0,
        _ => 0.8,
    }
}
