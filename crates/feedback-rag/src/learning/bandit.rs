//! UCB1 bandit over document identities
//!
//! Every source that has received feedback is an arm. Positive feedback is a
//! reward of 1.0, negative feedback a reward of 0.0. The score of an arm is
//!
//! ```text
//! mean_reward + sqrt(2 * ln(total_pulls) / pulls)
//! ```
//!
//! with the exploration term dropped while `total_pulls <= 1`. Arms with no
//! observations score 0.0.
//!
//! All state sits behind a single mutex: `score` reads a per-arm statistic and
//! the global pull counter together, so they must be observed atomically.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// A feedback reward: exactly 0.0 or 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward(f64);

impl Reward {
    pub const POSITIVE: Reward = Reward(1.0);
    pub const NEGATIVE: Reward = Reward(0.0);

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Reward {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        if value == 1.0 {
            Ok(Reward::POSITIVE)
        } else if value == 0.0 {
            Ok(Reward::NEGATIVE)
        } else {
            Err(Error::validation(format!("reward must be 0.0 or 1.0, got {}", value)))
        }
    }
}

/// Statistics for one arm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    /// Feedback events attributed to this arm
    pub pulls: u64,
    /// Sum of rewards, within `0..=pulls`
    pub total_reward: f64,
}

impl ArmStats {
    pub fn mean_reward(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.total_reward / self.pulls as f64
        }
    }
}

/// Arm table plus the global pull counter.
///
/// `total_pulls` always equals the sum of every arm's `pulls`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BanditState {
    arms: HashMap<String, ArmStats>,
    total_pulls: u64,
}

impl BanditState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reward for `arm_id`, creating the arm on first sight
    pub fn update(&mut self, arm_id: &str, reward: Reward) {
        if let Some(arm) = self.arms.get_mut(arm_id) {
            arm.pulls += 1;
            arm.total_reward += reward.value();
        } else {
            self.arms.insert(
                arm_id.to_string(),
                ArmStats {
                    pulls: 1,
                    total_reward: reward.value(),
                },
            );
        }
        self.total_pulls += 1;
    }

    /// UCB1 score; 0.0 for unobserved arms
    pub fn score(&self, arm_id: &str) -> f64 {
        if self.total_pulls == 0 {
            return 0.0;
        }
        let arm = match self.arms.get(arm_id) {
            Some(arm) if arm.pulls > 0 => arm,
            _ => return 0.0,
        };

        let mean_reward = arm.mean_reward();
        if self.total_pulls <= 1 {
            return mean_reward;
        }

        let exploration = (2.0 * (self.total_pulls as f64).ln() / arm.pulls as f64).sqrt();
        mean_reward + exploration
    }

    /// Add every count from `other` into this state
    pub fn merge(&mut self, other: BanditState) {
        for (arm_id, stats) in other.arms {
            let arm = self.arms.entry(arm_id).or_default();
            arm.pulls += stats.pulls;
            arm.total_reward += stats.total_reward;
        }
        self.total_pulls += other.total_pulls;
    }

    pub fn arm(&self, arm_id: &str) -> Option<&ArmStats> {
        self.arms.get(arm_id)
    }

    pub fn arms(&self) -> impl Iterator<Item = (&String, &ArmStats)> {
        self.arms.iter()
    }

    pub fn arm_count(&self) -> usize {
        self.arms.len()
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn is_empty(&self) -> bool {
        self.total_pulls == 0
    }

    /// Verify `total_pulls = Σ pulls` and `0 <= total_reward <= pulls`
    pub fn check_invariants(&self) -> Result<()> {
        let sum: u64 = self.arms.values().map(|arm| arm.pulls).sum();
        if sum != self.total_pulls {
            return Err(Error::validation(format!(
                "total_pulls is {} but arms sum to {}",
                self.total_pulls, sum
            )));
        }
        for (arm_id, arm) in &self.arms {
            if !(arm.total_reward >= 0.0 && arm.total_reward <= arm.pulls as f64) {
                return Err(Error::validation(format!(
                    "arm {} has total_reward {} outside 0..={}",
                    arm_id, arm.total_reward, arm.pulls
                )));
            }
        }
        Ok(())
    }
}

/// On-disk JSON layout of a bandit snapshot
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    arms: BTreeMap<String, ArmStats>,
    total_pulls: u64,
}

/// Per-arm view returned for inspection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArmSnapshot {
    pub pulls: u64,
    pub total_reward: f64,
    pub mean_reward: f64,
    pub score: f64,
}

/// Consistent copy of the bandit taken under one lock acquisition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BanditSnapshot {
    pub total_pulls: u64,
    pub arms: BTreeMap<String, ArmSnapshot>,
}

/// Shared, thread-safe UCB1 scorer
#[derive(Debug, Default)]
pub struct BanditScorer {
    state: Mutex<BanditState>,
    warm_started: AtomicBool,
}

impl BanditScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing state
    pub fn with_state(state: BanditState) -> Self {
        Self {
            state: Mutex::new(state),
            warm_started: AtomicBool::new(false),
        }
    }

    /// Record one reward for one arm
    pub fn update(&self, arm_id: &str, reward: Reward) {
        self.state.lock().update(arm_id, reward);
    }

    /// Record the same reward for every arm in `arm_ids`, in one critical section
    pub fn update_all<S: AsRef<str>>(&self, arm_ids: &[S], reward: Reward) {
        if arm_ids.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for arm_id in arm_ids {
            state.update(arm_id.as_ref(), reward);
        }
    }

    pub fn score(&self, arm_id: &str) -> f64 {
        self.state.lock().score(arm_id)
    }

    /// Scores for several arms, all computed against the same state
    pub fn scores<S: AsRef<str>>(&self, arm_ids: &[S]) -> Vec<f64> {
        let state = self.state.lock();
        arm_ids.iter().map(|id| state.score(id.as_ref())).collect()
    }

    pub fn arm(&self, arm_id: &str) -> Option<ArmStats> {
        self.state.lock().arm(arm_id).copied()
    }

    pub fn total_pulls(&self) -> u64 {
        self.state.lock().total_pulls()
    }

    pub fn arm_count(&self) -> usize {
        self.state.lock().arm_count()
    }

    /// Clone of the raw state
    pub fn state(&self) -> BanditState {
        self.state.lock().clone()
    }

    pub fn snapshot(&self) -> BanditSnapshot {
        let state = self.state.lock();
        let arms = state
            .arms()
            .map(|(id, stats)| {
                (
                    id.clone(),
                    ArmSnapshot {
                        pulls: stats.pulls,
                        total_reward: stats.total_reward,
                        mean_reward: stats.mean_reward(),
                        score: state.score(id),
                    },
                )
            })
            .collect();

        BanditSnapshot {
            total_pulls: state.total_pulls(),
            arms,
        }
    }

    /// Fold a rebuilt state into the live one
    pub(crate) fn absorb(&self, rebuilt: BanditState) {
        self.state.lock().merge(rebuilt);
    }

    /// Claim the one-time warm start. Returns false if it was already claimed.
    pub(crate) fn begin_warm_start(&self) -> bool {
        self.warm_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_warm_started(&self) -> bool {
        self.warm_started.load(Ordering::Acquire)
    }

    /// Write `{arms, total_pulls}` to a JSON file
    pub fn save_to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let persisted = {
            let state = self.state.lock();
            PersistedState {
                arms: state.arms().map(|(id, stats)| (id.clone(), *stats)).collect(),
                total_pulls: state.total_pulls(),
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&persisted)?)?;

        tracing::info!(
            "Saved bandit state to {} ({} arms)",
            path.display(),
            persisted.arms.len()
        );
        Ok(())
    }

    /// Replace the state with a JSON snapshot.
    ///
    /// The snapshot must satisfy the state invariants. Loading marks the
    /// scorer as warm-started so history is not replayed on top of it.
    pub fn load_from_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let persisted: PersistedState = serde_json::from_str(&data)?;

        let loaded = BanditState {
            arms: persisted.arms.into_iter().collect(),
            total_pulls: persisted.total_pulls,
        };
        loaded.check_invariants()?;

        let arm_count = loaded.arm_count();
        *self.state.lock() = loaded;
        self.warm_started.store(true, Ordering::Release);

        tracing::info!("Loaded bandit state from {} ({} arms)", path.display(), arm_count);
        Ok(())
    }
}
