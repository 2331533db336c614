//! Learning from user feedback: the UCB1 bandit, its warm start, and feedback ingestion

pub mod bandit;
pub mod feedback;
pub mod warm_start;

pub use bandit::{ArmSnapshot, ArmStats, BanditScorer, BanditSnapshot, BanditState, Reward};
pub use feedback::FeedbackService;
pub use warm_start::{Rebuild, WarmStart, WarmStartLoader};
