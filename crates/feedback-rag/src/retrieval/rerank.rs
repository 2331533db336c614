//! Merge vector similarity with learned feedback scores

use crate::learning::BanditScorer;
use crate::types::Candidate;

/// Re-rank `candidates` and keep the best `top_k`.
///
/// `final_score = similarity_score + bandit_score`, sorted descending. The
/// sort is stable, so equal scores keep their retrieval order. Bandit scores
/// for the whole batch are read under one lock acquisition. Candidates whose
/// similarity is not a finite number are dropped.
pub fn rerank(candidates: Vec<Candidate>, bandit: &BanditScorer, top_k: usize) -> Vec<Candidate> {
    let candidates: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            let finite = c.similarity_score.is_finite();
            if !finite {
                tracing::warn!(
                    "Dropping candidate {} with similarity {}",
                    c.arm_id,
                    c.similarity_score
                );
            }
            finite
        })
        .collect();

    let arm_ids: Vec<&str> = candidates.iter().map(|c| c.arm_id.as_str()).collect();
    let scores = bandit.scores(&arm_ids);

    apply_scores(candidates, &scores, top_k)
}

/// Annotate, sort and truncate; `scores` is parallel to `candidates`
fn apply_scores(mut candidates: Vec<Candidate>, scores: &[f64], top_k: usize) -> Vec<Candidate> {
    for (candidate, &bandit_score) in candidates.iter_mut().zip(scores) {
        candidate.bandit_score = bandit_score;
        candidate.final_score = candidate.similarity_score + bandit_score;
        tracing::debug!(
            "{}: similarity={:.4} bandit={:.4} final={:.4}",
            candidate.arm_id,
            candidate.similarity_score,
            candidate.bandit_score,
            candidate.final_score
        );
    }

    candidates.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    candidates.truncate(top_k);
    candidates
}
