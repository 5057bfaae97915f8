use rand::Rng;
use tracing::debug;

use crate::config::SelectionConfig;
use crate::domain::SelectionMethod;
use crate::services::scoring::ScoredCandidate;

/// The question the policy picked and how it got picked.
#[derive(Debug, Clone)]
pub struct Selection {
    pub question_id: i64,
    pub score: f32,
    pub method: SelectionMethod,
}

/// Stochastic pick over a scored pool: usually the best candidate,
/// sometimes one of the strong ones, occasionally anything at all so the
/// member's experience never becomes fully predictable.
///
/// The RNG is injected, so callers that need reproducible picks seed one.
pub struct SelectionPolicy {
    config: SelectionConfig,
}

impl SelectionPolicy {
    pub fn new(config: SelectionConfig) -> Self {
        SelectionPolicy { config }
    }

    /// Pick from `scored`, which must be sorted by score descending.
    ///
    /// The exploit and explore branches are gated on `min_threshold`; the
    /// wildcard branch deliberately ignores it, an off-score question now
    /// and then is the point.
    pub fn select<R: Rng + ?Sized>(
        &self,
        scored: &[ScoredCandidate],
        min_threshold: f32,
        rng: &mut R,
    ) -> Option<Selection> {
        if scored.is_empty() {
            return None;
        }

        let roll: f64 = rng.gen();
        let selection = if roll < self.config.top_probability {
            self.pick_highest(scored, min_threshold, SelectionMethod::Highest)
        } else if roll < self.config.top_probability + self.config.exploration_probability {
            self.pick_from_top_pool(scored, min_threshold, rng)
        } else {
            let candidate = &scored[rng.gen_range(0..scored.len())];
            Some(Selection {
                question_id: candidate.question_id,
                score: candidate.score,
                method: SelectionMethod::Wildcard,
            })
        };

        if let Some(s) = &selection {
            debug!(
                question_id = s.question_id,
                score = s.score,
                method = s.method.as_str(),
                "question selected"
            );
        }
        selection
    }

    fn pick_highest(
        &self,
        scored: &[ScoredCandidate],
        min_threshold: f32,
        method: SelectionMethod,
    ) -> Option<Selection> {
        let best = &scored[0];
        if best.score < min_threshold {
            return None;
        }
        Some(Selection {
            question_id: best.question_id,
            score: best.score,
            method,
        })
    }

    /// Uniform pick among the strongest few candidates that carry a real
    /// relational or pattern signal. Falls back to the plain highest when
    /// nothing in the pool qualifies.
    fn pick_from_top_pool<R: Rng + ?Sized>(
        &self,
        scored: &[ScoredCandidate],
        min_threshold: f32,
        rng: &mut R,
    ) -> Option<Selection> {
        let pool: Vec<&ScoredCandidate> = scored
            .iter()
            .take(self.config.top_pool_size)
            .filter(|c| c.score >= min_threshold)
            .filter(|c| c.breakdown.pattern_relevance > 0.0 || c.breakdown.edge_context > 0.0)
            .collect();
        if pool.is_empty() {
            return self.pick_highest(scored, min_threshold, SelectionMethod::HighestFallback);
        }
        let candidate = pool[rng.gen_range(0..pool.len())];
        Some(Selection {
            question_id: candidate.question_id,
            score: candidate.score,
            method: SelectionMethod::TopFiveRandom,
        })
    }
}
