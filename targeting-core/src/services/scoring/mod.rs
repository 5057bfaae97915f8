mod group;
mod scorer;

pub use group::{score_for_group, GroupContext};
pub use scorer::RelevanceScorer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::{Member, MemberId, QuestionCategory, TasteProfile};

/// Per-factor decomposition of a relevance score. Stored alongside the
/// assignment so a decision can be explained later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub pattern_relevance: f32,
    pub edge_context: f32,
    pub taste_match: f32,
    pub freshness: f32,
    pub channel_fit: f32,
    /// Set when the member had no taste profile, so the taste factor was
    /// scored neutrally rather than from real signal.
    pub taste_profile_missing: bool,
    pub total: f32,
}

/// One question scored against one member.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub question_id: i64,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}

/// Everything scoring needs about a member, fetched once up front so the
/// scoring itself stays pure and cheap to run over a whole pool.
#[derive(Debug, Clone)]
pub struct MemberSignals {
    pub member: Member,
    /// Patterns the member belongs to.
    pub pattern_ids: HashSet<i64>,
    /// Members connected to this one by an active edge.
    pub connections: HashSet<MemberId>,
    pub taste: Option<TasteProfile>,
    pub answered_by_category: BTreeMap<QuestionCategory, u32>,
    pub last_assignment_at: Option<DateTime<Utc>>,
}

impl MemberSignals {
    pub fn in_any_pattern(&self) -> bool {
        !self.pattern_ids.is_empty()
    }
}
