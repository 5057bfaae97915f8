use chrono::{Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{
    Assignment, DeliveryChannel, DeliveryStatus, MemberId, TargetingContext,
};
use crate::services::scoring::{
    score_for_group, GroupContext, MemberSignals, RelevanceScorer, ScoredCandidate,
};
use crate::services::selection::{Selection, SelectionPolicy};
use crate::services::sequencer::{DeckSequencer, MemberQueue};
use crate::store::{DeliveryError, GraphError, GraphStore, ProfileStore, StoreError};
use crate::store::DeliveryTracker;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("group scoring needs at least 2 members, got {0}")]
    GroupTooSmall(usize),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a member was passed over in a batch sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCandidates,
    BelowThreshold,
    RecentlyTargeted,
}

/// What a batch sweep did, member by member. A failure for one member
/// never stops the sweep.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub assigned: Vec<Assignment>,
    pub skipped: Vec<(MemberId, SkipReason)>,
    pub failed: Vec<(MemberId, EngineError)>,
}

/// Front door of the targeting engine. Owns the relationship graph and
/// delivery state; reads profiles, patterns and questions through the
/// injected [`ProfileStore`].
pub struct TargetingEngine<P: ProfileStore> {
    profiles: Arc<P>,
    pub graph: GraphStore,
    pub tracker: DeliveryTracker,
    scorer: RelevanceScorer,
    policy: SelectionPolicy,
    sequencer: DeckSequencer,
    config: Config,
}

impl<P: ProfileStore> TargetingEngine<P> {
    pub fn new(profiles: Arc<P>, config: Config) -> Self {
        TargetingEngine {
            profiles,
            graph: GraphStore::new(StdDuration::from_secs(config.graph.stats_ttl_secs)),
            tracker: DeliveryTracker::new(),
            scorer: RelevanceScorer::new(config.scoring.clone()),
            policy: SelectionPolicy::new(config.selection.clone()),
            sequencer: DeckSequencer::new(config.sequencer.clone()),
            config,
        }
    }

    /// Prefetch everything scoring needs about one member, so the pool
    /// can then be scored without touching storage again.
    pub async fn member_signals(&self, member_id: MemberId) -> Result<MemberSignals> {
        let member = self.profiles.get_member(member_id).await?;
        let patterns = self.profiles.get_patterns(true).await?;
        let pattern_ids = patterns
            .iter()
            .filter(|p| p.includes(member_id))
            .map(|p| p.id)
            .collect();
        let taste = self.profiles.get_taste_profile(member_id).await?;
        let answered_by_category = self.profiles.answered_category_counts(member_id).await?;
        Ok(MemberSignals {
            member,
            pattern_ids,
            connections: self.graph.neighbors(member_id),
            taste,
            answered_by_category,
            last_assignment_at: self.tracker.last_assignment_at(member_id, None),
        })
    }

    /// Score one question for one member on one channel.
    pub async fn score(
        &self,
        member_id: MemberId,
        question_id: i64,
        channel: DeliveryChannel,
    ) -> Result<ScoredCandidate> {
        let question = self.profiles.get_question(question_id).await?;
        let signals = self.member_signals(member_id).await?;
        Ok(self.scorer.score(&question, channel, &signals, Utc::now()))
    }

    /// Score the member's whole candidate pool, highest first. Questions
    /// with a live assignment to this member are left out; skipped or
    /// expired ones come back around.
    pub async fn score_pool(
        &self,
        member_id: MemberId,
        channel: DeliveryChannel,
    ) -> Result<Vec<ScoredCandidate>> {
        let signals = self.member_signals(member_id).await?;
        let pool = self.profiles.get_candidate_pool(member_id, true).await?;
        let now = Utc::now();
        let mut scored: Vec<ScoredCandidate> = pool
            .iter()
            .filter(|q| {
                !self
                    .tracker
                    .statuses_for(q.id, member_id)
                    .iter()
                    .any(|s| !matches!(s, DeliveryStatus::Skipped | DeliveryStatus::Expired))
            })
            .map(|q| self.scorer.score(q, channel, &signals, now))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }

    /// Pick a question for the member using a caller-supplied RNG.
    pub async fn select_with_rng<R: Rng + ?Sized>(
        &self,
        member_id: MemberId,
        channel: DeliveryChannel,
        min_threshold: f32,
        rng: &mut R,
    ) -> Result<Option<Selection>> {
        let scored = self.score_pool(member_id, channel).await?;
        Ok(self.policy.select(&scored, min_threshold, rng))
    }

    pub async fn select(
        &self,
        member_id: MemberId,
        channel: DeliveryChannel,
        min_threshold: f32,
    ) -> Result<Option<Selection>> {
        let mut rng = rand::thread_rng();
        self.select_with_rng(member_id, channel, min_threshold, &mut rng)
            .await
    }

    /// Assign a question to a member. Validates both exist before
    /// touching delivery state; the assignment itself is idempotent per
    /// (question, member, channel).
    pub async fn assign(
        &self,
        question_id: i64,
        member_id: MemberId,
        channel: DeliveryChannel,
        context: TargetingContext,
    ) -> Result<Assignment> {
        self.profiles.get_member(member_id).await?;
        self.profiles.get_question(question_id).await?;
        Ok(self.tracker.assign(question_id, member_id, channel, context))
    }

    /// Select and assign in one step. `Ok(None)` means nothing cleared
    /// the threshold for this member right now.
    pub async fn target_member(
        &self,
        member_id: MemberId,
        channel: DeliveryChannel,
        min_threshold: f32,
    ) -> Result<Option<Assignment>> {
        let mut rng = rand::thread_rng();
        self.target_member_with_rng(member_id, channel, min_threshold, &mut rng)
            .await
    }

    pub async fn target_member_with_rng<R: Rng + ?Sized>(
        &self,
        member_id: MemberId,
        channel: DeliveryChannel,
        min_threshold: f32,
        rng: &mut R,
    ) -> Result<Option<Assignment>> {
        let scored = self.score_pool(member_id, channel).await?;
        let Some(selection) = self.policy.select(&scored, min_threshold, rng) else {
            return Ok(None);
        };
        let breakdown = scored
            .iter()
            .find(|c| c.question_id == selection.question_id)
            .map(|c| c.breakdown.clone());
        let context = TargetingContext {
            relevance_score: selection.score,
            selection_method: Some(selection.method),
            breakdown,
            reason: None,
        };
        let assignment = self
            .assign(selection.question_id, member_id, channel, context)
            .await?;
        info!(
            member_id,
            question_id = selection.question_id,
            channel = channel.as_str(),
            score = selection.score,
            method = selection.method.as_str(),
            "member targeted"
        );
        Ok(Some(assignment))
    }

    /// Record an answer or skip against an assignment.
    pub fn record_response(
        &self,
        assignment_id: Uuid,
        response: Option<String>,
    ) -> Result<Assignment> {
        Ok(self.tracker.record_response(assignment_id, response)?)
    }

    /// Build the member's swipe deck from the unanswered pool.
    pub async fn build_queue(&self, member_id: MemberId) -> Result<MemberQueue> {
        let member = self.profiles.get_member(member_id).await?;
        let patterns = self.profiles.get_patterns(true).await?;
        let pool = self.profiles.get_candidate_pool(member_id, true).await?;
        Ok(self.sequencer.build(&member, &patterns, &pool, Utc::now()))
    }

    /// Score a question for a group in conversation.
    pub async fn score_for_group(
        &self,
        question_id: i64,
        member_ids: &[MemberId],
    ) -> Result<f32> {
        if member_ids.len() < 2 {
            return Err(EngineError::GroupTooSmall(member_ids.len()));
        }
        let question = self.profiles.get_question(question_id).await?;
        let mut members = Vec::with_capacity(member_ids.len());
        let mut tastes = HashMap::new();
        for &id in member_ids {
            members.push(self.profiles.get_member(id).await?);
            if let Some(taste) = self.profiles.get_taste_profile(id).await? {
                tastes.insert(id, taste);
            }
        }
        let ctx = GroupContext {
            edge_density: self.graph.edge_density(member_ids),
            members,
            tastes,
            patterns: self.profiles.get_patterns(true).await?,
        };
        Ok(score_for_group(&question, &ctx))
    }

    /// Sweep every targetable member on one channel. Members targeted on
    /// that channel within the recency window are left alone; one
    /// member's failure never stops the sweep.
    pub async fn batch_target(
        &self,
        channel: DeliveryChannel,
        min_threshold: f32,
    ) -> Result<BatchReport> {
        let members = self.profiles.get_members(true).await?;
        let window = Duration::hours(self.config.scoring.recency_window_hours);
        let now = Utc::now();
        let mut report = BatchReport::default();

        for member in members {
            if let Some(last) = self.tracker.last_assignment_at(member.id, Some(channel)) {
                if now - last < window {
                    report.skipped.push((member.id, SkipReason::RecentlyTargeted));
                    continue;
                }
            }
            match self.target_member(member.id, channel, min_threshold).await {
                Ok(Some(assignment)) => report.assigned.push(assignment),
                Ok(None) => {
                    let reason = if self.profiles.get_candidate_pool(member.id, true).await?.is_empty() {
                        SkipReason::NoCandidates
                    } else {
                        SkipReason::BelowThreshold
                    };
                    report.skipped.push((member.id, reason));
                }
                Err(e) => {
                    warn!(member_id = member.id, error = %e, "batch targeting failed for member");
                    report.failed.push((member.id, e));
                }
            }
        }
        info!(
            channel = channel.as_str(),
            assigned = report.assigned.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "batch sweep complete"
        );
        Ok(report)
    }
}
