use chrono::{DateTime, Duration, Utc};

use super::{MemberSignals, ScoreBreakdown, ScoredCandidate};
use crate::config::ScoringConfig;
use crate::domain::{DeliveryChannel, EnergyLevel, Question, QuestionVibe};

/// Factor caps. The five factors sum to at most 100.
const PATTERN_CAP: f32 = 30.0;
const EDGE_CAP: f32 = 25.0;
const TASTE_CAP: f32 = 25.0;
const FRESHNESS_CAP: f32 = 10.0;
const CHANNEL_CAP: f32 = 10.0;

/// A score is never exactly zero; downstream ratio math divides by it.
const MIN_SCORE: f32 = 0.1;

/// Scores a question's relevance to a member on a channel.
///
/// Pure given a [`MemberSignals`] snapshot. Callers prefetch signals once
/// per member and then score an entire candidate pool without touching
/// storage.
pub struct RelevanceScorer {
    config: ScoringConfig,
}

impl RelevanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        RelevanceScorer { config }
    }

    pub fn score(
        &self,
        question: &Question,
        channel: DeliveryChannel,
        signals: &MemberSignals,
        now: DateTime<Utc>,
    ) -> ScoredCandidate {
        let pattern_relevance = self.pattern_relevance(question, signals);
        let edge_context = self.edge_context(question, signals);
        let (taste_match, taste_profile_missing) = self.taste_match(question, signals);
        let freshness = self.freshness(question, signals, now);
        let channel_fit = self.channel_fit(question, channel);

        let raw = pattern_relevance + edge_context + taste_match + freshness + channel_fit;
        let total = raw.clamp(MIN_SCORE, 100.0);

        ScoredCandidate {
            question_id: question.id,
            score: total,
            breakdown: ScoreBreakdown {
                pattern_relevance,
                edge_context,
                taste_match,
                freshness,
                channel_fit,
                taste_profile_missing,
                total,
            },
        }
    }

    /// Strongest signal first: the question probes a pattern the member is
    /// actually in, then the question naming the member directly, then the
    /// weak prior of being clustered at all.
    fn pattern_relevance(&self, question: &Question, signals: &MemberSignals) -> f32 {
        let shares_target_pattern = question
            .target_pattern_ids
            .iter()
            .any(|id| signals.pattern_ids.contains(id));
        if shares_target_pattern {
            PATTERN_CAP
        } else if question.is_relevant_to(signals.member.id) {
            25.0
        } else if signals.in_any_pattern() {
            10.0
        } else {
            0.0
        }
    }

    /// Relational anchoring: a question about people the member is
    /// connected to beats one referencing a relationship the member
    /// actually holds, which beats being connected without any overlap
    /// with the people the question names.
    fn edge_context(&self, question: &Question, signals: &MemberSignals) -> f32 {
        let member_id = signals.member.id;
        let connected_to_subject = question
            .relevant_member_ids
            .iter()
            .any(|id| *id != member_id && signals.connections.contains(id));
        if connected_to_subject {
            return EDGE_CAP;
        }
        if let Some(ctx) = &question.edge_context {
            let other = if ctx.members.0 == member_id {
                Some(ctx.members.1)
            } else if ctx.members.1 == member_id {
                Some(ctx.members.0)
            } else {
                None
            };
            if other.is_some_and(|id| signals.connections.contains(&id)) {
                return 20.0;
            }
        }
        if !signals.connections.is_empty() && !question.relevant_member_ids.is_empty() {
            return 5.0;
        }
        0.0
    }

    /// Vibe vocabulary against the member's taste words, with the fast
    /// contextual state nudging the result. Returns the factor and whether
    /// it was scored without a profile.
    fn taste_match(&self, question: &Question, signals: &MemberSignals) -> (f32, bool) {
        const NEUTRAL: f32 = 12.0;

        let Some(vibe) = question.vibe else {
            return (NEUTRAL, signals.taste.is_none());
        };
        let Some(taste) = &signals.taste else {
            return (NEUTRAL, true);
        };

        let words = vibe.resonance_words();
        let mut score = if words.iter().any(|w| taste.has_avoid_word(w)) {
            0.0
        } else if words.iter().any(|w| taste.has_vibe_word(w)) {
            TASTE_CAP
        } else {
            NEUTRAL
        };

        match (taste.context.energy, vibe) {
            (Some(EnergyLevel::Low), QuestionVibe::Deep) => {
                score = (score - 10.0).max(0.0);
            }
            (Some(EnergyLevel::High), QuestionVibe::Playful) => {
                score = (score + 5.0).min(TASTE_CAP);
            }
            _ => {}
        }
        (score, false)
    }

    /// Category fatigue plus a penalty when the member was targeted
    /// recently on any channel.
    fn freshness(&self, question: &Question, signals: &MemberSignals, now: DateTime<Utc>) -> f32 {
        let answered = signals
            .answered_by_category
            .get(&question.category)
            .copied()
            .unwrap_or(0);
        let mut score = if answered < self.config.category_wellworn {
            FRESHNESS_CAP
        } else if answered < self.config.category_overasked {
            5.0
        } else {
            2.0
        };

        if let Some(last) = signals.last_assignment_at {
            if now - last < Duration::hours(self.config.recency_window_hours) {
                score -= self.config.recency_penalty;
            }
        }
        score.max(0.0)
    }

    /// How well the question's shape suits the delivery surface.
    fn channel_fit(&self, question: &Question, channel: DeliveryChannel) -> f32 {
        match channel {
            DeliveryChannel::MobileSwipe => {
                if question.difficulty == 1 && question.form.is_closed_form() {
                    CHANNEL_CAP
                } else if question.difficulty <= 2 {
                    7.0
                } else {
                    3.0
                }
            }
            DeliveryChannel::ClubhouseDisplay => match question.vibe {
                Some(QuestionVibe::Connector) | Some(QuestionVibe::Playful) => CHANNEL_CAP,
                _ if question.difficulty <= 2 => 7.0,
                _ => 5.0,
            },
            DeliveryChannel::Email => {
                if question.difficulty >= 2 && !question.form.is_closed_form() {
                    CHANNEL_CAP
                } else if question.difficulty >= 2 {
                    7.0
                } else {
                    5.0
                }
            }
            DeliveryChannel::WebChat => 7.0,
            DeliveryChannel::Sms => 5.0,
        }
    }
}
