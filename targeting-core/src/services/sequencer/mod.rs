use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SequencerConfig;
use crate::domain::{Member, MemberId, Pattern, Question};

/// Why a question earned its place in the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    /// Tests whether the member belongs in a pattern they look close to.
    PatternProbe,
    /// Deepens a pattern the member is already part of.
    PatternDeepen,
    /// An answer would fill a hole in the member's profile.
    ProfileGap,
    /// Nothing specific matched; the question is generically useful.
    Fallback,
}

impl QueueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueReason::PatternProbe => "pattern_probe",
            QueueReason::PatternDeepen => "pattern_deepen",
            QueueReason::ProfileGap => "profile_gap",
            QueueReason::Fallback => "fallback",
        }
    }
}

/// A pattern the queued question relates to, with the member's standing
/// toward it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternLink {
    pub pattern_id: i64,
    pub pattern_name: String,
    pub member_of: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct QueuedQuestion {
    /// 1-based slot in the deck.
    pub position: usize,
    pub question: Question,
    pub score: f32,
    pub reason: QueueReason,
    pub reason_detail: String,
    pub related_patterns: Vec<PatternLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSummary {
    pub candidates_considered: usize,
    /// Patterns the member already belongs to.
    pub pattern_memberships: usize,
    /// Patterns the member is affine to above the probe threshold.
    pub high_affinity_patterns: usize,
    pub profile_gaps: usize,
    pub probes: usize,
    pub deepens: usize,
    pub gaps: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct MemberQueue {
    pub member_id: MemberId,
    pub built_at: DateTime<Utc>,
    pub questions: Vec<QueuedQuestion>,
    pub summary: QueueSummary,
}

struct ScoredEntry {
    question: Question,
    score: f32,
    reason: QueueReason,
    reason_detail: String,
    related_patterns: Vec<PatternLink>,
}

/// Builds a member's swipe deck: scores the pool on pattern work and
/// profile gaps, keeps the strongest few, then sequences them so the deck
/// opens light and ends deep.
pub struct DeckSequencer {
    config: SequencerConfig,
}

/// (preferred difficulty, preferred reason, slots) per deck section.
const SECTIONS: [(u8, QueueReason, usize); 3] = [
    (1, QueueReason::ProfileGap, 3),
    (2, QueueReason::PatternProbe, 4),
    (3, QueueReason::PatternDeepen, 3),
];

impl DeckSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        DeckSequencer { config }
    }

    pub fn build(
        &self,
        member: &Member,
        patterns: &[Pattern],
        questions: &[Question],
        now: DateTime<Utc>,
    ) -> MemberQueue {
        let candidates_considered = questions.len();
        let mut entries: Vec<ScoredEntry> = questions
            .iter()
            .filter(|q| q.is_active)
            .map(|q| self.score_question(member, patterns, q))
            .collect();

        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.truncate(self.config.queue_size);

        let ordered = sequence(entries);

        let skills = member.skill_set();
        let interests = member.interest_set();
        let mut summary = QueueSummary {
            candidates_considered,
            pattern_memberships: patterns.iter().filter(|p| p.includes(member.id)).count(),
            high_affinity_patterns: patterns
                .iter()
                .filter(|p| !p.includes(member.id))
                .filter(|p| {
                    p.affinity_for(&skills, &interests)
                        .map_or(false, |a| a >= self.config.affinity_threshold)
                })
                .count(),
            profile_gaps: member.profile_gaps().len(),
            ..Default::default()
        };
        for entry in &ordered {
            match entry.reason {
                QueueReason::PatternProbe => summary.probes += 1,
                QueueReason::PatternDeepen => summary.deepens += 1,
                QueueReason::ProfileGap => summary.gaps += 1,
                QueueReason::Fallback => summary.fallbacks += 1,
            }
        }
        debug!(
            member_id = member.id,
            deck_size = ordered.len(),
            probes = summary.probes,
            gaps = summary.gaps,
            "deck built"
        );

        MemberQueue {
            member_id: member.id,
            built_at: now,
            questions: ordered
                .into_iter()
                .enumerate()
                .map(|(i, e)| QueuedQuestion {
                    position: i + 1,
                    question: e.question,
                    score: e.score,
                    reason: e.reason,
                    reason_detail: e.reason_detail,
                    related_patterns: e.related_patterns,
                })
                .collect(),
            summary,
        }
    }

    fn score_question(
        &self,
        member: &Member,
        patterns: &[Pattern],
        question: &Question,
    ) -> ScoredEntry {
        let skills = member.skill_set();
        let interests = member.interest_set();
        let memberships = patterns.iter().filter(|p| p.includes(member.id)).count();

        // Every question starts at the base; credits stack on top of it.
        let mut score = 0.1f32;
        let mut related = Vec::new();
        let mut probe_detail: Option<String> = None;
        let mut deepened = 0usize;

        for pattern_id in &question.target_pattern_ids {
            let Some(pattern) = patterns.iter().find(|p| p.id == *pattern_id) else {
                continue;
            };
            if pattern.includes(member.id) {
                deepened += 1;
                related.push(PatternLink {
                    pattern_id: pattern.id,
                    pattern_name: pattern.name.clone(),
                    member_of: true,
                    affinity: None,
                });
            } else if let Some(affinity) = pattern.affinity_for(&skills, &interests) {
                if affinity >= self.config.affinity_threshold {
                    score += 10.0 * affinity;
                    probe_detail
                        .get_or_insert_with(|| format!("close to pattern '{}'", pattern.name));
                    related.push(PatternLink {
                        pattern_id: pattern.id,
                        pattern_name: pattern.name.clone(),
                        member_of: false,
                        affinity: Some(affinity),
                    });
                }
            }
        }

        if deepened > 0 && memberships > 0 {
            score += 5.0 * deepened as f32 / memberships as f32;
        }

        let gaps = member.profile_gaps();
        let matching_gaps = question
            .target_profile_fields
            .iter()
            .filter(|f| gaps.contains(f))
            .count();
        if !question.target_profile_fields.is_empty() && matching_gaps > 0 {
            score += 4.0 * matching_gaps as f32 / question.target_profile_fields.len() as f32;
        }

        // Profile-targeted questions with no pattern link still earn a
        // small credit, on top of any gap credit above.
        if !question.target_profile_fields.is_empty() && question.target_pattern_ids.is_empty() {
            score += 1.0;
        }

        // Reason priority: probing new ground beats deepening known
        // ground, which beats housekeeping.
        let (reason, reason_detail) = if let Some(detail) = probe_detail {
            (QueueReason::PatternProbe, detail)
        } else if deepened > 0 {
            (
                QueueReason::PatternDeepen,
                "deepens a pattern they belong to".to_string(),
            )
        } else if matching_gaps > 0 {
            (
                QueueReason::ProfileGap,
                format!("fills {matching_gaps} profile gap(s)"),
            )
        } else {
            (
                QueueReason::Fallback,
                "generally useful question".to_string(),
            )
        };

        ScoredEntry {
            question: question.clone(),
            score,
            reason,
            reason_detail,
            related_patterns: related,
        }
    }
}

/// Order a scored deck so it warms up with easy gap-fillers, probes in
/// the middle and goes deep at the end. Each section greedily takes the
/// entries best matching its preferred difficulty and reason, breaking
/// ties by score.
fn sequence(mut entries: Vec<ScoredEntry>) -> Vec<ScoredEntry> {
    let mut ordered = Vec::with_capacity(entries.len());
    for (difficulty, reason, slots) in SECTIONS {
        for _ in 0..slots {
            if entries.is_empty() {
                break;
            }
            let best = entries
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    section_key(a, difficulty, reason)
                        .partial_cmp(&section_key(b, difficulty, reason))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i);
            if let Some(i) = best {
                ordered.push(entries.remove(i));
            }
        }
    }
    // Anything past the three sections keeps score order.
    ordered.extend(entries);
    ordered
}

fn section_key(entry: &ScoredEntry, difficulty: u8, reason: QueueReason) -> (i32, f32) {
    let mut fit = 0;
    if entry.question.difficulty == difficulty {
        fit += 1;
    }
    if entry.reason == reason {
        fit += 1;
    }
    (fit, entry.score)
}
