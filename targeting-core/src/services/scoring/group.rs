use std::collections::{HashMap, HashSet};

use crate::domain::{lower_set, Member, MemberId, Pattern, Question, QuestionVibe, TasteProfile};

/// Prefetched group-level inputs for conversation scoring.
pub struct GroupContext {
    pub members: Vec<Member>,
    pub tastes: HashMap<MemberId, TasteProfile>,
    pub patterns: Vec<Pattern>,
    /// Fraction of member pairs connected by an active edge.
    pub edge_density: f32,
}

const BASE: f32 = 50.0;

/// Score a question for a whole group in conversation, e.g. clubhouse
/// tables. Starts from a neutral base; shared context pushes up, a
/// mismatch between depth and group size pushes down. Callers must pass
/// at least two members.
pub fn score_for_group(question: &Question, ctx: &GroupContext) -> f32 {
    let member_ids: HashSet<MemberId> = ctx.members.iter().map(|m| m.id).collect();
    let mut score = BASE;

    // How much of the question's cast is actually at the table.
    if !question.relevant_member_ids.is_empty() {
        let present = question
            .relevant_member_ids
            .iter()
            .filter(|id| member_ids.contains(id))
            .count();
        score += 20.0 * present as f32 / question.relevant_member_ids.len() as f32;
    }

    if let Some(edge_ctx) = &question.edge_context {
        if member_ids.contains(&edge_ctx.members.0) && member_ids.contains(&edge_ctx.members.1) {
            score += 15.0;
        }
    }

    let group_skills: HashSet<String> = ctx
        .members
        .iter()
        .flat_map(|m| m.skill_set())
        .collect();
    let group_interests: HashSet<String> = ctx
        .members
        .iter()
        .flat_map(|m| m.interest_set())
        .collect();
    score += 10.0 * overlap_fraction(&lower_set(&question.target_skills), &group_skills);
    score += 10.0 * overlap_fraction(&lower_set(&question.target_interests), &group_interests);

    // Patterns the question probes that someone at the table belongs to.
    if !question.target_pattern_ids.is_empty() {
        let represented = question
            .target_pattern_ids
            .iter()
            .filter(|id| {
                ctx.patterns
                    .iter()
                    .find(|p| p.id == **id)
                    .map_or(false, |p| p.member_ids.iter().any(|m| member_ids.contains(m)))
            })
            .count();
        score += 15.0 * represented as f32 / question.target_pattern_ids.len() as f32;
    }

    if let Some(vibe) = question.vibe {
        let words = vibe.resonance_words();
        // Each taste hit counts for, each avoid hit counts against; the
        // net can drag the score below the base.
        let mut compatible = 0i32;
        for m in &ctx.members {
            let Some(taste) = ctx.tastes.get(&m.id) else {
                continue;
            };
            if words.iter().any(|w| taste.has_avoid_word(w)) {
                compatible -= 1;
            } else if words.iter().any(|w| taste.has_vibe_word(w)) {
                compatible += 1;
            }
        }
        score += 10.0 * compatible as f32 / ctx.members.len() as f32;

        // A well-connected table amplifies connector questions.
        if vibe == QuestionVibe::Connector && ctx.edge_density > 0.5 {
            score += 10.0;
        }
    }

    // Depth against table size: light questions work for big tables, deep
    // ones need intimacy.
    let size = ctx.members.len();
    match (size, question.difficulty) {
        (4.., 1) => score += 5.0,
        (..=2, 3) => score += 5.0,
        (5.., 3) => score -= 5.0,
        _ => {}
    }

    score.clamp(0.0, 100.0)
}

fn overlap_fraction(wanted: &HashSet<String>, have: &HashSet<String>) -> f32 {
    if wanted.is_empty() {
        return 0.0;
    }
    wanted.intersection(have).count() as f32 / wanted.len() as f32
}
