use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::edge::MemberId;
use super::member::lower_set;

/// Kind of discovered cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    SkillCluster,
    InterestTheme,
    CollaborationOpportunity,
    CommunityStrength,
    CrossDomain,
}

/// Shared vocabulary backing a pattern, used to estimate affinity for
/// members not yet listed in it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternEvidence {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// A named cluster of members sharing a discovered trait. Produced by an
/// external discovery process; read-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: PatternCategory,
    #[serde(default)]
    pub member_ids: Vec<MemberId>,
    #[serde(default)]
    pub evidence: PatternEvidence,
    pub is_active: bool,
}

const SKILL_WEIGHT: f32 = 0.6;
const INTEREST_WEIGHT: f32 = 0.4;

impl Pattern {
    pub fn includes(&self, member: MemberId) -> bool {
        self.member_ids.contains(&member)
    }

    /// Affinity in [0,1] between this pattern's evidence vocabulary and a
    /// member's skills/interests: `0.6 * skill overlap + 0.4 * interest
    /// overlap`, each overlap being `|match| / |evidence set|`.
    ///
    /// Returns `None` when the pattern carries no evidence vocabulary at
    /// all, since there is no basis for an estimate. Membership is not
    /// consulted here;
    /// callers skip members already listed in the pattern (their signal is
    /// membership itself).
    pub fn affinity_for(
        &self,
        member_skills: &HashSet<String>,
        member_interests: &HashSet<String>,
    ) -> Option<f32> {
        let evidence_skills = lower_set(&self.evidence.skills);
        let evidence_interests = lower_set(&self.evidence.interests);

        if evidence_skills.is_empty() && evidence_interests.is_empty() {
            return None;
        }

        let skill_overlap = if evidence_skills.is_empty() {
            0.0
        } else {
            evidence_skills.intersection(member_skills).count() as f32
                / evidence_skills.len() as f32
        };
        let interest_overlap = if evidence_interests.is_empty() {
            0.0
        } else {
            evidence_interests.intersection(member_interests).count() as f32
                / evidence_interests.len() as f32
        };

        Some(SKILL_WEIGHT * skill_overlap + INTEREST_WEIGHT * interest_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(skills: &[&str], interests: &[&str]) -> Pattern {
        Pattern {
            id: 1,
            name: "Makers".into(),
            description: "Hands-on builders".into(),
            category: PatternCategory::SkillCluster,
            member_ids: vec![7],
            evidence: PatternEvidence {
                skills: skills.iter().map(|s| s.to_string()).collect(),
                interests: interests.iter().map(|s| s.to_string()).collect(),
            },
            is_active: true,
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn affinity_blends_skill_and_interest_overlap() {
        let p = pattern(&["welding", "ceramics"], &["sculpture", "markets"]);
        // 1/2 skills, 1/2 interests -> 0.6*0.5 + 0.4*0.5 = 0.5
        let affinity = p
            .affinity_for(&set(&["welding"]), &set(&["markets"]))
            .unwrap();
        assert!((affinity - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn affinity_is_case_insensitive() {
        let p = pattern(&["Welding"], &[]);
        let affinity = p.affinity_for(&set(&["welding"]), &set(&[])).unwrap();
        assert!((affinity - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn affinity_stays_in_unit_range() {
        let p = pattern(&["a", "b"], &["c"]);
        let full = p.affinity_for(&set(&["a", "b"]), &set(&["c"])).unwrap();
        assert!(full <= 1.0);
        let none = p.affinity_for(&set(&[]), &set(&[])).unwrap();
        assert_eq!(none, 0.0);
    }

    #[test]
    fn no_evidence_means_no_estimate() {
        let p = pattern(&[], &[]);
        assert!(p.affinity_for(&set(&["a"]), &set(&["b"])).is_none());
    }
}
