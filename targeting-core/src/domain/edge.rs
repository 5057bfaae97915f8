use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Member identifier, assigned by the profile collaborator.
pub type MemberId = i64;

/// How two members are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    SharedSkill,
    SharedInterest,
    CollaborationPotential,
    EventCoAttendance,
    IntroducedByAgent,
    PatternConnection,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::SharedSkill => "shared_skill",
            EdgeType::SharedInterest => "shared_interest",
            EdgeType::CollaborationPotential => "collaboration_potential",
            EdgeType::EventCoAttendance => "event_co_attendance",
            EdgeType::IntroducedByAgent => "introduced_by_agent",
            EdgeType::PatternConnection => "pattern_connection",
        }
    }
}

/// Normalize a member pair to canonical order (lower id first) so that
/// (A,B,type) and (B,A,type) always address the same stored edge.
pub fn canonical_pair(a: MemberId, b: MemberId) -> (MemberId, MemberId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Why an edge exists. List-valued fields are unioned when a rediscovery
/// strengthens the edge; scalar fields are overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvidence {
    #[serde(default)]
    pub shared_skills: Vec<String>,
    #[serde(default)]
    pub shared_interests: Vec<String>,
    #[serde(default)]
    pub pattern_ids: Vec<i64>,
    #[serde(default)]
    pub pattern_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn union_into<T: PartialEq + Clone>(dst: &mut Vec<T>, src: &[T]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

impl EdgeEvidence {
    /// Merge newer evidence into this record: lists are unioned, `notes`
    /// is replaced when the newer record carries one.
    pub fn merge_from(&mut self, newer: &EdgeEvidence) {
        union_into(&mut self.shared_skills, &newer.shared_skills);
        union_into(&mut self.shared_interests, &newer.shared_interests);
        union_into(&mut self.pattern_ids, &newer.pattern_ids);
        union_into(&mut self.pattern_names, &newer.pattern_names);
        if newer.notes.is_some() {
            self.notes = newer.notes.clone();
        }
    }
}

/// An undirected, typed relationship between two distinct members.
///
/// Stored with `member_a < member_b`. Strength only ever increases on
/// rediscovery; deletion is logical via `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub member_a: MemberId,
    pub member_b: MemberId,
    pub edge_type: EdgeType,
    /// 0-100
    pub strength: u8,
    pub discovered_via: String,
    pub evidence: EdgeEvidence,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Edge {
    pub fn touches(&self, member: MemberId) -> bool {
        self.member_a == member || self.member_b == member
    }

    /// The endpoint opposite `member`. Callers must pass one of the two
    /// endpoints.
    pub fn other_end(&self, member: MemberId) -> MemberId {
        if self.member_a == member {
            self.member_b
        } else {
            self.member_a
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_lower_id_first() {
        assert_eq!(canonical_pair(9, 5), (5, 9));
        assert_eq!(canonical_pair(5, 9), (5, 9));
        assert_eq!(canonical_pair(3, 3), (3, 3));
    }

    #[test]
    fn evidence_merge_unions_lists() {
        let mut old = EdgeEvidence {
            shared_skills: vec!["rust".into(), "music".into()],
            notes: Some("met at demo night".into()),
            ..Default::default()
        };
        let newer = EdgeEvidence {
            shared_skills: vec!["music".into(), "woodworking".into()],
            pattern_ids: vec![4],
            ..Default::default()
        };
        old.merge_from(&newer);
        assert_eq!(old.shared_skills, vec!["rust", "music", "woodworking"]);
        assert_eq!(old.pattern_ids, vec![4]);
        // Newer record had no notes, the old ones survive.
        assert_eq!(old.notes.as_deref(), Some("met at demo night"));
    }

    #[test]
    fn evidence_merge_overwrites_scalars() {
        let mut old = EdgeEvidence {
            notes: Some("old".into()),
            ..Default::default()
        };
        let newer = EdgeEvidence {
            notes: Some("new".into()),
            ..Default::default()
        };
        old.merge_from(&newer);
        assert_eq!(old.notes.as_deref(), Some("new"));
    }
}
