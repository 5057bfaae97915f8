use chrono::Utc;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;
use ttl_cache::TtlCache;

use crate::domain::{canonical_pair, Edge, EdgeEvidence, EdgeType, MemberId};

pub const MAX_STRENGTH: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("edge endpoints must be distinct members, got {0} twice")]
    SelfEdge(MemberId),
    #[error("edge strength {0} out of range 0-100")]
    InvalidStrength(u16),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// What happened to an upsert. Every variant carries the row as stored
/// after the operation.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Created(Edge),
    Strengthened(Edge),
    AlreadyExists(Edge),
}

impl UpsertOutcome {
    pub fn edge(&self) -> &Edge {
        match self {
            UpsertOutcome::Created(e)
            | UpsertOutcome::Strengthened(e)
            | UpsertOutcome::AlreadyExists(e) => e,
        }
    }
}

/// Aggregate view over the active graph, cheap enough to recompute but
/// cached briefly since dashboards poll it.
#[derive(Debug, Clone)]
pub struct GraphStats {
    pub active_edges: usize,
    pub connected_members: usize,
    pub avg_strength: f32,
    pub edges_by_type: BTreeMap<&'static str, usize>,
}

/// In-memory relationship graph. One row per (pair, type); the pair is
/// stored in canonical order so rediscovery from either direction lands
/// on the same row. The dashmap entry lock serializes concurrent upserts
/// on the same key.
pub struct GraphStore {
    edges: DashMap<(MemberId, MemberId, EdgeType), Edge>,
    next_id: AtomicI64,
    stats_cache: TtlCache<(), GraphStats>,
}

impl GraphStore {
    pub fn new(stats_ttl: Duration) -> Self {
        GraphStore {
            edges: DashMap::new(),
            next_id: AtomicI64::new(1),
            stats_cache: TtlCache::new(stats_ttl),
        }
    }

    /// Record a discovered relationship. If the (pair, type) row already
    /// exists and is active, strength only moves up: a weaker rediscovery
    /// leaves the row untouched, a stronger one raises strength and merges
    /// evidence. An inactive row is brought back as a fresh edge.
    pub fn upsert_edge(
        &self,
        member_a: MemberId,
        member_b: MemberId,
        edge_type: EdgeType,
        strength: u8,
        discovered_via: &str,
        evidence: EdgeEvidence,
    ) -> Result<UpsertOutcome> {
        if member_a == member_b {
            return Err(GraphError::SelfEdge(member_a));
        }
        if strength > MAX_STRENGTH {
            return Err(GraphError::InvalidStrength(strength as u16));
        }

        let (a, b) = canonical_pair(member_a, member_b);
        let now = Utc::now();

        // The entry lock serializes concurrent upserts on the same key.
        let outcome = match self.edges.entry((a, b, edge_type)) {
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let edge = Edge {
                    id,
                    member_a: a,
                    member_b: b,
                    edge_type,
                    strength,
                    discovered_via: discovered_via.to_string(),
                    evidence,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                debug!(
                    edge_id = id,
                    member_a = a,
                    member_b = b,
                    edge_type = edge_type.as_str(),
                    strength,
                    "edge created"
                );
                vacant.insert(edge.clone());
                UpsertOutcome::Created(edge)
            }
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let edge = occupied.get_mut();
                if !edge.is_active {
                    // Logical deletion followed by rediscovery: fresh edge.
                    edge.is_active = true;
                    edge.strength = strength;
                    edge.discovered_via = discovered_via.to_string();
                    edge.evidence = evidence;
                    edge.updated_at = now;
                    debug!(edge_id = edge.id, strength, "edge reactivated");
                    UpsertOutcome::Created(edge.clone())
                } else if strength > edge.strength {
                    edge.strength = strength;
                    edge.discovered_via = discovered_via.to_string();
                    edge.evidence.merge_from(&evidence);
                    edge.updated_at = now;
                    debug!(edge_id = edge.id, strength, "edge strengthened");
                    UpsertOutcome::Strengthened(edge.clone())
                } else {
                    UpsertOutcome::AlreadyExists(edge.clone())
                }
            }
        };

        if !matches!(outcome, UpsertOutcome::AlreadyExists(_)) {
            self.stats_cache.invalidate(&());
        }
        Ok(outcome)
    }

    /// Active edges touching `member`.
    pub fn edges_for(&self, member: MemberId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.is_active && e.touches(member))
            .map(|e| e.clone())
            .collect()
    }

    /// Members connected to `member` by at least one active edge.
    pub fn neighbors(&self, member: MemberId) -> HashSet<MemberId> {
        self.edges
            .iter()
            .filter(|e| e.is_active && e.touches(member))
            .map(|e| e.other_end(member))
            .collect()
    }

    /// Active edges with both endpoints inside `members`.
    pub fn edges_within(&self, members: &[MemberId]) -> Vec<Edge> {
        let set: HashSet<MemberId> = members.iter().copied().collect();
        self.edges
            .iter()
            .filter(|e| e.is_active && set.contains(&e.member_a) && set.contains(&e.member_b))
            .map(|e| e.clone())
            .collect()
    }

    /// Fraction of possible pairs in `members` that are connected, in
    /// [0,1]. Parallel edges of different types still count as one pair.
    pub fn edge_density(&self, members: &[MemberId]) -> f32 {
        let n = members.len();
        if n < 2 {
            return 0.0;
        }
        let connected_pairs: HashSet<(MemberId, MemberId)> = self
            .edges_within(members)
            .iter()
            .map(|e| (e.member_a, e.member_b))
            .collect();
        let possible = (n * (n - 1) / 2) as f32;
        connected_pairs.len() as f32 / possible
    }

    /// Logically delete an edge. Returns whether a live row was found.
    pub fn deactivate_edge(
        &self,
        member_a: MemberId,
        member_b: MemberId,
        edge_type: EdgeType,
    ) -> bool {
        let (a, b) = canonical_pair(member_a, member_b);
        let deactivated = match self.edges.get_mut(&(a, b, edge_type)) {
            Some(mut edge) if edge.is_active => {
                edge.is_active = false;
                edge.updated_at = Utc::now();
                true
            }
            _ => false,
        };
        if deactivated {
            self.stats_cache.invalidate(&());
        }
        deactivated
    }

    /// Snapshot of graph-wide aggregates, served from a short-lived cache.
    pub fn stats(&self) -> GraphStats {
        if let Some(cached) = self.stats_cache.get(&()) {
            return cached;
        }
        let mut active_edges = 0usize;
        let mut strength_sum = 0u64;
        let mut members = HashSet::new();
        let mut by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        for edge in self.edges.iter().filter(|e| e.is_active) {
            active_edges += 1;
            strength_sum += edge.strength as u64;
            members.insert(edge.member_a);
            members.insert(edge.member_b);
            *by_type.entry(edge.edge_type.as_str()).or_insert(0) += 1;
        }
        let stats = GraphStats {
            active_edges,
            connected_members: members.len(),
            avg_strength: if active_edges == 0 {
                0.0
            } else {
                strength_sum as f32 / active_edges as f32
            },
            edges_by_type: by_type,
        };
        self.stats_cache.insert((), stats.clone());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GraphStore {
        GraphStore::new(Duration::from_secs(30))
    }

    fn evidence(skills: &[&str]) -> EdgeEvidence {
        EdgeEvidence {
            shared_skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_self_edges_and_bad_strength() {
        let g = store();
        assert!(matches!(
            g.upsert_edge(3, 3, EdgeType::SharedSkill, 50, "agent", EdgeEvidence::default()),
            Err(GraphError::SelfEdge(3))
        ));
        assert!(matches!(
            g.upsert_edge(1, 2, EdgeType::SharedSkill, 150, "agent", EdgeEvidence::default()),
            Err(GraphError::InvalidStrength(150))
        ));
    }

    #[test]
    fn reversed_pair_lands_on_the_same_row() {
        let g = store();
        let first = g
            .upsert_edge(9, 5, EdgeType::SharedSkill, 40, "agent", EdgeEvidence::default())
            .unwrap();
        let second = g
            .upsert_edge(5, 9, EdgeType::SharedSkill, 40, "agent", EdgeEvidence::default())
            .unwrap();
        assert!(matches!(first, UpsertOutcome::Created(_)));
        assert!(matches!(second, UpsertOutcome::AlreadyExists(_)));
        assert_eq!(first.edge().id, second.edge().id);
        assert_eq!(g.edges_for(5).len(), 1);
    }

    #[test]
    fn rediscovery_strengthens_and_merges_evidence() {
        let g = store();
        g.upsert_edge(1, 2, EdgeType::SharedSkill, 40, "skill_scan", evidence(&["rust"]))
            .unwrap();
        let outcome = g
            .upsert_edge(1, 2, EdgeType::SharedSkill, 70, "event_sync", evidence(&["music"]))
            .unwrap();
        let UpsertOutcome::Strengthened(edge) = outcome else {
            panic!("expected strengthen");
        };
        assert_eq!(edge.strength, 70);
        assert_eq!(edge.evidence.shared_skills, vec!["rust", "music"]);
        assert_eq!(edge.discovered_via, "event_sync");
    }

    #[test]
    fn weaker_rediscovery_leaves_the_row_untouched() {
        let g = store();
        g.upsert_edge(1, 2, EdgeType::SharedSkill, 70, "a", evidence(&["rust"]))
            .unwrap();
        let outcome = g
            .upsert_edge(1, 2, EdgeType::SharedSkill, 30, "b", evidence(&["music"]))
            .unwrap();
        let UpsertOutcome::AlreadyExists(edge) = outcome else {
            panic!("expected no-op");
        };
        assert_eq!(edge.strength, 70);
        assert_eq!(edge.evidence.shared_skills, vec!["rust"]);
    }

    #[test]
    fn deactivated_edge_comes_back_as_created() {
        let g = store();
        g.upsert_edge(1, 2, EdgeType::SharedInterest, 60, "a", EdgeEvidence::default())
            .unwrap();
        assert!(g.deactivate_edge(2, 1, EdgeType::SharedInterest));
        assert!(g.edges_for(1).is_empty());

        let outcome = g
            .upsert_edge(1, 2, EdgeType::SharedInterest, 20, "b", EdgeEvidence::default())
            .unwrap();
        assert!(matches!(outcome, UpsertOutcome::Created(_)));
        assert_eq!(outcome.edge().strength, 20);
    }

    #[test]
    fn density_counts_pairs_not_parallel_edges() {
        let g = store();
        g.upsert_edge(1, 2, EdgeType::SharedSkill, 50, "a", EdgeEvidence::default())
            .unwrap();
        g.upsert_edge(1, 2, EdgeType::SharedInterest, 50, "a", EdgeEvidence::default())
            .unwrap();
        g.upsert_edge(2, 3, EdgeType::SharedSkill, 50, "a", EdgeEvidence::default())
            .unwrap();
        // 2 connected pairs of 3 possible among {1,2,3}.
        let density = g.edge_density(&[1, 2, 3]);
        assert!((density - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(g.edge_density(&[1]), 0.0);
    }

    #[test]
    fn stats_reflect_active_rows_only() {
        let g = store();
        g.upsert_edge(1, 2, EdgeType::SharedSkill, 40, "a", EdgeEvidence::default())
            .unwrap();
        g.upsert_edge(2, 3, EdgeType::SharedInterest, 80, "a", EdgeEvidence::default())
            .unwrap();
        g.deactivate_edge(1, 2, EdgeType::SharedSkill);

        let stats = g.stats();
        assert_eq!(stats.active_edges, 1);
        assert_eq!(stats.connected_members, 2);
        assert!((stats.avg_strength - 80.0).abs() < f32::EPSILON);
        assert_eq!(stats.edges_by_type.get("shared_interest"), Some(&1));
    }

    #[test]
    fn neighbors_follow_either_endpoint() {
        let g = store();
        g.upsert_edge(5, 2, EdgeType::SharedSkill, 40, "a", EdgeEvidence::default())
            .unwrap();
        g.upsert_edge(7, 5, EdgeType::SharedInterest, 40, "a", EdgeEvidence::default())
            .unwrap();
        let n = g.neighbors(5);
        assert_eq!(n, HashSet::from([2, 7]));
    }
}
