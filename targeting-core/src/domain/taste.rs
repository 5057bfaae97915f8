use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::edge::MemberId;

/// Self-reported energy, part of the fast-moving contextual state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// Fast-moving situational state. Unlike the durable taste fields this is
/// replaced wholesale on every update, never merged field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyLevel>,
    #[serde(default)]
    pub visitors_in_town: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

const AFFINITY_MIN: i32 = -100;
const AFFINITY_MAX: i32 = 100;

/// A member's accumulated taste signals, built up from conversations and
/// question answers over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasteProfile {
    pub member_id: MemberId,
    /// Words the member uses when describing things they like.
    #[serde(default)]
    pub vibe_words: Vec<String>,
    /// Words the member uses when describing things to avoid.
    #[serde(default)]
    pub avoid_words: Vec<String>,
    #[serde(default)]
    pub dealbreakers: Vec<String>,
    #[serde(default)]
    pub not_my_thing: Vec<String>,
    /// Signed affinity per category, clamped to [-100, 100].
    #[serde(default)]
    pub category_affinities: BTreeMap<String, i32>,
    #[serde(default)]
    pub venue_affinities: BTreeMap<String, i32>,
    #[serde(default)]
    pub organizer_affinities: BTreeMap<String, i32>,
    #[serde(default)]
    pub context: ContextState,
    pub updated_at: DateTime<Utc>,
}

/// A partial taste observation to fold into an existing profile. `None`
/// fields leave the profile untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasteUpdate {
    #[serde(default)]
    pub vibe_words: Vec<String>,
    #[serde(default)]
    pub avoid_words: Vec<String>,
    #[serde(default)]
    pub dealbreakers: Vec<String>,
    #[serde(default)]
    pub not_my_thing: Vec<String>,
    #[serde(default)]
    pub category_affinities: BTreeMap<String, i32>,
    #[serde(default)]
    pub venue_affinities: BTreeMap<String, i32>,
    #[serde(default)]
    pub organizer_affinities: BTreeMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextState>,
}

fn union_words(dst: &mut Vec<String>, src: &[String]) {
    for word in src {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        if !dst.iter().any(|w| w.eq_ignore_ascii_case(word)) {
            dst.push(word.to_string());
        }
    }
}

fn merge_affinities(dst: &mut BTreeMap<String, i32>, src: &BTreeMap<String, i32>) {
    for (key, &value) in src {
        let value = value.clamp(AFFINITY_MIN, AFFINITY_MAX);
        dst.entry(key.clone())
            .and_modify(|existing| *existing = (*existing).max(value))
            .or_insert(value);
    }
}

impl TasteProfile {
    pub fn empty(member_id: MemberId, now: DateTime<Utc>) -> Self {
        TasteProfile {
            member_id,
            vibe_words: Vec::new(),
            avoid_words: Vec::new(),
            dealbreakers: Vec::new(),
            not_my_thing: Vec::new(),
            category_affinities: BTreeMap::new(),
            venue_affinities: BTreeMap::new(),
            organizer_affinities: BTreeMap::new(),
            context: ContextState::default(),
            updated_at: now,
        }
    }

    /// Fold a partial observation into this profile. Word lists are
    /// unioned (case-insensitively), affinity maps keep the strongest
    /// signal per key, and a present `context` replaces the old one
    /// wholesale with its `updated_at` stamped.
    pub fn merged(&self, update: &TasteUpdate, now: DateTime<Utc>) -> Self {
        let mut out = self.clone();
        union_words(&mut out.vibe_words, &update.vibe_words);
        union_words(&mut out.avoid_words, &update.avoid_words);
        union_words(&mut out.dealbreakers, &update.dealbreakers);
        union_words(&mut out.not_my_thing, &update.not_my_thing);
        merge_affinities(&mut out.category_affinities, &update.category_affinities);
        merge_affinities(&mut out.venue_affinities, &update.venue_affinities);
        merge_affinities(&mut out.organizer_affinities, &update.organizer_affinities);
        if let Some(context) = &update.context {
            out.context = ContextState {
                updated_at: Some(now),
                ..context.clone()
            };
        }
        out.updated_at = now;
        out
    }

    /// Case-insensitive membership test against the vibe vocabulary.
    pub fn has_vibe_word(&self, word: &str) -> bool {
        self.vibe_words.iter().any(|w| w.eq_ignore_ascii_case(word))
    }

    pub fn has_avoid_word(&self, word: &str) -> bool {
        self.avoid_words
            .iter()
            .any(|w| w.eq_ignore_ascii_case(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TasteProfile {
        let mut p = TasteProfile::empty(1, Utc::now());
        p.vibe_words = vec!["cozy".into(), "weird".into()];
        p.category_affinities.insert("music".into(), 40);
        p
    }

    #[test]
    fn merge_unions_word_lists_case_insensitively() {
        let update = TasteUpdate {
            vibe_words: vec!["Cozy".into(), "bold".into()],
            ..Default::default()
        };
        let merged = base().merged(&update, Utc::now());
        assert_eq!(merged.vibe_words, vec!["cozy", "weird", "bold"]);
    }

    #[test]
    fn merge_keeps_strongest_affinity_per_key() {
        let mut update = TasteUpdate::default();
        update.category_affinities.insert("music".into(), 20);
        update.category_affinities.insert("film".into(), -30);
        let merged = base().merged(&update, Utc::now());
        assert_eq!(merged.category_affinities["music"], 40);
        assert_eq!(merged.category_affinities["film"], -30);
    }

    #[test]
    fn merge_clamps_affinities() {
        let mut update = TasteUpdate::default();
        update.category_affinities.insert("music".into(), 900);
        update.category_affinities.insert("crowds".into(), -900);
        let merged = base().merged(&update, Utc::now());
        assert_eq!(merged.category_affinities["music"], 100);
        assert_eq!(merged.category_affinities["crowds"], -100);
    }

    #[test]
    fn context_is_replaced_wholesale_and_stamped() {
        let mut profile = base();
        profile.context = ContextState {
            current_mood: Some("reflective".into()),
            energy: Some(EnergyLevel::Low),
            visitors_in_town: true,
            updated_at: None,
        };
        let now = Utc::now();
        let update = TasteUpdate {
            context: Some(ContextState {
                current_mood: Some("social".into()),
                energy: None,
                visitors_in_town: false,
                updated_at: None,
            }),
            ..Default::default()
        };
        let merged = profile.merged(&update, now);
        assert_eq!(merged.context.current_mood.as_deref(), Some("social"));
        assert_eq!(merged.context.energy, None);
        assert!(!merged.context.visitors_in_town);
        assert_eq!(merged.context.updated_at, Some(now));
    }

    #[test]
    fn absent_context_leaves_old_one_alone() {
        let mut profile = base();
        profile.context.current_mood = Some("reflective".into());
        let merged = profile.merged(&TasteUpdate::default(), Utc::now());
        assert_eq!(merged.context.current_mood.as_deref(), Some("reflective"));
    }
}
