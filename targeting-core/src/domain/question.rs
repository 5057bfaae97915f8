use serde::{Deserialize, Serialize};

use super::edge::MemberId;
use super::member::ProfileField;

/// Thematic bucket a question belongs to. Freshness scoring counts prior
/// answers per category, so the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    OriginStory,
    CreativeSpark,
    Collaboration,
    FutureVision,
    CommunityConnection,
    HiddenDepths,
    ImpactLegacy,
}

impl QuestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::OriginStory => "origin_story",
            QuestionCategory::CreativeSpark => "creative_spark",
            QuestionCategory::Collaboration => "collaboration",
            QuestionCategory::FutureVision => "future_vision",
            QuestionCategory::CommunityConnection => "community_connection",
            QuestionCategory::HiddenDepths => "hidden_depths",
            QuestionCategory::ImpactLegacy => "impact_legacy",
        }
    }
}

/// Shape of the expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerForm {
    FreeForm,
    MultipleChoice,
    YesNo,
    FillInBlank,
}

impl AnswerForm {
    /// Closed-form answers can be given with a tap, which matters for
    /// swipe-style channels.
    pub fn is_closed_form(&self) -> bool {
        matches!(
            self,
            AnswerForm::MultipleChoice | AnswerForm::YesNo | AnswerForm::FillInBlank
        )
    }
}

/// Emotional register of a question, matched against a member's taste
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionVibe {
    Warm,
    Playful,
    Deep,
    Edgy,
    Connector,
}

impl QuestionVibe {
    /// Words in a member's taste vocabulary that resonate with this vibe.
    pub fn resonance_words(&self) -> &'static [&'static str] {
        match self {
            QuestionVibe::Warm => &["cozy", "warm", "friendly", "welcoming"],
            QuestionVibe::Playful => &["fun", "playful", "quirky", "weird"],
            QuestionVibe::Deep => &["thoughtful", "introspective", "meaningful", "deep"],
            QuestionVibe::Edgy => &["provocative", "challenging", "edgy", "bold"],
            QuestionVibe::Connector => &["social", "community", "connecting", "networking"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionVibe::Warm => "warm",
            QuestionVibe::Playful => "playful",
            QuestionVibe::Deep => "deep",
            QuestionVibe::Edgy => "edgy",
            QuestionVibe::Connector => "connector",
        }
    }
}

/// Reference from a question to the relationship it was written about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<i64>,
    pub members: (MemberId, MemberId),
}

/// A question authored (by hand or by a generator) for the community, with
/// the targeting hints the authoring step attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub category: QuestionCategory,
    pub form: AnswerForm,
    /// 1 = light, 2 = medium, 3 = deep.
    pub difficulty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe: Option<QuestionVibe>,
    /// Members this question was written about or for.
    #[serde(default)]
    pub relevant_member_ids: Vec<MemberId>,
    /// Patterns this question probes or deepens.
    #[serde(default)]
    pub target_pattern_ids: Vec<i64>,
    /// Profile fields an answer would fill in.
    #[serde(default)]
    pub target_profile_fields: Vec<ProfileField>,
    #[serde(default)]
    pub target_skills: Vec<String>,
    #[serde(default)]
    pub target_interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_context: Option<EdgeContext>,
    pub is_active: bool,
}

impl Question {
    pub fn is_relevant_to(&self, member: MemberId) -> bool {
        self.relevant_member_ids.contains(&member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_forms() {
        assert!(!AnswerForm::FreeForm.is_closed_form());
        assert!(AnswerForm::MultipleChoice.is_closed_form());
        assert!(AnswerForm::YesNo.is_closed_form());
        assert!(AnswerForm::FillInBlank.is_closed_form());
    }

    #[test]
    fn every_vibe_has_resonance_vocabulary() {
        for vibe in [
            QuestionVibe::Warm,
            QuestionVibe::Playful,
            QuestionVibe::Deep,
            QuestionVibe::Edgy,
            QuestionVibe::Connector,
        ] {
            assert_eq!(vibe.resonance_words().len(), 4);
        }
    }
}
