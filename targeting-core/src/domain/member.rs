use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::edge::MemberId;

/// Membership lifecycle flag. Members are never hard-deleted; lapsed and
/// cancelled members simply stop being eligible targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Free,
    Active,
    Cancelled,
    Expired,
}

impl MembershipStatus {
    pub fn is_targetable(&self) -> bool {
        !matches!(self, MembershipStatus::Cancelled | MembershipStatus::Expired)
    }
}

/// Profile fields a question can be targeted at for gap-filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Bio,
    Role,
    Company,
    Location,
    Website,
    Skills,
    Interests,
    PromptResponses,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Bio => "bio",
            ProfileField::Role => "role",
            ProfileField::Company => "company",
            ProfileField::Location => "location",
            ProfileField::Website => "website",
            ProfileField::Skills => "skills",
            ProfileField::Interests => "interests",
            ProfileField::PromptResponses => "prompt_responses",
        }
    }
}

/// A community member's profile as supplied by the profile collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub email: String,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub prompt_responses: Vec<String>,
    pub status: MembershipStatus,
}

/// A bio shorter than this counts as a gap.
const MIN_BIO_LEN: usize = 50;
const MIN_SKILLS: usize = 3;
const MIN_INTERESTS: usize = 1;
const MIN_PROMPT_RESPONSES: usize = 1;

impl Member {
    /// Profile fields that are empty or below their minimum, in a stable
    /// order. These drive `profile_gap` scoring in the deck sequencer.
    pub fn profile_gaps(&self) -> Vec<ProfileField> {
        let mut gaps = Vec::new();
        if self.bio.as_deref().map_or(true, |b| b.len() < MIN_BIO_LEN) {
            gaps.push(ProfileField::Bio);
        }
        if self.role.is_none() {
            gaps.push(ProfileField::Role);
        }
        if self.company.is_none() {
            gaps.push(ProfileField::Company);
        }
        if self.location.is_none() {
            gaps.push(ProfileField::Location);
        }
        if self.website.is_none() {
            gaps.push(ProfileField::Website);
        }
        if self.skills.len() < MIN_SKILLS {
            gaps.push(ProfileField::Skills);
        }
        if self.interests.len() < MIN_INTERESTS {
            gaps.push(ProfileField::Interests);
        }
        if self.prompt_responses.len() < MIN_PROMPT_RESPONSES {
            gaps.push(ProfileField::PromptResponses);
        }
        gaps
    }

    pub fn skill_set(&self) -> HashSet<String> {
        lower_set(&self.skills)
    }

    pub fn interest_set(&self) -> HashSet<String> {
        lower_set(&self.interests)
    }
}

/// Case-insensitive set view of a word list, with empty entries dropped.
pub fn lower_set(items: &[String]) -> HashSet<String> {
    items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_lowercase())
        .collect()
}
