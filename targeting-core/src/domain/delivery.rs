use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::edge::MemberId;
use crate::services::scoring::ScoreBreakdown;

/// Where an assigned question is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    MobileSwipe,
    ClubhouseDisplay,
    Email,
    Sms,
    WebChat,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::MobileSwipe => "mobile_swipe",
            DeliveryChannel::ClubhouseDisplay => "clubhouse_display",
            DeliveryChannel::Email => "email",
            DeliveryChannel::Sms => "sms",
            DeliveryChannel::WebChat => "web_chat",
        }
    }
}

/// Lifecycle of an assignment. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Viewed,
    Answered,
    Skipped,
    Expired,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Answered | DeliveryStatus::Skipped | DeliveryStatus::Expired
        )
    }

    /// Allowed forward transitions. Skipping straight from `Delivered` is
    /// not a thing: a skip implies the member saw the question.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Pending, Delivered)
                | (Pending, Expired)
                | (Delivered, Viewed)
                | (Delivered, Answered)
                | (Delivered, Expired)
                | (Viewed, Answered)
                | (Viewed, Skipped)
                | (Viewed, Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Viewed => "viewed",
            DeliveryStatus::Answered => "answered",
            DeliveryStatus::Skipped => "skipped",
            DeliveryStatus::Expired => "expired",
        }
    }
}

/// How the selection step chose the question that got assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Highest,
    #[serde(rename = "top_5_random")]
    TopFiveRandom,
    Wildcard,
    HighestFallback,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Highest => "highest",
            SelectionMethod::TopFiveRandom => "top_5_random",
            SelectionMethod::Wildcard => "wildcard",
            SelectionMethod::HighestFallback => "highest_fallback",
        }
    }
}

/// Snapshot of why a question was assigned, kept with the assignment so
/// decisions stay explainable after the fact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetingContext {
    pub relevance_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_method: Option<SelectionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One question put in front of one member on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub question_id: i64,
    pub member_id: MemberId,
    pub channel: DeliveryChannel,
    pub status: DeliveryStatus,
    pub context: TargetingContext,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_value: Option<String>,
    /// Seconds from delivery to response, when both timestamps exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeliveryStatus::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(Pending.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Viewed));
        assert!(Delivered.can_transition_to(Answered));
        assert!(Viewed.can_transition_to(Answered));
        assert!(Viewed.can_transition_to(Skipped));
        for from in [Pending, Delivered, Viewed] {
            assert!(from.can_transition_to(Expired));
        }
    }

    #[test]
    fn backward_and_terminal_transitions_are_rejected() {
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Viewed.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Viewed));
        assert!(!Pending.can_transition_to(Answered));
        assert!(!Delivered.can_transition_to(Skipped));
        for terminal in [Answered, Skipped, Expired] {
            assert!(terminal.is_terminal());
            for next in [Pending, Delivered, Viewed, Answered, Skipped, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn selection_method_labels() {
        assert_eq!(SelectionMethod::TopFiveRandom.as_str(), "top_5_random");
        assert_eq!(SelectionMethod::HighestFallback.as_str(), "highest_fallback");
    }

    // Targeting context is persisted as JSON alongside the assignment, so
    // the wire shape is part of the contract.
    #[test]
    fn targeting_context_serializes_snake_case() {
        let context = TargetingContext {
            relevance_score: 72.5,
            selection_method: Some(SelectionMethod::TopFiveRandom),
            breakdown: None,
            reason: None,
        };
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["selection_method"], "top_5_random");
        assert_eq!(json["relevance_score"], 72.5);
        assert!(json.get("breakdown").is_none());
    }
}
