use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Assignment, DeliveryChannel, DeliveryStatus, MemberId, TargetingContext,
};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("assignment {0} not found")]
    AssignmentNotFound(Uuid),
    #[error("invalid delivery transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Tracks question assignments through their delivery lifecycle.
///
/// Assignment is idempotent per (question, member, channel): re-assigning
/// while a prior record is still live returns that record unchanged. Only
/// an expired record is considered stale enough to assign fresh.
#[derive(Default)]
pub struct DeliveryTracker {
    assignments: DashMap<Uuid, Assignment>,
    by_key: DashMap<(i64, MemberId, DeliveryChannel), Uuid>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a question to a member on a channel. Returns the existing
    /// record when one is still live for the same key.
    pub fn assign(
        &self,
        question_id: i64,
        member_id: MemberId,
        channel: DeliveryChannel,
        context: TargetingContext,
    ) -> Assignment {
        let key = (question_id, member_id, channel);
        // Entry lock on the key keeps two concurrent assigns from both
        // creating a record.
        let entry = self.by_key.entry(key);
        match entry {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let existing_id = *occupied.get();
                if let Some(existing) = self.assignments.get(&existing_id) {
                    if existing.status != DeliveryStatus::Expired {
                        return existing.clone();
                    }
                }
                let fresh = Self::new_record(question_id, member_id, channel, context);
                occupied.insert(fresh.id);
                self.assignments.insert(fresh.id, fresh.clone());
                info!(
                    assignment_id = %fresh.id,
                    question_id,
                    member_id,
                    channel = channel.as_str(),
                    "question re-assigned after expiry"
                );
                fresh
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let fresh = Self::new_record(question_id, member_id, channel, context);
                vacant.insert(fresh.id);
                self.assignments.insert(fresh.id, fresh.clone());
                info!(
                    assignment_id = %fresh.id,
                    question_id,
                    member_id,
                    channel = channel.as_str(),
                    "question assigned"
                );
                fresh
            }
        }
    }

    fn new_record(
        question_id: i64,
        member_id: MemberId,
        channel: DeliveryChannel,
        context: TargetingContext,
    ) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            question_id,
            member_id,
            channel,
            status: DeliveryStatus::Pending,
            context,
            created_at: Utc::now(),
            delivered_at: None,
            viewed_at: None,
            resolved_at: None,
            response_value: None,
            response_seconds: None,
        }
    }

    fn transition<F>(&self, id: Uuid, to: DeliveryStatus, apply: F) -> Result<Assignment>
    where
        F: FnOnce(&mut Assignment, DateTime<Utc>),
    {
        let mut assignment = self
            .assignments
            .get_mut(&id)
            .ok_or(DeliveryError::AssignmentNotFound(id))?;
        if !assignment.status.can_transition_to(to) {
            return Err(DeliveryError::InvalidTransition {
                from: assignment.status,
                to,
            });
        }
        let now = Utc::now();
        assignment.status = to;
        apply(&mut assignment, now);
        debug!(assignment_id = %id, status = to.as_str(), "delivery transition");
        Ok(assignment.clone())
    }

    pub fn mark_delivered(&self, id: Uuid) -> Result<Assignment> {
        self.transition(id, DeliveryStatus::Delivered, |a, now| {
            a.delivered_at = Some(now);
        })
    }

    pub fn mark_viewed(&self, id: Uuid) -> Result<Assignment> {
        self.transition(id, DeliveryStatus::Viewed, |a, now| {
            a.viewed_at = Some(now);
        })
    }

    /// Record the member's response. `Some` answers the question, `None`
    /// is an explicit skip, which is only valid once the question was
    /// actually viewed.
    pub fn record_response(&self, id: Uuid, response: Option<String>) -> Result<Assignment> {
        let to = if response.is_some() {
            DeliveryStatus::Answered
        } else {
            DeliveryStatus::Skipped
        };
        self.transition(id, to, |a, now| {
            a.resolved_at = Some(now);
            a.response_value = response;
            if let Some(delivered_at) = a.delivered_at {
                a.response_seconds = Some((now - delivered_at).num_seconds());
            }
        })
    }

    pub fn expire(&self, id: Uuid) -> Result<Assignment> {
        self.transition(id, DeliveryStatus::Expired, |a, now| {
            a.resolved_at = Some(now);
        })
    }

    /// When the member was last assigned anything, optionally restricted
    /// to one channel. Drives recency throttling.
    pub fn last_assignment_at(
        &self,
        member: MemberId,
        channel: Option<DeliveryChannel>,
    ) -> Option<DateTime<Utc>> {
        self.assignments
            .iter()
            .filter(|a| a.member_id == member)
            .filter(|a| channel.map_or(true, |c| a.channel == c))
            .map(|a| a.created_at)
            .max()
    }

    /// Current statuses of every assignment of `question` to `member`,
    /// across channels.
    pub fn statuses_for(&self, question_id: i64, member: MemberId) -> Vec<DeliveryStatus> {
        self.assignments
            .iter()
            .filter(|a| a.question_id == question_id && a.member_id == member)
            .map(|a| a.status)
            .collect()
    }

    /// Every assignment ever made to `member`, newest first.
    pub fn history(&self, member: MemberId) -> Vec<Assignment> {
        let mut records: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.member_id == member)
            .map(|a| a.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn get(&self, id: Uuid) -> Option<Assignment> {
        self.assignments.get(&id).map(|a| a.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> DeliveryTracker {
        DeliveryTracker::new()
    }

    #[test]
    fn assign_is_idempotent_per_key() {
        let t = tracker();
        let first = t.assign(1, 10, DeliveryChannel::MobileSwipe, TargetingContext::default());
        let second = t.assign(1, 10, DeliveryChannel::MobileSwipe, TargetingContext::default());
        assert_eq!(first.id, second.id);
        // A different channel is a different assignment.
        let email = t.assign(1, 10, DeliveryChannel::Email, TargetingContext::default());
        assert_ne!(first.id, email.id);
    }

    #[test]
    fn expired_assignment_is_stale_and_replaced() {
        let t = tracker();
        let first = t.assign(1, 10, DeliveryChannel::Email, TargetingContext::default());
        t.expire(first.id).unwrap();
        let second = t.assign(1, 10, DeliveryChannel::Email, TargetingContext::default());
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, DeliveryStatus::Pending);
    }

    #[test]
    fn happy_path_records_timestamps_and_latency() {
        let t = tracker();
        let a = t.assign(1, 10, DeliveryChannel::WebChat, TargetingContext::default());
        let a = t.mark_delivered(a.id).unwrap();
        assert!(a.delivered_at.is_some());
        let a = t.mark_viewed(a.id).unwrap();
        assert!(a.viewed_at.is_some());
        let a = t.record_response(a.id, Some("jazz nights".into())).unwrap();
        assert_eq!(a.status, DeliveryStatus::Answered);
        assert_eq!(a.response_value.as_deref(), Some("jazz nights"));
        assert!(a.response_seconds.is_some());
    }

    #[test]
    fn skip_requires_viewed() {
        let t = tracker();
        let a = t.assign(1, 10, DeliveryChannel::MobileSwipe, TargetingContext::default());
        t.mark_delivered(a.id).unwrap();
        let err = t.record_response(a.id, None).unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::InvalidTransition {
                from: DeliveryStatus::Delivered,
                to: DeliveryStatus::Skipped,
            }
        ));
        t.mark_viewed(a.id).unwrap();
        let a = t.record_response(a.id, None).unwrap();
        assert_eq!(a.status, DeliveryStatus::Skipped);
    }

    #[test]
    fn answers_are_final() {
        let t = tracker();
        let a = t.assign(1, 10, DeliveryChannel::Email, TargetingContext::default());
        t.mark_delivered(a.id).unwrap();
        t.record_response(a.id, Some("yes".into())).unwrap();
        assert!(t.mark_viewed(a.id).is_err());
        assert!(t.expire(a.id).is_err());
    }

    #[test]
    fn unknown_assignment_is_reported() {
        let t = tracker();
        let missing = Uuid::new_v4();
        assert!(matches!(
            t.mark_delivered(missing),
            Err(DeliveryError::AssignmentNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn last_assignment_honors_channel_filter() {
        let t = tracker();
        t.assign(1, 10, DeliveryChannel::Email, TargetingContext::default());
        assert!(t.last_assignment_at(10, None).is_some());
        assert!(t.last_assignment_at(10, Some(DeliveryChannel::Email)).is_some());
        assert!(t.last_assignment_at(10, Some(DeliveryChannel::Sms)).is_none());
        assert!(t.last_assignment_at(99, None).is_none());
    }
}
