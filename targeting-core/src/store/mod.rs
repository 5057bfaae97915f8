pub mod graph;
pub mod memory;
pub mod tracker;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::{
    Member, MemberId, Pattern, Question, QuestionCategory, TasteProfile,
};

pub use graph::{GraphError, GraphStats, GraphStore, UpsertOutcome};
pub use memory::InMemoryProfileStore;
pub use tracker::{DeliveryError, DeliveryTracker};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("member {0} not found")]
    MemberNotFound(MemberId),
    #[error("question {0} not found")]
    QuestionNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read access to profiles, patterns and the question bank. The engine is
/// storage-agnostic; production wires a database-backed implementation,
/// tests use [`InMemoryProfileStore`] or a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_member(&self, id: MemberId) -> Result<Member>;

    /// All members, optionally filtered to targetable membership states.
    async fn get_members(&self, active_only: bool) -> Result<Vec<Member>>;

    async fn get_patterns(&self, active_only: bool) -> Result<Vec<Pattern>>;

    /// `None` when the member has no taste profile yet. Missing taste is a
    /// neutral scoring signal, not an error.
    async fn get_taste_profile(&self, member: MemberId) -> Result<Option<TasteProfile>>;

    async fn get_question(&self, id: i64) -> Result<Question>;

    /// Active questions eligible for `member`, excluding ones the member
    /// has already answered when `exclude_answered` is set.
    async fn get_candidate_pool(
        &self,
        member: MemberId,
        exclude_answered: bool,
    ) -> Result<Vec<Question>>;

    /// How many questions the member has answered per category.
    async fn answered_category_counts(
        &self,
        member: MemberId,
    ) -> Result<BTreeMap<QuestionCategory, u32>>;
}
