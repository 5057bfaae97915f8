use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::{ProfileStore, Result, StoreError};
use crate::domain::{
    Member, MemberId, Pattern, Question, QuestionCategory, TasteProfile, TasteUpdate,
};

/// DashMap-backed [`ProfileStore`]. Used by integration tests and by
/// single-process deployments that load profiles at startup.
#[derive(Default)]
pub struct InMemoryProfileStore {
    members: DashMap<MemberId, Member>,
    patterns: DashMap<i64, Pattern>,
    questions: DashMap<i64, Question>,
    answered: DashMap<MemberId, Vec<(i64, QuestionCategory)>>,
    tastes: DashMap<MemberId, TasteProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_member(&self, member: Member) {
        self.members.insert(member.id, member);
    }

    pub fn upsert_pattern(&self, pattern: Pattern) {
        self.patterns.insert(pattern.id, pattern);
    }

    pub fn upsert_question(&self, question: Question) {
        self.questions.insert(question.id, question);
    }

    /// Note that `member` answered `question_id`. Category is taken from
    /// the stored question.
    pub fn record_answer(&self, member: MemberId, question_id: i64) -> Result<()> {
        let question = self
            .questions
            .get(&question_id)
            .ok_or(StoreError::QuestionNotFound(question_id))?;
        self.answered
            .entry(member)
            .or_default()
            .push((question_id, question.category));
        Ok(())
    }

    /// Fold a taste observation into the member's profile, creating an
    /// empty profile first if none exists.
    pub fn update_taste(&self, member: MemberId, update: &TasteUpdate) -> TasteProfile {
        let now = Utc::now();
        let mut entry = self
            .tastes
            .entry(member)
            .or_insert_with(|| TasteProfile::empty(member, now));
        *entry = entry.merged(update, now);
        entry.clone()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_member(&self, id: MemberId) -> Result<Member> {
        self.members
            .get(&id)
            .map(|m| m.clone())
            .ok_or(StoreError::MemberNotFound(id))
    }

    async fn get_members(&self, active_only: bool) -> Result<Vec<Member>> {
        Ok(self
            .members
            .iter()
            .filter(|m| !active_only || m.status.is_targetable())
            .map(|m| m.clone())
            .collect())
    }

    async fn get_patterns(&self, active_only: bool) -> Result<Vec<Pattern>> {
        Ok(self
            .patterns
            .iter()
            .filter(|p| !active_only || p.is_active)
            .map(|p| p.clone())
            .collect())
    }

    async fn get_taste_profile(&self, member: MemberId) -> Result<Option<TasteProfile>> {
        Ok(self.tastes.get(&member).map(|t| t.clone()))
    }

    async fn get_question(&self, id: i64) -> Result<Question> {
        self.questions
            .get(&id)
            .map(|q| q.clone())
            .ok_or(StoreError::QuestionNotFound(id))
    }

    async fn get_candidate_pool(
        &self,
        member: MemberId,
        exclude_answered: bool,
    ) -> Result<Vec<Question>> {
        let answered: Vec<i64> = if exclude_answered {
            self.answered
                .get(&member)
                .map(|list| list.iter().map(|(id, _)| *id).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(self
            .questions
            .iter()
            .filter(|q| q.is_active && !answered.contains(&q.id))
            .map(|q| q.clone())
            .collect())
    }

    async fn answered_category_counts(
        &self,
        member: MemberId,
    ) -> Result<BTreeMap<QuestionCategory, u32>> {
        let mut counts = BTreeMap::new();
        if let Some(list) = self.answered.get(&member) {
            for (_, category) in list.iter() {
                *counts.entry(*category).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerForm, MembershipStatus};

    fn member(id: MemberId, status: MembershipStatus) -> Member {
        Member {
            id,
            display_name: format!("m{id}"),
            email: format!("m{id}@example.com"),
            bio: None,
            role: None,
            company: None,
            location: None,
            website: None,
            skills: vec![],
            interests: vec![],
            prompt_responses: vec![],
            status,
        }
    }

    fn question(id: i64, category: QuestionCategory) -> Question {
        Question {
            id,
            text: format!("q{id}"),
            category,
            form: AnswerForm::FreeForm,
            difficulty: 1,
            vibe: None,
            relevant_member_ids: vec![],
            target_pattern_ids: vec![],
            target_profile_fields: vec![],
            target_skills: vec![],
            target_interests: vec![],
            edge_context: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn active_only_filters_lapsed_members() {
        let store = InMemoryProfileStore::new();
        store.upsert_member(member(1, MembershipStatus::Active));
        store.upsert_member(member(2, MembershipStatus::Expired));
        assert_eq!(store.get_members(true).await.unwrap().len(), 1);
        assert_eq!(store.get_members(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn candidate_pool_excludes_answered_questions() {
        let store = InMemoryProfileStore::new();
        store.upsert_question(question(1, QuestionCategory::OriginStory));
        store.upsert_question(question(2, QuestionCategory::CreativeSpark));
        store.record_answer(7, 1).unwrap();

        let pool = store.get_candidate_pool(7, true).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 2);

        let all = store.get_candidate_pool(7, false).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn answered_counts_group_by_category() {
        let store = InMemoryProfileStore::new();
        store.upsert_question(question(1, QuestionCategory::OriginStory));
        store.upsert_question(question(2, QuestionCategory::OriginStory));
        store.upsert_question(question(3, QuestionCategory::HiddenDepths));
        for q in [1, 2, 3] {
            store.record_answer(7, q).unwrap();
        }
        let counts = store.answered_category_counts(7).await.unwrap();
        assert_eq!(counts[&QuestionCategory::OriginStory], 2);
        assert_eq!(counts[&QuestionCategory::HiddenDepths], 1);
    }

    #[tokio::test]
    async fn taste_updates_accumulate() {
        let store = InMemoryProfileStore::new();
        assert!(store.get_taste_profile(7).await.unwrap().is_none());
        store.update_taste(
            7,
            &TasteUpdate {
                vibe_words: vec!["cozy".into()],
                ..Default::default()
            },
        );
        store.update_taste(
            7,
            &TasteUpdate {
                vibe_words: vec!["weird".into()],
                ..Default::default()
            },
        );
        let taste = store.get_taste_profile(7).await.unwrap().unwrap();
        assert_eq!(taste.vibe_words, vec!["cozy", "weird"]);
    }
}
