//! Engagement queries: metas, rewards and pushes.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::FeedbackId;
use crate::db::query::{MetaQuery, PushQuery, RewardQuery, Scoped};
use crate::models::{MetaEntry, MetaName, PushEvent, RewardEntry};

/// Repository trait for what happens around a feedback submission.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// In-scope feedback metas with their feedback's creation date.
    async fn fetch_metas(&self, query: &Scoped<MetaQuery>) -> RepositoryResult<Vec<MetaEntry>>;

    /// Metas named `name` of the given feedback, without scope.
    async fn fetch_metas_for_feedbacks(
        &self,
        feedback_ids: &[FeedbackId],
        name: MetaName,
    ) -> RepositoryResult<Vec<MetaEntry>>;

    async fn fetch_reward_transactions(
        &self,
        query: &Scoped<RewardQuery>,
    ) -> RepositoryResult<Vec<RewardEntry>>;

    /// Reward transactions of the given feedback, whatever their status.
    async fn count_reward_transactions(
        &self,
        feedback_ids: &[FeedbackId],
    ) -> RepositoryResult<usize>;

    /// Pushes that were not left scheduled, ordered by id.
    async fn fetch_push_events(&self, query: &Scoped<PushQuery>)
        -> RepositoryResult<Vec<PushEvent>>;
}
