//! Feedback and carrier queries.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{CarrierId, FeedbackId};
use crate::db::query::{CarrierActivityQuery, CarrierViewsQuery, FeedbackQuery, Scoped};
use crate::models::{CarrierActivity, FeedbackEntry};

/// Repository trait for feedback submissions and their carriers.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; benchmark slots query concurrently.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Check if the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// In-scope feedback, ordered by creation date (oldest first).
    async fn fetch_feedback_entries(
        &self,
        query: &Scoped<FeedbackQuery>,
    ) -> RepositoryResult<Vec<FeedbackEntry>>;

    /// Feedback by id, without scope. Deleted feedback is skipped.
    async fn fetch_feedbacks_by_ids(
        &self,
        ids: &[FeedbackId],
    ) -> RepositoryResult<Vec<FeedbackEntry>>;

    async fn count_feedbacks(&self, query: &Scoped<FeedbackQuery>) -> RepositoryResult<usize>;

    /// Views of the requested carriers that have at least one in-scope feedback.
    async fn count_carrier_views(
        &self,
        query: &Scoped<CarrierViewsQuery>,
    ) -> RepositoryResult<usize>;

    /// One row per in-scope feedback with its carrier's name.
    async fn fetch_carrier_activity(
        &self,
        query: &Scoped<CarrierActivityQuery>,
    ) -> RepositoryResult<Vec<CarrierActivity>>;

    /// Names of the given carriers, in id order.
    async fn fetch_carrier_names(&self, ids: &[CarrierId]) -> RepositoryResult<Vec<String>>;
}
