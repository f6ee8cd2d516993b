//! Record store traits.
//!
//! The store contract is split by concern so implementations stay focused:
//!
//! - [`error`]: Error types for store operations
//! - [`feedback`]: Feedback submissions, carriers and their views
//! - [`answers`]: Question/rating answers and the items they answer
//! - [`activity`]: Metas, rewards and pushes around a submission
//! - [`geo`]: Location-aware answer queries for heat maps
//!
//! Every query that can see more than one feedback takes a
//! [`Scoped`](crate::db::query::Scoped) argument and must filter with its
//! predicate. Lookups by explicit id are unscoped.
//!
//! # Convenience Trait Bound
//!
//! ```ignore
//! async fn my_report<R: FullRepository>(repo: &R, scope: &ScopeFilter) -> RepositoryResult<usize> {
//!     let entries = repo.fetch_feedback_entries(&scope.scoped(FeedbackQuery::all())).await?;
//!     Ok(entries.len())
//! }
//! ```

pub mod activity;
pub mod answers;
pub mod error;
pub mod feedback;
pub mod geo;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use activity::ActivityRepository;
pub use answers::AnswerRepository;
pub use feedback::FeedbackRepository;
pub use geo::GeoRepository;

/// Composite trait bound for a complete record store.
///
/// Implemented automatically for any type implementing all four traits.
pub trait FullRepository:
    FeedbackRepository + AnswerRepository + ActivityRepository + GeoRepository
{
}

impl<T> FullRepository for T where
    T: FeedbackRepository + AnswerRepository + ActivityRepository + GeoRepository
{
}
