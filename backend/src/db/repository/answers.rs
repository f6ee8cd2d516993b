//! Question and rating answer queries.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{FeedbackId, QuestionId, RatingId};
use crate::db::query::{AnswersQuery, Scoped};
use crate::models::{AnswerWithFeedback, Question, QuestionOption, QuestionType, Rating};

/// Repository trait for answers and the items they answer.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// In-scope answers joined with their feedback, oldest first.
    async fn fetch_answers(
        &self,
        query: &Scoped<AnswersQuery>,
    ) -> RepositoryResult<Vec<AnswerWithFeedback>>;

    /// Number of answers to questions of `question_type` among the given feedback.
    async fn count_answers_by_type(
        &self,
        feedback_ids: &[FeedbackId],
        question_type: QuestionType,
    ) -> RepositoryResult<usize>;

    async fn fetch_question(&self, id: QuestionId) -> RepositoryResult<Option<Question>>;

    /// Options of a choice question, in display order.
    async fn fetch_question_options(
        &self,
        id: QuestionId,
    ) -> RepositoryResult<Vec<QuestionOption>>;

    async fn fetch_rating(&self, id: RatingId) -> RepositoryResult<Option<Rating>>;
}
