//! Geographic queries for heat maps.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::query::{AnswerCountriesQuery, RegionAnswersQuery, Scoped};
use crate::models::RegionAnswer;

/// Repository trait for location-aware answer queries.
#[async_trait]
pub trait GeoRepository: Send + Sync {
    /// In-scope answers of heat-map items, each with its location.
    async fn fetch_region_answers(
        &self,
        query: &Scoped<RegionAnswersQuery>,
    ) -> RepositoryResult<Vec<RegionAnswer>>;

    /// Distinct country codes of the respondents, sorted.
    async fn fetch_answer_countries(
        &self,
        query: &Scoped<AnswerCountriesQuery>,
    ) -> RepositoryResult<Vec<String>>;
}
