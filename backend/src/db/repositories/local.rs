//! In-memory local repository implementation.
//!
//! Stores everything in plain maps and vectors behind one lock. Suitable for
//! unit tests and local development: fast, deterministic and isolated. Scope
//! composition goes through [`ScopePredicate::admits`] exactly as a real store
//! would apply its joins.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::api::*;
use crate::db::query::*;
use crate::db::repository::*;
use crate::models::*;

/// In-memory record store.
///
/// # Example
/// ```
/// use feedback_reports::api::{TeamId, UserId};
/// use feedback_reports::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// let carrier = repo.add_carrier(TeamId::new(1), "Checkout survey", UserId::new(1));
/// assert_eq!(repo.carrier_count(), 1);
/// # let _ = carrier;
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    queries: Arc<AtomicUsize>,
}

/// Match sets of a compiled filter expression.
#[derive(Debug, Clone, Default)]
struct ExpressionMatches {
    feedback_ids: HashSet<FeedbackId>,
    push_ids: HashSet<PushId>,
}

struct StoredFeedback {
    entry: FeedbackEntry,
    deleted: bool,
}

struct LocalData {
    carriers: BTreeMap<CarrierId, Carrier>,
    feedbacks: BTreeMap<FeedbackId, StoredFeedback>,
    owners: HashMap<FeedbackId, Vec<UserId>>,
    questions: BTreeMap<QuestionId, Question>,
    options: Vec<QuestionOption>,
    ratings: BTreeMap<RatingId, Rating>,
    answers: Vec<Answer>,
    rating_answers: Vec<RatingAnswer>,
    metas: Vec<FeedbackMeta>,
    rewards: Vec<RewardTransaction>,
    pushes: Vec<PushEvent>,
    views: HashMap<CarrierId, usize>,
    expressions: HashMap<FilterExpressionId, ExpressionMatches>,
    city_regions: HashMap<String, String>,
    next_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            carriers: BTreeMap::new(),
            feedbacks: BTreeMap::new(),
            owners: HashMap::new(),
            questions: BTreeMap::new(),
            options: Vec::new(),
            ratings: BTreeMap::new(),
            answers: Vec::new(),
            rating_answers: Vec::new(),
            metas: Vec::new(),
            rewards: Vec::new(),
            pushes: Vec::new(),
            views: HashMap::new(),
            expressions: HashMap::new(),
            city_regions: HashMap::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ownership<'a>(&'a self, carrier_id: CarrierId, owners: &'a [UserId]) -> Option<RecordOwnership<'a>> {
        self.carriers.get(&carrier_id).map(|carrier| RecordOwnership {
            team_id: carrier.team_id,
            carrier_id,
            carrier_creator: carrier.creator_id,
            owners,
        })
    }

    /// The feedback, if it exists, is not deleted and passes the scope.
    fn visible_feedback(&self, predicate: &ScopePredicate, id: FeedbackId) -> Option<&FeedbackEntry> {
        let stored = self.feedbacks.get(&id).filter(|f| !f.deleted)?;
        let owners = self.owners.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        let ownership = self.ownership(stored.entry.carrier_id, owners)?;
        let admitted = predicate.admits(&ownership, |expression| {
            self.expressions
                .get(expression)
                .is_some_and(|m| m.feedback_ids.contains(&id))
        });
        admitted.then_some(&stored.entry)
    }

    fn live_feedback(&self, id: FeedbackId) -> Option<&FeedbackEntry> {
        self.feedbacks
            .get(&id)
            .filter(|f| !f.deleted)
            .map(|f| &f.entry)
    }

    fn first_meta(&self, feedback_id: FeedbackId, name: MetaName) -> Option<&str> {
        self.metas
            .iter()
            .find(|m| m.feedback_id == feedback_id && m.name == name)
            .map(|m| m.value.as_str())
    }

    /// Visible answers of heat-map items as `(feedback, value)` pairs.
    fn item_answers(&self, predicate: &ScopePredicate, item: &HeatMapItem) -> Vec<(FeedbackId, String)> {
        match item {
            HeatMapItem::Questions(ids) => self
                .answers
                .iter()
                .filter(|a| ids.contains(&a.question_id))
                .filter(|a| self.visible_feedback(predicate, a.feedback_id).is_some())
                .map(|a| (a.feedback_id, a.value.clone()))
                .collect(),
            HeatMapItem::Ratings(ids) => self
                .rating_answers
                .iter()
                .filter(|a| ids.contains(&a.rating_id))
                .filter(|a| self.visible_feedback(predicate, a.feedback_id).is_some())
                .map(|a| (a.feedback_id, a.value.to_string()))
                .collect(),
        }
    }
}

fn in_carriers(filter: &Option<BTreeSet<CarrierId>>, carrier_id: CarrierId) -> bool {
    filter.as_ref().map_or(true, |ids| ids.contains(&carrier_id))
}

/// Empty selections mean "every carrier".
fn in_selection(selection: &BTreeSet<CarrierId>, carrier_id: CarrierId) -> bool {
    selection.is_empty() || selection.contains(&carrier_id)
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Seeding helpers ====================

    pub fn add_carrier(&self, team_id: TeamId, name: &str, creator_id: UserId) -> CarrierId {
        let mut data = self.data.write();
        let id = CarrierId::new(data.next_id());
        data.carriers.insert(
            id,
            Carrier {
                id,
                team_id,
                name: name.to_string(),
                creator_id,
            },
        );
        id
    }

    pub fn add_feedback(
        &self,
        carrier_id: CarrierId,
        satisfaction_ratio: Option<f64>,
        completed: bool,
        created_at: NaiveDateTime,
    ) -> FeedbackId {
        let mut data = self.data.write();
        let id = FeedbackId::new(data.next_id());
        data.feedbacks.insert(
            id,
            StoredFeedback {
                entry: FeedbackEntry {
                    id,
                    carrier_id,
                    satisfaction_ratio,
                    completed,
                    created_at,
                },
                deleted: false,
            },
        );
        id
    }

    /// Soft-delete a feedback; it disappears from every query.
    pub fn delete_feedback(&self, id: FeedbackId) {
        if let Some(stored) = self.data.write().feedbacks.get_mut(&id) {
            stored.deleted = true;
        }
    }

    pub fn add_owner(&self, feedback_id: FeedbackId, user_id: UserId) {
        self.data
            .write()
            .owners
            .entry(feedback_id)
            .or_default()
            .push(user_id);
    }

    pub fn add_question(
        &self,
        carrier_id: CarrierId,
        question_type: QuestionType,
        label: &str,
    ) -> QuestionId {
        let mut data = self.data.write();
        let id = QuestionId::new(data.next_id());
        data.questions.insert(
            id,
            Question {
                id,
                carrier_id,
                question_type,
                label: label.to_string(),
            },
        );
        id
    }

    pub fn add_option(&self, question_id: QuestionId, name: &str, url: Option<&str>) -> OptionId {
        let mut data = self.data.write();
        let id = OptionId::new(data.next_id());
        data.options.push(QuestionOption {
            id,
            question_id,
            name: name.to_string(),
            url: url.map(str::to_string),
        });
        id
    }

    pub fn add_rating(&self, carrier_id: CarrierId, label: &str) -> RatingId {
        let mut data = self.data.write();
        let id = RatingId::new(data.next_id());
        data.ratings.insert(
            id,
            Rating {
                id,
                carrier_id,
                label: label.to_string(),
            },
        );
        id
    }

    /// Add an answer dated like its feedback.
    pub fn add_answer(&self, feedback_id: FeedbackId, question_id: QuestionId, value: &str) -> AnswerId {
        self.insert_answer(feedback_id, question_id, value, None)
    }

    pub fn add_answer_with_sentiment(
        &self,
        feedback_id: FeedbackId,
        question_id: QuestionId,
        value: &str,
        sentiment_score: f64,
    ) -> AnswerId {
        self.insert_answer(feedback_id, question_id, value, Some(sentiment_score))
    }

    fn insert_answer(
        &self,
        feedback_id: FeedbackId,
        question_id: QuestionId,
        value: &str,
        sentiment_score: Option<f64>,
    ) -> AnswerId {
        let mut data = self.data.write();
        let id = AnswerId::new(data.next_id());
        let created_at = data
            .feedbacks
            .get(&feedback_id)
            .map(|f| f.entry.created_at)
            .unwrap_or_default();
        data.answers.push(Answer {
            id,
            feedback_id,
            question_id,
            value: value.to_string(),
            sentiment_score,
            created_at,
        });
        id
    }

    pub fn add_rating_answer(&self, feedback_id: FeedbackId, rating_id: RatingId, value: f64) {
        self.data.write().rating_answers.push(RatingAnswer {
            feedback_id,
            rating_id,
            value,
        });
    }

    pub fn add_meta(&self, feedback_id: FeedbackId, name: MetaName, value: &str) {
        self.data.write().metas.push(FeedbackMeta {
            feedback_id,
            name,
            value: value.to_string(),
        });
    }

    pub fn add_reward_transaction(&self, feedback_id: FeedbackId, reward_id: RewardId, status: RewardStatus) {
        self.data.write().rewards.push(RewardTransaction {
            feedback_id,
            reward_id,
            status,
        });
    }

    pub fn add_push(&self, carrier_id: CarrierId, status: PushStatus, created_at: NaiveDateTime) -> PushId {
        let mut data = self.data.write();
        let id = PushId::new(data.next_id());
        data.pushes.push(PushEvent {
            id,
            carrier_id,
            status,
            created_at,
        });
        id
    }

    pub fn add_views(&self, carrier_id: CarrierId, count: usize) {
        *self.data.write().views.entry(carrier_id).or_default() += count;
    }

    /// Register a compiled filter expression and the feedback it matches.
    pub fn define_expression<I>(&self, expression: &FilterExpressionId, feedback_ids: I)
    where
        I: IntoIterator<Item = FeedbackId>,
    {
        self.data
            .write()
            .expressions
            .entry(expression.clone())
            .or_default()
            .feedback_ids
            .extend(feedback_ids);
    }

    /// Add pushes to a filter expression's match set.
    pub fn add_pushes_to_expression<I>(&self, expression: &FilterExpressionId, push_ids: I)
    where
        I: IntoIterator<Item = PushId>,
    {
        self.data
            .write()
            .expressions
            .entry(expression.clone())
            .or_default()
            .push_ids
            .extend(push_ids);
    }

    /// Map a city to the region heat maps group it under.
    pub fn map_city(&self, city: &str, region: &str) {
        self.data
            .write()
            .city_regions
            .insert(city.to_string(), region.to_string());
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data, keeping the health status.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
        self.queries.store(0, Ordering::SeqCst);
    }

    pub fn carrier_count(&self) -> usize {
        self.data.read().carriers.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.data.read().feedbacks.len()
    }

    /// Number of trait queries served since creation or the last reset.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn reset_query_count(&self) {
        self.queries.store(0, Ordering::SeqCst);
    }

    /// Count the query and fail when the store is marked unhealthy.
    fn begin(&self, operation: &str) -> RepositoryResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection(operation, "Record store is not healthy"));
        }
        Ok(())
    }

    /// [`begin`](Self::begin), then reject filter expressions never defined.
    fn begin_scoped<Q>(&self, operation: &str, query: &Scoped<Q>) -> RepositoryResult<()> {
        self.begin(operation)?;
        match query.predicate().filter_expression() {
            Some(expression) if !self.data.read().expressions.contains_key(expression) => {
                Err(RepositoryError::unknown_expression(operation, expression))
            }
            _ => Ok(()),
        }
    }
}

// ==================== Feedback Repository ====================

#[async_trait]
impl FeedbackRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn fetch_feedback_entries(
        &self,
        query: &Scoped<FeedbackQuery>,
    ) -> RepositoryResult<Vec<FeedbackEntry>> {
        self.begin_scoped("fetch_feedback_entries", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        let mut entries: Vec<FeedbackEntry> = data
            .feedbacks
            .keys()
            .filter_map(|id| data.visible_feedback(predicate, *id))
            .filter(|f| in_carriers(&query.query().carrier_ids, f.carrier_id))
            .cloned()
            .collect();
        entries.sort_by_key(|f| (f.created_at, f.id));
        Ok(entries)
    }

    async fn fetch_feedbacks_by_ids(
        &self,
        ids: &[FeedbackId],
    ) -> RepositoryResult<Vec<FeedbackEntry>> {
        self.begin("fetch_feedbacks_by_ids")?;
        let data = self.data.read();
        let unique: BTreeSet<FeedbackId> = ids.iter().copied().collect();

        let mut entries: Vec<FeedbackEntry> = unique
            .into_iter()
            .filter_map(|id| data.live_feedback(id).cloned())
            .collect();
        entries.sort_by_key(|f| (f.created_at, f.id));
        Ok(entries)
    }

    async fn count_feedbacks(&self, query: &Scoped<FeedbackQuery>) -> RepositoryResult<usize> {
        self.begin_scoped("count_feedbacks", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        Ok(data
            .feedbacks
            .keys()
            .filter_map(|id| data.visible_feedback(predicate, *id))
            .filter(|f| in_carriers(&query.query().carrier_ids, f.carrier_id))
            .count())
    }

    async fn count_carrier_views(
        &self,
        query: &Scoped<CarrierViewsQuery>,
    ) -> RepositoryResult<usize> {
        self.begin_scoped("count_carrier_views", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        let active: BTreeSet<CarrierId> = data
            .feedbacks
            .keys()
            .filter_map(|id| data.visible_feedback(predicate, *id))
            .map(|f| f.carrier_id)
            .filter(|c| in_selection(&query.query().carrier_ids, *c))
            .collect();

        Ok(active
            .iter()
            .map(|c| data.views.get(c).copied().unwrap_or(0))
            .sum())
    }

    async fn fetch_carrier_activity(
        &self,
        query: &Scoped<CarrierActivityQuery>,
    ) -> RepositoryResult<Vec<CarrierActivity>> {
        self.begin_scoped("fetch_carrier_activity", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        let mut rows: Vec<CarrierActivity> = data
            .feedbacks
            .keys()
            .filter_map(|id| data.visible_feedback(predicate, *id))
            .filter(|f| in_carriers(&query.query().carrier_ids, f.carrier_id))
            .filter_map(|f| {
                data.carriers.get(&f.carrier_id).map(|c| CarrierActivity {
                    carrier_id: c.id,
                    carrier_name: c.name.clone(),
                    feedback_created_at: f.created_at,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.feedback_created_at);
        Ok(rows)
    }

    async fn fetch_carrier_names(&self, ids: &[CarrierId]) -> RepositoryResult<Vec<String>> {
        self.begin("fetch_carrier_names")?;
        let data = self.data.read();
        let unique: BTreeSet<CarrierId> = ids.iter().copied().collect();

        Ok(unique
            .iter()
            .filter_map(|id| data.carriers.get(id).map(|c| c.name.clone()))
            .collect())
    }
}

// ==================== Answer Repository ====================

#[async_trait]
impl AnswerRepository for LocalRepository {
    async fn fetch_answers(
        &self,
        query: &Scoped<AnswersQuery>,
    ) -> RepositoryResult<Vec<AnswerWithFeedback>> {
        self.begin_scoped("fetch_answers", query)?;
        let data = self.data.read();
        let predicate = query.predicate();
        let filter = query.query();

        let mut rows: Vec<AnswerWithFeedback> = data
            .answers
            .iter()
            .filter_map(|answer| {
                let question = data.questions.get(&answer.question_id)?;
                if !filter.matches(
                    question.id,
                    question.question_type,
                    question.carrier_id,
                    &answer.value,
                    answer.sentiment_score,
                    answer.created_at,
                ) {
                    return None;
                }
                let feedback = data.visible_feedback(predicate, answer.feedback_id)?;
                let carrier = data.carriers.get(&feedback.carrier_id)?;
                Some(AnswerWithFeedback {
                    answer: answer.clone(),
                    question_type: question.question_type,
                    carrier_id: carrier.id,
                    carrier_name: carrier.name.clone(),
                    satisfaction_ratio: feedback.satisfaction_ratio,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.answer.created_at, r.answer.id));
        Ok(rows)
    }

    async fn count_answers_by_type(
        &self,
        feedback_ids: &[FeedbackId],
        question_type: QuestionType,
    ) -> RepositoryResult<usize> {
        self.begin("count_answers_by_type")?;
        let data = self.data.read();
        let ids: HashSet<FeedbackId> = feedback_ids.iter().copied().collect();

        Ok(data
            .answers
            .iter()
            .filter(|a| ids.contains(&a.feedback_id))
            .filter(|a| data.live_feedback(a.feedback_id).is_some())
            .filter(|a| {
                data.questions
                    .get(&a.question_id)
                    .is_some_and(|q| q.question_type == question_type)
            })
            .count())
    }

    async fn fetch_question(&self, id: QuestionId) -> RepositoryResult<Option<Question>> {
        self.begin("fetch_question")?;
        Ok(self.data.read().questions.get(&id).cloned())
    }

    async fn fetch_question_options(
        &self,
        id: QuestionId,
    ) -> RepositoryResult<Vec<QuestionOption>> {
        self.begin("fetch_question_options")?;
        Ok(self
            .data
            .read()
            .options
            .iter()
            .filter(|o| o.question_id == id)
            .cloned()
            .collect())
    }

    async fn fetch_rating(&self, id: RatingId) -> RepositoryResult<Option<Rating>> {
        self.begin("fetch_rating")?;
        Ok(self.data.read().ratings.get(&id).cloned())
    }
}

// ==================== Activity Repository ====================

#[async_trait]
impl ActivityRepository for LocalRepository {
    async fn fetch_metas(&self, query: &Scoped<MetaQuery>) -> RepositoryResult<Vec<MetaEntry>> {
        self.begin_scoped("fetch_metas", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        let mut rows: Vec<MetaEntry> = data
            .metas
            .iter()
            .filter(|m| query.query().names.contains(&m.name))
            .filter_map(|m| {
                data.visible_feedback(predicate, m.feedback_id)
                    .map(|f| MetaEntry {
                        feedback_id: m.feedback_id,
                        name: m.name,
                        value: m.value.clone(),
                        feedback_created_at: f.created_at,
                    })
            })
            .collect();
        rows.sort_by_key(|m| (m.feedback_created_at, m.feedback_id));
        Ok(rows)
    }

    async fn fetch_metas_for_feedbacks(
        &self,
        feedback_ids: &[FeedbackId],
        name: MetaName,
    ) -> RepositoryResult<Vec<MetaEntry>> {
        self.begin("fetch_metas_for_feedbacks")?;
        let data = self.data.read();
        let ids: HashSet<FeedbackId> = feedback_ids.iter().copied().collect();

        Ok(data
            .metas
            .iter()
            .filter(|m| m.name == name && ids.contains(&m.feedback_id))
            .filter_map(|m| {
                data.live_feedback(m.feedback_id).map(|f| MetaEntry {
                    feedback_id: m.feedback_id,
                    name: m.name,
                    value: m.value.clone(),
                    feedback_created_at: f.created_at,
                })
            })
            .collect())
    }

    async fn fetch_reward_transactions(
        &self,
        query: &Scoped<RewardQuery>,
    ) -> RepositoryResult<Vec<RewardEntry>> {
        self.begin_scoped("fetch_reward_transactions", query)?;
        let data = self.data.read();
        let predicate = query.predicate();

        Ok(data
            .rewards
            .iter()
            .filter(|r| query.query().status.map_or(true, |s| r.status == s))
            .filter_map(|r| {
                data.visible_feedback(predicate, r.feedback_id)
                    .map(|f| RewardEntry {
                        transaction: r.clone(),
                        feedback_created_at: f.created_at,
                    })
            })
            .collect())
    }

    async fn count_reward_transactions(
        &self,
        feedback_ids: &[FeedbackId],
    ) -> RepositoryResult<usize> {
        self.begin("count_reward_transactions")?;
        let data = self.data.read();
        let ids: HashSet<FeedbackId> = feedback_ids.iter().copied().collect();
        Ok(data
            .rewards
            .iter()
            .filter(|r| ids.contains(&r.feedback_id))
            .count())
    }

    async fn fetch_push_events(
        &self,
        query: &Scoped<PushQuery>,
    ) -> RepositoryResult<Vec<PushEvent>> {
        self.begin_scoped("fetch_push_events", query)?;
        let data = self.data.read();
        let predicate = query.predicate();
        let filter = query.query();

        let mut pushes: Vec<PushEvent> = data
            .pushes
            .iter()
            .filter(|p| p.status != PushStatus::Scheduled)
            .filter(|p| !filter.clicked_only || p.status == PushStatus::Clicked)
            .filter(|p| in_selection(&filter.carrier_ids, p.carrier_id))
            .filter(|p| {
                data.ownership(p.carrier_id, &[]).is_some_and(|ownership| {
                    predicate.admits(&ownership, |expression| {
                        data.expressions
                            .get(expression)
                            .is_some_and(|m| m.push_ids.contains(&p.id))
                    })
                })
            })
            .cloned()
            .collect();
        pushes.sort_by_key(|p| p.id);
        Ok(pushes)
    }
}

// ==================== Geo Repository ====================

#[async_trait]
impl GeoRepository for LocalRepository {
    async fn fetch_region_answers(
        &self,
        query: &Scoped<RegionAnswersQuery>,
    ) -> RepositoryResult<Vec<RegionAnswer>> {
        self.begin_scoped("fetch_region_answers", query)?;
        let data = self.data.read();
        let filter = query.query();

        Ok(data
            .item_answers(query.predicate(), &filter.item)
            .into_iter()
            .filter_map(|(feedback_id, value)| {
                let location = match filter.grouping {
                    RegionGrouping::CityRegion => {
                        let city = data.first_meta(feedback_id, MetaName::City)?;
                        data.city_regions.get(city)?.clone()
                    }
                    RegionGrouping::Country => {
                        data.first_meta(feedback_id, MetaName::CountryCode)?.to_string()
                    }
                };
                Some(RegionAnswer {
                    feedback_id,
                    location,
                    value,
                })
            })
            .collect())
    }

    async fn fetch_answer_countries(
        &self,
        query: &Scoped<AnswerCountriesQuery>,
    ) -> RepositoryResult<Vec<String>> {
        self.begin_scoped("fetch_answer_countries", query)?;
        let data = self.data.read();

        let countries: BTreeSet<String> = data
            .item_answers(query.predicate(), &query.query().item)
            .into_iter()
            .filter_map(|(feedback_id, _)| {
                data.first_meta(feedback_id, MetaName::CountryCode)
                    .map(str::to_string)
            })
            .collect();
        Ok(countries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_unhealthy_store_fails_queries() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        let scope = ScopeFilter::builder(TeamId::new(1)).build();

        let err = repo
            .fetch_feedback_entries(&scope.scoped(FeedbackQuery::all()))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.context().operation, "fetch_feedback_entries");
        assert!(!repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_feedback_entries_ordered_and_scoped() {
        let repo = LocalRepository::new();
        let team = TeamId::new(1);
        let carrier = repo.add_carrier(team, "Survey", UserId::new(1));
        let other = repo.add_carrier(TeamId::new(2), "Elsewhere", UserId::new(1));
        let late = repo.add_feedback(carrier, Some(50.0), true, at(9));
        let early = repo.add_feedback(carrier, None, false, at(2));
        repo.add_feedback(other, None, false, at(3));
        let deleted = repo.add_feedback(carrier, None, false, at(4));
        repo.delete_feedback(deleted);

        let scope = ScopeFilter::builder(team).build();
        let entries = repo
            .fetch_feedback_entries(&scope.scoped(FeedbackQuery::all()))
            .await
            .unwrap();
        let ids: Vec<FeedbackId> = entries.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(repo.query_count(), 1);
    }

    #[tokio::test]
    async fn test_expression_match_set() {
        let repo = LocalRepository::new();
        let team = TeamId::new(1);
        let carrier = repo.add_carrier(team, "Survey", UserId::new(1));
        let a = repo.add_feedback(carrier, None, false, at(1));
        repo.add_feedback(carrier, None, false, at(2));
        let expression = FilterExpressionId::new("only-a");
        repo.define_expression(&expression, [a]);

        let scope = ScopeFilter::builder(team)
            .filter_expression(Some(expression))
            .build();
        let count = repo
            .count_feedbacks(&scope.scoped(FeedbackQuery::all()))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let unknown = scope.with_filter_expression(Some(FilterExpressionId::new("nope")));
        let err = repo
            .count_feedbacks(&unknown.scoped(FeedbackQuery::all()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnknownExpression { ref expression, .. } if expression.as_str() == "nope"
        ));
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_views_only_for_carriers_with_feedback() {
        let repo = LocalRepository::new();
        let team = TeamId::new(1);
        let busy = repo.add_carrier(team, "Busy", UserId::new(1));
        let idle = repo.add_carrier(team, "Idle", UserId::new(1));
        repo.add_feedback(busy, None, false, at(1));
        repo.add_views(busy, 10);
        repo.add_views(idle, 50);

        let scope = ScopeFilter::builder(team).carrier_ids([busy, idle]).build();
        let views = repo
            .count_carrier_views(&scope.scoped(CarrierViewsQuery {
                carrier_ids: scope.carrier_ids().clone(),
            }))
            .await
            .unwrap();
        assert_eq!(views, 10);
    }

    #[tokio::test]
    async fn test_region_answers_skip_unmapped_cities() {
        let repo = LocalRepository::new();
        let team = TeamId::new(1);
        let carrier = repo.add_carrier(team, "Survey", UserId::new(1));
        let question = repo.add_question(carrier, QuestionType::Slider, "How much?");
        let lyon = repo.add_feedback(carrier, None, false, at(1));
        let nowhere = repo.add_feedback(carrier, None, false, at(1));
        repo.add_meta(lyon, MetaName::City, "Lyon");
        repo.add_meta(nowhere, MetaName::City, "Atlantis");
        repo.map_city("Lyon", "Auvergne-Rhône-Alpes");
        repo.add_answer(lyon, question, "7");
        repo.add_answer(nowhere, question, "3");

        let scope = ScopeFilter::builder(team).build();
        let rows = repo
            .fetch_region_answers(&scope.scoped(RegionAnswersQuery {
                item: HeatMapItem::Questions(vec![question]),
                grouping: RegionGrouping::CityRegion,
            }))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "Auvergne-Rhône-Alpes");
        assert_eq!(rows[0].numeric_value(), Some(7.0));
    }

    #[tokio::test]
    async fn test_pushes_exclude_scheduled() {
        let repo = LocalRepository::new();
        let team = TeamId::new(1);
        let carrier = repo.add_carrier(team, "Survey", UserId::new(1));
        repo.add_push(carrier, PushStatus::Scheduled, at(1));
        let sent = repo.add_push(carrier, PushStatus::Sent, at(2));
        let clicked = repo.add_push(carrier, PushStatus::Clicked, at(3));

        let scope = ScopeFilter::builder(team).carrier_ids([carrier]).build();
        let all = repo
            .fetch_push_events(&scope.scoped(PushQuery {
                carrier_ids: scope.carrier_ids().clone(),
                clicked_only: false,
            }))
            .await
            .unwrap();
        let ids: Vec<PushId> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![sent, clicked]);

        let clicks = repo
            .fetch_push_events(&scope.scoped(PushQuery {
                carrier_ids: scope.carrier_ids().clone(),
                clicked_only: true,
            }))
            .await
            .unwrap();
        assert_eq!(clicks.len(), 1);
    }
}
