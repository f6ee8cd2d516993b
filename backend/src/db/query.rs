//! Scoped store queries.
//!
//! Every query the engine sends to the record store is wrapped in a
//! [`Scoped`] value that carries the request's [`ScopePredicate`]. A `Scoped`
//! can only be obtained from [`ScopeFilter::scoped`], so no query reaches the
//! store without the filter expression and the ownership restriction.
//!
//! The predicate is applied in two steps:
//! 1. the record must belong to the team and, when a filter expression is
//!    set, to the expression's match set;
//! 2. for restricted users, the record must be owned by the actor or belong
//!    to an allowed carrier the actor created.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::{CarrierId, FilterExpressionId, QuestionId, RatingId, TeamId, UserId};
use crate::models::{MetaName, QuestionType, RewardStatus, ScopeFilter};

/// Ownership columns of a record, as needed by the restriction step.
#[derive(Debug, Clone, Copy)]
pub struct RecordOwnership<'a> {
    pub team_id: TeamId,
    pub carrier_id: CarrierId,
    pub carrier_creator: UserId,
    /// Users the record is assigned to (empty for records without owners).
    pub owners: &'a [UserId],
}

/// Visibility restriction of a restricted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    /// `None` when the actor could not be resolved; nothing is visible then.
    pub actor: Option<UserId>,
    pub allowed_carriers: BTreeSet<CarrierId>,
}

impl Restriction {
    fn admits(&self, ownership: &RecordOwnership<'_>) -> bool {
        let Some(actor) = self.actor else {
            return false;
        };
        ownership.owners.contains(&actor)
            || (self.allowed_carriers.contains(&ownership.carrier_id)
                && ownership.carrier_creator == actor)
    }
}

/// The scope-composition predicate of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePredicate {
    team_id: TeamId,
    filter_expression: Option<FilterExpressionId>,
    restriction: Option<Restriction>,
}

impl ScopePredicate {
    fn from_scope(scope: &ScopeFilter) -> Self {
        let restriction = scope.is_restricted_user().then(|| Restriction {
            actor: scope.actor_id(),
            allowed_carriers: scope.carrier_ids().clone(),
        });
        Self {
            team_id: scope.team_id(),
            filter_expression: scope.filter_expression().cloned(),
            restriction,
        }
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn filter_expression(&self) -> Option<&FilterExpressionId> {
        self.filter_expression.as_ref()
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// Whether a record passes both composition steps.
    ///
    /// `in_expression` answers whether the record is in a filter expression's
    /// match set; it is only called when an expression is set.
    pub fn admits<F>(&self, ownership: &RecordOwnership<'_>, in_expression: F) -> bool
    where
        F: FnOnce(&FilterExpressionId) -> bool,
    {
        if ownership.team_id != self.team_id {
            return false;
        }
        if let Some(expression) = &self.filter_expression {
            if !in_expression(expression) {
                return false;
            }
        }
        match &self.restriction {
            Some(restriction) => restriction.admits(ownership),
            None => true,
        }
    }
}

/// A store query bound to a request scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoped<Q> {
    query: Q,
    predicate: ScopePredicate,
}

impl<Q> Scoped<Q> {
    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn predicate(&self) -> &ScopePredicate {
        &self.predicate
    }
}

impl ScopeFilter {
    /// Bind a store query to this scope.
    pub fn scoped<Q>(&self, query: Q) -> Scoped<Q> {
        Scoped {
            query,
            predicate: ScopePredicate::from_scope(self),
        }
    }
}

/// Feedback submissions, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackQuery {
    /// Only feedback of these carriers when set.
    pub carrier_ids: Option<BTreeSet<CarrierId>>,
}

impl FeedbackQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_carriers(carrier_ids: &BTreeSet<CarrierId>) -> Self {
        Self {
            carrier_ids: Some(carrier_ids.clone()),
        }
    }
}

/// Views of carriers that received in-scope feedback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierViewsQuery {
    pub carrier_ids: BTreeSet<CarrierId>,
}

/// Carrier names per in-scope feedback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierActivityQuery {
    pub carrier_ids: Option<BTreeSet<CarrierId>>,
}

/// Question answers joined with their feedback, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswersQuery {
    pub question_types: Vec<QuestionType>,
    pub question_ids: Vec<QuestionId>,
    /// Carriers the question belongs to.
    pub carrier_ids: Option<BTreeSet<CarrierId>>,
    pub non_empty: bool,
    /// Case-insensitive substring the value must contain.
    pub contains: Option<String>,
    /// Only answers that went through sentiment analysis.
    pub with_sentiment: bool,
    pub created_between: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl AnswersQuery {
    pub fn of_types(types: &[QuestionType]) -> Self {
        Self {
            question_types: types.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_sentiment() -> Self {
        Self {
            with_sentiment: true,
            ..Default::default()
        }
    }

    pub fn for_carriers(mut self, carrier_ids: &BTreeSet<CarrierId>) -> Self {
        self.carrier_ids = Some(carrier_ids.clone());
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn containing(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    /// Whether an answer row satisfies the non-scope predicates.
    pub fn matches(
        &self,
        question_id: QuestionId,
        question_type: QuestionType,
        question_carrier: CarrierId,
        value: &str,
        sentiment_score: Option<f64>,
        created_at: NaiveDateTime,
    ) -> bool {
        if !self.question_types.is_empty() && !self.question_types.contains(&question_type) {
            return false;
        }
        if !self.question_ids.is_empty() && !self.question_ids.contains(&question_id) {
            return false;
        }
        if let Some(carriers) = &self.carrier_ids {
            if !carriers.contains(&question_carrier) {
                return false;
            }
        }
        if self.non_empty && value.trim().is_empty() {
            return false;
        }
        if let Some(needle) = &self.contains {
            if !value.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.with_sentiment && sentiment_score.is_none() {
            return false;
        }
        if let Some((from, to)) = self.created_between {
            if created_at < from || created_at > to {
                return false;
            }
        }
        true
    }
}

/// Feedback metas of the given names.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaQuery {
    pub names: Vec<MetaName>,
}

impl MetaQuery {
    pub fn named(name: MetaName) -> Self {
        Self { names: vec![name] }
    }
}

/// Reward transactions of in-scope feedback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardQuery {
    pub status: Option<RewardStatus>,
}

/// Push notifications that left the scheduler, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushQuery {
    pub carrier_ids: BTreeSet<CarrierId>,
    /// Only pushes that were clicked.
    pub clicked_only: bool,
}

/// Items a heat map aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeatMapItem {
    Questions(Vec<QuestionId>),
    Ratings(Vec<RatingId>),
}

/// Geographic key answers are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionGrouping {
    /// Region of the respondent's city; answers from unmapped cities are skipped.
    CityRegion,
    /// Respondent's country code.
    Country,
}

/// Answers of heat-map items with their location.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAnswersQuery {
    pub item: HeatMapItem,
    pub grouping: RegionGrouping,
}

/// Distinct respondent countries of heat-map items.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerCountriesQuery {
    pub item: HeatMapItem,
}
