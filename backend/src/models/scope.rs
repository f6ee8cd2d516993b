//! Request-side scope of a report computation.
//!
//! A [`ScopeFilter`] describes which records a query may see. It is built once
//! per request through [`ScopeFilterBuilder`] and shared read-only by every
//! query of the computation.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::{CarrierId, FilterExpressionId, TeamId, UserId};

/// Sort direction requested by the caller (used by table-like consumers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" | "" => Ok(Self::Desc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// Kind of item a heat map (or answer report) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Questions,
    Ratings,
    CustomField,
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "questions" | "question" => Ok(Self::Questions),
            "ratings" | "rating" => Ok(Self::Ratings),
            "custom_field" | "custom_fields" => Ok(Self::CustomField),
            other => Err(format!("Unknown item type: {}", other)),
        }
    }
}

/// Flavour of export requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Listing,
    Computed,
}

impl FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "listing" => Ok(Self::Listing),
            "computed" => Ok(Self::Computed),
            other => Err(format!("Unknown export type: {}", other)),
        }
    }
}

/// Display locale of the acting user. Only affects date label formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.trim().to_lowercase();
        // "fr_FR", "fr-CA" and friends all count as French.
        if lang == "fr" || lang.starts_with("fr_") || lang.starts_with("fr-") {
            Ok(Self::Fr)
        } else if lang.is_empty() || lang == "en" || lang.starts_with("en_") || lang.starts_with("en-") {
            Ok(Self::En)
        } else {
            Err(format!("Unsupported locale: {}", s))
        }
    }
}

/// Immutable description of which records a computation may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeFilter {
    team_id: TeamId,
    carrier_ids: BTreeSet<CarrierId>,
    order: SortOrder,
    page: u32,
    search: String,
    data_set: Option<String>,
    item_ids: Vec<i64>,
    item_type: Option<ItemType>,
    export_type: Option<ExportType>,
    filter_expression: Option<FilterExpressionId>,
    restricted_user: bool,
    actor_id: Option<UserId>,
    locale: Locale,
}

impl ScopeFilter {
    /// Start building a scope for a team.
    pub fn builder(team_id: TeamId) -> ScopeFilterBuilder {
        ScopeFilterBuilder::new(team_id)
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn carrier_ids(&self) -> &BTreeSet<CarrierId> {
        &self.carrier_ids
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Requested sub-metric, as sent by the caller.
    pub fn data_set(&self) -> Option<&str> {
        self.data_set.as_deref()
    }

    pub fn item_ids(&self) -> &[i64] {
        &self.item_ids
    }

    pub fn item_type(&self) -> Option<ItemType> {
        self.item_type
    }

    pub fn export_type(&self) -> Option<ExportType> {
        self.export_type
    }

    pub fn filter_expression(&self) -> Option<&FilterExpressionId> {
        self.filter_expression.as_ref()
    }

    pub fn is_restricted_user(&self) -> bool {
        self.restricted_user
    }

    pub fn actor_id(&self) -> Option<UserId> {
        self.actor_id
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Copy of this scope with a different filter expression.
    ///
    /// Benchmark slots differ only by their expression.
    pub fn with_filter_expression(&self, expression: Option<FilterExpressionId>) -> Self {
        Self {
            filter_expression: expression,
            ..self.clone()
        }
    }

    /// Copy of this scope selecting another sub-metric.
    pub fn with_data_set(&self, data_set: impl Into<String>) -> Self {
        Self {
            data_set: Some(data_set.into()),
            ..self.clone()
        }
    }
}

/// Builder for [`ScopeFilter`].
#[derive(Debug, Clone)]
pub struct ScopeFilterBuilder {
    inner: ScopeFilter,
}

impl ScopeFilterBuilder {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            inner: ScopeFilter {
                team_id,
                carrier_ids: BTreeSet::new(),
                order: SortOrder::default(),
                page: 1,
                search: String::new(),
                data_set: None,
                item_ids: Vec::new(),
                item_type: None,
                export_type: None,
                filter_expression: None,
                restricted_user: false,
                actor_id: None,
                locale: Locale::default(),
            },
        }
    }

    pub fn carrier_ids(mut self, ids: impl IntoIterator<Item = CarrierId>) -> Self {
        self.inner.carrier_ids = ids.into_iter().collect();
        self
    }

    /// Read carrier ids from a comma-separated list such as `"1,2,3"`.
    ///
    /// Unparseable entries are ignored.
    pub fn carrier_ids_csv(mut self, csv: &str) -> Self {
        self.inner.carrier_ids = csv
            .split(',')
            .filter_map(|part| part.parse::<CarrierId>().ok())
            .collect();
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.inner.order = order;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.inner.page = page.max(1);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.inner.search = search.into();
        self
    }

    pub fn data_set(mut self, data_set: impl Into<String>) -> Self {
        self.inner.data_set = Some(data_set.into());
        self
    }

    /// Item ids from a comma-separated list, e.g. `"4,7"`.
    pub fn item_ids_csv(mut self, csv: &str) -> Self {
        self.inner.item_ids = csv
            .split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect();
        self
    }

    pub fn item_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.inner.item_ids = ids.into_iter().collect();
        self
    }

    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.inner.item_type = Some(item_type);
        self
    }

    pub fn export_type(mut self, export_type: ExportType) -> Self {
        self.inner.export_type = Some(export_type);
        self
    }

    pub fn filter_expression(mut self, expression: Option<FilterExpressionId>) -> Self {
        self.inner.filter_expression = expression;
        self
    }

    /// Restrict visibility to what `actor` owns or created.
    pub fn restricted_to(mut self, actor: UserId) -> Self {
        self.inner.restricted_user = true;
        self.inner.actor_id = Some(actor);
        self
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.inner.actor_id = Some(actor);
        self
    }

    pub fn restricted_user(mut self, restricted: bool) -> Self {
        self.inner.restricted_user = restricted;
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.inner.locale = locale;
        self
    }

    pub fn build(self) -> ScopeFilter {
        self.inner
    }
}
