//! Public API surface of the report engine.
//!
//! This file consolidates the identifier newtypes and the plain result types the
//! engine hands back to its callers. All types derive Serialize/Deserialize so a
//! host (HTTP layer, job runner, CLI) can ship them as JSON untouched.

use serde::{Deserialize, Serialize};

crate::define_id_type!(i64, TeamId);
crate::define_id_type!(i64, CarrierId);
crate::define_id_type!(i64, FeedbackId);
crate::define_id_type!(i64, UserId);
crate::define_id_type!(i64, QuestionId);
crate::define_id_type!(i64, OptionId);
crate::define_id_type!(i64, RatingId);
crate::define_id_type!(i64, AnswerId);
crate::define_id_type!(i64, RewardId);
crate::define_id_type!(i64, PushId);

/// Handle of a filter expression compiled by the record store.
///
/// The engine never interprets the expression; it only forwards the handle so
/// the store can restrict queries to the expression's match set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpressionId(pub String);

impl FilterExpressionId {
    pub fn new(value: impl Into<String>) -> Self {
        FilterExpressionId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a raw slot value. Blank values and the empty expression `[]` mean
    /// "no filter".
    pub fn parse_optional(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "[]" {
            None
        } else {
            Some(FilterExpressionId(trimmed.to_string()))
        }
    }
}

impl std::fmt::Display for FilterExpressionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a report variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetadata {
    pub name: String,
    pub label: String,
    pub description: String,
    pub exportable: bool,
    pub benchmarkable: bool,
    pub clickable: bool,
    pub is_percentage: bool,
}

/// A single table cell, used by export tables and summary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numeric view of the cell; text and empty cells have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Number(v) => Some(*v),
            Cell::Empty | Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Integer(v as i64)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Row-major export table. The first row is the header.
pub type Table = Vec<Vec<Cell>>;

/// Bubble chart point (insight term).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubblePoint {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub label: String,
}

/// Aggregated value for one geographic region of a heat map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPoint {
    pub location: String,
    pub label: Cell,
    pub total: u64,
}

/// One point of a dataset series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPoint {
    Value(f64),
    Label(Option<String>),
    Bubble(BubblePoint),
    Region(RegionPoint),
}

impl DataPoint {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataPoint::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert the point to an export cell.
    pub fn to_cell(&self) -> Cell {
        match self {
            DataPoint::Value(v) => Cell::Number(*v),
            DataPoint::Label(label) => label.clone().into(),
            DataPoint::Bubble(b) => Cell::Text(b.label.clone()),
            DataPoint::Region(r) => r.label.clone(),
        }
    }
}

/// A labelled, coloured data series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, color: Option<&str>, points: Vec<DataPoint>) -> Self {
        Self {
            label: label.into(),
            color: color.map(str::to_string),
            points,
        }
    }

    /// Build a numeric series.
    pub fn numeric(label: impl Into<String>, color: &str, values: &[f64]) -> Self {
        Self::new(
            label,
            Some(color),
            values.iter().copied().map(DataPoint::Value).collect(),
        )
    }

    /// Numeric values of the series; non-numeric points are skipped.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().filter_map(DataPoint::as_f64).collect()
    }
}

/// Named scalar attached to a report (sentiment percentages, detected country, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryField {
    pub key: String,
    pub value: Cell,
}

impl SummaryField {
    pub fn new(key: impl Into<String>, value: impl Into<Cell>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of one report computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub title: String,
    pub labels: Vec<String>,
    pub x_axis_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    pub datasets: Vec<Dataset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<SummaryField>,
}

impl ReportResult {
    /// The zero-value result: no labels, no datasets.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.datasets.is_empty() && self.summary.is_empty()
    }

    /// Look up a summary field by key.
    pub fn summary_value(&self, key: &str) -> Option<&Cell> {
        self.summary.iter().find(|f| f.key == key).map(|f| &f.value)
    }
}
