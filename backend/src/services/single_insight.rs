//! Single-word insight: how often a word is mentioned, by whom and since when,
//! with optional language analysis of the word itself.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::algorithms::round_to;
use crate::api::{Cell, FeedbackId, ReportResult, SummaryField, Table};
use crate::db::query::AnswersQuery;
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::QuestionType;
use crate::services::commons::average;
use crate::services::context::ReportContext;

/// Failure reported by a language analyzer.
#[derive(Debug, thiserror::Error)]
#[error("Language analysis failed: {0}")]
pub struct AnalyzerError(pub String);

/// Natural-language enrichment of a search word.
///
/// Implementations usually call a remote service; every failure is tolerated
/// and only removes the corresponding field from the report.
#[async_trait]
pub trait LanguageAnalyzer: Send + Sync {
    /// Sentiment score in `[-1, 1]`.
    async fn sentiment(&self, text: &str) -> Result<f64, AnalyzerError>;

    /// Part-of-speech tag of the first token (`NOUN`, `VERB`, ..., `X` when unknown).
    async fn syntax_tag(&self, text: &str) -> Result<String, AnalyzerError>;

    async fn category(&self, text: &str) -> Result<String, AnalyzerError>;

    /// Entity type of the first entity (`PERSON`, `LOCATION`, ..., `OTHER`).
    async fn entity_type(&self, text: &str) -> Result<String, AnalyzerError>;
}

/// Language fields of the report, each `None` when unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordAnalysis {
    pub sentiment: Option<f64>,
    pub syntax: Option<String>,
    pub category: Option<String>,
    pub entity: Option<String>,
}

fn tolerate<T>(field: &str, result: Result<T, AnalyzerError>) -> Option<T> {
    result
        .map_err(|e| warn!("single insight: {} unavailable: {}", field, e))
        .ok()
}

/// Capitalize each word, lowercasing the rest: `PROPER_NOUN` becomes `Proper_noun`.
pub(crate) fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub async fn analyze_word(analyzer: &dyn LanguageAnalyzer, word: &str) -> WordAnalysis {
    let sentiment = tolerate("sentiment", analyzer.sentiment(word).await).map(|s| s * 100.0);
    let syntax = tolerate("syntax", analyzer.syntax_tag(word).await)
        .filter(|tag| tag != "X")
        .map(|tag| title_case(&tag));
    let category = tolerate("category", analyzer.category(word).await);
    let entity = tolerate("entity", analyzer.entity_type(word).await)
        .filter(|entity| entity != "OTHER")
        .map(|entity| title_case(&entity));

    WordAnalysis {
        sentiment,
        syntax,
        category,
        entity,
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Human distance between two instants: "3 days ago", "2 weeks from now".
pub(crate) fn relative_time(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let delta = now.signed_duration_since(then);
    let seconds = delta.num_seconds().abs();
    let amount = match seconds {
        s if s < 60 => plural(s.max(1), "second"),
        s if s < 3_600 => plural(s / 60, "minute"),
        s if s < 86_400 => plural(s / 3_600, "hour"),
        s if s < 7 * 86_400 => plural(s / 86_400, "day"),
        s if s < 30 * 86_400 => plural(s / (7 * 86_400), "week"),
        s if s < 365 * 86_400 => plural(s / (30 * 86_400), "month"),
        s => plural(s / (365 * 86_400), "year"),
    };
    if delta.num_seconds() >= 0 {
        format!("{} ago", amount)
    } else {
        format!("{} from now", amount)
    }
}

const FIELD_KEYS: [&str; 9] = [
    "sentiment",
    "category",
    "syntax",
    "entity",
    "mentions",
    "satisfaction_ratio",
    "date_first_seen",
    "date_last_seen",
    "word",
];

async fn compute_fields<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Vec<SummaryField>> {
    let scope = ctx.scope;
    let word = scope.search();

    let mut query = AnswersQuery::of_types(&QuestionType::FREE_TEXT)
        .non_empty()
        .containing(word);
    if !scope.carrier_ids().is_empty() {
        query = query.for_carriers(scope.carrier_ids());
    }
    let answers = ctx.repo.fetch_answers(&scope.scoped(query)).await?;

    let mut seen: HashSet<FeedbackId> = HashSet::new();
    let ratios = answers
        .iter()
        .filter(|a| seen.insert(a.answer.feedback_id))
        .filter_map(|a| a.satisfaction_ratio);
    let satisfaction_ratio = average(ratios).map(|avg| round_to(avg, 2)).unwrap_or(0.0);

    let analysis = match ctx.analyzer {
        Some(analyzer) => analyze_word(analyzer, word).await,
        None => WordAnalysis::default(),
    };
    debug!("single insight '{}': {} mentions", word, answers.len());

    let first_seen = answers.first().map(|a| relative_time(a.answer.created_at, ctx.now));
    let last_seen = answers.last().map(|a| relative_time(a.answer.created_at, ctx.now));
    let values = [
        Cell::from(analysis.sentiment),
        Cell::from(analysis.category),
        Cell::from(analysis.syntax),
        Cell::from(analysis.entity),
        Cell::from(answers.len()),
        Cell::from(satisfaction_ratio),
        Cell::from(first_seen),
        Cell::from(last_seen),
        Cell::from(word),
    ];

    Ok(FIELD_KEYS
        .iter()
        .zip(values)
        .map(|(key, value)| SummaryField::new(*key, value))
        .collect())
}

pub async fn compute_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    Ok(ReportResult {
        title: ctx.scope.search().to_string(),
        summary: compute_fields(ctx).await?,
        ..ReportResult::default()
    })
}

/// Header of field keys and one row of values.
pub async fn compute_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let fields = compute_fields(ctx).await?;
    let header = fields.iter().map(|f| Cell::from(format!("__{}", f.key))).collect();
    let row = fields.into_iter().map(|f| f.value).collect();
    Ok(vec![header, row])
}
