//! Aggregations shared by several variants.
//!
//! Pure `compute_*` helpers hold the arithmetic; the async functions fetch
//! their inputs from the record store and delegate to them.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;

use crate::algorithms::round_to;
use crate::api::{CarrierId, FeedbackId};
use crate::db::query::{CarrierViewsQuery, FeedbackQuery};
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::{FeedbackEntry, MetaName, QuestionType};
use crate::services::context::ReportContext;

/// Share of viewers who left without answering.
///
/// 0 without views, 100 when there is more feedback than views.
pub(crate) fn compute_drop_out_rate(feedbacks: usize, views: usize) -> f64 {
    if views == 0 {
        return 0.0;
    }
    if feedbacks > views {
        return 100.0;
    }
    round_to(100.0 - (feedbacks as f64 / views as f64) * 100.0, 1)
}

/// Completed over total, as a percentage with two decimals.
pub(crate) fn compute_completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(completed as f64 / total as f64 * 100.0, 2)
}

/// `MM/DD/YY - MM/DD/YY`.
pub(crate) fn format_time_period(first: NaiveDateTime, last: NaiveDateTime) -> String {
    format!("{} - {}", first.format("%m/%d/%y"), last.format("%m/%d/%y"))
}

pub(crate) fn average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Average of the known satisfaction ratios, rounded to `decimals`; 0 when none are known.
pub(crate) fn compute_mean_ratio(entries: &[FeedbackEntry], decimals: i32) -> f64 {
    average(entries.iter().filter_map(|f| f.satisfaction_ratio))
        .map(|avg| round_to(avg, decimals))
        .unwrap_or(0.0)
}

/// Most frequent value; ties go to the alphabetically first one.
pub(crate) fn most_frequent<'a, I>(values: I) -> Option<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (value, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((value, count)),
        })
        .map(|(value, count)| (value.to_string(), count))
}

/// Comma-join distinct values, keeping first-seen order.
pub(crate) fn join_unique<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref();
        if seen.insert(value.to_string()) {
            kept.push(value.to_string());
        }
    }
    kept.join(",")
}

/// Render a number without a trailing `.0`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Feedback query for the scope's carrier selection; an empty selection means every carrier.
pub(crate) fn selected_feedback_query(carrier_ids: &std::collections::BTreeSet<CarrierId>) -> FeedbackQuery {
    if carrier_ids.is_empty() {
        FeedbackQuery::all()
    } else {
        FeedbackQuery::for_carriers(carrier_ids)
    }
}

/// Time period covered by the scoped feedback, `None` without feedback.
pub async fn time_period<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Option<String>> {
    let entries = ctx
        .repo
        .fetch_feedback_entries(&ctx.scope.scoped(FeedbackQuery::all()))
        .await?;
    Ok(match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => Some(format_time_period(first.created_at, last.created_at)),
        _ => None,
    })
}

/// NPS answers given in these feedback.
pub async fn nps_count<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<usize> {
    Ok(repo.count_answers_by_type(feedback_ids, QuestionType::Nps).await?)
}

/// Engagement emails sent after these feedback.
pub async fn engagement_count<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<usize> {
    Ok(repo
        .fetch_metas_for_feedbacks(feedback_ids, MetaName::EngagementEmail)
        .await?
        .len())
}

pub async fn rewards_sent<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<usize> {
    Ok(repo.count_reward_transactions(feedback_ids).await?)
}

pub async fn completion_rate<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<f64> {
    let feedbacks = repo.fetch_feedbacks_by_ids(feedback_ids).await?;
    let completed = feedbacks.iter().filter(|f| f.completed).count();
    Ok(compute_completion_rate(completed, feedbacks.len()))
}

/// Distinct respondent countries of these feedback, comma-joined.
pub async fn popular_countries<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<String> {
    let metas = repo
        .fetch_metas_for_feedbacks(feedback_ids, MetaName::CountryCode)
        .await?;
    Ok(join_unique(metas.iter().map(|m| m.value.as_str())))
}

/// Names of the carriers these feedback were given on, comma-joined.
pub async fn carrier_names<R: FullRepository>(repo: &R, feedback_ids: &[FeedbackId]) -> EngineResult<String> {
    let feedbacks = repo.fetch_feedbacks_by_ids(feedback_ids).await?;
    let carrier_ids: Vec<CarrierId> = feedbacks.iter().map(|f| f.carrier_id).collect();
    let names = repo.fetch_carrier_names(&carrier_ids).await?;
    Ok(join_unique(names))
}

/// Drop-out rate of the scope's carrier selection.
pub async fn drop_out_rate<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<f64> {
    let carrier_ids = ctx.scope.carrier_ids();
    let feedbacks = ctx
        .repo
        .count_feedbacks(&ctx.scope.scoped(selected_feedback_query(carrier_ids)))
        .await?;
    let views = ctx
        .repo
        .count_carrier_views(&ctx.scope.scoped(CarrierViewsQuery {
            carrier_ids: carrier_ids.clone(),
        }))
        .await?;
    Ok(compute_drop_out_rate(feedbacks, views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_drop_out_rate() {
        assert_eq!(compute_drop_out_rate(5, 0), 0.0);
        assert_eq!(compute_drop_out_rate(12, 10), 100.0);
        assert_eq!(compute_drop_out_rate(1, 3), 66.7);
        assert_eq!(compute_drop_out_rate(10, 10), 0.0);
    }

    #[test]
    fn test_completion_rate() {
        assert_eq!(compute_completion_rate(0, 0), 0.0);
        assert_eq!(compute_completion_rate(1, 3), 33.33);
        assert_eq!(compute_completion_rate(4, 4), 100.0);
    }

    #[test]
    fn test_time_period_format() {
        let first = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 11, 20)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(format_time_period(first, last), "03/05/24 - 11/20/24");
    }

    #[test]
    fn test_most_frequent_ties_alphabetical() {
        assert_eq!(most_frequent(Vec::<&str>::new()), None);
        assert_eq!(
            most_frequent(["FR", "DE", "FR", "DE", "US"]),
            Some(("DE".to_string(), 2))
        );
        assert_eq!(most_frequent(["US", "US", "FR"]), Some(("US".to_string(), 2)));
    }

    #[test]
    fn test_join_unique_keeps_order() {
        assert_eq!(join_unique(["b", "a", "b", "c"]), "b,a,c");
        assert_eq!(join_unique(Vec::<String>::new()), "");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(33.5), "33.5");
        assert_eq!(format_number(-40.0), "-40");
    }
}
