//! Activity report: ten time-bucketed sub-metrics on one label axis.

use log::{debug, warn};

use crate::algorithms::{round_to, DateRange, NpsScorer, NpsTally, TimeBucketPlan};
use crate::api::{Cell, DataPoint, Dataset, ReportResult, Table};
use crate::db::query::{
    AnswersQuery, CarrierActivityQuery, FeedbackQuery, MetaQuery, PushQuery, RewardQuery,
};
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::{
    AnswerWithFeedback, CarrierActivity, FeedbackEntry, MetaEntry, MetaName, PushEvent,
    QuestionType, RewardStatus,
};
use crate::services::commons::{average, format_number, join_unique, most_frequent};
use crate::services::context::ReportContext;

const DEFAULT_COLOR: &str = "rgba(75, 186, 227, 1)";
const RATIO_COLOR: &str = "rgba(62,86,119,1)";
const NPS_COLOR: &str = "rgba(73,80,87,1)";

/// Header of the first export column.
pub const EXPORT_LABEL_HEADER: &str = "__month";

/// Sub-metric selected through the scope's data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityMetric {
    Received,
    Ratio,
    Nps,
    CompletionRate,
    RewardsSent,
    EngagementClicks,
    PopularCountries,
    CarrierNames,
    PushesSent,
    PushesClicked,
}

impl ActivityMetric {
    /// Export column order.
    pub const ALL: [ActivityMetric; 10] = [
        ActivityMetric::CarrierNames,
        ActivityMetric::Received,
        ActivityMetric::CompletionRate,
        ActivityMetric::Ratio,
        ActivityMetric::Nps,
        ActivityMetric::RewardsSent,
        ActivityMetric::EngagementClicks,
        ActivityMetric::PopularCountries,
        ActivityMetric::PushesSent,
        ActivityMetric::PushesClicked,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ActivityMetric::Received => "received",
            ActivityMetric::Ratio => "ratio",
            ActivityMetric::Nps => "nps",
            ActivityMetric::CompletionRate => "completion_rate",
            ActivityMetric::RewardsSent => "rewards_sent",
            ActivityMetric::EngagementClicks => "engagement_clicks",
            ActivityMetric::PopularCountries => "popular_countries",
            ActivityMetric::CarrierNames => "carrier_names",
            ActivityMetric::PushesSent => "pushes_sent",
            ActivityMetric::PushesClicked => "pushes_clicked",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityMetric::Received => "__reportReceivedLabel",
            ActivityMetric::Ratio => "__reportRatioLabel",
            ActivityMetric::Nps => "__reportNPSLabel",
            ActivityMetric::CompletionRate => "__reportCompletionRateLabel",
            ActivityMetric::RewardsSent => "__reportSentRewardLabel",
            ActivityMetric::EngagementClicks => "__reportEngagementClickLabel",
            ActivityMetric::PopularCountries => "__reportPopularCountriesLabel",
            ActivityMetric::CarrierNames => "__reportCarrierNameLabel",
            ActivityMetric::PushesSent => "__reportPushesSentLabel",
            ActivityMetric::PushesClicked => "__reportPushesClickedLabel",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            ActivityMetric::Ratio => RATIO_COLOR,
            ActivityMetric::Nps => NPS_COLOR,
            _ => DEFAULT_COLOR,
        }
    }

    fn is_push(&self) -> bool {
        matches!(self, ActivityMetric::PushesSent | ActivityMetric::PushesClicked)
    }

    /// Resolve a data set name. Missing names select `received`; unknown
    /// names fall back to it with a warning.
    pub fn from_data_set(data_set: Option<&str>) -> Self {
        let Some(name) = data_set else {
            return ActivityMetric::Received;
        };
        Self::ALL
            .into_iter()
            .find(|m| m.key() == name)
            .unwrap_or_else(|| {
                warn!("Unsupported activity data set '{}', using received", name);
                ActivityMetric::Received
            })
    }
}

/// Feedback per bucket.
pub(crate) fn compute_received(plan: &TimeBucketPlan, entries: &[FeedbackEntry]) -> Vec<f64> {
    plan.count(entries.iter().map(|f| f.created_at))
        .into_iter()
        .map(|c| c as f64)
        .collect()
}

/// Average satisfaction ratio per bucket; unrated feedback counts as 0.
pub(crate) fn compute_ratio_series(plan: &TimeBucketPlan, entries: &[FeedbackEntry]) -> Vec<f64> {
    plan.group(entries, |f| f.created_at)
        .into_iter()
        .map(|bucket| {
            if bucket.is_empty() {
                return 0.0;
            }
            let sum: f64 = bucket.iter().map(|f| f.satisfaction_ratio.unwrap_or(0.0)).sum();
            round_to(sum / bucket.len() as f64, 2)
        })
        .collect()
}

pub(crate) fn compute_completion_series(plan: &TimeBucketPlan, entries: &[FeedbackEntry]) -> Vec<f64> {
    plan.group(entries, |f| f.created_at)
        .into_iter()
        .map(|bucket| {
            if bucket.is_empty() {
                return 0.0;
            }
            let completed = bucket.iter().filter(|f| f.completed).count();
            round_to(round_to(completed as f64 / bucket.len() as f64, 2) * 100.0, 2)
        })
        .collect()
}

/// NPS per bucket, answers bucketed by their own date.
pub(crate) fn compute_nps_series(plan: &TimeBucketPlan, answers: &[AnswerWithFeedback]) -> Vec<f64> {
    plan.group(answers, |a| a.answer.created_at)
        .into_iter()
        .map(|bucket| {
            bucket
                .iter()
                .filter_map(|a| a.answer.numeric_value())
                .collect::<NpsTally>()
                .bucket_score()
        })
        .collect()
}

/// Most reported country per bucket.
pub(crate) fn compute_popular_country_series(plan: &TimeBucketPlan, metas: &[MetaEntry]) -> Vec<Option<String>> {
    plan.group(metas, |m| m.feedback_created_at)
        .into_iter()
        .map(|bucket| most_frequent(bucket.iter().map(|m| m.value.as_str())).map(|(code, _)| code))
        .collect()
}

/// Distinct carrier names per bucket.
pub(crate) fn compute_carrier_name_series(
    plan: &TimeBucketPlan,
    activity: &[CarrierActivity],
) -> Vec<Option<String>> {
    plan.group(activity, |a| a.feedback_created_at)
        .into_iter()
        .map(|bucket| {
            (!bucket.is_empty()).then(|| join_unique(bucket.iter().map(|a| a.carrier_name.as_str())))
        })
        .collect()
}

fn values(series: Vec<f64>) -> Vec<DataPoint> {
    series.into_iter().map(DataPoint::Value).collect()
}

fn counts(plan: &TimeBucketPlan, stamps: impl Iterator<Item = chrono::NaiveDateTime>) -> Vec<DataPoint> {
    plan.count(stamps)
        .into_iter()
        .map(|c| DataPoint::Value(c as f64))
        .collect()
}

fn labels(series: Vec<Option<String>>) -> Vec<DataPoint> {
    series.into_iter().map(DataPoint::Label).collect()
}

async fn fetch_entries<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Vec<FeedbackEntry>> {
    Ok(ctx
        .repo
        .fetch_feedback_entries(&ctx.scope.scoped(FeedbackQuery::all()))
        .await?)
}

async fn fetch_nps_answers<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Vec<AnswerWithFeedback>> {
    Ok(ctx
        .repo
        .fetch_answers(&ctx.scope.scoped(AnswersQuery::of_types(&[QuestionType::Nps])))
        .await?)
}

async fn fetch_pushes<R: FullRepository>(
    ctx: &ReportContext<'_, R>,
    clicked_only: bool,
) -> EngineResult<Vec<PushEvent>> {
    Ok(ctx
        .repo
        .fetch_push_events(&ctx.scope.scoped(PushQuery {
            carrier_ids: ctx.scope.carrier_ids().clone(),
            clicked_only,
        }))
        .await?)
}

/// Points of one sub-metric on `plan`.
async fn metric_points<R: FullRepository>(
    ctx: &ReportContext<'_, R>,
    metric: ActivityMetric,
    plan: &TimeBucketPlan,
    entries: &[FeedbackEntry],
) -> EngineResult<Vec<DataPoint>> {
    let scope = ctx.scope;
    let points = match metric {
        ActivityMetric::Received => values(compute_received(plan, entries)),
        ActivityMetric::Ratio => values(compute_ratio_series(plan, entries)),
        ActivityMetric::CompletionRate => values(compute_completion_series(plan, entries)),
        ActivityMetric::Nps => values(compute_nps_series(plan, &fetch_nps_answers(ctx).await?)),
        ActivityMetric::RewardsSent => {
            let rewards = ctx
                .repo
                .fetch_reward_transactions(&scope.scoped(RewardQuery {
                    status: Some(RewardStatus::Sent),
                }))
                .await?;
            counts(plan, rewards.iter().map(|r| r.feedback_created_at))
        }
        ActivityMetric::EngagementClicks => {
            let metas = ctx
                .repo
                .fetch_metas(&scope.scoped(MetaQuery::named(MetaName::EngagementType)))
                .await?;
            counts(plan, metas.iter().map(|m| m.feedback_created_at))
        }
        ActivityMetric::PopularCountries => {
            let metas = ctx
                .repo
                .fetch_metas(&scope.scoped(MetaQuery::named(MetaName::CountryCode)))
                .await?;
            labels(compute_popular_country_series(plan, &metas))
        }
        ActivityMetric::CarrierNames => {
            let carrier_ids = scope.carrier_ids();
            let activity = ctx
                .repo
                .fetch_carrier_activity(&scope.scoped(CarrierActivityQuery {
                    carrier_ids: (!carrier_ids.is_empty()).then(|| carrier_ids.clone()),
                }))
                .await?;
            labels(compute_carrier_name_series(plan, &activity))
        }
        ActivityMetric::PushesSent | ActivityMetric::PushesClicked => {
            let pushes = fetch_pushes(ctx, metric == ActivityMetric::PushesClicked).await?;
            counts(plan, pushes.iter().map(|p| p.created_at))
        }
    };
    Ok(points)
}

/// Headline number of a sub-metric.
async fn title<R: FullRepository>(
    ctx: &ReportContext<'_, R>,
    metric: ActivityMetric,
    entries: &[FeedbackEntry],
    dataset: &Dataset,
) -> EngineResult<String> {
    Ok(match metric {
        ActivityMetric::Ratio => {
            let avg = average(entries.iter().filter_map(|f| f.satisfaction_ratio)).unwrap_or(0.0);
            format!("{}%", format_number(avg.round()))
        }
        ActivityMetric::Nps => {
            let tally: NpsTally = fetch_nps_answers(ctx)
                .await?
                .iter()
                .filter_map(|a| a.answer.numeric_value())
                .collect();
            format_number(tally.nps_score())
        }
        _ => format_number(dataset.values().iter().sum()),
    })
}

pub async fn compute_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    let metric = ActivityMetric::from_data_set(ctx.scope.data_set());

    let (entries, plan) = if metric.is_push() {
        let pushes = fetch_pushes(ctx, metric == ActivityMetric::PushesClicked).await?;
        (
            Vec::new(),
            ctx.plan(DateRange::covering(pushes.iter().map(|p| p.created_at))),
        )
    } else {
        let entries = fetch_entries(ctx).await?;
        let plan = ctx.plan(DateRange::covering(entries.iter().map(|f| f.created_at)));
        (entries, plan)
    };

    let points = metric_points(ctx, metric, &plan, &entries).await?;
    let dataset = Dataset::new(metric.label(), Some(metric.color()), points);
    let title = title(ctx, metric, &entries, &dataset).await?;
    debug!(
        "activity/{}: {} labels, title {}",
        metric.key(),
        plan.len(),
        title
    );

    Ok(ReportResult {
        title,
        labels: plan.labels().to_vec(),
        x_axis_label: plan.x_axis_label().to_string(),
        y_axis_label: None,
        datasets: vec![dataset],
        summary: Vec::new(),
    })
}

/// Every sub-metric side by side on one axis covering feedback and pushes.
pub async fn compute_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let entries = fetch_entries(ctx).await?;
    let pushes = fetch_pushes(ctx, false).await?;
    let range = DateRange::union(
        DateRange::covering(entries.iter().map(|f| f.created_at)),
        DateRange::covering(pushes.iter().map(|p| p.created_at)),
    );
    let plan = ctx.plan(range);

    let mut header = vec![Cell::from(EXPORT_LABEL_HEADER)];
    let mut rows: Vec<Vec<Cell>> = plan
        .labels()
        .iter()
        .map(|label| vec![Cell::from(label.as_str())])
        .collect();

    for metric in ActivityMetric::ALL {
        header.push(Cell::from(metric.label()));
        let points = metric_points(ctx, metric, &plan, &entries).await?;
        for (row, point) in rows.iter_mut().zip(points.iter()) {
            row.push(point.to_cell());
        }
    }

    debug!("activity export: {} rows", rows.len());
    let mut table = Vec::with_capacity(rows.len() + 1);
    table.push(header);
    table.extend(rows);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnswerId, CarrierId, FeedbackId, QuestionId};
    use crate::algorithms::TimeBucketPlanner;
    use crate::config::BucketSettings;
    use crate::models::{Answer, Locale};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn plan_for(first: u32, last: u32) -> TimeBucketPlan {
        TimeBucketPlanner::new(&BucketSettings::default(), Locale::En).plan(
            Some(DateRange::new(at(first, 0).date(), at(last, 0).date())),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
    }

    fn entry(id: i64, at: NaiveDateTime, ratio: Option<f64>, completed: bool) -> FeedbackEntry {
        FeedbackEntry {
            id: FeedbackId::new(id),
            carrier_id: CarrierId::new(1),
            satisfaction_ratio: ratio,
            completed,
            created_at: at,
        }
    }

    fn nps_answer(value: &str, at: NaiveDateTime) -> AnswerWithFeedback {
        AnswerWithFeedback {
            answer: Answer {
                id: AnswerId::new(1),
                feedback_id: FeedbackId::new(1),
                question_id: QuestionId::new(1),
                value: value.to_string(),
                sentiment_score: None,
                created_at: at,
            },
            question_type: QuestionType::Nps,
            carrier_id: CarrierId::new(1),
            carrier_name: "Survey".to_string(),
            satisfaction_ratio: None,
        }
    }

    #[test]
    fn test_metric_fallback() {
        assert_eq!(ActivityMetric::from_data_set(None), ActivityMetric::Received);
        assert_eq!(ActivityMetric::from_data_set(Some("nps")), ActivityMetric::Nps);
        assert_eq!(
            ActivityMetric::from_data_set(Some("dropout_rate")),
            ActivityMetric::Received
        );
    }

    #[test]
    fn test_ratio_series_averages_per_bucket() {
        let plan = plan_for(10, 16);
        let entries = vec![
            entry(1, at(10, 9), Some(80.0), true),
            entry(2, at(10, 15), Some(80.0), false),
            entry(3, at(11, 9), Some(100.0), true),
        ];
        let series = compute_ratio_series(&plan, &entries);
        assert_eq!(&series[..2], &[80.0, 100.0]);
        assert!(series[2..].iter().all(|v| *v == 0.0));

        let unrated = vec![entry(4, at(12, 9), None, false), entry(5, at(12, 10), Some(50.0), false)];
        assert_eq!(compute_ratio_series(&plan, &unrated)[2], 25.0);
    }

    #[test]
    fn test_completion_series() {
        let plan = plan_for(10, 16);
        let entries = vec![
            entry(1, at(10, 9), None, true),
            entry(2, at(10, 10), None, false),
            entry(3, at(10, 11), None, false),
        ];
        assert_eq!(compute_completion_series(&plan, &entries)[0], 33.0);
    }

    #[test]
    fn test_nps_series_rounds_shares_first() {
        let plan = plan_for(10, 16);
        let answers = vec![
            nps_answer("10", at(10, 9)),
            nps_answer("9", at(10, 10)),
            nps_answer("3", at(10, 11)),
            nps_answer("8", at(11, 9)),
        ];
        let series = compute_nps_series(&plan, &answers);
        // 67 - 33 on the first day, passives only on the second.
        assert_eq!(series[0], 34.0);
        assert_eq!(series[1], 0.0);
    }

    #[test]
    fn test_popular_country_series() {
        let plan = plan_for(10, 16);
        let meta = |value: &str, day: u32| MetaEntry {
            feedback_id: FeedbackId::new(1),
            name: MetaName::CountryCode,
            value: value.to_string(),
            feedback_created_at: at(day, 12),
        };
        let metas = vec![meta("FR", 10), meta("DE", 10), meta("DE", 10), meta("US", 11)];
        let series = compute_popular_country_series(&plan, &metas);
        assert_eq!(series[0].as_deref(), Some("DE"));
        assert_eq!(series[1].as_deref(), Some("US"));
        assert_eq!(series[2], None);
    }
}
