//! Sentiment report: share of good, neutral and bad answers.

use std::collections::HashSet;

use log::debug;

use crate::algorithms::round_to;
use crate::api::{Cell, Dataset, FeedbackId, ReportResult, SummaryField, Table};
use crate::config::SentimentSettings;
use crate::db::query::AnswersQuery;
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::AnswerWithFeedback;
use crate::services::commons::{
    self, completion_rate, engagement_count, format_number, join_unique, nps_count,
    popular_countries, rewards_sent,
};
use crate::services::context::ReportContext;

const SENTIMENT_COLOR: &str = "rgba(75, 186, 227, 1)";

const DATASET_LABELS: [&str; 3] = ["__goodFeeling", "__neutralFeeling", "__badFeeling"];

const SUMMARY_KEYS: [&str; 7] = [
    "good_feeling",
    "neutral_feeling",
    "bad_feeling",
    "time_period",
    "feedback_carrier_selected",
    "feedback_analysed",
    "satisfaction_ratio",
];

const EXPORT_EXTRA_KEYS: [&str; 6] = [
    "nps",
    "drop_out_rate",
    "completion_rate",
    "rewards_sent",
    "engagements_clicked",
    "most_popular_country",
];

/// Answers per sentiment band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SentimentTally {
    pub good: usize,
    pub neutral: usize,
    pub bad: usize,
}

impl SentimentTally {
    /// Scores at or below the negative threshold are bad, at or above the
    /// positive one good.
    pub(crate) fn from_scores<I>(settings: &SentimentSettings, scores: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut tally = Self::default();
        for score in scores {
            if score <= settings.negative_threshold {
                tally.bad += 1;
            } else if score >= settings.positive_threshold {
                tally.good += 1;
            } else {
                tally.neutral += 1;
            }
        }
        tally
    }

    fn total(&self) -> usize {
        self.good + self.neutral + self.bad
    }

    /// Good, neutral and bad percentages with one decimal.
    pub(crate) fn percentages(&self) -> [f64; 3] {
        let total = self.total().max(1) as f64;
        [self.good, self.neutral, self.bad].map(|n| round_to(n as f64 / total * 100.0, 1))
    }
}

/// The summary shown with the chart, and the first columns of the export.
struct SentimentSummary {
    percentages: [f64; 3],
    time_period: Option<String>,
    carriers: String,
    feedback_ids: Vec<FeedbackId>,
    satisfaction_ratio: f64,
}

impl SentimentSummary {
    fn cells(&self) -> Vec<Cell> {
        let [good, neutral, bad] = self.percentages;
        vec![
            Cell::from(format!("{}%", format_number(good))),
            Cell::from(format!("{}%", format_number(neutral))),
            Cell::from(format!("{}%", format_number(bad))),
            Cell::from(self.time_period.clone()),
            Cell::from(self.carriers.as_str()),
            Cell::from(self.feedback_ids.len()),
            Cell::from(self.satisfaction_ratio),
        ]
    }
}

fn summarize(
    settings: &SentimentSettings,
    answers: &[AnswerWithFeedback],
    time_period: Option<String>,
) -> SentimentSummary {
    let tally = SentimentTally::from_scores(settings, answers.iter().filter_map(|a| a.answer.sentiment_score));
    let total = answers.len().max(1) as f64;
    let ratio_sum: f64 = answers.iter().map(|a| a.satisfaction_ratio.unwrap_or(0.0)).sum();

    let mut seen = HashSet::new();
    let feedback_ids = answers
        .iter()
        .map(|a| a.answer.feedback_id)
        .filter(|id| seen.insert(*id))
        .collect();

    SentimentSummary {
        percentages: tally.percentages(),
        time_period,
        carriers: join_unique(answers.iter().map(|a| a.carrier_name.as_str())),
        feedback_ids,
        satisfaction_ratio: round_to(ratio_sum / total, 0),
    }
}

async fn fetch_summary<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<SentimentSummary> {
    let answers = ctx
        .repo
        .fetch_answers(&ctx.scope.scoped(AnswersQuery::with_sentiment()))
        .await?;
    let time_period = commons::time_period(ctx).await?;
    debug!("sentiment: {} analysed answers", answers.len());
    Ok(summarize(&ctx.config.sentiment, &answers, time_period))
}

pub async fn compute_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    let summary = fetch_summary(ctx).await?;
    let fields = SUMMARY_KEYS
        .iter()
        .zip(summary.cells())
        .map(|(key, value)| SummaryField::new(*key, value))
        .collect();

    Ok(ReportResult {
        title: "__reportSentimentLabel".to_string(),
        labels: DATASET_LABELS.iter().map(|l| l.to_string()).collect(),
        x_axis_label: String::new(),
        y_axis_label: None,
        datasets: vec![Dataset::numeric(
            "__reportSentimentLabel",
            SENTIMENT_COLOR,
            &summary.percentages,
        )],
        summary: fields,
    })
}

/// Header row plus one summary row with the engagement columns.
pub async fn compute_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let summary = fetch_summary(ctx).await?;
    let repo = ctx.repo;
    let ids = &summary.feedback_ids;

    let header = SUMMARY_KEYS
        .iter()
        .chain(EXPORT_EXTRA_KEYS.iter())
        .map(|key| Cell::from(format!("__{}", key)))
        .collect();

    let mut row = summary.cells();
    row.extend([
        Cell::from(nps_count(repo, ids).await?),
        Cell::from(commons::drop_out_rate(ctx).await?),
        Cell::from(completion_rate(repo, ids).await?),
        Cell::from(rewards_sent(repo, ids).await?),
        Cell::from(engagement_count(repo, ids).await?),
        Cell::from(popular_countries(repo, ids).await?),
    ]);

    Ok(vec![header, row])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_inclusive() {
        let settings = SentimentSettings::default();
        let tally = SentimentTally::from_scores(&settings, [-25.0, -80.0, 25.0, 0.0, 24.9]);
        assert_eq!(
            tally,
            SentimentTally {
                good: 1,
                neutral: 2,
                bad: 2
            }
        );
    }

    #[test]
    fn test_percentages_without_answers() {
        let tally = SentimentTally::default();
        assert_eq!(tally.percentages(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_percentages_one_decimal() {
        let tally = SentimentTally {
            good: 1,
            neutral: 1,
            bad: 1,
        };
        assert_eq!(tally.percentages(), [33.3, 33.3, 33.3]);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = summarize(&SentimentSettings::default(), &[], None);
        let cells = summary.cells();
        assert_eq!(cells[0], Cell::from("0%"));
        assert_eq!(cells[3], Cell::Empty);
        assert_eq!(cells[5], Cell::Integer(0));
        assert_eq!(cells[6], Cell::Number(0.0));
    }
}
