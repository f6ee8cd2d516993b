//! Insight report: the most mentioned words of free-text answers, plotted
//! against the satisfaction of the feedback that mention them.

use log::{debug, warn};

use crate::algorithms::{round_to, TermExtractor};
use crate::api::{BubblePoint, Cell, DataPoint, Dataset, FeedbackId, ReportResult, Table};
use crate::config::InsightSettings;
use crate::db::query::AnswersQuery;
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::{AnswerWithFeedback, QuestionType};
use crate::services::commons::{
    self, average, completion_rate, join_unique, nps_count, popular_countries,
};
use crate::services::context::ReportContext;

const RED: &str = "rgba(231,76,60,1)";
const YELLOW: &str = "rgba(241,196,15,1)";
const GREEN: &str = "rgba(46,204,113,1)";

/// Bubble x-coordinate of terms whose feedback carry no rating.
const UNRATED_RATIO: f64 = 100.0;

const EXPORT_HEADER: [&str; 9] = [
    "__term",
    "__occurrences",
    "__timePeriod",
    "__feedbackCarriersSelected",
    "__satisfactionRatio",
    "__nps",
    "__dropOutRate",
    "__completionRate",
    "__mostPopularCountry",
];

/// One mined term with the feedback behind it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TermInsight {
    pub term: String,
    pub occurrences: usize,
    /// Average over every occurrence whose feedback is rated.
    pub satisfaction_ratio: Option<f64>,
    pub feedback_ids: Vec<FeedbackId>,
    pub carrier_names: Vec<String>,
}

/// Top terms of the candidate answers, most frequent first.
pub(crate) fn compute_term_insights(
    settings: &InsightSettings,
    answers: &[AnswerWithFeedback],
) -> Vec<TermInsight> {
    let extractor = TermExtractor::new(settings.min_term_length);
    extractor
        .top_terms(answers.iter().map(|a| a.answer.value.as_str()), settings.top_terms)
        .into_iter()
        .map(|count| {
            let sources: Vec<&AnswerWithFeedback> = count.sources.iter().map(|i| &answers[*i]).collect();
            let mut feedback_ids: Vec<FeedbackId> = Vec::new();
            let mut carrier_names: Vec<String> = Vec::new();
            for answer in &sources {
                if !feedback_ids.contains(&answer.answer.feedback_id) {
                    feedback_ids.push(answer.answer.feedback_id);
                }
                if !carrier_names.contains(&answer.carrier_name) {
                    carrier_names.push(answer.carrier_name.clone());
                }
            }
            TermInsight {
                satisfaction_ratio: average(sources.iter().filter_map(|a| a.satisfaction_ratio)),
                term: count.term,
                occurrences: count.occurrences,
                feedback_ids,
                carrier_names,
            }
        })
        .collect()
}

/// Bubble radius from the share of the most mentioned term.
pub(crate) fn radius_for(occurrences: usize, max: usize) -> f64 {
    let share = if max == 0 { 0.0 } else { occurrences as f64 / max as f64 };
    match share {
        s if s < 0.2 => 25.0,
        s if s < 0.4 => 30.0,
        s if s < 0.6 => 40.0,
        s if s < 0.8 => 45.0,
        _ => 50.0,
    }
}

pub(crate) fn ratio_color(ratio: f64) -> &'static str {
    if ratio < 40.0 {
        RED
    } else if ratio < 70.0 {
        YELLOW
    } else {
        GREEN
    }
}

/// One single-point dataset per term, ordered by satisfaction.
pub(crate) fn compute_bubbles(insights: &[TermInsight]) -> Vec<Dataset> {
    let max = insights.iter().map(|t| t.occurrences).max().unwrap_or(0);
    let mut datasets: Vec<(f64, Dataset)> = insights
        .iter()
        .map(|insight| {
            let x = insight
                .satisfaction_ratio
                .map(|r| r.round())
                .unwrap_or(UNRATED_RATIO);
            let point = BubblePoint {
                x,
                y: insight.occurrences as f64,
                r: radius_for(insight.occurrences, max),
                label: insight.term.clone(),
            };
            (
                x,
                Dataset::new(
                    insight.term.clone(),
                    Some(ratio_color(x)),
                    vec![DataPoint::Bubble(point)],
                ),
            )
        })
        .collect();
    datasets.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    datasets.into_iter().map(|(_, dataset)| dataset).collect()
}

/// Candidate answers, or `None` when there are too many to mine.
async fn fetch_candidates<R: FullRepository>(
    ctx: &ReportContext<'_, R>,
) -> EngineResult<Option<Vec<AnswerWithFeedback>>> {
    let answers = ctx
        .repo
        .fetch_answers(&ctx.scope.scoped(AnswersQuery::of_types(&QuestionType::FREE_TEXT).non_empty()))
        .await?;
    let limit = ctx.config.insight.max_candidates;
    if answers.len() > limit {
        warn!(
            "insight: {} candidate answers exceed the limit of {}, skipping",
            answers.len(),
            limit
        );
        return Ok(None);
    }
    Ok(Some(answers))
}

pub async fn compute_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    let Some(answers) = fetch_candidates(ctx).await? else {
        return Ok(ReportResult::empty());
    };
    let insights = compute_term_insights(&ctx.config.insight, &answers);
    debug!("insight: {} terms from {} answers", insights.len(), answers.len());
    if insights.is_empty() {
        return Ok(ReportResult::empty());
    }

    let datasets = compute_bubbles(&insights);
    Ok(ReportResult {
        title: "__reportInsightLabel".to_string(),
        labels: datasets.iter().map(|d| d.label.clone()).collect(),
        x_axis_label: "__insightXLabel".to_string(),
        y_axis_label: Some("__insightYLabel".to_string()),
        datasets,
        summary: Vec::new(),
    })
}

/// One row per term, most frequent first.
pub async fn compute_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let mut table: Table = vec![EXPORT_HEADER.iter().map(|h| Cell::from(*h)).collect()];
    let Some(answers) = fetch_candidates(ctx).await? else {
        return Ok(table);
    };
    let insights = compute_term_insights(&ctx.config.insight, &answers);
    if insights.is_empty() {
        return Ok(table);
    }

    let time_period = commons::time_period(ctx).await?;
    let drop_out_rate = commons::drop_out_rate(ctx).await?;
    let repo = ctx.repo;
    for insight in &insights {
        let ids = &insight.feedback_ids;
        table.push(vec![
            Cell::from(insight.term.as_str()),
            Cell::from(insight.occurrences),
            Cell::from(time_period.clone()),
            Cell::from(join_unique(&insight.carrier_names)),
            Cell::from(round_to(insight.satisfaction_ratio.unwrap_or(0.0), 0)),
            Cell::from(nps_count(repo, ids).await?),
            Cell::from(drop_out_rate),
            Cell::from(completion_rate(repo, ids).await?),
            Cell::from(popular_countries(repo, ids).await?),
        ]);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnswerId, CarrierId, QuestionId};
    use crate::models::Answer;
    use chrono::NaiveDate;

    fn answer(feedback: i64, value: &str, ratio: Option<f64>) -> AnswerWithFeedback {
        AnswerWithFeedback {
            answer: Answer {
                id: AnswerId::new(feedback),
                feedback_id: FeedbackId::new(feedback),
                question_id: QuestionId::new(1),
                value: value.to_string(),
                sentiment_score: None,
                created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            },
            question_type: QuestionType::Text,
            carrier_id: CarrierId::new(1),
            carrier_name: "Checkout".to_string(),
            satisfaction_ratio: ratio,
        }
    }

    #[test]
    fn test_term_insights_average_ratio() {
        let answers = vec![
            answer(1, "Delivery was slow", Some(20.0)),
            answer(2, "slow delivery again", Some(40.0)),
            answer(3, "Lovely packaging", None),
        ];
        let insights = compute_term_insights(&InsightSettings::default(), &answers);
        assert_eq!(insights[0].term, "delivery");
        assert_eq!(insights[0].occurrences, 2);
        assert_eq!(insights[0].satisfaction_ratio, Some(30.0));
        assert_eq!(insights[0].feedback_ids, vec![FeedbackId::new(1), FeedbackId::new(2)]);

        let packaging = insights.iter().find(|t| t.term == "packaging").unwrap();
        assert_eq!(packaging.satisfaction_ratio, None);
        // Short words are never mined.
        assert!(insights.iter().all(|t| t.term != "was"));
    }

    #[test]
    fn test_radius_buckets() {
        assert_eq!(radius_for(1, 10), 25.0);
        assert_eq!(radius_for(2, 10), 30.0);
        assert_eq!(radius_for(5, 10), 40.0);
        assert_eq!(radius_for(7, 10), 45.0);
        assert_eq!(radius_for(10, 10), 50.0);
        assert_eq!(radius_for(0, 0), 25.0);
    }

    #[test]
    fn test_bubbles_sorted_by_ratio_unrated_last() {
        let answers = vec![
            answer(1, "pricing pricing", Some(90.0)),
            answer(2, "support", Some(10.0)),
            answer(3, "shipping", None),
        ];
        let insights = compute_term_insights(&InsightSettings::default(), &answers);
        let bubbles = compute_bubbles(&insights);
        let labels: Vec<&str> = bubbles.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["support", "pricing", "shipping"]);
        assert_eq!(bubbles[0].color.as_deref(), Some(RED));
        assert_eq!(bubbles[2].color.as_deref(), Some(GREEN));
        match &bubbles[1].points[0] {
            DataPoint::Bubble(b) => {
                assert_eq!(b.x, 90.0);
                assert_eq!(b.y, 2.0);
                assert_eq!(b.r, 50.0);
            }
            other => panic!("unexpected point {:?}", other),
        }
    }
}
