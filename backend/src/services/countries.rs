//! Respondent-country reports: the country ranking and the single top country.

use std::collections::BTreeMap;

use log::debug;

use crate::algorithms::round_to;
use crate::api::{Cell, Dataset, FeedbackId, ReportResult, SummaryField, Table};
use crate::db::query::MetaQuery;
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::{MetaEntry, MetaName};
use crate::services::commons::{
    self, average, carrier_names, completion_rate, engagement_count, nps_count, rewards_sent,
};
use crate::services::context::ReportContext;

const COUNTRY_COLOR: &str = "rgba(75, 186, 227, 1)";

/// Summary key carrying the detected country code.
pub const COUNTRY_FIELD: &str = "country";

const COUNTRIES_EXPORT_HEADER: [&str; 10] = [
    "__country",
    "__timePeriod",
    "__feedbackCarriersSelected",
    "__feedbackReceived",
    "__satisfactionRatio",
    "__nps",
    "__dropOutRate",
    "__completionRate",
    "__rewardsSent",
    "__engagementClicked",
];

/// Feedback reporting one country.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountryGroup {
    pub code: String,
    /// Number of country metas, one per report.
    pub count: usize,
    pub feedback_ids: Vec<FeedbackId>,
}

/// Countries by number of reports, most reported first, ties alphabetical.
pub(crate) fn compute_country_groups(metas: &[MetaEntry]) -> Vec<CountryGroup> {
    let mut by_code: BTreeMap<&str, CountryGroup> = BTreeMap::new();
    for meta in metas {
        let group = by_code.entry(meta.value.as_str()).or_insert_with(|| CountryGroup {
            code: meta.value.clone(),
            count: 0,
            feedback_ids: Vec::new(),
        });
        group.count += 1;
        if !group.feedback_ids.contains(&meta.feedback_id) {
            group.feedback_ids.push(meta.feedback_id);
        }
    }
    let mut groups: Vec<CountryGroup> = by_code.into_values().collect();
    // Stable sort keeps the alphabetical order among equal counts.
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

async fn fetch_groups<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Vec<CountryGroup>> {
    let metas = ctx
        .repo
        .fetch_metas(&ctx.scope.scoped(MetaQuery::named(MetaName::CountryCode)))
        .await?;
    Ok(compute_country_groups(&metas))
}

pub async fn compute_countries_dataset<R: FullRepository>(
    ctx: &ReportContext<'_, R>,
) -> EngineResult<ReportResult> {
    let groups = fetch_groups(ctx).await?;
    debug!("countries: {} countries", groups.len());
    if groups.is_empty() {
        return Ok(ReportResult::empty());
    }

    let counts: Vec<f64> = groups.iter().map(|g| g.count as f64).collect();
    Ok(ReportResult {
        title: "__reportCountriesLabel".to_string(),
        labels: groups.iter().map(|g| g.code.clone()).collect(),
        x_axis_label: "__country".to_string(),
        y_axis_label: Some("__feedbackReceived".to_string()),
        datasets: vec![Dataset::numeric("__reportCountriesLabel", COUNTRY_COLOR, &counts)],
        summary: Vec::new(),
    })
}

/// One summary row per country.
pub async fn compute_countries_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let groups = fetch_groups(ctx).await?;
    let time_period = commons::time_period(ctx).await?;
    let drop_out_rate = commons::drop_out_rate(ctx).await?;
    let repo = ctx.repo;

    let mut table: Table = vec![COUNTRIES_EXPORT_HEADER.iter().map(|h| Cell::from(*h)).collect()];
    for group in &groups {
        let ids = &group.feedback_ids;
        let feedbacks = repo.fetch_feedbacks_by_ids(ids).await?;
        let ratio = average(feedbacks.iter().filter_map(|f| f.satisfaction_ratio))
            .map(|avg| round_to(avg, 0))
            .unwrap_or(0.0);

        table.push(vec![
            Cell::from(group.code.as_str()),
            Cell::from(time_period.clone()),
            Cell::from(carrier_names(repo, ids).await?),
            Cell::from(ids.len()),
            Cell::from(ratio),
            Cell::from(nps_count(repo, ids).await?),
            Cell::from(drop_out_rate),
            Cell::from(completion_rate(repo, ids).await?),
            Cell::from(rewards_sent(repo, ids).await?),
            Cell::from(engagement_count(repo, ids).await?),
        ]);
    }
    debug!("countries export: {} rows", table.len() - 1);
    Ok(table)
}

/// The most reported country.
pub async fn compute_country_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    let groups = fetch_groups(ctx).await?;
    let Some(top) = groups.first() else {
        debug!("country: no country reported");
        return Ok(ReportResult::empty());
    };

    Ok(ReportResult {
        title: top.code.clone(),
        labels: vec![top.code.clone()],
        x_axis_label: "__country".to_string(),
        y_axis_label: None,
        datasets: vec![Dataset::numeric(
            "__reportCountryLabel",
            COUNTRY_COLOR,
            &[top.count as f64],
        )],
        summary: vec![SummaryField::new(COUNTRY_FIELD, top.code.as_str())],
    })
}

pub async fn compute_country_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let groups = fetch_groups(ctx).await?;
    let mut table: Table = vec![vec![Cell::from("__country"), Cell::from("__feedbackReceived")]];
    if let Some(top) = groups.first() {
        table.push(vec![Cell::from(top.code.as_str()), Cell::from(top.count)]);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn meta(feedback: i64, code: &str) -> MetaEntry {
        MetaEntry {
            feedback_id: FeedbackId::new(feedback),
            name: MetaName::CountryCode,
            value: code.to_string(),
            feedback_created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_country_groups_ranked() {
        let metas = vec![
            meta(1, "US"),
            meta(2, "FR"),
            meta(3, "FR"),
            meta(4, "DE"),
            meta(5, "US"),
            meta(6, "BE"),
        ];
        let groups = compute_country_groups(&metas);
        let codes: Vec<&str> = groups.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["FR", "US", "BE", "DE"]);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].feedback_ids, vec![FeedbackId::new(2), FeedbackId::new(3)]);
    }

    #[test]
    fn test_country_groups_empty() {
        assert!(compute_country_groups(&[]).is_empty());
    }
}
