//! Country heat map: one aggregated value per geographic region.
//!
//! The aggregation depends on what is mapped:
//!
//! | Item                           | Region value                      |
//! |--------------------------------|-----------------------------------|
//! | rating                         | average / 20, two decimals        |
//! | slider, large slider           | average, two decimals             |
//! | select, dropdown, image        | most selected option              |
//! | nps                            | NPS score                         |
//! | smiley, toggle                 | most frequent raw answer          |

use std::collections::BTreeMap;

use log::debug;

use crate::algorithms::{round_to, NpsScorer, NpsTally};
use crate::api::{Cell, DataPoint, Dataset, QuestionId, RatingId, RegionPoint, ReportResult, SummaryField, Table};
use crate::config::HeatMapGrouping;
use crate::db::query::{AnswerCountriesQuery, HeatMapItem, RegionAnswersQuery, RegionGrouping};
use crate::db::repository::FullRepository;
use crate::error::EngineResult;
use crate::models::{ItemType, QuestionOption, QuestionType, RegionAnswer};
use crate::services::commons::{average, most_frequent};
use crate::services::context::ReportContext;
use crate::services::countries::COUNTRY_FIELD;

const EXPORT_HEADER: [&str; 3] = ["__location", "__label", "__total"];

/// How answers of one region are reduced to a value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RegionAggregation {
    RatingAverage,
    Average,
    /// Option names (or urls, for images) matched inside the answer value.
    MostSelectedOption {
        options: Vec<QuestionOption>,
        match_url: bool,
    },
    Nps,
    MostFrequentValue,
}

impl RegionAggregation {
    pub(crate) fn for_question(question_type: QuestionType, options: Vec<QuestionOption>) -> Option<Self> {
        match question_type {
            QuestionType::Slider | QuestionType::LargeSlider => Some(Self::Average),
            QuestionType::Select | QuestionType::Dropdown | QuestionType::Image => {
                Some(Self::MostSelectedOption {
                    options,
                    match_url: question_type == QuestionType::Image,
                })
            }
            QuestionType::Nps => Some(Self::Nps),
            QuestionType::Smiley | QuestionType::Toggle => Some(Self::MostFrequentValue),
            _ => None,
        }
    }

    fn needs_options(question_type: QuestionType) -> bool {
        matches!(
            question_type,
            QuestionType::Select | QuestionType::Dropdown | QuestionType::Image
        )
    }
}

fn numeric_values<'a>(rows: &'a [&'a RegionAnswer]) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(|r| r.numeric_value())
}

fn most_selected_option(
    rows: &[&RegionAnswer],
    options: &[QuestionOption],
    match_url: bool,
) -> Option<(String, u64)> {
    let mut best: Option<(&QuestionOption, u64)> = None;
    for option in options {
        let needle = if match_url {
            option.url.as_deref().unwrap_or(option.name.as_str())
        } else {
            option.name.as_str()
        };
        let hits = rows.iter().filter(|r| r.value.contains(needle)).count() as u64;
        if hits == 0 {
            continue;
        }
        // Strictly greater, so the first option wins ties.
        if best.map_or(true, |(_, count)| hits > count) {
            best = Some((option, hits));
        }
    }
    best.map(|(option, hits)| (option.name.clone(), hits))
}

/// One point per region, regions sorted by name.
pub(crate) fn compute_regions(aggregation: &RegionAggregation, rows: &[RegionAnswer]) -> Vec<RegionPoint> {
    let mut by_region: BTreeMap<&str, Vec<&RegionAnswer>> = BTreeMap::new();
    for row in rows {
        by_region.entry(row.location.as_str()).or_default().push(row);
    }

    by_region
        .into_iter()
        .filter_map(|(location, rows)| {
            let total = rows.len() as u64;
            let (label, total) = match aggregation {
                RegionAggregation::RatingAverage => (
                    Cell::from(average(numeric_values(&rows)).map(|avg| round_to(avg / 20.0, 2))),
                    total,
                ),
                RegionAggregation::Average => (
                    Cell::from(average(numeric_values(&rows)).map(|avg| round_to(avg, 2))),
                    total,
                ),
                RegionAggregation::Nps => {
                    let tally: NpsTally = numeric_values(&rows).collect();
                    (Cell::from(tally.nps_score()), total)
                }
                RegionAggregation::MostSelectedOption { options, match_url } => {
                    let (name, hits) = most_selected_option(&rows, options, *match_url)?;
                    (Cell::from(name), hits)
                }
                RegionAggregation::MostFrequentValue => {
                    let (value, hits) = most_frequent(rows.iter().map(|r| r.value.as_str()))?;
                    (Cell::from(value), hits as u64)
                }
            };
            Some(RegionPoint {
                location: location.to_string(),
                label,
                total,
            })
        })
        .collect()
}

/// A resolved heat map: what was mapped, how, and where.
struct HeatMap {
    title: String,
    country: Option<String>,
    regions: Vec<RegionPoint>,
}

async fn build<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Option<HeatMap>> {
    let scope = ctx.scope;
    let ids = scope.item_ids();
    let item_type = match scope.item_type() {
        Some(ItemType::CustomField) | None => return Ok(None),
        Some(_) if ids.is_empty() => return Ok(None),
        Some(item_type) => item_type,
    };

    let (item, aggregation, title) = match item_type {
        ItemType::Ratings => {
            let rating_ids: Vec<RatingId> = ids.iter().copied().map(RatingId::new).collect();
            let Some(rating) = ctx.repo.fetch_rating(rating_ids[0]).await? else {
                return Ok(None);
            };
            (HeatMapItem::Ratings(rating_ids), RegionAggregation::RatingAverage, rating.label)
        }
        ItemType::Questions => {
            let question_ids: Vec<QuestionId> = ids.iter().copied().map(QuestionId::new).collect();
            let Some(question) = ctx.repo.fetch_question(question_ids[0]).await? else {
                return Ok(None);
            };
            let options = if RegionAggregation::needs_options(question.question_type) {
                ctx.repo.fetch_question_options(question.id).await?
            } else {
                Vec::new()
            };
            let Some(aggregation) = RegionAggregation::for_question(question.question_type, options)
            else {
                debug!("heat map: {:?} questions are not mapped", question.question_type);
                return Ok(None);
            };
            (HeatMapItem::Questions(question_ids), aggregation, question.label)
        }
        ItemType::CustomField => return Ok(None),
    };

    let (grouping, country) = match ctx.config.heat_map.grouping {
        HeatMapGrouping::City => (
            RegionGrouping::CityRegion,
            Some(ctx.config.heat_map.default_country.clone()),
        ),
        HeatMapGrouping::Detect => {
            let countries = ctx
                .repo
                .fetch_answer_countries(&scope.scoped(AnswerCountriesQuery { item: item.clone() }))
                .await?;
            match countries.as_slice() {
                [single] => (RegionGrouping::CityRegion, Some(single.clone())),
                _ => (RegionGrouping::Country, None),
            }
        }
    };

    let rows = ctx
        .repo
        .fetch_region_answers(&scope.scoped(RegionAnswersQuery { item, grouping }))
        .await?;
    let regions = compute_regions(&aggregation, &rows);
    debug!("heat map: {} regions from {} answers", regions.len(), rows.len());

    Ok(Some(HeatMap {
        title,
        country,
        regions,
    }))
}

pub async fn compute_dataset<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<ReportResult> {
    let Some(map) = build(ctx).await? else {
        return Ok(ReportResult::empty());
    };

    Ok(ReportResult {
        title: map.title,
        labels: map.regions.iter().map(|r| r.location.clone()).collect(),
        x_axis_label: "__location".to_string(),
        y_axis_label: None,
        datasets: vec![Dataset::new(
            "__reportCountryHeatMapLabel",
            None,
            map.regions.into_iter().map(DataPoint::Region).collect(),
        )],
        summary: vec![SummaryField::new(COUNTRY_FIELD, map.country)],
    })
}

pub async fn compute_export<R: FullRepository>(ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
    let mut table: Table = vec![EXPORT_HEADER.iter().map(|h| Cell::from(*h)).collect()];
    if let Some(map) = build(ctx).await? {
        table.extend(
            map.regions
                .into_iter()
                .map(|r| vec![Cell::from(r.location), r.label, Cell::from(r.total as usize)]),
        );
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FeedbackId, OptionId};

    fn row(location: &str, value: &str) -> RegionAnswer {
        RegionAnswer {
            feedback_id: FeedbackId::new(1),
            location: location.to_string(),
            value: value.to_string(),
        }
    }

    fn option(id: i64, name: &str) -> QuestionOption {
        QuestionOption {
            id: OptionId::new(id),
            question_id: QuestionId::new(1),
            name: name.to_string(),
            url: None,
        }
    }

    #[test]
    fn test_nps_per_region() {
        // A: 3 promoters, 1 detractor, 5 answers. B: two passives.
        let rows = vec![
            row("A", "9"),
            row("A", "10"),
            row("A", "9"),
            row("A", "4"),
            row("A", "7"),
            row("B", "7"),
            row("B", "8"),
        ];
        let regions = compute_regions(&RegionAggregation::Nps, &rows);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].location, "A");
        assert_eq!(regions[0].label, Cell::Number(40.0));
        assert_eq!(regions[0].total, 5);
        // Neither promoters nor detractors: score 0, not a division.
        assert_eq!(regions[1].label, Cell::Number(0.0));
        assert_eq!(regions[1].total, 2);
    }

    #[test]
    fn test_rating_average_scaled() {
        let rows = vec![row("Bretagne", "80"), row("Bretagne", "90")];
        let regions = compute_regions(&RegionAggregation::RatingAverage, &rows);
        assert_eq!(regions[0].label, Cell::Number(4.25));
    }

    #[test]
    fn test_slider_average() {
        let rows = vec![row("Occitanie", "3"), row("Occitanie", "4"), row("Occitanie", "4")];
        let regions = compute_regions(&RegionAggregation::Average, &rows);
        assert_eq!(regions[0].label, Cell::Number(3.67));
        assert_eq!(regions[0].total, 3);
    }

    #[test]
    fn test_most_selected_option_first_wins_ties() {
        let aggregation = RegionAggregation::MostSelectedOption {
            options: vec![option(1, "Red"), option(2, "Blue"), option(3, "Green")],
            match_url: false,
        };
        let rows = vec![
            row("A", "[\"Blue\"]"),
            row("A", "[\"Red\"]"),
            row("B", "[\"Green\"]"),
            row("B", "[\"Green\",\"Blue\"]"),
            row("C", "[\"Purple\"]"),
        ];
        let regions = compute_regions(&aggregation, &rows);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label, Cell::from("Red"));
        assert_eq!(regions[0].total, 1);
        assert_eq!(regions[1].label, Cell::from("Green"));
        assert_eq!(regions[1].total, 2);
    }

    #[test]
    fn test_most_frequent_value() {
        let rows = vec![row("A", "happy"), row("A", "sad"), row("A", "happy")];
        let regions = compute_regions(&RegionAggregation::MostFrequentValue, &rows);
        assert_eq!(regions[0].label, Cell::from("happy"));
        assert_eq!(regions[0].total, 2);
    }

    #[test]
    fn test_unmapped_question_types() {
        assert!(RegionAggregation::for_question(QuestionType::Text, vec![]).is_none());
        assert_eq!(
            RegionAggregation::for_question(QuestionType::LargeSlider, vec![]),
            Some(RegionAggregation::Average)
        );
    }
}
