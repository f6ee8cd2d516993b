//! The closed set of report variants and their dispatch.

use std::fmt;
use std::str::FromStr;

use crate::api::{ReportResult, Table, VariantMetadata};
use crate::db::repository::FullRepository;
use crate::error::{EngineResult, ReportError};
use crate::services::context::ReportContext;
use crate::services::{activity, countries, heat_map, insight, sentiment, single_insight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportVariant {
    Activity,
    Countries,
    Country,
    CountryHeatMap,
    Insight,
    Sentiment,
    SingleInsight,
}

impl ReportVariant {
    /// Every variant, in listing order.
    pub const ALL: [ReportVariant; 7] = [
        ReportVariant::Activity,
        ReportVariant::Countries,
        ReportVariant::Country,
        ReportVariant::CountryHeatMap,
        ReportVariant::Insight,
        ReportVariant::Sentiment,
        ReportVariant::SingleInsight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportVariant::Activity => "activity",
            ReportVariant::Countries => "countries",
            ReportVariant::Country => "country",
            ReportVariant::CountryHeatMap => "countryHeatMap",
            ReportVariant::Insight => "insight",
            ReportVariant::Sentiment => "sentiment",
            ReportVariant::SingleInsight => "singleInsight",
        }
    }

    /// Untranslated metadata; label and description are lookup keys.
    pub fn metadata(&self) -> VariantMetadata {
        let (label, description) = match self {
            // Activity opens on its default sub-metric.
            ReportVariant::Activity => ("__reportReceivedLabel", "__reportActivityDescription"),
            ReportVariant::Countries => ("__reportCountriesLabel", "__reportCountriesDescription"),
            ReportVariant::Country => ("__reportCountryLabel", "__reportCountryDescription"),
            ReportVariant::CountryHeatMap => (
                "__reportCountryHeatMapLabel",
                "__reportCountryHeatMapDescription",
            ),
            ReportVariant::Insight => ("__reportInsightLabel", "__reportInsightDescription"),
            ReportVariant::Sentiment => ("__reportSentimentLabel", "__reportSentimentDescription"),
            ReportVariant::SingleInsight => (
                "__reportSingleInsightLabel",
                "__reportSingleInsightDescription",
            ),
        };

        VariantMetadata {
            name: self.name().to_string(),
            label: label.to_string(),
            description: description.to_string(),
            exportable: matches!(self, ReportVariant::Countries | ReportVariant::Insight),
            benchmarkable: matches!(
                self,
                ReportVariant::Activity | ReportVariant::Country | ReportVariant::Insight
            ),
            clickable: matches!(self, ReportVariant::Sentiment),
            is_percentage: false,
        }
    }

    pub async fn compute_dataset<R: FullRepository>(
        &self,
        ctx: &ReportContext<'_, R>,
    ) -> EngineResult<ReportResult> {
        match self {
            ReportVariant::Activity => activity::compute_dataset(ctx).await,
            ReportVariant::Countries => countries::compute_countries_dataset(ctx).await,
            ReportVariant::Country => countries::compute_country_dataset(ctx).await,
            ReportVariant::CountryHeatMap => heat_map::compute_dataset(ctx).await,
            ReportVariant::Insight => insight::compute_dataset(ctx).await,
            ReportVariant::Sentiment => sentiment::compute_dataset(ctx).await,
            ReportVariant::SingleInsight => single_insight::compute_dataset(ctx).await,
        }
    }

    pub async fn compute_export<R: FullRepository>(&self, ctx: &ReportContext<'_, R>) -> EngineResult<Table> {
        match self {
            ReportVariant::Activity => activity::compute_export(ctx).await,
            ReportVariant::Countries => countries::compute_countries_export(ctx).await,
            ReportVariant::Country => countries::compute_country_export(ctx).await,
            ReportVariant::CountryHeatMap => heat_map::compute_export(ctx).await,
            ReportVariant::Insight => insight::compute_export(ctx).await,
            ReportVariant::Sentiment => sentiment::compute_export(ctx).await,
            ReportVariant::SingleInsight => single_insight::compute_export(ctx).await,
        }
    }
}

/// `country-heat-map` and `country_heat_map` become `countryHeatMap`.
fn camel_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut upper_next = false;
    for c in raw.trim().chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl FromStr for ReportVariant {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = camel_case(s);
        ReportVariant::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ReportError::InvalidVariant(s.to_string()))
    }
}

impl fmt::Display for ReportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_names() {
        for raw in ["countryHeatMap", "country-heat-map", "country_heat_map", "CountryHeatMap"] {
            assert_eq!(raw.parse::<ReportVariant>().unwrap(), ReportVariant::CountryHeatMap);
        }
        assert_eq!("single-insight".parse::<ReportVariant>().unwrap(), ReportVariant::SingleInsight);
        assert_eq!(" activity ".parse::<ReportVariant>().unwrap(), ReportVariant::Activity);
    }

    #[test]
    fn test_unknown_name() {
        let err = "pie-chart".parse::<ReportVariant>().unwrap_err();
        assert!(matches!(err, ReportError::InvalidVariant(ref name) if name == "pie-chart"));
    }

    #[test]
    fn test_names_round_trip() {
        for variant in ReportVariant::ALL {
            assert_eq!(variant.name().parse::<ReportVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn test_metadata_flags() {
        let insight = ReportVariant::Insight.metadata();
        assert!(insight.exportable && insight.benchmarkable && !insight.clickable);

        let sentiment = ReportVariant::Sentiment.metadata();
        assert!(sentiment.clickable && !sentiment.benchmarkable);

        let activity = ReportVariant::Activity.metadata();
        assert_eq!(activity.label, "__reportReceivedLabel");
        assert!(activity.benchmarkable && !activity.exportable);

        assert!(ReportVariant::ALL.iter().all(|v| !v.metadata().is_percentage));
    }
}
