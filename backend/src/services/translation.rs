//! Display-string resolution.
//!
//! Variants emit lookup keys prefixed with `__` wherever a human-readable
//! string goes. The engine resolves them once, when the result is assembled.

use std::collections::BTreeMap;

use crate::api::{Cell, ReportResult, Table, VariantMetadata};

const KEY_PREFIX: &str = "__";

/// Built-in English strings.
const ENGLISH: &[(&str, &str)] = &[
    // Variant names and descriptions
    ("reportActivityLabel", "Activity"),
    ("reportActivityDescription", "Feedback activity over time"),
    ("reportCountriesLabel", "Countries"),
    ("reportCountriesDescription", "Feedback received per country"),
    ("reportCountryLabel", "Country"),
    ("reportCountryDescription", "Country sending the most feedback"),
    ("reportCountryHeatMapLabel", "Country heat map"),
    ("reportCountryHeatMapDescription", "Answers aggregated per region"),
    ("reportInsightLabel", "Insight"),
    ("reportInsightDescription", "Most mentioned words and their satisfaction"),
    ("reportSentimentLabel", "Sentiment"),
    ("reportSentimentDescription", "Share of positive, neutral and negative answers"),
    ("reportSingleInsightLabel", "Single insight"),
    ("reportSingleInsightDescription", "Mentions of one word"),
    // Activity sub-metrics
    ("reportReceivedLabel", "Feedback received"),
    ("reportRatioLabel", "Satisfaction ratio"),
    ("reportNPSLabel", "NPS"),
    ("reportCompletionRateLabel", "Completion rate"),
    ("reportSentRewardLabel", "Rewards sent"),
    ("reportEngagementClickLabel", "Engagement clicks"),
    ("reportPopularCountriesLabel", "Most popular country"),
    ("reportCarrierNameLabel", "Feedback carriers"),
    ("reportPushesSentLabel", "Pushes sent"),
    ("reportPushesClickedLabel", "Pushes clicked"),
    // Axes
    ("xLabelDays", "Days"),
    ("xLabelMonths", "Months"),
    ("insightXLabel", "Satisfaction ratio"),
    ("insightYLabel", "Occurrences"),
    // Column headers
    ("month", "Month"),
    ("country", "Country"),
    ("location", "Location"),
    ("label", "Value"),
    ("total", "Total"),
    ("term", "Term"),
    ("occurrences", "Occurrences"),
    ("timePeriod", "Time period"),
    ("feedbackCarriersSelected", "Feedback carriers selected"),
    ("feedbackReceived", "Feedback received"),
    ("satisfactionRatio", "Satisfaction ratio"),
    ("nps", "NPS"),
    ("dropOutRate", "Drop-out rate"),
    ("completionRate", "Completion rate"),
    ("rewardsSent", "Rewards sent"),
    ("engagementClicked", "Engagements clicked"),
    ("mostPopularCountry", "Most popular country"),
    // Sentiment
    ("goodFeeling", "Good"),
    ("neutralFeeling", "Neutral"),
    ("badFeeling", "Bad"),
    ("good_feeling", "Good"),
    ("neutral_feeling", "Neutral"),
    ("bad_feeling", "Bad"),
    ("time_period", "Time period"),
    ("feedback_carrier_selected", "Feedback carriers selected"),
    ("feedback_analysed", "Feedback analysed"),
    ("satisfaction_ratio", "Satisfaction ratio"),
    ("drop_out_rate", "Drop-out rate"),
    ("completion_rate", "Completion rate"),
    ("rewards_sent", "Rewards sent"),
    ("engagements_clicked", "Engagements clicked"),
    ("most_popular_country", "Most popular country"),
    // Single insight
    ("sentiment", "Sentiment"),
    ("category", "Category"),
    ("syntax", "Syntax"),
    ("entity", "Entity"),
    ("mentions", "Mentions"),
    ("date_first_seen", "First seen"),
    ("date_last_seen", "Last seen"),
    ("word", "Word"),
];

/// Resolves `__key` strings against the built-in table and overrides.
#[derive(Debug, Clone)]
pub struct Translator {
    entries: BTreeMap<String, String>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

impl Translator {
    /// Built-in strings, replaced or extended by `overrides`.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut entries: BTreeMap<String, String> = ENGLISH
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        entries.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { entries }
    }

    /// Resolve one string. Strings without the prefix are returned as is;
    /// unknown keys render without it.
    pub fn translate(&self, text: &str) -> String {
        match text.strip_prefix(KEY_PREFIX) {
            Some(key) => self
                .entries
                .get(key)
                .cloned()
                .unwrap_or_else(|| key.to_string()),
            None => text.to_string(),
        }
    }

    fn translate_in_place(&self, text: &mut String) {
        if text.starts_with(KEY_PREFIX) {
            *text = self.translate(text);
        }
    }

    fn translate_cell(&self, cell: &mut Cell) {
        if let Cell::Text(text) = cell {
            self.translate_in_place(text);
        }
    }

    pub fn translate_result(&self, mut result: ReportResult) -> ReportResult {
        self.translate_in_place(&mut result.title);
        self.translate_in_place(&mut result.x_axis_label);
        if let Some(label) = result.y_axis_label.as_mut() {
            self.translate_in_place(label);
        }
        for label in &mut result.labels {
            self.translate_in_place(label);
        }
        for dataset in &mut result.datasets {
            self.translate_in_place(&mut dataset.label);
        }
        for field in &mut result.summary {
            self.translate_cell(&mut field.value);
        }
        result
    }

    pub fn translate_table(&self, mut table: Table) -> Table {
        for cell in table.iter_mut().flatten() {
            self.translate_cell(cell);
        }
        table
    }

    pub fn translate_metadata(&self, mut metadata: VariantMetadata) -> VariantMetadata {
        self.translate_in_place(&mut metadata.label);
        self.translate_in_place(&mut metadata.description);
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Dataset;

    #[test]
    fn test_translate_keys() {
        let translator = Translator::default();
        assert_eq!(translator.translate("__reportNPSLabel"), "NPS");
        assert_eq!(translator.translate("__unknownKey"), "unknownKey");
        assert_eq!(translator.translate("plain text"), "plain text");
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert("reportNPSLabel".to_string(), "Net promoter score".to_string());
        overrides.insert("custom".to_string(), "Custom".to_string());
        let translator = Translator::new(&overrides);
        assert_eq!(translator.translate("__reportNPSLabel"), "Net promoter score");
        assert_eq!(translator.translate("__custom"), "Custom");
        assert_eq!(translator.translate("__month"), "Month");
    }

    #[test]
    fn test_translate_result_fields() {
        let result = ReportResult {
            title: "__reportInsightLabel".to_string(),
            labels: vec!["delivery".to_string()],
            x_axis_label: "__insightXLabel".to_string(),
            y_axis_label: Some("__insightYLabel".to_string()),
            datasets: vec![Dataset::numeric("__reportReceivedLabel", "red", &[1.0])],
            summary: Vec::new(),
        };
        let translated = Translator::default().translate_result(result);
        assert_eq!(translated.title, "Insight");
        assert_eq!(translated.labels, vec!["delivery"]);
        assert_eq!(translated.x_axis_label, "Satisfaction ratio");
        assert_eq!(translated.y_axis_label.as_deref(), Some("Occurrences"));
        assert_eq!(translated.datasets[0].label, "Feedback received");
    }

    #[test]
    fn test_translate_table_only_touches_keys() {
        let table = vec![
            vec![Cell::from("__country"), Cell::from("__feedbackReceived")],
            vec![Cell::from("FR"), Cell::from(3usize)],
        ];
        let translated = Translator::default().translate_table(table);
        assert_eq!(translated[0], vec![Cell::from("Country"), Cell::from("Feedback received")]);
        assert_eq!(translated[1], vec![Cell::from("FR"), Cell::Integer(3)]);
    }
}
