//! Engine configuration file support.
//!
//! Settings are read from a TOML file once, before any computation runs.
//! Every section and key is optional; missing values take the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EngineResult, ReportError};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub buckets: BucketSettings,
    #[serde(default)]
    pub insight: InsightSettings,
    #[serde(default)]
    pub sentiment: SentimentSettings,
    #[serde(default)]
    pub heat_map: HeatMapSettings,
    #[serde(default)]
    pub benchmark: BenchmarkSettings,
    /// Display string overrides, keyed without the `__` prefix.
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
}

/// Time bucketing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSettings {
    /// Length of the trailing window and minimum number of day labels.
    #[serde(default = "default_day_interval")]
    pub default_day_interval: i64,
    /// Spans longer than this many days are labelled by month.
    #[serde(default = "default_month_threshold_days")]
    pub month_threshold_days: i64,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            default_day_interval: default_day_interval(),
            month_threshold_days: default_month_threshold_days(),
        }
    }
}

fn default_day_interval() -> i64 {
    7
}

fn default_month_threshold_days() -> i64 {
    40
}

/// Insight term mining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSettings {
    /// Above this many candidate answers the report is skipped.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
    #[serde(default = "default_min_term_length")]
    pub min_term_length: usize,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            top_terms: default_top_terms(),
            min_term_length: default_min_term_length(),
        }
    }
}

fn default_max_candidates() -> usize {
    2000
}

fn default_top_terms() -> usize {
    15
}

fn default_min_term_length() -> usize {
    4
}

/// Sentiment bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSettings {
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            negative_threshold: default_negative_threshold(),
            positive_threshold: default_positive_threshold(),
        }
    }
}

fn default_negative_threshold() -> f64 {
    -25.0
}

fn default_positive_threshold() -> f64 {
    25.0
}

/// How heat-map answers are grouped geographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatMapGrouping {
    /// Always group by the region of the respondent's city.
    #[default]
    City,
    /// Group by city only when every answer comes from one country,
    /// by country code otherwise.
    Detect,
}

impl FromStr for HeatMapGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "city" => Ok(Self::City),
            "detect" => Ok(Self::Detect),
            other => Err(format!("Unknown heat map grouping: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMapSettings {
    #[serde(default)]
    pub grouping: HeatMapGrouping,
    /// Country reported when grouping by city without detection.
    #[serde(default = "default_country")]
    pub default_country: String,
}

impl Default for HeatMapSettings {
    fn default() -> Self {
        Self {
            grouping: HeatMapGrouping::default(),
            default_country: default_country(),
        }
    }
}

fn default_country() -> String {
    "FR".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    /// Evaluate benchmark slots concurrently.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Highest slot number a benchmark request may use.
    #[serde(default = "default_max_slots")]
    pub max_slots: usize,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            max_slots: default_max_slots(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

fn default_max_slots() -> usize {
    20
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| {
            ReportError::Configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ReportError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded report configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `reports.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> EngineResult<Self> {
        let search_paths = [
            PathBuf::from("reports.toml"),
            PathBuf::from("backend/reports.toml"),
            PathBuf::from("../reports.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ReportError::Configuration(
            "No reports.toml found in standard locations".to_string(),
        ))
    }

    fn validate(&self) -> EngineResult<()> {
        if self.buckets.default_day_interval < 1 {
            return Err(ReportError::Configuration(
                "buckets.default_day_interval must be at least 1".to_string(),
            ));
        }
        if self.buckets.month_threshold_days < 1 {
            return Err(ReportError::Configuration(
                "buckets.month_threshold_days must be at least 1".to_string(),
            ));
        }
        if self.insight.top_terms == 0 {
            return Err(ReportError::Configuration(
                "insight.top_terms must be at least 1".to_string(),
            ));
        }
        if self.insight.min_term_length == 0 {
            return Err(ReportError::Configuration(
                "insight.min_term_length must be at least 1".to_string(),
            ));
        }
        if self.benchmark.max_slots == 0 {
            return Err(ReportError::Configuration(
                "benchmark.max_slots must be at least 1".to_string(),
            ));
        }
        if self.sentiment.negative_threshold >= self.sentiment.positive_threshold {
            return Err(ReportError::Configuration(
                "sentiment.negative_threshold must be below positive_threshold".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.buckets.default_day_interval, 7);
        assert_eq!(config.buckets.month_threshold_days, 40);
        assert_eq!(config.insight.max_candidates, 2000);
        assert_eq!(config.insight.top_terms, 15);
        assert_eq!(config.insight.min_term_length, 4);
        assert_eq!(config.sentiment.negative_threshold, -25.0);
        assert_eq!(config.heat_map.grouping, HeatMapGrouping::City);
        assert_eq!(config.heat_map.default_country, "FR");
        assert!(config.benchmark.parallel);
        assert_eq!(config.benchmark.max_slots, 20);
        assert!(config.translations.is_empty());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let toml = r#"
[insight]
max_candidates = 50

[heat_map]
grouping = "detect"

[translations]
reportActivityLabel = "Activité"
"#;
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.insight.max_candidates, 50);
        assert_eq!(config.insight.top_terms, 15);
        assert_eq!(config.heat_map.grouping, HeatMapGrouping::Detect);
        assert_eq!(config.heat_map.default_country, "FR");
        assert_eq!(
            config.translations.get("reportActivityLabel").map(String::as_str),
            Some("Activité")
        );
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let toml = r#"
[sentiment]
negative_threshold = 30.0
positive_threshold = 10.0
"#;
        let err = EngineConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        for toml in [
            "[buckets]\nmonth_threshold_days = 0",
            "[insight]\ntop_terms = 0",
            "[insight]\nmin_term_length = 0",
            "[benchmark]\nmax_slots = 0",
        ] {
            let err = EngineConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, ReportError::Configuration(_)), "accepted: {}", toml);
        }
    }

    #[test]
    fn test_parse_error_is_configuration_error() {
        let err = EngineConfig::from_toml_str("[buckets\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[benchmark]\nparallel = false").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(!config.benchmark.parallel);
        assert_eq!(config.buckets.default_day_interval, 7);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_grouping_from_str() {
        assert_eq!("City".parse::<HeatMapGrouping>().unwrap(), HeatMapGrouping::City);
        assert!("region".parse::<HeatMapGrouping>().is_err());
    }
}
