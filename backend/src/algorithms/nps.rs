//! Net Promoter Score.
//!
//! Answers above 8 are promoters, answers below 7 detractors; 7 and 8 are
//! passives and only count toward the respondent total.

use serde::{Deserialize, Serialize};

/// Answers strictly above this value are promoters.
pub const PROMOTER_THRESHOLD: f64 = 8.0;
/// Answers strictly below this value are detractors.
pub const DETRACTOR_THRESHOLD: f64 = 7.0;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Shared NPS scoring over promoter/detractor/respondent counts.
pub trait NpsScorer {
    fn promoters(&self) -> u64;
    fn detractors(&self) -> u64;
    fn respondents(&self) -> u64;

    /// `round(p% - d%, 2)`, 0 when there are neither promoters nor detractors.
    fn nps_score(&self) -> f64 {
        let (p, d, n) = (self.promoters(), self.detractors(), self.respondents());
        if (p == 0 && d == 0) || n == 0 {
            return 0.0;
        }
        let n = n as f64;
        round_to(p as f64 * 100.0 / n - d as f64 * 100.0 / n, 2)
    }

    /// Per-bucket variant: each share is rounded to two decimals before
    /// being scaled, so 1/3 promoters counts as 33 points.
    fn bucket_score(&self) -> f64 {
        let n = self.respondents();
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        let p = round_to(self.promoters() as f64 / n, 2) * 100.0;
        let d = round_to(self.detractors() as f64 / n, 2) * 100.0;
        round_to(p - d, 2)
    }
}

/// Running promoter/detractor tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpsTally {
    pub promoters: u64,
    pub detractors: u64,
    pub respondents: u64,
}

impl NpsTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: f64) {
        self.respondents += 1;
        if value > PROMOTER_THRESHOLD {
            self.promoters += 1;
        } else if value < DETRACTOR_THRESHOLD {
            self.detractors += 1;
        }
    }
}

impl FromIterator<f64> for NpsTally {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut tally = NpsTally::new();
        for value in iter {
            tally.record(value);
        }
        tally
    }
}

impl NpsScorer for NpsTally {
    fn promoters(&self) -> u64 {
        self.promoters
    }

    fn detractors(&self) -> u64 {
        self.detractors
    }

    fn respondents(&self) -> u64 {
        self.respondents
    }
}
