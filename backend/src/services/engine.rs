//! Engine entry points.
//!
//! [`ReportEngine`] owns the store handle, the configuration and the
//! translator, and turns `(variant name, scope)` requests into translated
//! results. Every call is an independent read-only computation; the engine
//! keeps no state between calls.
//!
//! Async callers use [`ReportEngine::compute_report`] and friends. Synchronous
//! hosts use the `*_blocking` variants, which drive the same code on a private
//! tokio runtime.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use log::debug;
use tokio::runtime::Runtime;

use crate::api::{ReportResult, Table, VariantMetadata};
use crate::config::EngineConfig;
use crate::db::repository::FullRepository;
use crate::error::{EngineResult, ReportError};
use crate::models::ScopeFilter;
use crate::services::benchmark::{self, BenchmarkPlan};
use crate::services::context::ReportContext;
use crate::services::report::ReportVariant;
use crate::services::single_insight::LanguageAnalyzer;
use crate::services::translation::Translator;

/// Source of "now" for date windows and relative times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Local wall-clock time.
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(now) => *now,
        }
    }
}

pub struct ReportEngine<R: FullRepository> {
    repo: Arc<R>,
    config: EngineConfig,
    translator: Translator,
    analyzer: Option<Arc<dyn LanguageAnalyzer>>,
    clock: Clock,
}

impl<R: FullRepository> ReportEngine<R> {
    pub fn new(repo: Arc<R>, config: EngineConfig) -> Self {
        let translator = Translator::new(&config.translations);
        Self {
            repo,
            config,
            translator,
            analyzer: None,
            clock: Clock::System,
        }
    }

    /// Enable language analysis for single-word insights.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn LanguageAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Freeze "now", for reproducible windows.
    pub fn with_fixed_now(mut self, now: NaiveDateTime) -> Self {
        self.clock = Clock::Fixed(now);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    fn context<'a>(&'a self, scope: &'a ScopeFilter) -> ReportContext<'a, R> {
        ReportContext::new(self.repo.as_ref(), scope, &self.config, self.clock.now())
            .with_analyzer(self.analyzer.as_deref())
    }

    /// Metadata of every variant, translated.
    pub fn list_variants(&self) -> Vec<VariantMetadata> {
        ReportVariant::ALL
            .iter()
            .map(|variant| self.translator.translate_metadata(variant.metadata()))
            .collect()
    }

    pub async fn compute_report(&self, variant_name: &str, scope: &ScopeFilter) -> EngineResult<ReportResult> {
        let variant: ReportVariant = variant_name.parse()?;
        debug!("compute_report: {}", variant);

        let result = variant.compute_dataset(&self.context(scope)).await?;
        debug!(
            "compute_report: {} done, {} labels, {} datasets",
            variant,
            result.labels.len(),
            result.datasets.len()
        );
        Ok(self.translator.translate_result(result))
    }

    pub async fn export_report(&self, variant_name: &str, scope: &ScopeFilter) -> EngineResult<Table> {
        let variant: ReportVariant = variant_name.parse()?;
        debug!("export_report: {}", variant);

        let table = variant.compute_export(&self.context(scope)).await?;
        debug!("export_report: {} done, {} rows", variant, table.len());
        Ok(self.translator.translate_table(table))
    }

    /// Evaluate a variant once per slot, e.g. `[("slot_1", "q-1"), ("slot_3", "q-3")]`.
    ///
    /// The variant is checked before the slots and must be benchmarkable.
    pub async fn run_benchmark<I, K, V>(
        &self,
        variant_name: &str,
        scope: &ScopeFilter,
        slots: I,
    ) -> EngineResult<Vec<ReportResult>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let variant: ReportVariant = variant_name.parse()?;
        if !variant.metadata().benchmarkable {
            return Err(ReportError::NotBenchmarkable(variant.name().to_string()));
        }
        let plan = BenchmarkPlan::parse(slots, self.config.benchmark.max_slots)?;
        debug!("run_benchmark: {} over {} slots", variant, plan.len());

        let results = benchmark::run(variant, &self.context(scope), &plan).await?;
        Ok(results
            .into_iter()
            .map(|result| self.translator.translate_result(result))
            .collect())
    }

    /// Blocking wrapper of [`compute_report`](Self::compute_report).
    pub fn compute_report_blocking(&self, variant_name: &str, scope: &ScopeFilter) -> EngineResult<ReportResult> {
        blocking_runtime()?.block_on(self.compute_report(variant_name, scope))
    }

    /// Blocking wrapper of [`export_report`](Self::export_report).
    pub fn export_report_blocking(&self, variant_name: &str, scope: &ScopeFilter) -> EngineResult<Table> {
        blocking_runtime()?.block_on(self.export_report(variant_name, scope))
    }

    /// Blocking wrapper of [`run_benchmark`](Self::run_benchmark).
    pub fn run_benchmark_blocking<I, K, V>(
        &self,
        variant_name: &str,
        scope: &ScopeFilter,
        slots: I,
    ) -> EngineResult<Vec<ReportResult>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        blocking_runtime()?.block_on(self.run_benchmark(variant_name, scope, slots))
    }
}

fn blocking_runtime() -> EngineResult<Runtime> {
    Runtime::new().map_err(|e| ReportError::Runtime(format!("Failed to create async runtime: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use chrono::NaiveDate;

    #[test]
    fn test_fixed_clock() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(Clock::Fixed(now).now(), now);
    }

    #[test]
    fn test_list_variants_translated() {
        let engine = ReportEngine::new(Arc::new(LocalRepository::new()), EngineConfig::default());
        let variants = engine.list_variants();
        assert_eq!(variants.len(), 7);
        assert_eq!(variants[0].name, "activity");
        assert_eq!(variants[0].label, "Feedback received");
        assert!(variants.iter().all(|v| !v.label.starts_with("__")));
    }

    #[test]
    fn test_unknown_variant_blocking() {
        let engine = ReportEngine::new(Arc::new(LocalRepository::new()), EngineConfig::default());
        let scope = ScopeFilter::builder(crate::api::TeamId::new(1)).build();
        let err = engine.compute_report_blocking("histogram", &scope).unwrap_err();
        assert!(matches!(err, ReportError::InvalidVariant(_)));
        assert_eq!(engine.repository().query_count(), 0);
    }
}
