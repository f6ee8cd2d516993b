//! Per-computation inputs shared by every variant.

use chrono::{NaiveDate, NaiveDateTime};

use crate::algorithms::{DateRange, TimeBucketPlan, TimeBucketPlanner};
use crate::config::EngineConfig;
use crate::db::repository::FullRepository;
use crate::models::ScopeFilter;
use crate::services::single_insight::LanguageAnalyzer;

/// Everything one variant invocation reads.
///
/// Built by the engine for each request (and for each benchmark slot); never
/// mutated while a computation runs.
pub struct ReportContext<'a, R: FullRepository> {
    pub repo: &'a R,
    pub scope: &'a ScopeFilter,
    pub config: &'a EngineConfig,
    /// "Now" as seen by this computation.
    pub now: NaiveDateTime,
    pub analyzer: Option<&'a dyn LanguageAnalyzer>,
}

impl<'a, R: FullRepository> ReportContext<'a, R> {
    pub fn new(repo: &'a R, scope: &'a ScopeFilter, config: &'a EngineConfig, now: NaiveDateTime) -> Self {
        Self {
            repo,
            scope,
            config,
            now,
            analyzer: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Option<&'a dyn LanguageAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Same inputs under another scope.
    pub fn with_scope<'s>(&self, scope: &'s ScopeFilter) -> ReportContext<'s, R>
    where
        'a: 's,
    {
        ReportContext {
            repo: self.repo,
            scope,
            config: self.config,
            now: self.now,
            analyzer: self.analyzer,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Label axis for `range`, in the scope's locale.
    pub fn plan(&self, range: Option<DateRange>) -> TimeBucketPlan {
        TimeBucketPlanner::new(&self.config.buckets, self.scope.locale()).plan(range, self.today())
    }
}
