//! Service layer: report variants and the engine that runs them.
//!
//! Each variant module exposes `compute_dataset` and `compute_export`, both
//! generic over [`FullRepository`](crate::db::repository::FullRepository) and
//! driven by a [`ReportContext`]. Pure helpers (`compute_*`) sit next to them
//! so they can be tested without a store.

pub mod activity;
pub mod benchmark;
pub mod commons;
pub mod context;
pub mod countries;
pub mod engine;
pub mod heat_map;
pub mod insight;
pub mod report;
pub mod sentiment;
pub mod single_insight;
pub mod translation;

pub use activity::ActivityMetric;
pub use benchmark::BenchmarkPlan;
pub use context::ReportContext;
pub use engine::{Clock, ReportEngine};
pub use report::ReportVariant;
pub use single_insight::{AnalyzerError, LanguageAnalyzer, WordAnalysis};
pub use translation::Translator;
