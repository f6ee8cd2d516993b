//! # Feedback Reports
//!
//! Report computation engine for customer-feedback dashboards.
//!
//! The engine turns a request scope (team, feedback carriers, filter
//! expression, access restriction) into chart-ready datasets and export
//! tables. Storage is external: every query goes through the record store
//! traits in [`db`], and each query carries the same scope predicate.
//!
//! ## Features
//!
//! - **Time bucketing**: arbitrary date ranges become stable day or month label axes
//! - **Report variants**: activity, countries, country, country heat map,
//!   insight, sentiment and single insight
//! - **Benchmarks**: one variant evaluated side by side under several filter expressions
//! - **Exports**: row-major tables with a header row
//!
//! ## Architecture
//!
//! - [`api`]: identifiers and result types handed back to callers
//! - [`models`]: request scope and store row types
//! - [`algorithms`]: bucket planner, NPS scoring, term mining
//! - [`db`]: typed queries, repository traits and the in-memory store
//! - [`services`]: variants, benchmark orchestration, translation, engine
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use feedback_reports::{EngineConfig, LocalRepository, ReportEngine, ScopeFilter, TeamId};
//!
//! let engine = ReportEngine::new(Arc::new(LocalRepository::new()), EngineConfig::default());
//! let scope = ScopeFilter::builder(TeamId::new(1)).data_set("nps").build();
//! let report = engine.compute_report_blocking("activity", &scope)?;
//! ```

// Allow large error types - RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use api::{
    CarrierId, Cell, DataPoint, Dataset, FeedbackId, FilterExpressionId, ReportResult,
    SummaryField, Table, TeamId, UserId, VariantMetadata,
};
pub use config::EngineConfig;
pub use db::{FullRepository, LocalRepository, RepositoryError};
pub use error::{EngineResult, ReportError};
pub use models::{ScopeFilter, ScopeFilterBuilder};
pub use services::{BenchmarkPlan, LanguageAnalyzer, ReportEngine, ReportVariant};
