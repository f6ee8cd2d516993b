//! Benchmark orchestration against the in-memory store.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use feedback_reports::api::{FilterExpressionId, ReportResult, TeamId, UserId};
use feedback_reports::config::EngineConfig;
use feedback_reports::db::repositories::LocalRepository;
use feedback_reports::error::ReportError;
use feedback_reports::models::ScopeFilter;
use feedback_reports::services::ReportEngine;

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Three feedback: A matches the first two, B the last one.
fn seeded_repo() -> Arc<LocalRepository> {
    let repo = LocalRepository::new();
    let carrier = repo.add_carrier(TeamId::new(1), "Checkout survey", UserId::new(1));
    let f1 = repo.add_feedback(carrier, Some(80.0), true, at(27));
    let f2 = repo.add_feedback(carrier, Some(60.0), true, at(28));
    let f3 = repo.add_feedback(carrier, Some(100.0), false, at(29));
    repo.define_expression(&FilterExpressionId::new("A"), [f1, f2]);
    repo.define_expression(&FilterExpressionId::new("B"), [f3]);
    Arc::new(repo)
}

fn engine(repo: Arc<LocalRepository>, parallel: bool) -> ReportEngine<LocalRepository> {
    let mut config = EngineConfig::default();
    config.benchmark.parallel = parallel;
    ReportEngine::new(repo, config).with_fixed_now(now())
}

fn scope() -> ScopeFilter {
    ScopeFilter::builder(TeamId::new(1)).build()
}

#[tokio::test]
async fn test_gap_slot_is_empty_and_skips_store() {
    let repo = seeded_repo();
    let engine = engine(repo.clone(), false);

    let results = engine
        .run_benchmark("activity", &scope(), [("slot_1", "A"), ("slot_3", "B")])
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].title, "2");
    assert_eq!(results[1], ReportResult::empty());
    assert_eq!(results[2].title, "1");
    // One feedback query per evaluated slot.
    assert_eq!(repo.query_count(), 2);
}

#[tokio::test]
async fn test_parallel_and_sequential_agree() {
    let slots = [("fql_1", "A"), ("fql_2", ""), ("fql_3", "B")];
    let sequential = engine(seeded_repo(), false)
        .run_benchmark("country", &scope(), slots)
        .await
        .unwrap();
    let parallel = engine(seeded_repo(), true)
        .run_benchmark("country", &scope(), slots)
        .await
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[tokio::test]
async fn test_empty_first_slot_is_global() {
    let engine = engine(seeded_repo(), true);

    let results = engine
        .run_benchmark("activity", &scope(), [("slot_1", "")])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_empty());
    assert_eq!(results[0].title, "3");
}

#[tokio::test]
async fn test_first_slot_overrides_request_expression() {
    let engine = engine(seeded_repo(), true);
    let scope = ScopeFilter::builder(TeamId::new(1))
        .filter_expression(Some(FilterExpressionId::new("B")))
        .build();

    let results = engine
        .run_benchmark("activity", &scope, [("1", "[]"), ("2", "A")])
        .await
        .unwrap();
    assert_eq!(results[0].title, "3");
    assert_eq!(results[1].title, "2");
}

#[tokio::test]
async fn test_invalid_slot_key() {
    let repo = seeded_repo();
    let engine = engine(repo.clone(), true);

    let err = engine
        .run_benchmark("activity", &scope(), [("slot_0", "A")])
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidBenchmarkSlot(ref key) if key == "slot_0"));
    assert_eq!(repo.query_count(), 0);
}

#[tokio::test]
async fn test_slot_number_above_limit() {
    let repo = seeded_repo();
    let engine = engine(repo.clone(), true);
    let huge = format!("fql_{}", usize::MAX);

    for key in [huge.as_str(), "fql_100000000000", "slot_21"] {
        let err = engine
            .run_benchmark("activity", &scope(), [(key, "A")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidBenchmarkSlot(ref k) if k == key));
    }
    assert_eq!(repo.query_count(), 0);
}

#[tokio::test]
async fn test_configured_slot_limit() {
    let mut config = EngineConfig::default();
    config.benchmark.max_slots = 2;
    let engine = ReportEngine::new(seeded_repo(), config).with_fixed_now(now());

    let err = engine
        .run_benchmark("activity", &scope(), [("slot_3", "B")])
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidBenchmarkSlot(_)));

    let results = engine
        .run_benchmark("activity", &scope(), [("slot_2", "B")])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_variant_without_benchmark_support() {
    let repo = seeded_repo();
    let engine = engine(repo.clone(), true);

    for name in ["sentiment", "countries", "country-heat-map", "single-insight"] {
        let err = engine
            .run_benchmark(name, &scope(), [("slot_1", "A")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::NotBenchmarkable(_)), "{} accepted", name);
    }
    assert_eq!(repo.query_count(), 0);
}

#[tokio::test]
async fn test_unknown_variant_checked_first() {
    let engine = engine(seeded_repo(), true);
    let err = engine
        .run_benchmark("radar", &scope(), [("slot_0", "A")])
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidVariant(_)));
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let repo = seeded_repo();
    repo.set_healthy(false);
    let engine = engine(repo, true);

    let err = engine
        .run_benchmark("activity", &scope(), [("slot_1", "A"), ("slot_2", "B")])
        .await
        .unwrap_err();
    let store_error = err.store_error().expect("store error");
    assert!(store_error.is_unavailable());
}

#[test]
fn test_blocking_benchmark() {
    let engine = engine(seeded_repo(), true);
    let results = engine
        .run_benchmark_blocking("activity", &scope(), vec![("slot_2".to_string(), "B".to_string())])
        .unwrap();
    // Slot 1 was not supplied: it is filled empty, hence global.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "3");
    assert_eq!(results[1].title, "1");
}
