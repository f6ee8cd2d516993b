//! Benchmark: one variant evaluated once per filter-expression slot.
//!
//! Slots are numbered from 1. Gaps in the numbering are filled with empty
//! slots so results line up with slot numbers. An empty first slot stands for
//! "everything in scope"; any other empty slot yields an empty result without
//! touching the store.

use futures::future::try_join_all;
use log::debug;

use crate::api::{FilterExpressionId, ReportResult};
use crate::db::repository::FullRepository;
use crate::error::{EngineResult, ReportError};
use crate::models::ScopeFilter;
use crate::services::context::ReportContext;
use crate::services::report::ReportVariant;

/// Prefixes accepted in front of a slot number.
const SLOT_PREFIXES: [&str; 2] = ["fql_", "slot_"];

/// Filter expression per slot, index 0 being slot 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkPlan {
    slots: Vec<Option<FilterExpressionId>>,
}

fn parse_slot_number(key: &str, max_slots: usize) -> EngineResult<usize> {
    let trimmed = key.trim();
    let digits = SLOT_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    match digits.parse::<usize>() {
        Ok(n) if (1..=max_slots).contains(&n) => Ok(n),
        _ => Err(ReportError::InvalidBenchmarkSlot(key.to_string())),
    }
}

impl BenchmarkPlan {
    /// Build a plan from raw `(key, expression)` pairs such as `("fql_2", "q-7")`.
    ///
    /// Keys may be `fql_N`, `slot_N` or a bare `N` with `1 <= N <= max_slots`.
    /// Blank values and `[]` leave the slot empty. A repeated slot keeps its
    /// last value.
    pub fn parse<I, K, V>(entries: I, max_slots: usize) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut numbered: Vec<(usize, Option<FilterExpressionId>)> = Vec::new();
        for (key, value) in entries {
            let slot = parse_slot_number(key.as_ref(), max_slots)?;
            numbered.push((slot, FilterExpressionId::parse_optional(value.as_ref())));
        }
        Ok(Self::from_slots(numbered))
    }

    /// Build a plan from slot numbers already checked against the bound.
    fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = (usize, Option<FilterExpressionId>)>,
    {
        let mut filled: Vec<Option<FilterExpressionId>> = Vec::new();
        for (slot, expression) in slots {
            if slot == 0 {
                continue;
            }
            if filled.len() < slot {
                filled.resize(slot, None);
            }
            filled[slot - 1] = expression;
        }
        Self { slots: filled }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Expressions in slot order.
    pub fn slots(&self) -> &[Option<FilterExpressionId>] {
        &self.slots
    }

    /// Scope of every slot, `None` for slots that are skipped.
    fn slot_scopes(&self, base: &ScopeFilter) -> Vec<Option<ScopeFilter>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, expression)| match (index, expression) {
                (0, None) => Some(base.with_filter_expression(None)),
                (_, None) => None,
                (_, Some(expression)) => Some(base.with_filter_expression(Some(expression.clone()))),
            })
            .collect()
    }
}

async fn run_slot<R: FullRepository>(
    variant: ReportVariant,
    ctx: &ReportContext<'_, R>,
    scope: Option<&ScopeFilter>,
) -> EngineResult<ReportResult> {
    match scope {
        Some(scope) => variant.compute_dataset(&ctx.with_scope(scope)).await,
        None => Ok(ReportResult::empty()),
    }
}

/// One result per slot, in slot order.
///
/// The first store failure aborts the whole benchmark.
pub async fn run<R: FullRepository>(
    variant: ReportVariant,
    ctx: &ReportContext<'_, R>,
    plan: &BenchmarkPlan,
) -> EngineResult<Vec<ReportResult>> {
    let scopes = plan.slot_scopes(ctx.scope);
    debug!(
        "benchmark {}: {} slots, parallel = {}",
        variant.name(),
        scopes.len(),
        ctx.config.benchmark.parallel
    );

    if ctx.config.benchmark.parallel {
        try_join_all(scopes.iter().map(|scope| run_slot(variant, ctx, scope.as_ref()))).await
    } else {
        let mut results = Vec::with_capacity(scopes.len());
        for scope in &scopes {
            results.push(run_slot(variant, ctx, scope.as_ref()).await?);
        }
        Ok(results)
    }
}
