//! Pure computations shared by the report variants.

pub mod buckets;
pub mod nps;
pub mod terms;

pub use buckets::{DateRange, Granularity, TimeBucketPlan, TimeBucketPlanner};
pub use nps::{round_to, NpsScorer, NpsTally};
pub use terms::{TermCount, TermExtractor, STOP_WORDS};
