//! Record store access.
//!
//! The engine never queries storage directly; it talks to a record store
//! through the repository traits, so backends can be swapped freely.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine (services::engine) - variant dispatch           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Variants (services::*) - aggregation and bucketing     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │  Scoped<Query>
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository) - abstract interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌──────────────────────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! - `query`: typed queries and the scope predicate every store applies
//! - `repository`: trait definitions and errors
//! - `repositories::local`: in-memory implementation for tests and development

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod query;
pub mod repositories;
pub mod repository;

pub use query::{ScopePredicate, Scoped};
pub use repositories::LocalRepository;
pub use repository::{
    ActivityRepository, AnswerRepository, ErrorContext, FeedbackRepository, FullRepository,
    GeoRepository, RepositoryError, RepositoryResult,
};
