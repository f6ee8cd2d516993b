//! Domain models: request scope and store row types.

pub mod macros;
pub mod records;
pub mod scope;

pub use records::*;
pub use scope::{ExportType, ItemType, Locale, ScopeFilter, ScopeFilterBuilder, SortOrder};
