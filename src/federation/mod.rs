//! Federated contact search
//!
//! A logical search may span folders owned by different stores. The
//! `FederationRouter` plans one dispatch per owning provider, runs them
//! concurrently under a bound and a per-call timeout, and merges the sorted
//! streams with an `OrderedMergeIterator`.
//!
//! Providers implemented here:
//! - `InMemoryProvider`: records in memory, evaluated with `RowMatcher`
//! - `RelationalProvider`: rendered SQL against an injected `SqlConnection`

mod config;
mod errors;
mod memory;
mod provider;
mod registry;
mod relational;
mod router;

pub use config::{RouterConfig, DEFAULT_MAX_CONCURRENT_DISPATCHES, DEFAULT_PROVIDER_TIMEOUT_MS};
pub use errors::{
    FederationError, FederationResult, ProviderError, ProviderErrorKind, ProviderResult,
};
pub use memory::InMemoryProvider;
pub use provider::{ProviderFuture, ProviderId, SearchContext, SearchProvider};
pub use registry::ProviderRegistry;
pub use relational::{
    RelationalProvider, RowCursor, SqlConnection, SqlError, Statement, CONTACT_TABLE,
};
pub use router::{Dispatch, FederationRouter};
