//! The search provider seam
//!
//! A provider executes criteria against one concrete store and returns a
//! stream already sorted by the requested comparator. The router neither
//! knows nor cares what backs it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{PermissionLookup, Principal, SearchCriteria};
use crate::ordering::ContactComparator;
use crate::stream::ResultStream;

use super::errors::ProviderResult;

/// Stable provider identity, used in errors and logs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is searching, and what they may read
#[derive(Clone)]
pub struct SearchContext {
    pub principal: Principal,
    pub permissions: Arc<dyn PermissionLookup>,
}

impl SearchContext {
    pub fn new(principal: Principal, permissions: Arc<dyn PermissionLookup>) -> Self {
        Self {
            principal,
            permissions,
        }
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("principal", &self.principal)
            .field("visible_folders", &self.permissions.visible_folders())
            .finish()
    }
}

/// Future returned by `SearchProvider::execute`
pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = ProviderResult<Box<dyn ResultStream>>> + Send + 'a>>;

/// A backend able to execute contact searches
pub trait SearchProvider: Send + Sync {
    /// Provider identity
    fn id(&self) -> &ProviderId;

    /// Executes `criteria` and returns a stream sorted by `comparator`.
    ///
    /// Dropping the returned future cancels the call.
    fn execute<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
        context: &'a SearchContext,
        comparator: &'a ContactComparator,
    ) -> ProviderFuture<'a>;

    /// Whether a timeout of this provider is worth retrying
    fn timeout_is_retryable(&self) -> bool {
        true
    }
}
