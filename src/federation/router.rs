//! Federation router
//!
//! Splits one logical search into per-provider dispatches, runs them on a
//! bounded worker pool, and merges the resulting streams.
//!
//! # Dispatch plan
//!
//! - Scoped search: one dispatch per folder owned by a specialized provider
//!   (ascending folder id), then one default-provider dispatch for the
//!   remaining folders, if any.
//! - Unscoped search: every specialized provider in registration order with
//!   the criteria unchanged, then the default provider, unscoped.
//!
//! Streams reach the merge in plan order, regardless of which provider
//! answered first, so equal keys always resolve the same way.
//!
//! # Failure
//!
//! The first failing dispatch aborts the others. Every stream already
//! returned is closed before the error propagates.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::FieldCatalog;
use crate::compiler::CompilationError;
use crate::model::{ContactRecord, SearchCriteria};
use crate::observability::{ObservationScope, SearchMetrics};
use crate::ordering::ContactComparator;
use crate::stream::{
    LimitedStream, OrderedMergeIterator, ResultStream, SearchResults, StreamResult,
};

use super::config::RouterConfig;
use super::errors::{FederationError, FederationResult, ProviderError, ProviderResult};
use super::provider::{ProviderId, SearchContext, SearchProvider};
use super::registry::ProviderRegistry;

/// One planned provider call
#[derive(Clone)]
pub struct Dispatch {
    pub provider: Arc<dyn SearchProvider>,
    pub criteria: SearchCriteria,
}

/// Routes searches across registered providers
pub struct FederationRouter {
    registry: ProviderRegistry,
    catalog: &'static FieldCatalog,
    config: RouterConfig,
    metrics: Arc<SearchMetrics>,
}

impl FederationRouter {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            catalog: FieldCatalog::standard(),
            config: RouterConfig::default(),
            metrics: Arc::new(SearchMetrics::new()),
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a metrics registry with the caller
    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Plans the provider calls for `criteria`
    pub fn plan(&self, criteria: &SearchCriteria) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();

        if criteria.folder_scope().is_empty() {
            for provider in self.registry.specialized() {
                dispatches.push(Dispatch {
                    provider: Arc::clone(provider),
                    criteria: criteria.clone(),
                });
            }
            dispatches.push(Dispatch {
                provider: Arc::clone(self.registry.default_provider()),
                criteria: criteria.clone(),
            });
            return dispatches;
        }

        let mut remainder = Vec::new();
        for folder in criteria.folder_scope() {
            match self.registry.owner_of(*folder) {
                Some(owner) => dispatches.push(Dispatch {
                    provider: Arc::clone(owner),
                    criteria: criteria.restricted_to([*folder]),
                }),
                None => remainder.push(*folder),
            }
        }
        if !remainder.is_empty() {
            dispatches.push(Dispatch {
                provider: Arc::clone(self.registry.default_provider()),
                criteria: criteria.restricted_to(remainder),
            });
        }
        dispatches
    }

    /// Runs a federated search.
    ///
    /// # Errors
    ///
    /// - `Compilation` if the criteria reference unknown or system fields,
    ///   or a provider rejects them
    /// - `Provider` if any provider fails or times out
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        context: &SearchContext,
        comparator: &ContactComparator,
    ) -> FederationResult<SearchResults> {
        let search_id = Uuid::new_v4().to_string();
        let scope =
            ObservationScope::with_fields("FEDERATED_SEARCH", &[("search_id", search_id.as_str())]);

        if let Err(err) = self.validate(criteria) {
            self.metrics.increment_searches_rejected();
            scope.fail(err.code(), &err.to_string());
            return Err(err);
        }

        let dispatches = self.plan(criteria);
        let dispatch_count = dispatches.len();
        self.metrics.add_dispatches(dispatch_count as u64);

        let comparator = Arc::new(comparator.clone());
        let streams = match self.dispatch_all(dispatches, context, &comparator).await {
            Ok(streams) => streams,
            Err(err) => {
                let err = FederationError::from_provider(err);
                if err.is_bad_request() {
                    self.metrics.increment_searches_rejected();
                } else {
                    self.metrics.increment_searches_failed();
                }
                scope.fail(err.code(), &err.to_string());
                return Err(err);
            }
        };

        let stream_count = streams.len();
        let merged = self.combine(streams, comparator);
        let limited: Box<dyn ResultStream> = match criteria.limit() {
            Some(limit) => Box::new(LimitedStream::new(merged, limit)),
            None => merged,
        };

        self.metrics.increment_searches_executed();
        let dispatches = dispatch_count.to_string();
        let streams = stream_count.to_string();
        scope.complete_with_fields(&[
            ("dispatches", dispatches.as_str()),
            ("streams", streams.as_str()),
        ]);
        Ok(SearchResults::new(limited))
    }

    fn validate(&self, criteria: &SearchCriteria) -> FederationResult<()> {
        for field in criteria.referenced_fields() {
            let mapping = self.catalog.resolve(field).map_err(CompilationError::from)?;
            if !mapping.filterable {
                return Err(CompilationError::FieldNotFilterable(field).into());
            }
        }
        Ok(())
    }

    /// A single stream passes through; several are merged
    fn combine(
        &self,
        mut streams: Vec<Box<dyn ResultStream>>,
        comparator: Arc<ContactComparator>,
    ) -> Box<dyn ResultStream> {
        if streams.len() == 1 {
            if let Some(stream) = streams.pop() {
                return stream;
            }
        }
        self.metrics.increment_merges();
        Box::new(OrderedMergeIterator::new(streams, comparator))
    }

    async fn dispatch_all(
        &self,
        dispatches: Vec<Dispatch>,
        context: &SearchContext,
        comparator: &Arc<ContactComparator>,
    ) -> ProviderResult<Vec<Box<dyn ResultStream>>> {
        let pool = Arc::new(Semaphore::new(self.config.max_concurrent_dispatches.max(1)));
        let mut slots: Vec<Option<Box<dyn ResultStream>>> =
            dispatches.iter().map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, dispatch) in dispatches.into_iter().enumerate() {
            let pool = Arc::clone(&pool);
            let context = context.clone();
            let comparator = Arc::clone(comparator);
            let metrics = Arc::clone(&self.metrics);
            let config = self.config.clone();
            tasks.spawn(async move {
                let result = match pool.acquire_owned().await {
                    Ok(_permit) => {
                        run_dispatch(&dispatch, &context, &comparator, &config, &metrics).await
                    }
                    Err(_) => Err(ProviderError::cancelled(
                        dispatch.provider.id().clone(),
                        "dispatch pool closed",
                    )),
                };
                (index, result)
            });
        }

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(stream))) => slots[index] = Some(stream),
                Ok((_, Err(err))) => {
                    failure = Some(err);
                    break;
                }
                Err(join_err) => {
                    failure = Some(ProviderError::internal(
                        ProviderId::new("federation"),
                        format!("dispatch task failed: {}", join_err),
                    ));
                    break;
                }
            }
        }

        let Some(err) = failure else {
            return Ok(slots.into_iter().flatten().collect());
        };

        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            if let Ok((_, Ok(mut stream))) = joined {
                stream.close();
            }
        }
        for stream in slots.iter_mut().flatten() {
            stream.close();
        }
        Err(err)
    }
}

async fn run_dispatch(
    dispatch: &Dispatch,
    context: &SearchContext,
    comparator: &ContactComparator,
    config: &RouterConfig,
    metrics: &SearchMetrics,
) -> ProviderResult<Box<dyn ResultStream>> {
    let provider = &dispatch.provider;
    debug!(
        provider = %provider.id(),
        folders = ?dispatch.criteria.folder_scope(),
        "PROVIDER_DISPATCH"
    );

    let call = provider.execute(&dispatch.criteria, context, comparator);
    match tokio::time::timeout(config.provider_timeout(), call).await {
        Ok(Ok(stream)) => Ok(Box::new(AttributedStream {
            provider: provider.id().clone(),
            inner: stream,
        })),
        Ok(Err(err)) => Err(err),
        Err(_) => {
            metrics.increment_provider_timeouts();
            warn!(
                provider = %provider.id(),
                timeout_ms = config.provider_timeout_ms,
                "PROVIDER_TIMEOUT"
            );
            Err(ProviderError::timeout(
                provider.id().clone(),
                config.provider_timeout_ms,
                provider.timeout_is_retryable(),
            ))
        }
    }
}

/// Tags stream errors with the provider that produced them
struct AttributedStream {
    provider: ProviderId,
    inner: Box<dyn ResultStream>,
}

impl ResultStream for AttributedStream {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        self.inner
            .next_record()
            .map_err(|err| err.from_provider(&self.provider))
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldId;
    use crate::federation::InMemoryProvider;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(InMemoryProvider::new("db")))
            .with_provider(Arc::new(InMemoryProvider::new("gal")), [10])
            .unwrap()
            .with_provider(Arc::new(InMemoryProvider::new("ldap")), [11])
            .unwrap()
    }

    fn plan_of(criteria: SearchCriteria) -> Vec<(String, Vec<u32>)> {
        FederationRouter::new(registry())
            .plan(&criteria)
            .into_iter()
            .map(|d| {
                (
                    d.provider.id().to_string(),
                    d.criteria.folder_scope().iter().copied().collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_scoped_plan() {
        let plan = plan_of(
            SearchCriteria::builder()
                .folders([12, 11, 10, 13])
                .build()
                .unwrap(),
        );
        assert_eq!(
            plan,
            vec![
                ("gal".to_string(), vec![10]),
                ("ldap".to_string(), vec![11]),
                ("db".to_string(), vec![12, 13]),
            ]
        );
    }

    #[test]
    fn test_scoped_plan_without_remainder() {
        let plan = plan_of(SearchCriteria::builder().folder(11).build().unwrap());
        assert_eq!(plan, vec![("ldap".to_string(), vec![11])]);
    }

    #[test]
    fn test_unscoped_plan() {
        let plan = plan_of(SearchCriteria::builder().pattern("x").build().unwrap());
        assert_eq!(
            plan,
            vec![
                ("gal".to_string(), vec![]),
                ("ldap".to_string(), vec![]),
                ("db".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn test_validation_rejects_system_fields() {
        let router = FederationRouter::new(registry());
        let criteria = SearchCriteria::builder()
            .filter(FieldId::CONTEXT_ID, "1")
            .build()
            .unwrap();
        let err = router.validate(&criteria).unwrap_err();
        assert!(err.is_bad_request());
    }
}
