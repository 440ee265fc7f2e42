//! In-memory search provider
//!
//! Holds records in a vector and evaluates compiled predicates with the
//! `RowMatcher`. Used for directory fixtures and tests.

use std::sync::RwLock;

use crate::compiler::{PredicateCompiler, RowMatcher};
use crate::model::{ContactRecord, SearchCriteria};
use crate::ordering::ContactComparator;
use crate::stream::{ResultStream, VecStream};

use super::errors::{ProviderError, ProviderResult};
use super::provider::{ProviderFuture, ProviderId, SearchContext, SearchProvider};

pub struct InMemoryProvider {
    id: ProviderId,
    compiler: PredicateCompiler,
    records: RwLock<Vec<ContactRecord>>,
}

impl InMemoryProvider {
    /// Creates an empty provider with the default compiler
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new(id),
            compiler: PredicateCompiler::new(),
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_compiler(mut self, compiler: PredicateCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_records(self, records: impl IntoIterator<Item = ContactRecord>) -> Self {
        if let Ok(mut guard) = self.records.write() {
            guard.extend(records);
        }
        self
    }

    /// Adds one record
    pub fn insert(&self, record: ContactRecord) -> ProviderResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ProviderError::internal(self.id.clone(), "record store lock poisoned"))?;
        guard.push(record);
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(
        &self,
        criteria: &SearchCriteria,
        context: &SearchContext,
        comparator: &ContactComparator,
    ) -> ProviderResult<Box<dyn ResultStream>> {
        let predicate = self
            .compiler
            .compile(criteria, context.permissions.as_ref(), &context.principal)
            .map_err(|e| ProviderError::rejected(self.id.clone(), e))?;
        if predicate.matches_nothing() {
            return Ok(Box::new(VecStream::default()));
        }
        let matcher =
            RowMatcher::new(&predicate).map_err(|e| ProviderError::rejected(self.id.clone(), e))?;

        let mut hits: Vec<ContactRecord> = {
            let records = self
                .records
                .read()
                .map_err(|_| ProviderError::internal(self.id.clone(), "record store lock poisoned"))?;
            records.iter().filter(|r| matcher.matches(r)).cloned().collect()
        };
        comparator.sort(&mut hits);
        if let Some(limit) = criteria.limit() {
            hits.truncate(limit);
        }
        Ok(Box::new(VecStream::new(hits)))
    }
}

impl SearchProvider for InMemoryProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn execute<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
        context: &'a SearchContext,
        comparator: &'a ContactComparator,
    ) -> ProviderFuture<'a> {
        Box::pin(async move { self.search(criteria, context, comparator) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::FieldId;
    use crate::compiler::CompilationError;
    use crate::federation::ProviderErrorKind;
    use crate::model::{EffectivePermission, FolderPermissions, Principal};
    use crate::ordering::ComparatorFactory;

    fn context() -> SearchContext {
        let permissions = FolderPermissions::new().with(EffectivePermission::read_all(10, 1));
        SearchContext::new(Principal::new(1, 5), Arc::new(permissions))
    }

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new("mem").with_records([
            ContactRecord::new(1, 10, 5).in_context(1).with_text(FieldId::SUR_NAME, "Young"),
            ContactRecord::new(2, 10, 5).in_context(1).with_text(FieldId::SUR_NAME, "Adams"),
            ContactRecord::new(3, 11, 5).in_context(1).with_text(FieldId::SUR_NAME, "Baker"),
            ContactRecord::new(4, 10, 5).in_context(2).with_text(FieldId::SUR_NAME, "Cole"),
        ])
    }

    async fn ids(provider: &InMemoryProvider, criteria: SearchCriteria) -> ProviderResult<Vec<u32>> {
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();
        let mut stream = provider.execute(&criteria, &context(), &comparator).await?;
        let mut ids = Vec::new();
        while let Some(record) = stream.next_record().unwrap() {
            ids.push(record.id);
        }
        stream.close();
        Ok(ids)
    }

    #[tokio::test]
    async fn test_sorted_and_scoped() {
        let criteria = SearchCriteria::builder().match_all().build().unwrap();
        assert_eq!(ids(&provider(), criteria).await.unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_limit_applied_after_sort() {
        let criteria = SearchCriteria::builder().folder(10).limit(1).build().unwrap();
        assert_eq!(ids(&provider(), criteria).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_invalid_criteria_rejected() {
        let criteria = SearchCriteria::builder()
            .filter(FieldId(4040), "x")
            .build()
            .unwrap();
        let err = ids(&provider(), criteria).await.unwrap_err();
        assert_eq!(
            err.kind(),
            &ProviderErrorKind::Rejected(CompilationError::UnknownField(FieldId(4040)))
        );
    }

    #[test]
    fn test_insert() {
        let provider = InMemoryProvider::new("mem");
        assert!(provider.is_empty());
        provider.insert(ContactRecord::new(1, 10, 1)).unwrap();
        assert_eq!(provider.len(), 1);
    }
}
