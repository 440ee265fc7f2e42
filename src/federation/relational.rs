//! Relational search provider
//!
//! Renders one `SELECT` per search with the MySQL renderer and opens it on a
//! blocking task through an injected connection. The store sorts; the
//! ORDER BY clause is derived from the same comparator the merge uses. Rows
//! are read from the open cursor as the stream is pulled.

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::FieldValue;
use crate::compiler::{MySqlRenderer, PredicateCompiler, Renderer};
use crate::model::{ContactRecord, SearchCriteria};
use crate::ordering::ContactComparator;
use crate::stream::{ResultStream, StreamError, StreamResult, VecStream};

use super::errors::{ProviderError, ProviderResult};
use super::provider::{ProviderFuture, ProviderId, SearchContext, SearchProvider};

/// Contact table queried by the provider
pub const CONTACT_TABLE: &str = "prg_contacts";

/// A parameterized SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// Failure reported by a SQL connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SqlError {
    pub message: String,
    /// Deadlocks, lost connections and the like
    pub transient: bool,
}

/// An open result set, read one row at a time
pub trait RowCursor: Send {
    /// Reads and hydrates the next row; `Ok(None)` once exhausted
    fn next_row(&mut self) -> Result<Option<ContactRecord>, SqlError>;

    /// Releases the result set and the connection behind it
    fn close(&mut self);
}

/// Blocking connection to the relational store
pub trait SqlConnection: Send + Sync + 'static {
    /// Executes a query and returns a cursor positioned before the first row
    fn query(&self, statement: &Statement) -> Result<Box<dyn RowCursor>, SqlError>;
}

/// Result stream reading straight from a store cursor.
///
/// The cursor is released on exhaustion, on the first error, on `close`, or
/// on drop, whichever comes first.
struct CursorStream {
    provider: ProviderId,
    cursor: Option<Box<dyn RowCursor>>,
}

impl ResultStream for CursorStream {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.next_row() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(e) => {
                self.close();
                let err = if e.transient {
                    StreamError::new(e.message)
                } else {
                    StreamError::fatal(e.message)
                };
                Err(err.from_provider(&self.provider))
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

impl Drop for CursorStream {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct RelationalProvider {
    id: ProviderId,
    compiler: PredicateCompiler,
    renderer: MySqlRenderer,
    connection: Arc<dyn SqlConnection>,
}

impl RelationalProvider {
    pub fn new(id: impl Into<String>, connection: Arc<dyn SqlConnection>) -> Self {
        Self {
            id: ProviderId::new(id),
            compiler: PredicateCompiler::new(),
            renderer: MySqlRenderer::default(),
            connection,
        }
    }

    pub fn with_compiler(mut self, compiler: PredicateCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Builds the statement for a search without running it.
    ///
    /// Returns None if the predicate can be shown to select nothing.
    pub fn build_statement(
        &self,
        criteria: &SearchCriteria,
        context: &SearchContext,
        comparator: &ContactComparator,
    ) -> ProviderResult<Option<Statement>> {
        let predicate = self
            .compiler
            .compile(criteria, context.permissions.as_ref(), &context.principal)
            .map_err(|e| ProviderError::rejected(self.id.clone(), e))?;
        if predicate.matches_nothing() {
            return Ok(None);
        }

        let alias = self.renderer.alias();
        let columns = self
            .compiler
            .catalog()
            .iter()
            .map(|m| format!("{}.{}", alias, m.column))
            .collect::<Vec<_>>()
            .join(", ");
        let rendered = predicate.render_with(&self.renderer);

        let mut sql = format!(
            "SELECT {} FROM {} AS {} WHERE {} ORDER BY {}",
            columns,
            CONTACT_TABLE,
            alias,
            rendered.sql,
            self.renderer.render_order(&comparator.order_spec())
        );
        let mut params = rendered.params;
        if let Some(limit) = criteria.limit() {
            sql.push_str(" LIMIT ?");
            params.push(FieldValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        Ok(Some(Statement { sql, params }))
    }
}

impl SearchProvider for RelationalProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn execute<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
        context: &'a SearchContext,
        comparator: &'a ContactComparator,
    ) -> ProviderFuture<'a> {
        Box::pin(async move {
            let Some(statement) = self.build_statement(criteria, context, comparator)? else {
                return Ok(Box::new(VecStream::default()) as Box<dyn ResultStream>);
            };

            let connection = Arc::clone(&self.connection);
            let cursor = tokio::task::spawn_blocking(move || connection.query(&statement))
                .await
                .map_err(|e| ProviderError::internal(self.id.clone(), e.to_string()))?
                .map_err(|e| ProviderError::execution(self.id.clone(), e.message, e.transient))?;

            Ok(Box::new(CursorStream {
                provider: self.id.clone(),
                cursor: Some(cursor),
            }) as Box<dyn ResultStream>)
        })
    }

    fn timeout_is_retryable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::catalog::FieldId;
    use crate::model::{EffectivePermission, FolderPermissions, Principal};
    use crate::ordering::{ComparatorFactory, SortDirection};
    use crate::stream::OrderedMergeIterator;

    /// Cursor over fixed rows, failing once `fail_at` rows were read
    struct VecCursor {
        rows: VecDeque<ContactRecord>,
        fail_at: Option<usize>,
        read: usize,
        closes: Arc<AtomicUsize>,
    }

    impl RowCursor for VecCursor {
        fn next_row(&mut self) -> Result<Option<ContactRecord>, SqlError> {
            if self.fail_at == Some(self.read) {
                return Err(SqlError {
                    message: "Lost connection to server during query".into(),
                    transient: false,
                });
            }
            self.read += 1;
            Ok(self.rows.pop_front())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingConnection {
        statements: Mutex<Vec<Statement>>,
        rows: Vec<ContactRecord>,
        fail: bool,
        fail_at: Option<usize>,
        closes: Arc<AtomicUsize>,
    }

    impl RecordingConnection {
        fn with_rows(rows: Vec<ContactRecord>) -> Self {
            Self {
                rows,
                ..Default::default()
            }
        }

        /// Orders rows by surname the way the store would under the
        /// statement's ORDER BY collation
        fn store_order(sql: &str, rows: &mut [ContactRecord]) {
            let sur_name = |r: &ContactRecord| r.text(FieldId::SUR_NAME).unwrap_or_default().to_string();
            if sql.contains("COLLATE utf8mb4_bin ASC") {
                rows.sort_by(|a, b| sur_name(a).cmp(&sur_name(b)).then(a.id.cmp(&b.id)));
            } else if sql.contains("COLLATE utf8mb4_unicode_ci ASC") {
                rows.sort_by(|a, b| {
                    sur_name(a)
                        .to_lowercase()
                        .cmp(&sur_name(b).to_lowercase())
                        .then(a.id.cmp(&b.id))
                });
            } else {
                panic!("surname order without a known collation: {}", sql);
            }
        }
    }

    impl SqlConnection for RecordingConnection {
        fn query(&self, statement: &Statement) -> Result<Box<dyn RowCursor>, SqlError> {
            self.statements.lock().unwrap().push(statement.clone());
            if self.fail {
                return Err(SqlError {
                    message: "Deadlock found".into(),
                    transient: true,
                });
            }
            let mut rows = if self.rows.is_empty() {
                vec![ContactRecord::new(1, 10, 5).in_context(1)]
            } else {
                self.rows.clone()
            };
            Self::store_order(&statement.sql, &mut rows);
            Ok(Box::new(VecCursor {
                rows: rows.into(),
                fail_at: self.fail_at,
                read: 0,
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    fn person(id: u32, sur_name: &str) -> ContactRecord {
        ContactRecord::new(id, 10, 5)
            .in_context(1)
            .with_text(FieldId::SUR_NAME, sur_name)
    }

    fn context() -> SearchContext {
        let permissions = FolderPermissions::new()
            .with(EffectivePermission::read_all(10, 1))
            .with(EffectivePermission::no_access(12, 1));
        SearchContext::new(Principal::new(1, 5), Arc::new(permissions))
    }

    #[test]
    fn test_statement_shape() {
        let provider = RelationalProvider::new("db", Arc::new(RecordingConnection::default()));
        let criteria = SearchCriteria::builder()
            .folder(10)
            .filter(FieldId::SUR_NAME, "o'brien")
            .limit(25)
            .build()
            .unwrap();
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();
        let statement = provider
            .build_statement(&criteria, &context(), &comparator)
            .unwrap()
            .unwrap();

        assert!(statement.sql.starts_with("SELECT co.cid, co.intfield01"));
        assert!(statement.sql.contains(" FROM prg_contacts AS co WHERE co.cid = ?"));
        assert!(statement
            .sql
            .ends_with("ORDER BY co.field02 COLLATE utf8mb4_bin ASC, co.intfield01 ASC LIMIT ?"));
        assert!(!statement.sql.contains("o'brien"));
        assert_eq!(statement.sql.matches('?').count(), statement.params.len());
        assert_eq!(statement.params.last(), Some(&FieldValue::Integer(25)));
    }

    #[test]
    fn test_empty_scope_skips_store() {
        let provider = RelationalProvider::new("db", Arc::new(RecordingConnection::default()));
        let criteria = SearchCriteria::builder().folder(12).build().unwrap();
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();
        assert_eq!(
            provider.build_statement(&criteria, &context(), &comparator).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_execute_runs_statement() {
        let connection = Arc::new(RecordingConnection::default());
        let provider = RelationalProvider::new("db", connection.clone());
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();

        let mut stream = provider.execute(&criteria, &context(), &comparator).await.unwrap();
        assert_eq!(stream.next_record().unwrap().map(|r| r.id), Some(1));
        assert_eq!(connection.statements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_transience() {
        let connection = Arc::new(RecordingConnection {
            fail: true,
            ..Default::default()
        });
        let provider = RelationalProvider::new("db", connection);
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();

        let err = match provider.execute(&criteria, &context(), &comparator).await {
            Ok(_) => panic!("store failure must surface"),
            Err(err) => err,
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), "CONTACT_PROVIDER_FAILED");
        assert_eq!(err.provider().as_str(), "db");
    }

    #[tokio::test]
    async fn test_close_releases_cursor_once() {
        let connection = Arc::new(RecordingConnection::with_rows(vec![
            person(1, "Abel"),
            person(2, "Baker"),
        ]));
        let provider = RelationalProvider::new("db", connection.clone());
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();

        let mut stream = provider.execute(&criteria, &context(), &comparator).await.unwrap();
        assert_eq!(stream.next_record().unwrap().map(|r| r.id), Some(1));
        assert_eq!(connection.closes.load(Ordering::SeqCst), 0);

        stream.close();
        stream.close();
        assert_eq!(stream.next_record().unwrap(), None);
        drop(stream);
        assert_eq!(connection.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cursor_released_on_exhaustion_and_error() {
        let comparator = ComparatorFactory::default().by_sur_name().unwrap();
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();

        let drained = Arc::new(RecordingConnection::with_rows(vec![person(1, "Abel")]));
        let provider = RelationalProvider::new("db", drained.clone());
        let mut stream = provider.execute(&criteria, &context(), &comparator).await.unwrap();
        assert!(stream.next_record().unwrap().is_some());
        assert_eq!(stream.next_record().unwrap(), None);
        assert_eq!(drained.closes.load(Ordering::SeqCst), 1);
        drop(stream);
        assert_eq!(drained.closes.load(Ordering::SeqCst), 1);

        let broken = Arc::new(RecordingConnection {
            fail_at: Some(1),
            ..RecordingConnection::with_rows(vec![person(1, "Abel"), person(2, "Baker")])
        });
        let provider = RelationalProvider::new("db", broken.clone());
        let mut stream = provider.execute(&criteria, &context(), &comparator).await.unwrap();
        assert!(stream.next_record().unwrap().is_some());
        let err = stream.next_record().unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.provider().map(|p| p.as_str()), Some("db"));
        assert_eq!(broken.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_order_merges_with_memory_order() {
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();
        for locale in [None, Some("en")] {
            let comparator = ComparatorFactory::default()
                .build(FieldId::SUR_NAME, SortDirection::Asc, locale)
                .unwrap();
            let connection = Arc::new(RecordingConnection::with_rows(vec![
                person(1, "Zed"),
                person(2, "adams"),
                person(3, "Adams"),
                person(4, "baker"),
            ]));
            let provider = RelationalProvider::new("db", connection);
            let relational = provider.execute(&criteria, &context(), &comparator).await.unwrap();
            let memory = VecStream::sorted(
                vec![person(5, "ADAMS"), person(6, "Young"), person(7, "abel")],
                &comparator,
            );

            let mut merge = OrderedMergeIterator::new(
                vec![relational, Box::new(memory) as Box<dyn ResultStream>],
                Arc::new(comparator.clone()),
            );
            let mut merged = Vec::new();
            while let Some(record) = merge.next().unwrap() {
                merged.push(record);
            }
            assert_eq!(merged.len(), 7);
            assert!(comparator.is_sorted(&merged), "locale {:?}", locale);
        }
    }
}
