//! Search criteria
//!
//! `SearchCriteria` is immutable once built. The builder refuses criteria that
//! restrict nothing unless the caller asked for "match all" explicitly.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::FieldId;
use crate::compiler::{CompilationError, CompileResult};

use super::{FolderId, RecordId};

/// True for the wildcard sentinel: a filter value that is blank or made of
/// `*` only, which restricts nothing
pub fn is_wildcard(value: &str) -> bool {
    value.trim().chars().all(|c| c == '*')
}

/// Optional lower/upper bounds of a range filter.
///
/// A bound that is absent, empty, or the wildcard sentinel is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeBounds {
    pub lower: Option<String>,
    pub upper: Option<String>,
}

impl RangeBounds {
    /// Creates bounds from optional raw values
    pub fn new(lower: Option<impl Into<String>>, upper: Option<impl Into<String>>) -> Self {
        Self {
            lower: lower.map(Into::into),
            upper: upper.map(Into::into),
        }
    }

    /// Lower bound, unless unbounded
    pub fn lower_bound(&self) -> Option<&str> {
        Self::effective(self.lower.as_deref())
    }

    /// Upper bound, unless unbounded
    pub fn upper_bound(&self) -> Option<&str> {
        Self::effective(self.upper.as_deref())
    }

    /// True if neither side restricts anything
    pub fn is_unbounded(&self) -> bool {
        self.lower_bound().is_none() && self.upper_bound().is_none()
    }

    fn effective(bound: Option<&str>) -> Option<&str> {
        bound.filter(|b| !is_wildcard(b))
    }
}

/// An immutable contact search specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pattern: Option<String>,
    first_letter: bool,
    per_field_filters: Vec<(FieldId, String)>,
    ranges: BTreeMap<FieldId, RangeBounds>,
    folder_scope: BTreeSet<FolderId>,
    ignore_record_id: Option<RecordId>,
    or_mode: bool,
    auto_complete: bool,
    match_all: bool,
    limit: Option<usize>,
}

impl SearchCriteria {
    /// Starts building criteria
    pub fn builder() -> CriteriaBuilder {
        CriteriaBuilder::default()
    }

    /// Free-text pattern
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Whether the pattern is a first-letter bucket
    pub fn is_first_letter(&self) -> bool {
        self.first_letter
    }

    /// Per-field filters in insertion order
    pub fn per_field_filters(&self) -> &[(FieldId, String)] {
        &self.per_field_filters
    }

    /// Range filters in field id order
    pub fn ranges(&self) -> &BTreeMap<FieldId, RangeBounds> {
        &self.ranges
    }

    /// Folder scope; empty means every folder visible to the principal
    pub fn folder_scope(&self) -> &BTreeSet<FolderId> {
        &self.folder_scope
    }

    /// Record excluded from results (duplicate checks)
    pub fn ignore_record_id(&self) -> Option<RecordId> {
        self.ignore_record_id
    }

    /// Whether sibling filters combine with OR
    pub fn is_or_mode(&self) -> bool {
        self.or_mode
    }

    /// Whether auto-complete relaxation applies
    pub fn is_auto_complete(&self) -> bool {
        self.auto_complete
    }

    /// Whether the caller deliberately asked for an unrestricted search
    pub fn is_match_all(&self) -> bool {
        self.match_all
    }

    /// Maximum number of records to return
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Field ids referenced by filters and ranges
    pub fn referenced_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.per_field_filters
            .iter()
            .map(|(field, _)| *field)
            .chain(self.ranges.keys().copied())
    }

    /// Copy of these criteria scoped to the given folders
    pub fn restricted_to(&self, folders: impl IntoIterator<Item = FolderId>) -> SearchCriteria {
        SearchCriteria {
            folder_scope: folders.into_iter().collect(),
            ..self.clone()
        }
    }
}

/// Builder for `SearchCriteria`
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    pattern: Option<String>,
    first_letter: bool,
    per_field_filters: Vec<(FieldId, String)>,
    ranges: BTreeMap<FieldId, RangeBounds>,
    folder_scope: BTreeSet<FolderId>,
    ignore_record_id: Option<RecordId>,
    or_mode: bool,
    auto_complete: bool,
    match_all: bool,
    limit: Option<usize>,
}

impl CriteriaBuilder {
    /// Sets a free-text pattern on the display field
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self.first_letter = false;
        self
    }

    /// Sets a first-letter bucket (`A`..`Z`, `0`..`9`, `#`/`.`, `*`/`all`)
    pub fn first_letter(mut self, bucket: impl Into<String>) -> Self {
        self.pattern = Some(bucket.into());
        self.first_letter = true;
        self
    }

    /// Adds a per-field filter
    pub fn filter(mut self, field: FieldId, value: impl Into<String>) -> Self {
        self.per_field_filters.push((field, value.into()));
        self
    }

    /// Adds a range filter; a second range on the same field replaces the first
    pub fn range(mut self, field: FieldId, bounds: RangeBounds) -> Self {
        self.ranges.insert(field, bounds);
        self
    }

    /// Adds a folder to the scope
    pub fn folder(mut self, folder: FolderId) -> Self {
        self.folder_scope.insert(folder);
        self
    }

    /// Adds folders to the scope
    pub fn folders(mut self, folders: impl IntoIterator<Item = FolderId>) -> Self {
        self.folder_scope.extend(folders);
        self
    }

    /// Excludes one record id
    pub fn ignore_record(mut self, id: RecordId) -> Self {
        self.ignore_record_id = Some(id);
        self
    }

    /// Combines sibling filters with OR
    pub fn or_mode(mut self, enabled: bool) -> Self {
        self.or_mode = enabled;
        self
    }

    /// Enables auto-complete mode (implies OR mode)
    pub fn auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = enabled;
        self
    }

    /// Explicitly requests an unrestricted search
    pub fn match_all(mut self) -> Self {
        self.match_all = true;
        self
    }

    /// Caps the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds the criteria.
    ///
    /// Fails if nothing restricts the search and `match_all` was not requested.
    pub fn build(self) -> CompileResult<SearchCriteria> {
        let restricted = self.pattern.is_some()
            || !self.per_field_filters.is_empty()
            || !self.ranges.is_empty()
            || !self.folder_scope.is_empty();
        if !restricted && !self.match_all {
            return Err(CompilationError::Unbounded);
        }

        Ok(SearchCriteria {
            pattern: self.pattern,
            first_letter: self.first_letter,
            per_field_filters: self.per_field_filters,
            ranges: self.ranges,
            folder_scope: self.folder_scope,
            ignore_record_id: self.ignore_record_id,
            or_mode: self.or_mode || self.auto_complete,
            auto_complete: self.auto_complete,
            match_all: self.match_all,
            limit: self.limit,
        })
    }
}
