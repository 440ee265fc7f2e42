//! In-memory predicate evaluation
//!
//! Evaluates a compiled predicate directly against `ContactRecord`s with the
//! semantics of the relational store: text comparisons are case-insensitive
//! and an absent value never satisfies a comparison.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use regex::Regex;

use crate::catalog::FieldValue;
use crate::model::ContactRecord;

use super::ast::{CharClass, CompareOp, CompiledPredicate, Expr};
use super::errors::{CompilationError, CompileResult};

/// Evaluates one compiled predicate against records
#[derive(Debug, Clone)]
pub struct RowMatcher {
    expr: Expr,
    patterns: BTreeMap<String, Regex>,
}

impl RowMatcher {
    /// Prepares a matcher, compiling every LIKE pattern once
    pub fn new(predicate: &CompiledPredicate) -> CompileResult<Self> {
        let mut patterns = BTreeMap::new();
        collect_patterns(predicate.expr(), &mut patterns)?;
        Ok(Self {
            expr: predicate.expr().clone(),
            patterns,
        })
    }

    /// True if the record satisfies the predicate
    pub fn matches(&self, record: &ContactRecord) -> bool {
        self.eval(&self.expr, record)
    }

    fn eval(&self, expr: &Expr, record: &ContactRecord) -> bool {
        match expr {
            Expr::Const(value) => *value,
            Expr::And(terms) => terms.iter().all(|t| self.eval(t, record)),
            Expr::Or(terms) => terms.iter().any(|t| self.eval(t, record)),
            Expr::Compare { column, op, value } => {
                let Some(actual) = record.value(column.field) else {
                    return false;
                };
                match compare_values(&actual, value) {
                    Some(ordering) => match op {
                        CompareOp::Eq => ordering == Ordering::Equal,
                        CompareOp::NotEq => ordering != Ordering::Equal,
                        CompareOp::Gte => ordering != Ordering::Less,
                        CompareOp::Lte => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            Expr::Like {
                column, pattern, ..
            } => match (record.value(column.field), self.patterns.get(pattern)) {
                (Some(actual), Some(regex)) => regex.is_match(&actual.projection()),
                _ => false,
            },
            Expr::In { column, values } => match record.value(column.field) {
                Some(actual) => values
                    .iter()
                    .any(|v| compare_values(&actual, v) == Some(Ordering::Equal)),
                None => false,
            },
            Expr::IsNull(column) => record.value(column.field).is_none(),
            Expr::NotEmpty(column) => record
                .value(column.field)
                .map_or(false, |v| !v.is_empty_text()),
            Expr::StartsWith {
                column,
                class,
                negated,
            } => {
                let Some(actual) = record.value(column.field) else {
                    return false;
                };
                let projected = actual.projection();
                let in_class = projected.chars().next().map_or(false, |c| match class {
                    CharClass::Letter => c.is_alphabetic(),
                    CharClass::Digit => c.is_ascii_digit(),
                });
                in_class != *negated
            }
        }
    }
}

fn collect_patterns(expr: &Expr, patterns: &mut BTreeMap<String, Regex>) -> CompileResult<()> {
    match expr {
        Expr::And(terms) | Expr::Or(terms) => {
            for term in terms {
                collect_patterns(term, patterns)?;
            }
        }
        Expr::Like { pattern, .. } if !patterns.contains_key(pattern) => {
            let regex = like_to_regex(pattern)?;
            patterns.insert(pattern.clone(), regex);
        }
        _ => {}
    }
    Ok(())
}

/// Translates a LIKE pattern (backslash escapes) to an anchored regex
fn like_to_regex(pattern: &str) -> CompileResult<Regex> {
    let mut source = String::from("(?is)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    source.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                }
            }
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| CompilationError::InvalidPattern(e.to_string()))
}

/// Orders two values the way the store would; None if they are incomparable
fn compare_values(actual: &Cow<'_, FieldValue>, expected: &FieldValue) -> Option<Ordering> {
    match (actual.as_ref(), expected) {
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldId;
    use crate::compiler::PredicateCompiler;
    use crate::model::{EffectivePermission, FolderPermissions, Principal, SearchCriteria};

    fn matcher(criteria: SearchCriteria, principal: Principal) -> RowMatcher {
        let permissions = FolderPermissions::new()
            .with(EffectivePermission::read_all(10, 1))
            .with(EffectivePermission::read_own(11, 1));
        let compiled = PredicateCompiler::new()
            .compile(&criteria, &permissions, &principal)
            .unwrap();
        RowMatcher::new(&compiled).unwrap()
    }

    #[test]
    fn test_like_translation() {
        let regex = like_to_regex("%a\\%b_").unwrap();
        assert!(regex.is_match("xxA%bz"));
        assert!(!regex.is_match("xxAbz"));
        assert!(!regex.is_match("a%b"));
    }

    #[test]
    fn test_text_filter_case_insensitive() {
        let m = matcher(
            SearchCriteria::builder()
                .folder(10)
                .filter(FieldId::SUR_NAME, "doe")
                .build()
                .unwrap(),
            Principal::new(1, 5),
        );
        let hit = ContactRecord::new(1, 10, 9)
            .in_context(1)
            .with_text(FieldId::SUR_NAME, "McDOEson");
        let miss = ContactRecord::new(2, 10, 9)
            .in_context(1)
            .with_text(FieldId::SUR_NAME, "Smith");
        let absent = ContactRecord::new(3, 10, 9).in_context(1);
        assert!(m.matches(&hit));
        assert!(!m.matches(&miss));
        assert!(!m.matches(&absent));
    }

    #[test]
    fn test_tenant_and_folder_enforced() {
        let m = matcher(
            SearchCriteria::builder().folders([10, 11]).build().unwrap(),
            Principal::new(1, 5),
        );
        assert!(m.matches(&ContactRecord::new(1, 10, 9).in_context(1)));
        assert!(!m.matches(&ContactRecord::new(2, 10, 9).in_context(2)));
        assert!(!m.matches(&ContactRecord::new(3, 11, 9).in_context(1)));
        assert!(m.matches(&ContactRecord::new(4, 11, 5).in_context(1)));
        assert!(!m.matches(&ContactRecord::new(5, 12, 5).in_context(1)));
    }

    #[test]
    fn test_private_records_visible_to_creator_only() {
        let criteria = SearchCriteria::builder().folder(10).build().unwrap();
        let record = ContactRecord::new(1, 10, 5).in_context(1).private();
        assert!(matcher(criteria.clone(), Principal::new(1, 5)).matches(&record));
        assert!(!matcher(criteria, Principal::new(1, 6)).matches(&record));
    }

    #[test]
    fn test_non_letter_bucket() {
        let m = matcher(
            SearchCriteria::builder()
                .folder(10)
                .first_letter("#")
                .build()
                .unwrap(),
            Principal::new(1, 5),
        );
        let digit = ContactRecord::new(1, 10, 5)
            .in_context(1)
            .with_text(FieldId::SUR_NAME, "3M");
        let letter = ContactRecord::new(2, 10, 5)
            .in_context(1)
            .with_text(FieldId::SUR_NAME, "Émile");
        assert!(m.matches(&digit));
        assert!(!m.matches(&letter));
    }
}
