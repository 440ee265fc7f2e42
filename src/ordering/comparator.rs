//! Record comparators
//!
//! A comparator orders records by one field and breaks ties by record id,
//! which makes it a strict total order over records with distinct ids. The
//! same comparator drives provider-side sorting, ORDER BY push-down, and the
//! ordered merge, so every text ordering names the store collation it agrees
//! with: code point order is `Binary`, locale order is a case and accent
//! insensitive `Locale` collation.

use std::cmp::Ordering;

use crate::catalog::{FieldCatalog, FieldId};
use crate::compiler::{Column, CompileResult};
use crate::model::ContactRecord;

use super::collation::{Collation, Tailoring};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// Store collation an ORDER BY must use to agree with the comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCollation {
    /// Code point order, case sensitive
    Binary,
    /// Locale order at primary strength, case and accent insensitive
    Locale(Tailoring),
}

/// Sort order in store terms, for ORDER BY push-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: Column,
    pub direction: SortDirection,
    /// None for non-text columns
    pub collation: Option<StoreCollation>,
    /// Always ascending
    pub tiebreak: Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Strategy {
    /// Scalar order of a non-text field
    Natural,
    /// Code point order of a text field
    Binary,
    Collated(Collation),
}

/// Orders contact records by one field, ties broken by record id ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactComparator {
    column: Column,
    tiebreak: Column,
    direction: SortDirection,
    strategy: Strategy,
}

impl ContactComparator {
    /// Field the records are ordered by
    pub fn field(&self) -> FieldId {
        self.column.field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Collation, if the comparator is locale aware
    pub fn collation(&self) -> Option<&Collation> {
        match &self.strategy {
            Strategy::Collated(collation) => Some(collation),
            _ => None,
        }
    }

    /// The equivalent store-side order
    pub fn order_spec(&self) -> OrderSpec {
        OrderSpec {
            column: self.column,
            direction: self.direction,
            collation: match &self.strategy {
                Strategy::Natural => None,
                Strategy::Binary => Some(StoreCollation::Binary),
                Strategy::Collated(collation) => {
                    Some(StoreCollation::Locale(collation.tailoring()))
                }
            },
            tiebreak: self.tiebreak,
        }
    }

    /// Compares two records.
    ///
    /// Absent values sort before present ones in ascending order. The
    /// direction applies to the field part only; the id tie-break is always
    /// ascending.
    pub fn compare(&self, a: &ContactRecord, b: &ContactRecord) -> Ordering {
        let field = self.column.field;
        let by_field = match (a.value(field), b.value(field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => match &self.strategy {
                Strategy::Natural | Strategy::Binary => x.natural_cmp(&y),
                Strategy::Collated(collation) => {
                    collation.compare(&x.projection(), &y.projection())
                }
            },
        };
        let by_field = match self.direction {
            SortDirection::Asc => by_field,
            SortDirection::Desc => by_field.reverse(),
        };
        by_field.then_with(|| a.id.cmp(&b.id))
    }

    /// Sorts records in place
    pub fn sort(&self, records: &mut [ContactRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }

    /// True if the slice is sorted under this comparator
    pub fn is_sorted(&self, records: &[ContactRecord]) -> bool {
        records
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1]) != Ordering::Greater)
    }
}

/// Builds comparators against a field catalog
#[derive(Debug, Clone, Copy)]
pub struct ComparatorFactory {
    catalog: &'static FieldCatalog,
}

impl Default for ComparatorFactory {
    fn default() -> Self {
        Self::new(FieldCatalog::standard())
    }
}

impl ComparatorFactory {
    pub fn new(catalog: &'static FieldCatalog) -> Self {
        Self { catalog }
    }

    /// Builds a comparator on `field`.
    ///
    /// With a locale a text field is compared under that locale's
    /// collation; without one, or for a non-text field, the field's natural
    /// ordering is used.
    pub fn build(
        &self,
        field: FieldId,
        direction: SortDirection,
        locale: Option<&str>,
    ) -> CompileResult<ContactComparator> {
        let mapping = self.catalog.resolve(field)?;
        let column = Column::from(mapping);
        let tiebreak = Column::from(self.catalog.resolve(FieldId::OBJECT_ID)?);
        let textual = mapping.codec.is_textual();
        let strategy = match locale {
            Some(tag) if textual => Strategy::Collated(Collation::for_locale(tag)),
            _ if textual => Strategy::Binary,
            _ => Strategy::Natural,
        };
        Ok(ContactComparator {
            column,
            tiebreak,
            direction,
            strategy,
        })
    }

    /// Default comparator: surname ascending, natural ordering
    pub fn by_sur_name(&self) -> CompileResult<ContactComparator> {
        self.build(FieldId::SUR_NAME, SortDirection::Asc, None)
    }
}
