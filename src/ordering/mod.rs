//! Result ordering
//!
//! `ComparatorFactory` builds `ContactComparator`s: a natural-order strategy
//! comparing typed field values, and a collated strategy comparing string
//! projections under a locale's rules. Both break ties by record id, so the
//! comparator is a strict weak ordering as the ordered merge requires.

mod collation;
mod comparator;

pub use collation::{Collation, CollationKey, Tailoring};
pub use comparator::{
    ComparatorFactory, ContactComparator, OrderSpec, SortDirection, StoreCollation,
};
