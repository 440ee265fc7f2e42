//! Field catalog for contact search
//!
//! Maps abstract contact field identifiers to physical columns and value
//! codecs. The catalog is a plain lookup table built once on first use and
//! read-only afterwards, so no synchronization is needed at use time.
//!
//! Consumers:
//! - the predicate compiler (column names, codecs for filter values)
//! - the comparator factory (sort columns)
//! - fixture loading (JSON field decoding)

mod catalog;
mod codec;
mod errors;
mod field;

pub use catalog::{FieldCatalog, FieldMapping};
pub use codec::{FieldValue, ValueCodec};
pub use errors::{CatalogError, CatalogResult};
pub use field::FieldId;
