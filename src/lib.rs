//! contactsearch - federated, permission-scoped contact search
//!
//! A search is compiled once per provider into a parameterized predicate,
//! dispatched to every provider that owns part of the folder scope, and the
//! pre-sorted provider streams are merged lazily into one ordered stream.
//!
//! - `catalog`: field ids, columns and value codecs
//! - `model`: criteria, records and folder permissions
//! - `compiler`: criteria to predicate AST, SQL rendering, in-memory matching
//! - `ordering`: comparators and locale collation
//! - `stream`: result streams and the ordered merge
//! - `federation`: providers, registry and the router

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod federation;
pub mod model;
pub mod observability;
pub mod ordering;
pub mod stream;
