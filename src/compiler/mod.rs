//! Predicate compiler for contact search
//!
//! Turns `SearchCriteria` plus the caller's folder permissions into a
//! `CompiledPredicate`: a structured predicate AST together with its rendered
//! expression text and the ordered bind values.
//!
//! # Design Principles
//!
//! - Pure: compiling is a function of (criteria, permissions, principal)
//! - Deterministic: same inputs → byte-identical expression and binds
//! - Injection-safe: user input only ever reaches the store as a bind value
//! - Immutable output: nothing is accumulated on the compiler instance
//!
//! # Term order (outer conjunction)
//!
//! 1. Tenant equality
//! 2. Single-folder scope (with creator restriction for read-own folders)
//! 3. First-letter bucket
//! 4. Filter group (pattern, per-field filters, ranges)
//! 5. Multi-folder scope partitions
//! 6. Ignored record, auto-complete channel requirement
//! 7. Private flag visibility
//! 8. Context administrator exclusion (policy)

mod ast;
mod compiler;
mod errors;
mod letter;
mod matcher;
mod options;
mod render;

pub use ast::{CharClass, Column, CompareOp, CompiledPredicate, Expr};
pub use compiler::PredicateCompiler;
pub use errors::{CompilationError, CompileResult};
pub use letter::{escape_like, LetterBucket};
pub use matcher::RowMatcher;
pub use options::{CompilerOptions, EmptyScopePolicy};
pub use render::{MySqlRenderer, RenderedSql, Renderer};
