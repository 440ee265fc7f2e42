//! Result streams and the ordered merge
//!
//! Streams are pull-based and single-consumer. Providers hand them to the
//! router, the router hands them to the merge, and the merge owns them until
//! it is drained, fails, or is closed by the caller.

mod errors;
mod merge;
mod stream;

pub use errors::{StreamError, StreamResult};
pub use merge::OrderedMergeIterator;
pub use stream::{LimitedStream, ResultStream, SearchResults, VecStream};
