//! Ordered merge of pre-sorted streams
//!
//! # State machine
//!
//! ```text
//! Pending --prepare--> Ready --next--> Pending
//!    |
//!    +--(all drained)--> Exhausted
//!    +--(pull failed)--> Failed --next--> error once, then Ok(None)
//! ```
//!
//! Every input stream must already be sorted by the comparator given to the
//! merge. This is not checked; unsorted input yields unsorted output.
//!
//! Errors are captured while buffering, never during comparison. A failure
//! aborts the whole merge: every remaining source is closed at once and the
//! error is surfaced on the next call to `next`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::ContactRecord;
use crate::ordering::ContactComparator;

use super::errors::{StreamError, StreamResult};
use super::stream::ResultStream;

/// One input stream with a single-record lookahead
struct MergeSource {
    stream: Box<dyn ResultStream>,
    current: Option<ContactRecord>,
    closed: bool,
}

impl MergeSource {
    fn new(stream: Box<dyn ResultStream>) -> Self {
        Self {
            stream,
            current: None,
            closed: false,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.stream.close();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    Pending,
    Ready,
    Exhausted,
    Failed,
}

/// Lazily merges N sorted streams into one sorted stream
pub struct OrderedMergeIterator {
    sources: Vec<MergeSource>,
    comparator: Arc<ContactComparator>,
    state: MergeState,
    ready: Option<ContactRecord>,
    pending_error: Option<StreamError>,
}

impl OrderedMergeIterator {
    /// Takes ownership of the streams. Ties go to the earlier stream.
    pub fn new(streams: Vec<Box<dyn ResultStream>>, comparator: Arc<ContactComparator>) -> Self {
        Self {
            sources: streams.into_iter().map(MergeSource::new).collect(),
            comparator,
            state: MergeState::Pending,
            ready: None,
            pending_error: None,
        }
    }

    /// Number of sources not yet drained or closed
    pub fn open_sources(&self) -> usize {
        self.sources.len()
    }

    /// True if `next` will produce a record or the deferred error
    pub fn has_next(&mut self) -> bool {
        self.prepare();
        match self.state {
            MergeState::Ready => true,
            MergeState::Failed => self.pending_error.is_some(),
            MergeState::Pending | MergeState::Exhausted => false,
        }
    }

    /// Produces the next record in comparator order.
    ///
    /// After a source failure the error is returned once; afterwards the
    /// merge is terminal and yields `Ok(None)`.
    pub fn next(&mut self) -> StreamResult<Option<ContactRecord>> {
        self.prepare();
        match self.state {
            MergeState::Ready => {
                self.state = MergeState::Pending;
                Ok(self.ready.take())
            }
            MergeState::Failed => match self.pending_error.take() {
                Some(err) => Err(err),
                None => Ok(None),
            },
            MergeState::Pending | MergeState::Exhausted => Ok(None),
        }
    }

    /// Closes every remaining source; idempotent
    pub fn close(&mut self) {
        if !self.sources.is_empty() {
            debug!(open_sources = self.sources.len(), "MERGE_ABORTED_CLOSE");
        }
        self.close_sources();
        self.ready = None;
        if self.state != MergeState::Failed {
            self.state = MergeState::Exhausted;
        }
    }

    fn close_sources(&mut self) {
        for source in &mut self.sources {
            source.close();
        }
        self.sources.clear();
    }

    fn prepare(&mut self) {
        if self.state != MergeState::Pending {
            return;
        }

        let mut index = 0;
        while index < self.sources.len() {
            let source = &mut self.sources[index];
            if source.current.is_some() {
                index += 1;
                continue;
            }
            match source.stream.next_record() {
                Ok(Some(record)) => {
                    source.current = Some(record);
                    index += 1;
                }
                Ok(None) => {
                    source.close();
                    self.sources.remove(index);
                }
                Err(err) => {
                    warn!(
                        provider = ?err.provider().map(|p| p.as_str()),
                        error = %err,
                        "MERGE_SOURCE_FAILED"
                    );
                    self.close_sources();
                    self.pending_error = Some(err);
                    self.state = MergeState::Failed;
                    return;
                }
            }
        }

        let mut selected: Option<usize> = None;
        for (i, source) in self.sources.iter().enumerate() {
            let Some(candidate) = source.current.as_ref() else {
                continue;
            };
            let smaller = match selected.and_then(|s| self.sources[s].current.as_ref()) {
                Some(best) => self.comparator.compare(candidate, best).is_lt(),
                None => true,
            };
            if smaller {
                selected = Some(i);
            }
        }

        match selected {
            Some(i) => {
                self.ready = self.sources[i].current.take();
                self.state = MergeState::Ready;
            }
            None => self.state = MergeState::Exhausted,
        }
    }
}

impl ResultStream for OrderedMergeIterator {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        self.next()
    }

    fn close(&mut self) {
        OrderedMergeIterator::close(self)
    }
}

impl Drop for OrderedMergeIterator {
    fn drop(&mut self) {
        self.close_sources();
    }
}
