//! Result streams
//!
//! A `ResultStream` is a live, single-consumer resource. Whoever holds it
//! owns it and must call `close` (directly, or by dropping a wrapper that
//! closes on drop).

use std::collections::VecDeque;

use crate::model::ContactRecord;
use crate::ordering::ContactComparator;

use super::errors::StreamResult;

/// A pull-based sequence of contact records
pub trait ResultStream: Send {
    /// Pulls the next record; `Ok(None)` once exhausted
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>>;

    /// Releases underlying resources. Must be idempotent.
    fn close(&mut self);
}

impl ResultStream for Box<dyn ResultStream> {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        (**self).next_record()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// A stream over records already held in memory
#[derive(Debug, Default)]
pub struct VecStream {
    records: VecDeque<ContactRecord>,
    closed: bool,
}

impl VecStream {
    /// Streams records in the given order
    pub fn new(records: Vec<ContactRecord>) -> Self {
        Self {
            records: records.into(),
            closed: false,
        }
    }

    /// Sorts records with the comparator, then streams them
    pub fn sorted(mut records: Vec<ContactRecord>, comparator: &ContactComparator) -> Self {
        comparator.sort(&mut records);
        Self::new(records)
    }

    /// Records not yet pulled
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ResultStream for VecStream {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.records.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
        self.records.clear();
    }
}

/// Caps an inner stream at a fixed number of records
pub struct LimitedStream<S> {
    inner: S,
    remaining: usize,
}

impl<S: ResultStream> LimitedStream<S> {
    pub fn new(inner: S, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<S: ResultStream> ResultStream for LimitedStream<S> {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        match self.inner.next_record()? {
            Some(record) => {
                self.remaining -= 1;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Caller-facing result handle with `has_next`/`next` semantics.
///
/// Closes the underlying stream when dropped.
pub struct SearchResults {
    inner: Box<dyn ResultStream>,
    lookahead: Option<ContactRecord>,
    done: bool,
    closed: bool,
}

impl SearchResults {
    pub fn new(inner: Box<dyn ResultStream>) -> Self {
        Self {
            inner,
            lookahead: None,
            done: false,
            closed: false,
        }
    }

    /// True if another record is available.
    ///
    /// Pulls one record ahead; a pull failure is returned here.
    pub fn has_next(&mut self) -> StreamResult<bool> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        if self.done {
            return Ok(false);
        }
        match self.inner.next_record() {
            Ok(Some(record)) => {
                self.lookahead = Some(record);
                Ok(true)
            }
            Ok(None) => {
                self.done = true;
                Ok(false)
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    /// Next record, or `Ok(None)` when exhausted
    pub fn next(&mut self) -> StreamResult<Option<ContactRecord>> {
        if let Some(record) = self.lookahead.take() {
            return Ok(Some(record));
        }
        if self.has_next()? {
            Ok(self.lookahead.take())
        } else {
            Ok(None)
        }
    }

    /// Drains every remaining record
    pub fn collect_all(&mut self) -> StreamResult<Vec<ContactRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Closes the underlying stream; idempotent
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.done = true;
            self.lookahead = None;
            self.inner.close();
        }
    }
}

impl Iterator for SearchResults {
    type Item = StreamResult<ContactRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        SearchResults::next(self).transpose()
    }
}

impl Drop for SearchResults {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(ids: &[u32]) -> Vec<ContactRecord> {
        ids.iter().map(|id| ContactRecord::new(*id, 10, 1)).collect()
    }

    #[test]
    fn test_vec_stream_close_stops_iteration() {
        let mut stream = VecStream::new(records(&[1, 2, 3]));
        assert_eq!(stream.next_record().unwrap().map(|r| r.id), Some(1));
        stream.close();
        stream.close();
        assert!(stream.is_closed());
        assert_eq!(stream.next_record().unwrap(), None);
    }

    #[test]
    fn test_limited_stream() {
        let mut stream = LimitedStream::new(VecStream::new(records(&[1, 2, 3])), 2);
        assert!(stream.next_record().unwrap().is_some());
        assert!(stream.next_record().unwrap().is_some());
        assert!(stream.next_record().unwrap().is_none());
    }

    #[test]
    fn test_search_results_has_next_is_stable() {
        let mut results = SearchResults::new(Box::new(VecStream::new(records(&[4, 5]))));
        assert!(results.has_next().unwrap());
        assert!(results.has_next().unwrap());
        assert_eq!(results.next().unwrap().map(|r| r.id), Some(4));
        assert_eq!(results.next().unwrap().map(|r| r.id), Some(5));
        assert!(!results.has_next().unwrap());
        assert_eq!(results.next().unwrap(), None);
    }

    #[test]
    fn test_search_results_iterator() {
        let results = SearchResults::new(Box::new(VecStream::new(records(&[1, 2]))));
        let ids: Vec<u32> = results.map(|r| r.unwrap().id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
