//! Ordered Merge Tests
//!
//! Tests for merge invariants:
//! - Output is sorted and is exactly the union of the inputs
//! - Every source is closed exactly once, however the merge ends
//! - A single source passes through unchanged
//! - A source failure surfaces once, after the records already ordered

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contactsearch::catalog::FieldId;
use contactsearch::model::ContactRecord;
use contactsearch::ordering::{ComparatorFactory, ContactComparator, SortDirection};
use contactsearch::stream::{OrderedMergeIterator, ResultStream, StreamError, StreamResult, VecStream};
use proptest::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

/// Counts `close` calls and fails after `fail_after` records, if set
struct CountingStream {
    inner: VecStream,
    closes: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    yielded: usize,
}

impl CountingStream {
    fn boxed(records: Vec<ContactRecord>, closes: &Arc<AtomicUsize>) -> Box<dyn ResultStream> {
        Box::new(Self {
            inner: VecStream::new(records),
            closes: Arc::clone(closes),
            fail_after: None,
            yielded: 0,
        })
    }

    fn failing(
        records: Vec<ContactRecord>,
        fail_after: usize,
        closes: &Arc<AtomicUsize>,
    ) -> Box<dyn ResultStream> {
        Box::new(Self {
            inner: VecStream::new(records),
            closes: Arc::clone(closes),
            fail_after: Some(fail_after),
            yielded: 0,
        })
    }
}

impl ResultStream for CountingStream {
    fn next_record(&mut self) -> StreamResult<Option<ContactRecord>> {
        if self.fail_after == Some(self.yielded) {
            return Err(StreamError::new("backend went away"));
        }
        self.yielded += 1;
        self.inner.next_record()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

fn comparator(direction: SortDirection, locale: Option<&str>) -> ContactComparator {
    ComparatorFactory::default()
        .build(FieldId::SUR_NAME, direction, locale)
        .unwrap()
}

fn person(id: u32, sur_name: Option<&str>) -> ContactRecord {
    let record = ContactRecord::new(id, 10, 1);
    match sur_name {
        Some(name) => record.with_text(FieldId::SUR_NAME, name),
        None => record,
    }
}

fn drain(merge: &mut OrderedMergeIterator) -> Vec<ContactRecord> {
    let mut out = Vec::new();
    while let Some(record) = merge.next().unwrap() {
        out.push(record);
    }
    out
}

/// Splits generated names into sorted per-source batches with unique ids
fn sources(
    batches: Vec<Vec<Option<String>>>,
    comparator: &ContactComparator,
) -> (Vec<Vec<ContactRecord>>, Vec<ContactRecord>) {
    let mut next_id = 1;
    let mut all = Vec::new();
    let sorted_batches = batches
        .into_iter()
        .map(|names| {
            let mut batch: Vec<ContactRecord> = names
                .iter()
                .map(|name| {
                    let record = person(next_id, name.as_deref());
                    next_id += 1;
                    record
                })
                .collect();
            comparator.sort(&mut batch);
            all.extend(batch.iter().cloned());
            batch
        })
        .collect();
    comparator.sort(&mut all);
    (sorted_batches, all)
}

fn arb_name() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        6 => "[a-cA-Cäöå]{0,3}".prop_map(Some),
    ]
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn arb_locale() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("de")), Just(Some("sv")), Just(Some("en"))]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn merge_output_is_sorted_union(
        batches in prop::collection::vec(prop::collection::vec(arb_name(), 0..12), 0..6),
        direction in arb_direction(),
        locale in arb_locale(),
    ) {
        let comparator = comparator(direction, locale);
        let (batches, expected) = sources(batches, &comparator);
        let closes = Arc::new(AtomicUsize::new(0));
        let count = batches.len();

        let streams = batches
            .into_iter()
            .map(|batch| CountingStream::boxed(batch, &closes))
            .collect();
        let mut merge = OrderedMergeIterator::new(streams, Arc::new(comparator.clone()));
        let merged = drain(&mut merge);

        prop_assert!(comparator.is_sorted(&merged));
        prop_assert_eq!(merged, expected);
        drop(merge);
        prop_assert_eq!(closes.load(Ordering::SeqCst), count);
    }

    #[test]
    fn abandoned_merge_closes_each_source_once(
        batches in prop::collection::vec(prop::collection::vec(arb_name(), 0..8), 1..6),
        take in 0usize..10,
    ) {
        let comparator = comparator(SortDirection::Asc, None);
        let (batches, _) = sources(batches, &comparator);
        let closes = Arc::new(AtomicUsize::new(0));
        let count = batches.len();

        let streams = batches
            .into_iter()
            .map(|batch| CountingStream::boxed(batch, &closes))
            .collect();
        let mut merge = OrderedMergeIterator::new(streams, Arc::new(comparator));
        for _ in 0..take {
            let _ = merge.next().unwrap();
        }
        merge.close();
        merge.close();
        drop(merge);

        prop_assert_eq!(closes.load(Ordering::SeqCst), count);
    }

    #[test]
    fn single_source_passes_through(
        names in prop::collection::vec(arb_name(), 0..20),
        direction in arb_direction(),
    ) {
        let comparator = comparator(direction, None);
        let (mut batches, expected) = sources(vec![names], &comparator);
        let batch = batches.remove(0);

        let mut merge = OrderedMergeIterator::new(
            vec![Box::new(VecStream::new(batch))],
            Arc::new(comparator),
        );
        prop_assert_eq!(drain(&mut merge), expected);
    }
}

// =============================================================================
// Failure Tests
// =============================================================================

/// Records ordered before the failure are delivered, then the error once.
#[test]
fn test_failure_surfaces_once_and_closes_everything() {
    let comparator = comparator(SortDirection::Asc, None);
    let closes = Arc::new(AtomicUsize::new(0));

    let streams = vec![
        CountingStream::boxed(
            vec![person(1, Some("Adams")), person(2, Some("Zed"))],
            &closes,
        ),
        CountingStream::failing(vec![person(3, Some("Baker"))], 1, &closes),
        CountingStream::boxed(vec![person(4, Some("Young"))], &closes),
    ];
    let mut merge = OrderedMergeIterator::new(streams, Arc::new(comparator));

    assert_eq!(merge.next().unwrap().map(|r| r.id), Some(1));
    assert_eq!(merge.next().unwrap().map(|r| r.id), Some(3));
    let err = merge.next().unwrap_err();
    assert_eq!(err.message(), "backend went away");
    assert!(err.is_retryable());
    assert_eq!(merge.next().unwrap(), None);
    assert_eq!(closes.load(Ordering::SeqCst), 3);

    merge.close();
    drop(merge);
    assert_eq!(closes.load(Ordering::SeqCst), 3);
}

/// A failure on the very first pull yields no records at all.
#[test]
fn test_immediate_failure() {
    let comparator = comparator(SortDirection::Asc, None);
    let closes = Arc::new(AtomicUsize::new(0));

    let streams = vec![
        CountingStream::boxed(vec![person(1, Some("Adams"))], &closes),
        CountingStream::failing(Vec::new(), 0, &closes),
    ];
    let mut merge = OrderedMergeIterator::new(streams, Arc::new(comparator));

    assert!(merge.has_next());
    assert!(merge.next().is_err());
    assert!(!merge.has_next());
    assert_eq!(closes.load(Ordering::SeqCst), 2);
}

/// Equal keys from different sources come out by id.
#[test]
fn test_ties_break_by_id_across_sources() {
    let comparator = comparator(SortDirection::Desc, None);
    let streams: Vec<Box<dyn ResultStream>> = vec![
        Box::new(VecStream::sorted(
            vec![person(7, Some("Doe")), person(2, Some("Doe"))],
            &comparator,
        )),
        Box::new(VecStream::sorted(
            vec![person(5, Some("Doe")), person(1, Some("Abe"))],
            &comparator,
        )),
    ];
    let mut merge = OrderedMergeIterator::new(streams, Arc::new(comparator));
    let ids: Vec<u32> = drain(&mut merge).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 5, 7, 1]);
}
