//! Session accumulator: the results mapping from test identifier to query
//! count.
//!
//! The accumulator is an explicitly passed object with a documented
//! lifecycle: created at session start, fed by the host runner's per-test
//! boundaries, read once at session end. Counting is best-effort and never
//! fails: events outside any test's window are dropped, and mismatched
//! lifecycle calls are absorbed with a warning so the feature can never
//! affect test outcomes.

use crate::signal::QueryObserver;
use crate::types::{QueryEvent, TestId, TestRecord};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Accumulates per-test query counts over one test session.
///
/// Each test identifier appears at most once in the finished records; the
/// records keep their insertion order, which is what the reporter uses to
/// break ties.
#[derive(Debug, Default)]
pub struct SessionCounts {
    active: Option<TestRecord>,
    records: Vec<TestRecord>,
}

impl SessionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh zero counter scoped to `id`.
    ///
    /// A test that is somehow still active is finished first, so its counts
    /// are kept rather than leaking into the new test's window.
    pub fn begin_test(&mut self, id: TestId) {
        if let Some(previous) = self.active.take() {
            warn!(
                previous = %previous.test,
                next = %id,
                "test started while another was still counting"
            );
            self.push_record(previous);
        }
        self.active = Some(TestRecord::new(id));
    }

    /// Counts one query event against the currently active test, if any.
    pub fn record_query(&mut self, event: &QueryEvent) {
        if let Some(active) = self.active.as_mut() {
            active.record(&event.connection);
        }
    }

    /// Closes the active test's window, moves its counts into the results,
    /// and returns the final total.
    ///
    /// The window closes on success, failure, and panic alike; an end
    /// without a matching start records a zero count for `id`.
    pub fn finish_test(&mut self, id: &TestId) -> u64 {
        let record = match self.active.take() {
            Some(record) => {
                if record.test != *id {
                    warn!(expected = %id, active = %record.test, "test end did not match active test");
                }
                record
            }
            None => {
                warn!(test = %id, "test end without matching start, recording zero queries");
                TestRecord::new(id.clone())
            }
        };

        let total = record.total;
        debug!(test = %record.test, queries = total, "test query window closed");
        self.push_record(record);
        total
    }

    fn push_record(&mut self, record: TestRecord) {
        if self.records.iter().any(|r| r.test == record.test) {
            warn!(test = %record.test, "duplicate test identifier, keeping first recorded counts");
            return;
        }
        self.records.push(record);
    }

    /// Finished records in insertion order.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TestRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Cloneable handle to a [`SessionCounts`] that can be subscribed to a
/// query signal as an observer.
///
/// Tests run one at a time, so the mutex sees no contention; it only exists
/// so the accumulator can be shared with the signal hub.
#[derive(Clone, Default)]
pub struct SharedSessionCounts {
    inner: Arc<Mutex<SessionCounts>>,
}

impl SharedSessionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_test(&self, id: TestId) {
        self.lock().begin_test(id);
    }

    pub fn finish_test(&self, id: &TestId) -> u64 {
        self.lock().finish_test(id)
    }

    /// Copy of the finished records, in insertion order.
    pub fn snapshot(&self) -> Vec<TestRecord> {
        self.lock().records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionCounts> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryObserver for SharedSessionCounts {
    fn observe(&self, event: &QueryEvent) {
        self.lock().record_query(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> QueryEvent {
        QueryEvent::on_default("SELECT 1")
    }

    #[test]
    fn test_counts_match_queries_issued() {
        let mut counts = SessionCounts::new();
        let id = TestId::new("t1");

        counts.begin_test(id.clone());
        for _ in 0..4 {
            counts.record_query(&query());
        }
        let total = counts.finish_test(&id);

        assert_eq!(total, 4);
        assert_eq!(counts.records().len(), 1);
        assert_eq!(counts.records()[0].total, 4);
    }

    #[test]
    fn test_counter_resets_between_tests() {
        let mut counts = SessionCounts::new();
        let busy = TestId::new("busy");
        let idle = TestId::new("idle");

        counts.begin_test(busy.clone());
        for _ in 0..5 {
            counts.record_query(&query());
        }
        counts.finish_test(&busy);

        counts.begin_test(idle.clone());
        counts.finish_test(&idle);

        assert_eq!(counts.records()[0].total, 5);
        assert_eq!(counts.records()[1].total, 0);
    }

    #[test]
    fn test_queries_outside_window_are_dropped() {
        let mut counts = SessionCounts::new();
        let id = TestId::new("t1");

        counts.record_query(&query());
        counts.begin_test(id.clone());
        counts.record_query(&query());
        counts.finish_test(&id);
        counts.record_query(&query());

        assert_eq!(counts.records()[0].total, 1);
    }

    #[test]
    fn test_per_connection_breakdown() {
        let mut counts = SessionCounts::new();
        let id = TestId::new("t1");

        counts.begin_test(id.clone());
        counts.record_query(&QueryEvent::new("default", "SELECT 1"));
        counts.record_query(&QueryEvent::new("replica", "SELECT 1"));
        counts.record_query(&QueryEvent::new("default", "SELECT 2"));
        counts.finish_test(&id);

        let record = &counts.records()[0];
        assert_eq!(record.total, 3);
        assert_eq!(record.connection_count("default"), 2);
        assert_eq!(record.connection_count("replica"), 1);
    }

    #[test]
    fn test_end_without_start_records_zero() {
        let mut counts = SessionCounts::new();
        let id = TestId::new("orphan");

        assert_eq!(counts.finish_test(&id), 0);
        assert_eq!(counts.records()[0].test, id);
        assert_eq!(counts.records()[0].total, 0);
    }

    #[test]
    fn test_duplicate_identifier_keeps_first_record() {
        let mut counts = SessionCounts::new();
        let id = TestId::new("dup");

        counts.begin_test(id.clone());
        counts.record_query(&query());
        counts.finish_test(&id);

        counts.begin_test(id.clone());
        counts.finish_test(&id);

        assert_eq!(counts.records().len(), 1);
        assert_eq!(counts.records()[0].total, 1);
    }

    #[test]
    fn test_begin_while_active_finishes_previous() {
        let mut counts = SessionCounts::new();
        let first = TestId::new("first");
        let second = TestId::new("second");

        counts.begin_test(first.clone());
        counts.record_query(&query());
        counts.begin_test(second.clone());
        counts.finish_test(&second);

        assert_eq!(counts.records().len(), 2);
        assert_eq!(counts.records()[0].test, first);
        assert_eq!(counts.records()[0].total, 1);
        assert_eq!(counts.records()[1].total, 0);
    }

    #[test]
    fn test_shared_handle_observes_events() {
        let shared = SharedSessionCounts::new();
        let id = TestId::new("t1");

        shared.begin_test(id.clone());
        shared.observe(&query());
        shared.observe(&query());
        let total = shared.finish_test(&id);

        assert_eq!(total, 2);
        assert_eq!(shared.snapshot()[0].total, 2);
        assert!(!shared.is_empty());
    }
}
