//! Test lifecycle integration for query counting.
//!
//! The host runner drives three capability methods (test start, test end,
//! session end) and [`QueryCountPlugin`] turns them into a counting window
//! per test plus one terminal report at the end of the session. The plugin
//! is observability-only: every internal failure is logged and absorbed so
//! it can never change a test's outcome.

use counts::{
    write_report, QuerySignal, ReportConfig, SharedSessionCounts, Subscription, TestId, TestRecord,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-test lifecycle callbacks, implemented by plugins and invoked by the
/// session runner.
///
/// `on_test_end` fires on success, failure, and panic alike;
/// `on_session_end` fires exactly once, after the last test.
pub trait RunnerLifecycle: Send {
    fn on_test_start(&mut self, id: &TestId);

    fn on_test_end(&mut self, id: &TestId);

    fn on_session_end(&mut self);
}

/// Counts database queries per test and reports the N biggest counts at
/// session end.
///
/// Between `on_test_start` and `on_test_end` the plugin keeps its
/// accumulator subscribed to the query signal; outside that window nothing
/// is counted. The report is written to stdout unless a different sink is
/// supplied with [`QueryCountPlugin::with_writer`].
pub struct QueryCountPlugin {
    config: ReportConfig,
    signal: QuerySignal,
    counts: SharedSessionCounts,
    window: Option<Subscription>,
    writer: Box<dyn Write + Send>,
}

impl QueryCountPlugin {
    pub fn new(config: ReportConfig, signal: QuerySignal) -> Self {
        Self {
            config,
            signal,
            counts: SharedSessionCounts::new(),
            window: None,
            writer: Box::new(std::io::stdout()),
        }
    }

    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = writer;
        self
    }

    /// Handle to the accumulator, for embedders that want the raw records
    /// after the session.
    pub fn counts(&self) -> SharedSessionCounts {
        self.counts.clone()
    }

    /// Finished records so far, in insertion order.
    pub fn records(&self) -> Vec<TestRecord> {
        self.counts.snapshot()
    }
}

impl RunnerLifecycle for QueryCountPlugin {
    fn on_test_start(&mut self, id: &TestId) {
        self.counts.begin_test(id.clone());
        self.window = Some(self.signal.subscribe(Arc::new(self.counts.clone())));
    }

    fn on_test_end(&mut self, id: &TestId) {
        // Dropping the subscription closes the observation window before the
        // final count is recorded.
        self.window = None;
        let total = self.counts.finish_test(id);
        debug!(test = %id, queries = total, "query count recorded");
    }

    fn on_session_end(&mut self) {
        let records = self.counts.snapshot();
        if let Err(err) = write_report(&mut self.writer, &self.config, &records) {
            warn!(error = %err, "query count report was not written");
        }
        if let Err(err) = self.writer.flush() {
            warn!(error = %err, "query count report sink did not flush");
        }
    }
}
