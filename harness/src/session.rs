//! Sequential test session runner.
//!
//! Tests run one at a time within one process. For every registered case
//! the session fires `on_test_start`, runs the body (panics are caught and
//! count as failures), then fires `on_test_end`; after the last case each
//! plugin gets `on_session_end` exactly once. The query signal is owned by
//! the session so both test bodies and the surrounding database
//! infrastructure can reach the same hub through [`TestContext`].

use crate::cli::SessionArgs;
use crate::lifecycle::{QueryCountPlugin, RunnerLifecycle};
use chrono::{DateTime, Utc};
use counts::{QuerySignal, TestId};
use serde::Serialize;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SuiteError {
    /// Each test identifier may appear at most once per session.
    #[error("duplicate test identifier: {id}")]
    DuplicateTest { id: TestId },
}

pub type SuiteResult<T> = Result<T, SuiteError>;

/// Handed to every test body; carries the test's identity and the session's
/// query signal so the database layer under test can be wired to it.
#[derive(Clone)]
pub struct TestContext {
    id: TestId,
    signal: QuerySignal,
}

impl TestContext {
    pub fn id(&self) -> &TestId {
        &self.id
    }

    pub fn signal(&self) -> &QuerySignal {
        &self.signal
    }
}

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

enum TestBody {
    Sync(Box<dyn FnOnce(TestContext) + Send>),
    Async(Box<dyn FnOnce(TestContext) -> BoxedFuture + Send>),
}

/// One registered test: an identifier plus a sync or async body.
pub struct TestCase {
    id: TestId,
    body: TestBody,
}

impl TestCase {
    pub fn sync(id: impl Into<TestId>, body: impl FnOnce(TestContext) + Send + 'static) -> Self {
        Self {
            id: id.into(),
            body: TestBody::Sync(Box::new(body)),
        }
    }

    pub fn asynchronous<F, Fut>(id: impl Into<TestId>, body: F) -> Self
    where
        F: FnOnce(TestContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: id.into(),
            body: TestBody::Async(Box::new(move |context| Box::pin(body(context)))),
        }
    }

    pub fn id(&self) -> &TestId {
        &self.id
    }
}

/// Outcome of one finished session, for the embedding test binary.
///
/// The query count report goes to the terminal section; this summary never
/// carries it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Sequential, single-process test session.
pub struct Session {
    suite: Vec<TestCase>,
    plugins: Vec<Box<dyn RunnerLifecycle>>,
    signal: QuerySignal,
}

impl Session {
    pub fn new() -> Self {
        Self {
            suite: Vec::new(),
            plugins: Vec::new(),
            signal: QuerySignal::new(),
        }
    }

    /// Session wired up from command-line options: installs the tracing
    /// subscriber and attaches a [`QueryCountPlugin`] configured from
    /// `--query-counts`.
    pub fn from_args(args: &SessionArgs) -> Self {
        crate::init_tracing();
        let mut session = Self::new();
        let plugin = QueryCountPlugin::new(args.report_config(), session.signal());
        session.add_plugin(Box::new(plugin));
        session
    }

    /// The session's query signal hub. Clones share the subscriber set, so
    /// this is what the database layer's logging callback should notify.
    pub fn signal(&self) -> QuerySignal {
        self.signal.clone()
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn RunnerLifecycle>) {
        self.plugins.push(plugin);
    }

    /// Registers a test case, rejecting duplicate identifiers.
    pub fn register(&mut self, case: TestCase) -> SuiteResult<()> {
        if self.suite.iter().any(|existing| existing.id == case.id) {
            return Err(SuiteError::DuplicateTest { id: case.id });
        }
        self.suite.push(case);
        Ok(())
    }

    pub fn suite_len(&self) -> usize {
        self.suite.len()
    }

    /// Runs the whole suite and returns the session summary.
    pub fn run(mut self) -> SessionSummary {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = self.suite.len();
        info!(%session_id, tests = total, "test session started");

        let mut runtime: Option<Runtime> = None;
        let mut passed = 0;
        let mut failed = 0;

        for case in std::mem::take(&mut self.suite) {
            let TestCase { id, body } = case;
            for plugin in &mut self.plugins {
                plugin.on_test_start(&id);
            }

            let context = TestContext {
                id: id.clone(),
                signal: self.signal.clone(),
            };
            let ok = match body {
                TestBody::Sync(run) => catch_unwind(AssertUnwindSafe(|| run(context))).is_ok(),
                TestBody::Async(run) => {
                    if runtime.is_none() {
                        match Runtime::new() {
                            Ok(rt) => runtime = Some(rt),
                            Err(err) => error!(error = %err, "async runtime unavailable"),
                        }
                    }
                    match runtime.as_ref() {
                        Some(rt) => {
                            catch_unwind(AssertUnwindSafe(|| rt.block_on(run(context)))).is_ok()
                        }
                        None => false,
                    }
                }
            };

            if ok {
                passed += 1;
            } else {
                warn!(test = %id, "test failed");
                failed += 1;
            }

            for plugin in &mut self.plugins {
                plugin.on_test_end(&id);
            }
        }

        for plugin in &mut self.plugins {
            plugin.on_session_end();
        }

        info!(%session_id, passed, failed, "test session finished");
        SessionSummary {
            session_id,
            started_at,
            total,
            passed,
            failed,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
