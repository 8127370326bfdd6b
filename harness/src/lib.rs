pub mod cli;
pub mod lifecycle;
pub mod session;

pub use cli::SessionArgs;
pub use lifecycle::{QueryCountPlugin, RunnerLifecycle};
pub use session::{
    Session, SessionSummary, SuiteError, SuiteResult, TestCase, TestContext,
};

/// Installs the fmt subscriber with the standard env filter.
///
/// Uses `try_init` so an embedding binary that already installed its own
/// subscriber wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
