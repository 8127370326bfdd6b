use clap::Parser;
use counts::ReportConfig;

/// Command-line options understood by a test binary built on this harness.
#[derive(Parser, Debug, Clone)]
#[command(name = "harness")]
#[command(about = "Sequential test session runner with query count reporting")]
pub struct SessionArgs {
    /// Show the N biggest per-test query counts at session end (0 disables
    /// the report).
    ///
    /// Kept as a raw string so a malformed value degrades to disabled
    /// reporting instead of failing the whole run.
    #[arg(long = "query-counts", value_name = "N", default_value = "0")]
    pub query_counts: String,
}

impl SessionArgs {
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig::from_cli_value(Some(&self.query_counts))
    }
}
