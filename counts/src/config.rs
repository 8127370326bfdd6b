use serde::{Deserialize, Serialize};
use tracing::warn;

/// Controls the top-N query count report.
///
/// `top` is the number of entries printed at session end; 0 leaves the
/// report disabled, which is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub top: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top: 0 }
    }
}

impl ReportConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn top_n(top: usize) -> Self {
        Self { top }
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.top > 0
    }

    /// Builds a config from a raw command-line value.
    ///
    /// Reporting is observability-only and must never fail a run, so a
    /// missing or malformed value degrades to disabled rather than erroring.
    pub fn from_cli_value(raw: Option<&str>) -> Self {
        match raw {
            None => Self::disabled(),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(top) => Self { top },
                Err(err) => {
                    warn!(
                        value,
                        error = %err,
                        "ignoring unparsable --query-counts value, report disabled"
                    );
                    Self::disabled()
                }
            },
        }
    }
}
