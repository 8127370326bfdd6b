pub mod config;
pub mod counter;
pub mod report;
pub mod signal;
pub mod types;

pub use config::ReportConfig;
pub use counter::{SessionCounts, SharedSessionCounts};
pub use report::{write_report, ReportError, ReportResult};
pub use signal::{QueryObserver, QuerySignal, Subscription};
pub use types::{QueryEvent, TestId, TestRecord, DEFAULT_CONNECTION};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::counter::*;
    pub use crate::report::*;
    pub use crate::signal::*;
    pub use crate::types::*;
}
