use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Connection name used when the surrounding infrastructure does not
/// distinguish between databases.
pub const DEFAULT_CONNECTION: &str = "default";

/// Unique identifier for one test invocation (module path + test name),
/// supplied by the host runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One executed database statement, as reported by the query signal.
///
/// The statement text is carried for tracing output only; it is never
/// parsed or interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEvent {
    /// Name of the database connection the statement ran on.
    pub connection: String,
    /// The statement text as the driver saw it.
    pub statement: String,
}

impl QueryEvent {
    pub fn new(connection: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            statement: statement.into(),
        }
    }

    /// Event on the default connection, for infrastructure that only has one
    /// database.
    pub fn on_default(statement: impl Into<String>) -> Self {
        Self::new(DEFAULT_CONNECTION, statement)
    }
}

/// Final query counts for one finished test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    /// The test these counts belong to.
    pub test: TestId,
    /// Total statements observed between the test's start and end.
    pub total: u64,
    /// Breakdown by connection name.
    pub per_connection: BTreeMap<String, u64>,
}

impl TestRecord {
    pub fn new(test: TestId) -> Self {
        Self {
            test,
            total: 0,
            per_connection: BTreeMap::new(),
        }
    }

    /// Count for a single named connection (0 if the test never touched it).
    pub fn connection_count(&self, connection: &str) -> u64 {
        self.per_connection.get(connection).copied().unwrap_or(0)
    }

    pub(crate) fn record(&mut self, connection: &str) {
        self.total = self.total.saturating_add(1);
        *self
            .per_connection
            .entry(connection.to_string())
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_id_display() {
        let id = TestId::new("widgets::test_create");
        assert_eq!(id.to_string(), "widgets::test_create");
        assert_eq!(id.as_str(), "widgets::test_create");
    }

    #[test]
    fn test_query_event_default_connection() {
        let event = QueryEvent::on_default("SELECT 1");
        assert_eq!(event.connection, DEFAULT_CONNECTION);
        assert_eq!(event.statement, "SELECT 1");
    }

    #[test]
    fn test_record_accumulates_per_connection() {
        let mut record = TestRecord::new(TestId::new("t"));
        record.record("default");
        record.record("default");
        record.record("replica");

        assert_eq!(record.total, 3);
        assert_eq!(record.connection_count("default"), 2);
        assert_eq!(record.connection_count("replica"), 1);
        assert_eq!(record.connection_count("missing"), 0);
    }

    #[test]
    fn test_record_serializes() {
        let mut record = TestRecord::new(TestId::new("t"));
        record.record("default");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["test"], "t");
        assert_eq!(json["total"], 1);
        assert_eq!(json["per_connection"]["default"], 1);
    }
}
