use crate::config::ReportConfig;
use crate::types::TestRecord;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write query count report: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Width of the separator line around the terminal summary section.
const SEP_WIDTH: usize = 80;

/// Writes the top-N query count section to `writer`.
///
/// Does nothing when reporting is disabled (`top == 0`) or no tests were
/// recorded. Otherwise prints a separator header followed by
/// `min(top, records.len())` lines of `"<count> queries: <test id>"`,
/// sorted by count descending. The sort is stable, so tests with equal
/// counts keep their insertion order. Records that touched more than one
/// named connection append the per-connection breakdown.
pub fn write_report<W: Write>(
    writer: &mut W,
    config: &ReportConfig,
    records: &[TestRecord],
) -> ReportResult<()> {
    if !config.is_enabled() || records.is_empty() {
        return Ok(());
    }

    let mut ranked: Vec<&TestRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked.truncate(config.top);

    write_sep(writer, '=', &format!("{} biggest query counts", config.top))?;
    for record in ranked {
        writeln!(writer, "{}", format_record(record))?;
    }
    Ok(())
}

fn format_record(record: &TestRecord) -> String {
    let mut line = format!("{} queries: {}", record.total, record.test);
    if record.per_connection.len() > 1 {
        let breakdown = record
            .per_connection
            .iter()
            .map(|(connection, count)| format!("{connection}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!(" ({breakdown})"));
    }
    line
}

fn write_sep<W: Write>(writer: &mut W, sep: char, title: &str) -> ReportResult<()> {
    let banner = format!(" {title} ");
    if banner.len() >= SEP_WIDTH {
        writeln!(writer, "{banner}")?;
        return Ok(());
    }
    let pad = SEP_WIDTH - banner.len();
    let left = sep.to_string().repeat(pad / 2);
    let right = sep.to_string().repeat(pad - pad / 2);
    writeln!(writer, "{left}{banner}{right}")?;
    Ok(())
}
