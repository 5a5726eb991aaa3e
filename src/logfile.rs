//! Append-only drop log: one header row, then one comma-delimited row per
//! interval. The monitor is the only writer; the analyzer re-reads the file
//! once per report.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::common::{Category, CounterSet, IntervalRecord, UnknownSeverity, TIMESTAMP_FORMAT};

pub const HEADER: &str = "timestamp,iteration,interface,total_drops,nic_rx,nic_tx,nic_missed,\
qdisc,softirq,syn_queue,accept_queue,tcp_pruned,tcp_collapsed,udp_rcvbuf,udp_sndbuf,severity";

const FIELD_COUNT: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("expected 16 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("invalid {field} field: {source}")]
    Integer {
        field: &'static str,
        source: std::num::ParseIntError,
    },
    #[error(transparent)]
    Severity(#[from] UnknownSeverity),
}

pub fn format_record(record: &IntervalRecord) -> String {
    let mut line = format!(
        "{},{},{},{}",
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.iteration,
        record.interface,
        record.total_drops,
    );

    for (_, delta) in record.deltas.iter() {
        let _ = write!(line, ",{delta}");
    }

    let _ = write!(line, ",{}", record.severity);

    line
}

pub fn parse_record(line: &str) -> Result<IntervalRecord, RecordError> {
    let fields: Vec<&str> = line.split(',').collect();

    if fields.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT)?;
    let iteration = parse_int("iteration", fields[1])?;
    let interface = fields[2].to_string();
    let total_drops = parse_int("total_drops", fields[3])?;

    let mut deltas = CounterSet::default();

    for (&category, field) in Category::ALL.iter().zip(&fields[4..15]) {
        deltas[category] = parse_int(category.column(), field)?;
    }

    let severity = fields[15].parse()?;

    Ok(IntervalRecord {
        timestamp,
        iteration,
        interface,
        total_drops,
        deltas,
        severity,
    })
}

fn parse_int(field: &'static str, text: &str) -> Result<u64, RecordError> {
    text.parse()
        .map_err(|source| RecordError::Integer { field, source })
}

pub struct LogWriter {
    writer: BufWriter<File>,
}

impl LogWriter {
    /// Opens the log for appending, creating parent directories and the
    /// header row when the file does not exist yet.
    pub fn create(path: &Path) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = !path.exists();

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        if needs_header {
            writeln!(writer, "{HEADER}")?;
            writer.flush()?;
        }

        Ok(Self { writer })
    }

    /// Appends one record and flushes so a line-oriented reader never sees a
    /// partial row.
    pub fn append(&mut self, record: &IntervalRecord) -> Result<(), std::io::Error> {
        writeln!(self.writer, "{}", format_record(record))?;
        self.writer.flush()
    }
}

/// Lazily parsed record stream. The header row is skipped; malformed data
/// rows are dropped rather than aborting the pass.
pub fn records(path: &Path) -> Result<impl Iterator<Item = IntervalRecord>, std::io::Error> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    Ok(reader
        .lines()
        .map_while(Result::ok)
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_record(&line) {
            Ok(record) => Some(record),
            Err(error) => {
                debug!("skipping malformed log row: {error}");
                None
            }
        }))
}
