use crate::common::{IntervalRecord, Severity, TIMESTAMP_FORMAT};

const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[1;33m";
const RED: &str = "\x1b[0;31m";
const RESET: &str = "\x1b[0m";

/// One summary line per interval, plus an itemized breakdown of the nonzero
/// categories when anything was dropped.
pub fn print_record(record: &IntervalRecord) {
    let color = match record.severity {
        Severity::Ok => GREEN,
        Severity::Warn => YELLOW,
        Severity::Crit => RED,
    };

    println!(
        "[{}] #{} {color}{}{RESET} total drops: {}",
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.iteration,
        record.severity,
        record.total_drops,
    );

    if record.total_drops > 0 {
        for (category, delta) in record.deltas.iter() {
            if delta > 0 {
                println!("    {}: +{delta}", category.name());
            }
        }
    }
}
