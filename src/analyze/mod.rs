//! Aggregate reports over an accumulated drop log. Each report is an
//! independent fold over a freshly parsed record stream; no state is shared
//! between reports.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::common::{CounterSet, IntervalRecord, TIMESTAMP_FORMAT};
use crate::logfile;

const WORST_INTERVALS: usize = 10;
const RECENT_RECORDS: usize = 20;

pub struct Config {
    logfile: PathBuf,
    verbose: u8,
}

impl TryFrom<ArgMatches> for Config {
    type Error = String;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        Ok(Config {
            logfile: args.get_one::<PathBuf>("LOGFILE").unwrap().clone(),
            verbose: *args.get_one::<u8>("VERBOSE").unwrap_or(&0),
        })
    }
}

pub fn command() -> Command {
    Command::new("analyze")
        .about("Aggregate reports over an accumulated drop log")
        .arg(
            Arg::new("LOGFILE")
                .help("Path to the drop log")
                .action(ArgAction::Set)
                .default_value("/var/log/network_drops.log")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Increase the verbosity")
                .action(ArgAction::Count),
        )
}

pub fn run(config: Config) {
    crate::init_log(config.verbose);

    if !config.logfile.exists() {
        eprintln!("log file not found: {}", config.logfile.display());
        std::process::exit(1);
    }

    if let Err(error) = report(&config.logfile) {
        eprintln!("failed to analyze log: {error}");
        std::process::exit(1);
    }
}

fn report(path: &Path) -> Result<()> {
    println!("=== Drop log analysis: {} ===", path.display());

    let counts = counts(logfile::records(path)?);
    println!();
    println!("-- Interval counts --");
    println!("total intervals:      {}", counts.total);
    println!("intervals with drops: {}", counts.with_drops);
    if let Some(rate) = counts.drop_rate() {
        println!("drop rate:            {rate:.2}%");
    }

    let totals = category_totals(logfile::records(path)?);
    println!();
    println!("-- Totals by category --");
    for (category, total) in totals.iter() {
        println!("{:<22} {total}", category.name());
    }

    println!();
    println!("-- Worst intervals --");
    for record in worst_intervals(logfile::records(path)?, WORST_INTERVALS) {
        println!(
            "{}: {} drops",
            record.timestamp.format(TIMESTAMP_FORMAT),
            record.total_drops,
        );
    }

    println!();
    println!("-- Drops by hour --");
    for (hour, total) in hourly_totals(logfile::records(path)?) {
        println!("{hour}  {total}");
    }

    println!();
    println!("-- Recent activity --");
    println!("{:<20} {:>6}  severity", "timestamp", "drops");
    for record in recent(logfile::records(path)?, RECENT_RECORDS) {
        println!(
            "{:<20} {:>6}  {}",
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            record.total_drops,
            record.severity,
        );
    }

    Ok(())
}

pub struct Counts {
    pub total: usize,
    pub with_drops: usize,
}

impl Counts {
    pub fn drop_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(100.0 * self.with_drops as f64 / self.total as f64)
        }
    }
}

pub fn counts(records: impl Iterator<Item = IntervalRecord>) -> Counts {
    let mut total = 0;
    let mut with_drops = 0;

    for record in records {
        total += 1;

        if record.total_drops > 0 {
            with_drops += 1;
        }
    }

    Counts { total, with_drops }
}

pub fn category_totals(records: impl Iterator<Item = IntervalRecord>) -> CounterSet {
    let mut totals = CounterSet::default();

    for record in records {
        for (category, delta) in record.deltas.iter() {
            totals[category] += delta;
        }
    }

    totals
}

/// The `limit` records with the highest totals, descending. The sort is
/// stable, so ties stay in file order.
pub fn worst_intervals(
    records: impl Iterator<Item = IntervalRecord>,
    limit: usize,
) -> Vec<IntervalRecord> {
    let mut records: Vec<_> = records.collect();

    records.sort_by_key(|r| Reverse(r.total_drops));
    records.truncate(limit);
    records
}

/// Totals grouped by hour of day, keyed `HH:00`.
pub fn hourly_totals(records: impl Iterator<Item = IntervalRecord>) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();

    for record in records {
        let hour = record.timestamp.format("%H:00").to_string();
        *totals.entry(hour).or_insert(0) += record.total_drops;
    }

    totals
}

/// The last `limit` records in original order.
pub fn recent(
    records: impl Iterator<Item = IntervalRecord>,
    limit: usize,
) -> Vec<IntervalRecord> {
    let mut window = VecDeque::with_capacity(limit + 1);

    for record in records {
        window.push_back(record);

        if window.len() > limit {
            window.pop_front();
        }
    }

    window.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Severity;
    use chrono::NaiveDateTime;

    fn record(timestamp: &str, iteration: u64, deltas: [u64; 11]) -> IntervalRecord {
        let deltas = CounterSet::from(deltas);
        let total_drops = deltas.sum();

        IntervalRecord {
            timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).unwrap(),
            iteration,
            interface: "eth0".to_string(),
            total_drops,
            deltas,
            severity: Severity::classify(total_drops, 100),
        }
    }

    fn quiet(timestamp: &str, iteration: u64) -> IntervalRecord {
        record(timestamp, iteration, [0; 11])
    }

    fn noisy(timestamp: &str, iteration: u64, rx: u64) -> IntervalRecord {
        record(timestamp, iteration, [rx, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn drop_rate_extremes() {
        let all_quiet = vec![
            quiet("2025-11-03 09:00:05", 1),
            quiet("2025-11-03 09:00:10", 2),
        ];
        let quiet_counts = counts(all_quiet.into_iter());
        assert_eq!(quiet_counts.drop_rate().unwrap(), 0.0);

        let all_noisy = vec![
            noisy("2025-11-03 09:00:05", 1, 3),
            noisy("2025-11-03 09:00:10", 2, 9),
        ];
        let noisy_counts = counts(all_noisy.into_iter());
        assert_eq!(noisy_counts.drop_rate().unwrap(), 100.0);
    }

    #[test]
    fn empty_log_has_no_drop_rate() {
        let counts = counts(std::iter::empty());

        assert_eq!(counts.total, 0);
        assert!(counts.drop_rate().is_none());
    }

    #[test]
    fn category_totals_are_column_sums() {
        let records = vec![
            record("2025-11-03 09:00:05", 1, [1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 4]),
            record("2025-11-03 09:00:10", 2, [5, 0, 0, 3, 0, 0, 0, 0, 0, 0, 1]),
        ];

        let forward = category_totals(records.clone().into_iter());
        let reversed = category_totals(records.into_iter().rev());

        assert_eq!(forward, reversed);
        assert_eq!(
            forward,
            CounterSet::from([6, 2, 0, 3, 0, 0, 0, 0, 0, 0, 5])
        );
    }

    #[test]
    fn worst_intervals_sorted_and_capped() {
        let records: Vec<_> = (1u64..=15)
            .map(|i| noisy(&format!("2025-11-03 09:{i:02}:00"), i, i))
            .collect();

        let worst = worst_intervals(records.into_iter(), 10);

        assert_eq!(worst.len(), 10);
        assert_eq!(worst[0].total_drops, 15);
        assert_eq!(worst[9].total_drops, 6);
    }

    #[test]
    fn worst_intervals_ties_stay_in_file_order() {
        let records = vec![
            noisy("2025-11-03 09:00:05", 1, 7),
            noisy("2025-11-03 09:00:10", 2, 7),
            noisy("2025-11-03 09:00:15", 3, 7),
        ];

        let worst = worst_intervals(records.into_iter(), 10);

        let iterations: Vec<u64> = worst.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3]);
    }

    #[test]
    fn worst_intervals_empty_safe() {
        assert!(worst_intervals(std::iter::empty(), 10).is_empty());

        let few = vec![quiet("2025-11-03 09:00:05", 1)];
        assert_eq!(worst_intervals(few.into_iter(), 10).len(), 1);
    }

    #[test]
    fn recent_keeps_last_records_in_order() {
        let records: Vec<_> = (1u64..=25)
            .map(|i| noisy(&format!("2025-11-03 09:{i:02}:00"), i, i))
            .collect();

        let tail = recent(records.into_iter(), 20);

        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0].iteration, 6);
        assert_eq!(tail[19].iteration, 25);
    }

    #[test]
    fn recent_returns_everything_for_short_logs() {
        let records = vec![
            quiet("2025-11-03 09:00:05", 1),
            quiet("2025-11-03 09:00:10", 2),
        ];

        let tail = recent(records.into_iter(), 20);

        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].iteration, 1);
    }

    #[test]
    fn hourly_totals_group_by_hour_of_day() {
        let records = vec![
            noisy("2025-11-03 09:00:05", 1, 3),
            noisy("2025-11-03 09:59:55", 2, 4),
            noisy("2025-11-03 13:15:00", 3, 10),
            // next day, same hour bucket
            noisy("2025-11-04 09:30:00", 4, 1),
        ];

        let totals = hourly_totals(records.into_iter());

        assert_eq!(totals.len(), 2);
        assert_eq!(totals["09:00"], 8);
        assert_eq!(totals["13:00"], 10);

        let keys: Vec<&String> = totals.keys().collect();
        assert_eq!(keys, vec!["09:00", "13:00"]);
    }

    #[test]
    fn analyzes_a_log_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drops.log");

        std::fs::write(
            &path,
            format!(
                "{}\n\
                 2025-11-03 09:00:05,1,eth0,5,5,0,0,0,0,0,0,0,0,0,0,WARN\n\
                 2025-11-03 09:00:10,2,eth0,0,0,0,0,0,0,0,0,0,0,0,0,OK\n\
                 2025-11-03 09:00:15,3,eth0,150,150,0,0,0,0,0,0,0,0,0,0,CRIT\n",
                logfile::HEADER,
            ),
        )
        .unwrap();

        let counts = counts(logfile::records(&path).unwrap());
        assert_eq!(counts.total, 3);
        assert_eq!(counts.with_drops, 2);
        assert_eq!(format!("{:.2}", counts.drop_rate().unwrap()), "66.67");

        let totals = category_totals(logfile::records(&path).unwrap());
        assert_eq!(totals[crate::common::Category::NicRxDropped], 155);

        let worst = worst_intervals(logfile::records(&path).unwrap(), 10);
        assert_eq!(worst[0].total_drops, 150);
        assert_eq!(
            worst[0].timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2025-11-03 09:00:15"
        );
    }
}
