//! Samples drop counters on a fixed interval, computes per-interval deltas
//! against the previous reading, classifies each interval, and appends one
//! record per interval to the drop log.

mod report;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::common::{CounterSet, IntervalRecord, Severity};
use crate::logfile::LogWriter;
use crate::samplers::CounterSource;
use crate::{RUNNING, STATE, TERMINATING};

pub struct Config {
    interface: String,
    interval: Duration,
    logfile: PathBuf,
    threshold: u64,
    duration: Option<Duration>,
    verbose: u8,
}

impl TryFrom<ArgMatches> for Config {
    type Error = String;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let interval = *args.get_one::<u64>("INTERVAL").unwrap();

        if interval == 0 {
            return Err("interval must be at least 1 second".to_string());
        }

        Ok(Config {
            interface: args.get_one::<String>("INTERFACE").unwrap().clone(),
            interval: Duration::from_secs(interval),
            logfile: args.get_one::<PathBuf>("LOGFILE").unwrap().clone(),
            threshold: *args.get_one::<u64>("THRESHOLD").unwrap(),
            duration: args
                .get_one::<humantime::Duration>("DURATION")
                .copied()
                .map(Into::into),
            verbose: *args.get_one::<u8>("VERBOSE").unwrap_or(&0),
        })
    }
}

pub fn command() -> Command {
    Command::new("monitor")
        .about("Periodic sampling of kernel and NIC packet-drop counters")
        .arg(
            Arg::new("INTERFACE")
                .help("Network interface to monitor")
                .action(ArgAction::Set)
                .default_value("eth0")
                .index(1),
        )
        .arg(
            Arg::new("INTERVAL")
                .help("Sampling interval in seconds")
                .action(ArgAction::Set)
                .default_value("5")
                .value_parser(value_parser!(u64))
                .index(2),
        )
        .arg(
            Arg::new("LOGFILE")
                .help("Path to the drop log")
                .action(ArgAction::Set)
                .default_value("/var/log/network_drops.log")
                .value_parser(value_parser!(PathBuf))
                .index(3),
        )
        .arg(
            Arg::new("THRESHOLD")
                .long("threshold")
                .short('t')
                .help("Interval drop total at which severity becomes critical")
                .action(ArgAction::Set)
                .default_value("100")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("DURATION")
                .long("duration")
                .short('d')
                .help("Stop monitoring after this long instead of running until interrupted")
                .action(ArgAction::Set)
                .value_parser(value_parser!(humantime::Duration)),
        )
        .arg(
            Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Increase the verbosity")
                .action(ArgAction::Count),
        )
}

/// Per-tick state: the last absolute reading and the interval counter. The
/// first tick only seeds the baseline and produces no record.
pub struct Monitor {
    source: Box<dyn CounterSource>,
    interface: String,
    threshold: u64,
    baseline: Option<CounterSet>,
    iteration: u64,
}

impl Monitor {
    pub fn new(source: Box<dyn CounterSource>, interface: String, threshold: u64) -> Self {
        Self {
            source,
            interface,
            threshold,
            baseline: None,
            iteration: 0,
        }
    }

    pub fn tick(&mut self, timestamp: NaiveDateTime) -> Option<IntervalRecord> {
        let current = self.source.sample();

        let previous = match self.baseline.replace(current) {
            Some(previous) => previous,
            // seeding sample: nothing to diff against yet
            None => return None,
        };

        let deltas = current.delta_from(&previous);
        let total_drops = deltas.sum();

        self.iteration += 1;

        Some(IntervalRecord {
            timestamp,
            iteration: self.iteration,
            interface: self.interface.clone(),
            total_drops,
            deltas,
            severity: Severity::classify(total_drops, self.threshold),
        })
    }

    pub fn iterations(&self) -> u64 {
        self.iteration
    }
}

pub fn run(config: Config) {
    crate::init_log(config.verbose);

    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        eprintln!("dropmon monitor requires Linux (sysfs/procfs counter sources)");
        std::process::exit(1);
    }

    #[cfg(target_os = "linux")]
    run_linux(config)
}

#[cfg(target_os = "linux")]
fn run_linux(config: Config) {
    use crate::samplers::linux::{self, LinuxSource};

    if !linux::interface_exists(&config.interface) {
        eprintln!(
            "interface {} does not exist (available: {})",
            config.interface,
            linux::network_interfaces().join(", "),
        );
        std::process::exit(1);
    }

    if let Some((mode, slaves)) = linux::bonding_info(&config.interface) {
        info!(
            "{} is a bonding master: mode {mode}, slaves: {}",
            config.interface,
            slaves.join(" "),
        );
    }

    let mut writer = match LogWriter::create(&config.logfile) {
        Ok(writer) => writer,
        Err(error) => {
            eprintln!("failed to open log file {:?}: {error}", config.logfile);
            std::process::exit(1);
        }
    };

    ctrlc::set_handler(move || {
        let state = STATE.load(Ordering::SeqCst);

        if state == RUNNING {
            info!("finishing current interval before exit...");
            STATE.store(TERMINATING, Ordering::SeqCst);
        } else {
            info!("terminating immediately");
            std::process::exit(2);
        }
    })
    .expect("failed to set ctrl-c handler");

    let mut monitor = Monitor::new(
        Box::new(LinuxSource::new(config.interface.clone())),
        config.interface.clone(),
        config.threshold,
    );

    info!(
        "monitoring {} every {}s, threshold {}, logging to {:?}",
        config.interface,
        config.interval.as_secs(),
        config.threshold,
        config.logfile,
    );

    // initialize async runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .thread_name("dropmon")
        .build()
        .expect("failed to launch async runtime");

    rt.block_on(async move {
        let start = std::time::Instant::now();

        let mut ticker = tokio::time::interval(config.interval);
        // a slow tick delays the next one; there is no catch-up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the first tick completes immediately and seeds the baseline
        ticker.tick().await;
        monitor.tick(chrono::Local::now().naive_local());

        while STATE.load(Ordering::Relaxed) == RUNNING {
            if let Some(duration) = config.duration {
                if start.elapsed() >= duration {
                    break;
                }
            }

            ticker.tick().await;

            if let Some(record) = monitor.tick(chrono::Local::now().naive_local()) {
                report::print_record(&record);

                if let Err(error) = writer.append(&record) {
                    error!("error writing to log file: {error}");
                    std::process::exit(1);
                }
            }
        }

        info!("monitoring stopped after {} intervals", monitor.iterations());
    });
}
