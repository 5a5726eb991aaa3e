use std::sync::atomic::AtomicUsize;

use backtrace::Backtrace;
use clap::Command;

mod analyze;
mod common;
mod logfile;
mod monitor;
mod samplers;

pub static STATE: AtomicUsize = AtomicUsize::new(RUNNING);
pub const RUNNING: usize = 0;
pub const TERMINATING: usize = 1;

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    let matches = Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "Dropmon samples kernel and NIC packet-drop counters on a fixed \
            interval, classifies each interval, and appends one record per \
            interval to a log. The analyze subcommand produces aggregate \
            reports from that log.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(monitor::command())
        .subcommand(analyze::command())
        .get_matches();

    match matches.subcommand() {
        Some(("monitor", args)) => match monitor::Config::try_from(args.clone()) {
            Ok(config) => monitor::run(config),
            Err(error) => {
                eprintln!("{error}");
                std::process::exit(1);
            }
        },
        Some(("analyze", args)) => match analyze::Config::try_from(args.clone()) {
            Ok(config) => analyze::run(config),
            Err(error) => {
                eprintln!("{error}");
                std::process::exit(1);
            }
        },
        _ => unreachable!(),
    }
}

/// Configures the debug log on stderr. Verbosity follows the `-v` count.
pub fn init_log(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
