use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use chrono::NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The drop categories tracked per interval, in the order they appear in
/// console breakdowns and log rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    NicRxDropped,
    NicTxDropped,
    NicRxMissed,
    QdiscDropped,
    SoftirqDropped,
    SynQueueDropped,
    AcceptQueueOverflow,
    TcpPruned,
    TcpCollapsed,
    UdpRcvbufErrors,
    UdpSndbufErrors,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::NicRxDropped,
        Category::NicTxDropped,
        Category::NicRxMissed,
        Category::QdiscDropped,
        Category::SoftirqDropped,
        Category::SynQueueDropped,
        Category::AcceptQueueOverflow,
        Category::TcpPruned,
        Category::TcpCollapsed,
        Category::UdpRcvbufErrors,
        Category::UdpSndbufErrors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::NicRxDropped => "nic_rx_dropped",
            Category::NicTxDropped => "nic_tx_dropped",
            Category::NicRxMissed => "nic_rx_missed",
            Category::QdiscDropped => "qdisc_dropped",
            Category::SoftirqDropped => "softirq_dropped",
            Category::SynQueueDropped => "syn_queue_dropped",
            Category::AcceptQueueOverflow => "accept_queue_overflow",
            Category::TcpPruned => "tcp_pruned",
            Category::TcpCollapsed => "tcp_collapsed",
            Category::UdpRcvbufErrors => "udp_rcvbuf_errors",
            Category::UdpSndbufErrors => "udp_sndbuf_errors",
        }
    }

    /// Column name in the log header.
    pub fn column(&self) -> &'static str {
        match self {
            Category::NicRxDropped => "nic_rx",
            Category::NicTxDropped => "nic_tx",
            Category::NicRxMissed => "nic_missed",
            Category::QdiscDropped => "qdisc",
            Category::SoftirqDropped => "softirq",
            Category::SynQueueDropped => "syn_queue",
            Category::AcceptQueueOverflow => "accept_queue",
            Category::TcpPruned => "tcp_pruned",
            Category::TcpCollapsed => "tcp_collapsed",
            Category::UdpRcvbufErrors => "udp_rcvbuf",
            Category::UdpSndbufErrors => "udp_sndbuf",
        }
    }
}

/// One absolute or per-interval value for every drop category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSet([u64; Category::ALL.len()]);

impl CounterSet {
    pub fn sum(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Per-category difference against an earlier reading. A counter that
    /// moved backwards (interface reset) clamps to zero rather than
    /// producing a wrapped delta.
    pub fn delta_from(&self, baseline: &CounterSet) -> CounterSet {
        let mut deltas = CounterSet::default();

        for (slot, (current, previous)) in self.0.iter().zip(baseline.0.iter()).enumerate() {
            deltas.0[slot] = current.saturating_sub(*previous);
        }

        deltas
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL.iter().map(move |&c| (c, self.0[c as usize]))
    }
}

impl From<[u64; Category::ALL.len()]> for CounterSet {
    fn from(values: [u64; Category::ALL.len()]) -> Self {
        Self(values)
    }
}

impl Index<Category> for CounterSet {
    type Output = u64;

    fn index(&self, category: Category) -> &u64 {
        &self.0[category as usize]
    }
}

impl IndexMut<Category> for CounterSet {
    fn index_mut(&mut self, category: Category) -> &mut u64 {
        &mut self.0[category as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warn,
    Crit,
}

impl Severity {
    /// Classifies an interval total against the configured threshold. The
    /// boundary value is critical.
    pub fn classify(total: u64, threshold: u64) -> Self {
        if total == 0 {
            Severity::Ok
        } else if total < threshold {
            Severity::Warn
        } else {
            Severity::Crit
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Crit => "CRIT",
        };

        write!(f, "{label}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct UnknownSeverity(String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Severity::Ok),
            "WARN" => Ok(Severity::Warn),
            "CRIT" => Ok(Severity::Crit),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// One persisted interval: the per-category deltas between two consecutive
/// samples, their total, and the classification of that total.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalRecord {
    pub timestamp: NaiveDateTime,
    pub iteration: u64,
    pub interface: String,
    pub total_drops: u64,
    pub deltas: CounterSet,
    pub severity: Severity,
}
