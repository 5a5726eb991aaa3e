//! Linux counter sources: per-interface NIC statistics from sysfs, qdisc
//! drops via `tc`, softirq drops from `/proc/net/softnet_stat`, and TCP/UDP
//! protocol counters from the procfs nested-map files.

mod procfs;
mod qdisc;
mod sysfs;

use walkdir::WalkDir;

use crate::common::{Category, CounterSet};
use crate::samplers::CounterSource;

pub struct LinuxSource {
    interface: String,
}

impl LinuxSource {
    pub fn new(interface: String) -> Self {
        Self { interface }
    }
}

impl CounterSource for LinuxSource {
    fn sample(&mut self) -> CounterSet {
        let mut counters = CounterSet::default();

        counters[Category::NicRxDropped] = sysfs::read_stat(&self.interface, "rx_dropped");
        counters[Category::NicTxDropped] = sysfs::read_stat(&self.interface, "tx_dropped");
        counters[Category::NicRxMissed] = sysfs::read_stat(&self.interface, "rx_missed_errors");
        counters[Category::QdiscDropped] = qdisc::qdisc_dropped(&self.interface);
        counters[Category::SoftirqDropped] = procfs::softnet_dropped();

        let netstat = procfs::ProcNetTable::load("/proc/net/netstat");
        counters[Category::SynQueueDropped] = netstat.get("TcpExt", "ListenDrops");
        counters[Category::AcceptQueueOverflow] = netstat.get("TcpExt", "ListenOverflows");
        counters[Category::TcpPruned] = netstat.get("TcpExt", "PruneCalled");
        counters[Category::TcpCollapsed] = netstat.get("TcpExt", "TCPRcvCollapsed");

        let snmp = procfs::ProcNetTable::load("/proc/net/snmp");
        counters[Category::UdpRcvbufErrors] = snmp.get("Udp", "RcvbufErrors");
        counters[Category::UdpSndbufErrors] = snmp.get("Udp", "SndbufErrors");

        counters
    }
}

pub fn interface_exists(interface: &str) -> bool {
    std::path::Path::new(&format!("/sys/class/net/{interface}")).exists()
}

pub fn network_interfaces() -> Vec<String> {
    let mut interfaces = Vec::new();

    let walker = WalkDir::new("/sys/class/net/")
        .follow_links(true)
        .max_depth(1)
        .into_iter();

    for entry in walker.flatten() {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                interfaces.push(name.to_string());
            }
        }
    }

    interfaces.sort();
    interfaces
}

/// Bonding mode and slave list for a bonding master, `None` for ordinary
/// interfaces.
pub fn bonding_info(interface: &str) -> Option<(String, Vec<String>)> {
    let mode = std::fs::read_to_string(format!("/sys/class/net/{interface}/bonding/mode")).ok()?;
    let mode = mode.split_whitespace().next()?.to_string();

    let slaves = std::fs::read_to_string(format!("/sys/class/net/{interface}/bonding/slaves"))
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Some((mode, slaves))
}
