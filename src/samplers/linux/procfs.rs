use std::collections::HashMap;

use tracing::debug;

/// Parsed form of the procfs nested-map layout used by `/proc/net/snmp` and
/// `/proc/net/netstat`:
///
/// ```plain
/// Tcp: RtoAlgorithm RtoMin ... OutRsts
/// Tcp: 1 200 ... 42
/// ```
///
/// Keys and values arrive on alternating lines sharing a protocol prefix.
#[derive(Default)]
pub struct ProcNetTable {
    inner: HashMap<String, HashMap<String, u64>>,
}

impl ProcNetTable {
    pub fn parse(data: &str) -> Self {
        let mut inner: HashMap<String, HashMap<String, u64>> = HashMap::new();

        let mut lines = data.lines();

        while let (Some(k_line), Some(v_line)) = (lines.next(), lines.next()) {
            let keys: Vec<&str> = k_line.split_whitespace().collect();
            let values: Vec<&str> = v_line.split_whitespace().collect();

            if keys.is_empty() || values.is_empty() {
                continue;
            }

            if keys[0] != values[0] {
                debug!("prefix mismatch in procfs table: {} != {}", keys[0], values[0]);
                continue;
            }

            let prefix = keys[0].trim_end_matches(':').to_string();
            let map = inner.entry(prefix).or_default();

            for (key, value) in keys.iter().skip(1).zip(values.iter().skip(1)) {
                if let Ok(value) = value.parse::<u64>() {
                    map.insert(key.to_string(), value);
                }
            }
        }

        Self { inner }
    }

    /// An unreadable file yields an empty table, so every lookup reads zero.
    pub fn load(path: &str) -> Self {
        std::fs::read_to_string(path)
            .map(|data| Self::parse(&data))
            .unwrap_or_default()
    }

    pub fn get(&self, proto: &str, field: &str) -> u64 {
        self.inner
            .get(proto)
            .and_then(|fields| fields.get(field))
            .copied()
            .unwrap_or(0)
    }
}

/// Sums the dropped column (second field, hex) of `/proc/net/softnet_stat`
/// across all CPU rows.
pub fn softnet_dropped() -> u64 {
    std::fs::read_to_string("/proc/net/softnet_stat")
        .map(|data| parse_softnet(&data))
        .unwrap_or(0)
}

fn parse_softnet(data: &str) -> u64 {
    data.lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|field| u64::from_str_radix(field, 16).ok())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNMP: &str = "\
Ip: Forwarding DefaultTTL InReceives
Ip: 1 64 1000
Udp: InDatagrams NoPorts InErrors RcvbufErrors SndbufErrors
Udp: 5000 3 7 12 4
";

    const NETSTAT: &str = "\
TcpExt: SyncookiesSent ListenOverflows ListenDrops PruneCalled TCPRcvCollapsed
TcpExt: 0 2 9 5 1
IpExt: InNoRoutes InTruncatedPkts
IpExt: 0 0
";

    #[test]
    fn parses_udp_buffer_errors() {
        let table = ProcNetTable::parse(SNMP);

        assert_eq!(table.get("Udp", "RcvbufErrors"), 12);
        assert_eq!(table.get("Udp", "SndbufErrors"), 4);
    }

    #[test]
    fn parses_tcp_ext_counters() {
        let table = ProcNetTable::parse(NETSTAT);

        assert_eq!(table.get("TcpExt", "ListenDrops"), 9);
        assert_eq!(table.get("TcpExt", "ListenOverflows"), 2);
        assert_eq!(table.get("TcpExt", "PruneCalled"), 5);
        assert_eq!(table.get("TcpExt", "TCPRcvCollapsed"), 1);
    }

    #[test]
    fn missing_fields_read_zero() {
        let table = ProcNetTable::parse(SNMP);

        assert_eq!(table.get("Udp", "NoSuchField"), 0);
        assert_eq!(table.get("Sctp", "RcvbufErrors"), 0);
        assert_eq!(ProcNetTable::default().get("Udp", "RcvbufErrors"), 0);
    }

    #[test]
    fn mismatched_prefix_rows_are_skipped() {
        let table = ProcNetTable::parse("Tcp: InSegs\nUdp: 5\n");

        assert_eq!(table.get("Tcp", "InSegs"), 0);
    }

    #[test]
    fn softnet_sums_dropped_column_across_cpus() {
        let data = "\
0000272d 00000001 00000014 00000000 00000000 00000000 00000000 00000000 00000000 00000000 00000000
000034d1 0000000a 00000000 00000000 00000000 00000000 00000000 00000000 00000000 00000000 00000000
";

        assert_eq!(parse_softnet(data), 0xb);
    }

    #[test]
    fn softnet_tolerates_garbage() {
        assert_eq!(parse_softnet(""), 0);
        assert_eq!(parse_softnet("nonsense\n"), 0);
    }
}
