/// Reads one per-interface statistic from
/// `/sys/class/net/<interface>/statistics/<stat>`. Missing interfaces,
/// missing statistics, and unparseable values all read as zero.
pub fn read_stat(interface: &str, stat: &str) -> u64 {
    std::fs::read_to_string(format!("/sys/class/net/{interface}/statistics/{stat}"))
        .ok()
        .and_then(|v| v.trim_end().parse().ok())
        .unwrap_or(0)
}
