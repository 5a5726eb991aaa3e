use std::process::Command;

/// Total packets dropped across all qdiscs on an interface, read by shelling
/// out to `tc -s qdisc show`. A missing `tc` binary, a failing invocation,
/// or unparseable output reads as zero.
pub fn qdisc_dropped(interface: &str) -> u64 {
    let output = Command::new("tc")
        .args(["-s", "qdisc", "show", "dev", interface])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            parse_tc_output(&String::from_utf8_lossy(&output.stdout))
        }
        _ => 0,
    }
}

/// `tc -s` statistics lines look like:
///
/// ```plain
/// Sent 4936 bytes 36 pkt (dropped 3, overlimits 0 requeues 0)
/// ```
fn parse_tc_output(text: &str) -> u64 {
    let mut total = 0;
    let mut words = text.split_whitespace();

    while let Some(word) = words.next() {
        if word == "(dropped" {
            if let Some(value) = words.next() {
                total += value
                    .trim_end_matches([',', ')'])
                    .parse::<u64>()
                    .unwrap_or(0);
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_drops_across_qdiscs() {
        let output = "\
qdisc mq 0: root
 Sent 102938 bytes 1027 pkt (dropped 3, overlimits 0 requeues 0)
 backlog 0b 0p requeues 0
qdisc fq_codel 0: parent :1 limit 10240p flows 1024 quantum 1514
 Sent 51020 bytes 500 pkt (dropped 14, overlimits 0 requeues 0)
 backlog 0b 0p requeues 0
";

        assert_eq!(parse_tc_output(output), 17);
    }

    #[test]
    fn empty_or_unexpected_output_reads_zero() {
        assert_eq!(parse_tc_output(""), 0);
        assert_eq!(parse_tc_output("RTNETLINK answers: No such device"), 0);
        assert_eq!(parse_tc_output("(dropped x, overlimits 0)"), 0);
    }
}
