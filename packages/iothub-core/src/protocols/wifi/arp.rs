//! Parser for `arp -a` style output.
//!
//! BSD, macOS and net-tools on Linux all print one neighbour per line as
//! `hostname (ip) at mac ...`, with `?` in place of an unresolved hostname.
//! Lines without a hardware address (`<incomplete>`) are skipped.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::device::{DeviceMetadata, DeviceRecord};
use crate::protocol_constants::ARP_UNKNOWN_HOSTNAME;

fn arp_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?P<hostname>\S+)?\s+\((?P<ip>\d+\.\d+\.\d+\.\d+)\)\s+at\s+(?P<mac>[0-9a-fA-F:-]+)",
        )
        .expect("ARP line pattern is valid")
    })
}

/// Parses one line into an `(ip, metadata)` pair.
#[must_use]
pub fn parse_line(line: &str) -> Option<(String, DeviceMetadata)> {
    let caps = arp_line_pattern().captures(line)?;
    let ip = caps["ip"].to_string();
    let mac = caps["mac"].to_string();
    let hostname = caps
        .name("hostname")
        .map(|m| m.as_str())
        .filter(|h| *h != ARP_UNKNOWN_HOSTNAME)
        .map(str::to_string);

    Some((
        ip.clone(),
        DeviceMetadata {
            ip: Some(ip),
            mac: Some(mac),
            hostname,
        },
    ))
}

/// Parses full discovery output into records keyed by IP address.
///
/// Records keep the order in which each IP first appears. If the same IP
/// appears again (one line per interface), the last line wins.
#[must_use]
pub fn parse_output(output: &str) -> Vec<(String, DeviceRecord)> {
    let mut records: Vec<(String, DeviceRecord)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (ip, metadata) in output.lines().filter_map(parse_line) {
        let record = DeviceRecord::from_metadata(metadata);
        match positions.entry(ip) {
            Entry::Occupied(slot) => records[*slot.get()].1 = record,
            Entry::Vacant(slot) => {
                records.push((slot.key().clone(), record));
                slot.insert(records.len() - 1);
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACOS_OUTPUT: &str = "\
router.lan (192.168.1.1) at 3c:84:6a:aa:bb:cc on en0 ifscope [ethernet]
? (192.168.1.42) at 84:f3:eb:12:34:56 on en0 ifscope [ethernet]
? (192.168.1.77) at (incomplete) on en0 ifscope [ethernet]
? (224.0.0.251) at 1:0:5e:0:0:fb on en0 ifscope permanent [ethernet]
";

    const LINUX_OUTPUT: &str = "\
gateway (10.0.0.1) at 00:11:22:33:44:55 [ether] on eth0
shelly-plug.local (10.0.0.23) at a4-cf-12-00-00-01 [ether] on wlan0
";

    #[test]
    fn parses_named_host() {
        let (ip, meta) = parse_line(
            "router.lan (192.168.1.1) at 3c:84:6a:aa:bb:cc on en0 ifscope [ethernet]",
        )
        .unwrap();
        assert_eq!(ip, "192.168.1.1");
        assert_eq!(meta.mac.as_deref(), Some("3c:84:6a:aa:bb:cc"));
        assert_eq!(meta.hostname.as_deref(), Some("router.lan"));
    }

    #[test]
    fn question_mark_hostname_is_dropped() {
        let (_, meta) = parse_line("? (192.168.1.42) at 84:f3:eb:12:34:56 on en0").unwrap();
        assert_eq!(meta.hostname, None);
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        assert!(parse_line("? (192.168.1.77) at (incomplete) on en0").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("Address HWtype HWaddress Flags Mask Iface").is_none());
    }

    #[test]
    fn parses_macos_output() {
        let ips: Vec<String> = parse_output(MACOS_OUTPUT)
            .into_iter()
            .map(|(ip, _)| ip)
            .collect();
        assert_eq!(ips, vec!["192.168.1.1", "192.168.1.42", "224.0.0.251"]);
    }

    #[test]
    fn parses_linux_output_with_dashed_mac() {
        let records = parse_output(LINUX_OUTPUT);
        assert_eq!(records.len(), 2);
        let meta = records[1].1.metadata.as_ref().unwrap();
        assert_eq!(meta.mac.as_deref(), Some("a4-cf-12-00-00-01"));
        assert_eq!(meta.hostname.as_deref(), Some("shelly-plug.local"));
    }

    #[test]
    fn duplicate_ip_keeps_last_line() {
        let output = "\
? (10.0.0.5) at aa:aa:aa:aa:aa:aa on eth0
? (10.0.0.5) at bb:bb:bb:bb:bb:bb on wlan0
";
        let records = parse_output(output);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].1.metadata.as_ref().unwrap().mac.as_deref(),
            Some("bb:bb:bb:bb:bb:bb")
        );
    }

    #[test]
    fn large_table_with_repeats_is_deduplicated_in_order() {
        let mut output = String::new();
        for round in 0..50 {
            for host in 0..200 {
                output.push_str(&format!(
                    "? (10.0.{}.{}) at 02:00:00:00:{:02x}:{:02x} on en0\n",
                    host / 100,
                    host % 100,
                    round,
                    host % 256
                ));
            }
        }

        let records = parse_output(&output);
        assert_eq!(records.len(), 200);
        assert_eq!(records[0].0, "10.0.0.0");
        assert_eq!(records[199].0, "10.0.1.99");
        let last = records[150].1.metadata.as_ref().unwrap();
        assert_eq!(last.mac.as_deref(), Some("02:00:00:00:31:96"));
    }
}
