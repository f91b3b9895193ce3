//! The kernel's IPv4 neighbour cache as exposed in `/proc/net/arp`.

use netkit_packets::MacAddr;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    net::Ipv4Addr,
    path::Path,
};
use tracing::debug;

pub const PROC_NET_ARP: &str = "/proc/net/arp";

/// Entry has a resolved hardware address.
pub const ATF_COM: u16 = 0x02;
/// Entry was added by hand and never expires.
pub const ATF_PERM: u16 = 0x04;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub hw_type: u16,
    pub flags: u16,
    pub mac: MacAddr,
    pub iface: String,
}

impl ArpEntry {
    pub fn is_complete(&self) -> bool {
        self.flags & ATF_COM != 0
    }

    pub fn is_permanent(&self) -> bool {
        self.flags & ATF_PERM != 0
    }

    // IP address       HW type     Flags       HW address            Mask     Device
    // 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
    fn parse(line: &str) -> Option<ArpEntry> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return None;
        }
        Some(ArpEntry {
            ip: fields[0].parse().ok()?,
            hw_type: parse_hex(fields[1])?,
            flags: parse_hex(fields[2])?,
            mac: fields[3].parse().ok()?,
            iface: fields[5].to_string(),
        })
    }
}

fn parse_hex(field: &str) -> Option<u16> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u16::from_str_radix(digits, 16).ok()
}

/// Parses the `/proc/net/arp` format. The header line is skipped and lines that do not parse are
/// logged and dropped.
pub fn parse_arp_table(reader: impl BufRead) -> io::Result<Vec<ArpEntry>> {
    let mut entries = Vec::new();
    for line in reader.lines().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match ArpEntry::parse(&line) {
            Some(entry) => entries.push(entry),
            None => debug!(%line, "skipping unparsable ARP table line"),
        }
    }
    Ok(entries)
}

pub fn read_arp_table(path: impl AsRef<Path>) -> io::Result<Vec<ArpEntry>> {
    parse_arp_table(BufReader::new(File::open(path)?))
}

/// Snapshot of the host's ARP table.
pub fn arp_table() -> io::Result<Vec<ArpEntry>> {
    read_arp_table(PROC_NET_ARP)
}

/// First complete entry for `ip` in `entries`.
pub fn find_entry(entries: &[ArpEntry], ip: Ipv4Addr) -> Option<&ArpEntry> {
    entries
        .iter()
        .find(|entry| entry.ip == ip && entry.is_complete())
}

/// Looks `ip` up in the host's ARP table without sending anything.
pub fn lookup(ip: Ipv4Addr) -> io::Result<Option<ArpEntry>> {
    Ok(find_entry(&arp_table()?, ip).cloned())
}
