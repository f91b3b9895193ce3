use crate::AddrParseError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub const IPV4_ETHER_TYPE: u16 = 0x0800;
pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV6_ETHER_TYPE: u16 = 0x86DD;

lazy_static! {
    // Either colon separated octets or the dotted triple-of-words form.
    static ref MAC_SYNTAX: Regex = Regex::new(
        r"^(?:[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}|[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4})$"
    )
    .unwrap();
}

/// Returns true if `s` is written as `XX:XX:XX:XX:XX:XX` or `XXXX.XXXX.XXXX`.
pub fn is_valid_mac(s: &str) -> bool {
    MAC_SYNTAX.is_match(s)
}

//Most significant byte is 0th
#[derive(Eq, Clone, Copy, Hash, PartialEq, Default)]
pub struct MacAddr {
    pub bytes: [u8; 6],
}

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr { bytes: [0xff; 6] };
    pub const ZERO: MacAddr = MacAddr { bytes: [0; 6] };

    pub fn new(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddr::BROADCAST
    }

    pub fn is_zero(&self) -> bool {
        *self == MacAddr::ZERO
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr::new(bytes)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl FromStr for MacAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_mac(s) {
            return Err(AddrParseError::Mac(s.to_string()));
        }
        // Both accepted forms carry exactly twelve hex digits once separators are removed.
        let digits: Vec<u8> = s
            .bytes()
            .filter(u8::is_ascii_hexdigit)
            .map(|c| match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                _ => c - b'A' + 10,
            })
            .collect();
        let mut bytes = [0u8; 6];
        for (i, pair) in digits.chunks_exact(2).enumerate() {
            bytes[i] = (pair[0] << 4) | pair[1];
        }
        Ok(MacAddr::new(bytes))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    ICMP,
    TCP,
    UDP,
    ICMPv6,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            58 => IpProtocol::ICMPv6,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(protocol: IpProtocol) -> Self {
        match protocol {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::ICMPv6 => 58,
            IpProtocol::Other(value) => value,
        }
    }
}

/// Byte order handling for multi-byte numeric header fields while decoding.
///
/// A mode names the order of the buffer being decoded and the order the decoded fields end up
/// in. Fields are read in native memory order, exactly as a header struct laid over the buffer
/// would see them, and then converted:
///
/// * `NetworkToHost`: the buffer is in network order, fields hold host values.
/// * `HostToNetwork`: the buffer is in host order, fields hold network order values.
/// * `Unchanged`: the buffer is in network order and fields are left as read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Unchanged,
    HostToNetwork,
    NetworkToHost,
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::NetworkToHost
    }
}

impl ByteOrder {
    pub fn convert_u16(self, value: u16) -> u16 {
        match self {
            ByteOrder::Unchanged => value,
            ByteOrder::HostToNetwork => value.to_be(),
            ByteOrder::NetworkToHost => u16::from_be(value),
        }
    }

    pub fn convert_u32(self, value: u32) -> u32 {
        match self {
            ByteOrder::Unchanged => value,
            ByteOrder::HostToNetwork => value.to_be(),
            ByteOrder::NetworkToHost => u32::from_be(value),
        }
    }

    /// Host value of a 16 bit field as it sits in a buffer of this mode's source order.
    pub fn source_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::HostToNetwork => u16::from_ne_bytes(bytes),
            _ => u16::from_be_bytes(bytes),
        }
    }

    /// Host value of a field decoded with this mode.
    pub fn host_u16(self, value: u16) -> u16 {
        match self {
            ByteOrder::NetworkToHost => value,
            _ => u16::from_be(value),
        }
    }

    pub fn host_u32(self, value: u32) -> u32 {
        match self {
            ByteOrder::NetworkToHost => value,
            _ => u32::from_be(value),
        }
    }

    /// Representation of the host value `value` in a field decoded with this mode.
    pub fn field_u16(self, value: u16) -> u16 {
        match self {
            ByteOrder::NetworkToHost => value,
            _ => value.to_be(),
        }
    }
}

/// Builds the netmask for a CIDR prefix length. Prefixes above 32 are clamped.
pub fn cidr_to_netmask(prefix: u8) -> Ipv4Addr {
    let prefix = u32::from(prefix.min(32));
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    Ipv4Addr::from(mask)
}

/// Returns the prefix length of a contiguous netmask, or `None` if the mask has holes.
pub fn netmask_to_cidr(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return None;
    }
    Some(prefix as u8)
}
