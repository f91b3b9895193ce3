use crate::cursor::{ipv4_at, ne_u16};
use crate::*;
use std::net::Ipv4Addr;

pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Decoded IPv4 header.
///
/// Multi-byte fields (`tot_len`, `id`, `frag_off`, `check`) carry the decode byte order.
/// `version`, `ihl`, `tos`, `ttl` and `protocol` are single bytes and are never converted.
/// Addresses are kept as octets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    /// Header length in 32 bit words.
    pub ihl: u8,
    pub tos: u8,
    pub tot_len: u16,
    pub id: u16,
    /// Flags in the top three bits, fragment offset below.
    pub frag_off: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub check: u16,
    pub saddr: Ipv4Addr,
    pub daddr: Ipv4Addr,
    pub options: Vec<u8>,
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Ipv4Header {
            version: 4,
            ihl: 5,
            tos: 0,
            tot_len: 0,
            id: 0,
            frag_off: 0,
            ttl: 64,
            protocol: 0,
            check: 0,
            saddr: Ipv4Addr::UNSPECIFIED,
            daddr: Ipv4Addr::UNSPECIFIED,
            options: Vec::new(),
        }
    }
}

impl Ipv4Header {
    /// Parses the fixed part of the header. `bytes` must hold at least 20 bytes.
    pub(crate) fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        Ipv4Header {
            version: bytes[0] >> 4,
            ihl: bytes[0] & 0x0F,
            tos: bytes[1],
            tot_len: order.convert_u16(ne_u16(bytes, 2)),
            id: order.convert_u16(ne_u16(bytes, 4)),
            frag_off: order.convert_u16(ne_u16(bytes, 6)),
            ttl: bytes[8],
            protocol: bytes[9],
            check: order.convert_u16(ne_u16(bytes, 10)),
            saddr: ipv4_at(bytes, 12),
            daddr: ipv4_at(bytes, 16),
            options: Vec::new(),
        }
    }

    /// Writes the header with every 16 bit field passed through `field`.
    fn write_with(&self, out: &mut Vec<u8>, field: impl Fn(u16) -> [u8; 2]) {
        out.push((self.version << 4) | (self.ihl & 0x0F));
        out.push(self.tos);
        out.extend_from_slice(&field(self.tot_len));
        out.extend_from_slice(&field(self.id));
        out.extend_from_slice(&field(self.frag_off));
        out.push(self.ttl);
        out.push(self.protocol);
        out.extend_from_slice(&field(self.check));
        out.extend_from_slice(&self.saddr.octets());
        out.extend_from_slice(&self.daddr.octets());
        out.extend_from_slice(&self.options);
    }

    /// Writes fields in their in-memory representation.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        self.write_with(out, u16::to_ne_bytes);
    }

    /// Serialises the header in network order, given the order its fields were decoded with.
    pub fn to_wire_bytes(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_len());
        self.write_with(&mut out, |value| order.host_u16(value).to_be_bytes());
        out
    }

    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }

    pub fn ip_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.protocol)
    }

    pub fn dscp(&self) -> u8 {
        self.tos >> 2
    }

    pub fn ecn(&self) -> u8 {
        self.tos & 0x03
    }

    /// Returns tuple of (Don't Fragment, More Fragments)
    pub fn flags(&self, order: ByteOrder) -> (bool, bool) {
        let frag_off = order.host_u16(self.frag_off);
        (frag_off & 0x4000 != 0, frag_off & 0x2000 != 0)
    }

    /// Fragment offset in 8 byte units.
    pub fn fragment_offset(&self, order: ByteOrder) -> u16 {
        order.host_u16(self.frag_off) & 0x1FFF
    }

    /// Calculates what the checksum should be set to given the current header, in host order.
    pub fn compute_checksum(&self, order: ByteOrder) -> u16 {
        let mut wire = self.to_wire_bytes(order);
        wire[10] = 0;
        wire[11] = 0;
        internet_checksum(&wire)
    }

    pub fn checksum_valid(&self, order: ByteOrder) -> bool {
        checksum_valid(&self.to_wire_bytes(order))
    }

    /// Sets the checksum field to a valid value, kept in the same byte order as the other fields.
    pub fn set_checksum(&mut self, order: ByteOrder) {
        self.check = order.field_u16(self.compute_checksum(order));
    }
}
