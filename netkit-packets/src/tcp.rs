use crate::cursor::{ne_u16, ne_u32};
use crate::*;

pub const TCP_MIN_HEADER_LEN: usize = 20;

pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_RST: u8 = 0x04;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;
pub const TCP_URG: u8 = 0x20;
pub const TCP_ECE: u8 = 0x40;
pub const TCP_CWR: u8 = 0x80;

/// Decoded TCP header. Options are carried as raw bytes and not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpHeader {
    pub source: u16,
    pub dest: u16,
    pub seq: u32,
    pub ack_seq: u32,
    /// Header length in 32 bit words.
    pub data_offset: u8,
    /// Low nibble of the offset byte (reserved bits and NS).
    pub reserved: u8,
    pub flags: u8,
    pub window: u16,
    pub check: u16,
    pub urg_ptr: u16,
    pub options: Vec<u8>,
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader {
            source: 0,
            dest: 0,
            seq: 0,
            ack_seq: 0,
            data_offset: 5,
            reserved: 0,
            flags: 0,
            window: 0,
            check: 0,
            urg_ptr: 0,
            options: Vec::new(),
        }
    }
}

impl TcpHeader {
    pub(crate) fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        TcpHeader {
            source: order.convert_u16(ne_u16(bytes, 0)),
            dest: order.convert_u16(ne_u16(bytes, 2)),
            seq: order.convert_u32(ne_u32(bytes, 4)),
            ack_seq: order.convert_u32(ne_u32(bytes, 8)),
            data_offset: bytes[12] >> 4,
            reserved: bytes[12] & 0x0F,
            flags: bytes[13],
            window: order.convert_u16(ne_u16(bytes, 14)),
            check: order.convert_u16(ne_u16(bytes, 16)),
            urg_ptr: order.convert_u16(ne_u16(bytes, 18)),
            options: Vec::new(),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.source.to_ne_bytes());
        out.extend_from_slice(&self.dest.to_ne_bytes());
        out.extend_from_slice(&self.seq.to_ne_bytes());
        out.extend_from_slice(&self.ack_seq.to_ne_bytes());
        out.push((self.data_offset << 4) | (self.reserved & 0x0F));
        out.push(self.flags);
        out.extend_from_slice(&self.window.to_ne_bytes());
        out.extend_from_slice(&self.check.to_ne_bytes());
        out.extend_from_slice(&self.urg_ptr.to_ne_bytes());
        out.extend_from_slice(&self.options);
    }

    pub fn header_len(&self) -> usize {
        usize::from(self.data_offset) * 4
    }

    pub fn has_flags(&self, mask: u8) -> bool {
        self.flags & mask == mask
    }

    /// Short tcpdump style rendering of the control bits, e.g. `S.` for SYN+ACK.
    pub fn flag_string(&self) -> String {
        let mut s = String::new();
        for (bit, c) in &[
            (TCP_FIN, 'F'),
            (TCP_SYN, 'S'),
            (TCP_RST, 'R'),
            (TCP_PSH, 'P'),
            (TCP_URG, 'U'),
            (TCP_ECE, 'E'),
            (TCP_CWR, 'W'),
        ] {
            if self.flags & bit != 0 {
                s.push(*c);
            }
        }
        if self.flags & TCP_ACK != 0 {
            s.push('.');
        }
        if s.is_empty() {
            s.push_str("none");
        }
        s
    }
}
