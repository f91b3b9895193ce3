use crate::cursor::ne_u16;
use crate::*;

pub const UDP_HEADER_LEN: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UdpHeader {
    pub source: u16,
    pub dest: u16,
    pub len: u16,
    pub check: u16,
}

impl UdpHeader {
    pub(crate) fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        UdpHeader {
            source: order.convert_u16(ne_u16(bytes, 0)),
            dest: order.convert_u16(ne_u16(bytes, 2)),
            len: order.convert_u16(ne_u16(bytes, 4)),
            check: order.convert_u16(ne_u16(bytes, 6)),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.source.to_ne_bytes());
        out.extend_from_slice(&self.dest.to_ne_bytes());
        out.extend_from_slice(&self.len.to_ne_bytes());
        out.extend_from_slice(&self.check.to_ne_bytes());
    }
}
