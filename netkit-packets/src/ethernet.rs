use crate::cursor::{mac_at, ne_u16};
use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;

pub const ETHERNET_HEADER_LEN: usize = 14;

/// Decoded Ethernet II header. `ether_type` holds the value produced by the decode byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dest: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
}

impl EthernetHeader {
    // 0                    6                    12                      14
    // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
    pub(crate) fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        EthernetHeader {
            dest: mac_at(bytes, 0),
            src: mac_at(bytes, 6),
            ether_type: order.convert_u16(ne_u16(bytes, 12)),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.dest.bytes);
        out.extend_from_slice(&self.src.bytes);
        out.extend_from_slice(&self.ether_type.to_ne_bytes());
    }
}

/// An owned Ethernet II frame, used to build frames for transmission.
#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: Vec<u8>,
    pub payload_offset: usize,
}

impl EthernetFrame {
    pub fn from_buffer(frame: Vec<u8>) -> Result<EthernetFrame, &'static str> {
        // We could support other formats for the frames, but IP and ARP sit atop Ethernet II
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetFrame {
            data: frame,
            payload_offset: ETHERNET_HEADER_LEN, // To support 802.1Q VLAN Tagging, this number may be different.
        })
    }

    /// Returns an empty EthernetFrame where all values all populated to zero. This function allocates a
    /// new array to hold the header.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        mac_at(&self.data, 0)
    }

    pub fn src_mac(&self) -> MacAddr {
        mac_at(&self.data, 6)
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes([self.data[12], self.data[13]])
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.data[12..=13].copy_from_slice(&ether_type.to_be_bytes());
    }

    // This gives you a cow of a slice of the payload.
    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// EthernetFrames are considered the same if they carry the same bytes.
impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for EthernetFrame {}

impl TryFrom<&[u8]> for EthernetFrame {
    type Error = &'static str;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        EthernetFrame::from_buffer(data.to_vec())
    }
}
