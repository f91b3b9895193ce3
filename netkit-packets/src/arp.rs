use crate::cursor::{ipv4_at, mac_at, ne_u16};
use crate::{ByteOrder, EthernetFrame, MacAddr, ARP_ETHER_TYPE, ETHERNET_HEADER_LEN, IPV4_ETHER_TYPE};
use std::convert::TryFrom;
use std::net::Ipv4Addr;

pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

/// Fixed part of an ARP header: htype, ptype, hlen, plen, opcode.
pub const ARP_HEADER_LEN: usize = 8;
/// Sender/target address block for Ethernet + IPv4 (6 + 4 + 6 + 4).
pub const ARP_IPV4_ADDRESSES_LEN: usize = 20;
/// A complete Ethernet/IPv4 ARP frame without padding.
pub const ARP_FRAME_LEN: usize = ETHERNET_HEADER_LEN + ARP_HEADER_LEN + ARP_IPV4_ADDRESSES_LEN;

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);

/// Decoded fixed ARP header. `hrd`, `pro` and `op` carry the decode byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArpHeader {
    pub hrd: u16,
    pub pro: u16,
    pub hln: u8,
    pub pln: u8,
    pub op: u16,
}

impl ArpHeader {
    pub(crate) fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        ArpHeader {
            hrd: order.convert_u16(ne_u16(bytes, 0)),
            pro: order.convert_u16(ne_u16(bytes, 2)),
            hln: bytes[4],
            pln: bytes[5],
            op: order.convert_u16(ne_u16(bytes, 6)),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hrd.to_ne_bytes());
        out.extend_from_slice(&self.pro.to_ne_bytes());
        out.push(self.hln);
        out.push(self.pln);
        out.extend_from_slice(&self.op.to_ne_bytes());
    }

    /// True for Ethernet hardware addresses paired with IPv4 protocol addresses.
    pub fn is_ethernet_ipv4(&self) -> bool {
        self.hln == 6 && self.pln == 4
    }
}

/// Sender and target addresses of an Ethernet/IPv4 ARP packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpAddresses {
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpAddresses {
    pub(crate) fn parse(bytes: &[u8]) -> Self {
        ArpAddresses {
            sender_mac: mac_at(bytes, 0),
            sender_ip: ipv4_at(bytes, 6),
            target_mac: mac_at(bytes, 10),
            target_ip: ipv4_at(bytes, 16),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.sender_mac.bytes);
        out.extend_from_slice(&self.sender_ip.octets());
        out.extend_from_slice(&self.target_mac.bytes);
        out.extend_from_slice(&self.target_ip.octets());
    }
}

/// What a received buffer looks like from the ARP resolver's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpFrameKind {
    NotArp,
    Request,
    Reply,
}

/// Classifies a raw frame by its ether type bytes and ARP opcode. Buffers too short to hold
/// an Ethernet and a fixed ARP header are never ARP.
pub fn classify_arp_frame(data: &[u8]) -> ArpFrameKind {
    if data.len() < ETHERNET_HEADER_LEN + ARP_HEADER_LEN {
        return ArpFrameKind::NotArp;
    }
    if data[12..14] != ARP_ETHER_TYPE.to_be_bytes() {
        return ArpFrameKind::NotArp;
    }
    let (start, end) = OPCODE_RANGE;
    let opcode = &data[ETHERNET_HEADER_LEN + start..ETHERNET_HEADER_LEN + end];
    match u16::from_be_bytes([opcode[0], opcode[1]]) {
        op if op == ArpOp::Request as u16 => ArpFrameKind::Request,
        op if op == ArpOp::Reply as u16 => ArpFrameKind::Reply,
        _ => ArpFrameKind::NotArp,
    }
}

///
/// EthernetFrame wrapper with getters/setters for the packet structure described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
#[derive(Clone, Debug)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    ///
    /// Constructs a new, empty packet with a payload big enough for all ARP fields,
    /// given some hardware/protocol address lengths.
    ///
    pub fn new(hardware_addr_len: u8, protocol_addr_len: u8) -> Self {
        let payload_len = ARP_HEADER_LEN
            + (2 * hardware_addr_len as usize)
            + (2 * protocol_addr_len as usize);
        let payload: Vec<u8> = vec![0; payload_len];

        let mut frame = EthernetFrame::empty();
        frame.set_payload(payload.as_slice());
        frame.set_ether_type(ARP_ETHER_TYPE);

        let mut arp_frame = ArpFrame { frame };
        arp_frame.set_hardware_addr_len(hardware_addr_len);
        arp_frame.set_protocol_addr_len(protocol_addr_len);
        arp_frame
    }

    /// Builds a broadcast "who has `target_ip`" request from the given local identity.
    /// The target hardware address is left zeroed.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut arp_frame = ArpFrame::ethernet_ipv4(ArpOp::Request);
        arp_frame.frame.set_dest_mac(MacAddr::BROADCAST);
        arp_frame.frame.set_src_mac(sender_mac);
        arp_frame.set_ipv4_addresses(&ArpAddresses {
            sender_mac,
            sender_ip,
            target_mac: MacAddr::ZERO,
            target_ip,
        });
        arp_frame
    }

    /// Builds a unicast "`sender_ip` is at `sender_mac`" reply.
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        let mut arp_frame = ArpFrame::ethernet_ipv4(ArpOp::Reply);
        arp_frame.frame.set_dest_mac(target_mac);
        arp_frame.frame.set_src_mac(sender_mac);
        arp_frame.set_ipv4_addresses(&ArpAddresses {
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        });
        arp_frame
    }

    fn ethernet_ipv4(op: ArpOp) -> Self {
        let mut arp_frame = ArpFrame::new(6, 4);
        arp_frame.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp_frame.set_protocol_type(IPV4_ETHER_TYPE);
        arp_frame.set_opcode(op as u16);
        arp_frame
    }

    pub fn hardware_type(&self) -> u16 {
        let (start, end) = HARDWARE_TYPE_RANGE;
        self.arp_u16(start, end)
    }

    pub fn protocol_type(&self) -> u16 {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        self.arp_u16(start, end)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        let (start, _) = HARDWARE_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        let (start, _) = PROTOCOL_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        let (start, end) = OPCODE_RANGE;
        self.arp_u16(start, end)
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.sender_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.sender_protocol_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.target_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.target_protocol_addr_range();
        self.arp_data(start, end)
    }

    /// The sender MAC, if this frame carries 6 byte hardware addresses.
    pub fn sender_mac_addr(&self) -> Option<MacAddr> {
        mac_from_slice(self.sender_hardware_addr())
    }

    pub fn target_mac_addr(&self) -> Option<MacAddr> {
        mac_from_slice(self.target_hardware_addr())
    }

    /// The sender IPv4 address, if this frame carries 4 byte protocol addresses.
    pub fn sender_ipv4_addr(&self) -> Option<Ipv4Addr> {
        ipv4_from_slice(self.sender_protocol_addr())
    }

    pub fn target_ipv4_addr(&self) -> Option<Ipv4Addr> {
        ipv4_from_slice(self.target_protocol_addr())
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        let (start, end) = HARDWARE_TYPE_RANGE;
        self.set_arp_data(&htype.to_be_bytes(), start, end);
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        self.set_arp_data(&ptype.to_be_bytes(), start, end);
    }

    fn set_hardware_addr_len(&mut self, len: u8) {
        let (start, end) = HARDWARE_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    fn set_protocol_addr_len(&mut self, len: u8) {
        let (start, end) = PROTOCOL_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    pub fn set_opcode(&mut self, code: u16) {
        let (start, end) = OPCODE_RANGE;
        self.set_arp_data(&code.to_be_bytes(), start, end);
    }

    // The address setters fail unless the frame carries 6 byte hardware and 4 byte protocol
    // addresses.

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) -> Result<(), &'static str> {
        let range = self.sender_hardware_addr_range();
        self.set_address(&addr.bytes, range)
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) -> Result<(), &'static str> {
        let range = self.sender_protocol_addr_range();
        self.set_address(&addr.octets(), range)
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) -> Result<(), &'static str> {
        let range = self.target_hardware_addr_range();
        self.set_address(&addr.bytes, range)
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) -> Result<(), &'static str> {
        let range = self.target_protocol_addr_range();
        self.set_address(&addr.octets(), range)
    }

    fn set_address(
        &mut self,
        bytes: &[u8],
        (start, end): (usize, usize),
    ) -> Result<(), &'static str> {
        if end - start != bytes.len() {
            return Err("Address does not match the frame's address length field");
        }
        self.set_arp_data(bytes, start, end);
        Ok(())
    }

    // Only for frames built by `ethernet_ipv4`.
    fn set_ipv4_addresses(&mut self, addresses: &ArpAddresses) {
        let mut block = Vec::with_capacity(ARP_IPV4_ADDRESSES_LEN);
        addresses.write(&mut block);
        self.set_arp_data(&block, ARP_HEADER_LEN, ARP_HEADER_LEN + ARP_IPV4_ADDRESSES_LEN);
    }

    pub fn ethernet(&self) -> &EthernetFrame {
        &self.frame
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.frame.as_bytes()
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    fn arp_u16(&self, start: usize, end: usize) -> u16 {
        let bytes = self.arp_data(start, end);
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    // Returns the bytes in the ethernet frame between start and end, exclusive
    fn arp_data(&self, start: usize, end: usize) -> &[u8] {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        &self.frame.data[frame_offset_start..frame_offset_end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        self.frame.data[frame_offset_start..frame_offset_end].copy_from_slice(bytes);
    }

    fn sender_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;

        let start = ARP_HEADER_LEN;
        let end = start + hlen;
        (start, end)
    }

    fn sender_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = ARP_HEADER_LEN + hlen;
        let end = start + plen;
        (start, end)
    }

    fn target_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = ARP_HEADER_LEN + hlen + plen;
        let end = start + hlen;
        (start, end)
    }

    fn target_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = ARP_HEADER_LEN + (2 * hlen) + plen;
        let end = start + plen;
        (start, end)
    }
}

fn mac_from_slice(bytes: &[u8]) -> Option<MacAddr> {
    if bytes.len() != 6 {
        return None;
    }
    Some(mac_at(bytes, 0))
}

fn ipv4_from_slice(bytes: &[u8]) -> Option<Ipv4Addr> {
    if bytes.len() != 4 {
        return None;
    }
    Some(ipv4_at(bytes, 0))
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    ///
    /// Decorates the given EthernetFrame with ArpFrame getters/setters.
    /// Validates
    /// - The frame has an ARP ether type
    /// - The frame has a payload large enough for the hardware/protocol address lengths.
    ///   Anything beyond that is Ethernet padding and is ignored.
    ///
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type.");
        };

        let arp_frame = ArpFrame { frame };
        let payload_len = arp_frame.frame.payload().len();

        if payload_len < ARP_HEADER_LEN {
            return Err("Frame payload is too small");
        }

        let hlen = arp_frame.hardware_addr_len() as usize;
        let plen = arp_frame.protocol_addr_len() as usize;

        if payload_len < (ARP_HEADER_LEN + (2 * hlen) + (2 * plen)) {
            return Err("Frame payload doesn't match address length fields");
        }

        Ok(arp_frame)
    }
}

impl TryFrom<&[u8]> for ArpFrame {
    type Error = &'static str;

    /// Copies a received buffer into an owned frame and validates it as ARP.
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        ArpFrame::try_from(EthernetFrame::try_from(data)?)
    }
}
