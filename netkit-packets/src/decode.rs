//! Walks a raw link-layer frame and produces the set of headers it carries.
//!
//! A frame always yields an Ethernet header. Above it sits at most one of an ARP packet or an
//! IPv4 datagram, and a transport header only ever appears inside an IPv4 datagram. The
//! nesting of [`NetworkLayer`] and [`TransportLayer`] makes any other shape unrepresentable.

use crate::cursor::Cursor;
use crate::*;
use std::fmt;
use std::net::Ipv4Addr;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpPacket {
    pub header: ArpHeader,
    /// Present for request/reply packets with Ethernet/IPv4 address lengths.
    pub addresses: Option<ArpAddresses>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportLayer {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Datagram {
    pub header: Ipv4Header,
    pub transport: Option<TransportLayer>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkLayer {
    Arp(ArpPacket),
    Ipv4(Ipv4Datagram),
}

/// Headers decoded from one frame. Everything is owned by the aggregate and goes away with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedHeaders {
    order: ByteOrder,
    ethernet: Option<EthernetHeader>,
    network: Option<NetworkLayer>,
    payload_offset: usize,
}

/// Decodes `data` with the given byte order applied to multi-byte fields.
pub fn decode(data: &[u8], order: ByteOrder) -> Result<DecodedHeaders, DecodeError> {
    DecodedHeaders::decode(data, order)
}

impl DecodedHeaders {
    pub fn decode(data: &[u8], order: ByteOrder) -> Result<DecodedHeaders, DecodeError> {
        let mut cursor = Cursor::new(data);
        let ethernet = EthernetHeader::parse(cursor.take("ethernet", ETHERNET_HEADER_LEN)?, order);
        let ether_type = order.source_u16([data[12], data[13]]);

        let network = match ether_type {
            IPV4_ETHER_TYPE | IPV6_ETHER_TYPE => decode_ip(&mut cursor, order)?,
            ARP_ETHER_TYPE => Some(NetworkLayer::Arp(decode_arp(&mut cursor, order)?)),
            _ => None,
        };

        Ok(DecodedHeaders {
            order,
            ethernet: Some(ethernet),
            network,
            payload_offset: cursor.position(),
        })
    }

    /// Drops every decoded header. Calling it again is a no-op.
    pub fn release(&mut self) {
        self.ethernet = None;
        self.network = None;
        self.payload_offset = 0;
    }

    pub fn is_released(&self) -> bool {
        self.ethernet.is_none()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes consumed by the decoded headers.
    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// The part of `data` (the buffer these headers were decoded from) after the headers.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.payload_offset..).unwrap_or(&[])
    }

    pub fn ethernet(&self) -> Option<&EthernetHeader> {
        self.ethernet.as_ref()
    }

    pub fn network(&self) -> Option<&NetworkLayer> {
        self.network.as_ref()
    }

    pub fn arp(&self) -> Option<&ArpPacket> {
        match &self.network {
            Some(NetworkLayer::Arp(arp)) => Some(arp),
            _ => None,
        }
    }

    pub fn arp_addresses(&self) -> Option<&ArpAddresses> {
        self.arp().and_then(|arp| arp.addresses.as_ref())
    }

    pub fn ipv4(&self) -> Option<&Ipv4Header> {
        self.datagram().map(|datagram| &datagram.header)
    }

    pub fn tcp(&self) -> Option<&TcpHeader> {
        match self.transport() {
            Some(TransportLayer::Tcp(tcp)) => Some(tcp),
            _ => None,
        }
    }

    pub fn udp(&self) -> Option<&UdpHeader> {
        match self.transport() {
            Some(TransportLayer::Udp(udp)) => Some(udp),
            _ => None,
        }
    }

    fn datagram(&self) -> Option<&Ipv4Datagram> {
        match &self.network {
            Some(NetworkLayer::Ipv4(datagram)) => Some(datagram),
            _ => None,
        }
    }

    fn transport(&self) -> Option<&TransportLayer> {
        self.datagram()
            .and_then(|datagram| datagram.transport.as_ref())
    }

    /// Ether type in host order.
    pub fn ether_type(&self) -> Option<u16> {
        self.ethernet
            .map(|ethernet| self.order.host_u16(ethernet.ether_type))
    }

    /// Source and destination ports in host order, from whichever transport header is present.
    pub fn ports(&self) -> Option<(u16, u16)> {
        let (source, dest) = match self.transport()? {
            TransportLayer::Tcp(tcp) => (tcp.source, tcp.dest),
            TransportLayer::Udp(udp) => (udp.source, udp.dest),
        };
        Some((self.order.host_u16(source), self.order.host_u16(dest)))
    }

    /// Source and destination IPv4 addresses of the datagram.
    pub fn ipv4_addrs(&self) -> Option<(Ipv4Addr, Ipv4Addr)> {
        self.ipv4().map(|ip| (ip.saddr, ip.daddr))
    }

    /// Serialises the decoded headers back to bytes, each field written in the representation it
    /// holds. Decoding the result with the inverse swap yields the fields of the original frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload_offset);
        if let Some(ethernet) = &self.ethernet {
            ethernet.write(&mut out);
        }
        match &self.network {
            Some(NetworkLayer::Arp(arp)) => {
                arp.header.write(&mut out);
                if let Some(addresses) = &arp.addresses {
                    addresses.write(&mut out);
                }
            }
            Some(NetworkLayer::Ipv4(datagram)) => {
                datagram.header.write(&mut out);
                match &datagram.transport {
                    Some(TransportLayer::Tcp(tcp)) => tcp.write(&mut out),
                    Some(TransportLayer::Udp(udp)) => udp.write(&mut out),
                    None => {}
                }
            }
            None => {}
        }
        out
    }
}

fn decode_ip(cursor: &mut Cursor<'_>, order: ByteOrder) -> Result<Option<NetworkLayer>, DecodeError> {
    let version = match cursor.peek(1) {
        Some(first) => first[0] >> 4,
        None => {
            return Err(DecodeError::TruncatedFrame {
                layer: "ip",
                needed: 1,
                available: 0,
            })
        }
    };
    if version != 4 {
        debug!(version, "IP version not supported, only the Ethernet header is decoded");
        return Ok(None);
    }

    let fixed = cursor.take("ipv4", IPV4_MIN_HEADER_LEN)?;
    let mut header = Ipv4Header::parse(fixed, order);
    let header_len = header.header_len();
    if header_len < IPV4_MIN_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "ipv4",
            reason: "IHL below 5 words",
        });
    }
    header.options = cursor
        .take("ipv4 options", header_len - IPV4_MIN_HEADER_LEN)?
        .to_vec();

    if header.fragment_offset(order) != 0 {
        debug!(
            fragment_offset = header.fragment_offset(order),
            "non-initial IPv4 fragment, transport header not present"
        );
        return Ok(Some(NetworkLayer::Ipv4(Ipv4Datagram {
            header,
            transport: None,
        })));
    }

    let transport = match header.ip_protocol() {
        IpProtocol::TCP => Some(TransportLayer::Tcp(decode_tcp(cursor, order)?)),
        IpProtocol::UDP => {
            let udp = UdpHeader::parse(cursor.take("udp", UDP_HEADER_LEN)?, order);
            Some(TransportLayer::Udp(udp))
        }
        IpProtocol::ICMP | IpProtocol::ICMPv6 => {
            debug!(protocol = header.protocol, "ICMP not supported");
            None
        }
        IpProtocol::Other(protocol) => {
            debug!(protocol, "IP protocol not supported");
            None
        }
    };

    Ok(Some(NetworkLayer::Ipv4(Ipv4Datagram { header, transport })))
}

fn decode_tcp(cursor: &mut Cursor<'_>, order: ByteOrder) -> Result<TcpHeader, DecodeError> {
    let mut tcp = TcpHeader::parse(cursor.take("tcp", TCP_MIN_HEADER_LEN)?, order);
    let header_len = tcp.header_len();
    if header_len < TCP_MIN_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "tcp",
            reason: "data offset below 5 words",
        });
    }
    tcp.options = cursor
        .take("tcp options", header_len - TCP_MIN_HEADER_LEN)?
        .to_vec();

    if tcp.flags & (TCP_PSH | TCP_SYN) == 0 && cursor.remaining() > 0 {
        debug!(
            trailer = cursor.remaining(),
            "TCP trailer not supported"
        );
    }
    Ok(tcp)
}

fn decode_arp(cursor: &mut Cursor<'_>, order: ByteOrder) -> Result<ArpPacket, DecodeError> {
    let fixed = cursor.take("arp", ARP_HEADER_LEN)?;
    let header = ArpHeader::parse(fixed, order);
    let op = order.source_u16([fixed[6], fixed[7]]);

    let is_request_or_reply = op == ArpOp::Request as u16 || op == ArpOp::Reply as u16;
    let addresses = if is_request_or_reply && header.is_ethernet_ipv4() {
        Some(ArpAddresses::parse(
            cursor.take("arp addresses", ARP_IPV4_ADDRESSES_LEN)?,
        ))
    } else {
        debug!(
            op,
            hln = header.hln,
            pln = header.pln,
            "ARP variant not supported, addresses not decoded"
        );
        None
    };

    if cursor.remaining() > 0 {
        debug!(trailer = cursor.remaining(), "ARP trailer ignored");
    }
    Ok(ArpPacket { header, addresses })
}

impl fmt::Display for DecodedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ethernet = match &self.ethernet {
            Some(ethernet) => ethernet,
            None => return write!(f, "(released)"),
        };
        write!(
            f,
            "eth {} > {} type 0x{:04x}",
            ethernet.src,
            ethernet.dest,
            self.order.host_u16(ethernet.ether_type)
        )?;
        match &self.network {
            Some(NetworkLayer::Arp(arp)) => {
                let op = self.order.host_u16(arp.header.op);
                match &arp.addresses {
                    Some(a) if op == ArpOp::Request as u16 => write!(
                        f,
                        " | arp who-has {} tell {} ({})",
                        a.target_ip, a.sender_ip, a.sender_mac
                    )?,
                    Some(a) => write!(
                        f,
                        " | arp reply {} is-at {}",
                        a.sender_ip, a.sender_mac
                    )?,
                    None => write!(f, " | arp op {}", op)?,
                }
            }
            Some(NetworkLayer::Ipv4(datagram)) => {
                let ip = &datagram.header;
                write!(
                    f,
                    " | ipv4 {} > {} proto {} ttl {} len {}",
                    ip.saddr,
                    ip.daddr,
                    ip.protocol,
                    ip.ttl,
                    self.order.host_u16(ip.tot_len)
                )?;
                match &datagram.transport {
                    Some(TransportLayer::Tcp(tcp)) => write!(
                        f,
                        " | tcp {} > {} flags {} seq {}",
                        self.order.host_u16(tcp.source),
                        self.order.host_u16(tcp.dest),
                        tcp.flag_string(),
                        self.order.host_u32(tcp.seq)
                    )?,
                    Some(TransportLayer::Udp(udp)) => write!(
                        f,
                        " | udp {} > {} len {}",
                        self.order.host_u16(udp.source),
                        self.order.host_u16(udp.dest),
                        self.order.host_u16(udp.len)
                    )?,
                    None => {}
                }
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_frame(flags: u8) -> Vec<u8> {
        let mut data = vec![
            // ethernet
            0x02, 0, 0, 0, 0, 0x02, 0x02, 0, 0, 0, 0, 0x01, 0x08, 0x00,
            // ipv4
            0x45, 0x00, 0x00, 0x28, 0x12, 0x34, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 0, 0, 5,
            10, 0, 0, 1,
            // tcp
            0x01, 0xbb, 0xc7, 0x38, 0, 0, 0, 1, 0, 0, 0, 0, 0x50, 0x00, 0xff, 0xff, 0, 0, 0, 0,
        ];
        data[47] = flags;
        data
    }

    #[test]
    fn decode_tcp_frame() {
        let data = tcp_frame(TCP_SYN);
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert_eq!(headers.payload_offset(), 54);
        assert_eq!(headers.ether_type(), Some(IPV4_ETHER_TYPE));
        assert_eq!(
            headers.ipv4_addrs(),
            Some((Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(headers.ipv4().unwrap().tot_len, 40);
        assert_eq!(headers.ipv4().unwrap().id, 0x1234);
        assert_eq!(headers.ports(), Some((443, 51000)));
        assert_eq!(headers.tcp().unwrap().seq, 1);
        assert!(headers.udp().is_none());
        assert!(headers.arp().is_none());
        assert!(headers.payload(&data).is_empty());
    }

    #[test]
    fn decode_udp_with_payload() {
        let mut data = tcp_frame(0);
        data.truncate(34);
        data[23] = 17;
        data.extend_from_slice(&[0x00, 0x35, 0x30, 0x39, 0x00, 0x0c, 0, 0, 0xaa, 0xbb, 0xcc, 0xdd]);
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert_eq!(headers.payload_offset(), 42);
        assert_eq!(headers.ports(), Some((53, 12345)));
        assert_eq!(headers.udp().unwrap().len, 12);
        assert_eq!(headers.payload(&data), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn ipv4_options_are_skipped() {
        let mut data = tcp_frame(TCP_PSH);
        data[14] = 0x46;
        data.splice(34..34, vec![0x01, 0x01, 0x01, 0x00]);
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert_eq!(headers.ipv4().unwrap().options, vec![1, 1, 1, 0]);
        assert_eq!(headers.ports(), Some((443, 51000)));
        assert_eq!(headers.payload_offset(), 58);
    }

    #[test]
    fn malformed_lengths() {
        let mut data = tcp_frame(TCP_SYN);
        data[14] = 0x44;
        assert!(matches!(
            decode(&data, ByteOrder::NetworkToHost),
            Err(DecodeError::Malformed { layer: "ipv4", .. })
        ));

        let mut data = tcp_frame(TCP_SYN);
        data[46] = 0x40;
        assert!(matches!(
            decode(&data, ByteOrder::NetworkToHost),
            Err(DecodeError::Malformed { layer: "tcp", .. })
        ));

        let mut data = tcp_frame(TCP_SYN);
        data[46] = 0x60;
        assert!(matches!(
            decode(&data, ByteOrder::NetworkToHost),
            Err(DecodeError::TruncatedFrame {
                layer: "tcp options",
                ..
            })
        ));
    }

    #[test]
    fn icmp_and_fragments_leave_transport_empty() {
        let mut data = tcp_frame(0);
        data[23] = 1;
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert!(headers.ipv4().is_some());
        assert!(headers.ports().is_none());
        assert_eq!(headers.payload_offset(), 34);

        let mut data = tcp_frame(0);
        data[20] = 0x00;
        data[21] = 0x10;
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert!(headers.tcp().is_none());
    }

    #[test]
    fn ipv6_payload_is_not_decoded() {
        let mut data = tcp_frame(0);
        data[12] = 0x86;
        data[13] = 0xdd;
        data[14] = 0x60;
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert_eq!(headers.ether_type(), Some(IPV6_ETHER_TYPE));
        assert!(headers.network().is_none());
        assert_eq!(headers.payload_offset(), ETHERNET_HEADER_LEN);
    }

    #[test]
    fn unknown_ether_type() {
        let mut data = tcp_frame(0);
        data[12] = 0x88;
        data[13] = 0xcc;
        let headers = decode(&data, ByteOrder::Unchanged).unwrap();
        assert!(headers.network().is_none());
        assert_eq!(headers.ether_type(), Some(0x88cc));
    }

    #[test]
    fn decode_arp_reply() {
        let mut data = ArpFrame::reply(
            MacAddr::new([0x02, 0, 0, 0, 0, 0x09]),
            Ipv4Addr::new(192, 168, 1, 1),
            MacAddr::new([0x02, 0, 0, 0, 0, 0x01]),
            Ipv4Addr::new(192, 168, 1, 10),
        )
        .frame()
        .data;
        data.resize(60, 0);
        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        let arp = headers.arp().unwrap();
        assert_eq!(arp.header.op, ArpOp::Reply as u16);
        assert_eq!(arp.header.pro, IPV4_ETHER_TYPE);
        let addresses = headers.arp_addresses().unwrap();
        assert_eq!(addresses.sender_ip, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(addresses.sender_mac, MacAddr::new([0x02, 0, 0, 0, 0, 0x09]));
        assert_eq!(addresses.target_ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(headers.payload_offset(), ARP_FRAME_LEN);
    }

    #[test]
    fn arp_without_ipv4_addresses() {
        let mut frame = ArpFrame::new(6, 16);
        frame.set_opcode(ArpOp::Request as u16);
        let headers = decode(frame.as_bytes(), ByteOrder::NetworkToHost).unwrap();
        assert!(headers.arp().is_some());
        assert!(headers.arp_addresses().is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let mut headers = decode(&tcp_frame(TCP_SYN), ByteOrder::NetworkToHost).unwrap();
        assert!(!headers.is_released());
        headers.release();
        assert!(headers.is_released());
        assert!(headers.ipv4().is_none());
        assert!(headers.tcp().is_none());
        assert_eq!(headers.payload_offset(), 0);
        headers.release();
        assert!(headers.is_released());
        assert_eq!(headers.to_string(), "(released)");
    }

    #[test]
    fn display_summary() {
        let headers = decode(&tcp_frame(TCP_SYN), ByteOrder::NetworkToHost).unwrap();
        assert_eq!(
            headers.to_string(),
            "eth 02:00:00:00:00:01 > 02:00:00:00:00:02 type 0x0800 \
             | ipv4 10.0.0.5 > 10.0.0.1 proto 6 ttl 64 len 40 \
             | tcp 443 > 51000 flags S seq 1"
        );

        let request = ArpFrame::request(
            MacAddr::new([0x02, 0, 0, 0, 0, 0x01]),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(10, 0, 0, 1),
        );
        let headers = decode(request.as_bytes(), ByteOrder::Unchanged).unwrap();
        assert_eq!(
            headers.to_string(),
            "eth 02:00:00:00:00:01 > ff:ff:ff:ff:ff:ff type 0x0806 \
             | arp who-has 10.0.0.1 tell 10.0.0.2 (02:00:00:00:00:01)"
        );
    }
}
