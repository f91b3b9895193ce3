use netkit_packets::*;
use rand::{self, Rng};
use std::net::Ipv4Addr;

fn random_mac(rng: &mut impl Rng) -> MacAddr {
    let mut bytes = [0u8; 6];
    rng.fill(&mut bytes[..]);
    // Keep it unicast so it never collides with the broadcast address.
    bytes[0] &= 0xfe;
    MacAddr::new(bytes)
}

fn ethernet(rng: &mut impl Rng, ether_type: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&random_mac(rng).bytes);
    data.extend_from_slice(&random_mac(rng).bytes);
    data.extend_from_slice(&ether_type.to_be_bytes());
    data
}

fn ipv4(rng: &mut impl Rng, protocol: u8, saddr: Ipv4Addr, daddr: Ipv4Addr) -> Vec<u8> {
    let mut data = vec![0x45, rng.gen()];
    data.extend_from_slice(&rng.gen_range(20u16, 1500).to_be_bytes());
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    // Don't Fragment, offset 0
    data.extend_from_slice(&[0x40, 0x00]);
    data.push(rng.gen_range(1, 255));
    data.push(protocol);
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data.extend_from_slice(&saddr.octets());
    data.extend_from_slice(&daddr.octets());
    data
}

fn tcp_frame(rng: &mut impl Rng, saddr: Ipv4Addr, source: u16, dest: u16) -> Vec<u8> {
    let mut data = ethernet(rng, IPV4_ETHER_TYPE);
    data.extend(ipv4(rng, 6, saddr, Ipv4Addr::new(10, 0, 0, 1)));
    data.extend_from_slice(&source.to_be_bytes());
    data.extend_from_slice(&dest.to_be_bytes());
    data.extend_from_slice(&rng.gen::<u32>().to_be_bytes());
    data.extend_from_slice(&rng.gen::<u32>().to_be_bytes());
    data.push(0x50);
    data.push(TCP_SYN | TCP_ACK);
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data
}

// Same as `tcp_frame` with one word of IPv4 options and one word of TCP options.
fn tcp_frame_with_options(rng: &mut impl Rng) -> Vec<u8> {
    let (source, dest) = (rng.gen(), rng.gen());
    let mut data = tcp_frame(rng, Ipv4Addr::new(10, 0, 0, 6), source, dest);
    data[14] = 0x46;
    // NOP NOP NOP EOL
    let ip_options = [1u8, 1, 1, 0];
    data.splice(34..34, ip_options.iter().cloned());
    data[38 + 12] = 0x60;
    // MSS 1460
    let tcp_options = [2u8, 4, 0x05, 0xb4];
    data.splice(58..58, tcp_options.iter().cloned());
    data
}

fn udp_frame(rng: &mut impl Rng) -> Vec<u8> {
    let mut data = ethernet(rng, IPV4_ETHER_TYPE);
    data.extend(ipv4(rng, 17, Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(192, 168, 0, 2)));
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data.extend_from_slice(&53u16.to_be_bytes());
    data.extend_from_slice(&8u16.to_be_bytes());
    data.extend_from_slice(&rng.gen::<u16>().to_be_bytes());
    data
}

fn arp_frame(rng: &mut impl Rng) -> Vec<u8> {
    ArpFrame::reply(
        random_mac(rng),
        Ipv4Addr::from(rng.gen::<u32>()),
        random_mac(rng),
        Ipv4Addr::from(rng.gen::<u32>()),
    )
    .frame()
    .data
}

fn header_only_frames() -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let source = rng.gen();
    let dest = rng.gen();
    vec![
        tcp_frame(&mut rng, Ipv4Addr::new(10, 0, 0, 5), source, dest),
        tcp_frame_with_options(&mut rng),
        udp_frame(&mut rng),
        arp_frame(&mut rng),
    ]
}

#[test]
fn network_order_survives_a_host_order_round_trip() {
    for _ in 0..32 {
        for wire in header_only_frames() {
            let h0 = decode(&wire, ByteOrder::NetworkToHost).unwrap();
            let host = h0.encode();
            assert_eq!(host.len(), wire.len());

            let h1 = decode(&host, ByteOrder::HostToNetwork).unwrap();
            assert_eq!(h1.encode(), wire);

            let h2 = decode(&h1.encode(), ByteOrder::NetworkToHost).unwrap();
            assert_eq!(h2, h0);
        }
    }
}

#[test]
fn host_order_survives_a_network_order_round_trip() {
    for _ in 0..32 {
        for wire in header_only_frames() {
            let host = decode(&wire, ByteOrder::NetworkToHost).unwrap().encode();

            let network = decode(&host, ByteOrder::HostToNetwork).unwrap().encode();
            let again = decode(&network, ByteOrder::NetworkToHost).unwrap();
            assert_eq!(again.encode(), host);
            assert_eq!(again.ports(), decode(&wire, ByteOrder::NetworkToHost).unwrap().ports());
        }
    }
}

#[test]
fn unchanged_encodes_the_input() {
    for wire in header_only_frames() {
        let headers = decode(&wire, ByteOrder::Unchanged).unwrap();
        assert_eq!(headers.encode(), wire);
    }
}

#[test]
fn every_truncation_point_is_reported() {
    for order in &[
        ByteOrder::Unchanged,
        ByteOrder::HostToNetwork,
        ByteOrder::NetworkToHost,
    ] {
        for wire in header_only_frames() {
            // Host order buffers dispatch on host order ether types.
            let data = match order {
                ByteOrder::HostToNetwork => decode(&wire, ByteOrder::NetworkToHost)
                    .unwrap()
                    .encode(),
                _ => wire,
            };
            assert!(decode(&data, *order).is_ok());
            for cut in 0..data.len() {
                match decode(&data[..cut], *order) {
                    Err(DecodeError::TruncatedFrame {
                        needed, available, ..
                    }) => assert!(available < needed),
                    other => panic!("cut at {} of {}: {:?}", cut, data.len(), other),
                }
            }
        }
    }
}

#[test]
fn option_bytes_are_swept() {
    let frame = tcp_frame_with_options(&mut rand::thread_rng());
    assert_eq!(frame.len(), 14 + 24 + 24);
    let headers = decode(&frame, ByteOrder::NetworkToHost).unwrap();
    assert_eq!(headers.ipv4().unwrap().options, vec![1, 1, 1, 0]);
    assert_eq!(headers.tcp().unwrap().options, vec![2, 4, 0x05, 0xb4]);

    let layers: Vec<&str> = (0..frame.len())
        .filter_map(|cut| match decode(&frame[..cut], ByteOrder::NetworkToHost) {
            Err(DecodeError::TruncatedFrame { layer, .. }) => Some(layer),
            _ => None,
        })
        .collect();
    assert!(layers.contains(&"ipv4 options"));
    assert!(layers.contains(&"tcp options"));
}

#[test]
fn payload_follows_the_headers() {
    let mut rng = rand::thread_rng();
    for wire in header_only_frames() {
        let header_len = wire.len();
        let mut data = wire;
        let mut payload = vec![0u8; rng.gen_range(1, 64)];
        rng.fill(&mut payload[..]);
        data.extend_from_slice(&payload);

        let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert_eq!(headers.payload_offset(), header_len);
        assert_eq!(headers.payload(&data), &payload[..]);
    }
}

#[test]
fn empty_filter_matches_everything() {
    let mut rng = rand::thread_rng();
    let filter = Filter::new();
    let mut frames = header_only_frames();
    let mut ipv6 = ethernet(&mut rng, IPV6_ETHER_TYPE);
    ipv6.push(0x60);
    frames.push(ipv6);
    frames.push(ethernet(&mut rng, 0x88cc));

    for data in frames {
        let mut headers = decode(&data, ByteOrder::NetworkToHost).unwrap();
        assert!(filter.matches(&headers));
        headers.release();
        assert!(filter.matches(&headers));
    }
}

#[test]
fn filter_on_source_ip_and_port() {
    let mut rng = rand::thread_rng();
    let data = tcp_frame(&mut rng, Ipv4Addr::new(10, 0, 0, 5), 443, 51000);
    let headers = decode(&data, ByteOrder::NetworkToHost).unwrap();

    let filter = Filter::new()
        .with_ip(Ipv4Addr::new(10, 0, 0, 5))
        .with_port(443);
    assert!(filter.matches(&headers));
    assert!(!Filter::new()
        .with_ip(Ipv4Addr::new(10, 0, 0, 6))
        .matches(&headers));
}

#[test]
fn classify_short_and_reply_frames() {
    let mut rng = rand::thread_rng();
    let reply = arp_frame(&mut rng);
    assert_eq!(classify_arp_frame(&reply), ArpFrameKind::Reply);
    for cut in 0..ETHERNET_HEADER_LEN + ARP_HEADER_LEN {
        assert_eq!(classify_arp_frame(&reply[..cut]), ArpFrameKind::NotArp);
    }
    // The fixed header alone is enough to classify.
    assert_eq!(
        classify_arp_frame(&reply[..ETHERNET_HEADER_LEN + ARP_HEADER_LEN]),
        ArpFrameKind::Reply
    );

    let mut not_arp = reply.clone();
    not_arp[12..14].copy_from_slice(&IPV4_ETHER_TYPE.to_be_bytes());
    assert_eq!(classify_arp_frame(&not_arp), ArpFrameKind::NotArp);
}
