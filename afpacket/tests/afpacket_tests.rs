#![cfg(target_os = "linux")]

use afpacket;
use netkit_packets as packets;
use rand::{self, Rng};
use std::{ffi::CString, net, sync::mpsc, thread, time::Duration};

fn udp_frame(body: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&packets::MacAddr::BROADCAST.bytes);
    data.extend_from_slice(&packets::MacAddr::BROADCAST.bytes);
    data.extend_from_slice(&packets::IPV4_ETHER_TYPE.to_be_bytes());

    let mut ip = packets::Ipv4Header::default();
    ip.protocol = 17;
    ip.ttl = 2;
    ip.tot_len = (packets::IPV4_MIN_HEADER_LEN + packets::UDP_HEADER_LEN + body.len()) as u16;
    ip.saddr = net::Ipv4Addr::new(10, 0, 0, 1);
    ip.daddr = net::Ipv4Addr::new(10, 0, 0, 2);
    ip.set_checksum(packets::ByteOrder::NetworkToHost);
    data.extend(ip.to_wire_bytes(packets::ByteOrder::NetworkToHost));

    data.extend_from_slice(&3001u16.to_be_bytes());
    data.extend_from_slice(&3002u16.to_be_bytes());
    data.extend_from_slice(&((packets::UDP_HEADER_LEN + body.len()) as u16).to_be_bytes());
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(body);
    data
}

#[test]
#[ignore]
fn layer2_loopback() {
    // If this takes more than a second to occur, something's definitely wrong.
    let timeout = Duration::from_secs(1);

    let mut rng = rand::thread_rng();

    let iface_name = CString::new("lo").unwrap();

    let side_a = afpacket::Socket::new().unwrap();
    let mut side_a = side_a.bind(&iface_name).unwrap();

    let side_b = afpacket::Socket::new().unwrap();

    let (tx, rx) = mpsc::channel();

    let thread_b = thread::spawn(move || {
        let mut side_b = side_b.bind(&iface_name).unwrap();
        side_b.set_promiscuous(true).unwrap();

        println!("b: recving packet");
        let mut in_buffer = vec![0; 1500];
        let (len, addr) = side_b.recv(&mut in_buffer).unwrap();
        in_buffer.resize(len, 0);
        println!("b: recved packet on ifindex {}", addr.ifindex());

        side_b.set_promiscuous(false).unwrap();

        tx.send(in_buffer).unwrap();
    });

    // now send a packet from side a to side b
    let body = {
        let mut body = vec![0; 64];
        rng.fill(&mut body[..]);
        body
    };
    let frame = udp_frame(&body);

    println!("a: sending packet");
    side_a.send(&frame).unwrap();
    println!("a: sent packet");

    let in_buffer = rx.recv_timeout(timeout).unwrap();
    assert_eq!(in_buffer, frame);

    let headers = packets::decode(&in_buffer, packets::ByteOrder::NetworkToHost).unwrap();
    assert_eq!(headers.ports(), Some((3001, 3002)));
    assert_eq!(headers.payload(&in_buffer), &body[..]);
    assert!(headers.ipv4().unwrap().checksum_valid(packets::ByteOrder::NetworkToHost));

    thread_b.join().unwrap();
}

#[test]
#[ignore]
fn recv_timeout_expires_on_a_quiet_protocol() {
    // Nothing on loopback speaks this experimental ether type.
    let quiet = 0x88b5;
    let socket = afpacket::Socket::with_protocol(quiet).unwrap();
    let index = afpacket::interface_index("lo").unwrap();
    let mut socket = socket.bind_index(index).unwrap();
    assert_eq!(socket.ifindex(), index);

    let mut buffer = vec![0; 1500];
    let started = std::time::Instant::now();
    let received = socket
        .recv_timeout(&mut buffer, Duration::from_millis(50))
        .unwrap();
    assert!(received.is_none());
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
#[ignore]
fn arp_socket_sees_only_arp() {
    let index = afpacket::interface_index("lo").unwrap();
    let mut sender = afpacket::Socket::new().unwrap().bind_index(index).unwrap();
    let mut receiver = afpacket::Socket::with_protocol(packets::ARP_ETHER_TYPE)
        .unwrap()
        .bind_index(index)
        .unwrap();

    sender.send(&udp_frame(&[1, 2, 3, 4])).unwrap();
    let request = packets::ArpFrame::request(
        packets::MacAddr::new([0x02, 0, 0, 0, 0, 0x01]),
        net::Ipv4Addr::new(127, 0, 0, 1),
        net::Ipv4Addr::new(127, 0, 0, 2),
    );
    sender.send(request.as_bytes()).unwrap();

    let mut buffer = vec![0; 1500];
    let (len, addr) = receiver
        .recv_timeout(&mut buffer, Duration::from_secs(1))
        .unwrap()
        .unwrap();
    assert_eq!(addr.protocol(), 0x0806);
    assert_eq!(
        packets::classify_arp_frame(&buffer[..len]),
        packets::ArpFrameKind::Request
    );
}
