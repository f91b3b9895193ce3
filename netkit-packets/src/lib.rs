//! Wire formats for the raw packet pipeline: link-layer addresses, byte order handling,
//! header decoding, ARP frames and header filters. Nothing in this crate touches a socket.

mod types;
pub use self::types::*;

mod error;
pub use self::error::*;

mod checksum;
pub use self::checksum::*;

mod cursor;

mod ethernet;
pub use self::ethernet::*;

mod ipv4;
pub use self::ipv4::*;

mod udp;
pub use self::udp::*;

mod tcp;
pub use self::tcp::*;

mod arp;
pub use self::arp::*;

mod decode;
pub use self::decode::*;

mod filter;
pub use self::filter::*;
