//! Raw packet pipeline on top of `netkit-packets` and `afpacket`: ARP resolution, filtered
//! capture and the host's ARP table.
//!
//! Nothing here installs a `tracing` subscriber; diagnostics go wherever the application routes
//! them.

mod cancel;
pub use self::cancel::*;

mod config;
pub use self::config::*;

mod error;
pub use self::error::*;

mod channel;
pub use self::channel::*;

mod resolver;
pub use self::resolver::*;

mod capture;
pub use self::capture::*;

pub mod table;

pub use afpacket::{interfaces, InterfaceInfo};
pub use netkit_packets as packets;

use afpacket::Socket;
use netkit_packets::ARP_ETHER_TYPE;
use std::net::Ipv4Addr;

/// Resolves `target` from `local` over a raw ARP socket opened for this call only.
pub fn resolve(
    config: ArpConfig,
    local: &LocalInterface,
    target: Ipv4Addr,
) -> Result<Resolution, ResolveError> {
    let socket = Socket::with_protocol(ARP_ETHER_TYPE)?.bind_index(local.index)?;
    ArpResolver::new(socket, config, *local).resolve(target)
}
