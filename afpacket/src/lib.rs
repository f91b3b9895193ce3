#![cfg(target_os = "linux")]
mod interface;
mod linux;
mod sockets;

pub use interface::{interface_index, interfaces, InterfaceInfo};
pub use sockets::{Addr, BoundSocket, Socket};
