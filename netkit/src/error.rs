use std::io;
use thiserror::Error;

/// Failures of an ARP resolution. Running out of attempts is not one of them, see
/// [`Resolution::NotFound`](crate::Resolution::NotFound).
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("raw socket I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("interface {iface} has no IPv4 address to resolve from")]
    NoAddress { iface: String },

    #[error("resolution cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("raw socket I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("capture cancelled")]
    Cancelled,
}
