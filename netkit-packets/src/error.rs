use thiserror::Error;

/// Reasons a raw frame could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated frame: {layer} header needs {needed} bytes, {available} available")]
    TruncatedFrame {
        layer: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("malformed {layer} header: {reason}")]
    Malformed {
        layer: &'static str,
        reason: &'static str,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("invalid MAC address syntax: {0:?}")]
    Mac(String),
}
