use netkit_packets::ByteOrder;
use std::time::Duration;

/// Retry policy of the ARP resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpConfig {
    /// Requests sent before giving up. Zero gives up without sending anything.
    pub max_attempts: u32,
    /// How long to wait for a reply after each request.
    pub timeout: Duration,
    /// Log every attempt at `info` instead of `debug`.
    pub debug: bool,
    /// Keep waiting when a receive fails instead of failing the resolution.
    pub tolerate_recv_errors: bool,
}

impl Default for ArpConfig {
    fn default() -> Self {
        ArpConfig {
            max_attempts: 3,
            timeout: Duration::from_millis(1000),
            debug: false,
            tolerate_recv_errors: true,
        }
    }
}

impl ArpConfig {
    pub fn new(max_attempts: u32, timeout_ms: u64) -> Self {
        ArpConfig {
            max_attempts,
            timeout: Duration::from_millis(timeout_ms),
            ..ArpConfig::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_tolerate_recv_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_recv_errors = tolerate;
        self
    }

    /// Upper bound on the time spent waiting for replies. Saturates at `Duration::MAX`.
    pub fn total_wait(&self) -> Duration {
        self.timeout
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Applied to every received frame. Frames come off the wire in network order.
    pub byte_order: ByteOrder,
    pub promiscuous: bool,
    /// Longest frame kept; longer frames are cut to this length.
    pub snaplen: usize,
    /// Longest single wait on the socket, so cancellation is noticed in time.
    pub poll_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            byte_order: ByteOrder::NetworkToHost,
            promiscuous: false,
            snaplen: 65535,
            poll_timeout: Duration::from_millis(100),
        }
    }
}

impl CaptureConfig {
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub fn with_snaplen(mut self, snaplen: usize) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}
