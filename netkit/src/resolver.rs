//! ARP resolution over a [`FrameChannel`].
//!
//! Each attempt broadcasts one request and then waits for a matching reply until the attempt's
//! deadline passes:
//!
//! ```text
//! IDLE -> SENDING -> WAITING -> MATCHED
//!            ^          |
//!            +- RETRY <-+-> EXHAUSTED
//! ```
//!
//! A reply matches when its sender protocol address is the address being resolved. Everything
//! else that arrives while waiting (other replies, requests, non-ARP traffic) is ignored.

use crate::{ArpConfig, CancelToken, FrameChannel, ResolveError};
use afpacket::InterfaceInfo;
use netkit_packets::{classify_arp_frame, ArpFrame, ArpFrameKind, MacAddr};
use std::{
    convert::TryFrom,
    io,
    net::Ipv4Addr,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info, trace, warn};

/// Large enough for any Ethernet frame without jumbo support.
const RECV_BUFFER_LEN: usize = 2048;

/// Longest single wait on the channel, so cancellation is noticed while an attempt is pending.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// The local identity ARP requests are sent from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalInterface {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub index: i32,
}

impl LocalInterface {
    /// Looks the interface up by name in the host's interface registry.
    pub fn from_name(name: &str) -> Result<LocalInterface, ResolveError> {
        LocalInterface::try_from(&InterfaceInfo::from_name(name)?)
    }
}

impl TryFrom<&InterfaceInfo> for LocalInterface {
    type Error = ResolveError;

    fn try_from(info: &InterfaceInfo) -> Result<Self, Self::Error> {
        let ip = info.ipv4.ok_or_else(|| ResolveError::NoAddress {
            iface: info.name.clone(),
        })?;
        Ok(LocalInterface {
            mac: MacAddr::new(info.mac),
            ip,
            index: info.index,
        })
    }
}

/// Outcome of a resolution that ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(MacAddr),
    /// Every attempt timed out without a matching reply.
    NotFound,
}

impl Resolution {
    pub fn mac(&self) -> Option<MacAddr> {
        match self {
            Resolution::Resolved(mac) => Some(*mac),
            Resolution::NotFound => None,
        }
    }
}

enum Wait {
    Matched(MacAddr),
    TimedOut,
}

pub struct ArpResolver<C> {
    channel: C,
    config: ArpConfig,
    local: LocalInterface,
    cancel: Option<CancelToken>,
    buffer: Vec<u8>,
}

impl<C: FrameChannel> ArpResolver<C> {
    pub fn new(channel: C, config: ArpConfig, local: LocalInterface) -> Self {
        ArpResolver {
            channel,
            config,
            local,
            cancel: None,
            buffer: vec![0; RECV_BUFFER_LEN],
        }
    }

    /// Makes every resolution stop with [`ResolveError::Cancelled`] once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &ArpConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Asks the link who owns `target` and waits for the answer.
    pub fn resolve(&mut self, target: Ipv4Addr) -> Result<Resolution, ResolveError> {
        let request = ArpFrame::request(self.local.mac, self.local.ip, target);

        for attempt in 1..=self.config.max_attempts {
            self.check_cancelled()?;
            if self.config.debug {
                info!(%target, attempt, max_attempts = self.config.max_attempts, "sending ARP request");
            } else {
                debug!(%target, attempt, max_attempts = self.config.max_attempts, "sending ARP request");
            }

            self.channel.send_frame(request.as_bytes())?;

            if let Wait::Matched(mac) = self.wait_for_reply(target)? {
                debug!(%target, %mac, attempt, "ARP resolved");
                return Ok(Resolution::Resolved(mac));
            }
        }

        debug!(%target, attempts = self.config.max_attempts, "no ARP reply");
        Ok(Resolution::NotFound)
    }

    fn wait_for_reply(&mut self, target: Ipv4Addr) -> Result<Wait, ResolveError> {
        // A timeout too large to represent waits until a reply or cancellation.
        let deadline = Instant::now().checked_add(self.config.timeout);
        loop {
            self.check_cancelled()?;
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Wait::TimedOut);
                    }
                    (deadline - now).min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };

            let len = match self.channel.recv_frame(&mut self.buffer, wait) {
                Ok(Some(len)) => len.min(self.buffer.len()),
                Ok(None) => continue,
                Err(e) => {
                    self.recv_failed(e)?;
                    // Bounds the retry rate of a channel that fails immediately.
                    thread::sleep(wait);
                    continue;
                }
            };

            if let Some(mac) = reply_from(&self.buffer[..len], target) {
                return Ok(Wait::Matched(mac));
            }
        }
    }

    fn recv_failed(&self, error: io::Error) -> Result<(), ResolveError> {
        if self.config.tolerate_recv_errors {
            warn!(%error, "receive failed while waiting for ARP reply");
            Ok(())
        } else {
            Err(ResolveError::Io(error))
        }
    }

    fn check_cancelled(&self) -> Result<(), ResolveError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ResolveError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Returns the sender hardware address if `frame` is an ARP reply from `target`.
fn reply_from(frame: &[u8], target: Ipv4Addr) -> Option<MacAddr> {
    match classify_arp_frame(frame) {
        ArpFrameKind::Reply => {}
        kind => {
            trace!(?kind, len = frame.len(), "ignoring frame");
            return None;
        }
    }
    let reply = match ArpFrame::try_from(frame) {
        Ok(reply) => reply,
        Err(error) => {
            debug!(error, "ignoring malformed ARP reply");
            return None;
        }
    };
    let sender_ip = reply.sender_ipv4_addr()?;
    if sender_ip != target {
        trace!(sender = %sender_ip, %target, "ARP reply for another address");
        return None;
    }
    reply.sender_mac_addr()
}
