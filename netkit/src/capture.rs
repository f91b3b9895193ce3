use crate::{CancelToken, CaptureConfig, CaptureError, FrameChannel};
use afpacket::{BoundSocket, Socket};
use netkit_packets::{decode, DecodedHeaders, Filter};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// A received frame that passed the filter, together with its decoded headers.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub headers: DecodedHeaders,
    pub data: Vec<u8>,
}

impl CapturedFrame {
    pub fn payload_offset(&self) -> usize {
        self.headers.payload_offset()
    }

    pub fn payload(&self) -> &[u8] {
        self.headers.payload(&self.data)
    }
}

/// Receives frames, decodes them and hands back the ones matching a [`Filter`].
pub struct Capture<C> {
    channel: C,
    filter: Filter,
    config: CaptureConfig,
    cancel: Option<CancelToken>,
    buffer: Vec<u8>,
}

impl Capture<BoundSocket> {
    /// Opens a raw socket on `filter.iface`, or on every interface when it is unset.
    pub fn open(filter: Filter, config: CaptureConfig) -> Result<Self, CaptureError> {
        let index = match &filter.iface {
            Some(name) => afpacket::interface_index(name)?,
            None => 0,
        };
        let mut socket = Socket::new()?.bind_index(index)?;
        if config.promiscuous {
            if index == 0 {
                warn!("promiscuous mode needs an interface, capturing without it");
            } else {
                socket.set_promiscuous(true)?;
            }
        }
        debug!(iface = ?filter.iface, index, "capture opened");
        Ok(Capture::new(socket, filter, config))
    }
}

impl<C: FrameChannel> Capture<C> {
    pub fn new(channel: C, filter: Filter, config: CaptureConfig) -> Self {
        Capture {
            channel,
            filter,
            config,
            cancel: None,
            buffer: vec![0; config.snaplen],
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Waits for the next frame matching the filter. Returns `Ok(None)` once `deadline` passes;
    /// without a deadline it waits until a frame matches or the capture is cancelled.
    ///
    /// Frames that fail to decode are skipped.
    pub fn next_match(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<CapturedFrame>, CaptureError> {
        loop {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    return Err(CaptureError::Cancelled);
                }
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    (deadline - now).min(self.config.poll_timeout)
                }
                None => self.config.poll_timeout,
            };

            let len = match self.channel.recv_frame(&mut self.buffer, wait)? {
                Some(len) => len.min(self.buffer.len()),
                None => continue,
            };
            let data = &self.buffer[..len];

            let headers = match decode(data, self.config.byte_order) {
                Ok(headers) => headers,
                Err(error) => {
                    debug!(%error, len, "skipping undecodable frame");
                    continue;
                }
            };
            if !self.filter.matches(&headers) {
                trace!(%headers, "filtered out");
                continue;
            }
            return Ok(Some(CapturedFrame {
                headers,
                data: data.to_vec(),
            }));
        }
    }

    /// Collects every matching frame that arrives within `duration`. A duration too large to
    /// represent collects until the capture is cancelled.
    pub fn collect_for(&mut self, duration: Duration) -> Result<Vec<CapturedFrame>, CaptureError> {
        let deadline = Instant::now().checked_add(duration);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_match(deadline)? {
            frames.push(frame);
        }
        Ok(frames)
    }
}
