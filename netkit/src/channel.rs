use afpacket::BoundSocket;
use std::{io, time::Duration};

/// A link-layer frame transport. The resolver and the capture loop only ever talk to the network
/// through this trait, so they can be driven by a raw socket or by a test double.
pub trait FrameChannel {
    /// Transmits one complete frame and returns the number of bytes sent.
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Waits at most `timeout` for one frame and copies it into `buffer`. `Ok(None)` means
    /// nothing arrived in time; frames longer than `buffer` are cut short.
    fn recv_frame(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

impl FrameChannel for BoundSocket {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.send(frame)
    }

    fn recv_frame(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        Ok(self.recv_timeout(buffer, timeout)?.map(|(len, _)| len))
    }
}

impl<C: FrameChannel + ?Sized> FrameChannel for &mut C {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        (**self).send_frame(frame)
    }

    fn recv_frame(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        (**self).recv_frame(buffer, timeout)
    }
}
