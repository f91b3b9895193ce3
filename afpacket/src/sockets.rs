#![deny(missing_docs)]

use crate::linux;
use std::{
    convert::TryFrom,
    ffi::CStr,
    io,
    mem::{self, MaybeUninit},
    os::unix::io::{AsRawFd, RawFd},
    time::Duration,
};

/// Link-layer address of the peer a frame was received from.
pub struct Addr {
    inner: libc::sockaddr_ll,
}

impl Addr {
    /// Index of the interface the frame arrived on.
    pub fn ifindex(&self) -> i32 {
        self.inner.sll_ifindex
    }

    /// Ether type of the frame, in host order.
    pub fn protocol(&self) -> u16 {
        u16::from_be(self.inner.sll_protocol)
    }

    /// Hardware address of the sender. Empty if the link layer has none.
    pub fn hardware_addr(&self) -> &[u8] {
        let len = usize::from(self.inner.sll_halen).min(self.inner.sll_addr.len());
        &self.inner.sll_addr[..len]
    }
}

/// Represents an unbound `AF_PACKET` socket.  At this phase of a socket's lifecycle, it can be
/// configured.
pub struct Socket {
    fd: libc::c_int,
    protocol: u16,
}

/// Represents a bound `AF_PACKET` socket. At this phase of a socket's lifecycle, it can be read
/// to/written from.
pub struct BoundSocket {
    fd: libc::c_int,
    send_addr: libc::sockaddr_ll,
}

impl Socket {
    /// Creates a new unbound socket receiving every ether type.
    pub fn new() -> io::Result<Self> {
        Socket::with_protocol(libc::ETH_P_ALL as u16)
    }

    /// Creates a new unbound socket that only receives frames of the given ether type, e.g.
    /// `libc::ETH_P_ARP`.
    pub fn with_protocol(protocol: u16) -> io::Result<Self> {
        // This block must be marked as unsafe because it uses FFI with C code. It does not touch
        // any memory owned by Rust code and returns an Err if the socket cannot be created.
        let fd = unsafe {
            // Resources:
            // man 7 packet
            let fd = libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                libc::c_int::from(protocol.to_be()),
            );
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self { fd, protocol })
    }

    /// Binds the socket to a network interface by name. This function consumes the `Socket`
    /// instance, as no more configuration options may be safely changed.
    pub fn bind(self, iface: impl AsRef<CStr>) -> io::Result<BoundSocket> {
        let mut ifr = linux::ifreq::with_name(iface.as_ref())?;
        // ioctl(SIOCGIFINDEX) fills in the index field of the ifreq object. The request lives on
        // our stack for the duration of the call.
        // Resources:
        // man 7 netdevice
        let index = unsafe {
            if libc::ioctl(self.fd, linux::SIOCGIFINDEX, &mut ifr) < 0 {
                return Err(io::Error::last_os_error());
            }
            ifr.ifr_ifru.ifru_ivalue // expanded from `ifr_ifindex` in kernel headers
        };
        self.bind_index(index)
    }

    /// Binds the socket to the interface with the given index. Index 0 receives from every
    /// interface, but such a socket cannot send.
    pub fn bind_index(self, index: i32) -> io::Result<BoundSocket> {
        // This block is marked as unsafe because it uses FFI. The address is a plain value on our
        // stack and its size is passed along with it.
        let send_addr = unsafe {
            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = self.protocol.to_be();
            ll.sll_ifindex = index;
            // Resources:
            // man 7 packet regarding sockaddr_ll
            let err = libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            ll
        };
        let fd = self.fd;
        // The file descriptor is transferred to the BoundSocket we're returning, so `self` must
        // not close it on drop.
        mem::forget(self);
        Ok(BoundSocket { fd, send_addr })
    }

    /// Configures the socket's non-blocking status.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        set_nonblocking(self.fd, nonblocking)
    }

    /// Returns true if the socket is configured not to block, false otherwise.
    pub fn is_nonblocking(&self) -> io::Result<bool> {
        is_nonblocking(self.fd)
    }
}

impl BoundSocket {
    /// Index of the interface the socket is bound to.
    pub fn ifindex(&self) -> i32 {
        self.send_addr.sll_ifindex
    }

    /// Sends a frame to the NIC.
    pub fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        // This block is marked as unsafe because it uses FFI. It borrows the Rust-owned frame and
        // passes its length along, so the C side never reads past it.
        unsafe {
            // Resources:
            // https://beej.us/guide/bgnet/html/multi/syscalls.html#sendtorecv
            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &self.send_addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Receives a frame from the NIC, blocking until one arrives.
    pub fn recv(&mut self, frame: &mut [u8]) -> io::Result<(usize, Addr)> {
        // Note comment in `send` call.
        unsafe {
            let mut storage = MaybeUninit::<libc::sockaddr_ll>::zeroed();
            let mut addrlen = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;

            let bytes = libc::recvfrom(
                self.fd,
                frame.as_mut_ptr() as *mut _,
                frame.len(),
                0,
                storage.as_mut_ptr() as *mut libc::sockaddr,
                &mut addrlen,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok((
                    bytes as usize,
                    Addr {
                        inner: storage.assume_init(),
                    },
                ))
            }
        }
    }

    /// Waits at most `timeout` for a frame. Returns `Ok(None)` if none arrived in time or the
    /// wait was interrupted by a signal.
    pub fn recv_timeout(
        &mut self,
        frame: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, Addr)>> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // Round up so that a sub-millisecond remainder still waits instead of spinning.
        let millis = (timeout.as_micros() + 999) / 1000;
        let millis = libc::c_int::try_from(millis).unwrap_or(libc::c_int::MAX);

        // Resources:
        // man 2 poll
        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err);
        }
        if ready == 0 {
            return Ok(None);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 && pfd.revents & libc::POLLIN == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "socket reported an error while waiting",
            ));
        }
        self.recv(frame).map(Some)
    }

    /// Puts the bound interface into (or takes it out of) promiscuous mode for as long as this
    /// socket is open.
    pub fn set_promiscuous(&mut self, promiscuous: bool) -> io::Result<()> {
        let mreq = linux::packet_mreq {
            mr_ifindex: self.send_addr.sll_ifindex,
            mr_type: linux::PACKET_MR_PROMISC,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let op = if promiscuous {
            linux::PACKET_ADD_MEMBERSHIP
        } else {
            linux::PACKET_DROP_MEMBERSHIP
        };
        // The membership request is a plain value on our stack and its size is passed with it.
        // Resources:
        // man 7 packet, "Socket options"
        let err = unsafe {
            libc::setsockopt(
                self.fd,
                linux::SOL_PACKET,
                op,
                &mreq as *const _ as *const libc::c_void,
                mem::size_of::<linux::packet_mreq>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Configures the socket's non-blocking status.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        set_nonblocking(self.fd, nonblocking)
    }
}

fn set_nonblocking(fd: libc::c_int, nonblocking: bool) -> io::Result<()> {
    // This block is marked as unsafe because it uses FFI, however, fcntl's failures are handled
    // and no Rust-owned memory is borrowed.
    // Resources used to write syscall code:
    // https://beej.us/guide/bgnet/html/multi/advanced.html#blocking
    // man 2 fcntl
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let new_flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & (!libc::O_NONBLOCK)
        };
        if libc::fcntl(fd, libc::F_SETFL, new_flags) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn is_nonblocking(fd: libc::c_int) -> io::Result<bool> {
    // See comments on block above (in set_nonblocking).
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags & libc::O_NONBLOCK == libc::O_NONBLOCK)
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl AsRawFd for BoundSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
