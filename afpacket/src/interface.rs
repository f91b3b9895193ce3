//! Read-only view of the host's network interfaces, queried with the netdevice ioctls.

use crate::linux;
use std::{
    ffi::{CStr, CString},
    fs, io,
    net::Ipv4Addr,
};

const SYS_CLASS_NET: &str = "/sys/class/net";

/// Snapshot of one interface's configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub index: i32,
    /// Primary IPv4 address, if one is assigned.
    pub ipv4: Option<Ipv4Addr>,
    pub broadcast: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
    pub mac: [u8; 6],
    /// `IFF_*` flags.
    pub flags: i32,
    pub mtu: u32,
    pub metric: i32,
}

impl InterfaceInfo {
    /// Reads the current configuration of the interface called `name`.
    pub fn from_name(name: &str) -> io::Result<InterfaceInfo> {
        let cname = CString::new(name)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name has a NUL"))?;
        let control = ControlSocket::open()?;

        let index = unsafe { control.request(&cname, linux::SIOCGIFINDEX)?.ifr_ifru.ifru_ivalue };
        let flags = unsafe { control.request(&cname, linux::SIOCGIFFLAGS)?.ifr_ifru.ifru_flags };
        let mtu = unsafe { control.request(&cname, linux::SIOCGIFMTU)?.ifr_ifru.ifru_mtu };
        let metric = unsafe { control.request(&cname, linux::SIOCGIFMETRIC)?.ifr_ifru.ifru_ivalue };
        let hwaddr = unsafe { control.request(&cname, linux::SIOCGIFHWADDR)?.ifr_ifru.ifru_hwaddr };

        let mut mac = [0u8; 6];
        for (octet, byte) in mac.iter_mut().zip(hwaddr.sa_data.iter()) {
            *octet = *byte as u8;
        }

        Ok(InterfaceInfo {
            name: name.to_string(),
            index,
            ipv4: control.ipv4(&cname, linux::SIOCGIFADDR)?,
            broadcast: control.ipv4(&cname, linux::SIOCGIFBRDADDR)?,
            netmask: control.ipv4(&cname, linux::SIOCGIFNETMASK)?,
            mac,
            // The kernel hands flags back as a short; widen without sign extension.
            flags: i32::from(flags as u16),
            mtu: mtu.max(0) as u32,
            metric,
        })
    }

    pub fn is_up(&self) -> bool {
        self.flags & libc::IFF_UP != 0
    }

    pub fn is_running(&self) -> bool {
        self.flags & libc::IFF_RUNNING != 0
    }

    pub fn is_loopback(&self) -> bool {
        self.flags & libc::IFF_LOOPBACK != 0
    }

    pub fn is_promiscuous(&self) -> bool {
        self.flags & libc::IFF_PROMISC != 0
    }

    /// Operational state as shown by `ip link`: `UP`, `DOWN` or `NO-CARRIER` (up without a link).
    pub fn status(&self) -> &'static str {
        match (self.is_up(), self.is_running()) {
            (true, true) => "UP",
            (true, false) => "NO-CARRIER",
            _ => "DOWN",
        }
    }
}

/// Every interface on the host, ordered by index.
pub fn interfaces() -> io::Result<Vec<InterfaceInfo>> {
    let mut infos = Vec::new();
    for entry in fs::read_dir(SYS_CLASS_NET)? {
        let name = entry?.file_name();
        let name = match name.to_str() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match InterfaceInfo::from_name(&name) {
            Ok(info) => infos.push(info),
            // The interface went away between listing and querying it.
            Err(ref e) if e.raw_os_error() == Some(libc::ENODEV) => continue,
            Err(e) => return Err(e),
        }
    }
    infos.sort_by_key(|info| info.index);
    Ok(infos)
}

/// Index of the interface called `name`.
pub fn interface_index(name: &str) -> io::Result<i32> {
    let cname = CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name has a NUL"))?;
    let control = ControlSocket::open()?;
    Ok(unsafe { control.request(&cname, linux::SIOCGIFINDEX)?.ifr_ifru.ifru_ivalue })
}

/// Datagram socket used only as a handle for the netdevice ioctls.
struct ControlSocket {
    fd: libc::c_int,
}

impl ControlSocket {
    fn open() -> io::Result<Self> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ControlSocket { fd })
    }

    /// Issues a SIOCGIF* request for `name` and hands back the filled-in ifreq. Reading the
    /// right union member is up to the caller.
    fn request(&self, name: &CStr, request: libc::c_ulong) -> io::Result<linux::ifreq> {
        let mut ifr = linux::ifreq::with_name(name)?;
        // Resources:
        // man 7 netdevice
        if unsafe { libc::ioctl(self.fd, request, &mut ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ifr)
    }

    /// Reads an IPv4 address request. Interfaces without an address answer `EADDRNOTAVAIL`.
    fn ipv4(&self, name: &CStr, request: libc::c_ulong) -> io::Result<Option<Ipv4Addr>> {
        let ifr = match self.request(name, request) {
            Ok(ifr) => ifr,
            Err(ref e) if e.raw_os_error() == Some(libc::EADDRNOTAVAIL) => return Ok(None),
            Err(e) => return Err(e),
        };
        // Every address member of the union is a sockaddr; for AF_INET it is a sockaddr_in.
        let sin = unsafe { &*(&ifr.ifr_ifru.ifru_addr as *const _ as *const libc::sockaddr_in) };
        if libc::c_int::from(sin.sin_family) != libc::AF_INET {
            return Ok(None);
        }
        Ok(Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
