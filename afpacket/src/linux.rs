#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
// Not every union member is read, but the layout has to match the kernel's.
#![allow(dead_code)]

use std::{ffi::CStr, io, mem::MaybeUninit, ptr};

// Resources:
// man 7 netdevice
pub(crate) const SIOCGIFFLAGS: libc::c_ulong = 0x8913;
pub(crate) const SIOCGIFADDR: libc::c_ulong = 0x8915;
pub(crate) const SIOCGIFBRDADDR: libc::c_ulong = 0x8919;
pub(crate) const SIOCGIFNETMASK: libc::c_ulong = 0x891b;
pub(crate) const SIOCGIFMETRIC: libc::c_ulong = 0x891d;
pub(crate) const SIOCGIFMTU: libc::c_ulong = 0x8921;
pub(crate) const SIOCGIFHWADDR: libc::c_ulong = 0x8927;
pub(crate) const SIOCGIFINDEX: libc::c_ulong = 0x8933;

// Resources:
// man 7 packet, <linux/if_packet.h>
pub(crate) const SOL_PACKET: libc::c_int = 263;
pub(crate) const PACKET_ADD_MEMBERSHIP: libc::c_int = 1;
pub(crate) const PACKET_DROP_MEMBERSHIP: libc::c_int = 2;
pub(crate) const PACKET_MR_PROMISC: libc::c_ushort = 1;

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct ifmap {
    pub(crate) mem_start: libc::c_ulong,
    pub(crate) mem_end: libc::c_ulong,
    pub(crate) base_addr: libc::c_ushort,
    pub(crate) irq: libc::c_uchar,
    pub(crate) dma: libc::c_uchar,
    pub(crate) port: libc::c_uchar,
}

#[repr(C)]
pub(crate) union ifru {
    pub(crate) ifru_addr: libc::sockaddr,
    pub(crate) ifru_dstaddr: libc::sockaddr,
    pub(crate) ifru_broadaddr: libc::sockaddr,
    pub(crate) ifru_netmask: libc::sockaddr,
    pub(crate) ifru_hwaddr: libc::sockaddr,
    pub(crate) ifru_flags: libc::c_short,
    pub(crate) ifru_ivalue: libc::c_int,
    pub(crate) ifru_mtu: libc::c_int,
    pub(crate) ifru_map: ifmap,
    pub(crate) ifru_slave: [libc::c_char; libc::IFNAMSIZ],
    pub(crate) ifru_newname: [libc::c_char; libc::IFNAMSIZ],
}

#[repr(C)]
pub(crate) union ifrn {
    pub(crate) ifrn_name: [libc::c_char; libc::IFNAMSIZ],
}

#[repr(C)]
pub(crate) struct ifreq {
    pub(crate) ifr_ifrn: ifrn,
    pub(crate) ifr_ifru: ifru,
}

impl ifreq {
    /// A zeroed request carrying `name`. Names must leave room for the trailing NUL.
    pub(crate) fn with_name(name: &CStr) -> io::Result<ifreq> {
        let bytes = name.to_bytes_with_nul();
        if bytes.len() > libc::IFNAMSIZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name too long",
            ));
        }
        // Zeroed is a valid bit pattern for every member of the request.
        unsafe {
            let mut ifr: ifreq = MaybeUninit::zeroed().assume_init();
            ptr::copy_nonoverlapping(
                name.as_ptr(),
                ifr.ifr_ifrn.ifrn_name.as_mut_ptr(),
                bytes.len(),
            );
            Ok(ifr)
        }
    }
}

/// `struct packet_mreq` from `<linux/if_packet.h>`.
#[repr(C)]
pub(crate) struct packet_mreq {
    pub(crate) mr_ifindex: libc::c_int,
    pub(crate) mr_type: libc::c_ushort,
    pub(crate) mr_alen: libc::c_ushort,
    pub(crate) mr_address: [libc::c_uchar; 8],
}
