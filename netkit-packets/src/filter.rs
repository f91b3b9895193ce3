use crate::*;
use std::net::Ipv4Addr;

/// A simple header filter. Every unset field is a wildcard.
///
/// `iface` is not looked at by [`Filter::matches`]: decoded headers do not know which interface
/// they arrived on. It selects the interface to listen on, see [`Filter::matches_iface`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub ip: Option<Ipv4Addr>,
    pub port: Option<u16>,
    pub iface: Option<String>,
    pub mac: Option<MacAddr>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn with_ip(mut self, ip: Ipv4Addr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_iface(mut self, iface: impl Into<String>) -> Self {
        self.iface = Some(iface.into());
        self
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    /// Sets the MAC from its textual form, `XX:XX:XX:XX:XX:XX` or `XXXX.XXXX.XXXX`.
    pub fn with_mac_str(self, mac: &str) -> Result<Self, AddrParseError> {
        Ok(self.with_mac(mac.parse()?))
    }

    pub fn matches_iface(&self, name: &str) -> bool {
        self.iface.as_deref().map_or(true, |iface| iface == name)
    }

    pub fn matches(&self, headers: &DecodedHeaders) -> bool {
        self.mac_matches(headers) && self.ip_matches(headers) && self.port_matches(headers)
    }

    fn mac_matches(&self, headers: &DecodedHeaders) -> bool {
        let mac = match self.mac {
            Some(mac) => mac,
            None => return true,
        };
        match headers.ethernet() {
            Some(ethernet) => ethernet.src == mac || ethernet.dest == mac,
            None => false,
        }
    }

    // Only frames that carry addresses are constrained: IPv4 datagrams (under the IPv4 or IPv6
    // ether type) and Ethernet/IPv4 ARP packets.
    fn ip_matches(&self, headers: &DecodedHeaders) -> bool {
        let ip = match self.ip {
            Some(ip) => ip,
            None => return true,
        };
        if let Some((saddr, daddr)) = headers.ipv4_addrs() {
            return saddr == ip || daddr == ip;
        }
        if let Some(addresses) = headers.arp_addresses() {
            return addresses.sender_ip == ip || addresses.target_ip == ip;
        }
        true
    }

    fn port_matches(&self, headers: &DecodedHeaders) -> bool {
        match (self.port, headers.ports()) {
            (Some(port), Some((source, dest))) => source == port || dest == port,
            _ => true,
        }
    }
}
