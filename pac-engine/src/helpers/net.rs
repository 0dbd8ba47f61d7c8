//! DNS and IPv4 helpers
//!
//! The PAC vocabulary predates IPv6, so everything here deals in IPv4
//! dotted quads only.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs, UdpSocket};

/// The only path from a PAC script to the network.
///
/// Implementations perform one blocking lookup per call and hold no
/// connections between calls.
pub trait HostResolver: Send + Sync + fmt::Debug {
    /// Resolve a hostname to its first IPv4 address
    fn resolve_ipv4(&self, host: &str) -> Option<Ipv4Addr>;

    /// IPv4 address of the machine running the script
    fn local_ipv4(&self) -> Option<Ipv4Addr>;
}

/// Resolver backed by the operating system's name resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        (host, 0)
            .to_socket_addrs()
            .ok()?
            .find_map(|addr| match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
    }

    fn local_ipv4(&self) -> Option<Ipv4Addr> {
        // Connecting a UDP socket only selects a route, nothing is sent
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect("8.8.8.8:53").ok()?;
        match socket.local_addr().ok()?.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        }
    }
}

/// `dnsResolve`: dotted quad for `host`, or an empty string
pub fn dns_resolve(resolver: &dyn HostResolver, host: &str) -> String {
    if host.trim().is_empty() {
        return String::new();
    }
    resolver
        .resolve_ipv4(host)
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

/// `isResolvable`: true if `dnsResolve` would produce an address
pub fn is_resolvable(resolver: &dyn HostResolver, host: &str) -> bool {
    !dns_resolve(resolver, host).is_empty()
}

/// `myIpAddress`: local IPv4 address, loopback when none is routable
pub fn my_ip_address(resolver: &dyn HostResolver) -> String {
    resolver
        .local_ipv4()
        .unwrap_or(Ipv4Addr::LOCALHOST)
        .to_string()
}

/// `isInNet`: masked comparison of two dotted quads
pub fn is_in_net(host: &str, pattern: &str, mask: &str) -> bool {
    let (Some(host), Some(pattern), Some(mask)) = (
        parse_dotted_quad(host),
        parse_dotted_quad(pattern),
        parse_dotted_quad(mask),
    ) else {
        return false;
    };
    (host & mask) == (pattern & mask)
}

/// Parse exactly four decimal octets of one to three digits each
fn parse_dotted_quad(s: &str) -> Option<u32> {
    let mut octets = s.split('.');
    let mut value = 0u32;
    for _ in 0..4 {
        let octet = octets.next()?;
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u32 = octet.parse().ok()?;
        if octet > 255 {
            return None;
        }
        value = (value << 8) | octet;
    }
    if octets.next().is_some() {
        return None;
    }
    Some(value)
}
