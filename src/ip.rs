use crate::error::AddressProviderError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address family a service is updated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Ipv4,
    Ipv6,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Ipv4, Protocol::Ipv6];

    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            Protocol::Ipv4 => ip.is_ipv4(),
            Protocol::Ipv6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ipv4 => write!(f, "IPv4"),
            Protocol::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// Parse a bare textual address, rejecting the wrong family.
pub fn parse_ip(ip_str: &str, protocol: Protocol) -> Result<IpAddr, AddressProviderError> {
    let malformed = || AddressProviderError::Malformed(ip_str.to_string(), protocol);
    let ip = match protocol {
        Protocol::Ipv4 => IpAddr::V4(Ipv4Addr::from_str(ip_str).map_err(|_| malformed())?),
        Protocol::Ipv6 => IpAddr::V6(Ipv6Addr::from_str(ip_str).map_err(|_| malformed())?),
    };
    Ok(ip)
}

/// Globally routable unicast address.
pub fn is_global(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
                // shared address space, 100.64.0.0/10
                || (a == 100 && (b & 0xc0) == 64)
                // IETF protocol assignments, 192.0.0.0/24
                || (a == 192 && b == 0 && c == 0)
                // benchmarking, 198.18.0.0/15
                || (a == 198 && (b & 0xfe) == 18)
                || a == 0
                || a >= 240)
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            let first = segments[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || is_unique_local(v6)
                || is_unicast_link_local(v6)
                // discard-only, 100::/64
                || segments[..4] == [0x0100, 0, 0, 0]
                // IETF protocol assignments, 2001::/23
                || (first == 0x2001 && segments[1] < 0x0200)
                || (first == 0x2001 && segments[1] == 0x0db8)
                // deprecated site-local, fec0::/10
                || (first & 0xffc0) == 0xfec0
                || v6.to_ipv4_mapped().is_some())
        }
    }
}

/// Address from a private range: RFC 1918 for IPv4, unique local or
/// link local for IPv6.
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => is_unique_local(v6) || is_unicast_link_local(v6),
    }
}

fn is_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Extract every interface address from `ip addr` / `ifconfig` output.
pub fn extract_ips_from_output(output: &str) -> Vec<IpAddr> {
    let mut ips = Vec::new();

    for line in output.lines() {
        // "inet " (IPv4) or "inet6 " (IPv6)
        let Some(inet_pos) = line.find("inet ").or_else(|| line.find("inet6 ")) else {
            continue;
        };
        let Some(word) = line[inet_pos..].split_whitespace().nth(1) else {
            continue;
        };
        // Drop CIDR notation (/24, /64) and IPv6 zone (%eth0)
        let ip_str = word.split('/').next().unwrap_or(word);
        let ip_str = ip_str.split('%').next().unwrap_or(ip_str);
        if let Ok(ip) = IpAddr::from_str(ip_str) {
            ips.push(ip);
        }
    }
    ips
}
