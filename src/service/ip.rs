use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Parses `candidate` and accepts it only if it's a public address.
/// Forwarding headers are attacker-controllable, so anything in a private
/// or reserved range is rejected and the caller moves on to the next
/// candidate.
pub fn parse_public(candidate: &str) -> Option<IpAddr> {
    let addr: IpAddr = candidate.trim().parse().ok()?;
    if is_public(&addr) {
        Some(addr)
    } else {
        None
    }
}

pub fn is_public(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

pub fn is_public_v4(addr: &Ipv4Addr) -> bool {
    let octets = addr.octets();
    // 100.64.0.0/10 (CGNAT) and 240.0.0.0/4 (reserved) have no stable
    // std helpers yet
    let shared = octets[0] == 100 && (octets[1] & 0b1100_0000) == 64;
    let reserved = octets[0] >= 240;
    !(addr.is_unspecified()
        || addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        || shared
        || reserved)
}

pub fn is_public_v6(addr: &Ipv6Addr) -> bool {
    let segments = addr.segments();
    let unique_local = (segments[0] & 0xfe00) == 0xfc00;
    let link_local = (segments[0] & 0xffc0) == 0xfe80;
    !(addr.is_unspecified() || addr.is_loopback() || unique_local || link_local)
}
