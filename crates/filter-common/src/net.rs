//! Link and network layer numbers the filter dispatches on.

/// EtherType of an IPv4 frame.
pub const ETH_P_IPV4: u16 = 0x0800;
/// EtherType of an IPv6 frame.
pub const ETH_P_IPV6: u16 = 0x86DD;
/// EtherType of an ARP frame.
pub const ETH_P_ARP: u16 = 0x0806;

/// IP protocol number for ICMP.
pub const IPPROTO_ICMP: u8 = 1;
/// IP protocol number for TCP.
pub const IPPROTO_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const IPPROTO_UDP: u8 = 17;

/// Returns `true` if the protocol carries source/destination ports.
#[inline]
pub const fn has_ports(protocol: u8) -> bool {
    matches!(protocol, IPPROTO_TCP | IPPROTO_UDP)
}
