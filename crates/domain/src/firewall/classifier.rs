//! Single rule against single packet.

use super::entity::{FirewallAction, FirewallRule, PacketInfo};
use crate::common::entity::Protocol;

/// Result of testing one rule against one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    Matched(FirewallAction),
    NotMatched,
}

impl RuleMatch {
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Test `rule` against an IPv4 `packet`.
///
/// Fields are checked in a fixed order and the first mismatch wins:
/// source address, destination address, protocol, then ports for TCP and
/// UDP only. ICMP and other protocols match on network-layer fields alone.
/// Wildcarded fields are never read.
///
/// Only IPv4 frames may be classified. Any other frame never matches.
pub fn evaluate(rule: &FirewallRule, packet: &PacketInfo) -> RuleMatch {
    debug_assert!(packet.is_ipv4(), "classifier called on a non-IPv4 frame");
    if !packet.is_ipv4() {
        return RuleMatch::NotMatched;
    }

    let spec = &rule.spec;

    if let Some(addr) = spec.src_addr
        && addr != packet.src_addr
    {
        return RuleMatch::NotMatched;
    }

    if let Some(addr) = spec.dst_addr
        && addr != packet.dst_addr
    {
        return RuleMatch::NotMatched;
    }

    if let Some(proto) = spec.protocol
        && proto.to_u8() != packet.protocol
    {
        return RuleMatch::NotMatched;
    }

    match Protocol::from_u8(packet.protocol) {
        Protocol::Tcp | Protocol::Udp => {
            if let Some(port) = spec.src_port
                && port != packet.src_port
            {
                return RuleMatch::NotMatched;
            }
            if let Some(port) = spec.dst_port
                && port != packet.dst_port
            {
                return RuleMatch::NotMatched;
            }
        }
        // No port concept: nothing left to compare.
        Protocol::Icmp | Protocol::Other(_) => {}
    }

    RuleMatch::Matched(spec.action)
}
