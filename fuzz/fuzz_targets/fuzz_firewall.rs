#![no_main]

use std::net::Ipv4Addr;

use libfuzzer_sys::fuzz_target;

use domain::common::entity::{Protocol, RuleId};
use domain::firewall::engine::FirewallEngine;
use domain::firewall::entity::{FilterDecision, FirewallAction, FrameType, PacketInfo, RuleSpec};

// Build a rule list and a packet stream from fuzz data and cross-check
// the engine against a straightforward reference walk.
//
// Layout (variable-length):
//   [0]    = number of rules (1-16)
//   [1]    = bitmask of rules to remove afterwards
//   rest   = 14-byte rule chunks, then 14-byte packet chunks
fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }

    let num_rules = (data[0] as usize % 16) + 1;
    let remove_mask = data[1];
    let mut chunks = data[2..].chunks_exact(14);

    let mut engine = FirewallEngine::new();
    for chunk in chunks.by_ref().take(num_rules) {
        let wild = chunk[0];
        let spec = RuleSpec {
            src_addr: (wild & 0x01 == 0)
                .then(|| Ipv4Addr::new(10, 0, 0, chunk[1] % 4)),
            src_port: (wild & 0x02 == 0).then(|| u16::from(chunk[2] % 4)),
            dst_addr: (wild & 0x04 == 0)
                .then(|| Ipv4Addr::new(10, 0, 0, chunk[3] % 4)),
            dst_port: (wild & 0x08 == 0).then(|| u16::from(chunk[4] % 4)),
            protocol: (wild & 0x10 == 0).then(|| Protocol::from_u8(chunk[5] % 20)),
            action: FirewallAction::from_code(chunk[6] % 2),
        };
        engine.add(spec).expect("id space cannot run out here");
    }

    for bit in 0..8u32 {
        if remove_mask & (1 << bit) != 0 {
            engine.remove(RuleId(bit + 1));
        }
    }

    let ids: Vec<u32> = engine.rules().iter().map(|r| r.id.0).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "order must follow ids");

    for chunk in chunks {
        let frame_type = match chunk[7] % 4 {
            0 => FrameType::Ipv6,
            1 => FrameType::Other(0x0806),
            _ => FrameType::Ipv4,
        };
        let packet = if frame_type == FrameType::Ipv4 {
            PacketInfo::ipv4(
                Ipv4Addr::new(10, 0, 0, chunk[1] % 4),
                Ipv4Addr::new(10, 0, 0, chunk[3] % 4),
                Protocol::from_u8(chunk[5] % 20),
                u16::from(chunk[2] % 4),
                u16::from(chunk[4] % 4),
            )
        } else {
            PacketInfo::non_ipv4(frame_type)
        };

        let decision = engine.evaluate(&packet);
        if !packet.is_ipv4() {
            assert_eq!(decision, FilterDecision::Admit);
            continue;
        }

        let expected = engine
            .rules()
            .iter()
            .find(|rule| rule.action() == FirewallAction::Deny && matches(&rule.spec, &packet))
            .map_or(FilterDecision::Admit, |rule| FilterDecision::Drop(rule.id));
        assert_eq!(decision, expected);
    }

    let mut buf = [0u8; 256];
    if let Ok(n) = engine.write_listing(&mut buf) {
        assert_eq!(buf[..n].iter().filter(|&&b| b == b'\n').count(), engine.len());
    }
});

fn matches(spec: &RuleSpec, packet: &PacketInfo) -> bool {
    let ports_apply = matches!(
        Protocol::from_u8(packet.protocol),
        Protocol::Tcp | Protocol::Udp
    );
    spec.src_addr.is_none_or(|a| a == packet.src_addr)
        && spec.dst_addr.is_none_or(|a| a == packet.dst_addr)
        && spec.protocol.is_none_or(|p| p.to_u8() == packet.protocol)
        && (!ports_apply
            || (spec.src_port.is_none_or(|p| p == packet.src_port)
                && spec.dst_port.is_none_or(|p| p == packet.dst_port)))
}
