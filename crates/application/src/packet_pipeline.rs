use std::sync::Arc;

use domain::firewall::entity::{Disposition, FrameType, InboundPacket};
use ports::primary::packet_filter::PacketFilterPort;
use tracing::trace;

/// Receive-path dispatch by frame type.
///
/// IPv4 frames go through the packet filter. IPv6 and every other frame
/// type are handed straight back to the stack, unfiltered.
pub struct PacketPipeline {
    filter: Arc<dyn PacketFilterPort>,
}

impl PacketPipeline {
    pub fn new(filter: Arc<dyn PacketFilterPort>) -> Self {
        Self { filter }
    }

    pub fn process(&self, packet: InboundPacket) -> Disposition {
        match packet.info.frame_type {
            FrameType::Ipv4 => self.filter.filter(packet),
            FrameType::Ipv6 | FrameType::Other(_) => {
                trace!(
                    ethertype = packet.info.frame_type.ethertype(),
                    "non-IPv4 frame bypasses the filter"
                );
                Disposition::Admit(packet)
            }
        }
    }
}
