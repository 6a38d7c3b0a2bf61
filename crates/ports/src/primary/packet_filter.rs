use domain::firewall::entity::{Disposition, InboundPacket};

/// Receive-path entry point: consume a packet and decide its fate.
pub trait PacketFilterPort: Send + Sync {
    /// A dropped packet's buffer has already been released when this
    /// returns; an admitted packet is handed back to the caller.
    fn filter(&self, packet: InboundPacket) -> Disposition;
}
