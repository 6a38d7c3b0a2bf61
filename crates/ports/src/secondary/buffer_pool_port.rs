use domain::firewall::entity::BufferHandle;

/// Owner of network buffers. The filter returns the buffer of every
/// dropped packet here, exactly once.
pub trait BufferPoolPort: Send + Sync {
    fn release(&self, buffer: BufferHandle);
}
