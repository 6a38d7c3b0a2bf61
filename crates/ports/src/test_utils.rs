use std::sync::{Mutex, PoisonError};

use domain::firewall::entity::BufferHandle;

use crate::secondary::buffer_pool_port::BufferPoolPort;
use crate::secondary::metrics_port::{FirewallMetrics, PacketMetrics};

/// No-op implementation of all metrics sub-traits for use in tests.
pub struct NoopMetrics;

impl PacketMetrics for NoopMetrics {}
impl FirewallMetrics for NoopMetrics {}

/// Buffer pool that only remembers which handles came back.
#[derive(Default)]
pub struct RecordingBufferPool {
    released: Mutex<Vec<u32>>,
}

impl RecordingBufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle numbers released so far, in release order.
    pub fn released(&self) -> Vec<u32> {
        self.released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn release_count(&self) -> usize {
        self.released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl BufferPoolPort for RecordingBufferPool {
    fn release(&self, buffer: BufferHandle) {
        self.released
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer.0);
    }
}

/// Metrics mock that counts packet outcomes and keeps the last rule gauge.
#[derive(Default)]
pub struct RecordingMetrics {
    packets: Mutex<Vec<String>>,
    rules_loaded: Mutex<Option<u64>>,
    rule_changes: Mutex<Vec<(String, String)>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> Vec<String> {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn rules_loaded(&self) -> Option<u64> {
        *self
            .rules_loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn rule_changes(&self) -> Vec<(String, String)> {
        self.rule_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PacketMetrics for RecordingMetrics {
    fn record_packet(&self, action: &str) {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.to_string());
    }
}

impl FirewallMetrics for RecordingMetrics {
    fn set_rules_loaded(&self, count: u64) {
        *self
            .rules_loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(count);
    }

    fn record_rule_change(&self, operation: &str, result: &str) {
        self.rule_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((operation.to_string(), result.to_string()));
    }
}
