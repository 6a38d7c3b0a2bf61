// Focused sub-traits for recording Prometheus metrics.
//
// All methods take `&self` because the underlying implementation uses
// atomic operations (interior mutability via `prometheus-client`).
//
// Default implementations are no-ops, allowing test mocks to implement
// only the sub-traits relevant to the service under test.

// ── Packet filtering metrics ───────────────────────────────────────

pub trait PacketMetrics: Send + Sync {
    /// Record a filtered packet with its outcome (`admit` or `drop`).
    fn record_packet(&self, _action: &str) {}

    /// Observe the time spent walking the rule list, in seconds.
    fn observe_filter_duration(&self, _duration_seconds: f64) {}
}

// ── Rule store metrics ─────────────────────────────────────────────

pub trait FirewallMetrics: Send + Sync {
    /// Set the number of rules currently installed.
    fn set_rules_loaded(&self, _count: u64) {}

    /// Record a rule store mutation (`add`, `remove`) and its result.
    fn record_rule_change(&self, _operation: &str, _result: &str) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing the sub-traits.
///
/// Services accept `Arc<dyn MetricsPort>`.
pub trait MetricsPort: PacketMetrics + FirewallMetrics {}

impl<T> MetricsPort for T where T: PacketMetrics + FirewallMetrics {}
