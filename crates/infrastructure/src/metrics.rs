use ports::secondary::metrics_port::{FirewallMetrics, PacketMetrics};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets_range};
use prometheus_client::registry::Registry;

use crate::constants::METRICS_PREFIX;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ActionLabels {
    pub action: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RuleChangeLabels {
    pub operation: String,
    pub result: String,
}

// ── Agent metrics registry ──────────────────────────────────────────

/// Prometheus metrics registry for the agent.
///
/// All metric families use interior mutability (atomics), so recording
/// metrics only requires `&self`. Wrap in `Arc` to share it.
pub struct AgentMetrics {
    registry: Registry,
    pub packets_total: Family<ActionLabels, Counter>,
    pub filter_duration: Histogram,
    pub rules_loaded: Gauge,
    pub rule_changes_total: Family<RuleChangeLabels, Counter>,
}

impl AgentMetrics {
    /// Create a registry with every metric registered under the
    /// `rulewall` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(METRICS_PREFIX);

        let packets_total = Family::<ActionLabels, Counter>::default();
        registry.register(
            "packets",
            "Packets evaluated by the filter, by outcome",
            packets_total.clone(),
        );

        // 100ns to 1ms
        let filter_duration = Histogram::new(exponential_buckets_range(0.000_000_1, 0.001, 10));
        registry.register(
            "filter_duration_seconds",
            "Time spent walking the rule list per IPv4 packet",
            filter_duration.clone(),
        );

        let rules_loaded = Gauge::default();
        registry.register(
            "rules_loaded",
            "Number of installed firewall rules",
            rules_loaded.clone(),
        );

        let rule_changes_total = Family::<RuleChangeLabels, Counter>::default();
        registry.register(
            "rule_changes",
            "Rule store mutations by operation and result",
            rule_changes_total.clone(),
        );

        Self {
            registry,
            packets_total,
            filter_duration,
            rules_loaded,
            rule_changes_total,
        }
    }

    /// Encode all metrics in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sub-trait implementations ──────────────────────────────────────

impl PacketMetrics for AgentMetrics {
    fn record_packet(&self, action: &str) {
        self.packets_total
            .get_or_create(&ActionLabels {
                action: action.to_string(),
            })
            .inc();
    }

    fn observe_filter_duration(&self, duration_seconds: f64) {
        self.filter_duration.observe(duration_seconds);
    }
}

impl FirewallMetrics for AgentMetrics {
    fn set_rules_loaded(&self, count: u64) {
        self.rules_loaded.set(count.try_into().unwrap_or(i64::MAX));
    }

    fn record_rule_change(&self, operation: &str, result: &str) {
        self.rule_changes_total
            .get_or_create(&RuleChangeLabels {
                operation: operation.to_string(),
                result: result.to_string(),
            })
            .inc();
    }
}
