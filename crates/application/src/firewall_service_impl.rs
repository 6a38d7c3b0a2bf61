use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use domain::common::entity::RuleId;
use domain::firewall::engine::FirewallEngine;
use domain::firewall::entity::{Disposition, FilterDecision, FirewallRule, InboundPacket};
use domain::firewall::error::FirewallError;
use domain::firewall::parser::parse_rule_bytes;
use ports::primary::firewall_control::FirewallControlPort;
use ports::primary::packet_filter::PacketFilterPort;
use ports::secondary::buffer_pool_port::BufferPoolPort;
use ports::secondary::metrics_port::MetricsPort;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initialized,
}

/// The rule engine plus its lifecycle tag.
///
/// The engine outlives `deinit()` (emptied) so identifier assignment
/// continues across init/deinit cycles.
#[derive(Debug)]
struct RuleStore {
    lifecycle: Lifecycle,
    engine: FirewallEngine,
}

impl RuleStore {
    fn engine(&self) -> &FirewallEngine {
        assert!(
            self.lifecycle == Lifecycle::Initialized,
            "firewall rule store used before init()"
        );
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut FirewallEngine {
        assert!(
            self.lifecycle == Lifecycle::Initialized,
            "firewall rule store used before init()"
        );
        &mut self.engine
    }
}

/// Application-level firewall service.
///
/// Owns the process-wide rule store behind a single `RwLock`: packet
/// evaluation and listing take the read side, add/remove/init/deinit the
/// write side, so no walk ever observes a half-applied mutation. Share it
/// as `Arc<FirewallAppService>` between the receive path and the control
/// path.
pub struct FirewallAppService {
    store: RwLock<RuleStore>,
    pool: Arc<dyn BufferPoolPort>,
    metrics: Arc<dyn MetricsPort>,
}

impl FirewallAppService {
    /// Create an uninitialised service. Call [`init`](Self::init) before use.
    pub fn new(pool: Arc<dyn BufferPoolPort>, metrics: Arc<dyn MetricsPort>) -> Self {
        Self::with_engine(FirewallEngine::new(), pool, metrics)
    }

    /// Create an uninitialised service around a caller-built engine.
    pub fn with_engine(
        engine: FirewallEngine,
        pool: Arc<dyn BufferPoolPort>,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        Self {
            store: RwLock::new(RuleStore {
                lifecycle: Lifecycle::Uninitialized,
                engine,
            }),
            pool,
            metrics,
        }
    }

    /// Bring the store up empty.
    ///
    /// # Panics
    ///
    /// Panics if the store is already initialised.
    pub fn init(&self) {
        let mut store = self.write();
        assert!(
            store.lifecycle == Lifecycle::Uninitialized,
            "firewall rule store initialised twice"
        );
        store.lifecycle = Lifecycle::Initialized;
        drop(store);

        self.metrics.set_rules_loaded(0);
        info!("firewall rule store initialised");
    }

    /// Destroy every rule and return to the uninitialised state.
    ///
    /// # Panics
    ///
    /// Panics if the store is not initialised.
    pub fn deinit(&self) {
        let mut store = self.write();
        let removed = store.engine_mut().clear();
        store.lifecycle = Lifecycle::Uninitialized;
        drop(store);

        self.metrics.set_rules_loaded(0);
        info!(removed, "firewall rule store deinitialised");
    }

    pub fn is_initialized(&self) -> bool {
        self.read().lifecycle == Lifecycle::Initialized
    }

    fn read(&self) -> RwLockReadGuard<'_, RuleStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuleStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_change(&self, operation: &str, result: &str, count: usize) {
        self.metrics.record_rule_change(operation, result);
        self.metrics.set_rules_loaded(count as u64);
    }
}

impl FirewallControlPort for FirewallAppService {
    fn add_rule(&self, spec: &[u8]) -> Result<RuleId, FirewallError> {
        let parsed = parse_rule_bytes(spec).map(|rule| {
            let body = rule.to_string();
            (rule, body)
        });

        let mut store = self.write();
        let engine = store.engine_mut();
        let added = parsed.and_then(|(rule, body)| engine.add(rule).map(|id| (id, body)));
        let count = engine.len();
        drop(store);

        match added {
            Ok((id, body)) => {
                self.record_change("add", "success", count);
                info!(rule_id = %id, rule = %body, "firewall rule added");
                Ok(id)
            }
            Err(e) => {
                let result = if e.is_parse_error() { "invalid" } else { "error" };
                self.record_change("add", result, count);
                Err(e)
            }
        }
    }

    fn remove_rule(&self, id: RuleId) -> bool {
        let mut store = self.write();
        let engine = store.engine_mut();
        let removed = engine.remove(id);
        let count = engine.len();
        drop(store);

        if removed {
            self.record_change("remove", "success", count);
            info!(rule_id = %id, "firewall rule removed");
        } else {
            self.record_change("remove", "not_found", count);
            debug!(rule_id = %id, "no firewall rule with this id");
        }
        removed
    }

    fn list_rules(&self, buf: &mut [u8]) -> Result<usize, FirewallError> {
        self.read().engine().write_listing(buf)
    }

    fn snapshot(&self) -> Vec<FirewallRule> {
        self.read().engine().rules().to_vec()
    }

    fn rule_count(&self) -> usize {
        self.read().engine().len()
    }
}

impl PacketFilterPort for FirewallAppService {
    /// Non-IPv4 frames are admitted without walking the rules. The store
    /// must still be initialised.
    fn filter(&self, packet: InboundPacket) -> Disposition {
        let store = self.read();
        let engine = store.engine();
        if !packet.info.is_ipv4() {
            drop(store);
            self.metrics.record_packet(FilterDecision::Admit.as_str());
            return Disposition::Admit(packet);
        }

        let start = Instant::now();
        let decision = engine.evaluate(&packet.info);
        drop(store);
        self.metrics
            .observe_filter_duration(start.elapsed().as_secs_f64());
        self.metrics.record_packet(decision.as_str());

        match decision {
            FilterDecision::Admit => Disposition::Admit(packet),
            FilterDecision::Drop(rule_id) => {
                trace!(
                    rule_id = %rule_id,
                    src = %packet.info.src_addr,
                    dst = %packet.info.dst_addr,
                    protocol = packet.info.protocol,
                    "packet dropped"
                );
                self.pool.release(packet.buffer);
                Disposition::Drop
            }
        }
    }
}
