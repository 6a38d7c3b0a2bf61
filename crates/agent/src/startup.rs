use std::sync::Arc;

use adapters::pool::NetworkBufferPool;
use anyhow::{Context, Result};
use application::firewall_service_impl::FirewallAppService;
use application::packet_pipeline::PacketPipeline;
use domain::firewall::engine::FirewallEngine;
use infrastructure::config::AgentConfig;
use infrastructure::logging::init_logging;
use infrastructure::metrics::AgentMetrics;
use ports::primary::firewall_control::FirewallControlPort;
use tracing::{debug, info};

use crate::cli::Cli;

/// Load the config named on the command line, or the built-in defaults.
pub fn load_config(cli: &Cli) -> Result<AgentConfig> {
    match &cli.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AgentConfig::default()),
    }
}

/// Install the tracing subscriber, CLI flags winning over the config.
pub fn setup_logging(cli: &Cli, config: &AgentConfig) -> Result<()> {
    let level = cli.log_level.unwrap_or(config.agent.log_level);
    let format = cli.log_format.unwrap_or(config.agent.log_format);
    init_logging(level, format)?;
    Ok(())
}

/// Everything the console and `check` operate on.
pub struct Runtime {
    pub firewall: Arc<FirewallAppService>,
    pub pool: Arc<NetworkBufferPool>,
    pub metrics: Arc<AgentMetrics>,
    pub pipeline: PacketPipeline,
    pub list_buffer_size: usize,
}

impl Runtime {
    /// Build the service graph, initialise the rule store and install the
    /// configured rules in order.
    pub fn start(config: &AgentConfig) -> Result<Self> {
        let pool = Arc::new(NetworkBufferPool::new(config.pool.buffers));
        let metrics = Arc::new(AgentMetrics::new());
        let engine = FirewallEngine::new().with_max_rules(config.firewall.max_rules);
        let firewall = Arc::new(FirewallAppService::with_engine(
            engine,
            pool.clone(),
            metrics.clone(),
        ));
        firewall.init();

        if let Err(e) = seed_rules(&firewall, &config.firewall.rules) {
            firewall.deinit();
            return Err(e);
        }

        info!(
            rules = firewall.rule_count(),
            buffers = pool.capacity(),
            "firewall started"
        );

        let pipeline = PacketPipeline::new(firewall.clone());
        Ok(Self {
            firewall,
            pool,
            metrics,
            pipeline,
            list_buffer_size: config.firewall.list_buffer_size,
        })
    }

    /// Tear the rule store down.
    pub fn stop(self) {
        self.firewall.deinit();
        info!("firewall stopped");
    }
}

fn seed_rules(firewall: &FirewallAppService, rules: &[String]) -> Result<()> {
    for (i, rule) in rules.iter().enumerate() {
        let id = firewall
            .add_rule(rule.as_bytes())
            .with_context(|| format!("failed to install firewall.rules[{i}] '{rule}'"))?;
        debug!(rule_id = %id, index = i, "seeded firewall rule");
    }
    Ok(())
}
