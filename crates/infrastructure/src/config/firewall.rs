//! Firewall and buffer pool configuration sections.

use domain::firewall::entity::RuleSpec;
use domain::firewall::parser::parse_rule;
use filter_common::firewall::MAX_FIREWALL_RULES;
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, check_limit, check_positive};
use crate::constants::{DEFAULT_LIST_BUFFER_SIZE, DEFAULT_POOL_BUFFERS, MAX_POOL_BUFFERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallConfig {
    /// Size of the buffer the console hands to `list_rules`.
    #[serde(default = "default_list_buffer_size")]
    pub list_buffer_size: usize,

    /// Most rules the store holds at once; `add` beyond this fails.
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,

    /// Rule specifications (`<label> <body>`), installed in order at startup.
    #[serde(default)]
    pub rules: Vec<String>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            list_buffer_size: DEFAULT_LIST_BUFFER_SIZE,
            max_rules: MAX_FIREWALL_RULES,
            rules: Vec::new(),
        }
    }
}

impl FirewallConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        check_positive("firewall.list_buffer_size", self.list_buffer_size)?;
        check_positive("firewall.max_rules", self.max_rules)?;
        check_limit("firewall.max_rules", self.max_rules, MAX_FIREWALL_RULES)?;
        check_limit("firewall.rules", self.rules.len(), self.max_rules)?;
        self.rule_specs().map(|_| ())
    }

    /// Parse every configured rule, failing on the first bad one.
    pub fn rule_specs(&self) -> Result<Vec<RuleSpec>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                parse_rule(rule).map_err(|source| ConfigError::InvalidRule {
                    field: format!("firewall.rules[{i}]"),
                    value: rule.clone(),
                    source,
                })
            })
            .collect()
    }
}

fn default_list_buffer_size() -> usize {
    DEFAULT_LIST_BUFFER_SIZE
}

fn default_max_rules() -> usize {
    MAX_FIREWALL_RULES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Number of network buffer descriptors.
    #[serde(default = "default_pool_buffers")]
    pub buffers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffers: DEFAULT_POOL_BUFFERS,
        }
    }
}

impl PoolConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        check_positive("pool.buffers", self.buffers)?;
        check_limit("pool.buffers", self.buffers, MAX_POOL_BUFFERS)
    }
}

fn default_pool_buffers() -> usize {
    DEFAULT_POOL_BUFFERS
}
