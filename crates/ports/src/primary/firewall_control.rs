use domain::common::entity::RuleId;
use domain::firewall::entity::FirewallRule;
use domain::firewall::error::FirewallError;

/// Runtime management of the ordered rule store.
///
/// Every method may be called from any task once the filter is
/// initialised; mutations are serialised with respect to each other and
/// to packet evaluation.
pub trait FirewallControlPort: Send + Sync {
    /// Parse a `<label> <body>` specification and append the rule.
    fn add_rule(&self, spec: &[u8]) -> Result<RuleId, FirewallError>;

    /// Remove the rule with `id`. Unknown identifiers are not an error.
    fn remove_rule(&self, id: RuleId) -> bool;

    /// Write the textual listing into `buf` and return the byte count.
    fn list_rules(&self, buf: &mut [u8]) -> Result<usize, FirewallError>;

    /// Owned copy of the rules in evaluation order.
    fn snapshot(&self) -> Vec<FirewallRule>;

    fn rule_count(&self) -> usize;
}
