use std::fmt::Write as _;

use anyhow::Result;
use domain::firewall::entity::{FirewallAction, FirewallRule};
use domain::firewall::error::FirewallError;
use infrastructure::config::AgentConfig;
use ports::primary::firewall_control::FirewallControlPort;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::startup::Runtime;

// ── Version ─────────────────────────────────────────────────────────────

pub fn cmd_version() {
    println!("rulewall-agent {}", env!("CARGO_PKG_VERSION"));
}

// ── Check ───────────────────────────────────────────────────────────────

/// Install the configured rules into a throwaway store and print them.
pub fn cmd_check(config: &AgentConfig, output: OutputFormat) -> Result<()> {
    let rt = Runtime::start(config)?;
    let rules = rt.firewall.snapshot();
    rt.stop();

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    print!("{}", render_rule_table(&rules));
    println!(
        "Configuration OK: {} buffer(s), {}-byte listing buffer.",
        config.pool.buffers, config.firewall.list_buffer_size
    );
    Ok(())
}

// ── Rendering ───────────────────────────────────────────────────────────

/// Column view of the rules, `*` for wildcards.
pub fn render_rule_table(rules: &[FirewallRule]) -> String {
    let mut out = String::new();
    if rules.is_empty() {
        out.push_str("No firewall rules configured.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>6}  {:<6}  {:<5}  {:<15}  {:>8}  {:<15}  {:>8}",
        "ID", "ACTION", "PROTO", "SRC IP", "SRC PORT", "DST IP", "DST PORT"
    );
    for rule in rules {
        let spec = &rule.spec;
        let _ = writeln!(
            out,
            "{:>6}  {:<6}  {:<5}  {:<15}  {:>8}  {:<15}  {:>8}",
            rule.id,
            action_name(rule),
            or_wildcard(spec.protocol),
            or_wildcard(spec.src_addr),
            or_wildcard(spec.src_port),
            or_wildcard(spec.dst_addr),
            or_wildcard(spec.dst_port),
        );
    }
    let _ = writeln!(out, "\n{} rule(s) total.", rules.len());
    out
}

/// The listing produced by the rule store itself, in a buffer of
/// `buf_size` bytes. A truncated listing is returned with a trailing note.
pub fn render_listing(firewall: &dyn FirewallControlPort, buf_size: usize) -> String {
    let mut buf = vec![0u8; buf_size];
    let (written, note) = match firewall.list_rules(&mut buf) {
        Ok(0) => return "(no rules)\n".to_string(),
        Ok(n) => (n, None),
        Err(FirewallError::ListTruncated { written, required }) => {
            warn!(written, required, "rule listing truncated");
            (
                written,
                Some(format!(
                    "... listing truncated: {written} of {required} bytes shown\n"
                )),
            )
        }
        Err(e) => return format!("error: {e}\n"),
    };

    let mut out = String::from_utf8_lossy(&buf[..written]).into_owned();
    if let Some(note) = note {
        out.push_str(&note);
    }
    out
}

fn action_name(rule: &FirewallRule) -> &'static str {
    match rule.action() {
        FirewallAction::Deny => "DENY",
        FirewallAction::Allow => "ALLOW",
    }
}

fn or_wildcard<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "*".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use domain::common::entity::{Protocol, RuleId};
    use domain::firewall::entity::RuleSpec;

    use super::*;

    fn make_rule(id: u32, action: FirewallAction) -> FirewallRule {
        FirewallRule::new(
            RuleId(id),
            RuleSpec {
                dst_port: Some(22),
                protocol: Some(Protocol::Tcp),
                ..RuleSpec::any(action)
            },
        )
    }

    #[test]
    fn table_lists_every_rule() {
        let table = render_rule_table(&[
            make_rule(1, FirewallAction::Deny),
            make_rule(2, FirewallAction::Allow),
        ]);
        assert!(table.starts_with("    ID  ACTION"));
        assert!(table.contains("DENY"));
        assert!(table.contains("ALLOW"));
        assert!(table.contains("2 rule(s) total."));
    }

    #[test]
    fn table_for_empty_store() {
        assert_eq!(render_rule_table(&[]), "No firewall rules configured.\n");
    }

    #[test]
    fn listing_of_running_store() {
        let rt = Runtime::start(&AgentConfig::default()).unwrap();
        assert_eq!(render_listing(rt.firewall.as_ref(), 64), "(no rules)\n");
        rt.firewall.add_rule(b"ADD *-*-*-22-6-0").unwrap();
        assert_eq!(render_listing(rt.firewall.as_ref(), 64), "1 *-*-*-22-6-0\n");
        rt.stop();
    }

    #[test]
    fn truncated_listing_gets_a_note() {
        let rt = Runtime::start(&AgentConfig::default()).unwrap();
        rt.firewall.add_rule(b"ADD *-*-*-22-6-0").unwrap();
        rt.firewall.add_rule(b"ADD *-*-*-23-6-0").unwrap();
        let out = render_listing(rt.firewall.as_ref(), 20);
        assert_eq!(
            out,
            "1 *-*-*-22-6-0\n... listing truncated: 15 of 30 bytes shown\n"
        );
        rt.stop();
    }
}
