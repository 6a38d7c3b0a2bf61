use std::fmt::Write as _;

use filter_common::firewall::MAX_FIREWALL_RULES;

use crate::common::entity::RuleId;

use super::classifier::{self, RuleMatch};
use super::entity::{FilterDecision, FirewallAction, FirewallRule, PacketInfo, RuleSpec};
use super::error::FirewallError;

/// Ordered in-memory rule store and evaluator.
///
/// Rules are kept in insertion order, which is evaluation order. The
/// engine itself is not synchronised; callers that share it across
/// threads wrap it in a lock.
#[derive(Debug)]
pub struct FirewallEngine {
    rules: Vec<FirewallRule>,
    /// `None` once every identifier has been handed out.
    next_id: Option<RuleId>,
    max_rules: usize,
}

impl FirewallEngine {
    pub fn new() -> Self {
        Self::with_first_id(RuleId::FIRST)
    }

    /// Start identifier assignment at `first`.
    pub fn with_first_id(first: RuleId) -> Self {
        Self {
            rules: Vec::new(),
            next_id: Some(first),
            max_rules: MAX_FIREWALL_RULES,
        }
    }

    /// Cap the number of rules held at once (default `MAX_FIREWALL_RULES`).
    #[must_use]
    pub fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = max_rules;
        self
    }

    pub fn max_rules(&self) -> usize {
        self.max_rules
    }

    /// Evaluate an inbound packet against all rules in order.
    ///
    /// Non-IPv4 frames are admitted without looking at any rule. A
    /// matching deny rule stops the walk; a matching allow rule does not,
    /// so a later deny still applies. No matching deny means admit.
    pub fn evaluate(&self, packet: &PacketInfo) -> FilterDecision {
        if !packet.is_ipv4() {
            return FilterDecision::Admit;
        }
        self.rules
            .iter()
            .find(|rule| {
                classifier::evaluate(rule, packet) == RuleMatch::Matched(FirewallAction::Deny)
            })
            .map_or(FilterDecision::Admit, |rule| FilterDecision::Drop(rule.id))
    }

    /// Append a rule at the tail and return its new identifier.
    ///
    /// On any error the store and the identifier counter are unchanged.
    pub fn add(&mut self, spec: RuleSpec) -> Result<RuleId, FirewallError> {
        let id = self.next_id.ok_or(FirewallError::RuleIdsExhausted)?;
        if self.rules.len() >= self.max_rules {
            return Err(FirewallError::RuleStoreFull {
                max: self.max_rules,
            });
        }
        self.rules
            .try_reserve(1)
            .map_err(|_| FirewallError::OutOfMemory)?;
        self.next_id = id.next();
        self.rules.push(FirewallRule::new(id, spec));
        Ok(id)
    }

    /// Remove the rule with the given identifier. Returns whether it existed.
    pub fn remove(&mut self, id: RuleId) -> bool {
        match self.rules.iter().position(|r| r.id == id) {
            Some(pos) => {
                self.rules.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every rule. Identifier assignment continues where it left off.
    pub fn clear(&mut self) -> usize {
        let removed = self.rules.len();
        self.rules.clear();
        removed
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[FirewallRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Write one `<id> <body>\n` line per rule into `buf`.
    ///
    /// Only whole lines are written. Returns the byte count when every
    /// rule fit, otherwise `ListTruncated` with the bytes written so far
    /// and the size a complete listing needs. Bytes past `written` are
    /// left untouched.
    pub fn write_listing(&self, buf: &mut [u8]) -> Result<usize, FirewallError> {
        let mut line = String::new();
        let mut written = 0;
        let mut required = 0;
        let mut truncated = false;

        for rule in &self.rules {
            line.clear();
            // Writing into a String cannot fail.
            let _ = writeln!(line, "{rule}");
            required += line.len();

            if truncated {
                continue;
            }
            match buf.get_mut(written..written + line.len()) {
                Some(dst) => {
                    dst.copy_from_slice(line.as_bytes());
                    written += line.len();
                }
                None => truncated = true,
            }
        }

        if truncated {
            Err(FirewallError::ListTruncated { written, required })
        } else {
            Ok(written)
        }
    }
}

impl Default for FirewallEngine {
    fn default() -> Self {
        Self::new()
    }
}
