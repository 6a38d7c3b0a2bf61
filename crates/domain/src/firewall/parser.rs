//! Rule specification parser.
//!
//! Accepted grammar (ASCII, single line):
//!
//! ```text
//! <label> <src-ip|*>-<src-port|*>-<dst-ip|*>-<dst-port|*>-<protocol|*>-<action>
//! ```
//!
//! The label is consumed and discarded. Parsing never touches the rule
//! store: it either yields a complete [`RuleSpec`] or an error.

use std::net::Ipv4Addr;
use std::str::FromStr;

use filter_common::firewall::{FIELD_SEPARATOR, LABEL_SEPARATOR, RULE_FIELD_COUNT, WILDCARD_TOKEN};

use super::entity::{FirewallAction, RuleField, RuleSpec};
use super::error::FirewallError;
use crate::common::entity::Protocol;

/// Parse a raw administrative rule string.
pub fn parse_rule_bytes(input: &[u8]) -> Result<RuleSpec, FirewallError> {
    if !input.is_ascii() {
        return Err(FirewallError::NotAscii);
    }
    let text = std::str::from_utf8(input).map_err(|_| FirewallError::NotAscii)?;
    parse_rule(text)
}

/// Parse `<label> <body>`. Leading separators are skipped, then everything
/// up to the next space is discarded as the label.
pub fn parse_rule(input: &str) -> Result<RuleSpec, FirewallError> {
    let (_label, body) = input
        .trim_start_matches(LABEL_SEPARATOR)
        .split_once(LABEL_SEPARATOR)
        .ok_or(FirewallError::MissingLabel)?;
    parse_rule_body(body)
}

/// Parse the six dash-separated fields of a rule body.
pub fn parse_rule_body(body: &str) -> Result<RuleSpec, FirewallError> {
    let mut fields = [""; RULE_FIELD_COUNT];
    let mut found = 0;
    for token in body.trim().split(FIELD_SEPARATOR) {
        if found < RULE_FIELD_COUNT {
            fields[found] = token;
        }
        found += 1;
    }
    if found < RULE_FIELD_COUNT {
        return Err(FirewallError::TooFewFields { found });
    }
    if found > RULE_FIELD_COUNT {
        return Err(FirewallError::TooManyFields { found });
    }

    let [src_addr, src_port, dst_addr, dst_port, protocol, action] = fields;

    Ok(RuleSpec {
        src_addr: optional(src_addr, RuleField::SrcAddress, parse_address)?,
        src_port: optional(src_port, RuleField::SrcPort, parse_number::<u16>)?,
        dst_addr: optional(dst_addr, RuleField::DstAddress, parse_address)?,
        dst_port: optional(dst_port, RuleField::DstPort, parse_number::<u16>)?,
        protocol: optional(protocol, RuleField::Protocol, |t, f| {
            parse_number::<u8>(t, f).map(Protocol::from_u8)
        })?,
        action: parse_action(action)?,
    })
}

fn optional<T>(
    token: &str,
    field: RuleField,
    parse: impl FnOnce(&str, RuleField) -> Result<T, FirewallError>,
) -> Result<Option<T>, FirewallError> {
    if token == WILDCARD_TOKEN {
        Ok(None)
    } else {
        parse(token, field).map(Some)
    }
}

fn parse_address(token: &str, field: RuleField) -> Result<Ipv4Addr, FirewallError> {
    token
        .parse::<Ipv4Addr>()
        .map_err(|_| FirewallError::InvalidAddress {
            field,
            value: token.to_string(),
        })
}

/// Digits only: no sign, no whitespace, no empty token.
fn parse_number<T: FromStr>(token: &str, field: RuleField) -> Result<T, FirewallError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FirewallError::InvalidNumber {
            field,
            value: token.to_string(),
        });
    }
    // All-digit input can only fail by overflowing `T`.
    token
        .parse::<T>()
        .map_err(|_| FirewallError::NumberOutOfRange {
            field,
            value: token.to_string(),
        })
}

fn parse_action(token: &str) -> Result<FirewallAction, FirewallError> {
    if token == WILDCARD_TOKEN {
        return Err(FirewallError::WildcardAction);
    }
    parse_number::<u8>(token, RuleField::Action).map(FirewallAction::from_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::entity::RuleId;
    use crate::firewall::entity::FirewallRule;

    // ── Valid specifications ──────────────────────────────────────

    #[test]
    fn parses_documented_example() {
        let spec = parse_rule("ADD 192.168.1.10-*-10.0.0.5-443-6-0").unwrap();
        assert_eq!(spec.src_addr, Some(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(spec.src_port, None);
        assert_eq!(spec.dst_addr, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(spec.dst_port, Some(443));
        assert_eq!(spec.protocol, Some(Protocol::Tcp));
        assert_eq!(spec.action, FirewallAction::Deny);
    }

    #[test]
    fn leading_spaces_before_label_are_skipped() {
        assert_eq!(
            parse_rule("   ADD 1.1.1.1-*-*-*-*-0").unwrap(),
            parse_rule("ADD 1.1.1.1-*-*-*-*-0").unwrap()
        );
        assert_eq!(parse_rule("   "), Err(FirewallError::MissingLabel));
    }

    #[test]
    fn label_content_is_ignored() {
        let a = parse_rule("ADD *-*-*-*-17-1").unwrap();
        let b = parse_rule("whatever *-*-*-*-17-1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_wildcards() {
        let spec = parse_rule("X *-*-*-*-*-1").unwrap();
        assert_eq!(spec, RuleSpec::any(FirewallAction::Allow));
        assert_eq!(spec.wildcard_mask().bits(), 0x1F);
    }

    #[test]
    fn wildcard_mask_matches_star_fields_only() {
        let cases: [(&str, u8); 5] = [
            ("L *-1-2.2.2.2-3-6-0", 0x01),
            ("L 1.1.1.1-*-2.2.2.2-3-6-0", 0x02),
            ("L 1.1.1.1-1-*-3-6-0", 0x04),
            ("L 1.1.1.1-1-2.2.2.2-*-6-0", 0x08),
            ("L 1.1.1.1-1-2.2.2.2-3-*-0", 0x10),
        ];
        for (input, bits) in cases {
            assert_eq!(parse_rule(input).unwrap().wildcard_mask().bits(), bits, "{input}");
        }
    }

    #[test]
    fn no_wildcards_gives_empty_mask() {
        let spec = parse_rule("L 1.1.1.1-1-2.2.2.2-3-6-0").unwrap();
        assert!(spec.wildcard_mask().is_empty());
    }

    #[test]
    fn nonzero_action_codes_allow() {
        assert_eq!(parse_rule("L *-*-*-*-*-1").unwrap().action, FirewallAction::Allow);
        assert_eq!(parse_rule("L *-*-*-*-*-200").unwrap().action, FirewallAction::Allow);
    }

    #[test]
    fn boundary_values_accepted() {
        let spec = parse_rule("L 0.0.0.0-0-255.255.255.255-65535-255-255").unwrap();
        assert_eq!(spec.src_addr, Some(Ipv4Addr::UNSPECIFIED));
        assert_eq!(spec.src_port, Some(0));
        assert_eq!(spec.dst_addr, Some(Ipv4Addr::BROADCAST));
        assert_eq!(spec.dst_port, Some(65535));
        assert_eq!(spec.protocol, Some(Protocol::Other(255)));
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        assert!(parse_rule("ADD *-*-*-*-6-0\r\n").is_ok());
    }

    #[test]
    fn bytes_entry_point() {
        let spec = parse_rule_bytes(b"ADD *-*-10.0.0.1-*-*-0").unwrap();
        assert_eq!(spec.dst_addr, Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn display_round_trips_through_parser() {
        let inputs = [
            "ADD 192.168.1.10-*-10.0.0.5-443-6-0",
            "ADD *-53-*-*-17-1",
            "ADD 10.1.2.3-1-10.3.2.1-2-1-0",
        ];
        for input in inputs {
            let spec = parse_rule(input).unwrap();
            let rule = FirewallRule::new(RuleId(3), spec.clone());
            assert_eq!(parse_rule(&rule.to_string()).unwrap(), spec);
        }
    }

    // ── Field count ───────────────────────────────────────────────

    #[test]
    fn missing_label_rejected() {
        assert_eq!(
            parse_rule("1.1.1.1-*-*-*-*-0"),
            Err(FirewallError::MissingLabel)
        );
    }

    #[test]
    fn fewer_than_six_fields_rejected() {
        let inputs = [
            ("ADD ", 1),
            ("ADD 1.1.1.1", 1),
            ("ADD 1.1.1.1-80", 2),
            ("ADD *-*-*", 3),
            ("ADD *-*-*-*", 4),
            ("ADD *-*-*-*-6", 5),
        ];
        for (input, found) in inputs {
            assert_eq!(
                parse_rule(input),
                Err(FirewallError::TooFewFields { found }),
                "{input}"
            );
        }
    }

    #[test]
    fn more_than_six_fields_rejected() {
        assert_eq!(
            parse_rule("ADD *-*-*-*-6-0-0"),
            Err(FirewallError::TooManyFields { found: 7 })
        );
    }

    // ── Field values ──────────────────────────────────────────────

    #[test]
    fn bad_address_rejected() {
        for input in ["ADD 10.0.0-*-*-*-*-0", "ADD 10.0.0.256-*-*-*-*-0", "ADD host-*-*-*-*-0"] {
            assert!(
                matches!(
                    parse_rule(input),
                    Err(FirewallError::InvalidAddress { field: RuleField::SrcAddress, .. })
                ),
                "{input}"
            );
        }
        assert!(matches!(
            parse_rule("ADD *-*-1.2.3-*-*-0"),
            Err(FirewallError::InvalidAddress { field: RuleField::DstAddress, .. })
        ));
    }

    #[test]
    fn non_numeric_port_rejected() {
        assert!(matches!(
            parse_rule("ADD *-http-*-*-*-0"),
            Err(FirewallError::InvalidNumber { field: RuleField::SrcPort, .. })
        ));
        assert!(matches!(
            parse_rule("ADD *-*-*-+80-*-0"),
            Err(FirewallError::InvalidNumber { field: RuleField::DstPort, .. })
        ));
    }

    #[test]
    fn empty_field_rejected() {
        assert!(matches!(
            parse_rule("ADD *--*-*-*-0"),
            Err(FirewallError::InvalidNumber { field: RuleField::SrcPort, .. })
        ));
    }

    #[test]
    fn partial_wildcard_token_is_not_a_wildcard() {
        assert!(matches!(
            parse_rule("ADD *x-*-*-*-*-0"),
            Err(FirewallError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn out_of_range_numbers_rejected() {
        assert!(matches!(
            parse_rule("ADD *-65536-*-*-*-0"),
            Err(FirewallError::NumberOutOfRange { field: RuleField::SrcPort, .. })
        ));
        assert!(matches!(
            parse_rule("ADD *-*-*-*-256-0"),
            Err(FirewallError::NumberOutOfRange { field: RuleField::Protocol, .. })
        ));
        assert!(matches!(
            parse_rule("ADD *-*-*-*-*-999999999999999999999999"),
            Err(FirewallError::NumberOutOfRange { field: RuleField::Action, .. })
        ));
    }

    #[test]
    fn wildcard_action_rejected() {
        assert_eq!(
            parse_rule("ADD *-*-*-*-*-*"),
            Err(FirewallError::WildcardAction)
        );
    }

    #[test]
    fn non_ascii_bytes_rejected() {
        assert_eq!(
            parse_rule_bytes("ADD *-*-*-*-*-0\u{e9}".as_bytes()),
            Err(FirewallError::NotAscii)
        );
        assert_eq!(parse_rule_bytes(&[0x41, 0x20, 0xFF]), Err(FirewallError::NotAscii));
    }
}
