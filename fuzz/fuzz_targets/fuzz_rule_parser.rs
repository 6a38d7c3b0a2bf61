#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::common::entity::RuleId;
use domain::firewall::entity::FirewallRule;
use domain::firewall::parser::{parse_rule, parse_rule_bytes};

// Arbitrary bytes must never panic the parser, and anything it accepts
// must survive a format/parse round trip unchanged.
fuzz_target!(|data: &[u8]| {
    let Ok(spec) = parse_rule_bytes(data) else {
        return;
    };

    let line = FirewallRule::new(RuleId(1), spec.clone()).to_string();
    let reparsed = parse_rule(&line).expect("formatted rule must parse");
    assert_eq!(reparsed, spec);
});
