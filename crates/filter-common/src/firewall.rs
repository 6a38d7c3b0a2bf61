/// Rule action codes as they appear in the rule specification string.
///
/// Exactly one code denies; every other code is treated as allow.
pub const ACTION_DENY: u8 = 0;
pub const ACTION_ALLOW: u8 = 1;

/// Maximum number of rules accepted from static configuration.
pub const MAX_FIREWALL_RULES: usize = 4096;

/// Number of `-` separated fields in a rule body.
pub const RULE_FIELD_COUNT: usize = 6;

/// Token marking a field as unconstrained.
pub const WILDCARD_TOKEN: &str = "*";

/// Separator between the label and the rule body.
pub const LABEL_SEPARATOR: char = ' ';

/// Separator between rule fields.
pub const FIELD_SEPARATOR: char = '-';

// ── Wildcard bitmask ────────────────────────────────────────────────
//
// A set bit means the field is unconstrained. Bit order follows the
// field order of the rule grammar.

pub const WILDCARD_SRC_IP: u8 = 0x01;
pub const WILDCARD_SRC_PORT: u8 = 0x02;
pub const WILDCARD_DST_IP: u8 = 0x04;
pub const WILDCARD_DST_PORT: u8 = 0x08;
pub const WILDCARD_PROTO: u8 = 0x10;

/// All wildcard bits that carry meaning.
pub const WILDCARD_ALL: u8 =
    WILDCARD_SRC_IP | WILDCARD_SRC_PORT | WILDCARD_DST_IP | WILDCARD_DST_PORT | WILDCARD_PROTO;

/// Returns `true` if `bit` is set in `mask`.
#[inline]
pub const fn is_wildcard(mask: u8, bit: u8) -> bool {
    mask & bit != 0
}

/// Returns `true` if `code` is the deny action.
#[inline]
pub const fn is_deny(code: u8) -> bool {
    code == ACTION_DENY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_bits_are_distinct() {
        let bits = [
            WILDCARD_SRC_IP,
            WILDCARD_SRC_PORT,
            WILDCARD_DST_IP,
            WILDCARD_DST_PORT,
            WILDCARD_PROTO,
        ];
        let mut seen = 0u8;
        for bit in bits {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
        assert_eq!(seen, WILDCARD_ALL);
    }

    #[test]
    fn wildcard_mask_fits_in_five_bits() {
        assert_eq!(WILDCARD_ALL, 0x1F);
    }

    #[test]
    fn is_wildcard_checks_single_bit() {
        let mask = WILDCARD_SRC_PORT | WILDCARD_PROTO;
        assert!(is_wildcard(mask, WILDCARD_SRC_PORT));
        assert!(is_wildcard(mask, WILDCARD_PROTO));
        assert!(!is_wildcard(mask, WILDCARD_SRC_IP));
        assert!(!is_wildcard(0, WILDCARD_DST_PORT));
    }

    #[test]
    fn only_zero_denies() {
        assert!(is_deny(ACTION_DENY));
        assert!(!is_deny(ACTION_ALLOW));
        assert!(!is_deny(7));
        assert!(!is_deny(u8::MAX));
    }
}
