use thiserror::Error;

use super::entity::RuleField;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirewallError {
    #[error("rule specification is not valid ASCII text")]
    NotAscii,

    #[error("rule specification has no label before the rule body")]
    MissingLabel,

    #[error("rule body has {found} fields, expected 6")]
    TooFewFields { found: usize },

    #[error("rule body has {found} fields, expected 6")]
    TooManyFields { found: usize },

    #[error("invalid {field}: '{value}' is not a dotted-decimal IPv4 address")]
    InvalidAddress { field: RuleField, value: String },

    #[error("invalid {field}: '{value}' is not a non-negative decimal integer")]
    InvalidNumber { field: RuleField, value: String },

    #[error("invalid {field}: {value} is out of range")]
    NumberOutOfRange { field: RuleField, value: String },

    #[error("action field cannot be a wildcard")]
    WildcardAction,

    #[error("rule identifier space exhausted")]
    RuleIdsExhausted,

    #[error("rule store is full ({max} rules)")]
    RuleStoreFull { max: usize },

    #[error("out of memory allocating a rule")]
    OutOfMemory,

    #[error("rule listing truncated: wrote {written} of {required} bytes")]
    ListTruncated { written: usize, required: usize },
}

impl FirewallError {
    /// Returns `true` for errors caused by a malformed rule specification.
    pub fn is_parse_error(&self) -> bool {
        !matches!(
            self,
            Self::RuleIdsExhausted
                | Self::RuleStoreFull { .. }
                | Self::OutOfMemory
                | Self::ListTruncated { .. }
        )
    }
}
