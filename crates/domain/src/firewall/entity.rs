use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::common::entity::{Protocol, RuleId};
use filter_common::firewall::{
    ACTION_ALLOW, ACTION_DENY, WILDCARD_DST_IP, WILDCARD_DST_PORT, WILDCARD_PROTO,
    WILDCARD_SRC_IP, WILDCARD_SRC_PORT, WILDCARD_TOKEN, is_deny, is_wildcard,
};
use filter_common::net::{ETH_P_IPV4, ETH_P_IPV6};

// ── Actions ─────────────────────────────────────────────────────────

/// Outcome attached to a rule, consulted only when the rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirewallAction {
    Deny,
    Allow,
}

impl FirewallAction {
    /// Decode an action code. `0` denies, anything else allows.
    pub fn from_code(code: u8) -> Self {
        if is_deny(code) { Self::Deny } else { Self::Allow }
    }

    /// Canonical action code.
    pub fn code(self) -> u8 {
        match self {
            Self::Deny => ACTION_DENY,
            Self::Allow => ACTION_ALLOW,
        }
    }
}

// ── Rule fields ─────────────────────────────────────────────────────

/// The six positional fields of a rule body, in grammar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleField {
    SrcAddress,
    SrcPort,
    DstAddress,
    DstPort,
    Protocol,
    Action,
}

impl RuleField {
    pub const ALL: [Self; 6] = [
        Self::SrcAddress,
        Self::SrcPort,
        Self::DstAddress,
        Self::DstPort,
        Self::Protocol,
        Self::Action,
    ];

    /// Wildcard bit for this field. The action is never wildcardable.
    pub fn wildcard_bit(self) -> Option<u8> {
        match self {
            Self::SrcAddress => Some(WILDCARD_SRC_IP),
            Self::SrcPort => Some(WILDCARD_SRC_PORT),
            Self::DstAddress => Some(WILDCARD_DST_IP),
            Self::DstPort => Some(WILDCARD_DST_PORT),
            Self::Protocol => Some(WILDCARD_PROTO),
            Self::Action => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SrcAddress => "source address",
            Self::SrcPort => "source port",
            Self::DstAddress => "destination address",
            Self::DstPort => "destination port",
            Self::Protocol => "protocol",
            Self::Action => "action",
        }
    }
}

impl std::fmt::Display for RuleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Wildcard mask ───────────────────────────────────────────────────

/// Set of unconstrained match fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WildcardMask(u8);

impl WildcardMask {
    pub const EMPTY: Self = Self(0);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `field` is wildcarded.
    pub fn contains(self, field: RuleField) -> bool {
        field.wildcard_bit().is_some_and(|bit| is_wildcard(self.0, bit))
    }

    /// Mark `field` as wildcarded. No-op for the action field.
    pub fn insert(&mut self, field: RuleField) {
        if let Some(bit) = field.wildcard_bit() {
            self.0 |= bit;
        }
    }
}

// ── Rule ────────────────────────────────────────────────────────────

/// A parsed rule that has not been assigned an identifier yet.
///
/// `None` in a match field is the wildcard: the field is never compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub src_addr: Option<Ipv4Addr>,
    pub src_port: Option<u16>,
    pub dst_addr: Option<Ipv4Addr>,
    pub dst_port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub action: FirewallAction,
}

impl RuleSpec {
    /// A rule with every match field wildcarded.
    pub fn any(action: FirewallAction) -> Self {
        Self {
            src_addr: None,
            src_port: None,
            dst_addr: None,
            dst_port: None,
            protocol: None,
            action,
        }
    }

    /// Derive the wildcard mask from the unset match fields.
    pub fn wildcard_mask(&self) -> WildcardMask {
        let mut mask = WildcardMask::EMPTY;
        if self.src_addr.is_none() {
            mask.insert(RuleField::SrcAddress);
        }
        if self.src_port.is_none() {
            mask.insert(RuleField::SrcPort);
        }
        if self.dst_addr.is_none() {
            mask.insert(RuleField::DstAddress);
        }
        if self.dst_port.is_none() {
            mask.insert(RuleField::DstPort);
        }
        if self.protocol.is_none() {
            mask.insert(RuleField::Protocol);
        }
        mask
    }
}

struct Field<T>(Option<T>);

impl<T: std::fmt::Display> std::fmt::Display for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(WILDCARD_TOKEN),
        }
    }
}

/// Formats the rule body in the same grammar the parser accepts.
impl std::fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{}",
            Field(self.src_addr),
            Field(self.src_port),
            Field(self.dst_addr),
            Field(self.dst_port),
            Field(self.protocol),
            self.action.code()
        )
    }
}

/// A rule owned by the rule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: RuleId,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

impl FirewallRule {
    pub fn new(id: RuleId, spec: RuleSpec) -> Self {
        Self { id, spec }
    }

    pub fn action(&self) -> FirewallAction {
        self.spec.action
    }

    pub fn wildcard_mask(&self) -> WildcardMask {
        self.spec.wildcard_mask()
    }
}

/// `<id> <body>`: the identifier takes the label position, so a listed
/// line can be fed back to the parser.
impl std::fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.spec)
    }
}

// ── Packets ─────────────────────────────────────────────────────────

/// Link-layer payload type of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Ipv4,
    Ipv6,
    Other(u16),
}

impl FrameType {
    pub fn from_ethertype(ethertype: u16) -> Self {
        match ethertype {
            ETH_P_IPV4 => Self::Ipv4,
            ETH_P_IPV6 => Self::Ipv6,
            other => Self::Other(other),
        }
    }

    pub fn ethertype(self) -> u16 {
        match self {
            Self::Ipv4 => ETH_P_IPV4,
            Self::Ipv6 => ETH_P_IPV6,
            Self::Other(n) => n,
        }
    }
}

/// Already-parsed header fields of one inbound frame.
///
/// Ports are zero when the transport carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    pub frame_type: FrameType,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    /// IP header protocol number.
    pub protocol: u8,
    pub src_port: u16,
    pub dst_port: u16,
}

impl PacketInfo {
    /// Build the view of an IPv4 frame.
    pub fn ipv4(
        src_addr: Ipv4Addr,
        dst_addr: Ipv4Addr,
        protocol: Protocol,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Self {
            frame_type: FrameType::Ipv4,
            src_addr,
            dst_addr,
            protocol: protocol.to_u8(),
            src_port,
            dst_port,
        }
    }

    /// Build the view of a non-IPv4 frame. Only the frame type is meaningful.
    pub fn non_ipv4(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            protocol: 0,
            src_port: 0,
            dst_port: 0,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.frame_type == FrameType::Ipv4
    }
}

/// Opaque descriptor of a network buffer lent by the buffer pool.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// A received frame: its parsed view plus the buffer it lives in.
///
/// Not `Clone`: the buffer has exactly one owner at a time.
#[derive(Debug, PartialEq, Eq)]
pub struct InboundPacket {
    pub info: PacketInfo,
    pub buffer: BufferHandle,
}

/// Final per-packet decision of the rule walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Admit,
    /// Dropped by the first matching deny rule.
    Drop(RuleId),
}

impl FilterDecision {
    pub fn is_drop(self) -> bool {
        matches!(self, Self::Drop(_))
    }

    /// Metrics label for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::Drop(_) => "drop",
        }
    }
}

/// What the receive path gets back from the filter.
///
/// A dropped packet's buffer has already been returned to the pool, so
/// only an admitted packet carries one.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    Admit(InboundPacket),
    Drop,
}

impl Disposition {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit(_))
    }
}
