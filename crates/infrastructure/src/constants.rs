// ── Sizes ──────────────────────────────────────────────────────────

/// Bytes handed to `list_rules` by the console when not configured.
pub const DEFAULT_LIST_BUFFER_SIZE: usize = 4096;

/// Network buffer descriptors in the in-memory pool.
pub const DEFAULT_POOL_BUFFERS: usize = 64;

/// Upper bound on `pool.buffers`.
pub const MAX_POOL_BUFFERS: usize = 1 << 20;

// ── Metrics ───────────────────────────────────────────────────────

pub const METRICS_PREFIX: &str = "rulewall";
