//! Engine tuning knobs.

/// Configuration for a [`DetailedParser`](crate::engine::DetailedParser).
///
/// The defaults suit interactive editing of source files up to a few
/// megabytes; batch consumers that always request the full span can
/// shrink the cache and zero the margin.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of boundaries whose facts are cached.
    pub cache_capacity: usize,
    /// Number of confidence buckets the query index maintains.
    pub confidence_buckets: usize,
    /// Bytes of slack added around the viewport on each side.
    pub viewport_margin: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 128,
            confidence_buckets: 10,
            viewport_margin: 256,
        }
    }
}
