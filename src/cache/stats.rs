use serde::Serialize;

/// Point-in-time statistics about a [`ResourceCache`](super::ResourceCache)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    /// Ready entries, never more than `capacity`
    pub entries: usize,
    /// Keys whose value is still being built
    pub pending: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub failed_builds: u64,
    /// Ready keys, least recently used first
    pub keys: Vec<String>,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
