use proptest::prelude::*;

/// One call against a settings factory
#[derive(Debug, Clone)]
pub enum CacheOp {
    Get(String),
    Flush(String),
    FlushAll,
}

/// Strategy for section names drawn from a small pool, so keys repeat
pub fn section_name_strategy() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|i| format!("Section{i}"))
}

/// Strategy for cache operations, weighted towards lookups
pub fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => section_name_strategy().prop_map(CacheOp::Get),
        2 => section_name_strategy().prop_map(CacheOp::Flush),
        1 => Just(CacheOp::FlushAll),
    ]
}

/// Strategy for operation sequences
pub fn cache_ops_strategy() -> impl Strategy<Value = Vec<CacheOp>> {
    prop::collection::vec(cache_op_strategy(), 1..64)
}

/// Strategy for cache capacities small enough to force eviction
pub fn capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..=5
}
