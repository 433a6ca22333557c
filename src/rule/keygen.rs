//! Generated-key sources for INSERT statements

use crate::types::Value;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Produces the next key value for a table with a generated key column.
///
/// Implementations must be safe to call from concurrent routing invocations.
pub trait KeyGenerator: fmt::Debug + Send + Sync {
    fn generate(&self) -> Value;
}

/// Monotonic in-process key generator.
#[derive(Debug)]
pub struct IncrementKeyGenerator {
    counter: AtomicI64,
}

impl IncrementKeyGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: i64) -> Self {
        IncrementKeyGenerator {
            counter: AtomicI64::new(first),
        }
    }
}

impl Default for IncrementKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for IncrementKeyGenerator {
    fn generate(&self) -> Value {
        Value::I64(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}
