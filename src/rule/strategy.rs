//! Sharding strategies and algorithms
//!
//! A strategy names the sharding column and delegates target selection to an
//! algorithm. Algorithms are pure: given the available target names and one
//! route value they return the matching subset, never erroring — a value the
//! algorithm cannot interpret selects every target.

use crate::route::condition::{RouteValue, RouteValueKind};
use std::fmt;
use std::sync::Arc;

/// Picks physical target names (data sources or tables) for one route value.
pub trait ShardingAlgorithm: fmt::Debug + Send + Sync {
    fn sharding(&self, available_targets: &[String], value: &RouteValue) -> Vec<String>;
}

/// How one dimension (database or table) of a logical table shards.
#[derive(Clone)]
pub enum ShardingStrategy {
    /// Not sharded on this dimension; every target qualifies.
    None,
    /// Single-column strategy with a pluggable algorithm.
    Standard {
        sharding_column: String,
        algorithm: Arc<dyn ShardingAlgorithm>,
    },
}

impl ShardingStrategy {
    pub fn standard(column: impl Into<String>, algorithm: Arc<dyn ShardingAlgorithm>) -> Self {
        ShardingStrategy::Standard {
            sharding_column: column.into(),
            algorithm,
        }
    }

    pub fn sharding_column(&self) -> Option<&str> {
        match self {
            ShardingStrategy::None => None,
            ShardingStrategy::Standard { sharding_column, .. } => Some(sharding_column),
        }
    }

    /// Evaluates the strategy over the route values that belong to its
    /// column. Absent a usable value, all available targets are selected.
    pub fn do_sharding(&self, available_targets: &[String], values: &[&RouteValue]) -> Vec<String> {
        let (column, algorithm) = match self {
            ShardingStrategy::None => return available_targets.to_vec(),
            ShardingStrategy::Standard {
                sharding_column,
                algorithm,
            } => (sharding_column, algorithm),
        };
        let mut result: Vec<String> = Vec::new();
        let mut matched = false;
        for value in values {
            if !value.column.eq_ignore_ascii_case(column) {
                continue;
            }
            matched = true;
            for target in algorithm.sharding(available_targets, value) {
                if !result.contains(&target) {
                    result.push(target);
                }
            }
        }
        if matched {
            result
        } else {
            available_targets.to_vec()
        }
    }
}

impl fmt::Debug for ShardingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingStrategy::None => write!(f, "ShardingStrategy::None"),
            ShardingStrategy::Standard { sharding_column, .. } => f
                .debug_struct("ShardingStrategy::Standard")
                .field("sharding_column", sharding_column)
                .finish_non_exhaustive(),
        }
    }
}

/// Selects the target whose trailing `_<n>` segment equals
/// `value % target_count`.
///
/// The workhorse for numeric shard keys over `t_order_0..t_order_N` style
/// naming. Ranges enumerate when they are narrower than the target count,
/// otherwise every target qualifies.
#[derive(Debug, Default)]
pub struct ModuloShardingAlgorithm;

impl ModuloShardingAlgorithm {
    fn select(available_targets: &[String], value: i64, result: &mut Vec<String>) {
        let count = available_targets.len() as i64;
        if count == 0 {
            return;
        }
        let suffix = (value.rem_euclid(count)).to_string();
        for target in available_targets {
            // The suffix must match the whole segment after the last `_`:
            // `ends_with` would route suffix 0 to both t_order_0 and
            // t_order_10 once a topology has ten or more shards.
            let target_suffix = target.rsplit_once('_').map_or(target.as_str(), |(_, s)| s);
            if target_suffix == suffix && !result.contains(target) {
                result.push(target.clone());
            }
        }
    }
}

impl ShardingAlgorithm for ModuloShardingAlgorithm {
    fn sharding(&self, available_targets: &[String], value: &RouteValue) -> Vec<String> {
        let mut result = Vec::new();
        match &value.kind {
            RouteValueKind::List(values) => {
                for value in values {
                    if let Some(value) = value.as_i64() {
                        Self::select(available_targets, value, &mut result);
                    }
                }
            }
            RouteValueKind::Range { lower, upper } => match (lower.as_i64(), upper.as_i64()) {
                (Some(lower), Some(upper))
                    if upper >= lower
                        && (upper - lower) < available_targets.len() as i64 =>
                {
                    for value in lower..=upper {
                        Self::select(available_targets, value, &mut result);
                    }
                }
                _ => result = available_targets.to_vec(),
            },
        }
        result
    }
}
