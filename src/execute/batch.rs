//! Batch route bookkeeping
//!
//! Each add-batch call routes independently, so one logical batch fans out
//! over several targets, each receiving only a subset of the calls. A
//! `BatchRouteUnit` folds every call aimed at the same (data source, SQL)
//! pair into one execution entry while remembering which logical positions
//! it received, so update counts can be mapped back to caller order.

use super::RouteUnit;
use crate::types::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct BatchRouteUnit {
    pub route_unit: RouteUnit,
    /// Logical batch position to this unit's actual call index.
    logical_and_actual_calls: BTreeMap<usize, usize>,
    actual_call_add_batch_times: usize,
}

impl BatchRouteUnit {
    pub fn new(route_unit: RouteUnit) -> Self {
        BatchRouteUnit {
            route_unit,
            logical_and_actual_calls: BTreeMap::new(),
            actual_call_add_batch_times: 0,
        }
    }

    /// Records that the current logical batch position is this unit's next
    /// actual call.
    pub fn map_add_batch_count(&mut self, logical_index: usize) {
        self.logical_and_actual_calls
            .insert(logical_index, self.actual_call_add_batch_times);
        self.actual_call_add_batch_times += 1;
    }

    /// Accumulates one call's parameters and maps its logical position.
    pub fn add_batch(&mut self, logical_index: usize, parameters: &[Value]) {
        self.route_unit.sql_unit.parameters.extend_from_slice(parameters);
        self.map_add_batch_count(logical_index);
    }

    pub fn actual_call_add_batch_times(&self) -> usize {
        self.actual_call_add_batch_times
    }

    /// Per-call parameter lists in logical batch order. The result always has
    /// `batch_size` entries; positions this unit never received stay empty.
    pub fn parameter_sets(&self, batch_size: usize) -> Vec<Vec<Value>> {
        let mut result = vec![Vec::new(); batch_size];
        if self.actual_call_add_batch_times == 0 {
            return result;
        }
        let parameters = &self.route_unit.sql_unit.parameters;
        let chunk_size = parameters.len() / self.actual_call_add_batch_times;
        for (logical_index, actual_index) in &self.logical_and_actual_calls {
            if *logical_index >= batch_size {
                continue;
            }
            let start = actual_index * chunk_size;
            result[*logical_index] = parameters[start..start + chunk_size].to_vec();
        }
        result
    }
}

/// Identity is the execution target alone; accumulated counts and parameters
/// stay out so repeated calls fold into one entry.
impl PartialEq for BatchRouteUnit {
    fn eq(&self, other: &Self) -> bool {
        self.route_unit.data_source_name == other.route_unit.data_source_name
            && self.route_unit.sql_unit.sql == other.route_unit.sql_unit.sql
    }
}

impl Eq for BatchRouteUnit {}

impl Hash for BatchRouteUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.route_unit.data_source_name.hash(state);
        self.route_unit.sql_unit.sql.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::SqlUnit;

    fn unit(data_source: &str) -> BatchRouteUnit {
        BatchRouteUnit::new(RouteUnit::new(
            data_source,
            SqlUnit::new("INSERT INTO t_order_0 (user_id) VALUES (?)", Vec::new()),
        ))
    }

    #[test]
    fn test_parameter_sets_keep_logical_order() {
        // Calls 0 and 2 target this unit, call 1 went elsewhere.
        let mut a = unit("ds_0");
        a.add_batch(0, &[Value::I64(10)]);
        a.add_batch(2, &[Value::I64(30)]);
        assert_eq!(a.actual_call_add_batch_times(), 2);
        assert_eq!(
            a.parameter_sets(3),
            vec![vec![Value::I64(10)], Vec::new(), vec![Value::I64(30)]]
        );

        let mut b = unit("ds_1");
        b.add_batch(1, &[Value::I64(20)]);
        assert_eq!(
            b.parameter_sets(3),
            vec![Vec::new(), vec![Value::I64(20)], Vec::new()]
        );
    }

    #[test]
    fn test_multi_parameter_rows_chunked_by_call_count() {
        let mut unit = unit("ds_0");
        unit.add_batch(0, &[Value::I64(1), Value::Str("a".into())]);
        unit.add_batch(1, &[Value::I64(2), Value::Str("b".into())]);
        assert_eq!(
            unit.parameter_sets(2),
            vec![
                vec![Value::I64(1), Value::Str("a".into())],
                vec![Value::I64(2), Value::Str("b".into())],
            ]
        );
    }

    #[test]
    fn test_identity_over_target_only() {
        let mut a = unit("ds_0");
        a.add_batch(0, &[Value::I64(1)]);
        let b = unit("ds_0");
        assert_eq!(a, b);
        assert_ne!(a, unit("ds_1"));
    }

    #[test]
    fn test_empty_unit_yields_all_empty_sets() {
        assert_eq!(unit("ds_0").parameter_sets(2), vec![Vec::<Value>::new(); 2]);
    }
}
