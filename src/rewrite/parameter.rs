//! Parameter builder
//!
//! Tracks the caller's bound parameters together with in-place replacements
//! (pagination revision, encrypted values) and appended additions (generated
//! keys). Rendering merges the three sources into one ordered list matching
//! the rewritten SQL's placeholder order. Rendering never mutates state, so
//! one builder serves every routing unit of a statement.

use crate::route::RoutingUnit;
use crate::types::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct ParameterBuilder {
    original_parameters: Vec<Value>,
    added_index_and_parameters: BTreeMap<usize, Value>,
    replaced_index_and_parameters: BTreeMap<usize, Value>,
    /// Per-data-source replacements layered over the shared ones, for values
    /// that differ by target (a per-shard generated key, for instance).
    unit_replacements: HashMap<String, BTreeMap<usize, Value>>,
}

impl ParameterBuilder {
    pub fn new(original_parameters: Vec<Value>) -> Self {
        ParameterBuilder {
            original_parameters,
            ..Default::default()
        }
    }

    /// The caller-bound values, untouched by any revision.
    pub fn original_parameters(&self) -> &[Value] {
        &self.original_parameters
    }

    /// Replaces the value at an existing position.
    pub fn replace(&mut self, index: usize, parameter: Value) {
        self.replaced_index_and_parameters.insert(index, parameter);
    }

    /// Appends a value keyed by its target position past the original list.
    pub fn add(&mut self, index: usize, parameter: Value) {
        self.added_index_and_parameters.insert(index, parameter);
    }

    /// Replaces a position for one data source only.
    pub fn replace_for_unit(&mut self, data_source_name: &str, index: usize, parameter: Value) {
        self.unit_replacements
            .entry(data_source_name.to_owned())
            .or_default()
            .insert(index, parameter);
    }

    /// The final parameter list for one routing unit (or the shared list when
    /// no unit is given): originals with replacements applied in place, then
    /// additions appended in ascending key order.
    pub fn parameters(&self, routing_unit: Option<&RoutingUnit>) -> Vec<Value> {
        let mut result = self.original_parameters.clone();
        for (index, parameter) in &self.replaced_index_and_parameters {
            if let Some(slot) = result.get_mut(*index) {
                *slot = parameter.clone();
            }
        }
        if let Some(unit) = routing_unit {
            if let Some(replacements) = self.unit_replacements.get(&unit.data_source_name) {
                for (index, parameter) in replacements {
                    if let Some(slot) = result.get_mut(*index) {
                        *slot = parameter.clone();
                    }
                }
            }
        }
        for parameter in self.added_index_and_parameters.values() {
            result.push(parameter.clone());
        }
        result
    }
}
