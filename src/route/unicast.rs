//! Unicast and default-database routing
//!
//! Unicast answers statements where any one target suffices (reads of
//! broadcast tables, table-less statements, provably empty writes). Target
//! choice is deterministic: first candidate in rule declaration order.

use super::{RoutingResult, RoutingUnit, TableUnit};
use crate::error::{Error, Result};
use crate::rule::ShardingRule;

pub fn route(rule: &ShardingRule, table_names: &[String]) -> Result<RoutingResult> {
    let mut result = RoutingResult::default();
    if table_names.is_empty() {
        let data_source = rule
            .data_source_names
            .first()
            .ok_or(Error::NoAvailableDataSource)?;
        result.add(RoutingUnit::new(data_source.clone()))?;
        return Ok(result);
    }
    let data_source = shared_data_source(rule, table_names)?;
    let mut unit = RoutingUnit::new(data_source.clone());
    for logic_table in table_names {
        let actual_table = match rule.find_table_rule(logic_table) {
            Some(table_rule) => table_rule
                .actual_table_names(&data_source)
                .into_iter()
                .next()
                .ok_or_else(|| Error::NoDataSourceIntersection(table_names.to_vec()))?,
            None => logic_table.clone(),
        };
        unit.table_units.push(TableUnit::new(logic_table.clone(), actual_table));
    }
    result.add(unit)?;
    Ok(result)
}

/// The first data source hosting every referenced table. Unruled and
/// broadcast tables live everywhere and never narrow the choice.
fn shared_data_source(rule: &ShardingRule, table_names: &[String]) -> Result<String> {
    let mut candidates: Option<Vec<String>> = None;
    for logic_table in table_names {
        if let Some(table_rule) = rule.find_table_rule(logic_table) {
            let hosted = table_rule.actual_data_source_names();
            candidates = Some(match candidates {
                None => hosted,
                Some(current) => current.into_iter().filter(|ds| hosted.contains(ds)).collect(),
            });
        }
    }
    let candidates = candidates.unwrap_or_else(|| rule.data_source_names.clone());
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoDataSourceIntersection(table_names.to_vec()))
}

/// Routes everything to the default data source, binding each logical table
/// to itself: unruled tables keep their names on their home database.
pub fn default_database(rule: &ShardingRule, table_names: &[String]) -> Result<RoutingResult> {
    let data_source = rule
        .default_data_source()
        .ok_or(Error::NoAvailableDataSource)?;
    let table_units = table_names
        .iter()
        .map(|table| TableUnit::new(table.clone(), table.clone()))
        .collect();
    let mut result = RoutingResult::default();
    result.add(RoutingUnit::with_tables(data_source.to_owned(), table_units))?;
    Ok(result)
}
