//! Execution-facing value objects
//!
//! The routing/rewrite core hands the execution layer `RouteUnit`s: the
//! exact text and parameters for one target. Batch bookkeeping and the
//! distinct-aware row value object live here too; actual statement execution
//! is the caller's concern.

pub mod batch;
pub mod row;

pub use batch::BatchRouteUnit;
pub use row::QueryRow;

use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Rewritten SQL text plus its final parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlUnit {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl SqlUnit {
    pub fn new(sql: impl Into<String>, parameters: Vec<Value>) -> Self {
        SqlUnit {
            sql: sql.into(),
            parameters,
        }
    }
}

/// Send this exact statement to this exact data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteUnit {
    pub data_source_name: String,
    pub sql_unit: SqlUnit,
}

impl RouteUnit {
    pub fn new(data_source_name: impl Into<String>, sql_unit: SqlUnit) -> Self {
        RouteUnit {
            data_source_name: data_source_name.into(),
            sql_unit,
        }
    }
}
