//! Error types for the routing and rewrite core
//!
//! Everything here is a configuration or programming defect: all inputs are
//! in-memory and deterministic, so there are no transient/retryable errors.
//! Ambiguous routing never errors; it degrades to a broadcast/unicast choice.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Can't find index for aggregation item `{0}`, please add an alias for aggregate selections")]
    AggregationItemIndexNotFound(String),

    #[error("Can't find index for order item `{0}`")]
    OrderItemIndexNotFound(String),

    #[error("Sharding table rule not found: {0}")]
    TableRuleNotFound(String),

    #[error("Plain column is required for table `{table}`, column `{column}`")]
    PlainColumnRequired { table: String, column: String },

    #[error("Cipher column not configured for table `{table}`, column `{column}`")]
    CipherColumnNotFound { table: String, column: String },

    #[error("The `{0}` operator is unsupported for encrypt columns")]
    UnsupportedEncryptOperator(String),

    #[error("No data source hosts every referenced table: {0:?}")]
    NoDataSourceIntersection(Vec<String>),

    #[error("No data source is configured")]
    NoAvailableDataSource,

    #[error("Routed duplicate target: data source `{data_source}`, table `{table}`")]
    DuplicateRoutingTarget { data_source: String, table: String },

    #[error("Key generator not configured for table `{0}`")]
    KeyGeneratorNotFound(String),

    #[error("Parameter index {0} is out of range")]
    ParameterIndexOutOfRange(usize),

    #[error("Pagination parameter at index {0} is not an integer")]
    InvalidPaginationParameter(usize),
}
