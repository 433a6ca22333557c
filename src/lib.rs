//! Routing and rewriting core for a database-sharding middleware
//!
//! Given a parsed SQL statement and a set of sharding/encryption rules, this
//! crate decides which physical data sources and tables must execute the
//! statement, and produces per-target SQL text and parameter lists that are
//! safe to send there:
//! - Logical tables map to physical shards via pluggable sharding algorithms
//! - Pagination is revised so a multi-shard merge stays correct
//! - Generated keys are resolved and written back into INSERT statements
//! - Encrypted columns swap to their cipher/assisted/plain physical columns
//!
//! Statement parsing and execution live outside this crate: statements come
//! in as [`statement::SqlStatement`] and results leave as
//! [`execute::RouteUnit`]s.

pub mod error;
pub mod execute;
pub mod optimize;
pub mod rewrite;
pub mod route;
pub mod rule;
pub mod statement;
pub mod types;

pub use error::{Error, Result};
pub use execute::{BatchRouteUnit, QueryRow, RouteUnit, SqlUnit};
pub use rewrite::SqlRewriteEngine;
pub use route::{RoutingResult, RoutingUnit, SqlRouteResult, StatementRouter};
pub use rule::{ShardingMetadata, ShardingRule};
pub use types::Value;
