//! Shared value types for bound parameters and rule configuration

pub mod value;

pub use value::Value;
