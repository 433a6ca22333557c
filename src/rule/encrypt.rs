//! Column-level encryption rule
//!
//! One logical (plaintext-named) column maps to up to three physical columns:
//! the cipher column holding the encrypted value, an optional assisted-query
//! column holding a searchable transform, and an optional plain column
//! shadowing the original value. The rule resolves names and value
//! transforms; it never touches SQL text itself.

use crate::error::{Error, Result};
use crate::types::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Value transform for one encrypted column.
pub trait Encryptor: fmt::Debug + Send + Sync {
    fn encrypt(&self, value: &Value) -> Value;

    /// Transform for the assisted-query column. Defaults to the cipher
    /// transform for encryptors without a distinct search form.
    fn assisted_query_value(&self, value: &Value) -> Value {
        self.encrypt(value)
    }
}

/// Physical column layout and transform for one logical column.
#[derive(Clone)]
pub struct EncryptColumn {
    pub cipher_column: String,
    pub assisted_query_column: Option<String>,
    pub plain_column: Option<String>,
    pub encryptor: Arc<dyn Encryptor>,
}

impl fmt::Debug for EncryptColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptColumn")
            .field("cipher_column", &self.cipher_column)
            .field("assisted_query_column", &self.assisted_query_column)
            .field("plain_column", &self.plain_column)
            .finish_non_exhaustive()
    }
}

/// Encrypted columns of one logical table, keyed by logical column name.
#[derive(Debug, Clone, Default)]
pub struct EncryptTable {
    columns: BTreeMap<String, EncryptColumn>,
}

impl EncryptTable {
    pub fn new(columns: impl IntoIterator<Item = (String, EncryptColumn)>) -> Self {
        EncryptTable {
            columns: columns
                .into_iter()
                .map(|(name, column)| (name.to_lowercase(), column))
                .collect(),
        }
    }

    pub fn find_column(&self, logic_column: &str) -> Option<&EncryptColumn> {
        self.columns.get(&logic_column.to_lowercase())
    }

    pub fn is_logic_column(&self, column: &str) -> bool {
        self.find_column(column).is_some()
    }

    /// The logical column names configured for encryption, in name order.
    pub fn logic_columns(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Assisted-query and plain shadow columns across the table.
    pub fn assisted_query_and_plain_columns(&self) -> Vec<String> {
        self.columns
            .values()
            .flat_map(|column| {
                column
                    .assisted_query_column
                    .iter()
                    .chain(column.plain_column.iter())
                    .cloned()
            })
            .collect()
    }
}

/// Encryption rule across all tables, keyed by logical table name.
#[derive(Debug, Clone, Default)]
pub struct EncryptRule {
    tables: BTreeMap<String, EncryptTable>,
}

impl EncryptRule {
    pub fn new(tables: impl IntoIterator<Item = (String, EncryptTable)>) -> Self {
        EncryptRule {
            tables: tables
                .into_iter()
                .map(|(name, table)| (name.to_lowercase(), table))
                .collect(),
        }
    }

    pub fn find_encrypt_table(&self, table: &str) -> Option<&EncryptTable> {
        self.tables.get(&table.to_lowercase())
    }

    fn find_column(&self, table: &str, column: &str) -> Option<&EncryptColumn> {
        self.find_encrypt_table(table)
            .and_then(|encrypt_table| encrypt_table.find_column(column))
    }

    pub fn is_encrypt_column(&self, table: &str, column: &str) -> bool {
        self.find_column(table, column).is_some()
    }

    pub fn cipher_column(&self, table: &str, column: &str) -> Result<String> {
        self.find_column(table, column)
            .map(|c| c.cipher_column.clone())
            .ok_or_else(|| Error::CipherColumnNotFound {
                table: table.to_owned(),
                column: column.to_owned(),
            })
    }

    pub fn find_assisted_query_column(&self, table: &str, column: &str) -> Option<String> {
        self.find_column(table, column)
            .and_then(|c| c.assisted_query_column.clone())
    }

    pub fn find_plain_column(&self, table: &str, column: &str) -> Option<String> {
        self.find_column(table, column)
            .and_then(|c| c.plain_column.clone())
    }

    /// Cipher-transforms of the given values.
    pub fn encrypt_values(&self, table: &str, column: &str, values: &[Value]) -> Result<Vec<Value>> {
        let encrypt_column =
            self.find_column(table, column)
                .ok_or_else(|| Error::CipherColumnNotFound {
                    table: table.to_owned(),
                    column: column.to_owned(),
                })?;
        Ok(values
            .iter()
            .map(|value| encrypt_column.encryptor.encrypt(value))
            .collect())
    }

    /// Assisted-query transforms of the given values.
    pub fn assisted_query_values(
        &self,
        table: &str,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Value>> {
        let encrypt_column =
            self.find_column(table, column)
                .ok_or_else(|| Error::CipherColumnNotFound {
                    table: table.to_owned(),
                    column: column.to_owned(),
                })?;
        Ok(values
            .iter()
            .map(|value| encrypt_column.encryptor.assisted_query_value(value))
            .collect())
    }
}
