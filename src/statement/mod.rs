//! Parsed statement model
//!
//! The SQL grammar lives in a separate parser; this crate consumes its output
//! as a `SqlStatement`: the original text, the statement kind, and the
//! sub-segments the routing/rewrite core cares about, each anchored to byte
//! offsets in the original text. Offsets are half-open `[start, end)` spans.

pub mod segment;

pub use segment::{
    AggregationType, ColumnSegment, ExpressionSegment, InsertSegments, OrderByItemSegment,
    OrderDirection, PaginationSegment, PaginationValueSegment, PredicateOperator,
    PredicateSegment, SelectItemSegment, SelectSegments, TableSegment,
};

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into the original SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Administrative/session statement kinds that route differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DalKind {
    ShowDatabases,
    Use,
    Set,
    ResetParameter,
    Other,
}

/// Statement kind, as classified by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Schema definition (CREATE/ALTER/DROP/TRUNCATE).
    Ddl,
    /// Administration/session control (SHOW/USE/SET/...).
    Dal(DalKind),
    /// Access control (GRANT/REVOKE/...).
    Dcl,
    /// Transaction control (BEGIN/COMMIT/ROLLBACK/SET TRANSACTION).
    Tcl,
}

impl StatementKind {
    pub fn is_read(&self) -> bool {
        matches!(self, StatementKind::Select)
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementKind::Select | StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

/// A parsed SQL statement: original text plus queryable sub-segments.
///
/// `select` is populated only for SELECT, `insert` only for INSERT.
/// `predicates` is the WHERE clause as an AND-conjunction; OR decomposition
/// is the parser's job and arrives as separate statements/conditions.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub sql: String,
    pub kind: StatementKind,
    pub tables: Vec<TableSegment>,
    pub select: Option<SelectSegments>,
    pub insert: Option<InsertSegments>,
    pub predicates: Vec<PredicateSegment>,
}

impl SqlStatement {
    /// A statement with no segments, for kinds where only the text matters.
    pub fn simple(sql: impl Into<String>, kind: StatementKind) -> Self {
        SqlStatement {
            sql: sql.into(),
            kind,
            tables: Vec::new(),
            select: None,
            insert: None,
            predicates: Vec::new(),
        }
    }

    /// Referenced logical table names, de-duplicated in reference order.
    pub fn table_names(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for table in &self.tables {
            if !result.iter().any(|name| name.eq_ignore_ascii_case(&table.name)) {
                result.push(table.name.clone());
            }
        }
        result
    }
}
