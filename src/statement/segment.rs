//! Statement sub-segments with original-text spans

use super::Span;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table reference in FROM/INTO/UPDATE position.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSegment {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl TableSegment {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        TableSegment {
            name: name.into(),
            alias: None,
            span,
        }
    }
}

/// A column reference, optionally qualified by its owner (table or alias).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSegment {
    pub name: String,
    pub owner: Option<String>,
    pub span: Span,
}

impl ColumnSegment {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        ColumnSegment {
            name: name.into(),
            owner: None,
            span,
        }
    }

    pub fn with_owner(name: impl Into<String>, owner: impl Into<String>, span: Span) -> Self {
        ColumnSegment {
            name: name.into(),
            owner: Some(owner.into()),
            span,
        }
    }

    /// The reference as written, `owner.name` or `name`.
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Aggregation functions tracked by the projection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationType {
    Max,
    Min,
    Sum,
    Count,
    Avg,
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationType::Max => "MAX",
            AggregationType::Min => "MIN",
            AggregationType::Sum => "SUM",
            AggregationType::Count => "COUNT",
            AggregationType::Avg => "AVG",
        };
        write!(f, "{name}")
    }
}

/// One projected item of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItemSegment {
    /// `*` or `owner.*`
    Shorthand { owner: Option<String>, span: Span },
    Column {
        column: ColumnSegment,
        alias: Option<String>,
    },
    Expression {
        text: String,
        alias: Option<String>,
        span: Span,
    },
    Aggregation {
        func: AggregationType,
        /// Parenthesized argument text, e.g. `(price)` or `(DISTINCT id)`.
        inner: String,
        alias: Option<String>,
        span: Span,
    },
}

impl SelectItemSegment {
    pub fn span(&self) -> Span {
        match self {
            SelectItemSegment::Shorthand { span, .. }
            | SelectItemSegment::Expression { span, .. }
            | SelectItemSegment::Aggregation { span, .. } => *span,
            SelectItemSegment::Column { column, .. } => column.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// One ORDER BY / GROUP BY item.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderByItemSegment {
    /// `ORDER BY 2` — an explicit projection ordinal.
    Ordinal {
        index: usize,
        direction: OrderDirection,
    },
    Column {
        column: ColumnSegment,
        direction: OrderDirection,
    },
    Expression {
        text: String,
        direction: OrderDirection,
    },
}

impl OrderByItemSegment {
    /// The raw text used for label resolution.
    pub fn text(&self) -> String {
        match self {
            OrderByItemSegment::Ordinal { index, .. } => index.to_string(),
            OrderByItemSegment::Column { column, .. } => column.qualified_name(),
            OrderByItemSegment::Expression { text, .. } => text.clone(),
        }
    }
}

/// A literal or a `?` parameter marker in value position.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionSegment {
    Literal(Value),
    /// Zero-based index into the bound parameter list.
    Parameter(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    In,
    Between,
    Like,
}

impl fmt::Display for PredicateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PredicateOperator::Equal => "=",
            PredicateOperator::NotEqual => "<>",
            PredicateOperator::Greater => ">",
            PredicateOperator::GreaterEqual => ">=",
            PredicateOperator::Less => "<",
            PredicateOperator::LessEqual => "<=",
            PredicateOperator::In => "IN",
            PredicateOperator::Between => "BETWEEN",
            PredicateOperator::Like => "LIKE",
        };
        write!(f, "{text}")
    }
}

/// One WHERE predicate: `column op value(s)`. The span covers the whole
/// predicate text so a rewrite token can replace it in one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSegment {
    pub column: ColumnSegment,
    pub operator: PredicateOperator,
    pub values: Vec<ExpressionSegment>,
    pub span: Span,
}

/// LIMIT/OFFSET value: a literal with its span, or a parameter marker.
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationValueSegment {
    Literal { value: i64, span: Span },
    Parameter { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationSegment {
    pub offset: Option<PaginationValueSegment>,
    pub row_count: Option<PaginationValueSegment>,
}

/// SELECT-specific segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectSegments {
    pub items: Vec<SelectItemSegment>,
    pub group_by: Vec<OrderByItemSegment>,
    pub order_by: Vec<OrderByItemSegment>,
    pub pagination: Option<PaginationSegment>,
    pub contains_subquery: bool,
}

/// INSERT-specific segments.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSegments {
    /// Explicit column names, empty when the column list was omitted.
    pub columns: Vec<String>,
    /// Span of the parenthesized column list, `(` through `)` inclusive of
    /// both parens. Insertions for generated columns land just before `)`.
    pub columns_span: Span,
    /// One entry per VALUES row.
    pub rows: Vec<Vec<ExpressionSegment>>,
}
