//! SELECT attributes: projections, grouping, ordering, pagination
//!
//! Order/group items and aggregation projections carry a projection `index`
//! that stays unset until the executing layer learns the target result-set
//! shape and calls `set_index_for_items` with its column-label map.
//! Resolution either succeeds or fails loudly; a silently skipped item would
//! corrupt merge ordering downstream.

use crate::error::{Error, Result};
use crate::statement::{
    AggregationType, OrderByItemSegment, PaginationSegment, PaginationValueSegment,
    SelectItemSegment, SelectSegments,
};
use crate::types::Value;
use std::collections::HashMap;

/// Strips the quoting characters a dialect may wrap identifiers in.
fn exactly_value(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '`' | '\'' | '"' | '[' | ']'))
        .collect()
}

/// Normalizes an expression for comparison: quoting and whitespace dropped.
fn exactly_expression(text: &str) -> String {
    exactly_value(text).chars().filter(|c| !c.is_whitespace()).collect()
}

/// An ORDER BY / GROUP BY item plus its resolved projection index.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub segment: OrderByItemSegment,
    pub index: Option<usize>,
}

impl OrderByItem {
    pub fn new(segment: OrderByItemSegment) -> Self {
        OrderByItem { segment, index: None }
    }
}

/// An aggregation projection, with the derived projections a merge needs
/// (AVG splits into COUNT and SUM).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationItem {
    pub func: AggregationType,
    /// Parenthesized argument text, e.g. `(price)`.
    pub inner: String,
    pub alias: Option<String>,
    pub derived: Vec<AggregationItem>,
    pub index: Option<usize>,
}

impl AggregationItem {
    fn new(func: AggregationType, inner: &str, alias: Option<&str>) -> Self {
        AggregationItem {
            func,
            inner: inner.to_owned(),
            alias: alias.map(str::to_owned),
            derived: Vec::new(),
            index: None,
        }
    }

    /// The expression as written, e.g. `AVG(price)`.
    pub fn expression(&self) -> String {
        format!("{}{}", self.func, self.inner)
    }

    /// The label the result set reports this projection under.
    pub fn column_label(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.expression())
    }
}

/// The projected select items of one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectItems {
    items: Vec<SelectItemSegment>,
    aggregation_items: Vec<AggregationItem>,
}

impl SelectItems {
    pub fn new(items: &[SelectItemSegment]) -> Self {
        let mut aggregation_items = Vec::new();
        let mut derived_sequence = 0usize;
        for item in items {
            if let SelectItemSegment::Aggregation { func, inner, alias, .. } = item {
                let mut aggregation = AggregationItem::new(*func, inner, alias.as_deref());
                if *func == AggregationType::Avg {
                    let count_alias = format!("AVG_DERIVED_COUNT_{derived_sequence}");
                    let sum_alias = format!("AVG_DERIVED_SUM_{derived_sequence}");
                    aggregation.derived.push(AggregationItem::new(
                        AggregationType::Count,
                        inner,
                        Some(&count_alias),
                    ));
                    aggregation.derived.push(AggregationItem::new(
                        AggregationType::Sum,
                        inner,
                        Some(&sum_alias),
                    ));
                    derived_sequence += 1;
                }
                aggregation_items.push(aggregation);
            }
        }
        SelectItems {
            items: items.to_vec(),
            aggregation_items,
        }
    }

    pub fn items(&self) -> &[SelectItemSegment] {
        &self.items
    }

    pub fn aggregation_items(&self) -> &[AggregationItem] {
        &self.aggregation_items
    }

    /// True when the projection is a bare `*` with no other items.
    pub fn is_unqualified_shorthand(&self) -> bool {
        matches!(
            self.items.as_slice(),
            [SelectItemSegment::Shorthand { owner: None, .. }]
        )
    }

    fn item_expression(item: &SelectItemSegment) -> String {
        match item {
            SelectItemSegment::Shorthand { owner, .. } => match owner {
                Some(owner) => format!("{owner}.*"),
                None => "*".to_owned(),
            },
            SelectItemSegment::Column { column, .. } => column.qualified_name(),
            SelectItemSegment::Expression { text, .. } => text.clone(),
            SelectItemSegment::Aggregation { func, inner, .. } => format!("{func}{inner}"),
        }
    }

    fn item_alias(item: &SelectItemSegment) -> Option<&str> {
        match item {
            SelectItemSegment::Shorthand { .. } => None,
            SelectItemSegment::Column { alias, .. }
            | SelectItemSegment::Expression { alias, .. }
            | SelectItemSegment::Aggregation { alias, .. } => alias.as_deref(),
        }
    }

    /// Zero-based position of the projected item whose expression matches.
    pub fn find_item_index(&self, expression: &str) -> Option<usize> {
        let wanted = exactly_expression(expression);
        self.items
            .iter()
            .position(|item| exactly_expression(&Self::item_expression(item)).eq_ignore_ascii_case(&wanted))
    }

    /// Alias resolution for order/group items. Scans projected items in
    /// order; an expression match returns that item's alias (present or
    /// not), an alias match returns the searched name. Expression match is
    /// deliberately checked first per item.
    pub fn find_alias(&self, name: &str) -> Option<String> {
        if self.is_unqualified_shorthand() {
            return None;
        }
        let raw_name = exactly_value(name);
        let wanted = exactly_expression(&raw_name);
        for item in &self.items {
            let expression = exactly_expression(&exactly_value(&Self::item_expression(item)));
            if wanted.eq_ignore_ascii_case(&expression) {
                return Self::item_alias(item).map(str::to_owned);
            }
            if let Some(alias) = Self::item_alias(item) {
                if raw_name.eq_ignore_ascii_case(alias) {
                    return Some(raw_name);
                }
            }
        }
        None
    }
}

/// A resolved LIMIT/OFFSET operand.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationValue {
    pub value: i64,
    /// Position in the bound parameter list when the operand was a marker.
    pub parameter_index: Option<usize>,
}

/// Pagination descriptor with revision rules for multi-target execution.
///
/// When a paginated query fans out to several targets, each target must
/// return rows `0 .. offset+row_count` so the merger can skip and trim
/// globally; aggregating/grouping queries need every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pagination {
    pub offset: Option<PaginationValue>,
    pub row_count: Option<PaginationValue>,
}

impl Pagination {
    pub fn new(segment: &PaginationSegment, parameters: &[Value]) -> Result<Self> {
        Ok(Pagination {
            offset: Self::resolve(segment.offset.as_ref(), parameters)?,
            row_count: Self::resolve(segment.row_count.as_ref(), parameters)?,
        })
    }

    fn resolve(
        segment: Option<&PaginationValueSegment>,
        parameters: &[Value],
    ) -> Result<Option<PaginationValue>> {
        let Some(segment) = segment else {
            return Ok(None);
        };
        match segment {
            PaginationValueSegment::Literal { value, .. } => Ok(Some(PaginationValue {
                value: *value,
                parameter_index: None,
            })),
            PaginationValueSegment::Parameter { index } => {
                let value = parameters
                    .get(*index)
                    .ok_or(Error::ParameterIndexOutOfRange(*index))?
                    .as_i64()
                    .ok_or(Error::InvalidPaginationParameter(*index))?;
                Ok(Some(PaginationValue {
                    value,
                    parameter_index: Some(*index),
                }))
            }
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.offset.is_some() || self.row_count.is_some()
    }

    pub fn offset_parameter_index(&self) -> Option<usize> {
        self.offset.as_ref().and_then(|v| v.parameter_index)
    }

    pub fn row_count_parameter_index(&self) -> Option<usize> {
        self.row_count.as_ref().and_then(|v| v.parameter_index)
    }

    pub fn actual_offset(&self) -> i64 {
        self.offset.as_ref().map(|v| v.value).unwrap_or(0)
    }

    /// Every target starts from the first row; the merger skips globally.
    pub fn revised_offset(&self) -> i64 {
        0
    }

    pub fn revised_row_count(&self, select: &SelectAttributes) -> i64 {
        if Self::needs_all_rows(select) {
            i64::MAX
        } else {
            self.actual_offset() + self.row_count.as_ref().map(|v| v.value).unwrap_or(0)
        }
    }

    fn needs_all_rows(select: &SelectAttributes) -> bool {
        (!select.group_by.is_empty() || !select.select_items.aggregation_items().is_empty())
            && !select.is_same_group_by_and_order_by_items()
    }
}

/// SELECT-specific attributes of an optimized statement.
#[derive(Debug, Clone, Default)]
pub struct SelectAttributes {
    pub group_by: Vec<OrderByItem>,
    pub order_by: Vec<OrderByItem>,
    pub select_items: SelectItems,
    pub pagination: Option<Pagination>,
    pub contains_subquery: bool,
}

impl SelectAttributes {
    pub fn new(segments: &SelectSegments, parameters: &[Value]) -> Result<Self> {
        Ok(SelectAttributes {
            group_by: segments.group_by.iter().cloned().map(OrderByItem::new).collect(),
            order_by: segments.order_by.iter().cloned().map(OrderByItem::new).collect(),
            select_items: SelectItems::new(&segments.items),
            pagination: segments
                .pagination
                .as_ref()
                .map(|segment| Pagination::new(segment, parameters))
                .transpose()?,
            contains_subquery: segments.contains_subquery,
        })
    }

    /// Resolves every aggregation, order-by and group-by item to a concrete
    /// zero-based projection index, given the executing layer's map from
    /// column label to index.
    pub fn set_index_for_items(&mut self, column_label_index_map: &HashMap<String, usize>) -> Result<()> {
        for aggregation in &mut self.select_items.aggregation_items {
            let label = aggregation.column_label();
            let index = *column_label_index_map
                .get(&label)
                .ok_or_else(|| Error::AggregationItemIndexNotFound(label.clone()))?;
            aggregation.index = Some(index);
            for derived in &mut aggregation.derived {
                let label = derived.column_label();
                let index = *column_label_index_map
                    .get(&label)
                    .ok_or_else(|| Error::AggregationItemIndexNotFound(label.clone()))?;
                derived.index = Some(index);
            }
        }
        Self::set_index_for_order_items(&self.select_items, &mut self.order_by, column_label_index_map)?;
        Self::set_index_for_order_items(&self.select_items, &mut self.group_by, column_label_index_map)?;
        Ok(())
    }

    fn set_index_for_order_items(
        select_items: &SelectItems,
        items: &mut [OrderByItem],
        column_label_index_map: &HashMap<String, usize>,
    ) -> Result<()> {
        for item in items {
            match &item.segment {
                OrderByItemSegment::Ordinal { index, .. } => {
                    item.index = Some(*index);
                    continue;
                }
                OrderByItemSegment::Column { column, .. } if column.owner.is_some() => {
                    if let Some(index) = select_items.find_item_index(&column.qualified_name()) {
                        item.index = Some(index);
                        continue;
                    }
                }
                _ => {}
            }
            let text = item.segment.text();
            let label = select_items
                .find_alias(&text)
                .unwrap_or_else(|| Self::order_item_label(&item.segment));
            let index = *column_label_index_map
                .get(&label)
                .ok_or_else(|| Error::OrderItemIndexNotFound(label.clone()))?;
            item.index = Some(index);
        }
        Ok(())
    }

    /// The raw label when no alias resolves: the bare column name for column
    /// items, the expression text otherwise.
    fn order_item_label(segment: &OrderByItemSegment) -> String {
        match segment {
            OrderByItemSegment::Column { column, .. } => column.name.clone(),
            other => other.text(),
        }
    }

    /// True only when group-by is present and its resolved sequence matches
    /// order-by item-for-item; execution uses this to skip a secondary
    /// in-memory sort.
    pub fn is_same_group_by_and_order_by_items(&self) -> bool {
        !self.group_by.is_empty() && self.group_by == self.order_by
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{ColumnSegment, OrderDirection, Span};

    fn column_item(name: &str, alias: Option<&str>) -> SelectItemSegment {
        SelectItemSegment::Column {
            column: ColumnSegment::new(name, Span::new(0, 0)),
            alias: alias.map(str::to_owned),
        }
    }

    fn order_column(name: &str) -> OrderByItemSegment {
        OrderByItemSegment::Column {
            column: ColumnSegment::new(name, Span::new(0, 0)),
            direction: OrderDirection::Asc,
        }
    }

    #[test]
    fn test_ordinal_used_directly() {
        let mut select = SelectAttributes {
            order_by: vec![OrderByItem::new(OrderByItemSegment::Ordinal {
                index: 2,
                direction: OrderDirection::Asc,
            })],
            ..Default::default()
        };
        select.set_index_for_items(&HashMap::new()).unwrap();
        assert_eq!(select.order_by[0].index, Some(2));
    }

    #[test]
    fn test_alias_resolution() {
        let items = vec![column_item("user_id", Some("uid"))];
        let mut select = SelectAttributes {
            select_items: SelectItems::new(&items),
            order_by: vec![OrderByItem::new(order_column("user_id"))],
            ..Default::default()
        };
        let map = HashMap::from([("uid".to_string(), 0usize)]);
        select.set_index_for_items(&map).unwrap();
        assert_eq!(select.order_by[0].index, Some(0));
    }

    #[test]
    fn test_unqualified_shorthand_skips_alias_resolution() {
        let items = vec![SelectItemSegment::Shorthand {
            owner: None,
            span: Span::new(7, 8),
        }];
        let mut select = SelectAttributes {
            select_items: SelectItems::new(&items),
            order_by: vec![OrderByItem::new(order_column("user_id"))],
            ..Default::default()
        };
        let map = HashMap::from([("user_id".to_string(), 3usize)]);
        select.set_index_for_items(&map).unwrap();
        assert_eq!(select.order_by[0].index, Some(3));
    }

    #[test]
    fn test_unresolvable_order_item_fails() {
        let mut select = SelectAttributes {
            order_by: vec![OrderByItem::new(order_column("missing"))],
            ..Default::default()
        };
        let result = select.set_index_for_items(&HashMap::new());
        assert_eq!(result, Err(Error::OrderItemIndexNotFound("missing".into())));
    }

    #[test]
    fn test_aggregation_without_label_fails() {
        let items = vec![SelectItemSegment::Aggregation {
            func: AggregationType::Sum,
            inner: "(price)".into(),
            alias: None,
            span: Span::new(7, 17),
        }];
        let mut select = SelectAttributes {
            select_items: SelectItems::new(&items),
            ..Default::default()
        };
        let result = select.set_index_for_items(&HashMap::new());
        assert_eq!(
            result,
            Err(Error::AggregationItemIndexNotFound("SUM(price)".into()))
        );
    }

    // Pins the duplicate-alias interaction: the first expression match wins
    // even when that item has no alias, and only then does an alias match
    // count.
    #[test]
    fn order_item_prefers_expression_match_over_alias() {
        let items = vec![
            column_item("status", None),
            column_item("other", Some("status")),
        ];
        let select_items = SelectItems::new(&items);
        // Expression match on the unaliased first item wins: no alias.
        assert_eq!(select_items.find_alias("status"), None);
        // A name that only matches the second item's alias resolves to it.
        let items = vec![column_item("other", Some("total"))];
        let select_items = SelectItems::new(&items);
        assert_eq!(select_items.find_alias("TOTAL"), Some("TOTAL".to_string()));
    }

    #[test]
    fn test_avg_derives_count_and_sum() {
        let items = vec![SelectItemSegment::Aggregation {
            func: AggregationType::Avg,
            inner: "(price)".into(),
            alias: None,
            span: Span::new(7, 17),
        }];
        let select_items = SelectItems::new(&items);
        let aggregation = &select_items.aggregation_items()[0];
        assert_eq!(aggregation.derived.len(), 2);
        assert_eq!(aggregation.derived[0].column_label(), "AVG_DERIVED_COUNT_0");
        assert_eq!(aggregation.derived[1].column_label(), "AVG_DERIVED_SUM_0");
    }

    #[test]
    fn test_same_group_by_and_order_by() {
        let group = vec![OrderByItem::new(order_column("user_id"))];
        let select = SelectAttributes {
            group_by: group.clone(),
            order_by: group,
            ..Default::default()
        };
        assert!(select.is_same_group_by_and_order_by_items());
        let select = SelectAttributes::default();
        assert!(!select.is_same_group_by_and_order_by_items());
    }

    #[test]
    fn test_pagination_resolves_bound_parameters() {
        let segment = PaginationSegment {
            offset: Some(PaginationValueSegment::Parameter { index: 0 }),
            row_count: Some(PaginationValueSegment::Parameter { index: 1 }),
        };
        let pagination = Pagination::new(&segment, &[Value::I64(10), Value::I32(20)]).unwrap();
        assert_eq!(pagination.actual_offset(), 10);
        assert_eq!(pagination.row_count.unwrap().value, 20);
    }

    #[test]
    fn test_non_integer_pagination_parameter_fails() {
        let segment = PaginationSegment {
            offset: None,
            row_count: Some(PaginationValueSegment::Parameter { index: 0 }),
        };
        let result = Pagination::new(&segment, &[Value::Str("20".into())]);
        assert_eq!(result, Err(Error::InvalidPaginationParameter(0)));
        let result = Pagination::new(&segment, &[]);
        assert_eq!(result, Err(Error::ParameterIndexOutOfRange(0)));
    }

    #[test]
    fn test_revised_row_count() {
        let pagination = Pagination {
            offset: Some(PaginationValue { value: 10, parameter_index: None }),
            row_count: Some(PaginationValue { value: 20, parameter_index: None }),
        };
        let plain = SelectAttributes::default();
        assert_eq!(pagination.revised_row_count(&plain), 30);
        assert_eq!(pagination.revised_offset(), 0);

        let grouped = SelectAttributes {
            group_by: vec![OrderByItem::new(order_column("user_id"))],
            ..Default::default()
        };
        assert_eq!(pagination.revised_row_count(&grouped), i64::MAX);
    }
}
