// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sequential scan plan node

use super::expr::ValueExpr;

/// How a scan groups rows before emitting them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationStrategy {
    /// One output row per reconstructed row that passes the filters
    #[default]
    NoAggregation,
    /// Aggregate the rows of one record, emit one row per record
    AggregateWithinRecord,
    /// Aggregate the whole table, emit one row at the end
    AggregateAll,
}

/// One projected output column
#[derive(Debug, Clone, PartialEq)]
pub struct SelectListNode {
    pub expression: ValueExpr,
    pub alias: Option<String>,
}

impl SelectListNode {
    pub fn new(expression: ValueExpr) -> Self {
        Self {
            expression,
            alias: None,
        }
    }

    pub fn aliased(expression: ValueExpr, alias: impl Into<String>) -> Self {
        Self {
            expression,
            alias: Some(alias.into()),
        }
    }

    /// Output column name: the alias, or the rendered expression
    pub fn column_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expression.to_string(),
        }
    }
}

/// Scan of one cstable with projection, filter and optional aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialScanNode {
    pub table_name: String,
    pub select_list: Vec<SelectListNode>,
    pub where_expression: Option<ValueExpr>,
    pub aggregation_strategy: AggregationStrategy,
}

impl SequentialScanNode {
    pub fn new(table_name: impl Into<String>, select_list: Vec<SelectListNode>) -> Self {
        Self {
            table_name: table_name.into(),
            select_list,
            where_expression: None,
            aggregation_strategy: AggregationStrategy::NoAggregation,
        }
    }

    pub fn with_where(mut self, expression: ValueExpr) -> Self {
        self.where_expression = Some(expression);
        self
    }

    pub fn with_aggregation(mut self, strategy: AggregationStrategy) -> Self {
        self.aggregation_strategy = strategy;
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.select_list.iter().map(SelectListNode::column_name).collect()
    }
}
