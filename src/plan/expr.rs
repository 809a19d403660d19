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

//! Value expression tree
//!
//! The closed set of node kinds the expression compiler lowers. Column
//! references start unresolved (`index: None`) and are bound to input slots
//! by the scan that owns the expression.

use std::fmt;

use crate::core::{DataType, Value};

/// A scalar or aggregate expression
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// Reference to a (possibly nested, dotted) column
    ColumnReference {
        column: String,
        /// Input slot, assigned during column resolution
        index: Option<usize>,
        /// Type the column's values are coerced to
        data_type: DataType,
    },

    /// Constant value
    Literal { value: Value },

    /// Conditional: `true_branch` when `condition` is true, else `false_branch`
    If {
        condition: Box<ValueExpr>,
        true_branch: Box<ValueExpr>,
        false_branch: Box<ValueExpr>,
    },

    /// Call of a registered pure or aggregate function
    Call {
        symbol: String,
        arguments: Vec<ValueExpr>,
    },
}

impl ValueExpr {
    /// Unresolved column reference
    pub fn column(name: impl Into<String>) -> Self {
        ValueExpr::ColumnReference {
            column: name.into(),
            index: None,
            data_type: DataType::Null,
        }
    }

    /// Column reference already bound to an input slot
    pub fn column_at(name: impl Into<String>, index: usize, data_type: DataType) -> Self {
        ValueExpr::ColumnReference {
            column: name.into(),
            index: Some(index),
            data_type,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        ValueExpr::Literal {
            value: value.into(),
        }
    }

    pub fn if_then_else(condition: ValueExpr, true_branch: ValueExpr, false_branch: ValueExpr) -> Self {
        ValueExpr::If {
            condition: Box::new(condition),
            true_branch: Box::new(true_branch),
            false_branch: Box::new(false_branch),
        }
    }

    pub fn call(symbol: impl Into<String>, arguments: Vec<ValueExpr>) -> Self {
        ValueExpr::Call {
            symbol: symbol.into(),
            arguments,
        }
    }

    /// Direct children, in evaluation order
    pub fn children(&self) -> Vec<&ValueExpr> {
        match self {
            ValueExpr::ColumnReference { .. } | ValueExpr::Literal { .. } => Vec::new(),
            ValueExpr::If {
                condition,
                true_branch,
                false_branch,
            } => vec![&**condition, &**true_branch, &**false_branch],
            ValueExpr::Call { arguments, .. } => arguments.iter().collect(),
        }
    }

    /// Visit this node and all descendants, pre-order
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ValueExpr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Visit this node and all descendants mutably, pre-order
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut ValueExpr)) {
        visit(self);
        match self {
            ValueExpr::ColumnReference { .. } | ValueExpr::Literal { .. } => {}
            ValueExpr::If {
                condition,
                true_branch,
                false_branch,
            } => {
                condition.walk_mut(visit);
                true_branch.walk_mut(visit);
                false_branch.walk_mut(visit);
            }
            ValueExpr::Call { arguments, .. } => {
                for arg in arguments {
                    arg.walk_mut(visit);
                }
            }
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::ColumnReference { column, .. } => write!(f, "{}", column),
            ValueExpr::Literal { value } => match value {
                Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
                other => write!(f, "{}", other),
            },
            ValueExpr::If {
                condition,
                true_branch,
                false_branch,
            } => write!(f, "IF({}, {}, {})", condition, true_branch, false_branch),
            ValueExpr::Call { symbol, arguments } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", symbol, args.join(", "))
            }
        }
    }
}
