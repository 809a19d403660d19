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

//! # nestql - Expression bytecode and nested columnar scans
//!
//! nestql is the execution core of a SQL engine over nested, column-striped
//! ("cstable", Dremel-style) tables. It compiles scalar and aggregate
//! expression trees into a compact stack bytecode and drives those programs
//! over the column streams of a table, reassembling rows from repetition
//! and definition levels.
//!
//! ## Key Features
//!
//! - **Bytecode Compiler** - `IF` lowered to conditional jumps, literals pooled in a static arena
//! - **Stateless Aggregates** - COUNT, SUM, MIN, MAX, MEAN over caller-owned instance memory
//! - **Nested Row Reconstruction** - Shallow fields held constant across deeper repeated values
//! - **Aggregation Strategies** - Per row, per record, or over the whole table
//! - **Cooperative Cancellation** - Stop-early callbacks and cancellable execution contexts
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use nestql::{
//!     CsTableScan, DataType, ExecutionContext, MemoryTableBuilder, SelectListNode,
//!     SequentialScanNode, Value, ValueExpr,
//! };
//!
//! let table = MemoryTableBuilder::new()
//!     .flat_column("price", DataType::Integer, vec![Value::Integer(3), Value::Integer(4)])
//!     .build()
//!     .unwrap();
//!
//! let stmt = SequentialScanNode::new(
//!     "orders",
//!     vec![SelectListNode::aliased(
//!         ValueExpr::call("mul", vec![ValueExpr::column("price"), ValueExpr::literal(10i64)]),
//!         "total",
//!     )],
//! );
//!
//! let mut scan = CsTableScan::from_reader(stmt, Arc::new(table));
//! let mut totals = Vec::new();
//! scan.execute(&ExecutionContext::new(), |row| {
//!     totals.push(row[0].clone());
//!     true
//! })
//! .unwrap();
//! assert_eq!(totals, vec![Value::Integer(30), Value::Integer(40)]);
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`DataType`], [`Value`], [`Error`])
//! - [`functions`] - Function registry, scalar and aggregate built-ins
//! - [`plan`] - Expression trees and scan plan nodes
//! - [`executor`] - Expression compiler, VM and the cstable scan
//! - [`storage`] - Striped column tables (memory and file) and configuration

pub mod core;
pub mod executor;
pub mod functions;
pub mod plan;
pub mod storage;

// Re-export main types for convenience
pub use core::{DataType, Error, Result, Value};

// Re-export function types
pub use functions::{
    global_registry, AggregateFunction, FunctionDataType, FunctionDescriptor, FunctionInfo,
    FunctionKind, FunctionRegistry, FunctionSignature, FunctionType, ScalarFunction,
};

// Re-export plan types
pub use plan::{AggregationStrategy, SelectListNode, SequentialScanNode, ValueExpr};

// Re-export executor types
pub use executor::{
    compile_expression, CacheKey, CancellationHandle, CsTableScan, ExecutionContext,
    ExprCompiler, ExprVM, Program, ScanState, TableSource,
};

// Re-export storage types
pub use storage::{
    ColumnEntry, ColumnReader, CsTableFile, MemoryTable, MemoryTableBuilder, ScanConfig,
    TableReader,
};
