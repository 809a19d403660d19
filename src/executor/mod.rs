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

//! Query Executor
//!
//! This module provides the scan side of query execution.
//!
//! # Architecture
//!
//! ```text
//! SequentialScanNode
//!   ↓ open(): bind columns, compile expressions
//! CsTableScan ──► column readers (cstable)
//!   ↓ per reconstructed row: where, filter, select list
//! ExprVM + Program (+ aggregate instance memory)
//!   ↓
//! row callback
//! ```
//!
//! # Components
//!
//! - [`CsTableScan`] - Sequential scan over a striped column table
//! - [`ExprCompiler`] / [`ExprVM`] - Expression bytecode compiler and VM
//! - [`ExecutionContext`] - Cancellation and progress accounting
//! - [`ScratchMemory`] - Per-scan aggregate instance memory

pub mod cache_key;
pub mod context;
pub mod cstable_scan;
pub mod expression;
pub mod scratch;

pub use cache_key::CacheKey;
pub use context::{CancellationHandle, ExecutionContext};
pub use cstable_scan::{CsTableScan, FilterFn, ScanState, TableSource};
pub use expression::{compile_expression, ExprCompiler, ExprVM, InstanceMethod, Op, Program};
pub use scratch::{InstanceSlot, ScratchMemory};
