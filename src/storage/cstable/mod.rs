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

//! Nested columnar tables (cstable)
//!
//! Each field of a nested record is striped into its own column of
//! `(repetition_level, definition_level, value)` entries:
//! - `reader`: the `TableReader` / `ColumnReader` capability scans consume
//! - `memory`: in-memory tables and their builder
//! - `file`: the on-disk format

mod file;
mod memory;
mod reader;

pub use file::{CsTableFile, MAGIC, VERSION};
pub use memory::{MemoryColumn, MemoryColumnReader, MemoryTable, MemoryTableBuilder};
pub use reader::{ColumnEntry, ColumnReader, TableReader};
