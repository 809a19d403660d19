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

//! Reader traits for striped column tables
//!

use crate::core::{DataType, Result, Value};

/// One striped value with its Dremel levels
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    /// Depth at which this value's repeated group begins (0 = new record)
    pub repetition_level: u64,
    /// Number of optional/repeated ancestors that are present
    pub definition_level: u64,
    /// The value, NULL when `definition_level` is below the column maximum
    pub value: Value,
}

impl ColumnEntry {
    pub fn new(repetition_level: u64, definition_level: u64, value: Value) -> Self {
        Self {
            repetition_level,
            definition_level,
            value,
        }
    }
}

/// Sequential reader over one striped column
///
/// Readers are forward-only. `next_repetition_level()` peeks at the entry
/// the following `next()` will return, so a scan can decide whether the
/// column takes part in the next fetch without consuming it.
///
/// # Example
///
/// ```ignore
/// let mut reader = table.column_reader("links.url")?;
/// while let Some(entry) = reader.next()? {
///     // entry.repetition_level, entry.definition_level, entry.value
/// }
/// ```
pub trait ColumnReader: Send {
    /// Highest repetition level a value of this column can carry
    fn max_repetition_level(&self) -> u64;

    /// Definition level of a fully present value
    fn max_definition_level(&self) -> u64;

    /// Repetition level of the next entry, 0 when the column is exhausted
    fn next_repetition_level(&self) -> u64;

    /// Read the next entry
    ///
    /// Returns `Ok(None)` once every entry has been read. A stream that
    /// cannot be decoded yields `Error::Corrupted`.
    fn next(&mut self) -> Result<Option<ColumnEntry>>;

    /// Declared type of the column's values
    fn data_type(&self) -> DataType;
}

/// A table of striped columns
///
/// `column_reader` hands out independent readers, so one table can be
/// shared (`Arc<dyn TableReader>`) by several scans.
pub trait TableReader: Send + Sync {
    /// Number of top-level records
    fn num_records(&self) -> u64;

    /// Names of all columns in storage order
    fn column_names(&self) -> Vec<String>;

    /// Check if a column exists
    fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|c| c == name)
    }

    /// Open a fresh reader positioned at the first entry of `name`
    ///
    /// Returns `Error::ColumnNotFound` for an unknown column.
    fn column_reader(&self, name: &str) -> Result<Box<dyn ColumnReader>>;
}
