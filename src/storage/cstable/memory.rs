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

//! In-memory striped tables
//!
//! Columns are held as fully decoded entry vectors. Used for tests, for
//! small intermediate tables and as the staging form written by
//! [`CsTableFile::write`](super::CsTableFile::write).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::reader::{ColumnEntry, ColumnReader, TableReader};
use crate::core::{DataType, Error, Result, Value};

/// One striped column
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    pub name: String,
    pub data_type: DataType,
    pub max_repetition_level: u64,
    pub max_definition_level: u64,
    pub entries: Arc<[ColumnEntry]>,
}

impl MemoryColumn {
    /// Number of records this column covers (entries starting a record)
    pub fn num_records(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.repetition_level == 0)
            .count() as u64
    }

    fn validate(&self) -> Result<()> {
        if let Some(first) = self.entries.first() {
            if first.repetition_level != 0 {
                return Err(Error::invalid_argument(format!(
                    "column '{}' must start a record with repetition level 0",
                    self.name
                )));
            }
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.repetition_level > self.max_repetition_level {
                return Err(Error::invalid_argument(format!(
                    "column '{}' entry {}: repetition level {} exceeds maximum {}",
                    self.name, i, entry.repetition_level, self.max_repetition_level
                )));
            }
            if entry.definition_level > self.max_definition_level {
                return Err(Error::invalid_argument(format!(
                    "column '{}' entry {}: definition level {} exceeds maximum {}",
                    self.name, i, entry.definition_level, self.max_definition_level
                )));
            }
        }
        Ok(())
    }
}

/// Table whose columns live in memory
#[derive(Debug, Clone)]
pub struct MemoryTable {
    num_records: u64,
    columns: Vec<MemoryColumn>,
    by_name: FxHashMap<String, usize>,
}

impl MemoryTable {
    /// Build a flat table: every column has `max_repetition_level` 0 and
    /// `max_definition_level` 1, and NULL values are stored undefined
    pub fn from_records(schema: &[(&str, DataType)], records: &[Vec<Value>]) -> Result<Self> {
        let mut builder = MemoryTableBuilder::new().num_records(records.len() as u64);
        for (i, (name, data_type)) in schema.iter().enumerate() {
            let mut entries = Vec::with_capacity(records.len());
            for (r, record) in records.iter().enumerate() {
                let value = record.get(i).cloned().ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "record {} has {} values, expected {}",
                        r,
                        record.len(),
                        schema.len()
                    ))
                })?;
                let definition_level = if value.is_null() { 0 } else { 1 };
                entries.push(ColumnEntry::new(0, definition_level, value));
            }
            builder = builder.column(*name, *data_type, 0, 1, entries);
        }
        builder.build()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&MemoryColumn> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// All columns in storage order
    pub fn columns(&self) -> &[MemoryColumn] {
        &self.columns
    }
}

impl TableReader for MemoryTable {
    fn num_records(&self) -> u64 {
        self.num_records
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn column_reader(&self, name: &str) -> Result<Box<dyn ColumnReader>> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        Ok(Box::new(MemoryColumnReader::new(column)))
    }
}

/// Reader over a [`MemoryColumn`]
pub struct MemoryColumnReader {
    entries: Arc<[ColumnEntry]>,
    data_type: DataType,
    max_repetition_level: u64,
    max_definition_level: u64,
    position: usize,
}

impl MemoryColumnReader {
    pub fn new(column: &MemoryColumn) -> Self {
        Self {
            entries: column.entries.clone(),
            data_type: column.data_type,
            max_repetition_level: column.max_repetition_level,
            max_definition_level: column.max_definition_level,
            position: 0,
        }
    }
}

impl ColumnReader for MemoryColumnReader {
    fn max_repetition_level(&self) -> u64 {
        self.max_repetition_level
    }

    fn max_definition_level(&self) -> u64 {
        self.max_definition_level
    }

    fn next_repetition_level(&self) -> u64 {
        self.entries
            .get(self.position)
            .map_or(0, |e| e.repetition_level)
    }

    fn next(&mut self) -> Result<Option<ColumnEntry>> {
        let entry = self.entries.get(self.position).cloned();
        if entry.is_some() {
            self.position += 1;
        }
        Ok(entry)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Builder for [`MemoryTable`]
///
/// # Example
///
/// ```ignore
/// // Two records: {name: "a", tags: ["x", "y"]}, {name: "b", tags: []}
/// let table = MemoryTableBuilder::new()
///     .flat_column("name", DataType::Text, vec![Value::text("a"), Value::text("b")])
///     .repeated_column("tags", DataType::Text, vec![
///         vec![Value::text("x"), Value::text("y")],
///         vec![],
///     ])
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryTableBuilder {
    num_records: Option<u64>,
    columns: Vec<MemoryColumn>,
}

impl MemoryTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the record count; inferred from the columns when unset
    pub fn num_records(mut self, n: u64) -> Self {
        self.num_records = Some(n);
        self
    }

    /// Add a column from explicit `(repetition, definition, value)` triples
    pub fn column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        max_repetition_level: u64,
        max_definition_level: u64,
        entries: Vec<ColumnEntry>,
    ) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            data_type,
            max_repetition_level,
            max_definition_level,
            entries: entries.into(),
        });
        self
    }

    /// Add a column from triples given as tuples
    pub fn column_triples(
        self,
        name: impl Into<String>,
        data_type: DataType,
        max_repetition_level: u64,
        max_definition_level: u64,
        triples: Vec<(u64, u64, Value)>,
    ) -> Self {
        let entries = triples
            .into_iter()
            .map(|(r, d, v)| ColumnEntry::new(r, d, v))
            .collect();
        self.column(
            name,
            data_type,
            max_repetition_level,
            max_definition_level,
            entries,
        )
    }

    /// Add an optional top-level column with one value per record
    pub fn flat_column(self, name: impl Into<String>, data_type: DataType, values: Vec<Value>) -> Self {
        let entries = values
            .into_iter()
            .map(|v| {
                let d = if v.is_null() { 0 } else { 1 };
                ColumnEntry::new(0, d, v)
            })
            .collect();
        self.column(name, data_type, 0, 1, entries)
    }

    /// Add a repeated top-level column with a list of values per record
    ///
    /// An empty list is stored as one undefined entry.
    pub fn repeated_column(
        self,
        name: impl Into<String>,
        data_type: DataType,
        records: Vec<Vec<Value>>,
    ) -> Self {
        let mut entries = Vec::new();
        for record in records {
            if record.is_empty() {
                entries.push(ColumnEntry::new(0, 0, Value::null(data_type)));
                continue;
            }
            for (i, v) in record.into_iter().enumerate() {
                let r = if i == 0 { 0 } else { 1 };
                let d = if v.is_null() { 0 } else { 1 };
                entries.push(ColumnEntry::new(r, d, v));
            }
        }
        self.column(name, data_type, 1, 1, entries)
    }

    /// Validate levels and record counts and build the table
    pub fn build(self) -> Result<MemoryTable> {
        let mut by_name = FxHashMap::default();
        for (i, column) in self.columns.iter().enumerate() {
            column.validate()?;
            if by_name.insert(column.name.clone(), i).is_some() {
                return Err(Error::invalid_argument(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        let num_records = match self.num_records {
            Some(n) => n,
            None => self.columns.first().map_or(0, MemoryColumn::num_records),
        };
        for column in &self.columns {
            let covered = column.num_records();
            if covered != num_records {
                return Err(Error::invalid_argument(format!(
                    "column '{}' covers {} records, table has {}",
                    column.name, covered, num_records
                )));
            }
        }

        Ok(MemoryTable {
            num_records,
            columns: self.columns,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_column_levels() {
        let table = MemoryTableBuilder::new()
            .repeated_column(
                "tags",
                DataType::Text,
                vec![
                    vec![Value::text("x"), Value::text("y")],
                    vec![],
                    vec![Value::text("z")],
                ],
            )
            .build()
            .unwrap();
        assert_eq!(table.num_records(), 3);

        let mut reader = table.column_reader("tags").unwrap();
        assert_eq!(reader.max_repetition_level(), 1);

        let levels: Vec<(u64, u64)> = std::iter::from_fn(|| reader.next().unwrap())
            .map(|e| (e.repetition_level, e.definition_level))
            .collect();
        assert_eq!(levels, vec![(0, 1), (1, 1), (0, 0), (0, 1)]);
        assert_eq!(reader.next_repetition_level(), 0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let table = MemoryTableBuilder::new()
            .column_triples(
                "a",
                DataType::Integer,
                1,
                1,
                vec![(0, 1, Value::Integer(1)), (1, 1, Value::Integer(2))],
            )
            .build()
            .unwrap();
        let mut reader = table.column_reader("a").unwrap();
        assert_eq!(reader.next_repetition_level(), 0);
        assert_eq!(reader.next().unwrap().unwrap().value, Value::Integer(1));
        assert_eq!(reader.next_repetition_level(), 1);
        assert_eq!(reader.next().unwrap().unwrap().value, Value::Integer(2));
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn test_from_records() {
        let table = MemoryTable::from_records(
            &[("id", DataType::Integer), ("name", DataType::Text)],
            &[
                vec![Value::Integer(1), Value::text("a")],
                vec![Value::Integer(2), Value::null(DataType::Text)],
            ],
        )
        .unwrap();
        assert_eq!(table.num_records(), 2);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        let name = table.column("name").unwrap();
        assert_eq!(name.entries[1].definition_level, 0);
    }

    #[test]
    fn test_unknown_column() {
        let table = MemoryTableBuilder::new().build().unwrap();
        assert_eq!(
            table.column_reader("nope").err(),
            Some(Error::ColumnNotFound("nope".to_string()))
        );
        assert!(!table.has_column("nope"));
    }

    #[test]
    fn test_build_rejects_inconsistent_columns() {
        let result = MemoryTableBuilder::new()
            .flat_column("a", DataType::Integer, vec![Value::Integer(1)])
            .flat_column("b", DataType::Integer, vec![Value::Integer(1), Value::Integer(2)])
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = MemoryTableBuilder::new()
            .column_triples("a", DataType::Integer, 0, 1, vec![(1, 1, Value::Integer(1))])
            .build();
        assert!(result.is_err());
    }
}
