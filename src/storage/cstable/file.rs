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

//! On-disk cstable files
//!
//! File layout (all integers little endian):
//!
//! ```text
//! MAGIC "NQCS" | VERSION u32 | NUM_RECORDS u64 | NUM_COLUMNS u32
//! per column:
//!   NAME_LEN u32 | NAME | TYPE u8 | MAX_REP u64 | MAX_DEF u64
//!   NUM_VALUES u64 | PAYLOAD_LEN u64 | PAYLOAD | CRC32(PAYLOAD) u32
//! payload entry:
//!   REP u32 | DEF u32 | encoded value
//! ```
//!
//! The whole file is read on open; column payloads are decoded lazily by
//! their readers.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use super::reader::{ColumnEntry, ColumnReader, TableReader};
use crate::core::{decode_value, encode_value, DataType, Error, Result};
use crate::storage::config::ScanConfig;

/// File signature
pub const MAGIC: &[u8; 4] = b"NQCS";

/// Current format version
pub const VERSION: u32 = 1;

/// Pseudo column name used when the file header itself is damaged
const HEADER: &str = "<header>";

/// Smallest possible column directory entry: an empty name and payload
const MIN_COLUMN_LEN: usize = 4 + 1 + 8 + 8 + 8 + 8 + 4;

/// Directory entry of one column
#[derive(Debug, Clone)]
struct ColumnMeta {
    name: String,
    data_type: DataType,
    max_repetition_level: u64,
    max_definition_level: u64,
    num_values: u64,
    payload: Range<usize>,
    checksum: u32,
}

/// An opened cstable file
#[derive(Debug)]
pub struct CsTableFile {
    path: PathBuf,
    data: Arc<[u8]>,
    num_records: u64,
    columns: Vec<ColumnMeta>,
    by_name: FxHashMap<String, usize>,
    verify_checksums: bool,
}

impl CsTableFile {
    /// Write every column of `table` to `path`
    #[instrument(name = "cstable::write", level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn write(path: impl AsRef<Path>, table: &dyn TableReader) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut out = BufWriter::new(file);

        let names = table.column_names();
        out.write_all(MAGIC)?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&table.num_records().to_le_bytes())?;
        out.write_all(&(names.len() as u32).to_le_bytes())?;

        let mut payload = Vec::new();
        for name in &names {
            let mut reader = table.column_reader(name)?;
            payload.clear();
            let mut num_values = 0u64;
            while let Some(entry) = reader.next()? {
                payload.extend_from_slice(&(entry.repetition_level as u32).to_le_bytes());
                payload.extend_from_slice(&(entry.definition_level as u32).to_le_bytes());
                encode_value(&entry.value, &mut payload);
                num_values += 1;
            }

            out.write_all(&(name.len() as u32).to_le_bytes())?;
            out.write_all(name.as_bytes())?;
            out.write_all(&[reader.data_type().as_u8()])?;
            out.write_all(&reader.max_repetition_level().to_le_bytes())?;
            out.write_all(&reader.max_definition_level().to_le_bytes())?;
            out.write_all(&num_values.to_le_bytes())?;
            out.write_all(&(payload.len() as u64).to_le_bytes())?;
            out.write_all(&payload)?;
            out.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
            debug!(column = %name, num_values, bytes = payload.len(), "wrote column");
        }

        out.flush()?;
        Ok(())
    }

    /// Open and index a cstable file
    #[instrument(name = "cstable::open", level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &ScanConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut bytes = Vec::new();
        File::open(&path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| Error::io(format!("{}: {}", path.display(), e)))?;

        let mut cursor = Cursor::new(&bytes);
        if cursor.take(4, HEADER)? != MAGIC {
            return Err(Error::io(format!("{}: not a cstable file", path.display())));
        }
        let version = cursor.u32(HEADER)?;
        if version != VERSION {
            return Err(Error::io(format!(
                "{}: unsupported cstable version {}",
                path.display(),
                version
            )));
        }
        let num_records = cursor.u64(HEADER)?;
        let num_columns = cursor.u32(HEADER)? as usize;

        // The column count is untrusted until the entries are read
        let mut columns = Vec::with_capacity(num_columns.min(cursor.remaining() / MIN_COLUMN_LEN));
        let mut by_name = FxHashMap::default();
        for _ in 0..num_columns {
            let name_len = cursor.u32(HEADER)? as usize;
            let name = std::str::from_utf8(cursor.take(name_len, HEADER)?)
                .map_err(|_| Error::corrupted(HEADER, "column name is not valid UTF-8"))?
                .to_string();
            let data_type = DataType::from_u8(cursor.u8(&name)?)
                .ok_or_else(|| Error::corrupted(name.as_str(), "unknown column type"))?;
            let max_repetition_level = cursor.u64(&name)?;
            let max_definition_level = cursor.u64(&name)?;
            let num_values = cursor.u64(&name)?;
            let payload_len = cursor.u64(&name)? as usize;
            let start = cursor.position();
            cursor.take(payload_len, &name)?;
            let checksum = cursor.u32(&name)?;

            by_name.insert(name.clone(), columns.len());
            columns.push(ColumnMeta {
                name,
                data_type,
                max_repetition_level,
                max_definition_level,
                num_values,
                payload: start..start + payload_len,
                checksum,
            });
        }

        debug!(num_records, num_columns, "opened cstable");
        Ok(Self {
            path,
            data: bytes.into(),
            num_records,
            columns,
            by_name,
            verify_checksums: config.verify_checksums,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl TableReader for CsTableFile {
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
        let meta = self
            .by_name
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;

        if self.verify_checksums && crc32fast::hash(&self.data[meta.payload.clone()]) != meta.checksum {
            return Err(Error::corrupted(name, "payload checksum mismatch"));
        }

        Ok(Box::new(FileColumnReader {
            data: self.data.clone(),
            name: meta.name.clone(),
            data_type: meta.data_type,
            max_repetition_level: meta.max_repetition_level,
            max_definition_level: meta.max_definition_level,
            position: meta.payload.start,
            end: meta.payload.end,
            remaining: meta.num_values,
        }))
    }
}

/// Lazily decoding reader over one column payload
struct FileColumnReader {
    data: Arc<[u8]>,
    name: String,
    data_type: DataType,
    max_repetition_level: u64,
    max_definition_level: u64,
    position: usize,
    end: usize,
    remaining: u64,
}

impl FileColumnReader {
    fn level_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.data.get(offset..offset + 4)?;
        if offset + 4 > self.end {
            return None;
        }
        bytes.try_into().ok().map(u32::from_le_bytes)
    }
}

impl ColumnReader for FileColumnReader {
    fn max_repetition_level(&self) -> u64 {
        self.max_repetition_level
    }

    fn max_definition_level(&self) -> u64 {
        self.max_definition_level
    }

    fn next_repetition_level(&self) -> u64 {
        if self.remaining == 0 {
            return 0;
        }
        // A truncated entry peeks as 0; next() reports the damage
        self.level_at(self.position).map_or(0, u64::from)
    }

    fn next(&mut self) -> Result<Option<ColumnEntry>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let repetition_level = self
            .level_at(self.position)
            .ok_or_else(|| Error::corrupted(self.name.as_str(), "truncated repetition level"))?;
        let definition_level = self
            .level_at(self.position + 4)
            .ok_or_else(|| Error::corrupted(self.name.as_str(), "truncated definition level"))?;
        let value_start = self.position + 8;
        let (value, consumed) = decode_value(&self.data[value_start..self.end])
            .map_err(|e| Error::corrupted(self.name.as_str(), e.to_string()))?;

        self.position = value_start + consumed;
        self.remaining -= 1;
        Ok(Some(ColumnEntry::new(
            u64::from(repetition_level),
            u64::from(definition_level),
            value,
        )))
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Bounds-checked reader over the file header
struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, n: usize, column: &str) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::corrupted(column, "unexpected end of file"))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn u8(&mut self, column: &str) -> Result<u8> {
        Ok(self.take(1, column)?[0])
    }

    fn u32(&mut self, column: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, column)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self, column: &str) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, column)?);
        Ok(u64::from_le_bytes(buf))
    }
}
