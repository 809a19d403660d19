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

//! Aggregate Functions
//!
//! - [`CountFunction`] - COUNT(*) and COUNT(column)
//! - [`SumFunction`] - SUM(column)
//! - [`MeanFunction`] - MEAN(column), also registered as AVG
//! - [`MinFunction`] - MIN(column)
//! - [`MaxFunction`] - MAX(column)
//!
//! State lives in caller-owned byte slices. SUM, MIN and MAX share the
//! nine-byte value cell defined here: one tag byte and an eight-byte
//! little-endian payload.

mod count;
mod max;
mod mean;
mod min;
mod sum;

pub use count::CountFunction;
pub use max::MaxFunction;
pub use mean::MeanFunction;
pub use min::MinFunction;
pub use sum::SumFunction;

use crate::core::{Error, Result, Value};

const CELL_EMPTY: u8 = 0;
const CELL_INTEGER: u8 = 1;
const CELL_FLOAT: u8 = 2;
const CELL_TIMESTAMP: u8 = 3;
const CELL_BOOLEAN: u8 = 4;

/// Size of a value cell in bytes
pub(crate) const VALUE_CELL_SIZE: usize = 9;

#[inline]
pub(crate) fn read_i64(state: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&state[offset..offset + 8]);
    i64::from_le_bytes(buf)
}

#[inline]
pub(crate) fn write_i64(state: &mut [u8], offset: usize, value: i64) {
    state[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn read_f64(state: &[u8], offset: usize) -> f64 {
    f64::from_bits(read_i64(state, offset) as u64)
}

#[inline]
pub(crate) fn write_f64(state: &mut [u8], offset: usize, value: f64) {
    write_i64(state, offset, value.to_bits() as i64);
}

/// Mark a cell as holding no value
pub(crate) fn clear_cell(state: &mut [u8]) {
    state[..VALUE_CELL_SIZE].fill(0);
}

/// Read the value held by a cell, `None` when empty
pub(crate) fn read_cell(state: &[u8]) -> Result<Option<Value>> {
    let payload = read_i64(state, 1);
    match state[0] {
        CELL_EMPTY => Ok(None),
        CELL_INTEGER => Ok(Some(Value::Integer(payload))),
        CELL_FLOAT => Ok(Some(Value::Float(f64::from_bits(payload as u64)))),
        CELL_TIMESTAMP => {
            let ts = chrono::DateTime::from_timestamp(
                payload.div_euclid(1_000_000_000),
                payload.rem_euclid(1_000_000_000) as u32,
            )
            .ok_or_else(|| Error::internal("invalid timestamp in aggregate state"))?;
            Ok(Some(Value::Timestamp(ts)))
        }
        CELL_BOOLEAN => Ok(Some(Value::Boolean(payload != 0))),
        tag => Err(Error::internal(format!("invalid aggregate cell tag {}", tag))),
    }
}

/// Store a non-null value in a cell
pub(crate) fn write_cell(state: &mut [u8], value: &Value, function: &str) -> Result<()> {
    let (tag, payload) = match value {
        Value::Integer(i) => (CELL_INTEGER, *i),
        Value::Float(f) => (CELL_FLOAT, f.to_bits() as i64),
        Value::Boolean(b) => (CELL_BOOLEAN, i64::from(*b)),
        Value::Timestamp(t) => (
            CELL_TIMESTAMP,
            t.timestamp_nanos_opt().ok_or_else(|| {
                Error::NotSupported(format!("{} of timestamps outside the nanosecond range", function))
            })?,
        ),
        other => {
            return Err(Error::NotSupported(format!(
                "{} over {} values",
                function,
                other.data_type()
            )))
        }
    };
    state[0] = tag;
    write_i64(state, 1, payload);
    Ok(())
}

/// Replace the cell's value with `value` when the cell is empty or
/// `value` compares as `wanted` against it. Used by MIN and MAX.
pub(crate) fn fold_extremum(
    state: &mut [u8],
    value: &Value,
    wanted: std::cmp::Ordering,
    function: &str,
) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let replace = match read_cell(state)? {
        None => true,
        Some(current) => value.compare(&current)? == wanted,
    };
    if replace {
        write_cell(state, value, function)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_cell() {
        let mut cell = [0u8; VALUE_CELL_SIZE];
        assert_eq!(read_cell(&cell).unwrap(), None);

        write_cell(&mut cell, &Value::Float(1.25), "MIN").unwrap();
        assert_eq!(read_cell(&cell).unwrap(), Some(Value::Float(1.25)));

        write_cell(&mut cell, &Value::Integer(-9), "MIN").unwrap();
        assert_eq!(read_cell(&cell).unwrap(), Some(Value::Integer(-9)));

        assert!(write_cell(&mut cell, &Value::text("x"), "MIN").is_err());

        clear_cell(&mut cell);
        assert_eq!(read_cell(&cell).unwrap(), None);
    }
}
