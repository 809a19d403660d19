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

//! Binary value codec
//!
//! Used for literals in a program's static storage and for the value
//! payload of the cstable file format. Every value is a one-byte tag
//! followed by a fixed-width or u32-length-prefixed payload, little endian.

use std::sync::Arc;

use super::error::{Error, Result};
use super::types::DataType;
use super::value::Value;

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_TIMESTAMP: u8 = 8;

/// Append the encoding of `value` to `buf`
pub fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null(dt) => {
            buf.push(TAG_NULL);
            buf.push(dt.as_u8());
        }
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::Integer(i) => {
            buf.push(TAG_INTEGER);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float(f) => {
            buf.push(TAG_FLOAT);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Timestamp(ts) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&ts.timestamp().to_le_bytes());
            buf.extend_from_slice(&ts.timestamp_subsec_nanos().to_le_bytes());
        }
    }
}

/// Decode one value from the front of `data`
///
/// Returns the value and the number of bytes consumed.
pub fn decode_value(data: &[u8]) -> Result<(Value, usize)> {
    let (&tag, rest) = data
        .split_first()
        .ok_or_else(|| Error::internal("empty value data"))?;

    match tag {
        TAG_NULL => {
            let dt = rest
                .first()
                .and_then(|b| DataType::from_u8(*b))
                .ok_or_else(|| Error::internal("missing null type"))?;
            Ok((Value::Null(dt), 2))
        }
        TAG_BOOLEAN => {
            let b = rest
                .first()
                .ok_or_else(|| Error::internal("missing boolean value"))?;
            Ok((Value::Boolean(*b != 0), 2))
        }
        TAG_INTEGER => {
            let bytes = fixed::<8>(rest, "integer")?;
            Ok((Value::Integer(i64::from_le_bytes(bytes)), 9))
        }
        TAG_FLOAT => {
            let bytes = fixed::<8>(rest, "float")?;
            Ok((Value::Float(f64::from_le_bytes(bytes)), 9))
        }
        TAG_TEXT => {
            let len = u32::from_le_bytes(fixed::<4>(rest, "text length")?) as usize;
            let payload = rest
                .get(4..4 + len)
                .ok_or_else(|| Error::internal("missing text data"))?;
            let s = std::str::from_utf8(payload)
                .map_err(|e| Error::internal(format!("invalid text: {}", e)))?;
            Ok((Value::Text(Arc::from(s)), 5 + len))
        }
        TAG_TIMESTAMP => {
            let secs = i64::from_le_bytes(fixed::<8>(rest, "timestamp")?);
            let nanos = u32::from_le_bytes(fixed::<4>(&rest[8..], "timestamp")?);
            let ts = chrono::DateTime::from_timestamp(secs, nanos)
                .ok_or_else(|| Error::internal("invalid timestamp"))?;
            Ok((Value::Timestamp(ts), 13))
        }
        other => Err(Error::internal(format!("unknown value tag {}", other))),
    }
}

fn fixed<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
    data.get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::internal(format!("missing {} value", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_decode_sequence() {
        let values = vec![
            Value::Integer(-17),
            Value::null(DataType::Float),
            Value::text("héllo"),
            Value::Boolean(true),
            Value::Float(2.25),
            Value::Timestamp(chrono::Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap()),
        ];

        let mut buf = Vec::new();
        for v in &values {
            encode_value(v, &mut buf);
        }

        let mut offset = 0;
        let mut decoded = Vec::new();
        while offset < buf.len() {
            let (v, n) = decode_value(&buf[offset..]).unwrap();
            decoded.push(v);
            offset += n;
        }
        assert_eq!(decoded, values);
        assert_eq!(decoded[1].data_type(), DataType::Float);
    }

    #[test]
    fn test_decode_truncated() {
        let mut buf = Vec::new();
        encode_value(&Value::text("abcdef"), &mut buf);
        assert!(decode_value(&buf[..buf.len() - 2]).is_err());
        assert!(decode_value(&[]).is_err());
        assert!(decode_value(&[99]).is_err());
    }
}
