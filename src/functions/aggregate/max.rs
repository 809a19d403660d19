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

//! MAX aggregate function

use std::cmp::Ordering;

use super::{clear_cell, fold_extremum, read_cell, VALUE_CELL_SIZE};
use crate::core::{Result, Value};
use crate::functions::{
    AggregateFunction, FunctionDataType, FunctionInfo, FunctionSignature, FunctionType,
};

/// MAX aggregate function
#[derive(Default)]
pub struct MaxFunction;

impl AggregateFunction for MaxFunction {
    fn name(&self) -> &str {
        "MAX"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MAX",
            FunctionType::Aggregate,
            "Returns the maximum value of all non-NULL values in the specified column",
            FunctionSignature::new(FunctionDataType::Any, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn instance_size(&self) -> usize {
        VALUE_CELL_SIZE
    }

    fn init(&self, state: &mut [u8]) {
        clear_cell(state);
    }

    fn accumulate(&self, state: &mut [u8], args: &[Value]) -> Result<()> {
        match args.first() {
            Some(value) => fold_extremum(state, value, Ordering::Greater, "MAX"),
            None => Ok(()),
        }
    }

    fn get(&self, state: &[u8]) -> Value {
        read_cell(state)
            .ok()
            .flatten()
            .unwrap_or_else(Value::null_unknown)
    }

    fn merge(&self, state: &mut [u8], other: &[u8]) -> Result<()> {
        match read_cell(other)? {
            Some(value) => fold_extremum(state, &value, Ordering::Greater, "MAX"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_max_timestamps() {
        let early = chrono::Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut state = vec![0; MaxFunction.instance_size()];
        MaxFunction.init(&mut state);
        MaxFunction
            .accumulate(&mut state, &[Value::Timestamp(late)])
            .unwrap();
        MaxFunction
            .accumulate(&mut state, &[Value::Timestamp(early)])
            .unwrap();
        assert_eq!(MaxFunction.get(&state), Value::Timestamp(late));
    }

    #[test]
    fn test_max_mixed_numeric() {
        let mut state = vec![0; MaxFunction.instance_size()];
        MaxFunction.init(&mut state);
        for v in [Value::Integer(3), Value::Float(3.5), Value::Integer(2)] {
            MaxFunction.accumulate(&mut state, &[v]).unwrap();
        }
        assert_eq!(MaxFunction.get(&state), Value::Float(3.5));
    }
}
