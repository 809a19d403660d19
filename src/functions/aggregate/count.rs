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

//! COUNT aggregate function

use super::{read_i64, write_i64};
use crate::core::{Result, Value};
use crate::functions::{
    AggregateFunction, FunctionDataType, FunctionInfo, FunctionSignature, FunctionType,
};

/// COUNT aggregate function
///
/// With no argument every accumulated row counts. With one argument only
/// non-NULL values count. State is a single i64.
#[derive(Default)]
pub struct CountFunction;

impl AggregateFunction for CountFunction {
    fn name(&self) -> &str {
        "COUNT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "COUNT",
            FunctionType::Aggregate,
            "Returns the number of rows or non-NULL values",
            FunctionSignature::new(
                FunctionDataType::Integer,
                vec![FunctionDataType::Any],
                0,
                1,
            ),
        )
    }

    fn instance_size(&self) -> usize {
        8
    }

    fn init(&self, state: &mut [u8]) {
        write_i64(state, 0, 0);
    }

    fn accumulate(&self, state: &mut [u8], args: &[Value]) -> Result<()> {
        if args.first().is_some_and(Value::is_null) {
            return Ok(());
        }
        write_i64(state, 0, read_i64(state, 0) + 1);
        Ok(())
    }

    fn get(&self, state: &[u8]) -> Value {
        Value::Integer(read_i64(state, 0))
    }

    fn merge(&self, state: &mut [u8], other: &[u8]) -> Result<()> {
        write_i64(state, 0, read_i64(state, 0) + read_i64(other, 0));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Vec<u8> {
        let mut state = vec![0xAA; CountFunction.instance_size()];
        CountFunction.init(&mut state);
        state
    }

    #[test]
    fn test_count_star() {
        let mut state = fresh();
        for _ in 0..3 {
            CountFunction.accumulate(&mut state, &[]).unwrap();
        }
        assert_eq!(CountFunction.get(&state), Value::Integer(3));
    }

    #[test]
    fn test_count_skips_null() {
        let mut state = fresh();
        CountFunction
            .accumulate(&mut state, &[Value::Integer(1)])
            .unwrap();
        CountFunction
            .accumulate(&mut state, &[Value::null_unknown()])
            .unwrap();
        assert_eq!(CountFunction.get(&state), Value::Integer(1));
    }

    #[test]
    fn test_count_empty_is_zero() {
        assert_eq!(CountFunction.get(&fresh()), Value::Integer(0));
    }

    #[test]
    fn test_count_merge_and_reset() {
        let mut a = fresh();
        let mut b = fresh();
        CountFunction.accumulate(&mut a, &[]).unwrap();
        CountFunction.accumulate(&mut b, &[]).unwrap();
        CountFunction.accumulate(&mut b, &[]).unwrap();
        CountFunction.merge(&mut a, &b).unwrap();
        assert_eq!(CountFunction.get(&a), Value::Integer(3));

        CountFunction.reset(&mut a);
        assert_eq!(CountFunction.get(&a), Value::Integer(0));
    }
}
