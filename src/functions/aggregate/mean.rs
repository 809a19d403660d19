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

//! MEAN aggregate function

use super::{read_f64, read_i64, write_f64, write_i64};
use crate::core::{DataType, Result, Value};
use crate::functions::{
    AggregateFunction, FunctionDataType, FunctionInfo, FunctionSignature, FunctionType,
};

const COUNT_OFFSET: usize = 0;
const SUM_OFFSET: usize = 8;

/// MEAN aggregate function
///
/// Arithmetic mean of the non-NULL numeric values. State is a count
/// followed by a running float sum.
#[derive(Default)]
pub struct MeanFunction;

impl AggregateFunction for MeanFunction {
    fn name(&self) -> &str {
        "MEAN"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MEAN",
            FunctionType::Aggregate,
            "Returns the average of all non-NULL values in the specified column",
            FunctionSignature::new(FunctionDataType::Float, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn instance_size(&self) -> usize {
        16
    }

    fn init(&self, state: &mut [u8]) {
        write_i64(state, COUNT_OFFSET, 0);
        write_f64(state, SUM_OFFSET, 0.0);
    }

    fn accumulate(&self, state: &mut [u8], args: &[Value]) -> Result<()> {
        let value = match args.first() {
            Some(Value::Integer(i)) => *i as f64,
            Some(Value::Float(f)) => *f,
            _ => return Ok(()),
        };
        write_i64(state, COUNT_OFFSET, read_i64(state, COUNT_OFFSET) + 1);
        write_f64(state, SUM_OFFSET, read_f64(state, SUM_OFFSET) + value);
        Ok(())
    }

    fn get(&self, state: &[u8]) -> Value {
        let count = read_i64(state, COUNT_OFFSET);
        if count == 0 {
            return Value::null(DataType::Float);
        }
        Value::Float(read_f64(state, SUM_OFFSET) / count as f64)
    }

    fn merge(&self, state: &mut [u8], other: &[u8]) -> Result<()> {
        write_i64(
            state,
            COUNT_OFFSET,
            read_i64(state, COUNT_OFFSET) + read_i64(other, COUNT_OFFSET),
        );
        write_f64(
            state,
            SUM_OFFSET,
            read_f64(state, SUM_OFFSET) + read_f64(other, SUM_OFFSET),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        let mut state = vec![0; MeanFunction.instance_size()];
        MeanFunction.init(&mut state);
        assert!(MeanFunction.get(&state).is_null());

        for v in [Value::Integer(1), Value::Integer(2), Value::null_unknown(), Value::Float(6.0)] {
            MeanFunction.accumulate(&mut state, &[v]).unwrap();
        }
        assert_eq!(MeanFunction.get(&state), Value::Float(3.0));
    }

    #[test]
    fn test_mean_merge() {
        let mut a = vec![0; 16];
        let mut b = vec![0; 16];
        MeanFunction.init(&mut a);
        MeanFunction.init(&mut b);
        MeanFunction.accumulate(&mut a, &[Value::Integer(10)]).unwrap();
        MeanFunction.accumulate(&mut b, &[Value::Integer(20)]).unwrap();
        MeanFunction.accumulate(&mut b, &[Value::Integer(30)]).unwrap();
        MeanFunction.merge(&mut a, &b).unwrap();
        assert_eq!(MeanFunction.get(&a), Value::Float(20.0));
    }
}
