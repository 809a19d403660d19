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

//! SUM aggregate function

use super::{clear_cell, read_cell, write_cell, VALUE_CELL_SIZE};
use crate::core::{Error, Result, Value};
use crate::functions::{
    AggregateFunction, FunctionDataType, FunctionInfo, FunctionSignature, FunctionType,
};

/// SUM aggregate function
///
/// Returns the sum of all non-NULL numeric values. Stays an integer while
/// only integers are seen and switches to float on the first float.
/// NULL when nothing was summed.
#[derive(Default)]
pub struct SumFunction;

impl SumFunction {
    fn add(current: Option<Value>, value: &Value) -> Result<Value> {
        match (current, value) {
            (None, v) => Ok(v.clone()),
            (Some(Value::Integer(a)), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or_else(|| Error::expression_evaluation("integer overflow in SUM")),
            (Some(a), b) => {
                let a = a.as_float64().unwrap_or(0.0);
                let b = b.as_float64().unwrap_or(0.0);
                Ok(Value::Float(a + b))
            }
        }
    }
}

impl AggregateFunction for SumFunction {
    fn name(&self) -> &str {
        "SUM"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "SUM",
            FunctionType::Aggregate,
            "Returns the sum of all non-NULL values in the specified column",
            FunctionSignature::new(
                FunctionDataType::Any, // integer or float depending on input
                vec![FunctionDataType::Any],
                1,
                1,
            ),
        )
    }

    fn instance_size(&self) -> usize {
        VALUE_CELL_SIZE
    }

    fn init(&self, state: &mut [u8]) {
        clear_cell(state);
    }

    fn accumulate(&self, state: &mut [u8], args: &[Value]) -> Result<()> {
        let value = match args.first() {
            Some(v @ (Value::Integer(_) | Value::Float(_))) => v,
            // NULL and non-numeric values are ignored
            _ => return Ok(()),
        };
        let sum = Self::add(read_cell(state)?, value)?;
        write_cell(state, &sum, "SUM")
    }

    fn get(&self, state: &[u8]) -> Value {
        read_cell(state)
            .ok()
            .flatten()
            .unwrap_or_else(Value::null_unknown)
    }

    fn merge(&self, state: &mut [u8], other: &[u8]) -> Result<()> {
        match read_cell(other)? {
            Some(value) => {
                let sum = Self::add(read_cell(state)?, &value)?;
                write_cell(state, &sum, "SUM")
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(values: &[Value]) -> Vec<u8> {
        let mut state = vec![0; SumFunction.instance_size()];
        SumFunction.init(&mut state);
        for v in values {
            SumFunction
                .accumulate(&mut state, std::slice::from_ref(v))
                .unwrap();
        }
        state
    }

    #[test]
    fn test_sum_integers() {
        let state = fold(&[Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(SumFunction.get(&state), Value::Integer(6));
    }

    #[test]
    fn test_sum_mixed() {
        let state = fold(&[Value::Integer(1), Value::Float(2.5), Value::Integer(3)]);
        assert_eq!(SumFunction.get(&state), Value::Float(6.5));
    }

    #[test]
    fn test_sum_ignores_null() {
        let state = fold(&[Value::Integer(1), Value::null_unknown(), Value::Integer(3)]);
        assert_eq!(SumFunction.get(&state), Value::Integer(4));
    }

    #[test]
    fn test_sum_empty() {
        assert!(SumFunction.get(&fold(&[])).is_null());
    }

    #[test]
    fn test_sum_negative() {
        let state = fold(&[Value::Integer(-5), Value::Integer(10), Value::Integer(-3)]);
        assert_eq!(SumFunction.get(&state), Value::Integer(2));
    }

    #[test]
    fn test_sum_merge_matches_single_pass() {
        let values: Vec<Value> = (1..=10).map(Value::Integer).collect();
        let whole = SumFunction.get(&fold(&values));

        for split in 0..=values.len() {
            let mut left = fold(&values[..split]);
            let right = fold(&values[split..]);
            SumFunction.merge(&mut left, &right).unwrap();
            assert_eq!(SumFunction.get(&left), whole, "split at {}", split);
        }
    }

    #[test]
    fn test_sum_save_load_state() {
        let state = fold(&[Value::Integer(40), Value::Integer(2)]);
        let mut checkpoint = Vec::new();
        SumFunction.save_state(&state, &mut checkpoint);

        let mut restored = vec![0; SumFunction.instance_size()];
        SumFunction.init(&mut restored);
        SumFunction.load_state(&mut restored, &checkpoint).unwrap();
        assert_eq!(SumFunction.get(&restored), Value::Integer(42));
    }
}
