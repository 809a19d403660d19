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

//! MIN aggregate function

use std::cmp::Ordering;

use super::{clear_cell, fold_extremum, read_cell, VALUE_CELL_SIZE};
use crate::core::{Result, Value};
use crate::functions::{
    AggregateFunction, FunctionDataType, FunctionInfo, FunctionSignature, FunctionType,
};

/// MIN aggregate function
///
/// Smallest non-NULL numeric, boolean or timestamp value.
#[derive(Default)]
pub struct MinFunction;

impl AggregateFunction for MinFunction {
    fn name(&self) -> &str {
        "MIN"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MIN",
            FunctionType::Aggregate,
            "Returns the minimum value of all non-NULL values in the specified column",
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
            Some(value) => fold_extremum(state, value, Ordering::Less, "MIN"),
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
            Some(value) => fold_extremum(state, &value, Ordering::Less, "MIN"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(values: &[Value]) -> Vec<u8> {
        let mut state = vec![0; MinFunction.instance_size()];
        MinFunction.init(&mut state);
        for v in values {
            MinFunction
                .accumulate(&mut state, std::slice::from_ref(v))
                .unwrap();
        }
        state
    }

    #[test]
    fn test_min_basic() {
        let state = fold(&[Value::Integer(5), Value::Integer(-2), Value::Integer(9)]);
        assert_eq!(MinFunction.get(&state), Value::Integer(-2));
    }

    #[test]
    fn test_min_ignores_null() {
        let state = fold(&[Value::null_unknown(), Value::Float(3.5)]);
        assert_eq!(MinFunction.get(&state), Value::Float(3.5));
        assert!(MinFunction.get(&fold(&[Value::null_unknown()])).is_null());
    }

    #[test]
    fn test_min_rejects_text() {
        let mut state = fold(&[]);
        assert!(MinFunction
            .accumulate(&mut state, &[Value::text("a")])
            .is_err());
    }

    #[test]
    fn test_min_merge() {
        let mut a = fold(&[Value::Integer(4)]);
        let b = fold(&[Value::Integer(1)]);
        MinFunction.merge(&mut a, &b).unwrap();
        assert_eq!(MinFunction.get(&a), Value::Integer(1));

        let empty = fold(&[]);
        MinFunction.merge(&mut a, &empty).unwrap();
        assert_eq!(MinFunction.get(&a), Value::Integer(1));
    }
}
