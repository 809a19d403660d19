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

//! Math scalar functions

use super::{value_to_f64, value_to_i64};
use crate::core::{Error, Result, Value};
use crate::functions::{
    FunctionDataType, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};
use crate::validate_arg_count;

// ============================================================================
// ABS
// ============================================================================

/// ABS function - returns the absolute value of a number
#[derive(Default)]
pub struct AbsFunction;

impl ScalarFunction for AbsFunction {
    fn name(&self) -> &str {
        "ABS"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "ABS",
            FunctionType::Pure,
            "Returns the absolute value of a number",
            FunctionSignature::new(FunctionDataType::Any, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "ABS", 1);

        if args[0].is_null() {
            return Ok(Value::null_unknown());
        }

        // Integers stay integers
        if let Value::Integer(i) = args[0] {
            return i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| Error::expression_evaluation("integer overflow in ABS"));
        }

        let num = value_to_f64(&args[0])
            .ok_or_else(|| Error::invalid_argument("ABS argument must be a number"))?;

        Ok(Value::Float(num.abs()))
    }
}

// ============================================================================
// ROUND
// ============================================================================

/// ROUND function - rounds a number to a specified number of decimal places
#[derive(Default)]
pub struct RoundFunction;

impl ScalarFunction for RoundFunction {
    fn name(&self) -> &str {
        "ROUND"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "ROUND",
            FunctionType::Pure,
            "Rounds a number to a specified number of decimal places",
            FunctionSignature::new(
                FunctionDataType::Float,
                vec![FunctionDataType::Any, FunctionDataType::Integer],
                1,
                2,
            ),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "ROUND", 1, 2);

        if args[0].is_null() {
            return Ok(Value::null_unknown());
        }

        let num = value_to_f64(&args[0])
            .ok_or_else(|| Error::invalid_argument("ROUND first argument must be a number"))?;

        let places = if args.len() == 2 && !args[1].is_null() {
            let places = value_to_i64(&args[1])
                .ok_or_else(|| Error::invalid_argument("ROUND decimal places must be an integer"))?;
            i32::try_from(places).map_err(|_| {
                Error::invalid_argument(format!("ROUND decimal places out of range: {}", places))
            })?
        } else {
            0
        };

        let shift = 10_f64.powi(places);
        Ok(Value::Float((num * shift).round() / shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs() {
        assert_eq!(
            AbsFunction.evaluate(&[Value::Integer(-5)]).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            AbsFunction.evaluate(&[Value::Float(-2.5)]).unwrap(),
            Value::Float(2.5)
        );
        assert!(AbsFunction
            .evaluate(&[Value::null_unknown()])
            .unwrap()
            .is_null());
        assert!(AbsFunction.evaluate(&[]).is_err());
    }

    #[test]
    fn test_round() {
        assert_eq!(
            RoundFunction.evaluate(&[Value::Float(2.567)]).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            RoundFunction
                .evaluate(&[Value::Float(2.567), Value::Integer(2)])
                .unwrap(),
            Value::Float(2.57)
        );
    }

    #[test]
    fn test_round_places_out_of_range() {
        let err = RoundFunction
            .evaluate(&[Value::Float(2.567), Value::Integer(4_294_967_298)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(RoundFunction
            .evaluate(&[Value::Float(2.567), Value::Integer(i64::MIN)])
            .is_err());
    }
}
