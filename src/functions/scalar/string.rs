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

//! String scalar functions

use std::sync::Arc;

use super::value_to_string;
use crate::core::{DataType, Error, Result, Value};
use crate::functions::{
    FunctionDataType, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};
use crate::validate_arg_count;

// ============================================================================
// UPPER
// ============================================================================

/// UPPER function - converts a string to uppercase
#[derive(Default)]
pub struct UpperFunction;

impl ScalarFunction for UpperFunction {
    fn name(&self) -> &str {
        "UPPER"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "UPPER",
            FunctionType::Pure,
            "Converts a string to uppercase",
            FunctionSignature::new(FunctionDataType::String, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "UPPER", 1);

        if args[0].is_null() {
            return Ok(Value::null(DataType::Text));
        }

        let s = value_to_string(&args[0]);
        Ok(Value::Text(Arc::from(s.to_uppercase().as_str())))
    }
}

// ============================================================================
// LOWER
// ============================================================================

/// LOWER function - converts a string to lowercase
#[derive(Default)]
pub struct LowerFunction;

impl ScalarFunction for LowerFunction {
    fn name(&self) -> &str {
        "LOWER"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LOWER",
            FunctionType::Pure,
            "Converts a string to lowercase",
            FunctionSignature::new(FunctionDataType::String, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LOWER", 1);

        if args[0].is_null() {
            return Ok(Value::null(DataType::Text));
        }

        let s = value_to_string(&args[0]);
        Ok(Value::Text(Arc::from(s.to_lowercase().as_str())))
    }
}

// ============================================================================
// LENGTH
// ============================================================================

/// LENGTH function - number of characters in a string
#[derive(Default)]
pub struct LengthFunction;

impl ScalarFunction for LengthFunction {
    fn name(&self) -> &str {
        "LENGTH"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LENGTH",
            FunctionType::Pure,
            "Returns the number of characters in a string",
            FunctionSignature::new(FunctionDataType::Integer, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LENGTH", 1);

        if args[0].is_null() {
            return Ok(Value::null(DataType::Integer));
        }

        let len = match &args[0] {
            Value::Text(s) => s.chars().count(),
            other => value_to_string(other).chars().count(),
        };
        Ok(Value::Integer(len as i64))
    }
}

// ============================================================================
// CONCAT
// ============================================================================

/// CONCAT function - concatenates its arguments, skipping NULLs
#[derive(Default)]
pub struct ConcatFunction;

impl ScalarFunction for ConcatFunction {
    fn name(&self) -> &str {
        "CONCAT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "CONCAT",
            FunctionType::Pure,
            "Concatenates multiple strings",
            FunctionSignature::variadic(FunctionDataType::String, FunctionDataType::Any),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        if args.is_empty() {
            return Err(Error::invalid_argument(
                "CONCAT requires at least 1 argument",
            ));
        }

        let mut result = String::new();
        for arg in args.iter().filter(|a| !a.is_null()) {
            result.push_str(&value_to_string(arg));
        }

        Ok(Value::Text(Arc::from(result.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_lower() {
        assert_eq!(
            UpperFunction.evaluate(&[Value::text("abc")]).unwrap(),
            Value::text("ABC")
        );
        assert_eq!(
            LowerFunction.evaluate(&[Value::text("AbC")]).unwrap(),
            Value::text("abc")
        );
        assert!(UpperFunction
            .evaluate(&[Value::null_unknown()])
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(
            LengthFunction.evaluate(&[Value::text("héllo")]).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            LengthFunction.evaluate(&[Value::Integer(1234)]).unwrap(),
            Value::Integer(4)
        );
    }

    #[test]
    fn test_concat_skips_nulls() {
        let result = ConcatFunction
            .evaluate(&[
                Value::text("a"),
                Value::null_unknown(),
                Value::Integer(1),
            ])
            .unwrap();
        assert_eq!(result, Value::text("a1"));
        assert!(ConcatFunction.evaluate(&[]).is_err());
    }
}
