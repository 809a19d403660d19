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

//! Utility scalar functions

use crate::core::{Error, Result, Value};
use crate::functions::{
    FunctionDataType, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};

// ============================================================================
// COALESCE
// ============================================================================

/// COALESCE function - returns the first non-null argument
#[derive(Default)]
pub struct CoalesceFunction;

impl ScalarFunction for CoalesceFunction {
    fn name(&self) -> &str {
        "COALESCE"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "COALESCE",
            FunctionType::Pure,
            "Returns the first non-null value in a list",
            FunctionSignature::variadic(FunctionDataType::Any, FunctionDataType::Any),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        if args.is_empty() {
            return Err(Error::invalid_argument(
                "COALESCE requires at least 1 argument",
            ));
        }

        Ok(args
            .iter()
            .find(|arg| !arg.is_null())
            .cloned()
            .unwrap_or_else(Value::null_unknown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce() {
        let result = CoalesceFunction
            .evaluate(&[Value::null_unknown(), Value::Integer(3), Value::Integer(4)])
            .unwrap();
        assert_eq!(result, Value::Integer(3));

        let all_null = CoalesceFunction
            .evaluate(&[Value::null_unknown(), Value::null_unknown()])
            .unwrap();
        assert!(all_null.is_null());
    }
}
