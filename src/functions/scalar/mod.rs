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

//! Pure Functions
//!
//! ## Operators
//! The planner lowers SQL operators to calls, so they live here as ordinary
//! functions: `ADD SUB MUL DIV MOD NEG EQ NEQ LT LTE GT GTE LOGICAL_AND
//! LOGICAL_OR LOGICAL_NOT`.
//!
//! ## Math Functions
//! - [`AbsFunction`] - ABS(number)
//! - [`RoundFunction`] - ROUND(number, decimals)
//!
//! ## String Functions
//! - [`UpperFunction`] - UPPER(string)
//! - [`LowerFunction`] - LOWER(string)
//! - [`LengthFunction`] - LENGTH(string)
//! - [`ConcatFunction`] - CONCAT(string, ...)
//!
//! ## Utility Functions
//! - [`CoalesceFunction`] - COALESCE(value, ...)

mod math;
mod operators;
mod string;
mod utility;

pub use math::{AbsFunction, RoundFunction};
pub use operators::{
    AddFunction, DivFunction, EqFunction, GtFunction, GteFunction, LogicalAndFunction,
    LogicalNotFunction, LogicalOrFunction, LtFunction, LteFunction, ModFunction, MulFunction,
    NegFunction, NeqFunction, SubFunction,
};
pub use string::{ConcatFunction, LengthFunction, LowerFunction, UpperFunction};
pub use utility::CoalesceFunction;

use crate::core::Value;

/// Macro to validate argument count for scalar functions.
///
/// # Usage
/// ```ignore
/// // Exact count
/// validate_arg_count!(args, "UPPER", 1);
///
/// // Range (min, max inclusive)
/// validate_arg_count!(args, "ROUND", 1, 2);
/// ```
#[macro_export]
macro_rules! validate_arg_count {
    // Exact count
    ($args:expr, $name:expr, $exact:expr) => {
        if $args.len() != $exact {
            return Err($crate::core::Error::invalid_argument(format!(
                "{} requires exactly {} argument{}, got {}",
                $name,
                $exact,
                if $exact == 1 { "" } else { "s" },
                $args.len()
            )));
        }
    };
    // Range (min to max inclusive)
    ($args:expr, $name:expr, $min:expr, $max:expr) => {
        if $args.len() < $min || $args.len() > $max {
            return Err($crate::core::Error::invalid_argument(format!(
                "{} requires {} to {} arguments, got {}",
                $name,
                $min,
                $max,
                $args.len()
            )));
        }
    };
}

/// Convert a Value to a string representation
pub fn value_to_string(value: &Value) -> String {
    value.as_string().unwrap_or_default()
}

/// Try to convert a Value to f64
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => s.parse().ok(),
        _ => None,
    }
}

/// Try to convert a Value to i64
pub fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => Some(*f as i64),
        Value::Text(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&Value::Integer(42)), "42");
        assert_eq!(value_to_string(&Value::text("hello")), "hello");
        assert_eq!(value_to_string(&Value::Boolean(true)), "true");
        assert_eq!(value_to_string(&Value::null_unknown()), "");
    }

    #[test]
    fn test_value_to_numbers() {
        assert_eq!(value_to_f64(&Value::Integer(42)), Some(42.0));
        assert_eq!(value_to_f64(&Value::text("2.5")), Some(2.5));
        assert_eq!(value_to_i64(&Value::Float(3.7)), Some(3));
        assert_eq!(value_to_i64(&Value::null_unknown()), None);
    }
}
