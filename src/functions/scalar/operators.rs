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

//! SQL operators as pure functions
//!
//! NULL propagates through arithmetic and comparisons. The logical
//! connectives follow SQL three-valued logic.

use std::cmp::Ordering;

use crate::core::{DataType, Error, Result, Value};
use crate::functions::{
    FunctionDataType, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};
use crate::validate_arg_count;

#[derive(Clone, Copy)]
enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

fn arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        let dt = if left.data_type() == DataType::Float || right.data_type() == DataType::Float {
            DataType::Float
        } else {
            DataType::Integer
        };
        return Ok(Value::Null(dt));
    }

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Sub => a.checked_sub(b),
                ArithmeticOp::Mul => a.checked_mul(b),
                ArithmeticOp::Div | ArithmeticOp::Mod if b == 0 => {
                    return Err(Error::DivisionByZero)
                }
                ArithmeticOp::Div => a.checked_div(b),
                ArithmeticOp::Mod => a.checked_rem(b),
            };
            result.map(Value::Integer).ok_or_else(|| {
                Error::expression_evaluation(format!(
                    "integer overflow in {} {} {}",
                    a,
                    op.symbol(),
                    b
                ))
            })
        }
        _ => {
            let a = numeric_operand(left, op)?;
            let b = numeric_operand(right, op)?;
            let result = match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Sub => a - b,
                ArithmeticOp::Mul => a * b,
                ArithmeticOp::Div | ArithmeticOp::Mod if b == 0.0 => {
                    return Err(Error::DivisionByZero)
                }
                ArithmeticOp::Div => a / b,
                ArithmeticOp::Mod => a % b,
            };
            Ok(Value::Float(result))
        }
    }
}

fn numeric_operand(value: &Value, op: ArithmeticOp) -> Result<f64> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(Error::Type(format!(
            "operator {} expects numeric operands, got {}",
            op.symbol(),
            other.data_type()
        ))),
    }
}

fn comparison(left: &Value, right: &Value, accept: fn(Ordering) -> bool) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null(DataType::Boolean));
    }
    let ordering = left.compare(right)?;
    Ok(Value::Boolean(accept(ordering)))
}

fn truth(value: &Value, name: &str) -> Result<Option<bool>> {
    match value {
        Value::Null(_) => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Integer(i) => Ok(Some(*i != 0)),
        other => Err(Error::Type(format!(
            "{} expects boolean operands, got {}",
            name,
            other.data_type()
        ))),
    }
}

fn tristate(value: Option<bool>) -> Value {
    match value {
        Some(b) => Value::Boolean(b),
        None => Value::Null(DataType::Boolean),
    }
}

macro_rules! arithmetic_function {
    ($ty:ident, $name:expr, $op:expr, $desc:expr) => {
        #[doc = $desc]
        #[derive(Default)]
        pub struct $ty;

        impl ScalarFunction for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn info(&self) -> FunctionInfo {
                FunctionInfo::new(
                    $name,
                    FunctionType::Pure,
                    $desc,
                    FunctionSignature::new(
                        FunctionDataType::Any,
                        vec![FunctionDataType::Any, FunctionDataType::Any],
                        2,
                        2,
                    ),
                )
            }

            fn evaluate(&self, args: &[Value]) -> Result<Value> {
                validate_arg_count!(args, $name, 2);
                arithmetic($op, &args[0], &args[1])
            }
        }
    };
}

macro_rules! comparison_function {
    ($ty:ident, $name:expr, $accept:expr, $desc:expr) => {
        #[doc = $desc]
        #[derive(Default)]
        pub struct $ty;

        impl ScalarFunction for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn info(&self) -> FunctionInfo {
                FunctionInfo::new(
                    $name,
                    FunctionType::Pure,
                    $desc,
                    FunctionSignature::new(
                        FunctionDataType::Boolean,
                        vec![FunctionDataType::Any, FunctionDataType::Any],
                        2,
                        2,
                    ),
                )
            }

            fn evaluate(&self, args: &[Value]) -> Result<Value> {
                validate_arg_count!(args, $name, 2);
                comparison(&args[0], &args[1], $accept)
            }
        }
    };
}

// ============================================================================
// Arithmetic
// ============================================================================

arithmetic_function!(AddFunction, "ADD", ArithmeticOp::Add, "Adds two numbers");
arithmetic_function!(SubFunction, "SUB", ArithmeticOp::Sub, "Subtracts two numbers");
arithmetic_function!(MulFunction, "MUL", ArithmeticOp::Mul, "Multiplies two numbers");
arithmetic_function!(DivFunction, "DIV", ArithmeticOp::Div, "Divides two numbers");
arithmetic_function!(ModFunction, "MOD", ArithmeticOp::Mod, "Remainder of a division");

/// NEG function - arithmetic negation
#[derive(Default)]
pub struct NegFunction;

impl ScalarFunction for NegFunction {
    fn name(&self) -> &str {
        "NEG"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "NEG",
            FunctionType::Pure,
            "Arithmetic negation",
            FunctionSignature::new(FunctionDataType::Any, vec![FunctionDataType::Any], 1, 1),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "NEG", 1);

        match &args[0] {
            Value::Null(dt) => Ok(Value::Null(*dt)),
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| Error::expression_evaluation("integer overflow in negation")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(Error::Type(format!(
                "NEG expects a numeric operand, got {}",
                other.data_type()
            ))),
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

comparison_function!(EqFunction, "EQ", |o| o == Ordering::Equal, "Equality test");
comparison_function!(NeqFunction, "NEQ", |o| o != Ordering::Equal, "Inequality test");
comparison_function!(LtFunction, "LT", |o| o == Ordering::Less, "Less-than test");
comparison_function!(LteFunction, "LTE", |o| o != Ordering::Greater, "Less-or-equal test");
comparison_function!(GtFunction, "GT", |o| o == Ordering::Greater, "Greater-than test");
comparison_function!(GteFunction, "GTE", |o| o != Ordering::Less, "Greater-or-equal test");

// ============================================================================
// Logical
// ============================================================================

/// LOGICAL_AND function - three-valued conjunction
#[derive(Default)]
pub struct LogicalAndFunction;

impl ScalarFunction for LogicalAndFunction {
    fn name(&self) -> &str {
        "LOGICAL_AND"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LOGICAL_AND",
            FunctionType::Pure,
            "Logical AND with SQL NULL semantics",
            FunctionSignature::new(
                FunctionDataType::Boolean,
                vec![FunctionDataType::Boolean, FunctionDataType::Boolean],
                2,
                2,
            ),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LOGICAL_AND", 2);

        let result = match (truth(&args[0], "AND")?, truth(&args[1], "AND")?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        };
        Ok(tristate(result))
    }
}

/// LOGICAL_OR function - three-valued disjunction
#[derive(Default)]
pub struct LogicalOrFunction;

impl ScalarFunction for LogicalOrFunction {
    fn name(&self) -> &str {
        "LOGICAL_OR"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LOGICAL_OR",
            FunctionType::Pure,
            "Logical OR with SQL NULL semantics",
            FunctionSignature::new(
                FunctionDataType::Boolean,
                vec![FunctionDataType::Boolean, FunctionDataType::Boolean],
                2,
                2,
            ),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LOGICAL_OR", 2);

        let result = match (truth(&args[0], "OR")?, truth(&args[1], "OR")?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        };
        Ok(tristate(result))
    }
}

/// LOGICAL_NOT function - negation, NULL stays NULL
#[derive(Default)]
pub struct LogicalNotFunction;

impl ScalarFunction for LogicalNotFunction {
    fn name(&self) -> &str {
        "LOGICAL_NOT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LOGICAL_NOT",
            FunctionType::Pure,
            "Logical NOT with SQL NULL semantics",
            FunctionSignature::new(
                FunctionDataType::Boolean,
                vec![FunctionDataType::Boolean],
                1,
                1,
            ),
        )
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LOGICAL_NOT", 1);
        Ok(tristate(truth(&args[0], "NOT")?.map(|b| !b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            AddFunction
                .evaluate(&[Value::Integer(2), Value::Integer(3)])
                .unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            DivFunction
                .evaluate(&[Value::Integer(7), Value::Integer(2)])
                .unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            ModFunction
                .evaluate(&[Value::Integer(7), Value::Integer(4)])
                .unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_float() {
        assert_eq!(
            MulFunction
                .evaluate(&[Value::Integer(2), Value::Float(1.5)])
                .unwrap(),
            Value::Float(3.0)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            DivFunction.evaluate(&[Value::Integer(1), Value::Integer(0)]),
            Err(Error::DivisionByZero)
        );
        assert_eq!(
            DivFunction.evaluate(&[Value::Float(1.0), Value::Float(0.0)]),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let result = AddFunction.evaluate(&[Value::Integer(i64::MAX), Value::Integer(1)]);
        assert!(matches!(
            result,
            Err(Error::ExpressionEvaluationWithMessage { .. })
        ));
    }

    #[test]
    fn test_arithmetic_null_propagation() {
        let r = SubFunction
            .evaluate(&[Value::null_unknown(), Value::Integer(1)])
            .unwrap();
        assert!(r.is_null());
        assert!(AddFunction
            .evaluate(&[Value::text("a"), Value::Integer(1)])
            .is_err());
    }

    #[test]
    fn test_comparisons() {
        let one = Value::Integer(1);
        let two = Value::Float(2.0);
        assert_eq!(
            LtFunction.evaluate(&[one.clone(), two.clone()]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            GteFunction.evaluate(&[one.clone(), two.clone()]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            EqFunction
                .evaluate(&[Value::Integer(2), two.clone()])
                .unwrap(),
            Value::Boolean(true)
        );
        assert!(NeqFunction
            .evaluate(&[Value::null_unknown(), one])
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_three_valued_logic() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        let n = Value::null_unknown();

        assert_eq!(
            LogicalAndFunction.evaluate(&[n.clone(), f.clone()]).unwrap(),
            Value::Boolean(false)
        );
        assert!(LogicalAndFunction
            .evaluate(&[n.clone(), t.clone()])
            .unwrap()
            .is_null());
        assert_eq!(
            LogicalOrFunction.evaluate(&[n.clone(), t.clone()]).unwrap(),
            Value::Boolean(true)
        );
        assert!(LogicalOrFunction
            .evaluate(&[n.clone(), f.clone()])
            .unwrap()
            .is_null());
        assert_eq!(
            LogicalNotFunction.evaluate(&[t]).unwrap(),
            Value::Boolean(false)
        );
        assert!(LogicalNotFunction.evaluate(&[n]).unwrap().is_null());
    }

    #[test]
    fn test_negation() {
        assert_eq!(
            NegFunction.evaluate(&[Value::Integer(4)]).unwrap(),
            Value::Integer(-4)
        );
        assert!(NegFunction.evaluate(&[Value::Integer(i64::MIN)]).is_err());
    }
}
