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

//! Function System
//!
//! - [`ScalarFunction`] - Pure functions, including the SQL operators
//! - [`AggregateFunction`] - Aggregates operating on caller-owned state bytes
//! - [`FunctionRegistry`] - Symbol lookup used by the expression compiler
//!
//! Aggregates never own their state. The scan allocates `instance_size()`
//! bytes per group and hands them to every lifecycle call, so a single
//! function object serves any number of groups.

pub mod aggregate;
pub mod registry;
pub mod scalar;

use crate::core::{DataType, Error, Result, Value};

/// Function type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionType {
    /// Aggregate function (folds many rows into state)
    Aggregate,
    /// Pure function (operates on a single row)
    Pure,
}

/// Data type for function signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionDataType {
    /// Any type
    Any,
    /// Integer type
    Integer,
    /// Float type
    Float,
    /// String type
    String,
    /// Boolean type
    Boolean,
    /// Timestamp type
    Timestamp,
}

impl FunctionDataType {
    /// Result type tag a program built around this function declares
    pub fn to_data_type(self) -> DataType {
        match self {
            FunctionDataType::Any => DataType::Null,
            FunctionDataType::Integer => DataType::Integer,
            FunctionDataType::Float => DataType::Float,
            FunctionDataType::String => DataType::Text,
            FunctionDataType::Boolean => DataType::Boolean,
            FunctionDataType::Timestamp => DataType::Timestamp,
        }
    }
}

/// Function signature information
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Return type
    pub return_type: FunctionDataType,
    /// Argument types
    pub argument_types: Vec<FunctionDataType>,
    /// Minimum number of arguments
    pub min_args: usize,
    /// Maximum number of arguments
    pub max_args: usize,
    /// Whether the function is variadic
    pub is_variadic: bool,
}

impl FunctionSignature {
    /// Create a new function signature
    pub fn new(
        return_type: FunctionDataType,
        argument_types: Vec<FunctionDataType>,
        min_args: usize,
        max_args: usize,
    ) -> Self {
        Self {
            return_type,
            argument_types,
            min_args,
            max_args,
            is_variadic: false,
        }
    }

    /// Create a variadic function signature
    pub fn variadic(return_type: FunctionDataType, arg_type: FunctionDataType) -> Self {
        Self {
            return_type,
            argument_types: vec![arg_type],
            min_args: 1,
            max_args: usize::MAX,
            is_variadic: true,
        }
    }

    /// Validate argument count
    pub fn validate_arg_count(&self, count: usize) -> Result<()> {
        if count < self.min_args {
            return Err(Error::invalid_argument(format!(
                "expected at least {} arguments, got {}",
                self.min_args, count
            )));
        }
        if count > self.max_args {
            return Err(Error::invalid_argument(format!(
                "expected at most {} arguments, got {}",
                self.max_args, count
            )));
        }
        Ok(())
    }
}

/// Function information
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Function name
    pub name: String,
    /// Function type
    pub function_type: FunctionType,
    /// Description
    pub description: String,
    /// Signature
    pub signature: FunctionSignature,
}

impl FunctionInfo {
    /// Create a new function info
    pub fn new(
        name: impl Into<String>,
        function_type: FunctionType,
        description: impl Into<String>,
        signature: FunctionSignature,
    ) -> Self {
        Self {
            name: name.into(),
            function_type,
            description: description.into(),
            signature,
        }
    }

    /// Get the function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the signature
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }
}

/// Trait for pure functions
pub trait ScalarFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get function information
    fn info(&self) -> FunctionInfo;

    /// Evaluate the function with the given arguments
    fn evaluate(&self, args: &[Value]) -> Result<Value>;
}

/// Trait for aggregate functions
///
/// Every method receives the group's state as a byte slice of exactly
/// `instance_size()` bytes. `init` must be called before any other method
/// touches a fresh slice.
pub trait AggregateFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get function information
    fn info(&self) -> FunctionInfo;

    /// Bytes of state one group needs
    fn instance_size(&self) -> usize;

    /// Write the initial state
    fn init(&self, state: &mut [u8]);

    /// Fold one row's arguments into the state
    fn accumulate(&self, state: &mut [u8], args: &[Value]) -> Result<()>;

    /// Current visible value of the state
    fn get(&self, state: &[u8]) -> Value;

    /// Combine `other` into `state`
    fn merge(&self, state: &mut [u8], other: &[u8]) -> Result<()>;

    /// Return the state to its initial value
    fn reset(&self, state: &mut [u8]) {
        self.init(state);
    }

    /// Release anything the state owns
    fn free(&self, _state: &mut [u8]) {}

    /// Append a checkpoint of the state to `out`
    fn save_state(&self, state: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(state);
    }

    /// Restore the state from a checkpoint produced by `save_state`
    fn load_state(&self, state: &mut [u8], data: &[u8]) -> Result<()> {
        if data.len() != self.instance_size() {
            return Err(Error::invalid_argument(format!(
                "{} state checkpoint must be {} bytes, got {}",
                self.name(),
                self.instance_size(),
                data.len()
            )));
        }
        state.copy_from_slice(data);
        Ok(())
    }
}

// Re-export main types
pub use aggregate::{CountFunction, MaxFunction, MeanFunction, MinFunction, SumFunction};
pub use registry::{global_registry, FunctionDescriptor, FunctionKind, FunctionRegistry};
pub use scalar::{
    AbsFunction, AddFunction, CoalesceFunction, ConcatFunction, DivFunction, EqFunction,
    GtFunction, GteFunction, LengthFunction, LogicalAndFunction, LogicalNotFunction,
    LogicalOrFunction, LowerFunction, LtFunction, LteFunction, ModFunction, MulFunction,
    NegFunction, NeqFunction, RoundFunction, SubFunction, UpperFunction,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_signature_validation() {
        let sig =
            FunctionSignature::new(FunctionDataType::Integer, vec![FunctionDataType::Any], 1, 1);
        assert!(sig.validate_arg_count(1).is_ok());
        assert!(sig.validate_arg_count(0).is_err());
        assert!(sig.validate_arg_count(2).is_err());
    }

    #[test]
    fn test_variadic_signature() {
        let sig = FunctionSignature::variadic(FunctionDataType::String, FunctionDataType::Any);
        assert!(sig.validate_arg_count(1).is_ok());
        assert!(sig.validate_arg_count(64).is_ok());
        assert!(sig.validate_arg_count(0).is_err());
    }

    #[test]
    fn test_default_load_state_checks_length() {
        let count = CountFunction;
        let mut state = vec![0u8; count.instance_size()];
        count.init(&mut state);
        assert!(count.load_state(&mut state, &[1, 2, 3]).is_err());
    }
}
