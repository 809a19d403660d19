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

// Compiled Expression Operations
//
// The instruction set of the expression VM. Operands are resolved at
// compile time: input slots, static storage offsets, jump targets and the
// callables themselves.

use std::sync::Arc;

use crate::core::DataType;
use crate::functions::{AggregateFunction, ScalarFunction};

/// Aggregate lifecycle method invoked by [`Op::CallInstance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceMethod {
    /// Push the instance's current value
    Get,
    /// Pop `arg_count` arguments and fold them into the instance
    Accumulate { arg_count: usize },
}

/// A single VM operation
#[derive(Clone)]
pub enum Op {
    /// Push the value in input slot `index`
    Input { index: usize, data_type: DataType },

    /// Push the literal encoded at `offset` in static storage
    Literal { offset: usize, data_type: DataType },

    /// Pop a condition; jump to the target when it is true
    CJump(usize),

    /// Unconditional jump
    Jump(usize),

    /// Pop `arg_count` arguments, push the function's result
    CallPure {
        func: Arc<dyn ScalarFunction>,
        arg_count: usize,
    },

    /// Invoke an aggregate lifecycle method on the caller's instance
    CallInstance {
        func: Arc<dyn AggregateFunction>,
        method: InstanceMethod,
    },

    /// Stop; the top of stack (or NULL) is the result
    Return,
}

impl Op {
    /// Stack depth change caused by this operation
    pub fn stack_effect(&self) -> isize {
        match self {
            Op::Input { .. } | Op::Literal { .. } => 1,
            Op::CJump(_) => -1,
            Op::Jump(_) | Op::Return => 0,
            Op::CallPure { arg_count, .. } => 1 - *arg_count as isize,
            Op::CallInstance { method, .. } => match method {
                InstanceMethod::Get => 1,
                InstanceMethod::Accumulate { arg_count } => -(*arg_count as isize),
            },
        }
    }

    /// Jump target, for control-flow operations
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Op::CJump(t) | Op::Jump(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Input { index, data_type } => write!(f, "INPUT({}, {})", index, data_type),
            Op::Literal { offset, data_type } => write!(f, "LITERAL(@{}, {})", offset, data_type),
            Op::CJump(target) => write!(f, "CJUMP({})", target),
            Op::Jump(target) => write!(f, "JUMP({})", target),
            Op::CallPure { func, arg_count } => {
                write!(f, "CALL_PURE({}, {})", func.name(), arg_count)
            }
            Op::CallInstance { func, method } => match method {
                InstanceMethod::Get => write!(f, "CALL_INSTANCE({}.get)", func.name()),
                InstanceMethod::Accumulate { arg_count } => {
                    write!(f, "CALL_INSTANCE({}.accumulate, {})", func.name(), arg_count)
                }
            },
            Op::Return => write!(f, "RETURN"),
        }
    }
}
