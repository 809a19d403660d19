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

// Expression Virtual Machine
//
// The VM executes compiled Programs against an input row.
// Design goals:
// - Linear instruction dispatch, no recursion
// - Reusable across rows (stack is cleared on entry)
// - Programs stay immutable; all mutable aggregate state is the caller's
//   instance memory

use smallvec::SmallVec;

use super::ops::{InstanceMethod, Op};
use super::program::Program;
use crate::core::{DataType, Error, Result, Value};

/// Stack capacity for inline storage
const STACK_INLINE_CAPACITY: usize = 16;

/// Instance memory handed to one execution
enum Instance<'i> {
    Absent,
    Shared(&'i [u8]),
    Exclusive(&'i mut [u8]),
}

impl Instance<'_> {
    fn read(&self) -> Result<&[u8]> {
        match self {
            Instance::Absent => Err(Error::MissingInstance),
            Instance::Shared(bytes) => Ok(*bytes),
            Instance::Exclusive(bytes) => Ok(&**bytes),
        }
    }

    fn write(&mut self) -> Result<&mut [u8]> {
        match self {
            Instance::Absent => Err(Error::MissingInstance),
            Instance::Shared(_) => Err(Error::InvalidState(
                "aggregate accumulate needs mutable instance memory".to_string(),
            )),
            Instance::Exclusive(bytes) => Ok(&mut **bytes),
        }
    }
}

/// Expression VM
pub struct ExprVM {
    /// Value stack
    stack: SmallVec<[Value; STACK_INLINE_CAPACITY]>,

    /// Reusable argument buffer for function calls
    args_buffer: Vec<Value>,
}

impl ExprVM {
    pub fn new() -> Self {
        Self {
            stack: SmallVec::new(),
            args_buffer: Vec::with_capacity(8),
        }
    }

    /// Evaluate the root expression (`method_call`)
    ///
    /// `instance` is only read, and only needed when the expression
    /// contains an aggregate.
    pub fn call(&mut self, program: &Program, row: &[Value], instance: Option<&[u8]>) -> Result<Value> {
        let instance = match instance {
            Some(bytes) => {
                program.check_instance(bytes)?;
                Instance::Shared(bytes)
            }
            None => Instance::Absent,
        };
        self.execute(program, program.method_call(), row, instance)
    }

    /// Fold the row into `instance` through `method_accumulate`
    pub fn accumulate(&mut self, program: &Program, row: &[Value], instance: &mut [u8]) -> Result<()> {
        let entry = program.method_accumulate().ok_or_else(|| {
            Error::InvalidState("program has no accumulate entry point".to_string())
        })?;
        program.check_instance(instance)?;
        self.execute(program, entry, row, Instance::Exclusive(instance))
            .map(|_| ())
    }

    fn execute(
        &mut self,
        program: &Program,
        entry: usize,
        row: &[Value],
        mut instance: Instance<'_>,
    ) -> Result<Value> {
        if self.stack.capacity() < program.max_stack_depth() {
            self.stack
                .reserve(program.max_stack_depth() - self.stack.capacity());
        }
        self.stack.clear();

        let ops = program.ops();
        let mut pc = entry;

        while pc < ops.len() {
            match &ops[pc] {
                Op::Input { index, data_type } => {
                    let value = row.get(*index).ok_or_else(|| {
                        Error::expression_evaluation(format!(
                            "input slot {} out of range for a row of {} values",
                            index,
                            row.len()
                        ))
                    })?;
                    let value = match value {
                        Value::Null(_) => Value::Null(*data_type),
                        v => v.clone(),
                    };
                    self.stack.push(value);
                    pc += 1;
                }

                Op::Literal { offset, .. } => {
                    let value = program.static_storage().read(*offset)?;
                    self.stack.push(value);
                    pc += 1;
                }

                Op::CJump(target) => {
                    let condition = self.pop()?;
                    if Self::to_bool(&condition)? {
                        pc = *target;
                    } else {
                        pc += 1;
                    }
                }

                Op::Jump(target) => {
                    pc = *target;
                }

                Op::CallPure { func, arg_count } => {
                    let start = self.stack_start(*arg_count)?;
                    self.args_buffer.clear();
                    self.args_buffer.extend(self.stack.drain(start..));

                    let result = func.evaluate(&self.args_buffer)?;
                    self.stack.push(result);
                    pc += 1;
                }

                Op::CallInstance { func, method } => {
                    match method {
                        InstanceMethod::Get => {
                            let value = func.get(instance.read()?);
                            self.stack.push(value);
                        }
                        InstanceMethod::Accumulate { arg_count } => {
                            let start = self.stack_start(*arg_count)?;
                            self.args_buffer.clear();
                            self.args_buffer.extend(self.stack.drain(start..));
                            func.accumulate(instance.write()?, &self.args_buffer)?;
                        }
                    }
                    pc += 1;
                }

                Op::Return => break,
            }
        }

        // Return top of stack or NULL
        Ok(self.stack.pop().unwrap_or_else(Value::null_unknown))
    }

    #[inline]
    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::internal("expression stack underflow"))
    }

    /// Stack index of the first of the top `count` values
    #[inline]
    fn stack_start(&self, count: usize) -> Result<usize> {
        self.stack
            .len()
            .checked_sub(count)
            .ok_or_else(|| Error::internal("expression stack underflow"))
    }

    /// Branch condition: NULL is false
    #[inline]
    fn to_bool(v: &Value) -> Result<bool> {
        match v {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Null(_) => Ok(false),
            other => Err(Error::type_conversion(
                other.data_type().to_string(),
                DataType::Boolean.to_string(),
            )),
        }
    }
}

impl Default for ExprVM {
    fn default() -> Self {
        Self::new()
    }
}
