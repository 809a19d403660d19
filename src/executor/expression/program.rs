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

// Compiled Expression Program
//
// A Program is the compiled form of a ValueExpr. It contains:
// - A sequence of operations (the "bytecode")
// - Static storage holding the encoded literals
// - Two entry points: `method_call` (always 0) and, when the expression
//   contains an aggregate, `method_accumulate`
// - The aggregate binding needed to manage per-group instance memory

use std::sync::Arc;

use super::ops::Op;
use crate::core::{decode_value, encode_value, DataType, Error, Result, Value};
use crate::functions::AggregateFunction;

/// Append-only byte arena holding a program's literals
#[derive(Debug, Clone, Default)]
pub struct StaticStorage {
    bytes: Vec<u8>,
}

impl StaticStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `value` at the end of the arena and return its offset
    pub fn push(&mut self, value: &Value) -> usize {
        let offset = self.bytes.len();
        encode_value(value, &mut self.bytes);
        offset
    }

    /// Decode the value stored at `offset`
    pub fn read(&self, offset: usize) -> Result<Value> {
        let data = self
            .bytes
            .get(offset..)
            .ok_or_else(|| Error::internal(format!("literal offset {} out of range", offset)))?;
        decode_value(data).map(|(value, _)| value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The aggregate a program accumulates into
#[derive(Clone)]
pub struct AggregateBinding {
    pub func: Arc<dyn AggregateFunction>,
    pub instance_size: usize,
}

impl std::fmt::Debug for AggregateBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateBinding")
            .field("func", &self.func.name())
            .field("instance_size", &self.instance_size)
            .finish()
    }
}

/// Compiled expression program
///
/// Immutable once built and free of per-evaluation state, so one program
/// can be shared by any number of evaluators and groups.
#[derive(Clone)]
pub struct Program {
    /// The operation sequence
    ops: Vec<Op>,

    /// Encoded literals
    static_storage: StaticStorage,

    /// Declared result type
    return_type: DataType,

    /// Entry of the aggregate update block
    method_accumulate: Option<usize>,

    /// Present iff the expression contains an aggregate call
    aggregate: Option<AggregateBinding>,

    /// Maximum stack depth needed (for pre-allocation)
    max_stack_depth: usize,
}

impl Program {
    /// Entry point of the root expression
    pub const METHOD_CALL: usize = 0;

    fn new(
        ops: Vec<Op>,
        static_storage: StaticStorage,
        return_type: DataType,
        method_accumulate: Option<usize>,
        aggregate: Option<AggregateBinding>,
    ) -> Self {
        let max_stack_depth = Self::compute_stack_depth(&ops);
        Self {
            ops,
            static_storage,
            return_type,
            method_accumulate,
            aggregate,
            max_stack_depth,
        }
    }

    /// Get the operations
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    #[inline]
    pub fn static_storage(&self) -> &StaticStorage {
        &self.static_storage
    }

    #[inline]
    pub fn return_type(&self) -> DataType {
        self.return_type
    }

    #[inline]
    pub fn method_call(&self) -> usize {
        Self::METHOD_CALL
    }

    #[inline]
    pub fn method_accumulate(&self) -> Option<usize> {
        self.method_accumulate
    }

    #[inline]
    pub fn aggregate(&self) -> Option<&AggregateBinding> {
        self.aggregate.as_ref()
    }

    #[inline]
    pub fn has_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    /// Bytes of instance memory one group needs, zero without an aggregate
    #[inline]
    pub fn instance_size(&self) -> usize {
        self.aggregate.as_ref().map_or(0, |a| a.instance_size)
    }

    /// Get the maximum stack depth needed
    #[inline]
    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Get the number of operations
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if program is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    // =========================================================================
    // Instance lifecycle
    // =========================================================================

    /// Check that caller-supplied instance memory fits the bound aggregate
    pub fn check_instance(&self, instance: &[u8]) -> Result<()> {
        match &self.aggregate {
            Some(agg) if instance.len() != agg.instance_size => {
                Err(Error::invalid_argument(format!(
                    "instance memory of {} bytes, {} expects {}",
                    instance.len(),
                    agg.func.name(),
                    agg.instance_size
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn init_instance(&self, instance: &mut [u8]) -> Result<()> {
        if let Some(agg) = &self.aggregate {
            self.check_instance(instance)?;
            agg.func.init(instance);
        }
        Ok(())
    }

    pub fn reset_instance(&self, instance: &mut [u8]) -> Result<()> {
        if let Some(agg) = &self.aggregate {
            self.check_instance(instance)?;
            agg.func.reset(instance);
        }
        Ok(())
    }

    pub fn free_instance(&self, instance: &mut [u8]) -> Result<()> {
        if let Some(agg) = &self.aggregate {
            self.check_instance(instance)?;
            agg.func.free(instance);
        }
        Ok(())
    }

    /// Fold `other` into `instance`
    pub fn merge_instance(&self, instance: &mut [u8], other: &[u8]) -> Result<()> {
        match &self.aggregate {
            Some(agg) => {
                self.check_instance(instance)?;
                self.check_instance(other)?;
                agg.func.merge(instance, other)
            }
            None => Ok(()),
        }
    }

    pub fn save_instance(&self, instance: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if let Some(agg) = &self.aggregate {
            self.check_instance(instance)?;
            agg.func.save_state(instance, out);
        }
        Ok(())
    }

    pub fn load_instance(&self, instance: &mut [u8], data: &[u8]) -> Result<()> {
        match &self.aggregate {
            Some(agg) => {
                self.check_instance(instance)?;
                agg.func.load_state(instance, data)
            }
            None => Err(Error::InvalidState(
                "program has no aggregate state to load".to_string(),
            )),
        }
    }

    /// Compute the maximum stack depth needed for a sequence of operations
    ///
    /// Straight-line sum over both branches of every IF, so it never
    /// underestimates.
    fn compute_stack_depth(ops: &[Op]) -> usize {
        let mut depth: isize = 0;
        let mut max_depth: isize = 0;

        for op in ops {
            depth += op.stack_effect();
            max_depth = max_depth.max(depth);
            if matches!(op, Op::Return) {
                depth = 0;
            }
        }

        (max_depth as usize).max(1)
    }

    /// Disassemble the program for debugging
    pub fn disassemble(&self) -> String {
        let mut result = String::new();
        for (i, op) in self.ops.iter().enumerate() {
            if Some(i) == self.method_accumulate {
                result.push_str("accumulate:\n");
            } else if i == Self::METHOD_CALL {
                result.push_str("call:\n");
            }
            match op {
                Op::Literal { offset, .. } => {
                    let value = self
                        .static_storage
                        .read(*offset)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|e| e.to_string());
                    result.push_str(&format!("{:04}: {:?} ; {}\n", i, op, value));
                }
                _ => result.push_str(&format!("{:04}: {:?}\n", i, op)),
            }
        }
        result
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("ops", &self.ops)
            .field("static_storage_len", &self.static_storage.len())
            .field("return_type", &self.return_type)
            .field("method_accumulate", &self.method_accumulate)
            .field("aggregate", &self.aggregate)
            .finish()
    }
}

/// Builder for constructing programs
pub struct ProgramBuilder {
    ops: Vec<Op>,
    static_storage: StaticStorage,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            ops: Vec::with_capacity(32),
            static_storage: StaticStorage::new(),
        }
    }

    /// Emit an operation, returning its position
    #[inline]
    pub fn emit(&mut self, op: Op) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    /// Get current position (for jump targets)
    #[inline]
    pub fn position(&self) -> usize {
        self.ops.len()
    }

    /// Store a literal, returning its static storage offset
    pub fn add_literal(&mut self, value: &Value) -> usize {
        self.static_storage.push(value)
    }

    /// Patch a jump target at a specific position
    pub fn patch_jump(&mut self, pos: usize, target: usize) {
        if let Some(Op::CJump(t) | Op::Jump(t)) = self.ops.get_mut(pos) {
            *t = target;
        }
    }

    /// Build the final program
    pub fn build(
        self,
        return_type: DataType,
        method_accumulate: Option<usize>,
        aggregate: Option<AggregateBinding>,
    ) -> Program {
        Program::new(
            self.ops,
            self.static_storage,
            return_type,
            method_accumulate,
            aggregate,
        )
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
