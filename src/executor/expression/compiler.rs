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

// Expression Compiler
//
// Lowers a ValueExpr tree into a linear Program.
//
// Layout of a compiled program:
//
//   0:  <root expression>          ; method_call
//       RETURN
//   N:  <aggregate arguments>      ; method_accumulate (only with an aggregate)
//       CALL_INSTANCE accumulate
//       RETURN
//
// Inside the root block an aggregate call is just CALL_INSTANCE get: its
// arguments are only ever evaluated by the accumulate block.

use tracing::instrument;

use super::ops::{InstanceMethod, Op};
use super::program::{AggregateBinding, Program, ProgramBuilder};
use crate::core::{DataType, Error, Result};
use crate::functions::{global_registry, FunctionDescriptor, FunctionKind, FunctionRegistry};
use crate::plan::ValueExpr;

/// Expression compiler
pub struct ExprCompiler<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> ExprCompiler<'a> {
    /// Create a compiler resolving symbols through `functions`
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }

    /// Compile an expression into a program
    ///
    /// # Panics
    ///
    /// Panics if a column reference has no resolved input index. Binding
    /// columns is the caller's job and must happen before compilation.
    #[instrument(name = "expression::compile", level = "trace", skip_all, fields(expr = %expr))]
    pub fn compile(&self, expr: &ValueExpr) -> Result<Program> {
        let mut builder = ProgramBuilder::new();
        self.compile_expr(expr, &mut builder)?;
        builder.emit(Op::Return);

        let return_type = self.infer_type(expr);

        let aggregates = self.find_aggregate_calls(expr);
        if aggregates.len() > 1 {
            return Err(Error::NotSupported(format!(
                "expression contains {} aggregate calls, at most one is allowed",
                aggregates.len()
            )));
        }

        let Some(aggregate_call) = aggregates.first() else {
            return Ok(builder.build(return_type, None, None));
        };

        let ValueExpr::Call { symbol, arguments } = aggregate_call else {
            return Err(Error::internal("aggregate search returned a non-call node"));
        };
        let descriptor = self.lookup(symbol)?;
        let FunctionKind::Aggregate(func) = &descriptor.kind else {
            return Err(Error::internal(format!("{} is not an aggregate", symbol)));
        };
        descriptor
            .signature
            .validate_arg_count(arguments.len())
            .map_err(|e| Error::invalid_argument(format!("{}: {}", descriptor.name, e)))?;

        let binding = AggregateBinding {
            func: func.clone(),
            instance_size: func.instance_size(),
        };

        let method_accumulate = builder.position();
        for arg in arguments {
            self.compile_expr(arg, &mut builder)?;
        }
        builder.emit(Op::CallInstance {
            func: func.clone(),
            method: InstanceMethod::Accumulate {
                arg_count: arguments.len(),
            },
        });
        builder.emit(Op::Return);

        Ok(builder.build(return_type, Some(method_accumulate), Some(binding)))
    }

    /// Compile an expression, emitting ops to the builder
    fn compile_expr(&self, expr: &ValueExpr, builder: &mut ProgramBuilder) -> Result<()> {
        match expr {
            ValueExpr::ColumnReference {
                column,
                index,
                data_type,
            } => {
                let Some(index) = index else {
                    panic!("column reference '{}' has no resolved input index", column);
                };
                builder.emit(Op::Input {
                    index: *index,
                    data_type: *data_type,
                });
            }

            ValueExpr::Literal { value } => {
                let offset = builder.add_literal(value);
                builder.emit(Op::Literal {
                    offset,
                    data_type: value.data_type(),
                });
            }

            ValueExpr::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.compile_expr(condition, builder)?;
                let cjump = builder.emit(Op::CJump(0));

                self.compile_expr(false_branch, builder)?;
                // Land just past the JUMP emitted next
                builder.patch_jump(cjump, builder.position() + 1);
                let jump = builder.emit(Op::Jump(0));

                self.compile_expr(true_branch, builder)?;
                builder.patch_jump(jump, builder.position());
            }

            ValueExpr::Call { symbol, arguments } => {
                let descriptor = self.lookup(symbol)?;
                match &descriptor.kind {
                    FunctionKind::Pure(func) => {
                        descriptor
                            .signature
                            .validate_arg_count(arguments.len())
                            .map_err(|e| {
                                Error::invalid_argument(format!("{}: {}", descriptor.name, e))
                            })?;
                        for arg in arguments {
                            self.compile_expr(arg, builder)?;
                        }
                        builder.emit(Op::CallPure {
                            func: func.clone(),
                            arg_count: arguments.len(),
                        });
                    }
                    FunctionKind::Aggregate(func) => {
                        builder.emit(Op::CallInstance {
                            func: func.clone(),
                            method: InstanceMethod::Get,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, symbol: &str) -> Result<&'a FunctionDescriptor> {
        self.functions
            .lookup(symbol)
            .ok_or_else(|| Error::SymbolNotFound(symbol.to_string()))
    }

    /// Every call node whose symbol names an aggregate
    fn find_aggregate_calls<'e>(&self, expr: &'e ValueExpr) -> Vec<&'e ValueExpr> {
        let mut found = Vec::new();
        expr.walk(&mut |node| {
            if let ValueExpr::Call { symbol, .. } = node {
                if self.functions.is_aggregate(symbol) {
                    found.push(node);
                }
            }
        });
        found
    }

    /// Best-effort static result type
    fn infer_type(&self, expr: &ValueExpr) -> DataType {
        match expr {
            ValueExpr::ColumnReference { data_type, .. } => *data_type,
            ValueExpr::Literal { value } => value.data_type(),
            ValueExpr::If {
                true_branch,
                false_branch,
                ..
            } => match self.infer_type(true_branch) {
                DataType::Null => self.infer_type(false_branch),
                dt => dt,
            },
            ValueExpr::Call { symbol, arguments } => {
                let declared = self
                    .functions
                    .lookup(symbol)
                    .map(|d| d.signature.return_type.to_data_type())
                    .unwrap_or(DataType::Null);
                match declared {
                    DataType::Null => arguments
                        .iter()
                        .map(|a| self.infer_type(a))
                        .find(|dt| *dt != DataType::Null)
                        .unwrap_or(DataType::Null),
                    dt => dt,
                }
            }
        }
    }
}

impl Default for ExprCompiler<'static> {
    fn default() -> Self {
        Self::new(global_registry())
    }
}

/// Compile with the global function registry
pub fn compile_expression(expr: &ValueExpr) -> Result<Program> {
    ExprCompiler::default().compile(expr)
}
