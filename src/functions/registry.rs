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

//! Function Registry
//!
//! Maps symbols to [`FunctionDescriptor`]s. Registration happens up front;
//! compilers only ever see `&FunctionRegistry`, so lookups need no locking.

use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use super::aggregate::{CountFunction, MaxFunction, MeanFunction, MinFunction, SumFunction};
use super::scalar::{
    AbsFunction, AddFunction, CoalesceFunction, ConcatFunction, DivFunction, EqFunction,
    GtFunction, GteFunction, LengthFunction, LogicalAndFunction, LogicalNotFunction,
    LogicalOrFunction, LowerFunction, LtFunction, LteFunction, ModFunction, MulFunction,
    NegFunction, NeqFunction, RoundFunction, SubFunction, UpperFunction,
};
use super::{AggregateFunction, FunctionSignature, FunctionType, ScalarFunction};

/// Global function registry instance
static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the global function registry with every built-in registered
#[inline]
pub fn global_registry() -> &'static FunctionRegistry {
    GLOBAL_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// The callable behind a symbol
#[derive(Clone)]
pub enum FunctionKind {
    /// Stateless function of its arguments
    Pure(Arc<dyn ScalarFunction>),
    /// Function folding rows into per-group state
    Aggregate(Arc<dyn AggregateFunction>),
}

/// Registry entry for one symbol
#[derive(Clone)]
pub struct FunctionDescriptor {
    /// Registered symbol, upper case
    pub name: String,
    /// Callable and lifecycle
    pub kind: FunctionKind,
    /// Arity and result type
    pub signature: FunctionSignature,
}

impl FunctionDescriptor {
    /// PURE or AGGREGATE
    pub fn function_type(&self) -> FunctionType {
        match self.kind {
            FunctionKind::Pure(_) => FunctionType::Pure,
            FunctionKind::Aggregate(_) => FunctionType::Aggregate,
        }
    }

    /// Bytes of per-group state, zero for pure functions
    pub fn instance_size(&self) -> usize {
        match &self.kind {
            FunctionKind::Pure(_) => 0,
            FunctionKind::Aggregate(f) => f.instance_size(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, FunctionKind::Aggregate(_))
    }
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("type", &self.function_type())
            .field("instance_size", &self.instance_size())
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: FxHashMap<String, FunctionDescriptor>,
}

impl FunctionRegistry {
    /// Create a registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: FxHashMap::default(),
        }
    }

    fn register_builtins(&mut self) {
        // Operators
        self.register_pure::<AddFunction>();
        self.register_pure::<SubFunction>();
        self.register_pure::<MulFunction>();
        self.register_pure::<DivFunction>();
        self.register_pure::<ModFunction>();
        self.register_pure::<NegFunction>();
        self.register_pure::<EqFunction>();
        self.register_pure::<NeqFunction>();
        self.register_pure::<LtFunction>();
        self.register_pure::<LteFunction>();
        self.register_pure::<GtFunction>();
        self.register_pure::<GteFunction>();
        self.register_pure::<LogicalAndFunction>();
        self.register_pure::<LogicalOrFunction>();
        self.register_pure::<LogicalNotFunction>();

        // Scalar functions
        self.register_pure::<AbsFunction>();
        self.register_pure::<RoundFunction>();
        self.register_pure::<UpperFunction>();
        self.register_pure::<LowerFunction>();
        self.register_pure::<LengthFunction>();
        self.register_pure::<ConcatFunction>();
        self.register_pure::<CoalesceFunction>();

        // Aggregates
        self.register_aggregate::<CountFunction>();
        self.register_aggregate::<SumFunction>();
        self.register_aggregate::<MinFunction>();
        self.register_aggregate::<MaxFunction>();
        self.register_aggregate::<MeanFunction>();
        self.register_alias("AVG", "MEAN");
    }

    /// Register a pure function under its own name
    pub fn register_pure<F: ScalarFunction + Default + 'static>(&mut self) {
        self.register_pure_arc(Arc::new(F::default()));
    }

    /// Register an already constructed pure function
    pub fn register_pure_arc(&mut self, func: Arc<dyn ScalarFunction>) {
        let name = func.name().to_uppercase();
        let signature = func.info().signature;
        self.functions.insert(
            name.clone(),
            FunctionDescriptor {
                name,
                kind: FunctionKind::Pure(func),
                signature,
            },
        );
    }

    /// Register an aggregate function under its own name
    pub fn register_aggregate<F: AggregateFunction + Default + 'static>(&mut self) {
        self.register_aggregate_arc(Arc::new(F::default()));
    }

    /// Register an already constructed aggregate function
    pub fn register_aggregate_arc(&mut self, func: Arc<dyn AggregateFunction>) {
        let name = func.name().to_uppercase();
        let signature = func.info().signature;
        self.functions.insert(
            name.clone(),
            FunctionDescriptor {
                name,
                kind: FunctionKind::Aggregate(func),
                signature,
            },
        );
    }

    /// Make `alias` resolve to the function registered as `target`
    pub fn register_alias(&mut self, alias: &str, target: &str) {
        if let Some(descriptor) = self.functions.get(&target.to_uppercase()).cloned() {
            self.functions.insert(alias.to_uppercase(), descriptor);
        }
    }

    /// Look up a symbol, case-insensitively
    pub fn lookup(&self, symbol: &str) -> Option<&FunctionDescriptor> {
        if let Some(descriptor) = self.functions.get(symbol) {
            return Some(descriptor);
        }
        self.functions.get(&symbol.to_uppercase())
    }

    /// Check if a symbol is registered
    pub fn exists(&self, symbol: &str) -> bool {
        self.lookup(symbol).is_some()
    }

    /// Check if a symbol names an aggregate
    pub fn is_aggregate(&self, symbol: &str) -> bool {
        self.lookup(symbol)
            .map(FunctionDescriptor::is_aggregate)
            .unwrap_or(false)
    }

    /// Registered symbols, sorted
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
