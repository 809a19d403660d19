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

//! Sequential scan over a striped column table
//!
//! The scan binds every column the select list and where clause reference,
//! compiles each expression once, then reassembles rows from the column
//! streams using their repetition levels:
//!
//! ```text
//! fetch level 0   every column advances            (new record)
//! fetch level n   columns whose next entry repeats
//!                 at depth >= n advance, shallower
//!                 columns keep their current value
//! ```
//!
//! An expression is re-evaluated for a row only when it touches a column
//! at least as deep as the row's select level, so values of shallow fields
//! are held constant (and aggregated once) across the repeated rows of a
//! deeper field.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument, warn};

use super::cache_key::CacheKey;
use super::context::ExecutionContext;
use super::expression::{ExprCompiler, ExprVM, Program};
use super::scratch::{InstanceSlot, ScratchMemory};
use crate::core::{DataType, Error, Result, Value};
use crate::functions::{global_registry, FunctionRegistry};
use crate::plan::{AggregationStrategy, SequentialScanNode, ValueExpr};
use crate::storage::config::ScanConfig;
use crate::storage::cstable::{ColumnReader, CsTableFile, TableReader};

/// Where a scan reads its table from
pub enum TableSource {
    /// A cstable file, opened by `open()`
    File(PathBuf),
    /// An already open table, possibly shared with other scans
    Reader(Arc<dyn TableReader>),
}

/// Lifecycle of a [`CsTableScan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Created,
    Opened,
    Draining,
    Done,
    Failed,
}

/// Extra per-row gate set with [`CsTableScan::set_filter`]
pub type FilterFn = Box<dyn FnMut() -> bool>;

/// A column bound to an input slot
struct ColumnRef {
    name: String,
    reader: Box<dyn ColumnReader>,
    index: usize,
    data_type: DataType,
    max_definition_level: u64,
}

/// A compiled select list entry
struct ExpressionRef {
    rep_level: u64,
    program: Program,
    instance: Option<InstanceSlot>,
}

/// Scan of one cstable
///
/// # Example
///
/// ```ignore
/// let stmt = SequentialScanNode::new("events", vec![SelectListNode::new(ValueExpr::column("url"))]);
/// let mut scan = CsTableScan::from_reader(stmt, table);
/// let ctx = ExecutionContext::new();
/// scan.prepare(&ctx);
/// scan.execute(&ctx, |row| {
///     println!("{}", row[0]);
///     true
/// })?;
/// ```
pub struct CsTableScan<'r> {
    stmt: SequentialScanNode,
    column_names: Vec<String>,
    path: Option<PathBuf>,
    table: Option<Arc<dyn TableReader>>,
    functions: &'r FunctionRegistry,
    config: ScanConfig,

    /// Bound columns, position == input slot
    columns: Vec<ColumnRef>,
    column_index: FxHashMap<String, usize>,
    type_overrides: FxHashMap<String, DataType>,

    select_list: Vec<ExpressionRef>,
    where_expr: Option<Program>,
    scratch: ScratchMemory,
    vm: ExprVM,

    fetch_level: u64,
    rows_scanned: u64,
    cache_key: Option<CacheKey>,
    filter: Option<FilterFn>,
    prepared: bool,
    state: ScanState,
}

impl CsTableScan<'static> {
    /// Scan the cstable file at `path`, opened lazily by `open()`
    pub fn from_file(stmt: SequentialScanNode, path: impl Into<PathBuf>) -> Self {
        Self::new(stmt, TableSource::File(path.into()), global_registry())
    }

    /// Scan an already open table
    pub fn from_reader(stmt: SequentialScanNode, table: Arc<dyn TableReader>) -> Self {
        Self::new(stmt, TableSource::Reader(table), global_registry())
    }
}

impl<'r> CsTableScan<'r> {
    /// Create a scan resolving function symbols through `functions`
    pub fn new(stmt: SequentialScanNode, source: TableSource, functions: &'r FunctionRegistry) -> Self {
        let (path, table) = match source {
            TableSource::File(path) => (Some(path), None),
            TableSource::Reader(table) => (None, Some(table)),
        };
        let column_names = stmt.column_names();
        Self {
            stmt,
            column_names,
            path,
            table,
            functions,
            config: ScanConfig::default(),
            columns: Vec::new(),
            column_index: FxHashMap::default(),
            type_overrides: FxHashMap::default(),
            select_list: Vec::new(),
            where_expr: None,
            scratch: ScratchMemory::new(),
            vm: ExprVM::new(),
            fetch_level: 0,
            rows_scanned: 0,
            cache_key: None,
            filter: None,
            prepared: false,
            state: ScanState::Created,
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Output column names: alias or rendered expression
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn num_columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Rows physically reconstructed so far, delivered or not
    pub fn rows_scanned(&self) -> u64 {
        self.rows_scanned
    }

    /// Register this scan's progress accounting; performs no I/O
    pub fn prepare(&mut self, ctx: &ExecutionContext) {
        if !self.prepared {
            ctx.add_tasks(1);
            self.prepared = true;
        }
    }

    /// Gate every row on `filter` in addition to the where clause
    ///
    /// A filtered scan has no cache key.
    pub fn set_filter(&mut self, filter: impl FnMut() -> bool + 'static) {
        self.filter = Some(Box::new(filter));
    }

    /// Override the type a column's values are coerced to
    pub fn set_column_type(&mut self, column: impl Into<String>, data_type: DataType) -> Result<()> {
        if self.state != ScanState::Created {
            return Err(Error::InvalidState(
                "column types can only be changed before the scan is opened".to_string(),
            ));
        }
        self.type_overrides.insert(column.into(), data_type);
        Ok(())
    }

    pub fn set_cache_key(&mut self, key: CacheKey) {
        self.cache_key = Some(key);
    }

    /// The cache key, unless none was set or a filter function is attached
    pub fn cache_key(&self) -> Option<CacheKey> {
        if self.filter.is_some() {
            return None;
        }
        self.cache_key
    }

    // =========================================================================
    // Open
    // =========================================================================

    /// Open the table, bind columns and compile expressions
    ///
    /// Idempotent. Missing columns and compile errors are reported here,
    /// before any row is produced.
    #[instrument(name = "cstable_scan::open", level = "debug", skip_all, fields(table = %self.stmt.table_name))]
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            ScanState::Created => {}
            ScanState::Failed => {
                return Err(Error::InvalidState("scan failed and cannot be reopened".to_string()))
            }
            _ => return Ok(()),
        }

        match self.open_table().and_then(|_| self.compile_plan()) {
            Ok(()) => {
                self.state = ScanState::Opened;
                debug!(
                    columns = self.columns.len(),
                    expressions = self.select_list.len(),
                    "scan opened"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ScanState::Failed;
                warn!(error = %e, "failed to open scan");
                Err(e)
            }
        }
    }

    fn open_table(&mut self) -> Result<()> {
        if self.table.is_some() {
            return Ok(());
        }
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::internal("scan has neither a table nor a path"))?;
        let file = CsTableFile::open(path, &self.config)?;
        self.table = Some(Arc::new(file));
        Ok(())
    }

    fn compile_plan(&mut self) -> Result<()> {
        let compiler = ExprCompiler::new(self.functions);

        let expressions: Vec<ValueExpr> = self
            .stmt
            .select_list
            .iter()
            .map(|s| s.expression.clone())
            .collect();
        for mut expr in expressions {
            self.resolve_columns(&mut expr)?;
            let rep_level = self.find_max_repetition_level(&expr);
            let program = compiler.compile(&expr)?;
            let instance = if program.has_aggregate() {
                let slot = self.scratch.alloc(program.instance_size());
                program.init_instance(self.scratch.slot_mut(&slot))?;
                Some(slot)
            } else {
                None
            };
            self.select_list.push(ExpressionRef {
                rep_level,
                program,
                instance,
            });
        }

        if let Some(expr) = &self.stmt.where_expression {
            let mut expr = expr.clone();
            self.resolve_columns(&mut expr)?;
            let program = compiler.compile(&expr)?;
            if program.has_aggregate() {
                return Err(Error::NotSupported(
                    "aggregate functions are not allowed in a where clause".to_string(),
                ));
            }
            self.where_expr = Some(program);
        }
        Ok(())
    }

    /// Distinct column names referenced by `expr`, in first-appearance order
    fn find_columns(expr: &ValueExpr) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        expr.walk(&mut |node| {
            if let ValueExpr::ColumnReference { column, .. } = node {
                if seen.insert(column.as_str()) {
                    names.push(column.clone());
                }
            }
        });
        names
    }

    /// Bind every column `expr` references and write the slot index and
    /// type back into its column reference nodes
    fn resolve_columns(&mut self, expr: &mut ValueExpr) -> Result<()> {
        let table = self
            .table
            .clone()
            .ok_or_else(|| Error::InvalidState("scan table is not open".to_string()))?;

        for name in Self::find_columns(expr) {
            if self.column_index.contains_key(&name) {
                continue;
            }
            let reader = table.column_reader(&name)?;
            let data_type = self
                .type_overrides
                .get(&name)
                .copied()
                .unwrap_or_else(|| reader.data_type());
            let index = self.columns.len();
            debug!(
                column = %name,
                index,
                %data_type,
                max_repetition_level = reader.max_repetition_level(),
                "bound column"
            );
            self.column_index.insert(name.clone(), index);
            self.columns.push(ColumnRef {
                name,
                max_definition_level: reader.max_definition_level(),
                reader,
                index,
                data_type,
            });
        }

        let columns = &self.columns;
        let column_index = &self.column_index;
        expr.walk_mut(&mut |node| {
            if let ValueExpr::ColumnReference {
                column,
                index,
                data_type,
            } = node
            {
                if let Some(&i) = column_index.get(column.as_str()) {
                    *index = Some(columns[i].index);
                    *data_type = columns[i].data_type;
                }
            }
        });
        Ok(())
    }

    /// Deepest repetition level among the columns `expr` touches
    fn find_max_repetition_level(&self, expr: &ValueExpr) -> u64 {
        let mut max_level = 0;
        expr.walk(&mut |node| {
            if let ValueExpr::ColumnReference { column, .. } = node {
                if let Some(&i) = self.column_index.get(column.as_str()) {
                    max_level = max_level.max(self.columns[i].reader.max_repetition_level());
                }
            }
        });
        max_level
    }

    // =========================================================================
    // Execute
    // =========================================================================

    /// Run the scan, handing each output row to `emit`
    ///
    /// Returning false from `emit` stops the scan at once. Rows handed out
    /// before an error stay valid.
    #[instrument(name = "cstable_scan::execute", level = "debug", skip_all, fields(table = %self.stmt.table_name))]
    pub fn execute<F>(&mut self, ctx: &ExecutionContext, mut emit: F) -> Result<()>
    where
        F: FnMut(&[Value]) -> bool,
    {
        match self.state {
            ScanState::Created => self.open()?,
            ScanState::Opened => {}
            state => {
                return Err(Error::InvalidState(format!(
                    "cannot execute a scan in state {:?}",
                    state
                )))
            }
        }

        self.state = ScanState::Draining;
        let result = if self.columns.is_empty() {
            self.scan_without_columns(ctx, &mut emit)
        } else {
            self.scan(ctx, &mut emit)
        };

        match result {
            Ok(()) => {
                self.state = ScanState::Done;
                if self.prepared {
                    ctx.complete_task();
                }
                debug!(rows_scanned = self.rows_scanned, "scan finished");
                Ok(())
            }
            Err(e) => {
                self.state = ScanState::Failed;
                warn!(error = %e, rows_scanned = self.rows_scanned, "scan aborted");
                Err(e)
            }
        }
    }

    fn num_records(&self) -> Result<u64> {
        self.table
            .as_ref()
            .map(|t| t.num_records())
            .ok_or_else(|| Error::InvalidState("scan table is not open".to_string()))
    }

    fn scan(&mut self, ctx: &ExecutionContext, emit: &mut dyn FnMut(&[Value]) -> bool) -> Result<()> {
        let total_records = self.num_records()?;
        let check_interval = self.config.cancellation_check_interval.max(1) as u64;
        let strategy = self.stmt.aggregation_strategy;

        let mut in_row = Vec::with_capacity(self.config.initial_row_capacity.max(self.columns.len()));
        in_row.extend(self.columns.iter().map(|c| Value::Null(c.data_type)));
        let mut out_row = vec![Value::null_unknown(); self.select_list.len()];

        let mut num_records = 0u64;
        let mut select_level = 0u64;
        let mut group_dirty = false;
        self.fetch_level = 0;

        loop {
            if self.fetch_level == 0 {
                if num_records == total_records {
                    break;
                }
                num_records += 1;
            }
            if self.rows_scanned % check_interval == 0 {
                ctx.check_cancelled()?;
            }

            self.fetch(&mut in_row)?;
            self.rows_scanned += 1;

            let passed = self.row_passes(&in_row)?;
            if passed {
                self.evaluate_select_list(select_level, &in_row, &mut out_row)?;
                group_dirty = true;
                select_level = self.fetch_level;
            } else {
                select_level = select_level.min(self.fetch_level);
            }

            let emit_now = match strategy {
                AggregationStrategy::NoAggregation => passed,
                AggregationStrategy::AggregateWithinRecord => group_dirty && self.fetch_level == 0,
                AggregationStrategy::AggregateAll => false,
            };
            if emit_now {
                self.finish_group(&in_row, &mut out_row)?;
                group_dirty = false;
                if !emit(&out_row) {
                    return Ok(());
                }
            }
        }

        if strategy == AggregationStrategy::AggregateAll {
            self.finish_group(&in_row, &mut out_row)?;
            emit(&out_row);
        }
        Ok(())
    }

    /// Scan that references no column: one empty input row per record
    fn scan_without_columns(
        &mut self,
        ctx: &ExecutionContext,
        emit: &mut dyn FnMut(&[Value]) -> bool,
    ) -> Result<()> {
        let total_records = self.num_records()?;
        let check_interval = self.config.cancellation_check_interval.max(1) as u64;
        let strategy = self.stmt.aggregation_strategy;
        let mut out_row = vec![Value::null_unknown(); self.select_list.len()];

        for _ in 0..total_records {
            if self.rows_scanned % check_interval == 0 {
                ctx.check_cancelled()?;
            }
            self.rows_scanned += 1;

            if !self.row_passes(&[])? {
                continue;
            }
            self.evaluate_select_list(0, &[], &mut out_row)?;
            if strategy != AggregationStrategy::AggregateAll {
                self.finish_group(&[], &mut out_row)?;
                if !emit(&out_row) {
                    return Ok(());
                }
            }
        }

        if strategy == AggregationStrategy::AggregateAll {
            self.finish_group(&[], &mut out_row)?;
            emit(&out_row);
        }
        Ok(())
    }

    /// Advance every column taking part at the current fetch level by one
    /// entry, then compute the next fetch level
    fn fetch(&mut self, in_row: &mut [Value]) -> Result<()> {
        let fetch_level = self.fetch_level;
        let mut next_level = 0;

        for col in &mut self.columns {
            if col.reader.next_repetition_level() >= fetch_level {
                let entry = col.reader.next()?.ok_or_else(|| {
                    Error::corrupted(col.name.as_str(), "column ended before the last record")
                })?;
                in_row[col.index] = if entry.definition_level < col.max_definition_level
                    || entry.value.is_null()
                {
                    Value::Null(col.data_type)
                } else if entry.value.data_type() == col.data_type {
                    entry.value
                } else {
                    entry.value.into_coerce_to_type(col.data_type)
                };
            }
            next_level = next_level.max(col.reader.next_repetition_level());
        }

        self.fetch_level = next_level;
        Ok(())
    }

    /// Where clause, then the filter function
    fn row_passes(&mut self, in_row: &[Value]) -> Result<bool> {
        if let Some(program) = &self.where_expr {
            let holds = match self.vm.call(program, in_row, None)? {
                Value::Boolean(b) => b,
                Value::Integer(i) => i != 0,
                Value::Null(_) => false,
                other => {
                    return Err(Error::type_conversion(
                        other.data_type().to_string(),
                        DataType::Boolean.to_string(),
                    ))
                }
            };
            if !holds {
                return Ok(false);
            }
        }
        Ok(self.filter.as_mut().map_or(true, |filter| filter()))
    }

    /// Evaluate (or accumulate) every expression at least as deep as
    /// `select_level`
    fn evaluate_select_list(
        &mut self,
        select_level: u64,
        in_row: &[Value],
        out_row: &mut [Value],
    ) -> Result<()> {
        let per_row = self.stmt.aggregation_strategy == AggregationStrategy::NoAggregation;

        for (expr, out) in self.select_list.iter().zip(out_row.iter_mut()) {
            if expr.rep_level < select_level {
                continue;
            }
            match &expr.instance {
                None => *out = self.vm.call(&expr.program, in_row, None)?,
                Some(slot) => {
                    let instance = self.scratch.slot_mut(slot);
                    self.vm.accumulate(&expr.program, in_row, instance)?;
                    if per_row {
                        *out = self.vm.call(&expr.program, in_row, Some(&*instance))?;
                        expr.program.reset_instance(instance)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Read out and reset every aggregate of an aggregating scan
    fn finish_group(&mut self, in_row: &[Value], out_row: &mut [Value]) -> Result<()> {
        if self.stmt.aggregation_strategy == AggregationStrategy::NoAggregation {
            return Ok(());
        }
        for (expr, out) in self.select_list.iter().zip(out_row.iter_mut()) {
            if let Some(slot) = &expr.instance {
                *out = self
                    .vm
                    .call(&expr.program, in_row, Some(self.scratch.slot(slot)))?;
                expr.program.reset_instance(self.scratch.slot_mut(slot))?;
            }
        }
        Ok(())
    }
}

impl Drop for CsTableScan<'_> {
    fn drop(&mut self) {
        for expr in &self.select_list {
            if let Some(slot) = &expr.instance {
                let _ = expr.program.free_instance(self.scratch.slot_mut(slot));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SelectListNode;
    use crate::storage::cstable::MemoryTableBuilder;

    fn nested_table() -> Arc<dyn TableReader> {
        // {id: 1, tags: [x, y]}, {id: 2, tags: []}, {id: 3, tags: [z]}
        Arc::new(
            MemoryTableBuilder::new()
                .flat_column(
                    "id",
                    DataType::Integer,
                    vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
                )
                .repeated_column(
                    "tags",
                    DataType::Text,
                    vec![
                        vec![Value::text("x"), Value::text("y")],
                        vec![],
                        vec![Value::text("z")],
                    ],
                )
                .build()
                .unwrap(),
        )
    }

    fn scan_of(select: Vec<ValueExpr>) -> CsTableScan<'static> {
        let stmt = SequentialScanNode::new(
            "t",
            select.into_iter().map(SelectListNode::new).collect(),
        );
        CsTableScan::from_reader(stmt, nested_table())
    }

    #[test]
    fn test_find_columns_dedupes_in_order() {
        let expr = ValueExpr::call(
            "add",
            vec![
                ValueExpr::column("b"),
                ValueExpr::call("mul", vec![ValueExpr::column("a"), ValueExpr::column("b")]),
            ],
        );
        assert_eq!(CsTableScan::find_columns(&expr), vec!["b", "a"]);
    }

    #[test]
    fn test_shared_column_binding() {
        let mut scan = scan_of(vec![
            ValueExpr::column("id"),
            ValueExpr::call("add", vec![ValueExpr::column("id"), ValueExpr::literal(1i64)]),
        ]);
        scan.open().unwrap();
        assert_eq!(scan.columns.len(), 1);
        assert_eq!(scan.columns[0].index, 0);
        assert_eq!(scan.column_index.get("id"), Some(&0));
    }

    #[test]
    fn test_resolve_writes_back_slot_and_type() {
        let mut scan = scan_of(vec![]);
        scan.open().unwrap();

        let mut expr = ValueExpr::call("concat", vec![ValueExpr::column("tags"), ValueExpr::column("id")]);
        scan.resolve_columns(&mut expr).unwrap();
        let mut bound = Vec::new();
        expr.walk(&mut |node| {
            if let ValueExpr::ColumnReference {
                column,
                index,
                data_type,
            } = node
            {
                bound.push((column.clone(), *index, *data_type));
            }
        });
        assert_eq!(
            bound,
            vec![
                ("tags".to_string(), Some(0), DataType::Text),
                ("id".to_string(), Some(1), DataType::Integer),
            ]
        );
        assert_eq!(scan.find_max_repetition_level(&expr), 1);
        assert_eq!(
            scan.find_max_repetition_level(&ValueExpr::column("id")),
            0
        );
    }

    #[test]
    fn test_fetch_follows_repetition_levels() {
        let mut scan = scan_of(vec![ValueExpr::column("id"), ValueExpr::column("tags")]);
        scan.open().unwrap();

        let mut row = vec![Value::null_unknown(); 2];
        let mut rows = Vec::new();
        let mut levels = Vec::new();
        for _ in 0..4 {
            scan.fetch(&mut row).unwrap();
            rows.push(row.clone());
            levels.push(scan.fetch_level);
        }

        assert_eq!(levels, vec![1, 0, 0, 0]);
        assert_eq!(
            rows,
            vec![
                vec![Value::Integer(1), Value::text("x")],
                vec![Value::Integer(1), Value::text("y")],
                vec![Value::Integer(2), Value::null(DataType::Text)],
                vec![Value::Integer(3), Value::text("z")],
            ]
        );
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut scan = scan_of(vec![ValueExpr::column("id")]);
        scan.open().unwrap();
        scan.open().unwrap();
        assert_eq!(scan.select_list.len(), 1);
        assert_eq!(scan.state(), ScanState::Opened);
    }

    #[test]
    fn test_aggregate_instances_live_in_scratch() {
        let mut scan = scan_of(vec![
            ValueExpr::call("count", vec![ValueExpr::column("tags")]),
            ValueExpr::column("id"),
        ]);
        scan.open().unwrap();
        assert!(scan.select_list[0].instance.is_some());
        assert!(scan.select_list[1].instance.is_none());
        assert!(!scan.scratch.is_empty());
        assert_eq!(scan.select_list[0].rep_level, 1);
    }

    #[test]
    fn test_where_aggregate_rejected() {
        let stmt = SequentialScanNode::new("t", vec![SelectListNode::new(ValueExpr::column("id"))])
            .with_where(ValueExpr::call(
                "gt",
                vec![
                    ValueExpr::call("count", vec![]),
                    ValueExpr::literal(1i64),
                ],
            ));
        let mut scan = CsTableScan::from_reader(stmt, nested_table());
        assert!(matches!(scan.open(), Err(Error::NotSupported(_))));
        assert_eq!(scan.state(), ScanState::Failed);
        assert!(matches!(scan.open(), Err(Error::InvalidState(_))));
    }
}
