//! Integration tests for CsTableScan
//!
//! Tests row reconstruction over nested columns including:
//! - Flat and repeated columns, held-constant shallow fields
//! - Where clauses, filter functions and early stop
//! - The three aggregation strategies
//! - File-backed tables, failure modes and cancellation

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use nestql::{
    AggregationStrategy, CacheKey, ColumnEntry, ColumnReader, CsTableFile, CsTableScan, DataType,
    Error, ExecutionContext, MemoryTable, MemoryTableBuilder, Result, ScanConfig, ScanState,
    SelectListNode, SequentialScanNode, TableReader, Value, ValueExpr,
};

fn col(name: &str) -> ValueExpr {
    ValueExpr::column(name)
}

fn lit(value: impl Into<Value>) -> ValueExpr {
    ValueExpr::literal(value)
}

fn call(symbol: &str, args: Vec<ValueExpr>) -> ValueExpr {
    ValueExpr::call(symbol, args)
}

fn select(exprs: Vec<ValueExpr>) -> SequentialScanNode {
    SequentialScanNode::new("docs", exprs.into_iter().map(SelectListNode::new).collect())
}

/// {id, name, tags[]}:
///   {1, "alpha", [x, y]}, {2, "beta", []}, {3, NULL, [z]}
fn docs() -> Arc<dyn TableReader> {
    Arc::new(
        MemoryTableBuilder::new()
            .flat_column(
                "id",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
            )
            .flat_column(
                "name",
                DataType::Text,
                vec![
                    Value::text("alpha"),
                    Value::text("beta"),
                    Value::null(DataType::Text),
                ],
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
            .expect("Failed to build table"),
    )
}

/// Route scan spans to the test output (RUST_LOG=nestql=debug)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn collect(scan: &mut CsTableScan<'_>) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    scan.execute(&ExecutionContext::new(), |row| {
        rows.push(row.to_vec());
        true
    })
    .expect("Failed to execute scan");
    rows
}

// ============================================================================
// Row reconstruction
// ============================================================================

#[test]
fn test_flat_projection() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id"), col("name")]), docs());
    assert_eq!(scan.column_names(), &["id".to_string(), "name".to_string()]);
    assert_eq!(scan.num_columns(), 2);

    let rows = collect(&mut scan);
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::text("alpha")],
            vec![Value::Integer(2), Value::text("beta")],
            vec![Value::Integer(3), Value::null(DataType::Text)],
        ]
    );
    assert_eq!(scan.rows_scanned(), 3);
    assert_eq!(scan.state(), ScanState::Done);
}

#[test]
fn test_repeated_column_holds_shallow_values() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id"), col("tags")]), docs());
    let rows = collect(&mut scan);
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::text("x")],
            vec![Value::Integer(1), Value::text("y")],
            vec![Value::Integer(2), Value::null(DataType::Text)],
            vec![Value::Integer(3), Value::text("z")],
        ]
    );
    assert_eq!(scan.rows_scanned(), 4);
}

#[test]
fn test_expressions_share_one_column_binding() {
    let mut scan = CsTableScan::from_reader(
        select(vec![
            col("id"),
            call("mul", vec![col("id"), lit(100i64)]),
            call("add", vec![col("id"), col("id")]),
        ]),
        docs(),
    );
    let rows = collect(&mut scan);
    assert_eq!(
        rows[1],
        vec![Value::Integer(2), Value::Integer(200), Value::Integer(4)]
    );
}

#[test]
fn test_alias_and_rendered_column_names() {
    let stmt = SequentialScanNode::new(
        "docs",
        vec![
            SelectListNode::aliased(col("id"), "doc_id"),
            SelectListNode::new(call("upper", vec![col("name")])),
        ],
    );
    let scan = CsTableScan::from_reader(stmt, docs());
    assert_eq!(scan.column_names()[0], "doc_id");
    assert_eq!(scan.column_names()[1], "upper(name)");
}

#[test]
fn test_if_expression_per_row() {
    let mut scan = CsTableScan::from_reader(
        select(vec![ValueExpr::if_then_else(
            call("gt", vec![col("id"), lit(1i64)]),
            lit("many"),
            lit("one"),
        )]),
        docs(),
    );
    let rows = collect(&mut scan);
    let labels: Vec<Value> = rows.into_iter().map(|mut r| r.remove(0)).collect();
    assert_eq!(
        labels,
        vec![Value::text("one"), Value::text("many"), Value::text("many")]
    );
}

// ============================================================================
// Filtering and early stop
// ============================================================================

#[test]
fn test_where_clause() {
    let stmt = select(vec![col("id"), col("tags")]).with_where(call(
        "neq",
        vec![col("tags"), lit("x")],
    ));
    let mut scan = CsTableScan::from_reader(stmt, docs());
    let rows = collect(&mut scan);
    // NULL tags compare as NULL, which rejects the row
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::text("y")],
            vec![Value::Integer(3), Value::text("z")],
        ]
    );
    assert_eq!(scan.rows_scanned(), 4);
}

#[test]
fn test_reject_all_filter() {
    let mut scan = CsTableScan::from_reader(select(vec![col("tags")]), docs());
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    scan.set_filter(move || {
        seen.set(seen.get() + 1);
        false
    });

    let rows = collect(&mut scan);
    assert!(rows.is_empty());
    assert_eq!(scan.rows_scanned(), 4);
    assert_eq!(calls.get(), 4);
}

#[test]
fn test_callback_stop_after_first_row() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id"), col("tags")]), docs());
    let mut delivered = 0;
    scan.execute(&ExecutionContext::new(), |_| {
        delivered += 1;
        false
    })
    .unwrap();

    assert_eq!(delivered, 1);
    assert_eq!(scan.rows_scanned(), 1);
    assert_eq!(scan.state(), ScanState::Done);
}

#[test]
fn test_execute_twice_is_rejected() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    collect(&mut scan);
    let err = scan
        .execute(&ExecutionContext::new(), |_| true)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_all() {
    let stmt = select(vec![
        call("count", vec![]),
        call("count", vec![col("tags")]),
        call("sum", vec![col("id")]),
        call("max", vec![col("id")]),
    ])
    .with_aggregation(AggregationStrategy::AggregateAll);
    let mut scan = CsTableScan::from_reader(stmt, docs());
    let rows = collect(&mut scan);

    // COUNT() and SUM(id) see each record once even though record 1 has
    // two tags
    assert_eq!(
        rows,
        vec![vec![
            Value::Integer(3),
            Value::Integer(3),
            Value::Integer(6),
            Value::Integer(3),
        ]]
    );
}

#[test]
fn test_aggregate_all_emits_once_when_nothing_passes() {
    let stmt = select(vec![call("count", vec![col("id")]), call("sum", vec![col("id")])])
        .with_where(call("gt", vec![col("id"), lit(100i64)]))
        .with_aggregation(AggregationStrategy::AggregateAll);
    let mut scan = CsTableScan::from_reader(stmt, docs());
    let rows = collect(&mut scan);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::Integer(0));
    assert!(rows[0][1].is_null());
}

#[test]
fn test_aggregate_within_record() {
    let stmt = select(vec![col("id"), call("count", vec![col("tags")])])
        .with_aggregation(AggregationStrategy::AggregateWithinRecord);
    let mut scan = CsTableScan::from_reader(stmt, docs());
    let rows = collect(&mut scan);
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::Integer(2)],
            vec![Value::Integer(2), Value::Integer(0)],
            vec![Value::Integer(3), Value::Integer(1)],
        ]
    );
}

/// {id, links[]{w, urls[]}}:
///   {1, [{10, [a, b]}, {20, [c]}]}, {2, [{30, [d]}]}
fn links() -> Arc<dyn TableReader> {
    Arc::new(
        MemoryTableBuilder::new()
            .column_triples(
                "id",
                DataType::Integer,
                0,
                0,
                vec![(0, 0, Value::Integer(1)), (0, 0, Value::Integer(2))],
            )
            .column_triples(
                "links.w",
                DataType::Integer,
                1,
                2,
                vec![
                    (0, 2, Value::Integer(10)),
                    (1, 2, Value::Integer(20)),
                    (0, 2, Value::Integer(30)),
                ],
            )
            .column_triples(
                "links.urls",
                DataType::Text,
                2,
                2,
                vec![
                    (0, 2, Value::text("a")),
                    (2, 2, Value::text("b")),
                    (1, 2, Value::text("c")),
                    (0, 2, Value::text("d")),
                ],
            )
            .build()
            .expect("Failed to build table"),
    )
}

#[test]
fn test_two_level_nesting_holds_shallower_fields() {
    let stmt = select(vec![col("id"), col("links.w"), col("links.urls")]);
    let mut scan = CsTableScan::from_reader(stmt, links());
    let rows = collect(&mut scan);
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::Integer(10), Value::text("a")],
            vec![Value::Integer(1), Value::Integer(10), Value::text("b")],
            vec![Value::Integer(1), Value::Integer(20), Value::text("c")],
            vec![Value::Integer(2), Value::Integer(30), Value::text("d")],
        ]
    );
    assert_eq!(scan.rows_scanned(), 4);
}

#[test]
fn test_two_level_nesting_aggregates_each_level_once() {
    let stmt = select(vec![
        col("id"),
        call("sum", vec![col("links.w")]),
        call("count", vec![col("links.urls")]),
    ])
    .with_aggregation(AggregationStrategy::AggregateWithinRecord);
    let mut scan = CsTableScan::from_reader(stmt, links());
    assert_eq!(
        collect(&mut scan),
        vec![
            vec![Value::Integer(1), Value::Integer(30), Value::Integer(3)],
            vec![Value::Integer(2), Value::Integer(30), Value::Integer(1)],
        ]
    );
}

#[test]
fn test_aggregate_with_surrounding_expression() {
    let stmt = select(vec![call(
        "add",
        vec![call("mean", vec![col("id")]), lit(0.5)],
    )])
    .with_aggregation(AggregationStrategy::AggregateAll);
    let mut scan = CsTableScan::from_reader(stmt, docs());
    assert_eq!(collect(&mut scan), vec![vec![Value::Float(2.5)]]);
}

#[test]
fn test_aggregate_without_grouping_is_per_row() {
    let mut scan = CsTableScan::from_reader(select(vec![call("count", vec![col("tags")])]), docs());
    let rows = collect(&mut scan);
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1)],
            vec![Value::Integer(1)],
            vec![Value::Integer(0)],
            vec![Value::Integer(1)],
        ]
    );
}

// ============================================================================
// Scans without columns
// ============================================================================

#[test]
fn test_scan_without_columns_visits_every_record() {
    let mut scan = CsTableScan::from_reader(select(vec![lit(7i64)]), docs());
    let rows = collect(&mut scan);
    assert_eq!(rows, vec![vec![Value::Integer(7)]; 3]);
    assert_eq!(scan.rows_scanned(), 3);
}

#[test]
fn test_count_star_without_columns() {
    let stmt = select(vec![call("count", vec![])])
        .with_aggregation(AggregationStrategy::AggregateAll);
    let mut scan = CsTableScan::from_reader(stmt, docs());
    assert_eq!(collect(&mut scan), vec![vec![Value::Integer(3)]]);
}

// ============================================================================
// Configuration surface
// ============================================================================

#[test]
fn test_cache_key() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    assert_eq!(scan.cache_key(), None);

    let key = CacheKey::from_content(b"docs:id");
    scan.set_cache_key(key);
    assert_eq!(scan.cache_key(), Some(key));

    scan.set_filter(|| true);
    assert_eq!(scan.cache_key(), None);
}

#[test]
fn test_set_column_type() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    scan.set_column_type("id", DataType::Text).unwrap();
    let rows = collect(&mut scan);
    assert_eq!(rows[0], vec![Value::text("1")]);

    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    scan.open().unwrap();
    assert!(matches!(
        scan.set_column_type("id", DataType::Float),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_progress_accounting() {
    let ctx = ExecutionContext::new();
    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    scan.prepare(&ctx);
    assert_eq!(ctx.num_tasks(), 1);
    assert_eq!(ctx.num_tasks_completed(), 0);

    scan.execute(&ctx, |_| true).unwrap();
    assert_eq!(ctx.num_tasks_completed(), 1);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_missing_column_fails_before_any_row() {
    let mut scan = CsTableScan::from_reader(select(vec![col("id"), col("nope")]), docs());
    let mut delivered = 0;
    let err = scan
        .execute(&ExecutionContext::new(), |_| {
            delivered += 1;
            true
        })
        .unwrap_err();
    assert_eq!(err, Error::ColumnNotFound("nope".to_string()));
    assert!(err.is_schema_error());
    assert_eq!(delivered, 0);
    assert_eq!(scan.state(), ScanState::Failed);
}

#[test]
fn test_unknown_function_fails_at_open() {
    let mut scan = CsTableScan::from_reader(select(vec![call("nope", vec![col("id")])]), docs());
    let err = scan.open().unwrap_err();
    assert!(err.is_compile_error());
}

#[test]
fn test_cancelled_context() {
    let ctx = ExecutionContext::new();
    ctx.cancel();
    let mut scan = CsTableScan::from_reader(select(vec![col("id")]), docs());
    let err = scan.execute(&ctx, |_| true).unwrap_err();
    assert_eq!(err, Error::QueryCancelled);
}

#[test]
fn test_cancel_mid_scan() {
    let table: Arc<dyn TableReader> = Arc::new(
        MemoryTable::from_records(
            &[("n", DataType::Integer)],
            &(0..100).map(|i| vec![Value::Integer(i)]).collect::<Vec<_>>(),
        )
        .unwrap(),
    );
    let ctx = ExecutionContext::new();
    let handle = ctx.cancellation_handle();
    let mut scan = CsTableScan::from_reader(select(vec![col("n")]), table)
        .with_config(ScanConfig::new().with_cancellation_check_interval(10));

    let mut delivered = 0;
    let err = scan
        .execute(&ctx, |_| {
            delivered += 1;
            if delivered == 15 {
                handle.cancel();
            }
            true
        })
        .unwrap_err();
    assert_eq!(err, Error::QueryCancelled);
    assert_eq!(delivered, 20);
}

/// Column whose stream breaks after a few entries
struct BrokenColumn {
    served: u64,
}

impl ColumnReader for BrokenColumn {
    fn max_repetition_level(&self) -> u64 {
        0
    }

    fn max_definition_level(&self) -> u64 {
        1
    }

    fn next_repetition_level(&self) -> u64 {
        0
    }

    fn next(&mut self) -> Result<Option<ColumnEntry>> {
        if self.served == 2 {
            return Err(Error::corrupted("v", "bad page"));
        }
        self.served += 1;
        Ok(Some(ColumnEntry::new(0, 1, Value::Integer(self.served as i64))))
    }

    fn data_type(&self) -> DataType {
        DataType::Integer
    }
}

struct BrokenTable;

impl TableReader for BrokenTable {
    fn num_records(&self) -> u64 {
        10
    }

    fn column_names(&self) -> Vec<String> {
        vec!["v".to_string()]
    }

    fn column_reader(&self, name: &str) -> Result<Box<dyn ColumnReader>> {
        match name {
            "v" => Ok(Box::new(BrokenColumn { served: 0 })),
            _ => Err(Error::ColumnNotFound(name.to_string())),
        }
    }
}

#[test]
fn test_corrupt_stream_keeps_delivered_rows() {
    let mut scan = CsTableScan::from_reader(select(vec![col("v")]), Arc::new(BrokenTable));
    let mut rows = Vec::new();
    let err = scan
        .execute(&ExecutionContext::new(), |row| {
            rows.push(row.to_vec());
            true
        })
        .unwrap_err();

    assert!(err.is_scan_io_error());
    assert_eq!(rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
    assert_eq!(scan.state(), ScanState::Failed);
}

// ============================================================================
// File-backed tables
// ============================================================================

#[test]
fn test_scan_from_file() {
    init_tracing();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("docs.cst");
    CsTableFile::write(&path, docs().as_ref()).expect("Failed to write table");

    let mut scan = CsTableScan::from_file(select(vec![col("id"), col("tags")]), &path);
    assert_eq!(scan.state(), ScanState::Created);
    let rows = collect(&mut scan);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1], vec![Value::Integer(1), Value::text("y")]);
}

#[test]
fn test_missing_file_fails_at_open() {
    let mut scan = CsTableScan::from_file(select(vec![col("id")]), "/nonexistent/docs.cst");
    let err = scan.open().unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
