use serde_json::{json, Value};
use sqlviz::artifact::Artifact;
use sqlviz::{
    Aggregation, ArtifactStore, ChartError, ChartIntent, ChartKind, Dispatcher, OutputFormat, ResultTable,
    VizConfig,
};
use std::fs;
use std::path::Path;

fn dispatcher(dir: &Path) -> Dispatcher {
    Dispatcher::new(&VizConfig {
        output_dir: dir.to_path_buf(),
        ..VizConfig::default()
    })
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn orders() -> ResultTable {
    ResultTable::from_json(&json!([
        {"state": "SP", "month": "2018-01", "payment": "credit_card", "price": 129.9, "freight": 15.1, "orders": 41746},
        {"state": "RJ", "month": "2018-01", "payment": "boleto", "price": 89.0, "freight": 20.3, "orders": 12852},
        {"state": "MG", "month": "2018-02", "payment": "credit_card", "price": 45.5, "freight": 12.0, "orders": 11635},
        {"state": "SP", "month": "2018-02", "payment": "voucher", "price": 210.0, "freight": 30.7, "orders": 39012},
        {"state": "RS", "month": "2018-03", "payment": "boleto", "price": 74.2, "freight": 18.4, "orders": 5466},
    ]))
    .unwrap()
}

fn columns_for(kind: ChartKind) -> Vec<&'static str> {
    match kind {
        ChartKind::Bar | ChartKind::Pie => vec!["state", "orders"],
        ChartKind::Line => vec!["month", "orders"],
        ChartKind::Histogram => vec!["price"],
        ChartKind::Heatmap => vec!["state", "month", "orders"],
        ChartKind::Scatter => vec!["price", "freight"],
        ChartKind::Box => vec!["payment", "price"],
    }
}

#[test]
fn test_every_kind_produces_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let table = orders();
    for kind in ChartKind::ALL {
        let intent = ChartIntent::new(kind, &columns_for(kind));
        let r = d.dispatch(&intent, &table).unwrap_or_else(|e| panic!("{kind}: {e}"));
        assert_eq!(r.kind, kind);
        assert!(r.id.starts_with(kind.as_str()));
        assert!(is_valid_png(&fs::read(&r.path).unwrap()), "{kind} is not a PNG");
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), ChartKind::ALL.len());
}

#[test]
fn test_unknown_column_never_reaches_a_builder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("viz");
    let d = dispatcher(&out);
    for kind in ChartKind::ALL {
        let mut columns = columns_for(kind);
        columns[0] = "no_such_column";
        let err = d.dispatch(&ChartIntent::new(kind, &columns), &orders()).unwrap_err();
        assert!(
            matches!(err, ChartError::UnknownColumn(ref c) if c == "no_such_column"),
            "{kind}: {err:?}"
        );
    }
    assert!(!out.exists());
}

#[test]
fn test_storing_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let artifact = Artifact::new(ChartKind::Line, OutputFormat::Png, vec![1, 2, 3, 4], 4);
    let first = store.store(&artifact).unwrap();
    let modified = fs::metadata(&first.path).unwrap().modified().unwrap();
    let second = store.store(&artifact).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::metadata(&second.path).unwrap().modified().unwrap(), modified);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_null_rows_are_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let rows: Vec<Value> = (0..10)
        .map(|i| {
            let amount = if i % 3 == 0 { Value::Null } else { json!(i * 10) };
            json!({"category": format!("c{}", i % 4), "amount": amount})
        })
        .collect();
    let table = ResultTable::from_json(&Value::Array(rows)).unwrap();
    // rows 0, 3, 6, 9 are null
    let r = d
        .dispatch(&ChartIntent::new(ChartKind::Bar, &["category", "amount"]), &table)
        .unwrap();
    assert_eq!(r.rows_rendered, 6);

    let all_null = ResultTable::from_json(&json!([
        {"category": "A", "amount": null},
        {"category": "B", "amount": null},
    ]))
    .unwrap();
    let err = d
        .dispatch(&ChartIntent::new(ChartKind::Bar, &["category", "amount"]), &all_null)
        .unwrap_err();
    assert!(matches!(err, ChartError::EmptyResult), "{err:?}");

    let prices = ResultTable::from_json(&json!([{"price": null}, {"price": null}])).unwrap();
    let err = d
        .dispatch(&ChartIntent::new(ChartKind::Histogram, &["price"]), &prices)
        .unwrap_err();
    assert!(matches!(err, ChartError::EmptyResult), "{err:?}");
}

#[test]
fn test_all_null_numeric_column_is_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let table = ResultTable::from_json(&json!({
        "columns": [{"name": "category", "type": "categorical"}, {"name": "amount", "type": "numeric"}],
        "rows": [["A", null], ["B", null]]
    }))
    .unwrap();
    let err = d
        .dispatch(&ChartIntent::new(ChartKind::Bar, &["category", "amount"]), &table)
        .unwrap_err();
    assert!(matches!(err, ChartError::EmptyResult));
}

#[test]
fn test_pie_rejects_negative_until_negated() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let values = [12.0, -3.0, 7.5];
    let table = |sign: f64| {
        let rows: Vec<Value> = ["A", "B", "C"]
            .iter()
            .zip(values)
            .map(|(c, v)| json!({"category": c, "amount": sign * v}))
            .collect();
        ResultTable::from_json(&Value::Array(rows)).unwrap()
    };
    let intent = ChartIntent::new(ChartKind::Pie, &["category", "amount"]);

    let err = d.dispatch(&intent, &table(1.0)).unwrap_err();
    assert!(matches!(err, ChartError::InvalidValue { ref column, .. } if column == "amount"));

    let abs_rows: Vec<Value> = ["A", "B", "C"]
        .iter()
        .zip(values)
        .map(|(c, v)| json!({"category": c, "amount": f64::abs(v)}))
        .collect();
    let ok = ResultTable::from_json(&Value::Array(abs_rows)).unwrap();
    assert!(d.dispatch(&intent, &ok).is_ok());
}

#[test]
fn test_bar_sum_first_seen_order() {
    use sqlviz::shape::{plan, ChartPlan};
    use sqlviz::transform::category_series;

    let table = ResultTable::from_json(&json!([
        {"category": "A", "amount": 10},
        {"category": "B", "amount": 20},
        {"category": "A", "amount": 5},
    ]))
    .unwrap();
    let intent = ChartIntent::new(ChartKind::Bar, &["category", "amount"]).with_aggregation(Aggregation::Sum);
    let ChartPlan::Bar(cols) = plan(&intent, &table).unwrap() else {
        panic!("expected a bar plan");
    };
    let series = category_series(&table, cols, intent.aggregation).unwrap();
    assert_eq!(series.labels, vec!["A", "B"]);
    assert_eq!(series.values, vec![15.0, 20.0]);

    let dir = tempfile::tempdir().unwrap();
    let r = dispatcher(dir.path()).dispatch(&intent, &table).unwrap();
    assert_eq!(r.rows_rendered, 3);
}

#[test]
fn test_empty_table_fails_before_builder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("viz");
    let d = dispatcher(&out);
    let table = ResultTable::from_json(&json!({"columns": ["category", "amount"], "rows": []})).unwrap();
    for kind in [ChartKind::Bar, ChartKind::Pie, ChartKind::Box] {
        let err = d
            .dispatch(&ChartIntent::new(kind, &["category", "amount"]), &table)
            .unwrap_err();
        assert!(matches!(err, ChartError::EmptyResult), "{kind}: {err:?}");
    }
    assert!(!out.exists());
}

#[test]
fn test_svg_output_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = VizConfig {
        output_dir: dir.path().to_path_buf(),
        ..VizConfig::default()
    };
    config.render.format = OutputFormat::Svg;
    let r = Dispatcher::new(&config)
        .dispatch(&ChartIntent::new(ChartKind::Scatter, &["price", "freight"]), &orders())
        .unwrap();
    assert!(r.id.ends_with(".svg"));
    assert!(fs::read_to_string(&r.path).unwrap().contains("<svg"));
}

#[test]
fn test_concurrent_dispatch_same_request() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let table = orders();
    let intent = ChartIntent::new(ChartKind::Bar, &["state", "orders"]).with_aggregation(Aggregation::Sum);
    let refs: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| d.dispatch(&intent, &table).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(refs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_extreme_magnitudes_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());
    let table = ResultTable::from_json(&json!([
        {"category": "A", "x": -1e308, "y": -1e308},
        {"category": "B", "x": 1e308, "y": 1e308},
        {"category": "C", "x": 0.0, "y": 0.0},
    ]))
    .unwrap();
    let intents = [
        ChartIntent::new(ChartKind::Histogram, &["x"]),
        ChartIntent::new(ChartKind::Scatter, &["x", "y"]),
        ChartIntent::new(ChartKind::Bar, &["category", "x"]),
        ChartIntent::new(ChartKind::Line, &["category", "y"]),
        ChartIntent::new(ChartKind::Box, &["category", "y"]),
    ];
    for intent in &intents {
        match d.dispatch(intent, &table) {
            Ok(r) => assert!(r.path.exists()),
            Err(err) => assert!(matches!(err, ChartError::RenderFailure(_)), "{}: {err:?}", intent.kind),
        }
    }

    let huge = ResultTable::from_json(&json!([
        {"category": "A", "amount": 1e308},
        {"category": "B", "amount": 1e308},
    ]))
    .unwrap();
    let r = d.dispatch(&ChartIntent::new(ChartKind::Pie, &["category", "amount"]), &huge);
    assert!(r.is_ok(), "{r:?}");
}

#[test]
fn test_oversized_canvas_is_render_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = VizConfig {
        output_dir: dir.path().join("viz"),
        ..VizConfig::default()
    };
    config.render.width = 65536;
    config.render.height = 65536;
    let err = Dispatcher::new(&config)
        .dispatch(&ChartIntent::new(ChartKind::Scatter, &["price", "freight"]), &orders())
        .unwrap_err();
    assert!(matches!(err, ChartError::RenderFailure(_)), "{err:?}");
    assert!(!dir.path().join("viz").exists());
}
