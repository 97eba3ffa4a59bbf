use csvchart::parser::parse_chart_request;
use csvchart::service::ChartDataRequest;
use csvchart::{chart_data, ChartRequest, Dataset, EngineOptions, Service};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

fn load(name: &str) -> Dataset {
    let csv = fs::read(format!("tests/data/{}", name)).expect("Failed to read test CSV");
    Dataset::from_bytes(&csv).expect("Failed to parse test CSV")
}

fn chart_json(data: &Dataset, expr: &str) -> Value {
    let request = parse_chart_request(expr).expect("Failed to parse chart expression");
    let result = chart_data(data, &request, &EngineOptions::default()).expect("Failed to shape chart");
    serde_json::to_value(&result).unwrap()
}

/// Helper function to run the csvchart binary with CSV on stdin
fn run_csvchart(args: &[&str], csv_content: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_csvchart"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn process");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(csv_content.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait for process");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_numeric_columns_from_messy_sales() {
    let data = load("sales.csv");
    assert_eq!(
        data.columns(),
        vec!["date", "region", "product", "revenue", "units", "discount"]
    );
    assert_eq!(data.numeric_columns(), vec!["revenue", "units", "discount"]);

    let revenue = data.coerce_numeric("revenue").unwrap();
    assert_eq!(
        revenue.values,
        vec![Some(1200.5), Some(-300.0), Some(450.0), Some(2000.0), None]
    );
    assert_eq!(data.mean("revenue").unwrap(), Some(837.625));
    assert_eq!(data.mean("region").unwrap(), None);
}

#[test]
fn test_quoted_fields() {
    let data = load("messy.csv");
    let preview = data.preview(10);
    assert_eq!(preview.rows[0], vec!["Smith, Jane", "88", "said \"hi\""]);
    assert_eq!(
        data.coerce_numeric("score").unwrap().values,
        vec![Some(88.0), Some(92.0), None]
    );
}

#[test]
fn test_bar_chart_end_to_end() {
    let data = load("sales.csv");
    assert_eq!(
        chart_json(&data, "bar(x: region, y: revenue)"),
        json!({
            "chart": "bar",
            "x": ["east", "north", "south"],
            "y": [2000.0, 1650.5, -300.0],
            "mean": 837.625,
            "barmode": "group"
        })
    );
}

#[test]
fn test_line_chart_sorts_dates() {
    let data = load("sales.csv");
    assert_eq!(
        chart_json(&data, "line(x: date, y: revenue)"),
        json!({
            "chart": "line",
            "x": [
                "2023-01-01 00:00:00",
                "2023-01-02 00:00:00",
                "2023-01-03 00:00:00",
                "2023-01-05 00:00:00"
            ],
            "y": [-300.0, 450.0, 1200.5, 2000.0],
            "mean": 837.625,
            "xType": "temporal"
        })
    );
}

#[test]
fn test_scatter_by_color_end_to_end() {
    let data = load("sales.csv");
    assert_eq!(
        chart_json(&data, "scatter(x: units, y: discount, color: product)"),
        json!({
            "chart": "scatter",
            "series": [
                {"name": "gadget", "x": [6.0], "y": [10.0]},
                {"name": "widget", "x": [10.0, 8.0, 3.0], "y": [5.0, 0.0, 15.0]}
            ]
        })
    );
}

#[test]
fn test_pie_and_box_end_to_end() {
    let data = load("sales.csv");
    assert_eq!(
        chart_json(&data, "pie(values: units, names: product)"),
        json!({"chart": "pie", "values": [10.0, 21.0], "names": ["gadget", "widget"]})
    );

    let boxed = chart_json(&data, "box(x: region, y: revenue, color: product)");
    let names: Vec<&str> = boxed["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["east - widget", "north - gadget", "north - widget", "south - gadget"]);
}

#[test]
fn test_histogram_end_to_end() {
    let data = load("sales.csv");
    assert_eq!(
        chart_json(&data, "histogram(x: revenue, color: product)"),
        json!({
            "chart": "histogram",
            "series": [
                {"name": "gadget", "x": [-300.0, 450.0]},
                {"name": "widget", "x": [1200.5, 2000.0]}
            ]
        })
    );
}

#[test]
fn test_unsupported_chart_no_partial_output() {
    let data = load("sales.csv");
    let request = ChartRequest::new("radar").x("region").y("revenue");
    let err = chart_data(&data, &request, &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "unsupported_chart");
}

#[test]
fn test_describe_end_to_end() {
    let data = load("timeseries.csv");
    let table = serde_json::to_value(data.describe()).unwrap();
    assert_eq!(
        table,
        json!({
            "index": ["mean", "std", "min", "25%", "50%", "75%", "max"],
            "columns": ["temperature"],
            "data": [["10.94"], ["1.85"], ["9.0"], ["9.75"], ["10.75"], ["11.94"], ["13.25"]]
        })
    );
}

#[test]
fn test_service_flow() {
    let service = Service::default();
    let csv = fs::read("tests/data/sales.csv").unwrap();
    let upload = service.upload(&csv).unwrap();
    assert_eq!(upload.numeric_columns, vec!["revenue", "units", "discount"]);

    let preview = serde_json::to_value(service.preview(Some(&upload.token)).unwrap()).unwrap();
    assert_eq!(preview["rowCount"], json!(5));
    assert_eq!(preview["totalRows"], json!(5));
    assert_eq!(preview["rows"][1][5], json!(""));

    let request = ChartDataRequest {
        token: Some(upload.token.clone()),
        chart: ChartRequest::new("bar").x("region"),
    };
    let err = service.chart_data(&request).unwrap_err();
    assert_eq!(
        serde_json::to_value(err.to_body()).unwrap(),
        json!({"kind": "validation_error", "message": "x and y are required for bar chart."})
    );
}

#[test]
fn test_cli_columns() {
    let csv = fs::read_to_string("tests/data/sales.csv").unwrap();
    let (code, stdout, _) = run_csvchart(&["columns"], &csv);
    assert_eq!(code, 0);
    let output: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["numericColumns"], json!(["revenue", "units", "discount"]));
}

#[test]
fn test_cli_chart_expression() {
    let csv = "x,y\na,1\na,2\nb,x\n";
    let (code, stdout, _) = run_csvchart(&["chart", "bar(x: x, y: y)"], csv);
    assert_eq!(code, 0);
    let output: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["x"], json!(["a"]));
    assert_eq!(output["y"], json!([3.0]));
    assert_eq!(output["mean"], json!(1.5));
}

#[test]
fn test_cli_chart_json() {
    let csv = "day,v\n2023-01-02,5\n2023-01-01,3\n";
    let (code, stdout, _) = run_csvchart(
        &["chart", "--json", r#"{"chart": "line", "x": "day", "y": "v"}"#],
        csv,
    );
    assert_eq!(code, 0);
    let output: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["x"], json!(["2023-01-01 00:00:00", "2023-01-02 00:00:00"]));
    assert_eq!(output["y"], json!([3.0, 5.0]));
}

#[test]
fn test_cli_unsupported_chart() {
    let (code, stdout, stderr) = run_csvchart(&["chart", "radar(x: a)"], "a\n1\n");
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    let body: Value = serde_json::from_str(stderr.lines().last().unwrap()).unwrap();
    assert_eq!(body["kind"], json!("unsupported_chart"));
}

#[test]
fn test_cli_parse_error() {
    let (code, _, stderr) = run_csvchart(&["columns"], "a,b\n\"broken,1\n");
    assert_eq!(code, 2);
    assert!(stderr.contains("parse_error"));
}

#[test]
fn test_cli_preview_rows() {
    let (code, stdout, _) = run_csvchart(&["preview", "--rows", "1"], "a,b\n1,x\n2,y\n");
    assert_eq!(code, 0);
    let output: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["rows"], json!([["1", "x"]]));
    assert_eq!(output["rowCount"], json!(1));
    assert_eq!(output["totalRows"], json!(2));
}

#[test]
fn test_cli_missing_input_file() {
    let (code, stdout, stderr) =
        run_csvchart(&["--input", "tests/data/does_not_exist.csv", "columns"], "");
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Failed to process CSV"));
}
