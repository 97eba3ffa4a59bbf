use std::fmt;
use std::io::Read;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::coerce::coerce_value;
use crate::error::{EngineError, Result};
use crate::stats::{mean_of, SummaryStats};

/// Cell spellings that load as missing.
const NA_MARKERS: [&str; 12] = [
    "", "NA", "N/A", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// One raw cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Display form used for previews and category labels.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Numbers coerced from a column, aligned with its rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoercedSeries {
    pub values: Vec<Option<f64>>,
}

impl CoercedSeries {
    /// Non-missing values in row order.
    pub fn valid(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    pub fn mean(&self) -> Option<f64> {
        mean_of(&self.valid())
    }
}

/// Rows rendered as display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
    pub total_rows: usize,
}

/// Descriptive statistics: one row per statistic, one column per numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsTable {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub data: Vec<Vec<String>>,
}

/// A loaded table. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build from header names and string rows, applying NA detection and
    /// per-column type inference. Ragged rows are padded or truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = unique_headers(headers);
        let width = headers.len();
        let row_count = rows.len();

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(row_count); width];
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                warn!(
                    row = row_idx + 1,
                    expected = width,
                    found = row.len(),
                    "ragged CSV row"
                );
            }
            let mut cells = row.into_iter();
            for col in raw.iter_mut() {
                let cell = cells.next().filter(|s| !is_na(s));
                col.push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column {
                name,
                values: infer_column(cells),
            })
            .collect();

        Self { columns, row_count }
    }

    /// Build directly from typed columns. Columns must share one length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(EngineError::parse(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.values.len(),
                row_count
            )));
        }
        let names = unique_headers(columns.iter().map(|c| c.name.clone()).collect());
        let columns = columns
            .into_iter()
            .zip(names)
            .map(|(c, name)| Column { name, values: c.values })
            .collect();
        Ok(Self { columns, row_count })
    }

    /// Parse comma-separated text. The first record is the header.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_csv_str(input: &str) -> Result<Self> {
        Self::from_bytes(input.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        check_quotes(bytes)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(EngineError::parse("No columns to parse from file")),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let dataset = Self::new(headers, rows);
        debug!(
            columns = dataset.columns.len(),
            rows = dataset.row_count,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Create from a JSON array of objects; headers come from the first object.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| EngineError::parse("Input data must be a JSON array of objects"))?;

        let first_obj = array
            .first()
            .ok_or_else(|| EngineError::parse("Input data array is empty"))?
            .as_object()
            .ok_or_else(|| EngineError::parse("Items in array must be objects"))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|name| Column {
                name: name.clone(),
                values: Vec::with_capacity(array.len()),
            })
            .collect();

        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| EngineError::parse("Items in array must be objects"))?;

            for column in columns.iter_mut() {
                let value = match obj.get(&column.name) {
                    Some(JsonValue::String(s)) if is_na(s) => Value::Missing,
                    Some(JsonValue::String(s)) => Value::Text(s.clone()),
                    Some(JsonValue::Number(n)) => n.as_f64().map_or(Value::Missing, Value::Number),
                    Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
                    Some(JsonValue::Null) | None => Value::Missing,
                    Some(_) => {
                        return Err(EngineError::parse(format!(
                            "Unsupported value type for field '{}'",
                            column.name
                        )))
                    }
                };
                column.values.push(value);
            }
        }

        Self::from_columns(columns)
    }

    pub fn columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    /// Exact match first, then ASCII case-insensitive.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| EngineError::UnknownColumn {
                column: name.to_string(),
            })
    }

    pub fn column_at(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    pub fn coerce_numeric(&self, name: &str) -> Result<CoercedSeries> {
        Ok(coerce_column(self.column(name)?))
    }

    pub fn is_numeric_column(&self, name: &str) -> Result<bool> {
        Ok(is_numeric(self.column(name)?))
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| is_numeric(c))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Mean of the coerced values; `None` if nothing coerces.
    pub fn mean(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.coerce_numeric(name)?.mean())
    }

    /// Distribution statistics for every numeric column, rounded to two
    /// decimals. The count row is left out.
    pub fn describe(&self) -> StatsTable {
        let numeric: Vec<&Column> = self.columns.iter().filter(|c| is_numeric(c)).collect();
        let stats: Vec<SummaryStats> = numeric
            .iter()
            .map(|c| SummaryStats::compute(&coerce_column(c).valid()))
            .collect();

        let index: Vec<String> = SummaryStats::LABELS.iter().map(|s| s.to_string()).collect();
        let data = (0..SummaryStats::LABELS.len())
            .map(|stat_idx| {
                stats
                    .iter()
                    .map(|s| format_stat(s.values()[stat_idx]))
                    .collect()
            })
            .collect();

        StatsTable {
            index,
            columns: numeric.iter().map(|c| c.name.clone()).collect(),
            data,
        }
    }

    pub fn preview(&self, max_rows: usize) -> Preview {
        let shown = max_rows.min(self.row_count);
        let rows = (0..shown)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.values[row].to_string())
                    .collect()
            })
            .collect();

        Preview {
            columns: self.columns(),
            rows,
            row_count: shown,
            total_rows: self.row_count,
        }
    }
}

fn coerce_column(column: &Column) -> CoercedSeries {
    CoercedSeries {
        values: column.values.iter().map(coerce_value).collect(),
    }
}

fn is_numeric(column: &Column) -> bool {
    column.values.iter().any(|v| coerce_value(v).is_some())
}

fn is_na(cell: &str) -> bool {
    NA_MARKERS.contains(&cell.trim())
}

/// A column whose every present cell is a plain number becomes numeric;
/// anything else keeps its text verbatim.
fn infer_column(cells: Vec<Option<String>>) -> Vec<Value> {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();

    match parsed {
        Some(numbers) => numbers
            .into_iter()
            .map(|n| n.map_or(Value::Missing, Value::Number))
            .collect(),
        None => cells
            .into_iter()
            .map(|cell| cell.map_or(Value::Missing, Value::Text))
            .collect(),
    }
}

/// Blank names become `Unnamed: i`; repeats get `.1`, `.2`, ... suffixes.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.push(name);
    }
    seen
}

/// The csv reader accepts a quoted field running to end of input; reject it.
fn check_quotes(bytes: &[u8]) -> Result<()> {
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }

    let mut state = State::FieldStart;
    let mut line = 1;
    let mut opened_at = 1;
    for &b in bytes {
        if b == b'\n' {
            line += 1;
        }
        state = match (state, b) {
            (State::FieldStart, b'"') => {
                opened_at = line;
                State::Quoted
            }
            (State::FieldStart | State::Unquoted, b',' | b'\n' | b'\r') => State::FieldStart,
            (State::FieldStart | State::Unquoted, _) => State::Unquoted,
            (State::Quoted, b'"') => State::QuoteInQuoted,
            (State::Quoted, _) => State::Quoted,
            (State::QuoteInQuoted, b'"') => State::Quoted,
            (State::QuoteInQuoted, b',' | b'\n' | b'\r') => State::FieldStart,
            (State::QuoteInQuoted, _) => State::Unquoted,
        };
    }

    if matches!(state, State::Quoted) {
        return Err(EngineError::parse(format!(
            "unterminated quoted field starting on line {}",
            opened_at
        )));
    }
    Ok(())
}

/// Magnitude past which an f64 has no fractional digits left to round.
const ROUNDING_LIMIT: f64 = 1e15;

/// Two-decimal display: `2.0`, `1.57`, `nan`.
fn format_stat(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let rounded = if value.abs() < ROUNDING_LIMIT {
        (value * 100.0).round() / 100.0
    } else {
        value
    };
    if rounded.is_finite() && rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Dataset {
        Dataset::from_csv_str(
            "region,revenue,units,notes\n\
             north,\"$1,234.50\",3,ok\n\
             south,(200),4,\n\
             east,12%,5,late\n\
             west,n/a,6,ok\n",
        )
        .unwrap()
    }

    #[test]
    fn test_columns_preserve_order() {
        assert_eq!(sales().columns(), vec!["region", "revenue", "units", "notes"]);
    }

    #[test]
    fn test_type_inference() {
        let ds = sales();
        assert!(matches!(ds.column("units").unwrap().values[0], Value::Number(n) if n == 3.0));
        assert!(matches!(&ds.column("revenue").unwrap().values[0], Value::Text(s) if s == "$1,234.50"));
        assert!(ds.column("notes").unwrap().values[1].is_missing());
    }

    #[test]
    fn test_coerce_numeric() {
        let series = sales().coerce_numeric("revenue").unwrap();
        assert_eq!(series.values, vec![Some(1234.5), Some(-200.0), Some(12.0), None]);
    }

    #[test]
    fn test_native_numeric_is_identity() {
        let ds = Dataset::from_csv_str("a\n1.5\n-2\n1e3\n").unwrap();
        let series = ds.coerce_numeric("a").unwrap();
        assert_eq!(series.values, vec![Some(1.5), Some(-2.0), Some(1000.0)]);
    }

    #[test]
    fn test_numeric_columns_subset() {
        let ds = sales();
        assert_eq!(ds.numeric_columns(), vec!["revenue", "units"]);
        assert!(!ds.is_numeric_column("notes").unwrap());
        assert!(ds.is_numeric_column("revenue").unwrap());
    }

    #[test]
    fn test_mean_missing_when_nothing_coerces() {
        let ds = sales();
        assert_eq!(ds.mean("notes").unwrap(), None);
        assert_eq!(ds.mean("units").unwrap(), Some(4.5));
    }

    #[test]
    fn test_unknown_column() {
        let err = sales().coerce_numeric("profit").unwrap_err();
        assert_eq!(err.kind(), "unknown_column");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        assert_eq!(sales().column_index("REGION").unwrap(), 0);
    }

    #[test]
    fn test_ragged_rows() {
        let ds = Dataset::from_csv_str("a,b,c\n1,2\n3,4,5,6\n").unwrap();
        assert_eq!(ds.row_count(), 2);
        assert!(ds.column("c").unwrap().values[0].is_missing());
        assert_eq!(ds.column("c").unwrap().values[1], Value::Number(5.0));
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let err = Dataset::from_csv_str("a,b\n\"open,2\n").unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn test_escaped_quotes_are_fine() {
        let ds = Dataset::from_csv_str("a,b\n\"say \"\"hi\"\"\",2\nx\"y,3\n").unwrap();
        assert_eq!(ds.column("a").unwrap().values[0], Value::Text("say \"hi\"".into()));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(Dataset::from_csv_str("").is_err());
    }

    #[test]
    fn test_header_only() {
        let ds = Dataset::from_csv_str("a,b\n").unwrap();
        assert_eq!(ds.row_count(), 0);
        assert!(ds.numeric_columns().is_empty());
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let ds = Dataset::from_csv_str("a,a,,a\n1,2,3,4\n").unwrap();
        assert_eq!(ds.columns(), vec!["a", "a.1", "Unnamed: 2", "a.2"]);
    }

    #[test]
    fn test_bom_stripped() {
        let ds = Dataset::from_bytes(b"\xEF\xBB\xBFname,v\nx,1\n").unwrap();
        assert_eq!(ds.columns()[0], "name");
    }

    #[test]
    fn test_preview() {
        let ds = sales();
        let preview = ds.preview(2);
        assert_eq!(preview.row_count, 2);
        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.rows[0], vec!["north", "$1,234.50", "3", "ok"]);
        assert_eq!(preview.rows[1], vec!["south", "(200)", "4", ""]);

        assert_eq!(ds.preview(500).row_count, 4);
    }

    #[test]
    fn test_describe() {
        let ds = Dataset::from_csv_str("a,b\n1,10\n2,20\n3,30\n4,40\n").unwrap();
        let table = ds.describe();
        assert_eq!(
            table.index,
            vec!["mean", "std", "min", "25%", "50%", "75%", "max"]
        );
        assert!(!table.index.contains(&"count".to_string()));
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.data[0], vec!["2.5", "25.0"]);
        assert_eq!(table.data[1], vec!["1.29", "12.91"]);
        assert_eq!(table.data[2], vec!["1.0", "10.0"]);
        assert_eq!(table.data[3], vec!["1.75", "17.5"]);
        assert_eq!(table.data[6], vec!["4.0", "40.0"]);
    }

    #[test]
    fn test_describe_single_value_std_is_nan() {
        let ds = Dataset::from_csv_str("a\n5\n").unwrap();
        assert_eq!(ds.describe().data[1], vec!["nan"]);
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!([
            {"city": "Oslo", "temp": 4.5, "rain": null},
            {"city": "Lima", "temp": 19, "rain": "12mm"}
        ]);
        let ds = Dataset::from_json(&json).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.mean("temp").unwrap(), Some(11.75));
        assert_eq!(ds.coerce_numeric("rain").unwrap().values, vec![None, Some(12.0)]);
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let json = serde_json::json!([{"zeta": 1, "alpha": 2, "mid": 3}]);
        let ds = Dataset::from_json(&json).unwrap();
        assert_eq!(ds.columns(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(ds.numeric_columns(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_negative_nan_is_missing() {
        let ds = Dataset::from_csv_str("a,b\n-NaN,1\n-nan,2\n").unwrap();
        assert!(ds.column("a").unwrap().values.iter().all(Value::is_missing));
        assert_eq!(ds.preview(5).rows, vec![vec!["", "1"], vec!["", "2"]]);
    }

    #[test]
    fn test_describe_huge_values_stay_finite() {
        let ds = Dataset::from_csv_str("a\n1e307\n2e307\n").unwrap();
        let table = ds.describe();
        assert!(table.data.iter().all(|row| !row[0].contains("inf")));
        assert_eq!(table.data[2][0].parse::<f64>().unwrap(), 1e307);
        assert_eq!(table.data[6][0].parse::<f64>().unwrap(), 2e307);
    }

    #[test]
    fn test_from_json_rejects_nested() {
        let json = serde_json::json!([{"a": [1, 2]}]);
        assert!(Dataset::from_json(&json).is_err());
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(2.0), "2.0");
        assert_eq!(format_stat(1.5678), "1.57");
        assert_eq!(format_stat(f64::NAN), "nan");
        assert_eq!(format_stat(1e20).parse::<f64>().unwrap(), 1e20);
    }
}
