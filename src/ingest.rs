// =============================================================================
// Data Ingestion
// =============================================================================
//
// CSV and JSON readers that map synonym column names onto `RawRow`s. Cells
// are kept as text; validation decides what is usable.

use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::data::{Cell, RawRow};
use crate::error::{ForestError, ForestResult};
use crate::validate::ValidationPolicy;

/// Rows read from a source plus the problems found while mapping them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedData {
    #[serde(skip)]
    pub rows: Vec<RawRow>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Row field a source column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Outcome,
    Value,
    CiLower,
    CiUpper,
    Weight,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::Outcome,
        Field::Value,
        Field::CiLower,
        Field::CiUpper,
        Field::Weight,
    ];

    /// Accepted header names, already normalized.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Outcome => &["outcome", "study", "study_name", "name"],
            Field::Value => &["value", "effect", "effect_size", "es"],
            Field::CiLower => &["ci_lower", "lower", "cilower", "lower_ci"],
            Field::CiUpper => &["ci_upper", "upper", "ciupper", "upper_ci"],
            Field::Weight => &["weight", "w"],
        }
    }

    pub fn from_header(header: &str) -> Option<Field> {
        let key = normalize_header(header);
        Field::ALL
            .into_iter()
            .find(|f| f.synonyms().contains(&key.as_str()))
    }

    fn column_hint(self) -> &'static str {
        match self {
            Field::Outcome => "\"outcome\" or \"study\"",
            Field::Value => "\"value\" or \"effect\"",
            Field::CiLower => "\"ci_lower\" or \"lower\"",
            Field::CiUpper => "\"ci_upper\" or \"upper\"",
            Field::Weight => "\"weight\"",
        }
    }
}

/// Lowercase, trim and collapse inner whitespace runs to `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Column index per field; the first matching header wins.
#[derive(Debug, Default)]
struct ColumnMap {
    indices: [Option<usize>; 5],
}

impl ColumnMap {
    fn from_headers<S: AsRef<str>>(headers: &[S], warnings: &mut Vec<String>) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            match Field::from_header(header) {
                Some(field) => {
                    let slot = &mut map.indices[field as usize];
                    if slot.is_some() {
                        warnings.push(format!("Duplicate column '{}' ignored", header.trim()));
                    } else {
                        *slot = Some(idx);
                    }
                }
                None if header.trim().is_empty() => {}
                None => warnings.push(format!("Ignoring unrecognized column '{}'", header.trim())),
            }
        }
        map
    }

    fn get(&self, field: Field) -> Option<usize> {
        self.indices[field as usize]
    }
}

/// Fail when a column the policy needs is absent.
fn require_fields(present: impl Fn(Field) -> bool, policy: ValidationPolicy) -> ForestResult<()> {
    let required: &[Field] = match policy {
        ValidationPolicy::Lenient => &[Field::Outcome],
        ValidationPolicy::Strict => &[Field::Outcome, Field::Value, Field::CiLower, Field::CiUpper],
    };
    let missing: Vec<String> = required
        .iter()
        .filter(|f| !present(**f))
        .map(|f| format!("Missing {} column", f.column_hint()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForestError::ingest(missing.join("; ")))
    }
}

fn text_cell(text: Option<&str>) -> Option<Cell> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Cell::Text(t.to_string()))
}

/// Parse CSV text with a header row.
pub fn parse_csv<R: Read>(reader: R, policy: ValidationPolicy) -> ForestResult<ParsedData> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .context("failed to read CSV header")?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ForestError::empty_input("CSV file is empty"));
    }

    let mut parsed = ParsedData::default();
    let columns = ColumnMap::from_headers(&headers.iter().collect::<Vec<_>>(), &mut parsed.warnings);
    require_fields(|f| columns.get(f).is_some(), policy)?;

    for (i, record) in csv.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV record {}", i + 1))?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }
        let cell = |field: Field| columns.get(field).and_then(|idx| record.get(idx));
        parsed.rows.push(RawRow {
            outcome: cell(Field::Outcome)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            value: text_cell(cell(Field::Value)),
            ci_lower: text_cell(cell(Field::CiLower)),
            ci_upper: text_cell(cell(Field::CiUpper)),
            weight: text_cell(cell(Field::Weight)),
        });
    }

    tracing::debug!(rows = parsed.rows.len(), "parsed CSV input");
    Ok(parsed)
}

fn json_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Value of `field` in `obj`, trying synonyms in order of preference.
fn json_field(obj: &Map<String, Value>, field: Field) -> Option<&Value> {
    field.synonyms().iter().find_map(|syn| {
        obj.iter()
            .find(|(key, _)| normalize_header(key) == *syn)
            .map(|(_, v)| v)
    })
}

/// Parse a JSON array of row objects. Keys go through the same synonym
/// mapping as CSV headers; each object may use its own spelling.
pub fn parse_json(text: &str, policy: ValidationPolicy) -> ForestResult<ParsedData> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ForestError::ingest(format!("invalid JSON input: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(ForestError::ingest("JSON input must be an array of row objects"));
    };
    if items.is_empty() {
        return Err(ForestError::empty_input("JSON input is empty"));
    }

    let objects: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
    require_fields(
        |f| objects.iter().any(|obj| json_field(obj, f).is_some()),
        policy,
    )?;

    let mut parsed = ParsedData::default();
    let mut unknown: Vec<&str> = Vec::new();
    for key in objects.iter().flat_map(|obj| obj.keys()) {
        if Field::from_header(key).is_none() && !unknown.contains(&key.as_str()) {
            unknown.push(key);
        }
    }
    parsed.warnings.extend(
        unknown
            .into_iter()
            .map(|k| format!("Ignoring unrecognized column '{}'", k)),
    );

    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            parsed.errors.push(format!("Row {}: expected an object", i + 1));
            continue;
        };
        let mut cell = |field: Field, name: &str| match json_field(obj, field).map(Cell::from_json) {
            Some(Ok(c)) => c.filter(|c| !c.is_blank()),
            Some(Err(e)) => {
                parsed.errors.push(format!("Row {}: {} {}", i + 1, name, e));
                None
            }
            None => None,
        };
        let row = RawRow {
            outcome: json_field(obj, Field::Outcome).and_then(json_label),
            value: cell(Field::Value, "Value"),
            ci_lower: cell(Field::CiLower, "Lower CI"),
            ci_upper: cell(Field::CiUpper, "Upper CI"),
            weight: cell(Field::Weight, "Weight"),
        };
        parsed.rows.push(row);
    }

    tracing::debug!(rows = parsed.rows.len(), "parsed JSON input");
    Ok(parsed)
}

/// Read a file, choosing the format from its extension (`.json` or CSV).
pub fn read_path(path: &Path, policy: ValidationPolicy) -> ForestResult<ParsedData> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        parse_json(&text, policy)
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        parse_csv(file, policy)
    }
}

/// Read CSV from standard input.
pub fn read_csv_from_stdin(policy: ValidationPolicy) -> ForestResult<ParsedData> {
    parse_csv(io::stdin().lock(), policy)
}
