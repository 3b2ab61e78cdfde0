// =============================================================================
// Validation
// =============================================================================
//
// Errors block a row's numeric data from being drawn; warnings never block
// anything. Messages name the 1-based row index so they can be shown to the
// user next to the rejected rows.

use serde::{Deserialize, Serialize};

use crate::data::{Cell, OutcomeRow, RawRow};

/// Which numeric fields a row must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Only the outcome label is required; numeric fields are individually
    /// optional and incomplete rows are kept for labeling.
    #[default]
    Lenient,
    /// Value and both confidence bounds are required as well.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_messages(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Outcome of validating one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValidation {
    pub result: ValidationResult,
    /// No numeric-field errors for value or the confidence bounds. Whether
    /// the row is drawn is still decided by `OutcomeRow::interval`.
    pub numeric_ok: bool,
}

#[derive(Debug, Clone, Copy)]
enum NumericField {
    Value,
    CiLower,
    CiUpper,
}

impl NumericField {
    fn label(self) -> &'static str {
        match self {
            NumericField::Value => "Value",
            NumericField::CiLower => "Lower CI",
            NumericField::CiUpper => "Upper CI",
        }
    }
}

/// Validate a single row. `index` is 0-based; messages use `index + 1`.
pub fn validate_row(row: &RawRow, index: usize, policy: ValidationPolicy) -> RowValidation {
    let row_no = index + 1;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut numeric_errors = false;

    let has_outcome = row.outcome.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_outcome {
        errors.push(format!("Row {}: Outcome name is required", row_no));
    }

    let mut read = |field: NumericField, cell: &Option<Cell>| -> Option<f64> {
        match cell.as_ref().filter(|c| !c.is_blank()) {
            None => {
                if policy == ValidationPolicy::Strict {
                    errors.push(format!("Row {}: {} is required", row_no, field.label()));
                    numeric_errors = true;
                }
                None
            }
            Some(cell) => {
                let parsed = cell.as_number();
                if parsed.is_none() {
                    errors.push(format!("Row {}: {} must be a number", row_no, field.label()));
                    numeric_errors = true;
                }
                parsed
            }
        }
    };

    let _value = read(NumericField::Value, &row.value);
    let lower = read(NumericField::CiLower, &row.ci_lower);
    let upper = read(NumericField::CiUpper, &row.ci_upper);

    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo > hi {
            errors.push(format!(
                "Row {}: Lower CI cannot be greater than Upper CI",
                row_no
            ));
            numeric_errors = true;
        }
    }

    if let Some(cell) = row.weight.as_ref().filter(|c| !c.is_blank()) {
        match cell.as_number() {
            None => errors.push(format!("Row {}: Weight must be a number", row_no)),
            Some(w) if w < 0.0 => warnings.push(format!("Row {}: Weight is negative", row_no)),
            Some(_) => {}
        }
    }

    RowValidation {
        result: ValidationResult::from_messages(errors, warnings),
        numeric_ok: !numeric_errors,
    }
}

/// A validated dataset ready for layout estimation and synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDataset {
    /// Every labeled row, in input order. Unparsable numeric cells are
    /// cleared to `None`.
    pub rows: Vec<OutcomeRow>,
    /// Parallel to `rows`: no numeric-field errors.
    pub numeric_ok: Vec<bool>,
    /// Aggregate over all input rows, including unlabeled ones.
    pub result: ValidationResult,
}

impl ValidatedDataset {
    /// Rows that will be drawn as a point with an interval: no numeric
    /// errors and a complete, ordered interval.
    pub fn eligible_count(&self) -> usize {
        self.rows
            .iter()
            .zip(&self.numeric_ok)
            .filter(|(row, ok)| **ok && row.is_plottable())
            .count()
    }

    /// Rows with errors have their numeric data withheld so that nothing
    /// downstream can draw them.
    pub fn plot_rows(&self) -> Vec<OutcomeRow> {
        self.rows
            .iter()
            .zip(&self.numeric_ok)
            .map(|(row, &ok)| {
                if ok {
                    row.clone()
                } else {
                    OutcomeRow {
                        weight: row.weight,
                        ..OutcomeRow::label_only(row.outcome.clone())
                    }
                }
            })
            .collect()
    }
}

/// Validate every row in order. An empty dataset is itself an error and no
/// row validation is attempted.
pub fn validate_dataset(rows: &[RawRow], policy: ValidationPolicy) -> ValidatedDataset {
    if rows.is_empty() {
        return ValidatedDataset {
            rows: Vec::new(),
            numeric_ok: Vec::new(),
            result: ValidationResult::from_messages(vec!["Dataset is empty".to_string()], Vec::new()),
        };
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut out_rows = Vec::with_capacity(rows.len());
    let mut numeric_ok = Vec::with_capacity(rows.len());

    for (index, raw) in rows.iter().enumerate() {
        let checked = validate_row(raw, index, policy);
        errors.extend(checked.result.errors);
        warnings.extend(checked.result.warnings);

        let Some(label) = raw.outcome.as_deref().filter(|s| !s.trim().is_empty()) else {
            tracing::debug!(row = index + 1, "dropping unlabeled row");
            continue;
        };

        out_rows.push(OutcomeRow {
            outcome: label.trim().to_string(),
            value: raw.value.as_ref().and_then(Cell::as_number),
            ci_lower: raw.ci_lower.as_ref().and_then(Cell::as_number),
            ci_upper: raw.ci_upper.as_ref().and_then(Cell::as_number),
            weight: raw.weight.as_ref().and_then(Cell::as_number),
        });
        numeric_ok.push(checked.numeric_ok);
    }

    tracing::debug!(
        rows = rows.len(),
        labeled = out_rows.len(),
        errors = errors.len(),
        warnings = warnings.len(),
        "validated dataset"
    );

    ValidatedDataset {
        rows: out_rows,
        numeric_ok,
        result: ValidationResult::from_messages(errors, warnings),
    }
}
