// =============================================================================
// Row Types
// =============================================================================

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric::parse_number;

/// One input cell before validation: either already numeric or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Blank text counts as an absent cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }

    /// Finite numeric reading of the cell, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Number(_) => None,
            Cell::Text(s) => parse_number(s),
        }
    }

    pub fn from_json(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(|v| Some(Cell::Number(v)))
                .ok_or_else(|| anyhow!("number '{}' is out of range", n)),
            Value::String(s) => Ok(Some(Cell::Text(s.clone()))),
            Value::Bool(b) => Ok(Some(Cell::Text(b.to_string()))),
            _ => Err(anyhow!("unsupported value type: {}", value)),
        }
    }
}

/// A data row as delivered by ingestion, before validation.
///
/// Every field may be absent; numeric fields may hold text that does not
/// parse. The validator decides what that means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub outcome: Option<String>,
    pub value: Option<Cell>,
    pub ci_lower: Option<Cell>,
    pub ci_upper: Option<Cell>,
    pub weight: Option<Cell>,
}

impl RawRow {
    pub fn from_outcome(row: &OutcomeRow) -> Self {
        Self {
            outcome: Some(row.outcome.clone()),
            value: row.value.map(Cell::Number),
            ci_lower: row.ci_lower.map(Cell::Number),
            ci_upper: row.ci_upper.map(Cell::Number),
            weight: row.weight.map(Cell::Number),
        }
    }
}

/// Canonical row shape: a required label and optional numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRow {
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl OutcomeRow {
    pub fn new(outcome: impl Into<String>, value: f64, ci_lower: f64, ci_upper: f64) -> Self {
        Self {
            outcome: outcome.into(),
            value: Some(value),
            ci_lower: Some(ci_lower),
            ci_upper: Some(ci_upper),
            weight: None,
        }
    }

    /// A row that only carries its label.
    pub fn label_only(outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            value: None,
            ci_lower: None,
            ci_upper: None,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// `(ci_lower, value, ci_upper)` when the row can be drawn as a point
    /// with an interval: all three present, finite and ordered.
    pub fn interval(&self) -> Option<(f64, f64, f64)> {
        let (lo, v, hi) = (self.ci_lower?, self.value?, self.ci_upper?);
        if !(lo.is_finite() && v.is_finite() && hi.is_finite()) || lo > hi {
            return None;
        }
        Some((lo, v, hi))
    }

    pub fn is_plottable(&self) -> bool {
        self.interval().is_some()
    }
}
