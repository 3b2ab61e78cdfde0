// =============================================================================
// Numeric Parsing and Formatting
// =============================================================================
//
// Shared by ingestion, validation and the script printer.

/// Parse a number that may use either `.` or `,` as decimal separator.
///
/// Surrounding whitespace is ignored and the first comma is treated as the
/// decimal point (`"0,85"` reads as `0.85`). Returns `None` for blank text,
/// unparsable text and non-finite results.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replacen(',', ".", 1);
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest representation that reads back to the same `f64`.
///
/// Non-finite values have no literal form and yield `None`; callers emit the
/// runtime's missing-value sentinel instead.
pub fn format_full(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    // "-0" reads back fine but looks odd in a generated table
    let value = if value == 0.0 { 0.0 } else { value };
    Some(format!("{}", value))
}

/// Fixed number of decimals, used for derived (auto) axis limits.
pub fn format_fixed(value: f64, decimals: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    Some(format!("{:.*}", decimals, value))
}
