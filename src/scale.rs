// =============================================================================
// Axis Range and Scales
// =============================================================================

use crate::config::{AxisType, PlotConfig};
use crate::data::OutcomeRow;
use crate::ir::{Arg, Expr};
use crate::numeric::format_fixed;

/// Auto limits divide the minimum and multiply the maximum by this factor.
pub const PADDING_FACTOR: f64 = 1.3;

/// Decimals used when printing derived limits.
pub const AUTO_LIMIT_DECIMALS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    /// Pinned in the configuration.
    Explicit,
    /// Padded data extent.
    Auto,
    /// Padded data extent too narrow for fixed decimals; printed in full.
    AutoPrecise,
    /// No plottable data; fixed default.
    Fallback,
}

/// Resolved x axis limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub low: f64,
    pub high: f64,
    pub source: RangeSource,
}

impl AxisRange {
    /// Limits as a `c(low, high)` literal. Explicit limits print verbatim,
    /// derived ones with a fixed precision.
    pub fn to_expr(&self) -> Expr {
        match self.source {
            RangeSource::Explicit | RangeSource::AutoPrecise => {
                Expr::nums(&[self.low, self.high])
            }
            RangeSource::Auto | RangeSource::Fallback => Expr::Vector(vec![
                Expr::Fixed(self.low, AUTO_LIMIT_DECIMALS),
                Expr::Fixed(self.high, AUTO_LIMIT_DECIMALS),
            ]),
        }
    }
}

/// Min/max over every bound and estimate of the plottable rows.
pub fn data_extent(rows: &[OutcomeRow]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for (lo, v, hi) in rows.iter().filter_map(OutcomeRow::interval) {
        for val in [lo, v, hi] {
            min = min.min(val);
            max = max.max(val);
        }
    }

    if min == f64::INFINITY {
        None
    } else {
        Some((min, max))
    }
}

/// Multiplicative padding: `min / 1.3`, `max * 1.3`.
///
/// Not symmetric around zero: a negative minimum moves towards zero and a
/// negative maximum away from it.
pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    (min / PADDING_FACTOR, max * PADDING_FACTOR)
}

fn rounded(value: f64) -> Option<f64> {
    format_fixed(value, AUTO_LIMIT_DECIMALS)?.parse().ok()
}

/// Whether the fixed-decimal print of `low`/`high` still contains every
/// data point the exact limits contain.
fn fixed_print_brackets(low: f64, high: f64, min: f64, max: f64, log: bool) -> bool {
    let (Some(lo), Some(hi)) = (rounded(low), rounded(high)) else {
        return false;
    };
    let low_ok = low > min || lo <= min;
    let high_ok = high < max || hi >= max;
    low_ok && high_ok && lo < hi && !(log && lo <= 0.0)
}

/// Range used when there is nothing to plot.
pub fn fallback_range(axis: AxisType) -> (f64, f64) {
    if axis.is_log() {
        (0.1, 10.0)
    } else {
        (0.0, 1.0)
    }
}

/// Resolve the x axis limits for `rows` under `config`.
pub fn resolve_range(rows: &[OutcomeRow], config: &PlotConfig) -> AxisRange {
    if let Some(&(low, high)) = config.x_limits.fixed() {
        return AxisRange { low, high, source: RangeSource::Explicit };
    }

    let Some((min, max)) = data_extent(rows) else {
        let (low, high) = fallback_range(config.axis_type);
        tracing::debug!(low, high, "no plottable rows, using fallback x range");
        return AxisRange { low, high, source: RangeSource::Fallback };
    };

    if config.axis_type.is_log() && min <= 0.0 {
        tracing::warn!(
            min,
            "data minimum is not positive on a logarithmic axis; limits will not display"
        );
    }
    if min < 0.0 {
        tracing::debug!(min, "negative minimum: multiplicative padding shrinks towards zero");
    }

    let (low, high) = pad_range(min, max);
    let source = if fixed_print_brackets(low, high, min, max, config.axis_type.is_log()) {
        RangeSource::Auto
    } else {
        tracing::debug!(low, high, "x range too narrow for fixed decimals, printing in full");
        RangeSource::AutoPrecise
    };
    tracing::debug!(min, max, low, high, "derived x range");
    AxisRange { low, high, source }
}

/// Explicit tick positions, if configured.
pub fn breaks_expr(config: &PlotConfig) -> Option<Expr> {
    config.x_breaks.fixed().map(|b| Expr::nums(b))
}

/// The single x scale clause of a layered plot.
///
/// Linear axes get a plain continuous scale, log2/loge the generic transform
/// and log10 its dedicated scale. Limits and breaks are merged into the same
/// call so no second x scale ever replaces the transform.
pub fn x_scale_clause(config: &PlotConfig, range: &AxisRange) -> Expr {
    let mut args = Vec::new();
    let name = match config.axis_type {
        AxisType::Linear => "scale_x_continuous",
        AxisType::Log2 => {
            args.push(Arg::named("trans", Expr::str("log2")));
            "scale_x_continuous"
        }
        AxisType::Loge => {
            args.push(Arg::named("trans", Expr::str("log")));
            "scale_x_continuous"
        }
        AxisType::Log10 => "scale_x_log10",
    };
    args.push(Arg::named("limits", range.to_expr()));
    if let Some(breaks) = breaks_expr(config) {
        args.push(Arg::named("breaks", breaks));
    }
    Expr::call(name, args)
}
