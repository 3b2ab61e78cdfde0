// =============================================================================
// Script Synthesis
// =============================================================================
//
// Turns validated rows plus a configuration into an R script. The layout
// style picks one of two emission strategies; both share the data-table
// emission in `frame`.

mod frame;
mod layered;
mod table;

pub use frame::{COLUMNS, DATA_VAR, PLOT_VAR};
pub use table::summary_measure;

use crate::config::{LayoutStyle, PlotConfig};
use crate::data::OutcomeRow;
use crate::error::{ForestError, ForestResult};
use crate::ir::{Script, Statement};
use crate::layout::PlotDimensions;
use crate::numeric::format_fixed;
use crate::printer::print_script;
use crate::scale::{resolve_range, AxisRange};

/// Everything a strategy needs for one synthesis call.
pub struct SynthesisContext<'a> {
    pub rows: &'a [OutcomeRow],
    pub config: &'a PlotConfig,
    pub dimensions: PlotDimensions,
    pub range: AxisRange,
    pub eligible_count: usize,
}

/// Packages the generated script loads for `style`.
pub fn required_packages(style: LayoutStyle) -> &'static [&'static str] {
    match style {
        LayoutStyle::Layered => layered::PACKAGES,
        LayoutStyle::Table => table::PACKAGES,
    }
}

/// Build the script IR for `rows`.
///
/// `rows` are emitted in order. Rows that are not plottable keep their label
/// slot but draw nothing.
#[tracing::instrument(skip(rows, config), fields(rows = rows.len(), style = %config.layout_style))]
pub fn synthesize_script(
    rows: &[OutcomeRow],
    config: &PlotConfig,
    dimensions: PlotDimensions,
) -> ForestResult<Script> {
    if rows.is_empty() {
        return Err(ForestError::empty_input("no rows to plot"));
    }

    let ctx = SynthesisContext {
        rows,
        config,
        dimensions,
        range: resolve_range(rows, config),
        eligible_count: rows.iter().filter(|r| r.is_plottable()).count(),
    };
    tracing::debug!(
        eligible = ctx.eligible_count,
        low = ctx.range.low,
        high = ctx.range.high,
        "synthesizing script"
    );

    let style = config.layout_style;
    let mut script = Script::new();
    script.push(Statement::comment("Forest plot generated by forestgen"));
    script.push(Statement::comment(format!(
        "Style: {}, size: {} x {} in",
        style,
        format_fixed(dimensions.width, 2).unwrap_or_default(),
        format_fixed(dimensions.height, 2).unwrap_or_default(),
    )));
    script.push(Statement::Blank);
    for package in required_packages(style) {
        script.push(Statement::Library((*package).to_string()));
    }
    script.push(Statement::Blank);

    let body = match style {
        LayoutStyle::Layered => layered::emit(&ctx),
        LayoutStyle::Table => table::emit(&ctx),
    };
    script.extend(body);
    Ok(script)
}

/// Synthesize and print the script text.
pub fn synthesize(
    rows: &[OutcomeRow],
    config: &PlotConfig,
    dimensions: PlotDimensions,
) -> ForestResult<String> {
    let script = synthesize_script(rows, config, dimensions)?;
    Ok(print_script(&script))
}
