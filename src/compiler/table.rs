// Table-style strategy (meta::forest)
//
// One composite `forest()` call draws the outcome column, the plot and the
// numeric side columns. Ratio measures are summarised on the natural log
// scale and back-transformed by the renderer, so the configured log base
// only matters to the layered style.

use super::frame::{self, DATA_VAR};
use super::SynthesisContext;
use crate::config::{EffectMeasure, PlotConfig};
use crate::ir::{Arg, Expr, Statement};
use crate::scale::breaks_expr;

pub const PACKAGES: &[&str] = &["meta", "grid"];

const META_OBJ: &str = "m";
/// Two-sided 95% normal quantile used to recover standard errors.
const Z_95: f64 = 1.96;

/// Summary measure code handed to `metagen`.
///
/// Log axes need a ratio measure and linear axes a difference measure; a
/// configured measure of the wrong kind is replaced.
pub fn summary_measure(config: &PlotConfig) -> &'static str {
    let log = config.axis_type.is_log();
    match config.effect_measure {
        Some(m) if m.is_ratio() == log => m.code(),
        Some(m) => {
            let fallback = if log { EffectMeasure::RR } else { EffectMeasure::MD };
            tracing::warn!(
                configured = m.code(),
                used = fallback.code(),
                "effect measure does not match the axis type"
            );
            fallback.code()
        }
        None if log => EffectMeasure::RR.code(),
        None => EffectMeasure::MD.code(),
    }
}

fn strs(items: &[&str]) -> Expr {
    Expr::Vector(items.iter().map(|s| Expr::str(*s)).collect())
}

/// `te`/`se` columns; withheld rows get `NA` so nothing is drawn for them.
fn effect_columns(log: bool) -> Vec<Statement> {
    let col = |name: &str| frame::column(DATA_VAR, name);
    let on_scale = |e: Expr| {
        if log {
            Expr::call("log", vec![Arg::positional(e)])
        } else {
            e
        }
    };
    let only_plotted = |e: Expr| {
        Expr::call(
            "ifelse",
            vec![
                Arg::positional(col("plotted")),
                Arg::positional(e),
                Arg::positional(Expr::Na),
            ],
        )
    };

    let te = only_plotted(on_scale(col("value")));
    let se = only_plotted(Expr::binary(
        "/",
        Expr::paren(Expr::binary(
            "-",
            on_scale(col("ci_upper")),
            on_scale(col("ci_lower")),
        )),
        Expr::paren(Expr::binary("*", Expr::Num(2.0), Expr::Num(Z_95))),
    ));

    vec![
        Statement::assign(&format!("{}$te", DATA_VAR), te),
        Statement::assign(&format!("{}$se", DATA_VAR), se),
    ]
}

/// Both pooled estimates are always computed so the summary diamond is
/// drawn; `showMetadata` only controls the test and heterogeneity text.
fn metagen(config: &PlotConfig) -> Expr {
    Expr::block_call(
        "metagen",
        vec![
            Arg::named("TE", Expr::sym("te")),
            Arg::named("seTE", Expr::sym("se")),
            Arg::named("studlab", Expr::sym("outcome")),
            Arg::named("data", Expr::sym(DATA_VAR)),
            Arg::named("sm", Expr::str(summary_measure(config))),
            Arg::named("common", Expr::Bool(true)),
            Arg::named("random", Expr::Bool(true)),
        ],
    )
}

/// Left/right side columns. With weights shown, the estimate and interval
/// move to the left and the weight column takes the right side.
fn side_columns(config: &PlotConfig) -> Vec<Arg> {
    let label = config.y_axis_title();
    let estimate = config.effect_measure.map_or("Estimate", |m| m.code());

    let (left, left_labs, right, right_labs): (Vec<&str>, Vec<&str>, Vec<&str>, Vec<&str>) =
        match (config.show_weights, config.show_values) {
            (false, true) => (
                vec!["studlab"],
                vec![label.as_str()],
                vec!["effect", "ci"],
                vec![estimate, "95% CI"],
            ),
            (false, false) => (vec!["studlab"], vec![label.as_str()], vec![], vec![]),
            (true, true) => (
                vec!["studlab", "effect", "ci"],
                vec![label.as_str(), estimate, "95% CI"],
                vec!["weight"],
                vec!["Weight"],
            ),
            (true, false) => (vec!["studlab"], vec![label.as_str()], vec!["weight"], vec!["Weight"]),
        };

    let mut args = vec![
        Arg::named("leftcols", strs(&left)),
        Arg::named("leftlabs", strs(&left_labs)),
    ];
    if right.is_empty() {
        args.push(Arg::named("rightcols", Expr::Bool(false)));
    } else {
        args.push(Arg::named("rightcols", strs(&right)));
        args.push(Arg::named("rightlabs", strs(&right_labs)));
    }
    args
}

fn forest_call(ctx: &SynthesisContext<'_>) -> Expr {
    let config = ctx.config;
    let color = Expr::str(config.color());
    let flag = |b: bool| Expr::Bool(b);

    let mut args = vec![
        Arg::positional(Expr::sym(META_OBJ)),
        Arg::named("xlab", Expr::str(config.x_axis_title())),
    ];
    if let Some(title) = config.full_title() {
        args.push(Arg::named("smlab", Expr::str(title)));
    }
    args.extend(side_columns(config));
    args.push(Arg::named("xlim", ctx.range.to_expr()));
    if let Some(at) = breaks_expr(config) {
        args.push(Arg::named("at", at));
    }
    args.push(Arg::named(
        "ref",
        config.reference_line_value.map_or(Expr::Na, Expr::Num),
    ));
    args.extend([
        Arg::named("digits", Expr::Num(2.0)),
        Arg::named("col.square", color.clone()),
        Arg::named("col.square.lines", color),
        Arg::named("col.diamond", Expr::str("blue")),
        Arg::named("squaresize", Expr::Num(0.8 * config.point_size / 3.0)),
        Arg::named("test.overall", flag(config.show_metadata)),
        Arg::named("print.I2", flag(config.show_metadata)),
        Arg::named("hetstat", flag(config.show_metadata)),
        Arg::named("spacing", Expr::Num(1.5)),
        Arg::named("just.studlab", Expr::str("left")),
        Arg::named("just.addcols", Expr::str("center")),
        Arg::named("fontsize", Expr::Num(10.0)),
    ]);

    Expr::block_call("forest", args)
}

/// Page with only the title, used when nothing can be drawn.
fn empty_page(config: &PlotConfig) -> Vec<Statement> {
    let mut out = vec![Statement::Expr(Expr::call("plot.new", vec![]))];
    if let Some(title) = config.full_title() {
        out.push(Statement::Expr(Expr::call(
            "title",
            vec![Arg::named("main", Expr::str(title))],
        )));
    }
    out
}

pub fn emit(ctx: &SynthesisContext<'_>) -> Vec<Statement> {
    let mut out = vec![frame::data_frame(ctx.rows), Statement::Blank];

    if ctx.eligible_count == 0 {
        out.push(Statement::comment("No plottable rows"));
        out.extend(empty_page(ctx.config));
        return out;
    }

    let log = ctx.config.axis_type.is_log();
    out.push(Statement::comment(if log {
        "Standard errors from 95% confidence intervals on the log scale"
    } else {
        "Standard errors from 95% confidence intervals"
    }));
    out.extend(effect_columns(log));
    out.push(Statement::Blank);
    out.push(Statement::assign(META_OBJ, metagen(ctx.config)));
    out.push(Statement::Blank);
    out.push(Statement::Expr(forest_call(ctx)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisType;

    #[test]
    fn test_summary_measure() {
        let mut config = PlotConfig::default();
        assert_eq!(summary_measure(&config), "MD");

        config.axis_type = AxisType::Log10;
        assert_eq!(summary_measure(&config), "RR");

        config.effect_measure = Some(EffectMeasure::HR);
        assert_eq!(summary_measure(&config), "HR");

        config.effect_measure = Some(EffectMeasure::SMD);
        assert_eq!(summary_measure(&config), "RR");

        config.axis_type = AxisType::Linear;
        assert_eq!(summary_measure(&config), "SMD");
    }

    #[test]
    fn test_pooling_independent_of_metadata() {
        for show_metadata in [false, true] {
            let config = PlotConfig { show_metadata, ..PlotConfig::default() };
            let call = metagen(&config);
            assert_eq!(call.arg("common"), Some(&Expr::Bool(true)));
            assert_eq!(call.arg("random"), Some(&Expr::Bool(true)));
        }

        let config = PlotConfig::default();
        let rows = vec![crate::data::OutcomeRow::new("A", 1.2, 0.9, 1.6)];
        let ctx = SynthesisContext {
            rows: &rows,
            config: &config,
            dimensions: crate::layout::estimate(1, &config),
            range: crate::scale::resolve_range(&rows, &config),
            eligible_count: 1,
        };
        let forest = forest_call(&ctx);
        assert_eq!(forest.arg("test.overall"), Some(&Expr::Bool(false)));
        assert_eq!(forest.arg("print.I2"), Some(&Expr::Bool(false)));
        assert_eq!(forest.arg("col.diamond"), Some(&Expr::str("blue")));
    }
}
