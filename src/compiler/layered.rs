// Layered-grammar strategy (ggplot2)

use super::frame::{self, PLOT_VAR};
use super::SynthesisContext;
use crate::ir::{Arg, Expr, Statement};
use crate::scale::x_scale_clause;

pub const PACKAGES: &[&str] = &["ggplot2"];

const PLOT_OBJ: &str = "p";
const LABEL_NUDGE: f64 = -0.25;
const LABEL_TEXT_SIZE: f64 = 3.3;
const REFERENCE_COLOR: &str = "grey50";

fn aes(args: Vec<(&str, &str)>) -> Expr {
    Expr::call(
        "aes",
        args.into_iter()
            .map(|(k, col)| Arg::named(k, Expr::sym(col)))
            .collect(),
    )
}

/// `plot_dat$label <- sprintf(...)`: estimate over its interval.
fn value_labels() -> Statement {
    let col = |name: &str| Arg::positional(frame::column(PLOT_VAR, name));
    Statement::assign(
        &format!("{}$label", PLOT_VAR),
        Expr::call(
            "sprintf",
            vec![
                Arg::positional(Expr::str("%.2f\n(%.2f\u{2013}%.2f)")),
                col("value"),
                col("ci_lower"),
                col("ci_upper"),
            ],
        ),
    )
}

fn theme(ctx: &SynthesisContext<'_>) -> Expr {
    let blank = || Expr::call("element_blank", vec![]);
    let grid_line = |width: f64, colour: &str| {
        Expr::call(
            "element_line",
            vec![
                Arg::named("linewidth", Expr::Num(width)),
                Arg::named("colour", Expr::str(colour)),
            ],
        )
    };

    let (major_x, minor) = if ctx.config.show_grid_lines {
        (grid_line(0.3, "grey80"), grid_line(0.2, "grey90"))
    } else {
        (blank(), blank())
    };

    let bottom = if ctx.config.show_values { 20.0 } else { 5.5 };
    let margin = |sides: Vec<(&str, f64)>| {
        Expr::call(
            "margin",
            sides
                .into_iter()
                .map(|(k, v)| Arg::named(k, Expr::Num(v)))
                .collect(),
        )
    };
    let text_margin = |sides: Vec<(&str, f64)>| {
        Expr::call("element_text", vec![Arg::named("margin", margin(sides))])
    };

    Expr::block_call(
        "theme",
        vec![
            Arg::named("panel.grid.major.y", blank()),
            Arg::named("panel.grid.major.x", major_x),
            Arg::named("panel.grid.minor", minor),
            Arg::named(
                "plot.margin",
                margin(vec![("t", 5.5), ("r", 10.0), ("b", bottom), ("l", 10.0)]),
            ),
            Arg::named("axis.title.x", text_margin(vec![("t", 8.0)])),
            Arg::named("axis.text.y", text_margin(vec![("r", 5.0)])),
        ],
    )
}

/// The main `p <- ggplot(...) + ...` chain.
fn plot_chain(ctx: &SynthesisContext<'_>) -> Expr {
    let config = ctx.config;
    let color = Expr::str(config.color());
    let mut layers = vec![Expr::call(
        "ggplot",
        vec![
            Arg::positional(Expr::sym(PLOT_VAR)),
            Arg::positional(aes(vec![("x", "value"), ("y", "outcome")])),
        ],
    )];

    if let Some(reference) = config.reference_line_value {
        layers.push(Expr::call(
            "geom_vline",
            vec![
                Arg::named("xintercept", Expr::Num(reference)),
                Arg::named("linetype", Expr::str("dashed")),
                Arg::named("color", Expr::str(REFERENCE_COLOR)),
            ],
        ));
    }

    layers.push(Expr::call(
        "geom_point",
        vec![
            Arg::named("size", Expr::Num(config.point_size)),
            Arg::named("color", color.clone()),
        ],
    ));
    layers.push(Expr::call(
        "geom_errorbar",
        vec![
            Arg::positional(aes(vec![("xmin", "ci_lower"), ("xmax", "ci_upper")])),
            Arg::named("width", Expr::Num(0.0)),
            Arg::named("linewidth", Expr::Num(0.7)),
            Arg::named("color", color),
        ],
    ));
    layers.push(x_scale_clause(config, &ctx.range));
    layers.push(Expr::call(
        "scale_y_discrete",
        vec![Arg::named("drop", Expr::Bool(false))],
    ));

    if config.show_values {
        layers.push(Expr::call(
            "geom_text",
            vec![
                Arg::positional(aes(vec![("label", "label")])),
                Arg::named(
                    "position",
                    Expr::call(
                        "position_nudge",
                        vec![Arg::named("y", Expr::Num(LABEL_NUDGE))],
                    ),
                ),
                Arg::named("vjust", Expr::Num(1.0)),
                Arg::named("size", Expr::Num(LABEL_TEXT_SIZE)),
            ],
        ));
    }

    layers.push(Expr::call(
        "xlab",
        vec![Arg::positional(Expr::str(config.x_axis_title()))],
    ));
    layers.push(Expr::call(
        "ylab",
        vec![Arg::positional(Expr::str(config.y_axis_title()))],
    ));
    layers.push(Expr::call(
        "coord_cartesian",
        vec![Arg::named("clip", Expr::str("off"))],
    ));
    layers.push(Expr::call(
        "theme_bw",
        vec![Arg::named("base_size", Expr::Num(13.0))],
    ));
    layers.push(theme(ctx));

    Expr::Chain(layers)
}

pub fn emit(ctx: &SynthesisContext<'_>) -> Vec<Statement> {
    let mut out = vec![
        frame::data_frame(ctx.rows),
        Statement::Blank,
        Statement::comment("Reverse order for top-to-bottom display"),
        frame::label_order(),
        frame::plot_view(),
        Statement::Blank,
    ];

    if ctx.config.show_values {
        out.push(value_labels());
        out.push(Statement::Blank);
    }

    out.push(Statement::assign(PLOT_OBJ, plot_chain(ctx)));

    if let Some(title) = ctx.config.full_title() {
        out.push(Statement::Blank);
        out.push(Statement::assign(
            PLOT_OBJ,
            Expr::binary(
                "+",
                Expr::sym(PLOT_OBJ),
                Expr::call("ggtitle", vec![Arg::positional(Expr::str(title))]),
            ),
        ));
    }

    out.push(Statement::Blank);
    out.push(Statement::Expr(Expr::call(
        "print",
        vec![Arg::positional(Expr::sym(PLOT_OBJ))],
    )));
    out
}
