// Data-table emission shared by both rendering styles

use crate::data::OutcomeRow;
use crate::ir::{Arg, Expr, Statement};

pub const DATA_VAR: &str = "dat";
pub const PLOT_VAR: &str = "plot_dat";

/// Column names of the emitted table, in order.
pub const COLUMNS: [&str; 6] = ["outcome", "value", "ci_lower", "ci_upper", "weight", "plotted"];

pub fn column(var: &str, name: &str) -> Expr {
    Expr::sym(format!("{}${}", var, name))
}

/// `dat <- data.frame(...)` with one entry per row in input order.
///
/// Missing numbers become the numeric missing sentinel. The `plotted`
/// column records which rows may be drawn as a point with an interval.
pub fn data_frame(rows: &[OutcomeRow]) -> Statement {
    let numeric = |get: fn(&OutcomeRow) -> Option<f64>| {
        Expr::Vector(rows.iter().map(|r| Expr::opt_num(get(r))).collect())
    };

    let args = vec![
        Arg::named(
            "outcome",
            Expr::Vector(rows.iter().map(|r| Expr::str(r.outcome.as_str())).collect()),
        ),
        Arg::named("value", numeric(|r| r.value)),
        Arg::named("ci_lower", numeric(|r| r.ci_lower)),
        Arg::named("ci_upper", numeric(|r| r.ci_upper)),
        Arg::named("weight", numeric(|r| r.weight)),
        Arg::named(
            "plotted",
            Expr::Vector(rows.iter().map(|r| Expr::Bool(r.is_plottable())).collect()),
        ),
        Arg::named("stringsAsFactors", Expr::Bool(false)),
    ];

    Statement::assign(DATA_VAR, Expr::block_call("data.frame", args))
}

/// Turn labels into a factor whose levels run bottom to top, so the first
/// row sits at the top of the axis. Duplicate labels share one level.
pub fn label_order() -> Statement {
    let labels = column(DATA_VAR, "outcome");
    let levels = Expr::call(
        "rev",
        vec![Arg::positional(Expr::call("unique", vec![Arg::positional(labels.clone())]))],
    );
    Statement::assign(
        &format!("{}$outcome", DATA_VAR),
        Expr::call(
            "factor",
            vec![Arg::positional(labels), Arg::named("levels", levels)],
        ),
    )
}

/// Filtered view holding only plottable rows. Its label column keeps every
/// factor level, so axis slots stay complete.
pub fn plot_view() -> Statement {
    Statement::assign(
        PLOT_VAR,
        Expr::row_subset(Expr::sym(DATA_VAR), column(DATA_VAR, "plotted")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Script;
    use crate::printer::print_script;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_data_frame_text() {
        let rows = vec![
            OutcomeRow::new("Trial \"A\"", 1.5, 1.1, 2.0).with_weight(10.0),
            OutcomeRow::label_only("Trial 3"),
        ];
        let mut script = Script::new();
        script.push(data_frame(&rows));
        script.push(label_order());
        script.push(plot_view());

        let expected = r#"dat <- data.frame(
  outcome = c("Trial \"A\"", "Trial 3"),
  value = c(1.5, NA_real_),
  ci_lower = c(1.1, NA_real_),
  ci_upper = c(2, NA_real_),
  weight = c(10, NA_real_),
  plotted = c(TRUE, FALSE),
  stringsAsFactors = FALSE
)
dat$outcome <- factor(dat$outcome, levels = rev(unique(dat$outcome)))
plot_dat <- dat[dat$plotted, , drop = FALSE]
"#;
        assert_eq!(print_script(&script), expected);
    }
}
