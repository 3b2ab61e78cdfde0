// =============================================================================
// Script Printer
// =============================================================================
//
// This is the only place that decides how strings are quoted and numbers
// are written, so escaping bugs can only live here.

use std::fmt::Write as _;

use crate::ir::{CallLayout, Expr, Script, Statement};
use crate::numeric::{format_fixed, format_full};

const INDENT: usize = 2;

/// Quote `s` as a double-quoted R string literal.
///
/// Backslashes, quotes and control characters are escaped; anything outside
/// ASCII is written as a `\u{..}` escape so the script reads the same in any
/// session encoding. NUL cannot appear in an R string and is dropped.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => {}
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFFFF => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{{{:x}}}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Render a whole script, one statement per line, trailing newline included.
pub fn print_script(script: &Script) -> String {
    let mut out = String::new();
    for statement in &script.statements {
        print_statement(statement, &mut out);
        out.push('\n');
    }
    out
}

fn print_statement(statement: &Statement, out: &mut String) {
    match statement {
        Statement::Blank => {}
        Statement::Comment(text) => {
            // A newline would end the comment and leak the rest as code
            let flat = text.replace(['\n', '\r'], " ");
            out.push_str("# ");
            out.push_str(&flat);
        }
        Statement::Library(name) => {
            let _ = write!(out, "library({})", name);
        }
        Statement::Assign { target, value } => {
            out.push_str(target);
            out.push_str(" <- ");
            print_expr(value, 0, out);
        }
        Statement::Expr(expr) => print_expr(expr, 0, out),
    }
}

/// Render a single expression at indentation level zero.
pub fn print_expr_string(expr: &Expr) -> String {
    let mut out = String::new();
    print_expr(expr, 0, &mut out);
    out
}

fn print_number(text: Option<String>, out: &mut String) {
    match text {
        Some(t) => out.push_str(&t),
        None => out.push_str("NA_real_"),
    }
}

fn print_expr(expr: &Expr, indent: usize, out: &mut String) {
    match expr {
        Expr::Na => out.push_str("NA"),
        Expr::NaReal => out.push_str("NA_real_"),
        Expr::Bool(true) => out.push_str("TRUE"),
        Expr::Bool(false) => out.push_str("FALSE"),
        Expr::Num(v) => print_number(format_full(*v), out),
        Expr::Fixed(v, decimals) => print_number(format_fixed(*v, *decimals), out),
        Expr::Str(s) => out.push_str(&quote(s)),
        Expr::Symbol(s) => out.push_str(s),
        Expr::Vector(items) => {
            out.push_str("c(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(item, indent, out);
            }
            out.push(')');
        }
        Expr::Call { name, args, layout } => {
            out.push_str(name);
            out.push('(');
            match layout {
                CallLayout::Inline => {
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        if let Some(n) = &arg.name {
                            out.push_str(n);
                            out.push_str(" = ");
                        }
                        print_expr(&arg.value, indent, out);
                    }
                }
                CallLayout::Block if args.is_empty() => {}
                CallLayout::Block => {
                    let inner = indent + INDENT;
                    out.push('\n');
                    for (i, arg) in args.iter().enumerate() {
                        out.push_str(&" ".repeat(inner));
                        if let Some(n) = &arg.name {
                            out.push_str(n);
                            out.push_str(" = ");
                        }
                        print_expr(&arg.value, inner, out);
                        if i + 1 < args.len() {
                            out.push(',');
                        }
                        out.push('\n');
                    }
                    out.push_str(&" ".repeat(indent));
                }
            }
            out.push(')');
        }
        Expr::Binary { op, lhs, rhs } => {
            print_expr(lhs, indent, out);
            let _ = write!(out, " {} ", op);
            print_expr(rhs, indent, out);
        }
        Expr::Paren(inner) => {
            out.push('(');
            print_expr(inner, indent, out);
            out.push(')');
        }
        Expr::RowSubset { target, rows } => {
            print_expr(target, indent, out);
            out.push('[');
            print_expr(rows, indent, out);
            out.push_str(", , drop = FALSE]");
        }
        Expr::Chain(layers) => {
            let inner = indent + INDENT;
            for (i, layer) in layers.iter().enumerate() {
                if i > 0 {
                    out.push_str(" +\n");
                    out.push_str(&" ".repeat(inner));
                    print_expr(layer, inner, out);
                } else {
                    print_expr(layer, indent, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Arg;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), r#""plain""#);
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote("a\\b"), r#""a\\b""#);
        assert_eq!(quote("line1\nline2"), r#""line1\nline2""#);
        assert_eq!(quote("tab\there"), r#""tab\there""#);
        assert_eq!(quote("\u{7}"), r#""\u{7}""#);
        assert_eq!(quote("café"), r#""caf\u{e9}""#);
        assert_eq!(quote("🌲"), r#""\U{1f332}""#);
    }

    #[test]
    fn test_quote_drops_nul() {
        assert_eq!(quote("A\u{0}B"), r#""AB""#);
        assert_eq!(quote("\0"), "\"\"");
    }

    #[test]
    fn test_numbers_and_missing() {
        let e = Expr::Vector(vec![
            Expr::Num(1.5),
            Expr::Na,
            Expr::Num(f64::NAN),
            Expr::Fixed(0.384615, 4),
            Expr::Num(-2.0),
        ]);
        assert_eq!(print_expr_string(&e), "c(1.5, NA, NA_real_, 0.3846, -2)");
    }

    #[test]
    fn test_inline_call() {
        let e = Expr::call(
            "geom_vline",
            vec![
                Arg::named("xintercept", Expr::Num(1.0)),
                Arg::named("linetype", Expr::str("dashed")),
            ],
        );
        assert_eq!(print_expr_string(&e), r#"geom_vline(xintercept = 1, linetype = "dashed")"#);
    }

    #[test]
    fn test_block_call_and_chain() {
        let mut script = Script::new();
        script.push(Statement::Library("ggplot2".into()));
        script.push(Statement::Blank);
        script.push(Statement::assign(
            "p",
            Expr::Chain(vec![
                Expr::call("ggplot", vec![Arg::positional(Expr::sym("dat"))]),
                Expr::block_call(
                    "theme",
                    vec![
                        Arg::named("panel.grid.minor", Expr::call("element_blank", vec![])),
                        Arg::named("legend.position", Expr::str("none")),
                    ],
                ),
            ]),
        ));
        script.push(Statement::comment("done\nreally"));

        let expected = "library(ggplot2)\n\
                        \n\
                        p <- ggplot(dat) +\n  theme(\n    panel.grid.minor = element_blank(),\n    legend.position = \"none\"\n  )\n\
                        # done really\n";
        assert_eq!(print_script(&script), expected);
    }

    #[test]
    fn test_row_subset_and_binary() {
        let e = Expr::row_subset(Expr::sym("dat"), Expr::sym("dat$plotted"));
        assert_eq!(print_expr_string(&e), "dat[dat$plotted, , drop = FALSE]");

        let se = Expr::binary(
            "/",
            Expr::paren(Expr::binary("-", Expr::sym("hi"), Expr::sym("lo"))),
            Expr::paren(Expr::binary("*", Expr::Num(2.0), Expr::Num(1.96))),
        );
        assert_eq!(print_expr_string(&se), "(hi - lo) / (2 * 1.96)");
    }
}
