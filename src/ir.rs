// =============================================================================
// Script IR
// =============================================================================
//
// Generated scripts are assembled as a list of statements over a small
// expression tree and turned into text by `printer::print_script`. Nothing
// outside the printer quotes strings or formats numbers.

/// Whether a call prints its arguments on one line or one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallLayout {
    Inline,
    Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical missing value.
    Na,
    /// Numeric missing value; keeps all-missing columns numeric.
    NaReal,
    Bool(bool),
    /// Number printed at full precision.
    Num(f64),
    /// Number printed with a fixed count of decimals.
    Fixed(f64, usize),
    Str(String),
    /// Trusted identifier or column reference (`dat$value`). Never built
    /// from user input.
    Symbol(String),
    /// `c(...)`
    Vector(Vec<Expr>),
    Call {
        name: String,
        args: Vec<Arg>,
        layout: CallLayout,
    },
    Binary {
        op: &'static str,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// `target[rows, , drop = FALSE]`
    RowSubset {
        target: Box<Expr>,
        rows: Box<Expr>,
    },
    /// Layers joined with `+`, one per line.
    Chain(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn named(name: &str, value: Expr) -> Self {
        Self {
            name: Some(name.to_string()),
            value,
        }
    }

    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }
}

impl Expr {
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    pub fn sym(s: impl Into<String>) -> Self {
        Expr::Symbol(s.into())
    }

    /// Present numbers print in full, absent ones as the missing sentinel.
    pub fn opt_num(v: Option<f64>) -> Self {
        match v {
            Some(n) if n.is_finite() => Expr::Num(n),
            _ => Expr::NaReal,
        }
    }

    pub fn nums(values: &[f64]) -> Self {
        Expr::Vector(values.iter().map(|&v| Expr::Num(v)).collect())
    }

    pub fn call(name: &str, args: Vec<Arg>) -> Self {
        Expr::Call {
            name: name.to_string(),
            args,
            layout: CallLayout::Inline,
        }
    }

    pub fn block_call(name: &str, args: Vec<Arg>) -> Self {
        Expr::Call {
            name: name.to_string(),
            args,
            layout: CallLayout::Block,
        }
    }

    pub fn binary(op: &'static str, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn paren(inner: Expr) -> Self {
        Expr::Paren(Box::new(inner))
    }

    pub fn row_subset(target: Expr, rows: Expr) -> Self {
        Expr::RowSubset {
            target: Box::new(target),
            rows: Box::new(rows),
        }
    }

    /// Name of the called function, if this is a call.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expr::Call { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Value of a named argument, if this is a call that has one.
    pub fn arg(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Call { args, .. } => args
                .iter()
                .find(|a| a.name.as_deref() == Some(key))
                .map(|a| &a.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Blank,
    Comment(String),
    Library(String),
    Assign { target: String, value: Expr },
    Expr(Expr),
}

impl Statement {
    pub fn assign(target: &str, value: Expr) -> Self {
        Statement::Assign {
            target: target.to_string(),
            value,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Statement::Comment(text.into())
    }
}

/// An ordered, ready-to-print script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    /// Packages loaded with `library(...)`, in order.
    pub fn libraries(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Library(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Value assigned to `target`, last assignment wins.
    pub fn assignment(&self, target: &str) -> Option<&Expr> {
        self.statements.iter().rev().find_map(|s| match s {
            Statement::Assign { target: t, value } if t == target => Some(value),
            _ => None,
        })
    }

    /// Every call reachable from the script's statements, depth-first.
    pub fn calls(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        for statement in &self.statements {
            match statement {
                Statement::Assign { value, .. } | Statement::Expr(value) => {
                    collect_calls(value, &mut out)
                }
                _ => {}
            }
        }
        out
    }

    /// First call named `name` anywhere in the script.
    pub fn find_call(&self, name: &str) -> Option<&Expr> {
        self.calls().into_iter().find(|c| c.call_name() == Some(name))
    }
}

fn collect_calls<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::Call { args, .. } => {
            out.push(expr);
            for a in args {
                collect_calls(&a.value, out);
            }
        }
        Expr::Vector(items) | Expr::Chain(items) => {
            for item in items {
                collect_calls(item, out);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_calls(lhs, out);
            collect_calls(rhs, out);
        }
        Expr::Paren(inner) => collect_calls(inner, out),
        Expr::RowSubset { target, rows } => {
            collect_calls(target, out);
            collect_calls(rows, out);
        }
        _ => {}
    }
}
