// Reader for the `data.frame(...)` table embedded in generated scripts

use super::lexer::{identifier, number_literal, string_literal, ws};
use crate::compiler::{COLUMNS, DATA_VAR};
use crate::data::OutcomeRow;
use crate::error::{ForestError, ForestResult};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, value},
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};

/// One element of a `c(...)` vector
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Missing,
}

/// A named column of the table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Literal>,
}

fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(string_literal, Literal::Str),
        // Longest sentinel first so `NA` does not swallow the prefix
        value(Literal::Missing, tag("NA_real_")),
        value(Literal::Missing, tag("NA_character_")),
        value(Literal::Missing, tag("NA")),
        value(Literal::Bool(true), tag("TRUE")),
        value(Literal::Bool(false), tag("FALSE")),
        map(number_literal, Literal::Num),
    ))(input)
}

/// `c(a, b, ...)` or a bare scalar
fn parse_vector(input: &str) -> IResult<&str, Vec<Literal>> {
    alt((
        delimited(
            ws(tag("c(")),
            separated_list0(ws(char(',')), ws(parse_literal)),
            ws(char(')')),
        ),
        map(ws(parse_literal), |lit| vec![lit]),
    ))(input)
}

fn parse_column(input: &str) -> IResult<&str, Column> {
    map(
        separated_pair(ws(identifier), ws(char('=')), parse_vector),
        |(name, values)| Column { name, values },
    )(input)
}

/// Parse `data.frame(name = c(...), ...)`
pub fn parse_data_frame(input: &str) -> IResult<&str, Vec<Column>> {
    delimited(
        ws(tag("data.frame(")),
        separated_list0(ws(char(',')), parse_column),
        ws(char(')')),
    )(input)
}

/// Parse `dat <- data.frame(...)`
pub fn parse_frame_assignment(input: &str) -> IResult<&str, Vec<Column>> {
    let (input, _) = ws(tag(DATA_VAR))(input)?;
    let (input, _) = ws(tag("<-"))(input)?;
    parse_data_frame(input)
}

/// Start of the table assignment: a line beginning with `dat <-`.
fn find_table(script: &str) -> Option<&str> {
    let mut offset = 0;
    for line in script.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(DATA_VAR) {
            if rest.trim_start().starts_with("<- data.frame(") {
                return Some(&script[offset..]);
            }
        }
        offset += line.len();
    }
    None
}

fn numeric_column(column: Option<&Column>, len: usize) -> ForestResult<Vec<Option<f64>>> {
    let Some(column) = column else {
        return Ok(vec![None; len]);
    };
    column
        .values
        .iter()
        .enumerate()
        .map(|(i, lit)| match lit {
            Literal::Num(n) => Ok(Some(*n)),
            Literal::Missing => Ok(None),
            other => Err(ForestError::parse(format!(
                "column '{}' entry {} is not numeric: {:?}",
                column.name,
                i + 1,
                other
            ))),
        })
        .collect()
}

/// Read the rows back out of a generated script.
///
/// Column order is irrelevant; the `outcome` column is required and every
/// table column must have one entry per label. Arguments such as
/// `stringsAsFactors` are ignored.
pub fn extract_rows(script: &str) -> ForestResult<Vec<OutcomeRow>> {
    let table = find_table(script)
        .ok_or_else(|| ForestError::parse(format!("no '{} <- data.frame(' table found", DATA_VAR)))?;
    let (_, columns) = parse_frame_assignment(table)
        .map_err(|e| ForestError::parse(format!("malformed data table: {}", e)))?;

    let find = |name: &str| columns.iter().find(|c| c.name == name);
    let outcome = find("outcome").ok_or_else(|| ForestError::parse("table has no outcome column"))?;
    let labels = outcome
        .values
        .iter()
        .map(|lit| match lit {
            Literal::Str(s) => Ok(s.clone()),
            other => Err(ForestError::parse(format!("outcome label is not a string: {:?}", other))),
        })
        .collect::<ForestResult<Vec<_>>>()?;

    let len = labels.len();
    let ragged = columns
        .iter()
        .filter(|c| COLUMNS.contains(&c.name.as_str()))
        .find(|c| c.values.len() != len);
    if let Some(column) = ragged {
        return Err(ForestError::parse(format!(
            "column '{}' has {} entries, expected {}",
            column.name,
            column.values.len(),
            len
        )));
    }

    let value = numeric_column(find("value"), len)?;
    let ci_lower = numeric_column(find("ci_lower"), len)?;
    let ci_upper = numeric_column(find("ci_upper"), len)?;
    let weight = numeric_column(find("weight"), len)?;

    Ok(labels
        .into_iter()
        .enumerate()
        .map(|(i, outcome)| OutcomeRow {
            outcome,
            value: value[i],
            ci_lower: ci_lower[i],
            ci_upper: ci_upper[i],
            weight: weight[i],
        })
        .collect())
}
