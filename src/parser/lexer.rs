// Token-level parsers for generated R source

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while_m_n},
    character::complete::{char, multispace0, none_of, satisfy},
    combinator::{map, map_opt, map_res, recognize, value},
    multi::fold_many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// R identifier: letter or dot first, then letters, digits, dots and underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic() || c == '.'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_'),
        )),
        String::from,
    )(input)
}

/// Hex code point inside `{...}`
fn code_point(input: &str) -> IResult<&str, char> {
    map_opt(
        map_res(
            delimited(
                char('{'),
                take_while_m_n(1, 8, |c: char| c.is_ascii_hexdigit()),
                char('}'),
            ),
            |hex| u32::from_str_radix(hex, 16),
        ),
        char::from_u32,
    )(input)
}

fn escape(input: &str) -> IResult<&str, char> {
    preceded(
        char('\\'),
        alt((
            value('\\', char('\\')),
            value('"', char('"')),
            value('\'', char('\'')),
            value('\n', char('n')),
            value('\r', char('r')),
            value('\t', char('t')),
            preceded(char('u'), code_point),
            preceded(char('U'), code_point),
        )),
    )(input)
}

/// Double-quoted string literal with its escapes resolved
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((escape, none_of("\\\""))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('"'),
    )(input)
}

/// Decimal number literal, optionally signed, with an optional exponent
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, |s: &str| s.parse::<f64>())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes() {
        let (rest, s) = string_literal(r#""say \"hi\"\n\\ caf\u{e9} \U{1f332}" tail"#).unwrap();
        assert_eq!(s, "say \"hi\"\n\\ café 🌲");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn test_string_literal_unterminated() {
        assert!(string_literal(r#""open"#).is_err());
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("1.5").unwrap().1, 1.5);
        assert_eq!(number_literal("-0.25,").unwrap(), (",", -0.25));
        assert_eq!(number_literal("2e-3").unwrap().1, 0.002);
        assert!(number_literal("NA").is_err());
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("ci_lower = ").unwrap(), (" = ", "ci_lower".to_string()));
        assert_eq!(identifier("data.frame(").unwrap().1, "data.frame");
        assert!(identifier("_x").is_err());
    }
}
