//! Condition expression parser using nom combinators.
//!
//! Accepts the condition text a relational query builder produces:
//! - Comparisons: `price > 100`, `name = 'Shoe'`, `active != false`
//! - Sets and patterns: `color IN ('red', 'blue')`, `categoryIds LIKE '%,5,%'`
//! - Null checks: `parent IS NULL`, `parent IS NOT NULL`
//! - Full text: `MATCH (name, description) AGAINST ('red shoe')`
//! - Logical: `AND`, `OR`, `NOT`, parentheses
//!
//! Identifiers may be backtick-quoted and carry a table alias (`q.price`).

use super::plan::{CompareOp, Condition};
use crate::error::{IndexError, Result};
use crate::types::FieldValue;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, map, opt},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

pub fn parse_condition(input: &str) -> Result<Condition> {
    match expression(input.trim()) {
        Ok(("", c)) => Ok(c),
        Ok((remaining, _)) => Err(IndexError::InvalidFilter(format!(
            "Unexpected input after condition: '{}'",
            remaining
        ))),
        Err(e) => Err(IndexError::InvalidFilter(format!("Parse error: {}", e))),
    }
}

fn expression(input: &str) -> IResult<&str, Condition> {
    or_expression(input)
}

fn or_expression(input: &str) -> IResult<&str, Condition> {
    let (input, first) = and_expression(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("OR"), multispace0),
        cut(and_expression),
    ))(input)?;

    if rest.is_empty() {
        Ok((input, first))
    } else {
        let mut items = vec![first];
        items.extend(rest);
        Ok((input, Condition::Or(items)))
    }
}

fn and_expression(input: &str) -> IResult<&str, Condition> {
    let (input, first) = atom(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("AND"), multispace0),
        cut(atom),
    ))(input)?;

    if rest.is_empty() {
        Ok((input, first))
    } else {
        let mut items = vec![first];
        items.extend(rest);
        Ok((input, Condition::And(items)))
    }
}

fn keyword<'a>(kw: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (remaining, matched) = tag_no_case(kw)(input)?;

        if remaining
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }

        Ok((remaining, matched))
    }
}

fn atom(input: &str) -> IResult<&str, Condition> {
    preceded(
        multispace0,
        alt((group, not_expression, match_against, predicate)),
    )(input)
}

fn group(input: &str) -> IResult<&str, Condition> {
    delimited(
        char('('),
        delimited(multispace0, expression, multispace0),
        char(')'),
    )(input)
}

fn not_expression(input: &str) -> IResult<&str, Condition> {
    let (input, _) = keyword("NOT")(input)?;
    let (input, inner) = cut(atom)(input)?;
    Ok((input, Condition::Not(Box::new(inner))))
}

fn match_against(input: &str) -> IResult<&str, Condition> {
    let (input, _) = keyword("MATCH")(input)?;
    let (input, fields) = cut(preceded(
        multispace0,
        delimited(
            char('('),
            separated_list1(
                delimited(multispace0, char(','), multispace0),
                preceded(multispace0, identifier),
            ),
            preceded(multispace0, char(')')),
        ),
    ))(input)?;
    let (input, _) = cut(delimited(multispace0, keyword("AGAINST"), multispace0))(input)?;
    let (input, text) = cut(delimited(
        terminated(char('('), multispace0),
        terminated(quoted_string, opt(preceded(multispace1, boolean_mode))),
        preceded(multispace0, char(')')),
    ))(input)?;

    Ok((
        input,
        Condition::Match {
            fields: fields.into_iter().map(str::to_string).collect(),
            text: text.to_string(),
        },
    ))
}

fn boolean_mode(input: &str) -> IResult<&str, &str> {
    map(
        tuple((
            keyword("IN"),
            multispace1,
            keyword("BOOLEAN"),
            multispace1,
            keyword("MODE"),
        )),
        |(_, _, _, _, mode)| mode,
    )(input)
}

fn negation(input: &str) -> IResult<&str, bool> {
    map(opt(terminated(keyword("NOT"), multispace1)), |n| n.is_some())(input)
}

fn predicate(input: &str) -> IResult<&str, Condition> {
    let (input, field) = identifier(input)?;
    let field = field.to_string();
    let (input, _) = multispace0(input)?;

    if let Ok((rest, (_, _, negated, _))) =
        tuple((keyword("IS"), multispace1, negation, keyword("NULL")))(input)
    {
        return Ok((rest, Condition::IsNull { field, negated }));
    }

    if let Ok((rest, (negated, _, _, values))) =
        tuple((negation, keyword("IN"), multispace0, literal_list))(input)
    {
        return Ok((
            rest,
            Condition::In {
                field,
                values,
                negated,
            },
        ));
    }

    if let Ok((rest, (negated, _, _, pattern))) =
        tuple((negation, keyword("LIKE"), multispace0, quoted_string))(input)
    {
        return Ok((
            rest,
            Condition::Like {
                field,
                pattern: pattern.to_string(),
                negated,
            },
        ));
    }

    let (input, op) = operator(input)?;
    let (input, value) = cut(preceded(multispace0, literal))(input)?;
    Ok((input, Condition::Compare { field, op, value }))
}

fn literal_list(input: &str) -> IResult<&str, Vec<FieldValue>> {
    delimited(
        char('('),
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            preceded(multispace0, literal),
        ),
        preceded(multispace0, char(')')),
    )(input)
}

fn operator(input: &str) -> IResult<&str, CompareOp> {
    alt((
        map(tag(">="), |_| CompareOp::Gte),
        map(tag("<="), |_| CompareOp::Lte),
        map(tag("!="), |_| CompareOp::NotEq),
        map(tag("<>"), |_| CompareOp::NotEq),
        map(tag("="), |_| CompareOp::Eq),
        map(tag(">"), |_| CompareOp::Gt),
        map(tag("<"), |_| CompareOp::Lt),
    ))(input)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    // table alias
    let (input, _) = opt(terminated(take_while1(is_identifier_char), char('.')))(input)?;
    alt((
        delimited(char('`'), take_while1(|c| c != '`'), char('`')),
        take_while1(is_identifier_char),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, FieldValue> {
    alt((
        map(quoted_string, |s| FieldValue::Text(s.to_string())),
        number_value,
        map(keyword("TRUE"), |_| FieldValue::Boolean(true)),
        map(keyword("FALSE"), |_| FieldValue::Boolean(false)),
        map(keyword("NULL"), |_| FieldValue::Null),
    ))(input)
}

fn number_value(input: &str) -> IResult<&str, FieldValue> {
    let (input, num_str) = nom::number::complete::recognize_float(input)?;
    if num_str.contains('.') || num_str.contains('e') || num_str.contains('E') {
        let val = num_str.parse::<f64>().map_err(|_| {
            nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
        })?;
        Ok((input, FieldValue::Float(val)))
    } else {
        let val = num_str.parse::<i64>().map_err(|_| {
            nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
        })?;
        Ok((input, FieldValue::Integer(val)))
    }
}

fn quoted_string(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(input)
}
