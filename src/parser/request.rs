// Chart request parser
// Format: kind(role: column, role: "quoted column", barmode: "stack")

use super::lexer::{identifier, string_literal, ws};
use crate::error::{EngineError, Result};
use crate::ir::ChartRequest;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{all_consuming, value},
    multi::separated_list0,
    sequence::separated_pair,
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    X,
    Y,
    Color,
    Values,
    Names,
    Barmode,
}

fn parse_role(input: &str) -> IResult<&str, Role> {
    alt((
        value(Role::Color, tag("color")),
        value(Role::Values, tag("values")),
        value(Role::Names, tag("names")),
        value(Role::Barmode, tag("barmode")),
        value(Role::X, tag("x")),
        value(Role::Y, tag("y")),
    ))(input)
}

/// Parse one `role: column` argument
fn parse_binding(input: &str) -> IResult<&str, (Role, String)> {
    separated_pair(
        ws(parse_role),
        char(':'),
        ws(alt((string_literal, identifier))),
    )(input)
}

/// Parse a chart request expression such as `bar(x: region, y: sales)`
pub fn parse_request(input: &str) -> IResult<&str, ChartRequest> {
    let (input, chart) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, bindings) = separated_list0(ws(char(',')), parse_binding)(input)?;
    let (input, _) = ws(char(')'))(input)?;

    let mut request = ChartRequest::new(chart);
    for (role, column) in bindings {
        let slot = match role {
            Role::X => &mut request.x,
            Role::Y => &mut request.y,
            Role::Color => &mut request.color,
            Role::Values => &mut request.values,
            Role::Names => &mut request.names,
            Role::Barmode => &mut request.barmode,
        };
        *slot = Some(column);
    }

    Ok((input, request))
}

/// Parse a whole expression, turning syntax errors into validation errors.
pub fn parse_chart_request(input: &str) -> Result<ChartRequest> {
    all_consuming(parse_request)(input)
        .map(|(_, request)| request)
        .map_err(|e| EngineError::validation(format!("invalid chart expression '{}': {}", input, e)))
}
