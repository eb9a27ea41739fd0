//! Reduces a token chain against an axis's source dimension.

use super::{AxisResolution, Formula, Token};

/// Evaluate `formula` against the source size of its axis.
///
/// The result stays fractional: rounding only happens once both axes are
/// reconciled by [`contain_fit`](crate::imaging::contain_fit).
pub fn evaluate(formula: &Formula, source: u32) -> AxisResolution {
    if formula.is_empty() {
        return AxisResolution::Derived;
    }
    let source = source as f64;

    if let Some(trim) = formula.edge_trim() {
        return AxisResolution::Explicit(source - 2.0 * trim);
    }

    let (start, rest) = match formula.tokens() {
        [Token::Base(base), rest @ ..] => (*base, rest),
        all => (source, all),
    };

    let value = rest.iter().fold(start, |value, token| match *token {
        Token::Percent(p) => value * p / 100.0,
        Token::Add(n) => value + n,
        Token::Subtract(n) => value - n,
        Token::RoundDownTo(m) => (value / m).floor() * m,
        // The parser only emits a base as the first token
        Token::Base(b) => b,
    });

    AxisResolution::Explicit(value)
}
