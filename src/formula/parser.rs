//! Tokenizer for size formulas.

use super::{Formula, FormulaError, SizeSpec, Token};

/// Parse a size spec into a token chain.
///
/// - `Absent`, `0`, `"0"` and `""` → empty chain (derived axis)
/// - `80`, `"80"` → `[Base(80)]`
/// - `-10`, `"-10"` → `[Subtract(10)]` (standalone edge trim)
/// - `"50%"` → `[Percent(50)]`
/// - `"100x50a10"` → `[Base(100), Percent(50), Add(10)]`
/// - `"-10x50"` → `[Subtract(10), Percent(50)]`
pub fn parse(spec: &SizeSpec) -> Result<Formula, FormulaError> {
    match spec {
        SizeSpec::Absent => Ok(Formula::default()),
        SizeSpec::Number(n) => parse_number(*n),
        SizeSpec::Text(text) => parse_text(text.trim()),
    }
}

fn parse_number(n: f64) -> Result<Formula, FormulaError> {
    if !n.is_finite() {
        return Err(FormulaError::NotFinite(n));
    }
    let tokens = if n == 0.0 {
        Vec::new()
    } else if n < 0.0 {
        vec![Token::Subtract(-n)]
    } else {
        vec![Token::Base(n)]
    };
    Ok(Formula::new(tokens))
}

fn parse_text(text: &str) -> Result<Formula, FormulaError> {
    if text.is_empty() {
        return Ok(Formula::default());
    }
    // Plain numeric strings behave exactly like numbers
    if let Ok(n) = text.parse::<f64>() {
        return parse_number(n);
    }
    if let Some(percent) = text.strip_suffix('%') {
        if let Some((p, used)) = take_number(percent) {
            if used == percent.len() {
                return Ok(Formula::new(vec![Token::Percent(finite(p)?)]));
            }
        }
    }

    let mut tokens = Vec::new();
    let mut cursor = 0;

    let unsigned = text.strip_prefix('+');
    if let Some(rest) = unsigned {
        cursor = 1;
        let (base, used) = take_number(rest).ok_or_else(|| FormulaError::InvalidOperand {
            formula: text.to_string(),
            op: '+',
            position: 0,
        })?;
        tokens.push(Token::Base(finite(base)?));
        cursor += used;
    } else if let Some((base, used)) = take_number(text) {
        tokens.push(Token::Base(finite(base)?));
        cursor = used;
    }

    while let Some(op) = text[cursor..].chars().next() {
        let position = cursor;
        let token: fn(f64) -> Token = match op {
            'x' => Token::Percent,
            'a' => Token::Add,
            '-' => Token::Subtract,
            'r' => Token::RoundDownTo,
            _ => {
                return Err(FormulaError::UnknownOperator {
                    formula: text.to_string(),
                    op,
                    position,
                });
            }
        };
        cursor += op.len_utf8();

        let (value, used) =
            take_number(&text[cursor..]).ok_or_else(|| FormulaError::InvalidOperand {
                formula: text.to_string(),
                op,
                position,
            })?;
        let value = finite(value)?;
        if op == 'r' && value == 0.0 {
            return Err(FormulaError::ZeroMultiple(text.to_string()));
        }
        tokens.push(token(value));
        cursor += used;
    }

    Ok(Formula::new(tokens))
}

/// Consume an unsigned decimal run (`12`, `12.5`, `.5`) from the start of
/// `input`. Returns the value and the number of bytes consumed.
fn take_number(input: &str) -> Option<(f64, usize)> {
    let mut end = 0;
    let mut seen_dot = false;
    for b in input.bytes() {
        match b {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if end == 0 {
        return None;
    }
    input[..end].parse::<f64>().ok().map(|v| (v, end))
}

/// Over-long digit runs parse to infinity.
fn finite(value: f64) -> Result<f64, FormulaError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NotFinite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(spec: impl Into<SizeSpec>) -> Vec<Token> {
        parse(&spec.into()).unwrap().tokens().to_vec()
    }

    // =========================================================================
    // Numbers and numeric strings
    // =========================================================================

    #[test]
    fn absent_is_empty() {
        assert!(parse(&SizeSpec::Absent).unwrap().is_empty());
    }

    #[test]
    fn zero_is_empty() {
        assert!(tokens(0).is_empty());
        assert!(tokens("0").is_empty());
        assert!(tokens("").is_empty());
    }

    #[test]
    fn positive_number_is_base() {
        assert_eq!(tokens(80), vec![Token::Base(80.0)]);
        assert_eq!(tokens("80"), vec![Token::Base(80.0)]);
        assert_eq!(tokens(" 45 "), vec![Token::Base(45.0)]);
    }

    #[test]
    fn negative_number_is_edge_trim() {
        let formula = parse(&SizeSpec::from(-10)).unwrap();
        assert_eq!(formula.tokens(), &[Token::Subtract(10.0)]);
        assert!(!formula.has_explicit_base());
        assert_eq!(formula.edge_trim(), Some(10.0));
        assert_eq!(tokens("-10"), vec![Token::Subtract(10.0)]);
    }

    #[test]
    fn non_finite_number_is_rejected() {
        assert!(matches!(
            parse(&SizeSpec::Number(f64::NAN)),
            Err(FormulaError::NotFinite(_))
        ));
        assert!(matches!(
            parse(&SizeSpec::Number(f64::INFINITY)),
            Err(FormulaError::NotFinite(_))
        ));
    }

    #[test]
    fn overflowing_operands_are_rejected() {
        let huge = "9".repeat(400);
        for text in [
            format!("x{huge}x0"),
            format!("{huge}a1"),
            format!("+{huge}"),
            format!("{huge}%"),
            format!("100r{huge}"),
        ] {
            assert!(
                matches!(parse(&SizeSpec::Text(text.clone())), Err(FormulaError::NotFinite(_))),
                "{text}"
            );
        }
    }

    // =========================================================================
    // Operator chains
    // =========================================================================

    #[test]
    fn percent_with_implicit_base() {
        let formula = parse(&"x50".into()).unwrap();
        assert_eq!(formula.tokens(), &[Token::Percent(50.0)]);
        assert!(!formula.has_explicit_base());
    }

    #[test]
    fn percent_suffix_shorthand() {
        assert_eq!(tokens("50%"), vec![Token::Percent(50.0)]);
        assert_eq!(tokens("12.5%"), vec![Token::Percent(12.5)]);
    }

    #[test]
    fn explicit_base_then_operators() {
        assert_eq!(
            tokens("100x50a10r8"),
            vec![
                Token::Base(100.0),
                Token::Percent(50.0),
                Token::Add(10.0),
                Token::RoundDownTo(8.0),
            ]
        );
    }

    #[test]
    fn in_chain_subtract_after_base() {
        let formula = parse(&"100-10".into()).unwrap();
        assert_eq!(formula.tokens(), &[Token::Base(100.0), Token::Subtract(10.0)]);
        assert!(formula.has_explicit_base());
        assert_eq!(formula.edge_trim(), None);
    }

    #[test]
    fn leading_subtract_followed_by_operator_is_not_edge_trim() {
        let formula = parse(&"-10x50".into()).unwrap();
        assert_eq!(formula.tokens(), &[Token::Subtract(10.0), Token::Percent(50.0)]);
        assert_eq!(formula.edge_trim(), None);
    }

    #[test]
    fn plus_signed_base() {
        assert_eq!(tokens("+100a5"), vec![Token::Base(100.0), Token::Add(5.0)]);
    }

    #[test]
    fn decimal_operands() {
        assert_eq!(tokens("x33.3"), vec![Token::Percent(33.3)]);
    }

    // =========================================================================
    // Syntax errors
    // =========================================================================

    #[test]
    fn unknown_operator() {
        let err = parse(&"100y5".into()).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownOperator {
                formula: "100y5".into(),
                op: 'y',
                position: 3,
            }
        );
    }

    #[test]
    fn missing_operand() {
        let err = parse(&"x".into()).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::InvalidOperand { op: 'x', position: 0, .. }
        ));
    }

    #[test]
    fn non_numeric_operand() {
        assert!(matches!(
            parse(&"a50rz".into()),
            Err(FormulaError::InvalidOperand { op: 'r', position: 3, .. })
        ));
    }

    #[test]
    fn round_to_zero_rejected() {
        assert!(matches!(
            parse(&"r0".into()),
            Err(FormulaError::ZeroMultiple(_))
        ));
    }

    #[test]
    fn bare_plus_rejected() {
        assert!(matches!(
            parse(&"+x5".into()),
            Err(FormulaError::InvalidOperand { op: '+', .. })
        ));
    }

    #[test]
    fn error_message_names_operator() {
        let err = parse(&"50q".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown operator 'q' at position 2 in \"50q\""
        );
    }
}
