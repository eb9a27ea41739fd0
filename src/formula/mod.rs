//! Per-axis size formulas.
//!
//! A shrink request carries one [`SizeSpec`] per axis. Each spec is parsed
//! into a [`Formula`] (an ordered chain of [`Token`]s) and then evaluated
//! against that axis's source dimension to give an [`AxisResolution`].
//!
//! ## Grammar
//!
//! ```text
//! formula := '-' number                  standalone edge trim
//!          | [['+'] number] (op number)*
//!          | number '%'                  shorthand for 'x' number
//! op      := 'x'   percent multiply
//!          | 'a'   add
//!          | '-'   subtract
//!          | 'r'   round down to a multiple
//! ```
//!
//! When the formula does not open with a number, the axis's source dimension
//! is the starting value.
//!
//! | Spec | Source 160 | Result |
//! |---|---|---|
//! | `80` | | 80 |
//! | `"x50"` | 160 × 50% | 80 |
//! | `"100a50"` | 100 + 50 | 150 |
//! | `"r50"` | ⌊160 / 50⌋ × 50 | 150 |
//! | `"-10x50"` | (160 − 10) × 50% | 75 |
//! | `"-10"` | 160 − 2 × 10 | 140 |
//!
//! The last row is the standalone negative literal: a bare `-N` trims `N`
//! pixels from *each* edge of the axis, so it removes `2N` in total. A
//! subtraction anywhere else in a chain removes `N` once.

mod evaluator;
mod parser;

pub use evaluator::evaluate;
pub use parser::parse;

use thiserror::Error;

/// Raw size request for one axis, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SizeSpec {
    /// No request: the axis follows the other one's scale.
    #[default]
    Absent,
    /// A plain number. `0` means absent, negative values are edge trims.
    Number(f64),
    /// A numeric string or a formula string.
    Text(String),
}

impl From<u32> for SizeSpec {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for SizeSpec {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for SizeSpec {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SizeSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SizeSpec {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<SizeSpec>> From<Option<T>> for SizeSpec {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Absent)
    }
}

impl std::fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "auto"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One step of a formula chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    /// Explicit starting value. Only ever the first token.
    Base(f64),
    Percent(f64),
    Add(f64),
    Subtract(f64),
    RoundDownTo(f64),
}

/// A parsed size formula.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Formula {
    tokens: Vec<Token>,
}

impl Formula {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// The token chain in evaluation order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// An empty formula leaves its axis to be derived from the other one.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether the chain opens with a literal instead of the source dimension.
    pub fn has_explicit_base(&self) -> bool {
        matches!(self.tokens.first(), Some(Token::Base(_)))
    }

    /// The standalone negative literal: exactly `[Subtract(n)]` on an
    /// implicit base. Returns the per-edge trim amount.
    pub fn edge_trim(&self) -> Option<f64> {
        match self.tokens.as_slice() {
            [Token::Subtract(n)] => Some(*n),
            _ => None,
        }
    }
}

/// Outcome of evaluating one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisResolution {
    /// No target of its own; scaled along with the other axis.
    Derived,
    /// Requested size in pixels, not yet rounded.
    Explicit(f64),
}

impl AxisResolution {
    pub fn target(self) -> Option<f64> {
        match self {
            Self::Derived => None,
            Self::Explicit(t) => Some(t),
        }
    }
}

/// A size formula that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("unknown operator '{op}' at position {position} in \"{formula}\"")]
    UnknownOperator {
        formula: String,
        op: char,
        position: usize,
    },
    #[error("operator '{op}' at position {position} in \"{formula}\" needs a numeric operand")]
    InvalidOperand {
        formula: String,
        op: char,
        position: usize,
    },
    #[error("size must be a finite number, got {0}")]
    NotFinite(f64),
    #[error("cannot round \"{0}\" down to a multiple of zero")]
    ZeroMultiple(String),
}
