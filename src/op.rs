//! The fixed vocabulary of two-operand arithmetic operators.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A binary operator applied by a gate to its left and right operand.
///
/// The JSON front end names operators `AAdd`, `ASub`, ...; the canonical circuit text uses the
/// lowercase symbols returned by [`Op::symbol`]. Both spellings are accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Op {
    /// `lhs + rhs`
    #[serde(rename = "AAdd", alias = "add")]
    Add,
    /// `lhs - rhs`
    #[serde(rename = "ASub", alias = "sub")]
    Sub,
    /// `lhs * rhs`
    #[serde(rename = "AMul", alias = "mul")]
    Mul,
    /// `lhs / rhs`
    #[serde(rename = "ADiv", alias = "div")]
    Div,
    /// `lhs == rhs`
    #[serde(rename = "AEq", alias = "eq")]
    Eq,
    /// `lhs != rhs`
    #[serde(rename = "ANeq", alias = "neq")]
    Neq,
    /// `lhs < rhs`
    #[serde(rename = "ALt", alias = "lt")]
    Lt,
    /// `lhs <= rhs`
    #[serde(rename = "ALEq", alias = "leq")]
    Leq,
    /// `lhs > rhs`
    #[serde(rename = "AGt", alias = "gt")]
    Gt,
    /// `lhs >= rhs`
    #[serde(rename = "AGEq", alias = "geq")]
    Geq,
}

impl Op {
    /// All operators, in a fixed order.
    pub const ALL: [Op; 10] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Eq,
        Op::Neq,
        Op::Lt,
        Op::Leq,
        Op::Gt,
        Op::Geq,
    ];

    /// The canonical name used in Bristol fashion gate lines.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Lt => "lt",
            Op::Leq => "leq",
            Op::Gt => "gt",
            Op::Geq => "geq",
        }
    }

    /// The name used by the JSON front end.
    pub fn legacy_name(self) -> &'static str {
        match self {
            Op::Add => "AAdd",
            Op::Sub => "ASub",
            Op::Mul => "AMul",
            Op::Div => "ADiv",
            Op::Eq => "AEq",
            Op::Neq => "ANeq",
            Op::Lt => "ALt",
            Op::Leq => "ALEq",
            Op::Gt => "AGt",
            Op::Geq => "AGEq",
        }
    }

    /// The infix operator of the MP-SPDZ language.
    pub fn infix(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Eq => "==",
            Op::Neq => "!=",
            Op::Lt => "<",
            Op::Leq => "<=",
            Op::Gt => ">",
            Op::Geq => ">=",
        }
    }

    /// Looks up an operator by its canonical symbol or its front end name.
    pub fn from_name(name: &str) -> Option<Op> {
        Op::ALL
            .into_iter()
            .find(|op| op.symbol() == name || op.legacy_name() == name)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The name did not match any operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operator '{0}'")]
pub struct UnknownOp(pub String);

impl FromStr for Op {
    type Err = UnknownOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::from_name(s).ok_or_else(|| UnknownOp(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_spellings_parse() {
        for op in Op::ALL {
            assert_eq!(op.symbol().parse::<Op>(), Ok(op));
            assert_eq!(op.legacy_name().parse::<Op>(), Ok(op));
        }
        assert_eq!("AXor".parse::<Op>(), Err(UnknownOp("AXor".into())));
    }

    #[test]
    fn json_accepts_front_end_names() {
        let ops: Vec<Op> = serde_json::from_str(r#"["AAdd", "ALEq", "geq"]"#).unwrap();
        assert_eq!(ops, vec![Op::Add, Op::Leq, Op::Geq]);
        assert_eq!(serde_json::to_string(&Op::Neq).unwrap(), r#""ANeq""#);
    }
}
