//! # Scalar Expressions and Aggregate Calls
//!
//! Operators carry scalar expressions (a Filter's predicate, a Project's outputs, a
//! Join's condition) and aggregate call descriptors. Columns are addressed by position
//! in the operator's input row. For joins the left and right rows are concatenated, so
//! `$0..$n` are left columns and `$n..` are right columns.
//!
//! Everything here is `Eq + Hash` so that operators can be compared structurally, which
//! the planner relies on when it deduplicates rule outputs.

use crate::traits::write_list;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Scalar value for literals.
///
/// Uses `OrderedFloat` for `f64` so that floating-point literals can take part in
/// Eq/Hash comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since Unix epoch (1970-01-01).
    Date(i32),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{}", v.0),
            Self::Utf8(v) => write!(f, "'{v}'"),
            Self::Date(v) => write!(f, "DATE({v})"),
        }
    }
}

/// Scalar expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Column of the input row, by position.
    InputRef(usize),
    Literal(ScalarValue),
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// Flat conjunction; avoids nested binary AND trees.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn input(index: usize) -> Self {
        Expr::InputRef(index)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `$left = $right`.
    pub fn eq_columns(left: usize, right: usize) -> Self {
        Expr::binary(BinaryOp::Eq, Expr::InputRef(left), Expr::InputRef(right))
    }

    /// Highest input column referenced, or `None` for a column-free expression.
    pub fn max_input_ref(&self) -> Option<usize> {
        match self {
            Expr::InputRef(i) => Some(*i),
            Expr::Literal(_) => None,
            Expr::BinaryOp { left, right, .. } => left.max_input_ref().max(right.max_input_ref()),
            Expr::UnaryOp { operand, .. } => operand.max_input_ref(),
            Expr::Function { args, .. } | Expr::And(args) | Expr::Or(args) => {
                args.iter().filter_map(Expr::max_input_ref).max()
            }
        }
    }

    /// Flatten AND-chains: (A AND (B AND C)) → [A, B, C].
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::InputRef(i) => write!(f, "${i}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::IsNull => write!(f, "{operand} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{operand} IS NOT NULL"),
            },
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args.iter().map(|a| a.to_string()))?;
                f.write_str(")")
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                f.write_str(if matches!(self, Expr::And(_)) { "AND(" } else { "OR(" })?;
                write_list(f, exprs.iter().map(|e| e.to_string()))?;
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// SQL join types.
///
/// Semi and Anti joins only produce left columns, which matters for output width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
            JoinType::Semi => "semi",
            JoinType::Anti => "anti",
            JoinType::Cross => "cross",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        })
    }
}

/// Result type of an aggregate call. Type inference happens upstream; the planner only
/// carries the type along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date,
}

/// One aggregate function application inside an Aggregate operator.
///
/// `args` are input column indices, so `COUNT(*)` is a `Count` with no arguments.
/// `filter` names a boolean input column (`AGG(..) FILTER (WHERE $k)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateCall {
    pub func: AggFunc,
    pub args: Vec<usize>,
    pub distinct: bool,
    pub filter: Option<usize>,
    pub result_type: DataType,
}

impl AggregateCall {
    /// `COUNT(*)`.
    pub fn count_star() -> Self {
        Self {
            func: AggFunc::Count,
            args: vec![],
            distinct: false,
            filter: None,
            result_type: DataType::Int64,
        }
    }

    pub fn new(func: AggFunc, args: Vec<usize>, result_type: DataType) -> Self {
        Self {
            func,
            args,
            distinct: false,
            filter: None,
            result_type,
        }
    }

    pub fn max_input_ref(&self) -> Option<usize> {
        self.args.iter().copied().chain(self.filter).max()
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func)?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_list(f, self.args.iter().map(|a| format!("${a}")))?;
        f.write_str(")")?;
        if let Some(filter) = self.filter {
            write!(f, " FILTER ${filter}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_input_ref() {
        let e = Expr::And(vec![
            Expr::eq_columns(0, 4),
            Expr::binary(
                BinaryOp::Gt,
                Expr::InputRef(2),
                Expr::Literal(ScalarValue::Int64(10)),
            ),
        ]);
        assert_eq!(e.max_input_ref(), Some(4));
        assert_eq!(Expr::Literal(ScalarValue::Null).max_input_ref(), None);
    }

    #[test]
    fn test_aggregate_call_display() {
        assert_eq!(AggregateCall::count_star().to_string(), "COUNT()");
        let mut sum = AggregateCall::new(AggFunc::Sum, vec![1], DataType::Int64);
        sum.distinct = true;
        sum.filter = Some(3);
        assert_eq!(sum.to_string(), "SUM(DISTINCT $1) FILTER $3");
        assert_eq!(sum.max_input_ref(), Some(3));
    }
}
