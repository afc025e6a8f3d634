//! # Scalar Expressions
//!
//! Scalar expressions compute a value for a single row: positional input
//! references, literals, arithmetic, comparisons, boolean logic, function calls
//! and windowed aggregates. They live inside operator payloads (a filter's
//! condition, a join's ON clause, a project's output list).
//!
//! Column references are positional (`$0`, `$1`, ...) and always relative to the
//! operator's input row (for a join, the concatenation of left and right). Every
//! rewrite that changes an operator's input therefore has to remap references,
//! which is what [`Expr::map_columns`], [`Expr::shift`] and
//! [`Expr::substitute_refs`] are for.

use crate::mapping::ColumnSet;
use crate::types::{DataType, RowType};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constant value.
///
/// Uses `OrderedFloat` for `f64` so expressions are `Eq + Hash` and can key the
/// memo's de-duplication index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since 1970-01-01.
    Date(i32),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Bool(_) => DataType::Boolean,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Date(_) => DataType::Date,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{}", v.0),
            ScalarValue::Utf8(v) => write!(f, "'{v}'"),
            ScalarValue::Date(v) => write!(f, "DATE {v}"),
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

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// The operator that gives the same result with operands swapped.
    pub fn reverse(&self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::LtEq => BinaryOp::GtEq,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::GtEq => BinaryOp::LtEq,
            other => *other,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
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
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Neg => "-",
            UnaryOp::IsNull => "IS NULL",
            UnaryOp::IsNotNull => "IS NOT NULL",
        }
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

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }

    /// Result type given the argument type (`None` for `COUNT(*)`).
    pub fn return_type(&self, arg: Option<DataType>) -> DataType {
        match self {
            AggFunc::Count => DataType::Int64,
            AggFunc::Avg => DataType::Float64,
            AggFunc::Sum | AggFunc::Min | AggFunc::Max => arg.unwrap_or(DataType::Int64),
        }
    }
}

/// Function names whose result may differ between two evaluations on the same row.
const NON_DETERMINISTIC: &[&str] = &["RAND", "RANDOM", "NOW", "CURRENT_TIMESTAMP", "UUID"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to the input column at this position.
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
        return_type: DataType,
    },
    /// Flat conjunction.
    And(Vec<Expr>),
    /// Flat disjunction.
    Or(Vec<Expr>),
    /// Windowed aggregate (`SUM($1) OVER (PARTITION BY $0)`). Filters must never
    /// be pushed below a project that computes one of these.
    Over {
        func: AggFunc,
        args: Vec<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
    },
}

impl Expr {
    pub fn col(index: usize) -> Expr {
        Expr::InputRef(index)
    }

    pub fn lit(value: ScalarValue) -> Expr {
        Expr::Literal(value)
    }

    pub fn int(value: i64) -> Expr {
        Expr::Literal(ScalarValue::Int64(value))
    }

    pub fn string(value: impl Into<String>) -> Expr {
        Expr::Literal(ScalarValue::Utf8(value.into()))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::Literal(ScalarValue::Bool(value))
    }

    pub fn null() -> Expr {
        Expr::Literal(ScalarValue::Null)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Expr {
        Self::binary(BinaryOp::Gt, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Expr {
        Self::binary(BinaryOp::Lt, left, right)
    }

    pub fn is_null(operand: Expr) -> Expr {
        Self::unary(UnaryOp::IsNull, operand)
    }

    pub fn is_not_null(operand: Expr) -> Expr {
        Self::unary(UnaryOp::IsNotNull, operand)
    }

    /// Builds a conjunction: nested ANDs are flattened, TRUE and duplicate terms
    /// dropped, and an empty list yields TRUE.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut terms: Vec<Expr> = Vec::new();
        for e in exprs {
            for c in e.conjuncts() {
                if c.is_always_false() {
                    return Expr::boolean(false);
                }
                if !terms.contains(c) {
                    terms.push(c.clone());
                }
            }
        }
        match terms.len() {
            0 => Expr::boolean(true),
            1 => terms.remove(0),
            _ => Expr::And(terms),
        }
    }

    /// Builds a disjunction: nested ORs are flattened, FALSE and duplicate terms
    /// dropped, and an empty list yields FALSE.
    pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut terms: Vec<Expr> = Vec::new();
        for e in exprs {
            for d in e.disjuncts() {
                if d.is_always_true() {
                    return Expr::boolean(true);
                }
                if !terms.contains(d) {
                    terms.push(d.clone());
                }
            }
        }
        match terms.len() {
            0 => Expr::boolean(false),
            1 => terms.remove(0),
            _ => Expr::Or(terms),
        }
    }

    /// Flatten AND-chains: (A AND (B AND C)) -> [A, B, C]. TRUE terms vanish.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            Expr::Literal(ScalarValue::Bool(true)) => vec![],
            other => vec![other],
        }
    }

    /// Flatten OR-chains. FALSE terms vanish.
    pub fn disjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Or(exprs) => exprs.iter().flat_map(|e| e.disjuncts()).collect(),
            Expr::Literal(ScalarValue::Bool(false)) => vec![],
            other => vec![other],
        }
    }

    pub fn is_always_true(&self) -> bool {
        match self {
            Expr::Literal(ScalarValue::Bool(true)) => true,
            Expr::And(exprs) => exprs.iter().all(Expr::is_always_true),
            _ => false,
        }
    }

    pub fn is_always_false(&self) -> bool {
        match self {
            Expr::Literal(ScalarValue::Bool(false)) => true,
            Expr::Or(exprs) => exprs.iter().all(Expr::is_always_false),
            _ => false,
        }
    }

    pub fn as_input_ref(&self) -> Option<usize> {
        match self {
            Expr::InputRef(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&ScalarValue> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// `($a = $b)` between two input references.
    pub fn as_ref_equality(&self) -> Option<(usize, usize)> {
        match self {
            Expr::BinaryOp {
                op: BinaryOp::Eq,
                left,
                right,
            } => Some((left.as_input_ref()?, right.as_input_ref()?)),
            _ => None,
        }
    }

    /// Positions of every input column this expression reads.
    pub fn input_refs(&self) -> ColumnSet {
        let mut cols = ColumnSet::new();
        self.visit(&mut |e| {
            if let Expr::InputRef(i) = e {
                cols.insert(*i);
            }
        });
        cols
    }

    /// Pre-order walk over every sub-expression.
    pub fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::InputRef(_) | Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::UnaryOp { operand, .. } => operand.visit(f),
            Expr::Function { args, .. } | Expr::And(args) | Expr::Or(args) => {
                for a in args {
                    a.visit(f);
                }
            }
            Expr::Over {
                args,
                partition_by,
                order_by,
                ..
            } => {
                for a in args.iter().chain(partition_by).chain(order_by) {
                    a.visit(f);
                }
            }
        }
    }

    pub fn contains_over(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Expr::Over { .. }));
        found
    }

    pub fn is_deterministic(&self) -> bool {
        let mut deterministic = true;
        self.visit(&mut |e| {
            if let Expr::Function { name, .. } = e {
                if NON_DETERMINISTIC.contains(&name.to_ascii_uppercase().as_str()) {
                    deterministic = false;
                }
            }
        });
        deterministic
    }

    /// Top-down rewrite: wherever `f` returns a replacement the subtree is
    /// replaced and not visited further.
    pub fn transform(&self, f: &mut dyn FnMut(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Expr::InputRef(_) | Expr::Literal(_) => self.clone(),
            Expr::BinaryOp { op, left, right } => Expr::BinaryOp {
                op: *op,
                left: Box::new(left.transform(f)),
                right: Box::new(right.transform(f)),
            },
            Expr::UnaryOp { op, operand } => Expr::UnaryOp {
                op: *op,
                operand: Box::new(operand.transform(f)),
            },
            Expr::Function {
                name,
                args,
                return_type,
            } => Expr::Function {
                name: name.clone(),
                args: args.iter().map(|a| a.transform(f)).collect(),
                return_type: *return_type,
            },
            Expr::And(args) => Expr::And(args.iter().map(|a| a.transform(f)).collect()),
            Expr::Or(args) => Expr::Or(args.iter().map(|a| a.transform(f)).collect()),
            Expr::Over {
                func,
                args,
                partition_by,
                order_by,
            } => Expr::Over {
                func: *func,
                args: args.iter().map(|a| a.transform(f)).collect(),
                partition_by: partition_by.iter().map(|a| a.transform(f)).collect(),
                order_by: order_by.iter().map(|a| a.transform(f)).collect(),
            },
        }
    }

    /// Replaces every `$i` with `f(i)`.
    pub fn substitute_refs(&self, f: &dyn Fn(usize) -> Expr) -> Expr {
        self.transform(&mut |e| e.as_input_ref().map(f))
    }

    /// Renumbers input references; `None` if some reference has no image.
    pub fn map_columns(&self, f: &dyn Fn(usize) -> Option<usize>) -> Option<Expr> {
        let mut complete = true;
        let mapped = self.transform(&mut |e| match e {
            Expr::InputRef(i) => match f(*i) {
                Some(j) => Some(Expr::InputRef(j)),
                None => {
                    complete = false;
                    Some(e.clone())
                }
            },
            _ => None,
        });
        complete.then_some(mapped)
    }

    /// Adds `offset` to every input reference at or after `from`.
    pub fn shift_from(&self, from: usize, offset: isize) -> Expr {
        self.transform(&mut |e| match e {
            Expr::InputRef(i) if *i >= from => {
                Some(Expr::InputRef((*i as isize + offset) as usize))
            }
            _ => None,
        })
    }

    pub fn shift(&self, offset: isize) -> Expr {
        self.shift_from(0, offset)
    }

    /// Result type against the given input row, or `None` when a reference is
    /// out of range.
    pub fn data_type(&self, input: &RowType) -> Option<DataType> {
        Some(match self {
            Expr::InputRef(i) => input.field(*i)?.data_type,
            Expr::Literal(v) => v.data_type(),
            Expr::BinaryOp { op, left, right } => {
                let l = left.data_type(input)?;
                let r = right.data_type(input)?;
                if op.is_comparison() {
                    DataType::Boolean
                } else if l == DataType::Float64 || r == DataType::Float64 {
                    DataType::Float64
                } else if l == DataType::Null {
                    r
                } else {
                    l
                }
            }
            Expr::UnaryOp { op, operand } => {
                let t = operand.data_type(input)?;
                match op {
                    UnaryOp::Neg => t,
                    UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull => DataType::Boolean,
                }
            }
            Expr::Function {
                args, return_type, ..
            } => {
                for a in args {
                    a.data_type(input)?;
                }
                *return_type
            }
            Expr::And(args) | Expr::Or(args) => {
                for a in args {
                    a.data_type(input)?;
                }
                DataType::Boolean
            }
            Expr::Over { func, args, .. } => {
                let arg = match args.first() {
                    Some(a) => Some(a.data_type(input)?),
                    None => None,
                };
                func.return_type(arg)
            }
        })
    }

    /// Whether the value can be NULL for some row of `input`.
    pub fn nullable(&self, input: &RowType) -> bool {
        match self {
            Expr::InputRef(i) => input.field(*i).map_or(true, |f| f.nullable),
            Expr::Literal(v) => v.is_null(),
            Expr::UnaryOp {
                op: UnaryOp::IsNull | UnaryOp::IsNotNull,
                ..
            } => false,
            Expr::Over {
                func: AggFunc::Count,
                ..
            } => false,
            Expr::Over { .. } | Expr::Function { .. } => true,
            other => {
                let mut nullable = false;
                other.visit(&mut |e| match e {
                    Expr::InputRef(i) => {
                        nullable |= input.field(*i).map_or(true, |f| f.nullable)
                    }
                    Expr::Literal(v) => nullable |= v.is_null(),
                    _ => {}
                });
                nullable
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::InputRef(i) => write!(f, "${i}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "{}({left}, {right})", op.symbol())
            }
            Expr::UnaryOp { op, operand } => write!(f, "{}({operand})", op.symbol()),
            Expr::Function { name, args, .. } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::And(args) => {
                write!(f, "AND(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Or(args) => {
                write!(f, "OR(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Over {
                func,
                args,
                partition_by,
                order_by,
            } => {
                write!(f, "{}(", func.name())?;
                write_list(f, args)?;
                write!(f, ") OVER (")?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY ")?;
                    write_list(f, partition_by)?;
                }
                if !order_by.is_empty() {
                    if !partition_by.is_empty() {
                        write!(f, " ")?;
                    }
                    write!(f, "ORDER BY ")?;
                    write_list(f, order_by)?;
                }
                write!(f, ")")
            }
        }
    }
}
