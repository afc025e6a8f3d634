//! Reference evaluation of logical trees over in-memory tables.
//!
//! This is the correctness oracle for rewrites: a rule is sound if the tree it
//! produces evaluates to the same row multiset as the tree it started from.
//! Evaluation is naive (nested loops, full materialization) and follows SQL
//! three-valued logic. Correlate, Collect and Window are not supported.

use crate::expr::{AggFunc, BinaryOp, Expr, ScalarValue, UnaryOp};
use crate::operator::{AggCall, JoinType, LogicalOp, SortKey, TableRef};
use crate::rel::RelNode;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::HashMap;

pub type Row = Vec<ScalarValue>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("no rows registered for table '{0}'")]
    UnknownTable(String),
    #[error("evaluation of {0} is not supported")]
    Unsupported(String),
    #[error("malformed tree: {0}")]
    Malformed(String),
}

/// Rows per table.
#[derive(Debug, Clone, Default)]
pub struct TestDatabase {
    tables: HashMap<TableRef, Vec<Row>>,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &TableRef, rows: Vec<Row>) {
        self.tables.insert(table.clone(), rows);
    }

    pub fn with_table(mut self, table: &TableRef, rows: Vec<Row>) -> Self {
        self.insert(table, rows);
        self
    }

    pub fn rows(&self, table: &TableRef) -> Option<&[Row]> {
        self.tables.get(table).map(Vec::as_slice)
    }
}

/// A row of nullable integers.
pub fn int_row(values: &[Option<i64>]) -> Row {
    values
        .iter()
        .map(|v| v.map_or(ScalarValue::Null, ScalarValue::Int64))
        .collect()
}

/// Rows in a deterministic order, for multiset comparison.
pub fn canonical(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by_cached_key(|r| format!("{r:?}"));
    rows
}

pub fn evaluate(node: &RelNode, db: &TestDatabase) -> Result<Vec<Row>, EvalError> {
    let inputs = node
        .inputs
        .iter()
        .map(|i| evaluate(i, db))
        .collect::<Result<Vec<_>, _>>()?;
    let single = || {
        inputs
            .first()
            .cloned()
            .ok_or_else(|| EvalError::Malformed(format!("{:?} without input", node.op.kind())))
    };

    match &node.op {
        LogicalOp::Scan { table, .. } => db
            .rows(table)
            .map(<[Row]>::to_vec)
            .ok_or_else(|| EvalError::UnknownTable(table.to_string())),
        LogicalOp::Filter { condition } => Ok(single()?
            .into_iter()
            .filter(|r| is_true(&eval_expr(condition, r)))
            .collect()),
        LogicalOp::Project { exprs, .. } => Ok(single()?
            .iter()
            .map(|r| exprs.iter().map(|e| eval_expr(e, r)).collect())
            .collect()),
        LogicalOp::Join {
            join_type,
            condition,
        } => {
            let widths: Vec<usize> = node
                .inputs
                .iter()
                .map(|i| i.row_type().map_or(0, |t| t.field_count()))
                .collect();
            match (inputs.as_slice(), widths.as_slice()) {
                ([left, right], [lw, rw]) => Ok(join(*join_type, condition, left, right, *lw, *rw)),
                _ => Err(EvalError::Malformed("join needs two inputs".into())),
            }
        }
        LogicalOp::Aggregate {
            group_set,
            aggregates,
        } => Ok(aggregate(&single()?, group_set, aggregates)),
        LogicalOp::Sort {
            collation,
            offset,
            fetch,
        } => {
            let mut rows = single()?;
            rows.sort_by(|a, b| compare_rows(a, b, collation));
            let skip = offset.unwrap_or(0) as usize;
            let take = fetch.map_or(usize::MAX, |f| f as usize);
            Ok(rows.into_iter().skip(skip).take(take).collect())
        }
        LogicalOp::Union { all } => {
            let rows: Vec<Row> = inputs.into_iter().flatten().collect();
            Ok(if *all { rows } else { distinct(rows) })
        }
        LogicalOp::Intersect { all } => {
            let mut iter = inputs.into_iter();
            let mut acc = iter.next().unwrap_or_default();
            for other in iter {
                let mut counts = multiset(&other);
                acc.retain(|r| match counts.get_mut(r) {
                    Some(n) if *n > 0 => {
                        *n -= 1;
                        true
                    }
                    _ => false,
                });
            }
            Ok(if *all { acc } else { distinct(acc) })
        }
        LogicalOp::Minus { all } => {
            let mut iter = inputs.into_iter();
            let first = iter.next().unwrap_or_default();
            let rest: Vec<Row> = iter.flatten().collect();
            if *all {
                let mut counts = multiset(&rest);
                Ok(first
                    .into_iter()
                    .filter(|r| match counts.get_mut(r) {
                        Some(n) if *n > 0 => {
                            *n -= 1;
                            false
                        }
                        _ => true,
                    })
                    .collect())
            } else {
                Ok(distinct(first.into_iter().filter(|r| !rest.contains(r)).collect()))
            }
        }
        LogicalOp::Correlate { .. } | LogicalOp::Collect { .. } | LogicalOp::Window { .. } => {
            Err(EvalError::Unsupported(format!("{:?}", node.op.kind())))
        }
    }
}

fn is_true(v: &ScalarValue) -> bool {
    matches!(v, ScalarValue::Bool(true))
}

fn multiset(rows: &[Row]) -> HashMap<Row, usize> {
    let mut counts = HashMap::new();
    for r in rows {
        *counts.entry(r.clone()).or_insert(0) += 1;
    }
    counts
}

fn distinct(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    for r in rows {
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}

fn join(
    join_type: JoinType,
    condition: &Expr,
    left: &[Row],
    right: &[Row],
    left_width: usize,
    right_width: usize,
) -> Vec<Row> {
    let mut out = vec![];
    let mut right_matched = vec![false; right.len()];
    for l in left {
        let mut matched = false;
        for (j, r) in right.iter().enumerate() {
            let combined: Row = l.iter().chain(r).cloned().collect();
            if is_true(&eval_expr(condition, &combined)) {
                matched = true;
                right_matched[j] = true;
                if !matches!(join_type, JoinType::Semi | JoinType::Anti) {
                    out.push(combined);
                }
            }
        }
        match join_type {
            JoinType::Semi if matched => out.push(l.clone()),
            JoinType::Anti if !matched => out.push(l.clone()),
            JoinType::Left | JoinType::Full if !matched => {
                let mut padded = l.clone();
                padded.extend(std::iter::repeat(ScalarValue::Null).take(right_width));
                out.push(padded);
            }
            _ => {}
        }
    }
    if matches!(join_type, JoinType::Right | JoinType::Full) {
        for (r, _) in right.iter().zip(&right_matched).filter(|(_, m)| !**m) {
            let mut padded: Row = std::iter::repeat(ScalarValue::Null).take(left_width).collect();
            padded.extend(r.iter().cloned());
            out.push(padded);
        }
    }
    out
}

fn aggregate(rows: &[Row], group_set: &[usize], calls: &[AggCall]) -> Vec<Row> {
    let mut order: Vec<Row> = vec![];
    let mut groups: HashMap<Row, Vec<&Row>> = HashMap::new();
    for r in rows {
        let key: Row = group_set.iter().map(|&g| r[g].clone()).collect();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                vec![]
            })
            .push(r);
    }
    // A global aggregate emits one row even for empty input.
    if group_set.is_empty() && order.is_empty() {
        order.push(vec![]);
        groups.insert(vec![], vec![]);
    }
    order
        .into_iter()
        .map(|key| {
            let members = &groups[&key];
            let mut out = key.clone();
            out.extend(calls.iter().map(|c| agg_value(c, members)));
            out
        })
        .collect()
}

fn agg_value(call: &AggCall, rows: &[&Row]) -> ScalarValue {
    if call.func == AggFunc::Count && call.args.is_empty() {
        return ScalarValue::Int64(rows.len() as i64);
    }
    let Some(&arg) = call.args.first() else {
        return ScalarValue::Null;
    };
    let mut values: Vec<ScalarValue> = rows
        .iter()
        .map(|r| r[arg].clone())
        .filter(|v| !v.is_null())
        .collect();
    if call.distinct {
        values = distinct(values.into_iter().map(|v| vec![v]).collect())
            .into_iter()
            .flatten()
            .collect();
    }
    match call.func {
        AggFunc::Count => ScalarValue::Int64(values.len() as i64),
        AggFunc::Sum => values
            .into_iter()
            .reduce(|a, b| arithmetic(BinaryOp::Add, &a, &b))
            .unwrap_or(ScalarValue::Null),
        AggFunc::Avg => {
            let nums: Vec<f64> = values.iter().filter_map(as_f64).collect();
            if nums.is_empty() {
                ScalarValue::Null
            } else {
                ScalarValue::Float64(OrderedFloat(nums.iter().sum::<f64>() / nums.len() as f64))
            }
        }
        AggFunc::Min => values
            .into_iter()
            .reduce(|a, b| if compare(&b, &a) == Some(Ordering::Less) { b } else { a })
            .unwrap_or(ScalarValue::Null),
        AggFunc::Max => values
            .into_iter()
            .reduce(|a, b| if compare(&b, &a) == Some(Ordering::Greater) { b } else { a })
            .unwrap_or(ScalarValue::Null),
    }
}

fn compare_rows(a: &Row, b: &Row, collation: &[SortKey]) -> Ordering {
    for key in collation {
        let (x, y) = (&a[key.field], &b[key.field]);
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if key.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if key.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let o = compare(x, y).unwrap_or(Ordering::Equal);
                if key.ascending {
                    o
                } else {
                    o.reverse()
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn as_f64(v: &ScalarValue) -> Option<f64> {
    match v {
        ScalarValue::Int64(i) => Some(*i as f64),
        ScalarValue::Float64(f) => Some(f.0),
        _ => None,
    }
}

/// SQL comparison; `None` when either side is NULL or the types differ.
pub fn compare(a: &ScalarValue, b: &ScalarValue) -> Option<Ordering> {
    match (a, b) {
        (ScalarValue::Int64(x), ScalarValue::Int64(y)) => Some(x.cmp(y)),
        (ScalarValue::Utf8(x), ScalarValue::Utf8(y)) => Some(x.cmp(y)),
        (ScalarValue::Bool(x), ScalarValue::Bool(y)) => Some(x.cmp(y)),
        (ScalarValue::Date(x), ScalarValue::Date(y)) => Some(x.cmp(y)),
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

fn arithmetic(op: BinaryOp, a: &ScalarValue, b: &ScalarValue) -> ScalarValue {
    if let (ScalarValue::Int64(x), ScalarValue::Int64(y)) = (a, b) {
        let r = match op {
            BinaryOp::Add => x.checked_add(*y),
            BinaryOp::Sub => x.checked_sub(*y),
            BinaryOp::Mul => x.checked_mul(*y),
            BinaryOp::Div => x.checked_div(*y),
            _ => None,
        };
        return r.map_or(ScalarValue::Null, ScalarValue::Int64);
    }
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return ScalarValue::Null;
    };
    let r = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div if y != 0.0 => x / y,
        _ => return ScalarValue::Null,
    };
    ScalarValue::Float64(OrderedFloat(r))
}

/// Evaluates `expr` against one row. Unknown functions and windowed
/// aggregates evaluate to NULL.
pub fn eval_expr(expr: &Expr, row: &Row) -> ScalarValue {
    match expr {
        Expr::InputRef(i) => row.get(*i).cloned().unwrap_or(ScalarValue::Null),
        Expr::Literal(v) => v.clone(),
        Expr::BinaryOp { op, left, right } => {
            let (l, r) = (eval_expr(left, row), eval_expr(right, row));
            if l.is_null() || r.is_null() {
                return ScalarValue::Null;
            }
            if op.is_comparison() {
                let Some(ord) = compare(&l, &r) else {
                    return ScalarValue::Null;
                };
                let holds = match op {
                    BinaryOp::Eq => ord == Ordering::Equal,
                    BinaryOp::NotEq => ord != Ordering::Equal,
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::LtEq => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                };
                ScalarValue::Bool(holds)
            } else {
                arithmetic(*op, &l, &r)
            }
        }
        Expr::UnaryOp { op, operand } => {
            let v = eval_expr(operand, row);
            match op {
                UnaryOp::IsNull => ScalarValue::Bool(v.is_null()),
                UnaryOp::IsNotNull => ScalarValue::Bool(!v.is_null()),
                UnaryOp::Not => match v {
                    ScalarValue::Bool(b) => ScalarValue::Bool(!b),
                    _ => ScalarValue::Null,
                },
                UnaryOp::Neg => match v {
                    ScalarValue::Int64(i) => i.checked_neg().map_or(ScalarValue::Null, ScalarValue::Int64),
                    ScalarValue::Float64(f) => ScalarValue::Float64(-f),
                    _ => ScalarValue::Null,
                },
            }
        }
        Expr::And(terms) => {
            let mut unknown = false;
            for t in terms {
                match eval_expr(t, row) {
                    ScalarValue::Bool(false) => return ScalarValue::Bool(false),
                    ScalarValue::Bool(true) => {}
                    _ => unknown = true,
                }
            }
            if unknown {
                ScalarValue::Null
            } else {
                ScalarValue::Bool(true)
            }
        }
        Expr::Or(terms) => {
            let mut unknown = false;
            for t in terms {
                match eval_expr(t, row) {
                    ScalarValue::Bool(true) => return ScalarValue::Bool(true),
                    ScalarValue::Bool(false) => {}
                    _ => unknown = true,
                }
            }
            if unknown {
                ScalarValue::Null
            } else {
                ScalarValue::Bool(false)
            }
        }
        Expr::Function { .. } | Expr::Over { .. } => ScalarValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field, RowType};

    fn t() -> (TableRef, RelNode) {
        let table = TableRef::new("s", "t");
        let rt = RowType::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Int64, true),
        ]);
        (table.clone(), RelNode::scan(table, rt))
    }

    #[test]
    fn test_three_valued_logic() {
        let row = int_row(&[None, Some(1)]);
        let unknown = Expr::gt(Expr::col(0), Expr::int(0));
        assert_eq!(eval_expr(&unknown, &row), ScalarValue::Null);
        let or = Expr::or_all([unknown.clone(), Expr::eq(Expr::col(1), Expr::int(1))]);
        assert_eq!(eval_expr(&or, &row), ScalarValue::Bool(true));
        let and = Expr::and_all([unknown, Expr::eq(Expr::col(1), Expr::int(1))]);
        assert_eq!(eval_expr(&and, &row), ScalarValue::Null);
        assert_eq!(eval_expr(&Expr::is_null(Expr::col(0)), &row), ScalarValue::Bool(true));
    }

    #[test]
    fn test_outer_join_and_aggregate() {
        let (table, scan) = t();
        let db = TestDatabase::new().with_table(
            &table,
            vec![int_row(&[Some(1), Some(10)]), int_row(&[Some(2), None])],
        );
        let join = scan.clone().join(
            scan.clone().filter(Expr::eq(Expr::col(0), Expr::int(1))),
            JoinType::Left,
            Expr::eq(Expr::col(0), Expr::col(2)),
        );
        let rows = evaluate(&join, &db).unwrap();
        assert_eq!(
            canonical(rows),
            vec![
                int_row(&[Some(1), Some(10), Some(1), Some(10)]),
                int_row(&[Some(2), None, None, None]),
            ]
        );

        let agg = scan.aggregate(
            vec![],
            vec![
                AggCall::count_star("c"),
                AggCall::new(AggFunc::Sum, vec![1], "s"),
            ],
        );
        assert_eq!(
            evaluate(&agg, &db).unwrap(),
            vec![int_row(&[Some(2), Some(10)])]
        );
    }

    #[test]
    fn test_global_aggregate_on_empty_input() {
        let (table, scan) = t();
        let db = TestDatabase::new().with_table(&table, vec![]);
        let agg = scan.aggregate(vec![], vec![AggCall::count_star("c")]);
        assert_eq!(evaluate(&agg, &db).unwrap(), vec![int_row(&[Some(0)])]);
    }

    #[test]
    fn test_unknown_table() {
        let (_, scan) = t();
        assert!(matches!(
            evaluate(&scan, &TestDatabase::new()),
            Err(EvalError::UnknownTable(_))
        ));
    }
}
