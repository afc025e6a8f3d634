//! # Predicate Pull-Up and Inference
//!
//! For every operator this module computes the conjuncts that provably hold on
//! each of its output rows, derived from its own semantics and the predicates
//! already pulled up from its inputs. The analysis is sound but incomplete: it
//! never reports a predicate it cannot prove, and it limits inference to
//! equality substitution through one join.
//!
//! Joins additionally report *inferred* predicates for each input: conditions
//! the other side and the join's equalities imply about that input, which a
//! rule can inject as a filter below the join.
//!
//! [`predicates_for`] analyzes a stand-alone [`RelNode`] tree. Inside the
//! planner, [`MetadataQuery`] answers the same question per equivalence set,
//! caching results for the duration of one query.

use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::mapping::{column_range, ColumnSet};
use crate::memo::{ExprId, Memo, SetId};
use crate::operator::{JoinType, LogicalOp, Operator};
use crate::rel::RelNode;
use crate::types::RowType;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Upper bound on the column substitutions tried for a single predicate.
const MAX_SUBSTITUTIONS: usize = 256;

/// Predicates known to hold on an operator's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PulledUpPredicates {
    /// Conjuncts over the operator's output columns.
    pub pulled_up: Vec<Expr>,
    /// For joins: new conjuncts over the left input's columns.
    pub left_inferred: Vec<Expr>,
    /// For joins: new conjuncts over the right input's columns (numbered from 0).
    pub right_inferred: Vec<Expr>,
}

impl PulledUpPredicates {
    pub fn empty() -> Self {
        Self::default()
    }

    fn of(pulled_up: Vec<Expr>) -> Self {
        Self {
            pulled_up,
            ..Self::default()
        }
    }

    /// The pulled-up predicates as one conjunction (TRUE if none).
    pub fn to_expr(&self) -> Expr {
        Expr::and_all(self.pulled_up.iter().cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.pulled_up.is_empty() && self.left_inferred.is_empty() && self.right_inferred.is_empty()
    }
}

fn push_unique(out: &mut Vec<Expr>, e: Expr) {
    if !out.contains(&e) {
        out.push(e);
    }
}

/// Pulled-up predicates of `op` given its inputs' predicates and row types.
pub fn pull_up(
    op: &LogicalOp,
    inputs: &[&PulledUpPredicates],
    input_types: &[&RowType],
) -> PulledUpPredicates {
    match op {
        LogicalOp::Scan { .. } | LogicalOp::Collect { .. } => PulledUpPredicates::empty(),
        LogicalOp::Filter { condition } => {
            let mut out = first(inputs);
            for c in condition.conjuncts() {
                if c.is_deterministic() && !c.is_always_true() {
                    push_unique(&mut out, c.clone());
                }
            }
            PulledUpPredicates::of(out)
        }
        LogicalOp::Project { exprs, .. } => PulledUpPredicates::of(project(exprs, &first(inputs))),
        LogicalOp::Aggregate { group_set, .. } => {
            PulledUpPredicates::of(aggregate(group_set, &first(inputs)))
        }
        LogicalOp::Sort { .. } | LogicalOp::Window { .. } => PulledUpPredicates::of(first(inputs)),
        LogicalOp::Correlate { join_type, .. } => match join_type {
            JoinType::Inner | JoinType::Left | JoinType::Semi | JoinType::Anti => {
                PulledUpPredicates::of(first(inputs))
            }
            _ => PulledUpPredicates::empty(),
        },
        LogicalOp::Union { .. } => {
            let disjunction = Expr::or_all(inputs.iter().map(|p| p.to_expr()));
            if inputs.is_empty() || disjunction.is_always_true() {
                PulledUpPredicates::empty()
            } else {
                PulledUpPredicates::of(vec![disjunction])
            }
        }
        LogicalOp::Intersect { .. } => {
            let mut out = vec![];
            for p in inputs {
                for e in &p.pulled_up {
                    push_unique(&mut out, e.clone());
                }
            }
            PulledUpPredicates::of(out)
        }
        LogicalOp::Minus { .. } => PulledUpPredicates::of(first(inputs)),
        LogicalOp::Join {
            join_type,
            condition,
        } => match (inputs, input_types) {
            ([left, right], [lt, rt]) => join(
                *join_type,
                condition,
                left,
                right,
                lt.field_count(),
                rt.field_count(),
            ),
            _ => PulledUpPredicates::empty(),
        },
    }
}

fn first(inputs: &[&PulledUpPredicates]) -> Vec<Expr> {
    inputs.first().map(|p| p.pulled_up.clone()).unwrap_or_default()
}

fn project(exprs: &[Expr], input: &[Expr]) -> Vec<Expr> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    for (i, e) in exprs.iter().enumerate() {
        if let Some(c) = e.as_input_ref() {
            mapping.entry(c).or_insert(i);
        }
    }
    let mut out = vec![];
    for p in input {
        if let Some(mapped) = p.map_columns(&|c| mapping.get(&c).copied()) {
            push_unique(&mut out, mapped);
        }
    }
    for (i, e) in exprs.iter().enumerate() {
        if let Some(value) = e.as_literal() {
            let constant = if value.is_null() {
                Expr::is_null(Expr::col(i))
            } else {
                Expr::eq(Expr::col(i), e.clone())
            };
            push_unique(&mut out, constant);
        }
    }
    out
}

fn aggregate(group_set: &[usize], input: &[Expr]) -> Vec<Expr> {
    let position = |c: usize| group_set.iter().position(|&g| g == c);
    input
        .iter()
        // A predicate without column references could be false on an empty
        // input while a global aggregate still emits a row.
        .filter(|p| !p.input_refs().is_empty())
        .filter_map(|p| p.map_columns(&position))
        .collect()
}

fn join(
    join_type: JoinType,
    condition: &Expr,
    left: &PulledUpPredicates,
    right: &PulledUpPredicates,
    n_left: usize,
    n_right: usize,
) -> PulledUpPredicates {
    let n_total = n_left + n_right;
    let left_fields = column_range(0, n_left);
    let right_fields = column_range(n_left, n_total);
    let all_fields = column_range(0, n_total);

    let left_preds = left.pulled_up.clone();
    let right_preds: Vec<Expr> = right
        .pulled_up
        .iter()
        .map(|e| e.shift(n_left as isize))
        .collect();
    let join_preds: Vec<Expr> = condition
        .conjuncts()
        .into_iter()
        .filter(|c| c.is_deterministic())
        .cloned()
        .collect();

    let mut all_exprs: Vec<Expr> = vec![];
    for e in left_preds.iter().chain(&right_preds).chain(&join_preds) {
        push_unique(&mut all_exprs, e.clone());
    }
    let closure = EquivalenceClosure::from_predicates(n_total, &all_exprs);

    let mut inferred = vec![];
    if matches!(join_type, JoinType::Inner | JoinType::Left | JoinType::Semi) {
        let target = if join_type == JoinType::Left {
            &right_fields
        } else {
            &all_fields
        };
        closure.infer(&left_preds, &mut all_exprs, &mut inferred, target);
    }
    if matches!(join_type, JoinType::Inner | JoinType::Right | JoinType::Semi) {
        let target = if join_type == JoinType::Right {
            &left_fields
        } else {
            &all_fields
        };
        closure.infer(&right_preds, &mut all_exprs, &mut inferred, target);
    }

    let left_inferred: Vec<Expr> = inferred
        .iter()
        .filter(|e| e.input_refs().is_subset(&left_fields))
        .cloned()
        .collect();
    let right_inferred: Vec<Expr> = inferred
        .iter()
        .filter(|e| e.input_refs().is_subset(&right_fields))
        .map(|e| e.shift(-(n_left as isize)))
        .collect();

    match join_type {
        JoinType::Inner => {
            let mut pulled_up = vec![];
            for e in left_preds
                .into_iter()
                .chain(right_preds)
                .chain(join_preds)
                .chain(inferred)
            {
                push_unique(&mut pulled_up, e);
            }
            PulledUpPredicates {
                pulled_up,
                left_inferred,
                right_inferred,
            }
        }
        JoinType::Left => PulledUpPredicates {
            pulled_up: left_preds,
            left_inferred: vec![],
            right_inferred,
        },
        JoinType::Right => PulledUpPredicates {
            pulled_up: right_preds,
            left_inferred,
            right_inferred: vec![],
        },
        JoinType::Semi => {
            let mut pulled_up = left_preds;
            for e in &left_inferred {
                push_unique(&mut pulled_up, e.clone());
            }
            PulledUpPredicates {
                pulled_up,
                left_inferred,
                right_inferred,
            }
        }
        JoinType::Anti => PulledUpPredicates::of(left_preds),
        JoinType::Full => PulledUpPredicates::empty(),
    }
}

/// Column equivalence classes induced by `$a = $b` conjuncts.
#[derive(Debug, Clone)]
pub struct EquivalenceClosure {
    parent: Vec<usize>,
}

impl EquivalenceClosure {
    pub fn new(n_columns: usize) -> Self {
        Self {
            parent: (0..n_columns).collect(),
        }
    }

    pub fn from_predicates(n_columns: usize, predicates: &[Expr]) -> Self {
        let mut closure = Self::new(n_columns);
        for p in predicates {
            if let Some((a, b)) = p.as_ref_equality() {
                closure.add(a, b);
            }
        }
        closure
    }

    fn root(&self, mut c: usize) -> usize {
        while self.parent[c] != c {
            c = self.parent[c];
        }
        c
    }

    /// Records `$a = $b`. Out-of-range columns are ignored.
    pub fn add(&mut self, a: usize, b: usize) {
        if a >= self.parent.len() || b >= self.parent.len() {
            return;
        }
        let (ra, rb) = (self.root(a), self.root(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }

    pub fn are_equivalent(&self, a: usize, b: usize) -> bool {
        a < self.parent.len() && b < self.parent.len() && self.root(a) == self.root(b)
    }

    /// Every column equivalent to `c`, including `c`, ascending.
    pub fn class_of(&self, c: usize) -> Vec<usize> {
        if c >= self.parent.len() {
            return vec![c];
        }
        let root = self.root(c);
        (0..self.parent.len()).filter(|&x| self.root(x) == root).collect()
    }

    /// Adds to `inferred` every rewrite of a predicate in `predicates` obtained
    /// by replacing columns with equivalent ones, provided the rewrite reads
    /// only `target` columns, is not in `known` and is not trivially true.
    /// Column equalities are never inferred; the closure already implies them.
    pub fn infer(
        &self,
        predicates: &[Expr],
        known: &mut Vec<Expr>,
        inferred: &mut Vec<Expr>,
        target: &ColumnSet,
    ) {
        for p in predicates {
            let columns: Vec<usize> = p.input_refs().iter().collect();
            if columns.is_empty() {
                continue;
            }
            let classes: Vec<Vec<usize>> = columns.iter().map(|&c| self.class_of(c)).collect();
            let mut choice = vec![0usize; columns.len()];
            let mut tried = 0;
            loop {
                tried += 1;
                let image: HashMap<usize, usize> = columns
                    .iter()
                    .zip(&choice)
                    .zip(&classes)
                    .map(|((&c, &k), class)| (c, class[k]))
                    .collect();
                if let Some(rewritten) = p.map_columns(&|c| image.get(&c).copied()) {
                    let implied = rewritten
                        .as_ref_equality()
                        .is_some_and(|(a, b)| self.are_equivalent(a, b));
                    if rewritten.input_refs().is_subset(target)
                        && !implied
                        && !known.contains(&rewritten)
                        && !is_trivially_true(&rewritten)
                    {
                        known.push(rewritten.clone());
                        inferred.push(rewritten);
                    }
                }
                if tried >= MAX_SUBSTITUTIONS || !advance(&mut choice, &classes) {
                    break;
                }
            }
        }
    }
}

/// Odometer step over the cartesian product of `classes`.
fn advance(choice: &mut [usize], classes: &[Vec<usize>]) -> bool {
    for i in (0..choice.len()).rev() {
        choice[i] += 1;
        if choice[i] < classes[i].len() {
            return true;
        }
        choice[i] = 0;
    }
    false
}

/// `$a = $a`, `$a <= $a`, `$a >= $a` and literal TRUE.
fn is_trivially_true(e: &Expr) -> bool {
    match e {
        Expr::BinaryOp {
            op: BinaryOp::Eq | BinaryOp::LtEq | BinaryOp::GtEq,
            left,
            right,
        } => left == right,
        _ => e.is_always_true(),
    }
}

/// Predicates pulled up from a logical tree.
pub fn predicates_for(node: &RelNode) -> PulledUpPredicates {
    let inputs: Vec<PulledUpPredicates> = node.inputs.iter().map(predicates_for).collect();
    let types: Vec<RowType> = node
        .inputs
        .iter()
        .map(|i| i.row_type().unwrap_or_default())
        .collect();
    pull_up(
        &node.op,
        &inputs.iter().collect::<Vec<_>>(),
        &types.iter().collect::<Vec<_>>(),
    )
}

/// Whether `condition` can only be true when some column in `columns` is
/// non-null. A conjunct rejects nulls on a column if it is a comparison or
/// `IS NOT NULL` over that column.
pub fn rejects_nulls_on(condition: &Expr, columns: &ColumnSet) -> bool {
    condition.conjuncts().into_iter().any(|c| match c {
        Expr::BinaryOp { op, left, right } if op.is_comparison() => [left, right]
            .iter()
            .any(|side| side.as_input_ref().is_some_and(|i| columns.contains(i))),
        Expr::UnaryOp {
            op: UnaryOp::IsNotNull,
            operand,
        } => operand.as_input_ref().is_some_and(|i| columns.contains(i)),
        _ => false,
    })
}

/// Per-query cache of set-level predicates.
#[derive(Debug, Default)]
pub struct PredicateCache {
    sets: RefCell<HashMap<SetId, Arc<PulledUpPredicates>>>,
    in_progress: RefCell<HashSet<SetId>>,
}

impl PredicateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry; required after sets merge.
    pub fn clear(&self) {
        self.sets.borrow_mut().clear();
        self.in_progress.borrow_mut().clear();
    }
}

/// Predicate queries against the memo.
#[derive(Clone, Copy)]
pub struct MetadataQuery<'a> {
    memo: &'a Memo,
    cache: &'a PredicateCache,
}

impl<'a> MetadataQuery<'a> {
    pub fn new(memo: &'a Memo, cache: &'a PredicateCache) -> Self {
        Self { memo, cache }
    }

    /// Predicates holding on every row of `set`, derived from its first
    /// logical expression.
    pub fn predicates(&self, set: SetId) -> Arc<PulledUpPredicates> {
        let set = self.memo.find(set);
        if let Some(cached) = self.cache.sets.borrow().get(&set) {
            return Arc::clone(cached);
        }
        // Cycles through merged sets yield nothing rather than recursing forever.
        if !self.cache.in_progress.borrow_mut().insert(set) {
            return Arc::new(PulledUpPredicates::empty());
        }
        let result = Arc::new(
            self.memo
                .set(set)
                .logical_exprs
                .first()
                .map(|&e| self.expr_predicates(e))
                .unwrap_or_default(),
        );
        self.cache.in_progress.borrow_mut().remove(&set);
        self.cache.sets.borrow_mut().insert(set, Arc::clone(&result));
        result
    }

    /// Predicates of one logical expression, including join inference.
    pub fn expr_predicates(&self, expr_id: ExprId) -> PulledUpPredicates {
        let expr = self.memo.expr(expr_id);
        let Operator::Logical(op) = &expr.op else {
            return PulledUpPredicates::empty();
        };
        let children = self.memo.children(expr_id);
        let inputs: Vec<Arc<PulledUpPredicates>> =
            children.iter().map(|&c| self.predicates(c)).collect();
        let types: Vec<&RowType> = children.iter().map(|&c| &self.memo.set(c).row_type).collect();
        pull_up(op, &inputs.iter().map(|p| p.as_ref()).collect::<Vec<_>>(), &types)
    }
}
