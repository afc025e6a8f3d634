//! # Memo
//!
//! The memo stores every expression the planner has seen, grouped into
//! equivalence sets ([`RelSet`]). Each set owns one [`Subset`] per requested
//! trait set, holding the cheapest physical expression found so far for those
//! traits.
//!
//! ## Arena Layout
//!
//! Sets and expressions live in two arenas addressed by stable integer ids.
//! Expressions reference their inputs by set id, never by pointer. When a rule
//! proves two sets equivalent they are merged union-find style: the younger set
//! is pointed at the older one and every lookup goes through [`Memo::find`], so
//! stale ids held anywhere (queued rule matches, child lists, callers) keep
//! resolving to the surviving set.
//!
//! ## De-duplication
//!
//! An expression is identified by its operator plus its canonical input sets.
//! Registering an expression that already exists returns the existing one. If
//! the caller asked for it to land in a different set, the two sets are merged.
//! Merging changes the canonical inputs of every consumer, which can expose
//! further duplicates; those cascade into further merges until stable.

use crate::cost::Cost;
use crate::error::{PlanError, PlanResult};
use crate::operator::{Operator, PhysicalOp};
use crate::properties::TraitSet;
use crate::rel::{format_attrs, RelNode};
use crate::stats::Statistics;
use crate::types::RowType;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

pub type SetId = u32;
pub type ExprId = u32;

/// An operator plus the ids of its input sets.
#[derive(Debug, Clone)]
pub struct MemoExpr {
    pub id: ExprId,
    pub op: Operator,
    /// Input sets, canonical as of the last merge that touched this expression.
    pub children: Vec<SetId>,
    /// Owning set at registration time; resolve with [`Memo::find`].
    pub set: SetId,
    /// Last computed cumulative cost (physical expressions only).
    pub cost: Option<Cost>,
}

/// The best physical expression for a subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Winner {
    pub expr_id: ExprId,
    pub cost: Cost,
}

#[derive(Debug, Clone)]
pub struct Subset {
    pub traits: TraitSet,
    /// `None` until some physical expression delivering these traits is costed.
    pub best: Option<Winner>,
}

/// A group of logically equivalent expressions.
#[derive(Debug, Clone)]
pub struct RelSet {
    pub id: SetId,
    pub row_type: RowType,
    pub logical_exprs: Vec<ExprId>,
    pub physical_exprs: Vec<ExprId>,
    pub subsets: Vec<Subset>,
    /// Expressions, in any set, that consume this set.
    pub parents: Vec<ExprId>,
    /// Derived lazily by the planner.
    pub stats: Option<Statistics>,
}

impl RelSet {
    pub fn subset(&self, traits: &TraitSet) -> Option<&Subset> {
        self.subsets.iter().find(|s| &s.traits == traits)
    }

    pub fn best(&self, traits: &TraitSet) -> Option<Winner> {
        self.subset(traits).and_then(|s| s.best)
    }

    pub fn exprs(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.logical_exprs.iter().chain(&self.physical_exprs).copied()
    }
}

/// Two sets that became one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    pub survivor: SetId,
    pub absorbed: SetId,
}

/// Outcome of [`Memo::insert`].
#[derive(Debug, Clone)]
pub struct Inserted {
    pub expr_id: ExprId,
    /// Canonical set the expression belongs to after any merges.
    pub set: SetId,
    /// `false` when the expression already existed.
    pub is_new: bool,
    pub merges: Vec<Merge>,
}

#[derive(Debug, Default)]
pub struct Memo {
    sets: Vec<RelSet>,
    exprs: Vec<MemoExpr>,
    parent: Vec<Cell<SetId>>,
    index: HashMap<(Operator, Vec<SetId>), ExprId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id of `set`, halving the path as it goes.
    pub fn find(&self, set: SetId) -> SetId {
        let mut current = set;
        loop {
            let parent = self.parent[current as usize].get();
            if parent == current {
                return current;
            }
            let grandparent = self.parent[parent as usize].get();
            self.parent[current as usize].set(grandparent);
            current = parent;
        }
    }

    pub fn set(&self, set: SetId) -> &RelSet {
        &self.sets[self.find(set) as usize]
    }

    pub fn set_mut(&mut self, set: SetId) -> &mut RelSet {
        let id = self.find(set);
        &mut self.sets[id as usize]
    }

    pub fn expr(&self, id: ExprId) -> &MemoExpr {
        &self.exprs[id as usize]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut MemoExpr {
        &mut self.exprs[id as usize]
    }

    /// Canonical owning set of an expression.
    pub fn set_of(&self, expr: ExprId) -> SetId {
        self.find(self.exprs[expr as usize].set)
    }

    /// Canonical input sets of an expression.
    pub fn children(&self, expr: ExprId) -> Vec<SetId> {
        self.exprs[expr as usize]
            .children
            .iter()
            .map(|&c| self.find(c))
            .collect()
    }

    /// Number of live (unmerged) sets.
    pub fn num_sets(&self) -> usize {
        (0..self.sets.len() as SetId).filter(|&s| self.find(s) == s).count()
    }

    /// Sets ever created, merged ones included.
    pub fn allocated_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    /// Ids of all live sets.
    pub fn set_ids(&self) -> Vec<SetId> {
        (0..self.sets.len() as SetId)
            .filter(|&s| self.find(s) == s)
            .collect()
    }

    /// Registers `op` over `children`.
    ///
    /// With `target` set, the expression must land in that set: its derived row
    /// type has to be equivalent to the set's, and if the expression already
    /// lives elsewhere the two sets are merged. `origin` names the caller for
    /// error reporting.
    pub fn insert(
        &mut self,
        op: Operator,
        children: &[SetId],
        target: Option<SetId>,
        origin: &str,
    ) -> PlanResult<Inserted> {
        let children: Vec<SetId> = children.iter().map(|&c| self.find(c)).collect();
        let target = target.map(|t| self.find(t));
        let key = (op, children);

        if let Some(&existing) = self.index.get(&key) {
            let existing_set = self.set_of(existing);
            let mut merges = vec![];
            if let Some(target) = target.filter(|&t| t != existing_set) {
                merges = self.merge(target, existing_set, origin)?;
            }
            return Ok(Inserted {
                expr_id: existing,
                set: self.set_of(existing),
                is_new: false,
                merges,
            });
        }

        let (op, children) = key;
        let input_types: Vec<&RowType> = children
            .iter()
            .map(|&c| &self.sets[c as usize].row_type)
            .collect();
        let Some(row_type) = op.derive_row_type(&input_types) else {
            return Err(invalid_rewrite(
                origin,
                target.map(|t| self.sets[t as usize].row_type.to_string()),
                format!("malformed {}", op.name()),
            ));
        };

        let set = match target {
            Some(t) => {
                let expected = &self.sets[t as usize].row_type;
                if !expected.equivalent_to(&row_type) {
                    return Err(invalid_rewrite(
                        origin,
                        Some(expected.to_string()),
                        row_type.to_string(),
                    ));
                }
                t
            }
            None => self.new_set(row_type),
        };

        let id = self.exprs.len() as ExprId;
        let is_physical = op.is_physical();
        self.index.insert((op.clone(), children.clone()), id);
        for (i, &child) in children.iter().enumerate() {
            if !children[..i].contains(&child) {
                self.sets[child as usize].parents.push(id);
            }
        }
        self.exprs.push(MemoExpr {
            id,
            op,
            children,
            set,
            cost: None,
        });
        let owner = &mut self.sets[set as usize];
        if is_physical {
            owner.physical_exprs.push(id);
        } else {
            owner.logical_exprs.push(id);
        }
        Ok(Inserted {
            expr_id: id,
            set,
            is_new: true,
            merges: vec![],
        })
    }

    fn new_set(&mut self, row_type: RowType) -> SetId {
        let id = self.sets.len() as SetId;
        self.sets.push(RelSet {
            id,
            row_type,
            logical_exprs: vec![],
            physical_exprs: vec![],
            subsets: vec![],
            parents: vec![],
            stats: None,
        });
        self.parent.push(Cell::new(id));
        id
    }

    /// Merges `a` and `b` and any sets that become duplicates as a consequence.
    /// The older (lower id) set survives each merge.
    pub fn merge(&mut self, a: SetId, b: SetId, origin: &str) -> PlanResult<Vec<Merge>> {
        let mut pending = vec![(a, b)];
        let mut done = vec![];
        while let Some((x, y)) = pending.pop() {
            let (x, y) = (self.find(x), self.find(y));
            if x == y {
                continue;
            }
            let (survivor, absorbed) = (x.min(y), x.max(y));
            if !self.sets[survivor as usize]
                .row_type
                .equivalent_to(&self.sets[absorbed as usize].row_type)
            {
                return Err(invalid_rewrite(
                    origin,
                    Some(self.sets[survivor as usize].row_type.to_string()),
                    self.sets[absorbed as usize].row_type.to_string(),
                ));
            }
            debug!(survivor, absorbed, origin, "merging equivalence sets");

            self.parent[absorbed as usize].set(survivor);
            let taken = std::mem::replace(
                &mut self.sets[absorbed as usize],
                RelSet {
                    id: absorbed,
                    row_type: RowType::default(),
                    logical_exprs: vec![],
                    physical_exprs: vec![],
                    subsets: vec![],
                    parents: vec![],
                    stats: None,
                },
            );
            for e in taken.exprs() {
                self.exprs[e as usize].set = survivor;
            }
            let s = &mut self.sets[survivor as usize];
            s.logical_exprs.extend(taken.logical_exprs);
            s.physical_exprs.extend(taken.physical_exprs);
            for p in taken.parents {
                if !s.parents.contains(&p) {
                    s.parents.push(p);
                }
            }
            if s.stats.is_none() {
                s.stats = taken.stats;
            }
            for subset in taken.subsets {
                match s.subsets.iter_mut().find(|x| x.traits == subset.traits) {
                    Some(existing) => {
                        if let Some(w) = subset.best {
                            if existing.best.map_or(true, |b| w.cost.is_lt(&b.cost)) {
                                existing.best = Some(w);
                            }
                        }
                    }
                    None => s.subsets.push(subset),
                }
            }
            // Physical members of either side may beat the other side's winners.
            self.reseed_subsets(survivor);

            // Consumers of the absorbed set now have new canonical inputs.
            let consumers = self.sets[survivor as usize].parents.clone();
            for p in consumers {
                let old_key = (
                    self.exprs[p as usize].op.clone(),
                    self.exprs[p as usize].children.clone(),
                );
                let canonical = self.children(p);
                if canonical == old_key.1 {
                    continue;
                }
                if self.index.get(&old_key) == Some(&p) {
                    self.index.remove(&old_key);
                }
                self.exprs[p as usize].children = canonical.clone();
                let new_key = (old_key.0, canonical);
                match self.index.get(&new_key) {
                    Some(&other) if other != p => {
                        let (os, ps) = (self.set_of(other), self.set_of(p));
                        if os != ps {
                            pending.push((os, ps));
                        }
                    }
                    _ => {
                        self.index.insert(new_key, p);
                    }
                }
            }
            done.push(Merge { survivor, absorbed });
        }
        Ok(done)
    }

    /// Creates the subset for `traits` if missing, seeding its winner from the
    /// set's already-costed physical expressions. Returns `true` if created.
    pub fn ensure_subset(&mut self, set: SetId, traits: &TraitSet) -> bool {
        let set = self.find(set);
        if self.sets[set as usize].subset(traits).is_some() {
            return false;
        }
        let mut best: Option<Winner> = None;
        for &e in &self.sets[set as usize].physical_exprs {
            let expr = &self.exprs[e as usize];
            let (Some(cost), Operator::Physical(op)) = (expr.cost, &expr.op) else {
                continue;
            };
            if op.delivered_traits().satisfies(traits) && best.map_or(true, |b| cost.is_lt(&b.cost)) {
                best = Some(Winner { expr_id: e, cost });
            }
        }
        self.sets[set as usize].subsets.push(Subset {
            traits: traits.clone(),
            best,
        });
        true
    }

    /// Recomputes every subset winner of `set` from the last computed costs of
    /// its physical members. An incumbent is only displaced by a strictly
    /// cheaper member. Returns `true` if any winner changed.
    pub fn reseed_subsets(&mut self, set: SetId) -> bool {
        let set = self.find(set);
        let exprs = &self.exprs;
        let owner = &mut self.sets[set as usize];
        let members: Vec<(ExprId, Cost, TraitSet)> = owner
            .physical_exprs
            .iter()
            .filter_map(|&e| {
                let expr = &exprs[e as usize];
                match (expr.cost, &expr.op) {
                    (Some(cost), Operator::Physical(op)) => Some((e, cost, op.delivered_traits())),
                    _ => None,
                }
            })
            .collect();

        let mut changed = false;
        for subset in &mut owner.subsets {
            let mut best = subset.best.map(|w| Winner {
                expr_id: w.expr_id,
                cost: exprs[w.expr_id as usize].cost.unwrap_or(w.cost),
            });
            for (e, cost, delivered) in &members {
                if delivered.satisfies(&subset.traits) && best.map_or(true, |b| cost.is_lt(&b.cost)) {
                    best = Some(Winner {
                        expr_id: *e,
                        cost: *cost,
                    });
                }
            }
            if best != subset.best {
                subset.best = best;
                changed = true;
            }
        }
        changed
    }

    /// Offers a costed physical expression to every subset of its set whose
    /// traits it satisfies. Returns `true` if any subset got a new winner.
    pub fn offer(&mut self, expr_id: ExprId, cost: Cost) -> bool {
        self.exprs[expr_id as usize].cost = Some(cost);
        let delivered = match &self.exprs[expr_id as usize].op {
            Operator::Physical(op) => op.delivered_traits(),
            Operator::Logical(_) => return false,
        };
        let set = self.set_of(expr_id);
        let mut improved = false;
        for subset in &mut self.sets[set as usize].subsets {
            if !delivered.satisfies(&subset.traits) {
                continue;
            }
            let better = match subset.best {
                None => true,
                Some(b) if b.expr_id == expr_id => cost != b.cost,
                Some(b) => cost.is_lt(&b.cost),
            };
            if better {
                subset.best = Some(Winner { expr_id, cost });
                improved = true;
            }
        }
        improved
    }

    /// Builds the physical plan rooted at the winner of `(set, traits)`.
    pub fn extract_best_plan(&self, set: SetId, traits: &TraitSet) -> PlanResult<PlanNode> {
        let mut path = vec![];
        self.extract(set, traits, &mut path)
    }

    fn extract(
        &self,
        set: SetId,
        traits: &TraitSet,
        path: &mut Vec<(SetId, TraitSet)>,
    ) -> PlanResult<PlanNode> {
        let set = self.find(set);
        let no_plan = || {
            let operator = self.sets[set as usize]
                .logical_exprs
                .first()
                .map(|&e| self.exprs[e as usize].op.name())
                .unwrap_or_else(|| "<empty set>".to_string());
            PlanError::NoImplementationFound {
                set,
                operator,
                traits: traits.to_string(),
            }
        };
        // An enforcer's input is its own set under weaker traits, so the
        // guard is per subset rather than per set.
        if path.iter().any(|(s, t)| *s == set && t == traits) {
            return Err(no_plan());
        }
        let winner = self.sets[set as usize].best(traits).ok_or_else(no_plan)?;
        let expr = &self.exprs[winner.expr_id as usize];
        let Operator::Physical(op) = &expr.op else {
            return Err(no_plan());
        };
        path.push((set, traits.clone()));
        let children = self.children(winner.expr_id);
        let required = op.required_input_traits(children.len());
        let inputs = children
            .iter()
            .zip(&required)
            .map(|(&c, t)| self.extract(c, t, path))
            .collect::<PlanResult<Vec<_>>>()?;
        path.pop();
        Ok(PlanNode {
            op: op.clone(),
            children: inputs,
            cost: winner.cost,
            row_count: self.sets[set as usize]
                .stats
                .as_ref()
                .map_or(1.0, |s| s.row_count),
            traits: op.delivered_traits(),
            row_type: self.sets[set as usize].row_type.clone(),
            set,
        })
    }

    /// Rebuilds a logical tree from `expr_id`, taking the first logical member
    /// of each input set that does not lead back into a set on the current path.
    pub fn extract_logical(&self, expr_id: ExprId) -> Option<RelNode> {
        let mut path = vec![self.set_of(expr_id)];
        self.extract_logical_expr(expr_id, &mut path)
    }

    fn extract_logical_expr(&self, expr_id: ExprId, path: &mut Vec<SetId>) -> Option<RelNode> {
        let op = self.exprs[expr_id as usize].op.as_logical()?.clone();
        let mut inputs = vec![];
        for child in self.children(expr_id) {
            if path.contains(&child) {
                return None;
            }
            path.push(child);
            let input = self.sets[child as usize]
                .logical_exprs
                .iter()
                .find_map(|&e| self.extract_logical_expr(e, path));
            path.pop();
            inputs.push(input?);
        }
        Some(RelNode::new(op, inputs))
    }
}

fn invalid_rewrite(origin: &str, expected: Option<String>, actual: String) -> PlanError {
    debug_assert!(
        false,
        "invalid rewrite by '{origin}': {actual} vs {}",
        expected.as_deref().unwrap_or("-")
    );
    PlanError::InvalidRewrite {
        rule: origin.to_string(),
        expected: expected.unwrap_or_else(|| "a well-formed operator".to_string()),
        actual,
    }
}

/// A node of the extracted physical plan.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub op: PhysicalOp,
    pub children: Vec<PlanNode>,
    /// Cumulative cost of this subtree.
    pub cost: Cost,
    pub row_count: f64,
    pub traits: TraitSet,
    pub row_type: RowType,
    pub set: SetId,
}

impl PlanNode {
    /// Indented print-tree: one operator per line, `key=[value]` attributes
    /// first, then the estimate and traits, then the inputs depth-first.
    pub fn display(&self, indent: usize) -> String {
        let mut out = String::new();
        self.display_into(&mut out, indent);
        out
    }

    fn display_into(&self, out: &mut String, indent: usize) {
        let op = Operator::Physical(self.op.clone());
        let _ = writeln!(
            out,
            "{}{}({}): rowcount = {}, cumulative cost = {}, traits = [{}]",
            "  ".repeat(indent),
            op.name(),
            format_attrs(&op.explain_attrs()),
            self.row_count,
            self.cost,
            self.traits
        );
        for child in &self.children {
            child.display_into(out, indent + 1);
        }
    }

    /// Pre-order list of all nodes.
    pub fn nodes(&self) -> Vec<&PlanNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.nodes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::operator::{LogicalOp, TableRef};
    use crate::types::{DataType, Field};

    fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef::new("s", name),
            row_type: RowType::new(vec![
                Field::new("a", DataType::Int64, false),
                Field::new("b", DataType::Int64, false),
            ]),
        })
    }

    fn filter(v: i64) -> Operator {
        Operator::Logical(LogicalOp::Filter {
            condition: Expr::gt(Expr::col(0), Expr::int(v)),
        })
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut memo = Memo::new();
        let a = memo.insert(scan("t"), &[], None, "test").unwrap();
        let again = memo.insert(scan("t"), &[], None, "test").unwrap();
        assert!(a.is_new);
        assert!(!again.is_new);
        assert_eq!(a.expr_id, again.expr_id);
        assert_eq!(memo.num_sets(), 1);
        assert_eq!(memo.num_exprs(), 1);

        let f = memo.insert(filter(1), &[a.set], None, "test").unwrap();
        assert_eq!(memo.set(a.set).parents, vec![f.expr_id]);
        assert_eq!(memo.children(f.expr_id), vec![a.set]);
    }

    #[test]
    fn test_row_type_mismatch_is_rejected() {
        let mut memo = Memo::new();
        let t = memo.insert(scan("t"), &[], None, "test").unwrap();
        let narrow = Operator::Logical(LogicalOp::Project {
            exprs: vec![Expr::col(0)],
            names: vec!["a".into()],
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            memo.insert(narrow, &[t.set], Some(t.set), "bad-rule")
        }));
        match result {
            // Debug builds abort at the assertion.
            Err(_) => {}
            Ok(r) => assert!(matches!(r, Err(PlanError::InvalidRewrite { .. }))),
        }
    }

    #[test]
    fn test_merge_cascades_to_consumers() {
        let mut memo = Memo::new();
        let t = memo.insert(scan("t"), &[], None, "test").unwrap();
        let u = memo.insert(scan("u"), &[], None, "test").unwrap();
        let ft = memo.insert(filter(1), &[t.set], None, "test").unwrap();
        let fu = memo.insert(filter(1), &[u.set], None, "test").unwrap();
        assert_ne!(ft.set, fu.set);

        // Declaring scan(u) equivalent to t makes the two filters identical too.
        let merged = memo.insert(scan("u"), &[], Some(t.set), "test").unwrap();
        assert!(!merged.is_new);
        assert_eq!(merged.merges.len(), 2);
        assert_eq!(memo.find(u.set), memo.find(t.set));
        assert_eq!(memo.find(fu.set), memo.find(ft.set));
        assert_eq!(memo.set(t.set).logical_exprs.len(), 2);
        assert_eq!(memo.num_sets(), 2);
        // Stale ids still resolve.
        assert_eq!(memo.set_of(fu.expr_id), memo.find(ft.set));
    }

    #[test]
    fn test_subsets_and_winners() {
        let mut memo = Memo::new();
        let t = memo.insert(scan("t"), &[], None, "test").unwrap();
        let seq = Operator::Physical(PhysicalOp::SeqScan {
            table: TableRef::new("s", "t"),
            row_type: memo.set(t.set).row_type.clone(),
        });
        let p = memo.insert(seq, &[], Some(t.set), "test").unwrap();
        assert!(memo.ensure_subset(t.set, &TraitSet::physical()));
        assert!(!memo.ensure_subset(t.set, &TraitSet::physical()));
        assert!(memo.offer(p.expr_id, Cost::new(10.0, 11.0, 20.0)));
        // Re-offering the incumbent at the same cost changes nothing.
        assert!(!memo.offer(p.expr_id, Cost::new(10.0, 11.0, 20.0)));

        let plan = memo.extract_best_plan(t.set, &TraitSet::physical()).unwrap();
        assert_eq!(plan.cost, Cost::new(10.0, 11.0, 20.0));
        assert!(plan.display(0).starts_with("SeqScan(table=[s.t]): rowcount = 1"));

        let sorted = TraitSet::physical().with_collation(vec![crate::operator::SortKey::asc(0)]);
        memo.ensure_subset(t.set, &sorted);
        assert!(matches!(
            memo.extract_best_plan(t.set, &sorted),
            Err(PlanError::NoImplementationFound { .. })
        ));
        assert!(memo.extract_logical(t.expr_id).is_some());
    }

    #[test]
    fn test_merge_picks_cheaper_absorbed_winner() {
        let mut memo = Memo::new();
        let t = memo.insert(scan("t"), &[], None, "test").unwrap();
        let u = memo.insert(scan("u"), &[], None, "test").unwrap();
        let seq = |memo: &Memo, name: &str, set: SetId| {
            Operator::Physical(PhysicalOp::SeqScan {
                table: TableRef::new("s", name),
                row_type: memo.set(set).row_type.clone(),
            })
        };
        let op = seq(&memo, "t", t.set);
        let pt = memo.insert(op, &[], Some(t.set), "test").unwrap();
        memo.ensure_subset(t.set, &TraitSet::physical());
        memo.offer(pt.expr_id, Cost::new(1000.0, 1001.0, 2000.0));

        // Costed, but nothing ever asked the absorbed set for a subset.
        let op = seq(&memo, "u", u.set);
        let pu = memo.insert(op, &[], Some(u.set), "test").unwrap();
        assert!(!memo.offer(pu.expr_id, Cost::new(10.0, 11.0, 20.0)));

        memo.merge(t.set, u.set, "test").unwrap();
        let best = memo.set(t.set).best(&TraitSet::physical()).unwrap();
        assert_eq!(best.expr_id, pu.expr_id);
        assert_eq!(best.cost, Cost::new(10.0, 11.0, 20.0));
    }

    #[test]
    fn test_reseed_keeps_incumbent_on_ties() {
        let mut memo = Memo::new();
        let t = memo.insert(scan("t"), &[], None, "test").unwrap();
        let row_type = memo.set(t.set).row_type.clone();
        let a = memo
            .insert(
                Operator::Physical(PhysicalOp::SeqScan {
                    table: TableRef::new("s", "t"),
                    row_type: row_type.clone(),
                }),
                &[],
                Some(t.set),
                "test",
            )
            .unwrap();
        let b = memo
            .insert(
                Operator::Physical(PhysicalOp::Filter {
                    condition: Expr::gt(Expr::col(0), Expr::int(0)),
                }),
                &[t.set],
                Some(t.set),
                "test",
            )
            .unwrap();
        memo.ensure_subset(t.set, &TraitSet::physical());
        memo.offer(a.expr_id, Cost::new(5.0, 6.0, 10.0));
        memo.offer(b.expr_id, Cost::new(5.0, 6.0, 10.0));
        assert!(!memo.reseed_subsets(t.set));
        assert_eq!(memo.set(t.set).best(&TraitSet::physical()).unwrap().expr_id, a.expr_id);
    }
}
