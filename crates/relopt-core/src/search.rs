//! # Volcano Search
//!
//! [`VolcanoPlanner`] drives the optimization of one query.
//!
//! ## How It Works
//!
//! 1. **Registration**: the logical tree is inserted into the memo bottom-up.
//!    Every new expression is matched against every rule pattern, and each new
//!    binding is queued as a pending rule match.
//!
//! 2. **Exploration**: matches are popped FIFO and fired. Whatever the rule
//!    reports is registered into the matched root's set, which may create new
//!    bindings (for the new expression itself and for every ancestor within
//!    pattern depth) or prove two sets equivalent and merge them. A merge
//!    re-queues matches for everything that can now bind differently.
//!
//! 3. **Costing**: costing is eager. As soon as a physical expression is
//!    registered and its inputs have winners for the traits it requires, its
//!    cumulative cost is offered to its set's subsets; any improvement is
//!    propagated to the consumers of that set.
//!
//! ## Termination
//!
//! The loop stops when the queue drains or the budget in [`PlannerConfig`] is
//! exhausted. Exhaustion is not an error: because costing is eager, the best
//! plan found so far is already recorded in the memo.

use crate::catalog::Catalog;
use crate::cost::{Cost, CostModel};
use crate::error::{PlanError, PlanResult};
use crate::memo::{ExprId, Inserted, Memo, Merge, PlanNode, SetId};
use crate::operator::{LogicalOp, Operator, PhysicalOp};
use crate::pattern::bind;
use crate::predicates::{MetadataQuery, PredicateCache};
use crate::properties::TraitSet;
use crate::rel::RelNode;
use crate::rule::{OptContext, Rule, RuleCall, RuleChild, RuleRegistry, RuleResult, Substitution};
use crate::stats::{self, Statistics};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Configuration knobs for the search.
///
/// These limits prevent runaway optimization for pathologically large queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Upper bound on rule firings.
    pub max_iterations: usize,
    /// Upper bound on the number of sets the memo may allocate.
    pub max_sets: usize,
    /// Wall-clock budget for exploration.
    pub max_duration: Option<Duration>,
    /// Row count assumed for tables without statistics.
    pub default_row_count: f64,
    /// Optional connector/source type name used to select connector-specific rules.
    pub source_type: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            max_sets: 100_000,
            max_duration: None,
            default_row_count: 100.0,
            source_type: None,
        }
    }
}

/// A set plus the traits requested of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetRef {
    pub set: SetId,
    pub traits: TraitSet,
}

#[derive(Debug, Clone)]
struct RuleMatch {
    rule: usize,
    bindings: Vec<ExprId>,
}

/// The equivalence-class planner.
///
/// One instance plans one query at a time; call [`VolcanoPlanner::clear`]
/// before reusing it.
pub struct VolcanoPlanner {
    /// The memo table storing all sets and expressions in the search space.
    pub memo: Memo,
    /// Registry of transformation and implementation rules to apply.
    pub rule_registry: Arc<RuleRegistry>,
    /// Cost model used to estimate the expense of physical operators.
    pub cost_model: Arc<dyn CostModel>,
    /// Catalog providing table metadata and statistics.
    pub catalog: Arc<dyn Catalog>,
    pub config: PlannerConfig,
    substitutions: Vec<Arc<dyn Substitution>>,
    queue: VecDeque<RuleMatch>,
    fired: HashSet<(usize, Vec<ExprId>)>,
    predicates: PredicateCache,
    stats_in_progress: HashSet<SetId>,
    root: Option<SetId>,
    /// Running count of rule firings.
    iterations: usize,
}

impl VolcanoPlanner {
    pub fn new(
        rule_registry: Arc<RuleRegistry>,
        cost_model: Arc<dyn CostModel>,
        catalog: Arc<dyn Catalog>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            memo: Memo::new(),
            rule_registry,
            cost_model,
            catalog,
            config,
            substitutions: Vec::new(),
            queue: VecDeque::new(),
            fired: HashSet::new(),
            predicates: PredicateCache::new(),
            stats_in_progress: HashSet::new(),
            root: None,
            iterations: 0,
        }
    }

    /// Adds a whole-tree rewrite applied to every root passed to
    /// [`VolcanoPlanner::set_root`].
    pub fn add_substitution(&mut self, substitution: Arc<dyn Substitution>) {
        self.substitutions.push(substitution);
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn root(&self) -> Option<SetId> {
        self.root.map(|r| self.memo.find(r))
    }

    pub fn pending_matches(&self) -> usize {
        self.queue.len()
    }

    /// Resets all per-query state.
    pub fn clear(&mut self) {
        self.memo = Memo::new();
        self.queue.clear();
        self.fired.clear();
        self.predicates.clear();
        self.stats_in_progress.clear();
        self.root = None;
        self.iterations = 0;
    }

    /// Registers a logical tree, returning the logical subset of its root.
    pub fn register(&mut self, node: &RelNode) -> PlanResult<SubsetRef> {
        let set = self.register_node(node, None, "register")?;
        Ok(SubsetRef {
            set: self.memo.find(set),
            traits: TraitSet::logical(),
        })
    }

    /// Registers `node` as the query root, requests its physical subset and
    /// offers it to every registered substitution.
    pub fn set_root(&mut self, node: &RelNode) -> PlanResult<SubsetRef> {
        let root = self.register(node)?.set;
        self.root = Some(root);
        let physical = TraitSet::physical();
        self.ensure_required_subset(root, &physical)?;
        debug!(
            "Registered root: set={}, sets={}, exprs={}",
            root,
            self.memo.num_sets(),
            self.memo.num_exprs()
        );

        let catalog = Arc::clone(&self.catalog);
        for substitution in self.substitutions.clone() {
            for alternative in substitution.substitute(node, catalog.as_ref()) {
                let target = self.memo.find(root);
                match self.register_node(&alternative, Some(target), substitution.name()) {
                    Ok(_) => debug!(
                        "Substitution '{}' registered an alternative in set {}",
                        substitution.name(),
                        target
                    ),
                    Err(PlanError::UnresolvableReference { table }) => debug!(
                        "Substitution '{}' skipped: table '{}' did not resolve",
                        substitution.name(),
                        table
                    ),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(SubsetRef {
            set: self.memo.find(root),
            traits: physical,
        })
    }

    /// Explores until the queue drains or the budget runs out, then returns
    /// the cheapest physical plan for the root.
    pub fn find_best_plan(&mut self) -> PlanResult<PlanNode> {
        let Some(root) = self.root() else {
            return Err(PlanError::NoImplementationFound {
                set: 0,
                operator: "<no root>".to_string(),
                traits: TraitSet::physical().to_string(),
            });
        };
        self.explore()?;
        let plan = self.find_best(root, &TraitSet::physical());
        match &plan {
            Ok(p) => debug!(
                "Optimization complete: cost={}, iterations={}",
                p.cost, self.iterations
            ),
            Err(e) => debug!("Optimization failed: {}", e),
        }
        plan
    }

    /// Cheapest plan recorded for `(set, traits)`, adding an enforcer if the
    /// subset was never requested.
    pub fn find_best(&mut self, set: SetId, traits: &TraitSet) -> PlanResult<PlanNode> {
        self.ensure_required_subset(set, traits)?;
        self.memo.extract_best_plan(set, traits)
    }

    /// Plan explanation for the root's best plan.
    pub fn explain(&mut self) -> PlanResult<String> {
        Ok(self.find_best_plan()?.display(0))
    }

    /// Fires `rule` once against every binding currently in the memo, outside
    /// the queue. Returns the expressions it created.
    pub fn apply_rule(&mut self, rule: &dyn Rule) -> PlanResult<Vec<ExprId>> {
        let pattern = rule.pattern();
        let existing = self.memo.num_exprs() as ExprId;
        let mut created = vec![];
        for expr_id in 0..existing {
            for binding in bind(&self.memo, expr_id, &pattern) {
                created.extend(self.fire(rule, &binding)?);
            }
        }
        Ok(created)
    }

    fn explore(&mut self) -> PlanResult<()> {
        let started = Instant::now();
        let registry = Arc::clone(&self.rule_registry);
        let rules = registry.active_rules(self.config.source_type.as_deref());
        while let Some(m) = self.queue.pop_front() {
            if self.iterations >= self.config.max_iterations
                || self.memo.allocated_sets() >= self.config.max_sets
                || self.config.max_duration.is_some_and(|d| started.elapsed() >= d)
            {
                debug!(
                    "Budget exhausted: iterations={}, sets={}, pending={}",
                    self.iterations,
                    self.memo.allocated_sets(),
                    self.queue.len() + 1
                );
                self.queue.push_front(m);
                break;
            }
            self.iterations += 1;
            self.fire(rules[m.rule], &m.bindings)?;
        }
        Ok(())
    }

    fn fire(&mut self, rule: &dyn Rule, bindings: &[ExprId]) -> PlanResult<Vec<ExprId>> {
        trace!("Firing rule '{}' on {:?}", rule.name(), bindings);
        let catalog = Arc::clone(&self.catalog);
        let results = {
            let ctx = OptContext {
                catalog: catalog.as_ref(),
                metadata: MetadataQuery::new(&self.memo, &self.predicates),
            };
            let mut call = RuleCall::new(&self.memo, &ctx, bindings);
            rule.on_match(&mut call);
            call.into_results()
        };
        if results.is_empty() {
            trace!("Rule '{}' produced no alternative", rule.name());
        }

        let mut created = vec![];
        for result in results {
            let target = self.memo.set_of(bindings[0]);
            match result {
                RuleResult::Substitution(op, children) => {
                    let ins = self.insert_expr(op, &children, Some(target), rule.name())?;
                    if ins.is_new {
                        created.push(ins.expr_id);
                    }
                }
                RuleResult::NewChildren(op, children) => {
                    let mut sets = Vec::with_capacity(children.len());
                    for child in &children {
                        sets.push(self.register_child(child, rule.name(), &mut created)?);
                    }
                    let ins = self.insert_expr(op, &sets, Some(target), rule.name())?;
                    if ins.is_new {
                        created.push(ins.expr_id);
                    }
                }
                RuleResult::Equivalent(other) => {
                    let merges = self.memo.merge(target, other, rule.name())?;
                    self.on_merges(&merges)?;
                }
            }
        }
        Ok(created)
    }

    fn register_child(
        &mut self,
        child: &RuleChild,
        origin: &str,
        created: &mut Vec<ExprId>,
    ) -> PlanResult<SetId> {
        match child {
            RuleChild::Set(set) => Ok(self.memo.find(*set)),
            RuleChild::NewExpr(op, children) => {
                let mut sets = Vec::with_capacity(children.len());
                for c in children {
                    sets.push(self.register_child(c, origin, created)?);
                }
                let ins = self.insert_expr(op.clone(), &sets, None, origin)?;
                if ins.is_new {
                    created.push(ins.expr_id);
                }
                Ok(ins.set)
            }
        }
    }

    fn register_node(&mut self, node: &RelNode, target: Option<SetId>, origin: &str) -> PlanResult<SetId> {
        if let LogicalOp::Scan { table, .. } = &node.op {
            if self.catalog.resolve(table).is_none() {
                return Err(PlanError::UnresolvableReference {
                    table: table.to_string(),
                });
            }
        }
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            inputs.push(self.register_node(input, None, origin)?);
        }
        let ins = self.insert_expr(Operator::Logical(node.op.clone()), &inputs, target, origin)?;
        Ok(ins.set)
    }

    fn insert_expr(
        &mut self,
        op: Operator,
        children: &[SetId],
        target: Option<SetId>,
        origin: &str,
    ) -> PlanResult<Inserted> {
        let ins = self.memo.insert(op, children, target, origin)?;
        if ins.is_new {
            trace!("Created expr {} in set {}", ins.expr_id, ins.set);
            if self.memo.expr(ins.expr_id).op.is_physical() {
                self.propagate(ins.expr_id)?;
            }
            self.queue_matches(ins.expr_id);
        }
        if !ins.merges.is_empty() {
            self.on_merges(&ins.merges)?;
        }
        Ok(ins)
    }

    /// Queues every new binding rooted at `expr_id` or at an ancestor close
    /// enough for a deeper pattern to reach it.
    fn queue_matches(&mut self, expr_id: ExprId) {
        let registry = Arc::clone(&self.rule_registry);
        let rules = registry.active_rules(self.config.source_type.as_deref());
        let patterns: Vec<_> = rules.iter().map(|r| r.pattern()).collect();
        let max_depth = patterns.iter().map(|p| p.depth()).max().unwrap_or(0);

        let mut level = vec![expr_id];
        let mut seen: HashSet<ExprId> = HashSet::new();
        for depth in 0..max_depth {
            for &candidate in &level {
                for (i, pattern) in patterns.iter().enumerate() {
                    if pattern.depth() <= depth {
                        continue;
                    }
                    for binding in bind(&self.memo, candidate, pattern) {
                        let key = (i, binding);
                        if self.fired.insert(key.clone()) {
                            self.queue.push_back(RuleMatch {
                                rule: i,
                                bindings: key.1,
                            });
                        }
                    }
                }
            }
            let mut next = vec![];
            for &candidate in &level {
                let set = self.memo.set_of(candidate);
                for &parent in &self.memo.set(set).parents {
                    if seen.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            level = next;
        }
    }

    fn on_merges(&mut self, merges: &[Merge]) -> PlanResult<()> {
        self.predicates.clear();
        let mut survivors: Vec<SetId> = merges.iter().map(|m| self.memo.find(m.survivor)).collect();
        survivors.dedup();
        for set in survivors {
            let set = self.memo.find(set);
            let members: Vec<ExprId> = self.memo.set(set).exprs().collect();
            for &e in &members {
                self.queue_matches(e);
            }
            // Absorbed members were costed against their old set's statistics
            // and never competed for the survivor's subsets.
            for &e in &members {
                if self.memo.expr(e).op.is_physical() {
                    self.propagate(e)?;
                }
            }
            let set = self.memo.find(set);
            if self.memo.reseed_subsets(set) {
                trace!("Winners of set {} changed after merge", set);
            }
            for p in self.memo.set(set).parents.clone() {
                if self.memo.expr(p).op.is_physical() {
                    self.propagate(p)?;
                }
            }
        }
        Ok(())
    }

    /// Creates the subset for `traits` on `set`; a sorted subset also gets a
    /// sort enforcer.
    fn ensure_required_subset(&mut self, set: SetId, traits: &TraitSet) -> PlanResult<()> {
        let created = self.memo.ensure_subset(set, traits);
        if created && !traits.collation.is_empty() {
            let enforcer = Operator::Physical(PhysicalOp::SortOp {
                collation: traits.collation.clone(),
                offset: None,
                fetch: None,
            });
            let set = self.memo.find(set);
            self.insert_expr(enforcer, &[set], Some(set), "sort-enforcer")?;
        }
        Ok(())
    }

    /// Re-costs `expr_id` and, transitively, every consumer whose cost may
    /// have dropped as a result.
    fn propagate(&mut self, expr_id: ExprId) -> PlanResult<()> {
        let mut work = VecDeque::from([expr_id]);
        while let Some(e) = work.pop_front() {
            let Some(cost) = self.cost_of(e)? else {
                continue;
            };
            if self.memo.offer(e, cost) {
                let set = self.memo.set_of(e);
                trace!("New winner in set {}: expr {} at {}", set, e, cost);
                for &parent in &self.memo.set(set).parents {
                    if self.memo.expr(parent).op.is_physical() && !work.contains(&parent) {
                        work.push_back(parent);
                    }
                }
            }
        }
        Ok(())
    }

    /// Cumulative cost of a physical expression, or `None` while some input
    /// has no winner for the traits it must deliver.
    fn cost_of(&mut self, expr_id: ExprId) -> PlanResult<Option<Cost>> {
        let Some(op) = self.memo.expr(expr_id).op.as_physical().cloned() else {
            return Ok(None);
        };
        let children = self.memo.children(expr_id);
        let required = op.required_input_traits(children.len());
        let mut child_costs = Vec::with_capacity(children.len());
        for (&child, traits) in children.iter().zip(&required) {
            self.ensure_required_subset(child, traits)?;
            match self.memo.set(child).best(traits) {
                Some(w) => child_costs.push(w.cost),
                None => return Ok(None),
            }
        }
        let input_stats: Vec<Statistics> = children.iter().map(|&c| self.set_stats(c)).collect();
        let output = self.set_stats(self.memo.set_of(expr_id));
        let refs: Vec<&Statistics> = input_stats.iter().collect();
        Ok(Some(self.cost_model.compute_cost(&op, &refs, &output, &child_costs)))
    }

    /// Row statistics of a set, derived once from its first logical
    /// expression.
    fn set_stats(&mut self, set: SetId) -> Statistics {
        let set = self.memo.find(set);
        if let Some(s) = &self.memo.set(set).stats {
            return s.clone();
        }
        let fallback = Statistics::new(self.config.default_row_count);
        let Some(&first) = self.memo.set(set).logical_exprs.first() else {
            return fallback;
        };
        if !self.stats_in_progress.insert(set) {
            return fallback;
        }
        let op = self.memo.expr(first).op.as_logical().cloned();
        let derived = match op {
            Some(LogicalOp::Scan { table, .. }) => self
                .catalog
                .resolve(&table)
                .and_then(|t| t.statistics)
                .unwrap_or(fallback),
            Some(op) => {
                let children = self.memo.children(first);
                let inputs: Vec<Statistics> = children.iter().map(|&c| self.set_stats(c)).collect();
                let widths: Vec<usize> = children
                    .iter()
                    .map(|&c| self.memo.set(c).row_type.field_count())
                    .collect();
                stats::derive_stats(&op, &inputs.iter().collect::<Vec<_>>(), &widths)
            }
            None => fallback,
        };
        self.stats_in_progress.remove(&set);
        self.memo.set_mut(set).stats = Some(derived.clone());
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::cost::DefaultCostModel;
    use crate::expr::Expr;
    use crate::operator::TableRef;
    use crate::pattern::Pattern;
    use crate::rule::RuleType;
    use crate::types::{DataType, Field, RowType};

    struct ImplScan;

    impl Rule for ImplScan {
        fn name(&self) -> &str {
            "impl-scan"
        }
        fn rule_type(&self) -> RuleType {
            RuleType::Implementation
        }
        fn pattern(&self) -> Pattern {
            Pattern::scan()
        }
        fn on_match(&self, call: &mut RuleCall) {
            if let Operator::Logical(LogicalOp::Scan { table, row_type }) = &call.rel(0).op {
                call.transform_to(RuleResult::Substitution(
                    Operator::Physical(PhysicalOp::SeqScan {
                        table: table.clone(),
                        row_type: row_type.clone(),
                    }),
                    vec![],
                ));
            }
        }
    }

    struct ImplFilter;

    impl Rule for ImplFilter {
        fn name(&self) -> &str {
            "impl-filter"
        }
        fn rule_type(&self) -> RuleType {
            RuleType::Implementation
        }
        fn pattern(&self) -> Pattern {
            Pattern::filter()
        }
        fn on_match(&self, call: &mut RuleCall) {
            if let Operator::Logical(LogicalOp::Filter { condition }) = &call.rel(0).op {
                let inputs = call.inputs(0);
                call.transform_to(RuleResult::Substitution(
                    Operator::Physical(PhysicalOp::Filter {
                        condition: condition.clone(),
                    }),
                    inputs,
                ));
            }
        }
    }

    fn setup(rules: Vec<Box<dyn Rule>>) -> (VolcanoPlanner, RelNode) {
        let mut catalog = InMemoryCatalog::new();
        let t = TableRef::new("s", "t");
        catalog.add_table(
            &t,
            RowType::new(vec![Field::new("a", DataType::Int64, false)]),
            Some(Statistics::new(1000.0)),
        );
        catalog.add_table(
            &TableRef::new("s", "t_summary"),
            RowType::new(vec![Field::new("a", DataType::Int64, false)]),
            Some(Statistics::new(10.0)),
        );
        let tree = catalog
            .scan(&t)
            .unwrap()
            .filter(Expr::gt(Expr::col(0), Expr::int(5)));
        let mut registry = RuleRegistry::new();
        for r in rules {
            registry.add_rule(r);
        }
        let planner = VolcanoPlanner::new(
            Arc::new(registry),
            Arc::new(DefaultCostModel::default()),
            Arc::new(catalog),
            PlannerConfig::default(),
        );
        (planner, tree)
    }

    /// Declares every filter equivalent to a fixed set.
    struct CollapseInto(SetId);

    impl Rule for CollapseInto {
        fn name(&self) -> &str {
            "collapse-into"
        }
        fn rule_type(&self) -> RuleType {
            RuleType::Transformation
        }
        fn pattern(&self) -> Pattern {
            Pattern::filter()
        }
        fn on_match(&self, call: &mut RuleCall) {
            call.transform_to(RuleResult::Equivalent(self.0));
        }
    }

    #[test]
    fn test_plans_filter_over_scan() {
        let (mut planner, tree) = setup(vec![Box::new(ImplScan), Box::new(ImplFilter)]);
        planner.set_root(&tree).unwrap();
        let plan = planner.find_best_plan().unwrap();
        assert!(matches!(plan.op, PhysicalOp::Filter { .. }));
        assert!(matches!(plan.children[0].op, PhysicalOp::SeqScan { .. }));
        assert_eq!(plan.children[0].row_count, 1000.0);
        assert_eq!(plan.row_count, 500.0);
        assert_eq!(planner.pending_matches(), 0);
    }

    #[test]
    fn test_missing_implementation_is_fatal() {
        let (mut planner, tree) = setup(vec![Box::new(ImplScan)]);
        planner.set_root(&tree).unwrap();
        let err = planner.find_best_plan().unwrap_err();
        assert!(matches!(err, PlanError::NoImplementationFound { ref operator, .. } if operator == "LogicalFilter"));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_unresolvable_table() {
        let (mut planner, _) = setup(vec![]);
        let ghost = RelNode::scan(TableRef::new("s", "ghost"), RowType::default());
        assert!(matches!(
            planner.set_root(&ghost),
            Err(PlanError::UnresolvableReference { table }) if table == "s.ghost"
        ));
    }

    #[test]
    fn test_budget_exhaustion_returns_best_so_far() {
        let (mut planner, tree) = setup(vec![Box::new(ImplScan), Box::new(ImplFilter)]);
        planner.config.max_iterations = 0;
        planner.set_root(&tree).unwrap();
        // Nothing fired, so nothing physical exists yet.
        assert!(planner.find_best_plan().is_err());
        assert_eq!(planner.pending_matches(), 2);

        planner.config.max_iterations = 2;
        let plan = planner.find_best_plan().unwrap();
        assert_eq!(planner.iterations(), 2);
        assert!(matches!(plan.op, PhysicalOp::Filter { .. }));
    }

    #[test]
    fn test_apply_rule_single_pass_and_clear() {
        let (mut planner, tree) = setup(vec![]);
        planner.set_root(&tree).unwrap();
        let created = planner.apply_rule(&ImplScan).unwrap();
        assert_eq!(created.len(), 1);
        // Already present: nothing new.
        assert!(planner.apply_rule(&ImplScan).unwrap().is_empty());
        planner.clear();
        assert_eq!(planner.memo.num_exprs(), 0);
        assert!(planner.root().is_none());
    }

    #[test]
    fn test_sorted_subset_gets_enforcer() {
        let (mut planner, tree) = setup(vec![Box::new(ImplScan), Box::new(ImplFilter)]);
        let root = planner.set_root(&tree).unwrap().set;
        planner.find_best_plan().unwrap();
        let sorted = TraitSet::physical().with_collation(vec![crate::operator::SortKey::asc(0)]);
        let plan = planner.find_best(root, &sorted).unwrap();
        assert!(matches!(plan.op, PhysicalOp::SortOp { .. }));
        assert!(matches!(plan.children[0].op, PhysicalOp::Filter { .. }));
        assert!(plan.cost.rows > plan.children[0].cost.rows);
    }

    #[test]
    fn test_cheaper_plan_arriving_by_merge_wins() {
        let (mut planner, tree) = setup(vec![]);
        let root = planner.set_root(&tree).unwrap().set;
        let summary = RelNode::scan(
            TableRef::new("s", "t_summary"),
            RowType::new(vec![Field::new("a", DataType::Int64, false)]),
        );
        let summary_set = planner.register(&summary).unwrap().set;
        planner.apply_rule(&ImplScan).unwrap();
        planner.apply_rule(&ImplFilter).unwrap();

        let before = planner.find_best(root, &TraitSet::physical()).unwrap();
        assert!(matches!(before.op, PhysicalOp::Filter { .. }));

        planner.apply_rule(&CollapseInto(summary_set)).unwrap();
        assert_eq!(planner.memo.find(summary_set), planner.memo.find(root));
        let after = planner.find_best(root, &TraitSet::physical()).unwrap();
        assert!(matches!(&after.op, PhysicalOp::SeqScan { table, .. } if table.name == "t_summary"));
        assert!(after.cost.is_lt(&before.cost));
    }
}
