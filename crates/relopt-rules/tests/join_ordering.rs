//! End-to-end join ordering tests using TPC-H and TPC-DS shaped queries.
//!
//! These tests build left-deep join trees in query-text order (the "naive"
//! plan), run the planner with the default rule set, and check the result
//! against the same tree planned with implementation rules only.
//!
//! ## Queries
//! - TPC-H Q10: 4-table chain (lineitem → orders → customer → nation)
//! - TPC-DS Q96: 4-table star (store_sales fact + 3 dimensions)
//! - A 4-table chain written largest-table-first
//! - A 3-table query written with a cross product
//!
//! ## What These Tests Verify
//! - Join reordering creates new sets beyond the initial tree
//! - The chosen plan is never worse than the naive order, and strictly better
//!   where the naive order is known to be bad
//! - The planner terminates and finds a complete physical plan

use relopt_core::catalog::InMemoryCatalog;
use relopt_core::cost::{Cost, DefaultCostModel};
use relopt_core::expr::Expr;
use relopt_core::memo::PlanNode;
use relopt_core::operator::{JoinType, PhysicalOp, TableRef};
use relopt_core::rel::RelNode;
use relopt_core::rule::RuleRegistry;
use relopt_core::search::{PlannerConfig, VolcanoPlanner};
use relopt_core::stats::{ColumnStatistics, Statistics};
use relopt_core::types::{DataType, Field, RowType};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Add a table to the catalog with the given row count and column NDVs.
fn add_table(catalog: &mut InMemoryCatalog, schema: &str, name: &str, rows: f64, cols: &[(&str, f64)]) {
    let table = TableRef::new(schema, name);
    let row_type = RowType::new(
        cols.iter()
            .map(|(col, _)| Field::new(*col, DataType::Int64, false))
            .collect(),
    );
    let mut stats = Statistics::new(rows);
    for (i, (_, ndv)) in cols.iter().enumerate() {
        stats = stats.with_column(i, ColumnStatistics::new(*ndv, 0.0));
    }
    catalog.add_table(&table, row_type, Some(stats));
}

fn scan(catalog: &InMemoryCatalog, schema: &str, name: &str) -> RelNode {
    catalog.scan(&TableRef::new(schema, name)).unwrap()
}

fn position(node: &RelNode, column: &str) -> usize {
    node.row_type().unwrap().index_of(column).unwrap()
}

/// `left ⋈ right ON left.lc = right.rc`, resolving the columns by name.
fn join_on(left: RelNode, right: RelNode, lc: &str, rc: &str) -> RelNode {
    let condition = Expr::eq(
        Expr::col(position(&left, lc)),
        Expr::col(left.row_type().unwrap().field_count() + position(&right, rc)),
    );
    left.join(right, JoinType::Inner, condition)
}

fn plan(registry: RuleRegistry, catalog: &InMemoryCatalog, root: &RelNode) -> (PlanNode, usize) {
    init_tracing();
    let config = PlannerConfig {
        max_iterations: 200_000,
        ..PlannerConfig::default()
    };
    let mut planner = VolcanoPlanner::new(
        Arc::new(registry),
        Arc::new(DefaultCostModel::default()),
        Arc::new(catalog.clone()),
        config,
    );
    planner.set_root(root).unwrap();
    let best = planner.find_best_plan().unwrap();
    (best, planner.memo.num_sets())
}

/// (optimized cost, naive cost, sets after optimization)
fn optimize(catalog: &InMemoryCatalog, root: &RelNode) -> (Cost, Cost, usize) {
    let (best, sets) = plan(relopt_rules::default_rule_registry(), catalog, root);
    let (naive, _) = plan(relopt_rules::implementation_rule_registry(), catalog, root);
    println!("{}", best.display(0));
    println!("Cost: {} (naive {}), Sets: {sets}", best.cost, naive.cost);

    let scanned = best
        .nodes()
        .iter()
        .filter(|n| matches!(n.op, PhysicalOp::SeqScan { .. }))
        .count();
    assert_eq!(scanned, root.tables().len(), "every table is scanned exactly once");
    (best.cost, naive.cost, sets)
}

fn never_worse(optimized: &Cost, naive: &Cost) {
    assert!(
        optimized.rows <= naive.rows * (1.0 + 1e-9),
        "optimized {optimized} should not lose to naive {naive}"
    );
}

// ===========================================================================
// TPC-H Q10: 4-table chain  lineitem → orders → customer → nation
// ===========================================================================

fn tpch_q10_catalog() -> InMemoryCatalog {
    let mut c = InMemoryCatalog::new();
    add_table(&mut c, "tpch", "customer", 150000.0, &[
        ("c_custkey", 150000.0), ("c_nationkey", 25.0),
    ]);
    add_table(&mut c, "tpch", "orders", 1500000.0, &[
        ("o_orderkey", 1500000.0), ("o_custkey", 100000.0), ("o_orderdate", 2500.0),
    ]);
    add_table(&mut c, "tpch", "lineitem", 6001215.0, &[
        ("l_orderkey", 1500000.0), ("l_returnflag", 3.0),
    ]);
    add_table(&mut c, "tpch", "nation", 25.0, &[
        ("n_nationkey", 25.0), ("n_name", 25.0),
    ]);
    c
}

#[test]
fn test_tpch_q10_chain_join() {
    let c = tpch_q10_catalog();
    // customer ⋈ orders ⋈ lineitem ⋈ nation, in query text order
    let co = join_on(scan(&c, "tpch", "customer"), scan(&c, "tpch", "orders"), "c_custkey", "o_custkey");
    let col = join_on(co, scan(&c, "tpch", "lineitem"), "o_orderkey", "l_orderkey");
    let root = join_on(col, scan(&c, "tpch", "nation"), "c_nationkey", "n_nationkey");
    let initial_sets = 7;

    println!("=== TPC-H Q10 (4-table chain) ===");
    let (cost, naive, sets) = optimize(&c, &root);
    never_worse(&cost, &naive);
    assert!(
        sets > initial_sets,
        "Reordering should create new sets: got {sets}, started with {initial_sets}"
    );
}

// ===========================================================================
// TPC-DS Q96: 4-table star  store_sales + household_demographics, time_dim, store
// ===========================================================================

#[test]
fn test_tpcds_q96_star_join() {
    let mut c = InMemoryCatalog::new();
    add_table(&mut c, "tpcds", "store_sales", 2880404.0, &[
        ("ss_sold_time_sk", 86400.0), ("ss_hdemo_sk", 7200.0), ("ss_store_sk", 12.0),
    ]);
    add_table(&mut c, "tpcds", "household_demographics", 7200.0, &[
        ("hd_demo_sk", 7200.0), ("hd_dep_count", 7.0),
    ]);
    add_table(&mut c, "tpcds", "time_dim", 86400.0, &[
        ("t_time_sk", 86400.0), ("t_hour", 24.0),
    ]);
    add_table(&mut c, "tpcds", "store", 12.0, &[
        ("s_store_sk", 12.0), ("s_store_name", 12.0),
    ]);

    let ss = scan(&c, "tpcds", "store_sales");
    let j1 = join_on(ss, scan(&c, "tpcds", "household_demographics"), "ss_hdemo_sk", "hd_demo_sk");
    let j2 = join_on(j1, scan(&c, "tpcds", "time_dim"), "ss_sold_time_sk", "t_time_sk");
    let root = join_on(j2, scan(&c, "tpcds", "store"), "ss_store_sk", "s_store_sk");

    println!("=== TPC-DS Q96 (4-table star) ===");
    let (cost, naive, sets) = optimize(&c, &root);
    never_worse(&cost, &naive);
    assert!(sets > 7);
}

// ===========================================================================
// A deliberately bad order (largest tables first) for a 4-table chain.
// ===========================================================================

#[test]
fn test_optimizer_beats_worst_case_ordering() {
    // tiny(10) → small(1K) → medium(100K) → large(10M)
    let mut c = InMemoryCatalog::new();
    add_table(&mut c, "t", "tiny", 10.0, &[("t_id", 10.0)]);
    add_table(&mut c, "t", "small", 1000.0, &[
        ("s_id", 1000.0), ("s_tid", 10.0),
    ]);
    add_table(&mut c, "t", "medium", 100000.0, &[
        ("m_id", 100000.0), ("m_sid", 1000.0),
    ]);
    add_table(&mut c, "t", "large", 10000000.0, &[
        ("l_id", 10000000.0), ("l_mid", 100000.0),
    ]);

    // ((large ⋈ medium) ⋈ small) ⋈ tiny
    let lm = join_on(scan(&c, "t", "large"), scan(&c, "t", "medium"), "l_mid", "m_id");
    let lms = join_on(lm, scan(&c, "t", "small"), "m_sid", "s_id");
    let root = join_on(lms, scan(&c, "t", "tiny"), "s_tid", "t_id");

    println!("=== Worst-case ordering (4-table chain) ===");
    let (cost, naive, _) = optimize(&c, &root);
    assert!(
        cost.rows < naive.rows,
        "the planner should improve on the worst order: {cost} vs {naive}"
    );
}

// ===========================================================================
// A cross product in the written order is avoided by pushing a join through.
// ===========================================================================

#[test]
fn test_cross_product_is_avoided() {
    let mut c = InMemoryCatalog::new();
    add_table(&mut c, "t", "a", 1000.0, &[("a_k", 100.0)]);
    add_table(&mut c, "t", "b", 1000.0, &[("b_k", 100.0)]);
    add_table(&mut c, "t", "c", 10.0, &[("c_k", 10.0)]);

    // (a × b) ⋈ c ON a_k = c_k AND b_k = c_k
    let ab = scan(&c, "t", "a").join(scan(&c, "t", "b"), JoinType::Inner, Expr::boolean(true));
    let root = ab.join(
        scan(&c, "t", "c"),
        JoinType::Inner,
        Expr::and_all([
            Expr::eq(Expr::col(0), Expr::col(2)),
            Expr::eq(Expr::col(1), Expr::col(2)),
        ]),
    );

    println!("=== Cross product avoidance ===");
    let (cost, naive, _) = optimize(&c, &root);
    assert!(
        cost.rows * 10.0 < naive.rows,
        "joining through c should avoid the million-row product: {cost} vs {naive}"
    );

    let (best, _) = plan(relopt_rules::default_rule_registry(), &c, &root);
    assert!(
        !best
            .nodes()
            .iter()
            .any(|n| matches!(n.op, PhysicalOp::NestedLoopJoin { .. })),
        "no join in the chosen plan should need a nested loop"
    );
}

#[test]
fn test_simple_two_way_join() {
    let mut c = InMemoryCatalog::new();
    add_table(&mut c, "t", "small", 100.0, &[("s_id", 100.0)]);
    add_table(&mut c, "t", "big", 100000.0, &[("b_sid", 100.0)]);
    let root = join_on(scan(&c, "t", "big"), scan(&c, "t", "small"), "b_sid", "s_id");

    let (best, _) = plan(relopt_rules::default_rule_registry(), &c, &root);
    // The hash table goes on the small side, whichever orientation wins.
    let hash_join = best
        .nodes()
        .into_iter()
        .find(|n| matches!(n.op, PhysicalOp::HashJoin { .. }))
        .expect("a hash join");
    let PhysicalOp::HashJoin { build_side, .. } = &hash_join.op else {
        unreachable!()
    };
    let build = match build_side {
        relopt_core::operator::BuildSide::Left => &hash_join.children[0],
        relopt_core::operator::BuildSide::Right => &hash_join.children[1],
    };
    assert_eq!(build.row_count, 100.0);
}
