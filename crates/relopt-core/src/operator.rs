//! # Operators
//!
//! ## Logical Operators (`LogicalOp`)
//! Logical operators describe *what* to compute. Transformation rules rewrite them
//! into equivalent logical alternatives (filter push-down, join reordering), and
//! implementation rules map them to physical operators.
//!
//! ## Physical Operators (`PhysicalOp`)
//! Physical operators describe *how* to execute a computation. Each one has a
//! self-cost in the cost model and may require its inputs to carry certain traits
//! (a merge join needs both inputs sorted on the join keys).
//!
//! ## Unified `Operator` Enum
//! The memo stores both kinds uniformly. Children are never stored inline: the
//! memo keeps them as equivalence-set ids next to the operator.
//!
//! Row types are always derived from the operator and its inputs' row types
//! ([`Operator::derive_row_type`]), never stored, except for scans whose row type
//! comes from the catalog.

use crate::expr::{AggFunc, Expr};
use crate::properties::TraitSet;
use crate::types::{DataType, Field, RowType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

/// SQL join types.
///
/// The join type decides which conjuncts may cross the join: a side that can
/// generate nulls must not receive conditions that would drop its unmatched
/// rows. Semi and anti joins only output the left input's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinType {
    pub fn generates_nulls_on_left(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }

    pub fn generates_nulls_on_right(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    pub fn is_outer(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Right | JoinType::Full)
    }

    /// Whether the right input's columns appear in the output.
    pub fn projects_right(&self) -> bool {
        !matches!(self, JoinType::Semi | JoinType::Anti)
    }

    /// A filter conjunct above the join spanning both inputs may become part of
    /// the join condition.
    pub fn can_push_into_from_above(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Semi)
    }

    pub fn can_push_left_from_above(&self) -> bool {
        matches!(
            self,
            JoinType::Inner | JoinType::Left | JoinType::Semi | JoinType::Anti
        )
    }

    pub fn can_push_right_from_above(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Right)
    }

    /// An ON-clause conjunct referencing only the left input may become a
    /// filter on the left input.
    pub fn can_push_left_from_within(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Right | JoinType::Semi)
    }

    pub fn can_push_right_from_within(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Left | JoinType::Semi)
    }

    /// Join type after swapping the two inputs, if expressible.
    pub fn swap(&self) -> Option<JoinType> {
        match self {
            JoinType::Inner => Some(JoinType::Inner),
            JoinType::Left => Some(JoinType::Right),
            JoinType::Right => Some(JoinType::Left),
            JoinType::Full => Some(JoinType::Full),
            JoinType::Semi | JoinType::Anti => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
            JoinType::Semi => "semi",
            JoinType::Anti => "anti",
        }
    }
}

/// Build side for hash joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSide {
    Left,
    Right,
}

/// Aggregate function call over input column positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggCall {
    pub func: AggFunc,
    /// Input positions; empty for `COUNT(*)`.
    pub args: Vec<usize>,
    pub distinct: bool,
    pub name: String,
}

impl AggCall {
    pub fn new(func: AggFunc, args: Vec<usize>, name: impl Into<String>) -> Self {
        Self {
            func,
            args,
            distinct: false,
            name: name.into(),
        }
    }

    pub fn count_star(name: impl Into<String>) -> Self {
        Self::new(AggFunc::Count, vec![], name)
    }

    fn output_field(&self, input: &RowType, grouped: bool) -> Option<Field> {
        let arg = match self.args.first() {
            Some(&i) => Some(input.field(i)?),
            None => None,
        };
        let data_type = self.func.return_type(arg.map(|f| f.data_type));
        // Without a GROUP BY, an empty input still yields one row of NULLs.
        let nullable = match self.func {
            AggFunc::Count => false,
            _ => !grouped || arg.map_or(true, |f| f.nullable),
        };
        Some(Field::new(self.name.clone(), data_type, nullable))
    }
}

impl fmt::Display for AggCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.name())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "${a}")?;
        }
        write!(f, ")")
    }
}

/// One element of a collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: usize,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl SortKey {
    pub fn asc(field: usize) -> Self {
        Self {
            field,
            ascending: true,
            nulls_first: false,
        }
    }

    pub fn desc(field: usize) -> Self {
        Self {
            field,
            ascending: false,
            nulls_first: true,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if !self.ascending {
            write!(f, " DESC")?;
        }
        Ok(())
    }
}

/// Aggregates sharing one window (partitioning and ordering).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGroup {
    pub partition_by: Vec<usize>,
    pub order_by: Vec<SortKey>,
    pub calls: Vec<AggCall>,
}

/// Logical operators -- represent *what* to compute, not *how*.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Leaf reading a base table (or a materialization's table).
    Scan { table: TableRef, row_type: RowType },
    Filter { condition: Expr },
    Project { exprs: Vec<Expr>, names: Vec<String> },
    /// Condition is expressed over the concatenation of left and right columns.
    Join { join_type: JoinType, condition: Expr },
    /// Output is the group columns (in `group_set` order) followed by one
    /// column per aggregate call.
    Aggregate {
        group_set: Vec<usize>,
        aggregates: Vec<AggCall>,
    },
    /// Ordering plus optional OFFSET/FETCH. An empty collation with a fetch is a
    /// plain LIMIT.
    Sort {
        collation: Vec<SortKey>,
        offset: Option<u64>,
        fetch: Option<u64>,
    },
    /// N-ary set operations.
    Union { all: bool },
    Intersect { all: bool },
    Minus { all: bool },
    /// For each left row, evaluates the right input with the left row's
    /// `required_columns` bound to the correlation variable.
    Correlate {
        join_type: JoinType,
        correlation_id: u32,
        required_columns: Vec<usize>,
    },
    /// Folds the whole input into a single multiset-valued row.
    Collect { field_name: String },
    /// Appends windowed aggregate columns to every input row.
    Window { groups: Vec<WindowGroup> },
}

/// Physical operators -- represent *how* to execute a computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOp {
    SeqScan { table: TableRef, row_type: RowType },
    Filter { condition: Expr },
    Project { exprs: Vec<Expr>, names: Vec<String> },
    /// Builds a hash table on `build_side`, probes with the other input.
    /// Requires at least one equi-join conjunct.
    HashJoin {
        join_type: JoinType,
        condition: Expr,
        build_side: BuildSide,
    },
    /// Merges two inputs sorted on `left_keys` / `right_keys` (right keys are
    /// relative to the right input).
    MergeJoin {
        join_type: JoinType,
        condition: Expr,
        left_keys: Vec<usize>,
        right_keys: Vec<usize>,
    },
    /// The universal fallback; works for any condition.
    NestedLoopJoin { join_type: JoinType, condition: Expr },
    HashAggregate {
        group_set: Vec<usize>,
        aggregates: Vec<AggCall>,
    },
    /// Single pass over input sorted on the group columns.
    StreamAggregate {
        group_set: Vec<usize>,
        aggregates: Vec<AggCall>,
    },
    /// Sorts its input. Also used as the enforcer for collation requests.
    SortOp {
        collation: Vec<SortKey>,
        offset: Option<u64>,
        fetch: Option<u64>,
    },
    Union { all: bool },
    Intersect { all: bool },
    Minus { all: bool },
    Correlate {
        join_type: JoinType,
        correlation_id: u32,
        required_columns: Vec<usize>,
    },
    Collect { field_name: String },
    Window { groups: Vec<WindowGroup> },
}

/// Unified operator enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Physical(PhysicalOp),
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Operator::Physical(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Physical(p) => OpKind::Physical(p.kind()),
        }
    }

    pub fn as_logical(&self) -> Option<&LogicalOp> {
        match self {
            Operator::Logical(op) => Some(op),
            Operator::Physical(_) => None,
        }
    }

    pub fn as_physical(&self) -> Option<&PhysicalOp> {
        match self {
            Operator::Physical(op) => Some(op),
            Operator::Logical(_) => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Operator::Logical(op) => format!("Logical{:?}", op.kind()),
            Operator::Physical(op) => format!("{:?}", op.kind()),
        }
    }

    /// Row type produced by this operator over inputs of the given row types.
    /// `None` if the arity is wrong or an expression reads a missing column.
    pub fn derive_row_type(&self, inputs: &[&RowType]) -> Option<RowType> {
        match self {
            Operator::Logical(op) => match op {
                LogicalOp::Scan { row_type, .. } => leaf(inputs, row_type),
                LogicalOp::Filter { condition } => filter_row_type(inputs, condition),
                LogicalOp::Project { exprs, names } => project_row_type(inputs, exprs, names),
                LogicalOp::Join {
                    join_type,
                    condition,
                } => join_row_type(inputs, *join_type, Some(condition)),
                LogicalOp::Aggregate {
                    group_set,
                    aggregates,
                } => aggregate_row_type(inputs, group_set, aggregates),
                LogicalOp::Sort { collation, .. } => sort_row_type(inputs, collation),
                LogicalOp::Union { .. } | LogicalOp::Intersect { .. } | LogicalOp::Minus { .. } => {
                    set_op_row_type(inputs)
                }
                LogicalOp::Correlate { join_type, .. } => join_row_type(inputs, *join_type, None),
                LogicalOp::Collect { field_name } => collect_row_type(inputs, field_name),
                LogicalOp::Window { groups } => window_row_type(inputs, groups),
            },
            Operator::Physical(op) => match op {
                PhysicalOp::SeqScan { row_type, .. } => leaf(inputs, row_type),
                PhysicalOp::Filter { condition } => filter_row_type(inputs, condition),
                PhysicalOp::Project { exprs, names } => project_row_type(inputs, exprs, names),
                PhysicalOp::HashJoin {
                    join_type,
                    condition,
                    ..
                }
                | PhysicalOp::MergeJoin {
                    join_type,
                    condition,
                    ..
                }
                | PhysicalOp::NestedLoopJoin {
                    join_type,
                    condition,
                } => join_row_type(inputs, *join_type, Some(condition)),
                PhysicalOp::HashAggregate {
                    group_set,
                    aggregates,
                }
                | PhysicalOp::StreamAggregate {
                    group_set,
                    aggregates,
                } => aggregate_row_type(inputs, group_set, aggregates),
                PhysicalOp::SortOp { collation, .. } => sort_row_type(inputs, collation),
                PhysicalOp::Union { .. }
                | PhysicalOp::Intersect { .. }
                | PhysicalOp::Minus { .. } => set_op_row_type(inputs),
                PhysicalOp::Correlate { join_type, .. } => join_row_type(inputs, *join_type, None),
                PhysicalOp::Collect { field_name } => collect_row_type(inputs, field_name),
                PhysicalOp::Window { groups } => window_row_type(inputs, groups),
            },
        }
    }

    /// Attributes for plan explanation, in `key=[value]` order.
    pub fn explain_attrs(&self) -> Vec<(String, String)> {
        match self {
            Operator::Logical(op) => match op {
                LogicalOp::Scan { table, .. } => vec![attr("table", table)],
                LogicalOp::Filter { condition } => vec![attr("condition", condition)],
                LogicalOp::Project { exprs, names } => project_attrs(exprs, names),
                LogicalOp::Join {
                    join_type,
                    condition,
                } => join_attrs(*join_type, condition),
                LogicalOp::Aggregate {
                    group_set,
                    aggregates,
                } => aggregate_attrs(group_set, aggregates),
                LogicalOp::Sort {
                    collation,
                    offset,
                    fetch,
                } => sort_attrs(collation, *offset, *fetch),
                LogicalOp::Union { all } | LogicalOp::Intersect { all } | LogicalOp::Minus { all } => {
                    vec![attr("all", all)]
                }
                LogicalOp::Correlate {
                    join_type,
                    correlation_id,
                    required_columns,
                } => correlate_attrs(*join_type, *correlation_id, required_columns),
                LogicalOp::Collect { field_name } => vec![attr("field", field_name)],
                LogicalOp::Window { groups } => window_attrs(groups),
            },
            Operator::Physical(op) => match op {
                PhysicalOp::SeqScan { table, .. } => vec![attr("table", table)],
                PhysicalOp::Filter { condition } => vec![attr("condition", condition)],
                PhysicalOp::Project { exprs, names } => project_attrs(exprs, names),
                PhysicalOp::HashJoin {
                    join_type,
                    condition,
                    build_side,
                } => {
                    let mut attrs = join_attrs(*join_type, condition);
                    let side = match build_side {
                        BuildSide::Left => "left",
                        BuildSide::Right => "right",
                    };
                    attrs.push(attr("buildSide", side));
                    attrs
                }
                PhysicalOp::MergeJoin {
                    join_type,
                    condition,
                    left_keys,
                    right_keys,
                } => {
                    let mut attrs = join_attrs(*join_type, condition);
                    attrs.push(attr("leftKeys", format_list(left_keys)));
                    attrs.push(attr("rightKeys", format_list(right_keys)));
                    attrs
                }
                PhysicalOp::NestedLoopJoin {
                    join_type,
                    condition,
                } => join_attrs(*join_type, condition),
                PhysicalOp::HashAggregate {
                    group_set,
                    aggregates,
                }
                | PhysicalOp::StreamAggregate {
                    group_set,
                    aggregates,
                } => aggregate_attrs(group_set, aggregates),
                PhysicalOp::SortOp {
                    collation,
                    offset,
                    fetch,
                } => sort_attrs(collation, *offset, *fetch),
                PhysicalOp::Union { all }
                | PhysicalOp::Intersect { all }
                | PhysicalOp::Minus { all } => vec![attr("all", all)],
                PhysicalOp::Correlate {
                    join_type,
                    correlation_id,
                    required_columns,
                } => correlate_attrs(*join_type, *correlation_id, required_columns),
                PhysicalOp::Collect { field_name } => vec![attr("field", field_name)],
                PhysicalOp::Window { groups } => window_attrs(groups),
            },
        }
    }
}

impl PhysicalOp {
    /// Traits this operator's output carries.
    pub fn delivered_traits(&self) -> TraitSet {
        match self {
            PhysicalOp::SortOp { collation, .. } => {
                TraitSet::physical().with_collation(collation.clone())
            }
            _ => TraitSet::physical(),
        }
    }

    /// Traits each of `arity` inputs must deliver.
    pub fn required_input_traits(&self, arity: usize) -> Vec<TraitSet> {
        match self {
            PhysicalOp::MergeJoin {
                left_keys,
                right_keys,
                ..
            } => vec![
                TraitSet::physical().with_collation(left_keys.iter().map(|&k| SortKey::asc(k)).collect()),
                TraitSet::physical().with_collation(right_keys.iter().map(|&k| SortKey::asc(k)).collect()),
            ],
            PhysicalOp::StreamAggregate { group_set, .. } => vec![TraitSet::physical()
                .with_collation(group_set.iter().map(|&k| SortKey::asc(k)).collect())],
            _ => vec![TraitSet::physical(); arity],
        }
    }
}

fn leaf(inputs: &[&RowType], row_type: &RowType) -> Option<RowType> {
    inputs.is_empty().then(|| row_type.clone())
}

fn single<'a>(inputs: &[&'a RowType]) -> Option<&'a RowType> {
    match inputs {
        [input] => Some(*input),
        _ => None,
    }
}

fn filter_row_type(inputs: &[&RowType], condition: &Expr) -> Option<RowType> {
    let input = single(inputs)?;
    condition.data_type(input)?;
    Some(input.clone())
}

fn project_row_type(inputs: &[&RowType], exprs: &[Expr], names: &[String]) -> Option<RowType> {
    let input = single(inputs)?;
    let fields = exprs
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let name = names.get(i).cloned().unwrap_or_else(|| format!("${i}"));
            Some(Field::new(name, e.data_type(input)?, e.nullable(input)))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(RowType::new(fields))
}

fn join_row_type(inputs: &[&RowType], join_type: JoinType, condition: Option<&Expr>) -> Option<RowType> {
    let [left, right] = inputs else {
        return None;
    };
    if let Some(condition) = condition {
        condition.data_type(&left.concat(right))?;
    }
    if !join_type.projects_right() {
        return Some((*left).clone());
    }
    let left = if join_type.generates_nulls_on_left() {
        left.with_nullability(true)
    } else {
        (*left).clone()
    };
    let right = if join_type.generates_nulls_on_right() {
        right.with_nullability(true)
    } else {
        (*right).clone()
    };
    Some(left.concat(&right))
}

fn aggregate_row_type(inputs: &[&RowType], group_set: &[usize], aggregates: &[AggCall]) -> Option<RowType> {
    let input = single(inputs)?;
    let mut fields = group_set
        .iter()
        .map(|&g| input.field(g).cloned())
        .collect::<Option<Vec<_>>>()?;
    for call in aggregates {
        fields.push(call.output_field(input, !group_set.is_empty())?);
    }
    Some(RowType::new(fields))
}

fn sort_row_type(inputs: &[&RowType], collation: &[SortKey]) -> Option<RowType> {
    let input = single(inputs)?;
    collation
        .iter()
        .all(|k| k.field < input.field_count())
        .then(|| input.clone())
}

fn set_op_row_type(inputs: &[&RowType]) -> Option<RowType> {
    let (first, rest) = inputs.split_first()?;
    let mut fields = first.fields.clone();
    for other in rest {
        if !first.equivalent_to(other) {
            return None;
        }
        for (f, o) in fields.iter_mut().zip(&other.fields) {
            f.nullable |= o.nullable;
        }
    }
    Some(RowType::new(fields))
}

fn collect_row_type(inputs: &[&RowType], field_name: &str) -> Option<RowType> {
    single(inputs)?;
    Some(RowType::new(vec![Field::new(
        field_name,
        DataType::Multiset,
        false,
    )]))
}

fn window_row_type(inputs: &[&RowType], groups: &[WindowGroup]) -> Option<RowType> {
    let input = single(inputs)?;
    let mut fields = input.fields.clone();
    for group in groups {
        for call in &group.calls {
            fields.push(call.output_field(input, true)?);
        }
    }
    Some(RowType::new(fields))
}

fn attr(key: &str, value: impl fmt::Display) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn format_list(items: &[usize]) -> String {
    let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}

fn project_attrs(exprs: &[Expr], names: &[String]) -> Vec<(String, String)> {
    exprs
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let name = names.get(i).cloned().unwrap_or_else(|| format!("${i}"));
            (name, e.to_string())
        })
        .collect()
}

fn join_attrs(join_type: JoinType, condition: &Expr) -> Vec<(String, String)> {
    vec![attr("condition", condition), attr("joinType", join_type.name())]
}

fn aggregate_attrs(group_set: &[usize], aggregates: &[AggCall]) -> Vec<(String, String)> {
    let mut attrs = vec![attr("group", format_list(group_set))];
    attrs.extend(aggregates.iter().map(|a| (a.name.clone(), a.to_string())));
    attrs
}

fn sort_attrs(collation: &[SortKey], offset: Option<u64>, fetch: Option<u64>) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = collation
        .iter()
        .enumerate()
        .map(|(i, k)| (format!("sort{i}"), format!("${}", k.field)))
        .collect();
    attrs.extend(collation.iter().enumerate().map(|(i, k)| {
        let dir = if k.ascending { "ASC" } else { "DESC" };
        (format!("dir{i}"), dir.to_string())
    }));
    if let Some(offset) = offset {
        attrs.push(attr("offset", offset));
    }
    if let Some(fetch) = fetch {
        attrs.push(attr("fetch", fetch));
    }
    attrs
}

fn correlate_attrs(join_type: JoinType, correlation_id: u32, required: &[usize]) -> Vec<(String, String)> {
    vec![
        attr("correlation", format!("$cor{correlation_id}")),
        attr("joinType", join_type.name()),
        attr("requiredColumns", format_list(required)),
    ]
}

fn window_attrs(groups: &[WindowGroup]) -> Vec<(String, String)> {
    groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let order: Vec<String> = g.order_by.iter().map(|k| k.to_string()).collect();
            let calls: Vec<String> = g.calls.iter().map(|c| c.to_string()).collect();
            (
                format!("window#{i}"),
                format!(
                    "window(partition {} order by [{}] aggs [{}])",
                    format_list(&g.partition_by),
                    order.join(", "),
                    calls.join(", ")
                ),
            )
        })
        .collect()
}

/// Kind discriminant for pattern matching (without data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Scan,
    Filter,
    Project,
    Join,
    Aggregate,
    Sort,
    Union,
    Intersect,
    Minus,
    Correlate,
    Collect,
    Window,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Project { .. } => LogicalOpKind::Project,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::Aggregate { .. } => LogicalOpKind::Aggregate,
            LogicalOp::Sort { .. } => LogicalOpKind::Sort,
            LogicalOp::Union { .. } => LogicalOpKind::Union,
            LogicalOp::Intersect { .. } => LogicalOpKind::Intersect,
            LogicalOp::Minus { .. } => LogicalOpKind::Minus,
            LogicalOp::Correlate { .. } => LogicalOpKind::Correlate,
            LogicalOp::Collect { .. } => LogicalOpKind::Collect,
            LogicalOp::Window { .. } => LogicalOpKind::Window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    Filter,
    Project,
    HashJoin,
    MergeJoin,
    NestedLoopJoin,
    HashAggregate,
    StreamAggregate,
    SortOp,
    Union,
    Intersect,
    Minus,
    Correlate,
    Collect,
    Window,
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::Filter { .. } => PhysicalOpKind::Filter,
            PhysicalOp::Project { .. } => PhysicalOpKind::Project,
            PhysicalOp::HashJoin { .. } => PhysicalOpKind::HashJoin,
            PhysicalOp::MergeJoin { .. } => PhysicalOpKind::MergeJoin,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::HashAggregate { .. } => PhysicalOpKind::HashAggregate,
            PhysicalOp::StreamAggregate { .. } => PhysicalOpKind::StreamAggregate,
            PhysicalOp::SortOp { .. } => PhysicalOpKind::SortOp,
            PhysicalOp::Union { .. } => PhysicalOpKind::Union,
            PhysicalOp::Intersect { .. } => PhysicalOpKind::Intersect,
            PhysicalOp::Minus { .. } => PhysicalOpKind::Minus,
            PhysicalOp::Correlate { .. } => PhysicalOpKind::Correlate,
            PhysicalOp::Collect { .. } => PhysicalOpKind::Collect,
            PhysicalOp::Window { .. } => PhysicalOpKind::Window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emps() -> RowType {
        RowType::new(vec![
            Field::new("empid", DataType::Int64, false),
            Field::new("deptno", DataType::Int64, false),
        ])
    }

    fn depts() -> RowType {
        RowType::new(vec![
            Field::new("deptno", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
        ])
    }

    #[test]
    fn test_outer_join_row_type_is_nullable_on_generating_side() {
        let join = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Left,
            condition: Expr::eq(Expr::col(1), Expr::col(2)),
        });
        let rt = join.derive_row_type(&[&emps(), &depts()]).unwrap();
        assert_eq!(rt.field_count(), 4);
        assert!(!rt.fields[0].nullable);
        assert!(rt.fields[2].nullable && rt.fields[3].nullable);

        let semi = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Semi,
            condition: Expr::eq(Expr::col(1), Expr::col(2)),
        });
        assert_eq!(semi.derive_row_type(&[&emps(), &depts()]), Some(emps()));
    }

    #[test]
    fn test_aggregate_row_type() {
        let agg = Operator::Logical(LogicalOp::Aggregate {
            group_set: vec![1],
            aggregates: vec![AggCall::count_star("c"), AggCall::new(AggFunc::Avg, vec![0], "a")],
        });
        let rt = agg.derive_row_type(&[&emps()]).unwrap();
        assert_eq!(rt.field_names(), vec!["deptno", "c", "a"]);
        assert_eq!(rt.fields[2].data_type, DataType::Float64);
        assert!(!rt.fields[1].nullable);
    }

    #[test]
    fn test_derivation_rejects_bad_references_and_arity() {
        let filter = Operator::Logical(LogicalOp::Filter {
            condition: Expr::gt(Expr::col(5), Expr::int(1)),
        });
        assert!(filter.derive_row_type(&[&emps()]).is_none());
        assert!(filter.derive_row_type(&[]).is_none());

        let union = Operator::Physical(PhysicalOp::Union { all: true });
        assert!(union.derive_row_type(&[&emps(), &depts()]).is_none());
        assert_eq!(union.derive_row_type(&[&emps(), &emps()]), Some(emps()));
    }

    #[test]
    fn test_traits_and_explain() {
        let merge = PhysicalOp::MergeJoin {
            join_type: JoinType::Inner,
            condition: Expr::eq(Expr::col(1), Expr::col(2)),
            left_keys: vec![1],
            right_keys: vec![0],
        };
        let required = merge.required_input_traits(2);
        assert_eq!(required[0].collation, vec![SortKey::asc(1)]);
        assert_eq!(required[1].collation, vec![SortKey::asc(0)]);
        assert!(merge.delivered_traits().collation.is_empty());

        let attrs = Operator::Physical(merge).explain_attrs();
        assert_eq!(attrs[0], ("condition".to_string(), "=($1, $2)".to_string()));
        assert_eq!(attrs[1], ("joinType".to_string(), "inner".to_string()));
        assert_eq!(attrs[2], ("leftKeys".to_string(), "{1}".to_string()));
        assert_eq!(Operator::Logical(LogicalOp::Union { all: false }).name(), "LogicalUnion");
    }

    #[test]
    fn test_join_type_push_permissions() {
        assert!(JoinType::Left.can_push_left_from_above());
        assert!(!JoinType::Left.can_push_right_from_above());
        assert!(JoinType::Left.can_push_right_from_within());
        assert!(!JoinType::Left.can_push_left_from_within());
        assert!(!JoinType::Full.can_push_left_from_above());
        assert!(!JoinType::Full.can_push_right_from_within());
        assert_eq!(JoinType::Left.swap(), Some(JoinType::Right));
        assert_eq!(JoinType::Semi.swap(), None);
    }
}
