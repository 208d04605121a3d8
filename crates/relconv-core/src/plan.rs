//! # Plan Nodes and Operators
//!
//! A plan is a tree of immutable [`PlanNode`]s shared through [`PlanRef`] (`Arc`).
//! Each node holds one operator, a trait set and its ordered inputs. Nodes are never
//! mutated: "copying" a node always constructs a new one, and input nodes may be
//! aliased freely across trees.
//!
//! ## Operators
//!
//! Operators form a closed sum type split into two families:
//!
//! - **Logical operators** (`LogicalOp`) describe *what* to compute. They appear in the
//!   NONE convention (straight from the binder) and in the LOGICAL convention, or in any
//!   user-defined convention except PHYSICAL.
//! - **Physical operators** (`PhysicalOp`) describe *how* to execute it and only ever
//!   appear in the PHYSICAL convention.
//!
//! `OpKind` strips the payload and keeps only the discriminant. The rule registry is
//! keyed by it.
//!
//! ## Construction-Time Validation
//!
//! `PlanNode::new` refuses to build a node whose convention the operator kind does not
//! admit, whose input count differs from the operator's arity, or whose payload refers
//! to columns its inputs do not produce. Malformed trees therefore cannot be built.
//!
//! ## Equality
//!
//! `PartialEq`/`Hash` compare the operator, the trait set and the *identity* of the
//! inputs (`Arc::ptr_eq`), which keeps comparisons O(1) in tree depth. Use
//! [`PlanNode::deep_eq`] to compare whole subtrees by value.
//!
//! ## Deep Trees
//!
//! Nothing in this module recurses over inputs. `deep_eq` and `is_in_convention` walk
//! an explicit stack, and dropping a node unlinks its uniquely owned descendants one at
//! a time, so a long chain never exhausts the thread stack.

use crate::error::{PlanError, Result};
use crate::expr::{AggregateCall, Expr, JoinType, TableRef};
use crate::traits::{Convention, FieldCollation, TraitSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type PlanRef = Arc<PlanNode>;

/// Default bound on the depth of plans accepted from callers.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Ordered set of column indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet(BTreeSet<usize>);

impl ColumnSet {
    pub fn of(columns: &[usize]) -> Self {
        columns.iter().copied().collect()
    }

    pub fn contains(&self, column: usize) -> bool {
        self.0.contains(&column)
    }

    pub fn is_subset(&self, other: &ColumnSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn max_column(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        ColumnSet(iter.into_iter().collect())
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        crate::traits::write_list(f, self.iter().map(|c| c.to_string()))?;
        f.write_str("}")
    }
}

/// Planner hint attached to an operator. The engine never interprets hints; it only
/// carries them through conversions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanHint {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl PlanHint {
    pub fn new(name: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Aggregation payload shared by the logical Aggregate and the physical HashAggregate.
///
/// `group_sets` holds one entry per grouping set (ROLLUP/CUBE produce several). A plain
/// `GROUP BY` has exactly one grouping set equal to `group_set`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    pub group_set: ColumnSet,
    pub group_sets: Vec<ColumnSet>,
    pub agg_calls: Vec<AggregateCall>,
    #[serde(default)]
    pub hints: Vec<PlanHint>,
}

impl Aggregate {
    /// Create an aggregate. `group_sets` defaults to `[group_set]`.
    pub fn new(
        group_set: ColumnSet,
        group_sets: Option<Vec<ColumnSet>>,
        agg_calls: Vec<AggregateCall>,
    ) -> Result<Self> {
        let group_sets = group_sets.unwrap_or_else(|| vec![group_set.clone()]);
        let agg = Self {
            group_set,
            group_sets,
            agg_calls,
            hints: Vec::new(),
        };
        agg.check_group_sets()?;
        Ok(agg)
    }

    pub fn with_hints(mut self, hints: Vec<PlanHint>) -> Self {
        self.hints = hints;
        self
    }

    /// True for a plain GROUP BY (a single grouping set equal to the group set).
    pub fn is_simple(&self) -> bool {
        self.group_sets.len() == 1 && self.group_sets[0] == self.group_set
    }

    pub fn output_width(&self) -> usize {
        self.group_set.len() + self.agg_calls.len()
    }

    fn check_group_sets(&self) -> Result<()> {
        if self.group_sets.is_empty() {
            return Err(PlanError::invalid_plan("aggregate has no grouping sets"));
        }
        if let Some(bad) = self
            .group_sets
            .iter()
            .find(|s| !s.is_subset(&self.group_set))
        {
            return Err(PlanError::invalid_plan(format!(
                "grouping set {bad} is not a subset of group set {}",
                self.group_set
            )));
        }
        Ok(())
    }

    fn validate(&self, input_width: usize) -> Result<()> {
        self.check_group_sets()?;
        check_column("aggregate group set", self.group_set.max_column(), input_width)?;
        for call in &self.agg_calls {
            check_column("aggregate call", call.max_input_ref(), input_width)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSide {
    Left,
    Right,
}

/// Logical operators. Children live in the enclosing [`PlanNode`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Leaf reading the named columns of a base table.
    Scan {
        table: TableRef,
        columns: Vec<String>,
    },
    Filter {
        predicate: Expr,
    },
    Project {
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    Join {
        join_type: JoinType,
        condition: Expr,
    },
    Aggregate(Aggregate),
    Sort {
        collation: Vec<FieldCollation>,
    },
    Limit {
        offset: u64,
        count: u64,
    },
}

/// Physical operators, produced from logical ones by converter rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOp {
    SeqScan {
        table: TableRef,
        columns: Vec<String>,
    },
    Filter {
        predicate: Expr,
    },
    Project {
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    /// Hash join on an equi-condition; `build_side` is materialized into the table.
    HashJoin {
        join_type: JoinType,
        condition: Expr,
        build_side: BuildSide,
    },
    /// Universal fallback for non-equi conditions and cross joins.
    NestedLoopJoin {
        join_type: JoinType,
        condition: Expr,
    },
    HashAggregate(Aggregate),
    SortOp {
        collation: Vec<FieldCollation>,
    },
    Limit {
        offset: u64,
        count: u64,
    },
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

    /// Number of inputs a node of this operator must have.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Logical(LogicalOp::Scan { .. })
            | Operator::Physical(PhysicalOp::SeqScan { .. }) => 0,
            Operator::Logical(LogicalOp::Join { .. })
            | Operator::Physical(PhysicalOp::HashJoin { .. })
            | Operator::Physical(PhysicalOp::NestedLoopJoin { .. }) => 2,
            _ => 1,
        }
    }

    /// Whether a node of this operator may carry the given convention.
    ///
    /// Logical operators are shared by NONE and LOGICAL (and by user conventions other
    /// than PHYSICAL): a binder emits them in NONE and the first stage retags them to
    /// LOGICAL without changing the operator. Physical operators exist only in PHYSICAL.
    pub fn admits(&self, convention: &Convention) -> bool {
        match self {
            Operator::Logical(_) => convention != &Convention::PHYSICAL,
            Operator::Physical(_) => convention == &Convention::PHYSICAL,
        }
    }

    pub fn aggregate(&self) -> Option<&Aggregate> {
        match self {
            Operator::Logical(LogicalOp::Aggregate(agg))
            | Operator::Physical(PhysicalOp::HashAggregate(agg)) => Some(agg),
            _ => None,
        }
    }

    fn join(&self) -> Option<(JoinType, &Expr)> {
        match self {
            Operator::Logical(LogicalOp::Join {
                join_type,
                condition,
            })
            | Operator::Physical(PhysicalOp::HashJoin {
                join_type,
                condition,
                ..
            })
            | Operator::Physical(PhysicalOp::NestedLoopJoin {
                join_type,
                condition,
            }) => Some((*join_type, condition)),
            _ => None,
        }
    }

    /// Width of the rows this operator produces over the given inputs.
    pub fn output_width(&self, inputs: &[PlanRef]) -> usize {
        let input_width = |i: usize| inputs.get(i).map_or(0, |n| n.output_width());
        if let Some((join_type, _)) = self.join() {
            return match join_type {
                JoinType::Semi | JoinType::Anti => input_width(0),
                _ => input_width(0) + input_width(1),
            };
        }
        if let Some(agg) = self.aggregate() {
            return agg.output_width();
        }
        match self {
            Operator::Logical(LogicalOp::Scan { columns, .. })
            | Operator::Physical(PhysicalOp::SeqScan { columns, .. }) => columns.len(),
            Operator::Logical(LogicalOp::Project { exprs, .. })
            | Operator::Physical(PhysicalOp::Project { exprs, .. }) => exprs.len(),
            _ => input_width(0),
        }
    }

    /// Check the payload against the inputs' widths.
    fn validate(&self, inputs: &[PlanRef]) -> Result<()> {
        if let Some((_, condition)) = self.join() {
            let width = inputs.iter().map(|n| n.output_width()).sum();
            return check_column("join condition", condition.max_input_ref(), width);
        }
        let input_width = inputs.first().map_or(0, |n| n.output_width());
        if let Some(agg) = self.aggregate() {
            return agg.validate(input_width);
        }
        match self {
            Operator::Logical(LogicalOp::Filter { predicate })
            | Operator::Physical(PhysicalOp::Filter { predicate }) => {
                check_column("filter predicate", predicate.max_input_ref(), input_width)
            }
            Operator::Logical(LogicalOp::Project { exprs, aliases })
            | Operator::Physical(PhysicalOp::Project { exprs, aliases }) => {
                if exprs.len() != aliases.len() {
                    return Err(PlanError::invalid_plan(format!(
                        "project has {} expressions but {} aliases",
                        exprs.len(),
                        aliases.len()
                    )));
                }
                let max = exprs.iter().filter_map(Expr::max_input_ref).max();
                check_column("project expression", max, input_width)
            }
            Operator::Logical(LogicalOp::Sort { collation })
            | Operator::Physical(PhysicalOp::SortOp { collation }) => {
                let max = collation.iter().map(|c| c.index).max();
                check_column("sort key", max, input_width)
            }
            _ => Ok(()),
        }
    }
}

fn check_column(what: &str, max: Option<usize>, width: usize) -> Result<()> {
    match max {
        Some(index) if index >= width => Err(PlanError::invalid_plan(format!(
            "{what} references column ${index} but the input has {width} columns"
        ))),
        _ => Ok(()),
    }
}

/// Kind discriminant for pattern matching and rule lookup (without data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

impl From<LogicalOpKind> for OpKind {
    fn from(kind: LogicalOpKind) -> Self {
        OpKind::Logical(kind)
    }
}

impl From<PhysicalOpKind> for OpKind {
    fn from(kind: PhysicalOpKind) -> Self {
        OpKind::Physical(kind)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Logical(k) => write!(f, "{k}"),
            OpKind::Physical(k) => write!(f, "{k}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Scan,
    Filter,
    Project,
    Join,
    Aggregate,
    Sort,
    Limit,
}

impl LogicalOpKind {
    pub const ALL: [LogicalOpKind; 7] = [
        LogicalOpKind::Scan,
        LogicalOpKind::Filter,
        LogicalOpKind::Project,
        LogicalOpKind::Join,
        LogicalOpKind::Aggregate,
        LogicalOpKind::Sort,
        LogicalOpKind::Limit,
    ];
}

impl fmt::Display for LogicalOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logical{self:?}")
    }
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Project { .. } => LogicalOpKind::Project,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::Aggregate(_) => LogicalOpKind::Aggregate,
            LogicalOp::Sort { .. } => LogicalOpKind::Sort,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    Filter,
    Project,
    HashJoin,
    NestedLoopJoin,
    HashAggregate,
    SortOp,
    Limit,
}

impl fmt::Display for PhysicalOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalOpKind::Filter => f.write_str("PhysicalFilter"),
            PhysicalOpKind::Project => f.write_str("PhysicalProject"),
            PhysicalOpKind::SortOp => f.write_str("PhysicalSort"),
            PhysicalOpKind::Limit => f.write_str("PhysicalLimit"),
            other => write!(f, "{other:?}"),
        }
    }
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::Filter { .. } => PhysicalOpKind::Filter,
            PhysicalOp::Project { .. } => PhysicalOpKind::Project,
            PhysicalOp::HashJoin { .. } => PhysicalOpKind::HashJoin,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::HashAggregate(_) => PhysicalOpKind::HashAggregate,
            PhysicalOp::SortOp { .. } => PhysicalOpKind::SortOp,
            PhysicalOp::Limit { .. } => PhysicalOpKind::Limit,
        }
    }
}

/// One immutable relational operator in a plan tree.
#[derive(Debug)]
pub struct PlanNode {
    op: Operator,
    traits: TraitSet,
    inputs: Vec<PlanRef>,
    width: usize,
}

impl PlanNode {
    /// Construct a node, validating convention, arity and payload.
    pub fn new(op: Operator, traits: TraitSet, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        if !op.admits(traits.convention()) {
            return Err(PlanError::invalid_trait(format!(
                "{} cannot be constructed in convention {}",
                op.kind(),
                traits.convention()
            )));
        }
        if inputs.len() != op.arity() {
            return Err(PlanError::invalid_plan(format!(
                "{} expects {} inputs, got {}",
                op.kind(),
                op.arity(),
                inputs.len()
            )));
        }
        op.validate(&inputs)?;
        let width = op.output_width(&inputs);
        Ok(Arc::new(PlanNode {
            op,
            traits,
            inputs,
            width,
        }))
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn traits(&self) -> &TraitSet {
        &self.traits
    }

    pub fn convention(&self) -> &Convention {
        self.traits.convention()
    }

    pub fn inputs(&self) -> &[PlanRef] {
        &self.inputs
    }

    pub fn input(&self, index: usize) -> Option<&PlanRef> {
        self.inputs.get(index)
    }

    pub fn output_width(&self) -> usize {
        self.width
    }

    pub fn aggregate(&self) -> Option<&Aggregate> {
        self.op.aggregate()
    }

    /// Reproduce this node over a new trait set and new inputs, keeping the operator.
    pub fn copy(&self, traits: TraitSet, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        PlanNode::new(self.op.clone(), traits, inputs)
    }

    /// Like [`copy`](Self::copy) but with new operator attributes of the same kind.
    pub fn copy_with_op(
        &self,
        op: Operator,
        traits: TraitSet,
        inputs: Vec<PlanRef>,
    ) -> Result<PlanRef> {
        if op.kind() != self.kind() {
            return Err(PlanError::invalid_plan(format!(
                "copy of {} cannot change the operator to {}",
                self.kind(),
                op.kind()
            )));
        }
        PlanNode::new(op, traits, inputs)
    }

    /// Structural comparison of whole subtrees.
    pub fn deep_eq(&self, other: &PlanNode) -> bool {
        let mut seen: HashSet<(*const PlanNode, *const PlanNode)> = HashSet::new();
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            // Equal nodes share their inputs, so their subtrees are equal too.
            if a == b || !seen.insert((a as *const PlanNode, b as *const PlanNode)) {
                continue;
            }
            if !a.shallow_eq(b) {
                return false;
            }
            pending.extend(a.inputs.iter().map(|i| &**i).zip(b.inputs.iter().map(|i| &**i)));
        }
        true
    }

    fn shallow_eq(&self, other: &PlanNode) -> bool {
        self.op == other.op
            && self.traits == other.traits
            && self.inputs.len() == other.inputs.len()
    }

    /// Single-line rendering of this node (without its inputs).
    pub fn digest(&self) -> String {
        format!("{} {}", self.op, self.traits)
    }

    /// True if every node in this subtree carries the given convention.
    pub fn is_in_convention(&self, convention: &Convention) -> bool {
        let mut seen: HashSet<*const PlanNode> = HashSet::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            if !seen.insert(node as *const PlanNode) {
                continue;
            }
            if !node.traits.contains_convention(convention) {
                return false;
            }
            pending.extend(node.inputs.iter().map(|i| &**i));
        }
        true
    }
}

impl Drop for PlanNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.inputs);
        while let Some(input) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(input) {
                pending.append(&mut node.inputs);
            }
        }
    }
}

impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && self.traits == other.traits
            && self.inputs.len() == other.inputs.len()
            && self
                .inputs
                .iter()
                .zip(&other.inputs)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Eq for PlanNode {}

impl Hash for PlanNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.traits.hash(state);
        for input in &self.inputs {
            std::ptr::hash(Arc::as_ptr(input), state);
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest())
    }
}
