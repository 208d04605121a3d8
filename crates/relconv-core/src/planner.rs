//! # Convention Normalization Planner
//!
//! The planner converts a plan tree into a requested target convention in a single
//! bottom-up pass. There is no search: it performs convention normalization only, and
//! cost-based choice among alternatives belongs to a later phase.
//!
//! ## Algorithm
//!
//! For a node `n` and target `t`:
//!
//! 1. Convert every input of `n` to `t` first, in declared input order.
//! 2. If `n` already carries `t`, return it as is when no input changed, or copy it
//!    over the converted inputs otherwise.
//! 3. Otherwise look up the candidates for `(kind(n), convention(n), t)` in the
//!    registry, rebuild `n` over the converted inputs, and invoke the first candidate
//!    (by priority) whose operand matches the rebuilt node.
//! 4. Check the rule's output against the converter contract.
//!
//! ## Termination
//!
//! Each node is visited at most once per call. Its state is kept in a per-call memo
//! keyed by node identity:
//!
//! ```text
//! (absent) --visit--> Converting --rule ok--> Converted
//! ```
//!
//! Any failure aborts the whole call, so no failed state is kept. Visiting a node that
//! is still `Converting` would mean the node is its own descendant, and the call fails
//! with `CyclicPlan`. The total work is O(distinct nodes × candidates per node).
//!
//! The traversal runs on an explicit work stack rather than the call stack, so deep
//! trees cost heap, not thread stack. `PlannerConfig::max_depth` still bounds the
//! accepted depth and trees past it fail with `PlanTooDeep`.
//!
//! ## Output Deduplication
//!
//! With `dedup_outputs` enabled, structurally equal outputs are shared as one `Arc`.
//! Structural equality compares input identities, and inputs were deduplicated before
//! their parents, so this amounts to hash-consing the converted tree.
//!
//! ## Concurrency
//!
//! `Planner` holds only an `Arc<RuleRegistry>` and its config, and every call allocates
//! its own memo, so one planner can serve concurrent compilations across threads.

use crate::error::{PlanError, Result};
use crate::graph::PlanGraph;
use crate::plan::{PlanNode, PlanRef, DEFAULT_MAX_DEPTH};
use crate::rule::{ConverterRule, RuleRegistry};
use crate::traits::Convention;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, trace};

/// Tuning knobs for the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Share structurally equal converted nodes.
    pub dedup_outputs: bool,
    /// Maximum depth of plan trees accepted by `convert`.
    pub max_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dedup_outputs: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The rule engine: owns the frozen registry and drives conversions.
pub struct Planner {
    registry: Arc<RuleRegistry>,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(registry: Arc<RuleRegistry>, config: PlannerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Convert `root` so that every node in the result carries `target`.
    pub fn convert(&self, root: &PlanRef, target: &Convention) -> Result<PlanRef> {
        debug!(
            "Starting conversion to {}: root={}, convention={}",
            target,
            root.kind(),
            root.convention()
        );
        let mut conversion = Conversion {
            registry: &self.registry,
            config: &self.config,
            target,
            states: HashMap::new(),
            interned: HashSet::new(),
            rule_applications: 0,
        };
        match conversion.run(root) {
            Ok(plan) => {
                debug!(
                    "Conversion to {} complete: nodes={}, rules applied={}",
                    target,
                    conversion.states.len(),
                    conversion.rule_applications
                );
                Ok(plan)
            }
            Err(err) => {
                debug!("Conversion to {} failed: {}", target, err);
                Err(err)
            }
        }
    }

    /// Convert through several conventions in order, e.g. `[LOGICAL, PHYSICAL]`.
    pub fn convert_through(&self, root: &PlanRef, stages: &[Convention]) -> Result<PlanRef> {
        stages
            .iter()
            .try_fold(root.clone(), |plan, stage| self.convert(&plan, stage))
    }

    /// Resolve the id-addressed wire form and convert it.
    pub fn convert_graph(&self, graph: &PlanGraph, target: &Convention) -> Result<PlanRef> {
        let root = graph.to_plan_with_max_depth(self.config.max_depth)?;
        self.convert(&root, target)
    }
}

enum NodeState {
    Converting,
    Converted(PlanRef),
}

enum Step<'p> {
    Visit(&'p PlanRef, usize),
    Finish(&'p PlanRef),
}

/// `PlanRef` hashed and compared structurally, for output deduplication.
struct Interned(PlanRef);

impl PartialEq for Interned {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl Eq for Interned {}

impl Hash for Interned {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// State of one `convert` call.
struct Conversion<'a> {
    registry: &'a RuleRegistry,
    config: &'a PlannerConfig,
    target: &'a Convention,
    /// Keyed by node address. Every key belongs to a node reachable from the root, which
    /// the caller keeps alive for the whole call.
    states: HashMap<usize, NodeState>,
    interned: HashSet<Interned>,
    rule_applications: usize,
}

impl Conversion<'_> {
    fn run(&mut self, root: &PlanRef) -> Result<PlanRef> {
        let mut steps = vec![Step::Visit(root, 0)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(node, depth) => {
                    match self.states.get(&key(node)) {
                        Some(NodeState::Converted(_)) => continue,
                        Some(NodeState::Converting) => {
                            return Err(PlanError::CyclicPlan {
                                node: node.digest(),
                            })
                        }
                        None => {}
                    }
                    if depth > self.config.max_depth {
                        return Err(PlanError::PlanTooDeep {
                            limit: self.config.max_depth,
                        });
                    }
                    self.states.insert(key(node), NodeState::Converting);
                    steps.push(Step::Finish(node));
                    // Reversed so that inputs are converted in declared order.
                    steps.extend(
                        node.inputs()
                            .iter()
                            .rev()
                            .map(|input| Step::Visit(input, depth + 1)),
                    );
                }
                Step::Finish(node) => {
                    let inputs = node
                        .inputs()
                        .iter()
                        .map(|input| self.converted(input))
                        .collect::<Result<Vec<_>>>()?;
                    let converted = self.convert_over(node, inputs)?;
                    let converted = self.intern(converted);
                    self.states.insert(key(node), NodeState::Converted(converted));
                }
            }
        }
        self.converted(root)
    }

    fn converted(&self, node: &PlanRef) -> Result<PlanRef> {
        match self.states.get(&key(node)) {
            Some(NodeState::Converted(done)) => Ok(done.clone()),
            _ => Err(PlanError::invalid_plan(format!(
                "{} was not converted before its parent",
                node.kind()
            ))),
        }
    }

    /// Convert `node` given its already converted inputs.
    fn convert_over(&mut self, node: &PlanRef, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        let unchanged = inputs
            .iter()
            .zip(node.inputs())
            .all(|(new, old)| Arc::ptr_eq(new, old));

        if node.traits().contains_convention(self.target) {
            if unchanged {
                return Ok(node.clone());
            }
            return node.copy(node.traits().clone(), inputs);
        }

        let rebuilt = if unchanged {
            node.clone()
        } else {
            node.copy(node.traits().clone(), inputs)?
        };
        self.apply_rule(&rebuilt)
    }

    fn apply_rule(&mut self, node: &PlanRef) -> Result<PlanRef> {
        let no_rule = || PlanError::NoApplicableRule {
            kind: node.kind(),
            from: node.convention().clone(),
            to: self.target.clone(),
        };
        let registry = self.registry;
        let rule = registry
            .candidates(node.kind(), node.convention(), self.target)
            .iter()
            .find(|rule| rule.operand().matches(node))
            .ok_or_else(no_rule)?;

        trace!(
            "Applying converter rule '{}' to {} ({} -> {})",
            rule.name(),
            node.kind(),
            node.convention(),
            self.target
        );
        self.rule_applications += 1;

        let converted = rule
            .convert(node)?
            .ok_or_else(|| PlanError::RuleDeclined {
                rule: rule.name().to_string(),
                kind: node.kind(),
            })?;
        self.check_contract(&**rule, &converted)?;
        Ok(converted)
    }

    fn check_contract(&self, rule: &dyn ConverterRule, converted: &PlanNode) -> Result<()> {
        if !converted.traits().contains_convention(self.target) {
            return Err(PlanError::RuleContract {
                rule: rule.name().to_string(),
                reason: format!(
                    "produced {} in {} instead of {}",
                    converted.kind(),
                    converted.convention(),
                    self.target
                ),
            });
        }
        if let Some(stray) = converted
            .inputs()
            .iter()
            .find(|input| !input.traits().contains_convention(self.target))
        {
            return Err(PlanError::RuleContract {
                rule: rule.name().to_string(),
                reason: format!(
                    "output input {} is in {} instead of {}",
                    stray.kind(),
                    stray.convention(),
                    self.target
                ),
            });
        }
        Ok(())
    }

    fn intern(&mut self, node: PlanRef) -> PlanRef {
        if !self.config.dedup_outputs {
            return node;
        }
        let candidate = Interned(node);
        if let Some(existing) = self.interned.get(&candidate) {
            return existing.0.clone();
        }
        let node = candidate.0.clone();
        self.interned.insert(candidate);
        node
    }
}

/// Memo key: the node's address.
fn key(node: &PlanRef) -> usize {
    Arc::as_ptr(node) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, JoinType, TableRef};
    use crate::pattern::Operand;
    use crate::plan::{LogicalOp, LogicalOpKind, OpKind, Operator};
    use crate::rule::{FnRule, RuleRegistryBuilder};
    use crate::traits::TraitSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scan() -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec!["a".into(), "b".into()],
            }),
            TraitSet::new(Convention::NONE),
            vec![],
        )
        .unwrap()
    }

    fn limit(input: PlanRef) -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Limit {
                offset: 0,
                count: 10,
            }),
            TraitSet::new(Convention::NONE),
            vec![input],
        )
        .unwrap()
    }

    fn join(left: PlanRef, right: PlanRef) -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: Expr::eq_columns(0, 2),
            }),
            TraitSet::new(Convention::NONE),
            vec![left, right],
        )
        .unwrap()
    }

    fn retag(node: &PlanRef) -> Result<Option<PlanRef>> {
        node.copy(
            node.traits().with_convention(Convention::LOGICAL),
            node.inputs().to_vec(),
        )
        .map(Some)
    }

    fn retag_all(builder: &mut RuleRegistryBuilder) {
        for kind in LogicalOpKind::ALL {
            builder.register_fn(
                format!("{kind}Retag"),
                Operand::of(kind),
                Convention::NONE,
                Convention::LOGICAL,
                retag,
            );
        }
    }

    fn planner(builder: RuleRegistryBuilder, config: PlannerConfig) -> Planner {
        Planner::new(Arc::new(builder.build().unwrap()), config)
    }

    fn retag_planner() -> Planner {
        let mut builder = RuleRegistryBuilder::new();
        retag_all(&mut builder);
        planner(builder, PlannerConfig::default())
    }

    #[test]
    fn test_converts_whole_tree() {
        let root = limit(join(scan(), scan()));
        let converted = retag_planner().convert(&root, &Convention::LOGICAL).unwrap();
        assert!(converted.is_in_convention(&Convention::LOGICAL));
        assert_eq!(converted.op(), root.op());
        assert!(root.is_in_convention(&Convention::NONE));
    }

    #[test]
    fn test_already_converted_is_returned_unchanged() {
        let planner = retag_planner();
        let once = planner
            .convert(&limit(scan()), &Convention::LOGICAL)
            .unwrap();
        let twice = planner.convert(&once, &Convention::LOGICAL).unwrap();
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn test_missing_rule_reports_kind_and_conventions() {
        let mut builder = RuleRegistryBuilder::new();
        builder.register_fn(
            "ScanRetag",
            Operand::scan(),
            Convention::NONE,
            Convention::LOGICAL,
            retag,
        );
        let planner = planner(builder, PlannerConfig::default());
        match planner.convert(&limit(scan()), &Convention::LOGICAL) {
            Err(PlanError::NoApplicableRule { kind, from, to }) => {
                assert_eq!(kind, OpKind::Logical(LogicalOpKind::Limit));
                assert_eq!(from, Convention::NONE);
                assert_eq!(to, Convention::LOGICAL);
            }
            other => panic!("expected NoApplicableRule, got {other:?}"),
        }
    }

    #[test]
    fn test_declining_rule() {
        let mut builder = RuleRegistryBuilder::new();
        builder.register_fn(
            "Reluctant",
            Operand::scan(),
            Convention::NONE,
            Convention::LOGICAL,
            |_: &PlanRef| Ok(None),
        );
        let err = planner(builder, PlannerConfig::default())
            .convert(&scan(), &Convention::LOGICAL)
            .unwrap_err();
        assert!(matches!(err, PlanError::RuleDeclined { ref rule, .. } if rule == "Reluctant"));
    }

    #[test]
    fn test_rule_contract_enforced() {
        let mut builder = RuleRegistryBuilder::new();
        builder.register_fn(
            "Identity",
            Operand::scan(),
            Convention::NONE,
            Convention::LOGICAL,
            |node: &PlanRef| Ok(Some(node.clone())),
        );
        let err = planner(builder, PlannerConfig::default())
            .convert(&scan(), &Convention::LOGICAL)
            .unwrap_err();
        assert!(matches!(err, PlanError::RuleContract { .. }));
    }

    #[test]
    fn test_falls_back_when_operand_does_not_match() {
        let mut builder = RuleRegistryBuilder::new();
        builder
            .register_fn(
                "ScanRetag",
                Operand::scan(),
                Convention::NONE,
                Convention::LOGICAL,
                retag,
            )
            .add_rule(Box::new(
                FnRule::new(
                    "OverPhysical",
                    Operand::limit()
                        .inputs(vec![Operand::any().with_convention(Convention::PHYSICAL)]),
                    Convention::NONE,
                    Convention::LOGICAL,
                    |_: &PlanRef| Ok(None),
                )
                .with_priority(5),
            ))
            .register_fn(
                "LimitRetag",
                Operand::limit(),
                Convention::NONE,
                Convention::LOGICAL,
                retag,
            );
        let converted = planner(builder, PlannerConfig::default())
            .convert(&limit(scan()), &Convention::LOGICAL)
            .unwrap();
        assert!(converted.is_in_convention(&Convention::LOGICAL));
    }

    #[test]
    fn test_shared_node_converted_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut builder = RuleRegistryBuilder::new();
        builder
            .register_fn(
                "CountingScan",
                Operand::scan(),
                Convention::NONE,
                Convention::LOGICAL,
                move |node: &PlanRef| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    retag(node)
                },
            )
            .register_fn(
                "JoinRetag",
                Operand::join(),
                Convention::NONE,
                Convention::LOGICAL,
                retag,
            );
        let shared = scan();
        let converted = planner(builder, PlannerConfig::default())
            .convert(&join(shared.clone(), shared), &Convention::LOGICAL)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&converted.inputs()[0], &converted.inputs()[1]));
    }

    #[test]
    fn test_dedup_shares_equal_outputs() {
        let root = join(scan(), scan());

        let shared = retag_planner().convert(&root, &Convention::LOGICAL).unwrap();
        assert!(Arc::ptr_eq(&shared.inputs()[0], &shared.inputs()[1]));

        let mut builder = RuleRegistryBuilder::new();
        retag_all(&mut builder);
        let config = PlannerConfig {
            dedup_outputs: false,
            ..PlannerConfig::default()
        };
        let separate = planner(builder, config)
            .convert(&root, &Convention::LOGICAL)
            .unwrap();
        assert!(!Arc::ptr_eq(&separate.inputs()[0], &separate.inputs()[1]));
        assert!(separate.deep_eq(&shared));
    }

    #[test]
    fn test_depth_limit() {
        let mut builder = RuleRegistryBuilder::new();
        retag_all(&mut builder);
        let config = PlannerConfig {
            max_depth: 2,
            ..PlannerConfig::default()
        };
        let planner = planner(builder, config);
        let deep = limit(limit(limit(scan())));
        assert!(matches!(
            planner.convert(&deep, &Convention::LOGICAL),
            Err(PlanError::PlanTooDeep { limit: 2 })
        ));
        assert!(planner
            .convert(&limit(limit(scan())), &Convention::LOGICAL)
            .is_ok());
    }

    fn limit_chain(limits: usize) -> PlanRef {
        (0..limits).fold(scan(), |node, _| limit(node))
    }

    #[test]
    fn test_default_depth_limit() {
        let planner = retag_planner();
        let at_limit = limit_chain(DEFAULT_MAX_DEPTH);
        let converted = planner.convert(&at_limit, &Convention::LOGICAL).unwrap();
        assert!(converted.is_in_convention(&Convention::LOGICAL));
        assert!(matches!(
            planner.convert(&limit_chain(DEFAULT_MAX_DEPTH + 1), &Convention::LOGICAL),
            Err(PlanError::PlanTooDeep {
                limit: DEFAULT_MAX_DEPTH
            })
        ));
    }

    #[test]
    fn test_long_chain_converts_on_a_small_stack() {
        let mut builder = RuleRegistryBuilder::new();
        retag_all(&mut builder);
        let config = PlannerConfig {
            max_depth: 200_000,
            ..PlannerConfig::default()
        };
        let planner = planner(builder, config);
        let root = limit_chain(150_000);
        let converted = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || planner.convert(&root, &Convention::LOGICAL).map(|p| p.digest()))
            .unwrap()
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(converted, "LogicalLimit(offset=0, count=10) [LOGICAL]");
    }

    #[test]
    fn test_convert_through_empty_stages_is_identity() {
        let root = limit(scan());
        let same = retag_planner().convert_through(&root, &[]).unwrap();
        assert!(Arc::ptr_eq(&root, &same));
    }
}
