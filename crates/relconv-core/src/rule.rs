//! # Converter Rules and the Rule Registry
//!
//! A converter rule rewrites a node in one convention into an equivalent node in
//! another. Examples: a NONE-convention aggregate re-tagged LOGICAL, or a LOGICAL
//! aggregate implemented as a PHYSICAL hash aggregate.
//!
//! ## Rule Contract
//!
//! - `convert` is pure: it returns a new node (`Ok(Some(..))`) or declines
//!   (`Ok(None)`), and never touches its argument.
//! - The node handed to `convert` already sits on inputs converted to the target
//!   convention, so a rule only needs to rebuild the root.
//! - The returned node must carry `target_convention()`, and so must its direct inputs.
//!   The planner checks this and reports `RuleContract` otherwise.
//!
//! ## Registry
//!
//! Rules are collected in a [`RuleRegistryBuilder`] at startup and frozen by
//! [`RuleRegistryBuilder::build`]. The frozen [`RuleRegistry`] has no mutating methods,
//! so it can be shared by reference (usually behind an `Arc`) between any number of
//! concurrent compilations.
//!
//! The registry is keyed by `(operator kind, source convention, target convention)`.
//! Several rules may share a key if their priorities differ. Candidates are then tried
//! from highest priority down, and the first whose operand matches wins. Two rules on
//! the same key with the same priority would make the choice arbitrary, so `build`
//! rejects them with `AmbiguousRule`.

use crate::error::{PlanError, Result};
use crate::pattern::Operand;
use crate::plan::{OpKind, PlanRef};
use crate::traits::Convention;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A rule that converts nodes from one convention to another.
pub trait ConverterRule: Send + Sync {
    /// Unique, human-readable name of this rule.
    fn name(&self) -> &str;

    /// Pattern the node must match. Its root must name an exact operator kind.
    fn operand(&self) -> Operand;

    fn source_convention(&self) -> Convention;

    fn target_convention(&self) -> Convention;

    /// Higher priorities are tried first among rules sharing a key.
    fn priority(&self) -> i32 {
        0
    }

    /// Convert a matching node, or decline with `Ok(None)`.
    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>>;
}

type TransformFn = dyn Fn(&PlanRef) -> Result<Option<PlanRef>> + Send + Sync;

/// Converter rule backed by a closure, for registrations that do not warrant a type.
pub struct FnRule {
    name: String,
    operand: Operand,
    source: Convention,
    target: Convention,
    priority: i32,
    transform: Box<TransformFn>,
}

impl FnRule {
    pub fn new<F>(
        name: impl Into<String>,
        operand: Operand,
        source: Convention,
        target: Convention,
        transform: F,
    ) -> Self
    where
        F: Fn(&PlanRef) -> Result<Option<PlanRef>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operand,
            source,
            target,
            priority: 0,
            transform: Box::new(transform),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ConverterRule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operand(&self) -> Operand {
        self.operand.clone()
    }

    fn source_convention(&self) -> Convention {
        self.source.clone()
    }

    fn target_convention(&self) -> Convention {
        self.target.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        (self.transform)(node)
    }
}

/// Registry key: the conversion a rule performs, for one operator kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey {
    pub kind: OpKind,
    pub from: Convention,
    pub to: Convention,
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.kind, self.from, self.to)
    }
}

/// Mutable collection of rules, used only during startup.
#[derive(Default)]
pub struct RuleRegistryBuilder {
    rules: Vec<Arc<dyn ConverterRule>>,
}

impl RuleRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Box<dyn ConverterRule>) -> &mut Self {
        self.rules.push(Arc::from(rule));
        self
    }

    /// Register a closure as a rule. The operand carries the operator kind.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        operand: Operand,
        source: Convention,
        target: Convention,
        transform: F,
    ) -> &mut Self
    where
        F: Fn(&PlanRef) -> Result<Option<PlanRef>> + Send + Sync + 'static,
    {
        self.add_rule(Box::new(FnRule::new(name, operand, source, target, transform)))
    }

    /// Validate every registration and freeze the registry.
    pub fn build(self) -> Result<RuleRegistry> {
        let mut by_key: BTreeMap<RuleKey, Vec<Arc<dyn ConverterRule>>> = BTreeMap::new();
        for rule in &self.rules {
            let operand = rule.operand();
            let kind = operand.root_kind().ok_or_else(|| PlanError::InvalidRule {
                rule: rule.name().to_string(),
                reason: "operand does not name an operator kind".into(),
            })?;
            let from = rule.source_convention();
            let to = rule.target_convention();
            if from == to {
                return Err(PlanError::InvalidRule {
                    rule: rule.name().to_string(),
                    reason: format!("source and target are both {from}"),
                });
            }
            if let Some(pinned) = &operand.convention {
                if pinned != &from {
                    return Err(PlanError::InvalidRule {
                        rule: rule.name().to_string(),
                        reason: format!(
                            "operand requires {pinned} but the rule converts from {from}"
                        ),
                    });
                }
            }
            by_key
                .entry(RuleKey { kind, from, to })
                .or_default()
                .push(rule.clone());
        }

        for (key, rules) in by_key.iter_mut() {
            // Stable sort: ties keep registration order, which the check below rejects.
            rules.sort_by_key(|r| Reverse(r.priority()));
            if let Some(pair) = rules.windows(2).find(|w| w[0].priority() == w[1].priority()) {
                return Err(PlanError::AmbiguousRule {
                    kind: key.kind,
                    from: key.from.clone(),
                    to: key.to.clone(),
                    first: pair[0].name().to_string(),
                    second: pair[1].name().to_string(),
                    priority: pair[0].priority(),
                });
            }
        }

        debug!(
            "Built rule registry: {} rules over {} conversion keys",
            self.rules.len(),
            by_key.len()
        );
        Ok(RuleRegistry {
            ordered: self.rules,
            by_key,
        })
    }
}

/// Frozen, read-only rule registry.
pub struct RuleRegistry {
    ordered: Vec<Arc<dyn ConverterRule>>,
    by_key: BTreeMap<RuleKey, Vec<Arc<dyn ConverterRule>>>,
}

impl RuleRegistry {
    /// Rules for the given conversion, highest priority first.
    pub fn candidates(
        &self,
        kind: OpKind,
        from: &Convention,
        to: &Convention,
    ) -> &[Arc<dyn ConverterRule>] {
        let key = RuleKey {
            kind,
            from: from.clone(),
            to: to.clone(),
        };
        self.by_key.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn ConverterRule> {
        self.ordered.iter().map(|r| r.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &RuleKey> {
        self.by_key.keys()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
