//! # Plan Graph Wire Format
//!
//! `PlanGraph` is the flat, id-addressed form of a plan DAG used on the wire (JSON via
//! serde). Every node lists its inputs by id, so nodes shared by several parents are
//! sent once.
//!
//! Because inputs are plain ids, a malformed graph can contain a cycle, which an `Arc`
//! tree cannot. [`PlanGraph::to_plan`] resolves ids depth-first with the same state
//! machine the planner uses (absent → resolving → resolved). Meeting a node that is
//! still resolving means the graph is cyclic, and the call fails with
//! `PlanError::CyclicPlan`.
//!
//! Both directions walk an explicit stack. Resolution also bounds the depth of the
//! rebuilt tree and fails with `PlanError::PlanTooDeep` past it, so a graph read from
//! the network cannot exhaust the thread stack.

use crate::error::{PlanError, Result};
use crate::plan::{Operator, PlanNode, PlanRef, DEFAULT_MAX_DEPTH};
use crate::traits::TraitSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: usize,
    pub op: Operator,
    pub traits: TraitSet,
    #[serde(default)]
    pub inputs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGraph {
    pub nodes: Vec<GraphNode>,
    pub root: usize,
}

enum Resolve {
    InProgress,
    Done(PlanRef),
}

enum Step {
    Enter { id: usize, depth: usize },
    Build(usize),
}

impl PlanGraph {
    /// Flatten a plan tree. Ids are assigned in post-order (inputs before parents);
    /// nodes reachable through several parents appear once.
    pub fn from_plan(root: &PlanRef) -> Self {
        let mut ids: HashMap<*const PlanNode, usize> = HashMap::new();
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut pending = vec![(root, false)];
        while let Some((node, expanded)) = pending.pop() {
            if ids.contains_key(&Arc::as_ptr(node)) {
                continue;
            }
            if !expanded {
                pending.push((node, true));
                pending.extend(node.inputs().iter().rev().map(|input| (input, false)));
                continue;
            }
            // Inputs were emitted before their parent.
            let inputs = node
                .inputs()
                .iter()
                .map(|input| ids[&Arc::as_ptr(input)])
                .collect();
            let id = nodes.len();
            nodes.push(GraphNode {
                id,
                op: node.op().clone(),
                traits: node.traits().clone(),
                inputs,
            });
            ids.insert(Arc::as_ptr(node), id);
        }
        let root = ids[&Arc::as_ptr(root)];
        PlanGraph { nodes, root }
    }

    /// Rebuild the `Arc` tree rooted at `root`, accepting at most
    /// [`DEFAULT_MAX_DEPTH`] levels below it.
    pub fn to_plan(&self) -> Result<PlanRef> {
        self.to_plan_with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Rebuild the `Arc` tree rooted at `root`, failing with `PlanTooDeep` if any node
    /// sits more than `max_depth` levels below the root.
    pub fn to_plan_with_max_depth(&self, max_depth: usize) -> Result<PlanRef> {
        let mut by_id: HashMap<usize, &GraphNode> = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if by_id.insert(node.id, node).is_some() {
                return Err(PlanError::invalid_plan(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }
        let lookup = |id: usize| {
            by_id
                .get(&id)
                .copied()
                .ok_or_else(|| PlanError::invalid_plan(format!("unknown node id {id}")))
        };

        let mut states: HashMap<usize, Resolve> = HashMap::new();
        let mut steps = vec![Step::Enter {
            id: self.root,
            depth: 0,
        }];
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter { id, depth } => {
                    match states.get(&id) {
                        Some(Resolve::Done(_)) => continue,
                        Some(Resolve::InProgress) => {
                            return Err(PlanError::CyclicPlan {
                                node: format!("node {id}"),
                            })
                        }
                        None => {}
                    }
                    if depth > max_depth {
                        return Err(PlanError::PlanTooDeep { limit: max_depth });
                    }
                    let node = lookup(id)?;
                    states.insert(id, Resolve::InProgress);
                    steps.push(Step::Build(id));
                    steps.extend(node.inputs.iter().rev().map(|&input| Step::Enter {
                        id: input,
                        depth: depth + 1,
                    }));
                }
                Step::Build(id) => {
                    let node = lookup(id)?;
                    let inputs = node
                        .inputs
                        .iter()
                        .map(|&input| resolved(&states, input))
                        .collect::<Result<Vec<_>>>()?;
                    let plan = PlanNode::new(node.op.clone(), node.traits.clone(), inputs)?;
                    states.insert(id, Resolve::Done(plan));
                }
            }
        }
        resolved(&states, self.root)
    }
}

fn resolved(states: &HashMap<usize, Resolve>, id: usize) -> Result<PlanRef> {
    match states.get(&id) {
        Some(Resolve::Done(plan)) => Ok(plan.clone()),
        _ => Err(PlanError::invalid_plan(format!("node {id} was not resolved"))),
    }
}
