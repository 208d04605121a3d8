//! # relconv-core: Plan Representation and Convention Rewrite Engine
//!
//! This crate implements the data structures and the driver that normalize a relational
//! plan tree from one *convention* into another. A convention tags which compilation
//! stage a node belongs to: `NONE` for plans fresh out of the binder, `LOGICAL` for the
//! planner's own logical algebra, `PHYSICAL` for executable operators.
//!
//! ## Module Overview
//!
//! - **`traits`**: Conventions and the other orthogonal traits (distribution, collation)
//!   grouped in an immutable `TraitSet`.
//! - **`expr`**: Scalar expressions and aggregate call descriptors carried by operators.
//! - **`plan`**: Operator definitions (logical, physical) and the immutable `PlanNode`.
//! - **`explain`**: Deterministic textual rendering of plan trees.
//! - **`graph`**: Id-addressed wire form of a plan DAG, with cycle detection.
//! - **`pattern`**: Declarative operand patterns used to decide rule applicability.
//! - **`rule`**: The `ConverterRule` trait and the frozen `RuleRegistry`.
//! - **`planner`**: The bottom-up conversion driver.
//! - **`error`**: The error type shared by all of the above.

pub mod error;
pub mod explain;
pub mod expr;
pub mod graph;
pub mod pattern;
pub mod plan;
pub mod planner;
pub mod rule;
pub mod traits;

pub use error::{PlanError, Result};
pub use plan::{PlanNode, PlanRef};
pub use planner::{Planner, PlannerConfig};
pub use traits::{Convention, RelTrait, TraitSet};
