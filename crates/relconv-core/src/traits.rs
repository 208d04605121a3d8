//! # Traits and Conventions
//!
//! Traits describe orthogonal characteristics of a plan node's output. Each node carries
//! an immutable [`TraitSet`] holding at most one trait of each kind.
//!
//! ## Conventions
//!
//! The convention is the one trait every node must have. It says which compilation stage
//! the node's representation targets:
//!
//! - **`NONE`**: not yet assigned to any stage. The binder emits plans in this convention.
//! - **`LOGICAL`**: the planner's logical algebra.
//! - **`PHYSICAL`**: executable operators.
//!
//! The set of conventions is open: downstream crates may mint their own with
//! [`Convention::new`]. Conventions compare by name.
//!
//! ## Other Traits
//!
//! - **Distribution**: how rows are partitioned across workers.
//! - **Collation**: the sort order of the output.
//!
//! Converter rules replace the convention and leave the other traits untouched unless the
//! target operator establishes a new one (a physical sort establishes a collation).

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Tag marking which compilation stage a node belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Convention(Cow<'static, str>);

impl Convention {
    pub const NONE: Convention = Convention(Cow::Borrowed("NONE"));
    pub const LOGICAL: Convention = Convention(Cow::Borrowed("LOGICAL"));
    pub const PHYSICAL: Convention = Convention(Cow::Borrowed("PHYSICAL"));

    pub fn new(name: impl Into<String>) -> Self {
        Convention(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row distribution across workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    /// All rows on a single node.
    Single,
    /// Every row replicated to all nodes.
    Broadcast,
    /// Hash-partitioned on the given input columns.
    Hash(Vec<usize>),
    RoundRobin,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Single => f.write_str("single"),
            Distribution::Broadcast => f.write_str("broadcast"),
            Distribution::RoundRobin => f.write_str("round_robin"),
            Distribution::Hash(keys) => {
                f.write_str("hash[")?;
                write_list(f, keys.iter().map(|k| format!("${k}")))?;
                f.write_str("]")
            }
        }
    }
}

/// One column of a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCollation {
    pub index: usize,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl FieldCollation {
    pub fn asc(index: usize) -> Self {
        Self {
            index,
            ascending: true,
            nulls_first: false,
        }
    }

    pub fn desc(index: usize) -> Self {
        Self {
            index,
            ascending: false,
            nulls_first: true,
        }
    }
}

impl fmt::Display for FieldCollation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${} {}",
            self.index,
            if self.ascending { "ASC" } else { "DESC" }
        )?;
        if self.nulls_first {
            f.write_str(" NULLS FIRST")?;
        }
        Ok(())
    }
}

/// A single trait value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelTrait {
    Convention(Convention),
    Distribution(Distribution),
    Collation(Vec<FieldCollation>),
}

/// Kind discriminant of a [`RelTrait`]; also the canonical ordering inside a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraitDef {
    Convention,
    Distribution,
    Collation,
}

impl RelTrait {
    pub fn def(&self) -> TraitDef {
        match self {
            RelTrait::Convention(_) => TraitDef::Convention,
            RelTrait::Distribution(_) => TraitDef::Distribution,
            RelTrait::Collation(_) => TraitDef::Collation,
        }
    }
}

impl fmt::Display for RelTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelTrait::Convention(c) => write!(f, "{c}"),
            RelTrait::Distribution(d) => write!(f, "{d}"),
            RelTrait::Collation(keys) => {
                f.write_str("sort[")?;
                write_list(f, keys.iter().map(|k| k.to_string()))?;
                f.write_str("]")
            }
        }
    }
}

/// Immutable set of traits, always carrying exactly one convention.
///
/// The convention is stored apart from the optional traits so a set without one cannot
/// exist. `others` is sorted by [`TraitDef`] and holds at most one trait per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<RelTrait>", into = "Vec<RelTrait>")]
pub struct TraitSet {
    convention: Convention,
    others: Vec<RelTrait>,
}

impl TraitSet {
    pub fn new(convention: Convention) -> Self {
        Self {
            convention,
            others: Vec::new(),
        }
    }

    /// Build a trait set from loose traits.
    ///
    /// Fails if no convention is present or if any trait kind appears more than once.
    pub fn from_traits(traits: impl IntoIterator<Item = RelTrait>) -> Result<Self> {
        let mut convention = None;
        let mut others: Vec<RelTrait> = Vec::new();
        for t in traits {
            match t {
                RelTrait::Convention(c) => {
                    if let Some(existing) = &convention {
                        return Err(PlanError::invalid_trait(format!(
                            "more than one convention: {existing} and {c}"
                        )));
                    }
                    convention = Some(c);
                }
                other => {
                    if others.iter().any(|o| o.def() == other.def()) {
                        return Err(PlanError::invalid_trait(format!(
                            "duplicate {:?} trait",
                            other.def()
                        )));
                    }
                    others.push(other);
                }
            }
        }
        let convention =
            convention.ok_or_else(|| PlanError::invalid_trait("no convention present"))?;
        others.sort_by_key(RelTrait::def);
        Ok(Self { convention, others })
    }

    pub fn convention(&self) -> &Convention {
        &self.convention
    }

    pub fn contains(&self, t: &RelTrait) -> bool {
        match t {
            RelTrait::Convention(c) => &self.convention == c,
            other => self.others.contains(other),
        }
    }

    pub fn contains_convention(&self, convention: &Convention) -> bool {
        &self.convention == convention
    }

    /// A new set that differs from this one only in its convention.
    pub fn with_convention(&self, convention: Convention) -> Self {
        Self {
            convention,
            others: self.others.clone(),
        }
    }

    /// A new set with the trait of the same kind replaced (or added).
    pub fn replace(&self, t: RelTrait) -> Self {
        match t {
            RelTrait::Convention(c) => self.with_convention(c),
            other => {
                let mut others: Vec<RelTrait> = self
                    .others
                    .iter()
                    .filter(|o| o.def() != other.def())
                    .cloned()
                    .collect();
                others.push(other);
                others.sort_by_key(RelTrait::def);
                Self {
                    convention: self.convention.clone(),
                    others,
                }
            }
        }
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        self.others.iter().find_map(|t| match t {
            RelTrait::Distribution(d) => Some(d),
            _ => None,
        })
    }

    pub fn collation(&self) -> Option<&[FieldCollation]> {
        self.others.iter().find_map(|t| match t {
            RelTrait::Collation(c) => Some(c.as_slice()),
            _ => None,
        })
    }

    /// All traits in canonical order, convention first.
    pub fn to_vec(&self) -> Vec<RelTrait> {
        std::iter::once(RelTrait::Convention(self.convention.clone()))
            .chain(self.others.iter().cloned())
            .collect()
    }
}

impl TryFrom<Vec<RelTrait>> for TraitSet {
    type Error = PlanError;

    fn try_from(traits: Vec<RelTrait>) -> Result<Self> {
        TraitSet::from_traits(traits)
    }
}

impl From<TraitSet> for Vec<RelTrait> {
    fn from(set: TraitSet) -> Self {
        set.to_vec()
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        write_list(f, self.to_vec().iter().map(|t| t.to_string()))?;
        f.write_str("]")
    }
}

pub(crate) fn write_list(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = String>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_convention_rejected() {
        let err = TraitSet::from_traits(vec![RelTrait::Distribution(Distribution::Single)])
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidTrait { .. }));
    }

    #[test]
    fn test_two_conventions_rejected() {
        let err = TraitSet::from_traits(vec![
            RelTrait::Convention(Convention::NONE),
            RelTrait::Convention(Convention::LOGICAL),
        ])
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidTrait { .. }));
    }

    #[test]
    fn test_with_convention_keeps_other_traits() {
        let set = TraitSet::from_traits(vec![
            RelTrait::Collation(vec![FieldCollation::asc(1)]),
            RelTrait::Convention(Convention::NONE),
            RelTrait::Distribution(Distribution::Hash(vec![0])),
        ])
        .unwrap();
        let logical = set.with_convention(Convention::LOGICAL);

        assert!(logical.contains_convention(&Convention::LOGICAL));
        assert!(!logical.contains(&RelTrait::Convention(Convention::NONE)));
        assert_eq!(logical.distribution(), set.distribution());
        assert_eq!(logical.collation(), set.collation());
        assert_eq!(logical.to_string(), "[LOGICAL, hash[$0], sort[$1 ASC]]");
        // the receiver is untouched
        assert!(set.contains_convention(&Convention::NONE));
    }

    #[test]
    fn test_replace_swaps_same_kind() {
        let set = TraitSet::new(Convention::PHYSICAL)
            .replace(RelTrait::Distribution(Distribution::Single))
            .replace(RelTrait::Distribution(Distribution::Broadcast));
        assert_eq!(set.distribution(), Some(&Distribution::Broadcast));
        assert_eq!(set.to_vec().len(), 2);
    }

    #[test]
    fn test_user_defined_convention_compares_by_name() {
        assert_eq!(Convention::new("STREAM"), Convention::new("STREAM"));
        assert_ne!(Convention::new("STREAM"), Convention::LOGICAL);
        assert_eq!(Convention::new("LOGICAL"), Convention::LOGICAL);
    }
}
