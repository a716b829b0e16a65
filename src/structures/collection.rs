//! Semantic containers over structure ids: set algebra plus weighted
//! nondeterministic retrieval.
//!
//! A collection never owns structures — it is an id set over the arena.
//! Retrieval is where the engine's exploratory character comes from:
//! "give me an active chunk" means a roulette draw weighted by activation,
//! not a deterministic max. Every retrieval raises
//! [`MissingStructureError`] when nothing qualifies; callers treat that as
//! ordinary control flow (fizzle, re-sample), never as a fault.

use std::collections::BTreeSet;

use crate::core::{RandomMachine, StructureId};
use crate::structures::{Structure, StructureGraph};

/// Expected, recoverable signal: a retrieval found no eligible element.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("no eligible structure in collection")]
pub struct MissingStructureError;

/// Scoring strategy for weighted retrieval. A closed enum rather than
/// arbitrary closures at every call site; `Custom` remains for the odd
/// caller-specific scalar.
#[derive(Clone, Copy, Debug)]
pub enum ScoreKey {
    Activation,
    Unhappiness,
    Quality,
    Exigency,
    Custom(fn(&Structure) -> f32),
}

impl ScoreKey {
    pub fn score(&self, structure: &Structure) -> f32 {
        match self {
            ScoreKey::Activation => structure.activation.value(),
            ScoreKey::Unhappiness => structure.unhappiness(),
            ScoreKey::Quality => structure.quality(),
            ScoreKey::Exigency => structure.exigency(),
            ScoreKey::Custom(f) => f(structure),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureCollection {
    members: BTreeSet<StructureId>,
}

impl StructureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: adding a member twice is a no-op.
    pub fn add(&mut self, id: StructureId) {
        self.members.insert(id);
    }

    /// Idempotent: removing an absent member is a no-op.
    pub fn remove(&mut self, id: StructureId) {
        self.members.remove(&id);
    }

    pub fn contains(&self, id: StructureId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.members.iter().copied()
    }

    // --- pure set algebra -------------------------------------------------

    pub fn union(&self, other: &StructureCollection) -> StructureCollection {
        self.members.union(&other.members).copied().collect()
    }

    pub fn intersection(&self, other: &StructureCollection) -> StructureCollection {
        self.members.intersection(&other.members).copied().collect()
    }

    pub fn difference(&self, other: &StructureCollection) -> StructureCollection {
        self.members.difference(&other.members).copied().collect()
    }

    pub fn excluding(&self, exclude: &[StructureId]) -> StructureCollection {
        self.members
            .iter()
            .copied()
            .filter(|id| !exclude.contains(id))
            .collect()
    }

    /// Non-destructive predicate view. Ids no longer present in the arena
    /// are dropped on the way through.
    pub fn filter(
        &self,
        graph: &StructureGraph,
        predicate: impl Fn(&Structure) -> bool,
    ) -> StructureCollection {
        self.members
            .iter()
            .copied()
            .filter(|id| graph.get(*id).is_some_and(&predicate))
            .collect()
    }

    // --- retrieval --------------------------------------------------------

    /// Uniform random draw over members still present in the arena.
    pub fn get_random(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
    ) -> Result<StructureId, MissingStructureError> {
        let eligible = self.eligible(graph);
        let index = random.uniform_index(eligible.len()).ok_or(MissingStructureError)?;
        Ok(eligible[index])
    }

    /// Alias for the plain draw; reads better at call sites that just
    /// need "any member".
    pub fn get(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
    ) -> Result<StructureId, MissingStructureError> {
        self.get_random(graph, random)
    }

    /// Roulette draw with P(e) ∝ key(e). Zero weight mass (or all-NaN)
    /// degrades to a uniform draw over the eligible members; a zero-weight
    /// element is never chosen while any positive-weight element exists.
    pub fn get_weighted(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
        key: ScoreKey,
    ) -> Result<StructureId, MissingStructureError> {
        let eligible = self.eligible(graph);
        if eligible.is_empty() {
            return Err(MissingStructureError);
        }
        let weights: Vec<f32> = eligible
            .iter()
            .map(|id| graph.get(*id).map(|s| key.score(s)).unwrap_or(0.0))
            .collect();
        let index = random
            .select_index_weighted(&weights)
            .ok_or(MissingStructureError)?;
        Ok(eligible[index])
    }

    pub fn get_active(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
    ) -> Result<StructureId, MissingStructureError> {
        self.get_weighted(graph, random, ScoreKey::Activation)
    }

    pub fn get_unhappy(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
    ) -> Result<StructureId, MissingStructureError> {
        self.get_weighted(graph, random, ScoreKey::Unhappiness)
    }

    pub fn get_exigent(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
    ) -> Result<StructureId, MissingStructureError> {
        self.get_weighted(graph, random, ScoreKey::Exigency)
    }

    /// Deterministic best-by-key; ties break toward the lowest id so that
    /// seeded runs stay reproducible.
    pub fn get_max(
        &self,
        graph: &StructureGraph,
        key: ScoreKey,
    ) -> Result<StructureId, MissingStructureError> {
        self.eligible(graph)
            .into_iter()
            .filter_map(|id| {
                let score = key.score(graph.get(id)?);
                if score.is_nan() {
                    None
                } else {
                    Some((id, score))
                }
            })
            .fold(None::<(StructureId, f32)>, |best, (id, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((id, score)),
            })
            .map(|(id, _)| id)
            .ok_or(MissingStructureError)
    }

    /// Uniform sample of `n` distinct members.
    pub fn sample(
        &self,
        graph: &StructureGraph,
        random: &mut RandomMachine,
        n: usize,
    ) -> Result<Vec<StructureId>, MissingStructureError> {
        let mut pool = self.eligible(graph);
        if pool.len() < n {
            return Err(MissingStructureError);
        }
        let mut picked = Vec::with_capacity(n);
        for _ in 0..n {
            let index = random.uniform_index(pool.len()).ok_or(MissingStructureError)?;
            picked.push(pool.swap_remove(index));
        }
        Ok(picked)
    }

    fn eligible(&self, graph: &StructureGraph) -> Vec<StructureId> {
        self.members
            .iter()
            .copied()
            .filter(|id| graph.contains(*id))
            .collect()
    }
}

impl FromIterator<StructureId> for StructureCollection {
    fn from_iter<T: IntoIterator<Item = StructureId>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}
