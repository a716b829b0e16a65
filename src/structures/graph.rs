//! Arena storage for structures, plus link wiring and the activation tick.
//!
//! The graph owns every structure and the id allocator. All cross-structure
//! references (links, chunk membership, space contents) are id sets over
//! this arena, so removal is pure index invalidation: detach the id from
//! every set it appears in and drop the arena entry.

use std::collections::BTreeMap;

use crate::core::{Activation, CodeletId, IdSource, StructureId};
use crate::structures::{
    Location, MissingStructureError, Structure, StructureData, StructureKind,
};

#[derive(Debug, Default)]
pub struct StructureGraph {
    structures: BTreeMap<StructureId, Structure>,
    ids: IdSource,
}

impl StructureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_codelet_id(&mut self) -> CodeletId {
        self.ids.next_codelet()
    }

    /// Allocate an id, wire the new structure into its neighbours' link
    /// sets and its spaces' contents, and insert it into the arena.
    pub fn create(
        &mut self,
        parent_id: Option<CodeletId>,
        locations: Vec<Location>,
        activation: Activation,
        parent_concept: Option<StructureId>,
        data: StructureData,
    ) -> StructureId {
        let id = self.ids.next_structure(data.kind());

        match &data {
            StructureData::Label { start } => {
                if let Some(node) = self.structures.get_mut(start) {
                    node.links_out.insert(id);
                }
            }
            StructureData::Relation { start, end }
            | StructureData::Correspondence { start, end } => {
                if let Some(node) = self.structures.get_mut(start) {
                    node.links_out.insert(id);
                }
                if let Some(node) = self.structures.get_mut(end) {
                    node.links_in.insert(id);
                }
            }
            StructureData::Chunk { members, .. } => {
                for member in members.clone() {
                    if let Some(StructureData::Chunk { super_chunks, .. }) = self
                        .structures
                        .get_mut(&member)
                        .map(|s| &mut s.data)
                    {
                        super_chunks.insert(id);
                    }
                }
            }
            _ => {}
        }

        for location in &locations {
            if let Some(StructureData::Space { contents, .. }) = self
                .structures
                .get_mut(&location.space)
                .map(|s| &mut s.data)
            {
                contents.insert(id);
            }
        }

        self.structures.insert(
            id,
            Structure {
                id,
                parent_id,
                locations,
                quality: 0.0,
                activation,
                links_in: Default::default(),
                links_out: Default::default(),
                parent_concept,
                data,
            },
        );
        id
    }

    pub fn contains(&self, id: StructureId) -> bool {
        self.structures.contains_key(&id)
    }

    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(&id)
    }

    /// Lookup that treats absence as the expected missing-structure signal.
    pub fn require(&self, id: StructureId) -> Result<&Structure, MissingStructureError> {
        self.structures.get(&id).ok_or(MissingStructureError)
    }

    pub fn require_mut(
        &mut self,
        id: StructureId,
    ) -> Result<&mut Structure, MissingStructureError> {
        self.structures.get_mut(&id).ok_or(MissingStructureError)
    }

    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Detach `id` from every link set, membership set and space it
    /// appears in, then drop it from the arena. Caller (the garbage
    /// collector, via the chamber) is responsible for liveness checks and
    /// for cascading to links that dangle afterwards.
    pub fn remove(&mut self, id: StructureId) -> Option<Structure> {
        let removed = self.structures.remove(&id)?;
        for other in self.structures.values_mut() {
            other.links_in.remove(&id);
            other.links_out.remove(&id);
            if other.parent_concept == Some(id) {
                other.parent_concept = None;
            }
            other.locations.retain(|l| l.space != id);
            match &mut other.data {
                StructureData::Chunk {
                    members,
                    super_chunks,
                    ..
                } => {
                    members.remove(&id);
                    super_chunks.remove(&id);
                }
                StructureData::View { members, frame, .. } => {
                    members.remove(&id);
                    if *frame == Some(id) {
                        *frame = None;
                    }
                }
                StructureData::Frame { components } => {
                    components.remove(&id);
                }
                StructureData::Space { contents, .. } => {
                    contents.remove(&id);
                }
                _ => {}
            }
        }
        Some(removed)
    }

    /// One batched activation tick over the whole arena.
    ///
    /// Phase 1: every fully-active structure spreads a one-hop boost — to
    /// its parent concept (weighted by its own activation) and across each
    /// attached link to the far endpoint (weighted by the link's
    /// activation; labels spread to their labelling concept instead, since
    /// they have no far endpoint). Multi-hop propagation emerges over
    /// successive ticks.
    ///
    /// Phase 2: every structure folds its buffered delta in, clamps and
    /// clears the buffer; untouched structures self-decay.
    ///
    /// Phase 3: spaces and frames recompute aggregate activation (max of
    /// their settled contents).
    pub fn tick(&mut self) {
        let sources: Vec<StructureId> = self
            .structures
            .values()
            .filter(|s| s.activation.is_fully_active())
            .map(|s| s.id)
            .collect();

        let mut boosts: Vec<(StructureId, f32)> = Vec::new();
        for id in sources {
            let source = &self.structures[&id];
            if let Some(concept) = source.parent_concept {
                boosts.push((concept, source.activation.value()));
            }
            for link_id in source.links() {
                let Some(link) = self.structures.get(&link_id) else {
                    continue;
                };
                let amount = link.activation.value();
                match link.endpoints() {
                    Some((start, end)) => {
                        let far = if start == id { end } else { start };
                        boosts.push((far, amount));
                    }
                    None => {
                        if let Some(concept) = link.parent_concept {
                            boosts.push((concept, amount));
                        }
                    }
                }
            }
        }
        for (target, amount) in boosts {
            if let Some(structure) = self.structures.get_mut(&target) {
                structure.activation.boost(amount);
            }
        }

        for structure in self.structures.values_mut() {
            structure.activation.update();
        }

        let aggregates: Vec<(StructureId, f32)> = self
            .structures
            .values()
            .filter_map(|s| match &s.data {
                StructureData::Space { contents, .. } => {
                    Some((s.id, self.max_activation(contents.iter().copied())))
                }
                StructureData::Frame { components } => {
                    Some((s.id, self.max_activation(components.iter().copied())))
                }
                _ => None,
            })
            .collect();
        for (id, level) in aggregates {
            if let Some(structure) = self.structures.get_mut(&id) {
                structure.activation.set(level);
            }
        }
    }

    fn max_activation(&self, ids: impl Iterator<Item = StructureId>) -> f32 {
        ids.filter_map(|id| self.structures.get(&id))
            .map(|s| s.activation.value())
            .fold(0.0, f32::max)
    }
}
