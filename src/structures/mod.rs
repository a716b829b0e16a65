//! Typed structures of the shared graph.
//!
//! Every entity the engine reasons over — chunks, labels, relations,
//! correspondences, views, frames, concepts, spaces — is one `Structure`:
//! common identity/quality/activation/link state plus a closed
//! [`StructureData`] payload for the concrete kind. Structures live in
//! per-kind arenas ([`graph::StructureGraph`]) and refer to each other by
//! [`StructureId`], so the cyclic, shared-reference web of links and
//! memberships is plain index data rather than a memory-ownership problem.

pub mod collection;
pub mod graph;

pub use collection::{MissingStructureError, ScoreKey, StructureCollection};
pub use graph::StructureGraph;

use std::collections::BTreeSet;

use crate::core::{Activation, CodeletId, StructureId};

/// Closed set of structure kinds. Also the id namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StructureKind {
    Chunk,
    Label,
    Relation,
    Correspondence,
    View,
    Frame,
    Concept,
    Space,
}

impl StructureKind {
    pub const COUNT: usize = 8;

    pub const ALL: [StructureKind; Self::COUNT] = [
        StructureKind::Chunk,
        StructureKind::Label,
        StructureKind::Relation,
        StructureKind::Correspondence,
        StructureKind::View,
        StructureKind::Frame,
        StructureKind::Concept,
        StructureKind::Space,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StructureKind::Chunk => "Chunk",
            StructureKind::Label => "Label",
            StructureKind::Relation => "Relation",
            StructureKind::Correspondence => "Correspondence",
            StructureKind::View => "View",
            StructureKind::Frame => "Frame",
            StructureKind::Concept => "Concept",
            StructureKind::Space => "Space",
        }
    }
}

/// A position inside one space. A structure may hold several locations at
/// once — a chunk sits in the raw input space and in each conceptual space
/// its values project into. The coordinate list has one entry per covered
/// point, so multi-member chunks span several coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub space: StructureId,
    pub coordinates: Vec<Vec<f32>>,
}

impl Location {
    pub fn point(space: StructureId, coordinates: Vec<f32>) -> Self {
        Self {
            space,
            coordinates: vec![coordinates],
        }
    }

    pub fn spanning(space: StructureId, coordinates: Vec<Vec<f32>>) -> Self {
        Self { space, coordinates }
    }

    /// Component-wise mean of the covered coordinates.
    pub fn centroid(&self) -> Vec<f32> {
        if self.coordinates.is_empty() {
            return Vec::new();
        }
        let width = self.coordinates[0].len();
        let mut sums = vec![0.0f32; width];
        for point in &self.coordinates {
            for (s, c) in sums.iter_mut().zip(point) {
                *s += c;
            }
        }
        let n = self.coordinates.len() as f32;
        sums.iter().map(|s| s / n).collect()
    }

    /// Euclidean distance between centroids. NaN coordinates poison the
    /// result, which classifiers use as the "undecidable" signal.
    pub fn centroid_distance(&self, other: &Location) -> f32 {
        let a = self.centroid();
        let b = other.centroid();
        if a.len() != b.len() || a.is_empty() {
            return f32::NAN;
        }
        a.iter()
            .zip(&b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }
}

/// Kind-specific payload.
#[derive(Clone, Debug)]
pub enum StructureData {
    Chunk {
        members: BTreeSet<StructureId>,
        super_chunks: BTreeSet<StructureId>,
        /// Raw chunks are the interpreter-given input row; they are never
        /// built, evaluated or recycled.
        is_raw: bool,
    },
    /// A label hangs off its start node; the labelling concept is the
    /// structure's `parent_concept`.
    Label { start: StructureId },
    Relation {
        start: StructureId,
        end: StructureId,
    },
    Correspondence {
        start: StructureId,
        end: StructureId,
    },
    View {
        members: BTreeSet<StructureId>,
        frame: Option<StructureId>,
        output: Option<String>,
    },
    Frame {
        components: BTreeSet<StructureId>,
    },
    Concept {
        name: String,
        /// Which structure kind codelets driven by this concept produce.
        /// `None` for pure action concepts (suggest, build, ...).
        kind_hint: Option<StructureKind>,
    },
    Space {
        name: String,
        contents: BTreeSet<StructureId>,
        is_conceptual: bool,
    },
}

impl StructureData {
    pub fn kind(&self) -> StructureKind {
        match self {
            StructureData::Chunk { .. } => StructureKind::Chunk,
            StructureData::Label { .. } => StructureKind::Label,
            StructureData::Relation { .. } => StructureKind::Relation,
            StructureData::Correspondence { .. } => StructureKind::Correspondence,
            StructureData::View { .. } => StructureKind::View,
            StructureData::Frame { .. } => StructureKind::Frame,
            StructureData::Concept { .. } => StructureKind::Concept,
            StructureData::Space { .. } => StructureKind::Space,
        }
    }
}

/// One entity in the shared graph.
#[derive(Clone, Debug)]
pub struct Structure {
    pub id: StructureId,
    /// Codelet that committed this structure. Provenance only.
    pub parent_id: Option<CodeletId>,
    pub locations: Vec<Location>,
    quality: f32,
    pub activation: Activation,
    pub links_in: BTreeSet<StructureId>,
    pub links_out: BTreeSet<StructureId>,
    pub parent_concept: Option<StructureId>,
    pub data: StructureData,
}

impl Structure {
    pub fn kind(&self) -> StructureKind {
        self.data.kind()
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Quality is mutated only by evaluators; always clamped.
    pub fn set_quality(&mut self, quality: f32) {
        self.quality = quality.clamp(0.0, 1.0);
    }

    pub fn link_count(&self) -> usize {
        self.links_in.union(&self.links_out).count()
    }

    pub fn links(&self) -> BTreeSet<StructureId> {
        self.links_in.union(&self.links_out).copied().collect()
    }

    /// `0.5^|links|`: halves with every link this structure gains.
    pub fn unlinkedness(&self) -> f32 {
        0.5f32.powi(self.link_count() as i32)
    }

    /// For chunks, `0.5^|super chunks|`; everything else counts as fully
    /// chunked already.
    pub fn unchunkedness(&self) -> f32 {
        match &self.data {
            StructureData::Chunk { super_chunks, .. } => {
                0.5f32.powi(super_chunks.len() as i32)
            }
            _ => 0.0,
        }
    }

    /// How under-processed this structure is. Monotonically non-increasing
    /// in link count; drives which structures get targeted next.
    pub fn unhappiness(&self) -> f32 {
        (self.unchunkedness() + self.unlinkedness()) / 2.0
    }

    /// Blend of "currently in focus" and "needs work".
    pub fn exigency(&self) -> f32 {
        (self.activation.value() + self.unhappiness()) / 2.0
    }

    /// Eligible for the recycle bin: activation has drained to zero and
    /// the structure is not pinned-stable input data. Reference liveness
    /// (codelet targets, focus, worldview) is checked by the collector,
    /// not here.
    pub fn is_recyclable(&self) -> bool {
        self.activation.is_depleted() && !self.activation.is_stable()
    }

    pub fn location_in_space(&self, space: StructureId) -> Option<&Location> {
        self.locations.iter().find(|l| l.space == space)
    }

    pub fn has_location_in_space(&self, space: StructureId) -> bool {
        self.location_in_space(space).is_some()
    }

    pub fn is_raw_chunk(&self) -> bool {
        matches!(self.data, StructureData::Chunk { is_raw: true, .. })
    }

    pub fn chunk_members(&self) -> Option<&BTreeSet<StructureId>> {
        match &self.data {
            StructureData::Chunk { members, .. } => Some(members),
            _ => None,
        }
    }

    pub fn label_start(&self) -> Option<StructureId> {
        match &self.data {
            StructureData::Label { start } => Some(*start),
            _ => None,
        }
    }

    /// Start and end for the link-like kinds (relations, correspondences).
    pub fn endpoints(&self) -> Option<(StructureId, StructureId)> {
        match &self.data {
            StructureData::Relation { start, end }
            | StructureData::Correspondence { start, end } => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn view_members(&self) -> Option<&BTreeSet<StructureId>> {
        match &self.data {
            StructureData::View { members, .. } => Some(members),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.data {
            StructureData::Concept { name, .. } | StructureData::Space { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn space_contents(&self) -> Option<&BTreeSet<StructureId>> {
        match &self.data {
            StructureData::Space { contents, .. } => Some(contents),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IdSource;

    fn bare(data: StructureData, ids: &mut IdSource) -> Structure {
        Structure {
            id: ids.next_structure(data.kind()),
            parent_id: None,
            locations: Vec::new(),
            quality: 0.0,
            activation: Activation::new(0.0),
            links_in: BTreeSet::new(),
            links_out: BTreeSet::new(),
            parent_concept: None,
            data,
        }
    }

    #[test]
    fn unhappiness_halves_per_link() {
        let mut ids = IdSource::new();
        let mut node = bare(
            StructureData::Chunk {
                members: BTreeSet::new(),
                super_chunks: BTreeSet::new(),
                is_raw: true,
            },
            &mut ids,
        );
        let base = node.unhappiness();
        let link = ids.next_structure(StructureKind::Label);
        node.links_out.insert(link);
        let one_link = node.unhappiness();
        assert!(one_link < base);
        assert!((node.unlinkedness() - 0.5).abs() < 1e-6);
        let link2 = ids.next_structure(StructureKind::Label);
        node.links_out.insert(link2);
        assert!(node.unhappiness() < one_link);
        assert!((node.unlinkedness() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn quality_is_clamped() {
        let mut ids = IdSource::new();
        let mut node = bare(
            StructureData::Frame {
                components: BTreeSet::new(),
            },
            &mut ids,
        );
        node.set_quality(7.0);
        assert_eq!(node.quality(), 1.0);
        node.set_quality(-3.0);
        assert_eq!(node.quality(), 0.0);
    }

    #[test]
    fn centroid_distance_handles_spans() {
        let mut ids = IdSource::new();
        let space = ids.next_structure(StructureKind::Space);
        let a = Location::spanning(space, vec![vec![0.0], vec![2.0]]);
        let b = Location::point(space, vec![4.0]);
        assert!((a.centroid_distance(&b) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn nan_coordinates_poison_distance() {
        let mut ids = IdSource::new();
        let space = ids.next_structure(StructureKind::Space);
        let a = Location::point(space, vec![f32::NAN]);
        let b = Location::point(space, vec![1.0]);
        assert!(a.centroid_distance(&b).is_nan());
    }
}
