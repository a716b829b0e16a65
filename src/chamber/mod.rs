//! The bubble chamber: the single shared mutable context of a run.
//!
//! Aggregates the structure graph, the per-kind collections, the recycle
//! bin, focus/worldview, the seeded random machine and the classifier
//! registry. Constructed once per run and passed by reference into every
//! scheduler and codelet operation — never a process-wide global. Codelets
//! have unrestricted read/write access; this is safe because execution is
//! strictly single-threaded and step-based.

pub mod focus;

pub use focus::{Focus, Worldview};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::classifier::{Classifier, ClassifierRegistry, ClassifyArgs};
use crate::core::{Activation, CodeletId, RandomMachine, StructureId};
use crate::structures::{
    Location, Structure, StructureCollection, StructureData, StructureGraph, StructureKind,
};
use crate::{Error, Result};

#[derive(Debug)]
pub struct BubbleChamber {
    pub graph: StructureGraph,

    pub chunks: StructureCollection,
    pub labels: StructureCollection,
    pub relations: StructureCollection,
    pub correspondences: StructureCollection,
    pub views: StructureCollection,
    pub frames: StructureCollection,
    pub concepts: StructureCollection,
    pub spaces: StructureCollection,

    /// Structures marked for deletion, awaiting the garbage collector.
    pub recycle_bin: StructureCollection,

    pub focus: Focus,
    pub worldview: Worldview,

    /// Set exactly once, by a publisher codelet. A set result terminates
    /// the run loop.
    pub result: Option<String>,

    pub random: RandomMachine,
    pub classifiers: ClassifierRegistry,

    concept_names: BTreeMap<String, StructureId>,
}

impl BubbleChamber {
    /// Build a chamber with the engine's concept network bootstrapped:
    /// the action concepts (suggest, build, evaluate, select, publish)
    /// and the structure concepts (chunk, label, relation). Domain
    /// content — spaces, content concepts, classifiers, raw input — is
    /// the interpreter's job.
    pub fn setup(seed: Option<u64>) -> Self {
        let random = match seed {
            Some(seed) => RandomMachine::new(seed),
            None => RandomMachine::from_entropy(),
        };
        let mut chamber = Self {
            graph: StructureGraph::new(),
            chunks: StructureCollection::new(),
            labels: StructureCollection::new(),
            relations: StructureCollection::new(),
            correspondences: StructureCollection::new(),
            views: StructureCollection::new(),
            frames: StructureCollection::new(),
            concepts: StructureCollection::new(),
            spaces: StructureCollection::new(),
            recycle_bin: StructureCollection::new(),
            focus: Focus::default(),
            worldview: Worldview::default(),
            result: None,
            random,
            classifiers: ClassifierRegistry::new(),
            concept_names: BTreeMap::new(),
        };
        for action in ["suggest", "build", "evaluate", "select", "publish"] {
            chamber.add_concept(action, None);
        }
        chamber.add_concept("chunk", Some(StructureKind::Chunk));
        chamber.add_concept("label", Some(StructureKind::Label));
        chamber.add_concept("relation", Some(StructureKind::Relation));
        chamber
    }

    pub fn next_codelet_id(&mut self) -> CodeletId {
        self.graph.next_codelet_id()
    }

    // --- construction -----------------------------------------------------
    //
    // Every constructor registers the new structure in its kind collection
    // and wires graph-level references; built structures start with
    // quality 0 and a random activation, per the shared lifecycle.

    pub fn new_space(&mut self, name: &str, is_conceptual: bool) -> StructureId {
        let id = self.graph.create(
            None,
            Vec::new(),
            Activation::new(0.0),
            None,
            StructureData::Space {
                name: name.to_owned(),
                contents: BTreeSet::new(),
                is_conceptual,
            },
        );
        self.spaces.add(id);
        id
    }

    pub fn add_concept(&mut self, name: &str, kind_hint: Option<StructureKind>) -> StructureId {
        let id = self.graph.create(
            None,
            Vec::new(),
            Activation::new(0.5),
            None,
            StructureData::Concept {
                name: name.to_owned(),
                kind_hint,
            },
        );
        self.concepts.add(id);
        self.concept_names.insert(name.to_owned(), id);
        id
    }

    pub fn register_classifier(&mut self, concept: StructureId, classifier: Arc<dyn Classifier>) {
        self.classifiers.register(concept, classifier);
    }

    /// Look up a bootstrap or content concept by name. Unknown names are a
    /// genuine invariant violation, not expected control flow.
    pub fn concept(&self, name: &str) -> Result<StructureId> {
        self.concept_names
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownConcept(name.to_owned()))
    }

    /// Interpreter-given input: stable at full activation, never built,
    /// never recycled.
    pub fn new_raw_chunk(&mut self, locations: Vec<Location>) -> StructureId {
        let id = self.graph.create(
            None,
            locations,
            Activation::stable(1.0),
            None,
            StructureData::Chunk {
                members: BTreeSet::new(),
                super_chunks: BTreeSet::new(),
                is_raw: true,
            },
        );
        self.chunks.add(id);
        id
    }

    pub fn new_chunk(
        &mut self,
        parent_id: Option<CodeletId>,
        members: BTreeSet<StructureId>,
        locations: Vec<Location>,
    ) -> StructureId {
        let activation = Activation::new(self.random.generate_number());
        let id = self.graph.create(
            parent_id,
            locations,
            activation,
            None,
            StructureData::Chunk {
                members,
                super_chunks: BTreeSet::new(),
                is_raw: false,
            },
        );
        self.chunks.add(id);
        id
    }

    pub fn new_label(
        &mut self,
        parent_id: Option<CodeletId>,
        start: StructureId,
        concept: StructureId,
    ) -> StructureId {
        let activation = Activation::new(self.random.generate_number());
        let id = self.graph.create(
            parent_id,
            Vec::new(),
            activation,
            Some(concept),
            StructureData::Label { start },
        );
        self.labels.add(id);
        id
    }

    pub fn new_relation(
        &mut self,
        parent_id: Option<CodeletId>,
        start: StructureId,
        end: StructureId,
        concept: StructureId,
    ) -> StructureId {
        let activation = Activation::new(self.random.generate_number());
        let id = self.graph.create(
            parent_id,
            Vec::new(),
            activation,
            Some(concept),
            StructureData::Relation { start, end },
        );
        self.relations.add(id);
        id
    }

    pub fn new_correspondence(
        &mut self,
        parent_id: Option<CodeletId>,
        start: StructureId,
        end: StructureId,
        concept: StructureId,
    ) -> StructureId {
        let activation = Activation::new(self.random.generate_number());
        let id = self.graph.create(
            parent_id,
            Vec::new(),
            activation,
            Some(concept),
            StructureData::Correspondence { start, end },
        );
        self.correspondences.add(id);
        id
    }

    pub fn new_view(
        &mut self,
        parent_id: Option<CodeletId>,
        members: BTreeSet<StructureId>,
        frame: Option<StructureId>,
        output: Option<String>,
    ) -> StructureId {
        let activation = Activation::new(self.random.generate_number());
        let id = self.graph.create(
            parent_id,
            Vec::new(),
            activation,
            None,
            StructureData::View {
                members,
                frame,
                output,
            },
        );
        self.views.add(id);
        id
    }

    pub fn new_frame(&mut self, components: BTreeSet<StructureId>) -> StructureId {
        let id = self.graph.create(
            None,
            Vec::new(),
            Activation::new(0.0),
            None,
            StructureData::Frame { components },
        );
        self.frames.add(id);
        id
    }

    // --- queries ----------------------------------------------------------

    pub fn collection_for(&self, kind: StructureKind) -> &StructureCollection {
        match kind {
            StructureKind::Chunk => &self.chunks,
            StructureKind::Label => &self.labels,
            StructureKind::Relation => &self.relations,
            StructureKind::Correspondence => &self.correspondences,
            StructureKind::View => &self.views,
            StructureKind::Frame => &self.frames,
            StructureKind::Concept => &self.concepts,
            StructureKind::Space => &self.spaces,
        }
    }

    fn collection_for_mut(&mut self, kind: StructureKind) -> &mut StructureCollection {
        match kind {
            StructureKind::Chunk => &mut self.chunks,
            StructureKind::Label => &mut self.labels,
            StructureKind::Relation => &mut self.relations,
            StructureKind::Correspondence => &mut self.correspondences,
            StructureKind::View => &mut self.views,
            StructureKind::Frame => &mut self.frames,
            StructureKind::Concept => &mut self.concepts,
            StructureKind::Space => &mut self.spaces,
        }
    }

    /// Labels hanging off `start`.
    pub fn labels_on(&self, start: StructureId) -> StructureCollection {
        match self.graph.get(start) {
            Some(node) => node
                .links_out
                .iter()
                .copied()
                .filter(|id| {
                    self.graph
                        .get(*id)
                        .is_some_and(|l| l.kind() == StructureKind::Label)
                })
                .collect(),
            None => StructureCollection::new(),
        }
    }

    pub fn has_label(&self, start: StructureId, concept: StructureId) -> bool {
        self.labels_on(start).iter().any(|id| {
            self.graph
                .get(id)
                .is_some_and(|l| l.parent_concept == Some(concept))
        })
    }

    /// Relations with the given endpoints, in either direction.
    pub fn relations_between(&self, a: StructureId, b: StructureId) -> StructureCollection {
        self.relations.filter(&self.graph, |r| {
            r.endpoints()
                .is_some_and(|(s, e)| (s == a && e == b) || (s == b && e == a))
        })
    }

    pub fn has_relation(
        &self,
        start: StructureId,
        end: StructureId,
        concept: StructureId,
    ) -> bool {
        self.relations.iter().any(|id| {
            self.graph.get(id).is_some_and(|r| {
                r.parent_concept == Some(concept)
                    && r.endpoints() == Some((start, end))
            })
        })
    }

    pub fn has_chunk(&self, members: &BTreeSet<StructureId>) -> bool {
        self.chunks.iter().any(|id| {
            self.graph
                .get(id)
                .and_then(Structure::chunk_members)
                .is_some_and(|m| m == members)
        })
    }

    /// Score a candidate against a concept's registered classifier.
    /// `None` means the concept has no classifier; NaN means the
    /// classifier declined to decide.
    pub fn classify(
        &self,
        concept: StructureId,
        start: Option<StructureId>,
        end: Option<StructureId>,
    ) -> Option<f32> {
        let args = ClassifyArgs {
            concept: self.graph.get(concept),
            start: start.and_then(|id| self.graph.get(id)),
            end: end.and_then(|id| self.graph.get(id)),
        };
        self.classifiers.classify(concept, &args)
    }

    // --- activation -------------------------------------------------------

    pub fn boost_concept(&mut self, name: &str, amount: f32) {
        if let Some(id) = self.concept_names.get(name).copied() {
            if let Some(concept) = self.graph.get_mut(id) {
                concept.activation.boost(amount);
            }
        }
    }

    pub fn decay_concept(&mut self, name: &str, amount: f32) {
        if let Some(id) = self.concept_names.get(name).copied() {
            if let Some(concept) = self.graph.get_mut(id) {
                concept.activation.decay(amount);
            }
        }
    }

    /// The global tick. Strictly batched: only the engine loop calls
    /// this, at step boundaries.
    pub fn update_activations(&mut self) {
        self.graph.tick();
    }

    /// How good the current interpretation is: mean quality of built
    /// structures, blended with the worldview's satisfaction once one is
    /// accepted.
    pub fn satisfaction(&self) -> f32 {
        let built: Vec<f32> = self
            .graph
            .structures()
            .filter(|s| match s.kind() {
                StructureKind::Label
                | StructureKind::Relation
                | StructureKind::Correspondence
                | StructureKind::View => true,
                StructureKind::Chunk => !s.is_raw_chunk(),
                _ => false,
            })
            .map(Structure::quality)
            .collect();
        let structural = if built.is_empty() {
            0.0
        } else {
            built.iter().sum::<f32>() / built.len() as f32
        };
        if self.worldview.is_set() {
            (structural + self.worldview.satisfaction) / 2.0
        } else {
            structural
        }
    }

    // --- removal ----------------------------------------------------------

    /// Physically delete a structure and every link-kind structure left
    /// dangling by its departure. Only the garbage collector calls this;
    /// liveness (codelet targets, focus, worldview) is its concern.
    pub fn remove(&mut self, id: StructureId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(structure) = self.graph.get(current) else {
                continue;
            };
            // Links attached to the doomed structure reference it by
            // construction; they go with it.
            for link in structure.links() {
                if let Some(l) = self.graph.get(link) {
                    if matches!(
                        l.kind(),
                        StructureKind::Label
                            | StructureKind::Relation
                            | StructureKind::Correspondence
                    ) {
                        stack.push(link);
                    }
                }
            }
            let kind = structure.kind();
            self.graph.remove(current);
            self.collection_for_mut(kind).remove(current);
            self.recycle_bin.remove(current);
            if self.focus.view == Some(current) {
                self.focus.unset();
            }
            if self.worldview.view == Some(current) {
                self.worldview = Worldview::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chamber() -> BubbleChamber {
        BubbleChamber::setup(Some(42))
    }

    #[test]
    fn setup_bootstraps_the_concept_network() {
        let chamber = chamber();
        for name in ["suggest", "build", "evaluate", "select", "publish", "label"] {
            assert!(chamber.concept(name).is_ok());
        }
        assert!(chamber.concept("missing-concept").is_err());
        assert_eq!(chamber.concepts.len(), 8);
    }

    #[test]
    fn constructors_register_and_wire() {
        let mut chamber = chamber();
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let cold = chamber.add_concept("cold", Some(StructureKind::Label));
        let label = chamber.new_label(None, node, cold);

        assert!(chamber.labels.contains(label));
        assert!(chamber.has_label(node, cold));
        assert!(!chamber.has_label(node, chamber.concept("suggest").unwrap()));
        assert!(chamber
            .graph
            .get(input)
            .unwrap()
            .space_contents()
            .unwrap()
            .contains(&node));
    }

    #[test]
    fn removing_a_node_cascades_to_its_links() {
        let mut chamber = chamber();
        let input = chamber.new_space("input", false);
        let a = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let b = chamber.new_raw_chunk(vec![Location::point(input, vec![1.0])]);
        let cold = chamber.add_concept("cold", Some(StructureKind::Label));
        let warmer = chamber.add_concept("warmer", Some(StructureKind::Relation));
        let label = chamber.new_label(None, a, cold);
        let relation = chamber.new_relation(None, a, b, warmer);

        chamber.remove(a);
        assert!(!chamber.graph.contains(a));
        assert!(!chamber.graph.contains(label));
        assert!(!chamber.graph.contains(relation));
        assert!(!chamber.labels.contains(label));
        assert!(!chamber.relations.contains(relation));
        assert!(chamber.graph.contains(b));
        assert!(chamber.graph.get(b).unwrap().links_in.is_empty());
    }

    #[test]
    fn satisfaction_tracks_built_quality() {
        let mut chamber = chamber();
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let cold = chamber.add_concept("cold", Some(StructureKind::Label));
        assert_eq!(chamber.satisfaction(), 0.0);

        let label = chamber.new_label(None, node, cold);
        chamber.graph.get_mut(label).unwrap().set_quality(0.8);
        assert!((chamber.satisfaction() - 0.8).abs() < 1e-6);
    }
}
