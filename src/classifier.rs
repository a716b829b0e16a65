//! External classifier interface.
//!
//! Classifiers judge how well a candidate structure fits a concept. The
//! engine consumes them as opaque scoring functions in [0,1]; the math
//! behind a given concept is a collaborator concern, not engine logic.
//! A classifier may return NaN to mean "undecidable" — compound and
//! negated classifiers rely on this — and callers must treat NaN as a
//! soft no, never as a number.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::StructureId;
use crate::structures::Structure;

/// Borrowed view of the structures a classification is about. Which
/// fields matter depends on the concept: labels look at `start`,
/// relations at `start` and `end`.
#[derive(Default)]
pub struct ClassifyArgs<'a> {
    pub concept: Option<&'a Structure>,
    pub start: Option<&'a Structure>,
    pub end: Option<&'a Structure>,
}

pub trait Classifier: Send + Sync {
    fn classify(&self, args: &ClassifyArgs<'_>) -> f32;
}

/// Maps concept ids to their scoring functions. Concepts without a
/// registered classifier cannot drive suggesters or evaluators.
#[derive(Default, Clone)]
pub struct ClassifierRegistry {
    by_concept: BTreeMap<StructureId, Arc<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, concept: StructureId, classifier: Arc<dyn Classifier>) {
        self.by_concept.insert(concept, classifier);
    }

    pub fn has(&self, concept: StructureId) -> bool {
        self.by_concept.contains_key(&concept)
    }

    pub fn classify(&self, concept: StructureId, args: &ClassifyArgs<'_>) -> Option<f32> {
        self.by_concept.get(&concept).map(|c| c.classify(args))
    }
}

impl fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("concepts", &self.by_concept.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// REFERENCE CLASSIFIERS
// =============================================================================
//
// Shipped for the demo binary and the test suites. Real domains plug in
// their own implementations through the registry.

/// Scores a candidate by distance from a prototype point in one
/// conceptual space: `exp(-distance / scale)`. A start node with no
/// location in the space is undecidable.
#[derive(Debug)]
pub struct PrototypeClassifier {
    pub space: StructureId,
    pub prototype: Vec<f32>,
    pub scale: f32,
}

impl Classifier for PrototypeClassifier {
    fn classify(&self, args: &ClassifyArgs<'_>) -> f32 {
        let Some(start) = args.start else {
            return f32::NAN;
        };
        let Some(location) = start.location_in_space(self.space) else {
            return f32::NAN;
        };
        let centroid = location.centroid();
        if centroid.len() != self.prototype.len() {
            return f32::NAN;
        }
        let distance = centroid
            .iter()
            .zip(&self.prototype)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt();
        (-distance / self.scale).exp()
    }
}

/// Scores how alike two structures are in one conceptual space; used for
/// sameness chunks. `exp(-distance / scale)` over centroid distance.
#[derive(Debug)]
pub struct SamenessClassifier {
    pub space: StructureId,
    pub scale: f32,
}

impl Classifier for SamenessClassifier {
    fn classify(&self, args: &ClassifyArgs<'_>) -> f32 {
        let (Some(start), Some(end)) = (args.start, args.end) else {
            return f32::NAN;
        };
        let (Some(a), Some(b)) = (
            start.location_in_space(self.space),
            end.location_in_space(self.space),
        ) else {
            return f32::NAN;
        };
        let distance = a.centroid_distance(b);
        if distance.is_nan() {
            return f32::NAN;
        }
        (-distance / self.scale).exp()
    }
}

/// Scores a directed difference between two structures in one conceptual
/// space; used for relational concepts like "warmer". The logistic of the
/// signed centroid difference along the first axis.
#[derive(Debug)]
pub struct DifferenceClassifier {
    pub space: StructureId,
    /// +1.0 scores start > end, -1.0 scores start < end.
    pub direction: f32,
    pub steepness: f32,
}

impl Classifier for DifferenceClassifier {
    fn classify(&self, args: &ClassifyArgs<'_>) -> f32 {
        let (Some(start), Some(end)) = (args.start, args.end) else {
            return f32::NAN;
        };
        let (Some(a), Some(b)) = (
            start.location_in_space(self.space),
            end.location_in_space(self.space),
        ) else {
            return f32::NAN;
        };
        let (ca, cb) = (a.centroid(), b.centroid());
        let (Some(x), Some(y)) = (ca.first(), cb.first()) else {
            return f32::NAN;
        };
        let difference = self.direction * (x - y);
        if difference.is_nan() {
            return f32::NAN;
        }
        1.0 / (1.0 + (-self.steepness * difference).exp())
    }
}

/// Negation wrapper: `1 - inner`. NaN passes through untouched — the
/// negation of "undecidable" is still undecidable.
pub struct NotClassifier(pub Arc<dyn Classifier>);

impl Classifier for NotClassifier {
    fn classify(&self, args: &ClassifyArgs<'_>) -> f32 {
        let inner = self.0.classify(args);
        if inner.is_nan() {
            f32::NAN
        } else {
            1.0 - inner
        }
    }
}

/// Constant score; test scaffolding.
#[derive(Debug)]
pub struct FixedClassifier(pub f32);

impl Classifier for FixedClassifier {
    fn classify(&self, _args: &ClassifyArgs<'_>) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Activation;
    use crate::structures::{Location, StructureData, StructureGraph};
    use std::collections::BTreeSet;

    fn space(graph: &mut StructureGraph) -> StructureId {
        graph.create(
            None,
            Vec::new(),
            Activation::new(0.0),
            None,
            StructureData::Space {
                name: "temperature".into(),
                contents: BTreeSet::new(),
                is_conceptual: true,
            },
        )
    }

    fn node_at(graph: &mut StructureGraph, space: StructureId, x: f32) -> StructureId {
        graph.create(
            None,
            vec![Location::point(space, vec![x])],
            Activation::stable(1.0),
            None,
            StructureData::Chunk {
                members: BTreeSet::new(),
                super_chunks: BTreeSet::new(),
                is_raw: true,
            },
        )
    }

    #[test]
    fn prototype_scores_fall_off_with_distance() {
        let mut graph = StructureGraph::new();
        let space = space(&mut graph);
        let near = node_at(&mut graph, space, 1.0);
        let far = node_at(&mut graph, space, 9.0);
        let classifier = PrototypeClassifier {
            space,
            prototype: vec![1.0],
            scale: 2.0,
        };
        let near_score = classifier.classify(&ClassifyArgs {
            start: graph.get(near),
            ..Default::default()
        });
        let far_score = classifier.classify(&ClassifyArgs {
            start: graph.get(far),
            ..Default::default()
        });
        assert!(near_score > 0.99);
        assert!(far_score < near_score);
    }

    #[test]
    fn missing_location_is_undecidable() {
        let mut graph = StructureGraph::new();
        let temperature = space(&mut graph);
        let elsewhere = space(&mut graph);
        let node = node_at(&mut graph, elsewhere, 1.0);
        let classifier = PrototypeClassifier {
            space: temperature,
            prototype: vec![1.0],
            scale: 1.0,
        };
        let score = classifier.classify(&ClassifyArgs {
            start: graph.get(node),
            ..Default::default()
        });
        assert!(score.is_nan());
    }

    #[test]
    fn not_classifier_inverts_but_keeps_nan() {
        let not_high = NotClassifier(Arc::new(FixedClassifier(0.9)));
        let score = not_high.classify(&ClassifyArgs::default());
        assert!((score - 0.1).abs() < 1e-6);

        let not_nan = NotClassifier(Arc::new(FixedClassifier(f32::NAN)));
        assert!(not_nan.classify(&ClassifyArgs::default()).is_nan());
    }

    #[test]
    fn difference_classifier_is_directional() {
        let mut graph = StructureGraph::new();
        let space = space(&mut graph);
        let low = node_at(&mut graph, space, 2.0);
        let high = node_at(&mut graph, space, 8.0);
        let warmer = DifferenceClassifier {
            space,
            direction: 1.0,
            steepness: 1.0,
        };
        let forward = warmer.classify(&ClassifyArgs {
            start: graph.get(high),
            end: graph.get(low),
            ..Default::default()
        });
        let backward = warmer.classify(&ClassifyArgs {
            start: graph.get(low),
            end: graph.get(high),
            ..Default::default()
        });
        assert!(forward > 0.9);
        assert!(backward < 0.1);
    }
}
