//! Builders: commit a suggested structure into the chamber.
//!
//! A builder's targets are always preset by its suggester. It re-checks
//! the world before committing: targets may have been recycled, or a rival
//! codelet may have built the same structure first. The committed
//! structure starts at quality zero; judging it is the evaluator's job.

use std::collections::BTreeSet;

use crate::chamber::BubbleChamber;
use crate::core::StructureId;
use crate::params::MINIMUM_CODELET_URGENCY;
use crate::structures::Location;
use crate::Result;

use super::{
    urgency_from_confidence, Codelet, CodeletOutcome, CodeletRole, CodeletRun, PipelineKind,
    Targets,
};

pub fn run(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> Result<CodeletRun> {
    let Some(node) = live(codelet.targets.node, chamber) else {
        return Ok(fail(codelet, kind, chamber));
    };
    let Some(concept) = live(codelet.targets.concept, chamber) else {
        return Ok(fail(codelet, kind, chamber));
    };
    let second_node = match kind {
        PipelineKind::Label => None,
        PipelineKind::Chunk | PipelineKind::Relation => {
            match live(codelet.targets.second_node, chamber) {
                Some(second) => Some(second),
                None => return Ok(fail(codelet, kind, chamber)),
            }
        }
    };

    // A rival may have built this exact structure since the suggestion.
    if let Some(existing) = existing_equivalent(kind, node, second_node, concept, chamber) {
        let follow_up = Codelet::spawn(
            chamber,
            CodeletRole::Evaluator(kind),
            Some(codelet.id),
            Targets {
                candidate: Some(existing),
                concept: Some(concept),
                ..Default::default()
            },
            codelet.urgency,
        );
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(follow_up));
    }

    let candidate = match kind {
        PipelineKind::Label => chamber.new_label(Some(codelet.id), node, concept),
        PipelineKind::Relation => {
            let end = second_node.unwrap_or(node);
            chamber.new_relation(Some(codelet.id), node, end, concept)
        }
        PipelineKind::Chunk => {
            let second = second_node.unwrap_or(node);
            let members: BTreeSet<StructureId> = [node, second].into_iter().collect();
            let locations = merged_locations(node, second, chamber);
            chamber.new_chunk(Some(codelet.id), members, locations)
        }
    };

    let confidence = match chamber.classify(concept, Some(node), second_node) {
        Some(score) if !score.is_nan() => score,
        _ => codelet.urgency,
    };
    chamber.boost_concept("build", confidence);
    chamber.boost_concept(kind.concept_name(), confidence);

    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Evaluator(kind),
        Some(codelet.id),
        Targets {
            candidate: Some(candidate),
            concept: Some(concept),
            ..Default::default()
        },
        urgency_from_confidence(confidence),
    );
    Ok(CodeletRun::new(CodeletOutcome::Finished, confidence).with(follow_up))
}

fn live(target: Option<StructureId>, chamber: &BubbleChamber) -> Option<StructureId> {
    target.filter(|id| chamber.graph.contains(*id))
}

fn existing_equivalent(
    kind: PipelineKind,
    node: StructureId,
    second_node: Option<StructureId>,
    concept: StructureId,
    chamber: &BubbleChamber,
) -> Option<StructureId> {
    match kind {
        PipelineKind::Label => chamber.labels_on(node).iter().find(|id| {
            chamber
                .graph
                .get(*id)
                .is_some_and(|l| l.parent_concept == Some(concept))
        }),
        PipelineKind::Relation => {
            let end = second_node?;
            chamber.relations.iter().find(|id| {
                chamber.graph.get(*id).is_some_and(|r| {
                    r.parent_concept == Some(concept) && r.endpoints() == Some((node, end))
                })
            })
        }
        PipelineKind::Chunk => {
            let second = second_node?;
            let members: BTreeSet<StructureId> = [node, second].into_iter().collect();
            chamber.chunks.iter().find(|id| {
                chamber
                    .graph
                    .get(*id)
                    .and_then(|c| c.chunk_members())
                    .is_some_and(|m| *m == members)
            })
        }
    }
}

/// A chunk spans its members: in every space both members occupy, its
/// location is the union of their coordinate rows.
fn merged_locations(a: StructureId, b: StructureId, chamber: &BubbleChamber) -> Vec<Location> {
    let (Some(first), Some(second)) = (chamber.graph.get(a), chamber.graph.get(b)) else {
        return Vec::new();
    };
    let mut merged = Vec::new();
    for location in &first.locations {
        if let Some(other) = second.location_in_space(location.space) {
            let mut coordinates = location.coordinates.clone();
            coordinates.extend(other.coordinates.iter().cloned());
            merged.push(Location::spanning(location.space, coordinates));
        }
    }
    merged
}

/// Hard exit: a target disappeared underneath the suggestion. The
/// follow-up restarts the pipeline from an untargeted suggester so a
/// different candidate gets drawn.
fn fail(codelet: &Codelet, kind: PipelineKind, chamber: &mut BubbleChamber) -> CodeletRun {
    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Suggester(kind),
        Some(codelet.id),
        Targets::default(),
        (codelet.urgency * 0.5).max(MINIMUM_CODELET_URGENCY),
    );
    CodeletRun::new(CodeletOutcome::Failed, 0.0).with(follow_up)
}
