//! Evaluators: re-judge a committed structure and write its quality.
//!
//! Quality only ever changes here. The signed change feeds back into the
//! concept network — improving structures strengthen their concept,
//! worsening ones weaken it — and sets the urgency of the selector that
//! follows.

use crate::chamber::BubbleChamber;
use crate::core::StructureId;
use crate::params::{MINIMUM_ACTIVATION_UPDATE, MINIMUM_CODELET_URGENCY};
use crate::Result;

use super::{Codelet, CodeletOutcome, CodeletRole, CodeletRun, PipelineKind, Targets};

pub fn run(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> Result<CodeletRun> {
    let candidate = match codelet.targets.candidate {
        Some(id) if chamber.graph.contains(id) => id,
        _ => return Ok(fizzle(codelet, kind, chamber)),
    };
    let Some(concept) = concept_of(codelet, candidate, chamber) else {
        return Ok(fizzle(codelet, kind, chamber));
    };
    let Some((start, end)) = judged_structures(candidate, chamber) else {
        return Ok(fizzle(codelet, kind, chamber));
    };

    let confidence = match chamber.classify(concept, Some(start), end) {
        Some(score) if !score.is_nan() => score,
        // No classifier, or undecidable: the quality stands as it was.
        _ => return Ok(fizzle(codelet, kind, chamber)),
    };

    let previous = match chamber.graph.get(candidate) {
        Some(structure) => structure.quality(),
        None => return Ok(fizzle(codelet, kind, chamber)),
    };
    if let Some(structure) = chamber.graph.get_mut(candidate) {
        structure.set_quality(confidence);
    }
    let change = confidence - previous;

    chamber.boost_concept("evaluate", confidence);
    if change >= 0.0 {
        if let Some(c) = chamber.graph.get_mut(concept) {
            c.activation.boost(change);
        }
    } else if let Some(c) = chamber.graph.get_mut(concept) {
        c.activation.decay((-change).max(MINIMUM_ACTIVATION_UPDATE));
    }

    // A big swing in either direction is worth arbitrating soon.
    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Selector(kind),
        Some(codelet.id),
        Targets {
            champion: Some(candidate),
            concept: Some(concept),
            ..Default::default()
        },
        change.abs().max(MINIMUM_CODELET_URGENCY),
    );
    Ok(CodeletRun::new(CodeletOutcome::Finished, confidence).with(follow_up))
}

fn concept_of(
    codelet: &Codelet,
    candidate: StructureId,
    chamber: &BubbleChamber,
) -> Option<StructureId> {
    codelet
        .targets
        .concept
        .filter(|id| chamber.graph.contains(*id))
        .or_else(|| chamber.graph.get(candidate)?.parent_concept)
}

/// The structures the candidate is judged over: a label's start, a
/// relation's endpoints, a chunk's first two members.
fn judged_structures(
    candidate: StructureId,
    chamber: &BubbleChamber,
) -> Option<(StructureId, Option<StructureId>)> {
    let structure = chamber.graph.get(candidate)?;
    if let Some(start) = structure.label_start() {
        return Some((start, None));
    }
    if let Some((start, end)) = structure.endpoints() {
        return Some((start, Some(end)));
    }
    let members = structure.chunk_members()?;
    let mut iter = members.iter().copied();
    let first = iter.next()?;
    Some((first, iter.next()))
}

fn fizzle(codelet: &Codelet, kind: PipelineKind, chamber: &mut BubbleChamber) -> CodeletRun {
    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Suggester(kind),
        Some(codelet.id),
        Targets::default(),
        (codelet.urgency * 0.5).max(MINIMUM_CODELET_URGENCY),
    );
    CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(follow_up)
}
