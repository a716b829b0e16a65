//! Suggesters: propose a candidate structure without committing it.
//!
//! A bottom-up suggester samples its own targets (an unhappy node, then a
//! fitting concept); a top-down one arrives with the concept pinned by a
//! factory. The external classifier's confidence gates whether a builder
//! follow-up is engendered at all.

use crate::chamber::BubbleChamber;
use crate::core::StructureId;
use crate::params::{MINIMUM_ACTIVATION_UPDATE, MINIMUM_CODELET_URGENCY};
use crate::structures::{MissingStructureError, ScoreKey, StructureData};
use crate::Result;

use super::{
    confidence_acceptable, urgency_from_confidence, Codelet, CodeletOutcome, CodeletRole,
    CodeletRun, PipelineKind, Targets,
};

pub fn run(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> Result<CodeletRun> {
    let proposal = match resolve(codelet, kind, chamber) {
        Ok(proposal) => proposal,
        Err(MissingStructureError) => return Ok(fizzle(codelet, kind, chamber)),
    };

    if !passes_preliminary_checks(kind, &proposal, chamber) {
        chamber.decay_concept("suggest", MINIMUM_ACTIVATION_UPDATE);
        return Ok(fizzle(codelet, kind, chamber));
    }

    let Some(confidence) = calculate_confidence(kind, &proposal, chamber) else {
        // No classifier registered for the concept: nothing to judge with.
        return Ok(fizzle(codelet, kind, chamber));
    };

    if !confidence_acceptable(confidence) {
        chamber.decay_concept("suggest", MINIMUM_ACTIVATION_UPDATE);
        chamber.decay_concept(kind.concept_name(), MINIMUM_ACTIVATION_UPDATE);
        // Failed: the follow-up starts from scratch so a different
        // candidate gets drawn, rather than retrying this one.
        let follow_up = Codelet::spawn(
            chamber,
            CodeletRole::Suggester(kind),
            Some(codelet.id),
            Targets::default(),
            (codelet.urgency * 0.5).max(MINIMUM_CODELET_URGENCY),
        );
        return Ok(CodeletRun::new(CodeletOutcome::Failed, confidence).with(follow_up));
    }

    chamber.boost_concept("suggest", confidence);
    chamber.boost_concept(kind.concept_name(), confidence);
    if let Some(concept) = chamber.graph.get_mut(proposal.concept) {
        concept.activation.boost(confidence);
    }

    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Builder(kind),
        Some(codelet.id),
        Targets {
            node: Some(proposal.node),
            second_node: proposal.second_node,
            concept: Some(proposal.concept),
            ..Default::default()
        },
        urgency_from_confidence(confidence),
    );
    Ok(CodeletRun::new(CodeletOutcome::Finished, confidence).with(follow_up))
}

/// A fully resolved suggestion: the structures the candidate would be
/// built from.
struct Proposal {
    node: StructureId,
    second_node: Option<StructureId>,
    concept: StructureId,
}

fn resolve(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> std::result::Result<Proposal, MissingStructureError> {
    let node = resolve_node(codelet, kind, chamber)?;
    let second_node = match kind {
        PipelineKind::Label => None,
        PipelineKind::Chunk | PipelineKind::Relation => {
            Some(resolve_partner(codelet, node, chamber)?)
        }
    };
    let concept = resolve_concept(codelet, kind, chamber)?;
    Ok(Proposal {
        node,
        second_node,
        concept,
    })
}

fn resolve_node(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> std::result::Result<StructureId, MissingStructureError> {
    match codelet.targets.node {
        // A preset target that has since been collected is stale.
        Some(node) => chamber.graph.require(node).map(|s| s.id),
        None => match kind {
            // Chunking targets under-chunked nodes specifically.
            PipelineKind::Chunk => chamber.chunks.get_weighted(
                &chamber.graph,
                &mut chamber.random,
                ScoreKey::Custom(|s| s.unchunkedness()),
            ),
            PipelineKind::Label => chamber
                .chunks
                .get_unhappy(&chamber.graph, &mut chamber.random),
            PipelineKind::Relation => chamber
                .chunks
                .get_exigent(&chamber.graph, &mut chamber.random),
        },
    }
}

/// Pick the second structure of a two-ended candidate: another chunk
/// sharing a space with `node`, weighted toward nearby partners.
fn resolve_partner(
    codelet: &Codelet,
    node: StructureId,
    chamber: &mut BubbleChamber,
) -> std::result::Result<StructureId, MissingStructureError> {
    if let Some(partner) = codelet.targets.second_node {
        return chamber.graph.require(partner).map(|s| s.id);
    }
    let anchor = chamber.graph.require(node)?;
    let anchor_spaces: Vec<StructureId> =
        anchor.locations.iter().map(|l| l.space).collect();
    let anchor_location = anchor.locations.first().cloned();

    let candidates = chamber.chunks.filter(&chamber.graph, |c| {
        c.id != node && c.locations.iter().any(|l| anchor_spaces.contains(&l.space))
    });
    if candidates.is_empty() {
        return Err(MissingStructureError);
    }

    // Weight by proximity in the anchor's first space so chunks grow out
    // of neighbourhoods rather than arbitrary pairs.
    let ids: Vec<StructureId> = candidates.iter().collect();
    let weights: Vec<f32> = ids
        .iter()
        .map(|id| {
            let candidate = match chamber.graph.get(*id) {
                Some(c) => c,
                None => return 0.0,
            };
            match (&anchor_location, candidate.locations.first()) {
                (Some(a), Some(b)) => {
                    let distance = a.centroid_distance(b);
                    if distance.is_nan() {
                        0.0
                    } else {
                        1.0 / (1.0 + distance)
                    }
                }
                _ => 0.0,
            }
        })
        .collect();
    let index = chamber
        .random
        .select_index_weighted(&weights)
        .ok_or(MissingStructureError)?;
    Ok(ids[index])
}

fn resolve_concept(
    codelet: &Codelet,
    kind: PipelineKind,
    chamber: &mut BubbleChamber,
) -> std::result::Result<StructureId, MissingStructureError> {
    if let Some(concept) = codelet.targets.concept {
        return chamber.graph.require(concept).map(|s| s.id);
    }
    match kind {
        // Sameness chunking is judged by the structure concept itself.
        PipelineKind::Chunk => chamber.concept("chunk").map_err(|_| MissingStructureError),
        PipelineKind::Label | PipelineKind::Relation => {
            let wanted = kind.structure_kind();
            let eligible = chamber.concepts.filter(&chamber.graph, |c| {
                chamber.classifiers.has(c.id)
                    && matches!(
                        c.data,
                        StructureData::Concept { kind_hint: Some(hint), .. } if hint == wanted
                    )
            });
            eligible.get_active(&chamber.graph, &mut chamber.random)
        }
    }
}

fn passes_preliminary_checks(
    kind: PipelineKind,
    proposal: &Proposal,
    chamber: &BubbleChamber,
) -> bool {
    match kind {
        PipelineKind::Label => !chamber.has_label(proposal.node, proposal.concept),
        PipelineKind::Relation => {
            let Some(end) = proposal.second_node else {
                return false;
            };
            proposal.node != end && !chamber.has_relation(proposal.node, end, proposal.concept)
        }
        PipelineKind::Chunk => {
            let Some(second) = proposal.second_node else {
                return false;
            };
            if proposal.node == second {
                return false;
            }
            let members = [proposal.node, second].into_iter().collect();
            !chamber.has_chunk(&members)
        }
    }
}

fn calculate_confidence(
    kind: PipelineKind,
    proposal: &Proposal,
    chamber: &BubbleChamber,
) -> Option<f32> {
    match kind {
        PipelineKind::Label => chamber.classify(proposal.concept, Some(proposal.node), None),
        PipelineKind::Chunk | PipelineKind::Relation => {
            chamber.classify(proposal.concept, Some(proposal.node), proposal.second_node)
        }
    }
}

/// Soft exit: spawn an untargeted retry of the same role at reduced
/// urgency.
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
