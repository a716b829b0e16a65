//! Factories: keep the coderack populated.
//!
//! The bottom-up factory injects untargeted suggesters into whichever
//! pipeline is under-represented on the rack; the concept-driven factory
//! turns fully active content concepts into top-down suggesters. Both
//! respawn themselves every run, at an urgency that rises as global
//! satisfaction falls — a dissatisfied chamber breeds more work.

use crate::chamber::BubbleChamber;
use crate::params::{FOLLOW_UP_RETRIES, IDEAL_CODERACK_POPULATION, MINIMUM_CODELET_URGENCY};
use crate::structures::StructureData;
use crate::Result;

use super::{Codelet, CodeletOutcome, CodeletRole, CodeletRun, PipelineKind, Targets};

pub fn run_bottom_up(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    pending: &[Codelet],
) -> Result<CodeletRun> {
    let respawn = respawn(codelet, CodeletRole::BottomUpFactory, chamber);

    if pending.len() >= IDEAL_CODERACK_POPULATION {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn));
    }

    // Favour pipelines that are both under-represented on the rack and
    // backed by an active structure concept.
    let weights: Vec<f32> = PipelineKind::ALL
        .iter()
        .map(|kind| {
            let scarcity = 1.0 - proportion_in_pipeline(pending, *kind);
            let activation = chamber
                .concept(kind.concept_name())
                .ok()
                .and_then(|id| chamber.graph.get(id))
                .map(|c| c.activation.value())
                .unwrap_or(0.0);
            scarcity * activation.max(MINIMUM_CODELET_URGENCY)
        })
        .collect();
    let Some(index) = chamber.random.select_index_weighted(&weights) else {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn));
    };
    let kind = PipelineKind::ALL[index];

    let urgency = weights[index].max(MINIMUM_CODELET_URGENCY);
    let suggester = Codelet::spawn(
        chamber,
        CodeletRole::Suggester(kind),
        Some(codelet.id),
        Targets::default(),
        urgency,
    );
    Ok(CodeletRun::new(CodeletOutcome::Finished, urgency)
        .with(suggester)
        .with(respawn))
}

pub fn run_concept_driven(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    _pending: &[Codelet],
) -> Result<CodeletRun> {
    let respawn = respawn(codelet, CodeletRole::ConceptDrivenFactory, chamber);

    // Content concepts only: a kind hint says which pipeline the concept
    // drives, a registered classifier says it can actually judge.
    let driving = chamber.concepts.filter(&chamber.graph, |c| {
        chamber.classifiers.has(c.id)
            && c.activation.is_fully_active()
            && matches!(c.data, StructureData::Concept { kind_hint: Some(_), .. })
    });

    for _ in 0..FOLLOW_UP_RETRIES {
        let Ok(concept) = driving.get_active(&chamber.graph, &mut chamber.random) else {
            break;
        };
        let Some(structure) = chamber.graph.get(concept) else {
            continue;
        };
        let StructureData::Concept {
            kind_hint: Some(hint),
            ..
        } = &structure.data
        else {
            continue;
        };
        let Some(kind) = PipelineKind::from_structure_kind(*hint) else {
            continue;
        };
        let urgency = structure.activation.value().max(MINIMUM_CODELET_URGENCY);
        let suggester = Codelet::spawn(
            chamber,
            CodeletRole::Suggester(kind),
            Some(codelet.id),
            Targets {
                concept: Some(concept),
                ..Default::default()
            },
            urgency,
        );
        return Ok(CodeletRun::new(CodeletOutcome::Finished, urgency)
            .with(suggester)
            .with(respawn));
    }
    Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn))
}

fn proportion_in_pipeline(pending: &[Codelet], kind: PipelineKind) -> f32 {
    if pending.is_empty() {
        return 0.0;
    }
    let count = pending
        .iter()
        .filter(|c| {
            matches!(
                c.role,
                CodeletRole::Suggester(k)
                    | CodeletRole::Builder(k)
                    | CodeletRole::Evaluator(k)
                    | CodeletRole::Selector(k)
                    if k == kind
            )
        })
        .count();
    count as f32 / pending.len() as f32
}

fn respawn(codelet: &Codelet, role: CodeletRole, chamber: &mut BubbleChamber) -> Codelet {
    let urgency = (1.0 - chamber.satisfaction()).max(MINIMUM_CODELET_URGENCY);
    Codelet::spawn(chamber, role, Some(codelet.id), Targets::default(), urgency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_proportion_counts_all_lifecycle_roles() {
        let mut chamber = BubbleChamber::setup(Some(8));
        let rack: Vec<Codelet> = [
            CodeletRole::Suggester(PipelineKind::Label),
            CodeletRole::Builder(PipelineKind::Label),
            CodeletRole::Suggester(PipelineKind::Chunk),
            CodeletRole::Recycler,
        ]
        .into_iter()
        .map(|role| Codelet::spawn(&mut chamber, role, None, Targets::default(), 0.5))
        .collect();

        assert_eq!(proportion_in_pipeline(&rack, PipelineKind::Label), 0.5);
        assert_eq!(proportion_in_pipeline(&rack, PipelineKind::Chunk), 0.25);
        assert_eq!(proportion_in_pipeline(&rack, PipelineKind::Relation), 0.0);
        assert_eq!(proportion_in_pipeline(&[], PipelineKind::Label), 0.0);
    }

    #[test]
    fn overfull_rack_makes_the_factory_fizzle() {
        let mut chamber = BubbleChamber::setup(Some(9));
        let factory = Codelet::spawn(
            &mut chamber,
            CodeletRole::BottomUpFactory,
            None,
            Targets::default(),
            0.5,
        );
        let rack: Vec<Codelet> = (0..crate::params::IDEAL_CODERACK_POPULATION)
            .map(|_| {
                Codelet::spawn(
                    &mut chamber,
                    CodeletRole::Suggester(PipelineKind::Label),
                    None,
                    Targets::default(),
                    0.5,
                )
            })
            .collect();
        let run = factory.run(&mut chamber, &rack, 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Fizzled);
        // The factory always puts itself back on the rack.
        assert_eq!(run.follow_ups.len(), 1);
        assert_eq!(run.follow_ups[0].role, CodeletRole::BottomUpFactory);
    }
}
