//! Selectors: arbitrate between rival structures.
//!
//! A selector takes a champion, looks for a challenger that explains the
//! same ground (a rival label on the same start, a rival relation over the
//! same pair, an overlapping chunk), and runs a quality-weighted
//! tournament. Winners gain activation, losers lose it; the loser is left
//! for the recycler rather than deleted here.

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
    let champion = match codelet.targets.champion {
        Some(id) if chamber.graph.contains(id) => id,
        _ => return Ok(fizzle(codelet, kind, chamber)),
    };

    let mut challenger = codelet
        .targets
        .challenger
        .filter(|id| chamber.graph.contains(*id));
    if challenger.is_none() {
        challenger = find_challenger(kind, champion, chamber);
    }

    let Some(challenger) = challenger else {
        // Unopposed: reinforce the champion and send a suggester after
        // fresh ground instead.
        let quality = chamber
            .graph
            .get(champion)
            .map(|s| s.quality())
            .unwrap_or(0.0);
        if let Some(s) = chamber.graph.get_mut(champion) {
            s.activation.boost(quality);
        }
        chamber.boost_concept("select", quality);
        let follow_up = Codelet::spawn(
            chamber,
            CodeletRole::Suggester(kind),
            Some(codelet.id),
            Targets {
                concept: codelet.targets.concept,
                ..Default::default()
            },
            (codelet.urgency * 0.5).max(MINIMUM_CODELET_URGENCY),
        );
        return Ok(CodeletRun::new(CodeletOutcome::Finished, quality).with(follow_up));
    };

    let champion_quality = quality_of(champion, chamber);
    let challenger_quality = quality_of(challenger, chamber);
    let champion_wins = match chamber
        .random
        .select_index_weighted(&[champion_quality, challenger_quality])
    {
        Some(0) => true,
        Some(_) => false,
        None => chamber.random.coin_flip(),
    };
    let (winner, loser) = if champion_wins {
        (champion, challenger)
    } else {
        (challenger, champion)
    };

    let total = champion_quality + challenger_quality;
    let confidence = if total > 0.0 {
        quality_of(winner, chamber) / total
    } else {
        0.5
    };

    if let Some(s) = chamber.graph.get_mut(winner) {
        let quality = s.quality();
        s.activation.boost(quality.max(MINIMUM_ACTIVATION_UPDATE));
    }
    if let Some(s) = chamber.graph.get_mut(loser) {
        s.activation.decay(MINIMUM_ACTIVATION_UPDATE);
    }
    chamber.boost_concept("select", confidence);

    // Re-arbitrate while the rivals' activations are still close.
    let winner_activation = activation_of(winner, chamber);
    let loser_activation = activation_of(loser, chamber);
    let urgency = (1.0 - (winner_activation - loser_activation).abs())
        .max(MINIMUM_CODELET_URGENCY);
    let follow_up = Codelet::spawn(
        chamber,
        CodeletRole::Selector(kind),
        Some(codelet.id),
        Targets {
            champion: Some(winner),
            challenger: Some(loser),
            concept: codelet.targets.concept,
            ..Default::default()
        },
        urgency,
    );
    Ok(CodeletRun::new(CodeletOutcome::Finished, confidence).with(follow_up))
}

fn quality_of(id: StructureId, chamber: &BubbleChamber) -> f32 {
    chamber.graph.get(id).map(|s| s.quality()).unwrap_or(0.0)
}

fn activation_of(id: StructureId, chamber: &BubbleChamber) -> f32 {
    chamber
        .graph
        .get(id)
        .map(|s| s.activation.value())
        .unwrap_or(0.0)
}

/// A challenger explains the same ground as the champion.
fn find_challenger(
    kind: PipelineKind,
    champion: StructureId,
    chamber: &mut BubbleChamber,
) -> Option<StructureId> {
    let structure = chamber.graph.get(champion)?;
    match kind {
        PipelineKind::Label => {
            let start = structure.label_start()?;
            let rivals = chamber.labels_on(start).excluding(&[champion]);
            rivals.get(&chamber.graph, &mut chamber.random).ok()
        }
        PipelineKind::Relation => {
            let (start, end) = structure.endpoints()?;
            let rivals = chamber.relations_between(start, end).excluding(&[champion]);
            rivals.get(&chamber.graph, &mut chamber.random).ok()
        }
        PipelineKind::Chunk => {
            let members = structure.chunk_members()?.clone();
            let rivals = chamber.chunks.filter(&chamber.graph, |c| {
                c.id != champion
                    && !c.is_raw_chunk()
                    && c.chunk_members()
                        .is_some_and(|m| !m.is_disjoint(&members))
            });
            rivals.get(&chamber.graph, &mut chamber.random).ok()
        }
    }
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
