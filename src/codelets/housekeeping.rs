//! Housekeeping codelets: recycling, collection, worldview upkeep,
//! publishing.
//!
//! Deletion is split across two codelets so that marking is cheap and
//! probabilistic while physical removal is re-validated: between a mark
//! and its sweep the world moves on, and a structure that regained
//! activation or became a codelet target must survive. The publisher is
//! the only codelet allowed to end a run, and only once improvement has
//! genuinely stalled.

use std::collections::BTreeSet;

use crate::chamber::BubbleChamber;
use crate::core::StructureId;
use crate::params::{
    FLOATING_POINT_TOLERANCE, MINIMUM_ACTIVATION_UPDATE, MINIMUM_CODELET_URGENCY,
    RECYCLER_SAMPLE_PROPORTION,
};
use crate::structures::{ScoreKey, StructureData};
use crate::Result;

use super::{Codelet, CodeletOutcome, CodeletRole, CodeletRun, Targets};

// =============================================================================
// RECYCLER
// =============================================================================

/// Mark phase: sample depleted, unrooted structures and bin the
/// low-quality ones. Marking is reversible; nothing is deleted here.
pub fn run_recycler(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    pending: &[Codelet],
) -> Result<CodeletRun> {
    let roots = root_set(chamber, pending);

    let eligible: Vec<StructureId> = chamber
        .chunks
        .union(&chamber.labels)
        .union(&chamber.relations)
        .union(&chamber.correspondences)
        .union(&chamber.views)
        .iter()
        .filter(|id| {
            !roots.contains(id)
                && !chamber.recycle_bin.contains(*id)
                && chamber.graph.get(*id).is_some_and(|s| s.is_recyclable())
        })
        .collect();

    let respawn_urgency = if chamber.graph.len() == 0 {
        MINIMUM_CODELET_URGENCY
    } else {
        (eligible.len() as f32 / chamber.graph.len() as f32).max(MINIMUM_CODELET_URGENCY)
    };
    let respawn = Codelet::spawn(
        chamber,
        CodeletRole::Recycler,
        Some(codelet.id),
        Targets::default(),
        respawn_urgency,
    );

    if eligible.is_empty() {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn));
    }

    let sample_size = ((eligible.len() as f32 * RECYCLER_SAMPLE_PROPORTION).ceil() as usize)
        .clamp(1, eligible.len());
    let mut marked = 0usize;
    for _ in 0..sample_size {
        let Some(index) = chamber.random.uniform_index(eligible.len()) else {
            break;
        };
        let id = eligible[index];
        let quality = chamber.graph.get(id).map(|s| s.quality()).unwrap_or(0.0);
        // Survival is proportional to quality.
        if chamber.random.generate_number() > quality {
            chamber.recycle_bin.add(id);
            marked += 1;
        }
    }

    let outcome = if marked > 0 {
        CodeletOutcome::Finished
    } else {
        CodeletOutcome::Fizzled
    };
    Ok(CodeletRun::new(outcome, marked as f32 / sample_size as f32).with(respawn))
}

// =============================================================================
// GARBAGE COLLECTOR
// =============================================================================

/// Sweep phase: re-validate every binned structure against the current
/// world before physically removing it. Structures that recovered, or
/// that something now depends on, are unbinned instead.
pub fn run_garbage_collector(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    pending: &[Codelet],
) -> Result<CodeletRun> {
    let roots = root_set(chamber, pending);
    let binned: Vec<StructureId> = chamber.recycle_bin.iter().collect();

    let respawn_urgency = (binned.len() as f32 * RECYCLER_SAMPLE_PROPORTION)
        .clamp(MINIMUM_CODELET_URGENCY, 1.0);
    let respawn = Codelet::spawn(
        chamber,
        CodeletRole::GarbageCollector,
        Some(codelet.id),
        Targets::default(),
        respawn_urgency,
    );

    if binned.is_empty() {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn));
    }

    let satisfaction = chamber.satisfaction();
    let binned_count = binned.len();
    let mut removed = 0usize;
    for id in binned {
        if !still_collectable(id, &roots, chamber) {
            chamber.recycle_bin.remove(id);
            continue;
        }
        // Removal is more conservative the better the interpretation:
        // a satisfied chamber should not churn its own structures.
        if chamber.random.generate_number() > satisfaction {
            chamber.remove(id);
            removed += 1;
        }
    }

    let outcome = if removed > 0 {
        CodeletOutcome::Finished
    } else {
        CodeletOutcome::Fizzled
    };
    // Confidence is the swept fraction, kept on the same [0, 1] scale as
    // every other codelet's confidence.
    Ok(CodeletRun::new(outcome, removed as f32 / binned_count as f32).with(respawn))
}

fn still_collectable(
    id: StructureId,
    roots: &BTreeSet<StructureId>,
    chamber: &BubbleChamber,
) -> bool {
    if roots.contains(&id) {
        return false;
    }
    let Some(structure) = chamber.graph.get(id) else {
        // Already gone; drop the stale bin entry.
        return false;
    };
    if !structure.is_recyclable() {
        return false;
    }
    // A rooted link means something live still depends on this node.
    structure.links().iter().all(|link| !roots.contains(link))
}

/// Everything deletion must never touch: the focus and worldview views
/// with their members, and every structure some pending codelet intends
/// to work on.
fn root_set(chamber: &BubbleChamber, pending: &[Codelet]) -> BTreeSet<StructureId> {
    let mut roots = BTreeSet::new();
    for view in [chamber.focus.view, chamber.worldview.view]
        .into_iter()
        .flatten()
    {
        roots.insert(view);
        if let Some(members) = chamber.graph.get(view).and_then(|v| v.view_members()) {
            roots.extend(members.iter().copied());
        }
    }
    for codelet in pending {
        roots.extend(codelet.targets.iter());
    }
    roots
}

// =============================================================================
// WORLDVIEW SETTER
// =============================================================================

/// Promote a judged view to worldview when it beats the reigning one.
/// The publisher only ever reads the worldview; this codelet is the one
/// place that writes it.
pub fn run_worldview_setter(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
) -> Result<CodeletRun> {
    let respawn_urgency = (1.0 - chamber.satisfaction()).max(MINIMUM_CODELET_URGENCY);
    let respawn = Codelet::spawn(
        chamber,
        CodeletRole::WorldviewSetter,
        Some(codelet.id),
        Targets::default(),
        respawn_urgency,
    );

    let candidate =
        chamber
            .views
            .get_weighted(&chamber.graph, &mut chamber.random, ScoreKey::Quality);
    let Ok(view) = candidate else {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0).with(respawn));
    };
    let quality = chamber.graph.get(view).map(|v| v.quality()).unwrap_or(0.0);

    // Unjudged views have no claim; a reigning worldview is only displaced
    // by a strictly better one.
    if quality <= FLOATING_POINT_TOLERANCE
        || chamber.worldview.view == Some(view)
        || (chamber.worldview.is_set()
            && quality <= chamber.worldview.satisfaction + FLOATING_POINT_TOLERANCE)
    {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, quality).with(respawn));
    }

    chamber.worldview.set(view, quality);
    chamber.boost_concept("publish", quality.max(MINIMUM_ACTIVATION_UPDATE));
    Ok(CodeletRun::new(CodeletOutcome::Finished, quality).with(respawn))
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// Decide whether the run is over. Publishing requires an accepted
/// worldview, an idle focus, a stalled satisfaction gradient and a fully
/// active publish concept — and even then the last gate is probabilistic.
pub fn run_publisher(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    codelets_run: u64,
) -> Result<CodeletRun> {
    if chamber.result.is_some() {
        // Another publisher already ended the run.
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0));
    }

    let satisfaction = chamber.satisfaction();
    if !chamber.worldview.is_set() || chamber.focus.is_set() {
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0)
            .with(respawn(codelet, chamber, satisfaction, codelets_run)));
    }

    // Still improving: let the interpretation keep growing.
    if let Some((last_satisfaction, _)) = codelet.gradient_reference {
        let improving = satisfaction > last_satisfaction + FLOATING_POINT_TOLERANCE;
        if improving || chamber.random.coin_flip() {
            return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0)
                .with(respawn(codelet, chamber, satisfaction, codelets_run)));
        }
    } else {
        // First look: establish the reference point, never publish yet.
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, 0.0)
            .with(respawn(codelet, chamber, satisfaction, codelets_run)));
    }

    // The publish concept accumulates evidence across attempts; only a
    // fully active one may end the run.
    let publish_ready = chamber
        .concept("publish")
        .ok()
        .and_then(|id| chamber.graph.get(id))
        .is_some_and(|c| c.activation.is_fully_active());
    if !publish_ready {
        chamber.boost_concept("publish", satisfaction.max(MINIMUM_ACTIVATION_UPDATE));
        return Ok(CodeletRun::new(CodeletOutcome::Fizzled, satisfaction)
            .with(respawn(codelet, chamber, satisfaction, codelets_run)));
    }

    chamber.result = Some(render_result(chamber));
    Ok(CodeletRun::new(CodeletOutcome::Finished, satisfaction))
}

fn respawn(
    codelet: &Codelet,
    chamber: &mut BubbleChamber,
    satisfaction: f32,
    codelets_run: u64,
) -> Codelet {
    let mut next = Codelet::spawn(
        chamber,
        CodeletRole::Publisher,
        Some(codelet.id),
        Targets::default(),
        satisfaction.max(MINIMUM_CODELET_URGENCY),
    );
    next.gradient_reference = Some((satisfaction, codelets_run));
    next
}

fn render_result(chamber: &BubbleChamber) -> String {
    let Some(view) = chamber.worldview.view else {
        return String::new();
    };
    match chamber.graph.get(view).map(|v| &v.data) {
        Some(StructureData::View {
            output: Some(text), ..
        }) => text.clone(),
        _ => view.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::Location;

    #[test]
    fn root_set_covers_focus_worldview_and_targets() {
        let mut chamber = BubbleChamber::setup(Some(21));
        let input = chamber.new_space("input", false);
        let a = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let b = chamber.new_raw_chunk(vec![Location::point(input, vec![1.0])]);
        let view = chamber.new_view(None, [a].into_iter().collect(), None, None);
        chamber.focus.set(view);

        let targeted = Codelet::spawn(
            &mut chamber,
            CodeletRole::Builder(super::super::PipelineKind::Label),
            None,
            Targets {
                node: Some(b),
                ..Default::default()
            },
            0.5,
        );
        let roots = root_set(&chamber, &[targeted]);
        assert!(roots.contains(&view));
        assert!(roots.contains(&a));
        assert!(roots.contains(&b));
    }

    #[test]
    fn collector_unbins_structures_that_recovered() {
        let mut chamber = BubbleChamber::setup(Some(22));
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let cold = chamber.add_concept("cold", None);
        let label = chamber.new_label(None, node, cold);
        // Activation well above zero: not recyclable, must be unbinned.
        chamber.graph.get_mut(label).unwrap().activation.set(0.9);
        chamber.recycle_bin.add(label);

        let collector = Codelet::spawn(
            &mut chamber,
            CodeletRole::GarbageCollector,
            None,
            Targets::default(),
            0.5,
        );
        let run = collector.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Fizzled);
        assert!(chamber.graph.contains(label));
        assert!(!chamber.recycle_bin.contains(label));
    }

    #[test]
    fn sweep_confidence_is_a_fraction_of_the_bin() {
        let mut chamber = BubbleChamber::setup(Some(27));
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let concepts: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| chamber.add_concept(name, None))
            .collect();
        for concept in concepts {
            let label = chamber.new_label(None, node, concept);
            // Depleted and worthless: certain to be swept.
            chamber.graph.get_mut(label).unwrap().activation.set(0.0);
            chamber.recycle_bin.add(label);
        }

        let collector = Codelet::spawn(
            &mut chamber,
            CodeletRole::GarbageCollector,
            None,
            Targets::default(),
            0.5,
        );
        let run = collector.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Finished);
        assert!(
            (0.0..=1.0).contains(&run.confidence),
            "confidence {} outside the unit interval",
            run.confidence
        );
        assert!((run.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn setter_promotes_a_judged_view_to_worldview() {
        let mut chamber = BubbleChamber::setup(Some(24));
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let view = chamber.new_view(None, [node].into_iter().collect(), None, None);
        chamber.graph.get_mut(view).unwrap().set_quality(0.8);

        let setter = Codelet::spawn(
            &mut chamber,
            CodeletRole::WorldviewSetter,
            None,
            Targets::default(),
            0.5,
        );
        let run = setter.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Finished);
        assert_eq!(chamber.worldview.view, Some(view));
        assert!((chamber.worldview.satisfaction - 0.8).abs() < 1e-6);
        assert_eq!(run.follow_ups.len(), 1);
        assert_eq!(run.follow_ups[0].role, CodeletRole::WorldviewSetter);
    }

    #[test]
    fn setter_keeps_a_better_reigning_worldview() {
        let mut chamber = BubbleChamber::setup(Some(25));
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        let reigning = chamber.new_view(None, [node].into_iter().collect(), None, None);
        chamber.graph.get_mut(reigning).unwrap().set_quality(0.9);
        chamber.worldview.set(reigning, 0.9);
        let challenger = chamber.new_view(None, [node].into_iter().collect(), None, None);
        chamber.graph.get_mut(challenger).unwrap().set_quality(0.4);

        let setter = Codelet::spawn(
            &mut chamber,
            CodeletRole::WorldviewSetter,
            None,
            Targets::default(),
            0.5,
        );
        // Whichever view the weighted draw lands on, the worldview must
        // not change: the reigning view is already set, the challenger
        // is worse.
        let run = setter.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Fizzled);
        assert_eq!(chamber.worldview.view, Some(reigning));
        assert!((chamber.worldview.satisfaction - 0.9).abs() < 1e-6);
    }

    #[test]
    fn setter_ignores_unjudged_views() {
        let mut chamber = BubbleChamber::setup(Some(26));
        let input = chamber.new_space("input", false);
        let node = chamber.new_raw_chunk(vec![Location::point(input, vec![0.0])]);
        // Built but never evaluated: quality is still zero.
        chamber.new_view(None, [node].into_iter().collect(), None, None);

        let setter = Codelet::spawn(
            &mut chamber,
            CodeletRole::WorldviewSetter,
            None,
            Targets::default(),
            0.5,
        );
        let run = setter.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Fizzled);
        assert!(!chamber.worldview.is_set());
        assert_eq!(run.follow_ups.len(), 1);
    }

    #[test]
    fn publisher_never_publishes_without_a_worldview() {
        let mut chamber = BubbleChamber::setup(Some(23));
        let publisher = Codelet::spawn(
            &mut chamber,
            CodeletRole::Publisher,
            None,
            Targets::default(),
            0.5,
        );
        let run = publisher.run(&mut chamber, &[], 0).unwrap();
        assert_eq!(run.outcome, CodeletOutcome::Fizzled);
        assert!(chamber.result.is_none());
        assert_eq!(run.follow_ups.len(), 1);
        assert_eq!(run.follow_ups[0].role, CodeletRole::Publisher);
    }
}
