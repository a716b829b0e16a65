//! The coderack: an urgency-weighted multiset of pending codelets.
//!
//! Scheduling is a roulette draw over urgencies, with every codelet's
//! effective weight floored so that low-urgency work is improbable but
//! never starved. Running a codelet removes it permanently; continuity
//! comes only from the follow-ups it returns, which land back on the rack
//! in the same step.

use crate::chamber::BubbleChamber;
use crate::codelets::{Codelet, CodeletOutcome, CodeletRole};
use crate::core::CodeletId;
use crate::params::MINIMUM_CODELET_URGENCY;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct Coderack {
    codelets: Vec<Codelet>,
    codelets_run: u64,
}

/// What one scheduler step did, for logging and loop control.
#[derive(Debug)]
pub struct StepOutcome {
    pub codelet: CodeletId,
    pub role: CodeletRole,
    pub outcome: CodeletOutcome,
    pub confidence: f32,
}

impl Coderack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_codelet(&mut self, codelet: Codelet) {
        self.codelets.push(codelet);
    }

    pub fn len(&self) -> usize {
        self.codelets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codelets.is_empty()
    }

    /// Total codelets run so far; the engine's clock.
    pub fn codelets_run(&self) -> u64 {
        self.codelets_run
    }

    pub fn codelets(&self) -> &[Codelet] {
        &self.codelets
    }

    /// One scheduler step: draw a codelet by urgency, run it, requeue its
    /// follow-ups. An empty rack is a clean stop, not a fault — the
    /// caller breaks its loop on [`Error::NoMoreCodelets`].
    pub fn select_and_run_codelet(&mut self, chamber: &mut BubbleChamber) -> Result<StepOutcome> {
        if self.codelets.is_empty() {
            return Err(Error::NoMoreCodelets);
        }
        let weights: Vec<f32> = self
            .codelets
            .iter()
            .map(|c| c.urgency.max(MINIMUM_CODELET_URGENCY))
            .collect();
        let index = chamber
            .random
            .select_index_weighted(&weights)
            .ok_or(Error::NoMoreCodelets)?;
        let codelet = self.codelets.swap_remove(index);
        self.codelets_run += 1;

        let run = codelet.run(chamber, &self.codelets, self.codelets_run)?;
        for follow_up in run.follow_ups {
            self.add_codelet(follow_up);
        }
        Ok(StepOutcome {
            codelet: codelet.id,
            role: codelet.role,
            outcome: run.outcome,
            confidence: run.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codelets::Targets;

    #[test]
    fn empty_rack_is_a_clean_stop() {
        let mut chamber = BubbleChamber::setup(Some(1));
        let mut rack = Coderack::new();
        assert!(matches!(
            rack.select_and_run_codelet(&mut chamber),
            Err(Error::NoMoreCodelets)
        ));
        assert_eq!(rack.codelets_run(), 0);
    }

    #[test]
    fn running_moves_the_clock_and_requeues_follow_ups() {
        let mut chamber = BubbleChamber::setup(Some(2));
        let mut rack = Coderack::new();
        // A publisher with no worldview always fizzles and respawns itself.
        let publisher = Codelet::spawn(
            &mut chamber,
            CodeletRole::Publisher,
            None,
            Targets::default(),
            0.5,
        );
        rack.add_codelet(publisher);

        let step = rack.select_and_run_codelet(&mut chamber).unwrap();
        assert_eq!(step.role, CodeletRole::Publisher);
        assert_eq!(step.outcome, CodeletOutcome::Fizzled);
        assert_eq!(rack.codelets_run(), 1);
        assert_eq!(rack.len(), 1);
    }

    #[test]
    fn urgent_codelets_win_the_draw_almost_always() {
        let mut publisher_first = 0;
        for seed in 0..100 {
            let mut chamber = BubbleChamber::setup(Some(seed));
            let mut rack = Coderack::new();
            let urgent = Codelet::spawn(
                &mut chamber,
                CodeletRole::Publisher,
                None,
                Targets::default(),
                1.0,
            );
            let idle = Codelet::spawn(
                &mut chamber,
                CodeletRole::Recycler,
                None,
                Targets::default(),
                0.0,
            );
            rack.add_codelet(urgent);
            rack.add_codelet(idle);
            let step = rack.select_and_run_codelet(&mut chamber).unwrap();
            if step.role == CodeletRole::Publisher {
                publisher_first += 1;
            }
        }
        // Weight ratio is 1.0 against the 0.01 floor.
        assert!(publisher_first > 90);
    }
}
