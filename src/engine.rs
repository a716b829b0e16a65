//! The run loop: seed the rack, step the scheduler, tick activations.
//!
//! The engine owns the chamber and the coderack and is the only place
//! where the two meet. One step runs one codelet; every
//! `activation_update_frequency` steps the chamber's buffered activations
//! are folded in. The loop ends when a publisher sets a result, the step
//! budget runs out, or the rack empties.

use serde::{Deserialize, Serialize};

use crate::chamber::BubbleChamber;
use crate::coderack::Coderack;
use crate::codelets::{Codelet, CodeletRole, PipelineKind, Targets};
use crate::params::{
    ACTIVATION_UPDATE_FREQUENCY, CODELET_RUN_LIMIT, NUMBER_OF_START_CHUNK_SUGGESTERS,
};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Hard step budget for one run.
    pub codelet_run_limit: u64,
    /// Steps between activation ticks.
    pub activation_update_frequency: u64,
    /// Fixed seed; `None` draws one from entropy (still recorded in the
    /// report, so any run can be replayed).
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            codelet_run_limit: CODELET_RUN_LIMIT,
            activation_update_frequency: ACTIVATION_UPDATE_FREQUENCY,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    ResultPublished,
    CodeletRunLimit,
    CoderackEmpty,
}

/// What a finished run looked like, serializable for logs and harnesses.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub result: Option<String>,
    pub satisfaction: f32,
    pub codelets_run: u64,
    pub stop: StopReason,
}

pub struct Engine {
    pub chamber: BubbleChamber,
    pub coderack: Coderack,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            chamber: BubbleChamber::setup(settings.seed),
            coderack: Coderack::new(),
            settings,
        }
    }

    /// Wrap an interpreter-prepared chamber (spaces, concepts,
    /// classifiers, raw input already in place).
    pub fn with_chamber(chamber: BubbleChamber, settings: EngineSettings) -> Self {
        Self {
            chamber,
            coderack: Coderack::new(),
            settings,
        }
    }

    /// Start over with a freshly prepared chamber: empties the rack and
    /// resets the step clock. The chamber is the interpreter's to
    /// rebuild; the engine never remembers anything across runs.
    pub fn reset(&mut self, chamber: BubbleChamber) {
        self.chamber = chamber;
        self.coderack = Coderack::new();
    }

    /// The standing population every run starts from: a few chunk
    /// suggesters to get interpretation moving, one of each housekeeping
    /// codelet to keep it honest.
    pub fn seed_initial_codelets(&mut self) {
        for _ in 0..NUMBER_OF_START_CHUNK_SUGGESTERS {
            let suggester = Codelet::spawn(
                &mut self.chamber,
                CodeletRole::Suggester(PipelineKind::Chunk),
                None,
                Targets::default(),
                1.0,
            );
            self.coderack.add_codelet(suggester);
        }
        for role in [
            CodeletRole::BottomUpFactory,
            CodeletRole::ConceptDrivenFactory,
            CodeletRole::Recycler,
            CodeletRole::GarbageCollector,
            CodeletRole::WorldviewSetter,
            CodeletRole::Publisher,
        ] {
            let codelet =
                Codelet::spawn(&mut self.chamber, role, None, Targets::default(), 1.0);
            self.coderack.add_codelet(codelet);
        }
    }

    pub fn run(&mut self) -> Result<RunReport> {
        if self.coderack.is_empty() {
            self.seed_initial_codelets();
        }
        tracing::info!(
            seed = self.chamber.random.seed(),
            limit = self.settings.codelet_run_limit,
            "run starting"
        );

        let stop = loop {
            if self.chamber.result.is_some() {
                break StopReason::ResultPublished;
            }
            if self.coderack.codelets_run() >= self.settings.codelet_run_limit {
                break StopReason::CodeletRunLimit;
            }
            match self.coderack.select_and_run_codelet(&mut self.chamber) {
                Ok(step) => {
                    tracing::trace!(
                        step = self.coderack.codelets_run(),
                        role = %step.role.describe(),
                        outcome = ?step.outcome,
                        "step"
                    );
                }
                Err(Error::NoMoreCodelets) => break StopReason::CoderackEmpty,
                Err(error) => return Err(error),
            }
            if self.settings.activation_update_frequency > 0
                && self.coderack.codelets_run() % self.settings.activation_update_frequency == 0
            {
                self.chamber.update_activations();
            }
        };

        let report = RunReport {
            seed: self.chamber.random.seed(),
            result: self.chamber.result.clone(),
            satisfaction: self.chamber.satisfaction(),
            codelets_run: self.coderack.codelets_run(),
            stop,
        };
        tracing::info!(
            stop = ?report.stop,
            satisfaction = report.satisfaction,
            codelets_run = report.codelets_run,
            "run finished"
        );
        Ok(report)
    }
}
