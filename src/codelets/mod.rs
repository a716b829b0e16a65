//! Codelets: small units of work with a fixed lifecycle contract.
//!
//! A codelet is plain data — role, targets, urgency, provenance — and a
//! uniform `run` that executes the four-phase lifecycle against the shared
//! chamber: preliminary checks, confidence, activation boosts, follow-up
//! spawning. Roles form a closed enum; "which follow-up class" is a data
//! table over roles, not runtime class lookup.
//!
//! ```text
//!   Suggester ──► Builder ──► Evaluator ──► Selector ──► Suggester …
//!       ▲                                                  │
//!       └────────────── factories inject here ◄────────────┘
//!
//!   housekeeping (own cycles): Factory · Recycler · GarbageCollector ·
//!                              WorldviewSetter · Publisher
//! ```
//!
//! Outcomes: `Finished` (work committed), `Fizzled` (precondition no
//! longer holds, or the structure already exists — soft and expected,
//! still spawns a retry-flavoured follow-up), `Failed` (confidence below
//! threshold — follow-up tries a different candidate). Once dispatched a
//! codelet always reaches one of the three; there is no cancellation.

pub mod builder;
pub mod evaluator;
pub mod factory;
pub mod housekeeping;
pub mod selector;
pub mod suggester;

use serde::Serialize;

use crate::chamber::BubbleChamber;
use crate::core::{CodeletId, StructureId};
use crate::params::{CONFIDENCE_THRESHOLD, MINIMUM_CODELET_URGENCY};
use crate::structures::StructureKind;
use crate::Result;

/// Terminal outcome of one codelet run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CodeletOutcome {
    Finished,
    Fizzled,
    Failed,
}

/// Which structure pipeline a suggest→build→evaluate→select chain works
/// on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineKind {
    Chunk,
    Label,
    Relation,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] =
        [PipelineKind::Chunk, PipelineKind::Label, PipelineKind::Relation];

    /// Name of the structure concept driving this pipeline.
    pub fn concept_name(self) -> &'static str {
        match self {
            PipelineKind::Chunk => "chunk",
            PipelineKind::Label => "label",
            PipelineKind::Relation => "relation",
        }
    }

    pub fn structure_kind(self) -> StructureKind {
        match self {
            PipelineKind::Chunk => StructureKind::Chunk,
            PipelineKind::Label => StructureKind::Label,
            PipelineKind::Relation => StructureKind::Relation,
        }
    }

    pub fn from_structure_kind(kind: StructureKind) -> Option<PipelineKind> {
        match kind {
            StructureKind::Chunk => Some(PipelineKind::Chunk),
            StructureKind::Label => Some(PipelineKind::Label),
            StructureKind::Relation => Some(PipelineKind::Relation),
            _ => None,
        }
    }
}

/// Closed set of codelet roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeletRole {
    Suggester(PipelineKind),
    Builder(PipelineKind),
    Evaluator(PipelineKind),
    Selector(PipelineKind),
    BottomUpFactory,
    ConceptDrivenFactory,
    Recycler,
    GarbageCollector,
    WorldviewSetter,
    Publisher,
}

impl CodeletRole {
    /// The action concept this role boosts when it finishes.
    pub fn action_concept(&self) -> Option<&'static str> {
        match self {
            CodeletRole::Suggester(_) => Some("suggest"),
            CodeletRole::Builder(_) => Some("build"),
            CodeletRole::Evaluator(_) => Some("evaluate"),
            CodeletRole::Selector(_) => Some("select"),
            CodeletRole::Publisher => Some("publish"),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CodeletRole::Suggester(k) => format!("{}-suggester", k.concept_name()),
            CodeletRole::Builder(k) => format!("{}-builder", k.concept_name()),
            CodeletRole::Evaluator(k) => format!("{}-evaluator", k.concept_name()),
            CodeletRole::Selector(k) => format!("{}-selector", k.concept_name()),
            CodeletRole::BottomUpFactory => "bottom-up-factory".into(),
            CodeletRole::ConceptDrivenFactory => "concept-driven-factory".into(),
            CodeletRole::Recycler => "recycler".into(),
            CodeletRole::GarbageCollector => "garbage-collector".into(),
            CodeletRole::WorldviewSetter => "worldview-setter".into(),
            CodeletRole::Publisher => "publisher".into(),
        }
    }
}

/// The pipeline transition table: which role the committed-path follow-up
/// of each role takes. Housekeeping roles respawn themselves instead.
pub fn follow_up_role(role: CodeletRole) -> Option<CodeletRole> {
    match role {
        CodeletRole::Suggester(kind) => Some(CodeletRole::Builder(kind)),
        CodeletRole::Builder(kind) => Some(CodeletRole::Evaluator(kind)),
        CodeletRole::Evaluator(kind) => Some(CodeletRole::Selector(kind)),
        CodeletRole::Selector(kind) => Some(CodeletRole::Suggester(kind)),
        _ => None,
    }
}

/// Structure references a codelet works on. All optional: a bottom-up
/// suggester starts with nothing and samples its own targets. The
/// garbage collector reads these uniformly as its root set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Targets {
    pub node: Option<StructureId>,
    pub second_node: Option<StructureId>,
    pub space: Option<StructureId>,
    pub concept: Option<StructureId>,
    /// The structure a builder committed / an evaluator re-scores.
    pub candidate: Option<StructureId>,
    pub champion: Option<StructureId>,
    pub challenger: Option<StructureId>,
}

impl Targets {
    pub fn iter(&self) -> impl Iterator<Item = StructureId> + '_ {
        [
            self.node,
            self.second_node,
            self.space,
            self.concept,
            self.candidate,
            self.champion,
            self.challenger,
        ]
        .into_iter()
        .flatten()
    }

    pub fn contains(&self, id: StructureId) -> bool {
        self.iter().any(|t| t == id)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Codelet {
    pub id: CodeletId,
    /// Codelet that engendered this one; provenance chain.
    pub parent_id: Option<CodeletId>,
    pub role: CodeletRole,
    pub targets: Targets,
    pub urgency: f32,
    /// Publisher bookkeeping: (satisfaction, codelets_run) at spawn time,
    /// for the satisfaction-gradient check.
    pub gradient_reference: Option<(f32, u64)>,
}

/// What one codelet run produced.
#[derive(Debug)]
pub struct CodeletRun {
    pub outcome: CodeletOutcome,
    pub confidence: f32,
    pub follow_ups: Vec<Codelet>,
}

impl CodeletRun {
    fn new(outcome: CodeletOutcome, confidence: f32) -> Self {
        Self {
            outcome,
            confidence,
            follow_ups: Vec::new(),
        }
    }

    fn with(mut self, follow_up: Codelet) -> Self {
        self.follow_ups.push(follow_up);
        self
    }
}

impl Codelet {
    /// Pure construction: fresh id, provenance recorded, urgency clamped.
    pub fn spawn(
        chamber: &mut BubbleChamber,
        role: CodeletRole,
        parent_id: Option<CodeletId>,
        targets: Targets,
        urgency: f32,
    ) -> Codelet {
        Codelet {
            id: chamber.next_codelet_id(),
            parent_id,
            role,
            targets,
            urgency: if urgency.is_nan() {
                MINIMUM_CODELET_URGENCY
            } else {
                urgency.clamp(0.0, 1.0)
            },
            gradient_reference: None,
        }
    }

    pub fn adjust_urgency(&mut self, urgency: f32) {
        if !urgency.is_nan() {
            self.urgency = urgency.clamp(0.0, 1.0);
        }
    }

    /// Execute the lifecycle. `pending` is the rest of the coderack (for
    /// root-set checks and population gating); `codelets_run` is the
    /// scheduler's step counter (for the publisher's gradient).
    ///
    /// Side effects are confined to the chamber, logging, and the
    /// returned follow-ups. A codelet never runs another codelet.
    pub fn run(
        &self,
        chamber: &mut BubbleChamber,
        pending: &[Codelet],
        codelets_run: u64,
    ) -> Result<CodeletRun> {
        let run = match self.role {
            CodeletRole::Suggester(kind) => suggester::run(self, kind, chamber)?,
            CodeletRole::Builder(kind) => builder::run(self, kind, chamber)?,
            CodeletRole::Evaluator(kind) => evaluator::run(self, kind, chamber)?,
            CodeletRole::Selector(kind) => selector::run(self, kind, chamber)?,
            CodeletRole::BottomUpFactory => factory::run_bottom_up(self, chamber, pending)?,
            CodeletRole::ConceptDrivenFactory => {
                factory::run_concept_driven(self, chamber, pending)?
            }
            CodeletRole::Recycler => housekeeping::run_recycler(self, chamber, pending)?,
            CodeletRole::GarbageCollector => {
                housekeeping::run_garbage_collector(self, chamber, pending)?
            }
            CodeletRole::WorldviewSetter => {
                housekeeping::run_worldview_setter(self, chamber)?
            }
            CodeletRole::Publisher => {
                housekeeping::run_publisher(self, chamber, codelets_run)?
            }
        };
        tracing::debug!(
            codelet = %self.id,
            role = %self.role.describe(),
            outcome = ?run.outcome,
            confidence = run.confidence,
            follow_ups = run.follow_ups.len(),
            "codelet ran"
        );
        Ok(run)
    }
}

/// Monotonic map from confidence to follow-up urgency: a logistic centred
/// on 0.5, so low-confidence work is deprioritized without being starved.
pub fn urgency_from_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        return MINIMUM_CODELET_URGENCY;
    }
    let urgency = 1.0 / (1.0 + (-(10.0 * confidence - 5.0)).exp());
    urgency.max(MINIMUM_CODELET_URGENCY)
}

/// Whether a computed confidence clears the acceptance threshold.
/// NaN ("undecidable") never clears it.
pub fn confidence_acceptable(confidence: f32) -> bool {
    !confidence.is_nan() && confidence >= CONFIDENCE_THRESHOLD
}
