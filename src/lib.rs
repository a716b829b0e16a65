//! # Coderack
//!
//! A symbolic cognitive engine: many small stochastic codelets compete on
//! an urgency-weighted scheduler to grow, judge and prune a graph of
//! perceptual structures, until a publisher decides the interpretation is
//! good enough to emit.
//!
//! ## Quick Start
//! ```rust,ignore
//! use coderack::{BubbleChamber, Engine, EngineSettings};
//!
//! // Prepare a chamber: spaces, concepts, classifiers, raw input.
//! let mut chamber = BubbleChamber::setup(Some(42));
//! let input = chamber.new_space("input", false);
//! // ... register concepts and classifiers, add raw chunks ...
//!
//! // Run to completion and read the report.
//! let mut engine = Engine::with_chamber(chamber, EngineSettings::default());
//! let report = engine.run()?;
//! println!("{:?}", report.result);
//! ```
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          ENGINE                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   Coderack  → urgency-weighted roulette over codelets        │
//! │   Codelets  → suggest → build → evaluate → select cycles     │
//! │               + factories, recycler, collector, publisher    │
//! │   Chamber   → structure graph, collections, focus/worldview  │
//! │   Activation→ buffered boosts, folded once per global tick   │
//! │   Random    → one seeded machine; a seed replays a run       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod chamber;
pub mod classifier;
pub mod coderack;
pub mod codelets;
pub mod core;
pub mod engine;
pub mod params;
pub mod structures;

pub use crate::chamber::{BubbleChamber, Focus, Worldview};
pub use crate::classifier::{Classifier, ClassifierRegistry, ClassifyArgs};
pub use crate::coderack::{Coderack, StepOutcome};
pub use crate::codelets::{
    Codelet, CodeletOutcome, CodeletRole, CodeletRun, PipelineKind, Targets,
};
pub use crate::core::{Activation, CodeletId, RandomMachine, StructureId};
pub use crate::engine::{Engine, EngineSettings, RunReport, StopReason};
pub use crate::structures::{
    Location, MissingStructureError, ScoreKey, Structure, StructureCollection, StructureData,
    StructureGraph, StructureKind,
};

// === Error types ===

/// Crate-level error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A retrieval found nothing eligible. Usually handled inside a
    /// codelet as a fizzle; it only surfaces from setup-time lookups.
    #[error(transparent)]
    MissingStructure(#[from] MissingStructureError),

    /// The coderack ran dry. A clean stop condition, not a fault.
    #[error("no more codelets on the rack")]
    NoMoreCodelets,

    #[error("unknown concept: {0}")]
    UnknownConcept(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// === Constants ===

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
