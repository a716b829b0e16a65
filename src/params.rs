//! Engine hyperparameters.
//!
//! These are tunable knobs, not correctness constraints. The lifecycle
//! contracts (three codelet outcomes, retry-on-fizzle, buffered activation)
//! hold for any monotonic settings of the values below.

/// How many scheduler steps pass between global activation ticks.
pub const ACTIVATION_UPDATE_FREQUENCY: u64 = 10;

/// Hard budget on the number of codelets a run may execute.
pub const CODELET_RUN_LIMIT: u64 = 20_000;

/// Urgency floor applied during coderack selection. Keeps every pending
/// codelet at a non-zero selection probability so the rack cannot lock up
/// with a population of zero-urgency codelets.
pub const MINIMUM_CODELET_URGENCY: f32 = 0.01;

/// Target coderack population. Factories stop injecting new pipelines
/// while the rack is above this size.
pub const IDEAL_CODERACK_POPULATION: usize = 30;

/// Self-decay applied to a structure whose activation buffer is empty at
/// tick time. This is the forgetting constant: anything nothing touches
/// drifts back toward zero.
pub const MINIMUM_ACTIVATION_UPDATE: f32 = 0.02;

/// Scale factor folded into every buffered boost or decay.
pub const ACTIVATION_UPDATE_COEFFICIENT: f32 = 0.5;

/// Classifier confidence below which a suggester reports `Failed` rather
/// than engendering a builder.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Tolerance for float comparisons against 0.0 and 1.0.
pub const FLOATING_POINT_TOLERANCE: f32 = 1e-5;

/// Fraction of eligible zero-activation structures a single recycler run
/// considers for marking.
pub const RECYCLER_SAMPLE_PROPORTION: f32 = 0.25;

/// How many fresh random draws a factory attempts when follow-up
/// construction hits a missing-structure condition.
pub const FOLLOW_UP_RETRIES: usize = 3;

/// Number of bottom-up chunk suggesters seeded at the start of a run.
pub const NUMBER_OF_START_CHUNK_SUGGESTERS: usize = 3;
