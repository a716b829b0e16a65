//! Core primitives: identity, seeded randomness, buffered activation.

pub mod activation;
pub mod id;
pub mod random;

pub use activation::Activation;
pub use id::{CodeletId, IdSource, StructureId};
pub use random::RandomMachine;
