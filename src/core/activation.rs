//! Buffered activation: a [0,1] signal with two-phase updates.
//!
//! Boosts and decays never touch the live value directly. They accumulate
//! in a pending buffer which the global tick folds in, clamps and clears —
//! exactly once per tick. Within one tick window every codelet therefore
//! observes the same activation no matter how many others have already run.

use crate::params::{
    ACTIVATION_UPDATE_COEFFICIENT, FLOATING_POINT_TOLERANCE, MINIMUM_ACTIVATION_UPDATE,
};

#[derive(Clone, Copy, Debug)]
pub struct Activation {
    value: f32,
    buffer: f32,
    stable: bool,
}

impl Activation {
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial.clamp(0.0, 1.0),
            buffer: 0.0,
            stable: false,
        }
    }

    /// A stable activation ignores boosts and decays entirely. Used for
    /// raw input structures, which are given rather than built and must
    /// never fade out from under the interpretation.
    pub fn stable(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            buffer: 0.0,
            stable: true,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn buffered(&self) -> f32 {
        self.buffer
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn is_fully_active(&self) -> bool {
        self.value >= 1.0 - FLOATING_POINT_TOLERANCE
    }

    pub fn is_depleted(&self) -> bool {
        self.value <= FLOATING_POINT_TOLERANCE
    }

    pub fn boost(&mut self, amount: f32) {
        if self.stable {
            return;
        }
        self.buffer += ACTIVATION_UPDATE_COEFFICIENT * amount;
    }

    pub fn decay(&mut self, amount: f32) {
        if self.stable {
            return;
        }
        self.buffer -= ACTIVATION_UPDATE_COEFFICIENT * amount;
    }

    /// Fold the pending buffer into the live value, clamp, clear.
    /// A structure nothing touched this tick self-decays by a small
    /// constant instead: untouched means forgettable.
    pub fn update(&mut self) {
        if self.stable {
            return;
        }
        if self.buffer == 0.0 {
            self.decay(MINIMUM_ACTIVATION_UPDATE);
        }
        self.value = (self.value + self.buffer).clamp(0.0, 1.0);
        self.buffer = 0.0;
    }

    /// Used only at setup time to place a structure at a known level.
    pub fn set(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }
}
