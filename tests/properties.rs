//! Property checks over the numeric substrate: clamping, floors, and
//! selection ranges hold for arbitrary inputs, not just the happy path.

use coderack::codelets::urgency_from_confidence;
use coderack::params::MINIMUM_CODELET_URGENCY;
use coderack::{Activation, RandomMachine};
use proptest::prelude::*;

proptest! {
    #[test]
    fn activation_never_leaves_the_unit_interval(
        initial in -1.0f32..2.0,
        ops in prop::collection::vec((-3.0f32..3.0, any::<bool>()), 0..60),
    ) {
        let mut activation = Activation::new(initial);
        for (amount, tick) in ops {
            if amount >= 0.0 {
                activation.boost(amount);
            } else {
                activation.decay(-amount);
            }
            if tick {
                activation.update();
            }
        }
        activation.update();
        prop_assert!((0.0..=1.0).contains(&activation.value()));
        prop_assert_eq!(activation.buffered(), 0.0);
    }

    #[test]
    fn stable_activation_ignores_every_update(
        value in 0.0f32..=1.0,
        ops in prop::collection::vec(-3.0f32..3.0, 0..30),
    ) {
        let mut activation = Activation::stable(value);
        for amount in ops {
            activation.boost(amount);
            activation.decay(amount);
            activation.update();
        }
        prop_assert_eq!(activation.value(), value.clamp(0.0, 1.0));
    }

    #[test]
    fn weighted_selection_stays_in_range(
        seed in any::<u64>(),
        weights in prop::collection::vec(-1.0f32..10.0, 1..25),
    ) {
        let mut random = RandomMachine::new(seed);
        let index = random.select_index_weighted(&weights).unwrap();
        prop_assert!(index < weights.len());
    }

    #[test]
    fn follow_up_urgency_is_monotonic_and_floored(
        low in 0.0f32..=1.0,
        high in 0.0f32..=1.0,
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        prop_assert!(urgency_from_confidence(low) <= urgency_from_confidence(high));
        prop_assert!(urgency_from_confidence(low) >= MINIMUM_CODELET_URGENCY);
        prop_assert!(urgency_from_confidence(high) <= 1.0);
    }

    #[test]
    fn same_seed_same_draws(seed in any::<u64>()) {
        let mut a = RandomMachine::new(seed);
        let mut b = RandomMachine::new(seed);
        for _ in 0..20 {
            prop_assert_eq!(a.generate_number(), b.generate_number());
        }
    }
}
