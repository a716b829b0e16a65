//! Demo run over a toy temperature row.
//!
//! Usage: `cargo run --bin chamber_run [seed]`
//!
//! Sets up a chamber with six temperature readings along a row, content
//! concepts (cold/warm/hot, warmer) with prototype and difference
//! classifiers, then lets the engine interpret the row and prints the
//! run report as JSON.

use std::sync::Arc;

use coderack::classifier::{DifferenceClassifier, PrototypeClassifier, SamenessClassifier};
use coderack::{
    BubbleChamber, Engine, EngineSettings, Location, StructureKind,
};

fn main() -> coderack::Result<()> {
    tracing_subscriber::fmt::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok());

    let mut chamber = BubbleChamber::setup(seed);

    let input = chamber.new_space("input", false);
    let temperature = chamber.new_space("temperature", true);

    // The raw perceptual field: a row of readings, coldest on the left.
    let readings = [2.0_f32, 4.0, 5.0, 10.0, 16.0, 19.0];
    for (position, value) in readings.iter().enumerate() {
        chamber.new_raw_chunk(vec![
            Location::point(input, vec![position as f32]),
            Location::point(temperature, vec![*value]),
        ]);
    }

    // Label concepts: prototype points on the temperature axis.
    for (name, prototype) in [("cold", 2.0_f32), ("warm", 10.0), ("hot", 19.0)] {
        let concept = chamber.add_concept(name, Some(StructureKind::Label));
        chamber.register_classifier(
            concept,
            Arc::new(PrototypeClassifier {
                space: temperature,
                prototype: vec![prototype],
                scale: 4.0,
            }),
        );
    }

    // Chunking groups readings that sit close together on the row.
    let chunk = chamber.concept("chunk")?;
    chamber.register_classifier(
        chunk,
        Arc::new(SamenessClassifier {
            space: input,
            scale: 1.5,
        }),
    );

    // A directed relational concept over the temperature axis.
    let warmer = chamber.add_concept("warmer", Some(StructureKind::Relation));
    chamber.register_classifier(
        warmer,
        Arc::new(DifferenceClassifier {
            space: temperature,
            direction: 1.0,
            steepness: 1.0,
        }),
    );

    let settings = EngineSettings {
        seed,
        ..Default::default()
    };
    let mut engine = Engine::with_chamber(chamber, settings);
    let report = engine.run()?;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{report:?}"),
    }
    Ok(())
}
