//! Granular vs naive pipeline on a small synthetic three-source dataset.

use granule::pipeline::{self, PipelineConfig, Variant};
use granule::{SourceData, SparseTable};

fn main() {
    // Each source records a different attribute subset; every source has a
    // "low" blob and a "high" blob.
    let raw = SparseTable::<f64>::from_sources(vec![
        SourceData::new(
            vec![0, 1],
            vec![0.0, 0.1, 0.1, 0.0, 0.2, 0.2, 10.0, 10.1, 10.2, 9.9, 9.9, 10.0],
        ),
        SourceData::new(
            vec![1, 2],
            vec![0.1, 1.0, 0.0, 1.1, 10.0, 20.0, 9.9, 20.2],
        ),
        SourceData::new(
            vec![2, 3, 0],
            vec![1.0, 5.0, 0.1, 1.1, 5.1, 0.0, 20.0, 50.0, 10.0, 19.9, 50.2, 10.1],
        ),
    ])
    .unwrap();
    println!("{raw:.2}");

    for variant in [Variant::Naive, Variant::Granular] {
        let config = PipelineConfig {
            variant,
            granules: 2,
            clusters: 2,
            neighbors: 2,
            seed: 42,
            ..Default::default()
        };
        let out = pipeline::run(&raw, &config).unwrap();

        println!("=== {variant:?} ===");
        println!("{:.2}", out.clustered);
        for summary in &out.summaries {
            println!("  {summary:.3}");
        }
        println!("{}\n", out.timings);
    }
}
