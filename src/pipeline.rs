//! End-to-end pipeline: (granulate) → impute → group → summarise.
//!
//! Two variants are supported:
//!
//! - [`Variant::Naive`]: impute the raw table, then cluster it.
//! - [`Variant::Granular`]: granulate each source into a few prototype rows,
//!   impute the granules, then cluster the granules.
//!
//! A single RNG seeded from [`PipelineConfig::seed`] is created here and passed
//! to each stage in turn, so one seed reproduces the whole run.

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::{FuzzyCMeans, Granulator, Grouper};
use crate::error::{Error, Result};
use crate::impute::KnnImputer;
use crate::summary::{summarize, ClusterSummary};
use crate::table::{Scalar, SparseTable};

/// Which pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Impute and cluster the raw rows.
    Naive,
    /// Granulate per source first, then impute and cluster the granules.
    #[default]
    #[serde(rename = "ours")]
    #[value(name = "ours")]
    Granular,
}

/// Flat pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline variant. Default: [`Variant::Granular`].
    pub variant: Variant,
    /// Neighbours averaged per imputed cell. Default: 3.
    pub neighbors: usize,
    /// Granules produced per source (granular variant only). Default: 5.
    pub granules: usize,
    /// FCM exponent for granulation. Default: 2.0.
    pub granule_exponent: f64,
    /// FCM iterations for granulation. Default: 100.
    pub granule_iterations: usize,
    /// Clusters in the final grouping. Default: 3.
    pub clusters: usize,
    /// FCM exponent for the final grouping. Default: 2.0.
    pub cluster_exponent: f64,
    /// FCM iterations for the final grouping. Default: 100.
    pub cluster_iterations: usize,
    /// RNG seed shared by every randomised stage. Default: 0.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Granular,
            neighbors: 3,
            granules: 5,
            granule_exponent: 2.0,
            granule_iterations: 100,
            clusters: 3,
            cluster_exponent: 2.0,
            cluster_iterations: 100,
            seed: 0,
        }
    }
}

impl PipelineConfig {
    /// Reject settings no stage could run with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &'static str, &'static str); 5] = [
            (self.neighbors > 0, "neighbors", "must be at least 1"),
            (self.granules > 0, "granules", "must be at least 1"),
            (self.clusters > 0, "clusters", "must be at least 1"),
            (
                self.granule_exponent.is_finite() && self.granule_exponent > 1.0,
                "granule_exponent",
                "must be finite and greater than 1",
            ),
            (
                self.cluster_exponent.is_finite() && self.cluster_exponent > 1.0,
                "cluster_exponent",
                "must be finite and greater than 1",
            ),
        ];
        match checks.iter().find(|(ok, _, _)| !ok) {
            Some(&(_, name, message)) => Err(Error::InvalidParameter { name, message }),
            None => Ok(()),
        }
    }

    fn granulator(&self) -> Granulator {
        Granulator::new(
            FuzzyCMeans::new(self.granules)
                .with_exponent(self.granule_exponent)
                .with_iterations(self.granule_iterations),
        )
    }

    fn grouper(&self) -> Grouper {
        Grouper::new(
            FuzzyCMeans::new(self.clusters)
                .with_exponent(self.cluster_exponent)
                .with_iterations(self.cluster_iterations),
        )
    }
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    /// Granulation (granular variant only).
    pub granulation: Option<Duration>,
    /// KNN imputation.
    pub imputation: Duration,
    /// Final FCM grouping.
    pub clustering: Duration,
}

impl StageTimings {
    /// Sum of all stages.
    pub fn total(&self) -> Duration {
        self.granulation.unwrap_or_default() + self.imputation + self.clustering
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(granulation) = self.granulation {
            writeln!(f, "granulation: {granulation:?}")?;
        }
        writeln!(f, "imputation:  {:?}", self.imputation)?;
        writeln!(f, "clustering:  {:?}", self.clustering)?;
        write!(f, "total:       {:?}", self.total())
    }
}

/// Everything the pipeline produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput<T> {
    /// Imputed table (granules for the granular variant), tagged by provenance.
    pub imputed: SparseTable<T>,
    /// Same rows as `imputed`, with source tags replaced by cluster labels.
    pub clustered: SparseTable<T>,
    /// Cluster label per row of `clustered`.
    pub labels: Vec<usize>,
    /// Per-cluster counts and variances.
    pub summaries: Vec<ClusterSummary<T>>,
    /// Stage timings.
    pub timings: StageTimings,
}

/// Run the configured pipeline on `raw`.
pub fn run<T: Scalar>(raw: &SparseTable<T>, config: &PipelineConfig) -> Result<PipelineOutput<T>> {
    config.validate()?;
    if raw.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut timings = StageTimings::default();
    info!(
        variant = ?config.variant,
        rows = raw.len(),
        attributes = raw.num_attributes(),
        sources = raw.num_sources(),
        seed = config.seed,
        "starting pipeline"
    );

    let granules;
    let input = match config.variant {
        Variant::Naive => raw,
        Variant::Granular => {
            let start = Instant::now();
            granules = config.granulator().granulate(raw, &mut rng)?;
            timings.granulation = Some(start.elapsed());
            info!(granules = granules.len(), "granulation finished");
            &granules
        }
    };

    let start = Instant::now();
    let imputed = KnnImputer::new(config.neighbors)
        .impute(input)?
        .into_complete()?;
    timings.imputation = start.elapsed();
    info!(rows = imputed.len(), "imputation finished");

    let start = Instant::now();
    let mut clustered = imputed.clone();
    let labels = config.grouper().group(&mut clustered, &mut rng)?;
    timings.clustering = start.elapsed();

    let summaries = summarize(&clustered, config.clusters);
    info!(total = ?timings.total(), "pipeline finished");

    Ok(PipelineOutput {
        imputed,
        clustered,
        labels,
        summaries,
        timings,
    })
}
