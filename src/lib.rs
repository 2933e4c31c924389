//! Granulation, fuzzy clustering and imputation for multi-source sparse tables.
//!
//! `granule` works on tabular data assembled from several unaligned sources, each
//! recording only some of the attributes. The main pieces:
//!
//! - [`table`]: [`SparseTable`], a source-tagged row store where any cell may be missing.
//! - [`cluster`]: fuzzy c-means, per-source granulation, and crisp grouping.
//! - [`impute`]: KNN imputation with a partial-overlap distance.
//! - [`pipeline`]: the end-to-end run (granulate → impute → group) with one seeded RNG.
//!
//! ```rust
//! use granule::pipeline::{self, PipelineConfig, Variant};
//! use granule::{SourceData, SparseTable};
//!
//! let raw = SparseTable::from_sources(vec![
//!     SourceData::new(vec![0, 1], vec![0.0, 0.1, 0.2, 0.0, 9.0, 9.1, 9.2, 9.0]),
//!     SourceData::new(vec![1, 2], vec![0.1, 1.0, 9.0, 5.0]),
//! ])
//! .unwrap();
//!
//! let config = PipelineConfig {
//!     variant: Variant::Naive,
//!     neighbors: 1,
//!     clusters: 2,
//!     ..Default::default()
//! };
//! let out = pipeline::run(&raw, &config).unwrap();
//! assert_eq!(out.imputed.missing_count(), 0);
//! assert_eq!(out.labels.len(), raw.len());
//! ```

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;
pub mod impute;
pub mod pipeline;
pub mod summary;
pub mod table;

pub use cluster::{Clustering, FcmFit, FuzzyCMeans, Granulator, Grouper};
pub use error::{Error, Result};
pub use impute::{Imputed, KnnImputer};
pub use pipeline::{PipelineConfig, PipelineOutput, StageTimings, Variant};
pub use summary::{summarize, ClusterSummary};
pub use table::{Scalar, SourceData, SparseTable};
