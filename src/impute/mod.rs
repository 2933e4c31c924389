//! Missing-value imputation.
//!
//! Currently one strategy: [`KnnImputer`], which fills a missing cell with the
//! mean of its nearest rows under a partial-overlap distance.

mod knn;

pub use knn::{partial_distance, Imputed, KnnImputer};
