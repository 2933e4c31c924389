use rand::Rng;

use crate::error::Result;
use crate::table::{Scalar, SparseTable};

/// Common interface for hard clustering of a whole table (one label per row).
pub trait Clustering {
    /// Fit on every row and attribute of `table` and return one cluster label per row.
    fn fit_predict<T: Scalar, R: Rng>(&self, table: &SparseTable<T>, rng: &mut R)
        -> Result<Vec<usize>>;

    /// The configured number of clusters.
    fn n_clusters(&self) -> usize;
}
