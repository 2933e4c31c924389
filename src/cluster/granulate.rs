//! Granulation: summarising each source by a few fuzzy-cluster prototypes.

use std::ops::Range;

use rand::Rng;
use tracing::debug;

use super::fcm::FuzzyCMeans;
use super::traits::Clustering;
use crate::error::{Error, Result};
use crate::table::{Scalar, SparseTable};

/// Replaces the rows of each source with FCM cluster centers ("granules").
///
/// Every source is clustered on its own, over the attributes observed in the
/// source's first row. Each center becomes one output row that keeps the
/// source's tag and leaves every other attribute missing.
#[derive(Debug, Clone, Default)]
pub struct Granulator {
    fcm: FuzzyCMeans,
}

impl Granulator {
    /// Granulate with the given FCM settings; its cluster count is the number
    /// of granules per source.
    pub fn new(fcm: FuzzyCMeans) -> Self {
        Self { fcm }
    }

    /// Granules emitted per source.
    pub fn granules_per_source(&self) -> usize {
        self.fcm.n_clusters()
    }

    /// Granulate one source of `input`, appending the granules to `output`.
    ///
    /// Returns the range of rows added to `output`.
    pub fn granulate_source<T: Scalar, R: Rng>(
        &self,
        input: &SparseTable<T>,
        source: usize,
        output: &mut SparseTable<T>,
        rng: &mut R,
    ) -> Result<Range<usize>> {
        if output.num_attributes() != input.num_attributes() {
            return Err(Error::DimensionMismatch {
                expected: input.num_attributes(),
                found: output.num_attributes(),
            });
        }
        let rows = input.source_range(source);
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }

        let attributes = input.observed_attributes(rows.start);
        let fit = self.fcm.fit(input, rows.clone(), &attributes, rng)?;

        let begin = output.len();
        let mut granule = vec![None; input.num_attributes()];
        for cluster in 0..fit.n_clusters() {
            granule.fill(None);
            for (&attribute, &value) in attributes.iter().zip(fit.center(cluster)) {
                granule[attribute] = Some(value);
            }
            output.insert(source, &granule)?;
        }

        debug!(
            source,
            rows = rows.len(),
            attributes = attributes.len(),
            granules = fit.n_clusters(),
            objective = %fit.objective(),
            "granulated source"
        );
        Ok(begin..output.len())
    }

    /// Granulate every source of `input` into a new table, in source order.
    pub fn granulate<T: Scalar, R: Rng>(
        &self,
        input: &SparseTable<T>,
        rng: &mut R,
    ) -> Result<SparseTable<T>> {
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut output = SparseTable::new(input.num_attributes());
        for source in 0..input.num_sources() {
            if input.source_range(source).is_empty() {
                continue;
            }
            self.granulate_source(input, source, &mut output, rng)?;
        }
        Ok(output)
    }
}
