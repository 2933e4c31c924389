//! Fuzzy c-means (FCM).
//!
//! # The Algorithm (Bezdek, 1981)
//!
//! FCM generalises k-means by letting every row belong to every cluster with a
//! graded membership `u_ij ∈ [0, 1]`, where memberships of a row sum to 1.
//!
//! **Objective**: minimise
//!
//! ```text
//! J_m = Σ_i Σ_j u_ij^m ||x_j - c_i||²
//! ```
//!
//! for a fuzziness exponent `m > 1` (`m → 1` approaches hard k-means, larger `m`
//! blurs the partition).
//!
//! ## Iteration
//!
//! 1. Centers: `c_i = Σ_j u_ij^m x_j / Σ_j u_ij^m`
//! 2. Squared distances: `d_ij = ||x_j - c_i||²`
//! 3. Memberships: `u_ij = 1 / Σ_k (d_ij / d_kj)^(1/(m-1))`
//!
//! The run here is a fixed number of iterations rather than a convergence test,
//! so that a seed fully determines the result.
//!
//! ## Rows and attributes
//!
//! A fit covers a contiguous range of table rows and a subset of attributes;
//! every selected cell must be observed. Granulation uses this to cluster one
//! source at a time over the attributes that source actually records.

use std::ops::Range;

use rand::Rng;
use tracing::trace;

use super::traits::Clustering;
use super::util;
use crate::error::{Error, Result};
use crate::table::{Scalar, SparseTable};

/// Fuzzy c-means configuration.
#[derive(Debug, Clone)]
pub struct FuzzyCMeans {
    n_clusters: usize,
    exponent: f64,
    iterations: usize,
}

impl FuzzyCMeans {
    /// Create a clusterer producing `n_clusters` clusters, with `m = 2` and 100 iterations.
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            exponent: 2.0,
            iterations: 100,
        }
    }

    /// Set the fuzziness exponent `m` (must be greater than 1).
    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    /// Set the number of update iterations (0 keeps the random partition).
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Fuzziness exponent.
    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Number of iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::InvalidParameter {
                name: "n_clusters",
                message: "must be at least 1",
            });
        }
        if !(self.exponent.is_finite() && self.exponent > 1.0) {
            return Err(Error::InvalidParameter {
                name: "exponent",
                message: "must be finite and greater than 1",
            });
        }
        Ok(())
    }

    /// Partition `rows` of `table` over `attributes`.
    pub fn fit<T: Scalar, R: Rng>(
        &self,
        table: &SparseTable<T>,
        rows: Range<usize>,
        attributes: &[usize],
        rng: &mut R,
    ) -> Result<FcmFit<T>> {
        self.validate()?;
        if rows.is_empty() || attributes.is_empty() {
            return Err(Error::EmptyInput);
        }
        if rows.end > table.len() {
            return Err(Error::InvalidParameter {
                name: "rows",
                message: "range extends past the end of the table",
            });
        }
        if let Some(&attribute) = attributes.iter().find(|&&a| a >= table.num_attributes()) {
            return Err(Error::DimensionMismatch {
                expected: table.num_attributes(),
                found: attribute + 1,
            });
        }

        let c = self.n_clusters;
        let n = rows.len();
        let d = attributes.len();
        let m = T::from_f64(self.exponent);
        let points = util::gather(table, rows.clone(), attributes)?;

        // Cluster-major: u[i * n + j] is the membership of row j in cluster i.
        let mut memberships: Vec<T> = (0..c * n).map(|_| T::sample_unit(rng)).collect();
        normalize(&mut memberships, c, n);

        let mut centers = vec![T::zero(); c * d];
        let mut distances = vec![T::zero(); c * n];
        let power = T::one() / (m - T::one());

        for iteration in 0..self.iterations {
            update_centers(&points, &memberships, &mut centers, n, d, m);
            update_distances(&points, &centers, &mut distances, n, d);
            update_memberships(&distances, &mut memberships, c, n, power);
            normalize(&mut memberships, c, n);
            trace!(iteration, "fcm iteration");
        }

        // Report centers that belong to the final memberships.
        update_centers(&points, &memberships, &mut centers, n, d, m);
        update_distances(&points, &centers, &mut distances, n, d);
        let objective = memberships
            .iter()
            .zip(&distances)
            .fold(T::zero(), |acc, (&u, &dist)| acc + u.powf(m) * dist);

        Ok(FcmFit {
            rows,
            attributes: attributes.to_vec(),
            n_clusters: c,
            memberships,
            centers,
            objective,
        })
    }
}

impl Default for FuzzyCMeans {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Clustering for FuzzyCMeans {
    fn fit_predict<T: Scalar, R: Rng>(
        &self,
        table: &SparseTable<T>,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let attributes: Vec<usize> = (0..table.num_attributes()).collect();
        let fit = self.fit(table, 0..table.len(), &attributes, rng)?;
        Ok(fit.hard_labels())
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }
}

/// Result of one FCM run.
#[derive(Debug, Clone)]
pub struct FcmFit<T> {
    rows: Range<usize>,
    attributes: Vec<usize>,
    n_clusters: usize,
    memberships: Vec<T>,
    centers: Vec<T>,
    objective: T,
}

impl<T: Scalar> FcmFit<T> {
    /// Table rows that were clustered.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Attributes the centers are expressed over, in center coordinate order.
    pub fn attributes(&self) -> &[usize] {
        &self.attributes
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Membership of table row `row` in `cluster`.
    ///
    /// # Panics
    ///
    /// If `row` is outside [`rows`](Self::rows) or `cluster` is out of range.
    pub fn membership(&self, cluster: usize, row: usize) -> T {
        assert!(cluster < self.n_clusters, "cluster {cluster} out of range");
        assert!(self.rows.contains(&row), "row {row} was not clustered");
        self.memberships[cluster * self.rows.len() + (row - self.rows.start)]
    }

    /// Center of `cluster`, one coordinate per entry of [`attributes`](Self::attributes).
    pub fn center(&self, cluster: usize) -> &[T] {
        let d = self.attributes.len();
        &self.centers[cluster * d..(cluster + 1) * d]
    }

    /// Objective `J_m` at the returned centers and memberships.
    pub fn objective(&self) -> T {
        self.objective
    }

    /// Crisp label per clustered row: the cluster of highest membership, lowest
    /// index on ties.
    pub fn hard_labels(&self) -> Vec<usize> {
        let n = self.rows.len();
        (0..n)
            .map(|j| {
                util::argmax((0..self.n_clusters).map(|i| self.memberships[i * n + j]))
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn normalize<T: Scalar>(memberships: &mut [T], c: usize, n: usize) {
    let uniform = T::one() / T::from_count(c);
    for j in 0..n {
        let sum = (0..c).fold(T::zero(), |acc, i| acc + memberships[i * n + j]);
        for i in 0..c {
            let u = &mut memberships[i * n + j];
            *u = if sum > T::zero() && sum.is_finite() {
                *u / sum
            } else {
                uniform
            };
        }
    }
}

fn update_centers<T: Scalar>(
    points: &[T],
    memberships: &[T],
    centers: &mut [T],
    n: usize,
    d: usize,
    m: T,
) {
    for (i, center) in centers.chunks_exact_mut(d).enumerate() {
        let mut acc = vec![T::zero(); d];
        let mut factor_sum = T::zero();
        for (j, point) in points.chunks_exact(d).enumerate() {
            let factor = memberships[i * n + j].powf(m);
            factor_sum = factor_sum + factor;
            for (a, &x) in acc.iter_mut().zip(point) {
                *a = *a + factor * x;
            }
        }
        // A cluster that lost every row keeps its previous position.
        if factor_sum > T::zero() {
            for (c, a) in center.iter_mut().zip(acc) {
                *c = a / factor_sum;
            }
        }
    }
}

fn update_distances<T: Scalar>(points: &[T], centers: &[T], distances: &mut [T], n: usize, d: usize) {
    for (i, center) in centers.chunks_exact(d).enumerate() {
        for (j, point) in points.chunks_exact(d).enumerate() {
            distances[i * n + j] = util::squared_euclidean(point, center);
        }
    }
}

fn update_memberships<T: Scalar>(distances: &[T], memberships: &mut [T], c: usize, n: usize, power: T) {
    for j in 0..n {
        let coincident = (0..c).filter(|&i| distances[i * n + j] == T::zero()).count();
        if coincident > 0 {
            // Row sits on one or more centers: those centers share it.
            let share = T::one() / T::from_count(coincident);
            for i in 0..c {
                memberships[i * n + j] = if distances[i * n + j] == T::zero() {
                    share
                } else {
                    T::zero()
                };
            }
            continue;
        }

        for i in 0..c {
            let d_ij = distances[i * n + j];
            let denom = (0..c).fold(T::zero(), |acc, k| {
                acc + (d_ij / distances[k * n + j]).powf(power)
            });
            memberships[i * n + j] = T::one() / denom;
        }
    }
}

#[cfg(test)]
#[allow(clippy::needless_range_loop)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn column(values: &[f64]) -> SparseTable<f64> {
        let mut table = SparseTable::new(1);
        for &v in values {
            table.insert(0, &[Some(v)]).unwrap();
        }
        table
    }

    fn assert_partition(fit: &FcmFit<f64>) {
        for row in fit.rows() {
            let sum: f64 = (0..fit.n_clusters()).map(|i| fit.membership(i, row)).sum();
            assert!((sum - 1.0).abs() < 1e-9, "row {row} sums to {sum}");
            for i in 0..fit.n_clusters() {
                let u = fit.membership(i, row);
                assert!((0.0..=1.0).contains(&u));
            }
        }
    }

    #[test]
    fn test_fcm_two_groups() {
        let table = column(&[0.0, 0.1, 0.2, 10.0, 10.1, 10.2]);
        let mut rng = StdRng::seed_from_u64(42);
        let fit = FuzzyCMeans::new(2)
            .with_iterations(50)
            .fit(&table, 0..6, &[0], &mut rng)
            .unwrap();

        assert_partition(&fit);
        let labels = fit.hard_labels();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);

        let mut centers: Vec<f64> = (0..2).map(|i| fit.center(i)[0]).collect();
        centers.sort_by(|a, b| a.total_cmp(b));
        assert!((centers[0] - 0.1).abs() < 0.05);
        assert!((centers[1] - 10.1).abs() < 0.05);
    }

    #[test]
    fn test_fcm_single_cluster_is_mean() {
        let mut table = SparseTable::<f64>::new(2);
        table.insert(0, &[Some(1.0), Some(4.0)]).unwrap();
        table.insert(0, &[Some(2.0), Some(5.0)]).unwrap();
        table.insert(0, &[Some(6.0), Some(0.0)]).unwrap();

        for iterations in [0, 1, 10] {
            let mut rng = StdRng::seed_from_u64(7);
            let fit = FuzzyCMeans::new(1)
                .with_iterations(iterations)
                .fit(&table, 0..3, &[0, 1], &mut rng)
                .unwrap();
            for row in 0..3 {
                assert_eq!(fit.membership(0, row), 1.0);
            }
            assert!((fit.center(0)[0] - 3.0).abs() < 1e-12);
            assert!((fit.center(0)[1] - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fcm_zero_iterations_is_seed_determined() {
        let table = column(&[1.0, 2.0, 3.0]);
        let fcm = FuzzyCMeans::new(2).with_exponent(2.0).with_iterations(0);

        let a = fcm
            .fit(&table, 0..3, &[0], &mut StdRng::seed_from_u64(3))
            .unwrap();
        let b = fcm
            .fit(&table, 0..3, &[0], &mut StdRng::seed_from_u64(3))
            .unwrap();

        // Reproduce the draw order by hand: cluster-major, then per-row normalisation.
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<f64> = (0..6).map(|_| f64::sample_unit(&mut rng)).collect();
        for row in 0..3 {
            let sum = draws[row] + draws[3 + row];
            assert_eq!(a.membership(0, row), draws[row] / sum);
            assert_eq!(a.membership(1, row), draws[3 + row] / sum);
            assert_eq!(a.membership(0, row).to_bits(), b.membership(0, row).to_bits());
        }
        assert_partition(&a);
    }

    #[test]
    fn test_fcm_row_range_and_subset() {
        let mut table = SparseTable::new(3);
        table.insert(0, &[Some(100.0), None, None]).unwrap();
        table.insert(1, &[None, Some(1.0), Some(2.0)]).unwrap();
        table.insert(1, &[None, Some(3.0), Some(4.0)]).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let fit = FuzzyCMeans::new(1)
            .fit(&table, 1..3, &[1, 2], &mut rng)
            .unwrap();
        assert_eq!(fit.rows(), 1..3);
        assert_eq!(fit.attributes(), &[1, 2]);
        assert_eq!(fit.center(0), &[2.0, 3.0]);
    }

    #[test]
    fn test_fcm_coincident_rows_get_full_membership() {
        // Two distinct values, two clusters: once converged, each row sits exactly on a center.
        let table = column(&[5.0, 5.0, 9.0, 9.0]);
        let mut rng = StdRng::seed_from_u64(11);
        let fit = FuzzyCMeans::new(2)
            .with_iterations(100)
            .fit(&table, 0..4, &[0], &mut rng)
            .unwrap();
        assert_partition(&fit);
        for row in 0..4 {
            let best = (0..2).map(|i| fit.membership(i, row)).fold(0.0, f64::max);
            assert!(best > 0.99);
        }
        assert!(fit.objective() < 1e-3);
    }

    #[test]
    fn test_fcm_membership_sum_invariant_each_iteration_count() {
        let table = column(&[0.5, 1.5, 2.5, 8.0, 9.0]);
        for iterations in 0..6 {
            let mut rng = StdRng::seed_from_u64(iterations as u64);
            let fit = FuzzyCMeans::new(3)
                .with_exponent(1.5)
                .with_iterations(iterations)
                .fit(&table, 0..5, &[0], &mut rng)
                .unwrap();
            assert_partition(&fit);
        }
    }

    #[test]
    fn test_fcm_rejects_missing_cells() {
        let mut table = SparseTable::new(2);
        table.insert(0, &[Some(1.0), None]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = FuzzyCMeans::new(1)
            .fit(&table, 0..1, &[0, 1], &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::MissingValue { row: 0, attribute: 1 }));
    }

    #[test]
    fn test_fcm_invalid_params() {
        let table = column(&[1.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(0);

        assert!(FuzzyCMeans::new(0).fit(&table, 0..2, &[0], &mut rng).is_err());
        assert!(FuzzyCMeans::new(2)
            .with_exponent(1.0)
            .fit(&table, 0..2, &[0], &mut rng)
            .is_err());
        assert!(FuzzyCMeans::new(2)
            .with_exponent(f64::NAN)
            .fit(&table, 0..2, &[0], &mut rng)
            .is_err());
        assert!(matches!(
            FuzzyCMeans::new(2).fit(&table, 1..1, &[0], &mut rng),
            Err(Error::EmptyInput)
        ));
        assert!(FuzzyCMeans::new(2).fit(&table, 0..3, &[0], &mut rng).is_err());
        assert!(matches!(
            FuzzyCMeans::new(2).fit(&table, 0..2, &[1], &mut rng),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_fit_predict_labels_every_row() {
        let table = column(&[0.0, 0.2, 7.0, 7.2]);
        let mut rng = StdRng::seed_from_u64(5);
        let fcm = FuzzyCMeans::new(2).with_iterations(30);
        let labels = fcm.fit_predict(&table, &mut rng).unwrap();
        assert_eq!(labels.len(), 4);
        assert!(labels.iter().all(|&l| l < fcm.n_clusters()));
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
    }
}
