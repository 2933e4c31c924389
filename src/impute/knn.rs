//! K-nearest-neighbour imputation over partially observed rows.
//!
//! ## Distance
//!
//! Two rows are compared only on the attributes both of them observe:
//!
//! ```text
//! d(a, b) = (A / |O|) · Σ_{i ∈ O} (a_i - b_i)²,   O = observed(a) ∩ observed(b)
//! ```
//!
//! where `A` is the table's attribute count. The `A / |O|` factor keeps pairs
//! with small overlap from looking artificially close. With no overlap at all the
//! distance is `T::max_value()`, and such a pair is never used as a donor.
//!
//! ## Donors
//!
//! A missing cell `(row, attr)` is filled with the mean of up to `k` nearest rows
//! that observe `attr`. Rows from the recipient's own source are consulted only
//! when no other source can donate, since rows of one source usually share the
//! same gaps.
//!
//! Donors are scanned in row order and a candidate displaces the current worst
//! only when strictly closer, so equal distances resolve to the lowest row index.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::table::{Scalar, SparseTable};

/// KNN imputer.
#[derive(Debug, Clone)]
pub struct KnnImputer {
    k: usize,
    exclude_same_source: bool,
}

impl KnnImputer {
    /// Impute from the `k` nearest donors, preferring other sources.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            exclude_same_source: true,
        }
    }

    /// Whether same-source rows are held back as fallback donors (default `true`).
    ///
    /// With `false`, every row competes on distance alone.
    pub fn with_source_exclusion(mut self, exclude: bool) -> Self {
        self.exclude_same_source = exclude;
        self
    }

    /// Neighbour count.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Fill every missing cell of `table`, returning a new table.
    ///
    /// Cells for which no row can donate stay missing and are listed in
    /// [`Imputed::unfilled`].
    pub fn impute<T: Scalar>(&self, table: &SparseTable<T>) -> Result<Imputed<T>> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }

        let n = table.len();
        let mut out = table.clone();
        let mut unfilled = Vec::new();
        let mut filled = 0usize;

        for row in 0..n {
            let missing: Vec<usize> = (0..table.num_attributes())
                .filter(|&attribute| table.get(row, attribute).is_none())
                .collect();
            if missing.is_empty() {
                continue;
            }

            let mut cross = vec![Nearest::new(self.k); missing.len()];
            let mut same = vec![Nearest::new(self.k); missing.len()];

            for donor in (0..n).filter(|&donor| donor != row) {
                let distance = partial_distance(table, row, donor);
                if distance == T::max_value() {
                    continue;
                }
                let pool = if self.exclude_same_source && table.source(donor) == table.source(row)
                {
                    &mut same
                } else {
                    &mut cross
                };
                for (nearest, &attribute) in pool.iter_mut().zip(&missing) {
                    if table.get(donor, attribute).is_some() {
                        nearest.offer(distance, donor);
                    }
                }
            }

            for ((&attribute, cross), same) in missing.iter().zip(&cross).zip(&same) {
                let donors = if cross.is_empty() { same } else { cross };
                match donors.mean(table, attribute) {
                    Some(value) => {
                        out.set(row, attribute, value);
                        filled += 1;
                    }
                    None => unfilled.push((row, attribute)),
                }
            }
        }

        debug!(k = self.k, filled, "knn imputation finished");
        if !unfilled.is_empty() {
            warn!(
                count = unfilled.len(),
                "cells left missing: no row observes the attribute with any overlap"
            );
        }
        Ok(Imputed {
            table: out,
            unfilled,
        })
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Output of [`KnnImputer::impute`].
#[derive(Debug, Clone)]
pub struct Imputed<T> {
    /// Copy of the input with every fillable cell filled.
    pub table: SparseTable<T>,
    /// `(row, attribute)` cells that had no donor and are still missing.
    pub unfilled: Vec<(usize, usize)>,
}

impl<T: Scalar> Imputed<T> {
    /// Whether every cell was filled.
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_empty()
    }

    /// The imputed table, or [`Error::UnfilledCells`] if any cell stayed missing.
    pub fn into_complete(self) -> Result<SparseTable<T>> {
        if self.unfilled.is_empty() {
            Ok(self.table)
        } else {
            Err(Error::UnfilledCells {
                count: self.unfilled.len(),
            })
        }
    }
}

/// Overlap-normalised squared distance between rows `a` and `b`.
///
/// Returns `T::max_value()` when the rows share no observed attribute.
pub fn partial_distance<T: Scalar>(table: &SparseTable<T>, a: usize, b: usize) -> T {
    let (mut sum, mut overlap) = (T::zero(), 0usize);
    for (&x, &y) in table.cells(a).iter().zip(table.cells(b)) {
        if !x.is_nan() && !y.is_nan() {
            let d = x - y;
            sum = sum + d * d;
            overlap += 1;
        }
    }
    if overlap == 0 {
        return T::max_value();
    }
    sum * T::from_count(table.num_attributes()) / T::from_count(overlap)
}

/// The `k` closest donors offered so far.
#[derive(Debug, Clone)]
struct Nearest<T> {
    k: usize,
    items: Vec<(T, usize)>,
}

impl<T: Scalar> Nearest<T> {
    fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn offer(&mut self, distance: T, row: usize) {
        if self.items.len() < self.k {
            self.items.push((distance, row));
            return;
        }
        // Worst = farthest, and among equally far, the highest row index.
        let worst = self
            .items
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            })
            .map(|(i, _)| i);
        if let Some(i) = worst {
            if distance < self.items[i].0 {
                self.items[i] = (distance, row);
            }
        }
    }

    fn mean(&self, table: &SparseTable<T>, attribute: usize) -> Option<T> {
        let (sum, count) = self
            .items
            .iter()
            .filter_map(|&(_, row)| table.get(row, attribute))
            .fold((T::zero(), 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / T::from_count(count))
    }

    #[cfg(test)]
    fn rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.items.iter().map(|&(_, r)| r).collect();
        rows.sort_unstable();
        rows
    }
}
