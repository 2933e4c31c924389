//! Source-tagged, partially observed row storage.
//!
//! A [`SparseTable`] is a dense `rows × attributes` array in which any cell may be
//! missing. Every row carries a *source* tag naming where it came from (the input
//! file, or after [`Grouper`](crate::cluster::Grouper) runs, its cluster id).
//!
//! ## Invariants
//!
//! - Every row has at least one observed attribute.
//! - Source tags are non-decreasing across rows and never skip a value, so all
//!   rows of one source form a contiguous range (see [`SparseTable::source_range`]).
//!   [`SparseTable::relabel_source`] is the only operation allowed to break this.
//!
//! Missing cells are stored as NaN, but the public API only ever hands out
//! `Option<T>`.

mod load;

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use num_traits::Float;
use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};

/// Floating-point element type of a [`SparseTable`].
pub trait Scalar: Float + FromStr + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Draw a value uniformly from `[0, 1)`.
    fn sample_unit<R: Rng>(rng: &mut R) -> Self;

    /// Convert a count (row or attribute total).
    fn from_count(n: usize) -> Self;

    /// Convert a configuration parameter.
    fn from_f64(x: f64) -> Self;
}

impl Scalar for f32 {
    fn sample_unit<R: Rng>(rng: &mut R) -> Self {
        rng.random::<f32>()
    }

    fn from_count(n: usize) -> Self {
        n as f32
    }

    fn from_f64(x: f64) -> Self {
        x as f32
    }
}

impl Scalar for f64 {
    fn sample_unit<R: Rng>(rng: &mut R) -> Self {
        rng.random::<f64>()
    }

    fn from_count(n: usize) -> Self {
        n as f64
    }

    fn from_f64(x: f64) -> Self {
        x
    }
}

/// Rectangular records contributed by one source.
///
/// `values` is row-major with width `attributes.len()`: value `c` of row `r`
/// belongs to attribute `attributes[c]`.
#[derive(Clone, Debug, Default)]
pub struct SourceData<T> {
    /// Attribute index of each column.
    pub attributes: Vec<usize>,
    /// Flattened cell values.
    pub values: Vec<T>,
}

impl<T> SourceData<T> {
    /// Pair an attribute list with its flattened values.
    pub fn new(attributes: Vec<usize>, values: Vec<T>) -> Self {
        Self { attributes, values }
    }
}

/// Dense-backed sparse table with one source tag per row.
#[derive(Clone, Debug)]
pub struct SparseTable<T> {
    num_attributes: usize,
    data: Vec<T>,
    sources: Vec<usize>,
}

impl<T: Scalar> SparseTable<T> {
    /// Create an empty table with a fixed attribute count.
    pub fn new(num_attributes: usize) -> Self {
        Self {
            num_attributes,
            data: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Build a table from per-source records.
    ///
    /// The attribute count is the largest attribute index seen plus one. Sources
    /// are tagged `0, 1, ...` in iteration order.
    pub fn from_sources<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = SourceData<T>>,
    {
        let sources: Vec<SourceData<T>> = sources.into_iter().collect();
        if sources.is_empty() {
            return Err(Error::EmptyInput);
        }

        let num_attributes = sources
            .iter()
            .flat_map(|s| s.attributes.iter().copied())
            .max()
            .map_or(0, |max| max + 1);
        debug!(num_attributes, sources = sources.len(), "building sparse table");

        let mut table = Self::new(num_attributes);
        let mut row = vec![None; num_attributes];

        for (source_id, source) in sources.iter().enumerate() {
            let width = source.attributes.len();
            if width == 0 {
                return Err(Error::InvalidParameter {
                    name: "attributes",
                    message: "source declares no attributes",
                });
            }
            if source.values.len() % width != 0 {
                return Err(Error::RaggedSource {
                    source_id,
                    values: source.values.len(),
                    width,
                });
            }
            if source.values.is_empty() {
                return Err(Error::InvalidParameter {
                    name: "values",
                    message: "source contributes no rows",
                });
            }

            debug!(
                source = source_id,
                rows = source.values.len() / width,
                width,
                "loading source"
            );
            for record in source.values.chunks_exact(width) {
                row.fill(None);
                for (&attribute, &value) in source.attributes.iter().zip(record) {
                    row[attribute] = Some(value);
                }
                table.insert(source_id, &row)?;
            }
        }

        Ok(table)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of attributes (columns).
    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    /// One past the largest source tag, or 0 for an empty table.
    pub fn num_sources(&self) -> usize {
        self.sources.last().map_or(0, |&s| s + 1)
    }

    /// Read a cell; `None` if missing.
    ///
    /// # Panics
    ///
    /// If `row` or `attribute` is out of range.
    pub fn get(&self, row: usize, attribute: usize) -> Option<T> {
        let value = self.data[self.index(row, attribute)];
        (!value.is_nan()).then_some(value)
    }

    /// Overwrite a cell. Writing NaN marks the cell missing.
    ///
    /// # Panics
    ///
    /// If `row` or `attribute` is out of range.
    pub fn set(&mut self, row: usize, attribute: usize, value: T) {
        let idx = self.index(row, attribute);
        self.data[idx] = value;
    }

    /// Append a row tagged with `source`.
    ///
    /// `source` must equal the last row's tag or exceed it by one (any tag is
    /// accepted for the first row), and at least one cell must be observed.
    pub fn insert(&mut self, source: usize, row: &[Option<T>]) -> Result<()> {
        if row.len() != self.num_attributes {
            return Err(Error::DimensionMismatch {
                expected: self.num_attributes,
                found: row.len(),
            });
        }
        if let Some(&last) = self.sources.last() {
            if source != last && source != last + 1 {
                return Err(Error::SourceOrder {
                    last,
                    found: source,
                });
            }
        }
        if !row.iter().flatten().any(|v| !v.is_nan()) {
            return Err(Error::EmptyRow { row: self.len() });
        }

        self.data
            .extend(row.iter().map(|v| v.unwrap_or_else(T::nan)));
        self.sources.push(source);
        Ok(())
    }

    /// Source tag of a row.
    ///
    /// # Panics
    ///
    /// If `row` is out of range.
    pub fn source(&self, row: usize) -> usize {
        self.sources[row]
    }

    /// Rows tagged `source`, as a half-open index range (empty if none).
    ///
    /// Relies on tags being sorted; meaningless after [`relabel_source`](Self::relabel_source).
    pub fn source_range(&self, source: usize) -> Range<usize> {
        let begin = self.sources.partition_point(|&s| s < source);
        let end = self.sources.partition_point(|&s| s <= source);
        begin..end
    }

    /// Attribute indices observed in a row, ascending.
    pub fn observed_attributes(&self, row: usize) -> Vec<usize> {
        (0..self.num_attributes)
            .filter(|&attribute| self.get(row, attribute).is_some())
            .collect()
    }

    /// Replace a row's source tag with a cluster label.
    ///
    /// After this call tags are labels, not provenance, and are no longer sorted.
    pub fn relabel_source(&mut self, row: usize, label: usize) {
        self.sources[row] = label;
    }

    /// Copy of one row's cells.
    pub fn row(&self, row: usize) -> Vec<Option<T>> {
        (0..self.num_attributes)
            .map(|attribute| self.get(row, attribute))
            .collect()
    }

    /// Number of missing cells in the whole table.
    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Check both table invariants: every row observed, tags sorted.
    pub fn is_valid(&self) -> bool {
        let rows_observed = (0..self.len()).all(|row| {
            (0..self.num_attributes).any(|attribute| self.get(row, attribute).is_some())
        });
        rows_observed && self.sources.windows(2).all(|w| w[0] <= w[1])
    }

    /// Raw cells of a row, NaN where missing.
    pub(crate) fn cells(&self, row: usize) -> &[T] {
        let start = self.index(row, 0);
        &self.data[start..start + self.num_attributes]
    }

    fn index(&self, row: usize, attribute: usize) -> usize {
        assert!(
            row < self.len(),
            "row {row} out of range for table with {} rows",
            self.len()
        );
        assert!(
            attribute < self.num_attributes,
            "attribute {attribute} out of range for table with {} attributes",
            self.num_attributes
        );
        row * self.num_attributes + attribute
    }
}

impl<T: Scalar> PartialEq for SparseTable<T> {
    /// Cell-wise equality where two missing cells compare equal.
    fn eq(&self, other: &Self) -> bool {
        self.num_attributes == other.num_attributes
            && self.sources == other.sources
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a.is_nan() && b.is_nan()) || a == b)
    }
}

impl<T: Scalar> fmt::Display for SparseTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Sparse Dataset - {} entries, max attributes: {}",
            self.len(),
            self.num_attributes
        )?;
        for row in 0..self.len() {
            write!(f, "[{:02}] {:>4}) ", self.source(row), row)?;
            for attribute in 0..self.num_attributes {
                match (self.get(row, attribute), f.precision()) {
                    (Some(v), Some(p)) => write!(f, "{v:>10.p$}")?,
                    (Some(v), None) => write!(f, "{v:>10}")?,
                    (None, _) => write!(f, "{:>10}", "??")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sources() -> SparseTable<f64> {
        SparseTable::from_sources(vec![
            SourceData::new(vec![0, 2], vec![1.0, 2.0, 3.0, 4.0]),
            SourceData::new(vec![1], vec![5.0, 6.0, 7.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_load_infers_shape_and_tags() {
        let table = two_sources();
        assert_eq!(table.num_attributes(), 3);
        assert_eq!(table.len(), 5);
        assert_eq!(table.num_sources(), 2);
        assert_eq!(table.get(0, 0), Some(1.0));
        assert_eq!(table.get(0, 1), None);
        assert_eq!(table.get(1, 2), Some(4.0));
        assert_eq!(table.get(4, 1), Some(7.0));
        assert_eq!(table.source(1), 0);
        assert_eq!(table.source(2), 1);
        assert!(table.is_valid());
        assert_eq!(table.missing_count(), 2 + 3 * 2);
    }

    #[test]
    fn test_load_rejects_ragged_source() {
        let err = SparseTable::<f64>::from_sources(vec![SourceData::new(
            vec![0, 1],
            vec![1.0, 2.0, 3.0],
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedSource {
                source_id: 0,
                values: 3,
                width: 2
            }
        ));
    }

    #[test]
    fn test_load_rejects_fully_missing_row() {
        let err = SparseTable::from_sources(vec![SourceData::new(
            vec![0, 1],
            vec![1.0, 2.0, f64::NAN, f64::NAN],
        )])
        .unwrap_err();
        assert!(matches!(err, Error::EmptyRow { row: 1 }));
    }

    #[test]
    fn test_load_rejects_empty_input() {
        let sources: Vec<SourceData<f32>> = Vec::new();
        assert!(matches!(
            SparseTable::from_sources(sources),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_insert_enforces_source_order() {
        let mut table = SparseTable::<f32>::new(2);
        table.insert(0, &[Some(1.0), None]).unwrap();
        table.insert(0, &[None, Some(1.0)]).unwrap();
        table.insert(1, &[Some(2.0), Some(2.0)]).unwrap();

        let err = table.insert(3, &[Some(1.0), None]).unwrap_err();
        assert!(matches!(err, Error::SourceOrder { last: 1, found: 3 }));
        let err = table.insert(0, &[Some(1.0), None]).unwrap_err();
        assert!(matches!(err, Error::SourceOrder { last: 1, found: 0 }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_insert_rejects_bad_rows() {
        let mut table = SparseTable::<f32>::new(2);
        assert!(matches!(
            table.insert(0, &[None, None]),
            Err(Error::EmptyRow { row: 0 })
        ));
        assert!(matches!(
            table.insert(0, &[Some(f32::NAN), None]),
            Err(Error::EmptyRow { row: 0 })
        ));
        assert!(matches!(
            table.insert(0, &[Some(1.0)]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_source_range() {
        let table = two_sources();
        assert_eq!(table.source_range(0), 0..2);
        assert_eq!(table.source_range(1), 2..5);
        assert!(table.source_range(2).is_empty());
    }

    #[test]
    fn test_observed_attributes() {
        let table = two_sources();
        assert_eq!(table.observed_attributes(0), vec![0, 2]);
        assert_eq!(table.observed_attributes(3), vec![1]);
    }

    #[test]
    fn test_set_and_relabel() {
        let mut table = two_sources();
        table.set(0, 1, 9.0);
        assert_eq!(table.get(0, 1), Some(9.0));
        table.set(0, 1, f64::NAN);
        assert_eq!(table.get(0, 1), None);

        table.relabel_source(0, 7);
        assert_eq!(table.source(0), 7);
        assert!(!table.is_valid());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range_panics() {
        let table = two_sources();
        let _ = table.get(0, 3);
    }

    #[test]
    fn test_equality_treats_missing_as_equal() {
        let a = two_sources();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.set(0, 0, 1.5);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let mut table = SparseTable::<f64>::new(2);
        table.insert(0, &[Some(1.5), None]).unwrap();
        let rendered = format!("{table:.2}");
        assert_eq!(
            rendered,
            "Sparse Dataset - 1 entries, max attributes: 2\n[00]    0)       1.50        ??\n"
        );
    }
}
