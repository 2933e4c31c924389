use crate::error::{Error, Result};
use crate::table::{Scalar, SparseTable};
use std::ops::Range;

#[inline]
pub(crate) fn squared_euclidean<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).fold(T::zero(), |acc, (&x, &y)| {
        let d = x - y;
        acc + d * d
    })
}

/// Copy the selected cells into dense row-major storage (`rows.len() × attributes.len()`).
///
/// Every selected cell must be observed.
pub(crate) fn gather<T: Scalar>(
    table: &SparseTable<T>,
    rows: Range<usize>,
    attributes: &[usize],
) -> Result<Vec<T>> {
    let mut flat = Vec::with_capacity(rows.len() * attributes.len());
    for row in rows {
        let cells = table.cells(row);
        for &attribute in attributes {
            let value = cells[attribute];
            if value.is_nan() {
                return Err(Error::MissingValue { row, attribute });
            }
            flat.push(value);
        }
    }
    Ok(flat)
}

/// Index of the first maximum.
pub(crate) fn argmax<T: Scalar>(values: impl IntoIterator<Item = T>) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}
