//! Per-cluster summaries of a grouped table.

use std::fmt;

use serde::Serialize;

use crate::table::{Scalar, SparseTable};

/// Size and spread of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary<T> {
    /// Cluster label.
    pub cluster: usize,
    /// Number of rows labelled with this cluster.
    pub count: usize,
    /// Population variance per attribute, `None` where no row observes it.
    pub variance: Vec<Option<T>>,
}

/// Summarise a table whose source tags are cluster labels (see
/// [`Grouper`](crate::cluster::Grouper)).
///
/// One summary per label in `0..n_clusters`, extended if the table holds
/// larger labels. Empty clusters get a zero count.
pub fn summarize<T: Scalar>(table: &SparseTable<T>, n_clusters: usize) -> Vec<ClusterSummary<T>> {
    let n_labels = (0..table.len())
        .map(|row| table.source(row) + 1)
        .max()
        .unwrap_or(0)
        .max(n_clusters);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_labels];
    for row in 0..table.len() {
        members[table.source(row)].push(row);
    }

    members
        .iter()
        .enumerate()
        .map(|(cluster, rows)| ClusterSummary {
            cluster,
            count: rows.len(),
            variance: (0..table.num_attributes())
                .map(|attribute| {
                    variance(rows.iter().filter_map(|&row| table.get(row, attribute)))
                })
                .collect(),
        })
        .collect()
}

fn variance<T: Scalar>(values: impl Iterator<Item = T> + Clone) -> Option<T> {
    let (sum, count) = values
        .clone()
        .fold((T::zero(), 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        return None;
    }
    let n = T::from_count(count);
    let mean = sum / n;
    let squares = values.fold(T::zero(), |acc, v| acc + (v - mean) * (v - mean));
    Some(squares / n)
}

impl<T: Scalar> fmt::Display for ClusterSummary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster {:>3}: {:>6} items, variance [", self.cluster, self.count)?;
        for (i, v) in self.variance.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match (v, f.precision()) {
                (Some(v), Some(p)) => write!(f, "{v:.p$}")?,
                (Some(v), None) => write!(f, "{v}")?,
                (None, _) => write!(f, "-")?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_counts_and_variance() {
        let mut table = SparseTable::new(2);
        table.insert(0, &[Some(1.0), Some(5.0)]).unwrap();
        table.insert(0, &[Some(3.0), None]).unwrap();
        table.insert(1, &[Some(7.0), Some(2.0)]).unwrap();
        table.relabel_source(2, 0);
        table.relabel_source(0, 1);

        let summaries = summarize(&table, 3);
        assert_eq!(summaries.len(), 3);

        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].variance, vec![Some(4.0), Some(0.0)]);
        assert_eq!(summaries[1].count, 1);
        assert_eq!(summaries[1].variance, vec![Some(0.0), Some(0.0)]);
        assert_eq!(summaries[2].count, 0);
        assert_eq!(summaries[2].variance, vec![None, None]);
    }

    #[test]
    fn test_summarize_extends_past_requested_clusters() {
        let mut table = SparseTable::new(1);
        table.insert(4, &[Some(1.0f32)]).unwrap();
        let summaries = summarize(&table, 2);
        assert_eq!(summaries.len(), 5);
        assert_eq!(summaries[4].count, 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = ClusterSummary {
            cluster: 1,
            count: 12,
            variance: vec![Some(0.5f64), None],
        };
        assert_eq!(
            format!("{summary:.2}"),
            "cluster   1:     12 items, variance [0.50, -]"
        );
    }
}
