use rand::Rng;
use tracing::info;

use super::fcm::FuzzyCMeans;
use super::traits::Clustering;
use crate::error::Result;
use crate::table::{Scalar, SparseTable};

/// Crisp grouping of a whole table: FCM over every row and attribute, then each
/// row is relabelled with its highest-membership cluster.
#[derive(Debug, Clone, Default)]
pub struct Grouper {
    fcm: FuzzyCMeans,
}

impl Grouper {
    /// Group with the given FCM settings.
    pub fn new(fcm: FuzzyCMeans) -> Self {
        Self { fcm }
    }

    /// Cluster `table` and overwrite every row's source tag with its cluster.
    ///
    /// Returns the labels that were written. The table must be fully observed.
    pub fn group<T: Scalar, R: Rng>(
        &self,
        table: &mut SparseTable<T>,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let labels = self.fcm.fit_predict(table, rng)?;
        for (row, &label) in labels.iter().enumerate() {
            table.relabel_source(row, label);
        }
        info!(
            rows = labels.len(),
            clusters = self.fcm.n_clusters(),
            "grouped table"
        );
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_group_relabels_rows() {
        let mut table = SparseTable::new(2);
        table.insert(0, &[Some(0.0), Some(0.0)]).unwrap();
        table.insert(0, &[Some(0.1), Some(0.0)]).unwrap();
        table.insert(1, &[Some(9.0), Some(9.0)]).unwrap();
        table.insert(2, &[Some(9.1), Some(9.0)]).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let labels = Grouper::new(FuzzyCMeans::new(2).with_iterations(30))
            .group(&mut table, &mut rng)
            .unwrap();

        assert_eq!(labels.len(), 4);
        for (row, &label) in labels.iter().enumerate() {
            assert_eq!(table.source(row), label);
        }
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_group_single_cluster() {
        let mut table = SparseTable::new(1);
        table.insert(0, &[Some(1.0f32)]).unwrap();
        table.insert(1, &[Some(2.0)]).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let labels = Grouper::new(FuzzyCMeans::new(1))
            .group(&mut table, &mut rng)
            .unwrap();
        assert_eq!(labels, vec![0, 0]);
        assert_eq!(table.source(1), 0);
    }

    #[test]
    fn test_group_requires_complete_table() {
        let mut table = SparseTable::new(2);
        table.insert(0, &[Some(1.0), None]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Grouper::default().group(&mut table, &mut rng),
            Err(Error::MissingValue { .. })
        ));
        assert_eq!(table.source(0), 0);
    }
}
