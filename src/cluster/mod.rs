//! Fuzzy clustering over sparse tables.
//!
//! ## Hard vs Soft Clustering
//!
//! **Hard clustering** assigns each row to exactly one cluster. **Soft
//! clustering** gives each row a membership in every cluster, summing to 1.
//! Everything here starts soft (fuzzy c-means) and hardens only at the end.
//!
//! ## Pieces
//!
//! - [`FuzzyCMeans`]: the FCM engine. Works on a contiguous row range and an
//!   attribute subset, returning an [`FcmFit`] with memberships and centers.
//! - [`Granulator`]: per-source data reduction. Each source is replaced by a few
//!   prototype rows (its FCM centers), keeping the source tag.
//! - [`Grouper`]: final crisp clustering. FCM over the whole table, then each
//!   row's source tag is overwritten with its highest-membership cluster.
//!
//! ## Usage
//!
//! ```rust
//! use granule::cluster::{FuzzyCMeans, Grouper};
//! use granule::SparseTable;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut table = SparseTable::new(2);
//! table.insert(0, &[Some(0.0), Some(0.0)]).unwrap();
//! table.insert(0, &[Some(0.1), Some(0.1)]).unwrap();
//! table.insert(1, &[Some(10.0), Some(10.0)]).unwrap();
//! table.insert(1, &[Some(10.1), Some(10.1)]).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let labels = Grouper::new(FuzzyCMeans::new(2).with_iterations(30))
//!     .group(&mut table, &mut rng)
//!     .unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! assert_eq!(table.source(2), labels[2]);
//! ```

mod fcm;
mod granulate;
mod group;
mod traits;
mod util;

pub use fcm::{FcmFit, FuzzyCMeans};
pub use granulate::Granulator;
pub use group::Grouper;
pub use traits::Clustering;
