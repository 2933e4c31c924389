//! Loading a table from a directory of `.attr` / `.data` file pairs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::{Scalar, SourceData, SparseTable};
use crate::error::{Error, Result};

#[derive(Default)]
struct SourceFiles {
    attr: Option<PathBuf>,
    data: Option<PathBuf>,
}

impl<T: Scalar> SparseTable<T> {
    /// Load every `<name>.attr` / `<name>.data` pair in `dir` as one source.
    ///
    /// Pairs are processed in sorted path order, so source tags are stable across
    /// runs. Other files are ignored.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: BTreeMap<PathBuf, SourceFiles> = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|source| Error::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            let slot = match path.extension().and_then(|e| e.to_str()) {
                Some("attr") => &mut files.entry(path.with_extension("")).or_default().attr,
                Some("data") => &mut files.entry(path.with_extension("")).or_default().data,
                _ => {
                    warn!(path = %path.display(), "unrecognized file in dataset");
                    continue;
                }
            };
            debug!(path = %path.display(), "found dataset file");
            *slot = Some(path);
        }

        let mut sources = Vec::with_capacity(files.len());
        for (stem, pair) in files {
            let (Some(attr), Some(data)) = (pair.attr, pair.data) else {
                warn!(stem = %stem.display(), "incomplete file pair");
                return Err(Error::InvalidParameter {
                    name: "dataset",
                    message: "every .attr file needs a matching .data file and vice versa",
                });
            };
            let attributes: Vec<usize> = read_tokens(&attr)?;
            let values: Vec<T> = read_tokens(&data)?;
            info!(
                source = sources.len(),
                path = %stem.display(),
                attributes = attributes.len(),
                values = values.len(),
                "loaded source files"
            );
            sources.push(SourceData::new(attributes, values));
        }

        Self::from_sources(sources)
    }
}

fn read_tokens<V: FromStr>(path: &Path) -> Result<Vec<V>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    text.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| Error::Parse {
                path: path.to_path_buf(),
                token: token.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_dir_pairs_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.attr", "2\n");
        write(dir.path(), "b.data", "7\n8\n");
        write(dir.path(), "a.attr", "0 1");
        write(dir.path(), "a.data", "1 2\n3 nan\n");
        write(dir.path(), "README", "ignored");

        let table = SparseTable::<f32>::load_dir(dir.path()).unwrap();
        assert_eq!(table.num_attributes(), 3);
        assert_eq!(table.len(), 4);
        assert_eq!(table.source_range(0), 0..2);
        assert_eq!(table.source_range(1), 2..4);
        assert_eq!(table.get(1, 0), Some(3.0));
        assert_eq!(table.get(1, 1), None);
        assert_eq!(table.get(3, 2), Some(8.0));
        assert_eq!(table.get(3, 0), None);
    }

    #[test]
    fn test_load_dir_rejects_unpaired_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.attr", "0");
        assert!(matches!(
            SparseTable::<f32>::load_dir(dir.path()),
            Err(Error::InvalidParameter { name: "dataset", .. })
        ));
    }

    #[test]
    fn test_load_dir_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.attr", "0 x");
        write(dir.path(), "a.data", "1 2");
        let err = SparseTable::<f32>::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Parse { ref token, .. } if token == "x"));
    }

    #[test]
    fn test_load_dir_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SparseTable::<f32>::load_dir(dir.path()),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            SparseTable::<f32>::load_dir(&missing),
            Err(Error::Io { .. })
        ));
    }
}
