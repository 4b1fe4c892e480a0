use std::collections::{BTreeMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::CatalogError;
use super::loader::{CatalogOptions, parse_catalog_file};
use crate::core::data::Catalog;

#[derive(Debug)]
struct CachedFile {
    fingerprint: u64,
    catalog: Catalog,
    error: Option<CatalogError>,
}

/// Per-file catalogs and their merge.
///
/// Files are re-parsed only when their text changes. The unified catalog is
/// rebuilt on the next [`snapshot`](Self::snapshot) after any change, merging
/// files in path order.
#[derive(Debug)]
pub struct CatalogCache {
    options: CatalogOptions,
    files: BTreeMap<PathBuf, CachedFile>,
    merged: Option<Catalog>,
}

impl CatalogCache {
    pub fn new(options: CatalogOptions) -> Self {
        Self {
            options,
            files: BTreeMap::new(),
            merged: None,
        }
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Store the catalog of `path`. Returns whether anything changed.
    ///
    /// A file that fails to parse is kept with an empty catalog and its error.
    pub fn update(&mut self, path: &Path, text: &str) -> bool {
        let fingerprint = fingerprint(text);
        if self
            .files
            .get(path)
            .is_some_and(|file| file.fingerprint == fingerprint)
        {
            return false;
        }

        let (catalog, error) = match parse_catalog_file(text, path, &self.options) {
            Ok(catalog) => (catalog, None),
            Err(err) => {
                warn!(file = %path.display(), %err, "failed to parse catalog file");
                (Catalog::new(), Some(err))
            }
        };
        debug!(file = %path.display(), keys = catalog.len(), "catalog cache updated");

        self.files.insert(
            path.to_path_buf(),
            CachedFile {
                fingerprint,
                catalog,
                error,
            },
        );
        self.merged = None;
        true
    }

    /// Forget `path`. Returns whether it was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.files.remove(path).is_some();
        if removed {
            self.merged = None;
        }
        removed
    }

    /// Forget every file not in `paths`, e.g. after a rescan found files deleted.
    pub fn retain(&mut self, paths: &[PathBuf]) {
        let keep: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let before = self.files.len();
        self.files.retain(|path, _| keep.contains(path.as_path()));
        if self.files.len() != before {
            self.merged = None;
        }
    }

    /// The unified catalog of every cached file.
    pub fn snapshot(&mut self) -> &Catalog {
        let files = &self.files;
        self.merged.get_or_insert_with(|| {
            let mut merged = Catalog::new();
            for file in files.values() {
                merged.merge(&file.catalog);
            }
            merged
        })
    }

    pub fn is_catalog_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Files whose last update failed to parse.
    pub fn errors(&self) -> impl Iterator<Item = (&Path, &CatalogError)> {
        self.files
            .iter()
            .filter_map(|(path, file)| file.error.as_ref().map(|err| (path.as_path(), err)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
