use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use colored::Colorize;
use glob::{Pattern, glob};
use walkdir::WalkDir;

use crate::core::catalog::FilenamePattern;

/// Check if a pattern contains glob wildcards (* or ?).
/// Patterns without wildcards are treated as literal directory paths.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Result of scanning files.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: BTreeSet<PathBuf>,
    pub skipped_count: usize,
}

/// Which files of the scanned directories are wanted.
#[derive(Debug, Clone, Copy)]
pub enum FileFilter<'a> {
    /// File name ends with `.<ext>` for one of the extensions (`twig`, `html.twig`).
    Extensions(&'a [&'a str]),
    /// Trailing path matches one of the catalog file name patterns.
    Catalogs(&'a [FilenamePattern]),
}

impl FileFilter<'_> {
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            FileFilter::Extensions(extensions) => {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                extensions.iter().any(|ext| {
                    name.len() > ext.len() + 1
                        && name.ends_with(ext)
                        && name[..name.len() - ext.len()].ends_with('.')
                })
            }
            FileFilter::Catalogs(patterns) => patterns.iter().any(|p| p.matches(path).is_some()),
        }
    }
}

/// Walk `roots` below `base_dir` and collect the files `filter` accepts.
///
/// An empty `roots` scans `base_dir` itself.
pub fn scan_files(
    base_dir: &Path,
    roots: &[String],
    ignore_patterns: &[String],
    filter: FileFilter,
    verbose: bool,
) -> ScanResult {
    let mut files = BTreeSet::new();
    let mut skipped_count = 0;

    let mut literal_ignore_paths: Vec<PathBuf> = Vec::new();
    let mut glob_patterns: Vec<Pattern> = Vec::new();

    for p in ignore_patterns {
        if is_glob_pattern(p) {
            match Pattern::new(p) {
                Ok(pattern) => glob_patterns.push(pattern),
                Err(e) => {
                    if verbose {
                        eprintln!(
                            "{} Invalid ignore pattern '{}': {}",
                            "warning:".bold().yellow(),
                            p,
                            e
                        );
                    }
                }
            }
        } else {
            literal_ignore_paths.push(base_dir.join(p));
        }
    }

    let dirs_to_scan: Vec<PathBuf> = if roots.is_empty() {
        vec![base_dir.to_path_buf()]
    } else {
        let mut paths = Vec::new();
        for root in roots {
            let root = root.trim().trim_matches('/');
            if is_glob_pattern(root) {
                let full_pattern = base_dir.join(root);
                match glob(&full_pattern.to_string_lossy()) {
                    Ok(entries) => {
                        paths.extend(entries.flatten().filter(|entry| entry.is_dir()));
                    }
                    Err(e) => {
                        if verbose {
                            eprintln!(
                                "{} Invalid glob pattern '{}': {}",
                                "warning:".bold().yellow(),
                                root,
                                e
                            );
                        }
                    }
                }
            } else {
                let path = base_dir.join(root);
                if path.exists() {
                    paths.push(path);
                } else if verbose {
                    eprintln!(
                        "{} Directory does not exist: {}",
                        "warning:".bold().yellow(),
                        path.display()
                    );
                }
            }
        }
        paths
    };

    for dir in dirs_to_scan {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    skipped_count += 1;
                    if verbose {
                        eprintln!("{} Cannot access path: {}", "warning:".bold().yellow(), e);
                    }
                    continue;
                }
            };
            let path = entry.path();

            if literal_ignore_paths
                .iter()
                .any(|ignore_path| path.starts_with(ignore_path))
            {
                continue;
            }

            let path_str = path.to_string_lossy();
            if glob_patterns.iter().any(|p| p.matches(&path_str)) {
                continue;
            }

            if path.is_file() && filter.accepts(path) {
                files.insert(path.to_path_buf());
            }
        }
    }

    ScanResult {
        files,
        skipped_count,
    }
}
