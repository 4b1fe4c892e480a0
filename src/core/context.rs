use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::{
    cli::args::CommonArgs,
    config::{Config, load_config},
    core::{
        catalog::CatalogCache,
        data::Catalog,
        extract::{Document, Extraction, Extractor, build_extractors, extract_translation_keys},
        file_scanner::{FileFilter, scan_files},
        resolve::{ResolvedUsage, cross_reference},
    },
    issues::{ParseErrorFileType, ParseErrorIssue},
};

/// A template after extraction, before the catalog join.
struct ExtractedTemplate {
    file_name: String,
    text: String,
    extraction: Extraction,
}

/// A template and its resolved key usages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTemplate {
    /// Path relative to the project root.
    pub file_name: String,
    #[serde(skip)]
    pub text: String,
    pub usages: Vec<ResolvedUsage>,
}

/// Output of [`CheckContext::analyze`].
#[derive(Debug)]
pub struct Analysis {
    pub templates: Vec<AnalyzedTemplate>,
    pub catalog: Catalog,
    /// Templates that fell back to the generic scan and unreadable files.
    pub parse_errors: Vec<ParseErrorIssue>,
    pub catalog_files_checked: usize,
}

/// Configuration, scanned files and the pipeline that joins them.
///
/// Configuration priority: CLI arguments, then `.translensrc.json`, then defaults.
pub struct CheckContext {
    pub config: Config,
    /// Project root directory (for resolving relative paths).
    pub root_dir: PathBuf,
    pub templates: BTreeSet<PathBuf>,
    pub catalog_files: BTreeSet<PathBuf>,
    pub verbose: bool,
    extractors: Vec<Extractor>,
    cache: CatalogCache,
}

impl CheckContext {
    /// Load the configuration and scan templates and catalog files.
    pub fn new(common_args: &CommonArgs) -> Result<Self> {
        let verbose = common_args.verbose;
        let root_dir = common_args
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let config_result = load_config(&root_dir)?;
        if verbose && !config_result.from_file {
            eprintln!("Note: No .translensrc.json found, using default configuration");
        }
        let config = config_result.config;

        let extractors =
            build_extractors(&config.extract_options()).context("Invalid 'keyPattern'")?;
        let catalog_options = config.catalog_options(&root_dir)?;
        let extensions = config.template_extensions();

        let (template_scan, catalog_scan) = rayon::join(
            || {
                scan_files(
                    &root_dir,
                    &config.template_roots,
                    &config.ignores,
                    FileFilter::Extensions(&extensions),
                    verbose,
                )
            },
            || {
                scan_files(
                    &root_dir,
                    &config.translation_folders,
                    &config.ignores,
                    FileFilter::Catalogs(&catalog_options.patterns),
                    verbose,
                )
            },
        );

        let skipped = template_scan.skipped_count + catalog_scan.skipped_count;
        if skipped > 0 {
            eprintln!(
                "Warning: {} path(s) skipped due to access errors{}",
                skipped,
                if verbose { "" } else { " (use -v for details)" }
            );
        }
        debug!(
            templates = template_scan.files.len(),
            catalogs = catalog_scan.files.len(),
            "scanned project files"
        );

        Ok(Self {
            config,
            root_dir,
            templates: template_scan.files,
            catalog_files: catalog_scan.files,
            verbose,
            extractors,
            cache: CatalogCache::new(catalog_options),
        })
    }

    /// Only analyze `files` instead of every scanned template.
    pub fn restrict_templates(&mut self, files: &[PathBuf]) {
        self.templates = files.iter().cloned().collect();
    }

    pub fn relative_path(&self, path: &Path) -> String {
        self.cache.options().file_name(path)
    }

    /// Extract keys from every template while loading the catalogs, then join both.
    pub fn analyze(&mut self) -> Analysis {
        let extractors = &self.extractors;
        let templates = &self.templates;
        let catalog_files = &self.catalog_files;
        let cache = &mut self.cache;
        let verbose = self.verbose;

        let (extracted, catalog_errors) = rayon::join(
            || {
                templates
                    .par_iter()
                    .map(|path| extract_template(extractors, path))
                    .collect::<Vec<_>>()
            },
            || load_catalogs(cache, catalog_files),
        );

        let mut parse_errors = catalog_errors;
        let catalog = self.cache.snapshot().clone();
        let mut analyzed = Vec::new();

        for result in extracted {
            let template = match result {
                Ok(template) => template,
                Err(issue) => {
                    parse_errors.push(issue);
                    continue;
                }
            };
            let file_name = self.relative_path(Path::new(&template.file_name));

            if let Some(error) = template.extraction.errors.first() {
                if verbose {
                    eprintln!("Warning: {} - {}", file_name, error);
                }
                parse_errors.push(ParseErrorIssue {
                    file_path: file_name.clone(),
                    error: error.clone(),
                    file_type: ParseErrorFileType::Template,
                });
            }

            analyzed.push(AnalyzedTemplate {
                usages: cross_reference(template.extraction.keys, &catalog),
                file_name,
                text: template.text,
            });
        }

        for issue in &mut parse_errors {
            issue.file_path = self.relative_path(Path::new(&issue.file_path));
        }

        Analysis {
            templates: analyzed,
            catalog,
            parse_errors,
            catalog_files_checked: self.catalog_files.len(),
        }
    }
}

/// Editor-style language id of a template file.
pub fn language_id(path: &Path) -> &str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".twig") {
        return "twig";
    }
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

fn extract_template(
    extractors: &[Extractor],
    path: &Path,
) -> Result<ExtractedTemplate, ParseErrorIssue> {
    let text = fs::read_to_string(path).map_err(|err| ParseErrorIssue {
        file_path: path.to_string_lossy().into_owned(),
        error: format!("Failed to read file: {}", err),
        file_type: ParseErrorFileType::Template,
    })?;

    let extraction = extract_translation_keys(extractors, &Document::new(language_id(path), &text));
    Ok(ExtractedTemplate {
        file_name: path.to_string_lossy().into_owned(),
        text,
        extraction,
    })
}

/// Refresh the cache from disk. Returns the files that could not be read or parsed.
fn load_catalogs(cache: &mut CatalogCache, files: &BTreeSet<PathBuf>) -> Vec<ParseErrorIssue> {
    let texts: Vec<(&PathBuf, std::io::Result<String>)> = files
        .par_iter()
        .map(|path| (path, fs::read_to_string(path)))
        .collect();

    let paths: Vec<PathBuf> = files.iter().cloned().collect();
    cache.retain(&paths);

    let mut errors = Vec::new();
    for (path, text) in texts {
        match text {
            Ok(text) => {
                cache.update(path, &text);
            }
            Err(err) => {
                cache.invalidate(path);
                errors.push(ParseErrorIssue {
                    file_path: path.to_string_lossy().into_owned(),
                    error: format!("Failed to read file: {}", err),
                    file_type: ParseErrorFileType::Catalog,
                });
            }
        }
    }

    errors.extend(cache.errors().map(|(path, err)| ParseErrorIssue {
        file_path: path.to_string_lossy().into_owned(),
        error: err.to_string(),
        file_type: ParseErrorFileType::Catalog,
    }));
    errors
}
