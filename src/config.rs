use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::catalog::{CatalogOptions, FilenamePattern};
use crate::core::extract::{DEFAULT_KEY_PATTERN, ExtractOptions, ParsingMode};

pub const CONFIG_FILE_NAME: &str = ".translensrc.json";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directories holding templates, relative to the project root. Globs allowed.
    #[serde(default = "default_template_roots")]
    pub template_roots: Vec<String>,
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,
    /// Template file extensions, with or without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_translation_folders", alias = "translationsFolders")]
    pub translation_folders: Vec<String>,
    #[serde(default = "default_translation_file_patterns")]
    pub translation_file_patterns: Vec<String>,
    #[serde(default)]
    pub parsing_mode: ParsingMode,
    #[serde(default = "default_domain_support")]
    pub domain_support: bool,
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,
    #[serde(default, alias = "keyLength")]
    pub key_min_length: usize,
    /// Locales every used key must be translated to.
    #[serde(default, alias = "requiredLanguages")]
    pub required_locales: Vec<String>,
}

fn default_template_roots() -> Vec<String> {
    vec!["templates".to_string()]
}

fn default_ignores() -> Vec<String> {
    ["**/node_modules/**", "**/vendor/**", "**/var/**"]
        .map(String::from)
        .to_vec()
}

fn default_extensions() -> Vec<String> {
    vec!["twig".to_string()]
}

fn default_translation_folders() -> Vec<String> {
    vec!["translations".to_string()]
}

fn default_translation_file_patterns() -> Vec<String> {
    [
        "[DOMAIN].[LOCALE].yaml",
        "[DOMAIN].[LOCALE].yml",
        "[DOMAIN].[LOCALE].json",
    ]
    .map(String::from)
    .to_vec()
}

fn default_domain_support() -> bool {
    true
}

fn default_key_pattern() -> String {
    DEFAULT_KEY_PATTERN.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_roots: default_template_roots(),
            ignores: default_ignores(),
            extensions: default_extensions(),
            translation_folders: default_translation_folders(),
            translation_file_patterns: default_translation_file_patterns(),
            parsing_mode: ParsingMode::default(),
            domain_support: default_domain_support(),
            key_pattern: default_key_pattern(),
            key_min_length: 0,
            required_locales: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error if a glob in `ignores` or `templateRoots`, the key
    /// pattern, or a translation file pattern is invalid.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Roots without wildcards are literal directories.
        for root in &self.template_roots {
            if root.contains('*') || root.contains('?') {
                Pattern::new(root).with_context(|| {
                    format!("Invalid glob pattern in 'templateRoots': \"{}\"", root)
                })?;
            }
        }

        Regex::new(&self.key_pattern)
            .with_context(|| format!("Invalid regex in 'keyPattern': \"{}\"", self.key_pattern))?;

        self.filename_patterns()?;
        Ok(())
    }

    pub fn filename_patterns(&self) -> Result<Vec<FilenamePattern>> {
        self.translation_file_patterns
            .iter()
            .map(|pattern| {
                FilenamePattern::new(pattern).with_context(|| {
                    format!(
                        "Invalid pattern in 'translationFilePatterns': \"{}\"",
                        pattern
                    )
                })
            })
            .collect()
    }

    /// Extensions without their leading dot.
    pub fn template_extensions(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Required locales, lowercased like catalog locales.
    pub fn required_locales(&self) -> Vec<String> {
        self.required_locales
            .iter()
            .map(|locale| locale.to_lowercase())
            .collect()
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            parsing_mode: self.parsing_mode,
            domain_support: self.domain_support,
            key_pattern: self.key_pattern.clone(),
            key_min_length: self.key_min_length,
        }
    }

    pub fn catalog_options(&self, root: &Path) -> Result<CatalogOptions> {
        Ok(CatalogOptions {
            parsing_mode: self.parsing_mode,
            patterns: self.filename_patterns()?,
            root: Some(root.to_path_buf()),
        })
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}
