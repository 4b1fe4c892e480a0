use crate::core::context::AnalyzedTemplate;
use crate::issues::Issue;

#[derive(Debug)]
pub enum CommandSummary {
    Check,
    Keys(KeysSummary),
    Init(InitSummary),
}

#[derive(Debug)]
pub struct KeysSummary {
    pub json: bool,
    pub templates: Vec<AnalyzedTemplate>,
}

#[derive(Debug)]
pub struct InitSummary {
    pub created: bool,
    /// Why the file was not created.
    pub error: Option<String>,
}

/// Result of running translens commands
#[derive(Debug)]
pub struct CommandResult {
    pub summary: CommandSummary,
    /// Error-severity issues, plus a refused `init`.
    pub error_count: usize,
    /// If true, exit code 1 should be returned when issues were found.
    pub exit_on_errors: bool,
    /// All issues found during the check.
    /// Empty for non-check commands.
    pub issues: Vec<Issue>,
    /// Number of files that failed to parse.
    pub parse_error_count: usize,
    /// Number of templates that were checked.
    pub source_files_checked: usize,
    /// Number of catalog files that were loaded.
    pub locale_files_checked: usize,
}
