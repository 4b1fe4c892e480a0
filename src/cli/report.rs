//! Report formatting and printing utilities.
//!
//! Issues are displayed in cargo-style format. Kept apart from the core so
//! that translens can be used as a library.

use std::io::{self, Write};

use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::commands::{CommandResult, CommandSummary, InitSummary, KeysSummary};
use crate::config::CONFIG_FILE_NAME;
use crate::core::{ResolvedUsage, TextRange};
use crate::issues::{Issue, Report, ReportLocation, Severity};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Print issues in cargo-style format to stdout.
pub fn report(issues: &[Issue]) {
    report_to(issues, &mut io::stdout().lock());
}

/// Print issues to a custom writer.
///
/// Useful for testing or redirecting output.
pub fn report_to<W: Write>(issues: &[Issue], writer: &mut W) {
    if issues.is_empty() {
        return;
    }

    let mut sorted = issues.to_vec();
    sorted.sort();

    // Calculate max line number width for alignment
    let max_line_width = calculate_max_line_width(&sorted);

    for issue in &sorted {
        print_issue(issue, writer, max_line_width);
    }

    print_summary(&sorted, writer);
}

/// Print a success message when no issues are found.
pub fn print_success(templates: usize, catalog_files: usize) {
    print_success_to(templates, catalog_files, &mut io::stdout().lock());
}

/// Print a success message to a custom writer.
pub fn print_success_to<W: Write>(templates: usize, catalog_files: usize, writer: &mut W) {
    let msg = format!(
        "Checked {} {}, {} catalog {} - no issues found",
        templates,
        if templates == 1 { "template" } else { "templates" },
        catalog_files,
        if catalog_files == 1 { "file" } else { "files" }
    );
    let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), msg.green());
}

/// Print a warning about files that could not be parsed.
pub fn print_parse_warning(count: usize, verbose: bool) {
    print_parse_warning_to(count, verbose, &mut io::stderr().lock());
}

/// Print a parse warning to a custom writer.
pub fn print_parse_warning_to<W: Write>(count: usize, verbose: bool, writer: &mut W) {
    if count > 0 && !verbose {
        let _ = writeln!(
            writer,
            "{} {} file(s) could not be parsed (use {} for details)",
            "warning:".bold().yellow(),
            count,
            "-v".cyan()
        );
    }
}

/// Print every resolved usage, as text or JSON.
pub fn print_keys_to<W: Write>(summary: &KeysSummary, writer: &mut W) -> serde_json::Result<()> {
    if summary.json {
        serde_json::to_writer_pretty(&mut *writer, &summary.templates)?;
        let _ = writeln!(writer);
        return Ok(());
    }

    let mut usage_count = 0;
    for template in &summary.templates {
        for usage in &template.usages {
            print_usage(&template.file_name, usage, writer);
            usage_count += 1;
        }
    }

    let _ = writeln!(
        writer,
        "{} {} {} in {} {}",
        SUCCESS_MARK.green(),
        usage_count,
        if usage_count == 1 { "usage" } else { "usages" },
        summary.templates.len(),
        if summary.templates.len() == 1 {
            "template"
        } else {
            "templates"
        }
    );
    Ok(())
}

// ============================================================
// Internal Functions
// ============================================================

fn print_issue<W: Write>(issue: &Issue, writer: &mut W, max_line_width: usize) {
    let loc = issue.location();
    let (file_path, line, col, source_line) = extract_location_info(&loc);

    // Print severity and message (cargo-style)
    let severity = issue.report_severity();
    let severity_str = match severity {
        Severity::Error => "error".bold().red(),
        Severity::Warning => "warning".bold().yellow(),
    };

    let _ = writeln!(
        writer,
        "{}: \"{}\"  {}",
        severity_str,
        issue.message(),
        issue.report_rule().to_string().dimmed().cyan()
    );

    // Clickable location; file-level issues have no line
    if line > 0 {
        let _ = writeln!(writer, "  {} {}:{}:{}", "-->".blue(), file_path, line, col);
    } else {
        let _ = writeln!(writer, "  {} {}", "-->".blue(), file_path);
    }

    if let Some(source_line) = source_line {
        let caret_char = match severity {
            Severity::Error => "^".red(),
            Severity::Warning => "^".yellow(),
        };

        let _ = writeln!(
            writer,
            "{:>width$} {}",
            "",
            "|".blue(),
            width = max_line_width
        );
        let _ = writeln!(
            writer,
            "{:>width$} {} {}",
            line.to_string().blue(),
            "|".blue(),
            source_line,
            width = max_line_width
        );

        // col is 1-based
        let prefix: String = source_line.chars().take(col.saturating_sub(1)).collect();
        let caret_padding = UnicodeWidthStr::width(prefix.as_str());
        let _ = writeln!(
            writer,
            "{:>width$} {} {:>padding$}{}",
            "",
            "|".blue(),
            "",
            caret_char,
            width = max_line_width,
            padding = caret_padding
        );
    }

    if let Some(details) = issue.details() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "note:".bold(),
            details,
            width = max_line_width
        );
    }

    if let Some(hint) = issue.hint() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "hint:".bold().cyan(),
            hint,
            width = max_line_width
        );
    }

    let _ = writeln!(writer); // Empty line between issues
}

fn print_summary<W: Write>(issues: &[Issue], writer: &mut W) {
    let total_errors = issues
        .iter()
        .filter(|i| i.report_severity() == Severity::Error)
        .count();
    let total_warnings = issues.len() - total_errors;

    let _ = writeln!(
        writer,
        "{} {} problems ({} {}, {} {})",
        FAILURE_MARK.red(),
        issues.len(),
        total_errors,
        if total_errors == 1 { "error" } else { "errors" }.red(),
        total_warnings,
        if total_warnings == 1 {
            "warning"
        } else {
            "warnings"
        }
        .yellow()
    );
}

fn print_usage<W: Write>(file_name: &str, usage: &ResolvedUsage, writer: &mut W) {
    let occurrence = &usage.occurrence;
    let mut scope = Vec::new();
    if let Some(domain) = &occurrence.domain {
        scope.push(format!("domain: {}", domain));
    }
    if let Some(locale) = &occurrence.locale {
        scope.push(format!("locale: {}", locale));
    }
    let scope = if scope.is_empty() {
        String::new()
    } else {
        format!("  ({})", scope.join(", ")).dimmed().to_string()
    };

    let _ = writeln!(
        writer,
        "{}:{} {}{}",
        file_name,
        format_position(&occurrence.range),
        occurrence.value.bold(),
        scope
    );

    if !usage.is_translated() {
        let _ = writeln!(writer, "  {} {}", "=".blue(), "not translated".yellow());
        return;
    }

    for translation in &usage.translations {
        let source = &translation.message.source;
        let location = match &source.value {
            Some(range) => format!("{}:{}", source.file_name, format_position(range)),
            None => source.file_name.clone(),
        };
        let _ = writeln!(
            writer,
            "  {} {}/{}: {}  {} {}",
            "=".blue(),
            translation.domain,
            translation.locale,
            translation.message.value,
            "-->".blue(),
            location
        );
    }
}

/// 1-based `line:col` of the start of `range`.
fn format_position(range: &TextRange) -> String {
    format!("{}:{}", range.start.line + 1, range.start.column + 1)
}

fn extract_location_info<'a>(
    loc: &'a ReportLocation<'a>,
) -> (&'a str, usize, usize, Option<&'a str>) {
    match loc {
        ReportLocation::Source(ctx) => (
            ctx.file_path.as_str(),
            ctx.line,
            ctx.col,
            Some(ctx.source_line.as_str()),
        ),
        ReportLocation::File { path } => (path, 0, 0, None),
    }
}

fn calculate_max_line_width(issues: &[Issue]) -> usize {
    issues
        .iter()
        .filter_map(|i| match i.location() {
            ReportLocation::Source(ctx) => Some(ctx.line),
            ReportLocation::File { .. } => None,
        })
        .max()
        .map(|n| n.to_string().len())
        .unwrap_or(1)
}

pub fn print(result: &CommandResult, verbose: bool) {
    match &result.summary {
        CommandSummary::Check => {
            report(&result.issues);
            if result.issues.is_empty() {
                print_success(result.source_files_checked, result.locale_files_checked);
            }
        }
        CommandSummary::Keys(summary) => {
            if let Err(err) = print_keys_to(summary, &mut io::stdout().lock()) {
                eprintln!("{} {}", "error:".bold().red(), err);
            }
            if verbose {
                report_to(&result.issues, &mut io::stderr().lock());
            }
        }
        CommandSummary::Init(summary) => print_init(summary),
    }

    print_parse_warning(result.parse_error_count, verbose);
}

fn print_init(summary: &InitSummary) {
    if summary.created {
        println!(
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    } else if let Some(error) = &summary.error {
        eprintln!("{} {}", FAILURE_MARK.red(), error);
    }
}

// ============================================================
// Tests
// ============================================================
