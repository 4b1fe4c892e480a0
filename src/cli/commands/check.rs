use anyhow::Result;

use super::super::args::CheckCommand;
use super::{CommandResult, CommandSummary, helper::finish};
use crate::{
    core::context::CheckContext,
    issues::Issue,
    rules::{check_missing_key, check_missing_locale},
};

pub fn check(cmd: CheckCommand) -> Result<CommandResult> {
    let mut ctx = CheckContext::new(&cmd.common)?;
    let analysis = ctx.analyze();
    let required_locales = ctx.config.required_locales();

    let mut all_issues: Vec<Issue> = Vec::new();
    all_issues.extend(
        check_missing_key(&analysis.templates, &analysis.catalog)
            .into_iter()
            .map(Issue::MissingKey),
    );
    all_issues.extend(
        check_missing_locale(&analysis.templates, &analysis.catalog, &required_locales)
            .into_iter()
            .map(Issue::MissingLocale),
    );
    all_issues.extend(analysis.parse_errors.into_iter().map(Issue::ParseError));

    Ok(finish(
        CommandSummary::Check,
        all_issues,
        analysis.templates.len(),
        analysis.catalog_files_checked,
        true,
    ))
}
