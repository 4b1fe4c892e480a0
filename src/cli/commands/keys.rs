use anyhow::Result;

use super::super::args::KeysCommand;
use super::{CommandResult, CommandSummary, KeysSummary, helper::finish};
use crate::{core::context::CheckContext, issues::Issue};

/// Resolve key usages without judging them. Only unparsable files are reported.
pub fn keys(cmd: KeysCommand) -> Result<CommandResult> {
    let mut ctx = CheckContext::new(&cmd.common)?;
    if !cmd.files.is_empty() {
        ctx.restrict_templates(&cmd.files);
    }
    let analysis = ctx.analyze();
    let source_files_checked = analysis.templates.len();

    Ok(finish(
        CommandSummary::Keys(KeysSummary {
            json: cmd.json,
            templates: analysis.templates,
        }),
        analysis.parse_errors.into_iter().map(Issue::ParseError).collect(),
        source_files_checked,
        analysis.catalog_files_checked,
        false,
    ))
}
