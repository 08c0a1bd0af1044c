//! Preview command implementation

use adpack_core::ExpansionThresholds;
use adpack_core::IngestError;
use adpack_core::preview_archive;
use anyhow::Context;
use anyhow::Result;

use crate::cli::PreviewArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;

pub async fn execute(args: &PreviewArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let data = tokio::fs::read(&args.archive)
        .await
        .with_context(|| format!("failed to read '{}'", args.archive.display()))?;

    let thresholds = ExpansionThresholds {
        entry_ratio: args.entry_ratio,
        overall_ratio: args.overall_ratio,
    };
    let preview = add_archive_context(
        preview_archive(&data, &thresholds).ok_or(IngestError::NotZip),
        &args.archive,
    )?;

    formatter.format_preview(&args.archive, &preview, args.long)
}
