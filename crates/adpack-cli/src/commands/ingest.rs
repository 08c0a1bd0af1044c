//! Ingest command implementation.

use std::sync::Arc;

use adpack_core::EncryptedPolicy;
use adpack_core::IngestConfig;
use adpack_core::Ingestor;
use adpack_core::Upload;
use anyhow::Context;
use anyhow::Result;

use crate::cli::IngestArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliSpinner;
use crate::store::DirStore;

pub async fn execute(
    args: &IngestArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let bytes = tokio::fs::read(&args.archive)
        .await
        .with_context(|| format!("failed to read '{}'", args.archive.display()))?;

    if args.password.is_some() && args.encrypted != EncryptedPolicy::Attempt {
        formatter.format_warning("--password is ignored unless --encrypted attempt is set");
    }

    let mut builder = Ingestor::builder().config(build_config(args));
    let store = args.output.as_ref().map(|dir| Arc::new(DirStore::new(dir)));
    if let Some(store) = &store {
        builder = builder.store(store.clone());
    }
    let ingestor = builder.build();

    let mut upload = Upload::new(bytes);
    if let Some(password) = &args.password {
        upload = upload.with_password(password.clone());
    }
    if let Some(id) = &args.upload_id {
        upload = upload.with_upload_id(id.clone());
    }

    let spinner = (show_progress && CliSpinner::should_show()).then(|| CliSpinner::new("Ingesting"));
    let result = ingestor.ingest(upload).await;
    drop(spinner);
    let manifest = add_archive_context(result, &args.archive)?;

    formatter.format_manifest(&manifest, args.show_html)?;
    if let Some(store) = &store {
        formatter.format_success(&format!(
            "Creatives stored in {}",
            store.upload_dir(&manifest.upload_id).display()
        ));
    }

    Ok(())
}

fn build_config(args: &IngestArgs) -> IngestConfig {
    let mut config = IngestConfig::default().with_encrypted_policy(args.encrypted);

    if let Some(max) = args.max_files {
        config = config.with_max_file_count(max);
    }
    if let Some(max) = args.max_total_size {
        config = config.with_max_total_size(max);
    }
    if let Some(max) = args.max_file_size {
        config = config.with_max_file_size(max);
    }
    if let Some(max) = args.max_depth {
        config = config.with_max_depth(max);
    }
    if let Some(max) = args.max_inline_size {
        config.max_inline_asset_bytes = max;
    }
    if !args.entry_preferences.is_empty() {
        config.entry_preferences = args
            .entry_preferences
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
    }
    config.refuse_suspicious_archives = !args.allow_suspicious;
    config.dedup = !args.no_dedup;

    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;
    use crate::cli::Commands;

    fn parse(extra: &[&str]) -> IngestArgs {
        let mut argv = vec!["adpack", "ingest", "up.zip"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Ingest(args) => args,
            _ => panic!("expected ingest command"),
        }
    }

    #[test]
    fn test_defaults_match_core_defaults() {
        let config = build_config(&parse(&[]));
        let defaults = IngestConfig::default();
        assert_eq!(config.max_file_count, defaults.max_file_count);
        assert_eq!(config.max_total_size, defaults.max_total_size);
        assert!(config.refuse_suspicious_archives);
        assert!(config.dedup);
        assert_eq!(config.encrypted_policy, EncryptedPolicy::Skip);
    }

    #[test]
    fn test_flags_override_config() {
        let config = build_config(&parse(&[
            "--max-files",
            "10",
            "--max-depth",
            "1",
            "--max-inline-size",
            "1K",
            "--allow-suspicious",
            "--no-dedup",
            "--entry",
            "Start.HTML",
        ]));
        assert_eq!(config.max_file_count, 10);
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_inline_asset_bytes, 1024);
        assert!(!config.refuse_suspicious_archives);
        assert!(!config.dedup);
        assert_eq!(config.entry_preferences, vec!["start.html"]);
    }
}
