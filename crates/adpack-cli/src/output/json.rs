//! JSON output formatter for machine-readable results.
//!
//! Results go to stdout as a single document; warnings and success notes go
//! to stderr so stdout stays parseable.

use std::io::Write;
use std::io::{self};
use std::path::Path;

use adpack_core::Manifest;
use adpack_core::PreviewResult;
use anyhow::Result;
use serde::Serialize;

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    fn note<T: Serialize>(value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}

#[derive(Serialize)]
struct MessageData<'a> {
    message: &'a str,
}

impl OutputFormatter for JsonFormatter {
    fn format_preview(&self, archive: &Path, preview: &PreviewResult, long: bool) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PreviewOutput<'a> {
            archive: String,
            #[serde(flatten)]
            preview: &'a PreviewResult,
            encrypted_entries: Vec<&'a str>,
        }

        let data = PreviewOutput {
            archive: archive.display().to_string(),
            preview,
            encrypted_entries: preview.encrypted_entries(),
        };

        if long {
            Self::output(&JsonOutput::success("preview", data))
        } else {
            // Entries are only listed on request
            let mut value = serde_json::to_value(&data)?;
            if let Some(map) = value.as_object_mut() {
                map.remove("entries");
            }
            Self::output(&JsonOutput::success("preview", value))
        }
    }

    fn format_manifest(&self, manifest: &Manifest, _show_html: bool) -> Result<()> {
        Self::output(&JsonOutput::success("ingest", manifest))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error("error", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_success(&self, message: &str) {
        Self::note(&JsonOutput::success("success", MessageData { message }));
    }

    fn format_warning(&self, message: &str) {
        Self::note(&JsonOutput::success("warning", MessageData { message }));
    }
}
