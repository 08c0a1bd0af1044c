//! Human-readable output formatter with colors and styling.

use std::path::Path;

use adpack_core::Manifest;
use adpack_core::PreviewResult;
use anyhow::Result;
use console::Term;
use console::style;

use super::formatter::OutputFormatter;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn heading(&self, text: &str) {
        if self.use_colors {
            self.line(&format!("{}", style(text).yellow().bold()));
        } else {
            self.line(text);
        }
    }

    fn list_section(&self, title: &str, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.line("");
        self.heading(&format!("{title} ({}):", lines.len()));
        for line in lines {
            self.line(&format!("  - {line}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_preview(&self, archive: &Path, preview: &PreviewResult, long: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let totals = &preview.totals;
        self.line(&format!("Archive: {}", archive.display()));
        self.line(&format!(
            "  Files: {}   Directories: {}",
            Self::format_number(totals.file_count),
            Self::format_number(totals.dir_count)
        ));
        self.line(&format!(
            "  Compressed: {}   Uncompressed: {}   Expansion: {:.1}x",
            Self::format_size(totals.compressed_bytes),
            Self::format_size(totals.uncompressed_bytes),
            totals.expansion()
        ));

        let encrypted = preview.encrypted_entries();
        if !encrypted.is_empty() {
            self.line(&format!("  Encrypted entries: {}", encrypted.len()));
        }

        if long {
            self.line("");
            for entry in &preview.entries {
                let flag = match (entry.is_directory, entry.encrypted) {
                    (true, _) => 'd',
                    (false, true) => 'e',
                    (false, false) => '-',
                };
                let ratio = entry
                    .compression_ratio
                    .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0));
                self.line(&format!(
                    "{flag} {:>4} {:>10} {:>10} {:>5}  {}",
                    entry.compression_method,
                    entry.compressed_size,
                    entry.uncompressed_size,
                    ratio,
                    entry.name
                ));
            }
        }

        let suspicious = &preview.suspicious;
        if suspicious.is_suspicious() {
            self.line("");
            if suspicious.high_overall_expansion {
                self.format_warning("archive expands suspiciously as a whole");
            }
            for name in &suspicious.high_expansion_entries {
                self.format_warning(&format!("high expansion entry: {name}"));
            }
        }

        Ok(())
    }

    fn format_manifest(&self, manifest: &Manifest, show_html: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let header = format!("Ingested upload {}", manifest.upload_id);
        if self.use_colors {
            self.line(&format!("{} {header}", style("✓").green().bold()));
        } else {
            self.line(&header);
        }

        let counts = &manifest.counts;
        self.line(&format!(
            "  Creatives: {} ({} html, {} image, {} other)",
            Self::format_number(counts.total),
            counts.htmls,
            counts.images,
            counts.others
        ));
        self.line(&format!(
            "  Total size: {}",
            Self::format_size(manifest.summary.total_size)
        ));
        if self.verbose {
            self.line(&format!(
                "  Processing time: {} ms",
                manifest.summary.processing_time_ms
            ));
        }

        if !manifest.items.is_empty() {
            self.line("");
        }
        for item in &manifest.items {
            self.line(&format!(
                "  [{:<5}] {}  {} ({})",
                item.kind.as_str(),
                item.name,
                item.entry_file,
                Self::format_size(item.size_bytes)
            ));
            if self.verbose {
                for asset in &item.asset_paths {
                    self.line(&format!("            + {asset}"));
                }
                if let Some(preview) = &item.preview_url {
                    self.line(&format!("            preview: {preview}"));
                }
            }
            if show_html && let Some(html) = &item.embedded_html {
                self.line(html);
            }
        }

        let skipped: Vec<String> = manifest
            .skipped
            .iter()
            .map(|skip| format!("{}: {}", skip.path, skip.reason))
            .collect();
        self.list_section("Skipped", &skipped);
        self.list_section("Warnings", &manifest.summary.warnings);
        self.list_section("Errors", &manifest.summary.errors);

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_success(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            self.line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            self.line(message);
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .err
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.err.write_line(&format!("WARNING: {message}"));
        }
    }
}
