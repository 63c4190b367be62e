//! Append-only export sink
//!
//! `text` output is well-formed after every `append`. `json` output is a
//! valid array prefix until `finalize()` closes it; while it is unterminated a
//! sidecar `<output>.incomplete` marker sits next to the file, so a crashed
//! run never leaves a file that claims to be valid JSON without one.

use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::format::{ExportFormat, render_text_block};
use crate::error::{HarvestError, HarvestResult};
use crate::extract::MessageRecord;

/// Suffix of the sidecar file marking an unterminated JSON export
pub const INCOMPLETE_MARKER_SUFFIX: &str = ".incomplete";

const JSON_OPEN: &str = "[\n";
const JSON_SEPARATOR: &str = ",\n";
const JSON_CLOSE: &str = "\n]\n";

pub struct ExportSink {
    path: PathBuf,
    format: ExportFormat,
    file: File,
    records_written: usize,
    finalized: bool,
    marker: Option<PathBuf>,
}

impl ExportSink {
    /// Create (or truncate) the output file and write the opening structure
    pub async fn create(path: impl Into<PathBuf>, format: ExportFormat) -> HarvestResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;

        let mut sink = Self {
            path,
            format,
            file,
            records_written: 0,
            finalized: false,
            marker: None,
        };

        if format == ExportFormat::Json {
            let marker = marker_path(&sink.path);
            tokio::fs::write(
                &marker,
                format!(
                    "{} is an unterminated JSON array; append \"]\" to repair it\n",
                    sink.path.display()
                ),
            )
            .await?;
            sink.marker = Some(marker);
            sink.write_durably(JSON_OPEN).await?;
        }

        info!("Exporting {} records to {}", format, sink.path.display());
        Ok(sink)
    }

    /// Append one page worth of records and flush them to disk
    ///
    /// Returns the number of records written.
    pub async fn append(&mut self, records: &[MessageRecord]) -> HarvestResult<usize> {
        if self.finalized {
            return Err(HarvestError::Export(std::io::Error::other(format!(
                "export to {} was already finalized",
                self.path.display()
            ))));
        }
        if records.is_empty() {
            return Ok(0);
        }

        let mut chunk = String::new();
        for record in records {
            match self.format {
                ExportFormat::Text => chunk.push_str(&render_text_block(record)),
                ExportFormat::Json => {
                    if self.records_written > 0 || !chunk.is_empty() {
                        chunk.push_str(JSON_SEPARATOR);
                    }
                    let json = serde_json::to_string_pretty(record)
                        .map_err(|e| HarvestError::Export(std::io::Error::other(e)))?;
                    chunk.push_str(&json);
                }
            }
        }

        self.write_durably(&chunk).await?;
        self.records_written += records.len();
        debug!(
            records = records.len(),
            total = self.records_written,
            "Appended records to {}",
            self.path.display()
        );
        Ok(records.len())
    }

    /// Close the document and remove the incomplete marker
    ///
    /// Idempotent: later calls are no-ops.
    pub async fn finalize(&mut self) -> HarvestResult<()> {
        if self.finalized {
            return Ok(());
        }

        if self.format == ExportFormat::Json {
            self.write_durably(JSON_CLOSE).await?;
        }
        self.file.flush().await?;
        self.finalized = true;

        if let Some(marker) = self.marker.take()
            && let Err(e) = tokio::fs::remove_file(&marker).await
        {
            warn!("Failed to remove marker {}: {}", marker.display(), e);
        }

        info!(
            "Finalized export {} ({} records)",
            self.path.display(),
            self.records_written
        );
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    async fn write_durably(&mut self, data: &str) -> HarvestResult<()> {
        self.file.write_all(data.as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(())
    }
}

fn marker_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(INCOMPLETE_MARKER_SUFFIX);
    PathBuf::from(name)
}
