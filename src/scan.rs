//! Archive scanning: traverse, extract, classify.
//!
//! A scan lists the archive's entries, skips directory markers, extracts
//! each remaining entry and classifies its bytes. An entry that cannot be
//! read is logged and left out; only a broken archive fails the scan.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::io::{MemoryReader, ReadAt};
use crate::signature::classify;
use crate::zip::ZipExtractor;

/// Classification of one archive entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Entry name as recorded in the archive
    pub filename: String,
    /// Decompressed size in bytes
    pub size: u64,
    /// Labels of every signature the content matched, in rule order
    pub type_hints: Vec<String>,
}

/// Entry counts for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub skipped_directories: usize,
    pub failed: usize,
}

/// Classifies every entry of a ZIP archive
pub struct Scanner<R: ReadAt> {
    extractor: ZipExtractor<R>,
}

impl<R: ReadAt> Scanner<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            extractor: ZipExtractor::new(reader),
        }
    }

    /// Scan the archive, returning one result per readable file entry in
    /// archive order.
    pub async fn scan(&self) -> Result<Vec<ClassificationResult>> {
        self.scan_with_summary().await.map(|(results, _)| results)
    }

    /// Like [`scan`](Self::scan), also reporting how many entries were
    /// skipped.
    pub async fn scan_with_summary(&self) -> Result<(Vec<ClassificationResult>, ScanSummary)> {
        let entries = self.extractor.list_files().await?;
        let mut summary = ScanSummary::default();
        let mut results = Vec::with_capacity(entries.len());

        for entry in &entries {
            if entry.is_directory {
                debug!(entry = %entry.file_name, "skipping directory entry");
                summary.skipped_directories += 1;
                continue;
            }

            debug!(entry = %entry.file_name, "reading entry");
            // Whatever goes wrong inside one entry is confined to that entry
            let content = match self.extractor.extract_to_memory(entry).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(entry = %entry.file_name, error = %e, "failed to inspect entry, skipping");
                    summary.failed += 1;
                    continue;
                }
            };

            results.push(ClassificationResult {
                filename: entry.file_name.clone(),
                size: content.len() as u64,
                type_hints: classify(&content),
            });
            summary.scanned += 1;
        }

        info!(
            scanned = summary.scanned,
            skipped_directories = summary.skipped_directories,
            failed = summary.failed,
            "archive scan finished"
        );
        Ok((results, summary))
    }
}

/// Scan an archive held in memory.
pub async fn scan_bytes(bytes: impl Into<Vec<u8>>) -> Result<Vec<ClassificationResult>> {
    Scanner::new(Arc::new(MemoryReader::new(bytes))).scan().await
}
