use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;
use tracing::trace;

use crate::error::{Result, ScanError};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive, in archive order
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract the decompressed content of one entry into memory.
    ///
    /// Every failure here is an [`ScanError::EntryRead`] naming the entry;
    /// the rest of the archive stays readable.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let name = entry.file_name.as_str();

        if entry.is_encrypted() {
            return Err(ScanError::entry(name, "encrypted entries are not supported"));
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        let in_bounds = data_offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= self.parser.size());
        if !in_bounds {
            return Err(ScanError::entry(
                name,
                format!(
                    "{} bytes of data at offset {} run past the end of the archive",
                    entry.compressed_size, data_offset
                ),
            ));
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await
            .map_err(|e| ScanError::entry(name, e.to_string()))?;

        let content = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate(name, &raw, entry.uncompressed_size)?,
            CompressionMethod::Unknown(method) => {
                return Err(ScanError::entry(
                    name,
                    format!("unsupported compression method {}", method),
                ));
            }
        };

        verify(entry, &content)?;
        trace!(entry = name, size = content.len(), "entry extracted");
        Ok(content)
    }
}

/// Inflate raw DEFLATE data, reading one byte past the declared size so an
/// oversized stream is detected without decompressing all of it.
fn inflate(name: &str, raw: &[u8], declared: u64) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    DeflateDecoder::new(raw)
        .take(declared.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(|e| ScanError::entry(name, format!("corrupt deflate stream: {}", e)))?;
    Ok(content)
}

/// Check the extracted content against the sizes and CRC-32 recorded in
/// the central directory.
fn verify(entry: &ZipFileEntry, content: &[u8]) -> Result<()> {
    if content.len() as u64 != entry.uncompressed_size {
        return Err(ScanError::entry(
            &entry.file_name,
            format!(
                "expected {} bytes, read {}",
                entry.uncompressed_size,
                content.len()
            ),
        ));
    }

    let mut crc = Crc::new();
    crc.update(content);
    if crc.sum() != entry.crc32 {
        return Err(ScanError::entry(
            &entry.file_name,
            format!(
                "checksum mismatch (expected {:08x}, got {:08x})",
                entry.crc32,
                crc.sum()
            ),
        ));
    }
    Ok(())
}
