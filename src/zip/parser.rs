//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Anything that goes wrong in steps 1-3 means the input is not a usable
//! archive and surfaces as [`ScanError::ArchiveFormat`]. Step 4 concerns a
//! single entry and surfaces as [`ScanError::EntryRead`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so the same code serves in-memory buffers,
/// local files and HTTP sources. Typically used through
/// [`ZipExtractor`](super::ZipExtractor) rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Read a structural region of the archive; a short read means the
    /// archive itself is broken.
    async fn read_region(&self, offset: u64, len: usize, what: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact_at(offset, &mut buf)
            .await
            .map_err(|e| ScanError::archive(format!("Failed to read {}: {}", what, e)))?;
        Ok(buf)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// Returns the EOCD record and its offset in the file.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ScanError::archive("Not a valid ZIP file: input too short"));
        }

        // Common case: no archive comment, EOCD is the last 22 bytes
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let buf = self
            .read_region(offset, EndOfCentralDirectory::SIZE, "End of Central Directory")
            .await?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // Otherwise the EOCD sits before a comment of up to 64 KiB
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;
        let buf = self
            .read_region(search_start, search_size as usize, "archive tail")
            .await?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field must account for every trailing byte
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ScanError::archive("Not a valid ZIP file: missing End of Central Directory"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD has fields saturated to 0xFFFF or
    /// 0xFFFFFFFF. The locator sits immediately before the regular EOCD.
    ///
    /// Returns the record and its offset in the file.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<(Zip64EOCD, u64)> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ScanError::archive("Invalid ZIP64 locator"))?;
        let locator_buf = self
            .read_region(locator_offset, Zip64EOCDLocator::SIZE, "ZIP64 locator")
            .await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        if let Ok(eocd64) = self.read_zip64_record(locator.eocd64_offset).await {
            return Ok((eocd64, locator.eocd64_offset));
        }

        // The recorded offset ignores any prefix; the record itself
        // normally ends where the locator begins
        let adjacent = locator_offset
            .checked_sub(Zip64EOCD::MIN_SIZE as u64)
            .ok_or_else(|| ScanError::archive("Invalid ZIP64 End of Central Directory"))?;
        debug!(
            recorded = locator.eocd64_offset,
            adjacent, "ZIP64 record not at recorded offset"
        );
        Ok((self.read_zip64_record(adjacent).await?, adjacent))
    }

    async fn read_zip64_record(&self, offset: u64) -> Result<Zip64EOCD> {
        let buf = self
            .read_region(offset, Zip64EOCD::MIN_SIZE, "ZIP64 End of Central Directory")
            .await?;
        Zip64EOCD::from_bytes(&buf)
    }

    /// List all entries in the archive, in central directory order.
    ///
    /// Reads the EOCD first, then fetches and parses the entire
    /// Central Directory in one read.
    ///
    /// Recorded offsets are relative to the start of the archive proper.
    /// When data precedes it (a self-extracting stub, a ZIP appended to an
    /// executable), the gap between the end of the Central Directory and
    /// the record that follows it gives the length of that prefix, and
    /// every offset is shifted by it.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries, cd_end) = if eocd.is_zip64() {
            let (eocd64, eocd64_offset) = self.read_zip64_eocd(eocd_offset).await?;
            (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset,
            )
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
                eocd_offset,
            )
        };

        // Validate before allocating: a lying header must not drive allocation
        let base_offset = cd_offset
            .checked_add(cd_size)
            .and_then(|recorded_end| cd_end.checked_sub(recorded_end))
            .ok_or_else(|| {
                ScanError::archive(format!(
                    "Central Directory ({} bytes at offset {}) lies outside the archive",
                    cd_size, cd_offset
                ))
            })?;
        if total_entries > cd_size / CDFH_MIN_SIZE as u64 {
            return Err(ScanError::archive(format!(
                "Central Directory of {} bytes cannot hold {} entries",
                cd_size, total_entries
            )));
        }
        if base_offset > 0 {
            debug!(base_offset, "archive is preceded by other data");
        }
        let cd_offset = cd_offset + base_offset;

        let cd_data = self
            .read_region(cd_offset, cd_size as usize, "Central Directory")
            .await?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let mut entry = Self::parse_cdfh(&mut cursor).map_err(|e| match e {
                ScanError::ArchiveFormat(_) => e,
                other => ScanError::archive(format!(
                    "Truncated Central Directory File Header #{}: {}",
                    index, other
                )),
            })?;
            entry.lfh_offset = entry
                .lfh_offset
                .checked_add(base_offset)
                .ok_or_else(|| ScanError::archive("Local File Header offset overflows"))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    ///
    /// The CDFH carries the entry name, sizes, and the location of the
    /// local header. ZIP64 extended information (extra field 0x0001)
    /// replaces saturated 32-bit fields.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(ScanError::archive("Invalid Central Directory File Header"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Non-UTF8 names are kept readable rather than rejected
        let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();

        let is_directory = file_name.ends_with('/');

        let mut extra = vec![0u8; extra_field_length as usize];
        cursor.read_exact(&mut extra)?;
        let mut extra = Cursor::new(extra.as_slice());
        let extra_end = extra_field_length as u64;

        while extra.position() + 4 <= extra_end {
            let header_id = extra.read_u16::<LittleEndian>()?;
            let field_size = extra.read_u16::<LittleEndian>()? as u64;
            let field_end = (extra.position() + field_size).min(extra_end);

            if header_id == 0x0001 {
                // Values appear only for header fields saturated to 0xFFFFFFFF
                if uncompressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    uncompressed_size = extra.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    compressed_size = extra.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    lfh_offset = extra.read_u64::<LittleEndian>()?;
                }
            }
            extra.set_position(field_end);
        }

        // The comment is not used, but it must be present
        let mut comment = vec![0u8; file_comment_length as usize];
        cursor.read_exact(&mut comment)?;

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            flags,
            is_directory,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header has variable-length fields (filename, extra
    /// field) that may differ from the Central Directory entry, so the
    /// header is read to find where the entry's data begins.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh_buf)
            .await
            .map_err(|e| ScanError::entry(&entry.file_name, format!("Local File Header: {}", e)))?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ScanError::entry(&entry.file_name, "Invalid Local File Header"));
        }

        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Total size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}
