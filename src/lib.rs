//! # zipcheck
//!
//! Inspect the entries of a ZIP archive and classify their true file types
//! by magic number instead of trusting names or extensions.
//!
//! A scan lists the archive's entries in central directory order, skips
//! directory markers, extracts every file entry into memory and tests its
//! bytes against a fixed table of signatures. Each readable entry yields a
//! [`ClassificationResult`] carrying its name, decompressed size and the
//! labels of every signature it matched. An entry that cannot be read is
//! logged and left out; only an input that is not a ZIP archive at all
//! fails the scan.
//!
//! ## Features
//!
//! - Scan archives held in memory, on the local filesystem, or behind an
//!   HTTP/HTTPS URL (via Range requests)
//! - ZIP64 archives and archives preceded by a stub, STORED and DEFLATE
//!   entries with CRC-32 verification
//! - Declarative signature table with a single generic matcher
//!
//! ## Example
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("upload.zip")?;
//!
//!     for result in zipcheck::scan_bytes(bytes).await? {
//!         println!("{} ({} bytes): {:?}", result.filename, result.size, result.type_hints);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod logging;
pub mod scan;
pub mod signature;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ScanError};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use scan::{ClassificationResult, ScanSummary, Scanner, scan_bytes};
pub use signature::{SIGNATURE_RULES, SignatureRule, classify};
pub use zip::{ZipExtractor, ZipFileEntry};
