//! Main entry point for the zipcheck CLI application.
//!
//! Loads an archive from a local path or HTTP URL, classifies every entry
//! and prints the results as a table or a JSON array.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use zipcheck::io::{ensure_within_limit, read_all};
use zipcheck::logging::{init_tracing, init_tracing_json, level_for_verbosity};
use zipcheck::{
    Cli, ClassificationResult, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt,
    ScanSummary, Scanner,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = level_for_verbosity(cli.verbose);
    if cli.log_json {
        init_tracing_json(level);
    } else {
        init_tracing(level);
    }

    let (results, summary) = if cli.is_http_url() {
        // Remote archives are scanned in place, one range request per read
        let reader = Arc::new(HttpRangeReader::new(cli.file.as_str()).await?);
        ensure_within_limit(reader.as_ref(), cli.max_size)?;
        let scanned = scan(Arc::clone(&reader), &cli.file).await?;
        info!(
            url = %cli.file,
            archive_size = reader.size(),
            transferred = reader.transferred_bytes(),
            "fetched {} of {}",
            format_size(reader.transferred_bytes()),
            format_size(reader.size())
        );
        scanned
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))?;
        let data = read_all(&reader, cli.max_size).await?;
        scan(Arc::new(MemoryReader::new(data)), &cli.file).await?
    };

    if cli.json {
        let json = if cli.pretty {
            serde_json::to_string_pretty(&results)?
        } else {
            serde_json::to_string(&results)?
        };
        println!("{}", json);
    } else {
        print_table(&results);
        if !cli.is_quiet() {
            print_summary(&summary);
        }
    }

    Ok(())
}

async fn scan<R: ReadAt>(
    reader: Arc<R>,
    source: &str,
) -> Result<(Vec<ClassificationResult>, ScanSummary)> {
    Scanner::new(reader)
        .scan_with_summary()
        .await
        .with_context(|| format!("Cannot inspect {}", source))
}

/// Print one line per entry: size, type hints, name.
fn print_table(results: &[ClassificationResult]) {
    println!("{:>10}  {:<30}  Name", "Size", "Type hints");
    println!("{}", "-".repeat(70));

    for result in results {
        let hints = if result.type_hints.is_empty() {
            "-".to_string()
        } else {
            result.type_hints.join(",")
        };
        println!(
            "{:>10}  {:<30}  {}",
            format_size(result.size),
            hints,
            result.filename
        );
    }
}

fn print_summary(summary: &ScanSummary) {
    println!("{}", "-".repeat(70));
    println!(
        "{} files inspected, {} directories skipped, {} unreadable",
        summary.scanned, summary.skipped_directories, summary.failed
    );
}

/// Format a byte size into a human-readable string.
///
/// Picks the largest unit (B, KB, MB, GB, TB) that keeps the value at or
/// above one, with up to two decimals.
fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", size)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(format_size(3 * 1024u64.pow(4)), "3.00 TB");
        assert_eq!(format_size(2048 * 1024u64.pow(4)), "2048.00 TB");
    }
}
