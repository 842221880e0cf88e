mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer from `offset`, failing if the range runs past
    /// the end of the source or the source returns fewer bytes.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.size()) {
            bail!(
                "Read of {} bytes at offset {} exceeds source size {}",
                buf.len(),
                offset,
                self.size()
            );
        }

        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .read_at(offset + filled as u64, &mut buf[filled..])
                .await?;
            if n == 0 {
                bail!("Unexpected end of data at offset {}", offset + filled as u64);
            }
            filled += n;
        }
        Ok(())
    }
}

/// Default upper bound for archives loaded into memory (256 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 256 * 1024 * 1024;

/// Refuse sources larger than `max_size` before any of them is read.
pub fn ensure_within_limit<R: ReadAt + ?Sized>(reader: &R, max_size: u64) -> Result<()> {
    let size = reader.size();
    if size > max_size {
        bail!(
            "Archive is {} bytes, larger than the limit of {} bytes",
            size,
            max_size
        );
    }
    Ok(())
}

/// Load an entire source into memory.
///
/// The source size is checked against `max_size` before anything is
/// allocated.
pub async fn read_all<R: ReadAt + ?Sized>(reader: &R, max_size: u64) -> Result<Vec<u8>> {
    ensure_within_limit(reader, max_size)?;

    let mut buf = vec![0u8; reader.size() as usize];
    reader.read_exact_at(0, &mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_exact_at_rejects_out_of_bounds() {
        let reader = MemoryReader::new(b"hello".to_vec());

        let mut buf = [0u8; 3];
        reader.read_exact_at(2, &mut buf).await.unwrap();
        assert_eq!(&buf, b"llo");

        let mut buf = [0u8; 4];
        assert!(reader.read_exact_at(2, &mut buf).await.is_err());
        assert!(reader.read_exact_at(u64::MAX, &mut buf).await.is_err());
    }

    #[tokio::test]
    async fn test_read_exact_at_empty_buffer() {
        let reader = MemoryReader::new(Vec::new());
        let mut buf = [0u8; 0];
        reader.read_exact_at(0, &mut buf).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_all_respects_limit() {
        let reader = MemoryReader::new(vec![7u8; 64]);

        let data = read_all(&reader, 64).await.unwrap();
        assert_eq!(data.len(), 64);

        let err = read_all(&reader, 63).await.unwrap_err();
        assert!(err.to_string().contains("larger than the limit"));
    }
}
