//! In-memory ZIP archive builder for integration tests.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;

/// One entry to be written, described at the byte level so tests can
/// produce broken archives as easily as valid ones.
pub struct TestEntry {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub data: Vec<u8>,
    pub crc32: u32,
    pub uncompressed_size: u32,
    /// Offset recorded in the central directory instead of the real one
    pub lfh_offset_override: Option<u32>,
}

fn crc_of(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

impl TestEntry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            method: 0,
            flags: 0,
            data: content.to_vec(),
            crc32: crc_of(content),
            uncompressed_size: content.len() as u32,
            lfh_offset_override: None,
        }
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(content).unwrap();
        Self {
            method: 8,
            data: encoder.finish().unwrap(),
            ..Self::stored(name, content)
        }
    }

    pub fn directory(name: &str) -> Self {
        assert!(name.ends_with('/'));
        Self::stored(name, &[])
    }

    pub fn with_crc(mut self, crc32: u32) -> Self {
        self.crc32 = crc32;
        self
    }

    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_lfh_offset(mut self, offset: u32) -> Self {
        self.lfh_offset_override = Some(offset);
        self
    }
}

#[derive(Default)]
pub struct ZipBuilder {
    body: Vec<u8>,
    central: Vec<u8>,
    count: u16,
    comment: Vec<u8>,
    zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write ZIP64 records: every central header saturates its sizes and
    /// offset and carries them in a 0x0001 extra field, and the EOCD points
    /// through a locator to a ZIP64 EOCD. Call before adding entries.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        let lfh_offset = self.body.len() as u32;
        let name = entry.name.as_bytes();

        let lfh = &mut self.body;
        lfh.write_all(b"PK\x03\x04").unwrap();
        lfh.write_u16::<LittleEndian>(20).unwrap();
        lfh.write_u16::<LittleEndian>(entry.flags).unwrap();
        lfh.write_u16::<LittleEndian>(entry.method).unwrap();
        lfh.write_u16::<LittleEndian>(0).unwrap();
        lfh.write_u16::<LittleEndian>(0x21).unwrap();
        lfh.write_u32::<LittleEndian>(entry.crc32).unwrap();
        lfh.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
        lfh.write_u32::<LittleEndian>(entry.uncompressed_size).unwrap();
        lfh.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        lfh.write_u16::<LittleEndian>(0).unwrap();
        lfh.write_all(name).unwrap();
        lfh.write_all(&entry.data).unwrap();

        let recorded_offset = entry.lfh_offset_override.unwrap_or(lfh_offset);
        let (compressed, uncompressed, offset, extra) = if self.zip64 {
            let mut extra = Vec::new();
            extra.write_u16::<LittleEndian>(0x0001).unwrap();
            extra.write_u16::<LittleEndian>(24).unwrap();
            extra.write_u64::<LittleEndian>(entry.uncompressed_size as u64).unwrap();
            extra.write_u64::<LittleEndian>(entry.data.len() as u64).unwrap();
            extra.write_u64::<LittleEndian>(recorded_offset as u64).unwrap();
            (u32::MAX, u32::MAX, u32::MAX, extra)
        } else {
            (
                entry.data.len() as u32,
                entry.uncompressed_size,
                recorded_offset,
                Vec::new(),
            )
        };

        let cd = &mut self.central;
        cd.write_all(b"PK\x01\x02").unwrap();
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(entry.flags).unwrap();
        cd.write_u16::<LittleEndian>(entry.method).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0x21).unwrap();
        cd.write_u32::<LittleEndian>(entry.crc32).unwrap();
        cd.write_u32::<LittleEndian>(compressed).unwrap();
        cd.write_u32::<LittleEndian>(uncompressed).unwrap();
        cd.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        cd.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(offset).unwrap();
        cd.write_all(name).unwrap();
        cd.write_all(&extra).unwrap();

        self.count += 1;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let cd_offset = self.body.len() as u32;
        let cd_size = self.central.len() as u32;

        let mut out = self.body;
        out.extend_from_slice(&self.central);

        let (count, cd_size, cd_offset) = if self.zip64 {
            let eocd64_offset = out.len() as u64;
            out.write_all(b"PK\x06\x06").unwrap();
            out.write_u64::<LittleEndian>(44).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(self.count as u64).unwrap();
            out.write_u64::<LittleEndian>(self.count as u64).unwrap();
            out.write_u64::<LittleEndian>(cd_size as u64).unwrap();
            out.write_u64::<LittleEndian>(cd_offset as u64).unwrap();

            out.write_all(b"PK\x06\x07").unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(eocd64_offset).unwrap();
            out.write_u32::<LittleEndian>(1).unwrap();

            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (self.count, cd_size, cd_offset)
        };

        out.write_all(b"PK\x05\x06").unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out
    }
}

/// Offset of the End of Central Directory record in an archive built
/// without a comment.
pub fn eocd_offset(archive: &[u8]) -> usize {
    archive.len() - 22
}
