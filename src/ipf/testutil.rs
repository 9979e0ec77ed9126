use byteorder::{WriteBytesExt, LE};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

// Minimal archive builder for tests. Payloads are laid out back to back from
// offset zero, followed by the directory and the footer.

pub(crate) struct TestEntry {
    name: String,
    payload: Vec<u8>,
    uncompressed_size: u32,
}

impl TestEntry {
    /// Entry stored verbatim, declared sizes equal.
    pub(crate) fn stored(name: &str, payload: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            payload: payload.to_vec(),
            uncompressed_size: payload.len() as u32,
        }
    }

    /// Entry holding the zlib stream of `plaintext`.
    pub(crate) fn compressed(name: &str, plaintext: &[u8]) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plaintext).unwrap();
        Self {
            name: name.to_string(),
            payload: encoder.finish().unwrap(),
            uncompressed_size: plaintext.len() as u32,
        }
    }
}

pub(crate) fn build_archive(archive_name: &str, entries: &[TestEntry]) -> Vec<u8> {
    let mut data = Vec::new();

    let mut offsets = Vec::with_capacity(entries.len());
    for entry in entries {
        offsets.push(data.len() as u32);
        data.extend_from_slice(&entry.payload);
    }

    let directory_offset = data.len() as u32;
    for (entry, offset) in entries.iter().zip(&offsets) {
        data.write_u16::<LE>(entry.name.len() as u16).unwrap();
        data.write_u32::<LE>(0).unwrap(); // crc32, not validated on read
        data.write_u32::<LE>(entry.payload.len() as u32).unwrap();
        data.write_u32::<LE>(entry.uncompressed_size).unwrap();
        data.write_u32::<LE>(*offset).unwrap();
        data.write_u16::<LE>(archive_name.len() as u16).unwrap();
        data.extend_from_slice(archive_name.as_bytes());
        data.extend_from_slice(entry.name.as_bytes());
    }

    let footer_offset = data.len() as u32;
    data.write_u16::<LE>(entries.len() as u16).unwrap();
    data.write_u32::<LE>(directory_offset).unwrap();
    data.write_u16::<LE>(0).unwrap();
    data.write_u32::<LE>(footer_offset).unwrap();
    data.write_u32::<LE>(crate::ipf::IpfArchive::MAGIC).unwrap();
    data.write_u32::<LE>(1).unwrap(); // base revision
    data.write_u32::<LE>(1).unwrap(); // subversion

    data
}
