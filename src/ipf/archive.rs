use crate::ipf::bytes::{self, IpfEntryRecord, IpfFooter};
use crate::ipf::entry::IpfEntry;
use crate::ipf::error::IpfError;
use bytesize::ByteSize;
use globset::GlobSet;
use indexmap::IndexMap;
use std::str;

/// Parsed directory of an IPF archive. Holds the footer metadata and the
/// entries in directory order; the archive buffer itself stays with the
/// caller so that the same directory can drive read-only extraction and
/// in-place re-ciphering.
#[derive(Debug)]
pub struct IpfArchive {
    base_revision: u32,
    subversion: u32,
    entries: IndexMap<String, IpfEntry>,
}

impl IpfArchive {
    pub const MAGIC: u32 = 0x0605_4B50;

    const NAME_LEN_LIMIT: usize = 1024;

    pub fn parse(data: &[u8]) -> Result<Self, IpfError> {
        let Some(footer_start) = data.len().checked_sub(bytes::FOOTER_LEN) else {
            return Err(IpfError::MalformedFooter("archive shorter than the footer"));
        };

        let (footer, _) = bytes::decode_at::<IpfFooter>(data, footer_start)
            .ok_or(IpfError::MalformedFooter("unreadable footer fields"))?;
        if footer.magic != Self::MAGIC {
            return Err(IpfError::MalformedFooter("magic word mismatch"));
        }

        let entry_count = usize::from(footer.entry_count);
        let directory_offset = footer.directory_offset as usize;
        let directory_min_len = entry_count * bytes::RECORD_FIXED_LEN;
        if directory_offset
            .checked_add(directory_min_len)
            .is_none_or(|end| end > footer_start)
        {
            return Err(IpfError::MalformedFooter(
                "directory overruns the footer region",
            ));
        }

        let mut entries = IndexMap::with_capacity(entry_count);
        let mut cursor = directory_offset;
        for _ in 0..entry_count {
            let (entry, next) = Self::parse_record(data, cursor, footer_start, directory_offset)?;
            cursor = next;
            entries.insert(entry.relative_path(), entry);
        }

        Ok(Self {
            base_revision: footer.base_revision,
            subversion: footer.subversion,
            entries,
        })
    }

    // One directory record: fixed prefix, then the archive-name bytes, then
    // the filename bytes. Returns the entry and the offset of the next
    // record.
    fn parse_record(
        data: &[u8],
        offset: usize,
        footer_start: usize,
        directory_offset: usize,
    ) -> Result<(IpfEntry, usize), IpfError> {
        let (record, fixed_len) = bytes::decode_at::<IpfEntryRecord>(&data[..footer_start], offset)
            .ok_or(IpfError::TruncatedRecord { offset })?;

        let archive_name_len = usize::from(record.archive_name_len);
        let filename_len = usize::from(record.filename_len);
        for len in [archive_name_len, filename_len] {
            if len > Self::NAME_LEN_LIMIT {
                return Err(IpfError::NameTooLong { len });
            }
        }

        let names_start = offset + fixed_len;
        let names_end = names_start + archive_name_len + filename_len;
        if names_end > footer_start {
            return Err(IpfError::TruncatedRecord { offset });
        }

        let archive_name = str::from_utf8(&data[names_start..names_start + archive_name_len])?;
        let filename = str::from_utf8(&data[names_start + archive_name_len..names_end])?;

        let payload_end = u64::from(record.data_offset) + u64::from(record.compressed_size);
        if payload_end > directory_offset as u64 {
            return Err(IpfError::EntryOutOfBounds {
                name: filename.to_string(),
            });
        }

        let entry = IpfEntry::new(&record, archive_name.to_string(), filename.to_string());
        Ok((entry, names_end))
    }

    #[must_use]
    pub const fn base_revision(&self) -> u32 {
        self.base_revision
    }

    #[must_use]
    pub const fn subversion(&self) -> u32 {
        self.subversion
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in directory order.
    pub fn entries(&self) -> impl Iterator<Item = &IpfEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn get_entry(&self, relative_path: &str) -> Option<&IpfEntry> {
        self.entries.get(relative_path)
    }

    #[allow(clippy::print_literal)]
    pub fn list_entries(&self, filter: &GlobSet) {
        println!(
            "revision {} / subversion {}, {} entries",
            self.base_revision,
            self.subversion,
            self.entries.len()
        );
        println!("{:<8} {:<12} {:<12} {:<10} {}", "CRC32", "Compressed", "Size", "Offset", "Name");

        for entry in self.entries() {
            if !filter.is_empty() && !filter.is_match(entry.relative_path()) {
                continue;
            }
            println!(
                "{:08x} {:<12} {:<12} {:<#10x} {}",
                entry.crc32(),
                ByteSize::b(u64::from(entry.compressed_size())),
                ByteSize::b(u64::from(entry.uncompressed_size())),
                entry.data_offset(),
                entry.relative_path()
            );
        }
    }
}
