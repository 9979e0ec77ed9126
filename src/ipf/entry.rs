use crate::ipf::bytes::IpfEntryRecord;
use std::ops::Range;

// Extensions stored in clear inside the archive; the cipher never touches
// them, in either direction.
const CLEAR_EXTENSIONS: &[&str] = &["mp3", "fsb", "jpg"];

/// One logical file inside an IPF archive. The payload itself stays in the
/// archive buffer; the entry only records its byte range and metadata.
#[derive(Debug, Clone)]
pub struct IpfEntry {
    filename: String,
    archive_name: String,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    data_offset: u32,
}

impl IpfEntry {
    pub(super) fn new(record: &IpfEntryRecord, archive_name: String, filename: String) -> Self {
        Self {
            filename,
            archive_name,
            crc32: record.crc32,
            compressed_size: record.compressed_size,
            uncompressed_size: record.uncompressed_size,
            data_offset: record.data_offset,
        }
    }

    /// In-archive filename, backslash separators and original case preserved.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Name of the archive this entry claims to belong to, as recorded in
    /// its directory record.
    #[must_use]
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    #[must_use]
    pub const fn crc32(&self) -> u32 {
        self.crc32
    }

    #[must_use]
    pub const fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    #[must_use]
    pub const fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    #[must_use]
    pub const fn data_offset(&self) -> u32 {
        self.data_offset
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.compressed_size == 0
    }

    /// Filename with separators translated for the host filesystem.
    #[must_use]
    pub fn normalized_filename(&self) -> String {
        self.filename.replace('\\', "/")
    }

    /// `<archive name>/<normalized filename>`, the path the entry takes on
    /// relative to the extraction root. Also the key it is listed and
    /// filtered under.
    #[must_use]
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.archive_name, self.normalized_filename())
    }

    fn file_name(&self) -> &str {
        self.filename
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(&self.filename)
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.file_name().rsplit_once('.').map(|(_, ext)| ext)
    }

    #[must_use]
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether the payload is stored unciphered in the archive.
    #[must_use]
    pub fn is_stored_in_clear(&self) -> bool {
        CLEAR_EXTENSIONS.iter().any(|ext| self.has_extension(ext))
    }

    /// Byte range of the (compressed, possibly encrypted) payload within the
    /// archive buffer. Validated against the directory offset at parse time.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = self.data_offset as usize;
        start..start + self.compressed_size as usize
    }

    #[must_use]
    pub fn payload<'a>(&self, archive_data: &'a [u8]) -> &'a [u8] {
        &archive_data[self.range()]
    }
}
