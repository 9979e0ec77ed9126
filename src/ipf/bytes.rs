use bincode::config::{Configuration as BincodeConfig, Fixint, LittleEndian};
use bincode::Decode;

// Structs here are the on-disk byte representations decoded with bincode;
// the logical views live in `archive` and `entry`.

#[derive(Debug, Decode)]
pub struct IpfFooter {
    pub(super) entry_count: u16,
    pub(super) directory_offset: u32,
    _padding: u16,
    _footer_offset: u32,
    pub(super) magic: u32,
    pub(super) base_revision: u32,
    pub(super) subversion: u32,
}

#[derive(Debug, Decode)]
pub struct IpfEntryRecord {
    pub(super) filename_len: u16,
    pub(super) crc32: u32,
    pub(super) compressed_size: u32,
    pub(super) uncompressed_size: u32,
    pub(super) data_offset: u32,
    pub(super) archive_name_len: u16,
}

// Fixed footer tail of the archive and fixed prefix of a directory record.
pub(super) const FOOTER_LEN: usize = 24;
pub(super) const RECORD_FIXED_LEN: usize = 20;

type IpfConfig = BincodeConfig<LittleEndian, Fixint>;

const BINCODE_CONFIG: IpfConfig = bincode::config::standard()
    .with_little_endian()
    .with_fixed_int_encoding();

pub(super) fn decode_at<D: Decode<()>>(data: &[u8], offset: usize) -> Option<(D, usize)> {
    let src = data.get(offset..)?;
    bincode::decode_from_slice::<D, IpfConfig>(src, BINCODE_CONFIG).ok()
}
