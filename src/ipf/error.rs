use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpfError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed archive footer: {0}")]
    MalformedFooter(&'static str),

    #[error("entry '{name}' does not fit inside the pre-directory region")]
    EntryOutOfBounds { name: String },

    #[error("directory record truncated at offset {offset:#x}")]
    TruncatedRecord { offset: usize },

    #[error("entry name of {len} bytes exceeds the 1024-byte limit")]
    NameTooLong { len: usize },

    #[error("entry name is not valid UTF-8")]
    BadEntryName(#[from] std::str::Utf8Error),

    #[error("zlib inflate failed: {0}")]
    DecompressFailed(#[source] io::Error),

    #[error("cipher invoked on an empty byte range")]
    CipherMisuse,
}
