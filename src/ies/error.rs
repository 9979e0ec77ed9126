use thiserror::Error;

#[derive(Debug, Error)]
pub enum IesError {
    #[error("malformed table header: {0}")]
    BadHeader(&'static str),

    #[error("column type tag {0} is not a known cell kind")]
    BadColumnType(u16),

    #[error("row {row} reads past its region at offset {offset:#x}")]
    CellOutOfBounds { row: usize, offset: usize },

    #[error("column name is not valid UTF-8 after deobfuscation")]
    BadName(#[from] std::str::Utf8Error),

    #[error("row {row} holds a string cell that is not valid UTF-8")]
    BadCellText { row: usize },
}
