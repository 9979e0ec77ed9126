mod bytes;
mod error;
mod table;

pub use error::IesError;
pub use table::{ColumnKind, IesColumn, IesRow, IesTable, IesValue};
