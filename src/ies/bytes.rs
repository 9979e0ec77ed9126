use crate::ies::error::IesError;
use bincode::config::{Configuration as BincodeConfig, Fixint, LittleEndian};
use bincode::Decode;
use std::str;

// On-disk byte representations; `table` holds the logical views built from
// them.

#[derive(Debug, Decode)]
pub struct IesHeaderRaw {
    pub(super) name: [u8; 64],
    pub(super) row_data_size: u32,
    pub(super) row_stride: u32,
    pub(super) rows: u32,
    pub(super) scalar_columns: u32,
    pub(super) string_columns: u32,
    _reserved: [u8; 44],
}

#[derive(Debug, Decode)]
pub struct IesColumnRaw {
    pub(super) name: [u8; 64],
    pub(super) name2: [u8; 64],
    pub(super) kind: u16,
    pub(super) order: u16,
    pub(super) offset: u16,
}

pub(super) const HEADER_LEN: usize = 128;
pub(super) const COLUMN_LEN: usize = 134;

type IesConfig = BincodeConfig<LittleEndian, Fixint>;

const BINCODE_CONFIG: IesConfig = bincode::config::standard()
    .with_little_endian()
    .with_fixed_int_encoding();

pub(super) fn decode_at<D: Decode<()>>(data: &[u8], offset: usize) -> Option<(D, usize)> {
    let src = data.get(offset..)?;
    bincode::decode_from_slice::<D, IesConfig>(src, BINCODE_CONFIG).ok()
}

/// Inverts the column-name obfuscation in place: XOR every byte with 0x01,
/// then swap each adjacent byte pair. The transform is its own inverse.
pub(super) fn unscramble(field: &mut [u8; 64]) {
    for b in field.iter_mut() {
        *b ^= 0x01;
    }
    for i in (0..field.len()).step_by(2) {
        field.swap(i, i + 1);
    }
}

/// Recovers the UTF-8 text of an obfuscated 64-byte name field, truncated at
/// the first NUL.
pub(super) fn name_to_string(field: &[u8; 64]) -> Result<String, IesError> {
    let mut buf = *field;
    unscramble(&mut buf);
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(str::from_utf8(&buf[..end])?.to_string())
}

/// The display name in the table header is stored in clear.
pub(super) fn clear_name_to_string(field: &[u8; 64]) -> Result<String, IesError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(str::from_utf8(&field[..end])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscramble_is_self_inverse() {
        let mut field = [0u8; 64];
        for (i, b) in field.iter_mut().enumerate() {
            *b = (i * 31 + 5) as u8;
        }
        let original = field;

        unscramble(&mut field);
        assert_ne!(field, original);
        unscramble(&mut field);
        assert_eq!(field, original);
    }

    #[test]
    fn scrambled_name_round_trips() {
        let mut field = [0u8; 64];
        field[..7].copy_from_slice(b"ClassID");
        unscramble(&mut field);

        assert_eq!(name_to_string(&field).unwrap(), "ClassID");
    }
}
