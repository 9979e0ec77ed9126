use crate::ies::bytes::{self, IesColumnRaw, IesHeaderRaw};
use crate::ies::error::IesError;
use byteorder::{ByteOrder, LE};
use std::io::{self, Write};
use std::str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Text,
}

impl ColumnKind {
    // Tags 1 and 2 are both strings; the distinction does not survive into
    // the decoded table.
    fn from_tag(tag: u16) -> Result<Self, IesError> {
        match tag {
            0 => Ok(Self::Float),
            1 | 2 => Ok(Self::Text),
            other => Err(IesError::BadColumnType(other)),
        }
    }
}

#[derive(Debug)]
pub struct IesColumn {
    pub name: String,
    pub name2: String,
    pub kind: ColumnKind,
    pub order: u16,
    pub offset: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IesValue {
    Float(f32),
    Text(String),
}

#[derive(Debug)]
pub struct IesRow {
    pub id: Option<u32>,
    /// Cells aligned to `IesTable::columns` by index.
    pub cells: Vec<IesValue>,
}

/// A decoded IES table: columns in declaration order, rows with cells
/// aligned to those columns. Views are built per archive entry and dropped
/// after emission.
#[derive(Debug)]
pub struct IesTable {
    pub name: String,
    pub columns: Vec<IesColumn>,
    pub rows: Vec<IesRow>,
}

impl IesTable {
    pub fn parse(data: &[u8]) -> Result<Self, IesError> {
        let (header, _) = bytes::decode_at::<IesHeaderRaw>(data, 0)
            .ok_or(IesError::BadHeader("truncated header"))?;

        let rows_count = header.rows as usize;
        let scalar_columns = header.scalar_columns as usize;
        let string_columns = header.string_columns as usize;
        let columns_count = scalar_columns + string_columns;
        let row_stride = header.row_stride as usize;

        let columns_end = columns_count
            .checked_mul(bytes::COLUMN_LEN)
            .and_then(|len| len.checked_add(bytes::HEADER_LEN))
            .filter(|&end| end <= data.len())
            .ok_or(IesError::BadHeader("column region exceeds the buffer"))?;
        let rows_start = data
            .len()
            .checked_sub(header.row_data_size as usize)
            .filter(|&start| start >= columns_end)
            .ok_or(IesError::BadHeader("row region exceeds the buffer"))?;

        // Whatever sits between the descriptors and the row region is the
        // row-id array, or nothing.
        let has_row_ids = match rows_start - columns_end {
            0 => false,
            gap if gap == rows_count * 4 => true,
            _ => {
                return Err(IesError::BadHeader(
                    "unexpected bytes between columns and rows",
                ))
            }
        };

        let columns = Self::parse_columns(data, columns_count)?;
        let scalars_declared = columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Float)
            .count();
        if scalars_declared != scalar_columns {
            return Err(IesError::BadHeader(
                "column kinds disagree with header counts",
            ));
        }

        // Strings are packed in column sort order; ties keep declaration
        // order.
        let mut text_order: Vec<usize> = (0..columns.len())
            .filter(|&i| columns[i].kind == ColumnKind::Text)
            .collect();
        text_order.sort_by_key(|&i| columns[i].order);

        let mut rows = Vec::with_capacity(rows_count);
        let mut cursor = rows_start;
        for row_idx in 0..rows_count {
            let id = has_row_ids.then(|| LE::read_u32(&data[columns_end + row_idx * 4..]));
            let (row, next) = Self::parse_row(
                data,
                cursor,
                row_idx,
                id,
                &columns,
                &text_order,
                row_stride,
                string_columns,
            )?;
            rows.push(row);
            cursor = next;
        }

        Ok(Self {
            name: bytes::clear_name_to_string(&header.name)?,
            columns,
            rows,
        })
    }

    fn parse_columns(data: &[u8], count: usize) -> Result<Vec<IesColumn>, IesError> {
        let mut columns = Vec::with_capacity(count);
        for i in 0..count {
            let (raw, _) =
                bytes::decode_at::<IesColumnRaw>(data, bytes::HEADER_LEN + i * bytes::COLUMN_LEN)
                    .ok_or(IesError::BadHeader("truncated column descriptor"))?;
            columns.push(IesColumn {
                name: bytes::name_to_string(&raw.name)?,
                name2: bytes::name_to_string(&raw.name2)?,
                kind: ColumnKind::from_tag(raw.kind)?,
                order: raw.order,
                offset: raw.offset,
            });
        }
        Ok(columns)
    }

    // One row: float cells at their declared offsets within the fixed
    // portion, string cells walked sequentially behind it, then the
    // option-flag tail. Returns the row and the offset of the next one.
    #[allow(clippy::too_many_arguments)]
    fn parse_row(
        data: &[u8],
        start: usize,
        row_idx: usize,
        id: Option<u32>,
        columns: &[IesColumn],
        text_order: &[usize],
        row_stride: usize,
        string_columns: usize,
    ) -> Result<(IesRow, usize), IesError> {
        let out_of_bounds = |offset| IesError::CellOutOfBounds {
            row: row_idx,
            offset,
        };

        let fixed_end = start
            .checked_add(row_stride)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| out_of_bounds(start))?;

        let mut cells = vec![IesValue::Float(0.0); columns.len()];
        for (idx, column) in columns.iter().enumerate() {
            if column.kind != ColumnKind::Float {
                continue;
            }
            let offset = column.offset as usize;
            if offset + 4 > row_stride {
                return Err(out_of_bounds(start + offset));
            }
            cells[idx] = IesValue::Float(LE::read_f32(&data[start + offset..]));
        }

        let mut var = fixed_end;
        for &idx in text_order {
            let len_bytes = data.get(var..var + 2).ok_or_else(|| out_of_bounds(var))?;
            let len = usize::from(LE::read_u16(len_bytes));
            let text = data
                .get(var + 2..var + 2 + len)
                .ok_or_else(|| out_of_bounds(var))?;
            let text =
                str::from_utf8(text).map_err(|_| IesError::BadCellText { row: row_idx })?;
            cells[idx] = IesValue::Text(text.to_string());
            var += 2 + len;
        }

        let next = var
            .checked_add(string_columns)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| out_of_bounds(var))?;

        Ok((IesRow { id, cells }, next))
    }

    /// Emits the table as CSV: one header line of column names, then one
    /// line per row. Floats that carry an integral value print without a
    /// decimal point; strings are double-quoted verbatim.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(out, ",")?;
            }
            write!(out, "{}", column.name)?;
        }
        writeln!(out)?;

        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                match cell {
                    IesValue::Float(value) => {
                        if value.fract() == 0.0 {
                            write!(out, "{}", *value as i64)?;
                        } else {
                            write!(out, "{value}")?;
                        }
                    }
                    IesValue::Text(text) => write!(out, "\"{text}\"")?,
                }
            }
            writeln!(out)?;
        }

        Ok(())
    }
}
