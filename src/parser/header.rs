use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use crate::error::{Error, Result, Section};

use super::bitmap::bitmap_len;
use super::order::ColumnOrder;

/// Reserved width value marking a variable-width column. It is never an
/// ordinary byte count; [`ColumnWidth::from_raw`] is the only place it is
/// interpreted.
pub const VARIABLE_WIDTH: u32 = u32::MAX;

/// Bytes following `header_length` that do not depend on the column count:
/// version (2), filler (1) and number of columns (2).
const HEADER_FIXED_TAIL: usize = 5;

/// Declared width of a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWidth {
    /// Every value occupies exactly this many bytes.
    Fixed(u32),
    /// Each value is preceded by a 4-byte little-endian length.
    Variable,
}

impl ColumnWidth {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        if raw == VARIABLE_WIDTH {
            Self::Variable
        } else {
            Self::Fixed(raw)
        }
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        match self {
            Self::Fixed(width) => width,
            Self::Variable => VARIABLE_WIDTH,
        }
    }

    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::Variable)
    }

    /// Width as shown to users: the byte count, or `-1` for variable width.
    #[must_use]
    pub fn display_value(self) -> i64 {
        match self {
            Self::Fixed(width) => i64::from(width),
            Self::Variable => -1,
        }
    }
}

impl fmt::Display for ColumnWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_value())
    }
}

/// The column definition block that follows the file signature.
///
/// Widths are kept in declared order. An attached [`ColumnOrder`] is only
/// applied when the definitions are written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinitions {
    pub header_length: u32,
    pub version: u16,
    pub filler: u8,
    number_of_columns: u16,
    widths: Vec<u32>,
    column_order: Option<ColumnOrder>,
}

impl ColumnDefinitions {
    /// Builds definitions for the given raw widths, deriving `header_length`
    /// from the column count.
    ///
    /// # Errors
    ///
    /// Returns an error if more than `u16::MAX` columns are supplied.
    pub fn new(version: u16, widths: Vec<u32>) -> Result<Self> {
        let number_of_columns = u16::try_from(widths.len()).map_err(|_| Error::InvalidHeader {
            details: Cow::Owned(format!("{} columns exceed the format limit", widths.len())),
        })?;
        // At most u16::MAX columns, so this always fits in a u32.
        let header_length = u32::try_from(HEADER_FIXED_TAIL + widths.len() * 4)
            .map_err(|_| Error::InvalidHeader {
                details: Cow::from("header length exceeds u32 range"),
            })?;
        Ok(Self {
            header_length,
            version,
            filler: 0,
            number_of_columns,
            widths,
            column_order: None,
        })
    }

    /// Reads the header that immediately follows the signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the stream ends inside the header.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let wrap = |err| Error::from_read(err, Section::Header);

        let header_length = reader.read_u32::<LittleEndian>().map_err(wrap)?;
        let version = reader.read_u16::<LittleEndian>().map_err(wrap)?;
        let filler = reader.read_u8().map_err(wrap)?;
        let number_of_columns = reader.read_u16::<LittleEndian>().map_err(wrap)?;

        let mut widths = vec![0u32; usize::from(number_of_columns)];
        reader
            .read_u32_into::<LittleEndian>(&mut widths)
            .map_err(wrap)?;

        Ok(Self {
            header_length,
            version,
            filler,
            number_of_columns,
            widths,
            column_order: None,
        })
    }

    /// Attaches a 1-based column reorder mapping. An empty mapping clears any
    /// previous order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColumnOrder`] if the mapping is not a
    /// permutation of this header's columns.
    pub fn with_column_order(mut self, mapping: &[u32]) -> Result<Self> {
        self.column_order = if mapping.is_empty() {
            None
        } else {
            Some(ColumnOrder::from_one_based(mapping, self.column_count())?)
        };
        Ok(self)
    }

    #[must_use]
    pub const fn column_order(&self) -> Option<&ColumnOrder> {
        self.column_order.as_ref()
    }

    #[must_use]
    pub const fn number_of_columns(&self) -> u16 {
        self.number_of_columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        usize::from(self.number_of_columns)
    }

    /// Raw widths in declared order.
    #[must_use]
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    #[must_use]
    pub fn width(&self, column: usize) -> ColumnWidth {
        ColumnWidth::from_raw(self.widths[column])
    }

    /// Raw widths in the order they are written out.
    #[must_use]
    pub fn output_widths(&self) -> Vec<u32> {
        self.column_order
            .as_ref()
            .map_or_else(|| self.widths.clone(), |order| order.apply(&self.widths))
    }

    /// Size of the null bitmap preceding every row payload.
    #[must_use]
    pub fn bitmap_len(&self) -> usize {
        bitmap_len(self.column_count())
    }

    /// Serialized size of the header, excluding the signature.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 + HEADER_FIXED_TAIL + self.widths.len() * 4
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.header_length.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(self.filler);
        buf.extend_from_slice(&self.number_of_columns.to_le_bytes());
        for width in self.output_widths() {
            buf.extend_from_slice(&width.to_le_bytes());
        }
        buf
    }

    /// Writes the header, permuting widths if a column order is attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`] if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()).map_err(Error::Sink)
    }

    #[must_use]
    pub fn summary(&self) -> HeaderSummary {
        HeaderSummary {
            header_length: self.header_length,
            version: self.version,
            number_of_columns: self.number_of_columns,
            widths: self
                .output_widths()
                .into_iter()
                .map(|raw| ColumnWidth::from_raw(raw).display_value())
                .collect(),
            column_order: self.column_order.as_ref().map(ColumnOrder::to_one_based),
        }
    }
}

/// Serializable view of the header used by `--print-header --json`.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderSummary {
    pub header_length: u32,
    pub version: u16,
    pub number_of_columns: u16,
    pub widths: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_order: Option<Vec<u32>>,
}
