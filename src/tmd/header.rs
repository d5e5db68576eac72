use winnow::Parser;
use winnow::binary::le_u32;

use crate::error::{DecodeError, DecodeResult};
use crate::parser_utils::WResult;

/// Magic value in the first word of every TMD file.
pub const TMD_MAGIC: u32 = 0x0000_0041;

/// Size of the file header; object offsets are relative to its end.
pub const FILE_HEADER_SIZE: usize = 12;

/// The fixed 12-byte file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHeader {
    pub magic: u32,
    /// Raw layout flag. Zero means section offsets, nonzero means the object
    /// table holds relocated pointers.
    pub flags: u32,
    pub object_count: u32,
}

impl FileHeader {
    pub fn uses_offsets(&self) -> bool {
        self.flags == 0
    }
}

fn parse_header_fields(input: &mut &[u8]) -> WResult<FileHeader> {
    let magic = le_u32.parse_next(input)?;
    let flags = le_u32.parse_next(input)?;
    let object_count = le_u32.parse_next(input)?;
    Ok(FileHeader {
        magic,
        flags,
        object_count,
    })
}

/// Parse and validate the file header at the start of `file_data`.
///
/// Fails with `FormatMismatch` for short buffers or a wrong magic, and with
/// `UnsupportedVariant` for pointer-relocated files.
pub fn parse_file_header(file_data: &[u8]) -> DecodeResult<FileHeader> {
    let header = parse_header_fields(&mut &file_data[..]).map_err(|_| DecodeError::FormatMismatch {
        found: None,
        expected: TMD_MAGIC,
    })?;

    if header.magic != TMD_MAGIC {
        return Err(DecodeError::FormatMismatch {
            found: Some(header.magic),
            expected: TMD_MAGIC,
        });
    }
    if !header.uses_offsets() {
        return Err(DecodeError::UnsupportedVariant { flag: header.flags });
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: u32, flags: u32, count: u32) -> Vec<u8> {
        [magic, flags, count]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    #[test]
    fn valid_header() {
        let header = parse_file_header(&header_bytes(TMD_MAGIC, 0, 3)).unwrap();
        assert!(header.uses_offsets());
        assert_eq!(header.object_count, 3);
    }

    #[test]
    fn short_buffers() {
        let full = header_bytes(TMD_MAGIC, 0, 1);
        for len in 0..FILE_HEADER_SIZE {
            assert_eq!(
                parse_file_header(&full[..len]),
                Err(DecodeError::FormatMismatch {
                    found: None,
                    expected: TMD_MAGIC
                })
            );
        }
    }

    #[test]
    fn wrong_magic() {
        assert_eq!(
            parse_file_header(&header_bytes(0x50, 0, 1)),
            Err(DecodeError::FormatMismatch {
                found: Some(0x50),
                expected: TMD_MAGIC
            })
        );
    }

    #[test]
    fn pointer_variant_rejected() {
        assert_eq!(
            parse_file_header(&header_bytes(TMD_MAGIC, 1, 1)),
            Err(DecodeError::UnsupportedVariant { flag: 1 })
        );
    }
}
