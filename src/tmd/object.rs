//! Object table entries and their vertex/normal sections.
//!
//! Every offset in an object header is measured from the end of the file
//! header, not from the object header itself. This matches the files the
//! format was observed in; consumers re-encoding objects must keep it.

use std::ops::Range;

use winnow::Parser;
use winnow::binary::{le_i16, le_i32, le_u16, le_u32};
use winnow::combinator::repeat;

use crate::error::{DecodeError, DecodeResult, Section};
use crate::fixed_point::fixed_triplet_to_f32;
use crate::parser_utils::{WResult, array_len, checked_range, checked_slice, resolve_offset};

use super::header::FILE_HEADER_SIZE;

pub const OBJECT_HEADER_SIZE: usize = 28;
pub const VERTEX_SIZE: usize = 8;
pub const NORMAL_SIZE: usize = 8;
/// Smallest possible primitive record (a bare header).
pub const MIN_PRIMITIVE_SIZE: usize = 4;

/// Base address all object section offsets are relative to.
pub const SECTION_BASE: usize = FILE_HEADER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectHeader {
    pub vertices_offset: u32,
    pub vertex_count: u32,
    pub normals_offset: u32,
    pub normal_count: u32,
    pub primitives_offset: u32,
    pub primitive_count: u32,
    pub scale_exponent: i32,
}

impl ObjectHeader {
    /// Uniform scale factor `2^scale_exponent`. Not applied to vertices.
    pub fn scale(&self) -> f32 {
        2f32.powf(self.scale_exponent as f32)
    }
}

/// Raw integer vertex position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Normal with components converted from fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Normal {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Absolute byte ranges of one object's sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSections {
    pub vertices: Range<usize>,
    pub normals: Range<usize>,
    /// Start of the primitive stream. Its length is only known by walking it.
    pub primitives_start: usize,
}

pub fn parse_object_header(input: &mut &[u8]) -> WResult<ObjectHeader> {
    let vertices_offset = le_u32.parse_next(input)?;
    let vertex_count = le_u32.parse_next(input)?;
    let normals_offset = le_u32.parse_next(input)?;
    let normal_count = le_u32.parse_next(input)?;
    let primitives_offset = le_u32.parse_next(input)?;
    let primitive_count = le_u32.parse_next(input)?;
    let scale_exponent = le_i32.parse_next(input)?;
    Ok(ObjectHeader {
        vertices_offset,
        vertex_count,
        normals_offset,
        normal_count,
        primitives_offset,
        primitive_count,
        scale_exponent,
    })
}

/// Parse the `object_count` headers that follow the file header.
pub fn parse_object_table(file_data: &[u8], object_count: u32) -> DecodeResult<Vec<ObjectHeader>> {
    let out_of_range = |len: usize| DecodeError::OffsetOutOfRange {
        object: 0,
        section: Section::ObjectTable,
        offset: FILE_HEADER_SIZE,
        len,
        available: file_data.len(),
    };

    let table_len =
        array_len(object_count, OBJECT_HEADER_SIZE).ok_or_else(|| out_of_range(usize::MAX))?;
    let range = checked_range(FILE_HEADER_SIZE, table_len, file_data.len())
        .map_err(|_| out_of_range(table_len))?;

    let input = &mut &file_data[range];
    repeat(object_count as usize, parse_object_header)
        .parse_next(input)
        .map_err(|_| out_of_range(table_len))
}

fn resolve_section(
    object: usize,
    section: Section,
    offset: u32,
    count: u32,
    stride: usize,
    available: usize,
) -> DecodeResult<Range<usize>> {
    let start = resolve_offset(SECTION_BASE, offset);
    let len = array_len(count, stride);
    let (Some(start), Some(len)) = (start, len) else {
        return Err(DecodeError::OffsetOutOfRange {
            object,
            section,
            offset: start.unwrap_or(usize::MAX),
            len: len.unwrap_or(usize::MAX),
            available,
        });
    };

    checked_range(start, len, available).map_err(|oob| DecodeError::OffsetOutOfRange {
        object,
        section,
        offset: oob.offset,
        len: oob.len,
        available: oob.available,
    })
}

/// Compute the absolute section ranges of object `object`, checking each
/// against a buffer of `available` bytes.
///
/// The primitive section is checked against its minimum size (one header per
/// record); [`decode_primitives`](super::primitive::decode_primitives) checks
/// each record as it walks the stream.
pub fn resolve_sections(
    object: usize,
    header: &ObjectHeader,
    available: usize,
) -> DecodeResult<ObjectSections> {
    let vertices = resolve_section(
        object,
        Section::Vertices,
        header.vertices_offset,
        header.vertex_count,
        VERTEX_SIZE,
        available,
    )?;
    let normals = resolve_section(
        object,
        Section::Normals,
        header.normals_offset,
        header.normal_count,
        NORMAL_SIZE,
        available,
    )?;
    let primitives = resolve_section(
        object,
        Section::Primitives,
        header.primitives_offset,
        header.primitive_count,
        MIN_PRIMITIVE_SIZE,
        available,
    )?;

    Ok(ObjectSections {
        vertices,
        normals,
        primitives_start: primitives.start,
    })
}

fn parse_vertex(input: &mut &[u8]) -> WResult<Vertex> {
    let x = le_i16.parse_next(input)?;
    let y = le_i16.parse_next(input)?;
    let z = le_i16.parse_next(input)?;
    let _pad = le_u16.parse_next(input)?;
    Ok(Vertex { x, y, z })
}

fn parse_normal(input: &mut &[u8]) -> WResult<Normal> {
    let x = le_u16.parse_next(input)?;
    let y = le_u16.parse_next(input)?;
    let z = le_u16.parse_next(input)?;
    let _pad = le_u16.parse_next(input)?;
    let [x, y, z] = fixed_triplet_to_f32([x, y, z]);
    Ok(Normal { x, y, z })
}

fn section_truncated(
    object: usize,
    section: Section,
    range: &Range<usize>,
    available: usize,
) -> DecodeError {
    DecodeError::OffsetOutOfRange {
        object,
        section,
        offset: range.start,
        len: range.len(),
        available,
    }
}

/// Decode the vertex array in `range`.
///
/// `range` normally comes from [`resolve_sections`]; it is re-checked here so
/// a hand-built range cannot read past the buffer.
pub fn decode_vertices(
    file_data: &[u8],
    object: usize,
    range: Range<usize>,
) -> DecodeResult<Vec<Vertex>> {
    let truncated = || section_truncated(object, Section::Vertices, &range, file_data.len());
    let bytes = checked_slice(file_data, range.start, range.len()).map_err(|_| truncated())?;
    let count = bytes.len() / VERTEX_SIZE;
    repeat(count, parse_vertex)
        .parse_next(&mut &bytes[..])
        .map_err(|_| truncated())
}

/// Decode the normal array in `range`, converting each component from fixed point.
pub fn decode_normals(
    file_data: &[u8],
    object: usize,
    range: Range<usize>,
) -> DecodeResult<Vec<Normal>> {
    let truncated = || section_truncated(object, Section::Normals, &range, file_data.len());
    let bytes = checked_slice(file_data, range.start, range.len()).map_err(|_| truncated())?;
    let count = bytes.len() / NORMAL_SIZE;
    repeat(count, parse_normal)
        .parse_next(&mut &bytes[..])
        .map_err(|_| truncated())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ObjectHeader {
        ObjectHeader {
            vertices_offset: 0x1C,
            vertex_count: 2,
            normals_offset: 0x2C,
            normal_count: 1,
            primitives_offset: 0x34,
            primitive_count: 0,
            scale_exponent: 0,
        }
    }

    #[test]
    fn scale_uses_exponent() {
        let mut h = header();
        assert_eq!(h.scale(), 1.0);
        h.scale_exponent = -1;
        assert_eq!(h.scale(), 0.5);
        h.scale_exponent = 3;
        assert_eq!(h.scale(), 8.0);
    }

    #[test]
    fn sections_are_relative_to_file_header_end() {
        let sections = resolve_sections(0, &header(), 0x100).unwrap();
        assert_eq!(sections.vertices, 0x28..0x38);
        assert_eq!(sections.normals, 0x38..0x40);
        assert_eq!(sections.primitives_start, 0x40);
    }

    #[test]
    fn section_past_end() {
        let mut h = header();
        h.normal_count = 100;
        assert_eq!(
            resolve_sections(2, &h, 0x100),
            Err(DecodeError::OffsetOutOfRange {
                object: 2,
                section: Section::Normals,
                offset: 0x38,
                len: 800,
                available: 0x100,
            })
        );
    }

    #[test]
    fn primitive_count_checked_against_minimum_size() {
        let mut h = header();
        h.primitive_count = 0x40;
        let err = resolve_sections(0, &h, 0x100).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::OffsetOutOfRange {
                section: Section::Primitives,
                ..
            }
        ));
    }

    #[test]
    fn huge_offsets_do_not_overflow() {
        let mut h = header();
        h.vertices_offset = u32::MAX;
        h.vertex_count = u32::MAX;
        assert!(resolve_sections(0, &h, 0x100).is_err());
    }

    #[test]
    fn object_table_truncated() {
        let data = [0u8; FILE_HEADER_SIZE + OBJECT_HEADER_SIZE];
        assert_eq!(parse_object_table(&data, 1).unwrap().len(), 1);
        assert!(matches!(
            parse_object_table(&data, 2),
            Err(DecodeError::OffsetOutOfRange {
                section: Section::ObjectTable,
                ..
            })
        ));
    }

    #[test]
    fn vertex_and_normal_records() {
        let mut data = vec![0u8; 4];
        for word in [1i16, -2, 3, 0x7777] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        for word in [0x1000u16, 0x8800, 0x0000, 0xFFFF] {
            data.extend_from_slice(&word.to_le_bytes());
        }

        let vertices = decode_vertices(&data, 0, 4..12).unwrap();
        assert_eq!(vertices, [Vertex { x: 1, y: -2, z: 3 }]);

        let normals = decode_normals(&data, 0, 12..20).unwrap();
        assert_eq!(
            normals,
            [Normal {
                x: 1.0,
                y: -0.5,
                z: 0.0
            }]
        );

        assert!(decode_vertices(&data, 0, 16..24).is_err());
    }
}
