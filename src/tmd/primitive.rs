//! The primitive stream: `primitive_count` tagged, variable-length records.
//!
//! Every record starts with a 4-byte [`PrimitiveHeader`]. Its `input_len`
//! (payload length in 32-bit words) is the only thing used to find the next
//! record, whether or not the shape is understood. The shape is chosen by the
//! exact `(flag, mode)` pair.

use tracing::{trace, warn};
use winnow::Parser;
use winnow::binary::{le_u8, le_u16};

use crate::attributes::{ClutPosition, TexturePage};
use crate::error::{DecodeError, DecodeResult, IndexKind};
use crate::parser_utils::{WResult, checked_range};

pub const PRIMITIVE_HEADER_SIZE: usize = 4;

/// Bit of `mode` that is set for polygons and clear for lines.
pub const POLYGON_MODE_BIT: u8 = 1 << 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveHeader {
    /// Length of the packet this primitive expands to, in words.
    pub output_len: u8,
    /// Length of the payload following this header, in words.
    pub input_len: u8,
    pub flag: u8,
    pub mode: u8,
}

impl PrimitiveHeader {
    pub fn tag(&self) -> ShapeTag {
        ShapeTag {
            flag: self.flag,
            mode: self.mode,
        }
    }

    pub fn class(&self) -> PrimitiveClass {
        if self.mode & POLYGON_MODE_BIT != 0 {
            PrimitiveClass::Polygon
        } else {
            PrimitiveClass::Line
        }
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.input_len) * 4
    }

    /// Total bytes occupied by the record, header included.
    pub fn record_len(&self) -> usize {
        PRIMITIVE_HEADER_SIZE + self.payload_len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveClass {
    Polygon,
    Line,
}

/// The `(flag, mode)` pair selecting a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeTag {
    pub flag: u8,
    pub mode: u8,
}

impl ShapeTag {
    pub const fn new(flag: u8, mode: u8) -> Self {
        Self { flag, mode }
    }

    /// Both fields packed into one lookup key, flag in the high byte.
    pub const fn key(&self) -> u16 {
        ((self.flag as u16) << 8) | self.mode as u16
    }
}

/// Record layouts this decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    FlatTriangle,
    GouraudTriangle,
    Line,
    UnlitTriangle,
    UnlitTexturedTriangle,
}

impl Shape {
    pub fn from_tag(tag: ShapeTag) -> Option<Self> {
        match (tag.flag, tag.mode) {
            (0, 0x20) => Some(Shape::FlatTriangle),
            (0, 0x30) => Some(Shape::GouraudTriangle),
            (0 | 1, 0x40) => Some(Shape::Line),
            (1, 0x21) => Some(Shape::UnlitTriangle),
            (1, 0x25) => Some(Shape::UnlitTexturedTriangle),
            _ => None,
        }
    }

    /// Payload bytes the layout reads.
    pub fn layout_len(&self) -> usize {
        match self {
            Shape::FlatTriangle => 12,
            Shape::GouraudTriangle => 16,
            Shape::Line => 8,
            Shape::UnlitTriangle => 12,
            Shape::UnlitTexturedTriangle => 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Uv {
    pub u: u8,
    pub v: u8,
}

/// One corner of a smooth-shaded triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GouraudCorner {
    pub normal: Option<u16>,
    pub vertex: Option<u16>,
}

/// A decoded primitive record.
///
/// Indices point into the enclosing object's vertex and normal arrays. An
/// index that was out of range is `None` and has a matching
/// [`DecodeError::IndexOutOfRange`] in the decode issues.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveRecord {
    /// `(0, 0x20)`: flat-shaded lit triangle.
    FlatTriangle { color: Rgb, vertices: [Option<u16>; 3] },
    /// `(0, 0x30)`: Gouraud-shaded triangle with a normal per corner.
    GouraudTriangle { color: Rgb, corners: [GouraudCorner; 3] },
    /// `(0, 0x40)` and `(1, 0x40)`: flat-shaded line.
    Line { color: Rgb, vertices: [Option<u16>; 2] },
    /// `(1, 0x21)`: flat-shaded triangle without lighting.
    UnlitTriangle { color: Rgb, vertices: [Option<u16>; 3] },
    /// `(1, 0x25)`: textured triangle without lighting.
    UnlitTexturedTriangle {
        uvs: [Uv; 3],
        clut: ClutPosition,
        texture_page: TexturePage,
        color: Rgb,
        vertices: [Option<u16>; 3],
    },
    Unknown { output_len: u8, input_len: u8 },
}

impl PrimitiveRecord {
    pub fn shape(&self) -> Option<Shape> {
        match self {
            PrimitiveRecord::FlatTriangle { .. } => Some(Shape::FlatTriangle),
            PrimitiveRecord::GouraudTriangle { .. } => Some(Shape::GouraudTriangle),
            PrimitiveRecord::Line { .. } => Some(Shape::Line),
            PrimitiveRecord::UnlitTriangle { .. } => Some(Shape::UnlitTriangle),
            PrimitiveRecord::UnlitTexturedTriangle { .. } => Some(Shape::UnlitTexturedTriangle),
            PrimitiveRecord::Unknown { .. } => None,
        }
    }
}

/// A record together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Primitive {
    /// Absolute byte offset of the record header.
    pub offset: usize,
    pub header: PrimitiveHeader,
    pub record: PrimitiveRecord,
}

impl Primitive {
    pub fn class(&self) -> PrimitiveClass {
        self.header.class()
    }
}

/// Result of walking one object's primitive stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveStream {
    pub primitives: Vec<Primitive>,
    /// Cursor position after the last record.
    pub end: usize,
}

/// Counts the indices of one object are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBounds {
    pub vertex_count: u32,
    pub normal_count: u32,
}

fn parse_primitive_header(input: &mut &[u8]) -> WResult<PrimitiveHeader> {
    let output_len = le_u8.parse_next(input)?;
    let input_len = le_u8.parse_next(input)?;
    let flag = le_u8.parse_next(input)?;
    let mode = le_u8.parse_next(input)?;
    Ok(PrimitiveHeader {
        output_len,
        input_len,
        flag,
        mode,
    })
}

fn parse_rgb(input: &mut &[u8]) -> WResult<Rgb> {
    let r = le_u8.parse_next(input)?;
    let g = le_u8.parse_next(input)?;
    let b = le_u8.parse_next(input)?;
    Ok(Rgb { r, g, b })
}

fn parse_uv(input: &mut &[u8]) -> WResult<Uv> {
    let u = le_u8.parse_next(input)?;
    let v = le_u8.parse_next(input)?;
    Ok(Uv { u, v })
}

fn parse_index(input: &mut &[u8]) -> WResult<Option<u16>> {
    le_u16.map(Some).parse_next(input)
}

fn parse_flat_triangle(input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    let color = parse_rgb(input)?;
    let _mode = le_u8.parse_next(input)?;
    let _normal = le_u16.parse_next(input)?;
    let vertices = [parse_index(input)?, parse_index(input)?, parse_index(input)?];
    Ok(PrimitiveRecord::FlatTriangle { color, vertices })
}

fn parse_gouraud_corner(input: &mut &[u8]) -> WResult<GouraudCorner> {
    let normal = parse_index(input)?;
    let vertex = parse_index(input)?;
    Ok(GouraudCorner { normal, vertex })
}

fn parse_gouraud_triangle(input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    let color = parse_rgb(input)?;
    let _mode = le_u8.parse_next(input)?;
    let corners = [
        parse_gouraud_corner(input)?,
        parse_gouraud_corner(input)?,
        parse_gouraud_corner(input)?,
    ];
    Ok(PrimitiveRecord::GouraudTriangle { color, corners })
}

fn parse_line(input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    let color = parse_rgb(input)?;
    let _mode = le_u8.parse_next(input)?;
    let vertices = [parse_index(input)?, parse_index(input)?];
    Ok(PrimitiveRecord::Line { color, vertices })
}

fn parse_unlit_triangle(input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    let color = parse_rgb(input)?;
    let _mode = le_u8.parse_next(input)?;
    let vertices = [parse_index(input)?, parse_index(input)?, parse_index(input)?];
    let _pad = le_u16.parse_next(input)?;
    Ok(PrimitiveRecord::UnlitTriangle { color, vertices })
}

fn parse_unlit_textured_triangle(input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    let uv0 = parse_uv(input)?;
    let clut = le_u16.map(ClutPosition::from_word).parse_next(input)?;
    let uv1 = parse_uv(input)?;
    let texture_page = le_u16.map(TexturePage::from_word).parse_next(input)?;
    let uv2 = parse_uv(input)?;
    let _pad = le_u16.parse_next(input)?;
    let color = parse_rgb(input)?;
    let _pad = le_u8.parse_next(input)?;
    let vertices = [parse_index(input)?, parse_index(input)?, parse_index(input)?];
    let _pad = le_u16.parse_next(input)?;
    Ok(PrimitiveRecord::UnlitTexturedTriangle {
        uvs: [uv0, uv1, uv2],
        clut,
        texture_page,
        color,
        vertices,
    })
}

fn parse_shape(shape: Shape, input: &mut &[u8]) -> WResult<PrimitiveRecord> {
    match shape {
        Shape::FlatTriangle => parse_flat_triangle(input),
        Shape::GouraudTriangle => parse_gouraud_triangle(input),
        Shape::Line => parse_line(input),
        Shape::UnlitTriangle => parse_unlit_triangle(input),
        Shape::UnlitTexturedTriangle => parse_unlit_textured_triangle(input),
    }
}

/// Replaces out-of-range indices with `None` and records why.
struct IndexChecker<'a> {
    object: usize,
    primitive: usize,
    bounds: IndexBounds,
    issues: &'a mut Vec<DecodeError>,
}

impl IndexChecker<'_> {
    fn check(&mut self, kind: IndexKind, index: &mut Option<u16>) {
        let Some(value) = *index else {
            return;
        };
        let count = match kind {
            IndexKind::Vertex => self.bounds.vertex_count,
            IndexKind::Normal => self.bounds.normal_count,
        };
        if u32::from(value) >= count {
            self.issues.push(DecodeError::IndexOutOfRange {
                object: self.object,
                primitive: self.primitive,
                kind,
                index: value,
                count,
            });
            *index = None;
        }
    }

    fn check_vertices(&mut self, vertices: &mut [Option<u16>]) {
        for vertex in vertices {
            self.check(IndexKind::Vertex, vertex);
        }
    }

    fn check_record(&mut self, record: &mut PrimitiveRecord) {
        match record {
            PrimitiveRecord::GouraudTriangle { corners, .. } => {
                for corner in corners {
                    self.check(IndexKind::Normal, &mut corner.normal);
                    self.check(IndexKind::Vertex, &mut corner.vertex);
                }
            }
            PrimitiveRecord::FlatTriangle { vertices, .. }
            | PrimitiveRecord::UnlitTriangle { vertices, .. }
            | PrimitiveRecord::UnlitTexturedTriangle { vertices, .. } => {
                self.check_vertices(vertices)
            }
            PrimitiveRecord::Line { vertices, .. } => self.check_vertices(vertices),
            PrimitiveRecord::Unknown { .. } => {}
        }
    }
}

/// Walk `count` primitive records starting at absolute offset `start`.
///
/// A record that would extend past the buffer fails the walk with
/// `TruncatedStream`. Bad indices and known shapes with a short payload are
/// pushed to `issues` and the walk continues.
pub fn decode_primitives(
    file_data: &[u8],
    object: usize,
    start: usize,
    count: u32,
    bounds: IndexBounds,
    issues: &mut Vec<DecodeError>,
) -> DecodeResult<PrimitiveStream> {
    let max_records = file_data.len().saturating_sub(start) / PRIMITIVE_HEADER_SIZE;
    let mut primitives = Vec::with_capacity((count as usize).min(max_records));
    let mut cursor = start;

    for primitive in 0..count as usize {
        let truncated = |needed: usize| DecodeError::TruncatedStream {
            object,
            primitive,
            offset: cursor,
            needed,
            available: file_data.len(),
        };

        let header_range = checked_range(cursor, PRIMITIVE_HEADER_SIZE, file_data.len())
            .map_err(|_| truncated(PRIMITIVE_HEADER_SIZE))?;
        let header = parse_primitive_header(&mut &file_data[header_range.clone()])
            .map_err(|_| truncated(PRIMITIVE_HEADER_SIZE))?;

        let record_len = header.record_len();
        let payload_range = checked_range(header_range.end, header.payload_len(), file_data.len())
            .map_err(|_| truncated(record_len))?;
        let payload = &file_data[payload_range.clone()];

        let tag = header.tag();
        let record = match Shape::from_tag(tag) {
            Some(shape) if payload.len() < shape.layout_len() => {
                warn!(object, primitive, ?shape, "primitive payload shorter than its layout");
                issues.push(DecodeError::PayloadTooShort {
                    object,
                    primitive,
                    declared: payload.len(),
                    needed: shape.layout_len(),
                });
                unknown_record(&header)
            }
            Some(shape) => {
                let mut record =
                    parse_shape(shape, &mut &payload[..]).map_err(|_| truncated(record_len))?;
                let mut checker = IndexChecker {
                    object,
                    primitive,
                    bounds,
                    issues: &mut *issues,
                };
                checker.check_record(&mut record);
                record
            }
            None => unknown_record(&header),
        };

        trace!(
            object,
            primitive,
            offset = cursor,
            flag = tag.flag,
            mode = tag.mode,
            class = ?header.class(),
            "decoded primitive"
        );

        primitives.push(Primitive {
            offset: cursor,
            header,
            record,
        });
        cursor = payload_range.end;
    }

    Ok(PrimitiveStream {
        primitives,
        end: cursor,
    })
}

fn unknown_record(header: &PrimitiveHeader) -> PrimitiveRecord {
    PrimitiveRecord::Unknown {
        output_len: header.output_len,
        input_len: header.input_len,
    }
}
