use thiserror::Error;

/// Which part of the file a byte range belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Section {
    ObjectTable,
    Vertices,
    Normals,
    Primitives,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Section::ObjectTable => "object table",
            Section::Vertices => "vertices",
            Section::Normals => "normals",
            Section::Primitives => "primitives",
        };
        f.write_str(name)
    }
}

/// Which table a primitive index points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexKind {
    Vertex,
    Normal,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Vertex => f.write_str("vertex"),
            IndexKind::Normal => f.write_str("normal"),
        }
    }
}

/// Errors produced while decoding a TMD buffer.
///
/// `FormatMismatch`, `UnsupportedVariant`, `OffsetOutOfRange` and
/// `TruncatedStream` end the decode (or, under
/// [`ObjectErrorPolicy::Skip`](crate::tmd::ObjectErrorPolicy::Skip), the
/// enclosing object). `IndexOutOfRange` and `PayloadTooShort` are collected in
/// [`DecodedFile::issues`](crate::tmd::DecodedFile::issues) and decoding continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    /// `found` is `None` when the buffer is too short to hold a file header.
    #[error("not a TMD file: expected magic 0x{expected:08X}, found {found:X?}")]
    FormatMismatch { found: Option<u32>, expected: u32 },
    #[error("pointer-relocated TMD files are not supported (flag = 0x{flag:X})")]
    UnsupportedVariant { flag: u32 },
    #[error(
        "object {object}: {section} section 0x{offset:X}+0x{len:X} exceeds 0x{available:X} bytes"
    )]
    OffsetOutOfRange {
        object: usize,
        section: Section,
        offset: usize,
        len: usize,
        available: usize,
    },
    #[error(
        "object {object}: primitive {primitive} at 0x{offset:X} is truncated (needs 0x{needed:X})"
    )]
    TruncatedStream {
        object: usize,
        primitive: usize,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("object {object}: primitive {primitive} references {kind} {index}, object has {count}")]
    IndexOutOfRange {
        object: usize,
        primitive: usize,
        kind: IndexKind,
        index: u16,
        count: u32,
    },
    #[error(
        "object {object}: primitive {primitive} has {declared} payload bytes, layout needs {needed}"
    )]
    PayloadTooShort {
        object: usize,
        primitive: usize,
        declared: usize,
        needed: usize,
    },
}

impl DecodeError {
    /// Whether decoding may continue after this error was recorded.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::IndexOutOfRange { .. } | DecodeError::PayloadTooShort { .. }
        )
    }

    /// The object ordinal this error is attributed to, if any.
    pub fn object(&self) -> Option<usize> {
        match self {
            DecodeError::FormatMismatch { .. } | DecodeError::UnsupportedVariant { .. } => None,
            DecodeError::OffsetOutOfRange { object, .. }
            | DecodeError::TruncatedStream { object, .. }
            | DecodeError::IndexOutOfRange { object, .. }
            | DecodeError::PayloadTooShort { object, .. } => Some(*object),
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
