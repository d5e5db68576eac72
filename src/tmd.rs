//! TMD container decoding: file header, object table, per-object vertex,
//! normal and primitive sections.
//!
//! Only the offset-relative layout is supported. Files whose object table
//! holds relocated pointers are rejected with
//! [`DecodeError::UnsupportedVariant`](crate::error::DecodeError::UnsupportedVariant).

pub mod decode;
pub mod header;
pub mod object;
pub mod primitive;

#[cfg(test)]
pub(crate) mod test_support;

pub use decode::{DecodeOptions, DecodedFile, DecodedObject, ObjectErrorPolicy, decode, decode_with};
pub use header::{FileHeader, TMD_MAGIC};
pub use object::{Normal, ObjectHeader, Vertex};
pub use primitive::{
    GouraudCorner, Primitive, PrimitiveClass, PrimitiveHeader, PrimitiveRecord, Rgb, Shape,
    ShapeTag, Uv,
};
