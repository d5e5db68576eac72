/// Packed texture attribute words (CLUT position, texture page)
pub mod attributes;
/// Error definitions
pub mod error;
/// 16-bit fixed-point conversion used for normals
pub mod fixed_point;
/// Shared parsing utilities and bounds-checked buffer access
pub mod parser_utils;
/// Generic wrapper for codes that may or may not match a known variant.
pub mod recognized;
/// Text rendering of decoded files
pub mod report;
/// The TMD container decoder
pub mod tmd;

pub use error::{DecodeError, DecodeResult};
pub use tmd::{DecodeOptions, DecodedFile, DecodedObject, ObjectErrorPolicy, decode, decode_with};
