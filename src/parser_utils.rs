//! Shared winnow-based parsing utilities and the bounds-checked range accessor
//! every section and record read goes through.

use std::ops::Range;

use winnow::error::ContextError;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// A requested byte range that does not fit inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub offset: usize,
    pub len: usize,
    pub available: usize,
}

/// Resolve an unsigned offset stored in the file against `base`.
///
/// Returns `None` if the sum does not fit in `usize`.
pub fn resolve_offset(base: usize, offset: u32) -> Option<usize> {
    base.checked_add(usize::try_from(offset).ok()?)
}

/// Byte length of `count` records of `stride` bytes, or `None` on overflow.
pub fn array_len(count: u32, stride: usize) -> Option<usize> {
    usize::try_from(count).ok()?.checked_mul(stride)
}

/// Validate that `offset..offset + len` lies inside a buffer of `available` bytes.
pub fn checked_range(
    offset: usize,
    len: usize,
    available: usize,
) -> Result<Range<usize>, OutOfBounds> {
    let err = OutOfBounds {
        offset,
        len,
        available,
    };
    let end = offset.checked_add(len).ok_or(err)?;
    if end > available {
        return Err(err);
    }
    Ok(offset..end)
}

/// Borrow `len` bytes at `offset`, or report the range that did not fit.
pub fn checked_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], OutOfBounds> {
    let range = checked_range(offset, len, data.len())?;
    Ok(&data[range])
}
