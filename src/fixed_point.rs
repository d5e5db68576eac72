//! 16-bit sign/magnitude fixed-point conversion used by TMD normals.
//!
//! ```text
//! bit 15 | 14 .. 12 | 11 .. 0
//! sign   | integral | fraction (1/4096 steps)
//! ```
//!
//! A set sign bit with zero magnitude (`0x8000`) yields `-0.0`. The sign is
//! kept rather than normalized so the stored bit pattern can be recovered
//! from the decoded value; `-0.0 == 0.0` still holds for comparisons.

pub const SIGN_BIT: u16 = 0x8000;
pub const INTEGRAL_SHIFT: u16 = 12;
pub const INTEGRAL_MASK: u16 = 0x7;
pub const FRACTION_MASK: u16 = 0xFFF;
pub const FRACTION_SCALE: f32 = 4096.0;

/// Convert one fixed-point word to `f32`. Exact for every input.
pub fn fixed_to_f32(word: u16) -> f32 {
    let integral = (word >> INTEGRAL_SHIFT) & INTEGRAL_MASK;
    let fraction = word & FRACTION_MASK;
    let magnitude = f32::from(integral) + f32::from(fraction) / FRACTION_SCALE;
    if word & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Convert a fixed-point triplet.
pub fn fixed_triplet_to_f32(words: [u16; 3]) -> [f32; 3] {
    words.map(fixed_to_f32)
}
