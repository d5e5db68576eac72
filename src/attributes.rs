//! Packed 16-bit texture attribute words carried by textured primitives.
//!
//! Extraction is total: every field is returned as its raw numeric code.
//! [`BlendMode`] and [`ColorDepth`] only attach meaning to codes the format
//! defines, and keep anything else as [`Recognized::Unknown`].

use crate::recognized::Recognized;

pub const CLUT_X_SHIFT: u16 = 10;
pub const CLUT_X_MASK: u16 = 0x3F;
pub const CLUT_Y_MASK: u16 = 0x1FF;

pub const TPAGE_MASK: u16 = 0x1F;
pub const BLEND_SHIFT: u16 = 5;
pub const BLEND_MASK: u16 = 0x3;
pub const DEPTH_SHIFT: u16 = 7;
pub const DEPTH_MASK: u16 = 0x3;

/// CLUT position word (`CBA`): which colour look-up table a texture uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClutPosition {
    /// Horizontal position in 16-pixel blocks (upper 6 bits).
    pub x_block: u8,
    /// Vertical position in lines (lower 9 bits).
    pub y: u16,
}

impl ClutPosition {
    pub fn from_word(word: u16) -> Self {
        Self {
            x_block: ((word >> CLUT_X_SHIFT) & CLUT_X_MASK) as u8,
            y: word & CLUT_Y_MASK,
        }
    }
}

/// Texture page word (`TSB`): page index, semi-transparency rate and texel depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TexturePage {
    /// Bits 0-4.
    pub page: u8,
    /// Bits 5-6, raw semi-transparency code.
    pub blend_code: u8,
    /// Bits 7-8, raw colour depth code.
    pub depth_code: u8,
}

impl TexturePage {
    pub fn from_word(word: u16) -> Self {
        Self {
            page: (word & TPAGE_MASK) as u8,
            blend_code: ((word >> BLEND_SHIFT) & BLEND_MASK) as u8,
            depth_code: ((word >> DEPTH_SHIFT) & DEPTH_MASK) as u8,
        }
    }

    pub fn blend_mode(&self) -> Recognized<BlendMode> {
        BlendMode::from_code(self.blend_code)
    }

    pub fn color_depth(&self) -> Recognized<ColorDepth> {
        ColorDepth::from_code(self.depth_code)
    }
}

/// Semi-transparency blend rate between background and polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    /// 0.5 back + 0.5 poly
    Average,
    /// 1.0 back + 1.0 poly
    Additive,
    /// 1.0 back - 1.0 poly
    Subtractive,
    /// 1.0 back + 0.25 poly
    QuarterAdditive,
}

impl BlendMode {
    pub fn from_code(code: u8) -> Recognized<Self> {
        match code {
            0 => Recognized::Known(BlendMode::Average),
            1 => Recognized::Known(BlendMode::Additive),
            2 => Recognized::Known(BlendMode::Subtractive),
            3 => Recognized::Known(BlendMode::QuarterAdditive),
            other => Recognized::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlendMode::Average => "0.5 back + 0.5 poly",
            BlendMode::Additive => "1.0 back + 1.0 poly",
            BlendMode::Subtractive => "1.0 back - 1.0 poly",
            BlendMode::QuarterAdditive => "1.0 back + 0.25 poly",
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Texel colour depth of the texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorDepth {
    Clut4,
    Clut8,
    Direct15,
}

impl ColorDepth {
    pub fn from_code(code: u8) -> Recognized<Self> {
        match code {
            0 => Recognized::Known(ColorDepth::Clut4),
            1 => Recognized::Known(ColorDepth::Clut8),
            2 => Recognized::Known(ColorDepth::Direct15),
            other => Recognized::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorDepth::Clut4 => "4bit",
            ColorDepth::Clut8 => "8bit",
            ColorDepth::Direct15 => "15bit",
        }
    }
}

impl std::fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
