//! Pixel formats and per-pixel conversion
//!
//! The canonical pixel is a `u32` whose in-memory bytes read R, G, B, A.

use oxr_ffi::abi::{
    RETRO_PIXEL_FORMAT_RGB565, RETRO_PIXEL_FORMAT_UNKNOWN, RETRO_PIXEL_FORMAT_XRGB8888,
};

/// Pixel format negotiated by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Nothing negotiated yet
    #[default]
    Unknown,
    /// 16-bit 5/6/5, native endian
    Rgb565,
    /// 32-bit X/R/G/B, native endian
    Xrgb8888,
    /// Any other libretro format; frames in it are dropped
    Other(u32),
}

impl PixelFormat {
    /// Map a raw `retro_pixel_format` value
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            RETRO_PIXEL_FORMAT_RGB565 => PixelFormat::Rgb565,
            RETRO_PIXEL_FORMAT_XRGB8888 => PixelFormat::Xrgb8888,
            RETRO_PIXEL_FORMAT_UNKNOWN => PixelFormat::Unknown,
            other => PixelFormat::Other(other),
        }
    }

    /// Bytes per source pixel, or `None` when frames in this format are not converted
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Rgb565 => Some(2),
            PixelFormat::Xrgb8888 => Some(4),
            PixelFormat::Unknown | PixelFormat::Other(_) => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.bytes_per_pixel().is_some()
    }
}

/// Pack 8-bit channels into a canonical opaque pixel
#[inline]
pub fn pack_rgba(r: u8, g: u8, b: u8) -> u32 {
    u32::from_ne_bytes([r, g, b, 0xFF])
}

/// Convert one RGB565 pixel
#[inline]
pub fn rgb565_to_rgba(value: u16) -> u32 {
    let r5 = ((value >> 11) & 0x1F) as u32;
    let g6 = ((value >> 5) & 0x3F) as u32;
    let b5 = (value & 0x1F) as u32;

    let r8 = (r5 * 527 + 23) >> 6;
    let g8 = (g6 * 259 + 33) >> 6;
    let b8 = (b5 * 527 + 23) >> 6;

    pack_rgba(r8 as u8, g8 as u8, b8 as u8)
}

/// Convert one XRGB8888 pixel; the X byte is discarded
#[inline]
pub fn xrgb8888_to_rgba(value: u32) -> u32 {
    let r = (value >> 16) as u8;
    let g = (value >> 8) as u8;
    let b = value as u8;

    pack_rgba(r, g, b)
}
