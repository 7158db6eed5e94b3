//! Canonical frame buffer
//!
//! Holds the last frame produced by the core, converted to RGBA8888.

use crate::pixel::{rgb565_to_rgba, xrgb8888_to_rgba, PixelFormat};
use tracing::{trace, warn};

/// Last converted frame
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major canonical pixels
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixels as bytes (R, G, B, A per pixel)
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Minimum length of a source buffer holding `height` rows of `width`
    /// pixels spaced `pitch` bytes apart
    pub fn source_len(
        format: PixelFormat,
        width: usize,
        height: usize,
        pitch: usize,
    ) -> Option<usize> {
        let bpp = format.bytes_per_pixel()?;
        if height == 0 || width == 0 {
            return Some(0);
        }
        Some(pitch * (height - 1) + width * bpp)
    }

    /// Convert a raw frame from the core
    ///
    /// Returns `false` and leaves the buffer untouched when the format is not
    /// converted or the source is too short for the given geometry. Otherwise
    /// the buffer is reallocated to `width * height` and fully rewritten.
    pub fn update(
        &mut self,
        format: PixelFormat,
        data: &[u8],
        width: usize,
        height: usize,
        pitch: usize,
    ) -> bool {
        let Some((bpp, convert)) = converter(format) else {
            trace!("Dropping frame in unsupported format {:?}", format);
            return false;
        };

        if pitch < width * bpp {
            warn!("Dropping frame: pitch {} shorter than a {}-pixel row", pitch, width);
            return false;
        }

        match Self::source_len(format, width, height, pitch) {
            Some(needed) if data.len() >= needed => {}
            _ => {
                warn!(
                    "Dropping frame: {} bytes for {}x{} pitch {}",
                    data.len(),
                    width,
                    height,
                    pitch
                );
                return false;
            }
        }

        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &data[y * pitch..y * pitch + width * bpp];
            pixels.extend(row.chunks_exact(bpp).map(convert));
        }

        self.width = width;
        self.height = height;
        self.pixels = pixels;
        true
    }
}

type Converter = fn(&[u8]) -> u32;

/// Source pixel size and per-pixel converter, reading native-endian bytes
fn converter(format: PixelFormat) -> Option<(usize, Converter)> {
    match format {
        PixelFormat::Rgb565 => Some((2, |px| {
            rgb565_to_rgba(u16::from_ne_bytes([px[0], px[1]]))
        })),
        PixelFormat::Xrgb8888 => Some((4, |px| {
            xrgb8888_to_rgba(u32::from_ne_bytes([px[0], px[1], px[2], px[3]]))
        })),
        PixelFormat::Unknown | PixelFormat::Other(_) => None,
    }
}
