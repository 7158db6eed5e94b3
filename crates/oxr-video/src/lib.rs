//! Video output for oxidized-retro
//!
//! Normalizes every frame the core produces into one canonical RGBA8888
//! buffer the host can read between steps.

pub mod framebuffer;
pub mod pixel;

pub use framebuffer::FrameBuffer;
pub use pixel::PixelFormat;
