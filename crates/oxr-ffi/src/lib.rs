//! libretro plugin boundary for oxidized-retro
//!
//! ABI layouts, dynamic module loading and the entry point table of a bound
//! core.

pub mod abi;
pub mod module;
pub mod symbols;

pub use module::{CoreModule, DynamicModule};
pub use symbols::CoreSymbols;
