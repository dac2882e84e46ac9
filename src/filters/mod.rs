//! Filter modules for the enhancement engines.
//!
//! ## Supported Format
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//!
//! Every filter takes a [`RasterBuffer`](crate::raster::RasterBuffer) by
//! reference and returns a new one of identical shape. Floating-point
//! intermediates stay inside the filter call.
//!
//! ## Filter Categories
//!
//! - **Pixel-wise**: gamma, log (`color_adjust`)
//! - **Tonal**: global equalization, CLAHE (`equalize`)
//! - **Spatial**: gaussian blur, unsharp mask (`sharpen`)

pub mod color_adjust;
pub mod core;
pub mod equalize;
pub mod grayscale;
pub mod sharpen;

pub use color_adjust::{gamma_correct, log_transform};
pub use equalize::{equalize_adaptive, equalize_global, TileGrid};
pub use grayscale::LumaChromaView;
pub use sharpen::{gaussian_blur, unsharp_mask};
