//! Lowlight Enhance
//!
//! Brightness and contrast enhancement for dark, low-contrast images.
//!
//! ## Image Format
//! All engines work on [`RasterBuffer`]: (height, width, 3) RGB, `u8` per
//! channel. Each engine is a pure function that returns a new buffer of
//! the same shape; floating-point intermediates never leave the engine.
//!
//! ## Engines
//! - **Intensity**: [`gamma_correct`], [`log_transform`]
//! - **Equalization**: [`equalize_global`], [`equalize_adaptive`] (CLAHE),
//!   both on the luma plane of a [`LumaChromaView`]
//! - **Sharpening**: [`unsharp_mask`]
//!
//! ## Batch Pipeline
//! [`Pipeline`] resolves a [`ParameterProfile`] per image identity from a
//! [`ProfileTable`], computes all four variants, and hands before/after
//! pairs to a [`Reporter`]. [`report`] provides directory-backed
//! collaborators.

pub mod error;
pub mod filters;
pub mod pipeline;
pub mod profile;
pub mod raster;
pub mod report;

pub use error::{EnhanceError, LoadError, ReportError, Result};
pub use filters::{
    equalize_adaptive, equalize_global, gamma_correct, gaussian_blur, log_transform, unsharp_mask,
    LumaChromaView, TileGrid,
};
pub use pipeline::{
    enhance, Artifact, ArtifactKind, BatchOutcome, BatchSummary, Enhanced, ImageSource, Pipeline,
    Reporter, Variant,
};
pub use profile::{FinalSelection, ParameterProfile, ProfileOverride, ProfileTable};
pub use raster::{RasterBuffer, WorkingBuffer};
pub use report::{DirectoryReporter, DirectorySource};
