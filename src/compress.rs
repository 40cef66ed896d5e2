//! Adaptive PDF compression.
//!
//! The [`Controller`] walks a [`ProfileLadder`] from a starting profile chosen by
//! the requested target size, invoking a [`CompressionEngine`] and measuring each
//! result with [`size_kb`] until the output fits or the ladder runs out.

/// The retry loop.
pub mod controller;

/// External codec adapters.
pub mod engine;

/// Error taxonomy for engine, measurement and ladder failures.
pub mod error;

/// Output measurement.
pub mod inspect;

/// Ordered compression profiles and target-size bands.
pub mod profile;

pub use controller::{CompressionAttempt, CompressionRequest, CompressionResult, Controller};
pub use engine::{CompressionEngine, Ghostscript};
pub use error::{CompressError, EngineError, FailureKind, LadderError};
pub use inspect::size_kb;
pub use profile::{CompressionProfile, Preset, ProfileLadder, SizeBands};
