//! Error taxonomy
//!
//! Only initialization can fail. Per-tick simulation degrades gracefully:
//! degenerate geometry is clamped and stale references resolve to "no target".

use thiserror::Error;

/// Errors raised while setting up a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The element the simulation should attach to does not exist.
    #[error("mount point `{0}` not found")]
    MountPointMissing(String),

    /// A tunable is outside its valid range.
    #[error("invalid tuning: {0}")]
    InvalidTuning(&'static str),

    /// Screen geometry cannot host a particle field.
    #[error("invalid screen size {width}x{height}")]
    InvalidScreen { width: f32, height: f32 },

    /// Tuning overrides could not be parsed.
    #[error("failed to parse tuning overrides: {0}")]
    Config(#[from] serde_json::Error),
}
