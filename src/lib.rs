//! Attrition - a particle-field game of attrition
//!
//! Core modules:
//! - `sim`: Entity simulation (particles, cursor, outbreaks, anomalies, glyphs, disruption)
//! - `tuning`: Read-only gameplay tunables with desktop/mobile variants
//! - `runtime`: Scheduler-facing engine (input events, resize, alternating ticks)
//! - `platform`: Browser glue

pub mod error;
pub mod platform;
pub mod runtime;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use runtime::Engine;
pub use tuning::{ScreenProfile, Tuning};

use glam::Vec2;

/// Simulation timing constants
pub mod consts {
    /// Nominal duration of one simulation tick in milliseconds (60 Hz)
    pub const TICK_MS: f64 = 1000.0 / 60.0;
    /// Same tick expressed in seconds, for per-second rates
    pub const TICK_SECS: f32 = 1.0 / 60.0;

    /// Distance floor applied before any division by a distance
    pub const MIN_DISTANCE: f32 = 1.0;

    /// Age (ticks) at which an outbreak leaves its push phase and becomes a gravity well
    pub const PULL_PHASE_AGE: u32 = 360;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Unit vector from `from` to `to` plus the floored distance between them.
///
/// Coincident points yield a zero direction, so forces built on it vanish
/// instead of producing NaNs.
#[inline]
pub fn direction_and_distance(from: Vec2, to: Vec2) -> (Vec2, f32) {
    let delta = to - from;
    let dist = delta.length();
    if dist < consts::MIN_DISTANCE {
        (Vec2::ZERO, consts::MIN_DISTANCE)
    } else {
        (delta / dist, dist)
    }
}
