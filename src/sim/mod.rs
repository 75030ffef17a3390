//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, one timestamp per tick
//! - Seeded RNG only
//! - Stable iteration order (insertion order of each arena)
//! - No rendering or platform dependencies

pub mod anomaly;
pub mod arena;
pub mod cursor;
pub mod disruption;
pub mod frame;
pub mod glyph;
pub mod outbreak;
pub mod particles;
pub mod schedule;
pub mod state;
pub mod tick;

pub use arena::Arena;
pub use frame::{BuffKind, BuffOverlay, Frame};
pub use particles::ParticleField;
pub use schedule::{CancelToken, OneShot, TimedBuff};
pub use state::{
    Anomaly, AnomalyId, AnomalyMotion, Capturable, Capture, ControlMode, Cursor, CursorBuffs,
    DisruptionState, Glyph, Outbreak, OutbreakId, Screen, SimContext, SimEvent, Target,
};
pub use tick::tick;
