//! Simulation state and core entity types
//!
//! Entities are plain data records. The behaviour lives in the per-component
//! modules, which all mutate one [`SimContext`] in a fixed per-tick order.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use slotmap::new_key_type;

use super::arena::Arena;
use super::particles::ParticleField;
use super::schedule::{CancelToken, OneShot, TimedBuff};
use crate::consts::PULL_PHASE_AGE;
use crate::error::SimError;
use crate::tuning::{ScreenProfile, Tuning};

new_key_type! {
    /// Generational handle to an outbreak
    pub struct OutbreakId;
    /// Generational handle to an anomaly
    pub struct AnomalyId;
}

/// Screen diagonal that maps to a health scale of 1.0
pub const REFERENCE_DIAGONAL: f32 = 1500.0;

/// Radius within which the cursor damages an anomaly
pub const ANOMALY_HIT_RADIUS: f32 = 40.0;

/// Gravity-well reach relative to outbreak radius, before age growth
pub const GRAVITY_RADIUS_FACTOR: f32 = 3.0;

/// Pull-phase ticks over which the gravity multiplier gains +1.0
pub const GRAVITY_GROWTH_TICKS: f32 = 1200.0;

/// Viewport geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Screen {
    pub width: f32,
    pub height: f32,
    pub center: Vec2,
    pub diagonal: f32,
    pub profile: ScreenProfile,
}

impl Screen {
    pub fn new(width: f32, height: f32, profile: ScreenProfile) -> Self {
        Self {
            width,
            height,
            center: Vec2::new(width * 0.5, height * 0.5),
            diagonal: (width * width + height * height).sqrt(),
            profile,
        }
    }

    pub fn min_dim(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Health normalization so larger screens get sturdier enemies
    pub fn health_scale(&self) -> f32 {
        (self.diagonal / REFERENCE_DIAGONAL).clamp(0.6, 1.5)
    }

    pub fn is_mobile(&self) -> bool {
        self.profile == ScreenProfile::Mobile
    }
}

/// A passive particle of the player's swarm
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    /// Grid anchor the particle springs back to
    pub origin: Vec2,
    pub vel: Vec2,
    pub active: bool,
    /// Multiplier on restoring spring (jittery vs calm)
    pub nervousness: f32,
    /// Multiplier on cursor/entity reactions
    pub awareness: f32,
    /// Per-particle offset on the growth threshold, in [0, 1)
    pub growth_offset: f32,
    /// Distance from field center, normalized to [0, 1]
    pub center_dist: f32,
    pub center_angle: f32,
}

/// A growing organism: push phase first, gravity well after `PULL_PHASE_AGE`
#[derive(Debug, Clone, Serialize)]
pub struct Outbreak {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    /// Age in ticks
    pub frame: u32,
    pub ever_touched: bool,
    pub threatened: bool,
    /// Reached max radius at least once (never unset)
    pub maxed: bool,
    pub regen_boost_until: Option<f64>,
    /// Phase offset for the organic growth morph
    pub morph_phase: f32,
}

impl Outbreak {
    pub fn new(pos: Vec2, radius: f32, health: f32, morph_phase: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            health,
            max_health: health,
            frame: 0,
            ever_touched: false,
            threatened: false,
            maxed: false,
            regen_boost_until: None,
            morph_phase,
        }
    }

    #[inline]
    pub fn in_pull_phase(&self) -> bool {
        self.frame >= PULL_PHASE_AGE
    }

    /// Ticks spent in the pull phase
    pub fn pull_age(&self) -> u32 {
        self.frame.saturating_sub(PULL_PHASE_AGE)
    }

    /// Age-based growth multiplier of the gravity well
    pub fn gravity_growth(&self) -> f32 {
        1.0 + self.pull_age() as f32 / GRAVITY_GROWTH_TICKS
    }

    /// Reach of the gravity well (zero while still pushing)
    pub fn gravity_radius(&self) -> f32 {
        if self.in_pull_phase() {
            self.radius * GRAVITY_RADIUS_FACTOR * self.gravity_growth()
        } else {
            0.0
        }
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn regen_boosted(&self, now: f64) -> bool {
        self.regen_boost_until.is_some_and(|until| now < until)
    }
}

/// Orbit parameters of an anomaly
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Orbit {
    pub center: Vec2,
    pub angle: f32,
    pub radius: f32,
    /// Radians per tick
    pub speed: f32,
}

/// Exactly one motion state holds at any time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AnomalyMotion {
    Orbiting { timer_ms: f64 },
    Drifting { target: Vec2, timer_ms: f64 },
}

/// An orbiting/drifting vortex
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub pos: Vec2,
    pub orbit: Orbit,
    pub motion: AnomalyMotion,
    pub vortex_radius: f32,
    pub vortex_strength: f32,
    pub health: f32,
    pub max_health: f32,
    /// Age in ticks
    pub age: u32,
    /// One-shot maturity health boost applied
    pub matured: bool,
    pub vortex_boost_until: Option<f64>,
}

impl Anomaly {
    pub fn is_orbiting(&self) -> bool {
        matches!(self.motion, AnomalyMotion::Orbiting { .. })
    }

    pub fn is_drifting(&self) -> bool {
        matches!(self.motion, AnomalyMotion::Drifting { .. })
    }

    pub fn drift_target(&self) -> Option<Vec2> {
        match self.motion {
            AnomalyMotion::Drifting { target, .. } => Some(target),
            AnomalyMotion::Orbiting { .. } => None,
        }
    }

    pub fn vortex_boosted(&self, now: f64) -> bool {
        self.vortex_boost_until.is_some_and(|until| now < until)
    }
}

/// A capture in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Capture {
    pub target: Target,
    pub remaining_ms: f64,
}

/// A transient buff pickup
#[derive(Debug, Clone, Serialize)]
pub struct Glyph {
    pub pos: Vec2,
    pub spawned_at: f64,
    pub capture: Option<Capture>,
}

impl Glyph {
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }
}

/// Non-owning reference to an outbreak or anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    Outbreak(OutbreakId),
    Anomaly(AnomalyId),
}

/// What glyphs and the disruption need from an entity, whatever its kind
pub trait Capturable {
    fn position(&self) -> Vec2;
    /// Radius of the entity's hit circle
    fn hit_radius(&self) -> f32;
    fn health(&self) -> f32;
    /// Apply the timed buff a completed glyph capture grants
    fn grant_capture_buff(&mut self, now: f64, tuning: &Tuning);
}

impl Capturable for Outbreak {
    fn position(&self) -> Vec2 {
        self.pos
    }

    fn hit_radius(&self) -> f32 {
        self.radius
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn grant_capture_buff(&mut self, now: f64, tuning: &Tuning) {
        self.regen_boost_until = Some(now + tuning.regen_boost_ms);
    }
}

impl Capturable for Anomaly {
    fn position(&self) -> Vec2 {
        self.pos
    }

    fn hit_radius(&self) -> f32 {
        ANOMALY_HIT_RADIUS
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn grant_capture_buff(&mut self, now: f64, tuning: &Tuning) {
        self.vortex_boost_until = Some(now + tuning.vortex_boost_ms);
    }
}

impl Target {
    /// Look up the referenced entity; `None` once it has been removed
    pub fn resolve<'a>(
        &self,
        outbreaks: &'a Arena<OutbreakId, Outbreak>,
        anomalies: &'a Arena<AnomalyId, Anomaly>,
    ) -> Option<&'a dyn Capturable> {
        match *self {
            Target::Outbreak(id) => outbreaks.get(id).map(|o| o as &dyn Capturable),
            Target::Anomaly(id) => anomalies.get(id).map(|a| a as &dyn Capturable),
        }
    }

    pub fn resolve_mut<'a>(
        &self,
        outbreaks: &'a mut Arena<OutbreakId, Outbreak>,
        anomalies: &'a mut Arena<AnomalyId, Anomaly>,
    ) -> Option<&'a mut dyn Capturable> {
        match *self {
            Target::Outbreak(id) => outbreaks.get_mut(id).map(|o| o as &mut dyn Capturable),
            Target::Anomaly(id) => anomalies.get_mut(id).map(|a| a as &mut dyn Capturable),
        }
    }

    pub fn as_outbreak(&self) -> Option<OutbreakId> {
        match *self {
            Target::Outbreak(id) => Some(id),
            Target::Anomaly(_) => None,
        }
    }

    pub fn as_anomaly(&self) -> Option<AnomalyId> {
        match *self {
            Target::Anomaly(id) => Some(id),
            Target::Outbreak(_) => None,
        }
    }
}

/// Cursor control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlMode {
    /// Autonomous path generator
    Automatic,
    /// Spring toward the pointer
    Manual,
}

/// The controlled cursor entity
#[derive(Debug, Clone, Serialize)]
pub struct Cursor {
    pub pos: Vec2,
    pub vel: Vec2,
    pub mode: ControlMode,
    /// Last pointer position supplied from outside
    pub pointer: Vec2,
    /// 0 right after leaving manual mode, 1 once fully on the path
    pub auto_blend: f32,
    pub blend_started_at: Option<f64>,
    /// Accumulated path parameter
    pub path_time: f64,
    /// Last computed autonomous path point
    pub path_target: Vec2,
    /// Visual/damage radius multiplier, eased every tick
    pub radius_multiplier: f32,
    /// Accumulated gravity displacement applied on top of the path
    pub gravity_drift: Vec2,
}

impl Cursor {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            mode: ControlMode::Automatic,
            pointer: pos,
            auto_blend: 1.0,
            blend_started_at: None,
            path_time: 0.0,
            path_target: pos,
            radius_multiplier: 1.0,
            gravity_drift: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        self.mode == ControlMode::Manual
    }
}

/// Process-wide timed cursor buffs
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CursorBuffs {
    /// Reduces outbreak gravity on the cursor
    pub shield: TimedBuff,
    /// Boosts cursor damage and particle repulsion
    pub damage_boost: TimedBuff,
    /// Granted by killing a gravity well: big damage and path speed boost
    pub black_hole_kill: TimedBuff,
}

/// Disruption ability state
#[derive(Debug, Clone, Default)]
pub struct DisruptionState {
    pub active: bool,
    /// Ramped toward 1 while active, decays toward 0 afterwards
    pub intensity: f32,
    pub center: Vec2,
    pub primary: Option<Target>,
    pub secondary: Option<OutbreakId>,
    /// Auto-deactivation task
    pub expiry: OneShot,
    pub expiry_token: Option<CancelToken>,
    /// Earliest time the ability may fire again
    pub next_ready_at: f64,
    /// Rearm delay chosen at the last deactivation
    pub last_cooldown_ms: f64,
}

impl DisruptionState {
    pub fn is_primary(&self, target: Target) -> bool {
        self.primary == Some(target)
    }

    pub fn is_secondary(&self, id: OutbreakId) -> bool {
        self.secondary == Some(id)
    }
}

/// Timestamps at which each spawner may next fire
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnTimers {
    pub next_outbreak_at: f64,
    pub next_anomaly_at: f64,
    pub next_glyph_at: f64,
}

/// Notable things that happened during a tick, drained by the runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    OutbreakSpawned { pos: Vec2, radius: f32, health: f32 },
    OutbreakDied { pos: Vec2, pull_phase: bool },
    OutbreakDissolved { pos: Vec2 },
    AnomalySpawned { pos: Vec2 },
    AnomalyDied { pos: Vec2 },
    AnomalyDissolved { pos: Vec2 },
    AnomalyExpired { pos: Vec2 },
    GlyphSpawned { pos: Vec2 },
    GlyphSpawnDeferred,
    GlyphExpired,
    GlyphCaptureStarted { target: Target },
    GlyphCaptured { target: Target },
    GlyphCaptureLost,
    DisruptionActivated { primary: Option<Target>, has_secondary: bool },
    DisruptionEnded { cooldown_ms: f64 },
}

/// Complete simulation state for one run
#[derive(Debug, Clone)]
pub struct SimContext {
    pub tuning: Tuning,
    pub screen: Screen,
    pub rng: Pcg32,
    /// Timestamp (ms) the run started
    pub started_at: f64,
    /// The authoritative timestamp of the current tick
    pub now: f64,
    pub tick: u64,
    pub particles: ParticleField,
    pub cursor: Cursor,
    pub outbreaks: Arena<OutbreakId, Outbreak>,
    pub anomalies: Arena<AnomalyId, Anomaly>,
    /// At most one glyph exists at a time
    pub glyph: Option<Glyph>,
    pub buffs: CursorBuffs,
    pub disruption: DisruptionState,
    pub spawn: SpawnTimers,
    /// Normalized radius within which particles are alive
    pub growth_threshold: f32,
    pub active_particle_ratio: f32,
    pub events: Vec<SimEvent>,
}

impl SimContext {
    /// Create a new run for a `width` x `height` viewport
    pub fn new(tuning: Tuning, width: f32, height: f32, seed: u64, now: f64) -> Result<Self, SimError> {
        tuning.validate()?;
        if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
            return Err(SimError::InvalidScreen { width, height });
        }

        let profile = tuning.profile_for_width(width);
        let screen = Screen::new(width, height, profile);
        let mut rng = Pcg32::seed_from_u64(seed);
        let particles = ParticleField::new(&screen, tuning.spacing.get(profile), &mut rng);

        let spawn = SpawnTimers {
            next_outbreak_at: now + 3_000.0,
            next_anomaly_at: now + tuning.anomaly_spawn_interval.min_ms,
            next_glyph_at: now + tuning.glyph_spawn_interval.min_ms,
        };

        Ok(Self {
            screen,
            rng,
            started_at: now,
            now,
            tick: 0,
            particles,
            cursor: Cursor::new(screen.center),
            outbreaks: Arena::new(),
            anomalies: Arena::new(),
            glyph: None,
            buffs: CursorBuffs::default(),
            disruption: DisruptionState::default(),
            spawn,
            growth_threshold: 0.0,
            active_particle_ratio: 0.0,
            events: Vec::new(),
            tuning,
        })
    }

    /// Milliseconds since the run started
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.now - self.started_at
    }

    /// Game progress in [0, 1], reaching 1 after `growth_duration_ms`
    pub fn progress(&self) -> f32 {
        (self.elapsed() / self.tuning.growth_duration_ms).clamp(0.0, 1.0) as f32
    }

    /// How much the particle field is losing: `1 - active ratio`
    #[inline]
    pub fn dominance(&self) -> f32 {
        1.0 - self.active_particle_ratio
    }

    pub fn max_radius(&self) -> f32 {
        self.tuning.outbreak_max_radius.get(self.screen.profile)
    }

    /// Whether a target still refers to a live entity
    pub fn is_alive(&self, target: Target) -> bool {
        target
            .resolve(&self.outbreaks, &self.anomalies)
            .is_some_and(|t| t.health() > 0.0)
    }

    pub fn target_position(&self, target: Target) -> Option<Vec2> {
        target.resolve(&self.outbreaks, &self.anomalies).map(|t| t.position())
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
