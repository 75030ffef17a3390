//! Data-driven game balance
//!
//! Every named tunable lives here. Values are read-only during a run: the
//! simulation context owns its own copy, taken when the run starts.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Screen class used to pick between desktop and mobile tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenProfile {
    Desktop,
    Mobile,
}

/// A tunable with separate desktop and mobile values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileValue<T> {
    pub desktop: T,
    pub mobile: T,
}

impl<T: Copy> ProfileValue<T> {
    pub const fn new(desktop: T, mobile: T) -> Self {
        Self { desktop, mobile }
    }

    #[inline]
    pub fn get(&self, profile: ScreenProfile) -> T {
        match profile {
            ScreenProfile::Desktop => self.desktop,
            ScreenProfile::Mobile => self.mobile,
        }
    }
}

/// Bounds of a randomized spawn interval, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min_ms: f64,
    pub max_ms: f64,
}

impl Interval {
    pub const fn new(min_ms: f64, max_ms: f64) -> Self {
        Self { min_ms, max_ms }
    }

    fn is_valid(&self) -> bool {
        self.min_ms > 0.0 && self.min_ms <= self.max_ms
    }
}

/// Gameplay tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Pacing ===
    /// Time over which spawn sizes and speed boosts ramp to their maximum
    pub growth_duration_ms: f64,
    /// Screens narrower than this use the mobile profile
    pub mobile_breakpoint: f32,

    // === Particle field ===
    /// Grid spacing between particle anchors
    pub spacing: ProfileValue<f32>,
    /// Per-tick velocity retention for particles
    pub particle_drag: f32,
    /// Spring factor pulling particles back to their anchor
    pub particle_ease: f32,
    /// Cursor repulsion radius (scaled by the cursor radius multiplier)
    pub repulsion_radius: f32,
    pub repulsion_strength: f32,

    // === Outbreaks ===
    pub outbreak_spawn_interval: ProfileValue<Interval>,
    /// Radius growth per tick before modifiers
    pub outbreak_growth_rate: ProfileValue<f32>,
    pub outbreak_max_radius: ProfileValue<f32>,
    /// Minimum active particle ratio required to spawn an outbreak
    pub outbreak_min_spawn_ratio: f32,
    pub outbreak_dissolve_radius: f32,
    /// Health restored on each regeneration tick
    pub outbreak_regen_rate: f32,

    // === Anomalies ===
    pub anomaly_spawn_interval: Interval,
    pub anomaly_dissolve_radius: f32,
    pub vortex_radius: f32,
    pub vortex_strength: f32,
    /// Drift speed in pixels per second
    pub anomaly_drift_speed: f32,

    // === Glyphs ===
    pub glyph_spawn_interval: Interval,
    pub glyph_lifetime_ms: f64,
    pub glyph_capture_ms: f64,
    pub glyph_capture_radius: f32,
    pub regen_boost_ms: f64,
    pub vortex_boost_ms: f64,

    // === Synergy ===
    pub synergy_range: f32,
    /// Damage multiplier for an outbreak supported by an anomaly
    pub synergy_protection: f32,
    pub synergy_regen_boost: f32,
    pub synergy_growth_boost: f32,

    // === Cursor ===
    /// Path parameter advance per millisecond (radians)
    pub path_speed_min: f32,
    pub path_speed_max: f32,
    pub spring: f32,
    pub damping: f32,
    pub manual_timeout_ms: f64,
    pub touch_timeout_ms: f64,
    /// Blend time from manual back to the autonomous path
    pub auto_blend_ms: f64,

    // === Disruption ===
    pub disruption_duration_ms: f64,
    pub disruption_cooldown_ms: f64,
    pub disruption_min_cooldown_ms: f64,

    // === Cursor buffs ===
    pub black_hole_kill_boost_ms: f64,
    pub damage_boost_ms: f64,
    pub shield_ms: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            growth_duration_ms: 180_000.0,
            mobile_breakpoint: 768.0,

            spacing: ProfileValue::new(9.0, 12.0),
            particle_drag: 0.88,
            particle_ease: 0.06,
            repulsion_radius: 90.0,
            repulsion_strength: 4.0,

            outbreak_spawn_interval: ProfileValue::new(
                Interval::new(4_000.0, 12_000.0),
                Interval::new(6_000.0, 16_000.0),
            ),
            outbreak_growth_rate: ProfileValue::new(0.12, 0.09),
            outbreak_max_radius: ProfileValue::new(160.0, 100.0),
            outbreak_min_spawn_ratio: 0.25,
            outbreak_dissolve_radius: 12.0,
            outbreak_regen_rate: 0.5,

            anomaly_spawn_interval: Interval::new(15_000.0, 30_000.0),
            anomaly_dissolve_radius: 12.0,
            vortex_radius: 110.0,
            vortex_strength: 0.5,
            anomaly_drift_speed: 90.0,

            glyph_spawn_interval: Interval::new(20_000.0, 35_000.0),
            glyph_lifetime_ms: 12_000.0,
            glyph_capture_ms: 1_000.0,
            glyph_capture_radius: 30.0,
            regen_boost_ms: 15_000.0,
            vortex_boost_ms: 12_000.0,

            synergy_range: 180.0,
            synergy_protection: 0.5,
            synergy_regen_boost: 1.8,
            synergy_growth_boost: 1.3,

            path_speed_min: 0.000_35,
            path_speed_max: 0.000_9,
            spring: 0.14,
            damping: 0.72,
            manual_timeout_ms: 3_000.0,
            touch_timeout_ms: 1_500.0,
            auto_blend_ms: 2_500.0,

            disruption_duration_ms: 3_000.0,
            disruption_cooldown_ms: 20_000.0,
            disruption_min_cooldown_ms: 5_000.0,

            black_hole_kill_boost_ms: 8_000.0,
            damage_boost_ms: 5_000.0,
            shield_ms: 6_000.0,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides; fields absent from the JSON keep their defaults
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Pick the screen profile for a viewport width
    pub fn profile_for_width(&self, width: f32) -> ScreenProfile {
        if width < self.mobile_breakpoint {
            ScreenProfile::Mobile
        } else {
            ScreenProfile::Desktop
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.growth_duration_ms <= 0.0 {
            return Err(SimError::InvalidTuning("growth_duration_ms must be positive"));
        }
        if self.spacing.desktop <= 0.0 || self.spacing.mobile <= 0.0 {
            return Err(SimError::InvalidTuning("spacing must be positive"));
        }
        if !(0.0..=1.0).contains(&self.particle_drag) || !(0.0..=1.0).contains(&self.damping) {
            return Err(SimError::InvalidTuning("drag and damping must lie in [0, 1]"));
        }
        if !self.outbreak_spawn_interval.desktop.is_valid()
            || !self.outbreak_spawn_interval.mobile.is_valid()
            || !self.anomaly_spawn_interval.is_valid()
            || !self.glyph_spawn_interval.is_valid()
        {
            return Err(SimError::InvalidTuning("spawn intervals need 0 < min <= max"));
        }
        if self.outbreak_max_radius.desktop <= 0.0 || self.outbreak_max_radius.mobile <= 0.0 {
            return Err(SimError::InvalidTuning("outbreak_max_radius must be positive"));
        }
        if self.path_speed_min > self.path_speed_max {
            return Err(SimError::InvalidTuning("path_speed_min exceeds path_speed_max"));
        }
        if self.disruption_min_cooldown_ms > self.disruption_cooldown_ms {
            return Err(SimError::InvalidTuning("disruption cooldown floor exceeds base"));
        }
        if self.glyph_capture_ms <= 0.0 || self.disruption_duration_ms <= 0.0 {
            return Err(SimError::InvalidTuning("capture and disruption durations must be positive"));
        }
        if self.auto_blend_ms <= 0.0
            || self.manual_timeout_ms <= 0.0
            || self.touch_timeout_ms <= 0.0
            || self.glyph_lifetime_ms <= 0.0
        {
            return Err(SimError::InvalidTuning("blend, input timeouts and glyph lifetime must be positive"));
        }
        Ok(())
    }
}
