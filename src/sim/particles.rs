//! The passive particle swarm
//!
//! Particles are laid out on a jittered grid once per run and never destroyed,
//! only toggled active/inactive. Each tick every particle reacts to the cursor
//! and to every entity force currently in play.

use glam::Vec2;
use rand::Rng;

use super::state::{Particle, Screen, SimContext};
use crate::direction_and_distance;

/// Upper bound on field size; spacing is widened to stay under it
pub const MAX_PARTICLES: usize = 24_000;

/// Weight of the per-particle growth offset in the alive test
const GROWTH_JITTER: f32 = 0.15;
/// Per-tick easing of the growth threshold toward its target
const THRESHOLD_EASE: f32 = 0.02;
/// Fraction of a gravity well's radius that swallows particles
const CONSUME_FRACTION: f32 = 0.6;
/// Half-width of the disruption wave front
const WAVE_BAND: f32 = 60.0;

#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    pub particles: Vec<Particle>,
    active_count: usize,
}

impl ParticleField {
    /// Lay out a jittered grid covering the screen
    pub fn new<R: Rng>(screen: &Screen, spacing: f32, rng: &mut R) -> Self {
        let area = screen.width * screen.height;
        let spacing = spacing.max((area / MAX_PARTICLES as f32).sqrt());
        // Thin viewports can still overflow the cap along one axis
        let cols = ((screen.width / spacing).floor().max(1.0) as usize).min(MAX_PARTICLES);
        let rows = ((screen.height / spacing).floor().max(1.0) as usize).min(MAX_PARTICLES / cols);
        let offset = Vec2::new(
            (screen.width - (cols - 1) as f32 * spacing) * 0.5,
            (screen.height - (rows - 1) as f32 * spacing) * 0.5,
        );
        let half_diagonal = (screen.diagonal * 0.5).max(1.0);
        let jitter = spacing * 0.3;

        let mut particles = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let grid = offset + Vec2::new(col as f32, row as f32) * spacing;
                let origin = grid
                    + Vec2::new(
                        rng.random_range(-jitter..=jitter),
                        rng.random_range(-jitter..=jitter),
                    );
                let from_center = origin - screen.center;
                particles.push(Particle {
                    pos: origin,
                    origin,
                    vel: Vec2::ZERO,
                    active: false,
                    nervousness: rng.random_range(0.5..1.5),
                    awareness: rng.random_range(0.5..1.5),
                    growth_offset: rng.random_range(0.0..1.0),
                    center_dist: (from_center.length() / half_diagonal).min(1.0),
                    center_angle: from_center.y.atan2(from_center.x),
                });
            }
        }

        Self {
            particles,
            active_count: 0,
        }
    }

    /// A field with no particles
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Fraction of particles currently alive, 0 for an empty field
    pub fn active_ratio(&self) -> f32 {
        if self.particles.is_empty() {
            0.0
        } else {
            (self.active_count as f32 / self.particles.len() as f32).clamp(0.0, 1.0)
        }
    }

    pub fn active_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.particles.iter().filter(|p| p.active).map(|p| p.pos)
    }
}

/// Ease the growth threshold toward `1 - pressure`, where pressure comes from
/// outbreak size (gravity wells weigh more) and anomaly presence.
pub fn update_threshold(ctx: &mut SimContext) {
    let max_radius = ctx.max_radius();
    let outbreak_pressure: f32 = ctx
        .outbreaks
        .values()
        .map(|o| {
            let size = (o.radius / max_radius).min(1.5);
            let phase_weight = if o.in_pull_phase() { 1.5 } else { 1.0 };
            size * 0.12 * phase_weight
        })
        .sum();
    let anomaly_pressure = ctx.anomalies.len() as f32 * 0.04;

    let target = (1.0 - outbreak_pressure - anomaly_pressure).clamp(0.0, 1.0);
    ctx.growth_threshold += (target - ctx.growth_threshold) * THRESHOLD_EASE;
    ctx.growth_threshold = ctx.growth_threshold.clamp(0.0, 1.0);
}

struct WellSource {
    pos: Vec2,
    radius: f32,
    pull: bool,
    gravity_radius: f32,
    growth: f32,
}

struct VortexSource {
    pos: Vec2,
    radius: f32,
    strength: f32,
}

/// Advance every particle against the current entity set and refresh the
/// active particle ratio.
pub fn update(ctx: &mut SimContext) {
    let now = ctx.now;
    let wells: Vec<WellSource> = ctx
        .outbreaks
        .values()
        .map(|o| WellSource {
            pos: o.pos,
            radius: o.radius,
            pull: o.in_pull_phase(),
            gravity_radius: o.gravity_radius(),
            growth: o.gravity_growth(),
        })
        .collect();
    let vortices: Vec<VortexSource> = ctx
        .anomalies
        .values()
        .map(|a| VortexSource {
            pos: a.pos,
            radius: a.vortex_radius,
            strength: if a.vortex_boosted(now) {
                a.vortex_strength * 1.6
            } else {
                a.vortex_strength
            },
        })
        .collect();

    let tuning = &ctx.tuning;
    let cursor_pos = ctx.cursor.pos;
    let repulsion_radius = tuning.repulsion_radius * ctx.cursor.radius_multiplier;
    let repulsion_strength = if ctx.buffs.damage_boost.is_active(now) {
        tuning.repulsion_strength * 1.3
    } else {
        tuning.repulsion_strength
    };
    let threshold = ctx.growth_threshold;
    let wave = (ctx.disruption.intensity > 0.0).then(|| {
        (
            ctx.disruption.center,
            ctx.disruption.intensity,
            ctx.disruption.intensity * ctx.screen.diagonal * 0.5,
        )
    });

    let mut active_count = 0;
    for p in ctx.particles.particles.iter_mut() {
        let within_growth =
            p.center_dist * (1.0 - GROWTH_JITTER) + p.growth_offset * GROWTH_JITTER <= threshold;
        let consumed = wells.iter().any(|w| {
            w.pull && (p.pos - w.pos).length_squared() < (w.radius * CONSUME_FRACTION).powi(2)
        });
        p.active = within_growth && !consumed;

        if !within_growth {
            // Dormant particles rest on their anchor until the field regrows
            p.vel = Vec2::ZERO;
            p.pos += (p.origin - p.pos) * 0.1;
            continue;
        }
        if p.active {
            active_count += 1;
        }

        p.vel += (p.origin - p.pos) * tuning.particle_ease * p.nervousness;

        let (to_cursor, cursor_dist) = direction_and_distance(p.pos, cursor_pos);
        if cursor_dist < repulsion_radius {
            let push = (1.0 - cursor_dist / repulsion_radius) * repulsion_strength * p.awareness;
            p.vel -= to_cursor * push;
        }

        for w in &wells {
            let (toward, dist) = direction_and_distance(p.pos, w.pos);
            if w.pull {
                if dist < w.gravity_radius {
                    let falloff = 1.0 - dist / w.gravity_radius;
                    p.vel += toward * 0.8 * falloff * w.growth;
                }
            } else {
                let reach = w.radius + 10.0;
                if dist < reach {
                    p.vel -= toward * (1.0 - dist / reach) * 3.0 * p.awareness;
                }
            }
        }

        for v in &vortices {
            let (toward, dist) = direction_and_distance(p.pos, v.pos);
            if dist < v.radius {
                let falloff = 1.0 - dist / v.radius;
                let tangent = toward.perp();
                p.vel += tangent * v.strength * falloff * 2.0 + toward * v.strength * falloff * 0.3;
            }
        }

        if let Some((center, intensity, front)) = wave {
            let (toward, dist) = direction_and_distance(center, p.pos);
            let offset = (dist - front).abs();
            if offset < WAVE_BAND {
                p.vel += toward * 3.0 * intensity * (1.0 - offset / WAVE_BAND);
            }
        }

        p.vel *= tuning.particle_drag;
        p.pos += p.vel;
    }

    ctx.particles.active_count = active_count;
    ctx.active_particle_ratio = ctx.particles.active_ratio();
}
