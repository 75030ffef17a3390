//! Outbound render snapshot
//!
//! The simulation draws nothing itself. Each rendered callback it hands the
//! host the active particle positions and one overlay per running buff.

use serde::Serialize;

use super::schedule::TimedBuff;
use super::state::SimContext;

/// Overlays fade out over the last second of a buff
pub const FADE_MS: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuffKind {
    /// Glyph-granted outbreak regeneration
    RegenBoost,
    /// Glyph-granted anomaly vortex strength
    VortexBoost,
    Shield,
    DamageBoost,
    BlackHoleKill,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BuffOverlay {
    pub kind: BuffKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// 1 while the buff has more than a second left, then fading to 0
    pub intensity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    /// Active particle positions, x and y interleaved
    pub particles: Vec<f32>,
    pub overlays: Vec<BuffOverlay>,
}

fn fade(remaining_ms: f64) -> f32 {
    (remaining_ms / FADE_MS).clamp(0.0, 1.0) as f32
}

fn fade_until(until: Option<f64>, now: f64) -> f32 {
    until.map_or(0.0, |until| fade(until - now))
}

impl Frame {
    pub fn capture(ctx: &SimContext) -> Self {
        let now = ctx.now;
        let mut particles = Vec::with_capacity(ctx.particles.active_count() * 2);
        for pos in ctx.particles.active_positions() {
            particles.push(pos.x);
            particles.push(pos.y);
        }

        let mut overlays = Vec::new();
        for o in ctx.outbreaks.values().filter(|o| o.regen_boosted(now)) {
            overlays.push(BuffOverlay {
                kind: BuffKind::RegenBoost,
                x: o.pos.x,
                y: o.pos.y,
                radius: o.radius,
                intensity: fade_until(o.regen_boost_until, now),
            });
        }
        for a in ctx.anomalies.values().filter(|a| a.vortex_boosted(now)) {
            overlays.push(BuffOverlay {
                kind: BuffKind::VortexBoost,
                x: a.pos.x,
                y: a.pos.y,
                radius: a.vortex_radius,
                intensity: fade_until(a.vortex_boost_until, now),
            });
        }

        let cursor = ctx.cursor.pos;
        let cursor_radius = ctx.tuning.repulsion_radius * ctx.cursor.radius_multiplier;
        let cursor_buffs: [(BuffKind, &TimedBuff); 3] = [
            (BuffKind::Shield, &ctx.buffs.shield),
            (BuffKind::DamageBoost, &ctx.buffs.damage_boost),
            (BuffKind::BlackHoleKill, &ctx.buffs.black_hole_kill),
        ];
        for (kind, buff) in cursor_buffs {
            if buff.is_active(now) {
                overlays.push(BuffOverlay {
                    kind,
                    x: cursor.x,
                    y: cursor.y,
                    radius: cursor_radius,
                    intensity: fade(buff.remaining(now)),
                });
            }
        }

        Self { particles, overlays }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particles;
    use crate::sim::state::Outbreak;
    use crate::tuning::Tuning;
    use glam::Vec2;

    #[test]
    fn test_frame_lists_active_particles() {
        let mut ctx = SimContext::new(Tuning::default(), 320.0, 240.0, 4, 0.0).unwrap();
        ctx.growth_threshold = 1.0;
        particles::update(&mut ctx);

        let frame = Frame::capture(&ctx);
        assert_eq!(frame.particles.len(), ctx.particles.active_count() * 2);
        assert!(frame.overlays.is_empty());
    }

    #[test]
    fn test_overlay_fades_in_last_second() {
        let mut ctx = SimContext::new(Tuning::default(), 320.0, 240.0, 4, 0.0).unwrap();
        ctx.buffs.shield.grant(0.0, 6_000.0);
        let mut outbreak = Outbreak::new(Vec2::new(50.0, 50.0), 20.0, 100.0, 0.0);
        outbreak.regen_boost_until = Some(15_000.0);
        ctx.outbreaks.insert(outbreak);

        let frame = Frame::capture(&ctx);
        assert_eq!(frame.overlays.len(), 2);
        assert!(frame.overlays.iter().all(|o| o.intensity == 1.0));

        ctx.now = 5_500.0;
        let frame = Frame::capture(&ctx);
        let shield = frame.overlays.iter().find(|o| o.kind == BuffKind::Shield).unwrap();
        assert!((shield.intensity - 0.5).abs() < 1e-6);

        ctx.now = 6_000.0;
        let frame = Frame::capture(&ctx);
        assert!(frame.overlays.iter().all(|o| o.kind != BuffKind::Shield));
    }
}
