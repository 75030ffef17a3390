//! Glyph pickups
//!
//! At most one glyph exists at a time. The first outbreak or anomaly whose hit
//! circle reaches it locks in as the capture target; when the countdown runs
//! out that entity receives a timed buff.

use glam::Vec2;
use rand::Rng;

use super::state::{Capturable, Capture, Glyph, SimContext, SimEvent, Target};
use crate::consts::TICK_MS;

pub const MIN_SPAWN_RATIO: f32 = 0.2;
/// Placement retries before the spawn is deferred
pub const SPAWN_ATTEMPTS: usize = 12;
/// Extra clearance between a new glyph and any outbreak's capture circle
pub const SAFETY_BUFFER: f32 = 40.0;
pub const RETRY_DELAY_MS: f64 = 2_000.0;
/// Fraction of each screen edge excluded from placement
const SAFE_MARGIN: f32 = 0.15;

pub fn update(ctx: &mut SimContext) {
    if ctx.glyph.is_none() {
        try_spawn(ctx);
    } else {
        step(ctx);
    }
}

fn try_spawn(ctx: &mut SimContext) {
    if ctx.now < ctx.spawn.next_glyph_at || ctx.active_particle_ratio <= MIN_SPAWN_RATIO {
        return;
    }
    match find_spawn_position(ctx) {
        Some(pos) => spawn_glyph_at(ctx, pos),
        None => {
            ctx.spawn.next_glyph_at = ctx.now + RETRY_DELAY_MS;
            ctx.events.push(SimEvent::GlyphSpawnDeferred);
            log::warn!("No safe glyph position found, retrying in {}ms", RETRY_DELAY_MS);
        }
    }
}

/// Sample the safe interior for a point clear of every outbreak
pub fn find_spawn_position(ctx: &mut SimContext) -> Option<Vec2> {
    let clearance = ctx.tuning.glyph_capture_radius + SAFETY_BUFFER;
    let (w, h) = (ctx.screen.width, ctx.screen.height);
    for _ in 0..SPAWN_ATTEMPTS {
        let candidate = Vec2::new(
            ctx.rng.random_range(SAFE_MARGIN..=1.0 - SAFE_MARGIN) * w,
            ctx.rng.random_range(SAFE_MARGIN..=1.0 - SAFE_MARGIN) * h,
        );
        let clear = ctx
            .outbreaks
            .values()
            .all(|o| o.pos.distance(candidate) > o.radius + clearance);
        if clear {
            return Some(candidate);
        }
    }
    None
}

pub fn spawn_glyph_at(ctx: &mut SimContext, pos: Vec2) {
    ctx.glyph = Some(Glyph {
        pos,
        spawned_at: ctx.now,
        capture: None,
    });
    ctx.events.push(SimEvent::GlyphSpawned { pos });
    log::debug!("Glyph spawned at ({:.0}, {:.0})", pos.x, pos.y);
}

fn reschedule(ctx: &mut SimContext) {
    let interval = ctx.tuning.glyph_spawn_interval;
    ctx.spawn.next_glyph_at = ctx.now + ctx.rng.random_range(interval.min_ms..=interval.max_ms);
}

fn reaches<C: Capturable>(entity: &C, pos: Vec2, reach: f32) -> bool {
    entity.position().distance(pos) < entity.hit_radius() + reach
}

/// First entity (outbreaks before anomalies) whose hit circle reaches `pos`
fn find_capturer(ctx: &SimContext, pos: Vec2) -> Option<Target> {
    let reach = ctx.tuning.glyph_capture_radius;
    ctx.outbreaks
        .iter()
        .find(|(_, o)| reaches(*o, pos, reach))
        .map(|(id, _)| Target::Outbreak(id))
        .or_else(|| {
            ctx.anomalies
                .iter()
                .find(|(_, a)| reaches(*a, pos, reach))
                .map(|(id, _)| Target::Anomaly(id))
        })
}

fn step(ctx: &mut SimContext) {
    let now = ctx.now;
    let Some(glyph) = ctx.glyph.as_ref() else {
        return;
    };
    let (pos, spawned_at, capture) = (glyph.pos, glyph.spawned_at, glyph.capture);

    match capture {
        Some(capture) => {
            if !ctx.is_alive(capture.target) {
                if let Some(glyph) = ctx.glyph.as_mut() {
                    glyph.capture = None;
                }
                ctx.events.push(SimEvent::GlyphCaptureLost);
                return;
            }

            let remaining_ms = capture.remaining_ms - TICK_MS;
            if remaining_ms > 0.0 {
                if let Some(capture) = ctx.glyph.as_mut().and_then(|g| g.capture.as_mut()) {
                    capture.remaining_ms = remaining_ms;
                }
                return;
            }

            if let Some(entity) = capture.target.resolve_mut(&mut ctx.outbreaks, &mut ctx.anomalies) {
                entity.grant_capture_buff(now, &ctx.tuning);
            }
            ctx.glyph = None;
            ctx.events.push(SimEvent::GlyphCaptured { target: capture.target });
            log::debug!("Glyph captured by {:?}", capture.target);
            reschedule(ctx);
        }
        None => {
            if now - spawned_at >= ctx.tuning.glyph_lifetime_ms {
                ctx.glyph = None;
                ctx.events.push(SimEvent::GlyphExpired);
                reschedule(ctx);
                return;
            }

            if let Some(target) = find_capturer(ctx, pos) {
                let remaining_ms = ctx.tuning.glyph_capture_ms;
                if let Some(glyph) = ctx.glyph.as_mut() {
                    glyph.capture = Some(Capture { target, remaining_ms });
                }
                ctx.events.push(SimEvent::GlyphCaptureStarted { target });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::anomaly::spawn_anomaly_at;
    use crate::sim::particles::ParticleField;
    use crate::sim::state::{ANOMALY_HIT_RADIUS, Outbreak};
    use crate::tuning::Tuning;

    fn context() -> SimContext {
        let mut ctx = SimContext::new(Tuning::default(), 800.0, 600.0, 9, 0.0).unwrap();
        ctx.particles = ParticleField::empty();
        ctx
    }

    fn advance(ctx: &mut SimContext) {
        ctx.now += TICK_MS;
        update(ctx);
    }

    #[test]
    fn test_capture_grants_regen_boost() {
        let mut ctx = context();
        spawn_glyph_at(&mut ctx, Vec2::new(400.0, 300.0));
        let id = ctx.outbreaks.insert(Outbreak::new(Vec2::new(420.0, 300.0), 30.0, 100.0, 0.0));

        advance(&mut ctx);
        let glyph = ctx.glyph.as_ref().unwrap();
        assert!(glyph.is_capturing());
        let capture = glyph.capture.unwrap();
        assert_eq!(capture.target, Target::Outbreak(id));
        assert_eq!(capture.remaining_ms, 1_000.0);

        let mut ticks = 0;
        while ctx.glyph.is_some() && ticks < 100 {
            advance(&mut ctx);
            ticks += 1;
        }
        assert!((60..=61).contains(&ticks), "capture took {ticks} ticks");
        let until = ctx.outbreaks.get(id).unwrap().regen_boost_until.unwrap();
        assert!((until - (ctx.now + 15_000.0)).abs() < 1e-6);
        assert!(ctx.spawn.next_glyph_at > ctx.now);
    }

    #[test]
    fn test_anomaly_capture_grants_vortex_boost() {
        let mut ctx = context();
        spawn_glyph_at(&mut ctx, Vec2::new(400.0, 300.0));
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(410.0, 300.0));

        advance(&mut ctx);
        assert_eq!(ctx.glyph.as_ref().unwrap().capture.unwrap().target, Target::Anomaly(id));

        let mut ticks = 0;
        while ctx.glyph.is_some() && ticks < 100 {
            advance(&mut ctx);
            ticks += 1;
        }
        assert!(ctx.glyph.is_none());
        let anomaly = ctx.anomalies.get(id).unwrap();
        let until = anomaly.vortex_boost_until.unwrap();
        assert!((until - (ctx.now + ctx.tuning.vortex_boost_ms)).abs() < 1e-6);
        assert!(anomaly.vortex_boosted(ctx.now));
        assert!(ctx.events.contains(&SimEvent::GlyphCaptured { target: Target::Anomaly(id) }));
    }

    #[test]
    fn test_capture_reach_uses_hit_radius() {
        let mut ctx = context();
        let reach = ctx.tuning.glyph_capture_radius;
        let glyph = Vec2::new(400.0, 300.0);
        // Just outside an anomaly's hit circle plus the capture reach
        spawn_anomaly_at(&mut ctx, glyph + Vec2::new(ANOMALY_HIT_RADIUS + reach + 1.0, 0.0));
        assert!(find_capturer(&ctx, glyph).is_none());

        let id = ctx.outbreaks.insert(Outbreak::new(glyph + Vec2::new(80.0 + reach - 1.0, 0.0), 80.0, 100.0, 0.0));
        assert_eq!(find_capturer(&ctx, glyph), Some(Target::Outbreak(id)));
    }

    #[test]
    fn test_capture_target_locked() {
        let mut ctx = context();
        spawn_glyph_at(&mut ctx, Vec2::new(400.0, 300.0));
        let first = spawn_anomaly_at(&mut ctx, Vec2::new(410.0, 300.0));
        advance(&mut ctx);

        // A closer outbreak showing up later does not steal the capture
        ctx.outbreaks.insert(Outbreak::new(Vec2::new(400.0, 300.0), 50.0, 100.0, 0.0));
        for _ in 0..10 {
            advance(&mut ctx);
            let capture = ctx.glyph.as_ref().unwrap().capture.unwrap();
            assert_eq!(capture.target, Target::Anomaly(first));
        }
    }

    #[test]
    fn test_capture_lost_when_target_dies() {
        let mut ctx = context();
        spawn_glyph_at(&mut ctx, Vec2::new(400.0, 300.0));
        let id = ctx.outbreaks.insert(Outbreak::new(Vec2::new(420.0, 300.0), 30.0, 100.0, 0.0));
        advance(&mut ctx);
        assert!(ctx.glyph.as_ref().unwrap().is_capturing());

        ctx.outbreaks.remove(id);
        advance(&mut ctx);
        let glyph = ctx.glyph.as_ref().unwrap();
        assert!(!glyph.is_capturing());
        assert!(ctx.events.contains(&SimEvent::GlyphCaptureLost));
    }

    #[test]
    fn test_uncaptured_glyph_expires() {
        let mut ctx = context();
        spawn_glyph_at(&mut ctx, Vec2::new(400.0, 300.0));
        ctx.now += ctx.tuning.glyph_lifetime_ms;
        update(&mut ctx);
        assert!(ctx.glyph.is_none());
        assert!(ctx.events.contains(&SimEvent::GlyphExpired));
    }

    #[test]
    fn test_spawn_requires_ratio_and_timer() {
        let mut ctx = context();
        ctx.now = ctx.spawn.next_glyph_at;
        ctx.active_particle_ratio = 0.2;
        update(&mut ctx);
        assert!(ctx.glyph.is_none());

        ctx.active_particle_ratio = 0.8;
        update(&mut ctx);
        assert!(ctx.glyph.is_some());
    }

    #[test]
    fn test_crowded_screen_defers_spawn() {
        let mut ctx = context();
        ctx.outbreaks.insert(Outbreak::new(ctx.screen.center, 2_000.0, 100.0, 0.0));
        ctx.now = ctx.spawn.next_glyph_at;
        ctx.active_particle_ratio = 1.0;
        update(&mut ctx);

        assert!(ctx.glyph.is_none());
        assert_eq!(ctx.spawn.next_glyph_at, ctx.now + RETRY_DELAY_MS);
        assert!(ctx.events.contains(&SimEvent::GlyphSpawnDeferred));
    }
}
