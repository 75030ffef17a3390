//! Anomaly simulation
//!
//! Anomalies alternate between orbiting a point and drifting to a new one,
//! spinning nearby particles with their vortex. Age drives vortex growth and
//! a one-shot maturity health boost; past a hard age cap they fade out.

use glam::Vec2;
use rand::Rng;

use super::state::{
    ANOMALY_HIT_RADIUS, Anomaly, AnomalyId, AnomalyMotion, Orbit, OutbreakId, Screen, SimContext, SimEvent,
};
use crate::consts::{TICK_MS, TICK_SECS};
use crate::tuning::Tuning;
use crate::{direction_and_distance, polar_to_cartesian};

pub const MIN_SPAWN_RATIO: f32 = 0.2;
pub const START_HEALTH: f32 = 60.0;
/// Roughly five minutes of ticks
pub const MAX_AGE_TICKS: u32 = 18_000;
pub const MATURITY_AGE: u32 = 900;
pub const MATURITY_HEALTH_BONUS: f32 = 40.0;
pub const MANUAL_DAMAGE: f32 = 1.5;
pub const AUTO_DAMAGE: f32 = 0.8;

/// Ticks until vortex and orbit reach full size
const GROWTH_TICKS: f32 = 1800.0;
const BASE_ORBIT_RADIUS: f32 = 40.0;
const ORBIT_RADIUS_GROWTH: f32 = 60.0;
const ORBIT_SPEED: f32 = 0.02;
const ORBIT_DURATION_MS: std::ops::Range<f64> = 4_000.0..8_000.0;
const DRIFT_DURATION_MS: std::ops::RangeInclusive<f64> = 1_500.0..=3_000.0;
const PULL_DEAD_ZONE: f32 = 30.0;
const WEAKEN_CADENCE: u32 = 10;
const VULNERABLE_INTENSITY: f32 = 0.3;

pub fn update(ctx: &mut SimContext) {
    try_spawn(ctx);
    step(ctx);
}

fn try_spawn(ctx: &mut SimContext) {
    let now = ctx.now;
    if now < ctx.spawn.next_anomaly_at || ctx.active_particle_ratio < MIN_SPAWN_RATIO {
        return;
    }
    let min_dim = ctx.screen.min_dim();
    let dist = ctx.rng.random_range(0.25..0.45) * min_dim;
    let angle = ctx.rng.random_range(0.0..std::f32::consts::TAU);
    let pos = ctx.screen.center + polar_to_cartesian(dist, angle);
    spawn_anomaly_at(ctx, pos);

    let interval = ctx.tuning.anomaly_spawn_interval;
    ctx.spawn.next_anomaly_at = now + ctx.rng.random_range(interval.min_ms..=interval.max_ms);
}

/// Insert a fresh anomaly orbiting so that it currently sits at `pos`
pub fn spawn_anomaly_at(ctx: &mut SimContext, pos: Vec2) -> AnomalyId {
    let angle = ctx.rng.random_range(0.0..std::f32::consts::TAU);
    let timer_ms = ctx.rng.random_range(ORBIT_DURATION_MS);
    let anomaly = Anomaly {
        pos,
        orbit: Orbit {
            center: pos - polar_to_cartesian(BASE_ORBIT_RADIUS, angle),
            angle,
            radius: BASE_ORBIT_RADIUS,
            speed: ORBIT_SPEED,
        },
        motion: AnomalyMotion::Orbiting { timer_ms },
        vortex_radius: ctx.tuning.vortex_radius * 0.6,
        vortex_strength: ctx.tuning.vortex_strength * 0.5,
        health: START_HEALTH,
        max_health: START_HEALTH,
        age: 0,
        matured: false,
        vortex_boost_until: None,
    };
    let id = ctx.anomalies.insert(anomaly);
    ctx.events.push(SimEvent::AnomalySpawned { pos });
    log::debug!("Anomaly spawned at ({:.0}, {:.0})", pos.x, pos.y);
    id
}

/// Choose where to drift: usually toward a live outbreak (maxed ones
/// preferred), otherwise a random point on screen.
pub fn choose_drift_target<R: Rng>(
    outbreaks: &[(OutbreakId, Vec2, f32, bool)],
    screen: &Screen,
    rng: &mut R,
) -> Vec2 {
    let target = if !outbreaks.is_empty() && rng.random::<f32>() < 0.7 {
        let maxed: Vec<_> = outbreaks.iter().filter(|o| o.3).collect();
        let pool: Vec<_> = if !maxed.is_empty() && rng.random::<f32>() < 0.8 {
            maxed
        } else {
            outbreaks.iter().collect()
        };
        let &(_, pos, radius, _) = pool[rng.random_range(0..pool.len())];
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        pos + polar_to_cartesian(radius + rng.random_range(30.0..80.0), angle)
    } else {
        Vec2::new(
            rng.random_range(0.1..0.9) * screen.width,
            rng.random_range(0.1..0.9) * screen.height,
        )
    };
    target.clamp(Vec2::ZERO, Vec2::new(screen.width, screen.height))
}

/// Apply age-driven vortex/orbit growth and the one-shot maturity boost
fn mature(a: &mut Anomaly, tuning: &Tuning) {
    let growth = (a.age as f32 / GROWTH_TICKS).min(1.0);
    a.vortex_radius = tuning.vortex_radius * (0.6 + 0.6 * growth);
    a.vortex_strength = tuning.vortex_strength * (0.5 + 0.8 * growth);
    a.orbit.radius = BASE_ORBIT_RADIUS + ORBIT_RADIUS_GROWTH * growth;
    if !a.matured && a.age >= MATURITY_AGE {
        a.matured = true;
        a.max_health += MATURITY_HEALTH_BONUS;
        a.health += MATURITY_HEALTH_BONUS;
    }
}

/// Advance every live anomaly by one tick
pub fn step(ctx: &mut SimContext) {
    let now = ctx.now;
    let cursor = ctx.cursor.pos;
    let manual = ctx.cursor.is_manual();
    let intensity = ctx.disruption.intensity;
    let dominance = ctx.dominance();
    let wave_center = ctx.disruption.center;
    let wave_reach = (ctx.screen.diagonal * 0.6).max(1.0);
    let primary = ctx.disruption.primary.and_then(|t| t.as_anomaly()).filter(|id| ctx.anomalies.contains(*id));
    let screen = ctx.screen;
    let bounds = Vec2::new(screen.width, screen.height);

    let mut damage_scale = ctx.cursor.radius_multiplier * (1.0 - ctx.active_particle_ratio * 0.6);
    if ctx.buffs.black_hole_kill.is_active(now) {
        damage_scale *= super::outbreak::BLACK_HOLE_KILL_MULTIPLIER;
    }
    if ctx.buffs.damage_boost.is_active(now) {
        damage_scale *= super::outbreak::DAMAGE_BOOST_MULTIPLIER;
    }

    let outbreaks: Vec<(OutbreakId, Vec2, f32, bool)> = ctx
        .outbreaks
        .iter()
        .map(|(id, o)| (id, o.pos, o.radius, o.maxed))
        .collect();
    let handles: Vec<AnomalyId> = ctx.anomalies.handles().to_vec();
    let mut dead: Vec<AnomalyId> = Vec::new();

    for id in handles {
        let Some(a) = ctx.anomalies.get_mut(id) else {
            continue;
        };
        a.age += 1;

        let cursor_dist = a.pos.distance(cursor);
        if cursor_dist < ctx.tuning.anomaly_dissolve_radius {
            ctx.events.push(SimEvent::AnomalyDissolved { pos: a.pos });
            dead.push(id);
            continue;
        }

        let is_primary = primary == Some(id) && intensity > VULNERABLE_INTENSITY;
        if cursor_dist < ANOMALY_HIT_RADIUS {
            let base = if manual { MANUAL_DAMAGE } else { AUTO_DAMAGE };
            let mut damage = base * damage_scale;
            if intensity > VULNERABLE_INTENSITY {
                let mut desperation = 1.0 + dominance * 1.5;
                if is_primary {
                    desperation *= 1.5;
                }
                damage *= desperation;
            }
            a.health = (a.health - damage).max(0.0);
        }

        let mut pull = Vec2::ZERO;
        if is_primary {
            let (to_cursor, dist) = direction_and_distance(a.pos, cursor);
            if dist > PULL_DEAD_ZONE {
                pull = to_cursor * 0.35 * (0.5 + dominance) * intensity;
            }
            if a.age % WEAKEN_CADENCE == 0 {
                a.health = (a.health - a.max_health * 0.02 * intensity).max(0.0);
            }
        } else if intensity > 0.0 {
            let (away, dist) = direction_and_distance(wave_center, a.pos);
            let shift = away * 2.0 * intensity * (1.0 - dist / wave_reach).max(0.0);
            a.orbit.center += shift;
            if let AnomalyMotion::Drifting { target, .. } = &mut a.motion {
                *target += shift;
            }
        }

        if a.health <= 0.0 {
            ctx.events.push(SimEvent::AnomalyDied { pos: a.pos });
            ctx.buffs.shield.grant(now, ctx.tuning.shield_ms);
            dead.push(id);
            continue;
        }
        if a.age > MAX_AGE_TICKS {
            ctx.events.push(SimEvent::AnomalyExpired { pos: a.pos });
            dead.push(id);
            continue;
        }

        mature(a, &ctx.tuning);

        a.motion = match a.motion {
            AnomalyMotion::Orbiting { timer_ms } => {
                let timer_ms = timer_ms - TICK_MS;
                if timer_ms <= 0.0 {
                    AnomalyMotion::Drifting {
                        target: choose_drift_target(&outbreaks, &screen, &mut ctx.rng),
                        timer_ms: ctx.rng.random_range(DRIFT_DURATION_MS),
                    }
                } else {
                    AnomalyMotion::Orbiting { timer_ms }
                }
            }
            AnomalyMotion::Drifting { target, timer_ms } => {
                let timer_ms = timer_ms - TICK_MS;
                if timer_ms <= 0.0 {
                    a.orbit.center = a.pos;
                    a.orbit.angle = ctx.rng.random_range(0.0..std::f32::consts::TAU);
                    AnomalyMotion::Orbiting {
                        timer_ms: ctx.rng.random_range(ORBIT_DURATION_MS),
                    }
                } else {
                    AnomalyMotion::Drifting { target, timer_ms }
                }
            }
        };

        match a.motion {
            AnomalyMotion::Drifting { target, .. } => {
                let (toward, dist) = direction_and_distance(a.pos, target);
                let travel = dist.min(ctx.tuning.anomaly_drift_speed * TICK_SECS);
                a.pos += toward * travel + pull;
            }
            AnomalyMotion::Orbiting { .. } => {
                let near_outbreak = outbreaks
                    .iter()
                    .any(|o| o.1.distance(a.pos) < ctx.tuning.synergy_range);
                let speed = if near_outbreak { a.orbit.speed * 0.5 } else { a.orbit.speed };
                a.orbit.angle = (a.orbit.angle + speed) % std::f32::consts::TAU;
                a.orbit.center = (a.orbit.center + pull * 0.3).clamp(Vec2::ZERO, bounds);
                a.pos = a.orbit.center + polar_to_cartesian(a.orbit.radius, a.orbit.angle);
            }
        }
    }

    if !dead.is_empty() {
        ctx.anomalies.remove_many(&dead);
        log::debug!("{} anomaly(s) removed, {} remaining", dead.len(), ctx.anomalies.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particles::ParticleField;
    use crate::sim::state::{Outbreak, Target};

    fn context() -> SimContext {
        let mut ctx = SimContext::new(Tuning::default(), 800.0, 600.0, 5, 0.0).unwrap();
        ctx.particles = ParticleField::empty();
        ctx.cursor.pos = Vec2::new(790.0, 590.0);
        ctx
    }

    fn advance(ctx: &mut SimContext) {
        ctx.now += TICK_MS;
        step(ctx);
    }

    #[test]
    fn test_orbit_timer_expiry_starts_drift() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Orbiting { timer_ms: 1.0 };

        advance(&mut ctx);
        match ctx.anomalies.get(id).unwrap().motion {
            AnomalyMotion::Drifting { timer_ms, .. } => {
                assert!((1_500.0..=3_000.0).contains(&timer_ms));
            }
            other => panic!("expected drifting, got {other:?}"),
        }
    }

    #[test]
    fn test_drift_expiry_reorbits_in_place() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Drifting {
            target: Vec2::new(500.0, 300.0),
            timer_ms: 1.0,
        };

        advance(&mut ctx);
        let a = ctx.anomalies.get(id).unwrap();
        assert!(a.is_orbiting());
        assert!(!a.is_drifting());
        assert_eq!(a.orbit.center, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_drift_timer_frozen_while_orbiting() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Orbiting { timer_ms: 5_000.0 };
        advance(&mut ctx);
        assert_eq!(
            ctx.anomalies.get(id).unwrap().motion,
            AnomalyMotion::Orbiting { timer_ms: 5_000.0 - TICK_MS }
        );
    }

    #[test]
    fn test_cursor_damage_and_shield_on_death() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Drifting {
            target: Vec2::new(300.0, 300.0),
            timer_ms: 10_000.0,
        };
        ctx.cursor.pos = Vec2::new(325.0, 300.0);

        advance(&mut ctx);
        let hp = ctx.anomalies.get(id).unwrap().health;
        assert!(hp < START_HEALTH);

        ctx.anomalies.get_mut(id).unwrap().health = 0.01;
        advance(&mut ctx);
        assert!(!ctx.anomalies.contains(id));
        assert!(ctx.buffs.shield.is_active(ctx.now));
    }

    #[test]
    fn test_dissolve_and_age_cap() {
        let mut ctx = context();
        let near = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(near).unwrap().motion = AnomalyMotion::Drifting {
            target: Vec2::new(300.0, 300.0),
            timer_ms: 10_000.0,
        };
        let old = spawn_anomaly_at(&mut ctx, Vec2::new(100.0, 100.0));
        ctx.anomalies.get_mut(old).unwrap().age = MAX_AGE_TICKS;
        ctx.cursor.pos = Vec2::new(305.0, 300.0);

        advance(&mut ctx);
        assert!(!ctx.anomalies.contains(near));
        assert!(!ctx.anomalies.contains(old));
        assert!(ctx.events.iter().any(|e| matches!(e, SimEvent::AnomalyExpired { .. })));
    }

    #[test]
    fn test_maturity_boost_applies_once() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().age = MATURITY_AGE - 1;
        advance(&mut ctx);
        advance(&mut ctx);
        let a = ctx.anomalies.get(id).unwrap();
        assert_eq!(a.max_health, START_HEALTH + MATURITY_HEALTH_BONUS);
        assert_eq!(a.health, START_HEALTH + MATURITY_HEALTH_BONUS);
    }

    #[test]
    fn test_orbit_slows_near_outbreak() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(300.0, 300.0));
        ctx.anomalies.get_mut(id).unwrap().orbit.angle = 0.0;
        let before = 0.0;
        advance(&mut ctx);
        let free_step = ctx.anomalies.get(id).unwrap().orbit.angle - before;

        ctx.outbreaks.insert(Outbreak::new(Vec2::new(320.0, 300.0), 20.0, 100.0, 0.0));
        let before = ctx.anomalies.get(id).unwrap().orbit.angle;
        advance(&mut ctx);
        let slowed_step = ctx.anomalies.get(id).unwrap().orbit.angle - before;
        assert!((slowed_step - free_step * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_drift_target_on_screen() {
        let ctx = context();
        let mut rng = ctx.rng.clone();
        let outbreaks = vec![(OutbreakId::default(), Vec2::new(10.0, 10.0), 150.0, true)];
        for _ in 0..100 {
            let t = choose_drift_target(&outbreaks, &ctx.screen, &mut rng);
            assert!(t.x >= 0.0 && t.x <= 800.0 && t.y >= 0.0 && t.y <= 600.0);
        }
    }

    #[test]
    fn test_primary_anomaly_pulled_toward_cursor() {
        let mut ctx = context();
        let start = Vec2::new(400.0, 300.0);
        let id = spawn_anomaly_at(&mut ctx, start);
        ctx.anomalies.get_mut(id).unwrap().age = WEAKEN_CADENCE - 1;
        let center = ctx.anomalies.get(id).unwrap().orbit.center;
        ctx.disruption.active = true;
        ctx.disruption.intensity = 1.0;
        ctx.disruption.primary = Some(Target::Anomaly(id));

        advance(&mut ctx);
        let a = ctx.anomalies.get(id).unwrap();
        // Orbiting anomalies take 30% of the pull on their orbit center
        let pull = (ctx.cursor.pos - start).normalize() * 0.35 * 1.5;
        assert!((a.orbit.center - (center + pull * 0.3)).length() < 1e-4);
        assert!((a.health - (START_HEALTH - START_HEALTH * 0.02)).abs() < 1e-4);
    }

    #[test]
    fn test_drifting_primary_takes_full_pull() {
        let mut ctx = context();
        let start = Vec2::new(400.0, 300.0);
        let id = spawn_anomaly_at(&mut ctx, start);
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Drifting {
            target: start,
            timer_ms: 10_000.0,
        };
        ctx.disruption.active = true;
        ctx.disruption.intensity = 1.0;
        ctx.disruption.primary = Some(Target::Anomaly(id));

        advance(&mut ctx);
        let pull = (ctx.cursor.pos - start).normalize() * 0.35 * 1.5;
        assert!((ctx.anomalies.get(id).unwrap().pos - (start + pull)).length() < 1e-4);
    }

    #[test]
    fn test_wave_shifts_orbit_and_drift_target() {
        let mut ctx = context();
        let id = spawn_anomaly_at(&mut ctx, Vec2::new(500.0, 300.0));
        let target = Vec2::new(600.0, 300.0);
        ctx.anomalies.get_mut(id).unwrap().motion = AnomalyMotion::Drifting {
            target,
            timer_ms: 2_000.0,
        };
        let center = ctx.anomalies.get(id).unwrap().orbit.center;
        ctx.disruption.intensity = 0.5;
        ctx.disruption.center = Vec2::new(400.0, 300.0);

        advance(&mut ctx);
        let a = ctx.anomalies.get(id).unwrap();
        let shift = Vec2::X * 2.0 * 0.5 * (1.0 - 100.0 / (ctx.screen.diagonal * 0.6));
        assert!((a.orbit.center - (center + shift)).length() < 1e-4);
        match a.motion {
            AnomalyMotion::Drifting { target: shifted, .. } => {
                assert!((shifted - (target + shift)).length() < 1e-4);
            }
            other => panic!("expected drifting, got {other:?}"),
        }
        assert_eq!(a.health, START_HEALTH);
    }
}
