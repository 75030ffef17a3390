//! Outbreak simulation
//!
//! Outbreaks grow in a push phase, turn into gravity wells at `PULL_PHASE_AGE`,
//! and fight back through proximity support (synergy) and regeneration. The
//! cursor damages them by sitting inside their radius.

use glam::Vec2;
use rand::Rng;

use super::state::{CursorBuffs, Outbreak, OutbreakId, SimContext, SimEvent};
use crate::consts::PULL_PHASE_AGE;
use crate::tuning::Tuning;
use crate::{direction_and_distance, lerp};

/// Base damage per tick by penetration depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageTiers {
    pub deep: f32,
    pub mid: f32,
    pub edge: f32,
}

pub const MANUAL_DAMAGE: DamageTiers = DamageTiers {
    deep: 3.5,
    mid: 2.2,
    edge: 1.2,
};
pub const AUTO_DAMAGE: DamageTiers = DamageTiers {
    deep: 1.8,
    mid: 1.1,
    edge: 0.6,
};

pub const DEEP_PENETRATION: f32 = 0.7;
pub const MID_PENETRATION: f32 = 0.4;

/// Disruption intensity above which marked targets lose their support
pub const VULNERABLE_INTENSITY: f32 = 0.3;
pub const BLACK_HOLE_KILL_MULTIPLIER: f32 = 2.5;
pub const DAMAGE_BOOST_MULTIPLIER: f32 = 1.4;
/// Damage multiplier for an outbreak next to a maxed one
pub const MAXED_SUPPORT_PROTECTION: f32 = 0.7;
pub const REGEN_BOOST_MULTIPLIER: f32 = 2.5;
pub const VELOCITY_DAMPING: f32 = 0.85;
/// Below this health, touched outbreaks slowly shrink
pub const LOW_HEALTH: f32 = 30.0;

const REGEN_CADENCE: u32 = 5;
const WEAKEN_CADENCE: u32 = 10;
const COLLISION_CADENCE: u32 = 8;
const PULL_DEAD_ZONE: f32 = 30.0;
const PAIR_BONUS_RANGE: f32 = 150.0;
const COLLISION_RANGE: f32 = 100.0;
const ATTRACTION_MIN: f32 = 50.0;
const ATTRACTION_MAX: f32 = 400.0;

/// Where an outbreak's damage reduction comes from this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Marked by an active disruption: no support at all
    Vulnerable,
    /// Within synergy range of an anomaly
    Anomaly,
    /// Near a maxed outbreak
    Maxed,
    None,
}

impl Support {
    fn is_supported(self) -> bool {
        matches!(self, Support::Anomaly | Support::Maxed)
    }
}

/// Base damage for a penetration depth `1 - distance / radius`
pub fn base_damage(penetration: f32, manual: bool) -> f32 {
    let tiers = if manual { MANUAL_DAMAGE } else { AUTO_DAMAGE };
    if penetration > DEEP_PENETRATION {
        tiers.deep
    } else if penetration > MID_PENETRATION {
        tiers.mid
    } else {
        tiers.edge
    }
}

/// Decide support for one outbreak. Anomaly support wins over maxed support.
pub fn support_status(
    id: OutbreakId,
    pos: Vec2,
    marked: bool,
    intensity: f32,
    anomalies: &[Vec2],
    others: &[(OutbreakId, Vec2, f32, bool)],
    synergy_range: f32,
) -> Support {
    if marked && intensity > VULNERABLE_INTENSITY {
        return Support::Vulnerable;
    }
    if anomalies.iter().any(|a| a.distance(pos) < synergy_range) {
        return Support::Anomaly;
    }
    let maxed_range = synergy_range * 0.8;
    if others
        .iter()
        .any(|&(other, other_pos, _, maxed)| other != id && maxed && other_pos.distance(pos) < maxed_range)
    {
        return Support::Maxed;
    }
    Support::None
}

/// Spawn when the timer allows, then advance every outbreak one tick
pub fn update(ctx: &mut SimContext) {
    try_spawn(ctx);
    step(ctx);
}

fn try_spawn(ctx: &mut SimContext) {
    let now = ctx.now;
    if now < ctx.spawn.next_outbreak_at || ctx.active_particle_ratio < ctx.tuning.outbreak_min_spawn_ratio {
        return;
    }

    // Periodic windows where the swarm gets a breather unless the roll says otherwise
    let secs = (ctx.elapsed() / 1000.0) as f32;
    let losing_window = (secs * 0.05).sin() > 0.6;
    if losing_window && ctx.rng.random::<f32>() > 0.3 {
        ctx.spawn.next_outbreak_at = now + 1_000.0;
        return;
    }

    let pos = spawn_position(ctx);
    spawn_outbreak_at(ctx, pos);
    ctx.spawn.next_outbreak_at = now + rearm_interval(ctx);
}

/// Pick a spawn point from the close/medium/far bands (30/35/35 odds)
fn spawn_position(ctx: &mut SimContext) -> Vec2 {
    let roll: f32 = ctx.rng.random();
    let (lo, hi) = if roll < 0.3 {
        (0.2, 0.45)
    } else if roll < 0.65 {
        (0.45, 0.7)
    } else {
        (0.7, 0.95)
    };
    let band = lerp(lo, hi, ctx.rng.random::<f32>());
    let angle = ctx.rng.random_range(0.0..std::f32::consts::TAU);
    let half = Vec2::new(ctx.screen.width, ctx.screen.height) * 0.5;
    ctx.screen.center + Vec2::new(angle.cos() * half.x, angle.sin() * half.y) * band
}

/// Delay until the next spawn: shorter while the swarm is healthy
pub fn rearm_interval(ctx: &mut SimContext) -> f64 {
    let interval = ctx.tuning.outbreak_spawn_interval.get(ctx.screen.profile);
    let ratio = ctx.active_particle_ratio as f64;
    let base = interval.max_ms + (interval.min_ms - interval.max_ms) * ratio;
    base * ctx.rng.random_range(0.5..=1.5)
}

/// Insert an outbreak sized for the current game time
pub fn spawn_outbreak_at(ctx: &mut SimContext, pos: Vec2) -> OutbreakId {
    let progress = ctx.progress();
    let radius = lerp(8.0, 20.0, progress);
    let health = lerp(80.0, 220.0, progress) * ctx.screen.health_scale();
    let phase = ctx.rng.random_range(0.0..std::f32::consts::TAU);

    let id = ctx.outbreaks.insert(Outbreak::new(pos, radius, health, phase));
    ctx.events.push(SimEvent::OutbreakSpawned { pos, radius, health });
    log::debug!("Outbreak spawned at ({:.0}, {:.0}) r={:.1} hp={:.0}", pos.x, pos.y, radius, health);
    id
}

/// Killing a gravity well arms the black-hole-kill boost, anything younger a damage boost
fn grant_death_buffs(buffs: &mut CursorBuffs, tuning: &Tuning, now: f64, pull_phase: bool) {
    if pull_phase {
        buffs.black_hole_kill.grant(now, tuning.black_hole_kill_boost_ms);
    } else {
        buffs.damage_boost.grant(now, tuning.damage_boost_ms);
    }
}

/// Advance every live outbreak by one tick
pub fn step(ctx: &mut SimContext) {
    let now = ctx.now;
    let cursor = ctx.cursor.pos;
    let manual = ctx.cursor.is_manual();
    let radius_multiplier = ctx.cursor.radius_multiplier;
    let ratio = ctx.active_particle_ratio;
    let dominance = ctx.dominance();
    let progress = ctx.progress();
    let max_radius = ctx.max_radius();
    let intensity = ctx.disruption.intensity;
    let disruption_active = ctx.disruption.active;
    let wave_center = ctx.disruption.center;
    let wave_reach = (ctx.screen.diagonal * 0.6).max(1.0);
    let bounds = Vec2::new(ctx.screen.width, ctx.screen.height);

    // Stale references count as "no target"
    let primary = ctx.disruption.primary.filter(|t| ctx.is_alive(*t));
    let primary_id = primary.and_then(|t| t.as_outbreak());
    let primary_pos = primary.and_then(|t| ctx.target_position(t));
    let secondary_id = ctx.disruption.secondary.filter(|id| ctx.outbreaks.contains(*id));
    let secondary_pos = secondary_id.and_then(|id| ctx.outbreaks.get(id)).map(|o| o.pos);
    let pair_bonus = match (primary_id.and(primary_pos), secondary_pos) {
        (Some(a), Some(b)) if a.distance(b) < PAIR_BONUS_RANGE => {
            1.0 + 0.5 * (1.0 - a.distance(b) / PAIR_BONUS_RANGE)
        }
        _ => 1.0,
    };

    let mut damage_scale = radius_multiplier * (1.0 - ratio * 0.6);
    if ctx.buffs.black_hole_kill.is_active(now) {
        damage_scale *= BLACK_HOLE_KILL_MULTIPLIER;
    }
    if ctx.buffs.damage_boost.is_active(now) {
        damage_scale *= DAMAGE_BOOST_MULTIPLIER;
    }

    let anomalies: Vec<Vec2> = ctx.anomalies.values().map(|a| a.pos).collect();
    let others: Vec<(OutbreakId, Vec2, f32, bool)> = ctx
        .outbreaks
        .iter()
        .map(|(id, o)| (id, o.pos, o.radius, o.maxed))
        .collect();
    let handles: Vec<OutbreakId> = ctx.outbreaks.handles().to_vec();

    let mut dead: Vec<OutbreakId> = Vec::new();
    let mut primary_hits = 0.0_f32;

    for id in handles {
        let Some(o) = ctx.outbreaks.get_mut(id) else {
            continue;
        };
        o.frame += 1;

        let cursor_dist = o.pos.distance(cursor);
        if cursor_dist < ctx.tuning.outbreak_dissolve_radius {
            ctx.events.push(SimEvent::OutbreakDissolved { pos: o.pos });
            dead.push(id);
            continue;
        }

        let is_primary = primary_id == Some(id);
        let is_secondary = secondary_id == Some(id);
        let support = support_status(
            id,
            o.pos,
            is_primary || is_secondary,
            intensity,
            &anomalies,
            &others,
            ctx.tuning.synergy_range,
        );

        // Cursor damage
        if cursor_dist < o.radius {
            o.ever_touched = true;
            let penetration = 1.0 - cursor_dist / o.radius;
            let mut damage = base_damage(penetration, manual) * damage_scale;
            if intensity > VULNERABLE_INTENSITY {
                let mut desperation = 1.0 + dominance * 1.5;
                if is_primary {
                    desperation *= 1.5 * pair_bonus;
                } else if is_secondary {
                    desperation *= 1.3 * pair_bonus;
                }
                damage *= desperation;
            }
            damage *= match support {
                Support::Anomaly => ctx.tuning.synergy_protection,
                Support::Maxed => MAXED_SUPPORT_PROTECTION,
                Support::Vulnerable | Support::None => 1.0,
            };
            o.health = (o.health - damage).max(0.0);
        }

        if o.health <= 0.0 {
            let pull_phase = o.frame >= PULL_PHASE_AGE;
            ctx.events.push(SimEvent::OutbreakDied { pos: o.pos, pull_phase });
            grant_death_buffs(&mut ctx.buffs, &ctx.tuning, now, pull_phase);
            dead.push(id);
            continue;
        }

        o.threatened = cursor_dist < o.radius * 1.5;

        if support != Support::Vulnerable
            && !o.threatened
            && o.health < o.max_health
            && o.frame % REGEN_CADENCE == 0
        {
            let mut heal = ctx.tuning.outbreak_regen_rate;
            heal *= match support {
                Support::Anomaly => ctx.tuning.synergy_regen_boost,
                Support::Maxed => 1.3,
                Support::Vulnerable | Support::None => 1.0,
            };
            if o.regen_boosted(now) {
                heal *= REGEN_BOOST_MULTIPLIER;
            }
            o.health = (o.health + heal).min(o.max_health);
        }

        // Disruption
        if is_primary && intensity > VULNERABLE_INTENSITY {
            let (to_cursor, dist) = direction_and_distance(o.pos, cursor);
            if dist > PULL_DEAD_ZONE {
                o.vel += to_cursor * 0.35 * (0.5 + dominance) * intensity;
            }
            if o.frame % WEAKEN_CADENCE == 0 {
                o.health = (o.health - o.max_health * 0.02 * intensity).max(0.0);
            }
        } else if is_secondary && intensity > VULNERABLE_INTENSITY {
            if let Some(target) = primary_pos {
                let (to_primary, dist) = direction_and_distance(o.pos, target);
                if dist > PULL_DEAD_ZONE {
                    o.vel += to_primary * 0.6 * (0.5 + dominance) * intensity;
                }
                if dist < COLLISION_RANGE && o.frame % COLLISION_CADENCE == 0 && primary_id.is_some() {
                    let hit = 6.0 * intensity;
                    o.health = (o.health - hit).max(0.0);
                    primary_hits += hit;
                }
            }
            if o.frame % WEAKEN_CADENCE == 0 {
                o.health = (o.health - o.max_health * 0.012 * intensity).max(0.0);
            }
        } else if intensity > 0.0 {
            let (away, dist) = direction_and_distance(wave_center, o.pos);
            let push = 2.5 * intensity * (1.0 - dist / wave_reach).max(0.0);
            let side = if o.pos.x >= wave_center.x { 1.0 } else { -1.0 };
            let spin = if ctx.rng.random_bool(0.5) { side } else { -side };
            o.vel += away * push + away.perp() * push * 0.4 * spin;
        }

        if o.health <= 0.0 {
            let pull_phase = o.frame >= PULL_PHASE_AGE;
            ctx.events.push(SimEvent::OutbreakDied { pos: o.pos, pull_phase });
            grant_death_buffs(&mut ctx.buffs, &ctx.tuning, now, pull_phase);
            dead.push(id);
            continue;
        }

        // Gentle mutual attraction
        let attraction_scale = if disruption_active { 0.3 } else { 1.0 };
        for &(other, other_pos, other_radius, _) in &others {
            if other == id {
                continue;
            }
            let (toward, dist) = direction_and_distance(o.pos, other_pos);
            if (ATTRACTION_MIN..=ATTRACTION_MAX).contains(&dist) {
                let falloff = 1.0 - (dist - ATTRACTION_MIN) / (ATTRACTION_MAX - ATTRACTION_MIN);
                o.vel += toward * 0.0008 * (o.radius + other_radius) * falloff * attraction_scale;
            }
        }

        o.vel *= VELOCITY_DAMPING;
        o.pos = (o.pos + o.vel).clamp(Vec2::ZERO, bounds);

        let growth = GrowthParams {
            base_rate: ctx.tuning.outbreak_growth_rate.get(ctx.screen.profile),
            max_radius,
            progress,
            synergy_boost: ctx.tuning.synergy_growth_boost,
        };
        grow(o, support, &growth);
    }

    if primary_hits > 0.0 {
        if let Some(id) = primary_id.filter(|id| !dead.contains(id)) {
            if let Some(o) = ctx.outbreaks.get_mut(id) {
                o.health = (o.health - primary_hits).max(0.0);
                if o.health <= 0.0 {
                    let pull_phase = o.frame >= PULL_PHASE_AGE;
                    ctx.events.push(SimEvent::OutbreakDied { pos: o.pos, pull_phase });
                    grant_death_buffs(&mut ctx.buffs, &ctx.tuning, now, pull_phase);
                    dead.push(id);
                }
            }
        }
    }

    if !dead.is_empty() {
        let removed = ctx.outbreaks.remove_many(&dead);
        log::debug!("{} outbreak(s) removed, {} remaining", removed, ctx.outbreaks.len());
    }
}

struct GrowthParams {
    base_rate: f32,
    max_radius: f32,
    progress: f32,
    synergy_boost: f32,
}

/// Organic radius growth
fn grow(o: &mut Outbreak, support: Support, params: &GrowthParams) {
    let max_radius = params.max_radius;
    let f = o.frame as f32;
    let phase = o.morph_phase;
    let morph = 0.3 * (f * 0.05 + phase).sin()
        + 0.15 * (f * 0.13 + phase * 2.0).cos()
        + 0.08 * (f * 0.021 + phase * 0.5).sin();
    let slowdown = if o.ever_touched {
        (1.0 - o.radius / max_radius).max(0.25)
    } else {
        1.0
    };
    let health_factor = 0.5 + 0.5 * o.health_ratio();
    let speed_boost = 1.0 + 0.4 * params.progress;
    let synergy = if support.is_supported() {
        params.synergy_boost
    } else {
        1.0
    };

    o.radius += params.base_rate * (1.0 + morph) * slowdown * health_factor * speed_boost * synergy;

    if o.ever_touched {
        o.radius = o.radius.min(max_radius);
        if o.health < LOW_HEALTH && o.frame % 3 == 0 {
            o.radius = (o.radius - 0.2).max(4.0);
        }
    }
    if o.radius >= max_radius {
        o.maxed = true;
    }
}
