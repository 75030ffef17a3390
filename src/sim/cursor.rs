//! Cursor controller
//!
//! The cursor either follows an autonomous Lissajous-style path or springs
//! toward the pointer. Both modes feel the gravity of pull-phase outbreaks.

use glam::Vec2;

use super::state::{ControlMode, Cursor, SimContext};
use crate::consts::TICK_MS;
use crate::{direction_and_distance, lerp};

/// Pull-phase ticks before an outbreak's gravity reaches full strength
pub const PULL_RAMP_TICKS: f32 = 180.0;
/// Peak displacement per tick from one gravity well
pub const GRAVITY_STRENGTH: f32 = 0.6;
/// Maximum gravity attenuation from standing near an anomaly
pub const ANOMALY_SHIELD_MAX: f32 = 0.7;
/// Gravity attenuation granted by the shield buff
pub const BUFF_SHIELD: f32 = 0.5;
/// Share of the autopilot's gravity drift kept from one tick to the next
pub const GRAVITY_DRIFT_RETENTION: f32 = 0.97;

/// Early-game window (fraction of growth duration) where the path leans toward outbreaks
const EARLY_ATTRACTION_PROGRESS: f32 = 0.2;
const ATTRACTION_RANGE: f32 = 300.0;
const RADIUS_EASE: f32 = 0.05;

/// Switch to pointer control
pub fn enter_manual(cursor: &mut Cursor, pointer: Vec2) {
    cursor.mode = ControlMode::Manual;
    cursor.pointer = pointer;
    cursor.blend_started_at = None;
}

/// Hand control back to the path generator, blending in from the current position
pub fn release_to_automatic(cursor: &mut Cursor, now: f64) {
    if cursor.mode == ControlMode::Automatic {
        return;
    }
    cursor.mode = ControlMode::Automatic;
    cursor.auto_blend = 0.0;
    cursor.blend_started_at = Some(now);
    cursor.vel = Vec2::ZERO;
    cursor.gravity_drift = Vec2::ZERO;
}

pub fn update(ctx: &mut SimContext) {
    let now = ctx.now;

    if let Some(started) = ctx.cursor.blend_started_at {
        let t = ((now - started) / ctx.tuning.auto_blend_ms).clamp(0.0, 1.0) as f32;
        ctx.cursor.auto_blend = t * t * (3.0 - 2.0 * t);
        if t >= 1.0 {
            ctx.cursor.blend_started_at = None;
        }
    }

    // The path keeps running in manual mode so the hand-back is seamless
    let speed = path_speed(ctx) as f64;
    ctx.cursor.path_time += speed * TICK_MS;
    let target = steer_path_target(ctx, path_point(ctx, ctx.cursor.path_time));
    ctx.cursor.path_target = target;

    let gravity = gravity_pull(ctx);
    let tuning = &ctx.tuning;
    let cursor = &mut ctx.cursor;
    match cursor.mode {
        ControlMode::Manual => {
            cursor.vel += (cursor.pointer - cursor.pos) * tuning.spring;
            cursor.vel += gravity;
            cursor.vel *= tuning.damping;
            cursor.pos += cursor.vel;
        }
        ControlMode::Automatic => {
            // Gravity builds up a damped offset so wells bend the path instead of nudging it
            cursor.gravity_drift = (cursor.gravity_drift + gravity) * GRAVITY_DRIFT_RETENTION;
            let follow = lerp(0.04, 1.0, cursor.auto_blend * cursor.auto_blend);
            let prev = cursor.pos;
            cursor.pos += (target + cursor.gravity_drift - cursor.pos) * follow;
            cursor.vel = cursor.pos - prev;
        }
    }
    cursor.pos = cursor.pos.clamp(Vec2::ZERO, Vec2::new(ctx.screen.width, ctx.screen.height));

    let target_multiplier = radius_multiplier_target(ctx);
    ctx.cursor.radius_multiplier += (target_multiplier - ctx.cursor.radius_multiplier) * RADIUS_EASE;
}

/// Path parameter advance per millisecond
fn path_speed(ctx: &SimContext) -> f32 {
    let tuning = &ctx.tuning;
    let secs = (ctx.elapsed() / 1000.0) as f32;
    let swing = 0.5 + 0.5 * (secs * 0.21).sin();

    let mut speed = if ctx.screen.is_mobile() {
        // Small screens spend longer at the slow end
        lerp(tuning.path_speed_min, tuning.path_speed_max, swing * swing) * 0.85
    } else {
        lerp(tuning.path_speed_min, tuning.path_speed_max, swing)
    };

    speed *= 0.7 + 0.3 * (0.5 + 0.5 * (secs * 0.13).sin());
    if (secs * 0.05).sin() > 0.85 {
        speed *= 0.35;
    }
    speed *= 0.8 + 0.4 * ctx.active_particle_ratio;
    speed *= 1.0 + 0.25 * ctx.progress();
    speed *= 1.0 - 0.5 * ctx.disruption.intensity;
    if ctx.buffs.black_hole_kill.is_active(ctx.now) {
        speed *= 1.6;
    }
    speed
}

/// Point on the autonomous path for parameter `t`
fn path_point(ctx: &SimContext, t: f64) -> Vec2 {
    let t = t as f32;
    let screen = &ctx.screen;
    let base = screen.min_dim() * if screen.is_mobile() { 0.3 } else { 0.34 };
    let pulse = 1.0
        + 0.15 * (t * 0.7).sin()
        + 0.08 * (t * 1.9 + 1.3).sin()
        + 0.05 * (t * 3.1 + 0.4).sin();
    let radius = base * pulse;
    let aspect = (screen.width / screen.height).clamp(1.0, 1.8);

    let wobble = Vec2::new(
        (t * 5.3).sin() * 6.0 + (t * 7.1).cos() * 3.0,
        (t * 4.7).cos() * 6.0 + (t * 8.3).sin() * 3.0,
    );
    screen.center
        + Vec2::new(
            t.sin() * (t * 0.31).cos() * radius * aspect,
            (t * 1.37 + 0.5).sin() * radius,
        )
        + wobble
}

/// Lean the path toward large outbreaks early on, and toward the disruption
/// target while the ability is in flight.
fn steer_path_target(ctx: &SimContext, mut target: Vec2) -> Vec2 {
    if ctx.progress() < EARLY_ATTRACTION_PROGRESS {
        let nearest = ctx
            .outbreaks
            .values()
            .filter(|o| o.radius > 40.0)
            .map(|o| (o.pos, o.pos.distance(target)))
            .filter(|(_, d)| *d < ATTRACTION_RANGE)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((pos, dist)) = nearest {
            target += (pos - target) * 0.1 * (1.0 - dist / ATTRACTION_RANGE);
        }
    }

    if ctx.disruption.active {
        let primary = ctx.disruption.primary.and_then(|t| ctx.target_position(t));
        if let Some(pos) = primary {
            target += (pos - target) * 0.3 * ctx.disruption.intensity;
        }
    }
    target
}

/// Fraction of gravity blocked, from nearby anomalies or the shield buff
pub fn shield_factor(ctx: &SimContext) -> f32 {
    let cursor = ctx.cursor.pos;
    let anomaly_shield = ctx
        .anomalies
        .values()
        .map(|a| {
            let reach = (a.vortex_radius * 1.5).max(1.0);
            ANOMALY_SHIELD_MAX * (1.0 - a.pos.distance(cursor) / reach).clamp(0.0, 1.0)
        })
        .fold(0.0_f32, f32::max);
    let buff_shield = if ctx.buffs.shield.is_active(ctx.now) {
        BUFF_SHIELD
    } else {
        0.0
    };
    anomaly_shield.max(buff_shield)
}

/// Combined per-tick displacement from every gravity well
pub fn gravity_pull(ctx: &SimContext) -> Vec2 {
    let cursor = ctx.cursor.pos;
    let mut force = Vec2::ZERO;
    for o in ctx.outbreaks.values().filter(|o| o.in_pull_phase()) {
        let reach = o.gravity_radius();
        let (toward, dist) = direction_and_distance(cursor, o.pos);
        if dist >= reach {
            continue;
        }
        let ramp = (o.pull_age() as f32 / PULL_RAMP_TICKS).min(1.0);
        force += toward * GRAVITY_STRENGTH * ramp * o.gravity_growth() * (1.0 - dist / reach);
    }
    force * (1.0 - shield_factor(ctx))
}

fn radius_multiplier_target(ctx: &SimContext) -> f32 {
    let t = ctx.elapsed() as f32;
    let pulse = 1.0 + 0.04 * (t * 0.004).sin() + 0.02 * (t * 0.011).sin();
    (0.6 + 0.8 * ctx.active_particle_ratio) * (1.0 + 0.35 * ctx.disruption.intensity) * pulse
}
