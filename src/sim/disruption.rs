//! Disruption special ability
//!
//! Arms itself once a gravity well threatens most of the screen, marks the
//! best target (plus an optional partner outbreak), ramps an intensity value
//! and shuts off again after a fixed duration.

use super::state::{OutbreakId, SimContext, SimEvent, Target};
use crate::tuning::Tuning;

/// Per-tick intensity gain while active
pub const INTENSITY_RAMP: f32 = 0.05;
/// Per-tick intensity loss while inactive
pub const INTENSITY_DECAY: f32 = 0.02;
/// Fraction of the screen diagonal a gravity well must span to arm the ability
pub const ARMING_COVERAGE: f32 = 0.7;
/// Minimum dominance (`1 - ratio`) before the ability arms
pub const MIN_ACTIVITY: f32 = 0.3;

const DISTANCE_PENALTY: f32 = 0.05;
const MAXED_SCORE_MULTIPLIER: f32 = 2.5;
const HEALTH_SCORE: f32 = 50.0;
const CLUSTER_RANGE: f32 = 200.0;
const CLUSTER_BONUS: f32 = 30.0;
const ANOMALY_BASE_SCORE: f32 = 80.0;

/// Exclusive distance band around the primary for secondary candidates
pub const SECONDARY_MIN_DISTANCE: f32 = 80.0;
pub const SECONDARY_MAX_DISTANCE: f32 = 500.0;
const SECONDARY_PEAK_DISTANCE: f32 = 250.0;
const SECONDARY_PEAK_WIDTH: f32 = 120.0;

/// Rearm delay for the given particle ratio: the base cooldown shrinks with
/// the square of dominance, floored at the minimum cooldown.
pub fn rearm_delay_ms(tuning: &Tuning, ratio: f32) -> f64 {
    let dominance = (1.0 - ratio.clamp(0.0, 1.0)) as f64;
    let reduced = tuning.disruption_cooldown_ms * (1.0 - 0.75 * dominance * dominance);
    reduced.max(tuning.disruption_min_cooldown_ms)
}

/// Expire, arm and ramp the ability for this tick
pub fn update(ctx: &mut SimContext) {
    let now = ctx.now;

    if ctx.disruption.active && ctx.disruption.expiry.poll(now) {
        deactivate(ctx);
    }

    // Dead targets are dropped; the ability keeps running without them
    if ctx.disruption.primary.is_some_and(|t| !ctx.is_alive(t)) {
        ctx.disruption.primary = None;
    }
    if ctx.disruption.secondary.is_some_and(|id| !ctx.outbreaks.contains(id)) {
        ctx.disruption.secondary = None;
    }

    if !ctx.disruption.active && is_armed(ctx) {
        activate(ctx);
    }

    let state = &mut ctx.disruption;
    state.intensity = if state.active {
        (state.intensity + INTENSITY_RAMP).min(1.0)
    } else {
        (state.intensity - INTENSITY_DECAY).max(0.0)
    };
}

/// A pull-phase outbreak whose well spans enough of the screen
pub fn has_qualifying_outbreak(ctx: &SimContext) -> bool {
    let needed = ARMING_COVERAGE * ctx.screen.diagonal;
    ctx.outbreaks
        .values()
        .any(|o| o.in_pull_phase() && o.gravity_radius() * 2.0 >= needed)
}

pub fn is_armed(ctx: &SimContext) -> bool {
    ctx.now >= ctx.disruption.next_ready_at
        && ctx.dominance() > MIN_ACTIVITY
        && has_qualifying_outbreak(ctx)
}

pub fn activate(ctx: &mut SimContext) {
    let now = ctx.now;
    let primary = select_primary(ctx);
    let secondary = primary
        .and_then(|t| t.as_outbreak())
        .and_then(|id| select_secondary(ctx, id));

    let duration = ctx.tuning.disruption_duration_ms;
    let state = &mut ctx.disruption;
    state.active = true;
    state.intensity = 0.0;
    state.center = ctx.cursor.pos;
    state.primary = primary;
    state.secondary = secondary;
    state.expiry_token = Some(state.expiry.schedule(now, duration));

    ctx.events.push(SimEvent::DisruptionActivated {
        primary,
        has_secondary: secondary.is_some(),
    });
    log::info!(
        "Disruption activated (primary {:?}, secondary {})",
        primary,
        secondary.is_some()
    );
}

/// End the ability and schedule the next rearm
pub fn deactivate(ctx: &mut SimContext) {
    let cooldown_ms = rearm_delay_ms(&ctx.tuning, ctx.active_particle_ratio);
    let state = &mut ctx.disruption;
    state.active = false;
    state.expiry.clear();
    state.expiry_token = None;
    state.primary = None;
    state.secondary = None;
    state.next_ready_at = ctx.now + cooldown_ms;
    state.last_cooldown_ms = cooldown_ms;

    ctx.events.push(SimEvent::DisruptionEnded { cooldown_ms });
    log::info!("Disruption ended, rearming in {:.0}ms", cooldown_ms);
}

/// Cancel a running ability before its expiry fires. Returns false if
/// nothing was pending.
pub fn cancel(ctx: &mut SimContext) -> bool {
    let Some(token) = ctx.disruption.expiry_token.take() else {
        return false;
    };
    if ctx.disruption.expiry.cancel(token) {
        deactivate(ctx);
        true
    } else {
        false
    }
}

/// Highest-scoring outbreak or anomaly
pub fn select_primary(ctx: &SimContext) -> Option<Target> {
    let cursor = ctx.cursor.pos;
    let outbreaks = ctx.outbreaks.iter().map(|(id, o)| {
        let mut size = o.radius * 2.0;
        if o.maxed {
            size *= MAXED_SCORE_MULTIPLIER;
        }
        let cluster = ctx
            .outbreaks
            .iter()
            .filter(|(other, p)| *other != id && p.pos.distance(o.pos) < CLUSTER_RANGE)
            .count() as f32;
        let score = size + o.health_ratio() * HEALTH_SCORE + cluster * CLUSTER_BONUS
            - o.pos.distance(cursor) * DISTANCE_PENALTY;
        (Target::Outbreak(id), score)
    });
    let anomalies = ctx.anomalies.iter().map(|(id, a)| {
        let score = ANOMALY_BASE_SCORE - a.pos.distance(cursor) * DISTANCE_PENALTY;
        (Target::Anomaly(id), score)
    });

    outbreaks
        .chain(anomalies)
        .fold(None, |best: Option<(Target, f32)>, (target, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((target, score)),
        })
        .map(|(target, _)| target)
}

/// Partner outbreak for an outbreak primary, favouring ones about 250 units away
pub fn select_secondary(ctx: &SimContext, primary: OutbreakId) -> Option<OutbreakId> {
    let anchor = ctx.outbreaks.get(primary)?.pos;
    ctx.outbreaks
        .iter()
        .filter(|(id, _)| *id != primary)
        .filter_map(|(id, o)| {
            let dist = o.pos.distance(anchor);
            if dist <= SECONDARY_MIN_DISTANCE || dist >= SECONDARY_MAX_DISTANCE {
                return None;
            }
            let mut size = o.radius * 1.5;
            if o.maxed {
                size *= 2.0;
            }
            let offset = (dist - SECONDARY_PEAK_DISTANCE) / SECONDARY_PEAK_WIDTH;
            let score = size + o.health_ratio() * 30.0 + 40.0 * (-offset * offset).exp();
            Some((id, score))
        })
        .fold(None, |best: Option<(OutbreakId, f32)>, (id, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((id, score)),
        })
        .map(|(id, _)| id)
}
