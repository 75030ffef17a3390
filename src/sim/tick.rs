//! Fixed timestep simulation tick
//!
//! One call advances every component by exactly one step, in a fixed order,
//! against a single timestamp.

use super::state::SimContext;
use super::{anomaly, cursor, disruption, glyph, outbreak, particles};

/// Advance the simulation by one tick at timestamp `now` (ms)
pub fn tick(ctx: &mut SimContext, now: f64) {
    // Timestamps never run backwards within a run
    ctx.now = now.max(ctx.now);
    ctx.tick += 1;

    disruption::update(ctx);
    cursor::update(ctx);
    particles::update_threshold(ctx);
    outbreak::update(ctx);
    anomaly::update(ctx);
    glyph::update(ctx);
    particles::update(ctx);
}
