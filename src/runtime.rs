//! Scheduler-facing engine
//!
//! Wraps one [`SimContext`] and translates host callbacks into ticks. The
//! host calls [`Engine::on_animation_frame`] once per display refresh; every
//! call is a physics tick and every second call also yields a [`Frame`].
//! Pointer idle timeouts and resize debouncing are one-shot deadlines polled
//! at the start of each callback.

use glam::Vec2;

use crate::error::SimError;
use crate::sim::schedule::OneShot;
use crate::sim::state::{AnomalyId, OutbreakId, SimContext, SimEvent};
use crate::sim::{anomaly, cursor, disruption, glyph, outbreak, tick, Frame};
use crate::tuning::Tuning;

/// Quiet period after the last resize before the field is rebuilt
pub const RESIZE_DEBOUNCE_MS: f64 = 200.0;

/// Offset from the cursor at which debug entities appear
const DEBUG_SPAWN_OFFSET: Vec2 = Vec2::new(120.0, 0.0);

pub struct Engine {
    ctx: SimContext,
    seed: u64,
    running: bool,
    callbacks: u64,
    /// Hands the cursor back to the path generator once pointer input stops
    idle_timeout: OneShot,
    resize_task: OneShot,
    pending_size: Option<(f32, f32)>,
    /// Events drained during the last callback
    events: Vec<SimEvent>,
}

impl Engine {
    pub fn new(tuning: Tuning, width: f32, height: f32, seed: u64, now: f64) -> Result<Self, SimError> {
        let ctx = SimContext::new(tuning, width, height, seed, now)?;
        log::info!(
            "Engine started: {}x{} ({:?}), {} particles, seed {}",
            width,
            height,
            ctx.screen.profile,
            ctx.particles.len(),
            seed
        );
        Ok(Self {
            ctx,
            seed,
            running: true,
            callbacks: 0,
            idle_timeout: OneShot::default(),
            resize_task: OneShot::default(),
            pending_size: None,
            events: Vec::new(),
        })
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Events produced by the most recent callback
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Run one scheduling callback. Returns a frame to draw on every second call.
    pub fn on_animation_frame(&mut self, now: f64) -> Option<Frame> {
        if !self.running {
            return None;
        }

        if self.resize_task.poll(now) {
            if let Some((width, height)) = self.pending_size.take() {
                self.reinitialize(width, height, now);
            }
        }
        if self.idle_timeout.poll(now) {
            cursor::release_to_automatic(&mut self.ctx.cursor, now);
            log::debug!("Pointer idle, cursor back on autopilot");
        }

        tick(&mut self.ctx, now);
        self.events = self.ctx.drain_events();
        for event in &self.events {
            log::trace!("{:?}", event);
        }

        self.callbacks += 1;
        (self.callbacks % 2 == 0).then(|| Frame::capture(&self.ctx))
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, now: f64) {
        let timeout = self.ctx.tuning.manual_timeout_ms;
        self.take_pointer(x, y, now, timeout);
    }

    pub fn touch_start(&mut self, x: f32, y: f32, now: f64) {
        let timeout = self.ctx.tuning.touch_timeout_ms;
        self.take_pointer(x, y, now, timeout);
    }

    pub fn touch_move(&mut self, x: f32, y: f32, now: f64) {
        let timeout = self.ctx.tuning.touch_timeout_ms;
        self.take_pointer(x, y, now, timeout);
    }

    /// The finger lifted: the cursor stays put until the touch timeout runs out
    pub fn touch_end(&mut self, now: f64) {
        if self.ctx.cursor.is_manual() {
            self.idle_timeout.schedule(now, self.ctx.tuning.touch_timeout_ms);
        }
    }

    fn take_pointer(&mut self, x: f32, y: f32, now: f64, timeout_ms: f64) {
        if !(x.is_finite() && y.is_finite()) {
            log::warn!("Ignoring non-finite pointer position ({}, {})", x, y);
            return;
        }
        cursor::enter_manual(&mut self.ctx.cursor, Vec2::new(x, y));
        self.idle_timeout.schedule(now, timeout_ms);
    }

    /// Queue a rebuild for the new viewport; bursts of resizes collapse into one
    pub fn resize(&mut self, width: f32, height: f32, now: f64) {
        self.pending_size = Some((width, height));
        self.resize_task.schedule(now, RESIZE_DEBOUNCE_MS);
    }

    fn reinitialize(&mut self, width: f32, height: f32, now: f64) {
        let tuning = self.ctx.tuning.clone();
        match SimContext::new(tuning, width, height, self.seed, now) {
            Ok(ctx) => {
                self.ctx = ctx;
                self.idle_timeout.clear();
                log::info!(
                    "Reinitialised for {}x{} ({:?}), {} particles",
                    width,
                    height,
                    self.ctx.screen.profile,
                    self.ctx.particles.len()
                );
            }
            Err(e) => log::warn!("Keeping current field, resize rejected: {}", e),
        }
    }

    fn debug_spawn_position(&self) -> Vec2 {
        let bounds = Vec2::new(self.ctx.screen.width, self.ctx.screen.height);
        (self.ctx.cursor.pos + DEBUG_SPAWN_OFFSET).clamp(Vec2::ZERO, bounds)
    }

    pub fn debug_spawn_outbreak(&mut self) -> OutbreakId {
        let pos = self.debug_spawn_position();
        outbreak::spawn_outbreak_at(&mut self.ctx, pos)
    }

    pub fn debug_spawn_anomaly(&mut self) -> AnomalyId {
        let pos = self.debug_spawn_position();
        anomaly::spawn_anomaly_at(&mut self.ctx, pos)
    }

    /// Returns false when a glyph already exists
    pub fn debug_spawn_glyph(&mut self) -> bool {
        if self.ctx.glyph.is_some() {
            log::warn!("Glyph already present, debug spawn skipped");
            return false;
        }
        let pos = self.debug_spawn_position();
        glyph::spawn_glyph_at(&mut self.ctx, pos);
        true
    }

    /// Tear down: pending deferred work is cancelled and further callbacks are ignored
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        disruption::cancel(&mut self.ctx);
        self.idle_timeout.clear();
        self.resize_task.clear();
        self.pending_size = None;
        log::info!("Engine stopped after {} ticks", self.ctx.tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TICK_MS;
    use crate::tuning::ScreenProfile;

    fn engine() -> Engine {
        Engine::new(Tuning::default(), 1024.0, 768.0, 21, 0.0).unwrap()
    }

    #[test]
    fn test_frames_on_alternate_callbacks() {
        let mut engine = engine();
        assert!(engine.on_animation_frame(TICK_MS).is_none());
        assert!(engine.on_animation_frame(2.0 * TICK_MS).is_some());
        assert!(engine.on_animation_frame(3.0 * TICK_MS).is_none());
        assert_eq!(engine.context().tick, 3);
    }

    #[test]
    fn test_pointer_idle_timeout() {
        let mut engine = engine();
        engine.pointer_move(100.0, 100.0, 0.0);
        engine.on_animation_frame(16.0);
        assert!(engine.context().cursor.is_manual());

        engine.on_animation_frame(2_999.0);
        assert!(engine.context().cursor.is_manual());
        engine.on_animation_frame(3_000.0);
        assert!(!engine.context().cursor.is_manual());
    }

    #[test]
    fn test_touch_uses_shorter_timeout() {
        let mut engine = engine();
        engine.touch_start(100.0, 100.0, 0.0);
        engine.touch_end(500.0);
        engine.on_animation_frame(1_999.0);
        assert!(engine.context().cursor.is_manual());
        engine.on_animation_frame(2_000.0);
        assert!(!engine.context().cursor.is_manual());
    }

    #[test]
    fn test_non_finite_pointer_ignored() {
        let mut engine = engine();
        engine.pointer_move(f32::NAN, 10.0, 0.0);
        assert!(!engine.context().cursor.is_manual());
    }

    #[test]
    fn test_resize_is_debounced() {
        let mut engine = engine();
        engine.resize(800.0, 600.0, 0.0);
        engine.resize(500.0, 900.0, 100.0);
        engine.on_animation_frame(250.0);
        assert_eq!(engine.context().screen.width, 1024.0);

        engine.on_animation_frame(300.0);
        let screen = engine.context().screen;
        assert_eq!((screen.width, screen.height), (500.0, 900.0));
        assert_eq!(screen.profile, ScreenProfile::Mobile);
        assert_eq!(engine.context().tick, 1);
    }

    #[test]
    fn test_rejected_resize_keeps_field() {
        let mut engine = engine();
        engine.resize(0.0, 0.0, 0.0);
        engine.on_animation_frame(200.0);
        assert_eq!(engine.context().screen.width, 1024.0);
    }

    #[test]
    fn test_debug_spawns() {
        let mut engine = engine();
        let id = engine.debug_spawn_outbreak();
        engine.debug_spawn_anomaly();
        assert!(engine.debug_spawn_glyph());
        assert!(!engine.debug_spawn_glyph());

        assert!(engine.context().outbreaks.contains(id));
        assert_eq!(engine.context().anomalies.len(), 1);
    }

    #[test]
    fn test_stop_ignores_callbacks() {
        let mut engine = engine();
        engine.on_animation_frame(16.0);
        engine.stop();
        assert!(!engine.is_running());
        assert!(engine.on_animation_frame(32.0).is_none());
        assert_eq!(engine.context().tick, 1);
    }
}
