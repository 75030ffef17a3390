//! Property tests over whole simulation runs

use attrition::consts::TICK_MS;
use attrition::sim::{anomaly, cursor, disruption, outbreak, tick};
use attrition::sim::{AnomalyMotion, OutbreakId, SimContext};
use attrition::Tuning;
use glam::Vec2;
use proptest::prelude::*;

fn screen() -> impl Strategy<Value = (f32, f32)> {
    (240.0_f32..720.0, 200.0_f32..540.0)
}

fn point() -> impl Strategy<Value = (f32, f32)> {
    (0.0_f32..1.0, 0.0_f32..1.0)
}

/// A run with entities already in play so interactions start immediately
fn crowded(seed: u64, width: f32, height: f32, spots: &[(f32, f32)]) -> SimContext {
    let mut ctx = SimContext::new(Tuning::default(), width, height, seed, 0.0).unwrap();
    for (i, &(fx, fy)) in spots.iter().enumerate() {
        let pos = Vec2::new(fx * width, fy * height);
        if i % 3 == 2 {
            anomaly::spawn_anomaly_at(&mut ctx, pos);
        } else {
            outbreak::spawn_outbreak_at(&mut ctx, pos);
        }
    }
    ctx
}

fn advance(ctx: &mut SimContext) {
    let now = ctx.now + TICK_MS;
    tick(ctx, now);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ratios_stay_normalized(
        seed in any::<u64>(),
        (w, h) in screen(),
        spots in prop::collection::vec(point(), 0..6),
        pointer in prop::option::of(point()),
    ) {
        let mut ctx = crowded(seed, w, h, &spots);
        if let Some((fx, fy)) = pointer {
            cursor::enter_manual(&mut ctx.cursor, Vec2::new(fx * w, fy * h));
        }
        for _ in 0..240 {
            advance(&mut ctx);
            prop_assert!((0.0..=1.0).contains(&ctx.active_particle_ratio));
            prop_assert!((0.0..=1.0).contains(&ctx.disruption.intensity));
            prop_assert!((0.0..=1.0).contains(&ctx.growth_threshold));
        }
    }

    #[test]
    fn dead_entities_leave_same_tick(
        seed in any::<u64>(),
        spots in prop::collection::vec(point(), 1..6),
        pointer in point(),
    ) {
        let (w, h) = (480.0, 360.0);
        let mut ctx = crowded(seed, w, h, &spots);
        cursor::enter_manual(&mut ctx.cursor, Vec2::new(pointer.0 * w, pointer.1 * h));
        for _ in 0..240 {
            advance(&mut ctx);
            prop_assert!(ctx.outbreaks.values().all(|o| o.health > 0.0));
            prop_assert!(ctx.anomalies.values().all(|a| a.health > 0.0));
        }
    }

    #[test]
    fn outbreak_radius_rules(
        seed in any::<u64>(),
        spots in prop::collection::vec(point(), 1..5),
        pointer in point(),
    ) {
        let (w, h) = (480.0, 360.0);
        let mut ctx = crowded(seed, w, h, &spots);
        cursor::enter_manual(&mut ctx.cursor, Vec2::new(pointer.0 * w, pointer.1 * h));
        let max_radius = ctx.max_radius();

        for _ in 0..300 {
            let before: Vec<(OutbreakId, f32)> = ctx
                .outbreaks
                .iter()
                .map(|(id, o)| (id, o.radius))
                .collect();
            advance(&mut ctx);
            for (id, radius) in before {
                let Some(o) = ctx.outbreaks.get(id) else { continue };
                if o.ever_touched {
                    prop_assert!(o.radius <= max_radius + 1e-3);
                } else {
                    prop_assert!(o.radius >= radius);
                }
            }
        }
    }

    #[test]
    fn anomaly_timers_only_run_in_their_state(
        seed in any::<u64>(),
        spots in prop::collection::vec(point(), 1..4),
    ) {
        let (w, h) = (640.0, 480.0);
        let mut ctx = SimContext::new(Tuning::default(), w, h, seed, 0.0).unwrap();
        for &(fx, fy) in &spots {
            anomaly::spawn_anomaly_at(&mut ctx, Vec2::new(fx * w, fy * h));
        }

        for _ in 0..600 {
            let before: Vec<_> = ctx.anomalies.iter().map(|(id, a)| (id, a.motion)).collect();
            advance(&mut ctx);
            for (id, motion) in before {
                let Some(a) = ctx.anomalies.get(id) else { continue };
                match (motion, a.motion) {
                    (AnomalyMotion::Orbiting { timer_ms: t0 }, AnomalyMotion::Orbiting { timer_ms: t1 })
                    | (AnomalyMotion::Drifting { timer_ms: t0, .. }, AnomalyMotion::Drifting { timer_ms: t1, .. }) => {
                        prop_assert!((t0 - t1 - TICK_MS).abs() < 1e-6);
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn secondary_target_within_band(
        seed in any::<u64>(),
        spots in prop::collection::vec(point(), 2..10),
    ) {
        let (w, h) = (1200.0, 800.0);
        let mut ctx = SimContext::new(Tuning::default(), w, h, seed, 0.0).unwrap();
        for &(fx, fy) in &spots {
            outbreak::spawn_outbreak_at(&mut ctx, Vec2::new(fx * w, fy * h));
        }

        for primary in ctx.outbreaks.handles().to_vec() {
            if let Some(secondary) = disruption::select_secondary(&ctx, primary) {
                let a = ctx.outbreaks.get(primary).unwrap().pos;
                let b = ctx.outbreaks.get(secondary).unwrap().pos;
                let dist = a.distance(b);
                prop_assert!(secondary != primary);
                prop_assert!(dist > 80.0 && dist < 500.0, "secondary at {}", dist);
            }
        }
    }

    #[test]
    fn dissolve_ignores_health(
        offset in (-8.0_f32..8.0, -8.0_f32..8.0),
        health in 1.0_f32..1.0e6,
    ) {
        let mut ctx = SimContext::new(Tuning::default(), 640.0, 480.0, 3, 0.0).unwrap();
        let center = Vec2::new(320.0, 240.0);
        cursor::enter_manual(&mut ctx.cursor, center);
        ctx.cursor.pos = center;

        let pos = center + Vec2::new(offset.0, offset.1);
        let id = ctx.outbreaks.insert(attrition::sim::Outbreak::new(pos, 30.0, health, 0.0));
        let anomaly = anomaly::spawn_anomaly_at(&mut ctx, pos);

        advance(&mut ctx);
        prop_assert!(!ctx.outbreaks.contains(id));
        prop_assert!(!ctx.anomalies.contains(anomaly));
    }
}
