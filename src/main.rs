//! Attrition entry point
//!
//! The browser build is driven through `platform::WebEngine`. Natively this
//! runs the simulation headless and logs how the run unfolds.
//!
//! Usage: `attrition [seconds] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use attrition::consts::TICK_MS;
    use attrition::sim::SimEvent;
    use attrition::{Engine, Tuning};

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seconds: f64 = match args.next() {
        Some(arg) => arg.parse()?,
        None => 60.0,
    };
    let tuning = match args.next() {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(&path)?)?,
        None => Tuning::default(),
    };

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(1);
    let mut engine = Engine::new(tuning, 1280.0, 720.0, seed, 0.0)?;
    log::info!("Attrition (native, headless) running {}s", seconds);

    let ticks = (seconds * 1000.0 / TICK_MS).ceil() as u64;
    let report_every = (10_000.0 / TICK_MS) as u64;
    let (mut kills, mut captures, mut disruptions) = (0, 0, 0);
    for i in 1..=ticks {
        engine.on_animation_frame(i as f64 * TICK_MS);
        for event in engine.events() {
            match event {
                SimEvent::OutbreakDied { .. } | SimEvent::AnomalyDied { .. } => kills += 1,
                SimEvent::GlyphCaptured { .. } => captures += 1,
                SimEvent::DisruptionActivated { .. } => disruptions += 1,
                _ => {}
            }
        }

        if i % report_every == 0 {
            let ctx = engine.context();
            log::info!(
                "t={:.0}s ratio={:.2} outbreaks={} anomalies={} glyph={}",
                ctx.elapsed() / 1000.0,
                ctx.active_particle_ratio,
                ctx.outbreaks.len(),
                ctx.anomalies.len(),
                ctx.glyph.is_some()
            );
        }
    }
    engine.stop();

    let ctx = engine.context();
    println!(
        "{:.0}s simulated: final ratio {:.2}, {} kills, {} glyph captures, {} disruptions",
        ctx.elapsed() / 1000.0,
        ctx.active_particle_ratio,
        kills,
        captures,
        disruptions
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::WebEngine, this is just to satisfy the compiler
}
