use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tiltclock::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load the configuration (first argument, or ./tiltclock.toml if present).
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = TiltclockConfig::load(path.as_deref())?;

    // 3. Create the TiltclockEngine instance.
    let engine = TiltclockEngine::new(config);

    // 4. Spawn concurrent tasks to listen to different event streams.
    spawn_event_listeners(&engine);

    // 5. Walk the device through every orientation.
    spawn_rotation_demo(&engine);

    // 6. Run the engine until Ctrl+C.
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &TiltclockEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut app_rx = engine.subscribe_app_events();
    tokio::spawn(async move {
        while let Ok(event) = app_rx.recv().await {
            match event {
                AppEvent::ClockTick { .. } | AppEvent::TimerTick { .. } => {}
                other => info!("[APP] => {:?}", other),
            }
        }
    });

    let mut effect_rx = engine.subscribe_effects();
    tokio::spawn(async move {
        while let Ok(effect) = effect_rx.recv().await {
            info!("[EFFECT] => {:?}", effect);
        }
    });
}

const LANDSCAPE_RIGHT: ViewportSignal = ViewportSignal {
    width: 844,
    height: 390,
    angle: Some(90),
};
const UPSIDE_DOWN: ViewportSignal = ViewportSignal {
    width: 390,
    height: 700,
    angle: Some(180),
};
const LANDSCAPE_LEFT: ViewportSignal = ViewportSignal {
    width: 700,
    height: 390,
    angle: Some(-90),
};
const UPRIGHT: ViewportSignal = ViewportSignal {
    width: 390,
    height: 844,
    angle: Some(0),
};

/// Rotates through the four orientations, exercising each panel briefly.
fn spawn_rotation_demo(engine: &TiltclockEngine) {
    let engine = engine.clone();
    tokio::spawn(async move {
        let pause = Duration::from_secs(3);

        info!("[DEMO] landscape-right: stopwatch");
        engine.report_viewport(LANDSCAPE_RIGHT).await;
        engine.update(|app| app.stopwatch_start()).await;
        tokio::time::sleep(pause).await;
        engine.update(|app| app.stopwatch_lap()).await;
        engine.update(|app| app.stopwatch_pause()).await;
        let shown = engine.view(|app| app.stopwatch().display()).await;
        info!("[DEMO] stopwatch shows {}", shown);

        info!("[DEMO] portrait-upside-down: timer");
        engine.report_viewport(UPSIDE_DOWN).await;
        engine.update(|app| app.timer_preset(5)).await;
        if let Err(e) = engine.update(|app| app.timer_start()).await {
            info!("[DEMO] timer refused to start: {}", e);
        }
        tokio::time::sleep(pause * 3).await;

        info!("[DEMO] landscape-left: weather");
        engine.report_viewport(LANDSCAPE_LEFT).await;
        tokio::time::sleep(pause).await;

        info!("[DEMO] portrait-upright: alarm clock");
        engine.report_viewport(UPRIGHT).await;
        let clock = engine.view(|app| app.clock().clone()).await;
        info!("[DEMO] {} | {}", clock.time, clock.date);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiltclock::orientation::classify;

    #[test]
    fn demo_steps_reach_every_panel() {
        let threshold = TiltclockConfig::default().orientation.landscape_threshold;
        let reached: Vec<_> = [LANDSCAPE_RIGHT, UPSIDE_DOWN, LANDSCAPE_LEFT, UPRIGHT]
            .into_iter()
            .map(|signal| classify(signal, threshold).feature())
            .collect();
        assert_eq!(
            reached,
            vec![Feature::Stopwatch, Feature::Timer, Feature::Weather, Feature::Alarm]
        );
    }
}
