//! The runtime that drives the application in real time.

use crate::components::weather::{OpenWeatherClient, StaticLocation, WeatherFetcher};
use crate::config::TiltclockConfig;
use crate::dispatcher::App;
use crate::events::{AppEvent, Effect, SystemEvent};
use crate::orientation::ViewportSignal;
use crate::storage::{FileStore, KeyValueStore};
use crate::time::{SystemWallClock, WallClock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// The main Tiltclock engine.
///
/// This struct is the central point of control. It holds the configuration,
/// the shared `App`, and the weather fetcher, and it drives the scheduler
/// from a real-time ticker. The `Engine` is designed to be cloned and shared
/// across tasks, providing a handle to the running instance.
#[derive(Clone)]
pub struct TiltclockEngine {
    config: Arc<TiltclockConfig>,
    app: Arc<Mutex<App>>,
    fetcher: WeatherFetcher,
    system_event_sender: broadcast::Sender<SystemEvent>,
    event_sender: broadcast::Sender<AppEvent>,
    effect_sender: broadcast::Sender<Effect>,
}

// Core implementation block for internal logic.
impl TiltclockEngine {
    /// Creates an engine with the host adapters named by `config`: system
    /// clock, file-backed alarm storage, fixed location and the HTTP weather
    /// client.
    pub fn new(config: TiltclockConfig) -> Self {
        let wall_clock = Arc::new(SystemWallClock::new(config.timezone));
        let store = Arc::new(FileStore::new(config.alarm.storage_dir.clone()));
        let fetcher = WeatherFetcher::new(
            Arc::new(StaticLocation::from_config(&config.weather)),
            Arc::new(OpenWeatherClient::new(&config.weather)),
            config.weather.location_timeout(),
        );
        Self::with_parts(config, wall_clock, store, fetcher)
    }

    /// Creates an engine from explicit adapters and starts the application.
    ///
    /// Must be called from within a Tokio runtime: an initial landscape-left
    /// viewport spawns a weather fetch right away.
    pub fn with_parts(
        config: TiltclockConfig,
        wall_clock: Arc<dyn WallClock>,
        store: Arc<dyn KeyValueStore>,
        fetcher: WeatherFetcher,
    ) -> Self {
        let (system_event_sender, _) = broadcast::channel(64);
        let mut app = App::new(&config, wall_clock, store);
        let event_sender = app.event_sender().clone();
        let effect_sender = app.effect_sender().clone();

        let initial = ViewportSignal::new(
            config.orientation.initial_width,
            config.orientation.initial_height,
            config.orientation.initial_angle,
        );
        app.start(initial);
        let pending = app.take_weather_requests();

        let engine = Self {
            config: Arc::new(config),
            app: Arc::new(Mutex::new(app)),
            fetcher,
            system_event_sender,
            event_sender,
            effect_sender,
        };
        for request in pending {
            engine.spawn_fetch(request);
        }
        engine
    }

    /// Runs the engine until Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
    }

    /// Runs the engine's main loop until `shutdown` resolves.
    ///
    /// This method will:
    /// 1. Spawn the ticker task that advances the scheduler in real time.
    /// 2. Wait for `shutdown`.
    /// 3. Broadcast the shutdown to the ticker and report `EngineShutdown`.
    pub async fn run_until<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("TiltclockEngine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);

        let ticker = self.clone();
        let ticker_shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move { ticker.ticker_loop(ticker_shutdown_rx).await });

        info!(
            "Engine running at {:?} resolution.",
            self.config.resolution()
        );
        shutdown.await;

        info!("Shutdown signal received. Broadcasting to all tasks...");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal. The ticker may not terminate gracefully.");
        }
        handle.await?;
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("TiltclockEngine has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    async fn ticker_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.config.resolution());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        self.system_event_sender
            .send(SystemEvent::EngineStarted { timestamp: last })
            .ok();
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                now = interval.tick() => {
                    let elapsed = now.saturating_duration_since(last);
                    last = now;
                    self.advance(elapsed).await;
                }
            }
        }
    }

    /// Advances the application clock and launches any queued fetches.
    async fn advance(&self, elapsed: Duration) {
        let requests = {
            let mut app = self.app.lock().await;
            app.advance(elapsed);
            app.take_weather_requests()
        };
        for request in requests {
            self.spawn_fetch(request);
        }
    }

    /// Each request gets its own task; an in-flight fetch is never cancelled,
    /// so overlapping refreshes may finish out of order.
    fn spawn_fetch(&self, request: u64) {
        let fetcher = self.fetcher.clone();
        let app = self.app.clone();
        debug!(request, "spawning weather fetch");
        self.system_event_sender
            .send(SystemEvent::FetchSpawned { request })
            .ok();
        tokio::spawn(async move {
            let result = fetcher.fetch().await;
            app.lock().await.apply_weather(request, result);
        });
    }
}

// Public API implementation block.
impl TiltclockEngine {
    /// Reads application state.
    pub async fn view<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        let app = self.app.lock().await;
        f(&app)
    }

    /// Mutates application state, then launches any weather refresh the
    /// mutation queued.
    pub async fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let (result, requests) = {
            let mut app = self.app.lock().await;
            let result = f(&mut app);
            (result, app.take_weather_requests())
        };
        for request in requests {
            self.spawn_fetch(request);
        }
        result
    }

    /// Reports a rotation; it is classified after the settle delay.
    pub async fn report_viewport(&self, signal: ViewportSignal) {
        self.update(|app| app.report_viewport(signal)).await;
    }

    /// The manual refresh button.
    pub async fn refresh_weather(&self) -> u64 {
        self.update(|app| app.request_weather_refresh()).await
    }

    pub fn config(&self) -> &TiltclockConfig {
        &self.config
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `AppEvent` stream.
    pub fn subscribe_app_events(&self) -> broadcast::Receiver<AppEvent> {
        self.event_sender.subscribe()
    }

    /// Subscribes to the `Effect` stream.
    pub fn subscribe_effects(&self) -> broadcast::Receiver<Effect> {
        self.effect_sender.subscribe()
    }
}
