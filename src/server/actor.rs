//! The lifecycle actor: one task owning the mutable server state.
//!
//! All public operations enqueue an event and return immediately. A single
//! tokio task drains the queue and applies transitions strictly in arrival
//! order, so the state record needs no locks and no caller can observe a
//! half-applied transition. Failures inside a transition are caught at the
//! loop boundary, reported once, and move the phase to [`Phase::Error`]
//! without stopping the loop.

use crate::content::assets::{self, AssetProvider, EmbeddedAssets};
use crate::content::strings::{EnglishStrings, LocalizedText, Localizer};
use crate::content::templates::{self, ServedContent};
use crate::error::{ErrorReporter, ServerError};
use crate::http::handler::FrameSource;
use crate::http::listener::{HyperListener, ListenerController};
use crate::server::state::{Phase, ServerEvent, ServerState};
use crate::settings::{BindAddress, StreamSettings};
use crate::stats::{LogStatistics, StatisticsSink};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Queue depth for control-plane events. Generous for the traffic pattern
/// (a handful of user-driven events), so a full queue means something is
/// seriously wrong, not that the caller should wait.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Handle to a running server instance.
///
/// Cheap to clone; all clones feed the same actor. Dropping every clone
/// without calling [`StreamServer::destroy`] also terminates the actor
/// once its queue drains.
#[derive(Clone)]
pub struct StreamServer {
    events: mpsc::Sender<ServerEvent>,
    phase: watch::Receiver<Phase>,
    reporter: Arc<dyn ErrorReporter>,
}

impl StreamServer {
    /// Spawn the actor with explicit collaborators.
    pub fn new(
        listener: Arc<dyn ListenerController>,
        asset_provider: Arc<dyn AssetProvider>,
        strings: Arc<dyn Localizer>,
        frames: Arc<dyn FrameSource>,
        statistics: Arc<dyn StatisticsSink>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let (events, queue) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (phase_tx, phase_rx) = watch::channel(Phase::Created);
        let error_sink = Arc::new(EventErrorSink {
            events: events.clone(),
            reporter: reporter.clone(),
        });

        let actor = Actor {
            state: ServerState::new(),
            listener,
            asset_provider,
            strings,
            frames,
            statistics,
            reporter: reporter.clone(),
            error_sink,
            phase: phase_tx,
        };
        tokio::spawn(actor.run(queue));

        let server = Self {
            events,
            phase: phase_rx,
            reporter,
        };
        server.submit(ServerEvent::Init);
        server
    }

    /// Spawn the actor with the built-in collaborators: hyper listener,
    /// embedded assets, English strings, log-only statistics.
    pub fn with_defaults(
        frames: Arc<dyn FrameSource>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self::new(
            Arc::new(HyperListener::default()),
            Arc::new(EmbeddedAssets),
            Arc::new(EnglishStrings),
            frames,
            Arc::new(LogStatistics),
            reporter,
        )
    }

    /// Re-derive served content from the given settings.
    pub fn configure(&self, settings: StreamSettings) {
        self.submit(ServerEvent::Configure(settings));
    }

    /// Bind the listener and begin serving the derived content.
    pub fn start(&self, address: BindAddress) {
        self.submit(ServerEvent::Start(address));
    }

    /// Tear the listener down. Idempotent once the server is stopped.
    pub fn stop(&self) {
        self.submit(ServerEvent::Stop);
    }

    /// Terminal shutdown: release everything and refuse further events.
    pub fn destroy(&self) {
        self.submit(ServerEvent::Destroy);
    }

    /// Current phase as last published by the actor.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase changes. The channel closes when the actor terminates.
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    fn submit(&self, event: ServerEvent) {
        if let Err(rejected) = self.events.try_send(event) {
            debug!("event queue rejected {:?}", rejected);
            self.reporter.report(ServerError::EventQueueUnavailable);
        }
    }
}

/// Error sink handed to the listener layer: failures re-enter the actor's
/// queue as [`ServerEvent::Failure`] so they serialize with every other
/// transition.
struct EventErrorSink {
    events: mpsc::Sender<ServerEvent>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorReporter for EventErrorSink {
    fn report(&self, error: ServerError) {
        if self.events.try_send(ServerEvent::Failure(error)).is_err() {
            self.reporter.report(ServerError::EventQueueUnavailable);
        }
    }
}

struct Actor {
    state: ServerState,
    listener: Arc<dyn ListenerController>,
    asset_provider: Arc<dyn AssetProvider>,
    strings: Arc<dyn Localizer>,
    frames: Arc<dyn FrameSource>,
    statistics: Arc<dyn StatisticsSink>,
    reporter: Arc<dyn ErrorReporter>,
    error_sink: Arc<EventErrorSink>,
    phase: watch::Sender<Phase>,
}

impl Actor {
    async fn run(mut self, mut queue: mpsc::Receiver<ServerEvent>) {
        while let Some(event) = queue.recv().await {
            let terminal = matches!(event, ServerEvent::Destroy);
            if let Err(failure) = self.apply(event).await {
                error!("transition failed: {}", failure);
                self.state.phase = Phase::Error;
                self.reporter.report(failure);
            }
            let _ = self.phase.send(self.state.phase);
            if terminal {
                break;
            }
        }
        // Covers both destroy and every handle being dropped.
        if let Some(handle) = self.state.listener.take() {
            self.listener.stop(handle).await;
        }
        debug!("server actor terminated");
    }

    async fn apply(&mut self, event: ServerEvent) -> Result<(), ServerError> {
        match event {
            ServerEvent::Init => self.on_init(),
            ServerEvent::Configure(settings) => self.on_configure(settings).await,
            ServerEvent::Start(address) => self.on_start(address).await,
            ServerEvent::Stop => self.on_stop().await,
            ServerEvent::Failure(failure) => {
                error!("reported by serving layer: {}", failure);
                self.state.phase = Phase::Error;
                self.reporter.report(failure);
                Ok(())
            }
            ServerEvent::Destroy => self.on_destroy().await,
        }
    }

    fn on_init(&mut self) -> Result<(), ServerError> {
        self.state.require_phase(&[Phase::Created], "init")?;

        let favicon = self.load_asset(assets::FAVICON)?;
        let logo = self.load_asset(assets::LOGO)?;
        let base_index = self.load_template(assets::INDEX_TEMPLATE)?;
        let base_pin = self
            .load_template(assets::PIN_TEMPLATE)?
            .replacen(
                templates::ENTER_PIN_TOKEN,
                &self.strings.lookup(LocalizedText::EnterPin),
                1,
            )
            .replacen(
                templates::SUBMIT_TEXT_TOKEN,
                &self.strings.lookup(LocalizedText::SubmitPin),
                1,
            );

        self.state.favicon = favicon;
        self.state.logo = logo;
        self.state.base_index = base_index;
        self.state.base_pin = base_pin;
        self.state.wrong_pin_text = self.strings.lookup(LocalizedText::WrongPin);
        self.state.phase = Phase::Init;
        info!("server initialized");
        Ok(())
    }

    async fn on_configure(&mut self, settings: StreamSettings) -> Result<(), ServerError> {
        self.state
            .require_phase(&[Phase::Init, Phase::Configured, Phase::Error], "configure")?;

        // A runtime failure can leave a live listener behind in the Error
        // phase; reconfiguring must not leak it.
        if let Some(handle) = self.state.listener.take() {
            self.listener.stop(handle).await;
        }

        let content = ServedContent::derive(
            &self.state.base_index,
            &self.state.base_pin,
            &self.state.wrong_pin_text,
            self.state.favicon.clone(),
            self.state.logo.clone(),
            &settings,
        );
        debug!(
            "derived content: stream path {}, PIN gate {}",
            content.stream_path,
            if content.pin_enabled { "on" } else { "off" }
        );
        self.state.content = Some(content);
        self.state.phase = Phase::Configured;
        Ok(())
    }

    async fn on_start(&mut self, address: BindAddress) -> Result<(), ServerError> {
        self.state.require_phase(&[Phase::Configured], "start")?;
        let content = self
            .state
            .content
            .clone()
            .ok_or_else(|| ServerError::Internal("configured phase without content".to_string()))?;

        let handle = self
            .listener
            .start(
                address,
                content,
                self.frames.clone(),
                self.statistics.clone(),
                self.error_sink.clone(),
            )
            .await?;
        info!("serving at http://{}", handle.local_addr());
        self.state.listener = Some(handle);
        self.state.phase = Phase::Running;
        Ok(())
    }

    async fn on_stop(&mut self) -> Result<(), ServerError> {
        if self.state.phase == Phase::Init {
            debug!("stop ignored: server already stopped");
            return Ok(());
        }
        self.state.require_phase(&[Phase::Running, Phase::Error], "stop")?;

        if let Some(handle) = self.state.listener.take() {
            self.listener.stop(handle).await;
        }
        self.state.content = None;
        self.state.phase = Phase::Init;
        info!("server stopped");
        Ok(())
    }

    async fn on_destroy(&mut self) -> Result<(), ServerError> {
        if let Some(handle) = self.state.listener.take() {
            self.listener.stop(handle).await;
        }
        self.state.content = None;
        info!("server destroyed");
        Ok(())
    }

    fn load_asset(&self, name: &str) -> Result<Bytes, ServerError> {
        let bytes = self.asset_provider.load(name)?;
        if bytes.is_empty() {
            return Err(ServerError::AssetMissing(name.to_string()));
        }
        Ok(bytes)
    }

    fn load_template(&self, name: &str) -> Result<String, ServerError> {
        let bytes = self.load_asset(name)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ServerError::AssetInvalid(name.to_string()))
    }
}
