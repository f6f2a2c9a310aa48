use crate::adapter::{clamp_position, AdapterEvent, AdapterEventSink, PlaybackAdapter, PlaybackFault};
use crate::catalog::Video;
use crate::config::PlayerConfig;
use crate::surface::{
    AdaptiveEngine, AdaptiveTuning, ElementEvent, EngineEvent, MediaElement, MediaRequest,
    SurfaceProvider,
};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Adapter for manifest-based streams (kind `hls`).
///
/// The media element plays what the engine feeds it; fault handling lives in
/// a policy task that watches both native event streams. Network faults are
/// retried by restarting segment loading, media faults are recovered in
/// place when the engine can, and a stream that buffers past the stall
/// timeout without resuming is declared dead.
pub struct AdaptiveStreamAdapter {
    element: Box<dyn MediaElement>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AdaptiveStreamAdapter {
    pub fn build(
        video: &Video,
        provider: &dyn SurfaceProvider,
        config: &PlayerConfig,
        sink: AdapterEventSink,
    ) -> Result<Self, PlaybackFault> {
        let request = MediaRequest {
            src: None,
            subtitle_url: video.subtitle_url.clone(),
        };

        let (element_tx, element_rx) = mpsc::unbounded_channel();
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();

        let mut element = provider
            .media_element(request, element_tx)
            .map_err(|e| PlaybackFault::BackendFault(e.to_string()))?;
        let engine = match provider.adaptive_engine(
            element.as_mut(),
            &video.url,
            &AdaptiveTuning::default(),
            engine_tx,
        ) {
            Ok(engine) => engine,
            Err(e) => {
                element.dispose();
                return Err(PlaybackFault::BackendFault(e.to_string()));
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let policy = StreamPolicy {
            engine,
            element_rx,
            engine_rx,
            shutdown_rx,
            sink,
            retry_budget: config.retry_budget,
            retry_delay: config.retry_delay,
            stall_timeout: config.stall_timeout,
            retries_used: 0,
        };
        tokio::spawn(policy.run());

        Ok(Self {
            element,
            shutdown_tx: Some(shutdown_tx),
        })
    }
}

#[async_trait::async_trait]
impl PlaybackAdapter for AdaptiveStreamAdapter {
    fn play(&mut self) {
        self.element.play();
    }

    fn pause(&mut self) {
        self.element.pause();
    }

    async fn seek_to(&mut self, position: f64) {
        let duration = self.element.duration().await;
        self.element.set_position(clamp_position(position, duration));
    }

    async fn current_time(&self) -> f64 {
        self.element.position().await
    }

    async fn duration(&self) -> f64 {
        self.element.duration().await
    }

    async fn is_paused(&self) -> bool {
        self.element.is_paused().await
    }

    fn request_fullscreen(&mut self) {
        self.element.request_fullscreen();
    }

    fn dispose(&mut self) {
        self.element.dispose();
        // The policy task owns the engine and destroys it on its way out.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Owns the engine and turns its raw fault stream into the retry, recover
/// and stall behavior the player expects.
struct StreamPolicy {
    engine: Box<dyn AdaptiveEngine>,
    element_rx: mpsc::UnboundedReceiver<ElementEvent>,
    engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    sink: AdapterEventSink,
    retry_budget: u32,
    retry_delay: Duration,
    stall_timeout: Duration,
    retries_used: u32,
}

impl StreamPolicy {
    async fn run(mut self) {
        // Armed while the element reports buffering without progress, and
        // while a restart is pending. A disarmed timer arm is never polled.
        let mut stall_at: Option<Instant> = None;
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    break;
                }
                event = self.element_rx.recv() => match event {
                    Some(event) => self.on_element_event(event, &mut stall_at),
                    None => break,
                },
                event = self.engine_rx.recv() => match event {
                    Some(event) => self.on_engine_event(event, &mut retry_at),
                    None => break,
                },
                _ = sleep_until(stall_at.unwrap_or_else(Instant::now)), if stall_at.is_some() => {
                    stall_at = None;
                    let secs = self.stall_timeout.as_secs();
                    warn!("Adaptive stream made no progress for {}s, giving up on it", secs);
                    self.sink
                        .emit(AdapterEvent::Faulted(PlaybackFault::StallTimeout { secs }));
                }
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = None;
                    info!(
                        "Restarting stream load, attempt {}/{}",
                        self.retries_used, self.retry_budget
                    );
                    self.engine.start_load();
                }
            }
        }

        self.engine.destroy();
        debug!("Stream policy task stopped");
    }

    fn on_element_event(&mut self, event: ElementEvent, stall_at: &mut Option<Instant>) {
        match event {
            ElementEvent::MetadataLoaded => self.sink.emit(AdapterEvent::Ready),
            ElementEvent::TimeUpdate { position, duration } => {
                self.sink.emit(AdapterEvent::TimeUpdate { position, duration })
            }
            ElementEvent::Ended => self.sink.emit(AdapterEvent::Ended),
            ElementEvent::Waiting => {
                debug!("Adaptive stream buffering, stall timer armed");
                *stall_at = Some(Instant::now() + self.stall_timeout);
            }
            ElementEvent::Playing => {
                *stall_at = None;
            }
            // The engine reports the authoritative fault with its category;
            // the element's view of the same failure is redundant.
            ElementEvent::Faulted(message) => {
                debug!("Element fault on engine-fed stream: {}", message);
            }
        }
    }

    fn on_engine_event(&mut self, event: EngineEvent, retry_at: &mut Option<Instant>) {
        match event {
            EngineEvent::ManifestParsed => {
                if self.retries_used > 0 {
                    info!("Manifest parsed after restart, retry counter reset");
                }
                self.retries_used = 0;
            }
            EngineEvent::ManifestLoadFailed(message) => {
                self.sink
                    .emit(AdapterEvent::Faulted(PlaybackFault::BackendFault(message)));
            }
            EngineEvent::FatalNetwork(message) => {
                self.restart_or_exhaust(&message, retry_at);
            }
            EngineEvent::FatalMedia(message) => {
                if self.engine.recover_media() {
                    info!("Recovered adaptive stream in place after media fault");
                } else {
                    self.restart_or_exhaust(&message, retry_at);
                }
            }
            EngineEvent::FatalOther(message) => {
                self.sink
                    .emit(AdapterEvent::Faulted(PlaybackFault::BackendFault(message)));
            }
        }
    }

    /// One more restart if the budget allows, otherwise the fault is final.
    /// A fault arriving while a restart is already pending reschedules it.
    fn restart_or_exhaust(&mut self, message: &str, retry_at: &mut Option<Instant>) {
        if self.retries_used < self.retry_budget {
            self.retries_used += 1;
            warn!(
                "Fatal stream fault ({}), restart {}/{} in {:?}",
                message, self.retries_used, self.retry_budget, self.retry_delay
            );
            *retry_at = Some(Instant::now() + self.retry_delay);
        } else {
            self.sink.emit(AdapterEvent::Faulted(PlaybackFault::RetryExhausted {
                attempts: self.retries_used,
            }));
        }
    }
}
