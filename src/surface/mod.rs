use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("surface creation failed: {0}")]
    Creation(String),
    #[error("surface unavailable: {0}")]
    Unavailable(String),
}

/// Parameters for creating an embedded provider player.
///
/// Embeds apply the resume point themselves (`start_at` rides in the player
/// vars), unlike element surfaces where the engine seeks after metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub embed_id: String,
    pub start_at: f64,
    pub autoplay: bool,
    pub caption_lang: Option<String>,
}

/// Parameters for creating a media element surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    /// Direct source URL; None when an adaptive engine attaches instead.
    pub src: Option<String>,
    pub subtitle_url: Option<String>,
}

/// Buffering knobs handed to the adaptive engine at construction. These are
/// the values the player has always shipped; nothing retunes them at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveTuning {
    pub worker: bool,
    pub low_latency: bool,
    pub max_buffer_secs: u32,
    pub max_max_buffer_secs: u32,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            worker: true,
            low_latency: true,
            max_buffer_secs: 30,
            max_max_buffer_secs: 60,
        }
    }
}

/// Native events from an embedded provider player. Embeds report coarse
/// state changes only; there are no time ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedEvent {
    Ready,
    Ended,
    Faulted(String),
}

/// Native events from a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    MetadataLoaded,
    TimeUpdate { position: f64, duration: f64 },
    Ended,
    Faulted(String),
    Waiting,
    Playing,
}

/// Native events from an adaptive streaming engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ManifestParsed,
    ManifestLoadFailed(String),
    FatalNetwork(String),
    FatalMedia(String),
    FatalOther(String),
}

/// Control surface of an embedded provider player.
///
/// `play` and `pause` are requests: a backend that refuses (autoplay policy,
/// detached surface) reports the refusal as a native fault event, never as a
/// return value.
#[async_trait::async_trait]
pub trait EmbedPlayer: Send + Sync {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, position: f64);
    async fn current_time(&self) -> f64;
    async fn duration(&self) -> f64;
    async fn is_paused(&self) -> bool;
    fn request_fullscreen(&mut self);
    fn dispose(&mut self);
}

/// Control surface of a media element playing a direct or engine-fed source.
/// Same refusal contract as [`EmbedPlayer`]: rejected requests surface as
/// native fault events.
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_position(&mut self, position: f64);
    async fn position(&self) -> f64;
    async fn duration(&self) -> f64;
    async fn is_paused(&self) -> bool;
    fn request_fullscreen(&mut self);
    fn dispose(&mut self);
}

/// Control surface of an adaptive streaming engine bound to a media element.
pub trait AdaptiveEngine: Send {
    /// Begin or restart segment loading. Restarting is the network-fault
    /// retry primitive.
    fn start_load(&mut self);
    /// Ask the backend to recover from a fatal media fault in place.
    /// Returns false when the backend cannot recover this stream.
    fn recover_media(&mut self) -> bool;
    fn destroy(&mut self);
}

/// Factory for native playback surfaces, injected by the embedding shell.
///
/// Each constructor receives the channel its surface must deliver native
/// events on. A disposed surface must stop emitting; the player additionally
/// discards events from stale playback sessions.
#[async_trait::async_trait]
pub trait SurfaceProvider: Send + Sync {
    /// Embed creation completes the provider's async handshake before
    /// returning a controllable player.
    async fn embed_player(
        &self,
        request: EmbedRequest,
        events: mpsc::UnboundedSender<EmbedEvent>,
    ) -> Result<Box<dyn EmbedPlayer>, SurfaceError>;

    fn media_element(
        &self,
        request: MediaRequest,
        events: mpsc::UnboundedSender<ElementEvent>,
    ) -> Result<Box<dyn MediaElement>, SurfaceError>;

    /// The returned engine is bound to `element` and already loading
    /// `manifest_url`.
    fn adaptive_engine(
        &self,
        element: &mut dyn MediaElement,
        manifest_url: &str,
        tuning: &AdaptiveTuning,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn AdaptiveEngine>, SurfaceError>;
}
