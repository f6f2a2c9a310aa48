use crate::adapter::{clamp_position, AdapterEvent, AdapterEventSink, PlaybackAdapter, PlaybackFault};
use crate::catalog::Video;
use crate::config::PlayerConfig;
use crate::surface::{EmbedEvent, EmbedPlayer, EmbedRequest, SurfaceProvider};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

/// Adapter for provider-embedded players (kind `embed`).
///
/// Embeds are opaque: they report ready, ended and faulted, and nothing else.
/// There are no time ticks, so progress for embedded videos only ever records
/// completion. The resume point travels in the [`EmbedRequest`]; the embed
/// applies it itself.
pub struct EmbeddedStreamAdapter {
    player: Box<dyn EmbedPlayer>,
    forward_task: JoinHandle<()>,
}

impl EmbeddedStreamAdapter {
    pub async fn build(
        video: &Video,
        start_at: f64,
        provider: &dyn SurfaceProvider,
        config: &PlayerConfig,
        sink: AdapterEventSink,
    ) -> Result<Self, PlaybackFault> {
        let embed_id = parse_embed_id(&video.url)
            .ok_or_else(|| PlaybackFault::MalformedReference(video.url.clone()))?;
        debug!("Embedding {} at {:.1}s", embed_id, start_at);

        let request = EmbedRequest {
            embed_id,
            start_at,
            autoplay: true,
            caption_lang: config.caption_lang.clone(),
        };

        let (native_tx, mut native_rx) = mpsc::unbounded_channel();
        let player = provider
            .embed_player(request, native_tx)
            .await
            .map_err(|e| PlaybackFault::BackendFault(e.to_string()))?;

        let forward_task = tokio::spawn(async move {
            while let Some(event) = native_rx.recv().await {
                match event {
                    EmbedEvent::Ready => sink.emit(AdapterEvent::Ready),
                    EmbedEvent::Ended => sink.emit(AdapterEvent::Ended),
                    EmbedEvent::Faulted(message) => {
                        sink.emit(AdapterEvent::Faulted(PlaybackFault::BackendFault(message)))
                    }
                }
            }
        });

        Ok(Self {
            player,
            forward_task,
        })
    }
}

#[async_trait::async_trait]
impl PlaybackAdapter for EmbeddedStreamAdapter {
    fn play(&mut self) {
        self.player.play();
    }

    fn pause(&mut self) {
        self.player.pause();
    }

    async fn seek_to(&mut self, position: f64) {
        let duration = self.player.duration().await;
        self.player.seek_to(clamp_position(position, duration));
    }

    async fn current_time(&self) -> f64 {
        self.player.current_time().await
    }

    async fn duration(&self) -> f64 {
        self.player.duration().await
    }

    async fn is_paused(&self) -> bool {
        self.player.is_paused().await
    }

    fn request_fullscreen(&mut self) {
        self.player.request_fullscreen();
    }

    fn dispose(&mut self) {
        self.player.dispose();
        self.forward_task.abort();
    }
}

/// Extracts the provider's video id from a catalog URL: a `v` query
/// parameter if present, else a single-segment path (short-link form).
/// Anything else is an unusable reference.
pub fn parse_embed_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;

    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
        let value = value.into_owned();
        return (!value.is_empty()).then_some(value);
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    Some(first.to_string())
}
