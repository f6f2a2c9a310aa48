use crate::adapter::{clamp_position, AdapterEvent, AdapterEventSink, PlaybackAdapter, PlaybackFault};
use crate::catalog::Video;
use crate::surface::{ElementEvent, MediaElement, MediaRequest, SurfaceProvider};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Adapter for directly fetchable video files (kind `file`).
///
/// The media element does all the work; this adapter translates its events
/// and control surface one-to-one. Any element fault is terminal for the
/// video, there is no retry tier for plain files.
pub struct ProgressiveFileAdapter {
    element: Box<dyn MediaElement>,
    forward_task: JoinHandle<()>,
}

impl ProgressiveFileAdapter {
    pub fn build(
        video: &Video,
        provider: &dyn SurfaceProvider,
        sink: AdapterEventSink,
    ) -> Result<Self, PlaybackFault> {
        let request = MediaRequest {
            src: Some(video.url.clone()),
            subtitle_url: video.subtitle_url.clone(),
        };

        let (native_tx, mut native_rx) = mpsc::unbounded_channel();
        let element = provider
            .media_element(request, native_tx)
            .map_err(|e| PlaybackFault::BackendFault(e.to_string()))?;

        let forward_task = tokio::spawn(async move {
            while let Some(event) = native_rx.recv().await {
                match event {
                    ElementEvent::MetadataLoaded => sink.emit(AdapterEvent::Ready),
                    ElementEvent::TimeUpdate { position, duration } => {
                        sink.emit(AdapterEvent::TimeUpdate { position, duration })
                    }
                    ElementEvent::Ended => sink.emit(AdapterEvent::Ended),
                    ElementEvent::Faulted(message) => {
                        sink.emit(AdapterEvent::Faulted(PlaybackFault::BackendFault(message)))
                    }
                    // Buffering gaps on a direct file resolve themselves or
                    // end in an element fault; no stall policy here.
                    ElementEvent::Waiting | ElementEvent::Playing => {
                        debug!("Progressive element buffering state changed");
                    }
                }
            }
        });

        Ok(Self {
            element,
            forward_task,
        })
    }
}

#[async_trait::async_trait]
impl PlaybackAdapter for ProgressiveFileAdapter {
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
        self.forward_task.abort();
    }
}
