mod adaptive;
mod embedded;
mod progressive;

use crate::catalog::{Video, VideoKind};
use crate::config::PlayerConfig;
use crate::surface::SurfaceProvider;
pub use adaptive::AdaptiveStreamAdapter;
pub use embedded::EmbeddedStreamAdapter;
pub use progressive::ProgressiveFileAdapter;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a playback attempt stopped working. Faults are values, not panics:
/// the player service records them and moves on to another video.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackFault {
    #[error("unusable playback reference: {0}")]
    MalformedReference(String),
    #[error("backend playback fault: {0}")]
    BackendFault(String),
    #[error("no playback progress for {secs}s")]
    StallTimeout { secs: u64 },
    #[error("stream retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
    #[error("no playback backend for video {0}")]
    UnknownKind(String),
}

/// Lifecycle reports every adapter kind reduces its backend's events to.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Ready,
    TimeUpdate { position: f64, duration: f64 },
    Ended,
    Faulted(PlaybackFault),
}

/// An adapter event stamped with the session generation that produced it.
#[derive(Debug)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: AdapterEvent,
}

/// Sender half handed to an adapter at construction. Every event carries the
/// session generation so the player service can discard reports from a
/// session it has already replaced.
#[derive(Clone)]
pub struct AdapterEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl AdapterEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Fire-and-forget: a closed service side means the event no longer matters.
    pub fn emit(&self, event: AdapterEvent) {
        let _ = self.tx.send(SessionEvent {
            generation: self.generation,
            event,
        });
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Uniform control surface over one playing video, regardless of backend
/// kind. Commands are best-effort; state questions go to the backend, which
/// stays authoritative about pause state and position.
#[async_trait::async_trait]
pub trait PlaybackAdapter: Send {
    fn play(&mut self);
    fn pause(&mut self);
    /// Seeks, clamped to `[0, duration]` once the backend knows a duration.
    async fn seek_to(&mut self, position: f64);
    async fn current_time(&self) -> f64;
    async fn duration(&self) -> f64;
    async fn is_paused(&self) -> bool;
    fn request_fullscreen(&mut self);
    /// Releases backend resources. Idempotent; no events follow it.
    fn dispose(&mut self);
}

/// Builds the adapter matching the video's backend kind. Construction
/// failures come back as faults so the caller can run its normal
/// record-and-skip path.
pub async fn build_adapter(
    video: &Video,
    start_at: f64,
    provider: &dyn SurfaceProvider,
    config: &PlayerConfig,
    sink: AdapterEventSink,
) -> Result<Box<dyn PlaybackAdapter>, PlaybackFault> {
    match video.kind {
        VideoKind::EmbeddedStream => {
            let adapter = EmbeddedStreamAdapter::build(video, start_at, provider, config, sink).await?;
            Ok(Box::new(adapter))
        }
        VideoKind::ProgressiveFile => {
            let adapter = ProgressiveFileAdapter::build(video, provider, sink)?;
            Ok(Box::new(adapter))
        }
        VideoKind::AdaptiveStream => {
            let adapter = AdaptiveStreamAdapter::build(video, provider, config, sink)?;
            Ok(Box::new(adapter))
        }
        VideoKind::Unknown => Err(PlaybackFault::UnknownKind(video.id.clone())),
    }
}

/// Position clamp shared by the element-backed adapters. Backends report
/// duration 0 (or NaN) before metadata arrives; only a positive finite
/// duration bounds the seek.
pub(crate) fn clamp_position(position: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        position.clamp(0.0, duration)
    } else {
        position.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_known_duration() {
        assert_eq!(clamp_position(30.0, 120.0), 30.0);
        assert_eq!(clamp_position(150.0, 120.0), 120.0);
        assert_eq!(clamp_position(-5.0, 120.0), 0.0);
    }

    #[test]
    fn clamp_without_duration_only_floors_at_zero() {
        assert_eq!(clamp_position(42.0, 0.0), 42.0);
        assert_eq!(clamp_position(-1.0, 0.0), 0.0);
        assert_eq!(clamp_position(42.0, f64::NAN), 42.0);
    }

    #[test]
    fn fault_messages_name_the_failure() {
        let fault = PlaybackFault::RetryExhausted { attempts: 3 };
        assert_eq!(
            fault.to_string(),
            "stream retry budget exhausted after 3 attempts"
        );
        let fault = PlaybackFault::StallTimeout { secs: 10 };
        assert_eq!(fault.to_string(), "no playback progress for 10s");
    }
}
