use crate::adapter::PlaybackFault;
use crate::catalog::Video;
use crate::player::service::PlayerState;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::info;

/// Notifications pushed to player subscribers.
///
/// `StateChanged` marks discrete transitions; live position flows through
/// `PositionChanged` so state changes stay rare. `ProgressSaved` fires once
/// per persisted write, which is throttled and much sparser than the
/// position stream.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    StateChanged {
        state: PlayerState,
    },
    PositionChanged {
        video_id: String,
        position: f64,
        duration: f64,
    },
    PlaylistUpdated {
        snapshot: PlaylistSnapshot,
    },
    ProgressSaved {
        video_id: String,
    },
    VideoFaulted {
        video_id: String,
        fault: PlaybackFault,
    },
}

/// One catalog entry decorated with its watch status.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub video: Video,
    pub seen: bool,
    pub error: bool,
    pub active: bool,
}

/// The catalog in playback order, ready for a list UI: newest first, each
/// entry flagged with seen/error status and whether it is the one playing.
/// `settings` is the opaque catalog settings object, passed through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistSnapshot {
    pub entries: Vec<PlaylistEntry>,
    pub settings: Map<String, Value>,
}

type SubscriptionId = u64;

struct Subscription {
    tx: tokio_mpsc::UnboundedSender<PlayerEvent>,
}

/// Handle for subscribing to player events. Cloneable; all clones share the
/// same subscriber set.
#[derive(Clone)]
pub struct PlayerEventHandle {
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>>,
    next_id: Arc<AtomicU64>,
}

impl PlayerEventHandle {
    /// Create the handle and spawn the dispatch task that fans events out to
    /// every live subscriber.
    pub fn new(
        mut event_rx: tokio_mpsc::UnboundedReceiver<PlayerEvent>,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let subscriptions_clone = subscriptions.clone();

        runtime_handle.spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let mut subs = subscriptions_clone.lock().unwrap();
                let mut dropped = Vec::new();

                for (id, subscription) in subs.iter() {
                    // A failed send means the receiver is gone.
                    if subscription.tx.send(event.clone()).is_err() {
                        dropped.push(*id);
                    }
                }

                for id in dropped {
                    subs.remove(&id);
                }
            }
            info!("Player event channel closed, dispatch task exiting");
        });

        Self {
            subscriptions,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to all player events. The subscription is removed
    /// automatically once the returned receiver is dropped.
    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.subscriptions
            .lock()
            .unwrap()
            .insert(id, Subscription { tx });
        rx
    }
}
