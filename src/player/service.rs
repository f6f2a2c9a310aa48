use crate::adapter::{
    build_adapter, AdapterEvent, AdapterEventSink, PlaybackAdapter, PlaybackFault, SessionEvent,
};
use crate::catalog::{Catalog, CatalogSource, Video, VideoKind};
use crate::config::PlayerConfig;
use crate::player::events::{PlayerEvent, PlayerEventHandle, PlaylistEntry, PlaylistSnapshot};
use crate::player::session::PlaybackSession;
use crate::progress::{is_seen, resume_position, ProgressMap, ProgressRecord, ProgressStore};
use crate::selection;
use crate::surface::SurfaceProvider;
use std::sync::Arc;
use tokio::sync::{mpsc as tokio_mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Player commands sent to the service
pub enum PlayerCommand {
    Start,
    TogglePlay,
    SeekTo(f64),
    SeekBy(f64),
    Next,
    Previous,
    Select(String), // video_id
    Refresh,
    Fullscreen,
    State {
        response_tx: oneshot::Sender<PlayerState>,
    },
    Snapshot {
        response_tx: oneshot::Sender<PlaylistSnapshot>,
    },
    Shutdown,
}

/// Current player state
#[derive(Debug, Clone)]
pub enum PlayerState {
    Idle,
    NothingToPlay,
    Selecting {
        video: Video,
    },
    Ready {
        video: Video,
        resume_from: f64,
    },
    Playing {
        video: Video,
        position: f64,
        duration: f64,
    },
    Paused {
        video: Video,
        position: f64,
        duration: f64,
    },
}

/// Handle to the player service for sending commands
#[derive(Clone)]
pub struct PlayerHandle {
    command_tx: tokio_mpsc::UnboundedSender<PlayerCommand>,
    event_handle: PlayerEventHandle,
}

impl PlayerHandle {
    pub fn start_playback(&self) {
        let _ = self.command_tx.send(PlayerCommand::Start);
    }

    pub fn toggle_play(&self) {
        let _ = self.command_tx.send(PlayerCommand::TogglePlay);
    }

    pub fn seek_to(&self, position: f64) {
        let _ = self.command_tx.send(PlayerCommand::SeekTo(position));
    }

    pub fn seek_by(&self, delta: f64) {
        let _ = self.command_tx.send(PlayerCommand::SeekBy(delta));
    }

    pub fn next(&self) {
        let _ = self.command_tx.send(PlayerCommand::Next);
    }

    pub fn previous(&self) {
        let _ = self.command_tx.send(PlayerCommand::Previous);
    }

    pub fn select(&self, video_id: String) {
        let _ = self.command_tx.send(PlayerCommand::Select(video_id));
    }

    pub fn refresh(&self) {
        let _ = self.command_tx.send(PlayerCommand::Refresh);
    }

    pub fn fullscreen(&self) {
        let _ = self.command_tx.send(PlayerCommand::Fullscreen);
    }

    pub fn shutdown(&self) {
        let _ = self.command_tx.send(PlayerCommand::Shutdown);
    }

    /// Current state, for pull-based consumers; live updates flow through
    /// [`PlayerHandle::subscribe`].
    pub async fn state(&self) -> Option<PlayerState> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .command_tx
            .send(PlayerCommand::State { response_tx })
            .is_err()
        {
            return None;
        }
        response_rx.await.ok()
    }

    /// Current playlist view, in playback order with watch status.
    pub async fn playlist(&self) -> Option<PlaylistSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .command_tx
            .send(PlayerCommand::Snapshot { response_tx })
            .is_err()
        {
            return None;
        }
        response_rx.await.ok()
    }

    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<PlayerEvent> {
        self.event_handle.subscribe()
    }
}

/// A finished adapter build, tagged with the generation it was built for.
struct BuiltSession {
    generation: u64,
    adapter: Box<dyn PlaybackAdapter>,
}

/// Player service that orchestrates catalog, selection, playback and
/// progress. Commands and adapter events feed one select loop; the catalog
/// re-fetches on an interval.
pub struct PlayerService {
    config: PlayerConfig,
    catalog_source: Arc<dyn CatalogSource>,
    progress_store: Arc<dyn ProgressStore>,
    surface_provider: Arc<dyn SurfaceProvider>,
    command_rx: tokio_mpsc::UnboundedReceiver<PlayerCommand>,
    adapter_rx: tokio_mpsc::UnboundedReceiver<SessionEvent>,
    adapter_tx: tokio_mpsc::UnboundedSender<SessionEvent>,
    built_rx: tokio_mpsc::UnboundedReceiver<BuiltSession>,
    built_tx: tokio_mpsc::UnboundedSender<BuiltSession>,
    event_tx: tokio_mpsc::UnboundedSender<PlayerEvent>,
    save_tx: tokio_mpsc::UnboundedSender<ProgressMap>,
    catalog: Catalog,
    progress: ProgressMap,
    session: Option<PlaybackSession>,
    state: PlayerState,
    generation: u64,
}

impl PlayerService {
    pub fn start(
        config: PlayerConfig,
        catalog_source: Arc<dyn CatalogSource>,
        progress_store: Arc<dyn ProgressStore>,
        surface_provider: Arc<dyn SurfaceProvider>,
        runtime_handle: tokio::runtime::Handle,
    ) -> PlayerHandle {
        let (command_tx, command_rx) = tokio_mpsc::unbounded_channel();
        let (event_tx, event_rx) = tokio_mpsc::unbounded_channel();
        let (adapter_tx, adapter_rx) = tokio_mpsc::unbounded_channel();
        let (built_tx, built_rx) = tokio_mpsc::unbounded_channel();
        let (save_tx, mut save_rx) = tokio_mpsc::unbounded_channel::<ProgressMap>();

        // Saves go through one writer, in queue order.
        let save_store = progress_store.clone();
        runtime_handle.spawn(async move {
            while let Some(snapshot) = save_rx.recv().await {
                if let Err(e) = save_store.save(&snapshot).await {
                    warn!("Failed to persist watch progress: {}", e);
                }
            }
            debug!("Progress writer stopped");
        });

        let event_handle = PlayerEventHandle::new(event_rx, runtime_handle.clone());

        let handle = PlayerHandle {
            command_tx,
            event_handle,
        };

        let mut service = PlayerService {
            config,
            catalog_source,
            progress_store,
            surface_provider,
            command_rx,
            adapter_rx,
            adapter_tx,
            built_rx,
            built_tx,
            event_tx,
            save_tx,
            catalog: Catalog::default(),
            progress: ProgressMap::new(),
            session: None,
            state: PlayerState::Idle,
            generation: 0,
        };

        runtime_handle.spawn(async move {
            service.run().await;
        });

        handle
    }

    async fn run(&mut self) {
        info!("PlayerService started");

        self.progress = match self.progress_store.load().await {
            Ok(progress) => progress,
            Err(e) => {
                warn!("Failed to load watch progress, starting empty: {}", e);
                ProgressMap::new()
            }
        };
        self.reload_catalog().await;

        let mut refresh = tokio::time::interval(self.config.refresh_interval);
        refresh.tick().await; // immediate first tick; the startup load just ran

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            info!("Player command channel closed");
                            break;
                        }
                    }
                }
                Some(event) = self.adapter_rx.recv() => {
                    self.handle_session_event(event).await;
                }
                Some(built) = self.built_rx.recv() => {
                    self.install_adapter(built).await;
                }
                _ = refresh.tick() => {
                    debug!("Catalog refresh tick");
                    self.reload_catalog().await;
                }
            }
        }

        self.dispose_session();
        info!("PlayerService stopped");
    }

    /// Returns false when the service should stop.
    async fn handle_command(&mut self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::Start => self.start_playback(),
            PlayerCommand::TogglePlay => self.toggle_play().await,
            PlayerCommand::SeekTo(position) => {
                if let Some(adapter) = self.adapter_mut() {
                    adapter.seek_to(position).await;
                }
            }
            PlayerCommand::SeekBy(delta) => {
                if let Some(adapter) = self.adapter_mut() {
                    let current = adapter.current_time().await;
                    adapter.seek_to(current + delta).await;
                }
            }
            PlayerCommand::Next => {
                let current_id = self.current_video_id();
                let next =
                    selection::advance_forward(&self.catalog.videos, &self.progress, &current_id)
                        .cloned();
                match next {
                    Some(video) => self.select_video(video),
                    None => self.settle_with_nothing(),
                }
            }
            PlayerCommand::Previous => {
                let current_id = self.current_video_id();
                let previous =
                    selection::advance_backward(&self.catalog.videos, &current_id).cloned();
                match previous {
                    Some(video) => self.select_video(video),
                    None => self.settle_with_nothing(),
                }
            }
            PlayerCommand::Select(video_id) => {
                if self.session.as_ref().is_some_and(|s| s.video.id == video_id) {
                    debug!("Select ignored, video {} is already current", video_id);
                } else {
                    let picked = self.catalog.videos.iter().find(|v| v.id == video_id).cloned();
                    match picked {
                        Some(video) => self.select_video(video),
                        None => warn!("Select ignored, video {} is not in the catalog", video_id),
                    }
                }
            }
            PlayerCommand::Refresh => self.reload_catalog().await,
            PlayerCommand::Fullscreen => {
                if let Some(adapter) = self.adapter_mut() {
                    adapter.request_fullscreen();
                }
            }
            PlayerCommand::State { response_tx } => {
                let _ = response_tx.send(self.state.clone());
            }
            PlayerCommand::Snapshot { response_tx } => {
                let _ = response_tx.send(self.playlist_snapshot());
            }
            PlayerCommand::Shutdown => {
                info!("Player shutting down");
                return false;
            }
        }
        true
    }

    /// Adapter events, filtered by generation: a report from a session the
    /// service already replaced is stale and must not touch state.
    async fn handle_session_event(&mut self, event: SessionEvent) {
        let current = self.session.as_ref().map(|s| s.generation);
        if current != Some(event.generation) {
            debug!(
                "Discarding adapter event from stale generation {}",
                event.generation
            );
            return;
        }

        match event.event {
            AdapterEvent::Ready => {
                if let Some(session) = &mut self.session {
                    session.surface_ready = true;
                }
                self.try_enter_ready().await;
            }
            AdapterEvent::TimeUpdate { position, duration } => {
                self.on_time_update(position, duration);
            }
            AdapterEvent::Ended => self.on_ended(),
            AdapterEvent::Faulted(fault) => self.on_faulted(fault),
        }
    }

    /// The build task finished; adopt the adapter if its session is still
    /// current, otherwise dispose it on the spot.
    async fn install_adapter(&mut self, built: BuiltSession) {
        let current = self.session.as_ref().map(|s| s.generation);
        if current != Some(built.generation) {
            debug!(
                "Disposing adapter built for replaced session generation {}",
                built.generation
            );
            let mut adapter = built.adapter;
            adapter.dispose();
            return;
        }

        if let Some(session) = &mut self.session {
            session.adapter = Some(built.adapter);
        }
        self.try_enter_ready().await;
    }

    /// Selecting turns into Ready once both halves arrived: the adapter from
    /// its build task and the backend's ready report. Builds resolve
    /// concurrently with events, so either can land first.
    async fn try_enter_ready(&mut self) {
        if !matches!(self.state, PlayerState::Selecting { .. }) {
            return;
        }
        let Some(session) = &mut self.session else {
            return;
        };
        if !session.surface_ready || session.adapter.is_none() {
            return;
        }

        let video = session.video.clone();
        let resume_from = session.resume_from;
        // Embeds received the resume point at construction and seek themselves.
        if resume_from > 0.0 && video.kind != VideoKind::EmbeddedStream {
            if let Some(adapter) = &mut session.adapter {
                adapter.seek_to(resume_from).await;
            }
        }

        info!("Video {} ready, resume at {:.1}s", video.id, resume_from);
        self.set_state(PlayerState::Ready { video, resume_from });
    }

    fn start_playback(&mut self) {
        if !matches!(self.state, PlayerState::Ready { .. }) {
            debug!("Start ignored outside the ready state");
            return;
        }
        if let Some(adapter) = self.adapter_mut() {
            adapter.play();
        }
        self.enter_playing();
    }

    /// Direction comes from the backend's own pause state, not from the
    /// service's last known state; backends pause themselves.
    async fn toggle_play(&mut self) {
        if matches!(self.state, PlayerState::Ready { .. }) {
            self.start_playback();
            return;
        }
        let Some(adapter) = self.adapter_mut() else {
            debug!("TogglePlay ignored without a controllable session");
            return;
        };
        if adapter.is_paused().await {
            adapter.play();
            self.enter_playing();
        } else {
            adapter.pause();
            self.enter_paused();
        }
    }

    fn on_time_update(&mut self, position: f64, duration: f64) {
        let Some(session) = &mut self.session else {
            return;
        };
        session.position = position;
        if duration.is_finite() && duration > 0.0 {
            session.duration = duration;
        }
        let video_id = session.video.id.clone();
        let known_duration = session.duration;

        let save_due =
            (position - session.last_saved_position).abs() >= self.config.save_threshold_secs;
        if save_due {
            session.last_saved_position = position;
        }

        self.emit(PlayerEvent::PositionChanged {
            video_id: video_id.clone(),
            position,
            duration: known_duration,
        });

        if save_due {
            // A live tick never flips the seen flag; completion does that.
            let seen = is_seen(&self.progress, &video_id);
            self.record_progress(&video_id, ProgressRecord::at_position(position, seen));
        }
    }

    fn on_ended(&mut self) {
        let ended_id = match &self.session {
            Some(session) => session.video.id.clone(),
            None => return,
        };
        info!("Video {} finished", ended_id);
        self.record_progress(&ended_id, ProgressRecord::completed());

        let next =
            selection::advance_forward(&self.catalog.videos, &self.progress, &ended_id).cloned();
        match next {
            Some(video) => self.select_video(video),
            None => self.settle_with_nothing(),
        }
    }

    fn on_faulted(&mut self, fault: PlaybackFault) {
        let failed_id = match &self.session {
            Some(session) => session.video.id.clone(),
            None => return,
        };
        error!("Playback fault on video {}: {}", failed_id, fault);
        self.record_progress(&failed_id, ProgressRecord::faulted());
        self.emit(PlayerEvent::VideoFaulted {
            video_id: failed_id.clone(),
            fault,
        });

        let next =
            selection::skip_on_error(&self.catalog.videos, &self.progress, &failed_id).cloned();
        match next {
            Some(video) => self.select_video(video),
            None => self.settle_with_nothing(),
        }
    }

    /// Dispose-then-construct: the old adapter is gone before the new build
    /// starts, so two adapters never run at once.
    fn select_video(&mut self, video: Video) {
        self.dispose_session();
        self.generation += 1;
        let generation = self.generation;
        let resume_from = resume_position(&self.progress, &video.id);

        info!(
            "Selecting video {} ({}) as generation {}",
            video.id, video.kind, generation
        );
        self.session = Some(PlaybackSession::new(video.clone(), generation, resume_from));
        self.set_state(PlayerState::Selecting {
            video: video.clone(),
        });
        self.spawn_adapter_build(video, generation, resume_from);
    }

    /// Adapter construction can involve a provider handshake, so it runs off
    /// the service loop. Failures join the normal fault path after a pacing
    /// delay, which keeps an all-faulty catalog from spinning hot.
    fn spawn_adapter_build(&self, video: Video, generation: u64, start_at: f64) {
        let sink = AdapterEventSink::new(generation, self.adapter_tx.clone());
        let provider = self.surface_provider.clone();
        let config = self.config.clone();
        let built_tx = self.built_tx.clone();

        tokio::spawn(async move {
            match build_adapter(&video, start_at, provider.as_ref(), &config, sink.clone()).await {
                Ok(adapter) => {
                    let _ = built_tx.send(BuiltSession {
                        generation,
                        adapter,
                    });
                }
                Err(fault) => {
                    warn!("No adapter for video {}: {}", video.id, fault);
                    tokio::time::sleep(config.construction_fault_delay).await;
                    sink.emit(AdapterEvent::Faulted(fault));
                }
            }
        });
    }

    async fn reload_catalog(&mut self) {
        let catalog = match self.catalog_source.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Catalog load failed, treating it as empty this round: {}", e);
                Catalog::default()
            }
        };
        info!("Catalog loaded with {} videos", catalog.videos.len());
        self.catalog = catalog;

        let snapshot = self.playlist_snapshot();
        self.emit(PlayerEvent::PlaylistUpdated { snapshot });

        // A live session always plays out, even when its video vanished from
        // the catalog; the fresh catalog applies at the next selection.
        if self.session.is_none() {
            match selection::initial_pick(&self.catalog.videos, &self.progress).cloned() {
                Some(video) => self.select_video(video),
                None => self.settle_with_nothing(),
            }
        }
    }

    fn playlist_snapshot(&self) -> PlaylistSnapshot {
        let active_id = self.session.as_ref().map(|s| s.video.id.as_str());
        let entries = selection::sort_newest_first(&self.catalog.videos)
            .into_iter()
            .map(|video| PlaylistEntry {
                seen: is_seen(&self.progress, &video.id),
                error: self
                    .progress
                    .get(&video.id)
                    .and_then(|record| record.error)
                    .unwrap_or(false),
                active: active_id == Some(video.id.as_str()),
                video: video.clone(),
            })
            .collect();

        PlaylistSnapshot {
            entries,
            settings: self.catalog.settings.clone(),
        }
    }

    /// Updates the in-memory map and queues a snapshot for the writer task,
    /// then announces the write. The writer applies snapshots in order, so
    /// the newest one is what the store ends up holding.
    fn record_progress(&mut self, video_id: &str, record: ProgressRecord) {
        self.progress.insert(video_id.to_string(), record);
        let _ = self.save_tx.send(self.progress.clone());
        self.emit(PlayerEvent::ProgressSaved {
            video_id: video_id.to_string(),
        });
    }

    fn enter_playing(&mut self) {
        let (video, position, duration) = match &self.session {
            Some(session) => (session.video.clone(), session.position, session.duration),
            None => return,
        };
        self.set_state(PlayerState::Playing {
            video,
            position,
            duration,
        });
    }

    fn enter_paused(&mut self) {
        let (video, position, duration) = match &self.session {
            Some(session) => (session.video.clone(), session.position, session.duration),
            None => return,
        };
        self.set_state(PlayerState::Paused {
            video,
            position,
            duration,
        });
    }

    fn settle_with_nothing(&mut self) {
        self.dispose_session();
        if !matches!(self.state, PlayerState::NothingToPlay) {
            self.set_state(PlayerState::NothingToPlay);
        }
    }

    fn dispose_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(
                "Disposing playback session for {} (generation {})",
                session.video.id, session.generation
            );
            session.dispose();
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        self.state = state.clone();
        self.emit(PlayerEvent::StateChanged { state });
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    fn adapter_mut(&mut self) -> Option<&mut Box<dyn PlaybackAdapter>> {
        self.session.as_mut().and_then(|s| s.adapter.as_mut())
    }

    fn current_video_id(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.video.id.clone())
            .unwrap_or_default()
    }
}
