// Test support utilities for both unit and integration tests

use crate::catalog::{Catalog, CatalogError, CatalogSource};
use crate::progress::{ProgressError, ProgressMap, ProgressStore};
use crate::surface::{
    AdaptiveEngine, AdaptiveTuning, ElementEvent, EmbedEvent, EmbedPlayer, EmbedRequest,
    EngineEvent, MediaElement, MediaRequest, SurfaceError, SurfaceProvider,
};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Catalog source serving an in-memory catalog.
///
/// The catalog can be swapped between loads to exercise refresh behavior,
/// and the next load can be scripted to fail.
pub struct StaticCatalogSource {
    catalog: Mutex<Catalog>,
    fail_next: AtomicBool,
}

impl StaticCatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        StaticCatalogSource {
            catalog: Mutex::new(catalog),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn with_videos(videos: Vec<crate::catalog::Video>) -> Self {
        Self::new(Catalog {
            videos,
            settings: serde_json::Map::new(),
        })
    }

    pub fn set_videos(&self, videos: Vec<crate::catalog::Video>) {
        self.catalog.lock().unwrap().videos = videos;
    }

    pub fn fail_next_load(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<Catalog, CatalogError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CatalogError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(self.catalog.lock().unwrap().clone())
    }
}

/// Progress store that persists to memory and counts writes.
#[derive(Default)]
pub struct MemoryProgressStore {
    map: Mutex<ProgressMap>,
    saves: AtomicUsize,
    next_save_delay: Mutex<Option<Duration>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(map: ProgressMap) -> Self {
        MemoryProgressStore {
            map: Mutex::new(map),
            saves: AtomicUsize::new(0),
            next_save_delay: Mutex::new(None),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> ProgressMap {
        self.map.lock().unwrap().clone()
    }

    /// Script a delay applied to the next save only.
    pub fn delay_next_save(&self, delay: Duration) {
        *self.next_save_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait::async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load(&self) -> Result<ProgressMap, ProgressError> {
        Ok(self.map.lock().unwrap().clone())
    }

    async fn save(&self, progress: &ProgressMap) -> Result<(), ProgressError> {
        let delay = self.next_save_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *self.map.lock().unwrap() = progress.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Control calls recorded by the scripted surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Play,
    Pause,
    SeekTo(f64),
    RequestFullscreen,
    Dispose,
    StartLoad,
    RecoverMedia,
    Destroy,
}

struct SurfaceState {
    calls: Vec<SurfaceCall>,
    position: f64,
    duration: f64,
    paused: bool,
    recover_ok: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        SurfaceState {
            calls: Vec::new(),
            position: 0.0,
            duration: 0.0,
            // Real backends start paused and wait for play().
            paused: true,
            recover_ok: true,
        }
    }
}

impl SurfaceState {
    fn record(&mut self, call: SurfaceCall) {
        self.calls.push(call);
    }
}

/// Test-side handle to one scripted embed player: feed it native events,
/// inspect the control calls the player made on it.
#[derive(Clone)]
pub struct ScriptedEmbedHandle {
    pub request: EmbedRequest,
    events: mpsc::UnboundedSender<EmbedEvent>,
    state: Arc<Mutex<SurfaceState>>,
}

impl ScriptedEmbedHandle {
    pub fn emit(&self, event: EmbedEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn disposed(&self) -> bool {
        self.calls().contains(&SurfaceCall::Dispose)
    }
}

/// Test-side handle to one scripted media element.
#[derive(Clone)]
pub struct ScriptedElementHandle {
    pub request: MediaRequest,
    events: mpsc::UnboundedSender<ElementEvent>,
    state: Arc<Mutex<SurfaceState>>,
}

impl ScriptedElementHandle {
    pub fn emit(&self, event: ElementEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn disposed(&self) -> bool {
        self.calls().contains(&SurfaceCall::Dispose)
    }

    /// Script what the element reports for position and duration queries.
    pub fn set_clock(&self, position: f64, duration: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.duration = duration;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub fn last_seek(&self) -> Option<f64> {
        self.calls().iter().rev().find_map(|call| match call {
            SurfaceCall::SeekTo(position) => Some(*position),
            _ => None,
        })
    }
}

/// Test-side handle to one scripted adaptive engine.
#[derive(Clone)]
pub struct ScriptedEngineHandle {
    pub manifest_url: String,
    events: mpsc::UnboundedSender<EngineEvent>,
    state: Arc<Mutex<SurfaceState>>,
}

impl ScriptedEngineHandle {
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn start_load_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SurfaceCall::StartLoad))
            .count()
    }

    pub fn destroyed(&self) -> bool {
        self.calls().contains(&SurfaceCall::Destroy)
    }

    /// Script whether `recover_media` succeeds.
    pub fn set_recover_media(&self, ok: bool) {
        self.state.lock().unwrap().recover_ok = ok;
    }
}

struct ScriptedEmbed {
    state: Arc<Mutex<SurfaceState>>,
}

#[async_trait::async_trait]
impl EmbedPlayer for ScriptedEmbed {
    fn play(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.record(SurfaceCall::Play);
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.record(SurfaceCall::Pause);
    }

    fn seek_to(&mut self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.record(SurfaceCall::SeekTo(position));
    }

    async fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    async fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    async fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn request_fullscreen(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::RequestFullscreen);
    }

    fn dispose(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::Dispose);
    }
}

struct ScriptedElement {
    state: Arc<Mutex<SurfaceState>>,
}

#[async_trait::async_trait]
impl MediaElement for ScriptedElement {
    fn play(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.record(SurfaceCall::Play);
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.record(SurfaceCall::Pause);
    }

    fn set_position(&mut self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.record(SurfaceCall::SeekTo(position));
    }

    async fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    async fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    async fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn request_fullscreen(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::RequestFullscreen);
    }

    fn dispose(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::Dispose);
    }
}

struct ScriptedEngine {
    state: Arc<Mutex<SurfaceState>>,
}

impl AdaptiveEngine for ScriptedEngine {
    fn start_load(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::StartLoad);
    }

    fn recover_media(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.record(SurfaceCall::RecoverMedia);
        state.recover_ok
    }

    fn destroy(&mut self) {
        self.state.lock().unwrap().record(SurfaceCall::Destroy);
    }
}

/// Surface provider whose surfaces are driven entirely by the test.
///
/// Every construction registers a handle the test can fetch to feed native
/// events and to assert on the control calls the player made. Construction
/// can be scripted to fail per surface kind.
#[derive(Default)]
pub struct MockSurfaceProvider {
    inner: Mutex<ProviderInner>,
}

#[derive(Default)]
struct ProviderInner {
    embeds: Vec<ScriptedEmbedHandle>,
    elements: Vec<ScriptedElementHandle>,
    engines: Vec<ScriptedEngineHandle>,
    fail_embeds: bool,
    fail_elements: bool,
    fail_engines: bool,
}

impl MockSurfaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed(&self, index: usize) -> Option<ScriptedEmbedHandle> {
        self.inner.lock().unwrap().embeds.get(index).cloned()
    }

    pub fn element(&self, index: usize) -> Option<ScriptedElementHandle> {
        self.inner.lock().unwrap().elements.get(index).cloned()
    }

    pub fn engine(&self, index: usize) -> Option<ScriptedEngineHandle> {
        self.inner.lock().unwrap().engines.get(index).cloned()
    }

    pub fn embed_count(&self) -> usize {
        self.inner.lock().unwrap().embeds.len()
    }

    pub fn element_count(&self) -> usize {
        self.inner.lock().unwrap().elements.len()
    }

    pub fn engine_count(&self) -> usize {
        self.inner.lock().unwrap().engines.len()
    }

    pub fn fail_embeds(&self, fail: bool) {
        self.inner.lock().unwrap().fail_embeds = fail;
    }

    pub fn fail_elements(&self, fail: bool) {
        self.inner.lock().unwrap().fail_elements = fail;
    }

    pub fn fail_engines(&self, fail: bool) {
        self.inner.lock().unwrap().fail_engines = fail;
    }
}

#[async_trait::async_trait]
impl SurfaceProvider for MockSurfaceProvider {
    async fn embed_player(
        &self,
        request: EmbedRequest,
        events: mpsc::UnboundedSender<EmbedEvent>,
    ) -> Result<Box<dyn EmbedPlayer>, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_embeds {
            return Err(SurfaceError::Creation(
                "embed construction scripted to fail".to_string(),
            ));
        }
        let state = Arc::new(Mutex::new(SurfaceState::default()));
        inner.embeds.push(ScriptedEmbedHandle {
            request,
            events,
            state: state.clone(),
        });
        Ok(Box::new(ScriptedEmbed { state }))
    }

    fn media_element(
        &self,
        request: MediaRequest,
        events: mpsc::UnboundedSender<ElementEvent>,
    ) -> Result<Box<dyn MediaElement>, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_elements {
            return Err(SurfaceError::Creation(
                "element construction scripted to fail".to_string(),
            ));
        }
        let state = Arc::new(Mutex::new(SurfaceState::default()));
        inner.elements.push(ScriptedElementHandle {
            request,
            events,
            state: state.clone(),
        });
        Ok(Box::new(ScriptedElement { state }))
    }

    fn adaptive_engine(
        &self,
        _element: &mut dyn MediaElement,
        manifest_url: &str,
        _tuning: &AdaptiveTuning,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn AdaptiveEngine>, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_engines {
            return Err(SurfaceError::Creation(
                "engine construction scripted to fail".to_string(),
            ));
        }
        let state = Arc::new(Mutex::new(SurfaceState::default()));
        inner.engines.push(ScriptedEngineHandle {
            manifest_url: manifest_url.to_string(),
            events,
            state: state.clone(),
        });
        Ok(Box::new(ScriptedEngine { state }))
    }
}
