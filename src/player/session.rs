use crate::adapter::PlaybackAdapter;
use crate::catalog::Video;

/// One playback attempt: the selected video plus the adapter driving it.
///
/// The service holds at most one session and disposes it before creating the
/// next, so two adapters never run at once. `generation` ties the session to
/// the events its adapter emits; `adapter` stays `None` while construction
/// is still in flight on its build task.
pub struct PlaybackSession {
    pub video: Video,
    pub generation: u64,
    pub adapter: Option<Box<dyn PlaybackAdapter>>,
    /// The backend reported ready; held until the adapter lands too.
    pub surface_ready: bool,
    /// Seek target applied when the session becomes ready. Zero for seen
    /// videos, the recorded position for partially watched ones.
    pub resume_from: f64,
    pub position: f64,
    pub duration: f64,
    /// Position at the last persisted write. Starts at zero each session, so
    /// a resumed video writes once early and then settles into the throttle.
    pub last_saved_position: f64,
}

impl PlaybackSession {
    pub fn new(video: Video, generation: u64, resume_from: f64) -> Self {
        Self {
            video,
            generation,
            adapter: None,
            surface_ready: false,
            resume_from,
            position: 0.0,
            duration: 0.0,
            last_saved_position: 0.0,
        }
    }

    pub fn dispose(&mut self) {
        if let Some(adapter) = &mut self.adapter {
            adapter.dispose();
        }
    }
}
