pub mod events;
mod session;
pub mod service;

pub use events::{PlayerEvent, PlayerEventHandle, PlaylistEntry, PlaylistSnapshot};
pub use service::{PlayerCommand, PlayerHandle, PlayerService, PlayerState};
