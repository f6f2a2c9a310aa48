// Library exports for embedding shells and integration tests

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod player;
pub mod progress;
pub mod selection;
pub mod surface;

// The everyday surface: start a player, hold its handle, watch its events.
pub use adapter::PlaybackFault;
pub use catalog::{Catalog, CatalogSource, HttpCatalogSource, Video, VideoKind};
pub use config::PlayerConfig;
pub use player::{PlayerEvent, PlayerHandle, PlayerService, PlayerState, PlaylistSnapshot};
pub use progress::{JsonProgressStore, ProgressStore};
pub use surface::SurfaceProvider;

// Test support (only available with test-utils feature)
#[cfg(feature = "test-utils")]
pub mod test_support;
