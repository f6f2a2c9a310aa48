pub mod source;
pub mod types;

pub use source::{CatalogError, CatalogSource, HttpCatalogSource};
pub use types::{Catalog, Video, VideoKind};
