use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Backend kind a catalog entry plays through.
///
/// Wire tokens are `embed`, `file` and `hls`; anything else decodes to
/// `Unknown` so a single bad entry can be skipped at selection time instead
/// of failing the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    #[serde(rename = "embed")]
    EmbeddedStream,
    #[serde(rename = "file")]
    ProgressiveFile,
    #[serde(rename = "hls")]
    AdaptiveStream,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VideoKind::EmbeddedStream => "embed",
            VideoKind::ProgressiveFile => "file",
            VideoKind::AdaptiveStream => "hls",
            VideoKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One playable catalog entry.
///
/// `url` is kind-dependent: a watch/short URL for embedded streams, a direct
/// file URL for progressive files, a manifest URL for adaptive streams.
/// `must_watch`, `protected` and `order` are administrative metadata carried
/// through untouched; playback ordering uses `created_at` only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    #[serde(rename = "subtitles", default, skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    #[serde(default)]
    pub must_watch: bool,
    #[serde(default)]
    pub protected: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Everything a catalog fetch yields: the playable entries plus an opaque
/// settings object the embedding shell may interpret (the engine never does).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "CatalogWire")]
pub struct Catalog {
    pub videos: Vec<Video>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// The endpoint historically served either a bare array of videos or a
/// `{ settings, videos }` object; both must keep decoding.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogWire {
    Wrapped {
        #[serde(default)]
        settings: Map<String, Value>,
        #[serde(default)]
        videos: Vec<Video>,
    },
    Bare(Vec<Video>),
}

impl From<CatalogWire> for Catalog {
    fn from(wire: CatalogWire) -> Self {
        match wire {
            CatalogWire::Wrapped { settings, videos } => Catalog { videos, settings },
            CatalogWire::Bare(videos) => Catalog {
                videos,
                settings: Map::new(),
            },
        }
    }
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}
