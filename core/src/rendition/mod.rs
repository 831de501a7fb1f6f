mod cache;
pub mod path;

use serde::Serialize;

pub use cache::RenditionCache;

/// A display sized version of an asset, or the original itself for vector images,
/// in which case the dimensions are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendition {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
