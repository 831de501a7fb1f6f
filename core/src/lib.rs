pub mod config;
pub mod intake;
pub mod mime_type;
pub mod model;
mod processing;
pub mod rendition;
pub mod storage;
pub mod util;
pub mod validation;

pub use processing::image::Size;
pub use rendition::{Rendition, RenditionCache};
pub use validation::{FileValidator, UploadedFile, ValidationError};
