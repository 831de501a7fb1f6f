use std::io::ErrorKind;

use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    processing::image::{
        thumbnail::{ThumbnailError, ThumbnailParams},
        generate_thumbnail, get_image_size, Size,
    },
    storage::MediaStorage,
};

use super::{
    path::{is_svg, rendition_path},
    Rendition,
};

/// Thumbnails of originals under the media root, kept as files in `rendition_root`.
///
/// A rendition is generated on first access and served from disk afterwards until
/// it is deleted. No locking is done: concurrent misses for the same original both
/// generate it, and since generation is deterministic whichever write lands last
/// is identical to the other.
#[derive(Debug, Clone)]
pub struct RenditionCache {
    media: MediaStorage,
    rendition_root: PathBuf,
    bounding_box: Size,
}

impl RenditionCache {
    pub fn new(media: MediaStorage, rendition_root: PathBuf, bounding_box: Size) -> RenditionCache {
        RenditionCache {
            media,
            rendition_root,
            bounding_box,
        }
    }

    pub fn rendition_root(&self) -> &Path {
        &self.rendition_root
    }

    pub fn bounding_box(&self) -> Size {
        self.bounding_box
    }

    pub fn rendition_path(&self, original: &Path) -> PathBuf {
        rendition_path(&self.rendition_root, original)
    }

    /// Rendition for `original` at its canonical rendition path.
    pub fn get(&self, original: &Path) -> Result<Option<Rendition>> {
        let rendition_path = self.rendition_path(original);
        self.get_or_create(original, &rendition_path)
    }

    /// Returns the rendition stored at `rendition_path`, generating it from `original`
    /// if it does not exist yet.
    ///
    /// SVGs are not rasterized, their rendition is the original file without dimensions.
    /// `Ok(None)` means the original could not be decoded and there is no thumbnail for it.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn get_or_create(
        &self,
        original: &Path,
        rendition_path: &Path,
    ) -> Result<Option<Rendition>> {
        if is_svg(original) {
            return Ok(Some(Rendition {
                url: self.media.public_url(original)?,
                width: None,
                height: None,
            }));
        }
        let url = self.media.public_url(rendition_path)?;

        if rendition_path.is_file() {
            match get_image_size(rendition_path) {
                Ok(size) => {
                    debug!("using existing rendition");
                    return Ok(Some(rendition(url, size)));
                }
                Err(err) => {
                    warn!(
                        "existing rendition {} is unreadable, generating a new one: {:#}",
                        rendition_path, err
                    );
                }
            }
        }

        if let Some(parent) = rendition_path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("could not create rendition directory {}", parent))?;
        }
        let params = ThumbnailParams {
            in_path: original,
            out_path: rendition_path,
            bounding_box: self.bounding_box,
        };
        match generate_thumbnail(params) {
            Ok(result) => {
                info!(size = ?result.actual_size, "generated rendition {}", rendition_path);
                Ok(Some(rendition(url, result.actual_size)))
            }
            Err(ThumbnailError::Decode { path, source }) => {
                warn!("cannot create rendition for {}: {}", path, source);
                Ok(None)
            }
            Err(ThumbnailError::Other(report)) => {
                Err(report.wrap_err(format!("error creating rendition for {}", original)))
            }
        }
    }

    /// Removes the rendition of `original` so that it is generated again on next access.
    /// Returns `false` if there was none.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn delete(&self, original: &Path) -> Result<bool> {
        let rendition_path = self.rendition_path(original);
        match std::fs::remove_file(&rendition_path) {
            Ok(()) => {
                info!("deleted rendition {}", rendition_path);
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).wrap_err_with(|| format!("could not delete rendition {}", rendition_path))
            }
        }
    }

    /// Deletes the renditions of all `originals` and returns how many were removed.
    /// Failures are logged and skipped.
    pub fn purge<'a>(&self, originals: impl IntoIterator<Item = &'a Path>) -> usize {
        let mut purged = 0;
        for original in originals {
            match self.delete(original) {
                Ok(true) => purged += 1,
                Ok(false) => {}
                Err(err) => warn!("error purging rendition of {}: {:#}", original, err),
            }
        }
        info!(purged, "purged renditions");
        purged
    }
}

fn rendition(url: String, size: Size) -> Rendition {
    Rendition {
        url,
        width: Some(size.width),
        height: Some(size.height),
    }
}
