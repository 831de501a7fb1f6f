use std::io::{BufReader, Cursor, Write};

use camino::Utf8Path as Path;
use eyre::{eyre, Context};
use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ThumbnailParams<'a> {
    pub in_path: &'a Path,
    pub out_path: &'a Path,
    /// Output fits inside this box.
    pub bounding_box: Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResult {
    pub actual_size: Size,
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("could not decode image {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{0:#}")]
    Other(eyre::Report),
}

impl From<eyre::Report> for ThumbnailError {
    fn from(report: eyre::Report) -> Self {
        ThumbnailError::Other(report)
    }
}

/// Size of an image scaled down to fit `bounds` with its aspect ratio kept.
/// Images that already fit are left as they are.
pub fn fit_within(size: Size, bounds: Size) -> Size {
    if size.width <= bounds.width && size.height <= bounds.height {
        return size;
    }
    let scale = f64::min(
        bounds.width as f64 / size.width as f64,
        bounds.height as f64 / size.height as f64,
    );
    let scaled = |len: u32, bound: u32| ((len as f64 * scale).round() as u32).clamp(1, bound.max(1));
    Size {
        width: scaled(size.width, bounds.width),
        height: scaled(size.height, bounds.height),
    }
}

/// Decodes `in_path`, scales it into the bounding box and writes it to `out_path` as WebP.
/// The output is written to a temporary file next to `out_path` and renamed into place,
/// so `out_path` either does not exist or holds a complete image.
#[tracing::instrument(level = "debug")]
pub fn generate_thumbnail(params: ThumbnailParams<'_>) -> Result<ThumbnailResult, ThumbnailError> {
    let decode_err = |source| ThumbnailError::Decode {
        path: params.in_path.to_string(),
        source,
    };
    let file = std::fs::File::open(params.in_path)
        .wrap_err_with(|| format!("could not open {} for reading", params.in_path))?;
    let image = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .wrap_err_with(|| format!("could not read {}", params.in_path))?
        .decode()
        .map_err(decode_err)?;

    let orig_size = Size {
        width: image.width(),
        height: image.height(),
    };
    let actual_size = fit_within(orig_size, params.bounding_box);
    let image = if actual_size == orig_size {
        image
    } else {
        image.resize_exact(actual_size.width, actual_size.height, FilterType::Lanczos3)
    };
    tracing::debug!(?orig_size, ?actual_size, "scaled image");

    // lossless: the image crate ships no lossy WebP encoder
    let encoded = encode_webp(&image)?;
    write_atomic(params.out_path, &encoded)?;
    Ok(ThumbnailResult { actual_size })
}

/// Reads the pixel dimensions from the image header without decoding it.
pub fn get_image_size(path: &Path) -> eyre::Result<Size> {
    let (width, height) = image::image_dimensions(path)
        .wrap_err_with(|| format!("could not read image dimensions of {}", path))?;
    Ok(Size { width, height })
}

fn encode_webp(image: &DynamicImage) -> eyre::Result<Vec<u8>> {
    // the WebP encoder only takes 8 bit RGB(A)
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        .wrap_err("error encoding WebP image")?;
    Ok(buf)
}

fn write_atomic(path: &Path, content: &[u8]) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre!("output path {} has no parent directory", path))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".rendition")
        .suffix(".tmp")
        .tempfile_in(dir)
        .wrap_err("could not create temp file")?;
    temp.write_all(content)
        .wrap_err("error writing image to temp file")?;
    temp.persist(path)
        .wrap_err_with(|| format!("could not move image to {}", path))?;
    Ok(())
}
