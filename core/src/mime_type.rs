use std::{
    borrow::Cow,
    io::{Cursor, ErrorKind},
};

use image::{ImageError, ImageFormat, ImageReader};

use crate::validation::SNIFF_LEN;

pub const SVG: &str = "image/svg+xml";
pub const XML: &str = "text/xml";
pub const TEXT: &str = "text/plain";
pub const EMPTY: &str = "application/x-empty";
pub const OCTET_STREAM: &str = "application/octet-stream";

pub fn guess_mime_type(file_ext: &str) -> Option<&'static str> {
    match file_ext {
        "svg" => Some(SVG),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "avif" => Some("image/avif"),
        "tif" | "tiff" => Some("image/tiff"),
        "bmp" => Some("image/bmp"),
        "ico" => Some("image/x-icon"),
        _ => None,
    }
}

/// MIME types for a list of file extensions, in order and without duplicates.
/// Extensions with no known MIME type are skipped.
pub fn mime_types_for_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<&'static str> {
    let mut mime_types: Vec<&'static str> = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
        if let Some(mime) = guess_mime_type(&ext) {
            if !mime_types.contains(&mime) {
                mime_types.push(mime);
            }
        }
    }
    mime_types
}

/// Classify a file by its leading bytes, ignoring whatever its name claims.
pub fn sniff_mime_type(head: &[u8]) -> Cow<'static, str> {
    if head.is_empty() {
        return Cow::Borrowed(EMPTY);
    }
    if let Ok(format) = image::guess_format(head) {
        if !has_weak_signature(format) || header_parses(head, format) {
            return Cow::Borrowed(format.to_mime_type());
        }
    }
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        // the buffer may end in the middle of a multibyte character
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&head[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return Cow::Borrowed(OCTET_STREAM),
    };
    if text.contains('\0') {
        return Cow::Borrowed(OCTET_STREAM);
    }
    match xml_root(text) {
        XmlRoot::Svg => Cow::Borrowed(SVG),
        XmlRoot::Other => Cow::Borrowed(XML),
        XmlRoot::NotXml => Cow::Borrowed(TEXT),
    }
}

/// Formats recognized by two or three leading bytes, which plain text can start with.
fn has_weak_signature(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Bmp | ImageFormat::Ico | ImageFormat::Pnm)
}

fn header_parses(head: &[u8], format: ImageFormat) -> bool {
    match ImageReader::with_format(Cursor::new(head), format).into_dimensions() {
        Ok(_) => true,
        // the file goes on past the sniffed bytes
        Err(ImageError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
            head.len() >= SNIFF_LEN
        }
        Err(_) => false,
    }
}

enum XmlRoot {
    Svg,
    Other,
    NotXml,
}

/// Skips the prolog (BOM, XML declaration, comments, doctype) and looks at the first element.
fn xml_root(text: &str) -> XmlRoot {
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();
    let mut saw_prolog = false;
    loop {
        let (open, close) = if rest.starts_with("<?") {
            ("<?", "?>")
        } else if rest.starts_with("<!--") {
            ("<!--", "-->")
        } else if rest.starts_with("<!") {
            ("<!", ">")
        } else {
            break;
        };
        saw_prolog = true;
        match rest[open.len()..].find(close) {
            Some(end) => rest = rest[open.len() + end + close.len()..].trim_start(),
            // prolog continues past the sniffed bytes
            None => return XmlRoot::Other,
        }
    }
    let is_svg_root = rest
        .get(..4)
        .map(|tag| tag.eq_ignore_ascii_case("<svg"))
        .unwrap_or(false)
        && rest[4..]
            .chars()
            .next()
            .map(|c| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(true);
    if is_svg_root {
        XmlRoot::Svg
    } else if saw_prolog || (rest.starts_with('<') && rest.trim_end().ends_with('>')) {
        XmlRoot::Other
    } else {
        XmlRoot::NotXml
    }
}
