use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};

/// Extension appended to the original file name, renditions are always WebP.
pub const RENDITION_EXTENSION: &str = "webp";

/// `<rendition_root>/<original file name>.webp`. Only depends on the file name
/// of `original`, so originals with the same name in different directories share
/// a rendition path.
pub fn rendition_path(rendition_root: &Path, original: &Path) -> PathBuf {
    let basename = original.file_name().unwrap_or(original.as_str());
    rendition_root.join(format!("{}.{}", basename, RENDITION_EXTENSION))
}

pub fn is_svg(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn appends_webp_to_original_name() {
        assert_eq!(
            rendition_path(
                Path::new("/srv/media/renditions"),
                Path::new("/srv/media/assets/harbour.JPG")
            ),
            PathBuf::from("/srv/media/renditions/harbour.JPG.webp")
        );
    }

    #[test]
    fn svg_detection_ignores_case() {
        assert!(is_svg(Path::new("assets/logo.SVG")));
        assert!(is_svg(Path::new("logo.svg")));
        assert!(!is_svg(Path::new("logo.svg.png")));
        assert!(!is_svg(Path::new("svg")));
    }

    proptest! {
        #[test]
        fn prop_rendition_path_is_deterministic_and_under_root(
            dir in "[a-z]{1,8}(/[a-z]{1,8}){0,3}",
            name in "[a-zA-Z0-9_-]{1,16}\\.(png|jpg|webp|svg)",
        ) {
            let root = Path::new("/media/renditions");
            let original = PathBuf::from(format!("/media/{dir}/{name}"));
            let first = rendition_path(root, &original);
            prop_assert_eq!(&first, &rendition_path(root, &original));
            prop_assert_eq!(first.parent(), Some(root));
            let expected_name = format!("{name}.webp");
            prop_assert_eq!(first.file_name(), Some(expected_name.as_str()));
        }
    }
}
