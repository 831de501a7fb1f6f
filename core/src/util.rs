/// Byte count that displays itself human readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileSize(pub u64);

impl std::fmt::Display for FileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_file_size(self.0))
    }
}

const KB: u64 = 1 << 10;
const MB: u64 = 1 << 20;
const GB: u64 = 1 << 30;
const TB: u64 = 1 << 40;
const PB: u64 = 1 << 50;

/// Human readable file size with 1024-based units and one decimal,
/// e.g. `2.9 MB` or `17 bytes`.
pub fn format_file_size(bytes: u64) -> String {
    let scaled = |unit: u64| bytes as f64 / unit as f64;
    match bytes {
        1 => "1 byte".to_string(),
        b if b < KB => format!("{} bytes", b),
        b if b < MB => format!("{:.1} KB", scaled(KB)),
        b if b < GB => format!("{:.1} MB", scaled(MB)),
        b if b < TB => format!("{:.1} GB", scaled(GB)),
        b if b < PB => format!("{:.1} TB", scaled(TB)),
        _ => format!("{:.1} PB", scaled(PB)),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::format_file_size;

    #[test]
    fn formats_sizes_like_the_upload_form() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(1), "1 byte");
        assert_eq!(format_file_size(1023), "1023 bytes");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(3000 * 1024), "2.9 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * (1 << 30)), "3.0 GB");
    }
}
