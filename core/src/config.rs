use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use eyre::{bail, eyre, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    processing::image::Size,
    rendition::RenditionCache,
    storage::MediaStorage,
    validation::{FileValidator, DEFAULT_MAX_FILE_SIZE},
};

/// Overrides `Upload.max_file_size`. Plain integers count in units of 1000 KiB.
pub const MAX_FILE_SIZE_ENV: &str = "DDAM_ASSET_MAX_FILESIZE";

const DEFAULT_ALLOWED_EXTENSIONS: [&str; 5] = ["svg", "jpg", "jpeg", "png", "webp"];
const DEFAULT_ORGANIZATION_NAME: &str = "A Company that Makes Everything";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum TomlFileSize {
    Bytes(u64),
    Expr(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlMedia {
    root: Option<String>,
    url: Option<String>,
    upload_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlUpload {
    allowed_extensions: Option<Vec<String>>,
    max_file_size: Option<TomlFileSize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRendition {
    dir: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlServer {
    address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBranding {
    organization_name_en: Option<String>,
    organization_name_de: Option<String>,
    abbreviation: Option<String>,
    street: Option<String>,
    zip_code: Option<String>,
    city: Option<String>,
    url: Option<String>,
    logo: Option<String>,
    figurative_mark: Option<String>,
    favicon: Option<String>,
    documentation_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct TomlConfig {
    #[serde(rename = "Media", default)]
    pub media: TomlMedia,
    #[serde(rename = "Upload", default)]
    pub upload: TomlUpload,
    #[serde(rename = "Rendition", default)]
    pub rendition: TomlRendition,
    #[serde(rename = "Server", default)]
    pub server: TomlServer,
    #[serde(rename = "Branding", default)]
    pub branding: TomlBranding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    pub root: PathBuf,
    /// URL prefix media files are served under.
    pub url: String,
    /// Originals go here, relative to `root`.
    pub upload_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionConfig {
    pub root: PathBuf,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

/// Organization details shown by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branding {
    pub organization_name_en: String,
    pub organization_name_de: String,
    pub abbreviation: String,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub url: Option<String>,
    pub logo: Option<String>,
    pub figurative_mark: Option<String>,
    pub favicon: Option<String>,
    pub documentation_url: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Branding {
            organization_name_en: DEFAULT_ORGANIZATION_NAME.to_owned(),
            organization_name_de: DEFAULT_ORGANIZATION_NAME.to_owned(),
            abbreviation: "ACME".to_owned(),
            street: None,
            zip_code: None,
            city: None,
            url: None,
            logo: None,
            figurative_mark: None,
            favicon: None,
            documentation_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub media: MediaConfig,
    pub upload: UploadConfig,
    pub rendition: RenditionConfig,
    pub server: ServerConfig,
    pub branding: Branding,
}

impl Config {
    pub fn validator(&self) -> FileValidator {
        FileValidator::new(&self.upload.allowed_extensions, self.upload.max_file_size)
    }

    pub fn media_storage(&self) -> MediaStorage {
        MediaStorage::new(self.media.root.clone(), &self.media.url)
    }

    pub fn rendition_cache(&self) -> RenditionCache {
        RenditionCache::new(
            self.media_storage(),
            self.rendition.root.clone(),
            self.rendition.size,
        )
    }
}

pub async fn read_config(path: &Path) -> Result<Config> {
    let toml_str = tokio::fs::read_to_string(path)
        .await
        .context(format!("Error reading config file {}", path))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let env_max_file_size = std::env::var(MAX_FILE_SIZE_ENV).ok();
    parse_config(&toml_str, base_dir, env_max_file_size.as_deref())
        .context(format!("Error in config file {}", path))
}

/// Relative paths in `toml_str` are resolved against `base_dir`.
pub fn parse_config(
    toml_str: &str,
    base_dir: &Path,
    env_max_file_size: Option<&str>,
) -> Result<Config> {
    let toml_config: TomlConfig = toml::from_str(toml_str).context("Error parsing config file")?;

    let media = {
        let root = toml_config.media.root.unwrap_or_else(|| "media".to_owned());
        let url = toml_config.media.url.unwrap_or_else(|| "/media".to_owned());
        if !url.starts_with('/') && !url.contains("://") {
            bail!("Media.url must be an absolute path or URL, got '{}'", url);
        }
        let upload_dir = toml_config
            .media
            .upload_dir
            .unwrap_or_else(|| "assets".to_owned());
        MediaConfig {
            root: base_dir.join(root),
            url,
            upload_dir,
        }
    };

    let upload = {
        let allowed_extensions: Vec<String> = match toml_config.upload.allowed_extensions {
            Some(exts) => exts
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        };
        if allowed_extensions.iter().any(|ext| ext.is_empty()) {
            bail!("Upload.allowed_extensions contains an empty extension");
        }
        let max_file_size = match env_max_file_size {
            Some(value) => parse_env_file_size(value)
                .with_context(|| format!("Invalid value for {}", MAX_FILE_SIZE_ENV))?,
            None => match toml_config.upload.max_file_size {
                Some(TomlFileSize::Bytes(bytes)) => bytes,
                Some(TomlFileSize::Expr(expr)) => parse_size::parse_size(&expr)
                    .with_context(|| format!("Invalid Upload.max_file_size '{}'", expr))?,
                None => DEFAULT_MAX_FILE_SIZE,
            },
        };
        UploadConfig {
            allowed_extensions,
            max_file_size,
        }
    };

    let rendition = {
        let dir = toml_config
            .rendition
            .dir
            .unwrap_or_else(|| "renditions".to_owned());
        let size = Size {
            width: toml_config.rendition.width.unwrap_or(600),
            height: toml_config.rendition.height.unwrap_or(300),
        };
        if size.width == 0 || size.height == 0 {
            bail!(
                "Rendition width and height must be at least 1, got {}x{}",
                size.width,
                size.height
            );
        }
        RenditionConfig {
            root: media.root.join(dir),
            size,
        }
    };

    let server = ServerConfig {
        address: toml_config
            .server
            .address
            .unwrap_or_else(|| "127.0.0.1".to_owned()),
        port: toml_config.server.port.unwrap_or(8000),
    };

    let branding = read_branding(toml_config.branding)?;

    Ok(Config {
        media,
        upload,
        rendition,
        server,
        branding,
    })
}

fn parse_env_file_size(value: &str) -> Result<u64> {
    let value = value.trim();
    match value.parse::<u64>() {
        Ok(n) => n
            .checked_mul(1000 * 1024)
            .ok_or_else(|| eyre!("{} is too large", value)),
        Err(_) => Ok(parse_size::parse_size(value)?),
    }
}

fn read_branding(toml: TomlBranding) -> Result<Branding> {
    let defaults = Branding::default();
    let svg_only = FileValidator::new(&["svg"], u64::MAX);
    for (key, value) in [
        ("logo", &toml.logo),
        ("figurative_mark", &toml.figurative_mark),
        ("favicon", &toml.favicon),
    ] {
        if let Some(file) = value {
            svg_only
                .validate_extension(file)
                .wrap_err_with(|| format!("Invalid Branding.{}", key))?;
        }
    }
    Ok(Branding {
        organization_name_en: toml
            .organization_name_en
            .unwrap_or(defaults.organization_name_en),
        organization_name_de: toml
            .organization_name_de
            .unwrap_or(defaults.organization_name_de),
        abbreviation: toml.abbreviation.unwrap_or(defaults.abbreviation),
        street: toml.street,
        zip_code: toml.zip_code,
        city: toml.city,
        url: toml.url,
        logo: toml.logo,
        figurative_mark: toml.figurative_mark,
        favicon: toml.favicon,
        documentation_url: toml.documentation_url,
    })
}

#[cfg(test)]
mod test {
    use claims::assert_ok;
    use pretty_assertions::assert_eq;

    use super::*;

    fn base() -> &'static Path {
        Path::new("/srv/ddam")
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = assert_ok!(parse_config("", base(), None));
        assert_eq!(
            config,
            Config {
                media: MediaConfig {
                    root: "/srv/ddam/media".into(),
                    url: "/media".into(),
                    upload_dir: "assets".into(),
                },
                upload: UploadConfig {
                    allowed_extensions: vec![
                        "svg".into(),
                        "jpg".into(),
                        "jpeg".into(),
                        "png".into(),
                        "webp".into()
                    ],
                    max_file_size: 3000 * 1024,
                },
                rendition: RenditionConfig {
                    root: "/srv/ddam/media/renditions".into(),
                    size: Size {
                        width: 600,
                        height: 300
                    },
                },
                server: ServerConfig {
                    address: "127.0.0.1".into(),
                    port: 8000,
                },
                branding: Branding::default(),
            }
        );
    }

    #[test]
    fn reads_all_sections() {
        let toml = r#"
[Media]
root = "/var/lib/ddam"
url = "/files/"
upload_dir = "uploads"

[Upload]
allowed_extensions = [".PNG", "Jpg"]
max_file_size = "5 MiB"

[Rendition]
dir = "thumbs"
width = 320
height = 200

[Server]
address = "0.0.0.0"
port = 9000

[Branding]
organization_name_en = "Example Corp"
abbreviation = "EX"
logo = "branding/logo.svg"
"#;
        let config = assert_ok!(parse_config(toml, base(), None));
        assert_eq!(config.media.root, "/var/lib/ddam");
        assert_eq!(config.media.upload_dir, "uploads");
        assert_eq!(config.upload.allowed_extensions, vec!["png", "jpg"]);
        assert_eq!(config.upload.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.rendition.root, "/var/lib/ddam/thumbs");
        assert_eq!(
            config.rendition.size,
            Size {
                width: 320,
                height: 200
            }
        );
        assert_eq!(
            config.server,
            ServerConfig {
                address: "0.0.0.0".into(),
                port: 9000
            }
        );
        assert_eq!(config.branding.organization_name_en, "Example Corp");
        assert_eq!(config.branding.organization_name_de, DEFAULT_ORGANIZATION_NAME);
        assert_eq!(config.branding.abbreviation, "EX");
        assert_eq!(config.branding.logo.as_deref(), Some("branding/logo.svg"));
        let url = assert_ok!(config
            .media_storage()
            .public_url(&config.media.root.join("a.png")));
        assert_eq!(url, "/files/a.png");
    }

    #[test]
    fn plain_integer_file_size_is_bytes() {
        let config = assert_ok!(parse_config("[Upload]\nmax_file_size = 1234", base(), None));
        assert_eq!(config.upload.max_file_size, 1234);
    }

    #[test]
    fn env_override_counts_in_thousand_kib() {
        let toml = "[Upload]\nmax_file_size = 1234";
        let config = assert_ok!(parse_config(toml, base(), Some("3")));
        assert_eq!(config.upload.max_file_size, 3 * 1000 * 1024);
        let config = assert_ok!(parse_config(toml, base(), Some("2 KiB")));
        assert_eq!(config.upload.max_file_size, 2048);
        assert!(parse_config(toml, base(), Some("lots")).is_err());
    }

    #[test]
    fn rejects_empty_rendition_box() {
        assert!(parse_config("[Rendition]\nwidth = 0", base(), None).is_err());
    }

    #[test]
    fn branding_images_must_be_svg() {
        let err = parse_config("[Branding]\nfavicon = \"favicon.ico\"", base(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("Branding.favicon"));
        assert_ok!(parse_config("[Branding]\nfavicon = \"favicon.SVG\"", base(), None));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_config("[Media]\nrot = \"typo\"", base(), None).is_err());
    }

    #[tokio::test]
    async fn read_config_resolves_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = PathBuf::try_from(dir.path().to_path_buf()).expect("tempdir paths should be UTF8");
        let config_path = dir_path.join("ddam.toml");
        tokio::fs::write(&config_path, "[Media]\nroot = \"data\"\n")
            .await
            .unwrap();
        let config = assert_ok!(read_config(&config_path).await);
        assert_eq!(config.media.root, dir_path.join("data"));
        assert!(read_config(&dir_path.join("missing.toml")).await.is_err());
    }
}
