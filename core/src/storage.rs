use std::io::{ErrorKind, Read};

use camino::{Utf8Component, Utf8Path as Path, Utf8PathBuf as PathBuf};
use eyre::{bail, Context, Result};
use itertools::Itertools;
use thiserror::Error;

/// Length of the random suffix appended to names that are already taken.
const NAME_SUFFIX_LEN: usize = 7;

#[derive(Debug, Error)]
pub enum StorageKeyError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("path {0} is outside of the media root")]
    OutsideRoot(PathBuf),
}

/// Files under the media root. Every file is addressed by a storage key,
/// its path relative to the root with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    /// `url` is the public prefix the media root is served under, e.g. `/media`.
    pub fn new(root: PathBuf, url: &str) -> MediaStorage {
        MediaStorage {
            root,
            url: url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_on_disk(&self, key: &str) -> Result<PathBuf, StorageKeyError> {
        let key_path = Path::new(key);
        let is_plain_relative = key_path.components().next().is_some()
            && key_path
                .components()
                .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
        if !is_plain_relative {
            return Err(StorageKeyError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(key_path))
    }

    pub fn key_for(&self, path: &Path) -> Result<String, StorageKeyError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageKeyError::OutsideRoot(path.to_owned()))?;
        Ok(relative.components().map(|c| c.as_str()).join("/"))
    }

    /// URL a file under the media root is served at.
    pub fn public_url(&self, path: &Path) -> Result<String, StorageKeyError> {
        Ok(format!("{}/{}", self.url, self.key_for(path)?))
    }

    /// Stores `content` as `<dir>/<file_name>` and returns its storage key.
    /// `file_name` is sanitized, and if the name is taken a random suffix is
    /// added before the extension. Existing files are never overwritten.
    #[tracing::instrument(skip(self, content))]
    pub fn save<R: Read>(&self, dir: &str, file_name: &str, content: &mut R) -> Result<String> {
        let dir_path = self.path_on_disk(dir)?;
        std::fs::create_dir_all(&dir_path)
            .wrap_err_with(|| format!("could not create directory {}", dir_path))?;
        let name = valid_file_name(file_name)?;
        let mut candidate = name.clone();
        loop {
            let path = dir_path.join(&candidate);
            let file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path);
            match file {
                Ok(mut file) => {
                    if let Err(err) = std::io::copy(content, &mut file) {
                        drop(file);
                        let _ = std::fs::remove_file(&path);
                        return Err(err).wrap_err_with(|| format!("error writing {}", path));
                    }
                    return Ok(self.key_for(&path)?);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    candidate = alternative_name(&name);
                }
                Err(err) => {
                    return Err(err).wrap_err_with(|| format!("could not create {}", path));
                }
            }
        }
    }

    /// Returns `false` if there was nothing to remove.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_on_disk(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).wrap_err_with(|| format!("could not remove {}", path)),
        }
    }
}

/// Last path component of an uploaded name with whitespace trimmed, spaces turned
/// into underscores and everything but alphanumerics, `-`, `_` and `.` dropped.
pub fn valid_file_name(name: &str) -> Result<String> {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    let valid: String = base
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if valid.is_empty() || valid == "." || valid == ".." {
        bail!("could not derive a valid file name from '{}'", name);
    }
    Ok(valid)
}

fn alternative_name(name: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(NAME_SUFFIX_LEN)
        .collect();
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}
