use std::io::{Read, Seek, SeekFrom};

use camino::Utf8Path as Path;
use itertools::Itertools;
use thiserror::Error;

use crate::{mime_type, util::FileSize};

/// Number of leading bytes inspected to determine the content type.
pub const SNIFF_LEN: usize = 2048;

/// Default upper bound for uploads, 3000 KiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 3000 * 1024;

/// A file handed over by the upload layer: the name the client sent,
/// the size it declared and the content.
#[derive(Debug)]
pub struct UploadedFile<R> {
    pub name: String,
    pub size: u64,
    pub content: R,
}

impl<R> UploadedFile<R> {
    pub fn new(name: impl Into<String>, size: u64, content: R) -> Self {
        UploadedFile {
            name: name.into(),
            size,
            content,
        }
    }

    /// Lowercased suffix after the last dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(
        "File extension “{extension}” is not allowed. Allowed extensions are: {}.",
        .allowed.join(", ")
    )]
    UnsupportedExtension {
        extension: String,
        allowed: Vec<String>,
    },
    #[error(
        "Unsupported file type. Valid mime types: `{}`, got `{detected}`!",
        .allowed.iter().join(", ")
    )]
    UnsupportedContentType {
        detected: String,
        allowed: Vec<&'static str>,
    },
    #[error("Please keep file size under {limit}. Current size is {actual}.")]
    FileTooLarge { limit: FileSize, actual: FileSize },
    #[error("could not read uploaded file")]
    Unreadable(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidator {
    allowed_extensions: Vec<String>,
    allowed_mime_types: Vec<&'static str>,
    max_file_size: u64,
}

impl FileValidator {
    pub fn new<S: AsRef<str>>(allowed_extensions: &[S], max_file_size: u64) -> FileValidator {
        let allowed_extensions: Vec<String> = allowed_extensions
            .iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        let allowed_mime_types = mime_type::mime_types_for_extensions(&allowed_extensions);
        FileValidator {
            allowed_extensions,
            allowed_mime_types,
            max_file_size,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn allowed_mime_types(&self) -> &[&'static str] {
        &self.allowed_mime_types
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Runs the extension, content type and size checks in that order,
    /// stopping at the first failure. The content is rewound afterwards.
    #[tracing::instrument(skip(self, file), fields(name = %file.name, size = file.size))]
    pub fn validate<R: Read + Seek>(
        &self,
        file: &mut UploadedFile<R>,
    ) -> Result<(), ValidationError> {
        self.validate_extension(&file.name)?;
        self.validate_content_type(&mut file.content)?;
        self.validate_size(file.size)?;
        Ok(())
    }

    pub fn validate_extension(&self, file_name: &str) -> Result<(), ValidationError> {
        let extension = Path::new(file_name)
            .extension()
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if self.allowed_extensions.contains(&extension) {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            })
        }
    }

    pub fn validate_content_type<R: Read + Seek>(
        &self,
        content: &mut R,
    ) -> Result<(), ValidationError> {
        let head = read_head(content).map_err(ValidationError::Unreadable)?;
        let detected = mime_type::sniff_mime_type(&head);
        if self.allowed_mime_types.iter().any(|allowed| *allowed == detected) {
            Ok(())
        } else {
            tracing::debug!(%detected, "rejecting upload by content type");
            Err(ValidationError::UnsupportedContentType {
                detected: detected.into_owned(),
                allowed: self.allowed_mime_types.clone(),
            })
        }
    }

    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            Err(ValidationError::FileTooLarge {
                limit: FileSize(self.max_file_size),
                actual: FileSize(size),
            })
        } else {
            Ok(())
        }
    }
}

fn read_head<R: Read + Seek>(content: &mut R) -> std::io::Result<Vec<u8>> {
    content.seek(SeekFrom::Start(0))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    content.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    content.seek(SeekFrom::Start(0))?;
    Ok(head)
}
