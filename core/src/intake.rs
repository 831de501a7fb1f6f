use std::io::{Read, Seek};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    model::Asset,
    storage::MediaStorage,
    validation::{FileValidator, UploadedFile, ValidationError},
};

#[derive(Debug, Error)]
#[error("{name}: {error}")]
pub struct RejectedUpload {
    pub name: String,
    #[source]
    pub error: ValidationError,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{} uploaded file(s) rejected", .0.len())]
    Rejected(Vec<RejectedUpload>),
    #[error("could not store upload: {0:#}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for IngestError {
    fn from(report: eyre::Report) -> Self {
        IngestError::Storage(report)
    }
}

/// Validates `upload` and stores it under `upload_dir`. Nothing is written if
/// validation fails.
#[tracing::instrument(skip(validator, storage, upload), fields(name = %upload.name))]
pub fn ingest<R: Read + Seek>(
    validator: &FileValidator,
    storage: &MediaStorage,
    upload_dir: &str,
    upload: &mut UploadedFile<R>,
    uploaded_by: &str,
) -> Result<Asset, IngestError> {
    validator.validate(upload)?;
    store(storage, upload_dir, upload, uploaded_by)
}

/// Like [`ingest`] for several files at once, all or nothing: every file is
/// validated before the first one is stored, and files stored before a storage
/// failure are removed again.
#[tracing::instrument(skip_all, fields(count = uploads.len()))]
pub fn ingest_all<R: Read + Seek>(
    validator: &FileValidator,
    storage: &MediaStorage,
    upload_dir: &str,
    uploads: &mut [UploadedFile<R>],
    uploaded_by: &str,
) -> Result<Vec<Asset>, IngestError> {
    let rejected: Vec<RejectedUpload> = uploads
        .iter_mut()
        .filter_map(|upload| {
            validator
                .validate(upload)
                .err()
                .map(|error| RejectedUpload {
                    name: upload.name.clone(),
                    error,
                })
        })
        .collect();
    if !rejected.is_empty() {
        return Err(IngestError::Rejected(rejected));
    }

    let mut assets = Vec::with_capacity(uploads.len());
    for upload in uploads.iter_mut() {
        match store(storage, upload_dir, upload, uploaded_by) {
            Ok(asset) => assets.push(asset),
            Err(err) => {
                for asset in &assets {
                    if let Err(remove_err) = storage.remove(&asset.file) {
                        warn!("could not roll back {}: {:#}", asset.file, remove_err);
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(assets)
}

fn store<R: Read + Seek>(
    storage: &MediaStorage,
    upload_dir: &str,
    upload: &mut UploadedFile<R>,
    uploaded_by: &str,
) -> Result<Asset, IngestError> {
    let key = storage.save(upload_dir, &upload.name, &mut upload.content)?;
    info!(%key, "stored upload");
    Ok(Asset::new_upload(key, upload.name.clone(), uploaded_by))
}
