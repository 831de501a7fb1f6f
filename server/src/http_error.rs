use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ddam_core::{
    intake::{IngestError, RejectedUpload},
    storage::StorageKeyError,
    ValidationError,
};
use serde::Serialize;

#[derive(Debug)]
pub enum HttpError {
    Internal(eyre::Report),
    NotFound(String),
    BadRequest(String),
    /// Uploads that failed validation, reported per file.
    Rejected(Vec<FileError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

#[derive(Serialize)]
struct RejectedBody<'a> {
    errors: &'a [FileError],
}

// Tell axum how to convert `HttpError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::Internal(report) => {
                tracing::error!("{:?}", report);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server error: {:#}", report),
                )
                    .into_response()
            }
            HttpError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            HttpError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            HttpError::Rejected(errors) => (
                StatusCode::BAD_REQUEST,
                Json(RejectedBody { errors: &errors }),
            )
                .into_response(),
        }
    }
}

macro_rules! impl_from {
    ($from:ty) => {
        impl From<$from> for HttpError {
            fn from(err: $from) -> Self {
                Self::Internal(err.into())
            }
        }
    };
}

impl_from!(std::io::Error);
impl_from!(eyre::Report);

impl From<StorageKeyError> for HttpError {
    fn from(err: StorageKeyError) -> Self {
        HttpError::NotFound(err.to_string())
    }
}

impl From<RejectedUpload> for FileError {
    fn from(rejected: RejectedUpload) -> Self {
        FileError {
            file: rejected.name,
            message: rejected.error.to_string(),
        }
    }
}

impl From<IngestError> for HttpError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(ValidationError::Unreadable(io)) => {
                HttpError::Internal(eyre::Report::new(io).wrap_err("could not read upload"))
            }
            IngestError::Validation(err) => HttpError::Rejected(vec![FileError {
                file: String::new(),
                message: err.to_string(),
            }]),
            IngestError::Rejected(rejected) => {
                HttpError::Rejected(rejected.into_iter().map(FileError::from).collect())
            }
            IngestError::Storage(report) => HttpError::Internal(report),
        }
    }
}

pub type ApiResult<T> = Result<T, HttpError>;

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::Internal(report) => write!(f, "{:#}", report),
            HttpError::NotFound(message) | HttpError::BadRequest(message) => {
                write!(f, "{}", message)
            }
            HttpError::Rejected(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", err.file, err.message)?;
                }
                Ok(())
            }
        }
    }
}
