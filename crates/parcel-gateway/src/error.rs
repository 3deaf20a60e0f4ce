use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parcel_core::{AdmissionDenied, StorageError};
use parcel_generator::AllocationError;
use parcel_reaper::ReapError;
use parcel_uploader::{AccessError, LinkError, UploadError};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Reap(#[from] ReapError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    BadRequest(String),
    /// The request body could not be read.
    #[error("{message}")]
    Body { status: StatusCode, message: String },
    #[error("{0} not found")]
    NotFound(String),
}

/// Each refusal reason gets its own status.
fn admission_status(denied: &AdmissionDenied) -> StatusCode {
    match denied {
        AdmissionDenied::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        AdmissionDenied::StorageLimit { .. } => StatusCode::INSUFFICIENT_STORAGE,
        AdmissionDenied::FileCountLimit { .. } => StatusCode::FORBIDDEN,
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Unavailable(_) | StorageError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Conflict(_) => StatusCode::CONFLICT,
        StorageError::Query(_) | StorageError::InvalidData(_) | StorageError::Operation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn allocation_status(err: &AllocationError) -> StatusCode {
    match err {
        AllocationError::Exhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AllocationError::Lookup(err) => storage_status(err),
        AllocationError::InvalidSettings(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upload(err) => match err {
                UploadError::Denied(denied) => admission_status(denied),
                UploadError::NotFound(_) => StatusCode::NOT_FOUND,
                UploadError::NotOwner { .. } => StatusCode::FORBIDDEN,
                UploadError::CodeConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
                UploadError::Allocation(err) => allocation_status(err),
                UploadError::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
                UploadError::Storage(err) => storage_status(err),
            },
            AppError::Link(err) => match err {
                LinkError::InvalidUrl(_) | LinkError::InvalidShortCode(_) => {
                    StatusCode::BAD_REQUEST
                }
                LinkError::NotFound(_) => StatusCode::NOT_FOUND,
                LinkError::Expired(_) => StatusCode::GONE,
                LinkError::NotOwner { .. } => StatusCode::FORBIDDEN,
                LinkError::CodeConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
                LinkError::Allocation(err) => allocation_status(err),
                LinkError::Storage(err) => storage_status(err),
            },
            AppError::Access(err) => match err {
                AccessError::NotFound(_) => StatusCode::NOT_FOUND,
                AccessError::Gone(_) => StatusCode::GONE,
                AccessError::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
                AccessError::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AccessError::Storage(err) => storage_status(err),
            },
            AppError::Reap(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(err) => storage_status(err),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Body { status, .. } => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        AppError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Body {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request refused");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
