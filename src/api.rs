//! HTTP endpoints of the compression service.

use std::sync::Arc;

use http::{HeaderName, HeaderValue, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    compress::{CompressError, CompressionRequest, Controller, FailureKind, controller::parse_target},
    extractors::{
        FromRequest, MissingState,
        multipart::{PdfUpload, UploadError},
        query::{Query, QueryError},
    },
    file_stream::FileStream,
    responder::{Responder, json_error},
    state::State,
    types::{Request, Response},
};

pub const X_COMPRESSED_SIZE: &str = "x-compressed-size";
pub const X_TARGET_MET: &str = "x-target-met";
pub const X_COMPRESSION_PROFILE: &str = "x-compression-profile";

/// Headers browsers must be allowed to read from a successful response.
pub const RESULT_HEADERS: [&str; 4] = [
    X_COMPRESSED_SIZE,
    X_TARGET_MET,
    X_COMPRESSION_PROFILE,
    "content-disposition",
];

pub const TARGET_FIELD: &str = "targetSize";

const BANNER: &str = "PDF Compress API is running 🚀";

/// Shared state of the compression endpoint.
pub struct App {
    pub controller: Arc<Controller>,
    /// Cancelled when the server shuts down; in-flight compressions stop early.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompressQuery {
    #[serde(rename = "targetSize")]
    pub target_size: Option<String>,
}

/// Anything that ends a request with an `{ "error": .. }` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl Responder for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status, &self.message)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            error!(error = %err, "upload failed");
            return Self::internal("Failed to store upload");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::bad_request(format!("Invalid query string: {}", err.0))
    }
}

impl From<MissingState> for ApiError {
    fn from(err: MissingState) -> Self {
        error!(state = err.0, "state not registered on router");
        Self::internal("Server misconfigured")
    }
}

impl From<CompressError> for ApiError {
    fn from(err: CompressError) -> Self {
        let message = match err.kind() {
            FailureKind::Engine => "Compression failed",
            FailureKind::Measurement => "Failed to measure compressed file",
            FailureKind::Cancelled => "Server is shutting down",
        };
        error!(error = %err, kind = ?err.kind(), "compression request failed");
        Self::internal(message)
    }
}

pub async fn index(_req: Request) -> &'static str {
    BANNER
}

pub async fn compress(mut req: Request) -> Response {
    match try_compress(&mut req).await {
        Ok(res) => res,
        Err(err) => err.into_response(),
    }
}

async fn try_compress(req: &mut Request) -> Result<Response, ApiError> {
    let app = State::<App>::from_request(req).await?;
    let Query(query) = Query::<CompressQuery>::from_request(req).await?;
    let mut upload = PdfUpload::from_request(req).await?;

    let Some(file) = upload.file.take() else {
        return Err(ApiError::bad_request("No file uploaded"));
    };

    // The form field takes precedence over the query string.
    let target = upload
        .field(TARGET_FIELD)
        .or(query.target_size.as_deref())
        .and_then(parse_target);

    let request = CompressionRequest::new(file.artifact, target);
    let result = app.controller.run(&request, &app.shutdown).await?;
    drop(request);

    info!(
        size = file.size,
        achieved_kb = result.achieved_kb,
        profile = result.profile_name,
        met_target = result.met_target,
        attempts = result.attempts,
        "compressed"
    );

    let achieved_kb = result.achieved_kb;
    let met_target = result.met_target;
    let profile_name = result.profile_name;
    let download = format!(
        "compressed-{}",
        file.file_name.as_deref().unwrap_or("document.pdf")
    );

    let stream = FileStream::from_artifact(result.into_artifact(), Some(download))
        .await
        .map_err(|err| {
            error!(error = %err, "failed to open compressed output");
            ApiError::internal("Failed to read compressed file")
        })?;

    let mut res = stream.content_type(mime::APPLICATION_PDF).into_response();
    let headers = res.headers_mut();
    headers.insert(
        HeaderName::from_static(X_COMPRESSED_SIZE),
        HeaderValue::from(achieved_kb),
    );
    headers.insert(
        HeaderName::from_static(X_TARGET_MET),
        HeaderValue::from_static(if met_target { "true" } else { "false" }),
    );
    headers.insert(
        HeaderName::from_static(X_COMPRESSION_PROFILE),
        HeaderValue::from_static(profile_name),
    );
    Ok(res)
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use super::*;
    use crate::compress::EngineError;

    #[test]
    fn upload_errors_keep_client_status() {
        let err = ApiError::from(UploadError::InvalidType("image/png".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Only PDF files are allowed (got image/png)");

        let err = ApiError::from(UploadError::Io(io::Error::other("disk full")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to store upload");
    }

    #[test]
    fn compression_failures_hide_diagnostics() {
        let err = ApiError::from(CompressError::Engine {
            profile: "mid",
            source: EngineError::MissingOutput(PathBuf::from("/tmp/out.pdf")),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Compression failed");

        let err = ApiError::from(CompressError::Measurement {
            path: PathBuf::from("/tmp/out.pdf"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(err.message, "Failed to measure compressed file");

        let err = ApiError::from(CompressError::Cancelled);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn query_errors_are_bad_requests() {
        let err = ApiError::from(QueryError("bad".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("bad"));
    }
}
