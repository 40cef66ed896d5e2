//! Multipart upload extraction for the PDF compression endpoint.
//!
//! [`PdfUpload`] streams the configured file field to the uploads directory under a
//! generated name and collects every text field (such as `targetSize`) into a map.
//! Only `application/pdf` parts are accepted. The file part is capped at the
//! configured upload limit while it streams; the rest of the form gets
//! [`FORM_OVERHEAD`] bytes on top of that. On any error the partially
//! written file is removed before the error is returned.
//!
//! # Examples
//!
//! ```rust,ignore
//! use pdfpress::extractors::{FromRequest, multipart::PdfUpload};
//!
//! async fn upload(mut req: Request) -> impl Responder {
//!     let upload = match PdfUpload::from_request(&mut req).await {
//!         Ok(upload) => upload,
//!         Err(err) => return err.into_response(),
//!     };
//!     format!("{} bytes", upload.file.map(|f| f.size).unwrap_or(0))
//! }
//! ```

use std::{collections::HashMap, future::Future, io, path::PathBuf, sync::Arc};

use http::{StatusCode, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use multer::{Constraints, Field, Multipart, SizeLimit};
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

use crate::{
    artifact::{Artifact, IdGenerator, UuidIds},
    extractors::FromRequest,
    responder::{Responder, json_error},
    state::State,
    types::{Request, Response},
};

pub const DEFAULT_FILE_FIELD: &str = "pdf";

/// Bytes allowed on top of the file limit for boundaries, part headers and text fields.
pub const FORM_OVERHEAD: u64 = 64 * 1024;

/// Where and how uploads are stored. Must be registered on the router as state.
#[derive(Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub file_field: String,
    pub ids: Arc<dyn IdGenerator>,
}

impl UploadSettings {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
            file_field: DEFAULT_FILE_FIELD.to_string(),
            ids: Arc::new(UuidIds),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing Content-Type header")]
    MissingContentType,

    #[error("Expected multipart/form-data: {0}")]
    NotMultipart(String),

    #[error("Only PDF files are allowed (got {0})")]
    InvalidType(String),

    #[error("Uploaded file is empty")]
    Empty,

    #[error("File too large: limit is {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Only one file may be uploaded")]
    MultipleFiles,

    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    #[error("upload settings not registered")]
    MissingSettings,

    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    /// Size violations are reported against the file limit, whichever bound tripped.
    fn from_multer(err: multer::Error, limit: u64) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                UploadError::TooLarge { limit }
            }
            other => UploadError::Malformed(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Io(_) | UploadError::MissingSettings => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl Responder for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload failed");
            return json_error(status, "Failed to store upload");
        }
        json_error(status, &self.to_string())
    }
}

/// A PDF written to the uploads directory. The file is deleted with the artifact.
#[derive(Debug)]
pub struct UploadedPdf {
    pub artifact: Artifact,
    /// Client-supplied name reduced to a safe final path component.
    pub file_name: Option<String>,
    pub size: u64,
}

/// The parsed form: at most one PDF plus the text fields.
#[derive(Debug, Default)]
pub struct PdfUpload {
    pub file: Option<UploadedPdf>,
    pub fields: HashMap<String, String>,
}

impl PdfUpload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl<'a> FromRequest<'a> for PdfUpload {
    type Error = UploadError;

    fn from_request(
        req: &'a mut Request,
    ) -> impl Future<Output = Result<Self, Self::Error>> + Send + 'a {
        async move {
            let settings = req
                .extensions()
                .get::<State<UploadSettings>>()
                .cloned()
                .ok_or(UploadError::MissingSettings)?;

            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .ok_or(UploadError::MissingContentType)?
                .to_str()
                .map_err(|_| UploadError::NotMultipart("invalid Content-Type".to_string()))?;

            let boundary = multer::parse_boundary(content_type)
                .map_err(|e| UploadError::NotMultipart(e.to_string()))?;

            let limit = settings.max_bytes;
            let constraints = Constraints::new().size_limit(
                SizeLimit::new()
                    .whole_stream(limit.saturating_add(FORM_OVERHEAD))
                    .for_field(settings.file_field.clone(), limit),
            );
            let mut multipart = Multipart::with_constraints(
                req.body_mut().into_data_stream(),
                boundary,
                constraints,
            );

            let mut upload = PdfUpload::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| UploadError::from_multer(e, limit))?
            {
                let name = field.name().unwrap_or_default().to_owned();

                if name == settings.file_field {
                    if upload.file.is_some() {
                        return Err(UploadError::MultipleFiles);
                    }
                    upload.file = Some(save_pdf(field, &settings).await?);
                } else if field.file_name().is_some() {
                    debug!(field = %name, "skipping unexpected file field");
                } else {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| UploadError::from_multer(e, limit))?;
                    upload.fields.insert(name, text);
                }
            }

            Ok(upload)
        }
    }
}

async fn save_pdf(mut field: Field<'_>, settings: &UploadSettings) -> Result<UploadedPdf, UploadError> {
    match field.content_type() {
        Some(ct) if ct.essence_str() == mime::APPLICATION_PDF.essence_str() => {}
        Some(ct) => return Err(UploadError::InvalidType(ct.essence_str().to_string())),
        None => return Err(UploadError::InvalidType("no content type".to_string())),
    }

    let file_name = field.file_name().and_then(safe_file_name);
    let artifact = Artifact::in_dir(&settings.dir, "upload", "pdf", settings.ids.as_ref());
    let mut out = File::create(artifact.path()).await?;

    let mut size: u64 = 0;
    let limit = settings.max_bytes;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::from_multer(e, limit))?
    {
        size += chunk.len() as u64;
        if size > limit {
            return Err(UploadError::TooLarge { limit });
        }
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    if size == 0 {
        return Err(UploadError::Empty);
    }

    debug!(path = %artifact.path().display(), size, "upload stored");
    Ok(UploadedPdf {
        artifact,
        file_name,
        size,
    })
}

/// Last path component with quotes, control and non-ASCII characters replaced.
fn safe_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' {
                c
            } else {
                '_'
            }
        })
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{artifact::SequentialIds, body::Body};

    const BOUNDARY: &str = "pdfpress-test-boundary";

    struct Part<'a> {
        name: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    }

    fn body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = part.file_name {
                disposition.push_str(&format!("; filename=\"{file_name}\""));
            }
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"\r\n");
            if let Some(ct) = part.content_type {
                out.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }

    fn request(dir: &TempDir, max_bytes: u64, parts: &[Part<'_>]) -> Request {
        let mut req = http::Request::builder()
            .method("POST")
            .uri("/compress")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body(parts)))
            .unwrap();
        let settings = UploadSettings::new(dir.path(), max_bytes)
            .with_ids(Arc::new(SequentialIds::new("t-")));
        req.extensions_mut().insert(State::new(settings));
        req
    }

    fn pdf<'a>(data: &'a [u8]) -> Part<'a> {
        Part {
            name: "pdf",
            file_name: Some("report.pdf"),
            content_type: Some("application/pdf"),
            data,
        }
    }

    fn files_in(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn stores_pdf_and_collects_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(
            &dir,
            1024 * 1024,
            &[
                pdf(b"%PDF-1.4 hello"),
                Part {
                    name: "targetSize",
                    file_name: None,
                    content_type: None,
                    data: b"250",
                },
            ],
        );

        let upload = PdfUpload::from_request(&mut req).await.unwrap();
        let file = upload.file.as_ref().unwrap();
        assert_eq!(file.size, 14);
        assert_eq!(file.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(std::fs::read(file.artifact.path()).unwrap(), b"%PDF-1.4 hello");
        assert_eq!(upload.field("targetSize"), Some("250"));

        drop(upload);
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn form_without_file_is_not_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(
            &dir,
            1024,
            &[Part {
                name: "targetSize",
                file_name: None,
                content_type: None,
                data: b"100",
            }],
        );
        let upload = PdfUpload::from_request(&mut req).await.unwrap();
        assert!(upload.file.is_none());
    }

    #[tokio::test]
    async fn rejects_non_pdf_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(
            &dir,
            1024 * 1024,
            &[Part {
                name: "pdf",
                file_name: Some("photo.png"),
                content_type: Some("image/png"),
                data: b"\x89PNG",
            }],
        );

        let err = PdfUpload::from_request(&mut req).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidType(ref t) if t == "image/png"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![b'x'; 64 * 1024];
        let mut req = request(&dir, 4 * 1024, &[pdf(&data)]);

        let err = PdfUpload::from_request(&mut req).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn file_just_under_the_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let limit = 8 * 1024;
        let data = vec![b'x'; limit as usize - 100];
        let mut req = request(
            &dir,
            limit,
            &[
                pdf(&data),
                Part {
                    name: "targetSize",
                    file_name: None,
                    content_type: None,
                    data: b"120",
                },
            ],
        );

        let upload = PdfUpload::from_request(&mut req).await.unwrap();
        assert_eq!(upload.file.as_ref().unwrap().size, limit - 100);
        assert_eq!(upload.field("targetSize"), Some("120"));
    }

    #[tokio::test]
    async fn file_one_byte_over_the_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let limit = 8 * 1024;
        let data = vec![b'x'; limit as usize + 1];
        let mut req = request(&dir, limit, &[pdf(&data)]);

        let err = PdfUpload::from_request(&mut req).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { limit: l } if l == limit));
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn empty_and_duplicate_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(&dir, 1024, &[pdf(b"")]);
        let err = PdfUpload::from_request(&mut req).await.unwrap_err();
        assert!(matches!(err, UploadError::Empty));

        let mut req = request(&dir, 1024, &[pdf(b"%PDF-a"), pdf(b"%PDF-b")]);
        let err = PdfUpload::from_request(&mut req).await.unwrap_err();
        assert!(matches!(err, UploadError::MultipleFiles));
        assert_eq!(files_in(&dir), 0);
    }

    #[tokio::test]
    async fn requires_multipart_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(&dir, 1024, &[pdf(b"%PDF")]);
        req.headers_mut().remove(CONTENT_TYPE);
        assert!(matches!(
            PdfUpload::from_request(&mut req).await,
            Err(UploadError::MissingContentType)
        ));

        let mut req = request(&dir, 1024, &[pdf(b"%PDF")]);
        req.headers_mut()
            .insert(CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(matches!(
            PdfUpload::from_request(&mut req).await,
            Err(UploadError::NotMultipart(_))
        ));
    }

    #[test]
    fn file_names_are_reduced_to_a_safe_component() {
        assert_eq!(safe_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            safe_file_name("C:\\Users\\me\\scan.pdf").as_deref(),
            Some("scan.pdf")
        );
        assert_eq!(safe_file_name("../../etc/x\".pdf").as_deref(), Some("x_.pdf"));
        assert_eq!(safe_file_name("résumé.pdf").as_deref(), Some("r_sum_.pdf"));
        assert_eq!(safe_file_name("dir/"), None);
    }
}
