//! Streaming a compressed artifact back to the client.
//!
//! `FileStream` wraps any byte stream together with the download name and size.
//! [`FileStream::from_artifact`] opens an [`Artifact`] and ties its lifetime to the
//! response body, so the file is deleted once the body is fully sent, or dropped
//! because the client went away.

use anyhow::Result;
use bytes::Bytes;
use futures_util::{TryStream, TryStreamExt};
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::body::Frame;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{
    artifact::Artifact,
    body::Body,
    responder::{Responder, json_error},
    types::{BoxError, Response},
};

pub struct FileStream<S> {
    /// The underlying byte stream
    pub stream: S,
    /// Suggested download name for the Content-Disposition header
    pub file_name: Option<String>,
    /// Optional content size for the Content-Length header
    pub content_size: Option<u64>,
    pub content_type: mime::Mime,
}

impl<S> FileStream<S>
where
    S: TryStream + Send + 'static,
    S::Ok: Into<Bytes>,
    S::Error: Into<BoxError>,
{
    pub fn new(stream: S, file_name: Option<String>, content_size: Option<u64>) -> Self {
        Self {
            stream,
            file_name,
            content_size,
            content_type: mime::APPLICATION_OCTET_STREAM,
        }
    }

    pub fn content_type(mut self, content_type: mime::Mime) -> Self {
        self.content_type = content_type;
        self
    }
}

impl FileStream<ReaderStream<File>> {
    /// Opens `artifact` for streaming. The artifact is removed when the stream is dropped.
    pub async fn from_artifact(
        artifact: Artifact,
        file_name: Option<String>,
    ) -> Result<FileStream<impl TryStream<Ok = Bytes, Error = std::io::Error> + Send + 'static>> {
        let file = File::open(artifact.path()).await?;
        let content_size = file.metadata().await?.len();

        let stream = ReaderStream::new(file).map_ok(move |chunk| {
            let _keep_alive = &artifact;
            chunk
        });

        Ok(FileStream::new(stream, file_name, Some(content_size)))
    }
}

impl<S> Responder for FileStream<S>
where
    S: TryStream + Send + 'static,
    S::Ok: Into<Bytes>,
    S::Error: Into<BoxError>,
{
    fn into_response(self) -> Response {
        let mut response = hyper::Response::builder()
            .status(hyper::StatusCode::OK)
            .header(CONTENT_TYPE, self.content_type.as_ref());

        if let Some(size) = self.content_size {
            response = response.header(CONTENT_LENGTH, size.to_string());
        }

        if let Some(ref name) = self.file_name {
            response = response.header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            );
        }

        let body = Body::from_try_stream(
            self
                .stream
                .map_ok(|chunk| Frame::data(Into::<Bytes>::into(chunk)))
                .map_err(Into::<BoxError>::into),
        );

        response.body(body).unwrap_or_else(|e| {
            json_error(
                hyper::StatusCode::INTERNAL_SERVER_ERROR,
                &format!("FileStream error: {}", e),
            )
        })
    }
}
