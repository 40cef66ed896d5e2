//! Response generation utilities and trait implementations for HTTP responses.
//!
//! This module provides the `Responder` trait that lets handlers return plain strings,
//! status/body pairs, JSON payloads or `Result`s of those, which are converted into
//! `Response<Body>` by the router. Every error the service reports leaves through
//! [`json_error`], so clients always see the same `{ "error": "..." }` object.
//!
//! # Examples
//!
//! ```rust
//! use pdfpress::responder::Responder;
//! use http::StatusCode;
//!
//! let response = "Hello, World!".into_response();
//! let response = (StatusCode::OK, "Success").into_response();
//! let response = ().into_response();
//! ```

use std::{convert::Infallible, fmt::Display};

use http::header::CONTENT_TYPE;
use hyper::{StatusCode, header::HeaderValue};
use serde::Serialize;

use crate::{body::Body, types::Response};

/// Trait for converting types into HTTP responses.
pub trait Responder {
    /// Converts the implementing type into an HTTP response.
    fn into_response(self) -> Response;
}

impl Responder for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl Responder for Body {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response {
        text_response(Body::from(self))
    }
}

impl Responder for String {
    fn into_response(self) -> Response {
        text_response(Body::from(self))
    }
}

impl Responder for () {
    fn into_response(self) -> Response {
        Response::new(Body::empty())
    }
}

impl Responder for Infallible {
    fn into_response(self) -> Response {
        match self {}
    }
}

impl<R> Responder for (StatusCode, R)
where
    R: Display,
{
    fn into_response(self) -> Response {
        let (status, body) = self;
        let mut res = text_response(Body::from(body.to_string()));
        *res.status_mut() = status;
        res
    }
}

impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Responder,
{
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// Serializes the wrapped value as an `application/json` response.
pub struct Json<T>(pub T);

impl<T> Responder for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(buf) => {
                let mut res = Response::new(Body::from(buf));
                res.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                res
            }
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to serialize response: {err}"),
            )
                .into_response(),
        }
    }
}

/// Wire shape of every error the service returns.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Builds a `{ "error": message }` response with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let mut res = Json(ErrorBody { error: message }).into_response();
    *res.status_mut() = status;
    res
}

fn text_response(body: Body) -> Response {
    let mut res = Response::new(body);
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
