//! HTTP request data extraction utilities and traits.
//!
//! Extractors pull typed values out of a request: shared state registered on the
//! router, query parameters, and the multipart PDF upload. Each extractor's error
//! type is itself a [`Responder`](crate::responder::Responder), so handlers can
//! turn a failed extraction straight into an HTTP response.
//!
//! # Examples
//!
//! ```rust,ignore
//! use pdfpress::extractors::{FromRequest, query::Query};
//!
//! async fn handler(mut req: Request) -> impl Responder {
//!     let Query(params) = match Query::<MyParams>::from_request(&mut req).await {
//!         Ok(q) => q,
//!         Err(e) => return e.into_response(),
//!     };
//!     // ...
//! }
//! ```

use std::future::Future;

use http::StatusCode;

use crate::{
    responder::{Responder, json_error},
    state::State,
    types::{Request, Response},
};

/// Multipart PDF upload parsing.
pub mod multipart;

/// Query parameter parsing from URL query strings.
pub mod query;

/// Trait for extracting data from HTTP requests.
pub trait FromRequest<'a>: Sized {
    /// Error type returned when extraction fails.
    type Error: Responder;

    fn from_request(req: &'a mut Request)
    -> impl Future<Output = Result<Self, Self::Error>> + Send + 'a;
}

/// Requested state type was never registered on the router.
#[derive(Debug)]
pub struct MissingState(pub &'static str);

impl Responder for MissingState {
    fn into_response(self) -> Response {
        tracing::error!(state = self.0, "state not registered on router");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfigured")
    }
}

impl<'a, T> FromRequest<'a> for State<T>
where
    T: Send + Sync + 'static,
{
    type Error = MissingState;

    fn from_request(
        req: &'a mut Request,
    ) -> impl Future<Output = Result<Self, Self::Error>> + Send + 'a {
        let state = req
            .extensions()
            .get::<State<T>>()
            .cloned()
            .ok_or(MissingState(std::any::type_name::<T>()));
        futures_util::future::ready(state)
    }
}
