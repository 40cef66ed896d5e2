use std::{future::Future, pin::Pin, sync::Arc};

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;

use crate::{body::Body, middleware::Next};

pub type BoxBody = UnsyncBoxBody<Bytes, BoxError>;
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Request = http::Request<Body>;
pub type Response = http::Response<Body>;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub type BoxMiddleware = Arc<dyn Fn(Request, Next) -> BoxFuture<Response> + Send + Sync + 'static>;
