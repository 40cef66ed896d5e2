/// This module provides the `Body` struct, which is a wrapper around a boxed HTTP body.
/// It is used for both directions: incoming hyper bodies are boxed into it by the
/// server, and responses (text, JSON errors, streamed PDFs) are built from it.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{TryStream, TryStreamExt};
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, SizeHint};

use crate::types::{BoxBody, BoxError};

/// A boxed, `Send` HTTP body.
///
/// # Example
///
/// ```rust
/// use pdfpress::body::Body;
///
/// let empty = Body::empty();
/// let text = Body::from("Hello, world!".to_string());
/// ```
pub struct Body(BoxBody);

impl Body {
    /// Wraps any body whose error converts into [`BoxError`].
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(|e| e.into()).boxed_unsync())
    }

    pub fn empty() -> Self {
        Self::new(Empty::new())
    }

    /// Builds a body from a fallible stream of frames.
    pub fn from_try_stream<S>(stream: S) -> Self
    where
        S: TryStream<Ok = Frame<Bytes>> + Send + 'static,
        S::Error: Into<BoxError>,
    {
        Self::new(StreamBody::new(
            stream.map_err(|e| -> BoxError { e.into() }),
        ))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for Body {
            fn from(buf: $ty) -> Self {
                Self::new(Full::from(buf))
            }
        }
    };
}

body_from_impl!(String);
body_from_impl!(&'static str);
body_from_impl!(Vec<u8>);
body_from_impl!(Bytes);

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}
