use std::{future::Future, sync::Arc};

use crate::{
    responder::Responder,
    types::{Request, Response},
};

/// An endpoint: any `async fn(Request) -> impl Responder`.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: Request) -> Response;
}

#[async_trait::async_trait]
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + Send + 'static,
{
    async fn call(&self, req: Request) -> Response {
        (self)(req).await.into_response()
    }
}

/// Type-erased, shareable handler.
#[derive(Clone)]
pub struct BoxHandler(Arc<dyn Handler>);

impl BoxHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    pub async fn call(&self, req: Request) -> Response {
        self.0.call(req).await
    }
}
