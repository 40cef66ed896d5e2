use std::sync::Arc;

use crate::{
    handler::BoxHandler,
    types::{BoxMiddleware, Request, Response},
};

/// Upload size guard applied to the compression route.
pub mod body_limit;

/// The remainder of a middleware chain.
///
/// Each middleware receives the request together with a `Next`; calling
/// [`Next::run`] hands the request to the following middleware, and the last
/// one hands it to the endpoint.
pub struct Next {
    pub(crate) middlewares: Arc<[BoxMiddleware]>,
    pub(crate) idx: usize,
    pub(crate) endpoint: BoxHandler,
}

impl Next {
    pub(crate) fn new(middlewares: Arc<[BoxMiddleware]>, endpoint: BoxHandler) -> Self {
        Self {
            middlewares,
            idx: 0,
            endpoint,
        }
    }

    pub async fn run(mut self, req: Request) -> Response {
        match self.middlewares.get(self.idx).cloned() {
            Some(mw) => {
                self.idx += 1;
                mw(req, self).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}
