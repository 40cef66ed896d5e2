//! A single HTTP endpoint: method, path pattern, handler and route-level middleware.
//!
//! Routes are created through [`Router::route`](crate::router::Router::route), which
//! returns the shared `Arc<Route>` so middleware can be attached afterwards:
//!
//! ```rust,ignore
//! let route = router.route(Method::POST, "/compress", api::compress);
//! route.middleware(body_limit::Config::new(limit).into_middleware());
//! ```

use std::{future::Future, sync::Arc};

use http::Method;
use parking_lot::RwLock;

use crate::{
    handler::BoxHandler,
    middleware::Next,
    responder::Responder,
    types::{BoxMiddleware, Request},
};

pub struct Route {
    /// Path pattern in `matchit` syntax, e.g. `/files/{id}`.
    pub path: String,
    pub method: Method,
    pub handler: BoxHandler,
    pub(crate) middlewares: RwLock<Vec<BoxMiddleware>>,
}

impl Route {
    pub fn new(path: String, method: Method, handler: BoxHandler) -> Self {
        Self {
            path,
            method,
            handler,
            middlewares: RwLock::new(Vec::new()),
        }
    }

    /// Appends a middleware that only runs for this route, after the router-level ones.
    pub fn middleware<F, Fut, R>(&self, f: F) -> &Self
    where
        F: Fn(Request, Next) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + Send + 'static,
    {
        let mw: BoxMiddleware = Arc::new(move |req, next| {
            let fut = f(req, next);
            Box::pin(async move { fut.await.into_response() })
        });

        self.middlewares.write().push(mw);
        self
    }

    pub(crate) fn middleware_snapshot(&self) -> Vec<BoxMiddleware> {
        self.middlewares.read().clone()
    }
}
