use std::{future::Future, pin::Pin};

use http::StatusCode;
use tracing::debug;

use crate::{
    middleware::Next,
    responder::json_error,
    types::{Request, Response},
};

pub const DEFAULT_LIMIT: u64 = 10 * 1024 * 1024;

/// Rejects requests whose declared `Content-Length` exceeds the limit plus a
/// fixed slack before any of the body is read. The slack covers framing around
/// the payload, such as multipart boundaries and small text fields. Chunked
/// uploads are bounded while streaming by the multipart extractor instead.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    limit: u64,
    slack: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl Config {
    pub fn new(limit: u64) -> Self {
        Self { limit, slack: 0 }
    }

    pub fn slack(mut self, bytes: u64) -> Self {
        self.slack = bytes;
        self
    }

    pub fn into_middleware(
        self,
    ) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>>
    + Clone
    + Send
    + Sync
    + 'static {
        let limit = self.limit;
        let max = self.limit.saturating_add(self.slack);

        move |req: Request, next: Next| {
            Box::pin(async move {
                let declared = req
                    .headers()
                    .get(hyper::header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());

                if let Some(len) = declared {
                    if len > max {
                        debug!(len, limit, "rejecting oversized upload");
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            &format!("File too large: limit is {limit} bytes"),
                        );
                    }
                }

                next.run(req).await
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, header::CONTENT_LENGTH};

    use super::*;
    use crate::{body::Body, router::Router};

    async fn ok(_req: Request) -> &'static str {
        "ok"
    }

    fn router(config: Config) -> Router {
        let mut router = Router::new();
        router
            .route(Method::POST, "/upload", ok)
            .middleware(config.into_middleware());
        router
    }

    fn declared(len: u64) -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(CONTENT_LENGTH, len)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn slack_admits_framing_above_the_limit() {
        let router = router(Config::new(1000).slack(200));

        let res = router.dispatch(declared(1150)).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = router.dispatch(declared(1201)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn without_slack_the_limit_is_exact() {
        let router = router(Config::new(1000));
        assert_eq!(router.dispatch(declared(1000)).await.status(), StatusCode::OK);
        assert_eq!(
            router.dispatch(declared(1001)).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
