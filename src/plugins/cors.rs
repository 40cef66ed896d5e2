/// The `CorsPlugin` lets browser front-ends call the compression API from another origin.
/// It answers preflight `OPTIONS` requests itself and decorates every other response
/// with the configured allow/expose headers.
///
/// # Example
/// ```rust,ignore
/// use pdfpress::plugins::cors::CorsBuilder;
/// use http::Method;
///
/// let cors = CorsBuilder::new()
///     .allow_origin("https://example.com")
///     .allow_methods(&[Method::GET, Method::POST])
///     .expose_headers(&["x-compressed-size"])
///     .build();
///
/// router.plugin(cors)?;
/// ```
use anyhow::Result;
use http::{
    HeaderName, HeaderValue, Method, StatusCode,
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
        ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
    },
};

use crate::{
    body::Body,
    middleware::Next,
    plugins::Plugin,
    router::Router,
    types::{Request, Response},
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Allowed origins; empty means any origin (`*`).
    pub origins: Vec<String>,
    pub methods: Vec<Method>,
    pub headers: Vec<HeaderName>,
    pub expose_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
    pub max_age_secs: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origins: Vec::new(),
            methods: vec![Method::GET, Method::POST, Method::OPTIONS],
            headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: Some(3600),
        }
    }
}

/// Fluent builder for [`CorsPlugin`].
#[derive(Default)]
pub struct CorsBuilder(Config);

impl CorsBuilder {
    pub fn new() -> Self {
        Self(Config::default())
    }

    pub fn allow_origin(mut self, o: impl Into<String>) -> Self {
        self.0.origins.push(o.into());
        self
    }

    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.origins.extend(origins.into_iter().map(Into::into));
        self
    }

    pub fn allow_methods(mut self, m: &[Method]) -> Self {
        self.0.methods = m.to_vec();
        self
    }

    pub fn allow_headers(mut self, h: &[HeaderName]) -> Self {
        self.0.headers = h.to_vec();
        self
    }

    pub fn expose_headers(mut self, h: &[&'static str]) -> Self {
        self.0.expose_headers = h.iter().map(|n| HeaderName::from_static(n)).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.0.allow_credentials = allow;
        self
    }

    pub fn max_age_secs(mut self, secs: u32) -> Self {
        self.0.max_age_secs = Some(secs);
        self
    }

    pub fn build(self) -> CorsPlugin {
        CorsPlugin { cfg: self.0 }
    }
}

#[derive(Clone, Default)]
pub struct CorsPlugin {
    cfg: Config,
}

impl Plugin for CorsPlugin {
    fn name(&self) -> &'static str {
        "CorsPlugin"
    }

    fn setup(&self, router: &mut Router) -> Result<()> {
        let cfg = self.cfg.clone();
        router.middleware(move |req, next| {
            let cfg = cfg.clone();
            async move { handle_cors(req, next, cfg).await }
        });
        Ok(())
    }
}

async fn handle_cors(req: Request, next: Next, cfg: Config) -> Response {
    let origin = req.headers().get(ORIGIN).cloned();

    if req.method() == Method::OPTIONS {
        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::NO_CONTENT;
        add_cors_headers(&cfg, origin, &mut resp);
        return resp;
    }

    let mut resp = next.run(req).await;
    add_cors_headers(&cfg, origin, &mut resp);
    resp
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> Option<HeaderValue> {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        return None;
    }
    HeaderValue::from_str(&joined).ok()
}

fn add_cors_headers(cfg: &Config, origin: Option<HeaderValue>, resp: &mut Response) {
    let allow_origin = if cfg.origins.is_empty() {
        HeaderValue::from_static("*")
    } else {
        match origin {
            Some(o) if cfg.origins.iter().any(|p| o.as_bytes() == p.as_bytes()) => {
                resp.headers_mut()
                    .append(VARY, HeaderValue::from_static("origin"));
                o
            }
            _ => return,
        }
    };

    let headers = resp.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

    if let Some(v) = join(cfg.methods.iter().map(Method::as_str)) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, v);
    }

    if let Some(v) = join(cfg.headers.iter().map(HeaderName::as_str)) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, v);
    }

    if let Some(v) = join(cfg.expose_headers.iter().map(HeaderName::as_str)) {
        headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, v);
    }

    if cfg.allow_credentials {
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    if let Some(secs) = cfg.max_age_secs {
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(secs));
    }
}
