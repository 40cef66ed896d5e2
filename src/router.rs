use std::{collections::HashMap, future::Future, sync::Arc};

use http::{Extensions, HeaderValue, Method, StatusCode, header::ALLOW};
use tracing::warn;

use crate::{
    handler::{BoxHandler, Handler},
    middleware::Next,
    plugins::Plugin,
    responder::{Responder, json_error},
    route::Route,
    state::State,
    types::{BoxMiddleware, Request, Response},
};

type StateInjector = Arc<dyn Fn(&mut Extensions) + Send + Sync + 'static>;

pub struct Router {
    paths: matchit::Router<usize>,
    patterns: HashMap<String, usize>,
    methods: Vec<HashMap<Method, Arc<Route>>>,
    middlewares: Vec<BoxMiddleware>,
    states: Vec<StateInjector>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            paths: matchit::Router::new(),
            patterns: HashMap::new(),
            methods: Vec::new(),
            middlewares: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Registers `handler` for `method` on `path`.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is rejected by the path table (conflicting or
    /// malformed pattern). Routes are registered once at startup.
    pub fn route<H>(&mut self, method: Method, path: &str, handler: H) -> Arc<Route>
    where
        H: Handler,
    {
        let slot = match self.patterns.get(path) {
            Some(&slot) => slot,
            None => {
                let slot = self.methods.len();
                if let Err(err) = self.paths.insert(path, slot) {
                    panic!("invalid route pattern `{path}`: {err}");
                }
                self.patterns.insert(path.to_owned(), slot);
                self.methods.push(HashMap::new());
                slot
            }
        };

        let route = Arc::new(Route::new(
            path.to_owned(),
            method.clone(),
            BoxHandler::new(handler),
        ));
        if self.methods[slot].insert(method, route.clone()).is_some() {
            warn!(path, "route handler replaced");
        }
        route
    }

    /// Adds a middleware that wraps every request, matched or not.
    pub fn middleware<F, Fut, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Request, Next) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + Send + 'static,
    {
        let mw: BoxMiddleware = Arc::new(move |req, next| {
            let fut = f(req, next);
            Box::pin(async move { fut.await.into_response() })
        });

        self.middlewares.push(mw);
        self
    }

    /// Makes `value` available to handlers through [`State<T>`].
    pub fn state<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        let state = State::new(value);
        self.states.push(Arc::new(move |ext: &mut Extensions| {
            ext.insert(state.clone());
        }));
        self
    }

    pub fn plugin<P: Plugin>(&mut self, plugin: P) -> anyhow::Result<&mut Self> {
        plugin.setup(self)?;
        Ok(self)
    }

    pub async fn dispatch(&self, mut req: Request) -> Response {
        for inject in &self.states {
            inject(req.extensions_mut());
        }

        let (endpoint, route_mws) = self.resolve(req.method(), req.uri().path());

        let chain: Arc<[BoxMiddleware]> = self
            .middlewares
            .iter()
            .cloned()
            .chain(route_mws)
            .collect();

        Next::new(chain, endpoint).run(req).await
    }

    fn resolve(&self, method: &Method, path: &str) -> (BoxHandler, Vec<BoxMiddleware>) {
        let Ok(matched) = self.paths.at(path) else {
            return (BoxHandler::new(not_found), Vec::new());
        };

        let methods = &self.methods[*matched.value];
        if let Some(route) = methods.get(method) {
            return (route.handler.clone(), route.middleware_snapshot());
        }

        let mut allowed: Vec<&str> = methods.keys().map(Method::as_str).collect();
        allowed.sort_unstable();
        let allow = allowed.join(", ");
        let endpoint = BoxHandler::new(move |_req: Request| {
            let allow = allow.clone();
            async move {
                let mut res = json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers_mut().insert(ALLOW, value);
                }
                res
            }
        });
        (endpoint, Vec::new())
    }
}

async fn not_found(_req: Request) -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::body::Body;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    async fn read_state(req: Request) -> String {
        match req.extensions().get::<State<u32>>() {
            Some(state) => format!("state={}", **state),
            None => "missing".to_string(),
        }
    }

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn dispatches_matching_route() {
        let mut router = Router::new();
        router.route(Method::GET, "/", hello);

        let res = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "hello");
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_wrong_method_is_405() {
        let mut router = Router::new();
        router.route(Method::POST, "/compress", hello);

        let res = router.dispatch(request(Method::GET, "/nope")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = router.dispatch(request(Method::GET, "/compress")).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "POST");
    }

    #[tokio::test]
    async fn state_is_injected_into_extensions() {
        let mut router = Router::new();
        router.state(7u32);
        router.route(Method::GET, "/state", read_state);

        let res = router.dispatch(request(Method::GET, "/state")).await;
        assert_eq!(body_string(res).await, "state=7");
    }

    #[tokio::test]
    async fn router_middleware_runs_before_route_middleware() {
        let mut router = Router::new();
        router.middleware(|req: Request, next: Next| async move {
            let mut res = next.run(req).await;
            res.headers_mut()
                .append("x-order", HeaderValue::from_static("router"));
            res
        });
        let route = router.route(Method::GET, "/", hello);
        route.middleware(|req: Request, next: Next| async move {
            let mut res = next.run(req).await;
            res.headers_mut()
                .append("x-order", HeaderValue::from_static("route"));
            res
        });

        let res = router.dispatch(request(Method::GET, "/")).await;
        let order: Vec<_> = res
            .headers()
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(order, vec!["route", "router"]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let mut router = Router::new();
        router.middleware(|_req: Request, _next: Next| async move {
            (StatusCode::FORBIDDEN, "blocked").into_response()
        });
        router.route(Method::GET, "/", hello);

        let res = router.dispatch(request(Method::GET, "/")).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
