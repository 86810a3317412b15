//! Radix-tree request router and the middleware pipeline in front of it.
//!
//! One tree per HTTP method, O(path-length) lookup. Middlewares wrap every
//! request, matched or not, so a 404 is logged and dumped like anything else.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use tracing::warn;

use crate::body::Body;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::writer::ResponseBuffer;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use wiretap::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route or conflicts with one already
    /// registered for the method.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Appends a middleware. The first one added is the outermost: it sees
    /// the request first and the response last.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Runs one request through the middlewares and the matched route.
    ///
    /// A failed write is logged; whatever was committed is still returned.
    pub async fn handle(&self, req: http::Request<Body>) -> http::Response<Full<Bytes>> {
        let req = Request::new(req);
        let (endpoint, params) = match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => (Some(handler), params),
            None => (None, HashMap::new()),
        };

        let mut w = ResponseBuffer::new();
        let next = Next::new(&self.middleware, endpoint);
        if let Err(e) = next.run(&mut w, req.with_params(params)).await {
            warn!(error = %e, "response write failed");
        }
        w.into_response()
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Response, StatusCode};
    use http_body_util::BodyExt;

    async fn user(req: Request) -> Response {
        Response::text(format!("user {}", req.param("id").unwrap_or("?")))
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Bytes) {
        let req = http::Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let res = router.handle(req).await;
        (res.status(), res.into_body().collect().await.unwrap().to_bytes())
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let router = Router::new().on(Method::GET, "/users/{id}", user);

        assert_eq!(call(&router, Method::GET, "/users/42").await, (StatusCode::OK, Bytes::from("user 42")));
        assert_eq!(call(&router, Method::POST, "/users/42").await.0, StatusCode::NOT_FOUND);
        assert_eq!(call(&router, Method::GET, "/nope").await.0, StatusCode::NOT_FOUND);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let _ = Router::new()
            .on(Method::GET, "/users/{id}", user)
            .on(Method::GET, "/users/{id}", user);
    }
}
