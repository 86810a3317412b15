//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version, request::Parts};

use crate::body::Body;
use crate::error::Error;

/// An incoming HTTP request: the head hyper parsed, the body, and any path
/// parameters captured by the router.
pub struct Request {
    head: Parts,
    body: Body,
    params: HashMap<String, String>,
}

impl Request {
    pub fn new(req: http::Request<Body>) -> Self {
        let (head, body) = req.into_parts();
        Self { head, body, params: HashMap::new() }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn version(&self) -> Version { self.head.version }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.head.headers }

    /// Case-insensitive header lookup. Returns the first value if it is
    /// visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered request body.
    ///
    /// Route handlers always see the full body here: the pipeline reads it
    /// into memory before invoking them. Middlewares that run earlier see an
    /// empty slice until someone calls [`Request::buffer`].
    pub fn body(&self) -> &[u8] {
        self.body.as_bytes().map(|b| &b[..]).unwrap_or(&[])
    }

    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Reads the body into memory and puts an identical, re-readable copy
    /// back, so code running later observes the request as if untouched.
    ///
    /// On a read error the body is replaced by one that fails again with
    /// the same cause, so the next reader sees the error too.
    pub async fn buffer(&mut self) -> Result<Bytes, Error> {
        match self.take_body().collect().await {
            Ok(bytes) => {
                self.body = Body::from(bytes.clone());
                Ok(bytes)
            }
            Err(e) => {
                self.body = Body::failed(&e);
                Err(e)
            }
        }
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
