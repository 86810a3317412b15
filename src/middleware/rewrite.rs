//! Header rewriting for requests and responses.
//!
//! Configuration is a plain `name → value` map, parsed once into
//! [`HeaderRules`]. From the rules the engine derives a [`HeaderOverlay`]:
//! the exact set of headers to force onto a message.
//!
//! - Request side: the overlay is the rules verbatim, built once.
//! - Response side: the overlay is built per request, because a rule
//!   `Access-Control-Allow-Origin: *` echoes the request's `Origin` instead of
//!   the literal `*` (browsers reject `*` on credentialed requests).
//!
//! The response overlay is applied when the status is committed, replacing
//! whatever the handler set under the same names. If the final header set
//! carries `Access-Control-Allow-Origin` but no `Access-Control-Allow-Headers`,
//! `Access-Control-Allow-Headers: *` is added.

use std::collections::BTreeMap;
use std::io;

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, HeaderMap, HeaderName,
    HeaderValue, ORIGIN,
};
use http::StatusCode;
use serde::Deserialize;

use super::{BoxFuture, Middleware, Next};
use crate::error::Error;
use crate::request::Request;
use crate::writer::ResponseWriter;

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Parsed header configuration: one value per header name.
///
/// Deserializes from a string map, so it can sit in an application's config
/// file:
///
/// ```rust
/// # use wiretap::middleware::HeaderRules;
/// let rules: HeaderRules = serde_json::from_str(
///     r#"{"Access-Control-Allow-Origin": "*", "X-Frame-Options": "DENY"}"#,
/// ).unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct HeaderRules {
    rules: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderRules {
    /// Parses `name → value` pairs. A name given twice (in any case) keeps
    /// the last value.
    pub fn try_from_iter<I, K, V>(headers: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rules: Vec<(HeaderName, HeaderValue)> = Vec::new();
        for (name, value) in headers {
            let (name, value) = (name.as_ref(), value.as_ref());
            let name = HeaderName::try_from(name).map_err(|_| Error::header(format!("name `{name}`")))?;
            let value = HeaderValue::try_from(value)
                .map_err(|_| Error::header(format!("value for `{name}`")))?;
            match rules.iter_mut().find(|(n, _)| *n == name) {
                Some(rule) => rule.1 = value,
                None => rules.push((name, value)),
            }
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize { self.rules.len() }
    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    /// Overlay for inbound requests: every rule verbatim.
    pub fn request_overlay(&self) -> HeaderOverlay {
        HeaderOverlay {
            entries: self.rules.iter().map(|(n, v)| (n.clone(), vec![v.clone()])).collect(),
        }
    }

    /// Overlay for the response to a request carrying `request` headers.
    ///
    /// `Access-Control-Allow-Origin: *` becomes every `Origin` value of the
    /// request. Without an `Origin` the overlay removes the header.
    pub fn response_overlay(&self, request: &HeaderMap) -> HeaderOverlay {
        let entries = self
            .rules
            .iter()
            .map(|(name, value)| {
                let values = if *name == ACCESS_CONTROL_ALLOW_ORIGIN && value == "*" {
                    request.get_all(ORIGIN).iter().cloned().collect()
                } else {
                    vec![value.clone()]
                };
                (name.clone(), values)
            })
            .collect();
        HeaderOverlay { entries }
    }
}

impl TryFrom<BTreeMap<String, String>> for HeaderRules {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::try_from_iter(map)
    }
}

// ── Overlay ───────────────────────────────────────────────────────────────────

/// Headers to force onto a message. An entry with no values removes the
/// header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderOverlay {
    entries: Vec<(HeaderName, Vec<HeaderValue>)>,
}

impl HeaderOverlay {
    pub fn get(&self, name: &HeaderName) -> Option<&[HeaderValue]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Replaces every overlaid header in `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, values) in &self.entries {
            headers.remove(name);
            for value in values {
                headers.append(name.clone(), value.clone());
            }
        }
    }
}

/// Adds `Access-Control-Allow-Headers: *` when an allowed origin is set and
/// no allowed headers are.
fn allow_any_headers(headers: &mut HeaderMap) {
    if headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN)
        && !headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS)
    {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    }
}

// ── RewriteWriter ─────────────────────────────────────────────────────────────

/// Writer decorator that applies a response overlay the moment headers are
/// committed: on the first `write_header`, or on the first `write` when the
/// handler never sets a status.
pub struct RewriteWriter<W> {
    inner: W,
    overlay: HeaderOverlay,
    finalized: bool,
}

impl<W: ResponseWriter> RewriteWriter<W> {
    pub fn new(inner: W, overlay: HeaderOverlay) -> Self {
        Self { inner, overlay, finalized: false }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.overlay.apply(self.inner.headers_mut());
        allow_any_headers(self.inner.headers_mut());
    }
}

impl<W: ResponseWriter> ResponseWriter for RewriteWriter<W> {
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }

    fn write_header(&mut self, status: StatusCode) {
        self.finalize();
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.finalize();
        self.inner.write(buf)
    }

    fn status(&self) -> StatusCode { self.inner.status() }
}

// ── Middlewares ───────────────────────────────────────────────────────────────

/// Forces configured headers onto every inbound request before it moves on.
pub struct RequestHeaders {
    overlay: HeaderOverlay,
}

impl RequestHeaders {
    /// # Panics
    ///
    /// Panics if a name or value is not a valid HTTP header. Use
    /// [`HeaderRules::try_from_iter`] and `From<HeaderRules>` to handle that
    /// yourself.
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        HeaderRules::try_from_iter(headers)
            .unwrap_or_else(|e| panic!("invalid request header rule: {e}"))
            .into()
    }
}

impl From<HeaderRules> for RequestHeaders {
    fn from(rules: HeaderRules) -> Self {
        Self { overlay: rules.request_overlay() }
    }
}

impl Middleware for RequestHeaders {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        mut req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, io::Result<()>> {
        self.overlay.apply(req.headers_mut());
        next.run(w, req)
    }
}

/// Forces configured headers onto every response, echoing the request's
/// `Origin` for an `Access-Control-Allow-Origin: *` rule.
pub struct ResponseHeaders {
    rules: HeaderRules,
}

impl ResponseHeaders {
    /// # Panics
    ///
    /// Panics if a name or value is not a valid HTTP header.
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        HeaderRules::try_from_iter(headers)
            .unwrap_or_else(|e| panic!("invalid response header rule: {e}"))
            .into()
    }
}

impl From<HeaderRules> for ResponseHeaders {
    fn from(rules: HeaderRules) -> Self {
        Self { rules }
    }
}

impl Middleware for ResponseHeaders {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, io::Result<()>> {
        let overlay = self.rules.response_overlay(req.headers());
        Box::pin(async move {
            let mut w = RewriteWriter::new(w, overlay);
            next.run(&mut w, req).await
        })
    }
}
