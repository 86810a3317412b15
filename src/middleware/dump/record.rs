//! Roundtrip record types and how they are built.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use flate2::read::MultiGzDecoder;
use http::header::{CONTENT_ENCODING, HeaderMap};
use http::{StatusCode, Version};
use serde::Serialize;
use tracing::debug;

use crate::request::Request;

/// Snapshot of an inbound request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub target: String,
    pub protocol: String,
    /// Every value of every header, in arrival order.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl RequestSnapshot {
    /// Captures `req`, reading its body and putting a re-readable copy back.
    ///
    /// A body that fails to read is recorded as empty. Downstream still gets
    /// the read error, exactly as it would without the capture.
    pub async fn capture(req: &mut Request) -> Self {
        let body = match req.buffer().await {
            Ok(bytes) => lossy(&bytes),
            Err(e) => {
                debug!(error = %e, "request body unreadable, dumping it as empty");
                String::new()
            }
        };

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in req.headers() {
            headers.entry(name.to_string()).or_default().push(lossy(value.as_bytes()));
        }

        Self {
            method: req.method().to_string(),
            target: request_target(req),
            protocol: format!("{:?}", req.version()),
            headers,
            body,
        }
    }
}

/// Snapshot of the response as the client received it, with the body decoded
/// for reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponseSnapshot {
    /// All values of a header joined with no separator.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub status_code: u16,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode, headers: &HeaderMap, raw: &[u8]) -> Self {
        let body = ContentEncoding::of(headers).decode(raw);

        let mut flat: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            flat.entry(name.to_string()).or_default().push_str(&lossy(value.as_bytes()));
        }

        Self { headers: flat, body: lossy(&body), status_code: status.as_u16() }
    }
}

/// One complete request/response exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Roundtrip {
    pub timestamp: DateTime<Utc>,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

impl Roundtrip {
    /// Stamps the record with the current time.
    pub fn new(request: RequestSnapshot, response: ResponseSnapshot) -> Self {
        Self { timestamp: Utc::now(), request, response }
    }
}

/// Response encodings the dump can read through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

impl ContentEncoding {
    /// Only an exact `Content-Encoding: gzip` is decoded; anything else is
    /// kept as written.
    pub fn of(headers: &HeaderMap) -> Self {
        match headers.get(CONTENT_ENCODING) {
            Some(v) if v == "gzip" => Self::Gzip,
            _ => Self::Identity,
        }
    }

    /// Best effort: a corrupt stream yields whatever decoded before the error.
    pub fn decode(self, raw: &[u8]) -> Cow<'_, [u8]> {
        match self {
            Self::Identity => Cow::Borrowed(raw),
            Self::Gzip => {
                let mut out = Vec::new();
                if let Err(e) = MultiGzDecoder::new(raw).read_to_end(&mut out) {
                    debug!(error = %e, decoded = out.len(), "gzip response body did not decode cleanly");
                }
                Cow::Owned(out)
            }
        }
    }
}

/// The request-target in origin-form. HTTP/2 requests arrive with scheme and
/// authority filled in from their pseudo-headers; those are left out so
/// records read the same whichever protocol was negotiated.
fn request_target(req: &Request) -> String {
    match req.version() {
        Version::HTTP_2 => req.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_owned(),
        _ => req.uri().to_string(),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
