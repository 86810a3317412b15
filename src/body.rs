//! Request body.
//!
//! A body starts life as whatever the connection hands us: a stream of frames
//! from hyper. Anything that needs the bytes reads it once with
//! [`Body::collect`] and, when later code must still see the body, puts a
//! buffered copy back (see [`Request::buffer`](crate::Request::buffer)).

use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};

use crate::error::{BoxError, Error};

/// Body of an incoming request.
pub struct Body(Kind);

enum Kind {
    Empty,
    Full(Bytes),
    Stream(BoxBody<Bytes, BoxError>),
    /// A stream that already failed; every read reports the same cause.
    Failed(String),
}

impl Body {
    pub fn empty() -> Self {
        Self(Kind::Empty)
    }

    /// Wraps any `http_body` implementation, e.g. `hyper::body::Incoming`.
    pub fn wrap<B>(body: B) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self(Kind::Stream(BoxBody::new(body.map_err(Into::into))))
    }

    /// A body whose stream already failed with `err`. Reading it fails again
    /// with the same cause, so a later reader answers as the first would have.
    pub(crate) fn failed(err: &Error) -> Self {
        let cause = std::error::Error::source(err).map_or_else(|| err.to_string(), ToString::to_string);
        Self(Kind::Failed(cause))
    }

    /// Returns the bytes if the body has already been read into memory.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.0 {
            Kind::Full(bytes) => Some(bytes),
            Kind::Empty | Kind::Stream(_) | Kind::Failed(_) => None,
        }
    }

    /// Reads the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, Error> {
        match self.0 {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Full(bytes) => Ok(bytes),
            Kind::Stream(stream) => stream
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .map_err(Error::body),
            Kind::Failed(cause) => Err(Error::body(cause)),
        }
    }
}

impl Default for Body {
    fn default() -> Self { Self::empty() }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self(Kind::Full(bytes)) }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self { Bytes::from(bytes).into() }
}

impl From<String> for Body {
    fn from(s: String) -> Self { Bytes::from(s).into() }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self { Bytes::from_static(s.as_bytes()).into() }
}
