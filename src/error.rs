//! Unified error type.

use std::fmt;

/// Boxed error produced by a request body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by wiretap's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, reading a request body, or
/// building header rules from invalid configuration.
#[derive(Debug)]
pub struct Error(Kind);

#[derive(Debug)]
enum Kind {
    Io(std::io::Error),
    Body(BoxError),
    Header(String),
}

impl Error {
    pub(crate) fn body(e: impl Into<BoxError>) -> Self {
        Self(Kind::Body(e.into()))
    }

    pub(crate) fn header(msg: impl Into<String>) -> Self {
        Self(Kind::Header(msg.into()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Io(e)     => write!(f, "io: {e}"),
            Kind::Body(e)   => write!(f, "body: {e}"),
            Kind::Header(m) => write!(f, "invalid header: {m}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            Kind::Io(e)     => Some(e),
            Kind::Body(e)   => Some(e.as_ref()),
            Kind::Header(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(Kind::Io(e))
    }
}
