//! The response writer contract and the in-memory writer the server sends from.
//!
//! Middlewares never see a finished [`Response`](crate::Response). They see a
//! [`ResponseWriter`]: a place to set headers, commit a status and write body
//! bytes. Decorators (header rewriting, roundtrip capture) implement the same
//! trait around an inner writer and nest freely.
//!
//! ```text
//! Router::handle
//!   └─ ResponseBuffer                 ← real writer, becomes the http::Response
//!        └─ RewriteWriter             ← applies header overlay on commit
//!             └─ CaptureWriter        ← tees bytes + records status
//!                  └─ route handler   ← Response::write_to(writer)
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::{debug, warn};

/// Capability set shared by the real writer and every decorator around it.
pub trait ResponseWriter: Send {
    /// Headers that will be sent with the status line.
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status code and the current header set.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, committing `200 OK` first if no status was written.
    /// Returns how many bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// The committed status, or the one that will be sent if none is written.
    fn status(&self) -> StatusCode;

    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers(&self) -> &HeaderMap { (**self).headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { (**self).headers_mut() }
    fn write_header(&mut self, status: StatusCode) { (**self).write_header(status) }
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { (**self).write(buf) }
    fn status(&self) -> StatusCode { (**self).status() }
}

// ── ResponseBuffer ────────────────────────────────────────────────────────────

/// The real writer: accumulates one response in memory and converts it into
/// the `http::Response` hyper sends.
///
/// Behaves like a wire writer. Headers are frozen once the status is
/// committed; later changes to [`headers_mut`](ResponseWriter::headers_mut)
/// are not sent. Writing a body under a status that forbids one fails.
/// Informational (1xx) statuses are ignored and do not commit.
#[derive(Default)]
pub struct ResponseBuffer {
    headers: HeaderMap,
    committed: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Finishes the response. A writer nobody wrote to becomes an empty `200 OK`.
    pub fn into_response(mut self) -> http::Response<Full<Bytes>> {
        let (status, headers) = match self.committed.take() {
            Some(committed) => committed,
            None => (StatusCode::OK, self.headers),
        };
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write_header(&mut self, status: StatusCode) {
        // Interim responses cannot be sent from a buffer; the final status
        // is still to come.
        if status.is_informational() {
            debug!(%status, "ignoring informational status");
            return;
        }
        if let Some((sent, _)) = &self.committed {
            warn!(%sent, ignored = %status, "superfluous write_header call");
            return;
        }
        self.committed = Some((status, self.headers.clone()));
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed.is_none() {
            self.write_header(StatusCode::OK);
        }
        let status = self.status();
        if !allows_body(status) {
            return Err(io::Error::other(format!("status {status} does not allow a body")));
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn status(&self) -> StatusCode {
        self.committed.as_ref().map_or(StatusCode::OK, |(status, _)| *status)
    }
}

fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}
