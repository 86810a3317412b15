//! Tee writer: everything the handler sends goes to the real writer and,
//! once accepted there, into an in-memory copy.
//!
//! The copy holds the entire body for the life of one request. There is no
//! size cap and no streaming decode.

use std::io;

use bytes::BytesMut;
use http::{HeaderMap, StatusCode};

use crate::writer::ResponseWriter;

/// Writer decorator recording the status and a verbatim copy of the body.
pub struct CaptureWriter<W> {
    inner: W,
    captured: BytesMut,
    status: Option<StatusCode>,
}

impl<W: ResponseWriter> CaptureWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, captured: BytesMut::new(), status: None }
    }

    /// Body bytes accepted by the real writer so far, in write order.
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// The last final (non-1xx) status the handler set, or the wrapped
    /// writer's own status when it never set one.
    pub fn recorded_status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.inner.status())
    }
}

impl<W: ResponseWriter> ResponseWriter for CaptureWriter<W> {
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }

    fn write_header(&mut self, status: StatusCode) {
        if !status.is_informational() {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn status(&self) -> StatusCode { self.inner.status() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ResponseBuffer;
    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn client_and_copy_see_the_same_bytes() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        for chunk in [&b"first,"[..], &b""[..], &b"second,"[..], &b"third"[..]] {
            w.write_all(chunk).unwrap();
        }
        assert_eq!(w.captured(), b"first,second,third");

        let sent = w.inner.into_response().into_body().collect().await.unwrap().to_bytes();
        assert_eq!(sent, "first,second,third");
    }

    #[test]
    fn header_access_passes_through() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        w.headers_mut().insert(CONTENT_TYPE, "text/html".parse().unwrap());
        assert_eq!(w.inner.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(w.headers()[CONTENT_TYPE], "text/html");
    }

    #[test]
    fn last_status_is_recorded() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        w.write_header(StatusCode::ACCEPTED);
        w.write_header(StatusCode::BAD_GATEWAY);
        assert_eq!(w.recorded_status(), StatusCode::BAD_GATEWAY);
        // The real writer kept the first one.
        assert_eq!(w.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn informational_status_is_not_recorded() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        w.write_header(StatusCode::CONTINUE);
        w.write_all(b"body").unwrap();
        assert_eq!(w.recorded_status(), StatusCode::OK);
    }

    #[test]
    fn default_status_comes_from_the_real_writer() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        w.write_all(b"no explicit status").unwrap();
        assert_eq!(w.recorded_status(), StatusCode::OK);
    }

    #[test]
    fn failed_forward_is_not_captured() {
        let mut w = CaptureWriter::new(ResponseBuffer::new());
        w.write_header(StatusCode::NOT_MODIFIED);
        assert!(w.write(b"stale").is_err());
        assert!(w.captured().is_empty());
    }
}
