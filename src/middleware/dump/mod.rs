//! Roundtrip dumping.
//!
//! [`Dump`] records every request together with the response it produced and
//! hands the [`Roundtrip`] to a [`Sink`]:
//!
//! 1. `OPTIONS` requests pass straight through; pre-flights are not dumped.
//! 2. The request is snapshotted. Its body is read and restored, so the
//!    handler still sees all of it.
//! 3. The writer is wrapped in a [`CaptureWriter`] and the rest of the chain
//!    runs. The client gets exactly what the handler wrote.
//! 4. The response is snapshotted from the captured bytes (gzip decoded) and
//!    the record is timestamped.
//! 5. The sink runs on tokio's blocking pool. The request never waits for it,
//!    and a sink that panics only loses its own record.
//!
//! If writing to the client fails, the error propagates and nothing is
//! dumped for that request.

use std::io;
use std::sync::Arc;

use http::Method;
use tracing::{info, warn};

use super::{BoxFuture, Middleware, Next};
use crate::request::Request;
use crate::writer::ResponseWriter;

mod capture;
mod record;

pub use capture::CaptureWriter;
pub use record::{ContentEncoding, RequestSnapshot, ResponseSnapshot, Roundtrip};

/// Receiver of finished roundtrip records.
///
/// Implemented for any `Fn(Roundtrip) + Send + Sync + 'static`. Runs off the
/// request path, so it may block.
pub trait Sink: Send + Sync + 'static {
    fn consume(&self, record: Roundtrip);
}

impl<F> Sink for F
where
    F: Fn(Roundtrip) + Send + Sync + 'static,
{
    fn consume(&self, record: Roundtrip) {
        self(record)
    }
}

/// Logs each record as one JSON line at `info` under the `wiretap::dump`
/// target.
pub struct LogSink;

impl Sink for LogSink {
    fn consume(&self, record: Roundtrip) {
        let line = serde_json::to_string(&record).unwrap_or_else(|e| {
            warn!(error = %e, "failed to serialize roundtrip");
            String::new()
        });
        info!(target: "wiretap::dump", "{line}");
    }
}

/// Middleware that records full request/response roundtrips.
pub struct Dump<S> {
    sink: Arc<S>,
}

impl<S: Sink> Dump<S> {
    pub fn new(sink: S) -> Self {
        Self { sink: Arc::new(sink) }
    }

    fn dispatch(&self, record: Roundtrip) {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.consume(record));
    }
}

impl Dump<LogSink> {
    /// Dump to the log, one JSON line per roundtrip.
    pub fn to_log() -> Self {
        Self::new(LogSink)
    }
}

impl<S: Sink> Middleware for Dump<S> {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        mut req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, io::Result<()>> {
        if req.method() == Method::OPTIONS {
            return next.run(w, req);
        }

        Box::pin(async move {
            let request = RequestSnapshot::capture(&mut req).await;

            let mut tee = CaptureWriter::new(w);
            next.run(&mut tee, req).await?;

            let response = ResponseSnapshot::new(tee.recorded_status(), tee.headers(), tee.captured());
            self.dispatch(Roundtrip::new(request, response));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use http::{HeaderMap, StatusCode};

    use super::*;

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Lines {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    #[test]
    fn log_sink_writes_one_json_line() {
        let lines = Lines::default();
        let writer = lines.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();

        let record = Roundtrip::new(
            RequestSnapshot {
                method: "GET".into(),
                target: "/users/7".into(),
                protocol: "HTTP/1.1".into(),
                headers: BTreeMap::new(),
                body: String::new(),
            },
            ResponseSnapshot::new(StatusCode::OK, &HeaderMap::new(), br#"{"id":7}"#),
        );
        tracing::subscriber::with_default(subscriber, || LogSink.consume(record));

        let out = String::from_utf8(lines.0.lock().unwrap().clone()).unwrap();
        let logged: Vec<&str> = out.lines().collect();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("wiretap::dump"));

        let json = &logged[0][logged[0].find('{').unwrap()..];
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["request"]["target"], "/users/7");
        assert_eq!(value["response"]["body"], r#"{"id":7}"#);
        assert_eq!(value["response"]["status_code"], 200);
    }
}
