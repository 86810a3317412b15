//! Middleware layer.
//!
//! A middleware sits between the server and the route handler. It receives
//! the request, the response writer and a [`Next`] that runs the rest of the
//! chain. It may change the request, wrap the writer in a decorator, or do
//! work after the inner chain has written the response.
//!
//! Built-in middleware:
//! - [`Logger`]: one log line per request
//! - [`RequestHeaders`] / [`ResponseHeaders`]: force configured headers, with
//!   CORS origin echo on the response side
//! - [`Dump`]: records the full request/response roundtrip and hands it to a
//!   [`Sink`] off the response path
//!
//! ```rust,no_run
//! use wiretap::{Method, Request, Response, Router, Server};
//! use wiretap::middleware::{Dump, Logger, ResponseHeaders};
//!
//! # async fn hello(_: Request) -> Response { Response::text("hi") }
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET, "/", hello)
//!         .layer(Logger)
//!         .layer(ResponseHeaders::new([("Access-Control-Allow-Origin", "*")]))
//!         .layer(Dump::to_log());
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::handler::{self, BoxedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

pub mod dump;
mod logging;
pub mod rewrite;

pub use dump::{Dump, LogSink, Sink};
pub use logging::Logger;
pub use rewrite::{HeaderOverlay, HeaderRules, RequestHeaders, ResponseHeaders};

/// Future returned by [`Middleware::handle`] and [`Next::run`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A link in the request pipeline.
///
/// The returned error is a failed write to the client. Middlewares propagate
/// it unchanged; the server logs it and sends what was committed.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, io::Result<()>>;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the pipeline: the middlewares not yet run, then the
/// matched route (or a 404 when nothing matched).
pub struct Next<'a> {
    chain: &'a [BoxedMiddleware],
    endpoint: Option<&'a BoxedHandler>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [BoxedMiddleware], endpoint: Option<&'a BoxedHandler>) -> Self {
        Self { chain, endpoint }
    }

    /// Runs the rest of the chain against `w`.
    ///
    /// `w` may borrow for less than `'a`, so a middleware can pass a
    /// decorator that lives on its own stack frame.
    pub fn run<'w>(self, w: &'w mut dyn ResponseWriter, req: Request) -> BoxFuture<'w, io::Result<()>>
    where
        'a: 'w,
    {
        match self.chain.split_first() {
            Some((mw, rest)) => mw.handle(w, req, Next { chain: rest, endpoint: self.endpoint }),
            None => match self.endpoint {
                Some(route) => Box::pin(handler::serve(route, w, req)),
                None => Box::pin(async move { Response::status(StatusCode::NOT_FOUND).write_to(w) }),
            },
        }
    }
}
