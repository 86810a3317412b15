//! # wiretap
//!
//! A minimal HTTP framework for services behind a reverse proxy, built around
//! the middlewares you reach for when you need to see and shape the traffic:
//!
//! - [`Logger`](middleware::Logger): one line per request
//! - [`Dump`](middleware::Dump): full request/response roundtrip, gzip bodies
//!   decoded, handed to a sink of your choice without delaying the response
//! - [`RequestHeaders`](middleware::RequestHeaders) /
//!   [`ResponseHeaders`](middleware::ResponseHeaders): force headers in
//!   either direction, with CORS origin echo
//!
//! TLS, rate limiting and body-size limits belong to the proxy in front.
//!
//! ## How a request flows
//!
//! ```text
//! hyper ─► Router::handle ─► Logger ─► RequestHeaders ─► ResponseHeaders ─► Dump ─► route
//!                │                                              │              │
//!          ResponseBuffer ◄──────────── RewriteWriter ◄──── CaptureWriter ◄────┘
//! ```
//!
//! Route handlers return a [`Response`]; the pipeline writes it through the
//! [`ResponseWriter`] chain so each decorator sees the same bytes the client
//! gets.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wiretap::{Method, Request, Response, Router, Server, StatusCode};
//! use wiretap::middleware::{Dump, Logger, ResponseHeaders};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .on(Method::POST, "/echo", echo)
//!         .layer(Logger)
//!         .layer(ResponseHeaders::new([("Access-Control-Allow-Origin", "*")]))
//!         .layer(Dump::to_log());
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn echo(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::json(req.body().to_vec())
//! }
//! ```

mod body;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod writer;

pub mod middleware;

pub use body::Body;
pub use error::{BoxError, Error};
pub use handler::Handler;
pub use http::{Method, StatusCode, Version, header};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use writer::{ResponseBuffer, ResponseWriter};
