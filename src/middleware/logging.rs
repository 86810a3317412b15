use std::io;

use tracing::info;

use super::{BoxFuture, Middleware, Next};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Logs the method and target of every request, then passes it on untouched.
pub struct Logger;

impl Middleware for Logger {
    fn handle<'a>(
        &'a self,
        w: &'a mut dyn ResponseWriter,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, io::Result<()>> {
        info!(method = %req.method(), uri = %req.uri(), "request");
        next.run(w, req)
    }
}
