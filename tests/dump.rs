use std::io::Write;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use http_body_util::{BodyExt, Full};
use tokio::sync::mpsc;
use wiretap::middleware::dump::Roundtrip;
use wiretap::middleware::{Dump, ResponseHeaders};
use wiretap::{Body, Method, Request, Response, Router, StatusCode};

fn dump() -> (Dump<impl wiretap::middleware::Sink>, mpsc::UnboundedReceiver<Roundtrip>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = move |record: Roundtrip| {
        let _ = tx.send(record);
    };
    (Dump::new(sink), rx)
}

async fn next_record(rx: &mut mpsc::UnboundedReceiver<Roundtrip>) -> Roundtrip {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink was not called")
        .expect("sink dropped")
}

async fn send(router: &Router, req: http::Request<Body>) -> (StatusCode, http::HeaderMap, Bytes) {
    let res = router.handle(req).await;
    let (parts, body) = res.into_parts();
    (parts.status, parts.headers, body.collect().await.unwrap().to_bytes())
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Upload that fails on its first frame, like a client resetting mid-body.
struct Reset;

impl hyper::body::Body for Reset {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<hyper::body::Frame<Bytes>, Self::Error>>> {
        Poll::Ready(Some(Err(std::io::Error::other("client reset"))))
    }
}

async fn echo(req: Request) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .bytes("application/octet-stream", req.body().to_vec())
}

#[tokio::test]
async fn handler_sees_the_body_the_dump_captured() {
    let (dump, mut rx) = dump();
    let router = Router::new().on(Method::POST, "/echo", echo).layer(dump);

    let body = Body::wrap(Full::new(Bytes::from_static(b"hello dump")));
    let req = http::Request::post("/echo?v=1").header("x-client", "test").body(body).unwrap();
    let (status, _, sent) = send(&router, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent, "hello dump");

    let record = next_record(&mut rx).await;
    assert_eq!(record.request.method, "POST");
    assert_eq!(record.request.target, "/echo?v=1");
    assert_eq!(record.request.headers["x-client"], ["test"]);
    assert_eq!(record.request.body, "hello dump");
    assert_eq!(record.response.body, "hello dump");
    assert_eq!(record.response.status_code, 201);
    assert_eq!(record.response.headers["content-type"], "application/octet-stream");
}

#[tokio::test]
async fn large_and_empty_bodies_survive_capture() {
    let (dump, mut rx) = dump();
    let router = Router::new().on(Method::PUT, "/blob", echo).layer(dump);

    let big: Vec<u8> = (0..1_000_000u32).map(|i| b'a' + (i % 26) as u8).collect();
    let (_, _, sent) = send(&router, http::Request::put("/blob").body(Body::from(big.clone())).unwrap()).await;
    assert_eq!(sent.len(), big.len());
    assert_eq!(&sent[..], &big[..]);
    assert_eq!(next_record(&mut rx).await.request.body.len(), big.len());

    let (_, _, sent) = send(&router, http::Request::put("/blob").body(Body::empty()).unwrap()).await;
    assert!(sent.is_empty());
    assert_eq!(next_record(&mut rx).await.request.body, "");
}

#[tokio::test]
async fn gzip_is_decoded_for_the_dump_only() {
    let compressed = Bytes::from(gzip(b"{\"message\":\"plain text inside\"}"));
    let wire = compressed.clone();

    let (dump, mut rx) = dump();
    let router = Router::new()
        .on(Method::GET, "/zipped", move |_req: Request| {
            let wire = wire.clone();
            async move {
                Response::builder()
                    .header("content-encoding", "gzip")
                    .json(wire)
            }
        })
        .layer(dump);

    let (_, headers, sent) = send(&router, http::Request::get("/zipped").body(Body::empty()).unwrap()).await;
    assert_eq!(headers["content-encoding"], "gzip");
    assert_eq!(sent, compressed);

    let record = next_record(&mut rx).await;
    assert_eq!(record.response.body, "{\"message\":\"plain text inside\"}");
}

#[tokio::test]
async fn options_requests_are_never_dumped() {
    let (dump, mut rx) = dump();
    let router = Router::new()
        .on(Method::OPTIONS, "/users", |_req: Request| async { StatusCode::NO_CONTENT })
        .layer(dump);

    let (status, _, _) = send(&router, http::Request::options("/users").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    drop(router);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn unmatched_requests_are_dumped_with_their_status() {
    let (dump, mut rx) = dump();
    let router = Router::new().layer(dump);

    let (status, _, _) = send(&router, http::Request::get("/missing").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let record = next_record(&mut rx).await;
    assert_eq!(record.response.status_code, 404);
    assert_eq!(record.request.target, "/missing");
}

#[tokio::test]
async fn failed_write_skips_the_dump() {
    let (dump, mut rx) = dump();
    let router = Router::new()
        .on(Method::GET, "/odd", |_req: Request| async {
            Response::builder().status(StatusCode::NO_CONTENT).text("a body a 204 cannot carry")
        })
        .layer(dump);

    let (status, _, sent) = send(&router, http::Request::get("/odd").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(sent.is_empty());

    drop(router);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn dump_sees_rewritten_response_headers() {
    let (dump, mut rx) = dump();
    let router = Router::new()
        .on(Method::GET, "/", |_req: Request| async { "ok" })
        .layer(ResponseHeaders::new([("Access-Control-Allow-Origin", "*")]))
        .layer(dump);

    let req = http::Request::get("/").header("origin", "https://example.com").body(Body::empty()).unwrap();
    send(&router, req).await;

    let record = next_record(&mut rx).await;
    assert_eq!(record.response.headers["access-control-allow-origin"], "https://example.com");
    assert_eq!(record.response.headers["access-control-allow-headers"], "*");
    assert_eq!(record.response.body, "ok");
}

#[tokio::test]
async fn unreadable_body_gets_the_same_answer_with_or_without_dump() {
    let plain = Router::new().on(Method::POST, "/users", echo);
    let (dump, mut rx) = dump();
    let dumped = Router::new().on(Method::POST, "/users", echo).layer(dump);

    let broken = || http::Request::post("/users").body(Body::wrap(Reset)).unwrap();
    let (without, _, _) = send(&plain, broken()).await;
    let (with, _, sent) = send(&dumped, broken()).await;

    assert_eq!(without, StatusCode::BAD_REQUEST);
    assert_eq!(with, without);
    assert!(sent.is_empty());

    let record = next_record(&mut rx).await;
    assert_eq!(record.request.body, "");
    assert_eq!(record.response.status_code, 400);
}

#[tokio::test]
async fn each_request_is_dumped_once() {
    let (dump, mut rx) = dump();
    let router = Router::new().on(Method::POST, "/echo", echo).layer(dump);

    for body in ["one", "two"] {
        send(&router, http::Request::post("/echo").body(Body::from(body)).unwrap()).await;
    }
    let mut bodies = vec![next_record(&mut rx).await.request.body, next_record(&mut rx).await.request.body];
    bodies.sort();
    assert_eq!(bodies, ["one", "two"]);

    // Pending sink calls hold the sender; `None` means all of them ran.
    drop(router);
    assert!(rx.recv().await.is_none());
}
