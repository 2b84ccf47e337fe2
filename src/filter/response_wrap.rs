//! Response envelope filter.
//!
//! # Responsibilities
//! - Decorate the exchange's response writer before the backend runs
//! - Buffer the whole outbound payload, wrap it as `{code, msg, data}`
//! - Rewrite framing headers to match the bytes actually emitted
//!
//! # Design Decisions
//! - Order -2 so the decorator sits outside the transport write (-1)
//! - The payload is treated as opaque text: `data` is a JSON string
//! - Content-Length is computed from the serialized envelope, after
//!   serialization, and the envelope leaves as one chunk
//! - Serialization and read failures propagate; nothing is half-written
//! - HEAD requests and bodiless statuses (1xx, 204, 304) pass through unwrapped
//! - `Accept-Encoding` is dropped from the request so the upstream answers in
//!   plain text; representation headers of the original payload are removed

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;

use crate::envelope::{self, Envelope, SUCCESS_CODE, SUCCESS_MSG};
use crate::error::{GatewayError, GatewayResult};
use crate::filter::body::{BodyBuffer, Charset};
use crate::filter::chain::Next;
use crate::filter::exchange::{Exchange, ResponseWriter, ServerResponse};
use crate::filter::GlobalFilter;

/// Default position of the filter in the chain.
pub const RESPONSE_WRAP_ORDER: i32 = -2;

const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// Headers describing the original payload bytes, stale after rewriting.
const REPRESENTATION_HEADERS: [&str; 4] =
    ["content-encoding", "etag", "content-md5", "content-range"];

/// Statuses that never carry a body.
fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

/// Writer decorator that wraps the payload in the success envelope.
pub struct EnvelopeWriter {
    inner: Arc<dyn ResponseWriter>,
    buffer: BodyBuffer,
    code: Arc<str>,
    msg: Arc<str>,
}

impl EnvelopeWriter {
    pub fn new(inner: Arc<dyn ResponseWriter>, buffer: BodyBuffer, code: Arc<str>, msg: Arc<str>) -> Self {
        Self {
            inner,
            buffer,
            code,
            msg,
        }
    }

    async fn wrap(&self, body: Body) -> GatewayResult<Bytes> {
        let captured = self
            .buffer
            .capture(body, Charset::Utf8)
            .await
            .map_err(|e| match e {
                GatewayError::BodyTooLarge { .. } => {
                    GatewayError::status(StatusCode::BAD_GATEWAY, "Upstream Response Too Large")
                }
                other => other,
            })?;
        let text = captured.text().into_owned();
        tracing::debug!(original = %text, "Wrapping response payload");

        let wrapped = Envelope::wrap_text(self.code.as_ref(), self.msg.as_ref(), text);
        let bytes = envelope::encode(&wrapped)?;
        Ok(Bytes::from(bytes))
    }
}

impl ResponseWriter for EnvelopeWriter {
    fn write_with<'a>(
        &'a self,
        response: &'a mut ServerResponse,
        body: Body,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            if is_bodiless(response.status()) {
                return self.inner.write_with(response, body).await;
            }

            let payload = self.wrap(body).await?;

            let headers = response.headers_mut();
            headers.remove(header::TRANSFER_ENCODING);
            for name in REPRESENTATION_HEADERS {
                headers.remove(name);
            }
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));

            self.inner.write_with(response, Body::from(payload)).await
        })
    }
}

/// Wraps every successful response in the normalized envelope.
pub struct ResponseWrapFilter {
    order: i32,
    buffer: BodyBuffer,
    code: Arc<str>,
    msg: Arc<str>,
}

impl ResponseWrapFilter {
    pub fn new(buffer: BodyBuffer) -> Self {
        Self {
            order: RESPONSE_WRAP_ORDER,
            buffer,
            code: Arc::from(SUCCESS_CODE),
            msg: Arc::from(SUCCESS_MSG),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Override the success code and message.
    pub fn with_success(mut self, code: &str, msg: &str) -> Self {
        self.code = Arc::from(code);
        self.msg = Arc::from(msg);
        self
    }
}

impl Default for ResponseWrapFilter {
    fn default() -> Self {
        Self::new(BodyBuffer::unbounded())
    }
}

impl GlobalFilter for ResponseWrapFilter {
    fn name(&self) -> &'static str {
        "response_wrap"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn filter<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        chain: Next<'a>,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        if exchange.method() == Method::HEAD {
            return chain.run(exchange);
        }

        exchange.headers_mut().remove(header::ACCEPT_ENCODING);
        let buffer = self.buffer;
        let code = Arc::clone(&self.code);
        let msg = Arc::clone(&self.msg);
        exchange.decorate_writer(move |inner| Arc::new(EnvelopeWriter::new(inner, buffer, code, msg)));
        chain.run(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::envelope::ErrorBody;
    use crate::filter::chain::FilterChain;
    use axum::http::{Request, Response};
    use futures_util::stream;
    use std::io;

    struct Fixed(Vec<&'static str>);

    impl Backend for Fixed {
        fn invoke(&self, _request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>> {
            let chunks: Vec<Result<&'static str, io::Error>> = self.0.iter().map(|c| Ok(*c)).collect();
            Box::pin(async move {
                let response = Response::builder()
                    .status(StatusCode::CREATED)
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, "999")
                    .body(Body::from_stream(stream::iter(chunks)))
                    .unwrap();
                Ok(response)
            })
        }
    }

    struct Broken;

    impl Backend for Broken {
        fn invoke(&self, _request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>> {
            Box::pin(async move {
                let chunks: Vec<Result<&'static str, io::Error>> =
                    vec![Ok("{\"y\""), Err(io::Error::other("upstream reset"))];
                Ok(Response::new(Body::from_stream(stream::iter(chunks))))
            })
        }
    }

    async fn run(chain: FilterChain) -> (GatewayResult<()>, Exchange) {
        let mut exchange = Exchange::new(Request::new(Body::empty()));
        let result = chain.run(&mut exchange).await;
        (result, exchange)
    }

    #[tokio::test]
    async fn multi_chunk_payload_is_wrapped_with_exact_length() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(Fixed(vec!["{\"y\"", ":", "2}"]))
            .build()
            .unwrap();
        let (result, exchange) = run(chain).await;
        result.unwrap();

        let response = exchange.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_UTF8);
        let length: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        assert_eq!(length, body.len());
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            r#"{"code":"000000","msg":"请求成功","data":"{\"y\":2}"}"#
        );
    }

    #[tokio::test]
    async fn empty_payload_still_framed() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default().with_success("0", "ok"))
            .backend(Fixed(vec![]))
            .build()
            .unwrap();
        let (result, exchange) = run(chain).await;
        result.unwrap();

        let response = exchange.into_response();
        let length = response.headers()[header::CONTENT_LENGTH].clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"code":"0","msg":"ok","data":""}"#);
        assert_eq!(length, body.len().to_string().as_str());
    }

    #[tokio::test]
    async fn broken_upstream_stream_leaves_response_uncommitted() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(Broken)
            .build()
            .unwrap();
        let (result, exchange) = run(chain).await;

        assert!(matches!(result, Err(GatewayError::StreamRead(_))));
        assert!(!exchange.is_committed());
    }

    #[tokio::test]
    async fn oversized_upstream_payload_maps_to_bad_gateway() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::new(BodyBuffer::new(3)))
            .backend(Fixed(vec!["{\"y\":2}"]))
            .build()
            .unwrap();
        let (result, exchange) = run(chain).await;

        assert!(matches!(result, Err(GatewayError::Status { status, .. }) if status == StatusCode::BAD_GATEWAY));
        assert!(!exchange.is_committed());
    }

    #[tokio::test]
    async fn direct_writes_bypass_the_envelope() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(Broken)
            .build()
            .unwrap();
        let (_, mut exchange) = run(chain).await;

        let payload = envelope::encode(&ErrorBody {
            code: 500,
            message: "Internal Server Error".into(),
        })
        .unwrap();
        exchange
            .write_direct(StatusCode::INTERNAL_SERVER_ERROR, Default::default(), Bytes::from(payload.clone()))
            .await
            .unwrap();
        let body = axum::body::to_bytes(exchange.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.to_vec(), payload);
    }

    /// Compressed upstream that records the `Accept-Encoding` it was sent.
    #[derive(Default, Clone)]
    struct Gzipped {
        accept_encoding: Arc<std::sync::Mutex<Vec<Option<String>>>>,
    }

    impl Backend for Gzipped {
        fn invoke(&self, request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>> {
            let seen = request
                .headers()
                .get(header::ACCEPT_ENCODING)
                .map(|v| v.to_str().unwrap().to_string());
            self.accept_encoding.lock().unwrap().push(seen);
            Box::pin(async move {
                Ok(Response::builder()
                    .header(header::CONTENT_ENCODING, "gzip")
                    .header(header::ETAG, "\"abc\"")
                    .header(header::CONTENT_LENGTH, "5")
                    .body(Body::from(vec![0x1f, 0x8b, 0x08, 0x00, 0xff]))
                    .unwrap())
            })
        }
    }

    struct NoContent;

    impl Backend for NoContent {
        fn invoke(&self, _request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>> {
            Box::pin(async move {
                Ok(Response::builder()
                    .status(StatusCode::NO_CONTENT)
                    .body(Body::empty())
                    .unwrap())
            })
        }
    }

    #[tokio::test]
    async fn accept_encoding_is_dropped_and_encoding_headers_removed() {
        let upstream = Gzipped::default();
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(upstream.clone())
            .build()
            .unwrap();

        let request = Request::builder()
            .header(header::ACCEPT_ENCODING, "gzip, br")
            .body(Body::empty())
            .unwrap();
        let mut exchange = Exchange::new(request);
        chain.run(&mut exchange).await.unwrap();

        assert_eq!(*upstream.accept_encoding.lock().unwrap(), vec![None]);

        let response = exchange.into_response();
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert!(response.headers().get(header::ETAG).is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_UTF8);
        let length = response.headers()[header::CONTENT_LENGTH].clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(length, body.len().to_string().as_str());
        assert!(envelope::decode::<Envelope>(&body).is_ok());
    }

    #[tokio::test]
    async fn no_content_passes_through_unwrapped() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(NoContent)
            .build()
            .unwrap();
        let (result, exchange) = run(chain).await;
        result.unwrap();

        let response = exchange.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn head_request_keeps_upstream_framing() {
        let chain = FilterChain::builder()
            .register(ResponseWrapFilter::default())
            .backend(Fixed(vec![]))
            .build()
            .unwrap();
        let request = Request::builder()
            .method(Method::HEAD)
            .body(Body::empty())
            .unwrap();
        let mut exchange = Exchange::new(request);
        chain.run(&mut exchange).await.unwrap();

        let response = exchange.into_response();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "999");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
