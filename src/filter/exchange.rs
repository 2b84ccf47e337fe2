//! Per-request exchange.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → Exchange::new (split into parts + replaceable body)
//!     → filters read metadata, take/replace the body, decorate the writer
//!     → backend response → write_response → writer stack → TransportWriter
//!     → Exchange::into_response
//! ```
//!
//! # Design Decisions
//! - The exchange is owned by one request; nothing in it is shared
//! - The request body can be taken at most once
//! - Writers form a decorator stack; the transport writer is innermost and
//!   is the only place a response becomes committed
//! - Once committed, no further write is accepted

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{request, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use futures_util::future::BoxFuture;
use futures_util::stream;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::http::request::X_REQUEST_ID;

/// Outbound response state held by the exchange.
#[derive(Debug)]
pub struct ServerResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Body>,
    committed: bool,
}

impl ServerResponse {
    fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            committed: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Hand the body to the transport. Irreversible.
    pub fn commit(&mut self, body: Body) -> GatewayResult<()> {
        if self.committed {
            return Err(GatewayError::ResponseCommitted);
        }
        self.body = Some(body);
        self.committed = true;
        Ok(())
    }
}

/// One layer of the outbound write path.
pub trait ResponseWriter: Send + Sync + 'static {
    fn write_with<'a>(
        &'a self,
        response: &'a mut ServerResponse,
        body: Body,
    ) -> BoxFuture<'a, GatewayResult<()>>;
}

/// Innermost writer: commits the body for transmission.
#[derive(Debug, Default)]
pub struct TransportWriter;

impl ResponseWriter for TransportWriter {
    fn write_with<'a>(
        &'a self,
        response: &'a mut ServerResponse,
        body: Body,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move { response.commit(body) })
    }
}

/// Per-request mutable context carried through the filter chain.
pub struct Exchange {
    request_id: String,
    parts: request::Parts,
    body: Option<Body>,
    response: ServerResponse,
    writer: Arc<dyn ResponseWriter>,
    transport: Arc<dyn ResponseWriter>,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let transport: Arc<dyn ResponseWriter> = Arc::new(TransportWriter);

        Self {
            request_id,
            parts,
            body: Some(body),
            response: ServerResponse::new(),
            writer: Arc::clone(&transport),
            transport,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Decoded query parameters in request order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// Take the request body. Returns `None` once it has been taken.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Install a replacement request body for downstream consumers.
    pub fn replace_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Assemble the request handed to the backend. Consumes the body.
    pub fn forward_request(&mut self) -> GatewayResult<Request<Body>> {
        let body = self.take_body().unwrap_or_else(Body::empty);
        let mut builder = Request::builder()
            .method(self.parts.method.clone())
            .uri(self.parts.uri.clone())
            .version(self.parts.version);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.parts.headers.clone());
            if let Ok(value) = HeaderValue::from_str(&self.request_id) {
                headers.insert(X_REQUEST_ID, value);
            }
        }
        builder
            .body(body)
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }

    pub fn response(&self) -> &ServerResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ServerResponse {
        &mut self.response
    }

    pub fn is_committed(&self) -> bool {
        self.response.is_committed()
    }

    /// Wrap the current response writer with a decorator.
    pub fn decorate_writer<F>(&mut self, wrap: F)
    where
        F: FnOnce(Arc<dyn ResponseWriter>) -> Arc<dyn ResponseWriter>,
    {
        let current = Arc::clone(&self.writer);
        self.writer = wrap(current);
    }

    /// Write a backend response through the decorated writer stack.
    pub async fn write_response(&mut self, response: Response<Body>) -> GatewayResult<()> {
        if self.is_committed() {
            return Err(GatewayError::ResponseCommitted);
        }
        let (parts, body) = response.into_parts();
        self.response.status = parts.status;
        self.response.headers = parts.headers;

        let writer = Arc::clone(&self.writer);
        writer.write_with(&mut self.response, body).await
    }

    /// Write a complete payload straight to the transport, bypassing every
    /// decorator. Replaces status and headers left by an uncommitted write.
    pub async fn write_direct(
        &mut self,
        status: StatusCode,
        headers: HeaderMap,
        payload: Bytes,
    ) -> GatewayResult<()> {
        if self.is_committed() {
            return Err(GatewayError::ResponseCommitted);
        }
        self.response.status = status;
        self.response.headers = headers;

        let transport = Arc::clone(&self.transport);
        transport.write_with(&mut self.response, Body::from(payload)).await
    }

    /// Final response for the transport.
    pub fn into_response(self) -> Response<Body> {
        let ServerResponse {
            status,
            headers,
            body,
            ..
        } = self.response;
        let mut response = Response::new(body.unwrap_or_else(Body::empty));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    /// Response for a failure raised after commit: the committed status and
    /// headers with a body that errors immediately, so the connection is cut
    /// instead of carrying a mixed payload.
    pub fn into_aborted_response(self, error: &GatewayError) -> Response<Body> {
        let reason = error.to_string();
        let body = Body::from_stream(stream::once(async move {
            Err::<Bytes, io::Error>(io::Error::other(reason))
        }));
        let mut response = Response::new(body);
        *response.status_mut() = self.response.status;
        *response.headers_mut() = self.response.headers;
        response
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("request_id", &self.request_id)
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("committed", &self.response.committed)
            .finish()
    }
}
