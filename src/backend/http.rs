//! HTTP upstream backend.
//!
//! # Responsibilities
//! - Look up the route for the request
//! - Rewrite the URI to the route's upstream
//! - Forward with a deadline and hand back the streamed response
//!
//! # Design Decisions
//! - No matching route → `RouteNotFound`
//! - Deadline expiry → status-carrying 504
//! - Connection failures are left unclassified (500)
//! - Hop-by-hop headers are not forwarded

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::Scheme;
use axum::http::{header, HeaderMap, Request, Response, Uri};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::backend::Backend;
use crate::error::{GatewayError, GatewayResult};
use crate::resilience::timeouts::with_deadline;
use crate::routing::Router;

const HOP_BY_HOP: [&str; 6] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// Forwards requests to the upstream chosen by the route table.
pub struct HttpBackend {
    router: Router,
    client: Client<HttpConnector, Body>,
    deadline: Duration,
}

impl HttpBackend {
    pub fn new(router: Router, deadline: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            router,
            client,
            deadline,
        }
    }

    async fn forward(&self, request: Request<Body>) -> GatewayResult<Response<Body>> {
        let (mut parts, body) = request.into_parts();

        let route = self
            .router
            .match_request(&parts)
            .ok_or_else(|| GatewayError::RouteNotFound {
                path: parts.uri.path().to_string(),
            })?;

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(route.upstream.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some("/".parse().map_err(|e: axum::http::uri::InvalidUri| {
                GatewayError::Internal(e.to_string())
            })?);
        }
        parts.uri = Uri::from_parts(uri_parts).map_err(|e| GatewayError::Internal(e.to_string()))?;
        strip_hop_by_hop(&mut parts.headers);

        tracing::debug!(
            route = %route.name,
            upstream = %route.upstream,
            uri = %parts.uri,
            "Forwarding request"
        );

        let request = Request::from_parts(parts, body);
        let response: Response<Incoming> = with_deadline(self.deadline, async {
            self.client
                .request(request)
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))
        })
        .await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Backend for HttpBackend {
    fn invoke(&self, request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>> {
        Box::pin(self.forward(request))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // Host is rewritten by the client from the new authority.
    headers.remove(header::HOST);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use axum::http::{HeaderValue, StatusCode};

    fn backend(routes: &[RouteConfig]) -> HttpBackend {
        HttpBackend::new(Router::from_config(routes).unwrap(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn unmatched_path_is_route_not_found() {
        let backend = backend(&[RouteConfig {
            name: "orders".into(),
            host: None,
            path_prefix: Some("/orders".into()),
            upstream: "127.0.0.1:1".into(),
            priority: 0,
        }]);
        let request = Request::builder().uri("/users").body(Body::empty()).unwrap();

        let err = backend.invoke(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::RouteNotFound { ref path } if path == "/users"));
    }

    #[tokio::test]
    async fn refused_connection_is_unclassified_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend(&[RouteConfig {
            name: "all".into(),
            host: None,
            path_prefix: None,
            upstream: addr.to_string(),
            priority: 0,
        }]);
        let request = Request::builder().uri("/x").body(Body::empty()).unwrap();

        let err = backend.invoke(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)), "got {err:?}");
        assert_ne!(
            crate::http::ErrorClassification::classify(&err).into_envelope().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn hop_by_hop_headers_are_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::HOST, HeaderValue::from_static("gateway"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
