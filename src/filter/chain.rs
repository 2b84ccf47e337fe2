//! Filter chain dispatcher.
//!
//! # Responsibilities
//! - Hold the registered filters, sorted once by order
//! - Invoke filter N with a continuation that runs filter N+1
//! - Terminate in the backend call and the outbound write
//!
//! # Design Decisions
//! - Sorting happens in `build`; the running chain is immutable and shared
//! - Equal orders keep registration order (stable sort)
//! - Failures travel back up the continuation chain untouched
//! - The dispatcher fixes ordering only; filters decide when to suspend

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::backend::Backend;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::exchange::Exchange;
use crate::filter::GlobalFilter;

/// Continuation handed to a filter. Consumed by `run`.
pub struct Next<'a> {
    filters: &'a [Arc<dyn GlobalFilter>],
    backend: &'a dyn Backend,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain.
    pub fn run<'b>(self, exchange: &'b mut Exchange) -> BoxFuture<'b, GatewayResult<()>>
    where
        'a: 'b,
    {
        match self.filters.split_first() {
            Some((filter, rest)) => {
                let next = Next {
                    filters: rest,
                    backend: self.backend,
                };
                tracing::trace!(
                    request_id = %exchange.request_id(),
                    filter = filter.name(),
                    order = filter.order(),
                    "Entering filter"
                );
                filter.filter(exchange, next)
            }
            None => Box::pin(forward(self.backend, exchange)),
        }
    }
}

/// Terminal step: hand the request to the backend and write what it returns.
async fn forward(backend: &dyn Backend, exchange: &mut Exchange) -> GatewayResult<()> {
    let request = exchange.forward_request()?;
    let response = backend.invoke(request).await?;
    exchange.write_response(response).await
}

/// Ordered, immutable filter chain.
pub struct FilterChain {
    filters: Vec<Arc<dyn GlobalFilter>>,
    backend: Arc<dyn Backend>,
}

impl FilterChain {
    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::new()
    }

    /// Run every filter in ascending order, then the backend.
    pub async fn run(&self, exchange: &mut Exchange) -> GatewayResult<()> {
        let next = Next {
            filters: &self.filters,
            backend: self.backend.as_ref(),
        };
        next.run(exchange).await
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

/// Collects filters and the backend before the chain is frozen.
#[derive(Default)]
pub struct FilterChainBuilder {
    filters: Vec<Arc<dyn GlobalFilter>>,
    backend: Option<Arc<dyn Backend>>,
}

impl FilterChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter. Position is decided by its order, not by call order.
    pub fn register<F: GlobalFilter>(mut self, filter: F) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn register_arc(mut self, filter: Arc<dyn GlobalFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn backend<B: Backend>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    pub fn backend_arc(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sort the filters and freeze the chain.
    pub fn build(self) -> GatewayResult<FilterChain> {
        let backend = self
            .backend
            .ok_or_else(|| GatewayError::Internal("filter chain has no backend".into()))?;
        let mut filters = self.filters;
        filters.sort_by_key(|f| f.order());

        tracing::debug!(
            filters = ?filters.iter().map(|f| (f.name(), f.order())).collect::<Vec<_>>(),
            "Filter chain built"
        );

        Ok(FilterChain { filters, backend })
    }
}
