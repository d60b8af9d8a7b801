// Middleware system for request/response processing

use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, trace};

/// Type alias for the next handler in the middleware chain
pub type Next = Box<
    dyn FnOnce(HttpRequest) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send,
>;

/// Type alias for handler functions
pub type HandlerFn = Arc<
    dyn Fn(HttpRequest) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send
        + Sync,
>;

/// Middleware trait for processing requests before they reach the handler
///
/// An implementation either calls `next` with the request (possibly after
/// inspecting it) or returns its own response without calling `next`.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Middleware chain executor
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Arc::new(Vec::new()),
        }
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        let mut mws = (*self.middlewares).clone();
        mws.push(Arc::new(middleware));
        self.middlewares = Arc::new(mws);
    }

    /// Number of registered middlewares
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(
        &self,
        index: usize,
        req: HttpRequest,
        handler: HandlerFn,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>> {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            handler(req)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();
            let handler_clone = handler.clone();

            trace!(middleware_index = index, "Executing middleware");
            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        Box::new(move |req| chain.execute_from(index + 1, req, handler_clone)),
                    )
                    .await
            })
        }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
            let mut response = next(req).await?;
            let trail = response
                .headers
                .remove("x-trail")
                .map(|t| format!("{},{}", self.0, t))
                .unwrap_or_else(|| self.0.to_string());
            response.headers.insert("x-trail".to_string(), trail);
            Ok(response)
        }
    }

    struct Block;

    #[async_trait]
    impl Middleware for Block {
        async fn handle(&self, _req: HttpRequest, _next: Next) -> Result<HttpResponse, Error> {
            Ok(HttpResponse::forbidden())
        }
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> HandlerFn {
        Arc::new(move |_req: HttpRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(HttpResponse::ok()) })
                as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        })
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());

        let calls = Arc::new(AtomicUsize::new(0));
        let response = chain
            .apply(HttpRequest::new("GET", "/"), counting_handler(calls.clone()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chain_runs_in_registration_order() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(Tag("outer"));
        chain.use_middleware(Tag("inner"));
        assert_eq!(chain.len(), 2);

        let calls = Arc::new(AtomicUsize::new(0));
        let response = chain
            .apply(HttpRequest::new("GET", "/"), counting_handler(calls))
            .await
            .unwrap();

        assert_eq!(response.header("x-trail"), Some("outer,inner"));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(Block);

        let calls = Arc::new(AtomicUsize::new(0));
        let response = chain
            .apply(HttpRequest::new("POST", "/"), counting_handler(calls.clone()))
            .await
            .unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
