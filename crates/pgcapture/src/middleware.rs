//! Per-request capture for request handlers.
//!
//! [`QueryCaptureMiddleware`] runs every call of the wrapped [`Handler`] inside a fresh
//! capture scope and presents the result when the call returns. The handler must use a
//! client instrumented by the same [`QueryCapture`]:
//!
//! ```rust,ignore
//! let capture = QueryCapture::new(&CaptureConfig::load("pgcapture.toml")?)?;
//! let client = Arc::new(capture.instrument(pool.get().await?));
//!
//! let handler = QueryCaptureMiddleware::new(
//!     move |id: i64| {
//!         let client = client.clone();
//!         async move { client.query_one("SELECT * FROM news WHERE id = $1", &[&id]).await }
//!     },
//!     capture,
//! );
//! let row = handler.call(7).await?;
//! ```
//!
//! Every call gets its own scope bound to the task polling it, so concurrent calls report
//! only their own statements. Statements issued from tasks the handler spawns are not
//! captured.

use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use crate::scope::QueryCapture;
use std::future::Future;

/// An async request handler.
pub trait Handler<Req>: Send + Sync {
    type Response;

    fn call(&self, req: Req) -> impl Future<Output = Self::Response> + Send;
}

impl<Req, F, Fut> Handler<Req> for F
where
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future + Send,
{
    type Response = Fut::Output;

    fn call(&self, req: Req) -> impl Future<Output = Self::Response> + Send {
        self(req)
    }
}

/// Wraps a handler so that each call is captured and presented.
#[derive(Debug)]
pub struct QueryCaptureMiddleware<H> {
    inner: H,
    capture: QueryCapture,
}

impl<H> QueryCaptureMiddleware<H> {
    pub fn new(inner: H, capture: QueryCapture) -> Self {
        Self { inner, capture }
    }

    /// Build the capture from `config`.
    pub fn from_config(inner: H, config: &CaptureConfig) -> CaptureResult<Self> {
        Ok(Self::new(inner, QueryCapture::new(config)?))
    }

    pub fn capture(&self) -> &QueryCapture {
        &self.capture
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H, Req> Handler<Req> for QueryCaptureMiddleware<H>
where
    H: Handler<Req>,
    Req: Send,
{
    type Response = H::Response;

    async fn call(&self, req: Req) -> H::Response {
        let (response, result) = self.capture.run_in_task(self.inner.call(req)).await;
        if let Err(e) = result {
            tracing::warn!(
                target: "pgcapture.capture",
                error = %e,
                "failed to present captured statements"
            );
        }
        response
    }
}
