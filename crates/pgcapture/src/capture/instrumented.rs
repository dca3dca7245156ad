use super::monitors::{CompositeMonitor, NoopMonitor};
use super::types::{CallSite, QueryContext, QueryMonitor, QueryResult};
use crate::client::GenericClient;
use crate::error::CaptureResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A database client that wraps a `GenericClient` and reports every statement to a
/// [`QueryMonitor`].
///
/// Each call delegates to the wrapped client exactly once and times it. Errors from the
/// wrapped client are returned unchanged; the monitor still sees the failed statement.
pub struct InstrumentedClient<C> {
    pub(super) client: C,
    pub(super) monitor: Arc<dyn QueryMonitor>,
}

impl<C: GenericClient> InstrumentedClient<C> {
    /// Create a new instrumented client with no monitoring.
    pub fn new(client: C) -> Self {
        Self {
            client,
            monitor: Arc::new(NoopMonitor),
        }
    }

    /// Set the query monitor.
    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    /// Set the query monitor from an Arc.
    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Add a monitor next to the current one (existing first).
    pub fn add_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.add_monitor_arc(Arc::new(monitor))
    }

    /// Add an Arc-wrapped monitor next to the current one (existing first).
    pub fn add_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        let existing = std::mem::replace(&mut self.monitor, Arc::new(NoopMonitor));
        self.monitor = Arc::new(CompositeMonitor::new().add_arc(existing).add_arc(monitor));
        self
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Get the inner client, consuming this wrapper.
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Borrow this client so that every statement is attributed to `call_site`.
    ///
    /// ```ignore
    /// let user = client.at(pgcapture::call_site!()).query_one(sql, &[&id]).await?;
    /// ```
    pub fn at(&self, call_site: CallSite) -> AtCallSite<'_, C> {
        AtCallSite {
            client: self,
            call_site,
        }
    }

    /// Execute `sql` once per parameter set and capture it as a single batch statement.
    ///
    /// Returns the total number of affected rows. The first failing set stops the batch
    /// and its error is returned.
    pub async fn execute_many(
        &self,
        sql: &str,
        param_sets: &[&[&(dyn ToSql + Sync)]],
    ) -> CaptureResult<u64> {
        self.execute_many_inner(QueryContext::batch(sql, param_sets), param_sets)
            .await
    }

    async fn observe<T, F>(
        &self,
        ctx: QueryContext,
        future: F,
        summarize: fn(&CaptureResult<T>) -> QueryResult,
    ) -> CaptureResult<T>
    where
        F: Future<Output = CaptureResult<T>> + Send,
    {
        self.monitor.on_query_start(&ctx);

        let start = Instant::now();
        let result = future.await;
        let duration = start.elapsed();

        self.monitor
            .on_query_complete(&ctx, duration, &summarize(&result));
        result
    }

    pub(super) async fn query_inner(
        &self,
        ctx: QueryContext,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Vec<Row>> {
        let future = self.client.query(&ctx.sql, params);
        self.observe(ctx.clone(), future, |result| match result {
            Ok(rows) => QueryResult::Rows(rows.len()),
            Err(e) => QueryResult::error(e.to_string()),
        })
        .await
    }

    pub(super) async fn query_one_inner(
        &self,
        ctx: QueryContext,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Row> {
        let future = self.client.query_one(&ctx.sql, params);
        self.observe(ctx.clone(), future, |result| match result {
            Ok(_) => QueryResult::OptionalRow(true),
            Err(e) if e.is_not_found() => QueryResult::OptionalRow(false),
            Err(e) => QueryResult::error(e.to_string()),
        })
        .await
    }

    pub(super) async fn query_opt_inner(
        &self,
        ctx: QueryContext,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        let future = self.client.query_opt(&ctx.sql, params);
        self.observe(ctx.clone(), future, |result| match result {
            Ok(row) => QueryResult::OptionalRow(row.is_some()),
            Err(e) => QueryResult::error(e.to_string()),
        })
        .await
    }

    pub(super) async fn execute_inner(
        &self,
        ctx: QueryContext,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<u64> {
        let future = self.client.execute(&ctx.sql, params);
        self.observe(ctx.clone(), future, summarize_affected).await
    }

    pub(super) async fn execute_many_inner(
        &self,
        ctx: QueryContext,
        param_sets: &[&[&(dyn ToSql + Sync)]],
    ) -> CaptureResult<u64> {
        let client = &self.client;
        let sql = ctx.sql.clone();
        let future = async move {
            let mut affected = 0;
            for params in param_sets {
                affected += client.execute(&sql, params).await?;
            }
            CaptureResult::Ok(affected)
        };
        self.observe(ctx, future, summarize_affected).await
    }
}

fn summarize_affected(result: &CaptureResult<u64>) -> QueryResult {
    match result {
        Ok(n) => QueryResult::Affected(*n),
        Err(e) => QueryResult::error(e.to_string()),
    }
}

impl<C: GenericClient> GenericClient for InstrumentedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        self.query_inner(QueryContext::new(sql, params), params)
            .await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Vec<Row>> {
        self.query_inner(QueryContext::new(sql, params).with_tag(tag), params)
            .await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        self.query_one_inner(QueryContext::new(sql, params), params)
            .await
    }

    async fn query_one_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Row> {
        self.query_one_inner(QueryContext::new(sql, params).with_tag(tag), params)
            .await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        self.query_opt_inner(QueryContext::new(sql, params), params)
            .await
    }

    async fn query_opt_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        self.query_opt_inner(QueryContext::new(sql, params).with_tag(tag), params)
            .await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        self.execute_inner(QueryContext::new(sql, params), params)
            .await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<u64> {
        self.execute_inner(QueryContext::new(sql, params).with_tag(tag), params)
            .await
    }
}

/// An [`InstrumentedClient`] borrowed with a fixed call site.
///
/// Created by [`InstrumentedClient::at`].
pub struct AtCallSite<'a, C> {
    client: &'a InstrumentedClient<C>,
    call_site: CallSite,
}

impl<C: GenericClient> AtCallSite<'_, C> {
    fn context(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryContext {
        QueryContext::new(sql, params).with_call_site(self.call_site.clone())
    }

    /// Batch execution attributed to this call site. See [`InstrumentedClient::execute_many`].
    pub async fn execute_many(
        &self,
        sql: &str,
        param_sets: &[&[&(dyn ToSql + Sync)]],
    ) -> CaptureResult<u64> {
        let ctx = QueryContext::batch(sql, param_sets).with_call_site(self.call_site.clone());
        self.client.execute_many_inner(ctx, param_sets).await
    }
}

impl<C: GenericClient> GenericClient for AtCallSite<'_, C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        self.client
            .query_inner(self.context(sql, params), params)
            .await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Vec<Row>> {
        self.client
            .query_inner(self.context(sql, params).with_tag(tag), params)
            .await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        self.client
            .query_one_inner(self.context(sql, params), params)
            .await
    }

    async fn query_one_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Row> {
        self.client
            .query_one_inner(self.context(sql, params).with_tag(tag), params)
            .await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        self.client
            .query_opt_inner(self.context(sql, params), params)
            .await
    }

    async fn query_opt_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        self.client
            .query_opt_inner(self.context(sql, params).with_tag(tag), params)
            .await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        self.client
            .execute_inner(self.context(sql, params), params)
            .await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<u64> {
        self.client
            .execute_inner(self.context(sql, params).with_tag(tag), params)
            .await
    }
}
