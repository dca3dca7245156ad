//! Shared fixtures for integration tests.

#![allow(dead_code)]

use pgcapture::{CaptureError, CaptureResult, GenericClient};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A client that never touches a database: statements succeed after `delay`.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    pub delay: Duration,
}

impl MemoryClient {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl GenericClient for MemoryClient {
    async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        self.wait().await;
        Ok(vec![])
    }

    async fn query_one(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        self.wait().await;
        Err(CaptureError::not_found("no rows"))
    }

    async fn query_opt(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Option<Row>> {
        self.wait().await;
        Ok(None)
    }

    async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        self.wait().await;
        Ok(1)
    }
}

/// An in-memory writer that can be inspected after being moved into a capture.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
