//! Statement capture: the hook that records what an instrumented client executes.
//!
//! This module provides:
//! - [`InstrumentedClient`], a `GenericClient` wrapper that times every statement
//! - [`StatementRecorder`], the monitor that keeps the executed statements in order
//! - [`CapturedStatement`], the immutable record of one execution
//! - Other monitors ([`TracingMonitor`], [`CompositeMonitor`], [`NoopMonitor`])
//!
//! # Example
//!
//! ```rust,ignore
//! use pgcapture::capture::{InstrumentedClient, StatementRecorder};
//! use std::sync::Arc;
//!
//! let recorder = Arc::new(StatementRecorder::new());
//! let client = InstrumentedClient::new(db_client).with_monitor_arc(recorder.clone());
//!
//! recorder.activate();
//! client.execute("UPDATE users SET active = $1", &[&true]).await?;
//! recorder.deactivate();
//!
//! assert_eq!(recorder.statements()[0].sql(), "UPDATE users SET active = true");
//! ```

mod instrumented;
mod monitors;
mod recorder;
mod types;

#[cfg(test)]
mod tests;

pub use instrumented::{AtCallSite, InstrumentedClient};
pub use monitors::{CompositeMonitor, NoopMonitor, TracingMonitor};
pub use recorder::StatementRecorder;
pub use types::{
    CallSite, CapturedStatement, QueryContext, QueryMonitor, QueryResult, StatementParams,
};
