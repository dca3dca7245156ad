//! # pgcapture
//!
//! Capture the SQL statements a block of code sends to PostgreSQL, then classify and report
//! them.
//!
//! ## Features
//!
//! - **Capture**: `InstrumentedClient` wraps any `GenericClient` and records each statement
//!   with its interpolated SQL, raw SQL, parameters, duration and (optionally) call site
//! - **Classify**: reads vs writes, total time, duplicates (same interpolated SQL),
//!   similar statements (same raw SQL) and slow statements, against configurable thresholds
//! - **Present**: pluggable presenters (`pretty`, `raw_line`, `simple`, `only_slow_query`)
//! - **Scopes**: guard and closure forms, request middleware and test assertions
//!
//! ## Example
//!
//! ```ignore
//! use pgcapture::{CaptureConfig, GenericClient, QueryCapture, call_site};
//!
//! let capture = QueryCapture::new(&CaptureConfig::default())?;
//! let client = capture.instrument(db_client);
//!
//! let scope = capture.enter()?;
//! for id in ids {
//!     client
//!         .at(call_site!())
//!         .query_one("SELECT * FROM news WHERE id = $1", &[&id])
//!         .await?;
//! }
//! let result = scope.finish()?;
//! println!("{} similar groups", result.similar_counter_over_threshold.len());
//! ```

pub mod capture;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod presenter;
pub mod scope;
pub mod sql;
pub mod testing;

pub use capture::{
    AtCallSite, CallSite, CapturedStatement, CompositeMonitor, InstrumentedClient, NoopMonitor,
    QueryContext, QueryMonitor, QueryResult, StatementParams, StatementRecorder, TracingMonitor,
};
pub use classify::{
    ClassifiedResult, Classifier, StatementCounter, StatementGroup, StatementKey, Thresholds,
};
pub use client::GenericClient;
pub use config::{CaptureConfig, PrettyConfig, PrintThresholds};
pub use error::{CaptureError, CaptureResult};
pub use middleware::{Handler, QueryCaptureMiddleware};
pub use presenter::{
    OnlySlowQueryPresenter, Presenter, PresenterFactory, PresenterRegistration,
    PresenterRegistry, PrettyPresenter, RawLinePresenter, SimplePresenter, render_to_string,
};
pub use scope::{CaptureGuard, QueryCapture};
pub use testing::InefficientQueryAssertion;

// Re-export inventory for presenter registration in other crates
pub use inventory;
