//! Capture scopes: record, classify and present the statements of a span of work.
//!
//! ```rust,ignore
//! use pgcapture::{CaptureConfig, GenericClient, QueryCapture};
//!
//! let capture = QueryCapture::new(&CaptureConfig::default())?;
//! let client = capture.instrument(db_client);
//!
//! // Guard form
//! let scope = capture.enter()?;
//! client.query("SELECT * FROM news", &[]).await?;
//! let result = scope.finish()?; // presents, then returns the classification
//!
//! // Wrapper form
//! let (rows, result) = capture
//!     .run(|| async { client.query("SELECT * FROM news", &[]).await })
//!     .await?;
//! ```

use crate::capture::{CapturedStatement, InstrumentedClient, QueryMonitor, StatementRecorder};
use crate::classify::{ClassifiedResult, Classifier};
use crate::client::GenericClient;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::presenter::{Presenter, PresenterRegistry};
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// A reusable capture scope.
///
/// Each `QueryCapture` owns one recorder, so a single instance can only be entered once at a
/// time. Independent instances nest freely.
pub struct QueryCapture {
    config: Arc<CaptureConfig>,
    classifier: Classifier,
    presenter: Arc<dyn Presenter>,
    recorder: Arc<StatementRecorder>,
    ignore_output: bool,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl QueryCapture {
    /// Create a scope from `config`, resolving the presenter through the default registry.
    ///
    /// Fails on an unknown presenter name or a malformed ignore pattern.
    pub fn new(config: &CaptureConfig) -> CaptureResult<Self> {
        Self::with_registry(config, &PresenterRegistry::new())
    }

    /// Create a scope, resolving the presenter through `registry`.
    pub fn with_registry(
        config: &CaptureConfig,
        registry: &PresenterRegistry,
    ) -> CaptureResult<Self> {
        let classifier = Classifier::new(config)?;
        let presenter = registry.resolve(&config.presenter, config)?;

        Ok(Self {
            config: Arc::new(config.clone()),
            classifier,
            presenter,
            recorder: Arc::new(StatementRecorder::new()),
            ignore_output: false,
            writer: Mutex::new(Box::new(std::io::stdout())),
        })
    }

    /// Classify on exit but never present.
    pub fn ignore_output(mut self) -> Self {
        self.ignore_output = true;
        self
    }

    /// Replace the configured ignore patterns.
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> CaptureResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.classifier = self.classifier.with_ignore_patterns(patterns)?;
        Ok(self)
    }

    /// Use `presenter` instead of the configured one.
    pub fn with_presenter<P: Presenter + 'static>(self, presenter: P) -> Self {
        self.with_presenter_arc(Arc::new(presenter))
    }

    pub fn with_presenter_arc(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// Present into `writer` instead of stdout.
    pub fn with_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.writer = Mutex::new(Box::new(writer));
        self
    }

    /// Wrap `client` so that its statements are recorded by this scope.
    pub fn instrument<C: GenericClient>(&self, client: C) -> InstrumentedClient<C> {
        InstrumentedClient::new(client).with_monitor_arc(self.monitor())
    }

    /// The recorder as a monitor, for clients that already carry other monitors.
    pub fn monitor(&self) -> Arc<dyn QueryMonitor> {
        self.recorder.clone()
    }

    /// Statements recorded by the last (or current) scope.
    pub fn recorder(&self) -> &StatementRecorder {
        &self.recorder
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    /// Start recording. Statements of a previous scope are discarded.
    ///
    /// Fails with [`CaptureError::ScopeActive`] if this instance is already recording.
    pub fn enter(&self) -> CaptureResult<CaptureGuard<'_>> {
        if !self.recorder.activate() {
            return Err(CaptureError::ScopeActive);
        }
        self.recorder.clear();
        tracing::debug!(
            target: "pgcapture.capture",
            presenter = self.presenter.name(),
            "capture scope entered"
        );

        Ok(CaptureGuard {
            capture: self,
            finished: false,
        })
    }

    /// Run `f` inside a scope and return its output with the classification.
    ///
    /// The scope is closed (and presented) even if the future is dropped early.
    pub async fn run<F, Fut, T>(&self, f: F) -> CaptureResult<(T, ClassifiedResult)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.enter()?;
        let value = f().await;
        let result = guard.finish()?;
        Ok((value, result))
    }

    /// Run `future` in a scope bound to the current task and return its output with the
    /// classification.
    ///
    /// Each call records into its own recorder, so calls running concurrently on the same
    /// `QueryCapture` (and an active [`enter`](Self::enter) scope) never see each other's
    /// statements. Statements issued from tasks spawned by `future` are not captured. The
    /// output is returned even when presenting fails.
    pub async fn run_in_task<Fut, T>(&self, future: Fut) -> (T, CaptureResult<ClassifiedResult>)
    where
        Fut: Future<Output = T>,
    {
        let scoped = Arc::new(StatementRecorder::new());
        scoped.activate();
        tracing::debug!(
            target: "pgcapture.capture",
            presenter = self.presenter.name(),
            "task capture scope entered"
        );

        let value = self.recorder.redirect(scoped.clone(), future).await;
        scoped.deactivate();
        (value, self.conclude(&scoped.statements()))
    }

    fn exit(&self) -> CaptureResult<ClassifiedResult> {
        self.recorder.deactivate();
        self.conclude(&self.recorder.statements())
    }

    /// Classify, log and present a finished scope.
    fn conclude(&self, statements: &[CapturedStatement]) -> CaptureResult<ClassifiedResult> {
        let result = self.classifier.classify(statements);

        tracing::debug!(
            target: "pgcapture.capture",
            total = result.total,
            read = result.read,
            writes = result.writes,
            duration = ?result.total_duration,
            "capture scope exited"
        );
        if result.has_over_threshold {
            tracing::warn!(
                target: "pgcapture.capture",
                slow = result.slow_captured_queries.len(),
                duplicates = result.duplicates_counter_over_threshold.len(),
                similar = result.similar_counter_over_threshold.len(),
                "captured statements exceed thresholds"
            );
        }

        if !self.ignore_output {
            self.present(&result)?;
        }
        Ok(result)
    }

    fn present(&self, result: &ClassifiedResult) -> CaptureResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.presenter.render(result, &mut **writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for QueryCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCapture")
            .field("presenter", &self.presenter.name())
            .field("ignore_output", &self.ignore_output)
            .field("active", &self.recorder.is_active())
            .field("captured", &self.recorder.len())
            .finish()
    }
}

/// An active scope. Close it with [`finish`](Self::finish); dropping it closes it too and
/// logs presentation errors instead of returning them.
#[must_use = "the scope closes when the guard is dropped"]
pub struct CaptureGuard<'a> {
    capture: &'a QueryCapture,
    finished: bool,
}

impl CaptureGuard<'_> {
    /// Statements recorded so far.
    pub fn statements(&self) -> Vec<CapturedStatement> {
        self.capture.recorder.statements()
    }

    pub fn len(&self) -> usize {
        self.capture.recorder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capture.recorder.is_empty()
    }

    /// Close the scope: stop recording, classify and present.
    pub fn finish(mut self) -> CaptureResult<ClassifiedResult> {
        self.finished = true;
        self.capture.exit()
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.capture.exit() {
            tracing::warn!(
                target: "pgcapture.capture",
                error = %e,
                "failed to close capture scope"
            );
        }
    }
}

impl fmt::Debug for CaptureGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureGuard")
            .field("captured", &self.len())
            .field("finished", &self.finished)
            .finish()
    }
}
