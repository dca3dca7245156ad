use super::types::{CapturedStatement, QueryContext, QueryMonitor, QueryResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

static NEXT_RECORDER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Redirections installed by [`StatementRecorder::redirect`], innermost last.
    static REDIRECTS: Vec<(u64, Arc<StatementRecorder>)>;
}

/// The capture hook: a monitor that appends every completed statement, in execution
/// order, while it is active.
///
/// Attach it to a client with
/// [`InstrumentedClient::with_monitor_arc`](super::InstrumentedClient::with_monitor_arc) (or
/// let [`QueryCapture::instrument`](crate::QueryCapture::instrument) do it) and toggle it
/// with [`activate`](Self::activate) / [`deactivate`](Self::deactivate). Statements stay
/// readable after deactivation until [`clear`](Self::clear) is called.
///
/// Inside [`redirect`](Self::redirect), statements reported to this recorder go to the
/// redirection target instead, whether or not this recorder is active.
#[derive(Debug)]
pub struct StatementRecorder {
    id: u64,
    active: AtomicBool,
    statements: Mutex<Vec<CapturedStatement>>,
}

impl Default for StatementRecorder {
    fn default() -> Self {
        Self {
            id: NEXT_RECORDER_ID.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(false),
            statements: Mutex::new(Vec::new()),
        }
    }
}

impl StatementRecorder {
    /// Create an inactive, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `future` with the statements this recorder receives sent to `target`.
    ///
    /// The redirection is bound to the current task: concurrent tasks each keep their own
    /// target, and tasks spawned from `future` are not redirected.
    pub async fn redirect<F: Future>(
        &self,
        target: Arc<StatementRecorder>,
        future: F,
    ) -> F::Output {
        let mut redirects = REDIRECTS.try_with(Clone::clone).unwrap_or_default();
        redirects.push((self.id, target));
        REDIRECTS.scope(redirects, future).await
    }

    fn redirect_target(&self) -> Option<Arc<StatementRecorder>> {
        REDIRECTS
            .try_with(|redirects| {
                redirects
                    .iter()
                    .rev()
                    .find(|(owner, _)| *owner == self.id)
                    .map(|(_, target)| target.clone())
            })
            .ok()
            .flatten()
    }

    /// Start recording.
    ///
    /// Returns `false` if the recorder was already active.
    pub fn activate(&self) -> bool {
        !self.active.swap(true, Ordering::AcqRel)
    }

    /// Stop recording; captured statements are kept.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Drop all captured statements.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of the captured statements, in execution order.
    pub fn statements(&self) -> Vec<CapturedStatement> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append a statement if the recorder is active.
    pub fn record(&self, statement: CapturedStatement) {
        if !self.is_active() {
            return;
        }
        tracing::trace!(
            target: "pgcapture.capture",
            sql = %statement.raw_sql(),
            duration = ?statement.duration(),
            "captured statement"
        );
        self.lock().push(statement);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedStatement>> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryMonitor for StatementRecorder {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        match self.redirect_target() {
            Some(target) => target.record(CapturedStatement::from_context(ctx, duration, result)),
            None if self.is_active() => {
                self.record(CapturedStatement::from_context(ctx, duration, result));
            }
            None => {}
        }
    }
}
