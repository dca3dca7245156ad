use crate::sql::{interpolate, render_param};
use std::fmt;
use std::time::Duration;
use tokio_postgres::types::ToSql;

/// Source location a statement was issued from.
///
/// Call sites are opt-in: build one with [`call_site!`](crate::call_site) and pass it to
/// [`InstrumentedClient::at`](super::InstrumentedClient::at).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Source file name.
    pub file: String,
    /// Function (or module path) name.
    pub function: String,
    /// Line number.
    pub line: u32,
}

impl CallSite {
    /// Create a call site.
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}:{}]", self.function, self.file, self.line)
    }
}

/// Build a [`CallSite`] for the current source location.
///
/// The function slot holds `module_path!()`, the closest stable approximation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::capture::CallSite::new(file!(), module_path!(), line!())
    };
}

/// Rendered parameter values of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementParams {
    /// One parameter set, from a single execution.
    Single(Vec<String>),
    /// One parameter set per execution of a batch.
    Batch(Vec<Vec<String>>),
}

impl StatementParams {
    /// Render a parameter slice.
    pub fn render(params: &[&(dyn ToSql + Sync)]) -> Self {
        Self::Single(params.iter().map(|p| render_param(*p)).collect())
    }

    /// Render every parameter set of a batch.
    pub fn render_batch(param_sets: &[&[&(dyn ToSql + Sync)]]) -> Self {
        Self::Batch(
            param_sets
                .iter()
                .map(|set| set.iter().map(|p| render_param(*p)).collect())
                .collect(),
        )
    }

    /// Whether these parameters belong to a batch execution.
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Number of parameters in a single set, or number of sets in a batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(values) => values.len(),
            Self::Batch(sets) => sets.len(),
        }
    }

    /// Whether there are no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StatementParams {
    fn default() -> Self {
        Self::Single(Vec::new())
    }
}

/// Context information about the statement being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL as sent to the driver, with `$N` placeholders.
    pub sql: String,
    /// Rendered parameters.
    pub params: StatementParams,
    /// Optional statement name/tag for identification.
    pub tag: Option<String>,
    /// Optional caller-supplied source location.
    pub call_site: Option<CallSite>,
}

impl QueryContext {
    /// Create a context for a single execution.
    pub fn new(sql: &str, params: &[&(dyn ToSql + Sync)]) -> Self {
        Self {
            sql: sql.to_string(),
            params: StatementParams::render(params),
            tag: None,
            call_site: None,
        }
    }

    /// Create a context for a batch execution.
    pub fn batch(sql: &str, param_sets: &[&[&(dyn ToSql + Sync)]]) -> Self {
        Self {
            sql: sql.to_string(),
            params: StatementParams::render_batch(param_sets),
            tag: None,
            call_site: None,
        }
    }

    /// Add a tag to identify this statement.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach a call site.
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    /// SQL with parameters substituted (batches are left as-is).
    pub fn interpolated_sql(&self) -> String {
        match &self.params {
            StatementParams::Single(values) => interpolate(&self.sql, values),
            StatementParams::Batch(_) => self.sql.clone(),
        }
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Outcome of a statement execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Query returned a single optional row.
    OptionalRow(bool),
    /// Execution failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating long messages.
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            let truncated = crate::sql::truncate_sql_bytes(&msg, MAX_ERROR_LEN);
            Self::Error(format!("{truncated}..."))
        } else {
            Self::Error(msg)
        }
    }

    /// Whether the execution failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::OptionalRow(found) => {
                write!(f, "{}", if *found { "1 row" } else { "0 rows" })
            }
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Trait for observing statement execution.
///
/// [`StatementRecorder`](super::StatementRecorder) is the capture implementation;
/// others can log or collect metrics.
pub trait QueryMonitor: Send + Sync {
    /// Called before a statement is executed.
    ///
    /// Default implementation does nothing.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called after a statement completes (success or failure).
    ///
    /// # Arguments
    /// * `ctx` - Statement context information
    /// * `duration` - Time taken by the wrapped client
    /// * `result` - The outcome of the execution
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);
}

/// One executed statement, as captured inside a scope.
///
/// Records are created when execution completes and are never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedStatement {
    sql: String,
    raw_sql: String,
    raw_params: StatementParams,
    duration: Duration,
    call_site: Option<CallSite>,
    tag: Option<String>,
    result: QueryResult,
}

impl CapturedStatement {
    /// Create a record for a single execution; the interpolated text is derived from
    /// `raw_sql` and `params`.
    pub fn new(raw_sql: impl Into<String>, params: Vec<String>, duration: Duration) -> Self {
        let raw_sql = raw_sql.into();
        Self {
            sql: interpolate(&raw_sql, &params),
            raw_sql,
            raw_params: StatementParams::Single(params),
            duration,
            call_site: None,
            tag: None,
            result: QueryResult::Affected(0),
        }
    }

    /// Create a record for a batch execution; the interpolated text equals `raw_sql`.
    pub fn batch(raw_sql: impl Into<String>, sets: Vec<Vec<String>>, duration: Duration) -> Self {
        let raw_sql = raw_sql.into();
        Self {
            sql: raw_sql.clone(),
            raw_sql,
            raw_params: StatementParams::Batch(sets),
            duration,
            call_site: None,
            tag: None,
            result: QueryResult::Affected(0),
        }
    }

    /// Build a record from a monitor event.
    pub fn from_context(ctx: &QueryContext, duration: Duration, result: &QueryResult) -> Self {
        Self {
            sql: ctx.interpolated_sql(),
            raw_sql: ctx.sql.clone(),
            raw_params: ctx.params.clone(),
            duration,
            call_site: ctx.call_site.clone(),
            tag: ctx.tag.clone(),
            result: result.clone(),
        }
    }

    /// Attach a call site.
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    /// Attach a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the execution outcome.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// SQL with parameters substituted.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SQL with `$N` placeholders.
    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    /// Rendered parameter values.
    pub fn raw_params(&self) -> &StatementParams {
        &self.raw_params
    }

    /// Whether this was a batch execution.
    pub fn many(&self) -> bool {
        self.raw_params.is_batch()
    }

    /// Measured execution time.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Measured execution time in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    /// Whether the raw SQL starts with the literal `SELECT`.
    ///
    /// Case-sensitive on purpose: `select ...` counts as a write.
    pub fn is_read(&self) -> bool {
        self.raw_sql.starts_with("SELECT")
    }

    /// `[function, file:line]`, falling back to `[tag]` or `[-]`.
    pub fn origin(&self) -> String {
        match (&self.call_site, &self.tag) {
            (Some(site), _) => site.to_string(),
            (None, Some(tag)) => format!("[{tag}]"),
            (None, None) => "[-]".to_string(),
        }
    }
}
