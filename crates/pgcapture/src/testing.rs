//! Assertions for tests: fail when a block of work issues inefficient statements.
//!
//! ```rust,ignore
//! use pgcapture::testing::InefficientQueryAssertion;
//!
//! #[tokio::test]
//! async fn listing_news_is_efficient() {
//!     let assertion = InefficientQueryAssertion::new(Some(5), Some(0.5)).unwrap();
//!     let client = assertion.instrument(connect().await);
//!
//!     assertion
//!         .run(|| async { list_news(&client).await })
//!         .await
//!         .unwrap();
//! }
//! ```

use crate::capture::InstrumentedClient;
use crate::classify::ClassifiedResult;
use crate::client::GenericClient;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::scope::QueryCapture;
use crate::sql::truncate_sql;
use std::fmt::Write as _;
use std::future::Future;

/// Characters of SQL shown per offending statement.
const REPORT_SQL_CHARS: usize = 25;

/// Checks a scope against its own thresholds instead of the configured ones.
///
/// `num` replaces both the duplicate and the similar count threshold and `seconds` the
/// slow threshold; `None` disables the check. Nothing is presented.
#[derive(Debug)]
pub struct InefficientQueryAssertion {
    capture: QueryCapture,
}

impl InefficientQueryAssertion {
    /// Build from the default configuration.
    pub fn new(num: Option<u64>, seconds: Option<f64>) -> CaptureResult<Self> {
        Self::with_config(&CaptureConfig::default(), num, seconds)
    }

    /// Build from `config` (presenter and ignore patterns), overriding its thresholds.
    pub fn with_config(
        config: &CaptureConfig,
        num: Option<u64>,
        seconds: Option<f64>,
    ) -> CaptureResult<Self> {
        let config = config
            .clone()
            .with_duplicate_min_count(num)
            .with_similar_min_count(num)
            .with_slow_min_second(seconds);

        Ok(Self {
            capture: QueryCapture::new(&config)?.ignore_output(),
        })
    }

    /// Replace the ignore patterns.
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> CaptureResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.capture = self.capture.with_ignore_patterns(patterns)?;
        Ok(self)
    }

    /// Wrap `client` so that its statements are checked.
    pub fn instrument<C: GenericClient>(&self, client: C) -> InstrumentedClient<C> {
        self.capture.instrument(client)
    }

    pub fn capture(&self) -> &QueryCapture {
        &self.capture
    }

    /// Run `f` in a scope and fail with [`CaptureError::InefficientQueries`] if any
    /// threshold was exceeded.
    pub async fn run<F, Fut, T>(&self, f: F) -> CaptureResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (value, result) = self.capture.run(f).await?;
        verify(&result)?;
        Ok(value)
    }
}

/// Fail with [`CaptureError::InefficientQueries`] when `result` has offending statements.
pub fn verify(result: &ClassifiedResult) -> CaptureResult<()> {
    match inefficiency_report(result) {
        Some(report) => Err(CaptureError::InefficientQueries(report)),
        None => Ok(()),
    }
}

/// One line per offending duplicate, similar and slow statement, or `None` if there are
/// none.
pub fn inefficiency_report(result: &ClassifiedResult) -> Option<String> {
    let mut report = String::new();

    for group in result.duplicates_counter_over_threshold.iter() {
        let _ = write!(
            report,
            "\n{} Duplicates {} times: {}",
            group.representative.origin(),
            group.count,
            truncate_sql(group.representative.sql(), REPORT_SQL_CHARS)
        );
    }
    for group in result.similar_counter_over_threshold.iter() {
        let _ = write!(
            report,
            "\n{} Similar {} times: {}",
            group.representative.origin(),
            group.count,
            truncate_sql(group.representative.raw_sql(), REPORT_SQL_CHARS)
        );
    }
    for statement in &result.slow_captured_queries {
        let _ = write!(
            report,
            "\n{} Slow {:.2} seconds: {}",
            statement.origin(),
            statement.duration_secs(),
            truncate_sql(statement.raw_sql(), REPORT_SQL_CHARS)
        );
    }

    (!report.is_empty()).then_some(report)
}

/// Assert that `result` has no offending statements, panicking with the report otherwise.
#[macro_export]
macro_rules! assert_efficient {
    ($result:expr) => {
        if let Some(report) = $crate::testing::inefficiency_report(&$result) {
            panic!("Inefficient queries detected:{}", report);
        }
    };
}
