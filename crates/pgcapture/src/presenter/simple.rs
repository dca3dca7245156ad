use super::Presenter;
use crate::classify::ClassifiedResult;
use crate::error::CaptureResult;
use std::io::Write;

/// Only the statement count and total time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePresenter;

impl Presenter for SimplePresenter {
    fn name(&self) -> &str {
        "simple"
    }

    fn render(&self, result: &ClassifiedResult, out: &mut dyn Write) -> CaptureResult<()> {
        writeln!(
            out,
            "total: {} queries in {:.2} seconds",
            result.total,
            result.total_duration_secs()
        )?;
        Ok(())
    }
}
