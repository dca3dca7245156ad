use super::Presenter;
use super::lines::paint;
use crate::classify::ClassifiedResult;
use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use colored::Color;
use std::io::Write;

/// One warning line per slow statement, prefixed with where it was issued.
#[derive(Debug, Clone, Default)]
pub struct OnlySlowQueryPresenter {
    warning: Option<Color>,
}

impl OnlySlowQueryPresenter {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            warning: config.warning_color(),
        }
    }
}

impl Presenter for OnlySlowQueryPresenter {
    fn name(&self) -> &str {
        "only_slow_query"
    }

    fn render(&self, result: &ClassifiedResult, out: &mut dyn Write) -> CaptureResult<()> {
        for statement in &result.slow_captured_queries {
            let line = format!(
                "{} Slow {:.2} seconds",
                statement.origin(),
                statement.duration_secs()
            );
            writeln!(out, "{}", paint(&line, self.warning))?;
        }
        Ok(())
    }
}
