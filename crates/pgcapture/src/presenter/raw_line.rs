use super::Presenter;
use super::lines::{LineStyle, write_details};
use crate::classify::{ClassifiedResult, StatementGroup};
use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use std::io::Write;

/// Plain `key: value` stats followed by the offending statements.
#[derive(Debug, Clone, Default)]
pub struct RawLinePresenter {
    style: LineStyle,
}

impl RawLinePresenter {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            style: LineStyle {
                prefix: None,
                keywords: config.sql_keyword_color(),
            },
        }
    }
}

fn describe(group: Option<&StatementGroup>) -> String {
    match group {
        Some(group) => format!("{} times: {}", group.count, group.key),
        None => "None".to_string(),
    }
}

impl Presenter for RawLinePresenter {
    fn name(&self) -> &str {
        "raw_line"
    }

    fn render(&self, result: &ClassifiedResult, out: &mut dyn Write) -> CaptureResult<()> {
        writeln!(out)?;
        writeln!(out, "total: {}", result.total)?;
        writeln!(out, "read: {}", result.read)?;
        writeln!(out, "writes: {}", result.writes)?;
        writeln!(out, "total_duration: {:.2}", result.total_duration_secs())?;
        writeln!(
            out,
            "most_common_duplicates: {}",
            describe(result.most_common_duplicate.as_ref())
        )?;
        writeln!(
            out,
            "most_common_similar: {}",
            describe(result.most_common_similar.as_ref())
        )?;
        writeln!(out)?;

        write_details(result, out, self.style)
    }
}
