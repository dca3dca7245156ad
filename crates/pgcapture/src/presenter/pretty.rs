use super::Presenter;
use super::lines::{LineStyle, paint, write_details};
use crate::classify::{ClassifiedResult, StatementGroup};
use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use colored::Color;
use comfy_table::presets::{ASCII_FULL, ASCII_MARKDOWN, NOTHING, UTF8_FULL};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::io::Write;

/// Map a `TABLE_FORMAT` name to a table preset.
pub(crate) fn table_preset(format: &str) -> Option<&'static str> {
    match format.to_ascii_lowercase().as_str() {
        "pretty" | "utf8" => Some(UTF8_FULL),
        "ascii" | "grid" => Some(ASCII_FULL),
        "markdown" | "github" => Some(ASCII_MARKDOWN),
        "plain" => Some(NOTHING),
        _ => None,
    }
}

/// Stats table followed by the offending statements; colored once a threshold is
/// exceeded.
#[derive(Debug, Clone)]
pub struct PrettyPresenter {
    preset: &'static str,
    bold_header: bool,
    warning: Option<Color>,
    keywords: Option<Color>,
}

impl PrettyPresenter {
    pub fn new(config: &CaptureConfig) -> Self {
        let format = &config.pretty.table_format;
        let preset = table_preset(format).unwrap_or_else(|| {
            tracing::warn!(
                target: "pgcapture.capture",
                table_format = %format,
                "unknown table format, using \"pretty\""
            );
            UTF8_FULL
        });

        Self {
            preset,
            bold_header: config.pretty.colorize,
            warning: config.warning_color(),
            keywords: config.sql_keyword_color(),
        }
    }

    fn stats_table(&self, result: &ClassifiedResult) -> Table {
        let header = [
            "total",
            "read",
            "writes",
            "total_duration",
            "has_over_threshold",
            "most_common_duplicate",
            "most_common_similar",
        ]
        .map(|name| {
            let cell = Cell::new(name);
            if self.bold_header {
                cell.add_attribute(Attribute::Bold)
            } else {
                cell
            }
        });

        let count = |group: &Option<StatementGroup>| {
            group
                .as_ref()
                .map_or_else(|| "-".to_string(), |g| g.count.to_string())
        };

        let mut table = Table::new();
        table
            .load_preset(self.preset)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header.to_vec())
            .add_row(vec![
                Cell::new(result.total),
                Cell::new(result.read),
                Cell::new(result.writes),
                Cell::new(format!("{:.2}", result.total_duration_secs())),
                Cell::new(result.has_over_threshold),
                Cell::new(count(&result.most_common_duplicate)),
                Cell::new(count(&result.most_common_similar)),
            ]);
        table
    }
}

impl Presenter for PrettyPresenter {
    fn name(&self) -> &str {
        "pretty"
    }

    fn render(&self, result: &ClassifiedResult, out: &mut dyn Write) -> CaptureResult<()> {
        let warning = if result.has_over_threshold {
            self.warning
        } else {
            None
        };

        writeln!(out)?;
        writeln!(out, "{}", paint(&self.stats_table(result).to_string(), warning))?;

        let style = LineStyle {
            prefix: warning,
            keywords: self.keywords,
        };
        write_details(result, out, style)
    }
}

impl Default for PrettyPresenter {
    fn default() -> Self {
        Self::new(&CaptureConfig::default())
    }
}
