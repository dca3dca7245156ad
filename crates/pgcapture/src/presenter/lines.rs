//! Detail lines shared by the `pretty` and `raw_line` presenters.

use crate::classify::ClassifiedResult;
use crate::error::CaptureResult;
use crate::sql::format_sql;
use colored::{Color, Colorize};
use std::io::Write;

/// Colors used for detail lines; `None` writes plain text.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct LineStyle {
    pub(super) prefix: Option<Color>,
    pub(super) keywords: Option<Color>,
}

pub(super) fn paint(text: &str, color: Option<Color>) -> String {
    match color {
        Some(color) => text.color(color).to_string(),
        None => text.to_string(),
    }
}

fn write_entry(
    out: &mut dyn Write,
    prefix: &str,
    sql: &str,
    style: LineStyle,
) -> CaptureResult<()> {
    writeln!(out, "{}", paint(prefix, style.prefix))?;
    writeln!(out, "{}", format_sql(sql, style.keywords))?;
    Ok(())
}

/// Slow statements, then duplicate groups, then similar groups over threshold.
pub(super) fn write_details(
    result: &ClassifiedResult,
    out: &mut dyn Write,
    style: LineStyle,
) -> CaptureResult<()> {
    for statement in &result.slow_captured_queries {
        let prefix = format!("Slow {:.2} seconds.", statement.duration_secs());
        write_entry(out, &prefix, statement.sql(), style)?;
    }

    for group in result.duplicates_counter_over_threshold.iter() {
        let prefix = format!("Repeated {} times", group.count);
        write_entry(out, &prefix, group.representative.sql(), style)?;
    }

    for group in result.similar_counter_over_threshold.iter() {
        let prefix = format!("Similar {} times", group.count);
        write_entry(out, &prefix, group.representative.raw_sql(), style)?;
    }

    Ok(())
}
