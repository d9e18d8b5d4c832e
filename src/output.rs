//! Rendering of statement outcomes for the terminal.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use deskdb::query::ExecutionOutcome;
use deskdb::session::RefreshSummary;
use deskdb::TabularResult;

/// Renders results in the selected format.
#[derive(Debug, Clone)]
pub struct Renderer {
    format: OutputFormat,
    max_column_width: usize,
}

impl Renderer {
    pub fn new(format: OutputFormat, max_column_width: usize) -> Self {
        Self {
            format,
            max_column_width,
        }
    }

    /// Renders a statement outcome.
    pub fn outcome(&self, outcome: &ExecutionOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(outcome).context("Failed to serialize result")
            }
            OutputFormat::Table => Ok(match outcome {
                ExecutionOutcome::Rows(table) => self.table(table),
                ExecutionOutcome::Affected(rows) => format!("{rows} row(s) affected"),
            }),
        }
    }

    /// Renders a link refresh summary.
    pub fn refresh_summary(&self, summary: &RefreshSummary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(summary).context("Failed to serialize summary");
        }

        let mut out = format!(
            "{} refreshed, {} skipped, {} failed",
            summary.refreshed.len(),
            summary.skipped.len(),
            summary.failures.len()
        );
        for name in &summary.refreshed {
            out.push_str(&format!("\n  ok      {name}"));
        }
        for failure in &summary.failures {
            out.push_str(&format!("\n  failed  {}: {}", failure.table, failure.reason));
        }
        Ok(out)
    }

    fn table(&self, table: &TabularResult) -> String {
        if table.column_count() == 0 {
            return "(empty result)".to_string();
        }

        let headers: Vec<String> = table
            .columns()
            .iter()
            .map(|c| truncate(&c.name, self.max_column_width))
            .collect();
        let rows: Vec<Vec<String>> = table
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| truncate(&v.to_display_string(), self.max_column_width))
                    .collect()
            })
            .collect();

        let mut out = format_table(&headers, &rows);
        out.push_str(&format!("\n({} row(s))", table.row_count()));
        out
    }
}

/// Truncates to `max_width` characters, ending in "..." when cut.
fn truncate(s: &str, max_width: usize) -> String {
    let len = s.chars().count();
    if len <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers);
    out.push('\n');
    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    out.push_str(&separator.join("─┼─"));
    for row in rows {
        out.push('\n');
        out.push_str(&line(row));
    }
    out
}
