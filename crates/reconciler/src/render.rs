//! Plain-text rendering of the job view for the console front-end.

use serde_json::Value;

use docquery_core::agent_messages::AgentMessage;
use docquery_core::result::AnalyticsResult;

use crate::view::JobView;

/// Render a status line, e.g. `[J1] PROCESSING`.
pub fn status_line(view: &JobView) -> Option<String> {
    let status = view.status?;
    match &view.job_id {
        Some(job_id) => Some(format!("[{job_id}] {status}")),
        None => Some(status.to_string()),
    }
}

pub fn agent_message_line(message: &AgentMessage) -> String {
    let role = if message.role.is_empty() {
        "agent"
    } else {
        message.role.as_str()
    };
    match &message.timestamp {
        Some(ts) => format!("  {ts} {role}: {}", message.content),
        None => format!("  {role}: {}", message.content),
    }
}

/// Render a decoded result as lines of text.
pub fn result_lines(result: &AnalyticsResult) -> Vec<String> {
    match result {
        AnalyticsResult::Text { content, .. } => content.lines().map(str::to_string).collect(),
        AnalyticsResult::Table { table_data, .. } => table_lines(table_data),
        AnalyticsResult::Plot { plot_data, .. } => plot_data.iter().map(plot_summary).collect(),
        AnalyticsResult::Raw(raw) => vec![raw.clone()],
    }
}

/// Render `{headers: [{id, label}], rows: [{data: {...}}]}` as aligned
/// columns. Missing cells render empty.
fn table_lines(table: &Value) -> Vec<String> {
    let headers: Vec<(&str, &str)> = table
        .get("headers")
        .and_then(Value::as_array)
        .map(|headers| {
            headers
                .iter()
                .filter_map(|h| {
                    let id = h.get("id")?.as_str()?;
                    let label = h.get("label").and_then(Value::as_str).unwrap_or(id);
                    Some((id, label))
                })
                .collect()
        })
        .unwrap_or_default();

    if headers.is_empty() {
        return vec![table.to_string()];
    }

    let rows: Vec<Vec<String>> = table
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    let data = row.get("data").unwrap_or(row);
                    headers
                        .iter()
                        .map(|(id, _)| cell_text(data.get(*id)))
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, (_, label))| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers.iter().map(|(_, label)| *label).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One-line summary of a Chart.js style plot specification.
fn plot_summary(plot: &Value) -> String {
    let kind = plot.get("type").and_then(Value::as_str).unwrap_or("chart");
    let title = plot
        .pointer("/options/title/text")
        .or_else(|| plot.pointer("/options/plugins/title/text"))
        .and_then(Value::as_str);
    let datasets = plot
        .pointer("/data/datasets")
        .and_then(Value::as_array)
        .map(|d| {
            d.iter()
                .filter_map(|ds| ds.get("label").and_then(Value::as_str))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let points = plot
        .pointer("/data/labels")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    let mut line = match title {
        Some(title) => format!("[{kind} chart] {title}"),
        None => format!("[{kind} chart]"),
    };
    if !datasets.is_empty() {
        line.push_str(&format!(" ({})", datasets.join(", ")));
    }
    if points > 0 {
        line.push_str(&format!(", {points} points"));
    }
    line
}

/// Turns successive views into the lines that changed between them.
#[derive(Debug, Default)]
pub struct ViewPrinter {
    last: JobView,
}

impl ViewPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for the move from the previous view to `next`.
    pub fn diff(&mut self, next: &JobView) -> Vec<String> {
        let mut lines = Vec::new();
        let job_changed = next.job_id != self.last.job_id;

        if job_changed || next.status != self.last.status {
            lines.extend(status_line(next));
        }

        let messages = next.agent_messages.as_deref().unwrap_or_default();
        let already_shown = if job_changed {
            0
        } else {
            self.last.agent_messages.as_deref().map_or(0, <[_]>::len)
        };
        // A shorter list means it was replaced; show it again in full.
        let start = if messages.len() < already_shown {
            0
        } else {
            already_shown
        };
        lines.extend(messages[start..].iter().map(agent_message_line));

        if next.error.is_some() && next.error != self.last.error {
            lines.extend(next.error.as_ref().map(|e| format!("error: {e}")));
        }

        if next.result.is_some() && next.result != self.last.result {
            lines.extend(next.result.iter().flat_map(result_lines));
        }

        self.last = next.clone();
        lines
    }
}
