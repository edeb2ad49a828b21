use std::path::Path;
use std::time::Duration;

use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::driver::BatchSummary;
use crate::types::ModelListing;

fn style_index() -> Style {
    Style::new().cyan().bold()
}

fn style_dim_italic() -> Style {
    Style::new().dimmed().italic()
}

/// `"12 events"`, `"1 event"`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn describe(listing: &ModelListing) -> String {
    match &listing.name {
        Some(name) => {
            // Unmapped scale codes already carry their own unit, if any.
            let scale = if name.scale.parse::<u64>().is_ok() {
                format!("{} m", name.scale)
            } else {
                name.scale.clone()
            };
            format!("{} / {} / {}", name.basin, scale, name.scenario)
        }
        None => "(unrecognised name)".to_string(),
    }
}

/// Default listing with header, aligned columns and footer.
pub fn format_default(models: &[ModelListing], root: &Path) -> String {
    let mut out = String::new();

    let header = format!("Models under {}:", root.display());
    out.push_str(
        &header
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push_str("\n\n");

    if !models.is_empty() {
        let index_width = if models.len() <= 10 { 1 } else { 2 };
        let max_name_width = models.iter().map(|m| m.dir_name.len()).max().unwrap_or(0);
        let max_desc_width = models.iter().map(|m| describe(m).len()).max().unwrap_or(0);

        let idx_style = style_index();
        let dim_it = style_dim_italic();

        for (i, model) in models.iter().enumerate() {
            let idx_str = format!("{:>width$}", i, width = index_width);
            let idx_colored = idx_str
                .if_supports_color(Stream::Stdout, |s| s.style(idx_style))
                .to_string();

            let name_padded = format!("{:<width$}", model.dir_name, width = max_name_width);
            let name_colored = name_padded
                .if_supports_color(Stream::Stdout, |s| s.green())
                .to_string();

            let desc_padded = format!("{:<width$}", describe(model), width = max_desc_width);
            let desc_colored = if model.name.is_some() {
                desc_padded
                    .if_supports_color(Stream::Stdout, |s| s.white())
                    .to_string()
            } else {
                desc_padded
                    .if_supports_color(Stream::Stdout, |s| s.style(dim_it))
                    .to_string()
            };

            let cells = match model.cells {
                Some(n) => plural(n as usize, "cell"),
                None => "? cells".to_string(),
            };
            let cells_colored = format!("{:>12}", cells)
                .if_supports_color(Stream::Stdout, |s| s.yellow())
                .to_string();

            out.push_str(&format!(
                "  {}  {}  {}  {}  {}\n",
                idx_colored,
                name_colored,
                desc_colored,
                cells_colored,
                plural(model.events.len(), "event")
            ));
        }

        out.push('\n');
    }

    let total_runs: usize = models.iter().map(|m| m.events.len()).sum();
    let footer = format!("{} queued. Run: hydrobench tetis", plural(total_runs, "run"));
    out.push_str(
        &footer
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push('\n');

    out
}

/// Short listing: one line per model, no header or footer.
pub fn format_short(models: &[ModelListing]) -> String {
    let max_name_width = models.iter().map(|m| m.dir_name.len()).max().unwrap_or(0);

    let mut out = String::new();
    for model in models {
        let name_padded = format!("{:<width$}", model.dir_name, width = max_name_width);
        out.push_str(&format!(
            "{}  {}\n",
            name_padded
                .if_supports_color(Stream::Stdout, |s| s.green())
                .to_string(),
            plural(model.events.len(), "event")
        ));
    }
    out
}

#[derive(Serialize)]
struct JsonModel<'a> {
    index: usize,
    #[serde(flatten)]
    model: &'a ModelListing,
}

pub fn format_json(models: &[ModelListing]) -> String {
    let json_models: Vec<JsonModel> = models
        .iter()
        .enumerate()
        .map(|(index, model)| JsonModel { index, model })
        .collect();

    serde_json::to_string_pretty(&json_models).unwrap_or_else(|_| "[]".to_string())
}

/// Whole hours and remaining minutes (one decimal) of a batch.
pub fn hours_and_minutes(elapsed: Duration) -> (u64, f64) {
    let secs = elapsed.as_secs_f64();
    let hours = (secs / 3600.0).floor();
    let minutes = (((secs / 3600.0) - hours) * 60.0 * 10.0).round() / 10.0;
    (hours as u64, minutes)
}

/// Framed end-of-batch banner.
pub fn format_banner(elapsed: Duration) -> String {
    let (hours, minutes) = hours_and_minutes(elapsed);
    let text = format!("Execution total time was {} hours and {} minutes", hours, minutes);
    let width = text.chars().count() + 20;
    let blank = format!("#{}#", " ".repeat(width - 2));
    let rule = "#".repeat(width);

    format!(
        "{rule}\n{blank}\n#{pad}{text}{pad}#\n{blank}\n{rule}\n",
        pad = " ".repeat(9)
    )
}

pub fn format_summary(summary: &BatchSummary) -> String {
    let mut line = format!(
        "{} written to {}",
        plural(summary.rows, "row"),
        summary.report.display()
    );
    if summary.failed_runs > 0 {
        line.push_str(&format!(
            " ({} not executable)",
            plural(summary.failed_runs, "run")
        ));
    }
    line
}
