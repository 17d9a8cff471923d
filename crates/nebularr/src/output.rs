//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! JSON uses serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Style as Paint};
use tabled::{Table, Tabled, settings::Style};

use nebularr_core::{ChangeSet, Phase};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint(text: &str, style: Paint, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_owned()
    }
}

pub fn phase(phase: Option<Phase>, color: bool) -> String {
    let Some(phase) = phase else {
        return "-".into();
    };
    let style = match phase {
        Phase::Ready => Paint::new().green(),
        Phase::Degraded => Paint::new().yellow(),
        Phase::Failed => Paint::new().red().bold(),
        Phase::Suspended => Paint::new().dimmed(),
        _ => Paint::new(),
    };
    paint(&phase.to_string(), style, color)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single item. Table rendering uses `detail_fn`, since detail
/// views don't use the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data),
        OutputFormat::Plain => line_fn(data),
    }
}

/// One line per change: `+` create, `~` update, `-` delete.
pub fn render_changes(format: OutputFormat, changes: &ChangeSet, color: bool) -> String {
    if format == OutputFormat::Json {
        return render_json(changes);
    }
    if changes.is_empty() {
        return if format == OutputFormat::Table {
            "No changes: in sync".into()
        } else {
            String::new()
        };
    }

    let color = color && format == OutputFormat::Table;
    let mut lines = Vec::with_capacity(changes.total_changes());
    for r in &changes.creates {
        let marker = paint("+", Paint::new().green().bold(), color);
        lines.push(format!("{marker} {} {}", r.kind, r.key));
    }
    for r in &changes.updates {
        let marker = paint("~", Paint::new().yellow().bold(), color);
        lines.push(format!("{marker} {} {}", r.kind, r.key));
    }
    for r in &changes.deletes {
        let marker = paint("-", Paint::new().red().bold(), color);
        lines.push(format!("{marker} {} {}", r.kind, r.key));
    }
    if format == OutputFormat::Table {
        lines.push(String::new());
        lines.push(format!(
            "{} to create, {} to update, {} to delete",
            changes.creates.len(),
            changes.updates.len(),
            changes.deletes.len()
        ));
    }
    lines.join("\n")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON. Serialization of our own types cannot fail in
/// practice; a failure is rendered instead of panicking.
pub(crate) fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}
