//! Output formatters for analytics results.
//!
//! Every result is serialized to a JSON value first and rendered from there,
//! so any analyzer output can be printed in any format.

use std::io::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::Value;

use crate::config::OutputFormat;
use crate::core::Result;

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

impl Format {
    /// Render without color.
    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        Output::new(*self).color(false).write(data, writer)
    }
}

/// A format plus rendering options.
#[derive(Clone, Copy, Debug)]
pub struct Output {
    format: Format,
    color: bool,
}

impl Output {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            color: false,
        }
    }

    /// Color grades, severities and statuses in text output.
    pub fn color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    pub fn write<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.write_value(&value, writer)
    }

    pub fn write_value<W: Write>(&self, value: &Value, writer: &mut W) -> Result<()> {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)?;
                writeln!(writer)?;
            }
            Format::Markdown => markdown(value, writer, 0)?,
            Format::Text => Text { color: self.color }.value(value, writer, 0)?,
        }
        Ok(())
    }
}

/// `health_score` → `Health Score`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn is_nested(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Flat objects with the same shape render as a table.
fn is_tabular(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| match item {
            Value::Object(map) => !map.values().any(is_nested),
            _ => false,
        })
}

fn markdown<W: Write>(value: &Value, writer: &mut W, depth: usize) -> Result<()> {
    match value {
        Value::Object(map) => {
            let heading = "#".repeat((depth + 1).min(6));
            for (key, val) in map {
                if is_nested(val) {
                    writeln!(writer, "{heading} {}\n", title_case(key))?;
                    markdown(val, writer, depth + 1)?;
                } else {
                    writeln!(writer, "**{}**: {}\n", title_case(key), scalar(val))?;
                }
            }
        }
        Value::Array(items) if items.is_empty() => writeln!(writer, "_No items_\n")?,
        Value::Array(items) if is_tabular(items) => markdown_table(items, writer)?,
        Value::Array(items) if items.iter().all(|i| !is_nested(i)) => {
            for item in items {
                writeln!(writer, "- {}", scalar(item))?;
            }
            writeln!(writer)?;
        }
        Value::Array(items) => {
            for item in items {
                writeln!(writer, "---\n")?;
                markdown(item, writer, depth)?;
            }
        }
        _ => writeln!(writer, "{}\n", scalar(value))?,
    }
    Ok(())
}

fn markdown_table<W: Write>(items: &[Value], writer: &mut W) -> Result<()> {
    let Some(Value::Object(first)) = items.first() else {
        return Ok(());
    };
    let columns: Vec<&String> = first.keys().collect();

    let header: Vec<String> = columns.iter().map(|c| title_case(c)).collect();
    writeln!(writer, "| {} |", header.join(" | "))?;
    writeln!(writer, "|{}", " --- |".repeat(columns.len()))?;

    for item in items {
        if let Value::Object(map) = item {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| scalar(map.get(c.as_str()).unwrap_or(&Value::Null)))
                .collect();
            writeln!(writer, "| {} |", cells.join(" | "))?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

/// Indented plain text, optionally colored.
struct Text {
    color: bool,
}

impl Text {
    fn value<W: Write>(&self, value: &Value, writer: &mut W, indent: usize) -> Result<()> {
        let pad = "  ".repeat(indent);
        match value {
            Value::Object(map) => {
                for (key, val) in map {
                    if is_nested(val) {
                        writeln!(writer, "{pad}{}:", title_case(key))?;
                        self.value(val, writer, indent + 1)?;
                    } else {
                        writeln!(writer, "{pad}{}: {}", title_case(key), self.styled(key, val))?;
                    }
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if is_nested(item) {
                        writeln!(writer, "{pad}[{i}]")?;
                        self.value(item, writer, indent + 1)?;
                    } else {
                        writeln!(writer, "{pad}- {}", scalar(item))?;
                    }
                }
            }
            _ => writeln!(writer, "{pad}{}", scalar(value))?,
        }
        Ok(())
    }

    fn styled(&self, key: &str, value: &Value) -> String {
        let text = scalar(value);
        if !self.color {
            return text;
        }
        match key {
            "grade" => grade_color(&text).to_string(),
            "severity" => severity_color(&text).to_string(),
            "status" => status_color(&text).to_string(),
            _ => text,
        }
    }
}

/// Color for a letter grade: A green, B cyan, C yellow, D red.
pub fn grade_color(grade: &str) -> ColoredString {
    match grade.chars().next() {
        Some('A') => grade.green().bold(),
        Some('B') => grade.cyan().bold(),
        Some('C') => grade.yellow().bold(),
        _ => grade.red().bold(),
    }
}

fn severity_color(severity: &str) -> ColoredString {
    match severity {
        "critical" => severity.red().bold(),
        "high" => severity.red(),
        "medium" => severity.yellow(),
        "success" => severity.green(),
        _ => severity.normal(),
    }
}

fn status_color(status: &str) -> ColoredString {
    match status {
        "active" | "Active" => status.green(),
        "maintenance" => status.yellow(),
        "error" => status.red().bold(),
        _ => status.dimmed(),
    }
}
