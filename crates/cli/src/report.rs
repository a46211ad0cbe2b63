//! Per-file results and how they are printed.

use colored::Colorize;
use savefmt_core::{FormatOutcome, SkipReason};
use serde::Serialize;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub outcome: Option<FormatOutcome>,
    /// Formatting produced different text.
    pub changed: bool,
    /// The new text was written to disk.
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn failed(path: String, error: String) -> Self {
        Self {
            path,
            language: None,
            outcome: None,
            changed: false,
            written: false,
            error: Some(error),
        }
    }

    fn label(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{} ({error})", "error".red().bold());
        }
        match self.outcome {
            Some(FormatOutcome::Formatted) if self.written => "formatted".green().to_string(),
            Some(FormatOutcome::Formatted) if self.changed => "would format".yellow().to_string(),
            Some(FormatOutcome::Formatted) => "unchanged".dimmed().to_string(),
            Some(FormatOutcome::Skipped(SkipReason::EngineFailed)) => {
                format!("{} (engine failed)", "skipped".red())
            }
            Some(FormatOutcome::Skipped(reason)) => {
                format!("{} ({reason})", "skipped".dimmed())
            }
            None => "not saved".dimmed().to_string(),
        }
    }
}

/// Totals across all files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub written: usize,
    pub errors: usize,
    pub engine_errors: usize,
}

impl Summary {
    pub fn of(reports: &[FileReport], engine_errors: usize) -> Self {
        Self {
            files: reports.len(),
            changed: reports.iter().filter(|r| r.changed).count(),
            written: reports.iter().filter(|r| r.written).count(),
            errors: reports.iter().filter(|r| r.error.is_some()).count(),
            engine_errors,
        }
    }
}

pub fn print_human(reports: &[FileReport], summary: &Summary) {
    for report in reports {
        println!("{}  {}", report.label(), report.path);
    }
    let mut line = format!(
        "{} file(s), {} changed, {} written",
        summary.files, summary.changed, summary.written
    );
    if summary.errors > 0 {
        line.push_str(&format!(", {} error(s)", summary.errors));
    }
    if summary.engine_errors > 0 {
        line.push_str(&format!(", {} engine error(s)", summary.engine_errors));
    }
    println!("{}", line.bold());
}

pub fn print_json(reports: &[FileReport], summary: &Summary) {
    let value = serde_json::json!({
        "files": reports,
        "summary": summary,
    });
    match serde_json::to_string_pretty(&value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error: failed to serialize report: {e}"),
    }
}
