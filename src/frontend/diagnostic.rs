use colored::*;
use std::fmt::{Display, Formatter};

use crate::error::TranslateError;

/// A diagnostic message with optional source location and highlighting.
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub unit: Option<String>,
    pub line: Option<usize>,
}

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Note,
}

impl Display for DiagnosticLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "{}", "error".red().bold()),
            DiagnosticLevel::Warning => write!(f, "{}", "warning".yellow().bold()),
            DiagnosticLevel::Note => write!(f, "{}", "note".blue().bold()),
        }
    }
}

impl Diagnostic {
    /// Creates a new error diagnostic pointing at a source line.
    pub fn error(message: String, unit: String, line: usize) -> Self {
        Self {
            message,
            level: DiagnosticLevel::Error,
            unit: Some(unit),
            line: Some(line),
        }
    }

    /// Creates a new warning diagnostic without a source location.
    pub fn warning(message: String) -> Self {
        Self {
            message,
            level: DiagnosticLevel::Warning,
            unit: None,
            line: None,
        }
    }

    /// Builds the diagnostic for a translation error, carrying over its
    /// unit and line when present.
    pub fn from_error(error: &TranslateError) -> Self {
        Self {
            message: error.message().to_string(),
            level: DiagnosticLevel::Error,
            unit: error.unit().map(str::to_string),
            line: error.line(),
        }
    }

    /// Formats the diagnostic with source context and highlighting. The
    /// source is the text of the unit the diagnostic points at; without
    /// it (or without a location) only the header is produced.
    pub fn format(&self, source: Option<&str>) -> String {
        let mut result = String::new();
        result.push_str(&format!("{}: {}\n", self.level, self.message.bold()));

        let (Some(unit), Some(line_number)) = (&self.unit, self.line) else {
            return result;
        };
        result.push_str(&format!(
            " {} {}:{}\n",
            "-->".cyan().bold(),
            format!("{}.vm", unit).cyan(),
            line_number.to_string().cyan()
        ));

        let Some(src) = source else {
            return result;
        };
        let lines: Vec<&str> = src.lines().collect();
        if line_number == 0 || line_number > lines.len() {
            return result;
        }

        if line_number > 1 {
            result.push_str(&self.gutter_line(line_number - 1, lines[line_number - 2]));
        }

        let line = lines[line_number - 1];
        result.push_str(&self.gutter_line(line_number, line));

        // Underline the instruction text, skipping leading whitespace.
        let indent = line.len() - line.trim_start().len();
        let width = line.trim_end().len().saturating_sub(indent).max(1);
        let highlight = match self.level {
            DiagnosticLevel::Error => "^".repeat(width).red().bold(),
            DiagnosticLevel::Warning => "^".repeat(width).yellow().bold(),
            DiagnosticLevel::Note => "^".repeat(width).blue().bold(),
        };
        result.push_str(&format!(
            "     {} {}{}\n",
            "|".blue().bold(),
            " ".repeat(indent),
            highlight
        ));

        if line_number < lines.len() {
            result.push_str(&self.gutter_line(line_number + 1, lines[line_number]));
        }

        result
    }

    fn gutter_line(&self, number: usize, text: &str) -> String {
        format!(
            "{:4} {} {}\n",
            number.to_string().cyan(),
            "|".cyan().bold(),
            text
        )
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format(None))
    }
}
