//! Diagnostics produced by the toolchain and their textual rendering.

use std::fmt;

use crate::span::{Location, Span};

/// Default number of source lines shown for a multi-line span.
pub const DEFAULT_MAX_CODE_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warning => f.write_str("warning"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// Where a diagnostic points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Location(Location),
    Span(Span),
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            level: Level::Error,
            message: message.into(),
            source: Some(Source::Span(span)),
        }
    }

    pub fn error_at(message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            level: Level::Error,
            message: message.into(),
            source: Some(Source::Location(location)),
        }
    }

    pub fn error_without_source(message: impl Into<String>) -> Self {
        Diagnostic {
            level: Level::Error,
            message: message.into(),
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            level: Level::Warning,
            message: message.into(),
            source: Some(Source::Span(span)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// The one-line summary, e.g. `error:3:5~3:9: No such variable 'x'`.
    pub fn diagnostic_line(&self) -> String {
        match self.source {
            Some(Source::Location(location)) => {
                format!("{}:{}: {}", self.level, location, self.message)
            }
            Some(Source::Span(Span::Source { start, end })) => {
                format!("{}:{}~{}: {}", self.level, start, end, self.message)
            }
            Some(Source::Span(Span::Builtin)) | None => {
                format!("{}: {}", self.level, self.message)
            }
        }
    }

    /// The summary line followed by an excerpt of the offending source.
    pub fn formatted(&self, source_code: &str, max_code_lines: usize) -> String {
        match self.annotate(source_code, max_code_lines) {
            Some(annotation) => format!("{}\n{}", self.diagnostic_line(), annotation),
            None => self.diagnostic_line(),
        }
    }

    /// Renders the source lines the diagnostic points at.
    ///
    /// A single-line source gets a `^~~~` underline; a multi-line span shows
    /// at most `max_code_lines` lines followed by `...` when truncated.
    /// Returns `None` for builtin or source-less diagnostics, and for
    /// locations that fall outside `source_code`.
    pub fn annotate(&self, source_code: &str, max_code_lines: usize) -> Option<String> {
        let max_code_lines = max_code_lines.max(1);
        let (start, end) = match self.source? {
            Source::Location(location) => (location, location),
            Source::Span(Span::Source { start, end }) => (start, end),
            Source::Span(Span::Builtin) => return None,
        };

        let lines: Vec<&str> = source_code
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        let first = start.line.checked_sub(1)?;
        let last = end.line.checked_sub(1)?.max(first);
        let error_lines = lines.get(first..=last.min(lines.len().saturating_sub(1)))?;
        let first_line = error_lines.first()?;

        const INDENT: &str = "    ";
        if error_lines.len() > 1 {
            let mut excerpt = error_lines
                .iter()
                .take(max_code_lines)
                .map(|line| format!("{INDENT}{line}"))
                .collect::<Vec<_>>()
                .join("\n");
            if error_lines.len() > max_code_lines {
                excerpt.push('\n');
                excerpt.push_str(INDENT);
                excerpt.push_str("...");
            }
            Some(excerpt)
        } else {
            let padding = " ".repeat(start.column.saturating_sub(1));
            let width = end.column.saturating_sub(start.column + 1);
            Some(format!(
                "{INDENT}{}\n{INDENT}{padding}^{}",
                first_line,
                "~".repeat(width)
            ))
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic_line())
    }
}

impl std::error::Error for Diagnostic {}

/// Runs every fallible computation and keeps either all the values or all
/// the diagnostics of the failures.
pub(crate) fn collect<T>(
    results: impl IntoIterator<Item = Result<T, Vec<Diagnostic>>>,
) -> Result<Vec<T>, Vec<Diagnostic>> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(diagnostics) => errors.extend(diagnostics),
        }
    }
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}
