//! Source positions and ranges.
//!
//! Every token, AST node and diagnostic is tagged with a [`Span`]. Spans
//! are built from the [`Location`] of the first token of a node and the
//! end location of its last token, so nothing needs to be re-scanned to
//! find where a node ends.

use std::fmt;
use std::ops::Add;

/// A 1-indexed line/column position in the source text.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }

    /// Half-open span from `self` until `end`.
    pub fn span_until(self, end: Location) -> Span {
        Span::Source { start: self, end }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The extent of a token.
///
/// `lines` is the number of lines the token touches (1 for anything that
/// doesn't contain a newline) and `last_line_columns` is the number of
/// characters the token occupies on its last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub lines: usize,
    pub last_line_columns: usize,
}

impl Size {
    pub const fn columns(columns: usize) -> Self {
        Size {
            lines: 1,
            last_line_columns: columns,
        }
    }
}

/// End location of something of `size` starting at `location`.
impl Add<Size> for Location {
    type Output = Location;

    fn add(self, size: Size) -> Location {
        if size.lines <= 1 {
            Location::new(self.line, self.column + size.last_line_columns)
        } else {
            Location::new(self.line + size.lines - 1, size.last_line_columns + 1)
        }
    }
}

/// A half-open range of source text, or the marker for synthesized
/// builtin items that have no source at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Span {
    Source { start: Location, end: Location },
    Builtin,
}

impl Span {
    /// Smallest span covering both `self` and `other`.
    ///
    /// Joining with a builtin span yields the other span unchanged.
    pub fn join(self, other: Span) -> Span {
        match (self, other) {
            (Span::Source { start: s1, end: e1 }, Span::Source { start: s2, end: e2 }) => {
                Span::Source {
                    start: s1.min(s2),
                    end: e1.max(e2),
                }
            }
            (Span::Builtin, span) | (span, Span::Builtin) => span,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Source { start, end } => write!(f, "{start}~{end}"),
            Span::Builtin => f.write_str("<builtin>"),
        }
    }
}

/// A value together with the span it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(inner: T, span: Span) -> Self {
        Spanned { inner, span }
    }

    pub fn builtin(inner: T) -> Self {
        Spanned {
            inner,
            span: Span::Builtin,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            inner: f(self.inner),
            span: self.span,
        }
    }

    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned {
            inner: &self.inner,
            span: self.span,
        }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}
