//! Source positions attached to diagnostics.

use std::fmt;

/// Where a diagnostic points: a location inside a grammar file, or a path
/// into a structured configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Position {
    File {
        file: String,
        line: usize,
        column: usize,
    },
    Data(DataPath),
}

impl Position {
    pub fn file(file: impl Into<String>, line: usize, column: usize) -> Self {
        Position::File {
            file: file.into(),
            line,
            column,
        }
    }

    /// Computes the 1-based line and column of a byte offset in `content`.
    pub fn from_offset(file: impl Into<String>, content: &str, offset: usize) -> Self {
        let prefix = &content[..offset.min(content.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix.rfind('\n').map_or(prefix.len(), |nl| prefix.len() - nl - 1) + 1;
        Position::file(file, line, column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::File { file, line, column } => write!(f, "{}:{}:{}", file, line, column),
            Position::Data(path) => path.fmt(f),
        }
    }
}

/// A pointer-like path into a YAML/JSON document, displayed as `/a/0/b`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DataPath {
    segments: Vec<String>,
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the path of a child entry.
    pub fn resolve(&self, key: impl ToString) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl From<DataPath> for Position {
    fn from(path: DataPath) -> Self {
        Position::Data(path)
    }
}
