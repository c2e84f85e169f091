//! Structured diagnostics.
//!
//! Every recoverable finding (an unmatched hierarchy regex, an uncovered
//! node, a task that could not write its file) is reported to an injected
//! [`MessageCollector`]. Collectors filter on a minimum severity, never fail
//! on their own account, and remember the worst severity they have seen so
//! the caller can pick an exit status.

use std::fmt;

pub mod collector;
pub mod position;

pub use collector::{NoopCollector, PrintMode, PrintingCollector, RecordingCollector};
pub use position::{DataPath, Position};

// ============================================================================
// SEVERITY & CATEGORIES
// ============================================================================

/// How serious a report is. Normal execution traces rank above warnings so
/// that the default threshold still shows progress messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ignore,
    Debug,
    Fine,
    Warning,
    Normal,
    Error,
    Fail,
}

impl Severity {
    pub fn display_name(self) -> &'static str {
        match self {
            Severity::Ignore => "ignore",
            Severity::Debug => "debug",
            Severity::Fine => "fine",
            Severity::Warning => "warning",
            Severity::Normal => "info",
            Severity::Error => "error",
            Severity::Fail => "fatal",
        }
    }

    /// Parses a severity name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Severity> {
        match name.to_ascii_lowercase().as_str() {
            "ignore" => Some(Severity::Ignore),
            "debug" => Some(Severity::Debug),
            "fine" => Some(Severity::Fine),
            "warning" | "warn" => Some(Severity::Warning),
            "normal" | "info" => Some(Severity::Normal),
            "error" => Some(Severity::Error),
            "fail" | "fatal" => Some(Severity::Fail),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    /// A `r:` hierarchy pattern matches no grammar node.
    UnmatchedHierarchyRegex,
    /// A plain hierarchy name is not declared by the grammar.
    ExactNodeNotInGrammar,
    /// A `r:` hierarchy pattern has children.
    RegexShouldBeLeaf,
    /// A grammar node is not mentioned by the hierarchy.
    UncoveredNode,
    MultipleHierarchyRoots,
    NoHierarchyRoots,
    WrongType,
    InvalidRegex,
    DuplicateMatch,
    /// A class was not generated because it exists in another source root.
    ClassNotGenerated,
    /// A class file was written.
    ClassGenerated,
    /// A file generation is missing its template or class name.
    IncompleteVisitorSpec,
    NormalExecMessage,
    Debug,
    NonFatal,
    FatalError,
}

impl MessageCategory {
    pub fn min_severity(self) -> Severity {
        use MessageCategory::*;
        match self {
            UnmatchedHierarchyRegex | RegexShouldBeLeaf | UncoveredNode | DuplicateMatch
            | IncompleteVisitorSpec => Severity::Warning,
            MultipleHierarchyRoots | NoHierarchyRoots | WrongType | InvalidRegex | NonFatal => {
                Severity::Error
            }
            ExactNodeNotInGrammar | ClassNotGenerated | ClassGenerated => Severity::Fine,
            NormalExecMessage => Severity::Normal,
            Debug => Severity::Debug,
            FatalError => Severity::Fail,
        }
    }
}

// ============================================================================
// ENTRIES & COLLECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub category: MessageCategory,
    pub message: String,
    pub severity: Severity,
    pub positions: Vec<Position>,
}

/// Sink for diagnostics. Shared between concurrently running tasks.
pub trait MessageCollector: Send + Sync {
    /// Records an entry whose severity has already been resolved. Returns the
    /// severity actually surfaced, or [`Severity::Ignore`] if it was filtered.
    fn report_entry(&self, entry: ReportEntry) -> Severity;

    /// The worst severity surfaced so far.
    fn max_severity(&self) -> Severity;

    /// Called once after all work is done.
    fn conclude(&self) {}

    fn report(
        &self,
        message: &str,
        category: MessageCategory,
        severity_override: Option<Severity>,
        positions: Vec<Position>,
    ) -> Severity {
        self.report_entry(ReportEntry {
            category,
            message: message.to_string(),
            severity: severity_override.unwrap_or_else(|| category.min_severity()),
            positions,
        })
    }

    fn report_at(&self, message: &str, category: MessageCategory, position: Position) -> Severity {
        self.report(message, category, None, vec![position])
    }

    fn report_normal(&self, message: &str) {
        self.report(message, MessageCategory::NormalExecMessage, None, Vec::new());
    }

    fn report_debug(&self, message: &str) {
        self.report(message, MessageCategory::Debug, None, Vec::new());
    }

    fn report_non_fatal(&self, message: &str, position: Option<Position>) {
        self.report(
            message,
            MessageCategory::NonFatal,
            None,
            position.into_iter().collect(),
        );
    }

    /// Reports a hard error that aborted one operation.
    fn report_error(&self, context: &str, error: &crate::errors::JjtxError) {
        self.report(
            &format!("{}: {}", context, error),
            MessageCategory::NonFatal,
            None,
            Vec::new(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Fine < Severity::Warning);
        assert!(Severity::Warning < Severity::Normal);
        assert!(Severity::Normal < Severity::Error);
        assert!(Severity::Error.is_error());
        assert!(!Severity::Normal.is_error());
    }

    #[test]
    fn test_category_severity() {
        assert_eq!(
            MessageCategory::UncoveredNode.min_severity(),
            Severity::Warning
        );
        assert_eq!(
            MessageCategory::ExactNodeNotInGrammar.min_severity(),
            Severity::Fine
        );
        assert_eq!(MessageCategory::WrongType.min_severity(), Severity::Error);
    }

    #[test]
    fn test_severity_from_name() {
        assert_eq!(Severity::from_name("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::from_name("info"), Some(Severity::Normal));
        assert_eq!(Severity::from_name("loud"), None);
    }
}
