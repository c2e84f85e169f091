//! jjtx Error Handling
//!
//! Hard errors abort a single operation: reading a grammar, loading a
//! configuration file, invoking the external compiler, writing a generated
//! file. Everything recoverable flows through [`crate::reporting`] instead.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// Source text an error points into. Real files are preferred; a fallback is
/// used for errors with no meaningful source (I/O, tool failures).
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Debug)]
pub struct JjtxError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened
    pub source_info: SourceInfo,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Grammar reading
    GrammarSyntax {
        message: String,
    },
    MissingElement {
        element: String,
    },
    UnsupportedConstruct {
        construct: String,
    },

    // Configuration
    InvalidConfig {
        file: String,
        message: String,
    },
    UnknownTask {
        name: String,
    },

    // Generation
    Io {
        path: String,
        message: String,
    },
    ToolInvocation {
        tool: String,
        message: String,
    },
    ToolExit {
        tool: String,
        code: Option<i32>,
    },
    Template {
        template: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Grammar,
    Config,
    Generation,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GrammarSyntax { .. }
            | Self::MissingElement { .. }
            | Self::UnsupportedConstruct { .. } => ErrorCategory::Grammar,

            Self::InvalidConfig { .. } | Self::UnknownTask { .. } => ErrorCategory::Config,

            Self::Io { .. }
            | Self::ToolInvocation { .. }
            | Self::ToolExit { .. }
            | Self::Template { .. } => ErrorCategory::Generation,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::GrammarSyntax { .. } => "syntax",
            Self::MissingElement { .. } => "missing_element",
            Self::UnsupportedConstruct { .. } => "unsupported_construct",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::UnknownTask { .. } => "unknown_task",
            Self::Io { .. } => "io",
            Self::ToolInvocation { .. } => "tool_invocation",
            Self::ToolExit { .. } => "tool_exit",
            Self::Template { .. } => "template",
        }
    }
}

impl std::error::Error for JjtxError {}

impl fmt::Display for JjtxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::GrammarSyntax { message } => {
                write!(f, "Grammar error: {}", message)
            }
            ErrorKind::MissingElement { element } => {
                write!(f, "Grammar error: missing {}", element)
            }
            ErrorKind::UnsupportedConstruct { construct } => {
                write!(f, "Grammar error: unsupported {}", construct)
            }
            ErrorKind::InvalidConfig { file, message } => {
                write!(f, "Configuration error in {}: {}", file, message)
            }
            ErrorKind::UnknownTask { name } => {
                write!(f, "Configuration error: unknown task '{}'", name)
            }
            ErrorKind::Io { path, message } => {
                write!(f, "I/O error on {}: {}", path, message)
            }
            ErrorKind::ToolInvocation { tool, message } => {
                write!(f, "Could not run {}: {}", tool, message)
            }
            ErrorKind::ToolExit { tool, code } => match code {
                Some(code) => write!(f, "{} exited with status {}", tool, code),
                None => write!(f, "{} was terminated by a signal", tool),
            },
            ErrorKind::Template { template, message } => {
                write!(f, "Template error in {}: {}", template, message)
            }
        }
    }
}

impl Diagnostic for JjtxError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl JjtxError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::GrammarSyntax { .. } => "syntax error".into(),
            ErrorKind::MissingElement { .. } => "missing here".into(),
            ErrorKind::UnsupportedConstruct { .. } => "not supported".into(),
            ErrorKind::InvalidConfig { .. } => "invalid configuration".into(),
            ErrorKind::UnknownTask { .. } => "unknown task".into(),
            ErrorKind::Io { .. } => "i/o failure".into(),
            ErrorKind::ToolInvocation { .. } | ErrorKind::ToolExit { .. } => {
                "tool failure".into()
            }
            ErrorKind::Template { .. } => "template failure".into(),
        }
    }

    /// Attaches a help message, replacing any previous one.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }
}

// ============================================================================
// ERROR CONSTRUCTION
// ============================================================================

/// Context-aware error creation.
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> JjtxError;

    fn syntax_error(&self, message: &str, span: SourceSpan) -> JjtxError {
        self.report(
            ErrorKind::GrammarSyntax {
                message: message.into(),
            },
            span,
        )
    }

    fn missing_element(&self, element: &str, span: SourceSpan) -> JjtxError {
        self.report(
            ErrorKind::MissingElement {
                element: element.into(),
            },
            span,
        )
    }

    fn unsupported(&self, construct: &str, span: SourceSpan) -> JjtxError {
        self.report(
            ErrorKind::UnsupportedConstruct {
                construct: construct.into(),
            },
            span,
        )
    }
}

/// Error creation context bound to one source and one processing phase.
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> JjtxError {
        let error_code = format!("jjtx::{}::{}", self.phase, kind.code_suffix());

        JjtxError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

/// Builds an error that has no source location, e.g. a failed file write.
pub fn unsourced(kind: ErrorKind, phase: &str) -> JjtxError {
    let context = PhaseContext::new(SourceContext::fallback(phase), phase);
    context.report(kind, unspanned())
}

pub fn io_error(path: &Path, error: &std::io::Error) -> JjtxError {
    unsourced(
        ErrorKind::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        },
        "io",
    )
}

pub fn config_error(file: &str, message: impl Into<String>) -> JjtxError {
    unsourced(
        ErrorKind::InvalidConfig {
            file: file.to_string(),
            message: message.into(),
        },
        "config",
    )
}

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

pub fn to_source_span(start: usize, end: usize) -> SourceSpan {
    SourceSpan::from(start..end)
}

// ============================================================================
// ERROR FORMATTING
// ============================================================================

/// Prints an error with full miette diagnostics on stderr.
pub fn print_error(error: JjtxError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_context_builds_error_code() {
        let ctx = PhaseContext::new(SourceContext::from_file("g.jjt", "void A() : {} {}"), "parse");
        let err = ctx.syntax_error("expected ':'", to_source_span(3, 4));
        assert_eq!(err.diagnostic_info.error_code, "jjtx::parse::syntax");
        assert_eq!(err.kind.category(), ErrorCategory::Grammar);
        assert_eq!(err.to_string(), "Grammar error: expected ':'");
    }

    #[test]
    fn test_tool_exit_display() {
        let err = unsourced(
            ErrorKind::ToolExit {
                tool: "javacc".into(),
                code: Some(1),
            },
            "javacc",
        );
        assert_eq!(err.to_string(), "javacc exited with status 1");
        assert_eq!(err.kind.category(), ErrorCategory::Generation);
    }

    #[test]
    fn test_with_help_is_exposed_to_miette() {
        let err = config_error("a.jjtopts.yaml", "bad").with_help("check the indentation");
        let help = err.help().map(|h| h.to_string());
        assert_eq!(help.as_deref(), Some("check the indentation"));
    }
}
