//! Collector implementations: terminal printing, in-memory recording, no-op.

use super::{MessageCollector, ReportEntry, Severity};
use std::io::Write;
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

// ============================================================================
// PRINTING COLLECTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Every surfaced entry is printed with its positions.
    Full,
    /// Progress messages and errors are printed, warnings are only counted
    /// and summarized at the end.
    Aggregate,
}

#[derive(Debug, Default)]
struct PrintState {
    max: Option<Severity>,
    warnings: usize,
    errors: usize,
}

/// Prints diagnostics to stderr with colors.
pub struct PrintingCollector {
    min_severity: Severity,
    mode: PrintMode,
    color: ColorChoice,
    state: Mutex<PrintState>,
}

const PADDING: usize = 12;

impl PrintingCollector {
    pub fn new(min_severity: Severity, mode: PrintMode) -> Self {
        let color = if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            min_severity,
            mode,
            color,
            state: Mutex::new(PrintState::default()),
        }
    }

    fn print_full(&self, entry: &ReportEntry) {
        let mut stderr = StandardStream::stderr(self.color);
        let tag = format!("[{}]", entry.severity.display_name());
        let _ = stderr.set_color(&severity_color(entry.severity));
        let _ = write!(stderr, "{:<width$}", tag, width = PADDING);
        let _ = stderr.reset();
        let _ = writeln!(stderr, "{}", entry.message);
        for position in &entry.positions {
            let _ = writeln!(stderr, "{:width$}{}", "", position, width = PADDING);
        }
    }

    fn print_plain(&self, message: &str) {
        let mut stderr = StandardStream::stderr(self.color);
        let _ = writeln!(stderr, "{}", message);
    }
}

fn severity_color(severity: Severity) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match severity {
        Severity::Warning => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Severity::Error | Severity::Fail => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        Severity::Normal => {
            spec.set_fg(Some(Color::Green));
        }
        _ => {
            spec.set_fg(Some(Color::Cyan));
        }
    }
    spec
}

impl MessageCollector for PrintingCollector {
    fn report_entry(&self, entry: ReportEntry) -> Severity {
        if entry.severity < self.min_severity || entry.severity == Severity::Ignore {
            return Severity::Ignore;
        }

        {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.max = state.max.max(Some(entry.severity));
            match entry.severity {
                Severity::Warning => state.warnings += 1,
                s if s.is_error() => state.errors += 1,
                _ => {}
            }
        }

        match self.mode {
            PrintMode::Full => self.print_full(&entry),
            PrintMode::Aggregate => match entry.severity {
                Severity::Normal => self.print_plain(&entry.message),
                s if s.is_error() => self.print_full(&entry),
                _ => {}
            },
        }
        entry.severity
    }

    fn max_severity(&self) -> Severity {
        self.state
            .lock()
            .map(|s| s.max)
            .unwrap_or_else(|poisoned| poisoned.into_inner().max)
            .unwrap_or(Severity::Ignore)
    }

    fn conclude(&self) {
        if self.mode != PrintMode::Aggregate {
            return;
        }
        let (warnings, errors) = match self.state.lock() {
            Ok(state) => (state.warnings, state.errors),
            Err(poisoned) => {
                let state = poisoned.into_inner();
                (state.warnings, state.errors)
            }
        };
        if let Some(summary) = summary_line(errors, warnings) {
            self.print_plain(&summary);
            self.print_plain("Rerun with --warn for more details");
        }
    }
}

fn summary_line(errors: usize, warnings: usize) -> Option<String> {
    let plural = |n: usize, word: &str| {
        if n == 1 {
            format!("{} {}", n, word)
        } else {
            format!("{} {}s", n, word)
        }
    };
    match (errors, warnings) {
        (0, 0) => None,
        (e, 0) => Some(format!("jjtx finished with {}", plural(e, "error"))),
        (0, w) => Some(format!("jjtx finished with {}", plural(w, "warning"))),
        (e, w) => Some(format!(
            "jjtx finished with {}, and {}",
            plural(e, "error"),
            plural(w, "warning")
        )),
    }
}

// ============================================================================
// RECORDING COLLECTOR
// ============================================================================

/// Keeps every surfaced entry in memory.
pub struct RecordingCollector {
    min_severity: Severity,
    entries: Mutex<Vec<ReportEntry>>,
}

impl RecordingCollector {
    pub fn new(min_severity: Severity) -> Self {
        Self {
            min_severity,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Records everything, including fine-grained entries.
    pub fn everything() -> Self {
        Self::new(Severity::Debug)
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn of_category(&self, category: super::MessageCategory) -> Vec<ReportEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }
}

impl MessageCollector for RecordingCollector {
    fn report_entry(&self, entry: ReportEntry) -> Severity {
        if entry.severity < self.min_severity || entry.severity == Severity::Ignore {
            return Severity::Ignore;
        }
        let severity = entry.severity;
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        severity
    }

    fn max_severity(&self) -> Severity {
        self.entries()
            .iter()
            .map(|e| e.severity)
            .max()
            .unwrap_or(Severity::Ignore)
    }
}

// ============================================================================
// NOOP COLLECTOR
// ============================================================================

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCollector;

impl MessageCollector for NoopCollector {
    fn report_entry(&self, entry: ReportEntry) -> Severity {
        entry.severity
    }

    fn max_severity(&self) -> Severity {
        Severity::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::MessageCategory;

    #[test]
    fn test_recording_filters_below_threshold() {
        let collector = RecordingCollector::new(Severity::Warning);
        let surfaced = collector.report(
            "not there",
            MessageCategory::ExactNodeNotInGrammar,
            None,
            Vec::new(),
        );
        assert_eq!(surfaced, Severity::Ignore);
        assert!(collector.entries().is_empty());
        assert_eq!(collector.max_severity(), Severity::Ignore);
    }

    #[test]
    fn test_recording_tracks_max_severity() {
        let collector = RecordingCollector::everything();
        collector.report("dup", MessageCategory::DuplicateMatch, None, Vec::new());
        collector.report(
            "escalated",
            MessageCategory::RegexShouldBeLeaf,
            Some(Severity::Error),
            Vec::new(),
        );
        assert_eq!(collector.entries().len(), 2);
        assert_eq!(collector.max_severity(), Severity::Error);
    }

    #[test]
    fn test_fail_severity_does_not_panic() {
        let collector = RecordingCollector::everything();
        let s = collector.report("boom", MessageCategory::FatalError, None, Vec::new());
        assert_eq!(s, Severity::Fail);
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line(0, 0), None);
        assert_eq!(
            summary_line(1, 2).as_deref(),
            Some("jjtx finished with 1 error, and 2 warnings")
        );
        assert_eq!(
            summary_line(0, 1).as_deref(),
            Some("jjtx finished with 1 warning")
        );
    }
}
