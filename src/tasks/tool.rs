//! Invocation of the external parser generator.
//!
//! The generator is not safe to run concurrently in one process, so every
//! invocation goes through a [`ToolGuard`]. Each run writes into a fresh
//! temporary directory; the produced sources are then copied into the output
//! directory.

use crate::errors::{io_error, unsourced, ErrorKind, JjtxError};
use crate::reporting::{MessageCategory, MessageCollector};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

/// Single-slot lock around external tool runs.
#[derive(Debug)]
pub struct ToolGuard {
    lock: Option<Mutex<()>>,
}

impl ToolGuard {
    pub fn exclusive() -> Self {
        Self {
            lock: Some(Mutex::new(())),
        }
    }

    /// Does not serialize anything.
    pub fn unguarded() -> Self {
        Self { lock: None }
    }

    /// Runs `f` while holding the guard.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        let _held: Option<MutexGuard<'_, ()>> = self.lock.as_ref().map(|lock| match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        });
        f()
    }
}

impl Default for ToolGuard {
    fn default() -> Self {
        Self::exclusive()
    }
}

/// Something that turns a woven grammar into Java sources.
pub trait ExternalCompiler: Send + Sync {
    fn name(&self) -> &str;

    fn compile(&self, grammar: &Path, out_dir: &Path) -> Result<(), JjtxError>;
}

/// Runs the `javacc` executable.
#[derive(Debug, Clone)]
pub struct JavaccCommand {
    pub program: PathBuf,
}

impl Default for JavaccCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("javacc"),
        }
    }
}

impl ExternalCompiler for JavaccCommand {
    fn name(&self) -> &str {
        "javacc"
    }

    fn compile(&self, grammar: &Path, out_dir: &Path) -> Result<(), JjtxError> {
        let output = Command::new(&self.program)
            .arg(format!("-OUTPUT_DIRECTORY={}", out_dir.display()))
            .arg(grammar)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                unsourced(
                    ErrorKind::ToolInvocation {
                        tool: self.program.display().to_string(),
                        message: e.to_string(),
                    },
                    "javacc",
                )
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let error = unsourced(
            ErrorKind::ToolExit {
                tool: self.program.display().to_string(),
                code: output.status.code(),
            },
            "javacc",
        );
        let details = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Err(if details.is_empty() {
            error
        } else {
            error.with_help(details)
        })
    }
}

/// Where the compiler output ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    pub copied: Vec<PathBuf>,
    /// Relative paths skipped because they exist in another source root.
    pub shadowed: Vec<PathBuf>,
    /// Relative paths skipped because the output already has them.
    pub kept: Vec<PathBuf>,
}

/// Compiles `grammar` under the guard, then copies the produced `.java`
/// files into `output_dir`.
pub fn run_compiler(
    compiler: &dyn ExternalCompiler,
    guard: &ToolGuard,
    grammar: &Path,
    output_dir: &Path,
    other_source_roots: &[PathBuf],
    collector: &dyn MessageCollector,
) -> Result<CompileOutcome, JjtxError> {
    let scratch = tempfile::tempdir().map_err(|e| io_error(&std::env::temp_dir(), &e))?;
    guard.with(|| compiler.compile(grammar, scratch.path()))?;

    let mut outcome = CompileOutcome::default();
    for entry in WalkDir::new(scratch.path()).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(scratch.path()).to_path_buf();
            io_error(&path, &std::io::Error::from(e))
        })?;
        let source = entry.path();
        if !entry.file_type().is_file() || source.extension().map_or(true, |ext| ext != "java") {
            continue;
        }
        let Ok(relative) = source.strip_prefix(scratch.path()) else {
            continue;
        };

        if let Some(root) = other_source_roots.iter().find(|r| r.join(relative).is_file()) {
            collector.report(
                &format!(
                    "{} was not copied because it exists in {}",
                    relative.display(),
                    root.display()
                ),
                MessageCategory::ClassNotGenerated,
                None,
                Vec::new(),
            );
            outcome.shadowed.push(relative.to_path_buf());
            continue;
        }

        let target = output_dir.join(relative);
        if target.exists() {
            collector.report_debug(&format!("{} already exists, not overwritten", target.display()));
            outcome.kept.push(relative.to_path_buf());
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        std::fs::copy(source, &target).map_err(|e| io_error(&target, &e))?;
        outcome.copied.push(relative.to_path_buf());
    }

    collector.report_normal(&format!(
        "{} produced {} files in {}",
        compiler.name(),
        outcome.copied.len(),
        output_dir.display()
    ));
    Ok(outcome)
}
