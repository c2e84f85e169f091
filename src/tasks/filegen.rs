//! Template-driven generation of one Java class, and the runner that
//! executes many of them.

use crate::errors::{io_error, unsourced, ErrorKind, JjtxError};
use crate::reporting::{MessageCategory, MessageCollector};
use crate::templates::{template_error, TemplateEngine, TemplateSource};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};

static QUALIFIED_JAVA_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").expect("static regex")
});

/// What file generation tasks share.
pub struct GenEnv<'a> {
    pub output_dir: &'a Path,
    /// Roots searched for hand-written classes that must not be generated.
    pub other_source_roots: &'a [PathBuf],
    /// Base of relative template files.
    pub template_dir: &'a Path,
    pub engine: &'a dyn TemplateEngine,
    pub collector: &'a dyn MessageCollector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenStatus {
    Generated,
    /// The class already exists in another source root.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOutcome {
    pub status: GenStatus,
    pub qualified_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileGenTask {
    /// Shown in messages, e.g. `node ASTExpr` or `visitor printer`.
    pub description: String,
    pub template: TemplateSource,
    /// Template of the qualified name of the class.
    pub gen_class_name: String,
    pub context: Value,
}

impl FileGenTask {
    pub fn execute(&self, env: &GenEnv<'_>) -> Result<GenOutcome, JjtxError> {
        let qualified_name = self.class_name(env.engine)?;
        let relative = java_file_path(&qualified_name);

        if let Some(root) = env
            .other_source_roots
            .iter()
            .find(|root| root.join(&relative).is_file())
        {
            env.collector.report(
                &format!(
                    "Class {} was not generated because it exists in {}",
                    qualified_name,
                    root.display()
                ),
                MessageCategory::ClassNotGenerated,
                None,
                Vec::new(),
            );
            return Ok(GenOutcome {
                status: GenStatus::Aborted,
                qualified_name,
                path: root.join(relative),
            });
        }

        let template_text = self.template.load(env.template_dir)?;
        let context = with_class_info(&self.context, &qualified_name);
        let body = env
            .engine
            .render(&template_text, &context)
            .map_err(|e| template_error(&self.template.describe(), e))?;

        let path = env.output_dir.join(&relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        std::fs::write(&path, body).map_err(|e| io_error(&path, &e))?;

        env.collector.report(
            &format!("Generated {} ({})", qualified_name, self.description),
            MessageCategory::ClassGenerated,
            None,
            Vec::new(),
        );
        Ok(GenOutcome {
            status: GenStatus::Generated,
            qualified_name,
            path,
        })
    }

    /// Renders and validates the qualified class name.
    fn class_name(&self, engine: &dyn TemplateEngine) -> Result<String, JjtxError> {
        let rendered = engine
            .render(&self.gen_class_name, &self.context)
            .map_err(|e| template_error(&self.gen_class_name, e))?;
        let name = clean_class_name(&rendered);
        if QUALIFIED_JAVA_NAME.is_match(&name) {
            Ok(name)
        } else {
            Err(unsourced(
                ErrorKind::Template {
                    template: self.gen_class_name.clone(),
                    message: format!("'{}' is not a qualified class name", name),
                },
                "template",
            ))
        }
    }
}

/// Removes whitespace, leading dots and empty segments, so that an empty
/// package renders to a default-package name.
pub fn clean_class_name(rendered: &str) -> String {
    let compact: String = rendered.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// `a.b.C` -> `a/b/C.java`
pub fn java_file_path(qualified_name: &str) -> PathBuf {
    let mut path: PathBuf = qualified_name.split('.').collect();
    path.set_extension("java");
    path
}

fn with_class_info(context: &Value, qualified_name: &str) -> Value {
    let (package, simple_name) = crate::grammar::options::split_qualified(qualified_name);
    let mut context = match context {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    context.insert("package".into(), Value::String(package.to_string()));
    context.insert("simpleName".into(), Value::String(simple_name.to_string()));
    context.insert("qualifiedName".into(), Value::String(qualified_name.to_string()));
    Value::Object(context)
}

// ============================================================================
// RUNNER
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub generated: usize,
    pub aborted: usize,
    pub failed: usize,
}

impl GenerationSummary {
    pub fn absorb(&mut self, other: GenerationSummary) {
        self.generated += other.generated;
        self.aborted += other.aborted;
        self.failed += other.failed;
    }
}

/// Runs every task; a failing task is reported and does not stop the
/// others. Reports are emitted in task order whatever the scheduling.
pub fn run_generation_tasks(
    tasks: &[FileGenTask],
    env: &GenEnv<'_>,
    parallel: bool,
) -> GenerationSummary {
    let results: Vec<Result<GenOutcome, JjtxError>> = if parallel {
        tasks.par_iter().map(|task| task.execute(env)).collect()
    } else {
        tasks.iter().map(|task| task.execute(env)).collect()
    };

    let mut summary = GenerationSummary::default();
    for (task, result) in tasks.iter().zip(results) {
        match result {
            Ok(outcome) => match outcome.status {
                GenStatus::Generated => summary.generated += 1,
                GenStatus::Aborted => summary.aborted += 1,
            },
            Err(error) => {
                summary.failed += 1;
                env.collector
                    .report_error(&format!("Could not generate {}", task.description), &error);
            }
        }
    }

    report_summary(&summary, env);
    summary
}

fn report_summary(summary: &GenerationSummary, env: &GenEnv<'_>) {
    let collector = env.collector;
    if summary.generated > 0 {
        collector.report_normal(&format!(
            "Generated {} classes in {}",
            summary.generated,
            env.output_dir.display()
        ));
    }
    if summary.aborted > 0 {
        collector.report_normal(&format!(
            "{} classes were not generated because found in other source roots",
            summary.aborted
        ));
    }
    if summary.failed > 0 {
        collector.report_normal(&format!(
            "{} classes were not generated because of an error",
            summary.failed
        ));
    }
}
