//! Generation tasks
//!
//! A run executes a planned list of [`TaskKey`]s against one grammar. Tasks
//! share a read-only [`TaskContext`]; a failing task is reported to the
//! collector and the following tasks still run.

use crate::config::{FileGenBean, JjtxOptions};
use crate::errors::{io_error, JjtxError, SourceContext};
use crate::grammar::{parse_grammar, GrammarFile, GrammarOptions};
use crate::hierarchy::{hierarchy_path, GrammarNodes, TypeHierarchyTree};
use crate::reporting::{MessageCategory, MessageCollector};
use crate::templates::{grammar_bean, GrammarBean, PlaceholderEngine, TemplateEngine, TemplateSource};
use crate::weave::{weave, CompatOptions};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod filegen;
pub mod key;
pub mod tool;

pub use filegen::{run_generation_tasks, FileGenTask, GenEnv, GenOutcome, GenStatus, GenerationSummary};
pub use key::{TaskKey, TaskKeyError};
pub use tool::{run_compiler, CompileOutcome, ExternalCompiler, JavaccCommand, ToolGuard};

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything the tasks of one run share.
pub struct TaskContext {
    pub grammar: Arc<GrammarFile>,
    pub grammar_path: PathBuf,
    /// Text the grammar was read from.
    pub source_text: String,
    pub options: JjtxOptions,
    pub grammar_options: GrammarOptions,
    pub compat: CompatOptions,
    pub output_dir: PathBuf,
    pub other_source_roots: Vec<PathBuf>,
    pub engine: Arc<dyn TemplateEngine>,
    pub compiler: Arc<dyn ExternalCompiler>,
    pub guard: Arc<ToolGuard>,
    /// Run file generation on the rayon pool.
    pub parallel: bool,
}

impl TaskContext {
    /// Reads the grammar and resolves the options. Engine, compiler and
    /// guard get their defaults and can be replaced afterwards.
    pub fn load(
        grammar_path: &Path,
        options: JjtxOptions,
        compat_base: CompatOptions,
        output_dir: &Path,
    ) -> Result<Self, JjtxError> {
        let source_text =
            std::fs::read_to_string(grammar_path).map_err(|e| io_error(grammar_path, &e))?;
        let name = grammar_path.display().to_string();
        let grammar = parse_grammar(&source_text, SourceContext::from_file(name.clone(), source_text.clone()))?;
        let grammar_options = options.grammar_options(&grammar);
        let compat = options.compat_options(compat_base, &name)?;

        Ok(Self {
            grammar: Arc::new(grammar),
            grammar_path: grammar_path.to_path_buf(),
            source_text,
            options,
            grammar_options,
            compat,
            output_dir: output_dir.to_path_buf(),
            other_source_roots: Vec::new(),
            engine: Arc::new(PlaceholderEngine),
            compiler: Arc::new(JavaccCommand::default()),
            guard: Arc::new(ToolGuard::exclusive()),
            parallel: true,
        })
    }

    /// The grammar name: the file name without extension.
    pub fn grammar_name(&self) -> String {
        self.grammar_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Grammar")
            .to_string()
    }

    /// Directory relative template files are resolved against.
    pub fn template_dir(&self) -> &Path {
        self.grammar_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn grammar_nodes(&self) -> GrammarNodes {
        GrammarNodes::from_grammar(&self.grammar, &self.grammar_options, &self.source_text)
    }

    /// Parses and resolves the configured hierarchy.
    pub fn resolve_hierarchy(&self, collector: &dyn MessageCollector) -> TypeHierarchyTree {
        TypeHierarchyTree::from_data(self.options.type_hierarchy.as_ref(), &hierarchy_path(), collector)
            .process(&self.grammar_nodes(), collector)
    }

    /// Where `gen:javacc` writes the woven grammar.
    pub fn woven_grammar_path(&self) -> PathBuf {
        let package_dir: PathBuf = self
            .grammar_options
            .parser_package
            .split('.')
            .filter(|s| !s.is_empty())
            .collect();
        self.output_dir
            .join(package_dir)
            .join(format!("{}.jj", self.grammar_name()))
    }

    fn gen_env<'a>(&'a self, collector: &'a dyn MessageCollector) -> GenEnv<'a> {
        GenEnv {
            output_dir: &self.output_dir,
            other_source_roots: &self.other_source_roots,
            template_dir: self.template_dir(),
            engine: self.engine.as_ref(),
            collector,
        }
    }
}

// ============================================================================
// RUNNING
// ============================================================================

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: GenerationSummary,
    /// Tasks that stopped on a hard error.
    pub failed_tasks: Vec<TaskKey>,
    /// Merged configuration, when `help:dump-config` ran.
    pub config_dump: Option<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed_tasks.is_empty() && self.files.failed == 0
    }
}

/// Runs the given tasks, in order. `keys` should come from
/// [`TaskKey::plan`].
pub fn run_tasks(keys: &[TaskKey], ctx: &TaskContext, collector: &dyn MessageCollector) -> RunSummary {
    let mut summary = RunSummary::default();
    // resolved lazily, at most once per run
    let mut grammar_bean: Option<GrammarBean> = None;

    for &key in keys {
        if key.dependencies().iter().any(|dep| summary.failed_tasks.contains(dep)) {
            collector.report_non_fatal(
                &format!("Task {} skipped because a task it depends on failed", key),
                None,
            );
            summary.failed_tasks.push(key);
            continue;
        }

        collector.report_debug(&format!("Running task {}", key));
        let result = match key {
            TaskKey::DumpConfig => ctx.options.to_yaml().map(|yaml| {
                summary.config_dump = Some(yaml);
            }),
            TaskKey::GenJavacc => gen_javacc(ctx, collector),
            TaskKey::GenSupport => {
                let bean = grammar_bean.get_or_insert_with(|| resolve_bean(ctx, collector));
                gen_support(ctx, bean, collector).map(|files| summary.files.absorb(files))
            }
            TaskKey::GenNodes => {
                let bean = grammar_bean.get_or_insert_with(|| resolve_bean(ctx, collector));
                summary.files.absorb(gen_nodes(ctx, bean, collector));
                Ok(())
            }
            TaskKey::GenVisitors => {
                let bean = grammar_bean.get_or_insert_with(|| resolve_bean(ctx, collector));
                summary.files.absorb(gen_visitors(ctx, bean, collector));
                Ok(())
            }
            TaskKey::GenParser => gen_parser(ctx, collector),
        };

        if let Err(error) = result {
            collector.report_error(&format!("Task {} failed", key), &error);
            summary.failed_tasks.push(key);
        }
    }
    summary
}

fn resolve_bean(ctx: &TaskContext, collector: &dyn MessageCollector) -> GrammarBean {
    let tree = ctx.resolve_hierarchy(collector);
    grammar_bean(&ctx.grammar_name(), &ctx.grammar_options, &tree, &ctx.grammar_nodes())
}

// ============================================================================
// TASKS
// ============================================================================

fn gen_javacc(ctx: &TaskContext, collector: &dyn MessageCollector) -> Result<(), JjtxError> {
    let text = weave(&ctx.grammar, &ctx.grammar_options, &ctx.compat);
    let path = ctx.woven_grammar_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
    }
    std::fs::write(&path, text).map_err(|e| io_error(&path, &e))?;
    collector.report_normal(&format!("Woven grammar written to {}", path.display()));
    Ok(())
}

fn gen_nodes(ctx: &TaskContext, bean: &GrammarBean, collector: &dyn MessageCollector) -> GenerationSummary {
    let templates = ctx
        .options
        .node_gen
        .as_ref()
        .map(|gen| gen.templates.as_slice())
        .unwrap_or_default();
    if templates.is_empty() {
        collector.report_debug("No node templates configured");
        return GenerationSummary::default();
    }

    let grammar = bean_value(bean);
    let global = ctx.options.template_context_json();
    let mut tasks = Vec::new();
    for (index, spec) in templates.iter().enumerate() {
        let Some(template) = TemplateSource::from_fields(spec.template.as_deref(), spec.template_file.as_deref())
        else {
            collector.report(
                &format!("Node template #{} has no template", index),
                MessageCategory::IncompleteVisitorSpec,
                None,
                Vec::new(),
            );
            continue;
        };
        let gen_class_name = spec
            .gen_class_name
            .clone()
            .unwrap_or_else(|| "{{node.class.qualifiedName}}".to_string());

        for node in &bean.type_hierarchy {
            tasks.push(FileGenTask {
                description: format!("node {}", node.class.qualified_name),
                template: template.clone(),
                gen_class_name: gen_class_name.clone(),
                context: json!({
                    "grammar": grammar,
                    "global": global,
                    "node": node,
                    "context": local_context(spec),
                }),
            });
        }
    }
    run_generation_tasks(&tasks, &ctx.gen_env(collector), ctx.parallel)
}

fn gen_visitors(ctx: &TaskContext, bean: &GrammarBean, collector: &dyn MessageCollector) -> GenerationSummary {
    let mut specs = Vec::new();
    for (id, spec) in &ctx.options.visitors {
        if spec.is_executable() {
            specs.push((id.as_str(), spec));
        } else {
            collector.report_debug(&format!("Visitor {} is disabled", id));
        }
    }
    let tasks = file_gen_tasks("visitor", &specs, ctx, bean, collector);
    if tasks.is_empty() {
        return GenerationSummary::default();
    }
    run_generation_tasks(&tasks, &ctx.gen_env(collector), ctx.parallel)
}

/// Generates the classes the woven parser refers to: its tree state and
/// the node constants, unless configured otherwise.
fn gen_support(
    ctx: &TaskContext,
    bean: &GrammarBean,
    collector: &dyn MessageCollector,
) -> Result<GenerationSummary, JjtxError> {
    let files = ctx.options.support_files(&ctx.grammar_path.display().to_string())?;
    let specs: Vec<(&str, &FileGenBean)> = files.iter().map(|(id, spec)| (id.as_str(), spec)).collect();
    let tasks = file_gen_tasks("support file", &specs, ctx, bean, collector);
    Ok(run_generation_tasks(&tasks, &ctx.gen_env(collector), ctx.parallel))
}

/// One task per complete spec; incomplete ones are reported and skipped.
fn file_gen_tasks(
    kind: &str,
    specs: &[(&str, &FileGenBean)],
    ctx: &TaskContext,
    bean: &GrammarBean,
    collector: &dyn MessageCollector,
) -> Vec<FileGenTask> {
    let grammar = bean_value(bean);
    let global = ctx.options.template_context_json();
    let mut tasks = Vec::new();

    for &(id, spec) in specs {
        let template = TemplateSource::from_fields(spec.template.as_deref(), spec.template_file.as_deref());
        let (Some(template), Some(gen_class_name)) = (template, spec.gen_class_name.clone()) else {
            collector.report(
                &format!("{} {} needs a template and a genClassName, it is skipped", capitalize(kind), id),
                MessageCategory::IncompleteVisitorSpec,
                None,
                Vec::new(),
            );
            continue;
        };
        tasks.push(FileGenTask {
            description: format!("{} {}", kind, id),
            template,
            gen_class_name,
            context: json!({
                "grammar": grammar,
                "global": global,
                "id": id,
                "context": local_context(spec),
            }),
        });
    }
    tasks
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn gen_parser(ctx: &TaskContext, collector: &dyn MessageCollector) -> Result<(), JjtxError> {
    let grammar = ctx.woven_grammar_path();
    run_compiler(
        ctx.compiler.as_ref(),
        &ctx.guard,
        &grammar,
        &ctx.output_dir,
        &ctx.other_source_roots,
        collector,
    )?;
    Ok(())
}

fn bean_value(bean: &GrammarBean) -> Value {
    serde_json::to_value(bean).unwrap_or(Value::Null)
}

fn local_context(spec: &FileGenBean) -> Value {
    spec.context
        .as_ref()
        .and_then(|map| serde_json::to_value(map).ok())
        .unwrap_or_else(|| json!({}))
}
