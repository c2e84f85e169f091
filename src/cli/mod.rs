//! The jjtx command-line interface.
//!
//! Every subcommand reads one grammar and the option file chain, then
//! reports through a [`PrintingCollector`]. The exit status is non-zero when
//! a hard error escapes or an error-level diagnostic was reported.

use crate::cli::args::{Command, CompatPreset, GlobalArgs, JjtxArgs};
use crate::config::{default_chain, load_chain, JjtxOptions};
use crate::errors::{io_error, print_error, JjtxError};
use crate::reporting::{MessageCollector, PrintingCollector};
use crate::tasks::{run_tasks, JavaccCommand, TaskContext, TaskKey};
use crate::weave::{weave, CompatOptions};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = JjtxArgs::parse();
    let collector = PrintingCollector::new(args.global.min_severity, args.global.print_mode());

    let result = match args.command {
        Command::Weave {
            grammar,
            output,
            compat,
            diff,
        } => handle_weave(&args.global, &grammar, output.as_deref(), compat, diff),
        Command::Hierarchy { grammar } => handle_hierarchy(&args.global, &grammar, &collector),
        Command::Gen {
            grammar,
            tasks,
            output,
            source_roots,
            compat,
            sequential,
            javacc,
        } => {
            let request = GenRequest {
                grammar,
                tasks,
                output,
                source_roots,
                compat,
                sequential,
                javacc,
            };
            handle_gen(&args.global, request, &collector)
        }
    };
    collector.conclude();

    match result {
        Err(error) => {
            print_error(error);
            process::exit(1);
        }
        Ok(()) if collector.max_severity().is_error() => process::exit(1),
        Ok(()) => {}
    }
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn handle_weave(
    global: &GlobalArgs,
    grammar: &Path,
    output: Option<&Path>,
    compat: CompatPreset,
    diff: bool,
) -> Result<(), JjtxError> {
    let ctx = load_context(global, grammar, compat_base(compat), Path::new("."))?;
    let woven = weave(&ctx.grammar, &ctx.grammar_options, &ctx.compat);

    if diff {
        output::print_diff(&ctx.source_text, &woven).map_err(|e| io_error(Path::new("<stdout>"), &e))?;
    }
    match output {
        Some(path) => std::fs::write(path, &woven).map_err(|e| io_error(path, &e)),
        None if diff => Ok(()),
        None => {
            print!("{}", woven);
            Ok(())
        }
    }
}

fn handle_hierarchy(
    global: &GlobalArgs,
    grammar: &Path,
    collector: &dyn MessageCollector,
) -> Result<(), JjtxError> {
    let ctx = load_context(global, grammar, CompatOptions::default(), Path::new("."))?;
    let tree = ctx.resolve_hierarchy(collector);
    print!("{}", output::render_tree(&tree));
    Ok(())
}

struct GenRequest {
    grammar: PathBuf,
    tasks: Vec<String>,
    output: PathBuf,
    source_roots: Vec<PathBuf>,
    compat: CompatPreset,
    sequential: bool,
    javacc: PathBuf,
}

fn handle_gen(
    global: &GlobalArgs,
    request: GenRequest,
    collector: &dyn MessageCollector,
) -> Result<(), JjtxError> {
    let keys = TaskKey::plan(&request.tasks)?;
    let mut ctx = load_context(global, &request.grammar, compat_base(request.compat), &request.output)?;
    ctx.other_source_roots = request.source_roots;
    ctx.parallel = !request.sequential;
    ctx.compiler = Arc::new(JavaccCommand {
        program: request.javacc,
    });

    let summary = run_tasks(&keys, &ctx, collector);
    if let Some(yaml) = &summary.config_dump {
        let chain = config_chain(global, &request.grammar);
        print!("{}", output::render_config_dump(yaml, &chain, &request.grammar));
    }
    if !summary.failed_tasks.is_empty() {
        let failed: Vec<String> = summary.failed_tasks.iter().map(|k| k.to_string()).collect();
        collector.report_normal(&format!("Failed tasks: {}", failed.join(", ")));
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn compat_base(preset: CompatPreset) -> CompatOptions {
    match preset {
        CompatPreset::Default => CompatOptions::default(),
        CompatPreset::Full => CompatOptions::full_jjtree(),
    }
}

/// Option files given on the command line, or the one next to the grammar.
fn config_chain(global: &GlobalArgs, grammar: &Path) -> Vec<PathBuf> {
    if global.config.is_empty() {
        default_chain(grammar)
    } else {
        global.config.clone()
    }
}

fn load_options(global: &GlobalArgs, grammar: &Path) -> Result<JjtxOptions, JjtxError> {
    load_chain(&config_chain(global, grammar))
}

fn load_context(
    global: &GlobalArgs,
    grammar: &Path,
    compat: CompatOptions,
    output_dir: &Path,
) -> Result<TaskContext, JjtxError> {
    let options = load_options(global, grammar)?;
    TaskContext::load(grammar, options, compat, output_dir)
}
