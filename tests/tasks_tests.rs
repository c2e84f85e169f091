// tests/tasks_tests.rs

mod common;

use jjtx::config::parse_options;
use jjtx::reporting::{MessageCategory, RecordingCollector};
use jjtx::tasks::{
    run_compiler, run_tasks, ExternalCompiler, TaskContext, TaskKey, ToolGuard,
};
use jjtx::weave::CompatOptions;
use jjtx::JjtxError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Writes one parser class and records how many runs overlap.
#[derive(Default)]
struct CountingCompiler {
    running: AtomicUsize,
    max_running: AtomicUsize,
    runs: AtomicUsize,
}

impl ExternalCompiler for CountingCompiler {
    fn name(&self) -> &str {
        "counting"
    }

    fn compile(&self, _grammar: &Path, out_dir: &Path) -> Result<(), JjtxError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        std::fs::create_dir_all(out_dir.join("com/calc")).unwrap();
        std::fs::write(out_dir.join("com/calc/Calc.java"), "class Calc {}").unwrap();
        std::fs::write(out_dir.join("com/calc/Token.java"), "class Token {}").unwrap();
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn context(dir: &Path, options: &str) -> TaskContext {
    let grammar = dir.join("Calc.jjt");
    std::fs::write(&grammar, common::CALC).unwrap();
    let options = parse_options(options, "Calc.jjtopts.yaml").unwrap();
    TaskContext::load(&grammar, options, CompatOptions::default(), &dir.join("out")).unwrap()
}

#[test]
fn test_plan_orders_and_completes_tasks() {
    let keys = TaskKey::plan(&["parser", "gen:nodes", "nodes"]).unwrap();
    assert_eq!(
        keys,
        vec![TaskKey::GenJavacc, TaskKey::GenNodes, TaskKey::GenParser]
    );
    assert_eq!(TaskKey::plan(&["gen:*"]).unwrap().len(), 5);

    let err = TaskKey::plan(&["gen:nope"]).unwrap_err();
    assert!(err.to_string().contains("gen:nope"));
}

#[test]
fn test_hand_written_classes_are_not_generated() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(
        dir.path(),
        "jjtx:\n  nodeGen:\n    templates:\n      - template: 'class {{simpleName}} {}'\n",
    );
    let hand_written = dir.path().join("src");
    common::write_files(&hand_written, &[("com/calc/ASTAtom.java", "// mine")]);
    ctx.other_source_roots = vec![hand_written.clone()];

    let collector = RecordingCollector::everything();
    let summary = run_tasks(&[TaskKey::GenNodes], &ctx, &collector);

    // root plus Sum, Add, Mul, Atom
    assert_eq!(summary.files.generated, 4);
    assert_eq!(summary.files.aborted, 1);
    assert!(!dir.path().join("out/com/calc/ASTAtom.java").exists());
    assert!(dir.path().join("out/com/calc/ASTNode.java").is_file());
    let not_generated = collector.of_category(MessageCategory::ClassNotGenerated);
    assert_eq!(not_generated.len(), 1);
    assert!(not_generated[0].message.contains("com.calc.ASTAtom"));
}

#[test]
fn test_failing_templates_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(
        dir.path(),
        "jjtx:\n  visitors:\n    good: {template: 'ok', genClassName: 'com.calc.Good'}\n    bad: {template: '{{missing}}', genClassName: 'com.calc.Bad'}\n    file: {templateFile: 'nowhere.tpl', genClassName: 'com.calc.File'}\n",
    );
    let collector = RecordingCollector::everything();
    let summary = run_tasks(&[TaskKey::GenVisitors], &ctx, &collector);

    assert_eq!(summary.files.generated, 1);
    assert_eq!(summary.files.failed, 2);
    assert!(summary.failed_tasks.is_empty());
    assert!(!summary.is_success());
    assert!(dir.path().join("out/com/calc/Good.java").is_file());
}

#[test]
fn test_template_files_are_relative_to_the_grammar() {
    let dir = tempfile::tempdir().unwrap();
    common::write_files(
        dir.path(),
        &[("templates/Visitor.tpl", "package {{package}};\nclass {{simpleName}} { /* {{context.flavor}} */ }\n")],
    );
    let ctx = context(
        dir.path(),
        "jjtx:\n  visitors:\n    v:\n      templateFile: templates/Visitor.tpl\n      genClassName: '{{grammar.parser.package}} . {{grammar.name}}Visitor'\n      context: {flavor: plain}\n",
    );
    let summary = run_tasks(&[TaskKey::GenVisitors], &ctx, &RecordingCollector::everything());

    assert_eq!(summary.files.generated, 1);
    let text = std::fs::read_to_string(dir.path().join("out/com/calc/CalcVisitor.java")).unwrap();
    assert_eq!(text, "package com.calc;\nclass CalcVisitor { /* plain */ }\n");
}

#[test]
fn test_guarded_compiler_runs_one_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = dir.path().join("Calc.jj");
    std::fs::write(&grammar, "").unwrap();
    let compiler = Arc::new(CountingCompiler::default());
    let guard = Arc::new(ToolGuard::exclusive());

    std::thread::scope(|scope| {
        for i in 0..4 {
            let compiler = Arc::clone(&compiler);
            let guard = Arc::clone(&guard);
            let grammar = grammar.clone();
            let out = dir.path().join(format!("out{}", i));
            scope.spawn(move || {
                let collector = RecordingCollector::everything();
                run_compiler(compiler.as_ref(), &guard, &grammar, &out, &[], &collector).unwrap()
            });
        }
    });

    assert_eq!(compiler.runs.load(Ordering::SeqCst), 4);
    assert_eq!(compiler.max_running.load(Ordering::SeqCst), 1);
    for i in 0..4 {
        assert!(dir.path().join(format!("out{}/com/calc/Token.java", i)).is_file());
    }
}

#[test]
fn test_compiler_output_respects_other_roots() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = dir.path().join("Calc.jj");
    std::fs::write(&grammar, "").unwrap();
    let hand_written = dir.path().join("src");
    common::write_files(&hand_written, &[("com/calc/Token.java", "// mine")]);

    let collector = RecordingCollector::everything();
    let outcome = run_compiler(
        &CountingCompiler::default(),
        &ToolGuard::unguarded(),
        &grammar,
        &dir.path().join("out"),
        &[hand_written],
        &collector,
    )
    .unwrap();

    assert_eq!(outcome.copied.len(), 1);
    assert_eq!(outcome.shadowed.len(), 1);
    assert!(!dir.path().join("out/com/calc/Token.java").exists());
    assert_eq!(collector.of_category(MessageCategory::ClassNotGenerated).len(), 1);
}

#[test]
fn test_full_run_through_parser() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(
        dir.path(),
        "jjtx:\n  nodeGen:\n    templates:\n      - template: 'class {{simpleName}} {}'\n",
    );
    ctx.compiler = Arc::new(CountingCompiler::default());

    let collector = RecordingCollector::everything();
    let keys = TaskKey::plan(&["gen:*"]).unwrap();
    let summary = run_tasks(&keys, &ctx, &collector);

    assert!(summary.is_success(), "{:?}", collector.entries());
    let out = dir.path().join("out/com/calc");
    for file in [
        "Calc.jj",
        "Calc.java",
        "Token.java",
        "ASTNode.java",
        "ASTSum.java",
        "JJTCalcState.java",
        "CalcTreeConstants.java",
    ] {
        assert!(out.join(file).is_file(), "missing {}", file);
    }
}

#[test]
fn test_support_classes_match_the_woven_grammar() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), "");
    let collector = RecordingCollector::everything();
    let summary = run_tasks(&TaskKey::plan(&["javacc-support"]).unwrap(), &ctx, &collector);

    assert!(summary.is_success(), "{:?}", collector.entries());
    let out = dir.path().join("out/com/calc");
    let state = std::fs::read_to_string(out.join("JJTCalcState.java")).unwrap();
    assert!(state.starts_with("package com.calc;"));
    assert!(state.contains("public class JJTCalcState {"));
    assert!(state.contains("com.calc.ASTNode"));

    let constants = std::fs::read_to_string(out.join("CalcTreeConstants.java")).unwrap();
    assert!(constants.contains("public interface CalcTreeConstants {"));
    assert!(constants.contains("int JJTSUM = 0;"));
    assert!(constants.contains("int JJTADD = 1;"));
    assert!(constants.contains("    \"Atom\",\n"));
}

#[test]
fn test_support_templates_can_be_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(
        dir.path(),
        "jjtx:\n  javaccGen:\n    supportFiles:\n      parserState: {template: 'class {{simpleName}} {}'}\n",
    );
    let summary = run_tasks(&[TaskKey::GenSupport], &ctx, &RecordingCollector::everything());

    assert_eq!(summary.files.generated, 2);
    let state = std::fs::read_to_string(dir.path().join("out/com/calc/JJTCalcState.java")).unwrap();
    assert_eq!(state, "class JJTCalcState {}");
}
