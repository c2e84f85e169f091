//! User-facing output of the CLI: hierarchy trees and grammar diffs.

use crate::hierarchy::{NodeId, TypeHierarchyTree};
use difference::{Changeset, Difference};
use std::io;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

// ============================================================================
// HIERARCHY
// ============================================================================

/// Renders a hierarchy as an indented list. Nodes no grammar construct
/// declares are marked with `(external)`.
pub fn render_tree(tree: &TypeHierarchyTree) -> String {
    let mut out = String::new();
    render_node(tree, tree.root(), 0, &mut out);
    out
}

fn render_node(tree: &TypeHierarchyTree, id: NodeId, depth: usize, out: &mut String) {
    let node = tree.node(id);
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.name);
    if node.external {
        out.push_str(" (external)");
    }
    out.push('\n');
    for &child in node.children() {
        render_node(tree, child, depth + 1, out);
    }
}

// ============================================================================
// CONFIGURATION DUMP
// ============================================================================

/// The merged configuration as printed by `help:dump-config`, headed by the
/// chain of files it was read from.
pub fn render_config_dump(yaml: &str, chain: &[PathBuf], grammar: &Path) -> String {
    let files: Vec<String> = chain
        .iter()
        .map(|p| p.display().to_string())
        .chain(std::iter::once(grammar.display().to_string()))
        .collect();
    format!(
        "# Fully resolved jjtx configuration\n# Config file chain: {}\n{}",
        files.join(" -> "),
        yaml
    )
}

// ============================================================================
// DIFFS
// ============================================================================

/// Prints a line diff between two texts to stdout with colors.
pub fn print_diff(before: &str, after: &str) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice());
    let changeset = Changeset::new(before, after, "\n");
    write_diff(&mut stdout, &changeset.diffs)
}

fn write_diff(out: &mut impl WriteColor, diffs: &[Difference]) -> io::Result<()> {
    for diff in diffs {
        let (marker, color, text) = match diff {
            Difference::Same(text) => (' ', None, text),
            Difference::Add(text) => ('+', Some(Color::Green), text),
            Difference::Rem(text) => ('-', Some(Color::Red), text),
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        for line in text.lines() {
            writeln!(out, "{}{}", marker, line)?;
        }
    }
    out.reset()
}

fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}
