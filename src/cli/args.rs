//! Command-line arguments and subcommands of `jjtx`.

use crate::reporting::{PrintMode, Severity};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "jjtx",
    version,
    about = "Weaves JJTree node scopes into JavaCC grammars and generates node classes."
)]
pub struct JjtxArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Option files, highest precedence first. Defaults to the
    /// `<grammar>.jjtopts.yaml` next to the grammar.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Vec<PathBuf>,

    /// Print every diagnostic instead of a summary of warnings.
    #[arg(long, global = true)]
    pub warn: bool,

    /// Lowest severity shown: debug, fine, warning, normal, error.
    #[arg(long, global = true, value_parser = parse_severity, default_value = "warning")]
    pub min_severity: Severity,
}

impl GlobalArgs {
    pub fn print_mode(&self) -> PrintMode {
        if self.warn {
            PrintMode::Full
        } else {
            PrintMode::Aggregate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompatPreset {
    /// jjtx behavior: tokens are set before hooks, `jjtThis` is usable in
    /// node conditions.
    #[default]
    Default,
    /// Reproduces the output of JJTree.
    Full,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Weave node scopes into a grammar and print or write the result.
    Weave {
        #[arg(required = true)]
        grammar: PathBuf,

        /// Write the woven grammar here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = CompatPreset::Default)]
        compat: CompatPreset,

        /// Show the difference between the input and the woven grammar.
        #[arg(long)]
        diff: bool,
    },
    /// Resolve and print the node type hierarchy.
    Hierarchy {
        #[arg(required = true)]
        grammar: PathBuf,
    },
    /// Run generation tasks.
    Gen {
        #[arg(required = true)]
        grammar: PathBuf,

        /// Tasks to run, e.g. `gen:*`, `gen:nodes`, `visitors`.
        #[arg(short, long, num_args = 1.., default_value = "gen:*")]
        tasks: Vec<String>,

        #[arg(short, long, default_value = "target/generated-sources/jjtx")]
        output: PathBuf,

        /// Source roots whose classes must not be generated.
        #[arg(long = "source-root")]
        source_roots: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = CompatPreset::Default)]
        compat: CompatPreset,

        /// Generate files one after the other.
        #[arg(long)]
        sequential: bool,

        /// Path of the parser generator executable.
        #[arg(long, default_value = "javacc")]
        javacc: PathBuf,
    },
}

fn parse_severity(name: &str) -> Result<Severity, String> {
    Severity::from_name(name).ok_or_else(|| format!("unknown severity '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_defaults() {
        let args = JjtxArgs::parse_from(["jjtx", "gen", "G.jjt"]);
        match args.command {
            Command::Gen { tasks, sequential, .. } => {
                assert_eq!(tasks, vec!["gen:*".to_string()]);
                assert!(!sequential);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.global.min_severity, Severity::Warning);
        assert_eq!(args.global.print_mode(), PrintMode::Aggregate);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = JjtxArgs::parse_from([
            "jjtx", "weave", "G.jjt", "--compat", "full", "-c", "a.yaml", "--min-severity", "debug",
        ]);
        assert_eq!(args.global.config, vec![PathBuf::from("a.yaml")]);
        assert_eq!(args.global.min_severity, Severity::Debug);
        assert!(matches!(
            args.command,
            Command::Weave {
                compat: CompatPreset::Full,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        assert!(JjtxArgs::try_parse_from(["jjtx", "--min-severity", "loud", "hierarchy", "G.jjt"]).is_err());
    }
}
