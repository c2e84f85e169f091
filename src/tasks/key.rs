//! Task names as given on the command line.

use crate::errors::{unsourced, ErrorKind, JjtxError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKey {
    DumpConfig,
    GenJavacc,
    /// Classes the woven grammar needs besides the nodes.
    GenSupport,
    GenNodes,
    GenVisitors,
    GenParser,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskKeyError {
    #[error("task group '{0}' is not known, available tasks: {1}")]
    UnknownGroup(String, String),
    #[error("task '{0}' is not known, available tasks: {1}")]
    UnknownTask(String, String),
}

impl From<TaskKeyError> for JjtxError {
    fn from(error: TaskKeyError) -> Self {
        let name = match &error {
            TaskKeyError::UnknownGroup(name, _) | TaskKeyError::UnknownTask(name, _) => name.clone(),
        };
        unsourced(ErrorKind::UnknownTask { name }, "tasks").with_help(error.to_string())
    }
}

impl TaskKey {
    pub const ALL: [TaskKey; 6] = [
        TaskKey::DumpConfig,
        TaskKey::GenJavacc,
        TaskKey::GenSupport,
        TaskKey::GenNodes,
        TaskKey::GenVisitors,
        TaskKey::GenParser,
    ];

    pub fn reference(self) -> &'static str {
        match self {
            TaskKey::DumpConfig => "help:dump-config",
            TaskKey::GenJavacc => "gen:javacc",
            TaskKey::GenSupport => "gen:javacc-support",
            TaskKey::GenNodes => "gen:nodes",
            TaskKey::GenVisitors => "gen:visitors",
            TaskKey::GenParser => "gen:parser",
        }
    }

    pub fn namespace(self) -> &'static str {
        self.split().0
    }

    pub fn local_name(self) -> &'static str {
        self.split().1
    }

    fn split(self) -> (&'static str, &'static str) {
        let reference = self.reference();
        reference.split_once(':').unwrap_or(("", reference))
    }

    /// Tasks that must have run before this one.
    pub fn dependencies(self) -> &'static [TaskKey] {
        match self {
            TaskKey::GenParser => &[TaskKey::GenJavacc],
            _ => &[],
        }
    }

    /// Parses `ns:name`, `ns:*` or a bare local name.
    pub fn parse(input: &str) -> Result<Vec<TaskKey>, TaskKeyError> {
        let input = input.trim();
        if let Some(key) = Self::ALL.iter().find(|k| k.reference() == input) {
            return Ok(vec![*key]);
        }

        match input.split_once(':') {
            Some((ns, "*")) if !ns.is_empty() => {
                let keys: Vec<TaskKey> = Self::ALL
                    .iter()
                    .copied()
                    .filter(|k| k.namespace() == ns)
                    .collect();
                if keys.is_empty() {
                    Err(TaskKeyError::UnknownGroup(ns.to_string(), available()))
                } else {
                    Ok(keys)
                }
            }
            None => Self::ALL
                .iter()
                .find(|k| k.local_name() == input)
                .map(|k| vec![*k])
                .ok_or_else(|| TaskKeyError::UnknownTask(input.to_string(), available())),
            Some(_) => Err(TaskKeyError::UnknownTask(input.to_string(), available())),
        }
    }

    /// Parses several task names, adds the dependencies, removes
    /// duplicates, and orders the result for execution.
    pub fn plan<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<TaskKey>, TaskKeyError> {
        let mut keys = Vec::new();
        for input in inputs {
            for key in Self::parse(input.as_ref())? {
                keys.extend_from_slice(key.dependencies());
                keys.push(key);
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

fn available() -> String {
    TaskKey::ALL
        .iter()
        .map(|k| k.reference())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference())
    }
}

impl FromStr for TaskKey {
    type Err = TaskKeyError;

    /// Parses exactly one task; wildcards are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s)?.as_slice() {
            [key] => Ok(*key),
            _ => Err(TaskKeyError::UnknownTask(s.to_string(), available())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(TaskKey::parse("gen:nodes").unwrap(), vec![TaskKey::GenNodes]);
        assert_eq!(TaskKey::parse("visitors").unwrap(), vec![TaskKey::GenVisitors]);
        assert_eq!(
            TaskKey::parse("gen:*").unwrap(),
            vec![
                TaskKey::GenJavacc,
                TaskKey::GenSupport,
                TaskKey::GenNodes,
                TaskKey::GenVisitors,
                TaskKey::GenParser
            ]
        );
        assert_eq!(TaskKey::parse("help:*").unwrap(), vec![TaskKey::DumpConfig]);
        assert_eq!(TaskKey::parse("javacc-support").unwrap(), vec![TaskKey::GenSupport]);
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            TaskKey::parse("foo:*"),
            Err(TaskKeyError::UnknownGroup(..))
        ));
        assert!(matches!(
            TaskKey::parse("gen:bar"),
            Err(TaskKeyError::UnknownTask(..))
        ));
        let err: JjtxError = TaskKey::parse("bar").unwrap_err().into();
        assert_eq!(err.to_string(), "Configuration error: unknown task 'bar'");
    }

    #[test]
    fn test_plan_adds_dependencies_in_order() {
        assert_eq!(
            TaskKey::plan(&["parser", "gen:nodes"]).unwrap(),
            vec![TaskKey::GenJavacc, TaskKey::GenNodes, TaskKey::GenParser]
        );
        assert_eq!(
            TaskKey::plan(&["gen:javacc", "javacc"]).unwrap(),
            vec![TaskKey::GenJavacc]
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("gen:parser".parse::<TaskKey>().unwrap(), TaskKey::GenParser);
        assert!("gen:*".parse::<TaskKey>().is_err());
    }
}
