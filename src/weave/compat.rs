//! Compatibility switches for the generated grammar.

use serde::{Deserialize, Serialize};

/// Behaviors where jjtx deliberately deviates from JJTree, each of which can
/// be turned back to the JJTree behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompatOptions {
    /// In `(Foo() { a } { b }) #Node`, JJTree closes the node between `a`
    /// and `b`. When set, the node of a nested scope is closed after `b`
    /// instead. Production scopes always close before their final action so
    /// that it can return `jjtThis`.
    pub dont_close_before_last_parser_action: bool,
    /// Makes `jjtThis` usable inside the closing condition of its own scope.
    pub fix_jjt_this_condition_scope: bool,
    /// Sets the first/last tokens before calling the open/close hooks, so
    /// that hooks can see them.
    pub set_tokens_before_hooks: bool,
    /// Names node variables after their node instead of `jjtn000`.
    pub descriptive_variable_names: bool,
    /// Makes the parser implement `<Parser>TreeConstants` instead of
    /// importing the constants statically.
    pub implement_node_constants: bool,
}

impl Default for CompatOptions {
    fn default() -> Self {
        Self {
            dont_close_before_last_parser_action: false,
            fix_jjt_this_condition_scope: true,
            set_tokens_before_hooks: true,
            descriptive_variable_names: false,
            implement_node_constants: false,
        }
    }
}

impl CompatOptions {
    /// Output as close as possible to what JJTree produces.
    pub fn full_jjtree() -> Self {
        Self {
            dont_close_before_last_parser_action: false,
            fix_jjt_this_condition_scope: false,
            set_tokens_before_hooks: false,
            descriptive_variable_names: false,
            implement_node_constants: true,
        }
    }
}
