//! jjtx: a JJTree-compatible preprocessor for JavaCC grammars.
//!
//! The crate reads a JJTree grammar, weaves node-scope management code into
//! it ([`weave`]), resolves the configured type hierarchy of the tree nodes
//! ([`hierarchy`]), and runs generation tasks that produce node classes,
//! visitors and the parser itself ([`tasks`]).

pub use crate::errors::{JjtxError, SourceContext};

pub mod cli;
pub mod config;
pub mod errors;
pub mod grammar;
pub mod hierarchy;
pub mod reporting;
pub mod tasks;
pub mod templates;
pub mod weave;
