//! Templates: the engine seam, template sources and the beans exposed to
//! templates.

use crate::errors::{io_error, unsourced, ErrorKind, JjtxError};
use std::path::{Path, PathBuf};

pub mod beans;
pub mod engine;
pub mod support;

pub use beans::{grammar_bean, node_beans, ClassBean, GrammarBean, NodeBean, NodeConstantBean, NodeRef};
pub use engine::{PlaceholderEngine, TemplateEngine, TemplateError};

/// Where the text of a template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Inline(String),
    /// Path relative to the grammar directory.
    File(PathBuf),
}

impl TemplateSource {
    /// Inline text takes precedence over a file.
    pub fn from_fields(template: Option<&str>, template_file: Option<&str>) -> Option<Self> {
        match (template, template_file) {
            (Some(text), _) => Some(TemplateSource::Inline(text.to_string())),
            (None, Some(file)) => Some(TemplateSource::File(PathBuf::from(file))),
            (None, None) => None,
        }
    }

    pub fn load(&self, base_dir: &Path) -> Result<String, JjtxError> {
        match self {
            TemplateSource::Inline(text) => Ok(text.clone()),
            TemplateSource::File(file) => {
                let path = base_dir.join(file);
                std::fs::read_to_string(&path).map_err(|e| io_error(&path, &e))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TemplateSource::Inline(_) => "<inline template>".to_string(),
            TemplateSource::File(file) => file.display().to_string(),
        }
    }
}

/// Wraps a rendering failure with the name of the template.
pub fn template_error(template: &str, error: TemplateError) -> JjtxError {
    unsourced(
        ErrorKind::Template {
            template: template.to_string(),
            message: error.to_string(),
        },
        "template",
    )
}
