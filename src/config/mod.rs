//! Option files
//!
//! Options live in YAML (or JSON) files under a top-level `jjtx` key. A run
//! reads a chain of such files in decreasing precedence order and merges
//! them into one [`JjtxOptions`].
//!
//! ```yaml
//! jjtx:
//!   nodePrefix: AST
//!   nodePackage: com.example.ast
//!   typeHierarchy:
//!     Node:
//!       - Expr: [ "r:.*Expr" ]
//!   javaccGen:
//!     dontCloseBeforeLastParserAction: true
//!     supportFiles:
//!       parserState:
//!         templateFile: templates/State.java.tpl
//!   templateContext:
//!     author: me
//!   visitors:
//!     printer:
//!       templateFile: templates/Printer.java.tpl
//!       genClassName: "{{grammar.nodePackage}}.Printer"
//!   nodeGen:
//!     templates:
//!       - templateFile: templates/Node.java.tpl
//! ```

use crate::errors::{config_error, io_error, JjtxError};
use crate::grammar::{GrammarFile, GrammarOptions};
use crate::templates::support::builtin_support_files;
use crate::weave::CompatOptions;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub mod merge;

use merge::merge_optional;

/// Extensions of option files found next to a grammar.
pub const OPTION_FILE_EXTENSIONS: &[&str] = &["jjtopts.yaml", "jjtopts.yml", "jjtopts.json"];

// ============================================================================
// MODEL
// ============================================================================

/// The `jjtx` section of an option file, or of a merged chain of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JjtxOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_package: Option<String>,
    /// Raw hierarchy description, resolved by [`crate::hierarchy`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_hierarchy: Option<Value>,
    /// Compatibility switches, kept raw so that partial maps merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub javacc_gen: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_context: Option<Mapping>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub visitors: BTreeMap<String, FileGenBean>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_gen: Option<NodeGenBean>,
}

/// One file generation: a template and the class it produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileGenBean {
    /// Visitors only: `false` disables the generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute: Option<bool>,
    /// Inline template source; takes precedence over `templateFile`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Template path, relative to the grammar directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<String>,
    /// Template of the fully qualified name of the generated class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gen_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Mapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeGenBean {
    pub templates: Vec<FileGenBean>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionFile {
    jjtx: Option<JjtxOptions>,
}

// ============================================================================
// MERGING
// ============================================================================

impl FileGenBean {
    /// Completes this bean with the fields of a lower-precedence one.
    pub fn merge(self, parent: FileGenBean) -> FileGenBean {
        let (template, template_file) = if self.template.is_some() || self.template_file.is_some() {
            (self.template, self.template_file)
        } else {
            (parent.template, parent.template_file)
        };
        FileGenBean {
            execute: self.execute.or(parent.execute),
            template,
            template_file,
            gen_class_name: self.gen_class_name.or(parent.gen_class_name),
            context: merge_optional(self.context, parent.context),
        }
    }

    pub fn is_executable(&self) -> bool {
        self.execute != Some(false)
    }
}

impl JjtxOptions {
    /// Merges with a lower-precedence model. Scalars of `self` win, maps
    /// are merged, the hierarchy and node generation are taken whole.
    pub fn merge(self, parent: JjtxOptions) -> JjtxOptions {
        let mut visitors = parent.visitors;
        for (id, bean) in self.visitors {
            let merged = match visitors.remove(&id) {
                Some(inherited) => bean.merge(inherited),
                None => bean,
            };
            visitors.insert(id, merged);
        }

        JjtxOptions {
            node_prefix: self.node_prefix.or(parent.node_prefix),
            node_package: self.node_package.or(parent.node_package),
            type_hierarchy: self.type_hierarchy.or(parent.type_hierarchy),
            javacc_gen: merge_optional(self.javacc_gen, parent.javacc_gen),
            template_context: merge_optional(self.template_context, parent.template_context),
            visitors,
            node_gen: self.node_gen.or(parent.node_gen),
        }
    }

    // ------------------------------------------------------------------------
    // Resolved views
    // ------------------------------------------------------------------------

    /// The compatibility switches, starting from `base` (the defaults or a
    /// preset chosen on the command line).
    pub fn compat_options(&self, base: CompatOptions, file: &str) -> Result<CompatOptions, JjtxError> {
        let Some(overrides) = &self.javacc_gen else {
            return Ok(base);
        };
        let base = match serde_yaml::to_value(&base) {
            Ok(Value::Mapping(map)) => map,
            Ok(_) => Mapping::new(),
            Err(e) => return Err(config_error(file, e.to_string())),
        };
        let merged = merge::merge_mappings(overrides.clone(), base);
        serde_yaml::from_value(Value::Mapping(merged))
            .map_err(|e| config_error(file, format!("invalid javaccGen: {}", e)))
    }

    /// Support files of the woven grammar: the built-in ones, completed or
    /// replaced by `javaccGen.supportFiles`. Entries with `execute: false`
    /// are left out.
    pub fn support_files(&self, file: &str) -> Result<BTreeMap<String, FileGenBean>, JjtxError> {
        let configured: BTreeMap<String, FileGenBean> =
            match self.javacc_gen.as_ref().and_then(|gen| gen.get("supportFiles")) {
                None | Some(Value::Null) => BTreeMap::new(),
                Some(value) => serde_yaml::from_value(value.clone())
                    .map_err(|e| config_error(file, format!("invalid javaccGen.supportFiles: {}", e)))?,
            };

        let mut files = builtin_support_files();
        for (id, bean) in configured {
            let merged = match files.remove(&id) {
                Some(builtin) => bean.merge(builtin),
                None => bean,
            };
            files.insert(id, merged);
        }
        files.retain(|_, bean| bean.is_executable());
        Ok(files)
    }

    /// Grammar options with the configured prefix and package applied.
    pub fn grammar_options(&self, grammar: &GrammarFile) -> GrammarOptions {
        GrammarOptions::from_grammar(grammar)
            .with_overrides(self.node_prefix.as_deref(), self.node_package.as_deref())
    }

    /// Global template variables as JSON.
    pub fn template_context_json(&self) -> serde_json::Value {
        self.template_context
            .as_ref()
            .and_then(|map| serde_json::to_value(map).ok())
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }

    pub fn to_yaml(&self) -> Result<String, JjtxError> {
        #[derive(Serialize)]
        struct Dump<'a> {
            jjtx: &'a JjtxOptions,
        }
        serde_yaml::to_string(&Dump { jjtx: self }).map_err(|e| config_error("<dump>", e.to_string()))
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Parses the text of one option file. A file without a `jjtx` key is an
/// empty model.
pub fn parse_options(text: &str, file: &str) -> Result<JjtxOptions, JjtxError> {
    if text.trim().is_empty() {
        return Ok(JjtxOptions::default());
    }
    let parsed: OptionFile = serde_yaml::from_str(text).map_err(|e| config_error(file, e.to_string()))?;
    Ok(parsed.jjtx.unwrap_or_default())
}

pub fn load_file(path: &Path) -> Result<JjtxOptions, JjtxError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, &e))?;
    parse_options(&text, &path.display().to_string())
}

/// Loads and merges a chain of files given in decreasing precedence order.
pub fn load_chain(chain: &[PathBuf]) -> Result<JjtxOptions, JjtxError> {
    let mut merged = JjtxOptions::default();
    for path in chain.iter().rev() {
        merged = load_file(path)?.merge(merged);
    }
    Ok(merged)
}

/// The option file sitting next to a grammar (`Calc.jjt` ->
/// `Calc.jjtopts.yaml`), if there is one.
pub fn default_chain(grammar_path: &Path) -> Vec<PathBuf> {
    let Some(stem) = grammar_path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let dir = grammar_path.parent().unwrap_or_else(|| Path::new(""));
    OPTION_FILE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
        .into_iter()
        .collect()
}
