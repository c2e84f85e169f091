//! Built-in templates of the classes a woven grammar depends on.

use crate::config::FileGenBean;
use std::collections::BTreeMap;

const TREE_STATE: &str = include_str!("support/TreeState.java.tpl");
const TREE_CONSTANTS: &str = include_str!("support/TreeConstants.java.tpl");

/// Id of the `JJT<Parser>State` support file.
pub const PARSER_STATE: &str = "parserState";
/// Id of the `<Parser>TreeConstants` support file.
pub const NODE_CONSTANTS: &str = "treeConstants";

/// Support files generated when the configuration does not override them.
pub fn builtin_support_files() -> BTreeMap<String, FileGenBean> {
    let bean = |template: &str, gen_class_name: &str| FileGenBean {
        template: Some(template.to_string()),
        gen_class_name: Some(gen_class_name.to_string()),
        ..FileGenBean::default()
    };
    BTreeMap::from([
        (
            PARSER_STATE.to_string(),
            bean(TREE_STATE, "{{grammar.treeState.qualifiedName}}"),
        ),
        (
            NODE_CONSTANTS.to_string(),
            bean(TREE_CONSTANTS, "{{grammar.parser.qualifiedName}}TreeConstants"),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{PlaceholderEngine, TemplateEngine};
    use serde_json::json;

    fn grammar() -> serde_json::Value {
        json!({
            "name": "Calc",
            "rootNode": {"class": {"qualifiedName": "p.ast.ASTNode"}},
            "nodeConstants": [
                {"name": "Sum", "constant": "JJTSUM", "value": 0},
                {"name": "Add", "constant": "JJTADD", "value": 1}
            ]
        })
    }

    #[test]
    fn test_tree_constants_template() {
        let context = json!({"grammar": grammar(), "package": "p", "simpleName": "CalcTreeConstants"});
        let text = PlaceholderEngine.render(TREE_CONSTANTS, &context).unwrap();
        assert!(text.starts_with("package p;\n"));
        assert!(text.contains("public interface CalcTreeConstants {\n  int JJTSUM = 0;\n  int JJTADD = 1;\n"));
        assert!(text.contains("    \"Sum\",\n    \"Add\",\n  };"));
    }

    #[test]
    fn test_tree_state_template_uses_the_root_node() {
        let context = json!({"grammar": grammar(), "package": "", "simpleName": "JJTCalcState"});
        let text = PlaceholderEngine.render(TREE_STATE, &context).unwrap();
        assert!(!text.contains("package"));
        assert!(text.contains("public class JJTCalcState {"));
        assert!(text.contains("public void closeNodeScope(p.ast.ASTNode n, boolean condition) {"));
        assert!(!text.contains("{{"));
    }
}
