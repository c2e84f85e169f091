//! Node-scope weaving
//!
//! Rewrites a JJTree grammar into a plain JavaCC grammar. Every construct
//! that opens a node (a non-void production, or an expansion unit annotated
//! with `#Name`) is expanded into explicit node creation, a `try` around its
//! body, a `catch` that discards the node and rethrows, and a `finally` that
//! closes the scope. All node-specific code is rendered by a
//! [`BuilderStrategy`].
//!
//! The pass is a pure function of the grammar, the options and the builder:
//! node variable names only depend on the nesting depth, so weaving the same
//! grammar twice gives byte-identical output.

use crate::grammar::options::is_jjtree_option;
use crate::grammar::{
    Expansion, GrammarFile, GrammarItem, GrammarOptions, OptionEntry, ParserDecl, Production,
    ProductionKind,
};
use once_cell::sync::Lazy;
use regex::Regex;

pub mod builder;
pub mod compat;
pub mod node_var;
pub mod out;
pub mod throws;

pub use builder::{BuilderStrategy, VanillaJjtreeBuilder};
pub use compat::CompatOptions;
pub use node_var::{NodeVar, ScopeOwner};
pub use out::OutStream;

static PACKAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*package\s+[\w.]+\s*;[ \t]*\n?").expect("package regex is valid")
});

// ============================================================================
// PUBLIC API
// ============================================================================

/// Weaves a grammar with the JJTree-compatible builder.
pub fn weave(grammar: &GrammarFile, options: &GrammarOptions, compat: &CompatOptions) -> String {
    let builder = VanillaJjtreeBuilder::new(options.clone(), compat.clone());
    weave_with(grammar, &builder, compat)
}

/// Weaves a grammar with a custom builder.
pub fn weave_with(
    grammar: &GrammarFile,
    builder: &dyn BuilderStrategy,
    compat: &CompatOptions,
) -> String {
    let mut weaver = Weaver {
        grammar,
        builder,
        compat,
        stack: Vec::new(),
        production: None,
        out: OutStream::new(),
    };
    weaver.weave_file();
    weaver.out.finish()
}

// ============================================================================
// WEAVER
// ============================================================================

struct Weaver<'g, 'b> {
    grammar: &'g GrammarFile,
    builder: &'b dyn BuilderStrategy,
    compat: &'b CompatOptions,
    /// Open node scopes, innermost last. Its length is the current depth.
    stack: Vec<NodeVar<'g>>,
    /// Production being woven.
    production: Option<&'g Production>,
    out: OutStream,
}

impl<'g, 'b> Weaver<'g, 'b> {
    fn weave_file(&mut self) {
        let grammar = self.grammar;
        for (i, item) in grammar.items.iter().enumerate() {
            if i > 0 {
                self.out.line("");
            }
            match item {
                GrammarItem::Options(entries) => self.weave_options(entries),
                GrammarItem::Parser(decl) => self.weave_parser_decl(decl),
                GrammarItem::Verbatim(text) => {
                    self.out.raw(text).raw("\n");
                }
                GrammarItem::Production(production) => self.weave_production(production),
            }
        }
    }

    fn weave_options(&mut self, entries: &[OptionEntry]) {
        self.out.block("options", |out| {
            for entry in entries.iter().filter(|e| !is_jjtree_option(&e.key)) {
                out.line(&format!("{} = {};", entry.key, entry.value));
            }
        });
    }

    fn weave_parser_decl(&mut self, decl: &ParserDecl) {
        let body = add_parser_support(
            &decl.body,
            &decl.name,
            &self.builder.parser_imports(),
            &self.builder.parser_implements(),
            &self.builder.parser_declarations(),
        );
        self.out.line(&format!("PARSER_BEGIN({})", decl.name));
        self.out.raw(&body).raw("\n");
        self.out.line(&format!("PARSER_END({})", decl.name));
    }

    // ------------------------------------------------------------------------
    // Productions
    // ------------------------------------------------------------------------

    fn weave_production(&mut self, production: &'g Production) {
        self.production = Some(production);
        let header = header_with_throws(production);
        let var = self
            .builder
            .make_node_var(ScopeOwner::Production(production), self.stack.len());
        let (builder, compat) = (self.builder, self.compat);

        match (&production.kind, var) {
            (ProductionKind::Bnf { declarations, expansion }, None) => {
                self.out.line(&format!("{} :", header));
                self.out.raw("{").raw(declarations).raw("}\n");
                self.out.line("{");
                self.nested(|w| w.weave_expansion(expansion, false));
                self.out.line("}");
            }
            (ProductionKind::Bnf { declarations, expansion }, Some(var)) => {
                let exceptions = throws::exception_set(self.grammar, Some(production), expansion);
                let declarations = builder.escape_jjt_this(&var, declarations);

                self.out.line(&format!("{} :", header));
                self.out.raw(&format!("{{/*@bgen(jjtree) {} */\n", var.node_name));
                self.out
                    .indented(|out| emit_open_node_code(out, builder, compat, &var));
                self.out.egen();
                self.out.raw(&declarations).raw("}\n");

                self.out.raw(&format!("{{/*@bgen(jjtree) {} */\n", var.node_name));
                self.stack.push(var);
                self.nested(|w| {
                    w.emit_try_catch(&exceptions, |w| w.weave_expansion(expansion, true));
                });
                self.stack.pop();
                self.out.egen();
                self.out.line("}");
            }
            (ProductionKind::Javacode { body }, None) => {
                self.out.line("JAVACODE");
                self.out.raw(&header).raw(" {").raw(body).raw("}\n");
            }
            (ProductionKind::Javacode { body }, Some(var)) => {
                let exceptions = throws::declared_exception_set(&production.throws);
                let code = builder.escape_jjt_this(&var, body);

                self.out.line("JAVACODE");
                self.out
                    .raw(&header)
                    .raw(&format!(" {{/*@bgen(jjtree) {} */\n", var.node_name));
                self.out
                    .indented(|out| emit_open_node_code(out, builder, compat, &var));
                self.stack.push(var);
                self.nested(|w| {
                    w.emit_try_catch(&exceptions, |w| {
                        w.out.raw(&code).raw("\n");
                    });
                });
                self.stack.pop();
                self.out.egen();
                self.out.line("}");
            }
        }
        self.production = None;
    }

    // ------------------------------------------------------------------------
    // Expansions
    // ------------------------------------------------------------------------

    /// Weaves one expansion. `at_end` is true when the expansion is in final
    /// position in the innermost open scope: last in every enclosing
    /// sequence, and not under `[...]` or a repeated `(...)`.
    fn weave_expansion(&mut self, expansion: &'g Expansion, at_end: bool) {
        match expansion {
            Expansion::Sequence(units) => {
                let last = units.len().saturating_sub(1);
                for (i, unit) in units.iter().enumerate() {
                    self.weave_expansion(unit, at_end && i == last);
                }
            }
            Expansion::Choice(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        self.out.line("|");
                    }
                    self.weave_expansion(alternative, at_end);
                }
            }
            Expansion::Lookahead(text) => {
                self.out.line(text);
            }
            Expansion::Action(code) => self.weave_action(code, at_end),
            Expansion::NonTerminal { lhs, name, args } => {
                self.out
                    .line(&format!("{}{}({})", lhs_prefix(lhs), name, args));
            }
            Expansion::Terminal { lhs, text } => {
                self.out.line(&format!("{}{}", lhs_prefix(lhs), text));
            }
            Expansion::Paren { inner, occurrence } => {
                let inner_at_end = at_end && occurrence.is_none();
                self.out.line("(");
                self.nested(|w| w.weave_expansion(inner, inner_at_end));
                self.out
                    .line(&format!("){}", occurrence.map_or("", |o| o.symbol())));
            }
            Expansion::Optional(inner) => {
                self.out.line("[");
                self.nested(|w| w.weave_expansion(inner, false));
                self.out.line("]");
            }
            Expansion::Scoped { inner, node } => {
                let owner = ScopeOwner::Unit { expansion, node };
                match self.builder.make_node_var(owner, self.stack.len()) {
                    None => self.weave_expansion(inner, at_end),
                    Some(var) => self.weave_scoped_unit(var, inner),
                }
            }
            Expansion::TryCatch {
                inner,
                catches,
                finally,
            } => {
                self.out.line("try {");
                self.nested(|w| w.weave_expansion(inner, at_end));
                let mut tail = String::from("}");
                for clause in catches {
                    tail.push_str(&format!(
                        " catch ({}) {{{}}}",
                        clause.parameter,
                        self.escape_in_scope(&clause.body)
                    ));
                }
                if let Some(finally) = finally {
                    tail.push_str(&format!(" finally {{{}}}", self.escape_in_scope(finally)));
                }
                self.out.line(&tail);
            }
        }
    }

    /// A parser action in final position is preceded by an early close of
    /// the innermost scope. Nested scopes skip this when the compat switch
    /// asks to close after the last action.
    fn weave_action(&mut self, code: &str, at_end: bool) {
        let (builder, compat) = (self.builder, self.compat);
        if let Some(var) = self.stack.last() {
            let closes_early = at_end
                && (var.owner.is_production() || !compat.dont_close_before_last_parser_action);
            if closes_early {
                self.out.bgen("");
                self.out
                    .block("", |out| emit_close_node_code(out, builder, compat, var, false));
                self.out.egen();
            }
        }
        let code = self.escape_in_scope(code);
        self.out.line(&format!("{{{}}}", code));
    }

    fn weave_scoped_unit(&mut self, var: NodeVar<'g>, inner: &'g Expansion) {
        let exceptions = throws::exception_set(self.grammar, self.production, inner);
        let (builder, compat) = (self.builder, self.compat);

        self.out.bgen(&describe_scope(&var));
        self.out
            .block("", |out| emit_open_node_code(out, builder, compat, &var));
        self.stack.push(var);
        self.emit_try_catch(&exceptions, |w| w.weave_expansion(inner, true));
        self.stack.pop();
        self.out.egen();
    }

    /// Emits the try/catch/finally around the body of the innermost scope.
    fn emit_try_catch(&mut self, exceptions: &[String], body: impl FnOnce(&mut Self)) {
        let Some(var) = self.stack.last().cloned() else {
            body(self);
            return;
        };
        let builder = self.builder;
        let compat = self.compat;
        let (e, closed) = (var.exception_var.as_str(), var.closed_var.as_str());

        self.out.line("try {");
        self.out.egen();
        self.nested(body);
        self.out.bgen("");

        let out = &mut self.out;
        out.line(&format!("}} catch (Throwable {}) {{", e));
        out.indented(|out| {
            out.line(&format!("if ({}) {{", closed));
            out.indented(|out| {
                out.line(&builder.clear_node_scope(&var));
                out.line(&format!("{} = false;", closed));
            });
            out.line("} else {");
            out.indented(|out| {
                out.line(&builder.pop_node(&var));
            });
            out.line("}");
            for exception in exceptions {
                out.block(&format!("if ({} instanceof {})", e, exception), |out| {
                    out.line(&format!("throw ({}){};", exception, e));
                });
            }
            out.line(&format!("throw (Error){};", e));
        });
        out.line("} finally {");
        out.indented(|out| {
            out.block(&format!("if ({})", closed), |out| {
                emit_close_node_code(out, builder, compat, &var, true);
            });
        });
        out.line("}");
    }

    /// Runs `f` one indentation level deeper.
    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.out.push_indent();
        f(self);
        self.out.pop_indent();
    }

    fn escape_in_scope(&self, code: &str) -> String {
        match self.stack.last() {
            Some(var) => self.builder.escape_jjt_this(var, code),
            None => code.to_string(),
        }
    }
}

// ============================================================================
// NODE CODE
// ============================================================================

fn emit_open_node_code(
    out: &mut OutStream,
    builder: &dyn BuilderStrategy,
    compat: &CompatOptions,
    var: &NodeVar,
) {
    out.line(&format!(
        "{} {} = {};",
        var.node_ref_type,
        var.var_name,
        builder.create_node(var)
    ));
    out.line(&format!("boolean {} = true;", var.closed_var));

    let first_token = builder.set_first_token(var);
    if compat.set_tokens_before_hooks {
        emit_opt(out, &first_token);
    }
    emit_opt(out, &builder.open_node_hook(var));
    out.line(&builder.open_node_scope(var));
    if !compat.set_tokens_before_hooks {
        emit_opt(out, &first_token);
    }
}

/// The close sequence. A non-final close happens before a parser action and
/// clears the closed flag so that `finally` skips the scope.
fn emit_close_node_code(
    out: &mut OutStream,
    builder: &dyn BuilderStrategy,
    compat: &CompatOptions,
    var: &NodeVar,
    is_final: bool,
) {
    let last_token = builder.set_last_token(var);
    if compat.set_tokens_before_hooks {
        emit_opt(out, &last_token);
    }
    out.line(&builder.close_node_scope(var));
    if !is_final {
        out.line(&format!("{} = false;", var.closed_var));
    }
    emit_opt(out, &builder.close_node_hook(var));
    if !compat.set_tokens_before_hooks {
        emit_opt(out, &last_token);
    }
}

fn emit_opt(out: &mut OutStream, fragment: &Option<String>) {
    if let Some(fragment) = fragment {
        out.line(fragment);
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn header_with_throws(production: &Production) -> String {
    if production.throws.is_empty() {
        production.header.clone()
    } else {
        format!("{} throws {}", production.header, production.throws.join(", "))
    }
}

fn lhs_prefix(lhs: &Option<String>) -> String {
    lhs.as_ref().map_or(String::new(), |l| format!("{} = ", l))
}

fn describe_scope(var: &NodeVar) -> String {
    match var.owner.descriptor().and_then(|d| d.condition.as_ref()) {
        None => format!("#{}", var.node_name),
        Some(cond) if cond.is_gt => format!("#{}(> {})", var.node_name, cond.text),
        Some(cond) => format!("#{}({})", var.node_name, cond.text),
    }
}

/// Inserts the builder's imports, implemented interfaces and declarations
/// into the parser compilation unit.
fn add_parser_support(
    body: &str,
    parser_name: &str,
    imports: &[String],
    implements: &[String],
    declarations: &str,
) -> String {
    let mut body = body.to_string();

    if let Some((range, replacement)) = class_header_edit(&body, parser_name, implements, declarations)
    {
        body.replace_range(range, &replacement);
    }

    if !imports.is_empty() {
        let import_text: String = imports.iter().map(|i| format!("import {};\n", i)).collect();
        let insert_at = PACKAGE_LINE.find(&body).map_or(0, |m| m.end());
        body.insert_str(
            insert_at,
            &format!("/*@bgen(jjtree)*/\n{}/*@egen*/\n", import_text),
        );
    }

    body
}

fn class_header_edit(
    body: &str,
    parser_name: &str,
    implements: &[String],
    declarations: &str,
) -> Option<(std::ops::Range<usize>, String)> {
    let class_decl = Regex::new(&format!(
        r"\bclass\s+{}\b(?P<clauses>[^{{]*)\{{",
        regex::escape(parser_name)
    ))
    .ok()?;
    let caps = class_decl.captures(body)?;
    let whole = caps.get(0)?;
    let clauses = caps.name("clauses")?;

    let mut replacement = body[whole.start()..clauses.start()].to_string();
    replacement.push_str(clauses.as_str().trim_end());
    if !implements.is_empty() {
        if clauses.as_str().contains("implements") {
            replacement.push_str(&format!(", {}", implements.join(", ")));
        } else {
            replacement.push_str(&format!(" implements {}", implements.join(", ")));
        }
    }
    replacement.push_str(&format!(
        " {{/*@bgen(jjtree)*/\n  {}\n\n/*@egen*/",
        declarations
    ));
    Some((whole.start()..whole.end(), replacement))
}
