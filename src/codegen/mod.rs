//! # Code Generation
//!
//! Emits the per-rule C module: matching procedures driven by the
//! searchplan, condition machinery, and the application procedure.
//!
//! ```text
//! Rule IR + Searchplan -> [Codegen] -> RuleModule -> <rule>.h / <rule>.c
//! ```
//!
//! Generation is split from serialisation: every emitted procedure is a
//! typed [`Procedure`] value collected into a [`RuleModule`], and text
//! is only produced by the `render_*` methods at the end. Tests inspect
//! the module structure directly. All fresh-name counters live in
//! per-procedure state, so compiling one rule cannot leak numbering
//! into the next.

pub mod apply;
pub mod condition;
pub mod label;
pub mod matching;

use crate::config::Config;
use crate::error::{CompileError, CompileResult};
use crate::rule::Rule;
use crate::searchplan;
use tracing::debug;

/// Indentation unit of the generated C code, in spaces per level.
pub const INDENT: usize = 3;

/// A growable text buffer with indentation support.
///
/// Emitters pass absolute indentation columns, mirroring the shape of
/// the generated C rather than the nesting of the emitter itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeBuf {
    text: String,
}

impl CodeBuf {
    pub fn new() -> CodeBuf {
        CodeBuf::default()
    }

    /// Write one line at the given indentation column.
    pub fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.text.push(' ');
        }
        self.text.push_str(text);
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// One emitted C procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    /// `static` procedures are module-private helpers; non-static ones
    /// are declared in the rule's header
    pub is_static: bool,
    pub returns: &'static str,
    /// The C parameter list, parentheses excluded
    pub params: String,
    pub body: CodeBuf,
}

impl Procedure {
    fn signature(&self) -> String {
        let qualifier = if self.is_static { "static " } else { "" };
        // Pointer returns carry the star with the type; no extra space.
        let separator = if self.returns.ends_with('*') { "" } else { " " };
        format!(
            "{}{}{}{}({})",
            qualifier, self.returns, separator, self.name, self.params
        )
    }
}

/// The complete emitted module for one rule, ready to serialise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleModule {
    pub rule_name: String,
    /// Declarations for the rule's header file, after the preamble
    pub header_decls: Vec<String>,
    /// File-scope variable declarations in the source file
    pub statics: Vec<String>,
    pub procedures: Vec<Procedure>,
}

impl RuleModule {
    pub fn new(rule_name: &str) -> RuleModule {
        RuleModule {
            rule_name: rule_name.to_string(),
            ..RuleModule::default()
        }
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }

    pub fn add_procedure(
        &mut self,
        name: impl Into<String>,
        is_static: bool,
        returns: &'static str,
        params: impl Into<String>,
        body: CodeBuf,
    ) {
        self.procedures.push(Procedure {
            name: name.into(),
            is_static,
            returns,
            params: params.into(),
            body,
        });
    }

    /// Serialise the `<rule>.h` file.
    pub fn render_header(&self) -> String {
        let mut out = String::new();
        out.push_str(
            "#include \"globals.h\"\n\
             #include \"graph.h\"\n\
             #include \"label.h\"\n\
             #include \"graphStacks.h\"\n\
             #include \"hostParser.h\"\n\
             #include \"morphism.h\"\n\n",
        );
        for decl in &self.header_decls {
            out.push_str(decl);
            out.push('\n');
        }
        out
    }

    /// Serialise the `<rule>.c` file.
    pub fn render_source(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("#include \"{}.h\"\n\n", self.rule_name));
        for decl in &self.statics {
            out.push_str(decl);
            out.push('\n');
        }
        if !self.statics.is_empty() {
            out.push('\n');
        }
        // Forward declarations let matchers chain in searchplan order
        // regardless of definition order.
        for procedure in &self.procedures {
            if procedure.is_static {
                out.push_str(&format!("{};\n", procedure.signature()));
            }
        }
        if self.procedures.iter().any(|p| p.is_static) {
            out.push('\n');
        }
        for procedure in &self.procedures {
            out.push_str(&format!("{}\n{{\n", procedure.signature()));
            out.push_str(procedure.body.as_str());
            out.push_str("}\n\n");
        }
        out
    }
}

/// Generate the complete module for one rule.
///
/// Mirrors the per-rule driver: highlight surface, condition machinery,
/// matching code, then the application procedure appropriate to the
/// rule's shape (standard, remove-LHS, pure-add, or none for a
/// predicate).
pub fn generate_rule_module(rule: &Rule, config: &Config) -> CompileResult<RuleModule> {
    let mut module = RuleModule::new(&rule.name);
    let is_predicate = rule.is_predicate();

    if config.codegen.highlights {
        emit_highlight_surface(rule, &mut module);
    }

    if rule.condition.is_some() {
        condition::generate_condition_variables(rule, &mut module);
        condition::generate_condition_evaluator(rule, &mut module);
        condition::generate_predicate_evaluators(rule, &mut module);
    }

    if let Some(lhs) = &rule.lhs {
        let plan = searchplan::generate(lhs);
        if plan.is_empty() {
            return Err(CompileError::EmptySearchplan {
                rule: rule.name.clone(),
            });
        }
        debug!(rule = %rule.name, plan = %plan
            .ops
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(" "), "generated searchplan");
        matching::generate_matching_code(rule, &plan, is_predicate, &mut module);
        if !is_predicate {
            if rule.rhs.is_none() {
                apply::generate_remove_lhs_code(rule, &mut module);
            } else {
                apply::generate_application_code(rule, config, &mut module);
            }
        }
    } else if rule.rhs.is_some() {
        apply::generate_add_rhs_code(rule, &mut module);
    }

    Ok(module)
}

/// Per-rule counters and highlight arrays for tooling, plus their
/// accessors. Additive surface; controlled by `Config::highlights`.
fn emit_highlight_surface(rule: &Rule, module: &mut RuleModule) {
    let name = &rule.name;
    module.header_decls.push(
        "#ifndef HIGHLIGHT_STRUCT\n\
         #define HIGHLIGHT_STRUCT\n\n\
         typedef struct Highlight {\n\
         \x20\x20\x20int host_index;\n\
         \x20\x20\x20char* highlight;\n\
         } Highlight;\n\n\
         #endif\n"
            .to_string(),
    );
    module
        .header_decls
        .push(format!("int get{name}AddedNodes(void);"));
    module
        .header_decls
        .push(format!("int get{name}AddedEdges(void);"));
    module
        .header_decls
        .push(format!("Highlight *get{name}NodeHighlights(void);"));
    module
        .header_decls
        .push(format!("Highlight *get{name}EdgeHighlights(void);\n"));

    let added_nodes = added_item_count(rule, true);
    let added_edges = added_item_count(rule, false);
    module
        .statics
        .push("static int added_node_count = 0;".to_string());
    module
        .statics
        .push(highlight_array_decl("node_highlights", added_nodes));
    module
        .statics
        .push("static int added_edge_count = 0;".to_string());
    module
        .statics
        .push(highlight_array_decl("edge_highlights", added_edges));

    let mut body = CodeBuf::new();
    body.line(INDENT, "return added_node_count;");
    module.add_procedure(format!("get{name}AddedNodes"), false, "int", "void", body);

    let mut body = CodeBuf::new();
    body.line(INDENT, "return added_edge_count;");
    module.add_procedure(format!("get{name}AddedEdges"), false, "int", "void", body);

    let mut body = CodeBuf::new();
    body.line(INDENT, "return node_highlights;");
    module.add_procedure(
        format!("get{name}NodeHighlights"),
        false,
        "Highlight *",
        "void",
        body,
    );

    let mut body = CodeBuf::new();
    body.line(INDENT, "return edge_highlights;");
    module.add_procedure(
        format!("get{name}EdgeHighlights"),
        false,
        "Highlight *",
        "void",
        body,
    );
}

fn highlight_array_decl(name: &str, count: usize) -> String {
    if count == 0 {
        format!("static Highlight *{name} = NULL;")
    } else {
        format!("static Highlight {name}[{count}];")
    }
}

/// Number of RHS-only nodes or edges the rule adds.
pub(crate) fn added_item_count(rule: &Rule, nodes: bool) -> usize {
    match &rule.rhs {
        None => 0,
        Some(rhs) => {
            if nodes {
                rhs.nodes.iter().filter(|n| n.interface.is_none()).count()
            } else {
                rhs.edges.iter().filter(|e| e.interface.is_none()).count()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codebuf_indentation() {
        let mut buf = CodeBuf::new();
        buf.line(0, "void f(void)");
        buf.line(3, "return;");
        assert_eq!(buf.as_str(), "void f(void)\n   return;\n");
    }

    #[test]
    fn test_procedure_signature() {
        let procedure = Procedure {
            name: "match_n0".into(),
            is_static: true,
            returns: "bool",
            params: "Morphism *morphism".into(),
            body: CodeBuf::new(),
        };
        assert_eq!(
            procedure.signature(),
            "static bool match_n0(Morphism *morphism)"
        );
    }

    #[test]
    fn test_render_source_has_prototypes_before_bodies() {
        let mut module = RuleModule::new("demo");
        let mut body = CodeBuf::new();
        body.line(INDENT, "return false;");
        module.add_procedure("match_n0", true, "bool", "Morphism *morphism", body);
        let source = module.render_source();
        let prototype = source
            .find("static bool match_n0(Morphism *morphism);")
            .unwrap();
        let definition = source
            .find("static bool match_n0(Morphism *morphism)\n{")
            .unwrap();
        assert!(prototype < definition);
        assert!(source.starts_with("#include \"demo.h\""));
    }

    #[test]
    fn test_render_header_preamble() {
        let module = RuleModule::new("demo");
        let header = module.render_header();
        assert!(header.contains("#include \"morphism.h\""));
        assert!(header.contains("#include \"graphStacks.h\""));
    }
}
