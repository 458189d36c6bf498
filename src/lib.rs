//! # gp2c - GP 2 Rule Compiler
//!
//! A compiler for rules of the GP 2 graph programming language. Each
//! rule declaration is translated into a C module that matches the
//! rule's left-hand side against a host graph and applies the rewrite,
//! built on a fixed host-graph runtime library.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! GP 2 rule source
//!     ↓
//! [parser]      → AST (rule declarations)
//!     ↓
//! [transform]   → Rule IR (indexed graphs, variables, predicates)
//!     ↓
//! [searchplan]  → ordered matching operations
//!     ↓
//! [codegen]     → RuleModule → <rule>.h / <rule>.c
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gp2c::RuleCompiler;
//!
//! let compiler = RuleCompiler::new();
//! let report = compiler.compile_program(
//!     "grow (x : int) [ (n1, x) | ] => [ (n1, x + 1) | ] interface = {n1}",
//! )?;
//! for rule in &report.rules {
//!     println!("{}", rule.module.render_source());
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ast` | Rule-declaration AST |
//! | `parser` | Rule text → AST |
//! | `label` | Marks, atoms, labels |
//! | `rule` | Rule intermediate representation |
//! | `transform` | AST → IR, interface pairing, predicate numbering |
//! | `searchplan` | LHS → ordered matching operations |
//! | `codegen` | IR + searchplan → C module |
//! | `config` | Configuration system |

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod label;
pub mod parser;
pub mod rule;
pub mod searchplan;
pub mod transform;

// Re-export the types that make up the public pipeline API.
pub use ast::{Declaration, RuleDecl};
pub use codegen::RuleModule;
pub use config::Config;
pub use error::{CompileError, CompileResult};
pub use label::{Mark, RuleAtom, RuleLabel, VarType};
pub use rule::Rule;
pub use searchplan::{OpKind, SearchOp, Searchplan};
pub use transform::transform_rule;

use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One successfully compiled rule.
///
/// `empty_lhs` and `is_predicate` are the annotations the program-level
/// compiler needs to emit the right call: a pure-add rule's `apply`
/// takes no morphism, and a predicate rule has no `apply` at all.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub empty_lhs: bool,
    pub is_predicate: bool,
    pub module: RuleModule,
}

impl CompiledRule {
    pub fn header_file_name(&self) -> String {
        format!("{}.h", self.name)
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.c", self.name)
    }
}

/// The outcome of compiling a program's rule declarations.
///
/// A fatal diagnostic in one rule suppresses that rule's output but
/// does not stop the others.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub rules: Vec<CompiledRule>,
    pub failures: Vec<CompileError>,
}

impl CompileReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The rule compiler: orchestrates parse → transform → searchplan →
/// codegen for every rule declaration, including rules local to
/// procedures.
pub struct RuleCompiler {
    config: Config,
}

impl RuleCompiler {
    /// Create a compiler with default configuration.
    pub fn new() -> RuleCompiler {
        RuleCompiler {
            config: Config::default(),
        }
    }

    pub fn with_config(config: Config) -> RuleCompiler {
        RuleCompiler { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse a program and compile every rule declaration in it.
    pub fn compile_program(&self, source: &str) -> CompileResult<CompileReport> {
        let declarations = parser::parse_program(source).map_err(CompileError::Parse)?;
        Ok(self.compile_declarations(&declarations))
    }

    /// Compile every rule in a declaration list, descending into
    /// procedure-local declarations.
    pub fn compile_declarations(&self, declarations: &[Declaration]) -> CompileReport {
        let mut report = CompileReport::default();
        let mut rules = Vec::new();
        collect_rules(declarations, &mut rules);
        for decl in rules {
            match self.compile_rule(decl) {
                Ok(compiled) => report.rules.push(compiled),
                Err(error) => {
                    warn!(rule = %decl.name, %error, "rule compilation failed");
                    report.failures.push(error);
                }
            }
        }
        report
    }

    /// Compile a single rule declaration into its C module.
    pub fn compile_rule(&self, decl: &RuleDecl) -> CompileResult<CompiledRule> {
        let rule = transform_rule(decl)?;
        let module = codegen::generate_rule_module(&rule, &self.config)?;
        info!(
            rule = %rule.name,
            procedures = module.procedures.len(),
            predicate = rule.is_predicate(),
            "compiled rule"
        );
        Ok(CompiledRule {
            name: rule.name.clone(),
            empty_lhs: rule.empty_lhs(),
            is_predicate: rule.is_predicate(),
            module,
        })
    }

    /// Write a compiled rule's header and source files into a
    /// directory.
    pub fn write_rule(&self, compiled: &CompiledRule, directory: &Path) -> CompileResult<()> {
        fs::create_dir_all(directory)?;
        fs::write(
            directory.join(compiled.header_file_name()),
            compiled.module.render_header(),
        )?;
        fs::write(
            directory.join(compiled.source_file_name()),
            compiled.module.render_source(),
        )?;
        Ok(())
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a declaration tree into its rule declarations, in source
/// order.
pub fn collect_rules<'a>(declarations: &'a [Declaration], out: &mut Vec<&'a RuleDecl>) {
    for declaration in declarations {
        match declaration {
            Declaration::Rule(rule) => out.push(rule),
            Declaration::Procedure { local_decls, .. } => collect_rules(local_decls, out),
        }
    }
}
