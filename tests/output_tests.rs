//! Rendered-output and file-writing tests: header/source layout of the
//! generated C modules and placement in the output directory.

use gp2c::{Config, RuleCompiler};
use std::fs;
use tempfile::TempDir;

const GROW: &str = "grow (x : int) [ (n1, x) | ] => [ (n1, x + 1) | ] interface = {n1}";

#[test]
fn test_write_rule_creates_header_and_source() {
    let dir = TempDir::new().unwrap();
    let compiler = RuleCompiler::new();
    let report = compiler.compile_program(GROW).unwrap();
    compiler.write_rule(&report.rules[0], dir.path()).unwrap();

    let header = fs::read_to_string(dir.path().join("grow.h")).unwrap();
    let source = fs::read_to_string(dir.path().join("grow.c")).unwrap();
    assert!(header.contains("#include \"morphism.h\""));
    assert!(header.contains("bool matchgrow(Morphism *morphism);"));
    assert!(header.contains("void applygrow(Morphism *morphism, bool record_changes);"));
    assert!(source.starts_with("#include \"grow.h\""));
    assert!(source.contains("bool matchgrow(Morphism *morphism)"));
}

#[test]
fn test_source_declares_matchers_before_definitions() {
    let compiler = RuleCompiler::new();
    let report = compiler.compile_program(GROW).unwrap();
    let source = report.rules[0].module.render_source();
    let prototype = source
        .find("static bool match_n0(Morphism *morphism);")
        .unwrap();
    let definition = source
        .find("static bool match_n0(Morphism *morphism)\n{")
        .unwrap();
    assert!(prototype < definition);
}

#[test]
fn test_highlight_surface_present_by_default() {
    let compiler = RuleCompiler::new();
    let report = compiler
        .compile_program("add [ | ] => [ (a, 1) | ]")
        .unwrap();
    let module = &report.rules[0].module;
    let header = module.render_header();
    assert!(header.contains("typedef struct Highlight"));
    assert!(header.contains("int getaddAddedNodes(void);"));
    assert!(header.contains("Highlight *getaddEdgeHighlights(void);"));
    let source = module.render_source();
    assert!(source.contains("static int added_node_count = 0;"));
    assert!(source.contains("static Highlight node_highlights[1];"));
    // No edges are added, so the edge array degenerates to a null
    // pointer.
    assert!(source.contains("static Highlight *edge_highlights = NULL;"));
}

#[test]
fn test_highlight_surface_disabled_by_config() {
    let mut config = Config::default();
    config.codegen.highlights = false;
    let compiler = RuleCompiler::with_config(config);
    let report = compiler
        .compile_program("add [ | ] => [ (a, 1) | ]")
        .unwrap();
    let module = &report.rules[0].module;
    assert!(!module.render_header().contains("Highlight"));
    assert!(!module.render_source().contains("added_node_count"));
}

#[test]
fn test_highlight_records_written_on_standard_apply() {
    let compiler = RuleCompiler::new();
    let report = compiler
        .compile_program(
            "extend [ (a, empty) | ] => [ (a, empty) (b, empty) | (e, a, b, empty) ] \
             interface = {a}",
        )
        .unwrap();
    let module = &report.rules[0].module;
    let apply = module.procedure("applyextend").unwrap().body.as_str().to_string();
    assert!(apply.contains("added_node_count = 0;"));
    assert!(apply.contains("node_highlights[added_node_count].highlight = \"__new_node\";"));
    assert!(apply.contains("edge_highlights[added_edge_count].highlight = \"__new_edge\";"));
}

#[test]
fn test_one_module_per_rule() {
    let dir = TempDir::new().unwrap();
    let compiler = RuleCompiler::new();
    let report = compiler
        .compile_program("r1 [ (a, 1) | ] => [ | ]\nr2 [ (b, 2) | ] => [ | ]")
        .unwrap();
    for compiled in &report.rules {
        compiler.write_rule(compiled, dir.path()).unwrap();
    }
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["r1.c", "r1.h", "r2.c", "r2.h"]);
}
