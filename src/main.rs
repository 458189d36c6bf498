//! # gp2c CLI
//!
//! Compiles a file of GP 2 rule declarations into per-rule C modules.
//!
//! ## Usage
//!
//! ```bash
//! gp2c rules.gp2 -o generated/
//! gp2c rules.gp2 --dump-ir
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use gp2c::{collect_rules, parser, transform_rule, Config, RuleCompiler};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gp2c",
    about = "Compile GP 2 graph-rewriting rules to C matching and application code"
)]
struct Cli {
    /// File containing GP 2 rule declarations
    input: PathBuf,

    /// Output directory (defaults to the configured one)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (defaults to gp2c.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print each rule's intermediate representation as JSON and exit
    #[arg(long)]
    dump_ir: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    if cli.dump_ir {
        let declarations = parser::parse_program(&source)
            .map_err(|e| anyhow::anyhow!("parse error: {e}"))?;
        let mut rules = Vec::new();
        collect_rules(&declarations, &mut rules);
        for decl in rules {
            let rule = transform_rule(decl)
                .with_context(|| format!("failed to transform rule '{}'", decl.name))?;
            println!("{}", serde_json::to_string_pretty(&rule)?);
        }
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let compiler = RuleCompiler::with_config(config);
    let report = compiler
        .compile_program(&source)
        .context("failed to parse program")?;

    for compiled in &report.rules {
        compiler
            .write_rule(compiled, &output)
            .with_context(|| format!("failed to write module for rule '{}'", compiled.name))?;
        println!(
            "{} -> {}, {}",
            compiled.name,
            output.join(compiled.header_file_name()).display(),
            output.join(compiled.source_file_name()).display()
        );
    }

    if report.has_failures() {
        for failure in &report.failures {
            eprintln!("error: {failure}");
        }
        bail!("{} rule(s) failed to compile", report.failures.len());
    }
    Ok(())
}
