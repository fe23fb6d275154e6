//! `compile` / `validate` / `run` subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dipeo_core::compiled::{CompilationResult, Diagnostic};
use dipeo_core::{Compiler, DomainDiagram, ExecutableDiagram, ExecutionId};
use dipeo_runtime::{Engine, EngineConfig, HandlerRegistry, InputResolver, RuleRegistry, ServiceRegistry, Termination};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DipeoConfig;
use crate::error::{DipeoError, Result};

#[derive(Parser, Debug)]
#[command(name = "dipeo")]
#[command(about = "Visual programming diagram compiler and executor", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a diagram and report its executable shape.
    Compile {
        /// Path to a diagram JSON file.
        diagram: PathBuf,
    },
    /// Compile a diagram and report only pass/fail plus diagnostics.
    Validate {
        /// Path to a diagram JSON file.
        diagram: PathBuf,
    },
    /// Compile and execute a diagram to completion.
    Run {
        /// Path to a diagram JSON file.
        diagram: PathBuf,
        /// Path to a JSON file of initial variables; defaults to `{}`.
        #[arg(long)]
        variables: Option<PathBuf>,
        /// Override the configured firing concurrency.
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

fn load_diagram(path: &Path) -> Result<DomainDiagram> {
    let content = std::fs::read_to_string(path)?;
    let diagram: DomainDiagram = serde_json::from_str(&content)?;
    Ok(diagram)
}

fn format_diagnostic(d: &Diagnostic) -> String {
    let location = match (&d.node_id, &d.arrow_id) {
        (Some(n), Some(a)) => format!(" [node={n}, arrow={a}]"),
        (Some(n), None) => format!(" [node={n}]"),
        (None, Some(a)) => format!(" [arrow={a}]"),
        (None, None) => String::new(),
    };
    format!("{}: {}{}", d.code, d.message, location)
}

fn print_diagnostics(result: &CompilationResult) {
    for diagnostic in &result.errors {
        eprintln!("error {}", format_diagnostic(diagnostic));
    }
    for diagnostic in &result.warnings {
        eprintln!("warning {}", format_diagnostic(diagnostic));
    }
}

fn compile_or_fail(diagram: &DomainDiagram) -> Result<Arc<ExecutableDiagram>> {
    let (executable, result) = Compiler::new().compile(diagram);
    print_diagnostics(&result);
    if !result.is_valid() {
        let messages: Vec<String> = result.errors.iter().map(format_diagnostic).collect();
        return Err(DipeoError::Compilation(messages.join("\n")));
    }
    executable.map(Arc::new).ok_or_else(|| DipeoError::Compilation("compiler reported no errors but produced no diagram".into()))
}

pub async fn run_compile(path: &Path) -> Result<()> {
    let diagram = load_diagram(path)?;
    let executable = compile_or_fail(&diagram)?;
    println!(
        "compiled {} node(s), {} edge(s), {} start node(s)",
        executable.nodes.len(),
        executable.edges.len(),
        executable.start_nodes.len()
    );
    Ok(())
}

pub async fn run_validate(path: &Path) -> Result<()> {
    let diagram = load_diagram(path)?;
    let (_executable, result) = Compiler::new().compile(&diagram);
    print_diagnostics(&result);
    if result.is_valid() {
        println!("valid ({} warning(s))", result.warnings.len());
        Ok(())
    } else {
        Err(DipeoError::Compilation(format!("{} error(s)", result.errors.len())))
    }
}

pub async fn run_execute(
    path: &Path,
    variables_path: Option<&Path>,
    concurrency_override: Option<usize>,
    config: &DipeoConfig,
    cancellation: CancellationToken,
) -> Result<()> {
    let diagram = load_diagram(path)?;
    let executable = compile_or_fail(&diagram)?;

    let variables: Value = match variables_path {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => Value::Object(serde_json::Map::new()),
    };

    let execution_id = ExecutionId::new(uuid::Uuid::new_v4().to_string());
    let resolver = InputResolver::new(RuleRegistry::new().freeze());
    let handlers: HandlerRegistry = crate::handlers::build_registry();
    let services: ServiceRegistry = crate::adapters::build_services();

    let engine_config = EngineConfig {
        concurrency: concurrency_override.unwrap_or(config.engine.concurrency),
        retry: config.retry.to_policy(),
    };

    info!(%execution_id, diagram = %path.display(), "starting execution");
    let engine = Engine::new(executable, resolver, handlers, services, execution_id.clone(), variables, cancellation, engine_config);
    let termination = engine.run().await;

    match termination {
        Termination::Completed => {
            println!("execution {execution_id} completed");
            Ok(())
        }
        Termination::Quiescent => Err(DipeoError::Other(format!("execution {execution_id} stalled with no ready or in-flight nodes"))),
        Termination::Cancelled => Err(DipeoError::Other(format!("execution {execution_id} cancelled"))),
        Termination::Fatal(e) => Err(DipeoError::Runtime(e)),
    }
}
