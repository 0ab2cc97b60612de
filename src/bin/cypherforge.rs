//! Binary entry point for the cypherforge command line.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use cypherforge::{Claims, Compiler, Config, Operation, Reconciler, RequestContext, Schema};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cypherforge",
    version,
    about = "Compile graph requests to Cypher and plan schema indexes",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "CYPHERFORGE_CONFIG",
        help = "TOML configuration file"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one request and print the statement with its parameters
    Compile(CompileCmd),
    /// Print the index and constraint statements the schema requires
    IndexPlan(IndexPlanCmd),
}

#[derive(Args, Debug)]
struct CompileCmd {
    #[arg(long, value_name = "FILE", help = "Schema JSON document")]
    schema: PathBuf,

    #[arg(long, value_name = "FILE", help = "Request JSON document")]
    request: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        help = "Caller claims JSON; omit for an anonymous caller"
    )]
    claims: Option<PathBuf>,

    #[arg(long, help = "Target database name")]
    database: Option<String>,
}

#[derive(Args, Debug)]
struct IndexPlanCmd {
    #[arg(long, value_name = "FILE", help = "Schema JSON document")]
    schema: PathBuf,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("CYPHERFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    match cli.command {
        Command::Compile(cmd) => compile(cmd, config),
        Command::IndexPlan(cmd) => index_plan(cmd),
    }
}

fn compile(cmd: CompileCmd, config: Config) -> Result<(), Box<dyn Error>> {
    let schema = load_schema(&cmd.schema)?;
    let operation: Operation = read_json(&cmd.request)?;
    let mut ctx = match &cmd.claims {
        Some(path) => RequestContext::authenticated(read_json::<Claims>(path)?),
        None => RequestContext::anonymous(),
    };
    if let Some(database) = cmd.database.or(config.reconcile.database) {
        ctx = ctx.with_database(database);
    }

    let compiler = Compiler::new(Arc::new(schema), config.compiler);
    let compiled = compiler.compile(&operation, &ctx)?;
    let out = json!({
        "cypher": compiled.cypher,
        "params": compiled.params,
        "kind": compiled.kind,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn index_plan(cmd: IndexPlanCmd) -> Result<(), Box<dyn Error>> {
    let schema = load_schema(&cmd.schema)?;
    let reconciler = Reconciler::new(Arc::new(schema));
    for object in reconciler.plan() {
        println!("{};", object.create_statement());
    }
    Ok(())
}

fn load_schema(path: &Path) -> Result<Schema, Box<dyn Error>> {
    let source = read_text(path)?;
    Ok(Schema::from_json(&source)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let source = read_text(path)?;
    serde_json::from_str(&source)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()).into())
}

fn read_text(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|err| format!("failed to read {}: {err}", path.display()).into())
}
