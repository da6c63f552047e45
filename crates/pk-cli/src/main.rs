//! Parametric kernel command-line entry point
//!
//! Owns the editing session and exposes basis, curve, face and length-rule
//! evaluation for scripting and smoke-testing.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pk_core::{KernelConfig, Session, SessionError};

use commands::{BasisArgs, CurveArgs, FaceArgs, LengthArgs, Render};

/// Command-line arguments for the kernel tool
#[derive(Parser, Debug)]
#[command(name = "pk", author, version, about, long_about = None)]
struct Cli {
    /// Kernel configuration file (RON); defaults are used when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate every basis function (or a derivative) at a parameter
    Basis(BasisArgs),
    /// Evaluate a B-spline curve point and tangent
    Curve(CurveArgs),
    /// Build a planar face from a vertex loop
    Face(FaceArgs),
    /// Check a length rule against a line segment
    Length(LengthArgs),
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pk_cli=info,pk_core=info,pk_cad=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let report = err.report();
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => eprintln!("{}", text),
                    Err(_) => eprintln!("{}", report),
                }
            } else {
                eprintln!("error: {}", report);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, SessionError> {
    let config = match &cli.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };
    let session = Session::new(config)?;
    tracing::info!(command = ?cli.command, "running");

    let output = match &cli.command {
        Command::Basis(args) => commands::basis(args)?.render(cli.json),
        Command::Curve(args) => commands::curve(args)?.render(cli.json),
        Command::Face(args) => commands::face(&session, args)?.render(cli.json),
        Command::Length(args) => commands::length(&session, args)?.render(cli.json),
    };
    Ok(output)
}
