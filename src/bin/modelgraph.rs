//! Thin CLI front-end (C11, §4.12) — not part of the inference core, just a
//! consumer of `modelgraph`'s public API, wired the way the teacher wires
//! `colog`/`log` around its own `Cli`/`Commands`.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "modelgraph", about = "Symbolic shape/type inference over composite model graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference and print the summary table.
    Infer {
        description: PathBuf,
        #[arg(long)]
        static_input_shapes: Option<PathBuf>,
    },
    /// Run only the build and constraint phases and report errors, without
    /// printing a summary.
    Check { description: PathBuf },
}

fn main() -> ExitCode {
    colog::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Infer {
            description,
            static_input_shapes,
        } => run_infer(description, static_input_shapes),
        Commands::Check { description } => run_check(description),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_infer(description: PathBuf, static_input_shapes: Option<PathBuf>) -> anyhow::Result<()> {
    let json = fs::read_to_string(&description)?;
    let shapes_json = static_input_shapes.map(fs::read_to_string).transpose()?;
    let output = modelgraph::infer(&json, shapes_json.as_deref())?;
    println!("{}", output.summary);
    println!();
    println!("static_keys: {:?}", output.static_keys);
    Ok(())
}

fn run_check(description: PathBuf) -> anyhow::Result<()> {
    let json = fs::read_to_string(&description)?;
    modelgraph::check(&json)?;
    log::info!("check passed: {}", description.display());
    Ok(())
}
