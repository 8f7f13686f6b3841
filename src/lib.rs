//! Symbolic shape/type inference over hierarchical model graphs.
//!
//! Pipeline: a JSON graph description (§6) is parsed ([`parse`]) into a port
//! graph ([`build`], [`port`]); the driver ([`driver`]) propagates shape and
//! type constraints to a fixpoint over the union-find solver ([`unify`]);
//! [`staticness`] then computes which external keys are determined at
//! build time, and [`format`] renders the hierarchical summary table.

pub mod build;
pub mod driver;
pub mod error;
pub mod format;
pub mod parse;
pub mod port;
pub mod primitives;
pub mod shape;
pub mod staticness;
pub mod symbol;
pub mod types;
pub mod unify;

use error::{CompositePath, InferenceError, Result};
use parse::StaticInputShapes;
use symbol::SymbolTable;
use unify::Solver;

/// The result of a full inference run (§6): the rendered summary plus the
/// set of external keys determined static.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    pub static_keys: Vec<String>,
    pub summary: String,
}

/// Runs the full pipeline: parse, build, infer to a fixpoint, compute static
/// keys, and render the summary.
pub fn infer(description_json: &str, static_input_shapes_json: Option<&str>) -> Result<InferenceOutput> {
    let desc = parse::parse_description(description_json).map_err(|e| InferenceError::Parse(e.to_string()))?;
    let static_shapes = match static_input_shapes_json {
        Some(s) => parse::parse_static_input_shapes(s).map_err(|e| InferenceError::Parse(e.to_string()))?,
        None => StaticInputShapes::default(),
    };

    let mut symbols = SymbolTable::new();
    let mut solver = Solver::new();
    let path = CompositePath::root(desc.name.clone());

    log::debug!("build phase: {}", path);
    let mut root = build::build_vertex(&desc, &mut symbols, &mut solver, &path)?;
    driver::bind_static_input_shapes(&mut root, &symbols, &mut solver, &static_shapes, &path)?;

    log::debug!("constraint phase: {}", path);
    driver::infer_vertex(&mut root, &mut symbols, &mut solver, &path)?;

    let static_keys = staticness::compute_static_keys(&root, &symbols, &mut solver, &static_shapes);
    let summary = format::format_summary(&root, &desc.name, &symbols, &mut solver);

    log::info!(
        "inference complete at {}: {} boundary ports, {} static keys",
        path,
        root.ports.len(),
        static_keys.len()
    );
    Ok(InferenceOutput { static_keys, summary })
}

/// Runs only the build and constraint phases, discarding the result; used by
/// the CLI's `check` subcommand to validate a description without printing a
/// summary.
pub fn check(description_json: &str) -> Result<()> {
    let desc = parse::parse_description(description_json).map_err(|e| InferenceError::Parse(e.to_string()))?;
    let mut symbols = SymbolTable::new();
    let mut solver = Solver::new();
    let path = CompositePath::root(desc.name.clone());

    let mut root = build::build_vertex(&desc, &mut symbols, &mut solver, &path)?;
    driver::infer_vertex(&mut root, &mut symbols, &mut solver, &path)?;
    log::info!("check passed at {}", path);
    Ok(())
}
