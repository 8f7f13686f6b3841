//! The static-key propagator (C7, §4.7).
//!
//! A port's *value* (its [`PortValueId`] equivalence class, already merged
//! across aliases and connect edges during inference) is static iff it is a
//! literal pin, named in `static_input_shapes`, or produced by a purely
//! functional vertex all of whose inputs are themselves static. Because
//! composite boundary ports are re-projected onto the same value class as
//! their internals (`driver::project_boundary`), the fixpoint only has to
//! walk primitive vertices.

use std::collections::HashSet;

use crate::parse::StaticInputShapes;
use crate::port::{Endpoint, PortRole, Vertex, VertexKind};
use crate::symbol::SymbolTable;
use crate::unify::Solver;

/// Computes the outermost-scope static keys (§4.7) for an already-inferred
/// graph rooted at `root`.
pub fn compute_static_keys(
    root: &Vertex,
    symbols: &SymbolTable,
    solver: &mut Solver,
    static_input_shapes: &StaticInputShapes,
) -> Vec<String> {
    let mut static_values: HashSet<u32> = HashSet::new();

    collect_literal_statics(root, solver, &mut static_values);

    for port in root.ports.values() {
        if static_input_shapes.0.contains_key(symbols.name_of(port.name)) {
            static_values.insert(solver.value_root(port.value).0);
        }
    }

    loop {
        if !propagate_static(root, solver, &mut static_values) {
            break;
        }
    }

    root.ports
        .values()
        .filter(|p| static_values.contains(&solver.value_root(p.value).0))
        .map(|p| symbols.name_of(p.name).to_string())
        .collect()
}

fn collect_literal_statics(vertex: &Vertex, solver: &mut Solver, set: &mut HashSet<u32>) {
    for port in vertex.ports.values() {
        if matches!(port.endpoint, Endpoint::Literal(_)) {
            set.insert(solver.value_root(port.value).0);
        }
    }
    if let VertexKind::Composite(graph) = &vertex.kind {
        for child in graph.submodels.values() {
            collect_literal_statics(child, solver, set);
        }
    }
}

fn propagate_static(vertex: &Vertex, solver: &mut Solver, set: &mut HashSet<u32>) -> bool {
    let mut changed = false;
    match &vertex.kind {
        VertexKind::Primitive(op) => {
            let all_inputs_static = vertex
                .ports
                .values()
                .filter(|p| p.role == PortRole::Input)
                .all(|p| set.contains(&solver.value_root(p.value).0));
            if all_inputs_static && op.is_purely_functional() {
                for p in vertex.ports.values().filter(|p| p.role == PortRole::Output) {
                    if set.insert(solver.value_root(p.value).0) {
                        changed = true;
                    }
                }
            }
        }
        VertexKind::Composite(graph) => {
            for child in graph.submodels.values() {
                if propagate_static(child, solver, set) {
                    changed = true;
                }
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_vertex;
    use crate::error::CompositePath;
    use crate::parse::parse_description;
    use crate::primitives::PrimitiveOp;
    use crate::symbol::SymbolTable;
    use indexmap::IndexMap;

    #[test]
    fn all_static_inputs_make_purely_functional_output_static() {
        let mut symbols = SymbolTable::new();
        let mut solver = Solver::new();
        let json = r#"{
            "name": "Model",
            "submodels": { "r1": { "name": "Relu" } },
            "connections": { "r1": { "input": "input1", "output": "output1" } },
            "exposed_keys": ["input1", "output1"]
        }"#;
        let desc = parse_description(json).unwrap();
        let mut root = build_vertex(&desc, &mut symbols, &mut solver, &CompositePath::root("Model")).unwrap();
        crate::driver::infer_vertex(&mut root, &mut symbols, &mut solver, &CompositePath::root("Model")).unwrap();

        let mut shapes = IndexMap::new();
        shapes.insert("input1".to_string(), vec![1, 2, 3]);
        let static_input_shapes = StaticInputShapes(shapes);

        let keys = compute_static_keys(&root, &symbols, &mut solver, &static_input_shapes);
        assert!(keys.contains(&"input1".to_string()));
        assert!(keys.contains(&"output1".to_string()));
    }

    #[test]
    fn no_static_inputs_leaves_only_the_dangling_aliases() {
        let mut symbols = SymbolTable::new();
        let mut solver = Solver::new();
        let json = r#"{
            "name": "Model",
            "submodels": { "r1": { "name": "Relu" } },
            "connections": { "r1": { "input": "input1", "output": "output1" } },
            "exposed_keys": ["input1", "output1"]
        }"#;
        let desc = parse_description(json).unwrap();
        let mut root = build_vertex(&desc, &mut symbols, &mut solver, &CompositePath::root("Model")).unwrap();
        crate::driver::infer_vertex(&mut root, &mut symbols, &mut solver, &CompositePath::root("Model")).unwrap();

        let static_input_shapes = StaticInputShapes::default();
        let keys = compute_static_keys(&root, &symbols, &mut solver, &static_input_shapes);
        assert!(keys.is_empty());
        let _ = PrimitiveOp::Relu;
    }
}
