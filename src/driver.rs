//! The inference driver (C6): propagates shape/type constraints to a
//! fixpoint, post-order over nested composites (§4.6). A composite's own
//! boundary ports already share the underlying dim/shape-var/value ids of
//! their internal alias-group representative (built in [`crate::build`]), so
//! no separate "re-projection" rewrite is needed once the fixpoint settles.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{CompositePath, InferenceError};
use crate::parse::StaticInputShapes;
use crate::port::{Endpoint, EdgeRef, Graph, Port, PortRole, Vertex, VertexKind};
use crate::shape::{DimAtom, ShapeTerm};
use crate::symbol::{KeyId, SymbolTable};
use crate::unify::{ShapeError, Solver};

type Loc = (String, KeyId);

fn shape_err(path: &CompositePath, port: &str, e: ShapeError) -> InferenceError {
    match e {
        ShapeError::RankMismatch { expected, found } => InferenceError::RankMismatch {
            path: path.to_string(),
            port: port.to_string(),
            expected,
            found,
        },
        ShapeError::DimMismatch {
            position,
            expected,
            found,
        } => InferenceError::DimMismatch {
            path: path.to_string(),
            port: port.to_string(),
            position,
            expected,
            found,
        },
    }
}

fn type_conflict(
    path: &CompositePath,
    port: &str,
    lhs: &crate::types::Type,
    rhs: &crate::types::Type,
) -> InferenceError {
    InferenceError::TypeConflict {
        path: path.to_string(),
        port: port.to_string(),
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    }
}

fn get_port<'a>(graph: &'a Graph, loc: &Loc) -> &'a Port {
    &graph.submodels[&loc.0].ports[&loc.1]
}

fn get_port_mut<'a>(graph: &'a mut Graph, loc: &Loc) -> &'a mut Port {
    graph.submodels.get_mut(&loc.0).unwrap().ports.get_mut(&loc.1).unwrap()
}

/// Validates, then (for composites) recurses into submodels, runs the
/// constraint fixpoint at this level, and re-projects this vertex's own
/// boundary ports from its internals.
pub fn infer_vertex(
    vertex: &mut Vertex,
    symbols: &mut SymbolTable,
    solver: &mut Solver,
    path: &CompositePath,
) -> Result<(), InferenceError> {
    validate_no_missing_ports(vertex, symbols, path)?;

    if matches!(vertex.kind, VertexKind::Composite(_)) {
        let names: Vec<String> = match &vertex.kind {
            VertexKind::Composite(g) => g.submodels.keys().cloned().collect(),
            _ => unreachable!(),
        };
        for name in &names {
            let child_path = path.child(name.clone());
            let graph = match &mut vertex.kind {
                VertexKind::Composite(g) => g,
                _ => unreachable!(),
            };
            let child = graph.submodels.get_mut(name).unwrap();
            infer_vertex(child, symbols, solver, &child_path)?;
        }

        {
            let graph = match &vertex.kind {
                VertexKind::Composite(g) => g,
                _ => unreachable!(),
            };
            detect_cycle(graph, path)?;
        }

        loop {
            let before = solver.revision();
            let graph = match &mut vertex.kind {
                VertexKind::Composite(g) => g,
                _ => unreachable!(),
            };
            let narrowed = propagate_connections(graph, symbols, solver, path)?;
            if solver.revision() == before && !narrowed {
                break;
            }
        }
    }
    Ok(())
}

/// Binds each `static_input_shapes` entry (§6) to the matching top-level
/// alias's shape before inference runs, the way a literal or annotation
/// refines a port (§4.5). Names with no matching alias in the graph are
/// silently skipped rather than erroring, since the directive may simply
/// enumerate more keys than a given description uses.
pub fn bind_static_input_shapes(
    root: &mut Vertex,
    symbols: &SymbolTable,
    solver: &mut Solver,
    static_shapes: &StaticInputShapes,
    path: &CompositePath,
) -> Result<(), InferenceError> {
    let graph = match &mut root.kind {
        VertexKind::Composite(g) => g,
        VertexKind::Primitive(_) => return Ok(()),
    };
    let groups = collect_alias_groups(&graph.submodels);
    for (key_name, dims) in static_shapes.0.iter() {
        let Some(alias) = symbols.lookup_key(key_name) else {
            continue;
        };
        let Some(members) = groups.get(&alias) else {
            continue;
        };
        let target = ShapeTerm::Fixed(dims.iter().map(|d| DimAtom::Concrete(*d)).collect());
        for m in members {
            let port_shape = get_port(graph, m).shape.clone();
            solver
                .unify_shapes(&port_shape, &target)
                .map_err(|e| shape_err(path, key_name, e))?;
        }
    }
    Ok(())
}

/// One round of constraint propagation at a single composite level (§4.6
/// step 2): type annotations, then alias-group unification, then connect
/// edges. Re-running this to a fixpoint is driven by [`Solver::revision`]
/// *and* by whether any port's type actually shrank this pass — a type
/// `meet` never bumps the solver's revision, so a chain of connect edges
/// longer than the number of passes `revision` alone would trigger can
/// still have an unpropagated type narrowing at the far end (§4.6 step 3:
/// "until no class merges or type refinements occur").
fn propagate_connections(
    graph: &mut Graph,
    symbols: &SymbolTable,
    solver: &mut Solver,
    path: &CompositePath,
) -> Result<bool, InferenceError> {
    let mut narrowed = false;

    for vertex in graph.submodels.values_mut() {
        for port in vertex.ports.values_mut() {
            let refine_by = match &port.endpoint {
                Endpoint::External { annotation: Some(t), .. } => Some(*t),
                Endpoint::Literal(v) => Some(v.ty()),
                _ => None,
            };
            if let Some(t) = refine_by {
                let new_ty = port.ty.meet(&t);
                if new_ty.is_bottom() {
                    return Err(type_conflict(path, symbols.name_of(port.name), &port.ty, &t));
                }
                if new_ty != port.ty {
                    narrowed = true;
                }
                port.ty = new_ty;
            }
        }
    }

    let groups = collect_alias_groups(&graph.submodels);
    for (alias, members) in groups.iter() {
        if members.len() < 2 {
            continue;
        }
        narrowed |= unify_group(graph, *alias, members, solver, symbols, path)?;
    }

    let mut edges: Vec<(Loc, EdgeRef)> = Vec::new();
    for (sub_name, vertex) in graph.submodels.iter() {
        for (port_key, port) in vertex.ports.iter() {
            if let Endpoint::Connect(refs) = &port.endpoint {
                for r in refs {
                    edges.push(((sub_name.clone(), *port_key), r.clone()));
                }
            }
        }
    }
    for (consumer, edge) in edges {
        let producer = (edge.submodel.clone(), edge.port);
        let producer_exists = graph
            .submodels
            .get(&producer.0)
            .map(|v| v.ports.contains_key(&producer.1))
            .unwrap_or(false);
        if !producer_exists {
            return Err(InferenceError::UnknownReference {
                path: path.to_string(),
                reference: format!("{}.{}", producer.0, symbols.name_of(producer.1)),
            });
        }
        narrowed |= unify_pair(graph, &consumer, &producer, solver, symbols, path)?;
    }
    Ok(narrowed)
}

/// Checks the connect-edges among this level's direct siblings for a
/// directed cycle (§7 kind 5: "a directed cycle among non-nested
/// vertices"). Composite boundaries never introduce an edge at this level —
/// a connect edge's submodel always names a sibling in `graph.submodels` —
/// so a per-level check over sibling dependencies is exactly the scope the
/// error kind describes; nested levels are checked independently as
/// [`infer_vertex`] recurses into them.
fn detect_cycle(graph: &Graph, path: &CompositePath) -> Result<(), InferenceError> {
    let mut adj: IndexMap<String, Vec<String>> = IndexMap::new();
    for (sub_name, vertex) in graph.submodels.iter() {
        let mut deps = Vec::new();
        for port in vertex.ports.values() {
            if let Endpoint::Connect(refs) = &port.endpoint {
                for r in refs {
                    deps.push(r.submodel.clone());
                }
            }
        }
        adj.insert(sub_name.clone(), deps);
    }

    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        node: &str,
        adj: &IndexMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| n == node).unwrap();
                let mut cycle = stack[start..].to_vec();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node.to_string(), Mark::Visiting);
        stack.push(node.to_string());
        if let Some(deps) = adj.get(node) {
            for d in deps {
                if let Some(c) = visit(d, adj, marks, stack) {
                    return Some(c);
                }
            }
        }
        stack.pop();
        marks.insert(node.to_string(), Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    for name in adj.keys().cloned().collect::<Vec<_>>() {
        if let Some(cycle) = visit(&name, &adj, &mut marks, &mut stack) {
            return Err(InferenceError::Cycle {
                path: path.to_string(),
                cycle: cycle.join(" -> "),
            });
        }
    }
    Ok(())
}

/// Groups every input's external alias and every output's exposure alias by
/// name; members sharing a group carry the same external value (§4.5: "Two
/// inputs sharing the same alias unify their shapes/types"). Shared by the
/// build phase (to construct a composite's own boundary ports) and the
/// constraint phase (to unify them).
pub(crate) fn collect_alias_groups(submodels: &IndexMap<String, Vertex>) -> IndexMap<KeyId, Vec<Loc>> {
    let mut groups: IndexMap<KeyId, Vec<Loc>> = IndexMap::new();
    for (sub_name, vertex) in submodels.iter() {
        for (port_key, port) in vertex.ports.iter() {
            match port.role {
                PortRole::Input => {
                    if let Endpoint::External { alias, .. } = &port.endpoint {
                        groups.entry(*alias).or_default().push((sub_name.clone(), *port_key));
                    }
                }
                PortRole::Output => {
                    if let Some(alias) = port.exposure.alias {
                        groups.entry(alias).or_default().push((sub_name.clone(), *port_key));
                    }
                }
            }
        }
    }
    groups
}

/// Unifies every port sharing one outward alias. Conflicts here are reported
/// as *ambiguous-exposure* (§7 kind 7), distinct from a plain type/rank/dim
/// mismatch between a producer and consumer at a connect edge, since the
/// members here aren't a producer/consumer pair but rivals claiming the same
/// name.
fn unify_group(
    graph: &mut Graph,
    alias: KeyId,
    members: &[Loc],
    solver: &mut Solver,
    symbols: &SymbolTable,
    path: &CompositePath,
) -> Result<bool, InferenceError> {
    let first = members[0].clone();
    let mut combined_ty = get_port(graph, &first).ty;
    for m in &members[1..] {
        combined_ty = combined_ty.meet(&get_port(graph, m).ty);
    }
    if combined_ty.is_bottom() {
        return Err(InferenceError::AmbiguousExposure {
            path: path.to_string(),
            alias: symbols.name_of(alias).to_string(),
        });
    }
    let narrowed = members.iter().any(|m| get_port(graph, m).ty != combined_ty);

    let first_shape = get_port(graph, &first).shape.clone();
    for m in &members[1..] {
        let shape_m = get_port(graph, m).shape.clone();
        solver.unify_shapes(&first_shape, &shape_m).map_err(|_| InferenceError::AmbiguousExposure {
            path: path.to_string(),
            alias: symbols.name_of(alias).to_string(),
        })?;
    }

    let mut value_root = solver.value_root(get_port(graph, &first).value);
    for m in members {
        let p = get_port_mut(graph, m);
        p.ty = combined_ty;
        value_root = solver.union_values(value_root, p.value);
    }
    Ok(narrowed)
}

fn unify_pair(
    graph: &mut Graph,
    consumer: &Loc,
    producer: &Loc,
    solver: &mut Solver,
    symbols: &SymbolTable,
    path: &CompositePath,
) -> Result<bool, InferenceError> {
    let producer_shape = get_port(graph, producer).shape.clone();
    let producer_ty = get_port(graph, producer).ty;
    let consumer_shape = get_port(graph, consumer).shape.clone();
    solver
        .unify_shapes(&consumer_shape, &producer_shape)
        .map_err(|e| shape_err(path, symbols.name_of(consumer.1), e))?;

    let consumer_ty = get_port(graph, consumer).ty;
    let new_ty = consumer_ty.meet(&producer_ty);
    if new_ty.is_bottom() {
        return Err(type_conflict(path, symbols.name_of(consumer.1), &consumer_ty, &producer_ty));
    }
    let narrowed = new_ty != consumer_ty || new_ty != producer_ty;
    get_port_mut(graph, consumer).ty = new_ty;
    get_port_mut(graph, producer).ty = new_ty;

    let cv = get_port(graph, consumer).value;
    let pv = get_port(graph, producer).value;
    solver.union_values(cv, pv);
    Ok(narrowed)
}

fn validate_no_missing_ports(
    vertex: &Vertex,
    symbols: &SymbolTable,
    path: &CompositePath,
) -> Result<(), InferenceError> {
    if let VertexKind::Primitive(_) = &vertex.kind {
        for port in vertex.ports.values() {
            if port.role == PortRole::Input && matches!(port.endpoint, Endpoint::Unbound) {
                return Err(InferenceError::MissingPort {
                    path: path.to_string(),
                    vertex: vertex.local_name.clone(),
                    port: symbols.name_of(port.name).to_string(),
                });
            }
        }
    }
    Ok(())
}
