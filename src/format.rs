//! The hierarchical summary formatter (C8, §4.8).
//!
//! One table per composite level, columns `Keys | Shapes | Types |
//! Connections`, sub-composites rendered as their own table afterward in
//! pre-order. Column widths and per-atom alignment are bespoke, so rows are
//! pre-formatted strings handed to `tabled`'s `Builder`, the way the teacher
//! hands pre-rendered node rows to `tabled::Table::new(..)`.

use indexmap::IndexMap;
use tabled::builder::Builder;

use crate::port::{Endpoint, Graph, Port, PortRole, Vertex, VertexKind};
use crate::shape::{DimAtom, ShapeTerm};
use crate::symbol::SymbolTable;
use crate::unify::Solver;

/// Renders the full summary for a built, inferred graph, starting from its
/// outermost name (§4.8: "The outermost table's title is the model's name").
pub fn format_summary(root: &Vertex, model_name: &str, symbols: &SymbolTable, solver: &mut Solver) -> String {
    let mut tables = Vec::new();
    if let VertexKind::Composite(graph) = &root.kind {
        format_vertex_table(model_name, graph, symbols, solver, &mut tables);
    }
    tables.join("\n\n")
}

struct Row {
    key: String,
    atoms: Option<Vec<String>>,
    shape_label: String,
    ty: String,
    conn: String,
}

fn format_vertex_table(
    name: &str,
    graph: &Graph,
    symbols: &SymbolTable,
    solver: &mut Solver,
    out: &mut Vec<String>,
) {
    let mut dim_names: IndexMap<u32, String> = IndexMap::new();
    let mut rows = Vec::new();

    for (sub_name, vertex) in graph.submodels.iter() {
        for port in vertex.ports.values() {
            let key = format!("{}.{}", sub_name, symbols.name_of(port.name));
            let ty = port.ty.to_string();
            let conn = render_connection(port, symbols);
            let resolved = solver.resolve_shape(&port.shape);
            match resolved {
                ShapeTerm::Scalar => rows.push(Row {
                    key,
                    atoms: None,
                    shape_label: "--".to_string(),
                    ty,
                    conn,
                }),
                ShapeTerm::Fixed(atoms) => {
                    let strs = atoms.iter().map(|a| render_atom(a, &mut dim_names)).collect();
                    rows.push(Row {
                        key,
                        atoms: Some(strs),
                        shape_label: String::new(),
                        ty,
                        conn,
                    })
                }
                ShapeTerm::Variadic(_) => rows.push(Row {
                    key,
                    atoms: None,
                    shape_label: "[...]".to_string(),
                    ty,
                    conn,
                }),
            }
        }
    }

    let atom_width = rows
        .iter()
        .filter_map(|r| r.atoms.as_ref())
        .flat_map(|v| v.iter())
        .map(|s| s.len())
        .max()
        .unwrap_or(0);

    let mut builder = Builder::default();
    builder.set_columns(["Keys", "Shapes", "Types", "Connections"]);
    for row in &rows {
        let shape = match &row.atoms {
            Some(atoms) => {
                let padded: Vec<String> = atoms
                    .iter()
                    .map(|a| format!("{:>width$}", a, width = atom_width))
                    .collect();
                format!("[{}]", padded.join(", "))
            }
            None => row.shape_label.clone(),
        };
        builder.add_record([row.key.clone(), shape, row.ty.clone(), row.conn.clone()]);
    }
    out.push(format!("{}\n{}", name, builder.build()));

    for (sub_name, vertex) in graph.submodels.iter() {
        if let VertexKind::Composite(child) = &vertex.kind {
            format_vertex_table(sub_name, child, symbols, solver, out);
        }
    }
}

fn render_connection(port: &Port, symbols: &SymbolTable) -> String {
    if port.role == PortRole::Output {
        return match port.exposure.alias {
            Some(alias) => format!("${}", symbols.name_of(alias)),
            None => "--".to_string(),
        };
    }
    match &port.endpoint {
        Endpoint::External { alias, .. } => format!("${}", symbols.name_of(*alias)),
        Endpoint::Connect(refs) => refs
            .iter()
            .map(|r| format!("{}.{}", r.submodel, symbols.name_of(r.port)))
            .collect::<Vec<_>>()
            .join(", "),
        Endpoint::Literal(v) => v.to_string(),
        Endpoint::Unbound => "--".to_string(),
    }
}

/// Resolves a dim atom to its display string, assigning each distinct
/// unbound class the next `uN` label *within this table* (§4.1).
fn render_atom(atom: &DimAtom, names: &mut IndexMap<u32, String>) -> String {
    match atom {
        DimAtom::Concrete(n) => n.to_string(),
        DimAtom::Var(id) => {
            let next = names.len() + 1;
            names.entry(id.0).or_insert_with(|| format!("u{}", next)).clone()
        }
    }
}
