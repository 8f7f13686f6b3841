//! The primitive operator registry (C6 rule templates).
//!
//! Design Notes §9: "a closed variant plus a rule dispatch table is
//! preferable to open polymorphism; new primitives extend the tag set."
//! Each variant below owns a `declared_ports` template that freshens its
//! own dim-vars/shape-vars on every instantiation and hands back the
//! vertex's ports in declared order (inputs, then outputs).

use crate::port::PortRole;
use crate::shape::{DimAtom, ShapeTerm};
use crate::symbol::SymbolTable;
use crate::types::Type;
use crate::unify::Solver;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveOp {
    Relu,
    Sigmoid,
    LeakyRelu,
    Add,
    Multiply,
    Linear,
    RBFKernel,
}

impl PrimitiveOp {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveOp::Relu => "Relu",
            PrimitiveOp::Sigmoid => "Sigmoid",
            PrimitiveOp::LeakyRelu => "LeakyRelu",
            PrimitiveOp::Add => "Add",
            PrimitiveOp::Multiply => "Multiply",
            PrimitiveOp::Linear => "Linear",
            PrimitiveOp::RBFKernel => "RBFKernel",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Relu" => PrimitiveOp::Relu,
            "Sigmoid" => PrimitiveOp::Sigmoid,
            "LeakyRelu" => PrimitiveOp::LeakyRelu,
            "Add" => PrimitiveOp::Add,
            "Multiply" => PrimitiveOp::Multiply,
            "Linear" => PrimitiveOp::Linear,
            "RBFKernel" => PrimitiveOp::RBFKernel,
            _ => return None,
        })
    }

    /// Every primitive in the registry is purely functional (§4.7): its
    /// output is static whenever all its inputs are.
    pub fn is_purely_functional(&self) -> bool {
        true
    }

    /// Instantiates this op's declared ports, freshening dim-vars/shape-vars
    /// as needed. Returned in declared order: inputs first, then outputs.
    pub fn declared_ports(
        &self,
        symbols: &mut SymbolTable,
        solver: &mut Solver,
    ) -> Vec<(&'static str, PortRole, ShapeTerm, Type)> {
        use PortRole::*;
        match self {
            PrimitiveOp::Relu | PrimitiveOp::LeakyRelu => {
                let shape = fresh_variadic(solver);
                vec![
                    ("input", Input, shape.clone(), Type::any()),
                    ("output", Output, shape, Type::any()),
                ]
            }
            PrimitiveOp::Sigmoid => {
                let shape = fresh_variadic(solver);
                vec![
                    ("input", Input, shape.clone(), Type::any()),
                    ("output", Output, shape, Type::float().join(&Type::tensor(crate::types::FLOAT))),
                ]
            }
            PrimitiveOp::Add | PrimitiveOp::Multiply => {
                let shape = fresh_variadic(solver);
                vec![
                    ("left", Input, shape.clone(), Type::any()),
                    ("right", Input, shape.clone(), Type::any()),
                    ("output", Output, shape, Type::any()),
                ]
            }
            PrimitiveOp::Linear => {
                let o = symbols.fresh_dim_var();
                let i = symbols.fresh_dim_var();
                let b = symbols.fresh_dim_var();
                solver.fresh_dim_class(o);
                solver.fresh_dim_class(i);
                solver.fresh_dim_class(b);
                vec![
                    (
                        "weight",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Var(o), DimAtom::Var(i)]),
                        Type::any(),
                    ),
                    (
                        "input",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Var(b), DimAtom::Var(i)]),
                        Type::any(),
                    ),
                    (
                        "bias",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Var(o)]),
                        Type::any(),
                    ),
                    (
                        "output",
                        Output,
                        ShapeTerm::Fixed(vec![DimAtom::Var(b), DimAtom::Var(o)]),
                        Type::any(),
                    ),
                ]
            }
            PrimitiveOp::RBFKernel => {
                let n = symbols.fresh_dim_var();
                let m = symbols.fresh_dim_var();
                let d = symbols.fresh_dim_var();
                solver.fresh_dim_class(n);
                solver.fresh_dim_class(m);
                solver.fresh_dim_class(d);
                vec![
                    (
                        "input1",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Var(n), DimAtom::Var(d)]),
                        Type::any(),
                    ),
                    (
                        "input2",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Var(m), DimAtom::Var(d)]),
                        Type::any(),
                    ),
                    (
                        "sigma",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Concrete(1)]),
                        Type::any(),
                    ),
                    (
                        "l_scale",
                        Input,
                        ShapeTerm::Fixed(vec![DimAtom::Concrete(1)]),
                        Type::any(),
                    ),
                    (
                        "output",
                        Output,
                        ShapeTerm::Fixed(vec![DimAtom::Var(n), DimAtom::Var(m)]),
                        Type::any(),
                    ),
                ]
            }
        }
    }
}

fn fresh_variadic(solver: &mut Solver) -> ShapeTerm {
    ShapeTerm::Variadic(solver.fresh_shape_var())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrips() {
        for op in [
            PrimitiveOp::Relu,
            PrimitiveOp::Sigmoid,
            PrimitiveOp::LeakyRelu,
            PrimitiveOp::Add,
            PrimitiveOp::Multiply,
            PrimitiveOp::Linear,
            PrimitiveOp::RBFKernel,
        ] {
            assert_eq!(PrimitiveOp::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(PrimitiveOp::from_name("Frobnicate"), None);
    }

    #[test]
    fn linear_declares_three_inputs_one_output() {
        let mut symbols = SymbolTable::new();
        let mut solver = Solver::new();
        let ports = PrimitiveOp::Linear.declared_ports(&mut symbols, &mut solver);
        assert_eq!(ports.len(), 4);
        assert_eq!(ports[3].0, "output");
        assert_eq!(ports[3].1, PortRole::Output);
    }
}
