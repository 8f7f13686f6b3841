//! Shape terms (C3): an ordered sequence of dimension atoms.

use crate::symbol::DimId;

/// A single position in a shape: either a concrete size or an unknown dim.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DimAtom {
    Concrete(u64),
    Var(DimId),
}

/// An opaque id for a variadic "rest of the shape" placeholder (`...`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeVarId(pub u32);

/// A port's shape: no shape at all (`--`), a fixed-rank sequence of atoms,
/// or a variadic placeholder that elides to a concrete sequence once bound
/// to a connected port (§3, §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeTerm {
    Scalar,
    Fixed(Vec<DimAtom>),
    Variadic(ShapeVarId),
}
