//! The union-find solver (C4) plus the top-level shape/type unification
//! entry points.
//!
//! Three independent union-find structures are bundled into one explicit
//! `Solver` context (Design Notes §9: "the solver must be an explicit
//! parameter passed through the inference driver, not ambient process
//! state"), so that multiple graphs can be inferred independently:
//!
//! - `dims`: equivalence classes over [`DimId`], each optionally bound to a
//!   concrete integer.
//! - `shape_vars`: equivalence classes over [`ShapeVarId`] (the `...`
//!   placeholders), each optionally bound to a concrete [`DimAtom`] sequence.
//! - `values`: equivalence classes over [`PortValueId`], used purely to
//!   track "these two ports carry the same value" for static-key
//!   propagation (C7); carries no payload of its own.

use crate::shape::{DimAtom, ShapeTerm, ShapeVarId};
use crate::symbol::DimId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    RankMismatch { expected: usize, found: usize },
    DimMismatch {
        position: usize,
        expected: u64,
        found: u64,
    },
}

struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new() -> Self {
        UnionFind {
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }

    fn fresh(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, x: u32) -> u32 {
        if self.parent[x as usize] != x {
            let root = self.find(self.parent[x as usize]);
            self.parent[x as usize] = root;
        }
        self.parent[x as usize]
    }

    /// Unions the two classes, returning `(new_root, merged)` where `merged`
    /// is `false` if they were already the same class (no-op, used by the
    /// driver to detect a stable fixpoint).
    fn union(&mut self, a: u32, b: u32) -> (u32, bool) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return (ra, false);
        }
        let (lo, hi) = if self.rank[ra as usize] < self.rank[rb as usize] {
            (rb, ra)
        } else {
            (ra, rb)
        };
        self.parent[hi as usize] = lo;
        if self.rank[lo as usize] == self.rank[hi as usize] {
            self.rank[lo as usize] += 1;
        }
        (lo, true)
    }
}

/// The explicit solver context threaded through the inference driver (C4).
pub struct Solver {
    dims: UnionFind,
    dim_concrete: Vec<Option<u64>>,
    shape_vars: UnionFind,
    shape_concrete: Vec<Option<Vec<DimAtom>>>,
    values: UnionFind,
    /// Bumped on every class merge or concrete binding; the driver loops
    /// the constraint phase until a pass leaves this unchanged (§4.6).
    revision: u64,
}

impl Solver {
    pub fn new() -> Self {
        Solver {
            dims: UnionFind::new(),
            dim_concrete: Vec::new(),
            shape_vars: UnionFind::new(),
            shape_concrete: Vec::new(),
            values: UnionFind::new(),
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // -- dims --------------------------------------------------------

    pub fn fresh_dim_class(&mut self, id: DimId) {
        let idx = self.dims.fresh();
        debug_assert_eq!(idx, id.0);
        self.dim_concrete.push(None);
    }

    fn dim_root(&mut self, id: DimId) -> u32 {
        self.dims.find(id.0)
    }

    pub fn dim_binding(&mut self, id: DimId) -> Option<u64> {
        let r = self.dim_root(id);
        self.dim_concrete[r as usize]
    }

    fn bind_dim_concrete(&mut self, id: DimId, value: u64) -> Result<(), ShapeError> {
        let r = self.dim_root(id);
        match self.dim_concrete[r as usize] {
            Some(existing) if existing != value => Err(ShapeError::DimMismatch {
                position: 0,
                expected: existing,
                found: value,
            }),
            Some(_) => Ok(()),
            None => {
                self.dim_concrete[r as usize] = Some(value);
                self.revision += 1;
                Ok(())
            }
        }
    }

    fn unify_vars(&mut self, a: DimId, b: DimId) -> Result<(), ShapeError> {
        let ra = self.dim_root(a);
        let rb = self.dim_root(b);
        let ca = self.dim_concrete[ra as usize];
        let cb = self.dim_concrete[rb as usize];
        let (new_root, merged) = self.dims.union(ra, rb);
        let merged_value = match (ca, cb) {
            (Some(x), Some(y)) if x != y => {
                return Err(ShapeError::DimMismatch {
                    position: 0,
                    expected: x,
                    found: y,
                })
            }
            (Some(x), _) => Some(x),
            (_, Some(y)) => Some(y),
            (None, None) => None,
        };
        if merged {
            self.revision += 1;
        }
        // Re-anchor the binding at whichever index survived as root; both
        // dim_concrete slots for the old roots stay allocated (indices are
        // never reused), we just make sure the *root's* slot is correct.
        self.dim_concrete[new_root as usize] = merged_value;
        Ok(())
    }

    pub fn unify_atoms(&mut self, a: DimAtom, b: DimAtom) -> Result<(), ShapeError> {
        match (a, b) {
            (DimAtom::Concrete(x), DimAtom::Concrete(y)) => {
                if x == y {
                    Ok(())
                } else {
                    Err(ShapeError::DimMismatch {
                        position: 0,
                        expected: x,
                        found: y,
                    })
                }
            }
            (DimAtom::Concrete(x), DimAtom::Var(v)) | (DimAtom::Var(v), DimAtom::Concrete(x)) => {
                self.bind_dim_concrete(v, x)
            }
            (DimAtom::Var(a), DimAtom::Var(b)) => self.unify_vars(a, b),
        }
    }

    pub fn unify_atom_seqs(&mut self, a: &[DimAtom], b: &[DimAtom]) -> Result<(), ShapeError> {
        if a.len() != b.len() {
            return Err(ShapeError::RankMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        for (pos, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            self.unify_atoms(*x, *y).map_err(|e| match e {
                ShapeError::DimMismatch { expected, found, .. } => ShapeError::DimMismatch {
                    position: pos,
                    expected,
                    found,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// Resolves a dim atom to its canonical, display-ready form: concrete if
    /// bound, otherwise the class's root id (for per-table `uN` numbering).
    pub fn resolve_atom(&mut self, atom: DimAtom) -> DimAtom {
        match atom {
            DimAtom::Concrete(n) => DimAtom::Concrete(n),
            DimAtom::Var(v) => {
                let r = self.dim_root(v);
                match self.dim_concrete[r as usize] {
                    Some(n) => DimAtom::Concrete(n),
                    None => DimAtom::Var(DimId(r)),
                }
            }
        }
    }

    // -- shape vars (variadic placeholders) ---------------------------

    pub fn fresh_shape_var(&mut self) -> ShapeVarId {
        let idx = self.shape_vars.fresh();
        self.shape_concrete.push(None);
        ShapeVarId(idx)
    }

    fn shape_root(&mut self, id: ShapeVarId) -> u32 {
        self.shape_vars.find(id.0)
    }

    fn bind_shape_var(&mut self, id: ShapeVarId, seq: &[DimAtom]) -> Result<(), ShapeError> {
        let r = self.shape_root(id);
        match self.shape_concrete[r as usize].clone() {
            Some(existing) => self.unify_atom_seqs(&existing, seq),
            None => {
                self.shape_concrete[r as usize] = Some(seq.to_vec());
                self.revision += 1;
                Ok(())
            }
        }
    }

    fn unify_shape_vars(&mut self, a: ShapeVarId, b: ShapeVarId) -> Result<(), ShapeError> {
        let ra = self.shape_root(a);
        let rb = self.shape_root(b);
        let ca = self.shape_concrete[ra as usize].clone();
        let cb = self.shape_concrete[rb as usize].clone();
        let (new_root, merged) = self.shape_vars.union(ra, rb);
        let merged_value = match (ca, cb) {
            (Some(x), Some(y)) => {
                self.unify_atom_seqs(&x, &y)?;
                Some(x)
            }
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        };
        if merged {
            self.revision += 1;
        }
        self.shape_concrete[new_root as usize] = merged_value;
        Ok(())
    }

    pub fn shape_var_binding(&mut self, id: ShapeVarId) -> Option<Vec<DimAtom>> {
        let r = self.shape_root(id);
        self.shape_concrete[r as usize].clone()
    }

    // -- shape terms ----------------------------------------------------

    /// Unifies two shape terms per §4.3, resolving variadics as needed.
    pub fn unify_shapes(&mut self, a: &ShapeTerm, b: &ShapeTerm) -> Result<(), ShapeError> {
        match (a, b) {
            (ShapeTerm::Scalar, ShapeTerm::Scalar) => Ok(()),
            (ShapeTerm::Scalar, ShapeTerm::Fixed(v)) | (ShapeTerm::Fixed(v), ShapeTerm::Scalar) => {
                if v.is_empty() {
                    Ok(())
                } else {
                    Err(ShapeError::RankMismatch {
                        expected: 0,
                        found: v.len(),
                    })
                }
            }
            (ShapeTerm::Scalar, ShapeTerm::Variadic(id)) | (ShapeTerm::Variadic(id), ShapeTerm::Scalar) => {
                self.bind_shape_var(*id, &[])
            }
            (ShapeTerm::Fixed(x), ShapeTerm::Fixed(y)) => self.unify_atom_seqs(x, y),
            (ShapeTerm::Variadic(id), ShapeTerm::Fixed(v)) | (ShapeTerm::Fixed(v), ShapeTerm::Variadic(id)) => {
                self.bind_shape_var(*id, v)
            }
            (ShapeTerm::Variadic(a), ShapeTerm::Variadic(b)) => self.unify_shape_vars(*a, *b),
        }
    }

    /// Resolves a shape term to a display-ready form: scalar stays scalar,
    /// fixed/variadic resolve every atom to concrete-or-root.
    pub fn resolve_shape(&mut self, term: &ShapeTerm) -> ShapeTerm {
        match term {
            ShapeTerm::Scalar => ShapeTerm::Scalar,
            ShapeTerm::Fixed(v) => {
                ShapeTerm::Fixed(v.iter().map(|a| self.resolve_atom(*a)).collect())
            }
            ShapeTerm::Variadic(id) => match self.shape_var_binding(*id) {
                Some(v) => ShapeTerm::Fixed(v.iter().map(|a| self.resolve_atom(*a)).collect()),
                None => ShapeTerm::Variadic(*id),
            },
        }
    }

    // -- value identity (for static propagation, C7) ---------------------

    pub fn fresh_value(&mut self) -> PortValueId {
        PortValueId(self.values.fresh())
    }

    pub fn value_root(&mut self, id: PortValueId) -> PortValueId {
        PortValueId(self.values.find(id.0))
    }

    pub fn union_values(&mut self, a: PortValueId, b: PortValueId) -> PortValueId {
        let (root, _) = self.values.union(a.0, b.0);
        PortValueId(root)
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(id: u32) -> DimAtom {
        DimAtom::Var(DimId(id))
    }

    #[test]
    fn unify_concrete_equal_ok() {
        let mut s = Solver::new();
        assert!(s.unify_atoms(DimAtom::Concrete(3), DimAtom::Concrete(3)).is_ok());
    }

    #[test]
    fn unify_concrete_mismatch_errors() {
        let mut s = Solver::new();
        let e = s.unify_atoms(DimAtom::Concrete(3), DimAtom::Concrete(4));
        assert!(matches!(e, Err(ShapeError::DimMismatch { .. })));
    }

    #[test]
    fn var_binds_to_concrete_then_conflict_detected() {
        let mut s = Solver::new();
        s.fresh_dim_class(DimId(0));
        s.unify_atoms(var(0), DimAtom::Concrete(5)).unwrap();
        assert_eq!(s.dim_binding(DimId(0)), Some(5));
        let e = s.unify_atoms(var(0), DimAtom::Concrete(6));
        assert!(e.is_err());
    }

    #[test]
    fn var_var_union_propagates_binding() {
        let mut s = Solver::new();
        s.fresh_dim_class(DimId(0));
        s.fresh_dim_class(DimId(1));
        s.unify_atoms(var(0), DimAtom::Concrete(7)).unwrap();
        s.unify_atoms(var(0), var(1)).unwrap();
        assert_eq!(s.dim_binding(DimId(1)), Some(7));
    }

    #[test]
    fn rank_mismatch_on_fixed_shapes() {
        let mut s = Solver::new();
        let a = ShapeTerm::Fixed(vec![DimAtom::Concrete(1), DimAtom::Concrete(2)]);
        let b = ShapeTerm::Fixed(vec![DimAtom::Concrete(1)]);
        assert!(matches!(
            s.unify_shapes(&a, &b),
            Err(ShapeError::RankMismatch { .. })
        ));
    }

    #[test]
    fn scalar_vs_rank_one_is_rank_mismatch() {
        let mut s = Solver::new();
        let scalar = ShapeTerm::Scalar;
        let rank1 = ShapeTerm::Fixed(vec![DimAtom::Concrete(1)]);
        assert!(matches!(
            s.unify_shapes(&scalar, &rank1),
            Err(ShapeError::RankMismatch { .. })
        ));
    }

    #[test]
    fn variadic_binds_to_fixed_then_reunifies() {
        let mut s = Solver::new();
        let v = s.fresh_shape_var();
        let fixed = ShapeTerm::Fixed(vec![DimAtom::Concrete(2), DimAtom::Concrete(3)]);
        s.unify_shapes(&ShapeTerm::Variadic(v), &fixed).unwrap();
        let other = ShapeTerm::Fixed(vec![DimAtom::Concrete(2), DimAtom::Concrete(3)]);
        assert!(s.unify_shapes(&ShapeTerm::Variadic(v), &other).is_ok());
        let conflict = ShapeTerm::Fixed(vec![DimAtom::Concrete(9)]);
        assert!(s.unify_shapes(&ShapeTerm::Variadic(v), &conflict).is_err());
    }
}
