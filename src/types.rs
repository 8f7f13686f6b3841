//! The value-type lattice (C2): scalar/tensor types with union refinement.
//!
//! Design Notes §9 call for a small bit-packed set since the scalar universe
//! is fixed (`Bool | Int | Float`); join/meet become bitwise OR/AND.

use std::fmt;

pub const BOOL: u8 = 0b001;
pub const INT: u8 = 0b010;
pub const FLOAT: u8 = 0b100;
pub const ALL_SCALAR: u8 = BOOL | INT | FLOAT;

/// An element of the type lattice: a set of scalar atoms plus an optional
/// tensor atom (itself carrying its own nonempty element-set).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    scalars: u8,
    tensor: Option<u8>,
}

impl Type {
    pub const fn bottom() -> Self {
        Type {
            scalars: 0,
            tensor: None,
        }
    }

    pub const fn scalar(mask: u8) -> Self {
        Type {
            scalars: mask,
            tensor: None,
        }
    }

    pub const fn bool_() -> Self {
        Self::scalar(BOOL)
    }

    pub const fn int() -> Self {
        Self::scalar(INT)
    }

    pub const fn float() -> Self {
        Self::scalar(FLOAT)
    }

    pub const fn tensor(elem_mask: u8) -> Self {
        Type {
            scalars: 0,
            tensor: Some(elem_mask),
        }
    }

    pub const fn any() -> Self {
        Type {
            scalars: ALL_SCALAR,
            tensor: Some(ALL_SCALAR),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.scalars == 0 && self.tensor.is_none()
    }

    /// Least upper bound: widens to admit anything either side admits.
    pub fn join(&self, other: &Type) -> Type {
        Type {
            scalars: self.scalars | other.scalars,
            tensor: match (self.tensor, other.tensor) {
                (Some(a), Some(b)) => Some(a | b),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            },
        }
    }

    /// Greatest lower bound: narrows to only what both sides admit.
    pub fn meet(&self, other: &Type) -> Type {
        Type {
            scalars: self.scalars & other.scalars,
            tensor: match (self.tensor, other.tensor) {
                (Some(a), Some(b)) => {
                    let m = a & b;
                    if m == 0 {
                        None
                    } else {
                        Some(m)
                    }
                }
                _ => None,
            },
        }
    }

    pub fn contains_bool(&self) -> bool {
        self.scalars & BOOL != 0
    }

    pub fn contains_int(&self) -> bool {
        self.scalars & INT != 0
    }

    pub fn contains_float(&self) -> bool {
        self.scalars & FLOAT != 0
    }
}

fn atom_names(mask: u8) -> Vec<&'static str> {
    let mut v = Vec::new();
    if mask & BOOL != 0 {
        v.push("bool");
    }
    if mask & FLOAT != 0 {
        v.push("float");
    }
    if mask & INT != 0 {
        v.push("int");
    }
    v
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "!");
        }
        let mut parts: Vec<String> = atom_names(self.scalars).into_iter().map(String::from).collect();
        if let Some(t) = self.tensor {
            parts.push(format!("Tensor[{}]", atom_names(t).join(" | ")));
        }
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_widens() {
        let a = Type::bool_();
        let b = Type::int();
        let j = a.join(&b);
        assert!(j.contains_bool() && j.contains_int() && !j.contains_float());
    }

    #[test]
    fn meet_narrows_and_can_bottom_out() {
        let a = Type::bool_();
        let b = Type::int();
        let m = a.meet(&b);
        assert!(m.is_bottom());
    }

    #[test]
    fn meet_on_tensor_elements() {
        let a = Type::tensor(ALL_SCALAR);
        let b = Type::tensor(INT | FLOAT);
        let m = a.meet(&b);
        assert_eq!(m.to_string(), "Tensor[float | int]");
    }

    #[test]
    fn display_canonical_order() {
        let t = Type::scalar(ALL_SCALAR);
        assert_eq!(t.to_string(), "bool | float | int");
    }
}
