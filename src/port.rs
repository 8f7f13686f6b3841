//! The port & connection graph (C5): vertices (primitives or nested
//! composites), the ports on each vertex, and the connection endpoints that
//! link them.

use crate::primitives::PrimitiveOp;
use crate::shape::ShapeTerm;
use crate::symbol::KeyId;
use crate::types::Type;
use crate::unify::PortValueId;
use indexmap::IndexMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortRole {
    Input,
    Output,
}

/// A build-time constant pinned to a port (§4.5).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl LiteralValue {
    pub fn ty(&self) -> Type {
        match self {
            LiteralValue::Bool(_) => Type::bool_(),
            LiteralValue::Int(_) => Type::int(),
            LiteralValue::Float(_) => Type::float(),
        }
    }
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Int(n) => write!(f, "{}", n),
            LiteralValue::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A reference to a port on another submodel within the same composite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRef {
    pub submodel: String,
    pub port: KeyId,
}

/// How an input (or output, for the external-alias case) port obtains its
/// value (§4.5).
#[derive(Clone, Debug, PartialEq)]
pub enum Endpoint {
    Unbound,
    External {
        alias: KeyId,
        annotation: Option<Type>,
    },
    Literal(LiteralValue),
    Connect(Vec<EdgeRef>),
}

/// An output port may *additionally* be exposed under an external alias
/// while also being consumed internally by other vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputExposure {
    pub alias: Option<KeyId>,
}

#[derive(Clone, Debug)]
pub struct Port {
    pub name: KeyId,
    pub role: PortRole,
    pub shape: ShapeTerm,
    pub ty: Type,
    pub endpoint: Endpoint,
    pub exposure: OutputExposure,
    pub value: PortValueId,
}

impl Port {
    pub fn new(name: KeyId, role: PortRole, shape: ShapeTerm, ty: Type, value: PortValueId) -> Self {
        Port {
            name,
            role,
            shape,
            ty,
            endpoint: Endpoint::Unbound,
            exposure: OutputExposure::default(),
            value,
        }
    }
}

/// Either a primitive op or a nested graph (C5).
pub enum VertexKind {
    Primitive(PrimitiveOp),
    Composite(Graph),
}

/// A vertex in the port graph: its own ports, plus either a primitive tag or
/// a nested composite.
pub struct Vertex {
    pub local_name: String,
    pub ports: IndexMap<KeyId, Port>,
    pub kind: VertexKind,
}

/// A composite vertex's internals: its submodels (in declared order) and
/// which external aliases it promotes to its own boundary (§3, §4.5).
pub struct Graph {
    pub submodels: IndexMap<String, Vertex>,
    /// `None` means `exposed_keys` was omitted from the description; per
    /// the decision recorded in DESIGN.md this composite still implicitly
    /// exposes every alias name mentioned in its connections table.
    pub exposed_keys: Option<Vec<KeyId>>,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            submodels: IndexMap::new(),
            exposed_keys: None,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
