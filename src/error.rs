//! Structured diagnostics for the inference pipeline.
//!
//! Mirrors the teacher crate's `GraphError`: a single closed enum, derived
//! with `thiserror`, carrying enough context (a composite path plus the
//! offending names) that a caller can point a user at the exact spot in the
//! graph description that failed.

use std::fmt;

/// A dotted path identifying a composite vertex, e.g. `Model.m3.m2`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositePath(Vec<String>);

impl CompositePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut v = self.0.clone();
        v.push(name.into());
        Self(v)
    }
}

impl fmt::Display for CompositePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Every fatal condition the engine can raise. All variants are terminal:
/// the solver never produces a best-effort partial result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// Two shape terms were unified with differing rank.
    #[error("rank mismatch at {path}: port `{port}` has rank {expected}, got rank {found}")]
    RankMismatch {
        path: String,
        port: String,
        expected: usize,
        found: usize,
    },

    /// Two concrete dims were unified with different integer values.
    #[error("dim mismatch at {path}: port `{port}` position {position} expected {expected}, got {found}")]
    DimMismatch {
        path: String,
        port: String,
        position: usize,
        expected: u64,
        found: u64,
    },

    /// The meet of two types was empty.
    #[error("type conflict at {path}: port `{port}` cannot unify types `{lhs}` and `{rhs}`")]
    TypeConflict {
        path: String,
        port: String,
        lhs: String,
        rhs: String,
    },

    /// A connection named a submodel or port that does not exist.
    #[error("unknown reference at {path}: `{reference}` does not exist")]
    UnknownReference { path: String, reference: String },

    /// Connections formed a directed cycle among non-nested vertices.
    #[error("cycle detected at {path}: {cycle}")]
    Cycle { path: String, cycle: String },

    /// A primitive's declared port was neither connected, aliased, nor annotated.
    #[error("missing port at {path}: port `{port}` on vertex `{vertex}` was never bound")]
    MissingPort {
        path: String,
        vertex: String,
        port: String,
    },

    /// Two internal ports both claimed the same outward alias with incompatible
    /// types/shapes.
    #[error("ambiguous exposure at {path}: alias `{alias}` is claimed by incompatible ports")]
    AmbiguousExposure { path: String, alias: String },

    /// The graph description or static-input directive was not well-formed
    /// JSON for the expected shape (C9); JSON loading itself sits outside
    /// the inference core, so this variant just carries the loader's message.
    #[error("failed to parse graph description: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
