//! Interner for key names and allocator for fresh dimension variables (C1).
//!
//! Key interning is idempotent; dim-var allocation is monotonic and driven by
//! a strict preorder traversal of the graph (§5). Display of a dim-var is
//! computed separately, per composite, at summary-rendering time (§4.1) —
//! this table only hands out opaque ids.

use std::collections::HashMap;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u32);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimId(pub u32);

#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    by_name: HashMap<String, KeyId>,
    dim_var_count: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_key(&mut self, name: &str) -> KeyId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = KeyId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn name_of(&self, id: KeyId) -> &str {
        &self.names[id.0 as usize]
    }

    /// Looks up an already-interned key without creating one (used to match
    /// `static_input_shapes` names against aliases that appear in the graph).
    pub fn lookup_key(&self, name: &str) -> Option<KeyId> {
        self.by_name.get(name).copied()
    }

    pub fn fresh_dim_var(&mut self) -> DimId {
        let id = DimId(self.dim_var_count);
        self.dim_var_count += 1;
        id
    }
}
