//! Schema dependency tracking for component schemas.
//!
//! The resolver owns two sets: names that were referenced but may not have been turned
//! into a component yet (`required`, kept in reference order), and names that already
//! have a component (`emitted`). A name is emitted at most once, which keeps every
//! `$ref` in the document backed by exactly one component even when structs reference
//! themselves or each other.

use crate::schema_generator::SchemaOrReference;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::collections::HashSet;

/// Prefix of every component schema reference
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Build the `$ref` pointer for a component schema
pub fn schema_ref(name: &str) -> String {
    format!("{}{}", SCHEMA_REF_PREFIX, name)
}

/// Work queue and bookkeeping for component schema emission
#[derive(Debug, Default)]
pub struct SchemaResolver {
    /// Referenced names, oldest first
    required: IndexSet<String>,
    /// Names that already have a component
    emitted: HashSet<String>,
    /// Components produced so far, in emission order
    schemas: IndexMap<String, SchemaOrReference>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference to `name` and return its `$ref` pointer.
    ///
    /// Names that are already emitted are not queued again.
    pub fn require(&mut self, name: &str) -> String {
        if !self.emitted.contains(name) && self.required.insert(name.to_string()) {
            debug!("Schema {} is now required", name);
        }
        schema_ref(name)
    }

    /// Add a component schema unless one with this name was already emitted.
    ///
    /// Returns `true` if the schema was added.
    pub fn emit(&mut self, name: &str, schema: SchemaOrReference) -> bool {
        if !self.emitted.insert(name.to_string()) {
            debug!("Schema for {} already exists", name);
            return false;
        }
        debug!("Emitting schema {}", name);
        self.schemas.insert(name.to_string(), schema);
        true
    }

    /// Treat `name` as emitted without storing a schema (it is supplied elsewhere)
    pub fn mark_emitted(&mut self, name: &str) {
        self.emitted.insert(name.to_string());
    }

    pub fn is_emitted(&self, name: &str) -> bool {
        self.emitted.contains(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    pub fn has_pending(&self) -> bool {
        !self.required.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.required.len()
    }

    /// Drop the `count` oldest required names after a resolution pass over them.
    ///
    /// Names queued during the pass stay for the next one.
    pub fn settle(&mut self, count: usize) {
        let count = count.min(self.required.len());
        self.required.drain(..count);
    }

    /// Components emitted so far
    pub fn schemas(&self) -> &IndexMap<String, SchemaOrReference> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, SchemaOrReference> {
        self.schemas
    }
}
