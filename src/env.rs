//! The per-compilation symbol environment.
//!
//! Holds every `set` and `:macro` binding seen so far, in document
//! order. There is no global or lazily-initialized state here: a fresh
//! [`Environment`] is built for each call to [`crate::api::compile`]
//! and never escapes it.

use std::collections::HashMap;

use crate::expander::ResolvedNode;
use crate::tree::Node;

/// A fully resolved binding, ready for variable substitution or
/// splicing.
///
/// `Subtree` holds already-expanded content: a `set` block whose body
/// is a template subtree is expanded once, at the point the binding is
/// processed (using the environment as of that point in document
/// order), rather than re-expanded on every later reference.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Literal(String),
    RawString(String),
    Subtree(Vec<ResolvedNode>),
}

/// A macro definition, stored with its body still in tree form; the
/// expander clones and re-walks the body on every invocation, since
/// each call may supply different arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDefinition {
    pub parameterized: bool,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Value(BoundValue),
    Macro(MacroDefinition),
}

/// Names live in a single namespace: a `set` and a `:macro` cannot
/// share a name.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    entries: HashMap<String, Entry>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, reporting a conflict only when `name` is
    /// already bound to a macro -- rebinding a plain `set` name is a
    /// normal redefinition, not a conflict.
    pub fn bind_value(&mut self, name: &str, value: BoundValue) -> bool {
        let conflict = matches!(self.entries.get(name), Some(Entry::Macro(_)));
        self.entries.insert(name.to_string(), Entry::Value(value));
        conflict
    }

    /// Bind `name` to a macro definition, reporting a conflict only
    /// when `name` is already bound to a `set` value.
    pub fn bind_macro(&mut self, name: &str, def: MacroDefinition) -> bool {
        let conflict = matches!(self.entries.get(name), Some(Entry::Value(_)));
        self.entries.insert(name.to_string(), Entry::Macro(def));
        conflict
    }

    pub fn lookup_value(&self, name: &str) -> Option<&BoundValue> {
        match self.entries.get(name) {
            Some(Entry::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn lookup_macro(&self, name: &str) -> Option<&MacroDefinition> {
        match self.entries.get(name) {
            Some(Entry::Macro(m)) => Some(m),
            _ => None,
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_bound_as_macro(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Entry::Macro(_)))
    }
}
