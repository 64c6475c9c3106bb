//! Scope arena for variable storage
//!
//! Scopes live in a `Vec` addressed by index. Each scope records the index of
//! its parent instead of holding a pointer to it, so a child never keeps its
//! parent alive and a deep copy is a plain `clone()` that preserves the chain.

use super::error::{InterpResult, RuntimeError};
use std::collections::{BTreeMap, HashMap};

/// Named integer cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Variable {
    value: i64,
}

impl Variable {
    pub fn new(value: i64) -> Self {
        Variable { value }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    pub fn set(&mut self, value: i64) {
        self.value = value;
    }
}

/// One binding environment
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<String, Variable>,
    parent: Option<usize>,
}

impl Scope {
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Bindings owned by this scope only
    pub fn bindings(&self) -> &HashMap<String, Variable> {
        &self.vars
    }
}

/// Stack of scopes, index 0 is global
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// Create a new scope stack with a global scope
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::default()],
        }
    }

    /// Push a new scope whose parent is the current one.
    /// Returns the new scope depth (for debugging)
    pub fn push_scope(&mut self) -> usize {
        let parent = self.scopes.len() - 1;
        self.scopes.push(Scope {
            vars: HashMap::new(),
            parent: Some(parent),
        });
        self.scopes.len() - 1
    }

    /// Pop the current scope from the stack
    /// Panics if trying to pop the global scope
    pub fn pop_scope(&mut self) {
        if self.scopes.len() <= 1 {
            panic!("Cannot pop global scope");
        }
        self.scopes.pop();
    }

    /// Number of scopes on the chain of the current scope
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Current (innermost) scope
    pub fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    /// Scope indices from innermost to global
    fn chain(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.scopes.len() - 1), |&index| {
            self.scopes[index].parent
        })
    }

    /// Index of the scope owning `name`, searching innermost first
    fn owner(&self, name: &str) -> Option<usize> {
        self.chain()
            .find(|&index| self.scopes[index].vars.contains_key(name))
    }

    /// Create a zero-valued variable in the current scope.
    /// Fails if the name already resolves anywhere on the chain.
    pub fn create(&mut self, name: &str) -> InterpResult<&mut Variable> {
        if self.owner(name).is_some() {
            return Err(RuntimeError::duplicate_variable(name));
        }
        let index = self.scopes.len() - 1;
        Ok(self.scopes[index]
            .vars
            .entry(name.to_string())
            .or_default())
    }

    /// Look up a variable, searching from current scope to global
    pub fn get(&self, name: &str) -> Option<&Variable> {
        let index = self.owner(name)?;
        self.scopes[index].vars.get(name)
    }

    /// Mutable lookup; the write lands in the owning scope
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let index = self.owner(name)?;
        self.scopes[index].vars.get_mut(name)
    }

    /// Check if a variable exists in any scope of the chain
    pub fn contains(&self, name: &str) -> bool {
        self.owner(name).is_some()
    }

    /// Every visible binding, keyed by name
    pub fn visible(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for index in self.chain() {
            for (name, var) in &self.scopes[index].vars {
                out.entry(name.clone()).or_insert(var.get());
            }
        }
        out
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
