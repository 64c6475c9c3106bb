//! Execution state: scope stack plus cursor

use super::error::{InterpResult, RuntimeError};
use super::scope::{ScopeStack, Variable};
use crate::program::Cursor;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Shared handle to an execution state. Cloning the handle aliases the
/// state; use [`ExecutionState::deep_copy`] for an isolated one.
pub type StateRef = Rc<RefCell<ExecutionState>>;

/// Machine state
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    scopes: ScopeStack,
    cursor: Cursor,
}

impl ExecutionState {
    /// Fresh state with a single global scope, cursor at the first statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state positioned at `cursor`
    pub fn at(cursor: Cursor) -> Self {
        ExecutionState {
            scopes: ScopeStack::new(),
            cursor,
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> StateRef {
        Rc::new(RefCell::new(self))
    }

    /// Independent clone of every scope and the cursor
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn advance(&mut self) {
        self.cursor = self.cursor.next();
    }

    pub fn push_scope(&mut self) -> usize {
        self.scopes.push_scope()
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop_scope();
    }

    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn create_variable(&mut self, name: &str) -> InterpResult<&mut Variable> {
        self.scopes.create(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.scopes.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.scopes.get_mut(name)
    }

    /// Current value of `name`
    pub fn value_of(&self, name: &str) -> InterpResult<i64> {
        self.variable(name)
            .map(Variable::get)
            .ok_or_else(|| RuntimeError::unresolved_variable(name))
    }

    /// Overwrite an existing variable
    pub fn assign(&mut self, name: &str, value: i64) -> InterpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| RuntimeError::unresolved_variable(name))?;
        var.set(value);
        Ok(())
    }

    /// Every variable visible from the current scope
    pub fn visible_bindings(&self) -> BTreeMap<String, i64> {
        self.scopes.visible()
    }
}
