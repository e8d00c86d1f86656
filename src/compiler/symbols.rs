//! Global and local symbol tables.
//!
//! The global table maps every top-level name to what it resolved to. It is
//! filled lazily: an entry is created the first time the name is needed and
//! reused afterwards. While an entry is being resolved it is marked
//! in-progress so that a definition depending on itself is reported instead
//! of recursing forever, and a failed entry stays failed so its dependents
//! can report the cascade.
//!
//! Locals live in a stack of frames, one per lexical block.

use std::{collections::HashMap, rc::Rc};

use crate::types::types::TypeId;

use super::value::{FunctionInstance, Value, Variable};

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalEntry {
    Type(TypeId),
    Constant(Value),
    Variable(Rc<Variable>),
    Function(Rc<FunctionInstance>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalSlot {
    InProgress,
    Resolved(GlobalEntry),
    Failed,
}

#[derive(Debug, Default)]
pub struct GlobalTable {
    slots: HashMap<String, GlobalSlot>,
}

impl GlobalTable {
    pub fn get(&self, name: &str) -> Option<&GlobalSlot> {
        self.slots.get(name)
    }

    pub fn entry(&self, name: &str) -> Option<&GlobalEntry> {
        match self.slots.get(name) {
            Some(GlobalSlot::Resolved(entry)) => Some(entry),
            _ => None,
        }
    }

    pub fn begin(&mut self, name: &str) {
        self.slots.insert(name.to_string(), GlobalSlot::InProgress);
    }

    pub fn resolve(&mut self, name: &str, entry: GlobalEntry) {
        self.slots
            .insert(name.to_string(), GlobalSlot::Resolved(entry));
    }

    pub fn fail(&mut self, name: &str) {
        self.slots.insert(name.to_string(), GlobalSlot::Failed);
    }

    pub fn is_failed(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(GlobalSlot::Failed))
    }
}

/// The lexical scope chain of one function. Frames bind variables only;
/// functions are always global.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<HashMap<String, Rc<Variable>>>,
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes {
            frames: vec![HashMap::new()],
        }
    }
}

impl Scopes {
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pops the innermost frame. The root frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds a name in the innermost frame. Returns `false` when the frame
    /// already has it.
    pub fn bind(&mut self, name: &str, variable: Rc<Variable>) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };

        if frame.contains_key(name) {
            return false;
        }

        frame.insert(name.to_string(), variable);
        true
    }

    /// Walks outward from the innermost frame.
    pub fn lookup(&self, name: &str) -> Option<&Rc<Variable>> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}
