//! Typed values produced by expression lowering.

use std::rc::Rc;

use crate::{
    ir::ir::{Constant, Operand, StorageClass},
    types::types::TypeId,
};

/// An addressable object. `location` is the address of its storage.
/// Temporaries holding call results and initializers can be read through
/// but are not `assignable`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub storage: StorageClass,
    pub location: Operand,
    pub ty: TypeId,
    pub assignable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInstance {
    pub name: String,
    pub ty: TypeId,
    pub storage: StorageClass,
}

impl FunctionInstance {
    /// The symbol address, typed as a pointer to the function.
    pub fn address(&self, pointer: TypeId) -> Constant {
        Constant::Address {
            symbol: self.name.clone(),
            offset: 0,
            ty: pointer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Known at compile time. `literal` marks a value written in the source
    /// (or folded from such values only) that may still adopt the type its
    /// context expects.
    Constant { value: Constant, literal: bool },
    /// A computed scalar, or the address of a computed aggregate.
    Rvalue(Operand),
    Variable(Rc<Variable>),
    Function(Rc<FunctionInstance>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: TypeId,
}

impl Value {
    pub fn constant(value: Constant, ty: TypeId) -> Self {
        Value {
            kind: ValueKind::Constant {
                value,
                literal: false,
            },
            ty,
        }
    }

    pub fn literal(value: Constant, ty: TypeId) -> Self {
        Value {
            kind: ValueKind::Constant {
                value,
                literal: true,
            },
            ty,
        }
    }

    pub fn rvalue(operand: Operand, ty: TypeId) -> Self {
        Value {
            kind: ValueKind::Rvalue(operand),
            ty,
        }
    }

    pub fn variable(variable: Variable) -> Self {
        let ty = variable.ty;
        Value {
            kind: ValueKind::Variable(Rc::new(variable)),
            ty,
        }
    }

    /// The same value, no longer usable as an assignment target.
    pub fn into_temporary(self) -> Self {
        match self.kind {
            ValueKind::Variable(variable) => Value::variable(Variable {
                assignable: false,
                ..(*variable).clone()
            }),
            kind => Value { kind, ty: self.ty },
        }
    }

    /// The result of a call to a function returning nothing.
    pub fn void() -> Self {
        Value::constant(Constant::Zero(TypeId::VOID), TypeId::VOID)
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match &self.kind {
            ValueKind::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Rc<Variable>> {
        match &self.kind {
            ValueKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ValueKind::Constant { literal: true, .. })
    }

    /// Integer payload of a constant value.
    pub fn as_int(&self) -> Option<i128> {
        self.as_constant().and_then(Constant::as_int)
    }
}
