//! Braced initializers.
//!
//! `{...}` takes its type from the context, `T{...}` names it. Elements are
//! placed by position, by `[index] =` or by `.member =`; a positional element
//! goes right after the previous one. Inside a function the initializer is
//! written into storage element by element. Without a function it folds to
//! one constant with zeroes in the gaps.

use std::collections::BTreeMap;

use tracing::trace;

use crate::{
    ast::expressions::{Expr, ExprKind, InitElement, InitTag},
    errors::errors::{Error, ErrorImpl},
    ir::ir::{Constant, Instr, Operand, StorageClass},
    types::types::{TypeId, TypeKind},
    Span,
};

use super::{
    compiler::{error, Compiler},
    constant::zero_constant,
    expr::lower_expression,
    value::{Value, Variable},
};

impl<'m> Compiler<'m> {
    /// Lowers `expr`, a braced initializer. `context` is the type the
    /// surrounding code expects; `dest` is storage to write into instead of
    /// a fresh temporary.
    pub fn lower_initializer(
        &mut self,
        expr: &Expr,
        context: Option<TypeId>,
        dest: Option<&Operand>,
    ) -> Result<Value, Error> {
        let ExprKind::Initializer { ty, elements } = &expr.kind else {
            return match context {
                Some(ty) => self.lower_converted(expr, ty),
                None => lower_expression(self, expr),
            };
        };
        let span = &expr.span;

        let ty = match (ty, context) {
            (Some(annotation), context) => {
                let ty = self.resolve_type(annotation, false)?;
                if let Some(expected) = context {
                    if !self.types.equal(ty, expected) {
                        return Err(error(
                            ErrorImpl::TypeMismatch {
                                expected: self.types.name(expected),
                                received: self.types.name(ty),
                            },
                            span,
                        ));
                    }
                }
                ty
            }
            (None, Some(context)) => context,
            (None, None) => {
                return Err(error(
                    ErrorImpl::InvalidInitializer {
                        type_: self.types.name(TypeId::UNKNOWN),
                    },
                    span,
                ))
            }
        };

        if !self.types.is_aggregate(ty) {
            return Err(error(
                ErrorImpl::InvalidInitializer {
                    type_: self.types.name(ty),
                },
                span,
            ));
        }

        let entries = self.initializer_entries(ty, elements, span)?;
        trace!(ty = %self.types.name(ty), elements = entries.len(), "lowering initializer");

        if self.in_function() {
            self.runtime_initializer(ty, &entries, dest, span)
        } else {
            self.constant_aggregate(ty, &entries, span)
        }
    }

    /// Places every element at its index. Later elements override earlier
    /// ones at the same index.
    fn initializer_entries<'e>(
        &mut self,
        ty: TypeId,
        elements: &'e [InitElement],
        span: &Span,
    ) -> Result<BTreeMap<u64, &'e InitElement>, Error> {
        let is_union = matches!(self.types.kind(ty), TypeKind::Union { .. });
        let is_array = matches!(self.types.kind(ty), TypeKind::Array { .. });

        if is_union && elements.len() != 1 {
            return Err(error(ErrorImpl::UnionInitializer { count: elements.len() }, span));
        }

        let count = self.types.element_count(ty).unwrap_or(0) as i128;
        let mut entries = BTreeMap::new();
        let mut next: i128 = 0;

        for element in elements {
            let index = match &element.tag {
                None => next,
                Some(InitTag::Index(tag)) => self.initializer_tag(tag)?,
                Some(InitTag::Member(member)) => {
                    let index = if is_array {
                        None
                    } else {
                        self.types.member_index(ty, member)
                    };

                    match index {
                        Some(index) => index as i128,
                        None => {
                            return Err(error(
                                ErrorImpl::NoSuchMember {
                                    type_: self.types.name(ty),
                                    member: member.clone(),
                                },
                                &element.span,
                            ))
                        }
                    }
                }
            };

            if index < 0 || index >= count {
                return Err(error(
                    ErrorImpl::IndexOutOfBounds {
                        index,
                        type_: self.types.name(ty),
                    },
                    &element.span,
                ));
            }

            entries.insert(index as u64, element);
            next = index + 1;
        }

        Ok(entries)
    }

    /// The value of an `[index] =` tag.
    fn initializer_tag(&mut self, tag: &Expr) -> Result<i128, Error> {
        let value = lower_expression(self, tag)?;
        if value.as_constant().is_none() {
            return Err(error(ErrorImpl::NonConstantTag, &tag.span));
        }
        let value = self.settle(value, &tag.span)?;

        if value.as_constant().is_some_and(Constant::is_relocatable) {
            return Err(error(ErrorImpl::RelocatableConstant, &tag.span));
        }

        match value.as_int() {
            Some(index) if self.types.is_integer(value.ty) => Ok(index),
            _ => Err(error(
                ErrorImpl::TypeMismatch {
                    expected: String::from("integer"),
                    received: self.types.name(value.ty),
                },
                &tag.span,
            )),
        }
    }

    fn runtime_initializer(
        &mut self,
        ty: TypeId,
        entries: &BTreeMap<u64, &InitElement>,
        dest: Option<&Operand>,
        span: &Span,
    ) -> Result<Value, Error> {
        let (location, storage) = match dest {
            Some(dest) => (dest.clone(), StorageClass::Reference),
            None => (self.alloca(ty, span)?, StorageClass::Private),
        };

        let size = self.types.size_of(ty).unwrap_or(0);
        if !self.covers(ty, entries) {
            self.emit(
                "an initializer",
                span,
                Instr::Zero {
                    addr: location.clone(),
                    size,
                },
            )?;
        }

        for (index, element) in entries {
            let Some((element_ty, offset)) = self.types.element(ty, *index) else {
                continue;
            };

            let pointer = self.types.pointer_to(element_ty);
            let address = self.offset_address(&location, offset, pointer, &element.span)?;
            self.lower_into(&element.value, &address, element_ty)?;
        }

        Ok(Value::variable(Variable {
            name: String::from("{}"),
            storage,
            location,
            ty,
            assignable: false,
        }))
    }

    /// Whether the elements write every byte of the aggregate.
    fn covers(&self, ty: TypeId, entries: &BTreeMap<u64, &InitElement>) -> bool {
        match self.types.kind(ty) {
            TypeKind::Union { members } => entries.keys().all(|index| {
                members
                    .get(*index as usize)
                    .and_then(|member| self.types.size_of(member.ty))
                    == self.types.size_of(ty)
            }),
            TypeKind::Struct { .. } => {
                let members_size: u64 = entries
                    .keys()
                    .filter_map(|index| self.types.element(ty, *index))
                    .filter_map(|(member, _)| self.types.size_of(member))
                    .sum();
                entries.len() as u64 == self.types.element_count(ty).unwrap_or(0)
                    && Some(members_size) == self.types.size_of(ty)
            }
            _ => entries.len() as u64 == self.types.element_count(ty).unwrap_or(0),
        }
    }

    fn constant_element(&mut self, expr: &Expr, ty: TypeId) -> Result<Constant, Error> {
        let value = self.lower_converted(expr, ty)?;
        match value.as_constant() {
            Some(constant) => Ok(constant.clone()),
            None => Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the initializer"),
                },
                &expr.span,
            )),
        }
    }

    fn constant_aggregate(
        &mut self,
        ty: TypeId,
        entries: &BTreeMap<u64, &InitElement>,
        span: &Span,
    ) -> Result<Value, Error> {
        if entries.is_empty() {
            return Ok(Value::constant(Constant::Zero(ty), ty));
        }

        if let TypeKind::Union { .. } = self.types.kind(ty) {
            let Some((member, element)) = entries.iter().next() else {
                return Ok(Value::constant(Constant::Zero(ty), ty));
            };
            let Some((member_ty, _)) = self.types.element(ty, *member) else {
                return Err(error(
                    ErrorImpl::IndexOutOfBounds {
                        index: *member as i128,
                        type_: self.types.name(ty),
                    },
                    span,
                ));
            };

            let value = self.constant_element(&element.value, member_ty)?;
            return Ok(Value::constant(
                Constant::Union {
                    ty,
                    member: *member as usize,
                    value: Box::new(value),
                },
                ty,
            ));
        }

        let count = self.types.element_count(ty).unwrap_or(0);
        let mut constants = Vec::with_capacity(count as usize);

        for index in 0..count {
            let Some((element_ty, _)) = self.types.element(ty, index) else {
                continue;
            };

            let constant = match entries.get(&index) {
                Some(element) => self.constant_element(&element.value, element_ty)?,
                None => zero_constant(&self.types, element_ty),
            };
            constants.push(constant);
        }

        Ok(Value::constant(
            Constant::Aggregate {
                ty,
                elements: constants,
            },
            ty,
        ))
    }

    /// Lowers `expr` as a value of type `ty`.
    pub fn lower_converted(&mut self, expr: &Expr, ty: TypeId) -> Result<Value, Error> {
        if let ExprKind::Initializer { .. } = expr.kind {
            return self.lower_initializer(expr, Some(ty), None);
        }

        let value = lower_expression(self, expr)?;
        self.recast_implicit(value, ty, &expr.span)
    }

    /// Lowers `expr` straight into the storage at `dest`, of type `ty`.
    /// Initializers and calls write there without a temporary.
    pub fn lower_into(&mut self, expr: &Expr, dest: &Operand, ty: TypeId) -> Result<(), Error> {
        let value = match &expr.kind {
            ExprKind::Initializer { .. } => self.lower_initializer(expr, Some(ty), Some(dest))?,
            ExprKind::Call { callee, args } => {
                let value = self.lower_call(callee, args, Some((dest, ty)), &expr.span)?;
                self.recast_implicit(value, ty, &expr.span)?
            }
            _ => self.lower_converted(expr, ty)?,
        };

        self.store_into(dest, value, ty, &expr.span)
    }
}
