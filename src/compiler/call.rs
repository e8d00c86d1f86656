//! Calling convention.
//!
//! A function type is classified once. Results and parameters of at most
//! one machine word travel directly, aggregates as raw bits. Larger results
//! are written through a hidden first parameter pointing at storage the
//! caller provides, and larger parameters are passed as the address of a
//! copy made at the call site. Parameters marked `ref` always pass the
//! address of the caller's object.

use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::expressions::{Expr, ExprKind},
    errors::errors::{Error, ErrorImpl},
    ir::ir::{BlockId, Instr, Operand, ParamClass, StorageClass},
    types::types::{NameType, TypeId, TypeTable},
    Span,
};

use super::{
    compiler::{error, Compiler},
    expr::lower_expression,
    value::{Value, ValueKind, Variable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnClass {
    Void,
    /// In a register. An aggregate result travels as its raw bits.
    Direct { aggregate: bool },
    /// Written through the hidden return slot.
    Indirect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Abi {
    pub ret: ReturnClass,
    pub params: Vec<ParamClass>,
}

impl Abi {
    /// Classifies a function type. Fails with the return type when it has
    /// no size yet.
    pub fn classify(types: &TypeTable, ty: TypeId) -> Result<Abi, TypeId> {
        let Some((params, ret)) = types.function_parts(ty) else {
            return Err(ty);
        };

        let ret = if types.is_void(ret) {
            ReturnClass::Void
        } else if types.size_of(ret).is_none() {
            return Err(ret);
        } else if types.fits_word(ret) {
            ReturnClass::Direct {
                aggregate: types.is_aggregate(ret),
            }
        } else {
            ReturnClass::Indirect
        };

        let params = params
            .iter()
            .map(|param| {
                if param.by_reference() {
                    ParamClass::ByReference
                } else if types.fits_word(param.ty) {
                    ParamClass::Direct
                } else {
                    ParamClass::Indirect
                }
            })
            .collect();

        Ok(Abi { ret, params })
    }
}

impl<'m> Compiler<'m> {
    /// The classification of a function type, computed on first use.
    pub fn abi(&mut self, ty: TypeId, span: &Span) -> Result<Rc<Abi>, Error> {
        if let Some(abi) = self.abi_cache.get(&ty) {
            return Ok(abi.clone());
        }

        match Abi::classify(&self.types, ty) {
            Ok(abi) => {
                debug!(ty = %self.types.name(ty), ret = ?abi.ret, params = ?abi.params, "classified function type");
                let abi = Rc::new(abi);
                self.abi_cache.insert(ty, abi.clone());
                Ok(abi)
            }
            Err(incomplete) => Err(error(
                ErrorImpl::IncompleteType {
                    type_: self.types.name(incomplete),
                },
                span,
            )),
        }
    }

    /// Classifies a freshly resolved function type when its result type is
    /// already known. Others are classified at their first call.
    pub fn classify_function(&mut self, ty: TypeId) {
        if !self.types.is_function(ty) || self.abi_cache.contains_key(&ty) {
            return;
        }

        if let Ok(abi) = Abi::classify(&self.types, ty) {
            debug!(ty = %self.types.name(ty), ret = ?abi.ret, "classified function type");
            self.abi_cache.insert(ty, Rc::new(abi));
        }
    }

    /// Storage holding `value`: its own when it is a variable, otherwise a
    /// fresh slot it is written to.
    fn materialize(&mut self, value: Value, ty: TypeId, span: &Span) -> Result<Operand, Error> {
        if let ValueKind::Variable(variable) = &value.kind {
            return Ok(variable.location.clone());
        }

        let slot = self.alloca(ty, span)?;
        self.store_into(&slot, value, ty, span)?;
        Ok(slot)
    }

    /// Lowers an argument for a parameter of type `ty`.
    fn argument(&mut self, arg: &Expr, ty: TypeId, index: usize) -> Result<Value, Error> {
        self.lower_converted(arg, ty).map_err(|failure| match failure.get_impl() {
            ErrorImpl::TypeMismatch { expected, received } if failure.get_span() == &arg.span => error(
                ErrorImpl::ArgumentTypeMismatch {
                    index,
                    expected: expected.clone(),
                    received: received.clone(),
                },
                &arg.span,
            ),
            _ => failure,
        })
    }

    /// Lowers `callee(args)`. With `slot`, an aggregate result of the slot's
    /// type is written straight into it.
    pub fn lower_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        slot: Option<(&Operand, TypeId)>,
        span: &Span,
    ) -> Result<Value, Error> {
        if !self.in_function() {
            return Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("a call"),
                },
                span,
            ));
        }

        let callee_value = lower_expression(self, callee)?;
        let function_ty = match &callee_value.kind {
            ValueKind::Function(instance) => Some(instance.ty),
            _ => self
                .types
                .pointee(callee_value.ty)
                .filter(|pointee| self.types.is_function(*pointee)),
        };

        let Some((function_ty, (params, ret))) = function_ty.and_then(|ty| {
            self.types
                .function_parts(ty)
                .map(|(params, ret)| (ty, (params.to_vec(), ret)))
        }) else {
            return Err(error(
                ErrorImpl::NotCallable {
                    type_: self.types.name(callee_value.ty),
                },
                &callee.span,
            ));
        };

        let target = self.operand(&callee_value, &callee.span)?;
        let abi = self.abi(function_ty, span)?;

        if args.len() != params.len() {
            return Err(error(
                ErrorImpl::ArityMismatch {
                    expected: params.len(),
                    received: args.len(),
                },
                span,
            ));
        }

        let mut operands = vec![];
        for (index, ((arg, param), class)) in args.iter().zip(params.iter()).zip(abi.params.iter()).enumerate() {
            operands.push(self.pass_argument(arg, param, *class, index)?);
        }

        let ret_size = self.types.size_of(ret).unwrap_or(0);
        let slot = slot
            .filter(|(_, ty)| self.types.equal(*ty, ret))
            .map(|(operand, _)| operand.clone());

        match abi.ret {
            ReturnClass::Void => {
                self.emit(
                    "a call",
                    span,
                    Instr::Call {
                        dest: None,
                        callee: target,
                        ty: function_ty,
                        args: operands,
                    },
                )?;
                Ok(Value::void())
            }
            ReturnClass::Direct { aggregate: false } => {
                let result = self.emit_temp("a call", span, |dest| Instr::Call {
                    dest: Some(dest),
                    callee: target,
                    ty: function_ty,
                    args: operands,
                })?;
                Ok(Value::rvalue(result, ret))
            }
            ReturnClass::Direct { aggregate: true } => {
                let bits = self.emit_temp("a call", span, |dest| Instr::Call {
                    dest: Some(dest),
                    callee: target,
                    ty: function_ty,
                    args: operands,
                })?;

                let (location, storage) = self.result_slot(slot, ret, span)?;
                self.emit(
                    "a call",
                    span,
                    Instr::StoreBits {
                        size: ret_size,
                        addr: location.clone(),
                        value: bits,
                    },
                )?;
                Ok(call_result(location, storage, ret))
            }
            ReturnClass::Indirect => {
                let (location, storage) = self.result_slot(slot, ret, span)?;
                operands.insert(0, location.clone());
                self.emit(
                    "a call",
                    span,
                    Instr::Call {
                        dest: None,
                        callee: target,
                        ty: function_ty,
                        args: operands,
                    },
                )?;
                Ok(call_result(location, storage, ret))
            }
        }
    }

    fn result_slot(&mut self, slot: Option<Operand>, ret: TypeId, span: &Span) -> Result<(Operand, StorageClass), Error> {
        match slot {
            Some(slot) => Ok((slot, StorageClass::Reference)),
            None => Ok((self.alloca(ret, span)?, StorageClass::Private)),
        }
    }

    fn pass_argument(&mut self, arg: &Expr, param: &NameType, class: ParamClass, index: usize) -> Result<Operand, Error> {
        let span = &arg.span;

        match class {
            ParamClass::ByReference => {
                let value = lower_expression(self, arg)?;
                let Some(variable) = value.as_variable().filter(|variable| variable.assignable) else {
                    return Err(error(ErrorImpl::NotAddressable, span));
                };

                if !self.types.equal(variable.ty, param.ty) {
                    return Err(error(
                        ErrorImpl::ArgumentTypeMismatch {
                            index,
                            expected: self.types.name(param.ty),
                            received: self.types.name(variable.ty),
                        },
                        span,
                    ));
                }

                Ok(variable.location.clone())
            }
            ParamClass::Direct if self.types.is_aggregate(param.ty) => {
                let value = self.argument(arg, param.ty, index)?;
                let size = self.types.size_of(param.ty).unwrap_or(0);
                let addr = self.materialize(value, param.ty, span)?;
                self.emit_temp("a call", span, |dest| Instr::LoadBits { dest, size, addr })
            }
            ParamClass::Direct => {
                let value = self.argument(arg, param.ty, index)?;
                self.operand(&value, span)
            }
            ParamClass::Indirect | ParamClass::ReturnSlot => {
                let copy = self.alloca(param.ty, span)?;
                if let ExprKind::Initializer { .. } = arg.kind {
                    self.lower_initializer(arg, Some(param.ty), Some(&copy))?;
                } else {
                    let value = self.argument(arg, param.ty, index)?;
                    self.store_into(&copy, value, param.ty, span)?;
                }
                Ok(copy)
            }
        }
    }

    /// Lowers `return` or `return value`.
    pub fn lower_return(&mut self, value: Option<&Expr>, span: &Span) -> Result<(), Error> {
        let (ret, abi) = {
            let context = self.context("a return", span)?;
            (context.ret, context.abi.clone())
        };

        let mismatch = |compiler: &Self, received: String| {
            error(
                ErrorImpl::ReturnMismatch {
                    expected: compiler.types.name(ret),
                    received,
                },
                span,
            )
        };

        let Some(expr) = value else {
            if abi.ret != ReturnClass::Void {
                return Err(mismatch(self, self.types.name(TypeId::VOID)));
            }
            self.builder("a return", span)?.ret(None);
            return Ok(());
        };

        if abi.ret == ReturnClass::Void {
            let value = lower_expression(self, expr)?;
            return Err(mismatch(self, self.types.name(value.ty)));
        }

        match abi.ret {
            ReturnClass::Indirect => {
                self.lower_into(expr, &Operand::Param(0), ret)
                    .map_err(|failure| self.return_mismatch(failure, expr, ret, span))?;
                let epilogue = self.epilogue(span)?;
                self.builder("a return", span)?.jump(epilogue);
            }
            ReturnClass::Direct { aggregate: true } => {
                let value = self
                    .lower_converted(expr, ret)
                    .map_err(|failure| self.return_mismatch(failure, expr, ret, span))?;
                let size = self.types.size_of(ret).unwrap_or(0);
                let addr = self.materialize(value, ret, span)?;
                let bits = self.emit_temp("a return", span, |dest| Instr::LoadBits { dest, size, addr })?;
                self.builder("a return", span)?.ret(Some(bits));
            }
            _ => {
                let value = self
                    .lower_converted(expr, ret)
                    .map_err(|failure| self.return_mismatch(failure, expr, ret, span))?;
                let operand = self.operand(&value, span)?;
                self.builder("a return", span)?.ret(Some(operand));
            }
        }

        Ok(())
    }

    /// A type mismatch on the returned expression itself is reported as a
    /// return mismatch.
    fn return_mismatch(&self, failure: Error, expr: &Expr, ret: TypeId, span: &Span) -> Error {
        match failure.get_impl() {
            ErrorImpl::TypeMismatch { received, .. } if failure.get_span() == &expr.span => error(
                ErrorImpl::ReturnMismatch {
                    expected: self.types.name(ret),
                    received: received.clone(),
                },
                span,
            ),
            _ => failure,
        }
    }

    /// The shared block every `return` of an indirectly returning function
    /// jumps to once the slot is written.
    fn epilogue(&mut self, span: &Span) -> Result<BlockId, Error> {
        let context = self.context("a return", span)?;
        if let Some(epilogue) = context.epilogue {
            return Ok(epilogue);
        }

        let builder = &mut context.builder;
        let epilogue = builder.new_block("epilogue");
        let saved = builder.save_cursor();
        builder.position_at(epilogue);
        builder.ret(None);
        builder.restore_cursor(saved);

        context.epilogue = Some(epilogue);
        Ok(epilogue)
    }
}

/// The variable holding an aggregate call result.
fn call_result(location: Operand, storage: StorageClass, ty: TypeId) -> Value {
    Value::variable(Variable {
        name: String::from("()"),
        storage,
        location,
        ty,
        assignable: false,
    })
}
