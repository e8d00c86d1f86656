//! Conversions between types.
//!
//! Implicit conversions are narrow: a value keeps its type unless it is an
//! untyped literal adopting the type its context expects, or a pointer to
//! `unknown` meeting a concrete pointer. Everything else takes an explicit
//! `as`, which follows a fixed matrix over integers, bools, reals and
//! pointers.

use std::rc::Rc;

use crate::{
    errors::errors::{Error, ErrorImpl},
    ir::ir::{CastKind, CompareOp, Constant, Instr, Operand},
    types::types::TypeId,
    Span,
};

use super::{
    compiler::{error, Compiler},
    constant::{fits, normalize, sign_extend, zero_extend},
    value::{Value, ValueKind, Variable},
};

fn round_real(value: f64, to: TypeId) -> f64 {
    if to == TypeId::REAL32 {
        value as f32 as f64
    } else {
        value
    }
}

impl<'m> Compiler<'m> {
    fn out_of_range(&self, value: i128, ty: TypeId, span: &Span) -> Error {
        error(
            ErrorImpl::LiteralOutOfRange {
                value: value.to_string(),
                type_: self.types.name(ty),
            },
            span,
        )
    }

    fn mismatch(&self, expected: TypeId, received: TypeId, span: &Span) -> Error {
        error(
            ErrorImpl::TypeMismatch {
                expected: self.types.name(expected),
                received: self.types.name(received),
            },
            span,
        )
    }

    /// The same value seen through another type. Constants carry their type
    /// inside and are rebuilt; everything else only changes its tag.
    pub fn retype(&self, value: Value, to: TypeId) -> Value {
        let kind = match value.kind {
            ValueKind::Constant { value: constant, .. } => {
                let constant = match constant {
                    Constant::Int { value, .. } => Constant::Int { value, ty: to },
                    Constant::Real { value, .. } => Constant::Real { value, ty: to },
                    Constant::Address { symbol, offset, .. } => Constant::Address { symbol, offset, ty: to },
                    Constant::Zero(_) => Constant::Zero(to),
                    Constant::Aggregate { elements, .. } => Constant::Aggregate { ty: to, elements },
                    Constant::Union { member, value, .. } => Constant::Union { ty: to, member, value },
                    other => other,
                };
                ValueKind::Constant {
                    value: constant,
                    literal: false,
                }
            }
            ValueKind::Variable(variable) => ValueKind::Variable(Rc::new(Variable {
                ty: to,
                ..(*variable).clone()
            })),
            kind => kind,
        };

        Value { kind, ty: to }
    }

    /// Gives an untyped literal the type `to` when it can represent it.
    /// `Ok(None)` means the literal cannot adopt a type of that kind.
    fn adapt_literal(&self, value: &Value, to: TypeId, span: &Span) -> Result<Option<Value>, Error> {
        let Some(constant) = value.as_constant() else {
            return Ok(None);
        };

        match constant {
            Constant::Int { value, .. } => {
                if let Some((bits, signed)) = self.types.int_info(to) {
                    if !fits(*value, bits, signed) {
                        return Err(self.out_of_range(*value, to, span));
                    }
                    return Ok(Some(Value::constant(Constant::Int { value: *value, ty: to }, to)));
                }

                if self.types.is_real(to) {
                    let real = round_real(*value as f64, to);
                    return Ok(Some(Value::constant(Constant::Real { value: real, ty: to }, to)));
                }

                Ok(None)
            }
            Constant::Real { value, .. } if self.types.is_real(to) => Ok(Some(Value::constant(
                Constant::Real {
                    value: round_real(*value, to),
                    ty: to,
                },
                to,
            ))),
            _ => Ok(None),
        }
    }

    /// Converts `value` to `to` without an explicit cast.
    pub fn recast_implicit(&mut self, value: Value, to: TypeId, span: &Span) -> Result<Value, Error> {
        if value.ty == to {
            return Ok(value);
        }

        if value.is_literal() {
            return match self.adapt_literal(&value, to, span)? {
                Some(adapted) => Ok(adapted),
                None => Err(self.mismatch(to, value.ty, span)),
            };
        }

        if self.types.equal(value.ty, to) {
            return Ok(self.retype(value, to));
        }

        let pointers = self.types.is_pointer(value.ty) && self.types.is_pointer(to);
        if pointers && (self.types.is_opaque_pointer(value.ty) || self.types.is_opaque_pointer(to)) {
            return Ok(self.retype(value, to));
        }

        Err(self.mismatch(to, value.ty, span))
    }

    /// Turns an untyped literal into a typed constant of its default type.
    pub fn settle(&self, value: Value, span: &Span) -> Result<Value, Error> {
        if !value.is_literal() {
            return Ok(value);
        }

        if let (Some(literal), Some((bits, signed))) = (value.as_int(), self.types.int_info(value.ty)) {
            if !fits(literal, bits, signed) {
                return Err(self.out_of_range(literal, value.ty, span));
            }
        }

        match value.kind {
            ValueKind::Constant { value: constant, .. } => Ok(Value::constant(constant, value.ty)),
            kind => Ok(Value { kind, ty: value.ty }),
        }
    }

    fn cast(&mut self, value: &Value, kind: CastKind, to: TypeId, span: &Span) -> Result<Value, Error> {
        let from = value.ty;
        let operand = self.operand(value, span)?;
        let result = self.emit_temp("a recast", span, |dest| Instr::Cast {
            dest,
            kind,
            from,
            to,
            value: operand,
        })?;
        Ok(Value::rvalue(result, to))
    }

    /// Explicit conversion, `value as to`.
    pub fn recast(&mut self, value: Value, to: TypeId, span: &Span) -> Result<Value, Error> {
        let value = if value.is_literal() {
            match self.adapt_literal(&value, to, span) {
                Ok(Some(adapted)) => return Ok(adapted),
                _ => self.settle(value, span)?,
            }
        } else {
            value
        };

        // The result of `as` is never an lvalue.
        let value = match value.as_variable().map(|variable| self.types.is_aggregate(variable.ty)) {
            Some(true) => value.into_temporary(),
            Some(false) => {
                let operand = self.operand(&value, span)?;
                Value::rvalue(operand, value.ty)
            }
            None => value,
        };

        let from = value.ty;
        if from == to || self.types.equal(from, to) {
            return Ok(self.retype(value, to));
        }

        let constant = value.as_constant().cloned();

        if let (Some((from_bits, _)), Some((to_bits, to_signed))) = (self.types.int_info(from), self.types.int_info(to)) {
            let kind = if to_bits < from_bits {
                Some(CastKind::Trunc)
            } else if to_bits == from_bits {
                None
            } else if to_signed {
                Some(CastKind::SignExtend)
            } else {
                Some(CastKind::ZeroExtend)
            };

            if let Some(x) = constant.as_ref().and_then(Constant::as_int) {
                let extended = match kind {
                    Some(CastKind::SignExtend) => sign_extend(x, from_bits),
                    Some(CastKind::ZeroExtend) => zero_extend(x, from_bits),
                    _ => x,
                };
                let folded = normalize(extended, to_bits, to_signed);
                return Ok(Value::constant(Constant::Int { value: folded, ty: to }, to));
            }

            return match kind {
                Some(kind) => self.cast(&value, kind, to, span),
                None => Ok(self.retype(value, to)),
            };
        }

        if self.types.is_bool(from) && self.types.is_integer(to) {
            if let Some(Constant::Bool(b)) = constant {
                return Ok(Value::constant(Constant::Int { value: b as i128, ty: to }, to));
            }
            return self.cast(&value, CastKind::ZeroExtend, to, span);
        }

        if self.types.is_integer(from) && self.types.is_bool(to) {
            if let Some(x) = constant.as_ref().and_then(Constant::as_int) {
                return Ok(Value::constant(Constant::Bool(x != 0), TypeId::BOOL));
            }

            let operand = self.operand(&value, span)?;
            let result = self.emit_temp("a recast", span, |dest| Instr::Compare {
                dest,
                op: CompareOp::Ne,
                ty: from,
                lhs: operand,
                rhs: Operand::Const(Constant::Int { value: 0, ty: from }),
            })?;
            return Ok(Value::rvalue(result, TypeId::BOOL));
        }

        if self.types.is_integer(from) && self.types.is_real(to) {
            if let Some(x) = constant.as_ref().and_then(Constant::as_int) {
                let real = round_real(x as f64, to);
                return Ok(Value::constant(Constant::Real { value: real, ty: to }, to));
            }

            let kind = if self.types.is_signed(from) {
                CastKind::SignedToFloat
            } else {
                CastKind::UnsignedToFloat
            };
            return self.cast(&value, kind, to, span);
        }

        if self.types.is_real(from) {
            if let Some((bits, signed)) = self.types.int_info(to) {
                if let Some(Constant::Real { value: x, .. }) = constant {
                    let folded = normalize(x.trunc() as i128, bits, signed);
                    return Ok(Value::constant(Constant::Int { value: folded, ty: to }, to));
                }

                let kind = if signed {
                    CastKind::FloatToSigned
                } else {
                    CastKind::FloatToUnsigned
                };
                return self.cast(&value, kind, to, span);
            }

            if self.types.is_real(to) {
                if let Some(Constant::Real { value: x, .. }) = constant {
                    return Ok(Value::constant(
                        Constant::Real {
                            value: round_real(x, to),
                            ty: to,
                        },
                        to,
                    ));
                }

                let kind = if to == TypeId::REAL32 {
                    CastKind::FloatTrunc
                } else {
                    CastKind::FloatExtend
                };
                return self.cast(&value, kind, to, span);
            }
        }

        if self.types.is_pointer(from) {
            if self.types.is_pointer(to) {
                return Ok(self.retype(value, to));
            }

            if let Some((bits, signed)) = self.types.int_info(to) {
                if let Some(x) = constant.as_ref().and_then(Constant::as_int) {
                    return Ok(Value::constant(
                        Constant::Int {
                            value: normalize(x, bits, signed),
                            ty: to,
                        },
                        to,
                    ));
                }
                return self.cast(&value, CastKind::PtrToInt, to, span);
            }
        }

        if self.types.is_integer(from) && self.types.is_pointer(to) {
            if let Some(x) = constant.as_ref().and_then(Constant::as_int) {
                return Ok(Value::constant(Constant::Int { value: x, ty: to }, to));
            }
            return self.cast(&value, CastKind::IntToPtr, to, span);
        }

        Err(error(
            ErrorImpl::InvalidRecast {
                from: self.types.name(from),
                to: self.types.name(to),
            },
            span,
        ))
    }
}
