use std::rc::Rc;

use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, UnaryOp},
    errors::errors::{Error, ErrorImpl},
    ir::ir::{self, ArithOp, CompareOp, Constant, Instr, Operand, StorageClass},
    types::types::{TypeId, TypeKind},
    Span,
};

use super::{
    compiler::{error, Compiler},
    constant::{check_divisor, check_shift, compare, fits, fold_int, fold_real, normalize},
    symbols::GlobalEntry,
    value::{Value, ValueKind, Variable},
};

/// Lowers an expression to a typed value, emitting instructions into the
/// current block when it is not a compile-time constant.
pub fn lower_expression(compiler: &mut Compiler, expr: &Expr) -> Result<Value, Error> {
    let span = &expr.span;

    match &expr.kind {
        ExprKind::Integer(value) => {
            if *value > u64::MAX as i128 {
                return Err(error(
                    ErrorImpl::LiteralOutOfRange {
                        value: value.to_string(),
                        type_: String::from("uint64"),
                    },
                    span,
                ));
            }
            Ok(Value::literal(
                Constant::Int {
                    value: *value,
                    ty: TypeId::INT64,
                },
                TypeId::INT64,
            ))
        }
        ExprKind::Real(value) => Ok(Value::literal(
            Constant::Real {
                value: *value,
                ty: TypeId::REAL64,
            },
            TypeId::REAL64,
        )),
        ExprKind::Bool(value) => Ok(Value::constant(Constant::Bool(*value), TypeId::BOOL)),
        ExprKind::Char(value) => Ok(Value::literal(
            Constant::Int {
                value: *value as i128,
                ty: TypeId::UINT8,
            },
            TypeId::UINT8,
        )),
        ExprKind::String(value) => {
            let ty = compiler.types.pointer_to(TypeId::UINT8);
            Ok(Value::constant(Constant::String(value.as_bytes().to_vec()), ty))
        }
        ExprKind::Identifier(name) => compiler.lower_identifier(name, span),
        ExprKind::Binary { op, left, right } if op.is_logical() => compiler.lower_logical(*op, left, right, span),
        ExprKind::Binary { op, left, right } => {
            let left = lower_expression(compiler, left)?;
            let right = lower_expression(compiler, right)?;
            compiler.binary(*op, left, right, span)
        }
        ExprKind::Assign { op, target, value } => compiler.lower_assign(*op, target, value, span),
        ExprKind::Unary { op, operand } => compiler.lower_unary(*op, operand, span),
        ExprKind::Deref(inner) => compiler.lower_deref(inner, span),
        ExprKind::Member { object, member } => compiler.lower_member(object, member, span),
        ExprKind::Index { object, index } => compiler.lower_index(object, index, span),
        ExprKind::Call { callee, args } => compiler.lower_call(callee, args, None, span),
        ExprKind::Cast { value, ty } => {
            let value = lower_expression(compiler, value)?;
            let to = compiler.resolve_type(ty, false)?;
            compiler.recast(value, to, span)
        }
        ExprKind::SizeOf(inner) => compiler.lower_sizeof(inner, span),
        ExprKind::Initializer { .. } => compiler.lower_initializer(expr, None, None),
        ExprKind::ArrayType { .. }
        | ExprKind::StructType { .. }
        | ExprKind::UnionType { .. }
        | ExprKind::FunctionType { .. } => Err(error(
            ErrorImpl::NotAValue {
                name: String::from("type constructor"),
            },
            span,
        )),
    }
}

impl<'m> Compiler<'m> {
    /// Locals first, then module-level names.
    fn lower_identifier(&mut self, name: &str, span: &Span) -> Result<Value, Error> {
        if let Some(variable) = self.lookup_local(name) {
            let ty = variable.ty;
            return Ok(Value {
                kind: ValueKind::Variable(variable),
                ty,
            });
        }

        match self.global(name, span)? {
            GlobalEntry::Type(_) => Err(error(ErrorImpl::NotAValue { name: name.to_string() }, span)),
            GlobalEntry::Constant(value) => Ok(value),
            GlobalEntry::Variable(variable) => {
                let ty = variable.ty;
                Ok(Value {
                    kind: ValueKind::Variable(variable),
                    ty,
                })
            }
            GlobalEntry::Function(instance) => {
                let ty = instance.ty;
                Ok(Value {
                    kind: ValueKind::Function(instance),
                    ty,
                })
            }
        }
    }

    /// The operand carrying a value. Scalar variables are loaded; aggregates
    /// are carried by address.
    pub fn operand(&mut self, value: &Value, span: &Span) -> Result<Operand, Error> {
        match &value.kind {
            ValueKind::Constant { value: constant, literal } => {
                if let (true, Some(literal), Some((bits, signed))) =
                    (*literal, constant.as_int(), self.types.int_info(value.ty))
                {
                    if !fits(literal, bits, signed) {
                        return Err(error(
                            ErrorImpl::LiteralOutOfRange {
                                value: literal.to_string(),
                                type_: self.types.name(value.ty),
                            },
                            span,
                        ));
                    }
                }
                Ok(Operand::Const(constant.clone()))
            }
            ValueKind::Rvalue(operand) => Ok(operand.clone()),
            ValueKind::Variable(variable) => {
                if self.types.is_aggregate(variable.ty) {
                    return Ok(variable.location.clone());
                }

                let ty = variable.ty;
                let addr = variable.location.clone();
                self.emit_temp("a variable read", span, |dest| Instr::Load { dest, ty, addr })
            }
            ValueKind::Function(instance) => {
                let pointer = self.types.pointer_to(instance.ty);
                Ok(Operand::Const(instance.address(pointer)))
            }
        }
    }

    /// Brings both operands of a binary operator to one type.
    fn unify(&mut self, left: Value, right: Value, span: &Span) -> Result<(Value, Value), Error> {
        match (left.is_literal(), right.is_literal()) {
            (true, true) => {
                let domain = if self.types.is_real(left.ty) || self.types.is_real(right.ty) {
                    TypeId::REAL64
                } else {
                    TypeId::INT64
                };
                Ok((literal_as(left, domain), literal_as(right, domain)))
            }
            (true, false) => {
                let left = self.recast_implicit(left, right.ty, span)?;
                Ok((left, right))
            }
            (false, _) => {
                let right = self.recast_implicit(right, left.ty, span)?;
                Ok((left, right))
            }
        }
    }

    fn check_domain(&self, op: BinaryOp, ty: TypeId, span: &Span) -> Result<(), Error> {
        let types = &self.types;
        let integer = types.is_integer(ty);

        let allowed = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => integer || types.is_real(ty),
            BinaryOp::Rem
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => integer,
            BinaryOp::Eq | BinaryOp::Ne => {
                integer || types.is_real(ty) || types.is_bool(ty) || types.is_pointer(ty)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                integer || types.is_real(ty) || types.is_pointer(ty)
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => types.is_bool(ty),
        };

        if allowed {
            Ok(())
        } else {
            Err(error(
                ErrorImpl::InvalidOperand {
                    operator: op.symbol().to_string(),
                    type_: types.name(ty),
                },
                span,
            ))
        }
    }

    fn fold_binary(&self, op: BinaryOp, left: &Value, right: &Value, span: &Span) -> Result<Option<Value>, Error> {
        let (Some(a), Some(b)) = (left.as_constant(), right.as_constant()) else {
            return Ok(None);
        };
        let ty = left.ty;
        let literal = left.is_literal() && right.is_literal();
        let fail = |kind: ErrorImpl| error(kind, span);

        let folded = match (a, b) {
            (Constant::Int { value: a, .. }, Constant::Int { value: b, .. }) => {
                let Some((bits, signed)) = self.types.int_info(ty) else {
                    return Ok(compare(op, a, b).map(|result| Value::constant(Constant::Bool(result), TypeId::BOOL)));
                };

                if literal {
                    for value in [*a, *b] {
                        if !fits(value, 64, true) {
                            return Err(fail(ErrorImpl::LiteralOutOfRange {
                                value: value.to_string(),
                                type_: self.types.name(TypeId::INT64),
                            }));
                        }
                    }
                }

                if let Some(result) = compare(op, a, b) {
                    Value::constant(Constant::Bool(result), TypeId::BOOL)
                } else {
                    let value = fold_int(op, *a, *b, bits, signed, &self.types.name(ty)).map_err(fail)?;
                    let constant = Constant::Int { value, ty };
                    if literal {
                        Value::literal(constant, ty)
                    } else {
                        Value::constant(constant, ty)
                    }
                }
            }
            (Constant::Real { value: a, .. }, Constant::Real { value: b, .. }) => {
                if let Some(result) = compare(op, a, b) {
                    Value::constant(Constant::Bool(result), TypeId::BOOL)
                } else {
                    let Some(value) = fold_real(op, *a, *b, ty == TypeId::REAL32) else {
                        return Ok(None);
                    };
                    let constant = Constant::Real { value, ty };
                    if literal {
                        Value::literal(constant, ty)
                    } else {
                        Value::constant(constant, ty)
                    }
                }
            }
            (Constant::Bool(a), Constant::Bool(b)) => match compare(op, a, b) {
                Some(result) => Value::constant(Constant::Bool(result), TypeId::BOOL),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(folded))
    }

    /// Lowers a non-logical binary operator over two lowered operands.
    pub fn binary(&mut self, op: BinaryOp, left: Value, right: Value, span: &Span) -> Result<Value, Error> {
        let (left, right) = self.unify(left, right, span)?;
        let ty = left.ty;
        self.check_domain(op, ty, span)?;

        if let Some((bits, _)) = self.types.int_info(ty) {
            let divisor = right.as_int();
            check_divisor(op, divisor).map_err(|kind| error(kind, span))?;
            check_shift(op, divisor, bits, &self.types.name(ty)).map_err(|kind| error(kind, span))?;
        }

        if let Some(folded) = self.fold_binary(op, &left, &right, span)? {
            return Ok(folded);
        }

        let lhs = self.operand(&left, span)?;
        let rhs = self.operand(&right, span)?;

        if op.is_comparison() {
            let op = compare_op(op);
            let result = self.emit_temp("a comparison", span, |dest| Instr::Compare {
                dest,
                op,
                ty,
                lhs,
                rhs,
            })?;
            return Ok(Value::rvalue(result, TypeId::BOOL));
        }

        let op = arith_op(op);
        let result = self.emit_temp("an operator", span, |dest| Instr::Binary {
            dest,
            op,
            ty,
            lhs,
            rhs,
        })?;
        Ok(Value::rvalue(result, ty))
    }

    /// A value that must be a `bool`.
    pub fn lower_condition(&mut self, expr: &Expr) -> Result<Value, Error> {
        let value = lower_expression(self, expr)?;
        self.recast_implicit(value, TypeId::BOOL, &expr.span)
    }

    /// Short-circuit `&&` and `||`. The right operand runs in its own block
    /// and both paths meet in a `bool` slot.
    fn lower_logical(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: &Span) -> Result<Value, Error> {
        let lhs = self.lower_condition(left)?;

        if let Some(Constant::Bool(known)) = lhs.as_constant() {
            return match (op, *known) {
                (BinaryOp::LogicalAnd, false) | (BinaryOp::LogicalOr, true) => Ok(lhs),
                _ => self.lower_condition(right),
            };
        }

        let slot = self.alloca(TypeId::BOOL, span)?;
        let lhs = self.operand(&lhs, span)?;
        self.emit(
            "a logical operator",
            span,
            Instr::Store {
                ty: TypeId::BOOL,
                addr: slot.clone(),
                value: lhs.clone(),
            },
        )?;

        let builder = self.builder("a logical operator", span)?;
        let rhs_block = builder.new_block("logic.rhs");
        let merge = builder.new_block("logic.merge");
        match op {
            BinaryOp::LogicalAnd => builder.branch(lhs, rhs_block, merge),
            _ => builder.branch(lhs, merge, rhs_block),
        };
        builder.position_at(rhs_block);

        let rhs = self.lower_condition(right)?;
        let rhs = self.operand(&rhs, span)?;
        self.emit(
            "a logical operator",
            span,
            Instr::Store {
                ty: TypeId::BOOL,
                addr: slot.clone(),
                value: rhs,
            },
        )?;

        let builder = self.builder("a logical operator", span)?;
        builder.jump(merge);
        builder.position_at(merge);

        let result = self.emit_temp("a logical operator", span, |dest| Instr::Load {
            dest,
            ty: TypeId::BOOL,
            addr: slot,
        })?;
        Ok(Value::rvalue(result, TypeId::BOOL))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, span: &Span) -> Result<Value, Error> {
        if op == UnaryOp::AddressOf {
            return self.address_of(operand, span);
        }

        let value = lower_expression(self, operand)?;
        let ty = value.ty;
        let invalid = |compiler: &Self| {
            error(
                ErrorImpl::InvalidOperand {
                    operator: op.to_string(),
                    type_: compiler.types.name(ty),
                },
                span,
            )
        };

        match op {
            UnaryOp::Negate => {
                if value.is_literal() {
                    return match value.as_constant() {
                        Some(Constant::Int { value: literal, .. }) => {
                            let negated = -literal;
                            if negated < i64::MIN as i128 {
                                return Err(error(
                                    ErrorImpl::LiteralOutOfRange {
                                        value: negated.to_string(),
                                        type_: self.types.name(ty),
                                    },
                                    span,
                                ));
                            }
                            Ok(Value::literal(Constant::Int { value: negated, ty }, ty))
                        }
                        Some(Constant::Real { value: real, .. }) => {
                            Ok(Value::literal(Constant::Real { value: -real, ty }, ty))
                        }
                        _ => Err(invalid(self)),
                    };
                }

                if !(self.types.is_signed(ty) || self.types.is_real(ty)) {
                    return Err(invalid(self));
                }

                match value.as_constant() {
                    Some(Constant::Int { value: x, .. }) => {
                        let (bits, signed) = self.types.int_info(ty).unwrap_or((64, true));
                        let negated =
                            fold_int(BinaryOp::Sub, 0, *x, bits, signed, &self.types.name(ty)).map_err(|kind| error(kind, span))?;
                        Ok(Value::constant(Constant::Int { value: negated, ty }, ty))
                    }
                    Some(Constant::Real { value: x, .. }) => Ok(Value::constant(Constant::Real { value: -x, ty }, ty)),
                    _ => self.unary_instr(ir::UnaryOp::Neg, &value, span),
                }
            }
            UnaryOp::Not => {
                if !self.types.is_bool(ty) {
                    return Err(invalid(self));
                }

                match value.as_constant() {
                    Some(Constant::Bool(b)) => Ok(Value::constant(Constant::Bool(!b), ty)),
                    _ => self.unary_instr(ir::UnaryOp::Not, &value, span),
                }
            }
            UnaryOp::BitNot => {
                let value = self.settle(value, span)?;
                let Some((bits, signed)) = self.types.int_info(ty) else {
                    return Err(invalid(self));
                };

                match value.as_int() {
                    Some(x) => Ok(Value::constant(
                        Constant::Int {
                            value: normalize(!x, bits, signed),
                            ty,
                        },
                        ty,
                    )),
                    None => self.unary_instr(ir::UnaryOp::Not, &value, span),
                }
            }
            UnaryOp::AddressOf => self.address_of(operand, span),
        }
    }

    fn unary_instr(&mut self, op: ir::UnaryOp, value: &Value, span: &Span) -> Result<Value, Error> {
        let ty = value.ty;
        let operand = self.operand(value, span)?;
        let result = self.emit_temp("an operator", span, |dest| Instr::Unary { dest, op, ty, operand })?;
        Ok(Value::rvalue(result, ty))
    }

    /// `&e`: the address of an instance, or a constant integer reinterpreted
    /// as a pointer to `unknown`.
    fn address_of(&mut self, operand: &Expr, span: &Span) -> Result<Value, Error> {
        let value = lower_expression(self, operand)?;

        match &value.kind {
            ValueKind::Variable(variable) if variable.assignable => {
                let pointer = self.types.pointer_to(variable.ty);
                match &variable.location {
                    Operand::Const(constant) => Ok(Value::constant(constant.clone(), pointer)),
                    location => Ok(Value::rvalue(location.clone(), pointer)),
                }
            }
            ValueKind::Function(instance) => {
                let pointer = self.types.pointer_to(instance.ty);
                Ok(Value::constant(instance.address(pointer), pointer))
            }
            ValueKind::Constant { .. } if self.types.is_integer(value.ty) => {
                let value = self.settle(value.clone(), span)?;
                let pointer = self.types.pointer_to(TypeId::UNKNOWN);
                let address = value.as_int().unwrap_or_default();
                Ok(Value::constant(Constant::Int { value: address, ty: pointer }, pointer))
            }
            _ => Err(error(ErrorImpl::NotAddressable, span)),
        }
    }

    /// `*p`: a reference to the pointee.
    fn lower_deref(&mut self, inner: &Expr, span: &Span) -> Result<Value, Error> {
        let pointer = lower_expression(self, inner)?;

        let Some(pointee) = self.types.pointee(pointer.ty) else {
            return Err(error(
                ErrorImpl::InvalidOperand {
                    operator: String::from("*"),
                    type_: self.types.name(pointer.ty),
                },
                span,
            ));
        };

        if !self.types.is_complete(pointee) {
            return Err(error(
                ErrorImpl::IncompleteType {
                    type_: self.types.name(pointee),
                },
                span,
            ));
        }

        let location = self.operand(&pointer, span)?;
        Ok(Value::variable(Variable {
            name: String::from("*"),
            storage: StorageClass::Reference,
            location,
            ty: pointee,
            assignable: true,
        }))
    }

    /// `base + offset`, folded when the base is a symbol address and the sum
    /// fits.
    pub fn offset_address(&mut self, base: &Operand, offset: u64, pointer: TypeId, span: &Span) -> Result<Operand, Error> {
        let folded = match base {
            Operand::Const(Constant::Address { symbol, offset: start, .. }) => {
                start.checked_add(offset).map(|offset| (symbol, offset))
            }
            _ => None,
        };

        match folded {
            Some((symbol, offset)) => Ok(Operand::Const(Constant::Address {
                symbol: symbol.clone(),
                offset,
                ty: pointer,
            })),
            None if offset == 0 => Ok(base.clone()),
            None => {
                let base = base.clone();
                self.emit_temp("a member access", span, |dest| Instr::Offset { dest, base, offset })
            }
        }
    }

    /// A reference to the sub-object of `object` at member/element `index`.
    fn sub_object(&mut self, object: &Variable, index: u64, label: &str, span: &Span) -> Result<Value, Error> {
        let Some((ty, offset)) = self.types.element(object.ty, index) else {
            return Err(error(
                ErrorImpl::IndexOutOfBounds {
                    index: index as i128,
                    type_: self.types.name(object.ty),
                },
                span,
            ));
        };

        let pointer = self.types.pointer_to(ty);
        let location = self.offset_address(&object.location, offset, pointer, span)?;

        Ok(Value::variable(Variable {
            name: format!("{}{}", object.name, label),
            storage: StorageClass::Reference,
            location,
            ty,
            assignable: object.assignable,
        }))
    }

    fn addressable(&self, value: Value, span: &Span) -> Result<Rc<Variable>, Error> {
        match value.kind {
            ValueKind::Variable(variable) => Ok(variable),
            _ => Err(error(ErrorImpl::NotAddressable, span)),
        }
    }

    /// Like [`Self::addressable`], but temporaries are rejected as well.
    fn assignable(&self, value: Value, span: &Span) -> Result<Rc<Variable>, Error> {
        match value.kind {
            ValueKind::Variable(variable) if variable.assignable => Ok(variable),
            _ => Err(error(ErrorImpl::NotAddressable, span)),
        }
    }

    fn lower_member(&mut self, object: &Expr, member: &str, span: &Span) -> Result<Value, Error> {
        let value = lower_expression(self, object)?;
        let object = self.addressable(value, &object.span)?;

        let Some(index) = self.types.member_index(object.ty, member) else {
            return Err(error(
                ErrorImpl::NoSuchMember {
                    type_: self.types.name(object.ty),
                    member: member.to_string(),
                },
                span,
            ));
        };

        self.sub_object(&object, index as u64, &format!(".{}", member), span)
    }

    /// A constant index into a struct or union. It must be a plain integer.
    fn constant_index(&mut self, index: &Expr, ty: TypeId) -> Result<u64, Error> {
        let value = lower_expression(self, index)?;
        if value.as_constant().is_none() {
            return Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the member index"),
                },
                &index.span,
            ));
        }
        let value = self.settle(value, &index.span)?;

        if value.as_constant().is_some_and(Constant::is_relocatable) {
            return Err(error(ErrorImpl::RelocatableConstant, &index.span));
        }

        let Some(position) = value.as_int().filter(|_| self.types.is_integer(value.ty)) else {
            return Err(error(
                ErrorImpl::TypeMismatch {
                    expected: String::from("integer"),
                    received: self.types.name(value.ty),
                },
                &index.span,
            ));
        };

        u64::try_from(position).map_err(|_| {
            error(
                ErrorImpl::IndexOutOfBounds {
                    index: position,
                    type_: self.types.name(ty),
                },
                &index.span,
            )
        })
    }

    /// A runtime index, which must be an integer.
    fn index_value(&mut self, index: &Expr) -> Result<Value, Error> {
        let value = lower_expression(self, index)?;
        let value = self.settle(value, &index.span)?;

        if !self.types.is_integer(value.ty) {
            return Err(error(
                ErrorImpl::TypeMismatch {
                    expected: String::from("integer"),
                    received: self.types.name(value.ty),
                },
                &index.span,
            ));
        }

        Ok(value)
    }

    /// Element `index` of the storage at `base`, `stride` bytes apart. A
    /// constant index is folded into an offset unless the offset overflows.
    fn element_at(
        &mut self,
        base: Operand,
        index: &Value,
        of: TypeId,
        name: String,
        assignable: bool,
        span: &Span,
    ) -> Result<Value, Error> {
        let stride = self.types.size_of(of).unwrap_or(0);
        let pointer = self.types.pointer_to(of);

        let offset = index
            .as_int()
            .and_then(|position| u64::try_from(position).ok())
            .and_then(|position| position.checked_mul(stride));

        let location = match offset {
            Some(offset) => self.offset_address(&base, offset, pointer, span)?,
            None => {
                let index = self.operand(index, span)?;
                self.emit_temp("an element access", span, |dest| Instr::Element {
                    dest,
                    base,
                    index,
                    stride,
                })?
            }
        };

        Ok(Value::variable(Variable {
            name,
            storage: StorageClass::Reference,
            location,
            ty: of,
            assignable,
        }))
    }

    fn lower_index(&mut self, object: &Expr, index: &Expr, span: &Span) -> Result<Value, Error> {
        let value = lower_expression(self, object)?;

        if let Some(of) = self.types.pointee(value.ty) {
            if !self.types.is_complete(of) {
                return Err(error(
                    ErrorImpl::IncompleteType {
                        type_: self.types.name(of),
                    },
                    span,
                ));
            }

            let base = self.operand(&value, span)?;
            let position = self.index_value(index)?;
            return self.element_at(base, &position, of, String::from("*[]"), true, span);
        }

        if !self.types.is_aggregate(value.ty) {
            return Err(error(
                ErrorImpl::InvalidOperand {
                    operator: String::from("[]"),
                    type_: self.types.name(value.ty),
                },
                span,
            ));
        }

        let object = self.addressable(value, &object.span)?;

        if let TypeKind::Array { of, len } = *self.types.kind(object.ty) {
            let position = self.index_value(index)?;
            if let Some(constant) = position.as_int() {
                if constant < 0 || constant >= len as i128 {
                    return Err(error(
                        ErrorImpl::IndexOutOfBounds {
                            index: constant,
                            type_: self.types.name(object.ty),
                        },
                        &index.span,
                    ));
                }
            }

            let name = format!("{}[]", object.name);
            return self.element_at(object.location.clone(), &position, of, name, object.assignable, span);
        }

        let position = self.constant_index(index, object.ty)?;
        self.sub_object(&object, position, &format!("[{}]", position), span)
    }

    /// Writes `value`, already of type `ty`, to the storage at `dest`.
    pub fn store_into(&mut self, dest: &Operand, value: Value, ty: TypeId, span: &Span) -> Result<(), Error> {
        if let Some(variable) = value.as_variable() {
            if &variable.location == dest {
                return Ok(());
            }
        }

        if !self.types.is_aggregate(ty) {
            let value = self.operand(&value, span)?;
            return self.emit(
                "an assignment",
                span,
                Instr::Store {
                    ty,
                    addr: dest.clone(),
                    value,
                },
            );
        }

        let size = self.types.size_of(ty).unwrap_or(0);
        let instr = match value.kind {
            ValueKind::Constant {
                value: Constant::Zero(_),
                ..
            } => Instr::Zero {
                addr: dest.clone(),
                size,
            },
            ValueKind::Constant { value, .. } => Instr::Store {
                ty,
                addr: dest.clone(),
                value: Operand::Const(value),
            },
            ValueKind::Variable(variable) if self.types.fits_word(ty) => {
                let addr = variable.location.clone();
                let bits = self.emit_temp("an assignment", span, |dest| Instr::LoadBits { dest, size, addr })?;
                Instr::StoreBits {
                    size,
                    addr: dest.clone(),
                    value: bits,
                }
            }
            ValueKind::Variable(variable) => Instr::Copy {
                dest: dest.clone(),
                src: variable.location.clone(),
                size,
            },
            ValueKind::Rvalue(src) => Instr::Copy {
                dest: dest.clone(),
                src,
                size,
            },
            ValueKind::Function(_) => {
                return Err(error(
                    ErrorImpl::InvalidVariableType {
                        type_: self.types.name(ty),
                    },
                    span,
                ))
            }
        };

        self.emit("an assignment", span, instr)
    }

    /// `target = value` and the compound forms. The result holds the stored
    /// value but is not itself assignable.
    fn lower_assign(&mut self, op: Option<BinaryOp>, target: &Expr, value: &Expr, span: &Span) -> Result<Value, Error> {
        let lowered = lower_expression(self, target)?;
        let variable = self.assignable(lowered, &target.span)?;
        let ty = variable.ty;
        let dest = Value {
            kind: ValueKind::Variable(variable.clone()),
            ty,
        };

        match op {
            Some(op) => {
                let rhs = lower_expression(self, value)?;
                let result = self.binary(op, dest.clone(), rhs, span)?;
                let result = self.recast_implicit(result, ty, span)?;
                self.store_into(&variable.location, result, ty, span)?;
            }
            None => self.lower_into(value, &variable.location, ty)?,
        }

        Ok(dest.into_temporary())
    }

    /// `sizeof(T)` or `sizeof(variable)`, an `uint64` constant.
    fn lower_sizeof(&mut self, inner: &Expr, span: &Span) -> Result<Value, Error> {
        let ty = if self.is_type_expr(inner)? {
            self.resolve_type(inner, true)?
        } else {
            let value = lower_expression(self, inner)?;
            match value.kind {
                ValueKind::Variable(variable) => variable.ty,
                _ => {
                    return Err(error(
                        ErrorImpl::InvalidSizeOf {
                            type_: self.types.name(value.ty),
                        },
                        span,
                    ))
                }
            }
        };

        match self.types.size_of(ty) {
            Some(size) => Ok(Value::constant(
                Constant::Int {
                    value: size as i128,
                    ty: TypeId::UINT64,
                },
                TypeId::UINT64,
            )),
            None => Err(error(
                ErrorImpl::InvalidSizeOf {
                    type_: self.types.name(ty),
                },
                span,
            )),
        }
    }
}

/// Retypes a literal into the domain literal arithmetic runs in.
fn literal_as(value: Value, domain: TypeId) -> Value {
    let constant = match value.as_constant() {
        Some(Constant::Int { value, .. }) if domain == TypeId::REAL64 => Constant::Real {
            value: *value as f64,
            ty: domain,
        },
        Some(Constant::Int { value, .. }) => Constant::Int {
            value: *value,
            ty: domain,
        },
        Some(Constant::Real { value, .. }) => Constant::Real {
            value: *value,
            ty: domain,
        },
        _ => return value,
    };
    Value::literal(constant, domain)
}

fn arith_op(op: BinaryOp) -> ArithOp {
    match op {
        BinaryOp::Add => ArithOp::Add,
        BinaryOp::Sub => ArithOp::Sub,
        BinaryOp::Mul => ArithOp::Mul,
        BinaryOp::Div => ArithOp::Div,
        BinaryOp::Rem => ArithOp::Rem,
        BinaryOp::BitAnd => ArithOp::And,
        BinaryOp::BitOr => ArithOp::Or,
        BinaryOp::BitXor => ArithOp::Xor,
        BinaryOp::Shl => ArithOp::Shl,
        _ => ArithOp::Shr,
    }
}

fn compare_op(op: BinaryOp) -> CompareOp {
    match op {
        BinaryOp::Eq => CompareOp::Eq,
        BinaryOp::Ne => CompareOp::Ne,
        BinaryOp::Lt => CompareOp::Lt,
        BinaryOp::Le => CompareOp::Le,
        BinaryOp::Gt => CompareOp::Gt,
        _ => CompareOp::Ge,
    }
}
