//! Type resolution.
//!
//! Type expressions resolve to [`TypeId`]s in the shared table. A named type
//! is reached by following its synonym chain (`A :: B; B :: struct(...)`)
//! to a structural definition. A placeholder is registered under every name
//! of the chain before the body is resolved, so members may point back at
//! the type being defined.

use tracing::debug;

use crate::{
    ast::{
        ast::{Item, Representation},
        expressions::{Expr, ExprKind, Field},
    },
    errors::errors::{Error, ErrorImpl},
    types::types::{Attributes, NameType, Shell, TypeError, TypeId, TypeKind, TypeTable},
    Span,
};

use super::{
    compiler::{error, Compiler},
    symbols::{GlobalEntry, GlobalSlot},
};

/// Where a synonym chain ends.
enum ChainEnd<'m> {
    Builtin(TypeId),
    /// A name that already resolved to a type.
    Named(TypeId),
    /// A type constructor, and the representation binding it.
    Constructor(&'m Expr, String),
    /// Anything that is not a type.
    Value,
}

fn shell_of(expr: &Expr) -> Shell {
    match expr.kind {
        ExprKind::ArrayType { .. } => Shell::Array,
        ExprKind::StructType { .. } => Shell::Struct,
        ExprKind::UnionType { .. } => Shell::Union,
        ExprKind::FunctionType { .. } => Shell::Function,
        _ => Shell::Pointer,
    }
}

impl<'m> Compiler<'m> {
    fn incomplete(&self, ty: TypeId, span: &Span) -> Error {
        error(
            ErrorImpl::IncompleteType {
                type_: self.types.name(ty),
            },
            span,
        )
    }

    fn check_complete(&self, ty: TypeId, allow_opaque: bool, span: &Span) -> Result<TypeId, Error> {
        if allow_opaque || self.types.is_complete(ty) {
            Ok(ty)
        } else {
            Err(self.incomplete(ty, span))
        }
    }

    /// Resolves a type expression. Unless `allow_opaque` is set the result
    /// must be complete.
    pub fn resolve_type(&mut self, expr: &Expr, allow_opaque: bool) -> Result<TypeId, Error> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.resolve_type_name(name, &expr.span, allow_opaque),
            ExprKind::Deref(_)
            | ExprKind::ArrayType { .. }
            | ExprKind::StructType { .. }
            | ExprKind::UnionType { .. }
            | ExprKind::FunctionType { .. } => {
                let kind = self.type_kind(expr)?;
                let id = self.types.add(kind);
                self.classify_function(id);
                Ok(id)
            }
            _ => Err(error(
                ErrorImpl::NotAType {
                    name: String::from("expression"),
                },
                &expr.span,
            )),
        }
    }

    fn resolve_type_name(&mut self, name: &str, span: &Span, allow_opaque: bool) -> Result<TypeId, Error> {
        if self.lookup_local(name).is_some() {
            return Err(error(ErrorImpl::NotAType { name: name.to_string() }, span));
        }

        match self.globals.get(name) {
            Some(GlobalSlot::Resolved(GlobalEntry::Type(id))) => {
                let id = *id;
                return self.check_complete(id, allow_opaque, span);
            }
            Some(GlobalSlot::Resolved(_)) => {
                return Err(error(ErrorImpl::NotAType { name: name.to_string() }, span));
            }
            Some(GlobalSlot::InProgress) => {
                return Err(error(ErrorImpl::CyclicDefinition { name: name.to_string() }, span));
            }
            Some(GlobalSlot::Failed) => {
                return Err(error(ErrorImpl::DependencyFailed { name: name.to_string() }, span));
            }
            None => {}
        }

        let module = self.module;
        match module.lookup(name) {
            Some(Item::Representation(_)) => {
                let id = self.resolve_named_type(name, span)?;
                self.check_complete(id, allow_opaque, span)
            }
            Some(_) => Err(error(ErrorImpl::NotAType { name: name.to_string() }, span)),
            None => match TypeTable::builtin(name) {
                Some(id) => self.check_complete(id, allow_opaque, span),
                None => Err(error(ErrorImpl::UnknownIdentifier { name: name.to_string() }, span)),
            },
        }
    }

    /// Follows the synonym chain starting at the representation `name`.
    fn follow_synonyms(&mut self, name: &str, span: &Span) -> Result<(Vec<String>, ChainEnd<'m>), Error> {
        let module = self.module;
        let mut chain: Vec<String> = vec![];
        let mut current = name.to_string();

        loop {
            if chain.contains(&current) {
                return Err(error(ErrorImpl::SynonymCycle { name: name.to_string() }, span));
            }

            if current != name {
                match self.globals.get(&current) {
                    Some(GlobalSlot::Resolved(GlobalEntry::Type(id))) => return Ok((chain, ChainEnd::Named(*id))),
                    Some(GlobalSlot::Resolved(_)) => return Ok((chain, ChainEnd::Value)),
                    Some(GlobalSlot::Failed) => {
                        return Err(error(ErrorImpl::DependencyFailed { name: current }, span));
                    }
                    _ => {}
                }
            }

            let representation = match module.lookup(&current) {
                Some(Item::Representation(representation)) => representation,
                Some(_) => return Ok((chain, ChainEnd::Value)),
                None => {
                    return match TypeTable::builtin(&current) {
                        Some(id) => Ok((chain, ChainEnd::Builtin(id))),
                        None => Err(error(ErrorImpl::UnknownIdentifier { name: current }, span)),
                    }
                }
            };

            chain.push(current.clone());

            let value = &representation.value;
            match &value.kind {
                ExprKind::Identifier(next) => current = next.clone(),
                ExprKind::Deref(inner) => {
                    return if self.is_type_expr(inner)? {
                        Ok((chain, ChainEnd::Constructor(value, current)))
                    } else {
                        Ok((chain, ChainEnd::Value))
                    };
                }
                _ if value.is_type_constructor() => return Ok((chain, ChainEnd::Constructor(value, current))),
                _ => return Ok((chain, ChainEnd::Value)),
            }
        }
    }

    /// Whether an expression denotes a type rather than a value.
    pub fn is_type_expr(&mut self, expr: &Expr) -> Result<bool, Error> {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if self.lookup_local(name).is_some() {
                    return Ok(false);
                }

                match self.globals.get(name) {
                    Some(GlobalSlot::Resolved(GlobalEntry::Type(_))) => return Ok(true),
                    Some(GlobalSlot::Resolved(_)) | Some(GlobalSlot::InProgress) | Some(GlobalSlot::Failed) => {
                        return Ok(false)
                    }
                    None => {}
                }

                if self.classifying.iter().any(|entry| entry == name) {
                    return Ok(true);
                }

                let module = self.module;
                match module.lookup(name) {
                    Some(Item::Representation(_)) => {
                        self.classifying.push(name.clone());
                        let result = self.follow_synonyms(name, &expr.span);
                        self.classifying.pop();
                        Ok(!matches!(result?.1, ChainEnd::Value))
                    }
                    Some(_) => Ok(false),
                    None => Ok(TypeTable::builtin(name).is_some()),
                }
            }
            ExprKind::Deref(inner) => self.is_type_expr(inner),
            _ => Ok(expr.is_type_constructor()),
        }
    }

    /// Resolves the representation `name` as a named type. Every name on
    /// its synonym chain ends up bound to the same type.
    pub fn resolve_named_type(&mut self, name: &str, span: &Span) -> Result<TypeId, Error> {
        let (chain, end) = match self.follow_synonyms(name, span) {
            Ok(result) => result,
            Err(failure) => {
                self.globals.fail(name);
                return Err(failure);
            }
        };

        let (id, body) = match end {
            ChainEnd::Value => return Err(error(ErrorImpl::NotAType { name: name.to_string() }, span)),
            ChainEnd::Builtin(id) | ChainEnd::Named(id) => (id, None),
            ChainEnd::Constructor(body, owner) => (self.types.placeholder(&owner, shell_of(body)), Some(body)),
        };

        for synonym in &chain {
            self.globals.resolve(synonym, GlobalEntry::Type(id));
        }

        let Some(body) = body else {
            return Ok(id);
        };

        debug!(name, id = %id, synonyms = chain.len(), "resolving named type");

        let constructed = self.type_kind(body).and_then(|kind| {
            self.types.construct(id, kind).map_err(|TypeError::Reconstruction(id)| {
                error(
                    ErrorImpl::TypeReconstruction {
                        type_: self.types.name(id),
                    },
                    span,
                )
            })
        });

        if let Err(failure) = constructed {
            for synonym in &chain {
                self.globals.fail(synonym);
            }
            return Err(failure);
        }

        self.classify_function(id);
        Ok(id)
    }

    /// Resolves a representation, as a named type or as a constant.
    pub fn resolve_representation(&mut self, representation: &'m Representation) -> Result<GlobalEntry, Error> {
        let name = &representation.name;
        let reference = Expr::new(ExprKind::Identifier(name.clone()), representation.span.clone());

        let is_type = match self.is_type_expr(&reference) {
            Ok(is_type) => is_type,
            Err(failure) => {
                self.globals.fail(name);
                return Err(failure);
            }
        };

        if is_type {
            return Ok(GlobalEntry::Type(self.resolve_named_type(name, &representation.span)?));
        }

        self.guarded(name, |compiler| {
            let value = compiler.lower_constant(&representation.value)?;
            Ok(GlobalEntry::Constant(value))
        })
    }

    /// The structural kind a type constructor denotes.
    fn type_kind(&mut self, expr: &Expr) -> Result<TypeKind, Error> {
        match &expr.kind {
            ExprKind::Deref(inner) => Ok(TypeKind::Pointer(self.resolve_type(inner, true)?)),
            ExprKind::ArrayType { size, element } => {
                let of = self.resolve_type(element, false)?;
                if self.types.size_of(of).is_none() {
                    return Err(error(
                        ErrorImpl::InvalidVariableType {
                            type_: self.types.name(of),
                        },
                        &element.span,
                    ));
                }

                let len = self.array_size(size)?;
                if self.types.size_of(of).and_then(|size| size.checked_mul(len)).is_none() {
                    return Err(error(
                        ErrorImpl::TypeTooLarge {
                            what: format!("an array of {} `{}`", len, self.types.name(of)),
                        },
                        &expr.span,
                    ));
                }
                Ok(TypeKind::Array { of, len })
            }
            ExprKind::StructType { members, packed } => {
                let members = self.resolve_members(members, *packed)?;
                if self.all_sized(&members) && self.types.struct_size(&members, *packed).is_none() {
                    return Err(error(
                        ErrorImpl::TypeTooLarge {
                            what: String::from("the struct"),
                        },
                        &expr.span,
                    ));
                }
                Ok(TypeKind::Struct {
                    members,
                    packed: *packed,
                })
            }
            ExprKind::UnionType { members } => {
                let members = self.resolve_members(members, false)?;
                if self.all_sized(&members) && self.types.union_size(&members).is_none() {
                    return Err(error(
                        ErrorImpl::TypeTooLarge {
                            what: String::from("the union"),
                        },
                        &expr.span,
                    ));
                }
                Ok(TypeKind::Union { members })
            }
            ExprKind::FunctionType { params, ret } => {
                let mut resolved: Vec<NameType> = vec![];

                for param in params {
                    if resolved.iter().any(|other| other.name.as_deref() == Some(&param.name)) {
                        return Err(error(
                            ErrorImpl::DuplicateMember {
                                member: param.name.clone(),
                            },
                            &param.span,
                        ));
                    }

                    let ty = self.resolve_type(&param.ty, false)?;
                    if self.types.is_function(ty) {
                        return Err(error(
                            ErrorImpl::InvalidVariableType {
                                type_: self.types.name(ty),
                            },
                            &param.ty.span,
                        ));
                    }

                    let attributes = if param.by_ref {
                        Attributes::BY_REFERENCE
                    } else {
                        Attributes::empty()
                    };
                    resolved.push(NameType::new(&param.name, ty, attributes));
                }

                let ret = match ret {
                    Some(ret) => {
                        let ty = self.resolve_type(ret, true)?;
                        if self.types.is_function(ty) {
                            return Err(error(
                                ErrorImpl::InvalidVariableType {
                                    type_: self.types.name(ty),
                                },
                                &ret.span,
                            ));
                        }
                        ty
                    }
                    None => TypeId::VOID,
                };

                Ok(TypeKind::Function { params: resolved, ret })
            }
            _ => Err(error(
                ErrorImpl::NotAType {
                    name: String::from("expression"),
                },
                &expr.span,
            )),
        }
    }

    fn resolve_members(&mut self, fields: &[Field], packed: bool) -> Result<Vec<NameType>, Error> {
        let attributes = if packed {
            Attributes::PACKED
        } else {
            Attributes::empty()
        };
        let mut members: Vec<NameType> = vec![];

        for field in fields {
            if members.iter().any(|member| member.name.as_deref() == Some(&field.name)) {
                return Err(error(
                    ErrorImpl::DuplicateMember {
                        member: field.name.clone(),
                    },
                    &field.span,
                ));
            }

            let ty = self.resolve_type(&field.ty, true)?;
            if self.types.is_function(ty) {
                return Err(error(
                    ErrorImpl::FunctionMember {
                        member: field.name.clone(),
                    },
                    &field.span,
                ));
            }
            if !self.types.is_complete(ty) {
                return Err(self.incomplete(ty, &field.ty.span));
            }

            members.push(NameType::new(&field.name, ty, attributes));
        }

        Ok(members)
    }

    fn all_sized(&self, members: &[NameType]) -> bool {
        members.iter().all(|member| self.types.size_of(member.ty).is_some())
    }

    /// Rejects anything in an array size that cannot be known at compile
    /// time: identifiers other than representations and builtin type
    /// names, string literals, calls and assignments.
    fn check_determinate(&self, expr: &Expr) -> Result<(), Error> {
        let reason = match &expr.kind {
            ExprKind::Identifier(name) => {
                let module = self.module;
                let representation = module.representation(name).is_some();
                let builtin = module.lookup(name).is_none() && TypeTable::builtin(name).is_some();

                if !representation && !builtin {
                    return Err(error(ErrorImpl::NotARepresentation { name: name.clone() }, &expr.span));
                }
                None
            }
            ExprKind::String(_) => Some("a string literal"),
            ExprKind::Call { .. } => Some("a call"),
            ExprKind::Assign { .. } => Some("an assignment"),
            _ => None,
        };

        if let Some(reason) = reason {
            return Err(error(
                ErrorImpl::IndeterminateArraySize {
                    reason: reason.to_string(),
                },
                &expr.span,
            ));
        }

        let mut result = Ok(());
        expr.for_each_child(|child| {
            if result.is_ok() {
                result = self.check_determinate(child);
            }
        });
        result
    }

    fn array_size(&mut self, size: &Expr) -> Result<u64, Error> {
        self.check_determinate(size)?;

        let value = self.lower_constant(size)?;
        let Some(constant) = value.as_constant() else {
            return Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the array size"),
                },
                &size.span,
            ));
        };

        if constant.is_relocatable() {
            return Err(error(ErrorImpl::RelocatableConstant, &size.span));
        }

        match constant.as_int() {
            Some(len) if self.types.is_integer(value.ty) => {
                if len <= 0 {
                    return Err(error(ErrorImpl::InvalidArraySize { size: len }, &size.span));
                }
                u64::try_from(len).map_err(|_| error(ErrorImpl::InvalidArraySize { size: len }, &size.span))
            }
            _ => Err(error(
                ErrorImpl::TypeMismatch {
                    expected: String::from("integer"),
                    received: self.types.name(value.ty),
                },
                &size.span,
            )),
        }
    }

    /// Rejects types a variable cannot have.
    pub fn validate_variable_type(&self, ty: TypeId, span: &Span) -> Result<(), Error> {
        if self.types.is_void(ty) || self.types.is_function(ty) || ty == TypeId::UNKNOWN {
            return Err(error(
                ErrorImpl::InvalidVariableType {
                    type_: self.types.name(ty),
                },
                span,
            ));
        }

        if !self.types.is_complete(ty) {
            return Err(self.incomplete(ty, span));
        }

        Ok(())
    }
}
