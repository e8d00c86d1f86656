//! The shared type table.
//!
//! Every type lives in one [`TypeTable`] and is referred to by a [`TypeId`]
//! handle. Primitive types are registered up front at fixed ids. Named types
//! are built in two phases: a placeholder is registered first so that
//! self-referential members can point at it, then it is constructed exactly
//! once from its resolved body.

use std::{collections::HashMap, fmt::Display};

use bitflags::bitflags;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const UNKNOWN: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const INT8: TypeId = TypeId(3);
    pub const INT16: TypeId = TypeId(4);
    pub const INT32: TypeId = TypeId(5);
    pub const INT64: TypeId = TypeId(6);
    pub const UINT8: TypeId = TypeId(7);
    pub const UINT16: TypeId = TypeId(8);
    pub const UINT32: TypeId = TypeId(9);
    pub const UINT64: TypeId = TypeId(10);
    pub const REAL32: TypeId = TypeId(11);
    pub const REAL64: TypeId = TypeId(12);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attributes: u8 {
        /// Parameter passed by address.
        const BY_REFERENCE = 0b0000_0001;
        /// Member of a packed struct.
        const PACKED = 0b0000_0010;
    }
}

/// A struct/union member or a function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NameType {
    pub name: Option<String>,
    pub ty: TypeId,
    pub attributes: Attributes,
}

impl NameType {
    pub fn new(name: &str, ty: TypeId, attributes: Attributes) -> Self {
        NameType {
            name: Some(name.to_string()),
            ty,
            attributes,
        }
    }

    pub fn by_reference(&self) -> bool {
        self.attributes.contains(Attributes::BY_REFERENCE)
    }
}

/// Structural kind of a placeholder that has not been constructed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Pointer,
    Array,
    Struct,
    Union,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Unknown,
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Real32,
    Real64,
    Pointer(TypeId),
    Array { of: TypeId, len: u64 },
    Struct { members: Vec<NameType>, packed: bool },
    Union { members: Vec<NameType> },
    Function { params: Vec<NameType>, ret: TypeId },
    Opaque(Shell),
}

#[derive(Debug, Clone)]
pub struct TypeData {
    pub kind: TypeKind,
    pub name: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    Reconstruction(TypeId),
}

#[derive(Debug)]
pub struct TypeTable {
    types: Vec<TypeData>,
    pointers: HashMap<TypeId, TypeId>,
    arrays: HashMap<(TypeId, u64), TypeId>,
    pub(crate) word_size: u64,
}

const PRIMITIVES: [(TypeKind, &str, bool); 13] = [
    (TypeKind::Unknown, "unknown", false),
    (TypeKind::Void, "void", false),
    (TypeKind::Bool, "bool", true),
    (TypeKind::Int8, "int8", true),
    (TypeKind::Int16, "int16", true),
    (TypeKind::Int32, "int32", true),
    (TypeKind::Int64, "int64", true),
    (TypeKind::UInt8, "uint8", true),
    (TypeKind::UInt16, "uint16", true),
    (TypeKind::UInt32, "uint32", true),
    (TypeKind::UInt64, "uint64", true),
    (TypeKind::Real32, "real32", true),
    (TypeKind::Real64, "real64", true),
];

impl TypeTable {
    pub fn new(word_size: u64) -> Self {
        let types = PRIMITIVES
            .iter()
            .map(|(kind, name, complete)| TypeData {
                kind: kind.clone(),
                name: Some(name.to_string()),
                complete: *complete,
            })
            .collect();

        TypeTable {
            types,
            pointers: HashMap::new(),
            arrays: HashMap::new(),
            word_size,
        }
    }

    /// Looks up a builtin type name.
    pub fn builtin(name: &str) -> Option<TypeId> {
        PRIMITIVES
            .iter()
            .position(|(_, builtin, _)| *builtin == name)
            .filter(|index| *index != TypeId::UNKNOWN.index())
            .map(|index| TypeId(index as u32))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.get(id).kind
    }

    pub fn is_complete(&self, id: TypeId) -> bool {
        self.get(id).complete
    }

    fn push(&mut self, data: TypeData) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(data);
        id
    }

    /// Registers a complete anonymous type.
    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        match kind {
            TypeKind::Pointer(to) => self.pointer_to(to),
            TypeKind::Array { of, len } => self.array_of(of, len),
            kind => self.push(TypeData {
                kind,
                name: None,
                complete: true,
            }),
        }
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        if let Some(id) = self.pointers.get(&pointee) {
            return *id;
        }

        let id = self.push(TypeData {
            kind: TypeKind::Pointer(pointee),
            name: None,
            complete: true,
        });
        self.pointers.insert(pointee, id);
        id
    }

    pub fn array_of(&mut self, element: TypeId, len: u64) -> TypeId {
        if let Some(id) = self.arrays.get(&(element, len)) {
            return *id;
        }

        let id = self.push(TypeData {
            kind: TypeKind::Array { of: element, len },
            name: None,
            complete: true,
        });
        self.arrays.insert((element, len), id);
        id
    }

    /// Registers an incomplete named placeholder together with its derived
    /// `*Name` pointer, which pointer resolution reuses.
    pub fn placeholder(&mut self, name: &str, shell: Shell) -> TypeId {
        let id = self.push(TypeData {
            kind: TypeKind::Opaque(shell),
            name: Some(name.to_string()),
            complete: false,
        });

        let pointer = self.pointer_to(id);
        self.types[pointer.index()].name = Some(format!("*{}", name));

        trace!(name, id = id.0, "registered placeholder");
        id
    }

    /// Completes a placeholder. A type can only be constructed once.
    pub fn construct(&mut self, id: TypeId, kind: TypeKind) -> Result<(), TypeError> {
        let data = &mut self.types[id.index()];
        if data.complete {
            return Err(TypeError::Reconstruction(id));
        }

        data.kind = kind;
        data.complete = true;
        Ok(())
    }

    /// Structural equality. Terminates on cyclic types: a pair that is
    /// already being compared further up is assumed equal.
    pub fn equal(&self, a: TypeId, b: TypeId) -> bool {
        let mut comparing = Vec::new();
        self.equal_in(a, b, &mut comparing)
    }

    fn equal_in(&self, a: TypeId, b: TypeId, comparing: &mut Vec<(TypeId, TypeId)>) -> bool {
        if a == b || comparing.contains(&(a, b)) {
            return true;
        }

        comparing.push((a, b));

        let result = match (self.kind(a), self.kind(b)) {
            (TypeKind::Pointer(x), TypeKind::Pointer(y)) => self.equal_in(*x, *y, comparing),
            (TypeKind::Array { of: x, len: n }, TypeKind::Array { of: y, len: m }) => {
                n == m && self.equal_in(*x, *y, comparing)
            }
            (
                TypeKind::Struct {
                    members: x,
                    packed: p,
                },
                TypeKind::Struct {
                    members: y,
                    packed: q,
                },
            ) => p == q && self.members_equal(x, y, true, comparing),
            (TypeKind::Union { members: x }, TypeKind::Union { members: y }) => {
                self.members_equal(x, y, true, comparing)
            }
            (
                TypeKind::Function {
                    params: x,
                    ret: r,
                },
                TypeKind::Function {
                    params: y,
                    ret: s,
                },
            ) => self.members_equal(x, y, false, comparing) && self.equal_in(*r, *s, comparing),
            (TypeKind::Opaque(_), _) | (_, TypeKind::Opaque(_)) => false,
            (TypeKind::Unknown, _) | (_, TypeKind::Unknown) => false,
            (x, y) => x == y,
        };

        comparing.pop();
        result
    }

    fn members_equal(
        &self,
        x: &[NameType],
        y: &[NameType],
        names: bool,
        comparing: &mut Vec<(TypeId, TypeId)>,
    ) -> bool {
        x.len() == y.len()
            && x.iter().zip(y).all(|(a, b)| {
                (!names || a.name == b.name)
                    && a.attributes == b.attributes
                    && self.equal_in(a.ty, b.ty, comparing)
            })
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        self.int_info(id).is_some()
    }

    /// Bit width and signedness of an integer type.
    pub fn int_info(&self, id: TypeId) -> Option<(u32, bool)> {
        match self.kind(id) {
            TypeKind::Int8 => Some((8, true)),
            TypeKind::Int16 => Some((16, true)),
            TypeKind::Int32 => Some((32, true)),
            TypeKind::Int64 => Some((64, true)),
            TypeKind::UInt8 => Some((8, false)),
            TypeKind::UInt16 => Some((16, false)),
            TypeKind::UInt32 => Some((32, false)),
            TypeKind::UInt64 => Some((64, false)),
            _ => None,
        }
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        matches!(self.int_info(id), Some((_, true)))
    }

    pub fn is_real(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Real32 | TypeKind::Real64)
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Bool)
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Pointer(_))
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Function { .. } | TypeKind::Opaque(Shell::Function))
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Void)
    }

    pub fn is_aggregate(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Array { .. } | TypeKind::Struct { .. } | TypeKind::Union { .. }
        )
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer(to) => Some(*to),
            _ => None,
        }
    }

    /// A pointer whose pointee is not known.
    pub fn is_opaque_pointer(&self, id: TypeId) -> bool {
        self.pointee(id) == Some(TypeId::UNKNOWN)
    }

    pub fn members(&self, id: TypeId) -> Option<&[NameType]> {
        match self.kind(id) {
            TypeKind::Struct { members, .. } | TypeKind::Union { members } => Some(members),
            _ => None,
        }
    }

    pub fn member_index(&self, id: TypeId, name: &str) -> Option<usize> {
        self.members(id)?
            .iter()
            .position(|member| member.name.as_deref() == Some(name))
    }

    pub fn function_parts(&self, id: TypeId) -> Option<(&[NameType], TypeId)> {
        match self.kind(id) {
            TypeKind::Function { params, ret } => Some((params, *ret)),
            _ => None,
        }
    }

    /// Source-like rendering used in diagnostics and IR dumps.
    pub fn name(&self, id: TypeId) -> String {
        let data = self.get(id);
        if let Some(name) = &data.name {
            return name.clone();
        }

        let members = |members: &[NameType]| {
            members
                .iter()
                .map(|member| {
                    let prefix = if member.by_reference() { "ref " } else { "" };
                    match &member.name {
                        Some(name) => format!("{}{}: {}", prefix, name, self.name(member.ty)),
                        None => format!("{}{}", prefix, self.name(member.ty)),
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        match &data.kind {
            TypeKind::Pointer(to) => format!("*{}", self.name(*to)),
            TypeKind::Array { of, len } => format!("[{}]{}", len, self.name(*of)),
            TypeKind::Struct { members: m, packed } => {
                let prefix = if *packed { "packed " } else { "" };
                format!("{}struct({})", prefix, members(m))
            }
            TypeKind::Union { members: m } => format!("union({})", members(m)),
            TypeKind::Function { params, ret } if *ret == TypeId::VOID => {
                format!("func({})", members(params))
            }
            TypeKind::Function { params, ret } => {
                format!("func({}) -> {}", members(params), self.name(*ret))
            }
            TypeKind::Opaque(_) => String::from("<opaque>"),
            kind => format!("{:?}", kind).to_lowercase(),
        }
    }
}
