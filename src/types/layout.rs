//! Size, alignment and member offsets.
//!
//! Structs are laid out in declaration order with natural alignment unless
//! packed, in which case every member has alignment 1. Unions place every
//! member at offset 0 and take the size of their largest member. A layout
//! whose size does not fit in `u64` has no size.

use super::types::{NameType, TypeId, TypeKind, TypeTable};

fn align_to(offset: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(offset)
    } else {
        offset.div_ceil(align).checked_mul(align)
    }
}

impl TypeTable {
    /// Size in bytes, or `None` for types without storage.
    pub fn size_of(&self, id: TypeId) -> Option<u64> {
        if !self.is_complete(id) {
            return None;
        }

        match self.kind(id) {
            TypeKind::Unknown | TypeKind::Void | TypeKind::Opaque(_) | TypeKind::Function { .. } => None,
            TypeKind::Bool | TypeKind::Int8 | TypeKind::UInt8 => Some(1),
            TypeKind::Int16 | TypeKind::UInt16 => Some(2),
            TypeKind::Int32 | TypeKind::UInt32 | TypeKind::Real32 => Some(4),
            TypeKind::Int64 | TypeKind::UInt64 | TypeKind::Real64 => Some(8),
            TypeKind::Pointer(_) => Some(self.word_size),
            TypeKind::Array { of, len } => self.size_of(*of)?.checked_mul(*len),
            TypeKind::Struct { members, packed } => self.struct_size(members, *packed),
            TypeKind::Union { members } => self.union_size(members),
        }
    }

    pub fn struct_size(&self, members: &[NameType], packed: bool) -> Option<u64> {
        let mut offset = 0u64;
        for member in members {
            let align = if packed { 1 } else { self.align_of(member.ty)? };
            offset = align_to(offset, align)?.checked_add(self.size_of(member.ty)?)?;
        }
        let align = if packed { 1 } else { self.members_align(members)? };
        align_to(offset, align)
    }

    pub fn union_size(&self, members: &[NameType]) -> Option<u64> {
        let mut size = 0;
        for member in members {
            size = size.max(self.size_of(member.ty)?);
        }
        align_to(size, self.members_align(members)?)
    }

    fn members_align(&self, members: &[NameType]) -> Option<u64> {
        let mut align = 1;
        for member in members {
            align = align.max(self.align_of(member.ty)?);
        }
        Some(align)
    }

    pub fn align_of(&self, id: TypeId) -> Option<u64> {
        match self.kind(id) {
            TypeKind::Array { of, .. } => self.align_of(*of),
            TypeKind::Struct { packed: true, .. } => Some(1),
            TypeKind::Struct { members, .. } | TypeKind::Union { members } => self.members_align(members),
            _ => self.size_of(id),
        }
    }

    /// Byte offset of the member at `index` in a struct or union.
    pub fn member_offset(&self, id: TypeId, index: usize) -> Option<u64> {
        match self.kind(id) {
            TypeKind::Union { members } => members.get(index).map(|_| 0),
            TypeKind::Struct { members, packed } => {
                if index >= members.len() {
                    return None;
                }

                let mut offset = 0;
                for (position, member) in members.iter().enumerate() {
                    let align = if *packed { 1 } else { self.align_of(member.ty)? };
                    offset = align_to(offset, align)?;
                    if position == index {
                        return Some(offset);
                    }
                    offset = offset.checked_add(self.size_of(member.ty)?)?;
                }
                None
            }
            _ => None,
        }
    }

    /// Number of elements an initializer may address.
    pub fn element_count(&self, id: TypeId) -> Option<u64> {
        match self.kind(id) {
            TypeKind::Array { len, .. } => Some(*len),
            TypeKind::Struct { members, .. } | TypeKind::Union { members } => Some(members.len() as u64),
            _ => None,
        }
    }

    /// Type and byte offset of element `index` of an aggregate.
    pub fn element(&self, id: TypeId, index: u64) -> Option<(TypeId, u64)> {
        match self.kind(id) {
            TypeKind::Array { of, len } if index < *len => Some((*of, self.size_of(*of)?.checked_mul(index)?)),
            TypeKind::Struct { members, .. } | TypeKind::Union { members } => {
                let member = members.get(index as usize)?;
                Some((member.ty, self.member_offset(id, index as usize)?))
            }
            _ => None,
        }
    }

    /// Whether a value of this type fits in one machine word.
    pub fn fits_word(&self, id: TypeId) -> bool {
        matches!(self.size_of(id), Some(size) if size <= self.word_size)
    }
}
