use pretty_assertions::assert_eq;

use super::types::{Attributes, NameType, Shell, TypeError, TypeId, TypeKind, TypeTable};

fn member(name: &str, ty: TypeId) -> NameType {
    NameType::new(name, ty, Attributes::empty())
}

/// `Name :: struct(value: int32, next: *Name)`
fn linked_node(table: &mut TypeTable, name: &str) -> TypeId {
    let node = table.placeholder(name, Shell::Struct);
    let next = table.pointer_to(node);
    table
        .construct(
            node,
            TypeKind::Struct {
                members: vec![member("value", TypeId::INT32), member("next", next)],
                packed: false,
            },
        )
        .unwrap();
    node
}

#[test]
fn test_builtin_lookup() {
    assert_eq!(TypeTable::builtin("int32"), Some(TypeId::INT32));
    assert_eq!(TypeTable::builtin("real64"), Some(TypeId::REAL64));
    assert_eq!(TypeTable::builtin("void"), Some(TypeId::VOID));
    assert_eq!(TypeTable::builtin("unknown"), None);
    assert_eq!(TypeTable::builtin("Point"), None);
}

#[test]
fn test_pointer_and_array_caching() {
    let mut table = TypeTable::new(8);

    let a = table.pointer_to(TypeId::INT32);
    let b = table.pointer_to(TypeId::INT32);
    assert_eq!(a, b);

    let x = table.array_of(TypeId::UINT8, 4);
    let y = table.array_of(TypeId::UINT8, 4);
    let z = table.array_of(TypeId::UINT8, 5);
    assert_eq!(x, y);
    assert!(x != z);
    assert!(!table.equal(x, z));
}

#[test]
fn test_self_referential_equality_terminates() {
    let mut table = TypeTable::new(8);
    let node = linked_node(&mut table, "Node");

    assert!(table.equal(node, node));

    // Two separately built but identical cyclic graphs are equal.
    let other = linked_node(&mut table, "Other");
    assert!(table.equal(node, other));
    assert!(table.equal(other, node));
}

#[test]
fn test_structural_inequality() {
    let mut table = TypeTable::new(8);
    let a = table.add(TypeKind::Struct {
        members: vec![member("x", TypeId::INT32)],
        packed: false,
    });
    let b = table.add(TypeKind::Struct {
        members: vec![member("x", TypeId::INT64)],
        packed: false,
    });
    let c = table.add(TypeKind::Struct {
        members: vec![member("y", TypeId::INT32)],
        packed: false,
    });

    assert!(!table.equal(a, b));
    assert!(!table.equal(a, c));
    assert!(!table.equal(TypeId::INT32, TypeId::UINT32));
}

#[test]
fn test_function_equality_ignores_parameter_names() {
    let mut table = TypeTable::new(8);
    let f = table.add(TypeKind::Function {
        params: vec![member("a", TypeId::INT32)],
        ret: TypeId::INT32,
    });
    let g = table.add(TypeKind::Function {
        params: vec![member("b", TypeId::INT32)],
        ret: TypeId::INT32,
    });
    let h = table.add(TypeKind::Function {
        params: vec![NameType::new("b", TypeId::INT32, Attributes::BY_REFERENCE)],
        ret: TypeId::INT32,
    });

    assert!(table.equal(f, g));
    assert!(!table.equal(f, h));
}

#[test]
fn test_reconstruction_is_rejected() {
    let mut table = TypeTable::new(8);
    let node = linked_node(&mut table, "Node");

    let result = table.construct(node, TypeKind::Union { members: vec![] });
    assert_eq!(result, Err(TypeError::Reconstruction(node)));
}

#[test]
fn test_placeholder_registers_self_pointer() {
    let mut table = TypeTable::new(8);
    let node = table.placeholder("Node", Shell::Struct);

    assert!(!table.is_complete(node));
    let pointer = table.pointer_to(node);
    assert!(table.is_complete(pointer));
    assert_eq!(table.name(pointer), "*Node");
}

#[test]
fn test_struct_layout() {
    let mut table = TypeTable::new(8);
    let padded = table.add(TypeKind::Struct {
        members: vec![member("a", TypeId::UINT8), member("b", TypeId::UINT32), member("c", TypeId::UINT8)],
        packed: false,
    });

    assert_eq!(table.size_of(padded), Some(12));
    assert_eq!(table.align_of(padded), Some(4));
    assert_eq!(table.member_offset(padded, 1), Some(4));
    assert_eq!(table.member_offset(padded, 2), Some(8));

    let packed = table.add(TypeKind::Struct {
        members: vec![
            NameType::new("a", TypeId::UINT8, Attributes::PACKED),
            NameType::new("b", TypeId::UINT32, Attributes::PACKED),
        ],
        packed: true,
    });
    assert_eq!(table.size_of(packed), Some(5));
    assert_eq!(table.member_offset(packed, 1), Some(1));
}

#[test]
fn test_union_layout() {
    let mut table = TypeTable::new(8);
    let union = table.add(TypeKind::Union {
        members: vec![member("a", TypeId::UINT8), member("b", TypeId::REAL64), member("c", TypeId::INT32)],
    });

    assert_eq!(table.size_of(union), Some(8));
    assert_eq!(table.member_offset(union, 0), Some(0));
    assert_eq!(table.member_offset(union, 2), Some(0));
}

#[test]
fn test_word_size_controls_pointers_and_fit() {
    let mut narrow = TypeTable::new(4);
    let pointer = narrow.pointer_to(TypeId::INT64);
    assert_eq!(narrow.size_of(pointer), Some(4));
    assert!(!narrow.fits_word(TypeId::INT64));

    let wide = TypeTable::new(8);
    assert!(wide.fits_word(TypeId::INT64));
}

#[test]
fn test_incomplete_types_have_no_size() {
    let mut table = TypeTable::new(8);
    let node = table.placeholder("Node", Shell::Struct);

    assert_eq!(table.size_of(node), None);
    assert_eq!(table.size_of(TypeId::VOID), None);
    assert_eq!(table.size_of(TypeId::UNKNOWN), None);
}

#[test]
fn test_type_names() {
    let mut table = TypeTable::new(8);
    let array = table.array_of(TypeId::INT32, 4);
    let pointer = table.pointer_to(array);
    let function = table.add(TypeKind::Function {
        params: vec![NameType::new("a", pointer, Attributes::BY_REFERENCE)],
        ret: TypeId::BOOL,
    });

    assert_eq!(table.name(pointer), "*[4]int32");
    assert_eq!(table.name(function), "func(ref a: *[4]int32) -> bool");
}
