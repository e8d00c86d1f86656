use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{compiler::Compiler, value::Value};
use crate::{
    ast::ast::Module,
    compile_source,
    errors::errors::Error,
    ir::ir::{self, BlockId, CastKind, Constant, Function, Instr, Operand, ParamClass, StorageClass, Terminator},
    options::CompileOptions,
    types::types::TypeId,
    Span,
};

fn compile(source: &str) -> Result<ir::Module, Vec<Error>> {
    compile_source(source, &CompileOptions::new("test.em"))
}

fn first_error(source: &str) -> String {
    match compile(source) {
        Ok(_) => panic!("expected `{}` to fail", source),
        Err(errors) => errors[0].get_error_name().to_string(),
    }
}

fn global_init(module: &ir::Module, name: &str) -> Constant {
    module.global(name).unwrap().init.clone()
}

fn instrs(function: &Function) -> Vec<&Instr> {
    function.blocks.iter().flat_map(|block| block.instrs.iter()).collect()
}

fn block_id(function: &Function, label: &str) -> BlockId {
    function.block_by_label(label).unwrap().id
}

fn int(value: i128, ty: TypeId) -> Constant {
    Constant::Int { value, ty }
}

fn real(value: f64, ty: TypeId) -> Constant {
    Constant::Real { value, ty }
}

fn casts(function: &Function) -> Vec<CastKind> {
    instrs(function)
        .into_iter()
        .filter_map(|instr| match instr {
            Instr::Cast { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn test_global_initializer_folds_representation() {
    let module = compile("x :: 5;\ny := x + 3;").unwrap();

    assert_eq!(global_init(&module, "y"), int(8, TypeId::INT64));
    assert_eq!(module.global("y").unwrap().ty, TypeId::INT64);
    assert!(module.global("x").is_none());
}

#[test]
fn test_redefinition_is_rejected() {
    assert_eq!(first_error("x :: 5;\nx := 6;"), "Redefinition");
    assert_eq!(first_error("f : func() { a := 1; a := 2; }"), "Redefinition");
}

#[test]
fn test_recast_chain_truncates_then_extends() {
    let module = compile("a := 300 as uint64 as uint8 as uint64;").unwrap();
    assert_eq!(global_init(&module, "a"), int(44, TypeId::UINT64));

    let module = compile("b := -1 as int8 as uint16;").unwrap();
    assert_eq!(global_init(&module, "b"), int(255, TypeId::UINT16));
}

#[test]
fn test_literal_must_fit_declared_type() {
    assert_eq!(first_error("x : int8 = 300;"), "LiteralOutOfRange");
    assert!(compile("x : int8 = -128;").is_ok());
}

#[test]
fn test_constant_division_by_zero() {
    assert_eq!(first_error("a := 5 / 0;"), "DivisionByZero");
    assert_eq!(first_error("a := 5 % 0;"), "DivisionByZero");
    assert!(compile("f : func(x: int32) -> int32 { return 5 / x; }").is_ok());
}

#[test]
fn test_signed_division_overflow() {
    assert_eq!(first_error("a := -9223372036854775808 / -1;"), "SignedOverflow");
    assert_eq!(
        first_error("a := (-2147483648 as int32) / (-1 as int32);"),
        "SignedOverflow"
    );

    let module = compile("a := -9223372036854775808 / -2;").unwrap();
    assert_eq!(global_init(&module, "a"), int(4611686018427387904, TypeId::INT64));
}

#[test]
fn test_array_initializer_positions() {
    let module = compile("a := [4]int32{[2] = 5, 9};").unwrap();

    let Constant::Aggregate { elements, .. } = global_init(&module, "a") else {
        panic!("expected aggregate");
    };
    assert_eq!(
        elements,
        vec![
            int(0, TypeId::INT32),
            int(0, TypeId::INT32),
            int(5, TypeId::INT32),
            int(9, TypeId::INT32),
        ]
    );

    assert_eq!(first_error("a := [4]int32{[3] = 5, 9};"), "IndexOutOfBounds");
}

#[test]
fn test_union_initializer_takes_one_element() {
    let module = compile("U :: union(i: int32, r: real32);\nu := U{.r = 1.5};").unwrap();
    assert!(matches!(global_init(&module, "u"), Constant::Union { member: 1, .. }));

    assert_eq!(
        first_error("U :: union(i: int32, r: real32);\nu := U{1, 2};"),
        "UnionInitializer"
    );
}

#[test]
fn test_member_store_uses_member_offset() {
    let module = compile(
        "Point :: struct(x: int32, y: int32);\n\
         f : func() { p : Point; p.x = 7; p.y = 9; }",
    )
    .unwrap();
    let function = module.function("f").unwrap();
    let instrs = instrs(function);

    assert!(instrs.iter().any(|instr| matches!(
        instr,
        Instr::Store {
            ty: TypeId::INT32,
            value: Operand::Const(Constant::Int { value: 7, .. }),
            ..
        }
    )));
    assert!(instrs.iter().any(|instr| matches!(instr, Instr::Offset { offset: 4, .. })));
}

#[test]
fn test_member_of_initialized_struct() {
    let module = compile(
        "Point :: struct(x: int32, y: int32);\n\
         f : func() -> int32 { p := Point{1, 2}; return p.x; }",
    )
    .unwrap();
    let function = module.function("f").unwrap();
    let instrs = instrs(function);

    let Some(Instr::Alloca { dest: slot, .. }) = instrs.first() else {
        panic!("expected the struct slot first");
    };
    let slot = Operand::Temp(*slot);

    assert!(instrs.iter().any(|instr| matches!(
        instr,
        Instr::Store { ty: TypeId::INT32, addr, value: Operand::Const(Constant::Int { value: 1, .. }) } if *addr == slot
    )));
    assert!(instrs.iter().any(|instr| matches!(
        instr,
        Instr::Load { ty: TypeId::INT32, addr, .. } if *addr == slot
    )));
}

#[test]
fn test_loop_blocks_and_scope() {
    let module = compile("f : func() { loop i := 0; i < 3; i += 1 { } }").unwrap();
    let function = module.function("f").unwrap();

    let labels: Vec<&str> = function.blocks.iter().map(|block| block.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["entry", "loop.pre", "loop.body", "loop.update", "loop.exit", "loop.merge"]
    );

    assert_eq!(
        first_error("f : func() { loop i := 0; i < 3; i += 1 { } i = 1; }"),
        "UnknownIdentifier"
    );
}

#[test]
fn test_break_and_continue_targets() {
    let module = compile(
        "f : func() {\n\
             loop i := 0; i < 10; i += 1 {\n\
                 if i == 5 { break; }\n\
                 if i == 3 { continue; }\n\
             }\n\
         }",
    )
    .unwrap();
    let function = module.function("f").unwrap();
    let exit = block_id(function, "loop.exit");
    let update = block_id(function, "loop.update");

    let targets: Vec<Option<Terminator>> = function
        .blocks
        .iter()
        .filter(|block| block.label == "if.body")
        .map(|block| block.terminator.clone())
        .collect();

    assert_eq!(
        targets,
        vec![Some(Terminator::Jump(exit)), Some(Terminator::Jump(update))]
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(first_error("f : func() { break; }"), "BreakOutsideLoop");
    assert_eq!(first_error("f : func() { continue; }"), "ContinueOutsideLoop");
}

#[test]
fn test_missing_return() {
    assert_eq!(
        first_error("f : func(x: int32) -> int32 { if x > 0 { return 1; } }"),
        "MissingReturn"
    );
    assert!(compile("f : func(x: int32) -> int32 { if x > 0 { return 1; } else { return 2; } }").is_ok());
}

#[test]
fn test_indirect_return_uses_hidden_slot() {
    let module = compile(
        "Big :: struct(a: int64, b: int64, c: int64);\n\
         make : func() -> Big { return Big{1, 2, 3}; }\n\
         first : func() -> int64 { b := make(); return b.a; }",
    )
    .unwrap();

    let make = module.function("make").unwrap();
    assert_eq!(make.params[0].class, ParamClass::ReturnSlot);
    assert!(make.block_by_label("epilogue").is_some());

    let first = module.function("first").unwrap();
    let call = instrs(first)
        .into_iter()
        .find(|instr| matches!(instr, Instr::Call { .. }))
        .unwrap();
    let Instr::Call { dest, args, .. } = call else {
        unreachable!();
    };
    assert!(dest.is_none());
    assert_eq!(args.len(), 1);
}

#[test]
fn test_small_struct_returns_direct() {
    let module = compile(
        "Pair :: struct(a: int32, b: int32);\n\
         make : func() -> Pair { return Pair{1, 2}; }",
    )
    .unwrap();

    let make = module.function("make").unwrap();
    assert!(make.params.is_empty());
    assert!(instrs(make).iter().any(|instr| matches!(instr, Instr::LoadBits { size: 8, .. })));
}

#[test]
fn test_call_is_not_constant() {
    assert_eq!(
        first_error("g : func() -> int32 { return 1; }\nx := g();"),
        "NotConstant"
    );
}

#[test]
fn test_arity_and_argument_types() {
    let source = "g : func(a: int32) -> int32 { return a; }\n";

    assert_eq!(
        first_error(&format!("{}f : func() -> int32 {{ return g(1, 2); }}", source)),
        "ArityMismatch"
    );
    assert_eq!(
        first_error(&format!("{}f : func() -> int32 {{ return g(true); }}", source)),
        "ArgumentTypeMismatch"
    );
}

#[test]
fn test_static_local_gets_module_storage() {
    let module = compile("f : func() { static n : int32 = 4; n = 5; }").unwrap();

    let global = module.global("f.n").unwrap();
    assert_eq!(global.storage, StorageClass::Static);
    assert_eq!(global.init, int(4, TypeId::INT32));
}

#[test]
fn test_self_referential_struct() {
    let module = compile("Node :: struct(value: int32, next: *Node);\nhead : Node;").unwrap();

    let ty = module.global("head").unwrap().ty;
    assert_eq!(module.types.name(ty), "Node");
    assert_eq!(module.types.size_of(ty), Some(16));
}

#[test]
fn test_cyclic_definition() {
    assert_eq!(first_error("a : int32 = b;\nb : int32 = a;"), "NotConstant");
    assert_eq!(first_error("A :: B;\nB :: A;"), "SynonymCycle");
}

#[test]
fn test_recast_implicit_identity() {
    let module = Module::new(Rc::new(String::from("test.em")));
    let mut compiler = Compiler::new(&module, &CompileOptions::default());

    let value = Value::constant(int(3, TypeId::INT32), TypeId::INT32);
    let result = compiler
        .recast_implicit(value.clone(), TypeId::INT32, &Span::null())
        .unwrap();

    assert_eq!(result, value);
}

#[test]
fn test_array_size_must_be_positive() {
    assert_eq!(first_error("a : [-1]int32;"), "InvalidArraySize");
    assert_eq!(first_error("a : [0]int32;"), "InvalidArraySize");
    assert!(compile("N :: 2;\na : [N * 2]int32;").is_ok());
}

#[test]
fn test_array_size_must_be_determinate() {
    assert_eq!(first_error("n := 3;\na : [n]int32;"), "NotARepresentation");
    assert_eq!(first_error("a : [\"abc\"]int32;"), "IndeterminateArraySize");
    assert_eq!(
        first_error("g : func() -> int32 { return 1; }\na : [g()]int32;"),
        "IndeterminateArraySize"
    );
    assert_eq!(first_error("N :: 3;\na : [N = 4]int32;"), "IndeterminateArraySize");
}

#[test]
fn test_oversized_types_are_rejected() {
    assert_eq!(first_error("n := sizeof([4611686018427387904]int64);"), "TypeTooLarge");
    assert_eq!(first_error("f : func() { a : [4611686018427387904]int64; }"), "TypeTooLarge");
    assert_eq!(
        first_error(
            "B :: struct(a: [2305843009213693951]int64, b: [2305843009213693951]int64);\n\
             n := sizeof(B);"
        ),
        "TypeTooLarge"
    );

    let module = compile("n := sizeof([2305843009213693951]int64);").unwrap();
    assert_eq!(global_init(&module, "n"), int(18446744073709551608, TypeId::UINT64));
}

#[test]
fn test_huge_pointer_index_stays_runtime() {
    let module = compile("f : func(p: *int64) -> int64 { return p[4611686018427387904]; }").unwrap();
    let function = module.function("f").unwrap();

    assert!(instrs(function)
        .iter()
        .any(|instr| matches!(instr, Instr::Element { stride: 8, .. })));
    assert!(!instrs(function).iter().any(|instr| matches!(instr, Instr::Offset { .. })));
}

#[test]
fn test_recast_folds_constants() {
    let module = compile(
        "a := true as int32;\n\
         b := 5 as bool;\n\
         c := (3 as int32) as real64;\n\
         d := 2.75 as int32;\n\
         e := (1.5 as real64) as real32;",
    )
    .unwrap();

    assert_eq!(global_init(&module, "a"), int(1, TypeId::INT32));
    assert_eq!(global_init(&module, "b"), Constant::Bool(true));
    assert_eq!(global_init(&module, "c"), real(3.0, TypeId::REAL64));
    assert_eq!(global_init(&module, "d"), int(2, TypeId::INT32));
    assert_eq!(global_init(&module, "e"), real(1.5, TypeId::REAL32));
}

#[test]
fn test_recast_runtime_matrix() {
    let module = compile(
        "to_real : func(x: int32) -> real64 { return x as real64; }\n\
         narrow : func(x: real64) -> real32 { return x as real32; }\n\
         to_int : func(x: real64) -> uint16 { return x as uint16; }\n\
         widen : func(b: bool) -> int32 { return b as int32; }\n\
         address : func(p: *int32) -> uint64 { return p as uint64; }\n\
         pointer : func(n: uint64) -> *int32 { return n as *int32; }\n\
         bytes : func(p: *int32) -> *uint8 { return p as *uint8; }\n\
         truthy : func(x: int32) -> bool { return x as bool; }",
    )
    .unwrap();

    let kinds = |name: &str| casts(module.function(name).unwrap());
    assert_eq!(kinds("to_real"), vec![CastKind::SignedToFloat]);
    assert_eq!(kinds("narrow"), vec![CastKind::FloatTrunc]);
    assert_eq!(kinds("to_int"), vec![CastKind::FloatToUnsigned]);
    assert_eq!(kinds("widen"), vec![CastKind::ZeroExtend]);
    assert_eq!(kinds("address"), vec![CastKind::PtrToInt]);
    assert_eq!(kinds("pointer"), vec![CastKind::IntToPtr]);
    assert!(kinds("bytes").is_empty());

    let truthy = module.function("truthy").unwrap();
    assert!(instrs(truthy).iter().any(|instr| matches!(instr, Instr::Compare { .. })));
}

#[test]
fn test_recast_rejects_aggregates_and_functions() {
    assert_eq!(
        first_error("P :: struct(a: int32);\nf : func(x: int32) { y := x as P; }"),
        "InvalidRecast"
    );
    assert_eq!(
        first_error("P :: struct(a: int32);\nf : func(p: P) -> int32 { return p as int32; }"),
        "InvalidRecast"
    );
    assert_eq!(
        first_error("Fn :: func(a: int32) -> int32;\nf : func(x: int64) { y := x as Fn; }"),
        "InvalidRecast"
    );
}

#[test]
fn test_union_members_share_offset_zero() {
    let module = compile(
        "U :: union(i: int32, r: real32);\n\
         f : func() -> real32 { u : U; u.i = 1; return u.r; }",
    )
    .unwrap();
    let function = module.function("f").unwrap();
    let instrs = instrs(function);

    let Some(Instr::Alloca { dest: slot, .. }) = instrs.first() else {
        panic!("expected the union slot first");
    };
    let slot = Operand::Temp(*slot);

    assert!(!instrs.iter().any(|instr| matches!(instr, Instr::Offset { .. })));
    assert!(instrs.iter().any(|instr| matches!(
        instr,
        Instr::Store { ty: TypeId::INT32, addr, .. } if *addr == slot
    )));
    assert!(instrs.iter().any(|instr| matches!(
        instr,
        Instr::Load { ty: TypeId::REAL32, addr, .. } if *addr == slot
    )));
}

#[test]
fn test_void_function_gets_return() {
    let module = compile("f : func() { loop i := 0; i < 3; i += 1 { } }").unwrap();
    let function = module.function("f").unwrap();
    let merge = function.block_by_label("loop.merge").unwrap();

    assert_eq!(merge.terminator, Some(Terminator::Return(None)));
}

#[test]
fn test_unreachable_blocks_are_pruned() {
    let module = compile("f : func() -> int32 { return 1; x := 2; return x; }").unwrap();
    let function = module.function("f").unwrap();

    assert_eq!(function.blocks.len(), 1);
    assert!(function.block_by_label("dead").is_none());
}

#[test]
fn test_return_must_match_function() {
    assert_eq!(first_error("f : func() { return 1; }"), "ReturnMismatch");
    assert_eq!(first_error("f : func() -> int32 { return; }"), "ReturnMismatch");
    assert_eq!(first_error("f : func() -> int32 { return true; }"), "ReturnMismatch");
}

#[test]
fn test_ref_argument_needs_variable() {
    let source = "\
        P :: struct(a: int32, b: int32);\n\
        mk : func() -> P { return P{1, 2}; }\n\
        bump : func(ref n: int32) { n += 1; }\n\
        reset : func(ref p: P) { p.a = 0; }\n";

    assert_eq!(first_error(&format!("{}f : func() {{ bump(5); }}", source)), "NotAddressable");
    assert_eq!(first_error(&format!("{}f : func() {{ reset(mk()); }}", source)), "NotAddressable");
    assert!(compile(&format!("{}f : func() {{ p := mk(); reset(p); bump(p.b); }}", source)).is_ok());
}

#[test]
fn test_assignment_needs_variable() {
    assert_eq!(first_error("f : func() { 5 = 3; }"), "NotAddressable");
    assert_eq!(first_error("f : func(x: int32) { x + 1 = 3; }"), "NotAddressable");
}

#[test]
fn test_temporaries_are_not_assignable() {
    let source = "\
        Big :: struct(a: int64, b: int64, c: int64);\n\
        P :: struct(a: int32, b: int32);\n\
        mk : func() -> Big { return Big{1, 2, 3}; }\n";

    assert_eq!(first_error(&format!("{}f : func() {{ mk().a = 5; }}", source)), "NotAddressable");
    assert_eq!(first_error(&format!("{}f : func() {{ P{{1, 2}}.a = 5; }}", source)), "NotAddressable");
    assert_eq!(
        first_error("f : func() { x : int32 = 1; (x as uint32) = 5; }"),
        "NotAddressable"
    );
    assert_eq!(first_error("f : func() { x : int32 = 1; y := &(x as int32); }"), "NotAddressable");

    assert!(compile(&format!("{}f : func() -> int64 {{ return mk().b; }}", source)).is_ok());
}

#[test]
fn test_recast_implicit_reconciles_unknown_pointer() {
    let module = Module::new(Rc::new(String::from("test.em")));
    let mut compiler = Compiler::new(&module, &CompileOptions::default());

    let opaque = compiler.types.pointer_to(TypeId::UNKNOWN);
    let target = compiler.types.pointer_to(TypeId::INT32);
    let other = compiler.types.pointer_to(TypeId::INT64);

    let value = Value::rvalue(Operand::Param(0), opaque);
    let result = compiler.recast_implicit(value, target, &Span::null()).unwrap();
    assert_eq!(result, Value::rvalue(Operand::Param(0), target));

    let value = Value::rvalue(Operand::Param(0), target);
    let result = compiler.recast_implicit(value, opaque, &Span::null()).unwrap();
    assert_eq!(result.ty, opaque);

    let value = Value::rvalue(Operand::Param(0), target);
    let failure = compiler.recast_implicit(value, other, &Span::null()).unwrap_err();
    assert_eq!(failure.get_error_name(), "TypeMismatch");
}

#[test]
fn test_integer_address_adopts_pointer_type() {
    let module = compile("p : *int32 = &4096;").unwrap();

    let ty = module.global("p").unwrap().ty;
    assert_eq!(global_init(&module, "p"), int(4096, ty));
}
