//! Integration tests for end-to-end compilation.
//!
//! These tests run source text through tokenization, parsing and lowering
//! and check the resulting IR module or the reported errors.

use emberc::{
    compile_source,
    errors::errors::{Error, ErrorKind},
    ir::ir::{Constant, Instr, Module, ParamClass, Terminator},
    options::CompileOptions,
    types::types::TypeId,
};

fn compile(source: &str) -> Result<Module, Vec<Error>> {
    compile_source(source, &CompileOptions::new("test.em"))
}

fn error_names(source: &str) -> Vec<String> {
    match compile(source) {
        Ok(_) => vec![],
        Err(errors) => errors.iter().map(|error| error.get_error_name().to_string()).collect(),
    }
}

#[test]
fn test_compile_program() {
    let source = "\
        Vec2 :: struct(x: int32, y: int32);\n\
        origin : Vec2 = {0, 0};\n\
        \n\
        length_squared : func(v: Vec2) -> int32 {\n\
            return v.x * v.x + v.y * v.y;\n\
        }\n\
        \n\
        sum : func(n: int32) -> int32 {\n\
            total : int32 = 0;\n\
            loop i : int32 = 0; i < n; i += 1 {\n\
                if i % 2 == 0 { continue; }\n\
                total += i;\n\
            }\n\
            return total;\n\
        }\n";

    let module = compile(source).unwrap();

    assert!(module.global("origin").is_some());
    assert!(module.function("length_squared").is_some());
    assert!(module.function("sum").is_some());

    for function in &module.functions {
        assert!(!function.blocks.is_empty());
        for block in &function.blocks {
            assert!(block.terminator.is_some(), "{} has an open block", function.name);
        }
    }
}

#[test]
fn test_word_sized_struct_passes_direct() {
    let source = "\
        Vec2 :: struct(x: int32, y: int32);\n\
        dot : func(a: Vec2, b: Vec2) -> int32 { return a.x * b.x + a.y * b.y; }\n";

    let module = compile(source).unwrap();
    let dot = module.function("dot").unwrap();
    let classes: Vec<ParamClass> = dot.params.iter().map(|param| param.class).collect();

    assert_eq!(classes, vec![ParamClass::Direct, ParamClass::Direct]);
}

#[test]
fn test_word_size_changes_classification() {
    let source = "\
        Vec2 :: struct(x: int32, y: int32);\n\
        first : func(v: Vec2) -> int32 { return v.x; }\n";

    let options = CompileOptions::new("test.em").with_word_size(4);
    let module = compile_source(source, &options).unwrap();
    let first = module.function("first").unwrap();

    assert_eq!(first.params[0].class, ParamClass::Indirect);
}

#[test]
fn test_ref_parameter_is_by_reference() {
    let source = "\
        Vec2 :: struct(x: int32, y: int32);\n\
        reset : func(ref v: Vec2) { v.x = 0; v.y = 0; }\n";

    let module = compile(source).unwrap();
    let reset = module.function("reset").unwrap();

    assert_eq!(reset.params[0].class, ParamClass::ByReference);
}

#[test]
fn test_extern_declarations() {
    let source = "\
        putchar : func(c: int32) -> int32;\n\
        counter : int64;\n\
        main : func() -> int32 { counter = counter + 1; return putchar(65); }\n";

    let module = compile(source).unwrap();

    assert!(module.external("putchar").is_some());
    assert!(module.external("counter").is_some());
    assert!(module.global("counter").is_none());
}

#[test]
fn test_independent_items_report_separately() {
    let names = error_names(
        "a := 1 / 0;\n\
         b : int8 = 1000;\n\
         c := 3;\n",
    );

    assert_eq!(names, vec!["DivisionByZero", "LiteralOutOfRange"]);
}

#[test]
fn test_dependency_failure_cascades() {
    let names = error_names(
        "a := 1 / 0;\n\
         b := a + 1;\n",
    );

    assert_eq!(names, vec!["DivisionByZero", "DependencyFailed"]);
}

#[test]
fn test_forward_references_resolve_on_demand() {
    let module = compile("b := a * 2;\na :: 21;").unwrap();

    assert_eq!(
        module.global("b").unwrap().init,
        Constant::Int {
            value: 42,
            ty: TypeId::INT64
        }
    );
}

#[test]
fn test_if_chain_blocks() {
    let source = "\
        sign : func(x: int32) -> int32 {\n\
            if x > 0 { return 1; } elif x < 0 { return -1; } else { return 0; }\n\
        }\n";

    let module = compile(source).unwrap();
    let sign = module.function("sign").unwrap();

    let bodies = sign.blocks.iter().filter(|block| block.label == "if.body").count();
    assert_eq!(bodies, 2);

    let returns = sign
        .blocks
        .iter()
        .filter(|block| matches!(block.terminator, Some(Terminator::Return(Some(_)))))
        .count();
    assert_eq!(returns, 3);
}

#[test]
fn test_short_circuit_logic() {
    let source = "both : func(a: bool, b: bool) -> bool { return a && b; }\n";

    let module = compile(source).unwrap();
    let both = module.function("both").unwrap();

    assert!(both.block_by_label("logic.rhs").is_some());
    assert!(both.block_by_label("logic.merge").is_some());
}

#[test]
fn test_sizeof_is_constant() {
    let module = compile("Pair :: struct(a: int8, b: int32);\nsize := sizeof(Pair);").unwrap();

    assert_eq!(
        module.global("size").unwrap().init,
        Constant::Int {
            value: 8,
            ty: TypeId::UINT64
        }
    );
}

#[test]
fn test_address_of_global_is_relocatable() {
    let module = compile("x : int32 = 1;\np := &x;").unwrap();
    let init = &module.global("p").unwrap().init;

    assert!(init.is_relocatable());
    assert!(matches!(init, Constant::Address { symbol, offset: 0, .. } if symbol == "x"));
}

#[test]
fn test_runtime_initializer_writes_elements() {
    let source = "\
        Vec2 :: struct(x: int32, y: int32);\n\
        make : func(a: int32) -> int32 { v := Vec2{a, 2}; return v.y; }\n";

    let module = compile(source).unwrap();
    let make = module.function("make").unwrap();
    let stores = make
        .blocks
        .iter()
        .flat_map(|block| block.instrs.iter())
        .filter(|instr| matches!(instr, Instr::Store { ty: TypeId::INT32, .. }))
        .count();

    assert!(stores >= 2);
}

#[test]
fn test_errors_render_with_location() {
    let source = "x := 1;\ny := z;\n";
    let errors = compile(source).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Resolution);
    assert!(errors[0].render(source).starts_with("test.em:2:6"));
}

#[test]
fn test_ir_dump_lists_items() {
    let module = compile("g : int32 = 7;\nf : func() -> int32 { return g; }\n").unwrap();
    let dump = module.to_string();

    assert!(dump.contains("@g"));
    assert!(dump.contains("@f"));
}
