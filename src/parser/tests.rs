//! Unit tests for the parser.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::parser::parse;
use crate::{
    ast::{
        ast::{DefinitionBody, Item, Module},
        expressions::{BinaryOp, ExprKind, InitTag, UnaryOp},
        statements::StmtKind,
    },
    errors::errors::Error,
    lexer::lexer::tokenize,
};

fn parse_source(source: &str) -> Result<Module, Error> {
    let tokens = tokenize(source, Some("test.em".to_string()))?;
    parse(tokens, Rc::new("test.em".to_string()))
}

fn function_body(module: &Module, name: &str) -> Vec<StmtKind> {
    match &module.definition(name).unwrap().body {
        DefinitionBody::Function(body) => body.iter().map(|stmt| stmt.kind.clone()).collect(),
        DefinitionBody::Variable(_) => panic!("`{}` is not a function", name),
    }
}

fn representation_kind(module: &Module, name: &str) -> ExprKind {
    module.representation(name).unwrap().value.kind.clone()
}

#[test]
fn test_parse_item_kinds() {
    let module = parse_source(
        "x :: 5;\n\
         ext : int32;\n\
         y := x + 3;\n\
         z : int64 = 1;\n\
         private hidden : int8;\n\
         f : func() -> int32 { return 1; }\n",
    )
    .unwrap();

    let kinds: Vec<&str> = module
        .items()
        .map(|item| match item {
            Item::Representation(_) => "representation",
            Item::Declaration(_) => "declaration",
            Item::Definition(_) => "definition",
        })
        .collect();

    assert_eq!(
        kinds,
        vec!["representation", "declaration", "definition", "definition", "definition", "definition"]
    );
    assert!(module.definition("hidden").unwrap().private);
    assert!(matches!(
        module.definition("hidden").unwrap().body,
        DefinitionBody::Variable(None)
    ));
    assert!(matches!(
        module.definition("f").unwrap().body,
        DefinitionBody::Function(_)
    ));
}

#[test]
fn test_parse_item_order_is_source_order() {
    let module = parse_source("b :: 1; a :: 2; c := 3;").unwrap();
    let names: Vec<&str> = module.items().map(|item| item.name()).collect();

    assert_eq!(names, vec!["b", "a", "c"]);
}

#[test]
fn test_parse_redefinition() {
    let error = parse_source("x :: 5;\nx := 6;").unwrap_err();

    assert_eq!(error.get_error_name(), "Redefinition");
    assert_eq!(error.get_span().start.0, 8);
}

#[test]
fn test_parse_precedence() {
    let module = parse_source("x :: 1 + 2 * 3 << 1 == 14 && true;").unwrap();

    let ExprKind::Binary { op, left, .. } = representation_kind(&module, "x") else {
        panic!("expected binary expression");
    };
    assert_eq!(op, BinaryOp::LogicalAnd);

    let ExprKind::Binary { op, left, .. } = left.kind else {
        panic!("expected comparison");
    };
    assert_eq!(op, BinaryOp::Eq);

    let ExprKind::Binary { op, left, .. } = left.kind else {
        panic!("expected shift");
    };
    assert_eq!(op, BinaryOp::Shl);

    let ExprKind::Binary { op, right, .. } = left.kind else {
        panic!("expected addition");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_parse_subtraction_is_left_associative() {
    let module = parse_source("x :: 10 - 4 - 3;").unwrap();

    let ExprKind::Binary { left, right, .. } = representation_kind(&module, "x") else {
        panic!("expected binary expression");
    };
    assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
    assert_eq!(right.kind, ExprKind::Integer(3));
}

#[test]
fn test_parse_prefix_binds_tighter_than_cast() {
    let module = parse_source("x :: -1 as uint8;").unwrap();

    let ExprKind::Cast { value, ty } = representation_kind(&module, "x") else {
        panic!("expected cast");
    };
    assert!(matches!(value.kind, ExprKind::Unary { op: UnaryOp::Negate, .. }));
    assert_eq!(ty.as_identifier(), Some("uint8"));
}

#[test]
fn test_parse_numbers() {
    let module = parse_source("a :: 0xFF; b :: 0b101; c :: 1_000; d :: 2.5; e :: 'A';").unwrap();

    assert_eq!(representation_kind(&module, "a"), ExprKind::Integer(255));
    assert_eq!(representation_kind(&module, "b"), ExprKind::Integer(5));
    assert_eq!(representation_kind(&module, "c"), ExprKind::Integer(1000));
    assert_eq!(representation_kind(&module, "d"), ExprKind::Real(2.5));
    assert_eq!(representation_kind(&module, "e"), ExprKind::Char(b'A'));
}

#[test]
fn test_parse_type_constructors() {
    let module = parse_source(
        "Node :: struct(value: int32, next: *Node);\n\
         Packed :: packed struct(a: uint8, b: uint32);\n\
         Either :: union(i: int64, r: real64);\n\
         Grid :: [4][2]int32;\n\
         Fn :: func(ref a: Node, b: int32) -> *Node;\n",
    )
    .unwrap();

    let ExprKind::StructType { members, packed } = representation_kind(&module, "Node") else {
        panic!("expected struct");
    };
    assert!(!packed);
    assert_eq!(members.len(), 2);
    assert!(matches!(members[1].ty.kind, ExprKind::Deref(_)));

    assert!(matches!(
        representation_kind(&module, "Packed"),
        ExprKind::StructType { packed: true, .. }
    ));
    assert!(matches!(representation_kind(&module, "Either"), ExprKind::UnionType { .. }));

    let ExprKind::ArrayType { size, element } = representation_kind(&module, "Grid") else {
        panic!("expected array");
    };
    assert_eq!(size.kind, ExprKind::Integer(4));
    assert!(matches!(element.kind, ExprKind::ArrayType { .. }));

    let ExprKind::FunctionType { params, ret } = representation_kind(&module, "Fn") else {
        panic!("expected function type");
    };
    assert!(params[0].by_ref);
    assert!(!params[1].by_ref);
    assert!(ret.is_some());
}

#[test]
fn test_parse_initializers() {
    let module = parse_source(
        "a := [4]int32{[2] = 5, 9};\n\
         p := Point{.y = 2, .x = 1};\n\
         u := {1, 2,};\n",
    )
    .unwrap();

    let value_of = |name: &str| match &module.definition(name).unwrap().body {
        DefinitionBody::Variable(Some(value)) => value.kind.clone(),
        _ => panic!("expected variable"),
    };

    let ExprKind::Initializer { ty, elements } = value_of("a") else {
        panic!("expected initializer");
    };
    assert!(matches!(ty.unwrap().kind, ExprKind::ArrayType { .. }));
    assert_eq!(elements.len(), 2);
    assert!(matches!(&elements[0].tag, Some(InitTag::Index(_))));
    assert!(elements[1].tag.is_none());

    let ExprKind::Initializer { elements, .. } = value_of("p") else {
        panic!("expected initializer");
    };
    assert_eq!(elements[0].tag, Some(InitTag::Member("y".to_string())));

    let ExprKind::Initializer { ty, elements } = value_of("u") else {
        panic!("expected initializer");
    };
    assert!(ty.is_none());
    assert_eq!(elements.len(), 2);
}

#[test]
fn test_parse_function_statements() {
    let module = parse_source(
        "f : func(n: int32) -> int32 {\n\
             x := n;\n\
             y : int32;\n\
             static count : int32 = 0;\n\
             if x > 1 { y = 1; } elif x < 0 { y = 2; } else { y = 3; }\n\
             loop i := 0; i < 10; i += 1 { continue; }\n\
             loop x > 0 { x -= 1; break; }\n\
             loop { return y; }\n\
         }\n",
    )
    .unwrap();

    let body = function_body(&module, "f");
    assert_eq!(body.len(), 7);

    let StmtKind::VarDecl(decl) = &body[2] else {
        panic!("expected declaration");
    };
    assert!(decl.is_static);

    let StmtKind::If { branches, otherwise } = &body[3] else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert!(otherwise.is_some());

    let StmtKind::Loop { init, condition, update, .. } = &body[4] else {
        panic!("expected loop");
    };
    assert!(init.is_some() && condition.is_some() && update.is_some());

    let StmtKind::Loop { init, condition, update, .. } = &body[5] else {
        panic!("expected loop");
    };
    assert!(init.is_none() && condition.is_some() && update.is_none());

    let StmtKind::Loop { init, condition, .. } = &body[6] else {
        panic!("expected loop");
    };
    assert!(init.is_none() && condition.is_none());
}

#[test]
fn test_parse_condition_does_not_take_initializer() {
    let module = parse_source("f : func() { if ready { go(); } }").unwrap();

    let body = function_body(&module, "f");
    let StmtKind::If { branches, .. } = &body[0] else {
        panic!("expected if");
    };
    assert_eq!(branches[0].condition.as_identifier(), Some("ready"));
}

#[test]
fn test_parse_postfix_chain() {
    let module = parse_source("x :: &a.b[1].c;").unwrap();

    let ExprKind::Unary { op, operand } = representation_kind(&module, "x") else {
        panic!("expected address-of");
    };
    assert_eq!(op, UnaryOp::AddressOf);
    assert!(matches!(operand.kind, ExprKind::Member { .. }));
}

#[test]
fn test_parse_compound_assignment() {
    let module = parse_source("f : func() { a <<= 2; }").unwrap();

    let body = function_body(&module, "f");
    let StmtKind::Expression(expr) = &body[0] else {
        panic!("expected expression");
    };
    assert!(matches!(
        expr.kind,
        ExprKind::Assign {
            op: Some(BinaryOp::Shl),
            ..
        }
    ));
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse_source("x :: 5").unwrap_err().get_error_name(), "UnexpectedToken");
    assert_eq!(
        parse_source("private x :: 5;").unwrap_err().get_error_name(),
        "UnexpectedTokenDetailed"
    );
    assert!(parse_source("f : func() { x := 1;").is_err());
    assert_eq!(
        parse_source("x :: 99999999999999999999999999999999999999999;")
            .unwrap_err()
            .get_error_name(),
        "NumberParseError"
    );
}
