//! Unit tests for the lexer.

use super::{lexer::tokenize, tokens::TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source, Some("test.em".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let tokens = kinds("struct union packed func ref if elif else loop break continue return as sizeof true false static private");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Struct,
            TokenKind::Union,
            TokenKind::Packed,
            TokenKind::Func,
            TokenKind::Ref,
            TokenKind::If,
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::Loop,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Return,
            TokenKind::As,
            TokenKind::SizeOf,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Static,
            TokenKind::Private,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo _bar baz_123 int32 structure", None).unwrap();

    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[1].value, "_bar");
    assert_eq!(tokens[2].value, "baz_123");
    assert_eq!(tokens[3].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].value, "int32");
    // A keyword prefix does not make a keyword.
    assert_eq!(tokens[4].kind, TokenKind::Identifier);
    assert_eq!(tokens[4].value, "structure");
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 3.14 0x1F 0b101 1e3 0x1e 1_000", None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::Real);
    assert_eq!(tokens[1].value, "3.14");
    assert_eq!(tokens[2].kind, TokenKind::Number);
    assert_eq!(tokens[2].value, "0x1F");
    assert_eq!(tokens[3].kind, TokenKind::Number);
    assert_eq!(tokens[3].value, "0b101");
    assert_eq!(tokens[4].kind, TokenKind::Real);
    assert_eq!(tokens[5].kind, TokenKind::Number);
    assert_eq!(tokens[6].kind, TokenKind::Number);
    assert_eq!(tokens[6].value, "1_000");
}

#[test]
fn test_tokenize_member_after_number_is_not_real() {
    let tokens = kinds("a[0].x");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Identifier,
            TokenKind::OpenBracket,
            TokenKind::Number,
            TokenKind::CloseBracket,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_string_escapes() {
    let source = r#""hello\nworld" "tab\there" "back\\" "hex\x41" "quote\"d""#;
    let tokens = tokenize(source, None).unwrap();

    assert_eq!(tokens[0].value, "hello\nworld");
    assert_eq!(tokens[1].value, "tab\there");
    assert_eq!(tokens[2].value, "back\\");
    assert_eq!(tokens[3].value, "hexA");
    assert_eq!(tokens[4].value, "quote\"d");
    assert!(tokens[..5].iter().all(|t| t.kind == TokenKind::String));
}

#[test]
fn test_tokenize_chars() {
    let tokens = tokenize(r"'a' '\n' '\0'", None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Char);
    assert_eq!(tokens[0].value, "a");
    assert_eq!(tokens[1].value, "\n");
    assert_eq!(tokens[2].value, "\0");
}

#[test]
fn test_tokenize_bad_escape() {
    assert!(tokenize(r#""\q""#, None).is_err());
}

#[test]
fn test_tokenize_declaration_operators() {
    assert_eq!(
        kinds("a :: b := c : d;"),
        vec![
            TokenKind::Identifier,
            TokenKind::ColonColon,
            TokenKind::Identifier,
            TokenKind::ColonEquals,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("+ - * / % == != < > <= >= = && || & | ^ << >> ~ ! ->"),
        vec![
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEquals,
            TokenKind::GreaterEquals,
            TokenKind::Assignment,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Ampersand,
            TokenKind::Pipe,
            TokenKind::Caret,
            TokenKind::ShiftLeft,
            TokenKind::ShiftRight,
            TokenKind::Tilde,
            TokenKind::Not,
            TokenKind::Arrow,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_compound_assignment() {
    assert_eq!(
        kinds("+= -= *= /= %= &= |= ^= <<= >>="),
        vec![
            TokenKind::PlusEquals,
            TokenKind::MinusEquals,
            TokenKind::StarEquals,
            TokenKind::SlashEquals,
            TokenKind::PercentEquals,
            TokenKind::AmpersandEquals,
            TokenKind::PipeEquals,
            TokenKind::CaretEquals,
            TokenKind::ShiftLeftEquals,
            TokenKind::ShiftRightEquals,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_comments() {
    let tokens = tokenize("x := 5; // trailing\n// whole line\ny := 10;", None).unwrap();

    assert_eq!(tokens.len(), 9);
    assert_eq!(tokens[0].value, "x");
    assert_eq!(tokens[4].value, "y");
    assert_eq!(tokens[8].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_spans() {
    let tokens = tokenize("ab := 12;", Some("span.em".to_string())).unwrap();

    assert_eq!(tokens[0].span.start.0, 0);
    assert_eq!(tokens[0].span.end.0, 2);
    assert_eq!(tokens[1].span.start.0, 3);
    assert_eq!(tokens[2].span.start.0, 6);
    assert_eq!(tokens[2].span.end.0, 8);
    assert_eq!(*tokens[2].span.start.1, "span.em");
}

#[test]
fn test_tokenize_unrecognized_token() {
    let error = tokenize("x := @;", None).unwrap_err();

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_span().start.0, 5);
}
